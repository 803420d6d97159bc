// tests/hardware_tests.rs
//! Tests against a real XR2280x bridge. Run with `--ignored`.
//!
//! Expects E0-E2 wired to the select lines of a 74HC4051 whose common I/O is
//! looped back to E3 through the channel under test, and E4 free.

use gpio_mux_extender::{
    BankConfig, ChannelSelectLines, GpioLevel, PhysicalPort, PinDescriptor, PinRegistry,
    RegistryConfig, Result, Xr2280xPort, IN, OUT, PULL_DOWN, PULL_NONE, PULL_UP,
};
use hidapi::HidApi;
use std::{thread, time::Duration};

// Helper to open the first device, panics on failure for test simplicity
fn open_test_port() -> Xr2280xPort {
    let _ = env_logger::builder().is_test(true).try_init();
    let hid_api = HidApi::new().expect("Failed to create HID API");
    Xr2280xPort::open_first(&hid_api)
        .expect("Failed to open any XR2280x EDGE interface. Is it connected and permissions set?")
}

#[test]
#[ignore] // Requires hardware
fn test_output_readback() -> Result<()> {
    let mut port = open_test_port();
    let pin = 4;
    port.configure(pin, OUT, PULL_NONE)?;

    port.write(pin, GpioLevel::High)?;
    thread::sleep(Duration::from_millis(5));
    assert_eq!(port.read(pin)?, GpioLevel::High, "Pin should read HIGH");

    port.write(pin, GpioLevel::Low)?;
    thread::sleep(Duration::from_millis(5));
    assert_eq!(port.read(pin)?, GpioLevel::Low, "Pin should read LOW");
    Ok(())
}

#[test]
#[ignore] // Requires hardware
fn test_input_pulls() -> Result<()> {
    let mut port = open_test_port();
    let pin = 4;
    port.configure(pin, IN, PULL_UP)?;
    thread::sleep(Duration::from_millis(5));
    assert_eq!(port.read(pin)?, GpioLevel::High, "Floating input with pull-up");

    port.configure(pin, IN, PULL_DOWN)?;
    thread::sleep(Duration::from_millis(5));
    assert_eq!(port.read(pin)?, GpioLevel::Low, "Floating input with pull-down");
    Ok(())
}

#[test]
#[ignore] // Requires hardware
fn test_unsupported_pin_rejected() {
    let mut port = open_test_port();
    let count = port.gpio_count();
    assert!(count == 8 || count == 32, "Unexpected GPIO count {count}");
    assert!(port.read(count).is_err());
}

#[test]
#[ignore] // Requires hardware
fn test_multiplexed_channel_read() -> Result<()> {
    let port = open_test_port();
    let cfg = RegistryConfig {
        threshold: 8,
        bank1: Some(BankConfig::new(ChannelSelectLines::new(0, 1, 2), 8..=15)),
        bank2: None,
        pins: (8..16).map(|id| PinDescriptor::input(id, 3, PULL_DOWN)).collect(),
        settle_delay: Duration::from_millis(1),
        ..RegistryConfig::default()
    };
    let mut gpio = PinRegistry::new(port, cfg)?;
    for id in 8..16 {
        let level = gpio.read(id)?;
        println!("Channel {} -> {:?}", id - 8, level);
    }
    Ok(())
}
