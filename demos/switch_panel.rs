use gpio_mux_extender::{PinRegistry, RegistryConfig, Result, Xr2280xPort, HIGH, LOW};
use hidapi::HidApi;
use std::{thread, time::Duration};

// Rotary switch positions on bank 1.
const ROTARY_IDS: std::ops::Range<u8> = 40..45;
// LED button pairs on bank 2: (switch, led).
const BUTTONS: [(u8, u8); 2] = [(80, 82), (81, 83)];

fn main() -> Result<()> {
    env_logger::init();
    let hid_api = HidApi::new()?;
    println!("Opening first XR2280x device...");
    let port = Xr2280xPort::open_first(&hid_api)?;
    println!("Device opened ({} GPIOs).", port.gpio_count());

    let mut gpio = PinRegistry::new(port, RegistryConfig::default())?;
    print!("{}", gpio);

    let mut last_position = None;
    println!("Polling switches (Press Ctrl+C to stop)");
    loop {
        let mut position = None;
        for id in ROTARY_IDS {
            if gpio.read(id)?.is_high() {
                position = Some(id - ROTARY_IDS.start);
                break;
            }
        }
        if position != last_position {
            println!("Rotary switch position: {:?}", position);
            last_position = position;
        }

        for (switch, led) in BUTTONS {
            let pressed = gpio.read(switch)?.is_high();
            gpio.write(led, if pressed { HIGH } else { LOW })?;
        }
        thread::sleep(Duration::from_millis(20));
    }
}
