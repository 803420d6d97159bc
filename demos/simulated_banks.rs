//! Walks through both banks of the default wiring on a simulated port and
//! prints the port traffic each access produces.
use gpio_mux_extender::{
    PinDescriptor, PinRegistry, PortCall, RegistryConfig, Result, SimulatedPort, HIGH, PULL_DOWN,
};

fn dump(label: &str, gpio: &mut PinRegistry<SimulatedPort>) {
    println!("{}:", label);
    for call in gpio.port().calls() {
        match call {
            PortCall::Configure {
                pin,
                direction,
                pull,
            } => println!("  configure gpio {} {} {}", pin, direction, pull),
            PortCall::Write { pin, level } => println!("  write gpio {} = {:?}", pin, level),
            PortCall::Read { pin } => println!("  read gpio {}", pin),
        }
    }
    gpio.port_mut().clear_calls();
}

fn main() -> Result<()> {
    env_logger::init();
    let mut gpio = PinRegistry::new(SimulatedPort::new(), RegistryConfig::default())?;
    print!("{}", gpio);
    dump("Construction", &mut gpio);

    gpio.port_mut().set_input(3, HIGH);
    let level = gpio.read(42)?;
    dump(&format!("read(42) -> {:?}", level), &mut gpio);

    gpio.write(83, HIGH)?;
    dump("write(83, HIGH)", &mut gpio);

    gpio.write(7, HIGH)?;
    dump("write(7, HIGH) (physical)", &mut gpio);

    gpio.setup_descriptor(PinDescriptor::input(47, 3, PULL_DOWN))?;
    dump("setup_descriptor(47 on gpio 3)", &mut gpio);

    match gpio.read(46) {
        Ok(level) => println!("read(46) -> {:?}", level),
        Err(e) => println!("read(46) failed: {}", e),
    }
    Ok(())
}
