//! The physical GPIO capability the extender is layered on.

use crate::error::Result;
use crate::gpio::{GpioDirection, GpioLevel, GpioPull};

/// Primitive access to the board's physical GPIO pins.
///
/// The extender calls nothing beyond these three operations. Pin numbers are
/// always physical (below the registry threshold). Errors are propagated to
/// the caller unchanged; backends wrapping a foreign error type can use
/// [`crate::Error::port`].
pub trait PhysicalPort {
    /// Sets direction and pull resistor for a pin.
    fn configure(&mut self, pin: u8, direction: GpioDirection, pull: GpioPull) -> Result<()>;
    /// Drives an output pin.
    fn write(&mut self, pin: u8, level: GpioLevel) -> Result<()>;
    /// Samples a pin.
    fn read(&mut self, pin: u8) -> Result<GpioLevel>;
}

impl<P: PhysicalPort + ?Sized> PhysicalPort for &mut P {
    fn configure(&mut self, pin: u8, direction: GpioDirection, pull: GpioPull) -> Result<()> {
        (**self).configure(pin, direction, pull)
    }
    fn write(&mut self, pin: u8, level: GpioLevel) -> Result<()> {
        (**self).write(pin, level)
    }
    fn read(&mut self, pin: u8) -> Result<GpioLevel> {
        (**self).read(pin)
    }
}

impl<P: PhysicalPort + ?Sized> PhysicalPort for Box<P> {
    fn configure(&mut self, pin: u8, direction: GpioDirection, pull: GpioPull) -> Result<()> {
        (**self).configure(pin, direction, pull)
    }
    fn write(&mut self, pin: u8, level: GpioLevel) -> Result<()> {
        (**self).write(pin, level)
    }
    fn read(&mut self, pin: u8) -> Result<GpioLevel> {
        (**self).read(pin)
    }
}
