//! Channel-select lines of a CD4051/CD4052-style multiplexer.

use crate::error::{Error, Result};
use crate::gpio::{GpioDirection, GpioLevel, GpioPull};
use crate::port::PhysicalPort;
use log::trace;
use std::fmt;

/// Physical pins wired to the multiplexer's A, B and (optionally) C inputs.
///
/// Two lines address channels 0-3, three lines address channels 0-7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSelectLines {
    pub a: u8,
    pub b: u8,
    pub c: Option<u8>,
}

impl ChannelSelectLines {
    /// Three select lines, 8 channels.
    pub const fn new(a: u8, b: u8, c: u8) -> Self {
        ChannelSelectLines { a, b, c: Some(c) }
    }

    /// Two select lines, 4 channels.
    pub const fn two_line(a: u8, b: u8) -> Self {
        ChannelSelectLines { a, b, c: None }
    }

    /// Number of channels these lines can address.
    #[inline]
    pub fn channel_count(&self) -> u8 {
        if self.c.is_some() {
            8
        } else {
            4
        }
    }

    /// Iterates the physical pins in A, B, C order.
    pub fn pins(&self) -> impl Iterator<Item = u8> {
        [Some(self.a), Some(self.b), self.c].into_iter().flatten()
    }

    /// Returns true if `pin` is one of the select lines.
    pub fn contains(&self, pin: u8) -> bool {
        self.pins().any(|p| p == pin)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let pins: Vec<u8> = self.pins().collect();
        for (i, pin) in pins.iter().enumerate() {
            if pins[i + 1..].contains(pin) {
                return Err(Error::InvalidConfig(format!(
                    "select line pin {} is used more than once",
                    pin
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ChannelSelectLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.c {
            Some(c) => write!(f, "A={}, B={}, C={}", self.a, self.b, c),
            None => write!(f, "A={}, B={}, C=unused", self.a, self.b),
        }
    }
}

/// Drives the binary select pattern for a channel.
///
/// Stateless apart from the line assignment: selecting the same channel twice
/// leaves the lines in the same state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSelector {
    lines: ChannelSelectLines,
}

impl ChannelSelector {
    pub fn new(lines: ChannelSelectLines) -> Self {
        ChannelSelector { lines }
    }

    #[inline]
    pub fn lines(&self) -> ChannelSelectLines {
        self.lines
    }

    /// Configures every select line as an output.
    pub fn init<P: PhysicalPort + ?Sized>(&self, port: &mut P) -> Result<()> {
        for pin in self.lines.pins() {
            port.configure(pin, GpioDirection::Output, GpioPull::None)?;
        }
        Ok(())
    }

    /// Drives A, B and C from bits 0, 1 and 2 of `channel`.
    ///
    /// With no C line, bit 2 is ignored. Range checking is left to the caller.
    pub fn select<P: PhysicalPort + ?Sized>(&self, port: &mut P, channel: u8) -> Result<()> {
        let (bit_a, bit_b, bit_c) = (channel & 0x01, (channel >> 1) & 0x01, (channel >> 2) & 0x01);
        trace!(
            "Selecting channel {}: A(pin {})={}, B(pin {})={}, C(pin {:?})={}",
            channel,
            self.lines.a,
            bit_a,
            self.lines.b,
            bit_b,
            self.lines.c,
            bit_c
        );
        port.write(self.lines.a, GpioLevel::from_bit(bit_a))?;
        port.write(self.lines.b, GpioLevel::from_bit(bit_b))?;
        if let Some(c) = self.lines.c {
            port.write(c, GpioLevel::from_bit(bit_c))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{PortCall, SimulatedPort};

    #[test]
    fn test_three_line_patterns() {
        let selector = ChannelSelector::new(ChannelSelectLines::new(4, 17, 27));
        let mut port = SimulatedPort::new();
        for n in 0..8u8 {
            selector.select(&mut port, n).unwrap();
            assert_eq!(port.level(4), GpioLevel::from_bit(n));
            assert_eq!(port.level(17), GpioLevel::from_bit(n >> 1));
            assert_eq!(port.level(27), GpioLevel::from_bit(n >> 2));
        }
    }

    #[test]
    fn test_two_line_never_touches_third_line() {
        let selector = ChannelSelector::new(ChannelSelectLines::two_line(22, 23));
        let mut port = SimulatedPort::new();
        for n in 0..4u8 {
            selector.select(&mut port, n).unwrap();
            assert_eq!(port.level(22), GpioLevel::from_bit(n));
            assert_eq!(port.level(23), GpioLevel::from_bit(n >> 1));
        }
        assert!(port
            .calls()
            .iter()
            .all(|call| matches!(call, PortCall::Write { pin: 22 | 23, .. })));
        assert_eq!(port.calls().len(), 8);
    }

    #[test]
    fn test_init_configures_outputs() {
        let selector = ChannelSelector::new(ChannelSelectLines::new(4, 17, 27));
        let mut port = SimulatedPort::new();
        selector.init(&mut port).unwrap();
        assert_eq!(port.configure_count(), 3);
        assert_eq!(port.mode(27), Some((GpioDirection::Output, GpioPull::None)));
    }

    #[test]
    fn test_lines_validation() {
        assert!(ChannelSelectLines::new(4, 17, 27).validate().is_ok());
        assert!(ChannelSelectLines::new(4, 17, 4).validate().is_err());
        assert_eq!(ChannelSelectLines::two_line(22, 23).channel_count(), 4);
        assert_eq!(
            ChannelSelectLines::two_line(22, 23).to_string(),
            "A=22, B=23, C=unused"
        );
    }
}
