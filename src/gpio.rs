use crate::error::{Error, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpioDirection {
    Input,
    Output,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpioLevel {
    Low,
    High,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpioPull {
    None,
    Up,
    Down,
}

// Passthrough names so callers can treat physical and extended pins alike.
pub const HIGH: GpioLevel = GpioLevel::High;
pub const LOW: GpioLevel = GpioLevel::Low;
pub const IN: GpioDirection = GpioDirection::Input;
pub const OUT: GpioDirection = GpioDirection::Output;
pub const PULL_UP: GpioPull = GpioPull::Up;
pub const PULL_DOWN: GpioPull = GpioPull::Down;
pub const PULL_NONE: GpioPull = GpioPull::None;

impl GpioLevel {
    /// Level of a single select-line bit.
    #[inline]
    pub fn from_bit(bit: u8) -> Self {
        if bit & 1 != 0 {
            GpioLevel::High
        } else {
            GpioLevel::Low
        }
    }

    #[inline]
    pub fn is_high(self) -> bool {
        self == GpioLevel::High
    }
}

impl From<bool> for GpioLevel {
    fn from(high: bool) -> Self {
        if high {
            GpioLevel::High
        } else {
            GpioLevel::Low
        }
    }
}

impl fmt::Display for GpioDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GpioDirection::Input => "IN",
            GpioDirection::Output => "OUT",
        })
    }
}

impl fmt::Display for GpioPull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GpioPull::None => "PULL_NONE",
            GpioPull::Up => "PULL_UP",
            GpioPull::Down => "PULL_DOWN",
        })
    }
}

/// A pin number in the extended address space (0-255).
///
/// Values below the registry threshold are physical pins; values at or above
/// it are resolved through a multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PinId(pub(crate) u8);

impl PinId {
    #[inline]
    pub const fn new(pin_num: u8) -> Self {
        PinId(pin_num)
    }

    /// Returns the underlying pin number.
    #[inline]
    pub fn number(&self) -> u8 {
        self.0
    }

    /// True when this id must be resolved through a multiplexer.
    #[inline]
    pub fn is_extended(&self, threshold: u8) -> bool {
        self.0 >= threshold
    }
}

impl From<u8> for PinId {
    fn from(pin_num: u8) -> Self {
        PinId(pin_num)
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversion into a [`PinId`], rejecting values that are not integral 0-255.
///
/// Implemented for the integer types and `f64` so that loosely typed callers
/// (e.g. pin numbers parsed from a config file) get an
/// [`Error::InvalidChannelType`] instead of a silent truncation.
pub trait IntoPinId {
    fn into_pin_id(self) -> Result<PinId>;
}

impl IntoPinId for PinId {
    fn into_pin_id(self) -> Result<PinId> {
        Ok(self)
    }
}

impl IntoPinId for u8 {
    fn into_pin_id(self) -> Result<PinId> {
        Ok(PinId(self))
    }
}

macro_rules! impl_into_pin_id_for_int {
    ($($t:ty),*) => {
        $(
            impl IntoPinId for $t {
                fn into_pin_id(self) -> Result<PinId> {
                    u8::try_from(self).map(PinId).map_err(|_| {
                        Error::InvalidChannelType(format!(
                            "pin {} does not fit an 8-bit pin id",
                            self
                        ))
                    })
                }
            }
        )*
    };
}

impl_into_pin_id_for_int!(u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl IntoPinId for f64 {
    fn into_pin_id(self) -> Result<PinId> {
        if self.fract() != 0.0 || !(0.0..=255.0).contains(&self) {
            return Err(Error::InvalidChannelType(format!(
                "pin {} is not an integral 8-bit pin id",
                self
            )));
        }
        Ok(PinId(self as u8))
    }
}
