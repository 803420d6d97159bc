use crate::multiplexer::BankId;
use thiserror::Error;

/// Errors that can occur when configuring or driving extended GPIO pins.
///
/// Covers malformed pin identifiers, registry configuration problems, and
/// failures reported by the underlying physical port. Physical-port failures
/// are passed through unchanged; nothing in this crate retries them.
#[derive(Error, Debug)]
pub enum Error {
    /// A pin identifier or channel value was not an integral 0-255 value.
    #[error("Invalid channel type: {0}")]
    InvalidChannelType(String),
    /// The decoded channel has no descriptor in its bank.
    #[error("No pin descriptor mapped to channel {channel} of {bank}")]
    UnmappedChannel {
        /// The bank the pin decoded to.
        bank: BankId,
        /// The channel within that bank.
        channel: u8,
    },
    /// The pin falls in a bank range, but no multiplexer was built for that bank.
    #[error("Pin {pin} belongs to {bank}, but no multiplexer is configured for it")]
    UnmappedBank {
        /// The extended pin that was requested.
        pin: u8,
        /// The bank whose range contains the pin.
        bank: BankId,
    },
    /// The extended pin is not covered by any bank range.
    #[error("Extended pin {pin} is outside every configured bank range")]
    PinOutOfRange {
        /// The extended pin that was requested.
        pin: u8,
    },
    /// The channel cannot be addressed with the bank's select lines.
    #[error(
        "Channel {channel} of {bank} is out of range (select lines address {capacity} channels)"
    )]
    ChannelOutOfRange {
        /// The bank the channel was decoded for.
        bank: BankId,
        /// The offending channel.
        channel: u8,
        /// Number of channels the select lines can address (4 or 8).
        capacity: u8,
    },
    /// Two pin descriptors share the same extended id.
    #[error("Extended pin {pin} is described more than once")]
    DuplicatePin {
        /// The duplicated extended pin.
        pin: u8,
    },
    /// The registry configuration is inconsistent.
    #[error("Invalid registry configuration: {0}")]
    InvalidConfig(String),
    /// Failure reported by a third-party physical port implementation.
    #[error("Physical port error: {0}")]
    Port(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Error from the underlying HID API layer (XR2280x backend).
    #[error("HID API error: {0}")]
    Hid(#[from] hidapi::HidError),
    /// No XR2280x EDGE interface was found.
    #[error("Device not found with specified VID/PID")]
    DeviceNotFound,
    /// HID feature report operation failed.
    #[error(
        "Feature report error (e.g., incorrect length, device error) while accessing register 0x{reg_addr:04X}"
    )]
    FeatureReportError {
        /// The register address that was being accessed.
        reg_addr: u16,
    },
    /// Physical pin number is outside the range a backend supports.
    #[error("GPIO pin {pin} argument out of range: {message}")]
    PinArgumentOutOfRange {
        /// The invalid pin number that was specified.
        pin: u8,
        /// Detailed error message explaining the constraint.
        message: String,
    },
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wraps an arbitrary backend error as [`Error::Port`].
    pub fn port<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Port(err.into())
    }
}

pub(crate) fn invalid_config(message: impl Into<String>) -> Error {
    Error::InvalidConfig(message.into())
}

pub(crate) fn unsupported_xr_pin(pin: u8, gpio_count: u8) -> Error {
    Error::PinArgumentOutOfRange {
        pin,
        message: format!("this XR2280x model exposes only {} GPIOs", gpio_count),
    }
}
