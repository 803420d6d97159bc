//! # gpio-mux-extender
//!
//! Extends a board's GPIO address space with analog multiplexers (74HC4051
//! style, 8 channels on three select lines, or 4 channels on two). Pin ids
//! below a threshold (40 by default) are physical pins and pass straight
//! through; ids at or above it are routed through a multiplexer bank, which
//! drives its select lines to the channel's binary address before the shared
//! physical pin is read or written.
//!
//! ## Features
//!
//! *   One facade ([`PinRegistry`]) with `setup`, `read` and `write` over both
//!     address spaces.
//! *   Up to two banks with configurable select lines and id ranges.
//! *   Sparse channel maps: unmapped channels are never selected.
//! *   Per-channel reconfiguration of a shared physical pin, enabled only when
//!     channels on that pin differ in direction or pull.
//! *   Any GPIO backend through the [`PhysicalPort`] trait. Included are an
//!     in-memory [`SimulatedPort`] and [`Xr2280xPort`], which drives the EDGE
//!     pins of an Exar XR2280x USB bridge via `hidapi`.
//!
//! ## Limitations
//!
//! *   Not internally synchronized: select-then-access is two port operations.
//!     Share a registry between threads behind a mutex.
//! *   Whether a bank needs per-channel setup is decided once, at
//!     construction. Later `setup` calls that introduce a mixed mode are
//!     logged but do not change that decision.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use gpio_mux_extender::{PinRegistry, RegistryConfig, Result, Xr2280xPort, HIGH, OUT, PULL_NONE};
//! use hidapi::HidApi;
//!
//! fn main() -> Result<()> {
//!     let hid_api = HidApi::new()?;
//!     let port = Xr2280xPort::open_first(&hid_api)?;
//!
//!     // Rotary switch on ids 40-44, LED buttons on 80-83.
//!     let mut gpio = PinRegistry::new(port, RegistryConfig::default())?;
//!
//!     // Extended ids read through the multiplexer...
//!     if gpio.read(41)?.is_high() {
//!         gpio.write(82, HIGH)?;
//!     }
//!
//!     // ...physical ids go straight to the port.
//!     gpio.setup(5, OUT, PULL_NONE)?;
//!     gpio.write(5, HIGH)?;
//!     Ok(())
//! }
//! ```

mod consts;
mod error;
pub mod config;
pub mod gpio;
pub mod hid_port;
pub mod multiplexer;
pub mod port;
pub mod registry;
pub mod selector;
pub mod sim;

pub use config::{BankConfig, RegistryConfig, DEFAULT_THRESHOLD};
pub use consts::{EXAR_VID, XR2280X_EDGE_PID};
pub use error::{Error, Result};
pub use gpio::{
    GpioDirection, GpioLevel, GpioPull, IntoPinId, PinId, HIGH, IN, LOW, OUT, PULL_DOWN,
    PULL_NONE, PULL_UP,
};
pub use hid_port::Xr2280xPort;
pub use multiplexer::{BankId, Multiplexer, PinDescriptor};
pub use port::PhysicalPort;
pub use registry::{PinRegistry, PinSetup, Route};
pub use selector::{ChannelSelectLines, ChannelSelector};
pub use sim::{PortCall, SimulatedPort};
