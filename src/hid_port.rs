//! [`PhysicalPort`] backed by the EDGE GPIO controller of an Exar XR2280x
//! USB bridge, accessed through HID feature reports.
//!
//! XR22800/1 expose 8 EDGE pins (E0-E7), XR22802/4 expose 32 split over two
//! 16-bit register groups. The count is detected when the device is opened.
//! **Note:** The handle is not thread-safe (`!Send`, `!Sync`).

use crate::consts::{self, edge};
use crate::error::{unsupported_xr_pin, Error, Result};
use crate::gpio::{GpioDirection, GpioLevel, GpioPull};
use crate::port::PhysicalPort;
use hidapi::{HidApi, HidDevice};
use log::{debug, trace, warn};
use std::ffi::CStr;

/// One EDGE register pair, group 0 and group 1.
#[derive(Debug, Clone, Copy)]
struct RegPair(u16, u16);

const FUNC_SEL: RegPair = RegPair(edge::REG_FUNC_SEL_0, edge::REG_FUNC_SEL_1);
const DIR: RegPair = RegPair(edge::REG_DIR_0, edge::REG_DIR_1);
const SET: RegPair = RegPair(edge::REG_SET_0, edge::REG_SET_1);
const CLEAR: RegPair = RegPair(edge::REG_CLEAR_0, edge::REG_CLEAR_1);
const STATE: RegPair = RegPair(edge::REG_STATE_0, edge::REG_STATE_1);
const PULL_UP: RegPair = RegPair(edge::REG_PULL_UP_0, edge::REG_PULL_UP_1);
const PULL_DOWN: RegPair = RegPair(edge::REG_PULL_DOWN_0, edge::REG_PULL_DOWN_1);

/// Register address and bit mask addressing `pin` within `regs`.
#[inline]
fn pin_reg(pin: u8, regs: RegPair) -> (u16, u16) {
    let reg = if pin < 16 { regs.0 } else { regs.1 };
    (reg, 1u16 << (pin % 16))
}

/// New register value with the `mask` bits set or cleared.
#[inline]
fn apply_bit(current: u16, mask: u16, set: bool) -> u16 {
    if set {
        current | mask
    } else {
        current & !mask
    }
}

/// A handle to an opened XR2280x EDGE interface.
#[derive(Debug)]
pub struct Xr2280xPort {
    device: HidDevice,
    gpio_count: u8,
}

impl Xr2280xPort {
    /// Opens the first EDGE interface with the default Exar VID/PID.
    /// **Warning:** Ambiguous if multiple devices exist.
    pub fn open_first(hid_api: &HidApi) -> Result<Self> {
        let info = hid_api
            .device_list()
            .find(|d| {
                d.vendor_id() == consts::EXAR_VID && d.product_id() == consts::XR2280X_EDGE_PID
            })
            .ok_or(Error::DeviceNotFound)?;
        Self::open_by_path(hid_api, info.path())
    }

    /// Opens a device by its Vendor ID and Product ID.
    pub fn open_by_vid_pid(hid_api: &HidApi, vid: u16, pid: u16) -> Result<Self> {
        Self::open_internal(hid_api.open(vid, pid)?)
    }

    /// Opens a device by its platform-specific path.
    pub fn open_by_path(hid_api: &HidApi, path: &CStr) -> Result<Self> {
        Self::open_internal(hid_api.open_path(path)?)
    }

    fn open_internal(device: HidDevice) -> Result<Self> {
        let mut port = Self {
            device,
            gpio_count: 8,
        };
        // Group 1 registers only answer on the 32-pin parts.
        match port.read_hid_register(edge::REG_FUNC_SEL_1) {
            Ok(_) => port.gpio_count = 32,
            Err(Error::FeatureReportError { .. }) => {}
            Err(e) => {
                warn!("Error during capability detection: {}", e);
                return Err(e);
            }
        }
        debug!("Opened XR2280x EDGE interface with {} GPIOs", port.gpio_count);
        Ok(port)
    }

    /// Number of EDGE pins the device exposes (8 or 32).
    pub fn gpio_count(&self) -> u8 {
        self.gpio_count
    }

    fn check_pin(&self, pin: u8) -> Result<()> {
        if pin >= self.gpio_count {
            Err(unsupported_xr_pin(pin, self.gpio_count))
        } else {
            Ok(())
        }
    }

    // --- Register Access ---
    fn write_hid_register(&self, reg_addr: u16, value: u16) -> Result<()> {
        let [addr_lo, addr_hi] = reg_addr.to_le_bytes();
        let [val_lo, val_hi] = value.to_le_bytes();
        let buf = [
            consts::REPORT_ID_WRITE_HID_REGISTER,
            addr_lo,
            addr_hi,
            val_lo,
            val_hi,
        ];
        trace!("Write Reg 0x{:04X} = 0x{:04X}", reg_addr, value);
        self.device.send_feature_report(&buf).map_err(|e| {
            trace!("send_feature_report error: {}", e);
            Error::FeatureReportError { reg_addr }
        })
    }

    fn read_hid_register(&self, reg_addr: u16) -> Result<u16> {
        let [addr_lo, addr_hi] = reg_addr.to_le_bytes();
        let select = [consts::REPORT_ID_SET_HID_READ_ADDRESS, addr_lo, addr_hi];
        self.device.send_feature_report(&select).map_err(|e| {
            trace!("send_feature_report error: {}", e);
            Error::FeatureReportError { reg_addr }
        })?;

        let mut buf = [consts::REPORT_ID_READ_HID_REGISTER, 0, 0];
        match self.device.get_feature_report(&mut buf) {
            Ok(len) if len == buf.len() && buf[0] == consts::REPORT_ID_READ_HID_REGISTER => {
                let value = u16::from_le_bytes([buf[1], buf[2]]);
                trace!("Read Reg 0x{:04X} = 0x{:04X}", reg_addr, value);
                Ok(value)
            }
            Ok(len) => {
                warn!(
                    "get_feature_report returned {} bytes with report ID {:02X}",
                    len, buf[0]
                );
                Err(Error::FeatureReportError { reg_addr })
            }
            Err(e) => {
                trace!("get_feature_report error: {}", e);
                Err(Error::FeatureReportError { reg_addr })
            }
        }
    }

    /// Read-modify-write of one bit, skipped when already in place.
    fn update_bit(&self, pin: u8, regs: RegPair, set: bool) -> Result<()> {
        let (reg, mask) = pin_reg(pin, regs);
        let current = self.read_hid_register(reg)?;
        let new_val = apply_bit(current, mask, set);
        if new_val != current {
            self.write_hid_register(reg, new_val)?;
        } else {
            trace!("Reg 0x{:04X} pin {} already {}", reg, pin, set);
        }
        Ok(())
    }
}

impl PhysicalPort for Xr2280xPort {
    fn configure(&mut self, pin: u8, direction: GpioDirection, pull: GpioPull) -> Result<()> {
        self.check_pin(pin)?;
        debug!("Configuring EDGE pin {}: {} {}", pin, direction, pull);
        self.update_bit(pin, FUNC_SEL, true)?;
        self.update_bit(pin, DIR, direction == GpioDirection::Output)?;
        // Clear the opposite resistor first so both are never enabled together.
        match pull {
            GpioPull::Up => {
                self.update_bit(pin, PULL_DOWN, false)?;
                self.update_bit(pin, PULL_UP, true)
            }
            GpioPull::Down => {
                self.update_bit(pin, PULL_UP, false)?;
                self.update_bit(pin, PULL_DOWN, true)
            }
            GpioPull::None => {
                self.update_bit(pin, PULL_UP, false)?;
                self.update_bit(pin, PULL_DOWN, false)
            }
        }
    }

    fn write(&mut self, pin: u8, level: GpioLevel) -> Result<()> {
        self.check_pin(pin)?;
        let regs = match level {
            GpioLevel::High => SET,
            GpioLevel::Low => CLEAR,
        };
        let (reg, mask) = pin_reg(pin, regs);
        trace!("Setting EDGE pin {} {:?} (0x{:04X} -> 0x{:04X})", pin, level, mask, reg);
        self.write_hid_register(reg, mask)
    }

    fn read(&mut self, pin: u8) -> Result<GpioLevel> {
        self.check_pin(pin)?;
        let (reg, mask) = pin_reg(pin, STATE);
        let value = self.read_hid_register(reg)?;
        Ok(GpioLevel::from(value & mask != 0))
    }
}
