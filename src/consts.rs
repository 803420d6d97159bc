//! XR2280x register addresses used by the EDGE-backed physical port.

// Default Vendor/Product IDs
/// Exar Corporation vendor ID for XR2280x devices.
pub const EXAR_VID: u16 = 0x04E2;
/// Product ID for the XR2280x EDGE (GPIO) HID interface (common for XR22800/1/2/4).
pub const XR2280X_EDGE_PID: u16 = 0x1200;

// --- Feature Reports (Control Transfer) ---
pub const REPORT_ID_WRITE_HID_REGISTER: u8 = 0x3C;
pub const REPORT_ID_SET_HID_READ_ADDRESS: u8 = 0x4B;
pub const REPORT_ID_READ_HID_REGISTER: u8 = 0x5A;

pub mod edge {
    // Group 0 (E0-E15). XR22800/1 only use bits 0-7 via HID.
    pub const REG_FUNC_SEL_0: u16 = 0x03C0;
    pub const REG_DIR_0: u16 = 0x03C1;
    pub const REG_SET_0: u16 = 0x03C2;
    pub const REG_CLEAR_0: u16 = 0x03C3;
    pub const REG_STATE_0: u16 = 0x03C4;
    pub const REG_PULL_UP_0: u16 = 0x03C7;
    pub const REG_PULL_DOWN_0: u16 = 0x03C8;

    // Group 1 (E16-E31), XR22802/4 only.
    pub const REG_FUNC_SEL_1: u16 = 0x03CC;
    pub const REG_DIR_1: u16 = 0x03CD;
    pub const REG_SET_1: u16 = 0x03CE;
    pub const REG_CLEAR_1: u16 = 0x03CF;
    pub const REG_STATE_1: u16 = 0x03D0;
    pub const REG_PULL_UP_1: u16 = 0x03D3;
    pub const REG_PULL_DOWN_1: u16 = 0x03D4;
}
