//! CAN identifiers, checksum constants and fixed K-bus frames.
//!
//! All values were captured from running vehicles. The F-series final XOR
//! constants in particular have no known derivation; treat them as opaque.

/// BMW F-series (and Mini F5x) frame identifiers.
///
/// Never send 0x380: the cluster reads it as the VIN.
pub mod f_series {
    pub const IGNITION: u16 = 0x12F;
    pub const SPEED: u16 = 0x1A1;
    pub const RPM_GEAR: u16 = 0x0F3;
    pub const TRANSMISSION: u16 = 0x3FD;
    pub const ABS: u16 = 0x36E;
    pub const ALIVE_COUNTER: u16 = 0x0D7;
    pub const STEERING_COLUMN: u16 = 0x2A7;
    pub const CRUISE: u16 = 0x289;
    pub const RESTRAINT: u16 = 0x19B;
    pub const SEATBELT: u16 = 0x297;
    pub const TPMS: u16 = 0x369;
    pub const OIL: u16 = 0x3F9;
    /// Shared by the engine temperature and MPG frames.
    pub const ENGINE_TEMP: u16 = 0x2C4;
    pub const MPG: u16 = 0x2C4;
    pub const MPG_DISTANCE: u16 = 0x2BB;
    pub const PARK_BRAKE: u16 = 0x36F;
    pub const FUEL: u16 = 0x349;
    pub const CHECK_CONTROL: u16 = 0x5C0;
    pub const LIGHTS: u16 = 0x21A;
    pub const BLINKERS: u16 = 0x1F6;
    pub const BACKLIGHT: u16 = 0x202;
    pub const DRIVE_MODE: u16 = 0x3A7;
    pub const STEERING_WHEEL_BUTTONS: u16 = 0x1EE;
}

/// Final XOR applied by CRC-8/SAE-J1850 for each F-series frame.
pub mod f_series_xor {
    pub const IGNITION: u8 = 0x44;
    pub const SPEED: u8 = 0xA9;
    pub const RPM_GEAR: u8 = 0x7A;
    pub const TRANSMISSION: u8 = 0xD6;
    pub const ABS: u8 = 0xD8;
    pub const STEERING_COLUMN: u8 = 0x9E;
    pub const CRUISE: u8 = 0x82;
    pub const RESTRAINT: u8 = 0xFF;
    pub const SEATBELT: u8 = 0x28;
    pub const TPMS: u8 = 0xC5;
    pub const OIL: u8 = 0xF1;
    pub const ENGINE_TEMP: u8 = 0xB2;
    pub const MPG: u8 = 0xC6;
    pub const MPG_DISTANCE: u8 = 0xDE;
    pub const PARK_BRAKE: u8 = 0x17;
    pub const DRIVE_MODE: u8 = 0x4A;
}

/// Check-control message numbers carried in byte 1 of 0x5C0.
pub mod check_control {
    pub const DOOR_OPEN: u8 = 0x0F;
    pub const PARK_BRAKE_RED: u8 = 71;
    pub const DSC: u8 = 215;
    /// Byte 3 value that raises the message.
    pub const ASSERT: u8 = 0x29;
    /// Byte 3 value that clears the message.
    pub const CLEAR: u8 = 0x28;
}

/// BMW E8x/E9x frame identifiers.
pub mod e_series {
    pub const IGNITION: u16 = 0x130;
    pub const RPM: u16 = 0x0AA;
    pub const WHEEL_SPEED: u16 = 0x1A6;
    pub const STEERING_WHEEL: u16 = 0x0C4;
    pub const AIRBAG_COUNTER: u16 = 0x0D7;
    pub const ABS_COUNTER: u16 = 0x0C0;
    pub const ABS: u16 = 0x19E;
    pub const GEAR: u16 = 0x1D2;
    pub const LIGHTS: u16 = 0x21A;
    pub const ENGINE_TEMP: u16 = 0x1D0;
    pub const HANDBRAKE: u16 = 0x34F;
    pub const BACKLIGHT: u16 = 0x202;
    pub const BLINKERS: u16 = 0x1F6;
    pub const STEERING_WHEEL_BUTTONS: u16 = 0x1EE;
    pub const DATE_TIME: u16 = 0x39E;
}

/// BMW E46 powertrain frame identifiers.
pub mod e46 {
    /// DME1: engine speed.
    pub const DME1: u16 = 0x316;
    /// DME2: coolant temperature.
    pub const DME2: u16 = 0x329;
    /// DME4: consumption and warning lamps.
    pub const DME4: u16 = 0x545;
    /// ASC1: traction intervention lamp.
    pub const ASC1: u16 = 0x153;
    /// ASC3: keeps ABS and ASC lamps off on late clusters.
    pub const ASC3: u16 = 0x1F3;
    /// EGS1: automatic gearbox display.
    pub const EGS1: u16 = 0x43F;
}

/// Fixed K-bus frames sent to the E46 instrument cluster (IKE).
pub mod kbus {
    /// Forces the backlight on for 2004+ clusters.
    pub const BACKLIGHT_ON: [u8; 9] = [0xD0, 0x07, 0xBF, 0x5C, 0xA8, 0x2A, 0xFF, 0x00, 0x49];
    /// Sets a clock time so the display is not blank.
    pub const SET_TIME: [u8; 8] = [0x3B, 0x06, 0x80, 0x40, 0x01, 0x0C, 0x3B, 0xCB];
    /// Header of the light-control frame; data bytes and checksum follow.
    pub const LIGHT_CONTROL_HEADER: [u8; 4] = [0xD0, 0x08, 0xBF, 0x5B];
}
