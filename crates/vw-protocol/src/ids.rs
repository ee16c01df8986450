//! CAN identifiers for the Volkswagen cluster families.
//!
//! MQB names follow the factory message names. Identifiers marked
//! "unconfirmed" were taken from a single donor-car capture and have not been
//! cross-checked against a second vehicle.

/// MQB powertrain and comfort identifiers.
pub mod mqb {
    pub const ESP_20: u16 = 0x65D;
    pub const ESP_21: u16 = 0x0FD;
    pub const ESP_24: u16 = 0x31B;
    pub const TSK_07: u16 = 0x31E;
    pub const LH_EPS_01: u16 = 0x32A;
    pub const MOTOR_CODE_01: u16 = 0x641;
    pub const MOTOR_04: u16 = 0x107;
    pub const MOTOR_07: u16 = 0x640;
    pub const MOTOR_09: u16 = 0x647;
    pub const MOTOR_14: u16 = 0x3BE;
    pub const AIRBAG_01: u16 = 0x040;
    pub const KLEMMEN_STATUS_01: u16 = 0x3C0;
    pub const DIMMUNG_01: u16 = 0x5F0;
    pub const BLINKMODI_02: u16 = 0x366;
    pub const LICHT_ANF: u16 = 0x3D5;
    pub const LICHT_VORNE_01: u16 = 0x658;
    pub const LICHT_HINTEN_01: u16 = 0x3D6;
    pub const DOOR_STATUS: u16 = 0x3D0;
    pub const PARK_BRAKE: u16 = 0x30D;
    pub const ESP_10: u16 = 0x116;
    pub const ESP_02: u16 = 0x101;
    /// Body controller status. Blocking it clears the brake-fluid warning.
    pub const BCM_01: u16 = 0x65A;
    pub const SWA_01: u16 = 0x30F;
    /// Multifunction steering wheel buttons.
    pub const MFSW: u16 = 0x5BF;
    /// Unconfirmed.
    pub const WBA_03: u16 = 0x394;
    /// Unconfirmed.
    pub const GATEWAY_76: u16 = 0x3DB;
    /// Unconfirmed.
    pub const RKA_01: u16 = 0x5A7;
    /// Unconfirmed.
    pub const TPMS: u16 = 0x5F9;
    /// Unconfirmed.
    pub const OUTDOOR_TEMP: u16 = 0x5E1;
    /// Unconfirmed.
    pub const MOTOR_18: u16 = 0x670;
    /// Unconfirmed.
    pub const MOTOR_26: u16 = 0x3C7;
}

/// PQ25 and PQ46 identifiers. PQ46 adds the lights, dimming and steering
/// wheel frames.
pub mod pq {
    pub const IMMOBILIZER: u16 = 0x3D0;
    pub const INDICATORS: u16 = 0x470;
    pub const DIESEL_ENGINE: u16 = 0x480;
    pub const RPM: u16 = 0x280;
    pub const SPEED: u16 = 0x5A0;
    pub const ABS: u16 = 0x1A0;
    pub const AIRBAG: u16 = 0x050;
    pub const GEAR: u16 = 0x540;
    pub const LIGHTS: u16 = 0x531;
    pub const DIMMUNG: u16 = 0x635;
    pub const STEERING_WHEEL_BUTTONS: u16 = 0x5C1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_standard_ids() {
        for id in [
            mqb::ESP_20,
            mqb::ESP_21,
            mqb::WBA_03,
            mqb::MFSW,
            pq::DIMMUNG,
            pq::STEERING_WHEEL_BUTTONS,
        ] {
            assert!(id <= 0x7FF, "{id:#X} is not an 11-bit identifier");
        }
    }

    #[test]
    fn pq_immobilizer_shares_the_mqb_door_id() {
        // Different buses, same number: never bridge PQ and MQB traffic.
        assert_eq!(pq::IMMOBILIZER, mqb::DOOR_STATUS);
    }
}
