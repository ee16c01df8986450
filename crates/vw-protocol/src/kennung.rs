//! Data-ID (Kennung) tables for MQB end-to-end protected frames.
//!
//! Each table is indexed by the 4-bit sequence counter. Values are opaque:
//! they are matched against the cluster firmware, not derived.
//!
//! Tables marked placeholder were not taken from a capture. They are the
//! defaults of [`crate::MqbTables`] and can be replaced per cluster from the
//! run config. If a gauge drops to zero with a fault lamp, suspect them first.

use opencluster_crc::e2e::Kennung;

pub const ESP_20: Kennung = [
    0xAC, 0xB3, 0xAB, 0xEB, 0x7A, 0xE1, 0x3B, 0xF7, 0x73, 0xBA, 0x7C, 0x9E, 0xAE, 0xAE, 0xAE, 0xAE,
];

pub const ESP_21: Kennung = [
    0xB4, 0xEF, 0xF8, 0x49, 0x1E, 0xE5, 0xC2, 0xC0, 0x97, 0x19, 0x3C, 0xC9, 0xF1, 0x98, 0xD6, 0x61,
];

pub const KLEMMEN_STATUS_01: Kennung = [0xC3; 16];

pub const AIRBAG_01: Kennung = [0x40; 16];

pub const SWA_01: Kennung = [0x0C; 16];

/// Placeholder.
pub const TSK_07: Kennung = [0x8A; 16];

/// Placeholder.
pub const LH_EPS_01: Kennung = [0x1F; 16];

/// Placeholder.
pub const MOTOR_CODE_01: Kennung = [0x47; 16];

/// Placeholder.
pub const ESP_24: Kennung = [0x5A; 16];

/// Placeholder.
pub const WBA_03: Kennung = [0x2B; 16];

/// Placeholder.
pub const LICHT_ANF: Kennung = [0x32; 16];
