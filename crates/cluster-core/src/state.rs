//! Normalized vehicle state shared by every cluster encoder.

use serde::{Deserialize, Serialize};

/// Gear shown on the cluster.
///
/// Ten manual positions plus the five automatic selector positions. The
/// numeric code (1..=15) is the order used by telemetry sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GearState {
    #[serde(alias = "1")]
    Manual1,
    #[serde(alias = "2")]
    Manual2,
    #[serde(alias = "3")]
    Manual3,
    #[serde(alias = "4")]
    Manual4,
    #[serde(alias = "5")]
    Manual5,
    #[serde(alias = "6")]
    Manual6,
    #[serde(alias = "7")]
    Manual7,
    #[serde(alias = "8")]
    Manual8,
    #[serde(alias = "9")]
    Manual9,
    #[serde(alias = "10")]
    Manual10,
    #[default]
    #[serde(alias = "P")]
    AutoP,
    #[serde(alias = "R")]
    AutoR,
    #[serde(alias = "N")]
    AutoN,
    #[serde(alias = "D")]
    AutoD,
    #[serde(alias = "S")]
    AutoS,
}

impl GearState {
    /// Every gear, in code order.
    pub const ALL: [GearState; 15] = [
        Self::Manual1,
        Self::Manual2,
        Self::Manual3,
        Self::Manual4,
        Self::Manual5,
        Self::Manual6,
        Self::Manual7,
        Self::Manual8,
        Self::Manual9,
        Self::Manual10,
        Self::AutoP,
        Self::AutoR,
        Self::AutoN,
        Self::AutoD,
        Self::AutoS,
    ];

    /// Generic gear code, 1..=15.
    pub const fn code(self) -> u8 {
        match self {
            Self::Manual1 => 1,
            Self::Manual2 => 2,
            Self::Manual3 => 3,
            Self::Manual4 => 4,
            Self::Manual5 => 5,
            Self::Manual6 => 6,
            Self::Manual7 => 7,
            Self::Manual8 => 8,
            Self::Manual9 => 9,
            Self::Manual10 => 10,
            Self::AutoP => 11,
            Self::AutoR => 12,
            Self::AutoN => 13,
            Self::AutoD => 14,
            Self::AutoS => 15,
        }
    }

    /// Zero-based position in [`GearState::ALL`].
    pub const fn index(self) -> usize {
        self.code() as usize - 1
    }

    /// Gear for a generic code, if it is in range.
    pub fn from_code(code: u8) -> Option<Self> {
        code.checked_sub(1)
            .and_then(|i| Self::ALL.get(usize::from(i)))
            .copied()
    }

    /// Manual gear number, if this is a manual position.
    pub const fn manual_number(self) -> Option<u8> {
        match self.code() {
            n @ 1..=10 => Some(n),
            _ => None,
        }
    }

    /// Short display label ("1".."10", "P", "R", "N", "D", "S").
    pub fn label(self) -> &'static str {
        const LABELS: [&str; 15] = [
            "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "P", "R", "N", "D", "S",
        ];
        LABELS.get(self.index()).copied().unwrap_or("?")
    }
}

/// BMW-style driving experience mode, codes 1..=7.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    Traction,
    ComfortPlus,
    #[default]
    Comfort,
    Sport,
    SportPlus,
    DscOff,
    EcoPro,
}

impl DriveMode {
    /// Wire code for the mode.
    pub const fn code(self) -> u8 {
        match self {
            Self::Traction => 1,
            Self::ComfortPlus => 2,
            Self::Comfort => 3,
            Self::Sport => 4,
            Self::SportPlus => 5,
            Self::DscOff => 6,
            Self::EcoPro => 7,
        }
    }

    /// Mode for a wire code.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Traction),
            2 => Some(Self::ComfortPlus),
            3 => Some(Self::Comfort),
            4 => Some(Self::Sport),
            5 => Some(Self::SportPlus),
            6 => Some(Self::DscOff),
            7 => Some(Self::EcoPro),
            _ => None,
        }
    }
}

/// Everything a cluster might display.
///
/// Telemetry sources and the control UI write it; encoders read one snapshot
/// per control-loop tick. `button_event` is a single-slot mailbox: a second
/// press before the first is consumed overwrites it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleState {
    /// km/h.
    pub speed: u32,
    pub rpm: u32,
    pub gear: GearState,
    /// °C.
    pub coolant_temperature: i32,
    /// °C.
    pub oil_temperature: i32,
    /// Percent, 0..=100.
    pub fuel_quantity: u8,
    /// Percent, 0..=100.
    pub backlight_brightness: u8,
    pub ignition: bool,
    pub handbrake: bool,
    pub main_lights: bool,
    pub high_beam: bool,
    pub front_fog_light: bool,
    pub rear_fog_light: bool,
    pub left_turning_indicator: bool,
    pub right_turning_indicator: bool,
    pub turning_indicators_blinking: bool,
    pub door_open: bool,
    pub abs_light: bool,
    pub offroad_light: bool,
    pub battery_light: bool,
    /// °C.
    pub outdoor_temperature: i32,
    pub drive_mode: DriveMode,
    /// Pending steering-wheel button code, 0 when none.
    pub button_event: u8,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            speed: 0,
            rpm: 0,
            gear: GearState::AutoP,
            coolant_temperature: 100,
            oil_temperature: 90,
            fuel_quantity: 100,
            backlight_brightness: 100,
            ignition: true,
            handbrake: false,
            main_lights: true,
            high_beam: false,
            front_fog_light: false,
            rear_fog_light: false,
            left_turning_indicator: false,
            right_turning_indicator: false,
            turning_indicators_blinking: false,
            door_open: false,
            abs_light: false,
            offroad_light: false,
            battery_light: false,
            outdoor_temperature: 20,
            drive_mode: DriveMode::Comfort,
            button_event: 0,
        }
    }
}

impl VehicleState {
    /// Take the pending button event, leaving the mailbox empty.
    pub fn take_button_event(&mut self) -> Option<u8> {
        match std::mem::take(&mut self.button_event) {
            0 => None,
            code => Some(code),
        }
    }

    /// Either turn indicator is requested.
    pub fn any_turn_indicator(&self) -> bool {
        self.left_turning_indicator || self.right_turning_indicator
    }

    /// Any exterior light is on.
    pub fn any_light(&self) -> bool {
        self.main_lights || self.high_beam || self.front_fog_light || self.rear_fog_light
    }
}
