//! The contract every cluster encoder implements.

use core::fmt;
use core::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::frame::CanFrame;
use crate::state::VehicleState;

/// Supported cluster families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    /// BMW E8x/E9x.
    BmwE,
    BmwE46,
    /// BMW F-series, including the Mini F5x variant.
    BmwF,
    VwMqb,
    VwPq25,
    VwPq46,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Self::BmwE,
        Self::BmwE46,
        Self::BmwF,
        Self::VwMqb,
        Self::VwPq25,
        Self::VwPq46,
    ];

    /// Stable identifier used on the command line and in config files.
    pub const fn name(self) -> &'static str {
        match self {
            Self::BmwE => "bmw-e",
            Self::BmwE46 => "bmw-e46",
            Self::BmwF => "bmw-f",
            Self::VwMqb => "vw-mqb",
            Self::VwPq25 => "vw-pq25",
            Self::VwPq46 => "vw-pq46",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::BmwE => "BMW E8x/E9x (CAN)",
            Self::BmwE46 => "BMW E46 (CAN, K-bus, speed tone)",
            Self::BmwF => "BMW F-series and Mini F5x (CAN, CRC8)",
            Self::VwMqb => "VW MQB (CAN, rolling E2E checksums)",
            Self::VwPq25 => "VW PQ25 (CAN, discrete lines)",
            Self::VwPq46 => "VW PQ46 (CAN, discrete lines)",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let platform = match normalized.as_str() {
            "bmw-e" | "e" | "e90" | "e-series" => Self::BmwE,
            "bmw-e46" | "e46" => Self::BmwE46,
            "bmw-f" | "f" | "f-series" | "mini" => Self::BmwF,
            "vw-mqb" | "mqb" => Self::VwMqb,
            "vw-pq25" | "pq25" => Self::VwPq25,
            "vw-pq46" | "pq46" => Self::VwPq46,
            _ => return Err(ConfigError::UnknownPlatform(s.to_string())),
        };
        Ok(platform)
    }
}

/// A cluster encoder.
///
/// `update` is called once per control-loop iteration with the current
/// snapshot. It gates its own fast and slow work on `now`, so calling it more
/// often than the platform cadence is harmless. Encoders consume
/// `state.button_event` by zeroing it.
pub trait ClusterEncoder {
    fn platform(&self) -> Platform;

    /// Emit whatever is due at `now`.
    fn update(&mut self, state: &mut VehicleState, now: Instant);

    /// Offer a frame received from a donor bus. Only bridging encoders act
    /// on it.
    fn handle_inbound(&mut self, _frame: &CanFrame) {}
}

impl<T: ClusterEncoder + ?Sized> ClusterEncoder for Box<T> {
    fn platform(&self) -> Platform {
        (**self).platform()
    }

    fn update(&mut self, state: &mut VehicleState, now: Instant) {
        (**self).update(state, now);
    }

    fn handle_inbound(&mut self, frame: &CanFrame) {
        (**self).handle_inbound(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn names_parse_back() -> TestResult {
        for platform in Platform::ALL {
            assert_eq!(platform.name().parse::<Platform>()?, platform);
            assert_eq!(platform.to_string(), platform.name());
        }
        Ok(())
    }

    #[test]
    fn accepts_short_aliases() -> TestResult {
        assert_eq!("MQB".parse::<Platform>()?, Platform::VwMqb);
        assert_eq!("e46".parse::<Platform>()?, Platform::BmwE46);
        assert_eq!("vw_pq46".parse::<Platform>()?, Platform::VwPq46);
        Ok(())
    }

    #[test]
    fn rejects_unknown() {
        assert_eq!(
            "e30".parse::<Platform>(),
            Err(ConfigError::UnknownPlatform("e30".into()))
        );
    }

    #[test]
    fn serde_uses_kebab_names() -> TestResult {
        assert_eq!(serde_json::to_string(&Platform::VwPq25)?, "\"vw-pq25\"");
        let parsed: Platform = serde_json::from_str("\"bmw-e46\"")?;
        assert_eq!(parsed, Platform::BmwE46);
        Ok(())
    }
}
