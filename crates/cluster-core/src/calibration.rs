//! Per-installation calibration.
//!
//! Each encoder starts from its platform default and layers the user's
//! [`CalibrationOverrides`] on top once, at construction. After that the
//! record is read-only.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Gauge ranges and correction factors for one cluster installation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Multiplier applied to speed before clamping.
    pub speed_correction_factor: f32,
    /// Multiplier applied to RPM before clamping.
    pub rpm_correction_factor: f32,
    pub maximum_rpm_value: u32,
    pub maximum_speed_value: u32,
    pub minimum_coolant_temperature: i32,
    pub maximum_coolant_temperature: i32,
    /// Wiper position for an empty tank (primary pot).
    pub minimum_fuel_pot_value: u8,
    /// Wiper position for a full tank (primary pot).
    pub maximum_fuel_pot_value: u8,
    pub minimum_fuel_pot2_value: u8,
    pub maximum_fuel_pot2_value: u8,
    /// Cluster reads two fuel senders (saddle tank).
    pub is_dual_fuel_pot: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            speed_correction_factor: 1.0,
            rpm_correction_factor: 1.0,
            maximum_rpm_value: 6000,
            maximum_speed_value: 260,
            minimum_coolant_temperature: 0,
            maximum_coolant_temperature: 200,
            minimum_fuel_pot_value: 18,
            maximum_fuel_pot_value: 83,
            minimum_fuel_pot2_value: 17,
            maximum_fuel_pot2_value: 75,
            is_dual_fuel_pot: false,
        }
    }
}

/// User-supplied calibration values.
///
/// A value applies only when positive. Anything else keeps the platform
/// default, so `-1` or `0` in a config file means "unset".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationOverrides {
    pub speed_correction_factor: Option<f32>,
    pub rpm_correction_factor: Option<f32>,
    pub maximum_rpm_value: Option<i64>,
    pub maximum_speed_value: Option<i64>,
    pub minimum_coolant_temperature: Option<i64>,
    pub maximum_coolant_temperature: Option<i64>,
    pub minimum_fuel_pot_value: Option<i64>,
    pub maximum_fuel_pot_value: Option<i64>,
    pub minimum_fuel_pot2_value: Option<i64>,
    pub maximum_fuel_pot2_value: Option<i64>,
}

fn positive_factor(value: Option<f32>) -> Option<f32> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn positive<T: TryFrom<i64>>(value: Option<i64>) -> Option<T> {
    value.filter(|v| *v > 0).and_then(|v| T::try_from(v).ok())
}

impl CalibrationOverrides {
    /// Reject values that cannot mean "unset" and cannot be applied either.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a non-finite correction
    /// factor, a fuel-pot position above 255, or a coolant range whose
    /// minimum is not below its maximum.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, factor) in [
            ("speed_correction_factor", self.speed_correction_factor),
            ("rpm_correction_factor", self.rpm_correction_factor),
        ] {
            if factor.is_some_and(|v| !v.is_finite()) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be a finite number".into(),
                });
            }
        }
        for (field, position) in [
            ("minimum_fuel_pot_value", self.minimum_fuel_pot_value),
            ("maximum_fuel_pot_value", self.maximum_fuel_pot_value),
            ("minimum_fuel_pot2_value", self.minimum_fuel_pot2_value),
            ("maximum_fuel_pot2_value", self.maximum_fuel_pot2_value),
        ] {
            if let Some(v) = position.filter(|v| *v > i64::from(u8::MAX)) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("{v} exceeds the potentiometer range 0..=255"),
                });
            }
        }
        if let (Some(min), Some(max)) = (
            positive::<i64>(self.minimum_coolant_temperature),
            positive::<i64>(self.maximum_coolant_temperature),
        ) {
            if min >= max {
                return Err(ConfigError::InvalidValue {
                    field: "minimum_coolant_temperature",
                    reason: format!("{min} is not below the maximum of {max}"),
                });
            }
        }
        Ok(())
    }
}

impl CalibrationConfig {
    /// Apply `overrides` on top of `self`.
    pub fn with_overrides(mut self, overrides: &CalibrationOverrides) -> Self {
        if let Some(v) = positive_factor(overrides.speed_correction_factor) {
            self.speed_correction_factor = v;
        }
        if let Some(v) = positive_factor(overrides.rpm_correction_factor) {
            self.rpm_correction_factor = v;
        }
        if let Some(v) = positive(overrides.maximum_rpm_value) {
            self.maximum_rpm_value = v;
        }
        if let Some(v) = positive(overrides.maximum_speed_value) {
            self.maximum_speed_value = v;
        }
        if let Some(v) = positive(overrides.minimum_coolant_temperature) {
            self.minimum_coolant_temperature = v;
        }
        if let Some(v) = positive(overrides.maximum_coolant_temperature) {
            self.maximum_coolant_temperature = v;
        }
        if let Some(v) = positive(overrides.minimum_fuel_pot_value) {
            self.minimum_fuel_pot_value = v;
        }
        if let Some(v) = positive(overrides.maximum_fuel_pot_value) {
            self.maximum_fuel_pot_value = v;
        }
        if let Some(v) = positive(overrides.minimum_fuel_pot2_value) {
            self.minimum_fuel_pot2_value = v;
        }
        if let Some(v) = positive(overrides.maximum_fuel_pot2_value) {
            self.maximum_fuel_pot2_value = v;
        }
        self
    }
}
