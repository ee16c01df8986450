//! Signal mapping policy shared by all platforms.
//!
//! Every encoder scales and clamps speed, RPM and coolant the same way and
//! translates the generic gear through a platform table. Those rules live here
//! once; encoders compose a [`SignalMapping`] instead of repeating them.

use crate::calibration::CalibrationConfig;
use crate::state::{GearState, VehicleState};

/// Scale `value` by `factor` and saturate into `0..=max`.
///
/// Fractions are truncated. Negative or NaN factors give 0.
pub fn clamp_scaled(value: u32, factor: f32, max: u32) -> u32 {
    // `as` saturates for float to int and maps NaN to 0.
    let scaled = (f64::from(value) * f64::from(factor)) as u32;
    scaled.min(max)
}

/// Platform gear table: one display code per [`GearState`].
///
/// The table is total by construction; there is no fall-through case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GearTable([u8; 15]);

impl GearTable {
    /// Build a table from codes listed in [`GearState::ALL`] order.
    pub const fn new(codes: [u8; 15]) -> Self {
        Self(codes)
    }

    /// Display code for `gear`.
    pub fn code(&self, gear: GearState) -> u8 {
        self.0.get(gear.index()).copied().unwrap_or_default()
    }

    /// All codes, in [`GearState::ALL`] order.
    pub fn codes(&self) -> &[u8; 15] {
        &self.0
    }
}

/// Clamp bounds, correction factors and gear table for one encoder.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalMapping {
    calibration: CalibrationConfig,
    gears: GearTable,
}

impl SignalMapping {
    pub fn new(calibration: CalibrationConfig, gears: GearTable) -> Self {
        Self { calibration, gears }
    }

    pub fn calibration(&self) -> &CalibrationConfig {
        &self.calibration
    }

    pub fn gears(&self) -> &GearTable {
        &self.gears
    }

    /// Corrected speed in km/h, saturated at the gauge maximum.
    pub fn speed(&self, state: &VehicleState) -> u32 {
        clamp_scaled(
            state.speed,
            self.calibration.speed_correction_factor,
            self.calibration.maximum_speed_value,
        )
    }

    /// Corrected RPM, saturated at the tachometer maximum.
    pub fn rpm(&self, state: &VehicleState) -> u32 {
        clamp_scaled(
            state.rpm,
            self.calibration.rpm_correction_factor,
            self.calibration.maximum_rpm_value,
        )
    }

    /// Coolant temperature clamped to the gauge range.
    pub fn coolant(&self, state: &VehicleState) -> i32 {
        let min = self.calibration.minimum_coolant_temperature;
        let max = self.calibration.maximum_coolant_temperature.max(min);
        state.coolant_temperature.clamp(min, max)
    }

    /// Platform display code for the current gear.
    pub fn gear(&self, state: &VehicleState) -> u8 {
        self.gears.code(state.gear)
    }
}
