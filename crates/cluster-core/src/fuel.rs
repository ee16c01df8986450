//! Fuel gauge driving through the sender potentiometers.

use opencluster_curves::map_range;

use crate::calibration::CalibrationConfig;
use crate::transport::{AuxiliaryOutputs, AuxiliaryOutputsExt, FuelPot};

/// Wiper position the pots are forced to at power-up.
pub const FUEL_POT_REFERENCE_POSITION: u8 = 100;

/// Wiper positions for one fuel reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FuelPotTargets {
    pub primary: u8,
    /// Only set for dual-sender (saddle tank) clusters.
    pub secondary: Option<u8>,
}

fn to_position(value: i32) -> u8 {
    u8::try_from(value.clamp(0, i32::from(u8::MAX))).unwrap_or(u8::MAX)
}

/// Wiper positions for `fuel_quantity` percent.
///
/// A dual-sender tank fills the secondary half first: the secondary pot
/// covers 0..50 % and the primary pot 50..100 %.
pub fn fuel_pot_positions(fuel_quantity: u8, calibration: &CalibrationConfig) -> FuelPotTargets {
    let percent = i32::from(fuel_quantity.min(100));
    if calibration.is_dual_fuel_pot {
        let primary_share = if percent > 50 { percent - 50 } else { 0 };
        let secondary_share = percent.min(50);
        FuelPotTargets {
            primary: to_position(map_range(
                primary_share,
                0,
                50,
                i32::from(calibration.minimum_fuel_pot_value),
                i32::from(calibration.maximum_fuel_pot_value),
            )),
            secondary: Some(to_position(map_range(
                secondary_share,
                0,
                50,
                i32::from(calibration.minimum_fuel_pot2_value),
                i32::from(calibration.maximum_fuel_pot2_value),
            ))),
        }
    } else {
        FuelPotTargets {
            primary: to_position(map_range(
                percent,
                0,
                100,
                i32::from(calibration.minimum_fuel_pot_value),
                i32::from(calibration.maximum_fuel_pot_value),
            )),
            secondary: None,
        }
    }
}

/// Force both pots to the reference position.
pub fn init_fuel_pots<O: AuxiliaryOutputs + ?Sized>(outputs: &mut O) {
    outputs.drive_fuel(FuelPot::Primary, FUEL_POT_REFERENCE_POSITION, true);
    outputs.drive_fuel(FuelPot::Secondary, FUEL_POT_REFERENCE_POSITION, true);
}

/// Move the pots to show `fuel_quantity`.
pub fn drive_fuel_pots<O: AuxiliaryOutputs + ?Sized>(
    outputs: &mut O,
    fuel_quantity: u8,
    calibration: &CalibrationConfig,
) {
    let targets = fuel_pot_positions(fuel_quantity, calibration);
    outputs.drive_fuel(FuelPot::Primary, targets.primary, false);
    if let Some(secondary) = targets.secondary {
        outputs.drive_fuel(FuelPot::Secondary, secondary, false);
    }
}
