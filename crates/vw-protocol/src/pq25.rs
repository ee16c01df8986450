//! PQ25 body frame. Turn signals, lamps and backlight share one indicator
//! frame; the cluster has no dedicated lights or dimming frames.

use opencluster_core::VehicleState;

/// Indicator frame (0x470).
///
/// `turn_lamps` is the already-flashed turn-signal pair from
/// [`crate::pq::turn_bits`]. Brightness goes out raw, 0..=100.
pub fn indicators_frame(state: &VehicleState, turn_lamps: u8) -> [u8; 8] {
    let battery = if state.battery_light { 0x80 } else { 0x00 };
    let light_mode = u8::from(state.high_beam) << 6 | u8::from(state.front_fog_light) << 5;
    [
        battery | (turn_lamps & 0x03),
        u8::from(state.door_open),
        state.backlight_brightness,
        0x00,
        0x00,
        0x00,
        0x00,
        light_mode,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pq::turn_bits;

    #[test]
    fn indicator_bits() {
        let state = VehicleState {
            battery_light: true,
            door_open: true,
            high_beam: true,
            front_fog_light: true,
            backlight_brightness: 42,
            ..VehicleState::default()
        };
        assert_eq!(
            indicators_frame(&state, turn_bits(true, false)),
            [0x81, 0x01, 42, 0, 0, 0, 0, 0x60]
        );
    }

    #[test]
    fn dark_cluster() {
        let state = VehicleState {
            backlight_brightness: 0,
            ..VehicleState::default()
        };
        assert_eq!(indicators_frame(&state, 0), [0; 8]);
    }
}
