//! PQ46 body frames.
//!
//! Unlike PQ25, turn signals and exterior lamps live in a separate lights
//! frame, the backlight has its own dimming frame and steering-wheel buttons
//! can be injected.

use opencluster_core::VehicleState;

/// Backlight byte in the indicator frame. Its real location on PQ46 is
/// unknown; this value keeps the cluster lit.
const INDICATOR_BACKLIGHT: u8 = 99;

/// Indicator frame (0x470): battery, door and a fixed backlight byte.
pub fn indicators_frame(state: &VehicleState) -> [u8; 8] {
    let battery = if state.battery_light { 0x80 } else { 0x00 };
    [
        battery,
        u8::from(state.door_open),
        INDICATOR_BACKLIGHT,
        0x00,
        0x00,
        0x00,
        0x00,
        0x00,
    ]
}

/// Lights frame (0x531). Main lights drive the daylight bit.
pub fn lights_frame(state: &VehicleState, turn_lamps: u8) -> [u8; 8] {
    let lamps = u8::from(state.main_lights) << 1
        | u8::from(state.high_beam) << 2
        | u8::from(state.front_fog_light) << 3
        | u8::from(state.rear_fog_light) << 4;
    [lamps, 0x80, turn_lamps & 0x03, 0x00, 0x00, 0x00, 0x00, 0x00]
}

/// Dimming frame: display and switch illumination set together, 7 bits.
pub fn dimmung_frame(brightness: u8) -> [u8; 3] {
    let level = brightness & 0x7F;
    [level, level, 0x00]
}

/// Steering-wheel button frame. Unknown events send an empty press.
pub fn button_frame(button_event: u8) -> [u8; 4] {
    let key = match button_event {
        1 => 0x02, // menu
        2 => 0x28, // ok
        3 => 0x29, // back
        _ => 0x00,
    };
    [key, 0x00, 0x00, 0x00]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lights_bits() {
        let state = VehicleState {
            main_lights: true,
            high_beam: true,
            front_fog_light: false,
            rear_fog_light: true,
            ..VehicleState::default()
        };
        assert_eq!(lights_frame(&state, 0x03)[..3], [0x16, 0x80, 0x03]);
    }

    #[test]
    fn indicators_leave_turn_signals_out() {
        let state = VehicleState {
            left_turning_indicator: true,
            door_open: true,
            ..VehicleState::default()
        };
        assert_eq!(indicators_frame(&state)[..3], [0x00, 0x01, 99]);
    }

    #[test]
    fn dimming_masks_to_seven_bits() {
        assert_eq!(dimmung_frame(100), [100, 100, 0]);
        assert_eq!(dimmung_frame(200), [72, 72, 0]);
    }

    #[test]
    fn buttons() {
        assert_eq!(button_frame(1)[0], 0x02);
        assert_eq!(button_frame(3)[0], 0x29);
        assert_eq!(button_frame(9), [0; 4]);
    }
}
