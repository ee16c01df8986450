//! BMW F-series (and Mini F5x) PT-CAN encoder.
//!
//! Frame builders return the exact bytes put on the wire. Checksummed frames
//! are `[crc, payload...]` where the CRC is CRC-8/SAE-J1850 over the payload
//! with the per-frame XOR from [`crate::ids::f_series_xor`].

use std::time::Instant;

use opencluster_core::{
    Cadence, CalibrationConfig, CalibrationOverrides, CanBus, CanBusExt, ClusterEncoder,
    DriveMode, GearTable, Platform, RollingCounter, SignalMapping, VehicleState,
};
use opencluster_crc::j1850;
use opencluster_curves::{interpolate, map_range};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ids::{check_control, f_series as id, f_series_xor as xor};

/// Fast cycle: drivetrain, chassis and keep-alive frames.
pub const FAST_INTERVAL_MS: u64 = 100;
/// Slow cycle: lights, backlight, drive mode and buttons.
pub const SLOW_INTERVAL_MS: u64 = 500;

/// Local gear codes: 1..=9 manual, 10 P, 11 R, 12 N, 13 D.
///
/// Manual 10 and Sport show as D; the cluster has no symbol for either.
pub const GEAR_TABLE: GearTable = GearTable::new([1, 2, 3, 4, 5, 6, 7, 8, 9, 13, 10, 11, 12, 13, 13]);

/// Counter nibble wraps before 14; the cluster rejects 14 and 15.
const COUNTER_LIMIT: u8 = 14;
/// Alive counter wraps at 254, not 255.
const ALIVE_LIMIT: u8 = 254;

/// Fuel percentage to litres shown by the cluster.
const FUEL_PERCENT: [i32; 3] = [0, 50, 100];
const FUEL_LITRES: [i32; 3] = [37, 18, 4];
const FUEL_LITRES_MINI: [i32; 3] = [22, 7, 3];

/// Steering-wheel button code that opens the cluster menu.
const MENU_BUTTON_EVENT: u8 = 1;
const MENU_BUTTON_CODE: u8 = 76;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FSeriesOptions {
    /// Mini F5x cluster: different fuel frame, fuel curve and a red
    /// park-brake check-control message.
    pub mini: bool,
}

/// Platform calibration before user overrides.
pub fn default_calibration(mini: bool) -> CalibrationConfig {
    CalibrationConfig {
        maximum_rpm_value: if mini { 7000 } else { 6000 },
        maximum_speed_value: 260,
        minimum_coolant_temperature: 50,
        maximum_coolant_temperature: 150,
        ..CalibrationConfig::default()
    }
}

/// Gear byte in the RPM frame: 0 blank, 1 N, 2 R, 5..=13 M1..M9.
pub fn rpm_gear_code(local_gear: u8) -> u8 {
    match local_gear {
        1..=9 => local_gear + 4,
        11 => 2,
        12 => 1,
        _ => 0,
    }
}

/// Selector byte in the transmission frame.
pub fn selector_code(local_gear: u8) -> u8 {
    match local_gear {
        1..=9 => 0x81,
        10 => 0x20,
        11 => 0x40,
        12 => 0x60,
        13 => 0x80,
        _ => 0,
    }
}

fn saturating_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_byte(value: i32) -> u8 {
    u8::try_from(value.clamp(0, 255)).unwrap_or(u8::MAX)
}

pub fn ignition_frame(counter: u8, ignition: bool) -> [u8; 8] {
    let status = if ignition { 0x8A } else { 0x08 };
    j1850::with_checksum(
        [0x80 | counter, status, 0xDD, 0xF1, 0x01, 0x30, 0x06],
        xor::IGNITION,
    )
}

/// Road speed in 1/64 km/h.
pub fn speed_frame(counter: u8, speed_kmh: u32) -> [u8; 5] {
    let raw = (f64::from(speed_kmh) * 64.01) as u16;
    let [lo, hi] = raw.to_le_bytes();
    let moving = if speed_kmh == 0 { 0x81 } else { 0x91 };
    j1850::with_checksum([0xC0 | counter, lo, hi, moving], xor::SPEED)
}

pub fn rpm_frame(counter: u8, rpm: u32, local_gear: u8) -> [u8; 8] {
    let needle = to_byte(map_range(saturating_i32(rpm), 0, 6900, 0x00, 0x2B));
    j1850::with_checksum(
        [0x60 | counter, needle, 0xC0, 0xF0, rpm_gear_code(local_gear), 0xFF, 0xFF],
        xor::RPM_GEAR,
    )
}

pub fn transmission_frame(counter: u8, local_gear: u8) -> [u8; 5] {
    j1850::with_checksum(
        [counter, selector_code(local_gear), 0xFC, 0xFF],
        xor::TRANSMISSION,
    )
}

pub fn abs_frame(counter: u8) -> [u8; 5] {
    j1850::with_checksum([0xF0 | counter, 0xFE, 0xFF, 0x14], xor::ABS)
}

pub fn alive_frame(count: u8) -> [u8; 2] {
    [count, 0xFF]
}

pub fn steering_column_frame(counter: u8) -> [u8; 5] {
    j1850::with_checksum([0xF0 | counter, 0xFE, 0xFF, 0x14], xor::STEERING_COLUMN)
}

pub fn cruise_frame(counter: u8) -> [u8; 8] {
    j1850::with_checksum(
        [0xF0 | counter, 0xE0, 0xE0, 0xE1, 0x00, 0xEC, 0x01],
        xor::CRUISE,
    )
}

pub fn restraint_frame(counter: u8) -> [u8; 8] {
    j1850::with_checksum(
        [0x40 | counter, 0x40, 0x55, 0xFD, 0xFF, 0xFF, 0xFF],
        xor::RESTRAINT,
    )
}

pub fn seatbelt_frame(counter: u8) -> [u8; 7] {
    j1850::with_checksum(
        [0xE0 | counter, 0xF1, 0xF0, 0xF2, 0xF2, 0xFE],
        xor::SEATBELT,
    )
}

pub fn tpms_frame(counter: u8) -> [u8; 5] {
    j1850::with_checksum([0xF0 | counter, 0xA2, 0xA0, 0xA0], xor::TPMS)
}

/// Steadies the tachometer. Byte 4 wraps like the cluster firmware expects.
pub fn oil_frame(counter: u8, coolant: i32) -> [u8; 8] {
    let temp = (coolant as u8).wrapping_add(50);
    j1850::with_checksum(
        [0x10 | counter, 0x82, 0x4E, 0x7E, temp, 0x05, 0x89],
        xor::OIL,
    )
}

/// Has a checksum but no counter.
pub fn engine_temp_frame(coolant: i32) -> [u8; 8] {
    j1850::with_checksum(
        [0x3E, coolant as u8, 0x64, 0x64, 0x64, 0x01, 0xF1],
        xor::ENGINE_TEMP,
    )
}

pub fn mpg_frame(count: u8) -> [u8; 8] {
    j1850::with_checksum([count, 0xFF, 0x64, 0x64, 0x64, 0x01, 0xF1], xor::MPG)
}

/// Moves the consumption bar; `distance` is the running odometer counter.
pub fn mpg_distance_frame(counter: u8, distance: u16) -> [u8; 5] {
    let [lo, hi] = distance.to_le_bytes();
    j1850::with_checksum([0xF0 | counter, lo, hi, 0xF2], xor::MPG_DISTANCE)
}

pub fn park_brake_frame(counter: u8, handbrake: bool) -> [u8; 5] {
    let status = if handbrake { 0x15 } else { 0x14 };
    j1850::with_checksum([0xF0 | counter, 0x38, 0x00, status], xor::PARK_BRAKE)
}

/// Litres shown for a fuel percentage.
pub fn fuel_litres(fuel_quantity: u8, mini: bool) -> u8 {
    let outputs = if mini { &FUEL_LITRES_MINI } else { &FUEL_LITRES };
    let litres = interpolate(&FUEL_PERCENT, outputs, i32::from(fuel_quantity)).unwrap_or(0);
    to_byte(litres)
}

/// Unchecksummed. The Mini cluster reads a single sender.
pub fn fuel_frame(fuel_quantity: u8, mini: bool) -> [u8; 5] {
    let litres = fuel_litres(fuel_quantity, mini);
    let primary = if mini { 0 } else { litres };
    [0x00, primary, 0x00, litres, 0x00]
}

/// Raise or clear one check-control message.
pub fn check_control_frame(message: u8, active: bool) -> [u8; 8] {
    let action = if active {
        check_control::ASSERT
    } else {
        check_control::CLEAR
    };
    [0x40, message, 0x00, action, 0xFF, 0xFF, 0xFF, 0xFF]
}

pub fn lights_frame(state: &VehicleState) -> [u8; 3] {
    let status = u8::from(state.high_beam) << 1
        | u8::from(state.main_lights) << 2
        | u8::from(state.front_fog_light) << 5
        | u8::from(state.rear_fog_light) << 6;
    [status, 0xC0, 0xF7]
}

pub fn blinkers_frame(left: bool, right: bool) -> [u8; 2] {
    let status = if !left && !right {
        0x80
    } else {
        0x81 | u8::from(left) << 4 | u8::from(right) << 5
    };
    [status, 0xF0]
}

pub fn backlight_frame(brightness: u8) -> [u8; 2] {
    [to_byte(map_range(i32::from(brightness), 0, 100, 0, 253)), 0xFF]
}

pub fn drive_mode_frame(counter: u8, mode: DriveMode) -> [u8; 7] {
    j1850::with_checksum(
        [0xF0 | counter, 0x00, 0x00, mode.code(), 0x11, 0xC0],
        xor::DRIVE_MODE,
    )
}

/// Only the menu button is known; everything else sends a release.
pub fn button_frame(button_event: u8) -> [u8; 2] {
    let code = if button_event == MENU_BUTTON_EVENT {
        MENU_BUTTON_CODE
    } else {
        0
    };
    [code, 0xFF]
}

/// F-series cluster on one CAN bus.
#[derive(Debug)]
pub struct FSeriesCluster<B> {
    bus: B,
    options: FSeriesOptions,
    mapping: SignalMapping,
    fast: Cadence,
    slow: Cadence,
    counter: RollingCounter,
    alive: RollingCounter,
    distance: u16,
}

impl<B: CanBus> FSeriesCluster<B> {
    pub fn new(bus: B, options: FSeriesOptions, overrides: &CalibrationOverrides) -> Self {
        let calibration = default_calibration(options.mini).with_overrides(overrides);
        info!(mini = options.mini, ?calibration, "F-series cluster ready");
        Self {
            bus,
            options,
            mapping: SignalMapping::new(calibration, GEAR_TABLE),
            fast: Cadence::from_millis(FAST_INTERVAL_MS),
            slow: Cadence::from_millis(SLOW_INTERVAL_MS),
            counter: RollingCounter::new(COUNTER_LIMIT),
            alive: RollingCounter::new(ALIVE_LIMIT),
            distance: 0,
        }
    }

    pub fn mapping(&self) -> &SignalMapping {
        &self.mapping
    }

    pub fn options(&self) -> FSeriesOptions {
        self.options
    }

    /// Running odometer counter sent in the consumption frame.
    pub fn distance(&self) -> u16 {
        self.distance
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    fn fast_cycle(&mut self, state: &VehicleState) {
        let c = self.counter.value();
        let count = self.alive.value();
        let speed = self.mapping.speed(state);
        let rpm = self.mapping.rpm(state);
        let coolant = self.mapping.coolant(state);
        let gear = self.mapping.gear(state);
        let mini = self.options.mini;

        self.bus.emit(id::IGNITION, &ignition_frame(c, state.ignition));
        self.bus.emit(id::SPEED, &speed_frame(c, speed));
        self.bus.emit(id::RPM_GEAR, &rpm_frame(c, rpm, gear));

        self.bus.emit(id::ABS, &abs_frame(c));
        self.bus.emit(id::ALIVE_COUNTER, &alive_frame(count));
        self.bus.emit(id::STEERING_COLUMN, &steering_column_frame(c));
        self.bus.emit(id::CRUISE, &cruise_frame(c));
        self.bus.emit(id::RESTRAINT, &restraint_frame(c));
        self.bus.emit(id::SEATBELT, &seatbelt_frame(c));
        self.bus.emit(id::TPMS, &tpms_frame(c));
        self.bus.emit(id::OIL, &oil_frame(c, coolant));
        self.bus.emit(id::ENGINE_TEMP, &engine_temp_frame(coolant));

        self.bus.emit(id::TRANSMISSION, &transmission_frame(c, gear));
        self.bus.emit(id::FUEL, &fuel_frame(state.fuel_quantity, mini));
        self.bus.emit(id::PARK_BRAKE, &park_brake_frame(c, state.handbrake));

        self.bus.emit(id::MPG, &mpg_frame(count));
        self.bus.emit(id::MPG_DISTANCE, &mpg_distance_frame(c, self.distance));
        let travelled = f64::from(self.distance) + f64::from(speed) * 2.9;
        self.distance = (travelled as u64) as u16;

        self.bus.emit(
            id::CHECK_CONTROL,
            &check_control_frame(check_control::DOOR_OPEN, state.door_open),
        );
        self.bus.emit(
            id::CHECK_CONTROL,
            &check_control_frame(check_control::DSC, state.offroad_light),
        );
        if mini {
            self.bus.emit(
                id::CHECK_CONTROL,
                &check_control_frame(check_control::PARK_BRAKE_RED, state.handbrake),
            );
        }

        self.counter.advance();
        self.alive.advance();
    }

    fn slow_cycle(&mut self, state: &mut VehicleState) {
        let c = self.counter.value();
        self.bus.emit(id::LIGHTS, &lights_frame(state));
        self.bus.emit(
            id::BLINKERS,
            &blinkers_frame(state.left_turning_indicator, state.right_turning_indicator),
        );
        self.bus
            .emit(id::BACKLIGHT, &backlight_frame(state.backlight_brightness));
        self.bus
            .emit(id::DRIVE_MODE, &drive_mode_frame(c, state.drive_mode));

        let button = state.take_button_event().unwrap_or(0);
        if button != 0 {
            debug!(button, "steering-wheel button sent");
        }
        self.bus
            .emit(id::STEERING_WHEEL_BUTTONS, &button_frame(button));
    }
}

impl<B: CanBus> ClusterEncoder for FSeriesCluster<B> {
    fn platform(&self) -> Platform {
        Platform::BmwF
    }

    fn update(&mut self, state: &mut VehicleState, now: Instant) {
        if self.fast.poll(now) {
            self.fast_cycle(state);
        }
        if self.slow.poll(now) {
            self.slow_cycle(state);
        }
    }
}
