//! Frames and cluster state shared by the PQ25 and PQ46 platforms.
//!
//! PQ clusters have no end-to-end protection. The ABS frame carries the
//! sequence counter in its last byte and the speed frame a running distance
//! counter; everything else is plain data. Oil pressure and handbrake lamps
//! are switch inputs driven through [`AuxiliaryOutputs`].

use std::time::Instant;

use opencluster_core::{
    AuxiliaryOutputs, AuxiliaryOutputsExt, Cadence, CalibrationConfig, CalibrationOverrides,
    CanBus, CanBusExt, ClusterEncoder, FlashPhase, GearTable, OutputLine, PinLevel, Platform,
    RollingCounter, SignalMapping, VehicleState, drive_fuel_pots, init_fuel_pots,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ids::pq as id;
use crate::{pq25, pq46};

pub const FAST_INTERVAL_MS: u64 = 50;
pub const SLOW_INTERVAL_MS: u64 = 500;

/// Local gear codes: 0 P, 1..=7 manual, 8 R, 9 N, 10 D.
///
/// Manual 8 and up show as D; the selector display stops at 7.
pub const GEAR_TABLE: GearTable = GearTable::new([1, 2, 3, 4, 5, 6, 7, 10, 10, 10, 0, 8, 9, 10, 10]);

/// Above this RPM the oil-pressure switch reads closed and the lamp goes out.
pub const OIL_PRESSURE_RPM: u32 = 1500;

/// Raw wheel-speed units per km/h.
const WHEEL_SPEED_SCALE: u32 = 146;
/// Divisor turning km/h × ms into distance counter ticks.
const DISTANCE_DIVISOR: u32 = 182;
const DISTANCE_WRAP: u32 = 30000;

pub const IMMOBILIZER_FRAME: [u8; 8] = [0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
/// Replayed unchanged; keeps the glow-plug and DPF lamps dark.
pub const DIESEL_ENGINE_FRAME: [u8; 8] = [0x94, 0x00, 0x4D, 0xE1, 0x18, 0x00, 0x06, 0x26];

/// Which PQ cluster generation is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PqVariant {
    Pq25,
    /// Adds the lights, dimming and steering-wheel frames.
    Pq46,
}

impl PqVariant {
    pub const fn platform(self) -> Platform {
        match self {
            Self::Pq25 => Platform::VwPq25,
            Self::Pq46 => Platform::VwPq46,
        }
    }
}

/// Platform calibration before user overrides.
pub fn default_calibration() -> CalibrationConfig {
    CalibrationConfig {
        maximum_rpm_value: 6000,
        maximum_speed_value: 270,
        minimum_coolant_temperature: 50,
        maximum_coolant_temperature: 130,
        minimum_fuel_pot_value: 18,
        maximum_fuel_pot_value: 83,
        minimum_fuel_pot2_value: 17,
        maximum_fuel_pot2_value: 75,
        is_dual_fuel_pot: true,
        ..CalibrationConfig::default()
    }
}

/// Turn-signal bits: left in bit 0, right in bit 1.
pub fn turn_bits(left: bool, right: bool) -> u8 {
    u8::from(left) | u8::from(right) << 1
}

/// Engine speed in quarter RPM.
pub fn rpm_frame(rpm: u32) -> [u8; 8] {
    let quarters = u16::try_from(rpm.saturating_mul(4)).unwrap_or(u16::MAX);
    let [lo, hi] = quarters.to_le_bytes();
    [0x49, 0x0E, lo, hi, 0x0E, 0x00, 0x1B, 0x0E]
}

/// Distance counter after one fast cycle at `speed_kmh`.
pub fn advance_distance(distance: u16, speed_kmh: u32) -> u16 {
    let step = speed_kmh.saturating_mul(FAST_INTERVAL_MS as u32) / DISTANCE_DIVISOR;
    let mut next = u32::from(distance).saturating_add(step);
    if next > DISTANCE_WRAP {
        next -= DISTANCE_WRAP;
    }
    u16::try_from(next).unwrap_or(u16::MAX)
}

/// Wheel speed, lamp bits and distance counter.
pub fn speed_frame(speed_kmh: u32, distance: u16, esp_light: bool, abs_light: bool) -> [u8; 8] {
    let wheel = u16::try_from(speed_kmh.saturating_mul(WHEEL_SPEED_SCALE)).unwrap_or(u16::MAX);
    let [lo, hi] = wheel.to_le_bytes();
    let lamps = u8::from(esp_light) << 1 | u8::from(abs_light);
    let [dist_lo, dist_hi] = distance.to_le_bytes();
    [0x80, lo, hi, lamps, 0x00, dist_lo, dist_hi, 0xAD]
}

/// Plain km/h plus the sequence counter in byte 7.
pub fn abs_frame(seq: u8, speed_kmh: u32) -> [u8; 8] {
    let [lo, hi, ..] = speed_kmh.to_le_bytes();
    [0x00, 0x40, lo, hi, 0xFE, 0xFE, 0x00, 0x10 | (seq & 0x0F)]
}

/// Selector display byte: 0x2E for first gear, +0x10 per gear; R, N and D
/// have their own codes. P is blank.
pub fn gear_code(local_gear: u8) -> u8 {
    match local_gear {
        1..=7 => 0x2E + (local_gear - 1) * 0x10,
        8 => 0x36,
        9 => 0x40,
        10 => 0x56,
        _ => 0x00,
    }
}

pub fn gear_frame(local_gear: u8) -> [u8; 8] {
    [0x90, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0x02, gear_code(local_gear)]
}

pub fn airbag_frame(seatbelt_light: bool) -> [u8; 8] {
    [0x00, 0x80, u8::from(seatbelt_light) << 2, 0x00, 0x00, 0x00, 0x00, 0x00]
}

/// PQ25 or PQ46 cluster on one CAN bus plus its switch inputs and fuel
/// senders.
#[derive(Debug)]
pub struct PqCluster<B, O> {
    bus: B,
    outputs: O,
    variant: PqVariant,
    mapping: SignalMapping,
    fast: Cadence,
    slow: Cadence,
    seq: RollingCounter,
    blink: FlashPhase,
    distance: u16,
}

impl<B: CanBus, O: AuxiliaryOutputs> PqCluster<B, O> {
    pub fn new(
        bus: B,
        mut outputs: O,
        variant: PqVariant,
        overrides: &CalibrationOverrides,
    ) -> Self {
        let calibration = default_calibration().with_overrides(overrides);
        init_fuel_pots(&mut outputs);
        outputs.drive(OutputLine::SprinklerWater, PinLevel::High);
        outputs.drive(OutputLine::CoolantShortage, PinLevel::High);
        outputs.drive(OutputLine::OilPressure, PinLevel::Low);
        outputs.drive(OutputLine::Handbrake, PinLevel::High);
        outputs.drive(OutputLine::BrakeFluid, PinLevel::Low);
        info!(?variant, ?calibration, "PQ cluster ready");
        Self {
            bus,
            outputs,
            variant,
            mapping: SignalMapping::new(calibration, GEAR_TABLE),
            fast: Cadence::from_millis(FAST_INTERVAL_MS),
            slow: Cadence::from_millis(SLOW_INTERVAL_MS),
            seq: RollingCounter::nibble(),
            blink: FlashPhase::new(),
            distance: 0,
        }
    }

    pub fn pq25(bus: B, outputs: O, overrides: &CalibrationOverrides) -> Self {
        Self::new(bus, outputs, PqVariant::Pq25, overrides)
    }

    pub fn pq46(bus: B, outputs: O, overrides: &CalibrationOverrides) -> Self {
        Self::new(bus, outputs, PqVariant::Pq46, overrides)
    }

    pub fn variant(&self) -> PqVariant {
        self.variant
    }

    pub fn mapping(&self) -> &SignalMapping {
        &self.mapping
    }

    /// Distance counter as last sent in the speed frame.
    pub fn distance(&self) -> u16 {
        self.distance
    }

    pub fn sequence(&self) -> u8 {
        self.seq.value()
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    fn turn_lamps(&mut self, state: &VehicleState) -> u8 {
        let lamps = turn_bits(state.left_turning_indicator, state.right_turning_indicator);
        if !state.turning_indicators_blinking {
            self.blink.reset();
            return lamps;
        }
        if self.blink.advance() { lamps } else { 0 }
    }

    fn fast_cycle(&mut self, state: &VehicleState) {
        let seq = self.seq.value();
        let speed = self.mapping.speed(state);
        let rpm = self.mapping.rpm(state);
        let gear = self.mapping.gear(state);
        let lamps = self.turn_lamps(state);

        self.bus.emit(id::IMMOBILIZER, &IMMOBILIZER_FRAME);
        match self.variant {
            PqVariant::Pq25 => {
                self.bus
                    .emit(id::INDICATORS, &pq25::indicators_frame(state, lamps));
            }
            PqVariant::Pq46 => {
                self.bus.emit(id::INDICATORS, &pq46::indicators_frame(state));
                self.bus.emit(id::LIGHTS, &pq46::lights_frame(state, lamps));
                self.bus.emit(
                    id::DIMMUNG,
                    &pq46::dimmung_frame(state.backlight_brightness),
                );
            }
        }
        self.bus.emit(id::DIESEL_ENGINE, &DIESEL_ENGINE_FRAME);
        self.bus.emit(id::RPM, &rpm_frame(rpm));

        self.distance = advance_distance(self.distance, speed);
        self.bus.emit(
            id::SPEED,
            &speed_frame(speed, self.distance, state.offroad_light, state.abs_light),
        );
        self.bus.emit(id::ABS, &abs_frame(seq, speed));
        self.bus.emit(id::GEAR, &gear_frame(gear));
        self.bus.emit(id::AIRBAG, &airbag_frame(false));

        self.seq.advance();
    }

    fn slow_cycle(&mut self, state: &mut VehicleState) {
        drive_fuel_pots(
            &mut self.outputs,
            state.fuel_quantity,
            self.mapping.calibration(),
        );

        let oil = if self.mapping.rpm(state) > OIL_PRESSURE_RPM {
            PinLevel::Low
        } else {
            PinLevel::High
        };
        self.outputs.drive(OutputLine::OilPressure, oil);
        let handbrake = if state.handbrake {
            PinLevel::Low
        } else {
            PinLevel::High
        };
        self.outputs.drive(OutputLine::Handbrake, handbrake);

        if self.variant == PqVariant::Pq46 {
            if let Some(button) = state.take_button_event() {
                debug!(button, "steering-wheel button sent");
                self.bus
                    .emit(id::STEERING_WHEEL_BUTTONS, &pq46::button_frame(button));
            }
        }
    }
}

impl<B: CanBus, O: AuxiliaryOutputs> ClusterEncoder for PqCluster<B, O> {
    fn platform(&self) -> Platform {
        self.variant.platform()
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
