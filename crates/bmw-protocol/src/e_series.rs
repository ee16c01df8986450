//! BMW E8x/E9x K-CAN encoder.
//!
//! No checksums on this bus. The cluster instead watches a handful of
//! counters: the wheel-speed frame carries cumulative speed plus a 12-bit
//! time counter, and the ABS frame needs a rolling high nibble in byte 2.

use std::time::Instant;

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use opencluster_core::{
    AuxiliaryOutputs, AuxiliaryOutputsExt, Cadence, CalibrationConfig, CalibrationOverrides,
    CanBus, CanBusExt, ClusterEncoder, GearTable, OutputLine, PinLevel, Platform,
    RollingCounter, SignalMapping, VehicleState, drive_fuel_pots, init_fuel_pots,
};
use opencluster_curves::map_range;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ids::e_series as id;

pub const FAST_INTERVAL_MS: u64 = 100;
pub const SLOW_INTERVAL_MS: u64 = 500;

/// Every forward gear shows as D; the cluster has no manual display.
pub const GEAR_TABLE: GearTable = GearTable::new([
    0x78, 0x78, 0x78, 0x78, 0x78, 0x78, 0x78, 0x78, 0x78, 0x78, 0xE1, 0xD2, 0x87, 0x78, 0x78,
]);

/// Wheel-speed time counter increment per fast cycle: 100 ms × π, truncated.
const SPEED_TICK: u16 = 314;

const SPEED_SEED: [u8; 8] = [0x13, 0x4D, 0x46, 0x4D, 0x33, 0x4D, 0xD0, 0xFF];
const ABS_SEED: [u8; 8] = [0x00, 0xE0, 0xB3, 0xFC, 0xF0, 0x43, 0x00, 0x65];

/// Button 3 has no cluster function; it pushes the wall-clock time instead.
const TIME_BUTTON_EVENT: u8 = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ESeriesOptions {
    /// Drive the fuel potentiometers on the slow cycle. Off by default: most
    /// E-series benches read fuel from the original sender.
    pub drive_fuel: bool,
}

/// Source of the date and time pushed to the cluster.
pub trait WallClock {
    fn now(&self) -> NaiveDateTime;
}

/// Local time from the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl WallClock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub fn default_calibration() -> CalibrationConfig {
    CalibrationConfig {
        minimum_coolant_temperature: 50,
        maximum_coolant_temperature: 130,
        maximum_speed_value: 240,
        maximum_rpm_value: 6000,
        minimum_fuel_pot_value: 18,
        maximum_fuel_pot_value: 83,
        minimum_fuel_pot2_value: 17,
        maximum_fuel_pot2_value: 75,
        is_dual_fuel_pot: true,
        ..CalibrationConfig::default()
    }
}

pub fn ignition_frame(counter: u8, ignition: bool) -> [u8; 5] {
    if ignition {
        [0x45, 0x42, 0x69, 0x8F, counter]
    } else {
        [0x00, 0x00, 0x00, 0x00, counter]
    }
}

/// Engine speed in quarter revolutions.
pub fn rpm_frame(rpm: u32) -> [u8; 8] {
    let value = u16::try_from(rpm.saturating_mul(4)).unwrap_or(u16::MAX);
    let [lo, hi] = value.to_le_bytes();
    [0x5F, 0x59, 0xFF, 0x00, lo, hi, 0x80, 0x99]
}

/// Advance the wheel-speed frame in place.
///
/// Bytes 0..6 hold `speed_sum`, the running sum of speeds (three copies),
/// bytes 6..8 a 12-bit time counter with the top nibble forced high.
pub fn advance_speed_frame(frame: &mut [u8; 8], speed_sum: u16) {
    let [lo, hi] = speed_sum.to_le_bytes();
    let tick = (u16::from_le_bytes([frame[6], frame[7]]) & 0x0FFF).wrapping_add(SPEED_TICK);
    let [tick_lo, tick_hi] = tick.to_le_bytes();
    *frame = [lo, hi, lo, hi, lo, hi, tick_lo, tick_hi | 0xF0];
}

pub fn steering_wheel_frame() -> [u8; 7] {
    [0x83, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xF1]
}

pub fn airbag_counter_frame(counter: u8) -> [u8; 2] {
    [counter, 0xFF]
}

pub fn abs_counter_frame(counter: u8) -> [u8; 2] {
    [counter | 0xF0, 0xFF]
}

/// Advance the ABS frame: byte 2's high nibble steps by 3, the rest is noise.
pub fn advance_abs_frame(frame: &mut [u8; 8], rng: &mut fastrand::Rng) {
    let nibble = (frame[2] >> 4).wrapping_add(3) & 0x0F;
    for (i, byte) in frame.iter_mut().enumerate() {
        *byte = if i == 2 {
            nibble << 4 | 0x03
        } else {
            rng.u8(0..255)
        };
    }
}

pub fn gear_frame(gear_code: u8, gear_counter: u8) -> [u8; 6] {
    [gear_code, 0x0C, 0x80, gear_counter << 4 | 0x0C, 0xF0, 0xFF]
}

pub fn lights_frame(state: &VehicleState) -> [u8; 3] {
    let status = u8::from(state.any_light())
        | u8::from(state.high_beam) << 1
        | u8::from(state.main_lights) << 2
        | u8::from(state.front_fog_light) << 5
        | u8::from(state.rear_fog_light) << 6;
    [status, 0x12, 0xF7]
}

pub fn engine_temp_frame(coolant: i32, counter: u8) -> [u8; 8] {
    let temp = (coolant as u8).wrapping_add(48);
    [temp, 0xFF, counter, 0xCD, 0x5D, 0x37, 0xCD, 0xA8]
}

pub fn handbrake_frame(handbrake: bool) -> [u8; 2] {
    [if handbrake { 0xFE } else { 0xFD }, 0xFF]
}

/// 0 turns the backlight off; 1..=100 dims across the full range.
pub fn backlight_frame(brightness: u8) -> [u8; 2] {
    let level = if brightness == 0 {
        0xFE
    } else {
        let mapped = map_range(i32::from(brightness), 1, 100, 1, 0xFD);
        u8::try_from(mapped.clamp(0, 255)).unwrap_or(0xFD)
    };
    [level, 0xFF]
}

pub fn blinkers_frame(left: bool, right: bool) -> [u8; 2] {
    let status = 0x80 | u8::from(left || right) | u8::from(left) << 4 | u8::from(right) << 5;
    [status, 0xF0]
}

/// Steering-wheel button byte; unknown codes send a release.
pub fn button_frame(button_event: u8) -> [u8; 2] {
    let code = match button_event {
        1 => 0x40,
        2 => 0x80,
        _ => 0x00,
    };
    [code, 0xFF]
}

pub fn time_frame(at: &NaiveDateTime) -> [u8; 8] {
    let year = u16::try_from(at.year()).unwrap_or_default();
    let [year_lo, year_hi] = year.to_le_bytes();
    [
        at.hour() as u8,
        at.minute() as u8,
        at.second() as u8,
        at.day() as u8,
        (at.month() as u8) << 4 | 0x0F,
        year_lo,
        year_hi,
        0xF2,
    ]
}

/// E-series cluster on K-CAN plus the discrete outputs wired to it.
#[derive(Debug)]
pub struct ESeriesCluster<B, O, C = SystemClock> {
    bus: B,
    outputs: O,
    clock: C,
    options: ESeriesOptions,
    mapping: SignalMapping,
    fast: Cadence,
    slow: Cadence,
    counter: u8,
    gear_counter: RollingCounter,
    speed_sum: u16,
    speed_frame: [u8; 8],
    abs_frame: [u8; 8],
    rng: fastrand::Rng,
}

impl<B: CanBus, O: AuxiliaryOutputs> ESeriesCluster<B, O, SystemClock> {
    pub fn new(
        bus: B,
        outputs: O,
        options: ESeriesOptions,
        overrides: &CalibrationOverrides,
    ) -> Self {
        Self::with_clock(bus, outputs, SystemClock, options, overrides)
    }
}

impl<B: CanBus, O: AuxiliaryOutputs, C: WallClock> ESeriesCluster<B, O, C> {
    pub fn with_clock(
        bus: B,
        mut outputs: O,
        clock: C,
        options: ESeriesOptions,
        overrides: &CalibrationOverrides,
    ) -> Self {
        let calibration = default_calibration().with_overrides(overrides);
        init_fuel_pots(&mut outputs);
        outputs.drive(OutputLine::Handbrake, PinLevel::HighImpedance);
        info!(drive_fuel = options.drive_fuel, ?calibration, "E-series cluster ready");
        Self {
            bus,
            outputs,
            clock,
            options,
            mapping: SignalMapping::new(calibration, GEAR_TABLE),
            fast: Cadence::from_millis(FAST_INTERVAL_MS),
            slow: Cadence::from_millis(SLOW_INTERVAL_MS),
            counter: 0,
            gear_counter: RollingCounter::nibble(),
            speed_sum: 0,
            speed_frame: SPEED_SEED,
            abs_frame: ABS_SEED,
            rng: fastrand::Rng::new(),
        }
    }

    /// Reseed the ABS filler bytes, for reproducible output.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    pub fn mapping(&self) -> &SignalMapping {
        &self.mapping
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    fn fast_cycle(&mut self, state: &VehicleState) {
        let counter = self.counter;
        self.bus
            .emit(id::IGNITION, &ignition_frame(counter, state.ignition));
        self.bus.emit(id::RPM, &rpm_frame(self.mapping.rpm(state)));

        let speed = self.mapping.speed(state);
        self.speed_sum = self.speed_sum
            .wrapping_add(u16::try_from(speed).unwrap_or(u16::MAX));
        advance_speed_frame(&mut self.speed_frame, self.speed_sum);
        self.bus.emit(id::WHEEL_SPEED, &self.speed_frame);
        self.bus.emit(id::STEERING_WHEEL, &steering_wheel_frame());

        self.bus
            .emit(id::AIRBAG_COUNTER, &airbag_counter_frame(counter));
        self.bus.emit(id::ABS_COUNTER, &abs_counter_frame(counter));
        advance_abs_frame(&mut self.abs_frame, &mut self.rng);
        self.bus.emit(id::ABS, &self.abs_frame);

        let gear_counter = self.gear_counter.value();
        self.bus
            .emit(id::GEAR, &gear_frame(self.mapping.gear(state), gear_counter));
        self.gear_counter.advance();

        self.counter = self.counter.wrapping_add(1);
    }

    fn slow_cycle(&mut self, state: &mut VehicleState) {
        self.bus.emit(id::LIGHTS, &lights_frame(state));
        self.bus.emit(
            id::ENGINE_TEMP,
            &engine_temp_frame(self.mapping.coolant(state), self.counter),
        );

        self.bus
            .emit(id::HANDBRAKE, &handbrake_frame(state.handbrake));
        let level = if state.handbrake {
            PinLevel::Low
        } else {
            PinLevel::HighImpedance
        };
        self.outputs.drive(OutputLine::Handbrake, level);

        self.bus
            .emit(id::BACKLIGHT, &backlight_frame(state.backlight_brightness));
        self.bus.emit(
            id::BLINKERS,
            &blinkers_frame(state.left_turning_indicator, state.right_turning_indicator),
        );

        let button = state.take_button_event().unwrap_or(0);
        if button == TIME_BUTTON_EVENT {
            let now = self.clock.now();
            debug!(%now, "pushing wall-clock time");
            self.bus.emit(id::DATE_TIME, &time_frame(&now));
        }
        self.bus
            .emit(id::STEERING_WHEEL_BUTTONS, &button_frame(button));

        if self.options.drive_fuel {
            drive_fuel_pots(
                &mut self.outputs,
                state.fuel_quantity,
                self.mapping.calibration(),
            );
        }
    }
}

impl<B: CanBus, O: AuxiliaryOutputs, C: WallClock> ClusterEncoder for ESeriesCluster<B, O, C> {
    fn platform(&self) -> Platform {
        Platform::BmwE
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use opencluster_core::{FuelPot, OutputEvent, RecordingCanBus, RecordingOutputs};
    use std::time::Duration;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn noon() -> Result<NaiveDateTime, Box<dyn std::error::Error>> {
        Ok(NaiveDate::from_ymd_opt(2024, 8, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .ok_or("invalid date")?)
    }

    fn bench(
        options: ESeriesOptions,
    ) -> Result<
        (
            RecordingCanBus,
            RecordingOutputs,
            ESeriesCluster<RecordingCanBus, RecordingOutputs, FixedClock>,
        ),
        Box<dyn std::error::Error>,
    > {
        let bus = RecordingCanBus::new();
        let outputs = RecordingOutputs::new();
        let cluster = ESeriesCluster::with_clock(
            bus.clone(),
            outputs.clone(),
            FixedClock(noon()?),
            options,
            &CalibrationOverrides::default(),
        )
        .with_seed(7);
        Ok((bus, outputs, cluster))
    }

    #[test]
    fn wheel_speed_accumulates_and_ticks() {
        let mut frame = SPEED_SEED;
        advance_speed_frame(&mut frame, 100);
        // Tick 0xFD0 + 314 = 0x110A.
        assert_eq!(frame, [100, 0, 100, 0, 100, 0, 0x0A, 0xF1]);
        advance_speed_frame(&mut frame, 0x0190);
        assert_eq!(frame, [0x90, 0x01, 0x90, 0x01, 0x90, 0x01, 0x44, 0xF2]);
    }

    #[test]
    fn abs_nibble_steps_by_three() {
        let mut rng = fastrand::Rng::with_seed(1);
        let mut frame = ABS_SEED;
        advance_abs_frame(&mut frame, &mut rng);
        assert_eq!(frame[2], 0xE3);
        advance_abs_frame(&mut frame, &mut rng);
        assert_eq!(frame[2], 0x13);
        assert!(frame.iter().all(|&b| b != 0xFF));
    }

    #[test]
    fn fixed_frames_match_captures() -> TestResult {
        assert_eq!(ignition_frame(9, true), [0x45, 0x42, 0x69, 0x8F, 9]);
        assert_eq!(ignition_frame(9, false), [0, 0, 0, 0, 9]);
        assert_eq!(rpm_frame(3000), [0x5F, 0x59, 0xFF, 0x00, 0xE0, 0x2E, 0x80, 0x99]);
        assert_eq!(gear_frame(0xE1, 3), [0xE1, 0x0C, 0x80, 0x3C, 0xF0, 0xFF]);
        assert_eq!(engine_temp_frame(90, 4), [138, 0xFF, 4, 0xCD, 0x5D, 0x37, 0xCD, 0xA8]);
        assert_eq!(backlight_frame(0), [0xFE, 0xFF]);
        assert_eq!(backlight_frame(1), [1, 0xFF]);
        assert_eq!(backlight_frame(100), [0xFD, 0xFF]);
        assert_eq!(blinkers_frame(false, false), [0x80, 0xF0]);
        assert_eq!(blinkers_frame(false, true), [0xA1, 0xF0]);
        assert_eq!(time_frame(&noon()?), [12, 0, 0, 1, 0x8F, 0xE8, 0x07, 0xF2]);
        Ok(())
    }

    #[test]
    fn lights_set_any_bit() {
        let dark = VehicleState {
            main_lights: false,
            ..VehicleState::default()
        };
        let high = VehicleState {
            high_beam: true,
            ..dark.clone()
        };
        assert_eq!(lights_frame(&high), [0x03, 0x12, 0xF7]);
        assert_eq!(lights_frame(&dark), [0x00, 0x12, 0xF7]);
        assert_eq!(lights_frame(&VehicleState::default()), [0x05, 0x12, 0xF7]);
    }

    #[test]
    fn wheel_speed_saturates_above_sixteen_bits() -> TestResult {
        let bus = RecordingCanBus::new();
        let overrides = CalibrationOverrides {
            maximum_speed_value: Some(100_000),
            ..CalibrationOverrides::default()
        };
        let mut cluster = ESeriesCluster::with_clock(
            bus.clone(),
            RecordingOutputs::new(),
            FixedClock(noon()?),
            ESeriesOptions::default(),
            &overrides,
        );
        let mut state = VehicleState {
            speed: 70_000,
            ..VehicleState::default()
        };
        cluster.update(&mut state, Instant::now());
        let wheel = bus.last(id::WHEEL_SPEED).map(|f| f.data().to_vec());
        assert_eq!(wheel.as_ref().and_then(|w| w.get(..6)), Some(&[0xFF; 6][..]));
        Ok(())
    }

    #[test]
    fn construction_forces_pots_and_releases_handbrake() -> TestResult {
        let (_, outputs, _) = bench(ESeriesOptions::default())?;
        assert_eq!(outputs.fuel_position(FuelPot::Primary), Some(100));
        assert_eq!(outputs.fuel_position(FuelPot::Secondary), Some(100));
        assert_eq!(
            outputs.level(OutputLine::Handbrake),
            Some(PinLevel::HighImpedance)
        );
        Ok(())
    }

    #[test]
    fn update_emits_fast_then_slow_frames() -> TestResult {
        let (bus, _, mut cluster) = bench(ESeriesOptions::default())?;
        let mut state = VehicleState::default();
        cluster.update(&mut state, Instant::now());
        assert_eq!(
            bus.ids(),
            vec![
                0x130, 0x0AA, 0x1A6, 0x0C4, 0x0D7, 0x0C0, 0x19E, 0x1D2, 0x21A, 0x1D0, 0x34F, 0x202,
                0x1F6, 0x1EE,
            ]
        );
        Ok(())
    }

    #[test]
    fn button_three_pushes_the_time() -> TestResult {
        let (bus, _, mut cluster) = bench(ESeriesOptions::default())?;
        let mut state = VehicleState {
            button_event: 3,
            ..VehicleState::default()
        };
        cluster.update(&mut state, Instant::now());
        assert_eq!(state.button_event, 0);
        let time = bus.last(id::DATE_TIME).map(|f| f.data().to_vec());
        assert_eq!(time, Some(time_frame(&noon()?).to_vec()));
        let button = bus.last(id::STEERING_WHEEL_BUTTONS).map(|f| f.data().to_vec());
        assert_eq!(button, Some(vec![0x00, 0xFF]));
        Ok(())
    }

    #[test]
    fn handbrake_pulls_line_low() -> TestResult {
        let (_, outputs, mut cluster) = bench(ESeriesOptions::default())?;
        let mut state = VehicleState {
            handbrake: true,
            ..VehicleState::default()
        };
        cluster.update(&mut state, Instant::now());
        assert_eq!(outputs.level(OutputLine::Handbrake), Some(PinLevel::Low));
        Ok(())
    }

    #[test]
    fn fuel_is_driven_only_when_enabled() -> TestResult {
        let mut state = VehicleState {
            fuel_quantity: 100,
            ..VehicleState::default()
        };

        let (_, outputs, mut cluster) = bench(ESeriesOptions::default())?;
        outputs.take();
        cluster.update(&mut state, Instant::now());
        assert!(
            !outputs
                .events()
                .iter()
                .any(|e| matches!(e, OutputEvent::Fuel { .. }))
        );

        let (_, outputs, mut cluster) = bench(ESeriesOptions { drive_fuel: true })?;
        cluster.update(&mut state, Instant::now());
        assert_eq!(outputs.fuel_position(FuelPot::Primary), Some(83));
        assert_eq!(outputs.fuel_position(FuelPot::Secondary), Some(75));
        Ok(())
    }

    #[test]
    fn counters_wrap_independently() -> TestResult {
        let (bus, _, mut cluster) = bench(ESeriesOptions::default())?;
        let mut state = VehicleState::default();
        let t0 = Instant::now();
        for i in 0..20u64 {
            cluster.update(&mut state, t0 + Duration::from_millis(i * 100));
        }
        let gear: Vec<u8> = bus
            .with_id(id::GEAR)
            .iter()
            .filter_map(|f| f.data().get(3).map(|b| b >> 4))
            .collect();
        assert_eq!(gear.get(15..18), Some(&[15, 0, 1][..]));
        let ignition: Vec<u8> = bus
            .with_id(id::IGNITION)
            .iter()
            .filter_map(|f| f.data().get(4).copied())
            .collect();
        assert_eq!(ignition, (0..20).collect::<Vec<u8>>());
        Ok(())
    }
}
