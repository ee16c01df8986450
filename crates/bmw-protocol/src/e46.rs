//! BMW E46 instrument cluster (IKE).
//!
//! The E46 splits its inputs across four transports:
//!
//! - CAN at 10 ms (DME1, DME2, DME4, ASC1, EGS1) and 20 ms (ASC3);
//! - road speed as a square wave on the ABS sensor input, 6.6 Hz per km/h;
//! - K-bus for the lamp cluster (turn signals, fogs, high beam, doors);
//! - discrete lines for the handbrake and ABS lamps, plus the two fuel
//!   senders.

use std::time::{Duration, Instant};

use opencluster_core::{
    AuxiliaryOutputs, AuxiliaryOutputsExt, Cadence, CalibrationConfig, CalibrationOverrides,
    CanBus, CanBusExt, ClusterEncoder, GearState, GearTable, OutputLine, PinLevel, Platform,
    RollingCounter, SerialBus, SerialBusExt, SignalMapping, VehicleState, drive_fuel_pots,
    init_fuel_pots,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ids::{e46 as id, kbus};
use crate::kbus_checksum;

pub const ENGINE_INTERVAL_MS: u64 = 10;
pub const CHASSIS_INTERVAL_MS: u64 = 20;
pub const BODY_INTERVAL_MS: u64 = 500;

/// Tone frequency per km/h on the speed input.
pub const SPEED_TONE_HZ_PER_KMH: f32 = 6.6;

/// A turn signal stays lit this long after the request drops, so the lamp
/// does not flicker between blink phases.
const BLINKER_HOLD: Duration = Duration::from_millis(500);

/// Coolant above this lights the overheat lamp.
const OVERHEAT_THRESHOLD: i32 = 125;

/// Display codes for the automatic gear readout; 0 blanks it.
pub const GEAR_TABLE: GearTable = GearTable::new([1, 2, 3, 4, 9, 10, 0, 0, 0, 0, 8, 7, 6, 5, 0]);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct E46Options {
    /// Animate the consumption gauge from engine speed.
    pub fake_consumption: bool,
}

impl Default for E46Options {
    fn default() -> Self {
        Self {
            fake_consumption: true,
        }
    }
}

pub fn default_calibration() -> CalibrationConfig {
    CalibrationConfig {
        minimum_coolant_temperature: 40,
        maximum_coolant_temperature: 140,
        maximum_speed_value: 260,
        maximum_rpm_value: 7000,
        minimum_fuel_pot_value: 5,
        maximum_fuel_pot_value: 42,
        minimum_fuel_pot2_value: 5,
        maximum_fuel_pot2_value: 70,
        is_dual_fuel_pot: true,
        ..CalibrationConfig::default()
    }
}

/// DME1: engine speed in 1/6.4 rpm.
pub fn dme1_frame(rpm: u32) -> [u8; 8] {
    let raw = (f64::from(rpm) * 6.4) as u16;
    let [lo, hi] = raw.to_le_bytes();
    [0x05, 0x14, lo, hi, 0x14, 0x17, 0x00, 0x16]
}

/// DME2: coolant temperature, `(°C + 48.373) / 0.75`.
pub fn dme2_frame(coolant: i32) -> [u8; 8] {
    let raw = ((f64::from(coolant) + 48.373) / 0.75) as u8;
    [0x07, raw, 0xB2, 0x19, 0x00, 0xEE, 0x00, 0x00]
}

/// DME4: consumption counter and the overheat lamp (byte 3, bit 3).
pub fn dme4_frame(consumption: u16, overheat: bool) -> [u8; 8] {
    let [lo, hi] = consumption.to_le_bytes();
    [0x00, lo, hi, u8::from(overheat) << 3, 0x7E, 0x10, 0x00, 0x18]
}

pub fn asc1_frame(traction_light: bool) -> [u8; 8] {
    [0x00, u8::from(traction_light), 0x27, 0xFF, 0x00, 0xFF, 0xFF, 0x80]
}

/// Keeps the ABS and ASC lamps off on 2004+ clusters.
pub fn asc3_frame() -> [u8; 8] {
    [0x40, 0x80, 0x00, 0xFF, 0x41, 0x7F, 0x00, 0x08]
}

/// EGS1: gear readout with a nibble check over the counter.
///
/// Byte 2 picks the left-hand letter: 0x40 S, 0x20 M.
pub fn egs1_frame(gear_code: u8, sport: bool, counter: u8) -> [u8; 8] {
    let counter = counter & 0x0F;
    let check = !(counter ^ gear_code) & 0x0F;
    let mode = if sport { 0x40 } else { 0x20 };
    [0x00, gear_code, mode, check << 4 | counter, 0x00, 0x00, 0x00, 0x00]
}

/// Lamps carried by the K-bus light-control frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KbusLamps {
    pub left: bool,
    pub right: bool,
    pub rear_fog: bool,
    pub front_fog: bool,
    pub high_beam: bool,
    pub doors: bool,
}

pub fn light_control_frame(lamps: KbusLamps) -> [u8; 10] {
    let [h0, h1, h2, h3] = kbus::LIGHT_CONTROL_HEADER;
    let lights = u8::from(lamps.right) << 6
        | u8::from(lamps.left) << 5
        | u8::from(lamps.rear_fog) << 4
        | u8::from(lamps.front_fog) << 3
        | u8::from(lamps.high_beam) << 2;
    let doors = u8::from(lamps.doors) << 7;
    let body = [h0, h1, h2, h3, lights, 0x00, 0x00, doors, 0x00];
    let sum = kbus_checksum(&body);
    [h0, h1, h2, h3, lights, 0x00, 0x00, doors, 0x00, sum]
}

/// Tone for a road speed; `None` means silence.
pub fn speed_tone(speed_kmh: u32) -> Option<f32> {
    (speed_kmh > 0).then(|| SPEED_TONE_HZ_PER_KMH * speed_kmh as f32)
}

/// Keeps a turn lamp lit for [`BLINKER_HOLD`] after its request drops.
#[derive(Clone, Copy, Debug, Default)]
struct BlinkerHold {
    last_on: Option<Instant>,
}

impl BlinkerHold {
    fn lit(&mut self, requested: bool, now: Instant) -> bool {
        if requested {
            self.last_on = Some(now);
            return true;
        }
        self.last_on
            .is_some_and(|t| now.saturating_duration_since(t) <= BLINKER_HOLD)
    }
}

/// E46 cluster on CAN, K-bus and discrete outputs.
#[derive(Debug)]
pub struct E46Cluster<B, S, O> {
    can: B,
    kbus: S,
    outputs: O,
    options: E46Options,
    mapping: SignalMapping,
    engine: Cadence,
    chassis: Cadence,
    body: Cadence,
    egs_counter: RollingCounter,
    consumption: u32,
    last_speed: u32,
    left: BlinkerHold,
    right: BlinkerHold,
}

impl<B: CanBus, S: SerialBus, O: AuxiliaryOutputs> E46Cluster<B, S, O> {
    pub fn new(
        can: B,
        mut kbus: S,
        mut outputs: O,
        options: E46Options,
        overrides: &CalibrationOverrides,
    ) -> Self {
        let calibration = default_calibration().with_overrides(overrides);
        init_fuel_pots(&mut outputs);
        outputs.drive(OutputLine::Handbrake, PinLevel::HighImpedance);
        outputs.drive(OutputLine::Abs, PinLevel::Low);
        outputs.drive_tone(None);
        kbus.emit_bytes(&kbus::BACKLIGHT_ON);
        kbus.emit_bytes(&kbus::SET_TIME);
        info!(
            fake_consumption = options.fake_consumption,
            ?calibration,
            "E46 cluster ready"
        );
        Self {
            can,
            kbus,
            outputs,
            options,
            mapping: SignalMapping::new(calibration, GEAR_TABLE),
            engine: Cadence::from_millis(ENGINE_INTERVAL_MS),
            chassis: Cadence::from_millis(CHASSIS_INTERVAL_MS),
            body: Cadence::from_millis(BODY_INTERVAL_MS),
            egs_counter: RollingCounter::nibble(),
            consumption: 0,
            last_speed: 0,
            left: BlinkerHold::default(),
            right: BlinkerHold::default(),
        }
    }

    pub fn mapping(&self) -> &SignalMapping {
        &self.mapping
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    fn advance_consumption(&mut self, rpm: u32) -> u16 {
        if !self.options.fake_consumption {
            return 0;
        }
        if self.consumption >= 0xFFFF {
            self.consumption = 0;
        } else {
            self.consumption += rpm / 150;
        }
        (self.consumption & 0xFFFF) as u16
    }

    /// Retune only when the speed changes; the generator restarts its
    /// waveform on every call.
    fn drive_speed(&mut self, speed: u32) {
        if speed == self.last_speed {
            return;
        }
        self.last_speed = speed;
        let tone = speed_tone(speed);
        debug!(speed, ?tone, "speed tone");
        self.outputs.drive_tone(tone);
    }

    fn engine_cycle(&mut self, state: &VehicleState) {
        let rpm = self.mapping.rpm(state);
        let coolant = self.mapping.coolant(state);
        self.can.emit(id::DME1, &dme1_frame(rpm));
        self.can.emit(id::DME2, &dme2_frame(coolant));
        let consumption = self.advance_consumption(rpm);
        self.can.emit(
            id::DME4,
            &dme4_frame(consumption, coolant > OVERHEAT_THRESHOLD),
        );
        self.drive_speed(self.mapping.speed(state));
        self.can.emit(id::ASC1, &asc1_frame(state.offroad_light));

        let counter = self.egs_counter.value();
        let sport = state.gear == GearState::AutoS;
        self.can
            .emit(id::EGS1, &egs1_frame(self.mapping.gear(state), sport, counter));
        self.egs_counter.advance();
    }

    fn body_cycle(&mut self, state: &VehicleState, now: Instant) {
        let lamps = KbusLamps {
            left: self.left.lit(state.left_turning_indicator, now),
            right: self.right.lit(state.right_turning_indicator, now),
            rear_fog: state.rear_fog_light,
            front_fog: state.front_fog_light,
            high_beam: state.high_beam,
            doors: state.door_open,
        };
        self.kbus.emit_bytes(&light_control_frame(lamps));

        let handbrake = if state.handbrake {
            PinLevel::Low
        } else {
            PinLevel::HighImpedance
        };
        self.outputs.drive(OutputLine::Handbrake, handbrake);
        let abs = if state.abs_light {
            PinLevel::High
        } else {
            PinLevel::Low
        };
        self.outputs.drive(OutputLine::Abs, abs);

        drive_fuel_pots(
            &mut self.outputs,
            state.fuel_quantity,
            self.mapping.calibration(),
        );
    }
}

impl<B: CanBus, S: SerialBus, O: AuxiliaryOutputs> ClusterEncoder for E46Cluster<B, S, O> {
    fn platform(&self) -> Platform {
        Platform::BmwE46
    }

    fn update(&mut self, state: &mut VehicleState, now: Instant) {
        if self.engine.poll(now) {
            self.engine_cycle(state);
        }
        if self.chassis.poll(now) {
            self.can.emit(id::ASC3, &asc3_frame());
        }
        if self.body.poll(now) {
            self.body_cycle(state, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencluster_core::{
        FuelPot, OutputEvent, RecordingCanBus, RecordingOutputs, RecordingSerialBus,
    };

    type Bench = (
        RecordingCanBus,
        RecordingSerialBus,
        RecordingOutputs,
        E46Cluster<RecordingCanBus, RecordingSerialBus, RecordingOutputs>,
    );

    fn bench(options: E46Options) -> Bench {
        let can = RecordingCanBus::new();
        let kbus = RecordingSerialBus::new();
        let outputs = RecordingOutputs::new();
        let cluster = E46Cluster::new(
            can.clone(),
            kbus.clone(),
            outputs.clone(),
            options,
            &CalibrationOverrides::default(),
        );
        (can, kbus, outputs, cluster)
    }

    fn run(cluster: &mut impl ClusterEncoder, state: &mut VehicleState, t0: Instant, ms: u64) {
        for t in 0..=ms {
            cluster.update(state, t0 + Duration::from_millis(t));
        }
    }

    #[test]
    fn construction_initialises_every_output() {
        let (_, kbus, outputs, _) = bench(E46Options::default());
        assert_eq!(
            kbus.writes(),
            vec![kbus::BACKLIGHT_ON.to_vec(), kbus::SET_TIME.to_vec()]
        );
        assert_eq!(outputs.fuel_position(FuelPot::Primary), Some(100));
        assert_eq!(outputs.fuel_position(FuelPot::Secondary), Some(100));
        assert_eq!(outputs.level(OutputLine::Abs), Some(PinLevel::Low));
        assert_eq!(
            outputs.level(OutputLine::Handbrake),
            Some(PinLevel::HighImpedance)
        );
        assert_eq!(outputs.events().last(), Some(&OutputEvent::Silence));
    }

    #[test]
    fn engine_frames_scale_like_the_dme() {
        assert_eq!(dme1_frame(3000), [0x05, 0x14, 0x00, 0x4B, 0x14, 0x17, 0x00, 0x16]);
        assert_eq!(dme2_frame(90)[1], 184);
        assert_eq!(dme4_frame(0x1234, true), [0x00, 0x34, 0x12, 0x08, 0x7E, 0x10, 0x00, 0x18]);
        assert_eq!(asc1_frame(true)[1], 0x01);
    }

    #[test]
    fn egs1_check_nibble_complements_counter_and_gear() {
        assert_eq!(egs1_frame(5, false, 0)[3], 0xA0);
        assert_eq!(egs1_frame(5, false, 1)[3], 0xB1);
        assert_eq!(egs1_frame(0, true, 15), [0, 0, 0x40, 0x0F, 0, 0, 0, 0]);
    }

    #[test]
    fn gear_table_matches_display_codes() {
        assert_eq!(GEAR_TABLE.code(GearState::Manual5), 9);
        assert_eq!(GEAR_TABLE.code(GearState::Manual6), 10);
        assert_eq!(GEAR_TABLE.code(GearState::Manual8), 0);
        assert_eq!(GEAR_TABLE.code(GearState::AutoD), 5);
        assert_eq!(GEAR_TABLE.code(GearState::AutoS), 0);
    }

    #[test]
    fn light_control_frame_has_valid_checksum() {
        assert_eq!(
            light_control_frame(KbusLamps::default()),
            [0xD0, 0x08, 0xBF, 0x5B, 0, 0, 0, 0, 0, 0x3C]
        );
        let lamps = KbusLamps {
            left: true,
            right: true,
            high_beam: true,
            doors: true,
            ..KbusLamps::default()
        };
        assert_eq!(
            light_control_frame(lamps),
            [0xD0, 0x08, 0xBF, 0x5B, 0x64, 0, 0, 0x80, 0, 0xD8]
        );
    }

    #[test]
    fn cadences_run_at_ten_twenty_and_five_hundred_ms() {
        let (can, kbus, _, mut cluster) = bench(E46Options::default());
        kbus.take();
        let mut state = VehicleState::default();
        run(&mut cluster, &mut state, Instant::now(), 999);
        assert_eq!(can.with_id(id::DME1).len(), 100);
        assert_eq!(can.with_id(id::EGS1).len(), 100);
        assert_eq!(can.with_id(id::ASC3).len(), 50);
        assert_eq!(kbus.writes().len(), 2);
    }

    #[test]
    fn speed_tone_retunes_only_on_change() {
        let (_, _, outputs, mut cluster) = bench(E46Options::default());
        let calls_at_start = outputs.tone_calls();
        let mut state = VehicleState {
            speed: 100,
            ..VehicleState::default()
        };
        let t0 = Instant::now();
        run(&mut cluster, &mut state, t0, 50);
        assert_eq!(outputs.current_tone(), Some(660.0));
        assert_eq!(outputs.tone_calls(), calls_at_start + 1);

        state.speed = 0;
        run(&mut cluster, &mut state, t0 + Duration::from_millis(51), 50);
        assert_eq!(outputs.current_tone(), None);

        state.speed = 100;
        run(&mut cluster, &mut state, t0 + Duration::from_millis(102), 10);
        assert_eq!(outputs.current_tone(), Some(660.0));
    }

    #[test]
    fn blinker_is_held_for_one_body_cycle() {
        let (_, kbus, _, mut cluster) = bench(E46Options::default());
        kbus.take();
        let t0 = Instant::now();
        let mut state = VehicleState {
            left_turning_indicator: true,
            ..VehicleState::default()
        };
        cluster.update(&mut state, t0);
        state.left_turning_indicator = false;
        cluster.update(&mut state, t0 + Duration::from_millis(500));
        cluster.update(&mut state, t0 + Duration::from_millis(1000));
        let lights: Vec<u8> = kbus
            .writes()
            .iter()
            .filter_map(|w| w.get(4).copied())
            .collect();
        assert_eq!(lights, vec![0x20, 0x20, 0x00]);
    }

    #[test]
    fn consumption_wraps_and_can_be_disabled() {
        let (can, _, _, mut cluster) = bench(E46Options::default());
        cluster.consumption = 0xFFF0;
        let mut state = VehicleState {
            rpm: 6000,
            ..VehicleState::default()
        };
        let t0 = Instant::now();
        cluster.update(&mut state, t0);
        cluster.update(&mut state, t0 + Duration::from_millis(10));
        let sent: Vec<Vec<u8>> = can
            .with_id(id::DME4)
            .iter()
            .map(|f| f.data().get(1..3).map(<[u8]>::to_vec).unwrap_or_default())
            .collect();
        // 0xFFF0 + 40 = 0x10018, then reset.
        assert_eq!(sent, vec![vec![0x18, 0x00], vec![0x00, 0x00]]);

        let (can, _, _, mut cluster) = bench(E46Options {
            fake_consumption: false,
        });
        cluster.update(&mut state, t0);
        assert_eq!(
            can.last(id::DME4).map(|f| f.data().to_vec()),
            Some(dme4_frame(0, false).to_vec())
        );
    }

    #[test]
    fn discrete_lamps_follow_state() {
        let (_, _, outputs, mut cluster) = bench(E46Options::default());
        let mut state = VehicleState {
            handbrake: true,
            abs_light: true,
            fuel_quantity: 100,
            ..VehicleState::default()
        };
        cluster.update(&mut state, Instant::now());
        assert_eq!(outputs.level(OutputLine::Handbrake), Some(PinLevel::Low));
        assert_eq!(outputs.level(OutputLine::Abs), Some(PinLevel::High));
        assert_eq!(outputs.fuel_position(FuelPot::Primary), Some(42));
        assert_eq!(outputs.fuel_position(FuelPot::Secondary), Some(70));
    }
}
