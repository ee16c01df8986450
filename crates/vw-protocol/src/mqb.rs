//! VW MQB encoder.
//!
//! Most MQB frames are end-to-end protected: byte 0 is the rolling checksum
//! from [`opencluster_crc::e2e`], byte 1 carries a constant high nibble and
//! the 4-bit sequence counter. The counter is shared by every frame in a fast
//! cycle and advances once, after the last frame of the cycle.
//!
//! In passthrough mode the cluster is wired to a live donor car. The encoder
//! stops originating ignition, dimming, gateway, key and blinker frames, and
//! [`MqbCluster::handle_inbound`] relays donor traffic except for the
//! identifiers it overrides.

use std::time::Instant;

use opencluster_core::{
    AuxiliaryOutputs, Cadence, CalibrationConfig, CalibrationOverrides, CanBus, CanBusExt,
    CanFrame, ClusterEncoder, FlashPhase, GearTable, Platform, RollingCounter, SignalMapping,
    VehicleState, drive_fuel_pots, init_fuel_pots,
};
use opencluster_crc::e2e::{self, Kennung};
use opencluster_curves::map_range;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::ids::mqb as id;
use crate::kennung;

/// Fast cycle: ignition, chassis, engine and gear frames.
pub const FAST_INTERVAL_MS: u64 = 50;
/// Slow cycle: lights, body, buttons and fuel.
pub const SLOW_INTERVAL_MS: u64 = 500;

/// Local gear codes: 1..=9 manual, 10 P, 11 R, 12 N, 13 D.
pub const GEAR_TABLE: GearTable =
    GearTable::new([1, 2, 3, 4, 5, 6, 7, 8, 9, 13, 10, 11, 12, 13, 13]);

/// Raw ESP_21 speed units per km/h.
const ESP_21_SCALE: f64 = 98.5;
/// ESP_24 wheel speed relative to the ESP_21 value.
const ESP_24_SCALE: f64 = 1.35;
/// Odometer units per 0.1 mile.
const ODOMETER_UNITS_PER_TENTH_MILE: f64 = 7195.0;
/// The cluster lights the traction-off lamp if the counter runs past this.
const ODOMETER_WRAP: f64 = 30000.0;
const KM_TO_MILES: f64 = 0.621371;

/// Steering-wheel events are offset by this before the MFSW lookup.
const MFSW_EVENT_OFFSET: u8 = 3;

const HEADER_ESP_20: u8 = 0x30;
const HEADER_ESP_21: u8 = 0xD0;
const HEADER_TSK_07: u8 = 0xE0;
const HEADER_MOTOR_CODE_01: u8 = 0x10;
const HEADER_LICHT_ANF: u8 = 0xC0;


/// Identifiers a donor bus must not deliver to the cluster while the
/// encoder is driving them.
pub const DEFAULT_ABSORB: [u16; 24] = [
    id::ESP_20,
    id::ESP_21,
    id::TSK_07,
    id::LH_EPS_01,
    id::MOTOR_CODE_01,
    id::MOTOR_04,
    id::MOTOR_09,
    id::ESP_24,
    id::WBA_03,
    id::AIRBAG_01,
    id::TPMS,
    id::MOTOR_14,
    id::PARK_BRAKE,
    id::BCM_01,
    id::ESP_10,
    id::ESP_02,
    id::MOTOR_18,
    id::MOTOR_26,
    id::MOTOR_07,
    id::OUTDOOR_TEMP,
    id::DOOR_STATUS,
    id::LICHT_HINTEN_01,
    id::LICHT_ANF,
    id::LICHT_VORNE_01,
];

/// Donor-bus identifiers swallowed in passthrough mode. Anything else is
/// relayed verbatim.
///
/// Which frames conflict depends on the donor car, so the list is
/// configuration; the default matches a Golf 7 donor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<u16>", into = "Vec<u16>")]
pub struct PassthroughFilter {
    absorb: Vec<u16>,
}

impl PassthroughFilter {
    pub fn new(absorb: impl IntoIterator<Item = u16>) -> Self {
        let mut absorb: Vec<u16> = absorb.into_iter().collect();
        absorb.sort_unstable();
        absorb.dedup();
        Self { absorb }
    }

    pub fn absorbs(&self, id: u16) -> bool {
        self.absorb.binary_search(&id).is_ok()
    }

    /// Absorbed identifiers, ascending.
    pub fn ids(&self) -> &[u16] {
        &self.absorb
    }
}

impl Default for PassthroughFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ABSORB)
    }
}

impl From<Vec<u16>> for PassthroughFilter {
    fn from(absorb: Vec<u16>) -> Self {
        Self::new(absorb)
    }
}

impl From<PassthroughFilter> for Vec<u16> {
    fn from(filter: PassthroughFilter) -> Self {
        filter.absorb
    }
}

/// Per-cluster frame contents that could not be pinned down from a capture.
///
/// The Data-ID tables default to the placeholders in [`kennung`] and the
/// replayed frames default to all zeros. Neither is capture-derived; a
/// cluster that rejects them needs values read off its own donor bus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqbTables {
    pub tsk_07: Kennung,
    pub lh_eps_01: Kennung,
    pub motor_code_01: Kennung,
    pub esp_24: Kennung,
    pub wba_03: Kennung,
    pub licht_anf: Kennung,
    /// Replayed unchanged every fast cycle.
    pub motor_14: [u8; 8],
    pub gateway_76: [u8; 8],
    pub rka_01: [u8; 8],
    /// Replayed unchanged every slow cycle.
    pub tpms: [u8; 8],
}

impl Default for MqbTables {
    fn default() -> Self {
        Self {
            tsk_07: kennung::TSK_07,
            lh_eps_01: kennung::LH_EPS_01,
            motor_code_01: kennung::MOTOR_CODE_01,
            esp_24: kennung::ESP_24,
            wba_03: kennung::WBA_03,
            licht_anf: kennung::LICHT_ANF,
            motor_14: [0x00; 8],
            gateway_76: [0x00; 8],
            rka_01: [0x00; 8],
            tpms: [0x00; 8],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqbOptions {
    /// Relay a donor bus instead of originating body frames.
    pub passthrough: bool,
    pub absorb: PassthroughFilter,
    pub tables: MqbTables,
}

/// Platform calibration before user overrides.
pub fn default_calibration() -> CalibrationConfig {
    CalibrationConfig {
        maximum_rpm_value: 7000,
        maximum_speed_value: 260,
        minimum_coolant_temperature: 50,
        maximum_coolant_temperature: 130,
        ..CalibrationConfig::default()
    }
}

fn to_byte(value: i32) -> u8 {
    u8::try_from(value.clamp(0, 255)).unwrap_or(u8::MAX)
}

fn sealed(mut frame: [u8; 8], header: u8, seq: u8, kennung: &Kennung) -> [u8; 8] {
    e2e::seal(&mut frame, 8, header, seq, kennung);
    frame
}

/// Terminal 15 status.
pub fn klemmen_status_frame(seq: u8, ignition: bool) -> [u8; 4] {
    let mut frame = [0x00, 0x00, if ignition { 0x03 } else { 0x01 }, 0x00];
    e2e::seal(&mut frame, 4, 0x00, seq, &kennung::KLEMMEN_STATUS_01);
    frame
}

pub fn dimmung_frame(brightness: u8) -> [u8; 8] {
    let level = to_byte(map_range(i32::from(brightness), 0, 100, 0, 255));
    [level, 0, 0, 0, 0, 0, 0, 0]
}

pub fn esp20_frame(seq: u8) -> [u8; 8] {
    sealed([0; 8], HEADER_ESP_20, seq, &kennung::ESP_20)
}

/// Raw ESP_21 vehicle speed for `speed_kmh`.
pub fn esp21_speed(speed_kmh: u32) -> u32 {
    (f64::from(speed_kmh) * ESP_21_SCALE) as u32
}

pub fn esp21_frame(seq: u8, raw_speed: u32) -> [u8; 8] {
    let [lo, hi, ..] = raw_speed.to_le_bytes();
    sealed(
        [0, 0, 0, 0, lo, hi, 0, 0],
        HEADER_ESP_21,
        seq,
        &kennung::ESP_21,
    )
}

pub fn tsk07_frame(seq: u8, kennung: &Kennung) -> [u8; 8] {
    sealed([0; 8], HEADER_TSK_07, seq, kennung)
}

pub fn lh_eps01_frame(seq: u8, kennung: &Kennung) -> [u8; 8] {
    sealed([0; 8], 0x00, seq, kennung)
}

pub fn motor_code01_frame(seq: u8, kennung: &Kennung) -> [u8; 8] {
    sealed([0; 8], HEADER_MOTOR_CODE_01, seq, kennung)
}

/// Engine speed in thirds of an RPM.
pub fn motor04_frame(rpm: u32) -> [u8; 8] {
    let [lo, hi, ..] = (rpm / 3).to_le_bytes();
    [0, 0, 0, lo, hi, 0, 0, 0]
}

/// Oil temperature, offset by 60 and limited to what the gauge shows.
pub fn motor07_frame(oil_temperature: i32) -> [u8; 8] {
    let oil = to_byte(60 + oil_temperature.clamp(49, 193));
    [0, 0, oil, 0, 0, 0, 0, 0]
}

/// Coolant needle, 50..130 °C across 0x80..0xED.
pub fn motor09_frame(coolant: i32) -> [u8; 8] {
    [to_byte(map_range(coolant, 50, 130, 0x80, 0xED)), 0, 0, 0, 0, 0, 0, 0]
}

/// Odometer units covered in one fast cycle at `raw_speed`.
pub fn odometer_increment(raw_speed: u32) -> f64 {
    let miles_per_hour = f64::from(raw_speed) / 100.0 * KM_TO_MILES;
    let hours = (FAST_INTERVAL_MS as f64 / 1000.0) / 3600.0;
    miles_per_hour * hours * (ODOMETER_UNITS_PER_TENTH_MILE / 0.1)
}

pub fn esp24_frame(seq: u8, raw_speed: u32, odometer: u16, kennung: &Kennung) -> [u8; 8] {
    let wheel = (f64::from(raw_speed) * ESP_24_SCALE) as u32;
    let [speed_lo, speed_hi, ..] = wheel.to_le_bytes();
    let [odo_lo, odo_hi] = odometer.to_le_bytes();
    sealed(
        [0, 0, speed_lo, speed_hi, 0, odo_lo, odo_hi, 0],
        0x00,
        seq,
        kennung,
    )
}

/// `(gear, selector)` for a local gear code. Manual gears show as M.
pub fn wba03_codes(local_gear: u8) -> (u8, u8) {
    match local_gear {
        1..=9 => (local_gear, 0x60),
        10 => (0, 0x10),
        11 => (0, 0x20),
        12 => (0, 0x30),
        13 => (0, 0x40),
        _ => (0, 0),
    }
}

/// Gear selector. The selector nibble doubles as the checksum header.
pub fn wba03_frame(seq: u8, local_gear: u8, kennung: &Kennung) -> [u8; 8] {
    let (gear, selector) = wba03_codes(local_gear);
    sealed([0, 0, 0, gear, 0, 0, 0, 0], selector, seq, kennung)
}

pub fn airbag01_frame(seq: u8) -> [u8; 8] {
    sealed([0; 8], 0x00, seq, &kennung::AIRBAG_01)
}

/// Lamp bits for BLINKMODI_02 byte 3.
pub fn blinker_bits(left: bool, right: bool) -> u8 {
    (if left { 0x0A } else { 0 }) | (if right { 0x14 } else { 0 })
}

/// Not checksummed; byte 1 still carries the sequence counter.
pub fn blinkmodi_frame(seq: u8, lamps: u8) -> [u8; 8] {
    [0, seq & 0x0F, 0, lamps, 0, 0, 0, 0]
}

pub fn park_brake_frame(handbrake: bool) -> [u8; 4] {
    [if handbrake { 0x04 } else { 0x00 }, 0, 0, 0]
}

pub fn licht_vorne_frame(high_beam: bool, rear_fog: bool) -> [u8; 8] {
    [
        0,
        if high_beam { 0x40 } else { 0x00 },
        if rear_fog { 0x03 } else { 0x04 },
        0,
        0,
        0,
        0,
        0,
    ]
}

pub fn licht_anf_frame(seq: u8, kennung: &Kennung) -> [u8; 8] {
    sealed([0; 8], HEADER_LICHT_ANF, seq, kennung)
}

pub fn licht_hinten_frame(seq: u8) -> [u8; 8] {
    [seq & 0x0F, 0, 0, 0, 0, 0, 0, 0]
}

/// Byte 3 is a door bitmap; any open door lights the front-left bit.
pub fn door_status_frame(door_open: bool) -> [u8; 8] {
    [0, 0, 0, u8::from(door_open), 0, 0, 0, 0]
}

/// Half-degree steps from -50 °C.
pub fn outdoor_temp_frame(celsius: i32) -> [u8; 8] {
    let raw = 50i32.saturating_add(celsius).wrapping_shl(1) as u8;
    [raw, 0, 0, 0, 0, 0, 0, 0]
}

/// `(byte 0, byte 2)` of the MFSW frame for a button code.
pub fn mfsw_codes(code: u8) -> Option<(u8, u8)> {
    let codes = match code {
        1 => (0x01, 0x01), // menu
        2 => (0x02, 0x01), // right
        3 => (0x03, 0x01), // left
        4 => (0x06, 0x01), // up
        5 => (0x06, 0x0F), // down
        6 => (0x07, 0x01), // ok
        7 => (0x21, 0x01), // asterisk
        8 => (0x23, 0x01), // view
        _ => return None,
    };
    Some(codes)
}

pub fn mfsw_frame(code: u8) -> Option<[u8; 4]> {
    mfsw_codes(code).map(|(key, action)| [key, 0, action, 0])
}

pub const MFSW_RELEASE: [u8; 4] = [0; 4];

/// MQB cluster on one CAN bus plus its fuel senders.
#[derive(Debug)]
pub struct MqbCluster<B, O> {
    bus: B,
    outputs: O,
    options: MqbOptions,
    mapping: SignalMapping,
    fast: Cadence,
    slow: Cadence,
    seq: RollingCounter,
    blink: FlashPhase,
    odometer: f64,
    release_pending: bool,
}

impl<B: CanBus, O: AuxiliaryOutputs> MqbCluster<B, O> {
    pub fn new(
        bus: B,
        mut outputs: O,
        options: MqbOptions,
        overrides: &CalibrationOverrides,
    ) -> Self {
        let calibration = default_calibration().with_overrides(overrides);
        init_fuel_pots(&mut outputs);
        info!(
            passthrough = options.passthrough,
            absorbed = options.absorb.ids().len(),
            ?calibration,
            "MQB cluster ready"
        );
        Self {
            bus,
            outputs,
            options,
            mapping: SignalMapping::new(calibration, GEAR_TABLE),
            fast: Cadence::from_millis(FAST_INTERVAL_MS),
            slow: Cadence::from_millis(SLOW_INTERVAL_MS),
            seq: RollingCounter::nibble(),
            blink: FlashPhase::new(),
            odometer: 0.0,
            release_pending: false,
        }
    }

    pub fn mapping(&self) -> &SignalMapping {
        &self.mapping
    }

    pub fn options(&self) -> &MqbOptions {
        &self.options
    }

    /// Sequence counter the next fast cycle will use.
    pub fn sequence(&self) -> u8 {
        self.seq.value()
    }

    /// Odometer counter as last sent in ESP_24.
    pub fn odometer(&self) -> u16 {
        self.odometer as u16
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    fn blinker_lamps(&mut self, state: &VehicleState) -> u8 {
        let lamps = blinker_bits(state.left_turning_indicator, state.right_turning_indicator);
        if !state.turning_indicators_blinking {
            self.blink.reset();
            return lamps;
        }
        if self.blink.advance() { lamps } else { 0 }
    }

    fn fast_cycle(&mut self, state: &VehicleState) {
        let seq = self.seq.value();
        let bridged = self.options.passthrough;
        let speed = esp21_speed(self.mapping.speed(state));
        let rpm = self.mapping.rpm(state);
        let coolant = self.mapping.coolant(state);
        let gear = self.mapping.gear(state);

        if self.release_pending {
            self.bus.emit(id::MFSW, &MFSW_RELEASE);
            self.release_pending = false;
        }

        if !bridged {
            self.bus
                .emit(id::KLEMMEN_STATUS_01, &klemmen_status_frame(seq, state.ignition));
            self.bus
                .emit(id::DIMMUNG_01, &dimmung_frame(state.backlight_brightness));
        }

        self.bus.emit(id::ESP_20, &esp20_frame(seq));
        self.bus.emit(id::ESP_21, &esp21_frame(seq, speed));
        let tables = &self.options.tables;
        self.bus.emit(id::MOTOR_14, &tables.motor_14);
        if !bridged {
            self.bus.emit(id::GATEWAY_76, &tables.gateway_76);
        }

        self.bus.emit(id::TSK_07, &tsk07_frame(seq, &tables.tsk_07));
        self.bus
            .emit(id::LH_EPS_01, &lh_eps01_frame(seq, &tables.lh_eps_01));

        self.bus.emit(
            id::MOTOR_CODE_01,
            &motor_code01_frame(seq, &tables.motor_code_01),
        );
        self.bus.emit(id::MOTOR_04, &motor04_frame(rpm));
        self.bus
            .emit(id::MOTOR_07, &motor07_frame(state.oil_temperature));
        self.bus.emit(id::MOTOR_09, &motor09_frame(coolant));

        self.odometer += odometer_increment(speed);
        let esp24 = esp24_frame(
            seq,
            speed,
            self.odometer as u16,
            &self.options.tables.esp_24,
        );
        self.bus.emit(id::ESP_24, &esp24);
        if speed == 0 || self.odometer >= ODOMETER_WRAP {
            self.odometer = 0.0;
        }

        self.bus
            .emit(id::WBA_03, &wba03_frame(seq, gear, &self.options.tables.wba_03));
        if !bridged {
            self.bus.emit(id::RKA_01, &self.options.tables.rka_01);
        }

        self.bus.emit(id::AIRBAG_01, &airbag01_frame(seq));

        if !bridged {
            let lamps = self.blinker_lamps(state);
            self.bus.emit(id::BLINKMODI_02, &blinkmodi_frame(seq, lamps));
        }
        self.bus
            .emit(id::PARK_BRAKE, &park_brake_frame(state.handbrake));

        self.seq.advance();
    }

    fn slow_cycle(&mut self, state: &mut VehicleState) {
        let seq = self.seq.value();
        self.bus.emit(id::TPMS, &self.options.tables.tpms);
        self.bus.emit(
            id::LICHT_VORNE_01,
            &licht_vorne_frame(state.high_beam, state.rear_fog_light),
        );
        self.bus.emit(
            id::LICHT_ANF,
            &licht_anf_frame(seq, &self.options.tables.licht_anf),
        );
        self.bus.emit(id::LICHT_HINTEN_01, &licht_hinten_frame(seq));
        self.bus
            .emit(id::DOOR_STATUS, &door_status_frame(state.door_open));
        self.bus.emit(
            id::OUTDOOR_TEMP,
            &outdoor_temp_frame(state.outdoor_temperature),
        );

        if let Some(button) = state.take_button_event() {
            let code = button.saturating_add(MFSW_EVENT_OFFSET);
            match mfsw_frame(code) {
                Some(frame) => {
                    debug!(button, code, "steering-wheel button pressed");
                    self.bus.emit(id::MFSW, &frame);
                    self.release_pending = true;
                }
                None => debug!(button, "no MFSW mapping for button, dropped"),
            }
        }

        drive_fuel_pots(
            &mut self.outputs,
            state.fuel_quantity,
            self.mapping.calibration(),
        );
    }
}

impl<B: CanBus, O: AuxiliaryOutputs> ClusterEncoder for MqbCluster<B, O> {
    fn platform(&self) -> Platform {
        Platform::VwMqb
    }

    fn update(&mut self, state: &mut VehicleState, now: Instant) {
        if self.fast.poll(now) {
            self.fast_cycle(state);
        }
        if self.slow.poll(now) {
            self.slow_cycle(state);
        }
    }

    fn handle_inbound(&mut self, frame: &CanFrame) {
        if !self.options.passthrough {
            return;
        }
        let raw = frame.raw_id();
        if self.options.absorb.absorbs(raw) {
            trace!(id = raw, "donor frame absorbed");
        } else {
            trace!(id = raw, "donor frame relayed");
            self.bus.emit_frame(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencluster_core::{FuelPot, GearState, RecordingCanBus, RecordingOutputs};
    use opencluster_crc::e2e::{autosar_crc8, rolling_crc};
    use std::time::Duration;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    type Bench = (
        RecordingCanBus,
        RecordingOutputs,
        MqbCluster<RecordingCanBus, RecordingOutputs>,
    );

    fn bench(options: MqbOptions) -> Bench {
        let bus = RecordingCanBus::new();
        let outputs = RecordingOutputs::new();
        let cluster = MqbCluster::new(
            bus.clone(),
            outputs.clone(),
            options,
            &CalibrationOverrides::default(),
        );
        (bus, outputs, cluster)
    }

    fn bridged() -> MqbOptions {
        MqbOptions {
            passthrough: true,
            ..MqbOptions::default()
        }
    }

    fn verifies(frame: &[u8], header: u8, kennung: &Kennung) -> bool {
        let seq = frame[1] & 0x0F;
        frame[0] == rolling_crc(header, seq, &frame[2..], kennung)
    }

    #[test]
    fn klemmen_checksum_is_autosar_over_framed_bytes() {
        for seq in 0..16 {
            let frame = klemmen_status_frame(seq, true);
            assert_eq!(frame[1], seq);
            assert_eq!(frame[2], 0x03);
            assert_eq!(frame[0], autosar_crc8(&[seq, 0x03, 0x00, 0xC3]));
        }
        assert_eq!(klemmen_status_frame(0, false)[2], 0x01);
    }

    #[test]
    fn esp20_frames_match_reference_bytes() {
        const CRC: [u8; 16] = [
            0x93, 0xC3, 0x96, 0x14, 0x65, 0x6A, 0x64, 0xEE, 0xF3, 0xEA, 0xA1, 0xED, 0x23, 0x47,
            0xEB, 0x8F,
        ];
        for (seq, crc) in (0..16u8).zip(CRC) {
            assert_eq!(esp20_frame(seq), [crc, 0x30 | seq, 0, 0, 0, 0, 0, 0], "seq {seq}");
        }
    }

    #[test]
    fn klemmen_status_frames_match_reference_bytes() {
        const CRC: [u8; 16] = [
            0x74, 0xC1, 0x31, 0x84, 0xFE, 0x4B, 0xBB, 0x0E, 0x4F, 0xFA, 0x0A, 0xBF, 0xC5, 0x70,
            0x80, 0x35,
        ];
        for (seq, crc) in (0..16u8).zip(CRC) {
            assert_eq!(klemmen_status_frame(seq, true), [crc, seq, 0x03, 0x00], "seq {seq}");
        }
    }

    #[test]
    fn wba03_drive_frames_match_reference_bytes() {
        const CRC: [u8; 16] = [
            0xA2, 0xC6, 0x6A, 0x0E, 0x1D, 0x79, 0xD5, 0xB1, 0xF3, 0x97, 0x3B, 0x5F, 0x4C, 0x28,
            0x84, 0xE0,
        ];
        let drive = GEAR_TABLE.code(GearState::AutoD);
        let table = MqbTables::default().wba_03;
        for (seq, crc) in (0..16u8).zip(CRC) {
            assert_eq!(
                wba03_frame(seq, drive, &table),
                [crc, 0x40 | seq, 0, 0, 0, 0, 0, 0],
                "seq {seq}"
            );
        }
    }

    #[test]
    fn frame_tables_come_from_config() -> TestResult {
        let options: MqbOptions = serde_yaml::from_str(
            "tables:\n  wba_03: [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]\n  tpms: [0, 0, 0, 0, 0, 0, 0, 128]\n",
        )?;
        assert_eq!(options.tables.wba_03[15], 16);
        assert_eq!(options.tables.esp_24, kennung::ESP_24);
        let wba_03 = options.tables.wba_03;

        let (bus, _, mut cluster) = bench(options);
        let mut state = VehicleState {
            gear: GearState::AutoD,
            ..VehicleState::default()
        };
        cluster.update(&mut state, Instant::now());

        let wba03 = bus.last(id::WBA_03).ok_or("no WBA_03")?;
        assert!(verifies(wba03.data(), 0x40, &wba_03));
        assert!(!verifies(wba03.data(), 0x40, &kennung::WBA_03));
        let tpms = bus.last(id::TPMS).ok_or("no TPMS")?;
        assert_eq!(tpms.data(), &[0, 0, 0, 0, 0, 0, 0, 0x80]);
        Ok(())
    }

    #[test]
    fn default_tables_are_the_placeholders() {
        let tables = MqbTables::default();
        assert_eq!(tables.tsk_07, kennung::TSK_07);
        assert_eq!(tables.lh_eps_01, kennung::LH_EPS_01);
        assert_eq!(tables.motor_code_01, kennung::MOTOR_CODE_01);
        assert_eq!(tables.licht_anf, kennung::LICHT_ANF);
        assert_eq!(tables.motor_14, [0; 8]);
        assert_eq!(tables.gateway_76, [0; 8]);
        assert_eq!(tables.rka_01, [0; 8]);
    }

    #[test]
    fn speed_and_gear_reach_esp21_and_wba03() -> TestResult {
        let (bus, _, mut cluster) = bench(MqbOptions::default());
        let mut state = VehicleState {
            speed: 100,
            rpm: 3000,
            gear: GearState::AutoD,
            handbrake: false,
            ..VehicleState::default()
        };
        cluster.update(&mut state, Instant::now());

        let esp21 = bus.last(id::ESP_21).ok_or("no ESP_21")?;
        assert_eq!(esp21.data()[4], 0x7A);
        assert_eq!(esp21.data()[5], 0x26);
        assert_eq!(esp21.data()[1], 0xD0);
        assert!(verifies(esp21.data(), HEADER_ESP_21, &kennung::ESP_21));

        let wba03 = bus.last(id::WBA_03).ok_or("no WBA_03")?;
        assert_eq!(wba03.data()[1], 0x40);
        assert_eq!(wba03.data()[3], 0);
        assert!(verifies(wba03.data(), 0x40, &kennung::WBA_03));
        let esp24 = bus.last(id::ESP_24).ok_or("no ESP_24")?;
        assert!(verifies(esp24.data(), 0x00, &kennung::ESP_24));

        let motor04 = bus.last(id::MOTOR_04).ok_or("no Motor_04")?;
        assert_eq!(&motor04.data()[3..5], &1000u16.to_le_bytes());
        Ok(())
    }

    #[test]
    fn wba03_selectors() {
        assert_eq!(wba03_codes(GEAR_TABLE.code(GearState::Manual3)), (3, 0x60));
        assert_eq!(wba03_codes(GEAR_TABLE.code(GearState::AutoP)), (0, 0x10));
        assert_eq!(wba03_codes(GEAR_TABLE.code(GearState::AutoR)), (0, 0x20));
        assert_eq!(wba03_codes(GEAR_TABLE.code(GearState::AutoN)), (0, 0x30));
        assert_eq!(wba03_codes(GEAR_TABLE.code(GearState::Manual10)), (0, 0x40));
        assert_eq!(wba03_codes(0), (0, 0));

        let frame = wba03_frame(5, 3, &kennung::WBA_03);
        assert_eq!(frame[1], 0x65);
        assert_eq!(frame[3], 3);
    }

    #[test]
    fn one_sequence_value_per_fast_cycle() -> TestResult {
        let (bus, _, mut cluster) = bench(MqbOptions::default());
        let mut state = VehicleState::default();
        let start = Instant::now();
        for step in 0..20u64 {
            cluster.update(&mut state, start + Duration::from_millis(step * FAST_INTERVAL_MS));
        }
        let esp20 = bus.with_id(id::ESP_20);
        let airbag = bus.with_id(id::AIRBAG_01);
        assert_eq!(esp20.len(), 20);
        for (cycle, (a, b)) in esp20.iter().zip(&airbag).enumerate() {
            let expected = (cycle % 16) as u8;
            assert_eq!(a.data()[1], HEADER_ESP_20 | expected);
            assert_eq!(b.data()[1], expected);
            assert!(verifies(a.data(), HEADER_ESP_20, &kennung::ESP_20));
            assert!(verifies(b.data(), 0x00, &kennung::AIRBAG_01));
        }
        assert_eq!(cluster.sequence(), 4);
        let licht = bus.last(id::LICHT_ANF).ok_or("no Licht_Anf")?;
        assert!(verifies(licht.data(), HEADER_LICHT_ANF, &kennung::LICHT_ANF));
        Ok(())
    }

    #[test]
    fn passthrough_stops_body_frames() {
        let (bus, _, mut cluster) = bench(bridged());
        cluster.update(&mut VehicleState::default(), Instant::now());
        let ids = bus.ids();
        for silent in [
            id::KLEMMEN_STATUS_01,
            id::DIMMUNG_01,
            id::GATEWAY_76,
            id::RKA_01,
            id::BLINKMODI_02,
        ] {
            assert!(!ids.contains(&silent), "{silent:#X} sent while bridged");
        }
        assert!(ids.contains(&id::ESP_21));
        assert!(ids.contains(&id::PARK_BRAKE));
    }

    #[test]
    fn inbound_frames_ignored_unless_bridged() -> TestResult {
        let (bus, _, mut cluster) = bench(MqbOptions::default());
        cluster.handle_inbound(&CanFrame::new(0x123, &[1, 2, 3])?);
        assert!(bus.is_empty());
        Ok(())
    }

    #[test]
    fn bridged_inbound_absorbs_known_and_relays_the_rest() -> TestResult {
        let (bus, _, mut cluster) = bench(bridged());
        cluster.handle_inbound(&CanFrame::new(id::ESP_21, &[0; 8])?);
        cluster.handle_inbound(&CanFrame::new(id::BCM_01, &[0; 8])?);
        assert!(bus.is_empty());

        let donor = CanFrame::new(id::KLEMMEN_STATUS_01, &[0xAA, 0x01, 0x03, 0x00])?;
        cluster.handle_inbound(&donor);
        assert_eq!(bus.frames(), vec![donor]);
        Ok(())
    }

    #[test]
    fn absorb_list_is_configurable() -> TestResult {
        let options: MqbOptions =
            serde_yaml::from_str("passthrough: true\nabsorb: [291, 253]\n")?;
        assert_eq!(options.absorb.ids(), &[0x0FD, 0x123]);
        let (bus, _, mut cluster) = bench(options);
        cluster.handle_inbound(&CanFrame::new(0x123, &[1])?);
        cluster.handle_inbound(&CanFrame::new(id::ESP_20, &[2])?);
        assert_eq!(bus.ids(), vec![id::ESP_20]);
        Ok(())
    }

    #[test]
    fn default_filter_matches_constant_list() {
        let filter = PassthroughFilter::default();
        assert_eq!(filter.ids().len(), DEFAULT_ABSORB.len());
        assert!(DEFAULT_ABSORB.iter().all(|&id| filter.absorbs(id)));
        assert!(!filter.absorbs(id::KLEMMEN_STATUS_01));
    }

    #[test]
    fn button_press_is_released_next_fast_cycle() -> TestResult {
        let (bus, _, mut cluster) = bench(MqbOptions::default());
        let mut state = VehicleState {
            button_event: 3,
            ..VehicleState::default()
        };
        let start = Instant::now();
        cluster.update(&mut state, start);
        assert_eq!(state.button_event, 0);
        let press = bus.with_id(id::MFSW);
        assert_eq!(press.len(), 1);
        assert_eq!(press[0].data(), &[0x07, 0x00, 0x01, 0x00]);

        cluster.update(&mut state, start + Duration::from_millis(FAST_INTERVAL_MS));
        let frames = bus.with_id(id::MFSW);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].data(), &MFSW_RELEASE);
        Ok(())
    }

    #[test]
    fn unmapped_button_is_consumed_silently() {
        let (bus, _, mut cluster) = bench(MqbOptions::default());
        let mut state = VehicleState {
            button_event: 9,
            ..VehicleState::default()
        };
        cluster.update(&mut state, Instant::now());
        assert_eq!(state.button_event, 0);
        assert!(bus.with_id(id::MFSW).is_empty());
    }

    #[test]
    fn odometer_accumulates_and_resets_when_stopped() {
        let (_, _, mut cluster) = bench(MqbOptions::default());
        let mut state = VehicleState {
            speed: 100,
            ..VehicleState::default()
        };
        let start = Instant::now();
        for step in 0..10u64 {
            cluster.update(&mut state, start + Duration::from_millis(step * FAST_INTERVAL_MS));
        }
        let expected = odometer_increment(esp21_speed(100)) * 10.0;
        assert_eq!(cluster.odometer(), expected as u16);

        state.speed = 0;
        cluster.update(&mut state, start + Duration::from_millis(10 * FAST_INTERVAL_MS));
        assert_eq!(cluster.odometer(), 0);
    }

    #[test]
    fn engine_gauges() {
        assert_eq!(motor07_frame(0)[2], 109);
        assert_eq!(motor07_frame(90)[2], 150);
        assert_eq!(motor07_frame(500)[2], 253);
        assert_eq!(motor09_frame(50)[0], 0x80);
        assert_eq!(motor09_frame(130)[0], 0xED);
        assert_eq!(motor04_frame(6000)[3..5], 2000u16.to_le_bytes());
    }

    #[test]
    fn body_frames() {
        assert_eq!(outdoor_temp_frame(20)[0], 140);
        assert_eq!(outdoor_temp_frame(-50)[0], 0);
        assert_eq!(licht_vorne_frame(true, false)[1..3], [0x40, 0x04]);
        assert_eq!(licht_vorne_frame(false, true)[1..3], [0x00, 0x03]);
        assert_eq!(door_status_frame(true)[3], 1);
        assert_eq!(park_brake_frame(true), [0x04, 0, 0, 0]);
        assert_eq!(dimmung_frame(100)[0], 255);
        assert_eq!(dimmung_frame(50)[0], 127);
    }

    #[test]
    fn blinkers_flash_nine_on_seven_off() {
        let (bus, _, mut cluster) = bench(MqbOptions::default());
        let mut state = VehicleState {
            left_turning_indicator: true,
            turning_indicators_blinking: true,
            ..VehicleState::default()
        };
        let start = Instant::now();
        for step in 0..32u64 {
            cluster.update(&mut state, start + Duration::from_millis(step * FAST_INTERVAL_MS));
        }
        let lit: Vec<bool> = bus
            .with_id(id::BLINKMODI_02)
            .iter()
            .map(|f| f.data()[3] == 0x0A)
            .collect();
        assert_eq!(lit.len(), 32);
        assert_eq!(lit.iter().filter(|on| **on).count(), 18);
        assert!(lit[..8].iter().all(|on| *on));
        assert!(lit[8..15].iter().all(|on| !*on));
    }

    #[test]
    fn steady_blinkers_without_flashing() {
        assert_eq!(blinker_bits(true, true), 0x1E);
        let (bus, _, mut cluster) = bench(MqbOptions::default());
        let mut state = VehicleState {
            right_turning_indicator: true,
            ..VehicleState::default()
        };
        cluster.update(&mut state, Instant::now());
        let frames = bus.with_id(id::BLINKMODI_02);
        assert_eq!(frames[0].data()[3], 0x14);
    }

    #[test]
    fn fuel_pots_forced_then_driven() {
        let (_, outputs, mut cluster) = bench(MqbOptions::default());
        assert_eq!(outputs.fuel_position(FuelPot::Primary), Some(100));
        let mut state = VehicleState {
            fuel_quantity: 0,
            ..VehicleState::default()
        };
        cluster.update(&mut state, Instant::now());
        assert_eq!(outputs.fuel_position(FuelPot::Primary), Some(18));
    }

    #[test]
    fn rpm_uses_rpm_factor() {
        let overrides = CalibrationOverrides {
            speed_correction_factor: Some(2.0),
            rpm_correction_factor: Some(0.5),
            ..CalibrationOverrides::default()
        };
        let cluster = MqbCluster::new(
            RecordingCanBus::new(),
            RecordingOutputs::new(),
            MqbOptions::default(),
            &overrides,
        );
        let state = VehicleState {
            rpm: 4000,
            ..VehicleState::default()
        };
        assert_eq!(cluster.mapping().rpm(&state), 2000);
    }
}
