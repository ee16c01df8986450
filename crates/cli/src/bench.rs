//! In-memory bench: recording transports plus the encoder factory.

use chrono::NaiveDateTime;
use opencluster_bmw_protocol::{
    E46Cluster, ESeriesCluster, FSeriesCluster, FixedClock, WallClock, e_series, e46, f_series,
};
use opencluster_core::{
    CalibrationConfig, ClusterEncoder, OutputEvent, Platform, RecordingCanBus, RecordingOutputs,
    RecordingSerialBus,
};
use opencluster_vw_protocol::{MqbCluster, PqCluster, mqb, pq};

use crate::scenario::RunConfig;

/// Recording stand-ins for the CAN bus, K-bus and discrete outputs.
#[derive(Clone, Debug, Default)]
pub struct Bench {
    pub can: RecordingCanBus,
    pub kbus: RecordingSerialBus,
    pub outputs: RecordingOutputs,
}

/// Everything one bench drained since the previous drain.
#[derive(Debug, Default)]
pub struct Drained {
    pub can: Vec<opencluster_core::CanFrame>,
    pub kbus: Vec<Vec<u8>>,
    pub outputs: Vec<OutputEvent>,
}

impl Drained {
    pub fn is_empty(&self) -> bool {
        self.can.is_empty() && self.kbus.is_empty() && self.outputs.is_empty()
    }
}

impl Bench {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Drained {
        Drained {
            can: self.can.take(),
            kbus: self.kbus.take(),
            outputs: self.outputs.take(),
        }
    }
}

/// Knobs that only matter for reproducible runs.
#[derive(Clone, Debug, Default)]
pub struct EncoderSetup {
    pub config: RunConfig,
    /// Seed for the E-series ABS filler bytes.
    pub seed: Option<u64>,
    /// Pin the E-series dashboard clock.
    pub wall_clock: Option<NaiveDateTime>,
}

/// Platform calibration after the configured overrides.
pub fn effective_calibration(platform: Platform, config: &RunConfig) -> CalibrationConfig {
    let base = match platform {
        Platform::BmwE => e_series::default_calibration(),
        Platform::BmwE46 => e46::default_calibration(),
        Platform::BmwF => f_series::default_calibration(config.f_series.mini),
        Platform::VwMqb => mqb::default_calibration(),
        Platform::VwPq25 | Platform::VwPq46 => pq::default_calibration(),
    };
    base.with_overrides(&config.calibration)
}

/// Build an encoder for `platform` wired to the bench's recorders.
pub fn build_encoder(
    platform: Platform,
    setup: &EncoderSetup,
    bench: &Bench,
) -> Box<dyn ClusterEncoder + Send> {
    let config = &setup.config;
    let overrides = &config.calibration;
    match platform {
        Platform::BmwE => match setup.wall_clock {
            Some(at) => Box::new(seeded(
                ESeriesCluster::with_clock(
                    bench.can.clone(),
                    bench.outputs.clone(),
                    FixedClock(at),
                    config.e_series,
                    overrides,
                ),
                setup.seed,
            )),
            None => Box::new(seeded(
                ESeriesCluster::new(
                    bench.can.clone(),
                    bench.outputs.clone(),
                    config.e_series,
                    overrides,
                ),
                setup.seed,
            )),
        },
        Platform::BmwE46 => Box::new(E46Cluster::new(
            bench.can.clone(),
            bench.kbus.clone(),
            bench.outputs.clone(),
            config.e46,
            overrides,
        )),
        Platform::BmwF => Box::new(FSeriesCluster::new(
            bench.can.clone(),
            config.f_series,
            overrides,
        )),
        Platform::VwMqb => Box::new(MqbCluster::new(
            bench.can.clone(),
            bench.outputs.clone(),
            config.mqb.clone(),
            overrides,
        )),
        Platform::VwPq25 => Box::new(PqCluster::pq25(
            bench.can.clone(),
            bench.outputs.clone(),
            overrides,
        )),
        Platform::VwPq46 => Box::new(PqCluster::pq46(
            bench.can.clone(),
            bench.outputs.clone(),
            overrides,
        )),
    }
}

fn seeded<C: WallClock>(
    cluster: ESeriesCluster<RecordingCanBus, RecordingOutputs, C>,
    seed: Option<u64>,
) -> ESeriesCluster<RecordingCanBus, RecordingOutputs, C> {
    match seed {
        Some(seed) => cluster.with_seed(seed),
        None => cluster,
    }
}
