//! `clusterctl run`: drive one encoder through a scenario.
//!
//! The default mode simulates time: the control loop runs once per
//! millisecond of scenario time as fast as the host allows, so output is
//! reproducible. `--realtime` paces the same loop on a tokio interval and can
//! be stopped with Ctrl-C.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use opencluster_core::{CanFrame, ClusterDriver, Platform, SharedVehicleState};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::bench::{Bench, Drained, EncoderSetup, build_encoder};
use crate::commands::RunArgs;
use crate::commands::checksum::parse_hex;
use crate::error::CliError;
use crate::output;
use crate::scenario::{RunConfig, Scenario};

/// One frame from a donor capture, relative to the first frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DonorFrame {
    pub at_ms: u64,
    pub frame: CanFrame,
}

#[derive(Debug, Serialize)]
struct LogEntry {
    at_ms: u64,
    bus: &'static str,
    data: String,
}

#[derive(Debug, Default, Serialize)]
struct RunSummary {
    can_frames: u64,
    kbus_writes: u64,
    output_events: u64,
    donor_frames: u64,
    /// Frame count per CAN identifier, keyed as three-digit hex.
    per_id: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    platform: Platform,
    duration_ms: u64,
    ticks: u64,
    summary: &'a RunSummary,
    log: &'a [LogEntry],
}

struct Session {
    driver: ClusterDriver,
    bench: Bench,
    scenario: Scenario,
    donor: Vec<DonorFrame>,
    next_donor: usize,
    interface: String,
    json: bool,
    quiet: bool,
    log: Vec<LogEntry>,
    summary: RunSummary,
}

impl Session {
    fn step(&mut self, elapsed_ms: u64, now: Instant) {
        self.scenario.apply_due(elapsed_ms, self.driver.state());
        while let Some(donor) = self.donor.get(self.next_donor) {
            if donor.at_ms > elapsed_ms {
                break;
            }
            self.driver.route_inbound(&donor.frame);
            self.summary.donor_frames += 1;
            self.next_donor += 1;
        }
        self.driver.tick(now);
        let drained = self.bench.drain();
        self.record(elapsed_ms, drained);
    }

    fn record(&mut self, at_ms: u64, drained: Drained) {
        if drained.is_empty() {
            return;
        }
        let summary = &mut self.summary;
        summary.can_frames += drained.can.len() as u64;
        summary.kbus_writes += drained.kbus.len() as u64;
        summary.output_events += drained.outputs.len() as u64;
        for frame in &drained.can {
            *summary
                .per_id
                .entry(format!("{:03X}", frame.raw_id()))
                .or_default() += 1;
        }

        if self.json {
            let entry = |bus, data| LogEntry { at_ms, bus, data };
            let can = drained.can.iter().map(|f| entry("can", f.to_string()));
            let kbus = drained
                .kbus
                .iter()
                .map(|b| entry("kbus", output::hex_spaced(b)));
            let aux = drained
                .outputs
                .iter()
                .map(|e| entry("aux", format!("{e:?}")));
            self.log.extend(can.chain(kbus).chain(aux));
        } else if !self.quiet {
            for frame in &drained.can {
                println!("{}", output::format_can_line(at_ms, &self.interface, frame));
            }
            for bytes in &drained.kbus {
                println!("{}", output::format_kbus_line(at_ms, bytes));
            }
            for event in &drained.outputs {
                println!("{}", output::format_output_line(at_ms, event));
            }
        }
    }
}

pub async fn execute(args: &RunArgs, json: bool) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if args.mini {
        config.f_series.mini = true;
    }
    if args.passthrough {
        config.mqb.passthrough = true;
    }
    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::default(),
    };
    let donor = match &args.donor {
        Some(path) => load_donor(path)?,
        None => Vec::new(),
    };
    if !donor.is_empty() && !(args.platform == Platform::VwMqb && config.mqb.passthrough) {
        warn!(
            frames = donor.len(),
            "Donor traffic only reaches an MQB cluster with passthrough enabled"
        );
    }

    let bench = Bench::new();
    let setup = EncoderSetup {
        config,
        seed: args.seed,
        wall_clock: args.wall_clock,
    };
    let encoder = build_encoder(args.platform, &setup, &bench);
    let driver = ClusterDriver::new(SharedVehicleState::default()).with_encoder(encoder);
    info!(
        platform = %args.platform,
        duration_ms = args.duration_ms,
        realtime = args.realtime,
        "Starting run"
    );

    let mut session = Session {
        driver,
        bench,
        scenario,
        donor,
        next_donor: 0,
        interface: args.interface.clone(),
        json,
        quiet: args.quiet,
        log: Vec::new(),
        summary: RunSummary::default(),
    };

    if !json && !args.quiet {
        output::print_run_header(args.platform, args.duration_ms);
    }
    if args.realtime {
        run_realtime(&mut session, args.duration_ms).await;
    } else {
        run_simulated(&mut session, args.duration_ms);
    }

    let ticks = session.driver.ticks();
    debug!(ticks, summary = ?session.summary, "Run finished");
    if json {
        output::print_success(
            "run",
            &RunReport {
                platform: args.platform,
                duration_ms: args.duration_ms,
                ticks,
                summary: &session.summary,
                log: &session.log,
            },
        );
    } else {
        let s = &session.summary;
        eprintln!(
            "{ticks} ticks: {} CAN frames on {} ids, {} K-bus writes, {} output events",
            s.can_frames,
            s.per_id.len(),
            s.kbus_writes,
            s.output_events
        );
    }
    Ok(())
}

fn run_simulated(session: &mut Session, duration_ms: u64) {
    let start = Instant::now();
    for elapsed in 0..=duration_ms {
        session.step(elapsed, start + Duration::from_millis(elapsed));
    }
}

async fn run_realtime(session: &mut Session, duration_ms: u64) {
    let mut interval = tokio::time::interval(Duration::from_millis(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let start = Instant::now();

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
        let now = Instant::now();
        let elapsed = u64::try_from(now.saturating_duration_since(start).as_millis())
            .unwrap_or(u64::MAX);
        if elapsed > duration_ms {
            break;
        }
        session.step(elapsed, now);
    }
}

/// Read a candump log (`(ts) iface ID#DATA` or bare `ID#DATA` per line).
///
/// Timestamps are made relative to the first frame; lines without one are
/// replayed at the start of the run.
pub fn load_donor(path: &Path) -> Result<Vec<DonorFrame>, CliError> {
    let text = std::fs::read_to_string(path)?;
    let frames = parse_donor(&text)?;
    debug!(path = %path.display(), frames = frames.len(), "Loaded donor capture");
    Ok(frames)
}

pub fn parse_donor(text: &str) -> Result<Vec<DonorFrame>, CliError> {
    let mut first_ms: Option<u64> = None;
    let mut frames = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let invalid = |reason: String| CliError::InvalidCapture {
            line: index + 1,
            reason,
        };

        let at_ms = match line.strip_prefix('(').and_then(|rest| rest.split_once(')')) {
            Some((stamp, _)) => {
                let seconds: f64 = stamp
                    .trim()
                    .parse()
                    .map_err(|e| invalid(format!("bad timestamp '{stamp}': {e}")))?;
                let ms = (seconds * 1000.0) as u64;
                let origin = *first_ms.get_or_insert(ms);
                ms.saturating_sub(origin)
            }
            None => 0,
        };

        let token = line
            .split_whitespace()
            .find(|t| t.contains('#'))
            .ok_or_else(|| invalid("no ID#DATA field".to_string()))?;
        let (id, data) = token
            .split_once('#')
            .ok_or_else(|| invalid("no ID#DATA field".to_string()))?;
        let id = u16::from_str_radix(id, 16)
            .map_err(|e| invalid(format!("bad identifier '{id}': {e}")))?;
        let data = parse_hex(data).map_err(|e| invalid(e.to_string()))?;
        let frame = CanFrame::new(id, &data).map_err(|e| invalid(e.to_string()))?;
        frames.push(DonorFrame { at_ms, frame });
    }
    frames.sort_by_key(|f| f.at_ms);
    Ok(frames)
}
