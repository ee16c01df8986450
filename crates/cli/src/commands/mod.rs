//! Command implementations for clusterctl

pub mod checksum;
pub mod platforms;
pub mod run;

use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::{Args, Subcommand, ValueEnum};
use opencluster_core::Platform;

/// Arguments of `clusterctl run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Cluster platform (bmw-e, bmw-e46, bmw-f, vw-mqb, vw-pq25, vw-pq46)
    #[arg(short, long, env = "CLUSTERCTL_PLATFORM")]
    pub platform: Platform,

    /// Vehicle-state scenario (YAML or JSON)
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Calibration overrides and platform options (YAML or JSON)
    #[arg(short, long, env = "CLUSTERCTL_CONFIG", visible_alias = "calibration")]
    pub config: Option<PathBuf>,

    /// Length of the run in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    pub duration_ms: u64,

    /// Pace the control loop against the wall clock instead of simulating
    #[arg(long)]
    pub realtime: bool,

    /// Treat a bmw-f cluster as a Mini F5x
    #[arg(long)]
    pub mini: bool,

    /// Enable MQB passthrough (requires --donor to see relayed traffic)
    #[arg(long)]
    pub passthrough: bool,

    /// candump log replayed as donor-car traffic
    #[arg(long)]
    pub donor: Option<PathBuf>,

    /// Seed for randomized filler bytes, for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fixed dashboard time, e.g. 2024-03-01T12:30:00
    #[arg(long, value_parser = parse_wall_clock)]
    pub wall_clock: Option<NaiveDateTime>,

    /// Interface name printed in the frame log
    #[arg(long, default_value = "can0")]
    pub interface: String,

    /// Print only the summary
    #[arg(short, long)]
    pub quiet: bool,
}

/// Checksum calculators for hand-building frames.
#[derive(Subcommand, Debug, Clone)]
pub enum ChecksumCommands {
    /// CRC-8/SAE-J1850 with a per-frame final XOR (BMW F-series)
    #[command(visible_alias = "bmw")]
    J1850 {
        /// Final XOR value, decimal or 0x-prefixed hex
        #[arg(long, visible_alias = "final-xor", value_parser = parse_byte)]
        xor: u8,

        /// Payload bytes after the checksum byte, as hex
        payload: String,
    },

    /// Rolling E2E checksum (VW MQB)
    #[command(visible_alias = "vw")]
    E2e {
        /// Header byte high nibble, e.g. 0xD0 for ESP_21
        #[arg(long, visible_alias = "hi", value_parser = parse_byte)]
        header: u8,

        /// Sequence counter (0-15)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..16))]
        seq: u8,

        /// Data-ID table of the frame
        #[arg(long, value_enum)]
        kennung: KennungTable,

        /// Payload bytes after the header byte, as hex
        payload: String,
    },

    /// K-bus XOR checksum (BMW E46)
    Kbus {
        /// Message bytes without the checksum, as hex
        payload: String,
    },
}

/// MQB frames with a known Data-ID table.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KennungTable {
    Esp20,
    Esp21,
    Esp24,
    Tsk07,
    LhEps01,
    MotorCode01,
    Wba03,
    Airbag01,
    KlemmenStatus01,
    LichtAnf,
    Swa01,
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let trimmed = s.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => trimmed.parse(),
    };
    parsed.map_err(|e| format!("'{s}' is not a byte value: {e}"))
}

fn parse_wall_clock(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| format!("'{s}' is not a date-time (YYYY-MM-DDTHH:MM:SS): {e}"))
}
