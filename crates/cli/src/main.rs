//! clusterctl - instrument-cluster bench tool
//!
//! Drives the cluster encoders against in-memory transports, prints the
//! frames they produce in candump form, and computes the checksums needed to
//! hand-build frames.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod bench;
mod commands;
mod completion;
mod error;
mod output;
mod scenario;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{ChecksumCommands, RunArgs};
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "clusterctl")]
#[command(about = "Drive BMW and VW instrument-cluster encoders and inspect their bus traffic")]
#[command(version)]
#[command(long_about = "
clusterctl runs a cluster encoder against recording transports and prints
every CAN frame, K-bus write and discrete-output change it makes.

Scenarios describe the vehicle state over time; config files carry
calibration overrides and platform options. Both accept YAML or JSON.
Use --json for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported cluster platforms and their default calibration
    Platforms,

    /// Run an encoder through a scenario and print its output
    Run(RunArgs),

    /// Compute frame checksums
    #[command(subcommand)]
    Checksum(ChecksumCommands),

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("clusterctl={log_level},opencluster={log_level}").into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let result = execute_command(&cli).await;

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }

            let exit_code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            std::process::exit(exit_code);
        }
    }
}

async fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Platforms => commands::platforms::execute(cli.json),
        Commands::Run(args) => commands::run::execute(args, cli.json).await,
        Commands::Checksum(cmd) => commands::checksum::execute(cmd, cli.json),
        Commands::Completion { shell } => {
            completion::generate_completion(*shell);
            Ok(())
        }
    }
}
