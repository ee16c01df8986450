//! Output formatting for CLI responses

use anyhow::Error;
use colored::*;
use opencluster_core::{CalibrationConfig, CanFrame, OutputEvent, Platform};
use serde::Serialize;
use serde_json::json;

use crate::error::CliError;

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let kind = error
        .downcast_ref::<CliError>()
        .map_or("internal", CliError::kind);
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "type": kind
        }
    });
    print_json(&error_json);
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

/// Wrap `payload` in the success envelope and print it.
pub fn print_success<T: Serialize>(key: &str, payload: &T) {
    let mut envelope = serde_json::Map::new();
    envelope.insert("success".into(), json!(true));
    match serde_json::to_value(payload) {
        Ok(value) => {
            envelope.insert(key.into(), value);
            print_json(&serde_json::Value::Object(envelope));
        }
        Err(e) => eprintln!("Failed to format {key} as JSON: {e}"),
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format output as JSON: {e}"),
    }
}

/// Platform row for `platforms --json`.
#[derive(Debug, Serialize)]
pub struct PlatformInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub calibration: CalibrationConfig,
}

pub fn print_platforms(platforms: &[PlatformInfo], json: bool) {
    if json {
        print_success("platforms", &platforms);
        return;
    }
    println!("{}", "Supported clusters:".bold());
    for info in platforms {
        let cal = &info.calibration;
        println!("  {:<9} {}", info.name.cyan().bold(), info.description);
        println!(
            "            speed 0-{} km/h, rpm 0-{}, coolant {}-{} °C{}",
            cal.maximum_speed_value,
            cal.maximum_rpm_value,
            cal.minimum_coolant_temperature,
            cal.maximum_coolant_temperature,
            if cal.is_dual_fuel_pot {
                ", dual fuel sender"
            } else {
                ""
            }
        );
    }
}

/// candump-style log line: `(0.050) can0 0FD#A1D0000000000000`.
pub fn format_can_line(at_ms: u64, interface: &str, frame: &CanFrame) -> String {
    format!("({}) {interface} {frame}", format_timestamp(at_ms))
}

pub fn format_kbus_line(at_ms: u64, bytes: &[u8]) -> String {
    format!("({}) kbus {}", format_timestamp(at_ms), hex_spaced(bytes))
}

pub fn format_output_line(at_ms: u64, event: &OutputEvent) -> String {
    let detail = match event {
        OutputEvent::Level(line, level) => format!("{line:?} -> {level:?}"),
        OutputEvent::Tone(hz) => format!("tone {hz:.1} Hz"),
        OutputEvent::Silence => "tone off".to_string(),
        OutputEvent::Fuel {
            pot,
            position,
            forced,
        } => {
            let suffix = if *forced { " (forced)" } else { "" };
            format!("fuel {pot:?} = {position}{suffix}")
        }
    };
    format!("({}) aux {detail}", format_timestamp(at_ms))
}

fn format_timestamp(at_ms: u64) -> String {
    format!("{}.{:03}", at_ms / 1000, at_ms % 1000)
}

pub fn hex_spaced(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_run_header(platform: Platform, duration_ms: u64) {
    eprintln!(
        "{} {} for {} ms",
        "Driving".green().bold(),
        platform.name().cyan(),
        duration_ms
    );
}
