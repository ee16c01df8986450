//! `clusterctl checksum`

use anyhow::Result;
use opencluster_bmw_protocol::kbus_checksum;
use opencluster_crc::e2e::{self, Kennung};
use opencluster_crc::j1850;
use opencluster_vw_protocol::kennung;
use serde::Serialize;

use crate::commands::{ChecksumCommands, KennungTable};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct ChecksumReport {
    algorithm: &'static str,
    checksum: String,
    frame: String,
}

pub fn execute(cmd: &ChecksumCommands, json: bool) -> Result<()> {
    let report = match cmd {
        ChecksumCommands::J1850 { xor, payload } => {
            let payload = parse_hex(payload)?;
            let crc = j1850::crc8(&payload, *xor);
            report("crc8-j1850", crc, [crc].iter().chain(&payload))
        }
        ChecksumCommands::E2e {
            header,
            seq,
            kennung,
            payload,
        } => {
            let payload = parse_hex(payload)?;
            let header = header & 0xF0;
            let crc = e2e::rolling_crc(header, *seq, &payload, &table(*kennung));
            report("e2e-rolling", crc, [crc, header | seq].iter().chain(&payload))
        }
        ChecksumCommands::Kbus { payload } => {
            let payload = parse_hex(payload)?;
            let xor = kbus_checksum(&payload);
            report("kbus-xor", xor, payload.iter().chain([xor].iter()))
        }
    };

    if json {
        output::print_success("checksum", &report);
    } else {
        println!("{}", report.checksum);
        println!("{}", report.frame);
    }
    Ok(())
}

fn report<'a>(
    algorithm: &'static str,
    checksum: u8,
    frame: impl Iterator<Item = &'a u8>,
) -> ChecksumReport {
    let frame: Vec<u8> = frame.copied().collect();
    ChecksumReport {
        algorithm,
        checksum: format!("{checksum:02X}"),
        frame: output::hex_spaced(&frame),
    }
}

fn table(name: KennungTable) -> Kennung {
    match name {
        KennungTable::Esp20 => kennung::ESP_20,
        KennungTable::Esp21 => kennung::ESP_21,
        KennungTable::Esp24 => kennung::ESP_24,
        KennungTable::Tsk07 => kennung::TSK_07,
        KennungTable::LhEps01 => kennung::LH_EPS_01,
        KennungTable::MotorCode01 => kennung::MOTOR_CODE_01,
        KennungTable::Wba03 => kennung::WBA_03,
        KennungTable::Airbag01 => kennung::AIRBAG_01,
        KennungTable::KlemmenStatus01 => kennung::KLEMMEN_STATUS_01,
        KennungTable::LichtAnf => kennung::LICHT_ANF,
        KennungTable::Swa01 => kennung::SWA_01,
    }
}

/// Parse hex bytes separated by spaces, colons or nothing at all.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, CliError> {
    let digits: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != ',')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::InvalidHex(format!(
            "'{input}' has an odd number of hex digits"
        )));
    }
    let mut bytes = Vec::with_capacity(digits.len() / 2);
    let mut chars = digits.chars();
    while let (Some(hi), Some(lo)) = (chars.next(), chars.next()) {
        match (hi.to_digit(16), lo.to_digit(16)) {
            (Some(hi), Some(lo)) => bytes.push(((hi << 4) | lo) as u8),
            _ => {
                return Err(CliError::InvalidHex(format!(
                    "'{hi}{lo}' in '{input}' is not a hex byte"
                )));
            }
        }
    }
    if bytes.len() > 8 {
        return Err(CliError::InvalidHex(format!(
            "'{input}' is longer than a CAN payload"
        )));
    }
    Ok(bytes)
}
