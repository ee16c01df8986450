//! Error types for clusterctl

use opencluster_core::{ConfigError, FrameError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid hex input: {0}")]
    InvalidHex(String),

    #[error("Invalid donor capture line {line}: {reason}")]
    InvalidCapture { line: usize, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl CliError {
    /// Process exit code reported for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::ScenarioNotFound(_) | CliError::IoError(_) => 3,
            CliError::InvalidConfiguration(_)
            | CliError::Config(_)
            | CliError::JsonError(_)
            | CliError::YamlError(_) => 4,
            CliError::InvalidHex(_) | CliError::InvalidCapture { .. } | CliError::Frame(_) => 5,
        }
    }

    /// Short machine-readable name used in JSON error output.
    pub fn kind(&self) -> &'static str {
        match self {
            CliError::ScenarioNotFound(_) => "scenario_not_found",
            CliError::InvalidConfiguration(_) | CliError::Config(_) => "invalid_configuration",
            CliError::InvalidHex(_) => "invalid_hex",
            CliError::InvalidCapture { .. } => "invalid_capture",
            CliError::Frame(_) => "frame",
            CliError::IoError(_) => "io",
            CliError::JsonError(_) => "json",
            CliError::YamlError(_) => "yaml",
        }
    }
}
