//! Scenario and run-configuration files.
//!
//! Both accept YAML or JSON, picked by file extension (`.json` is JSON,
//! anything else is YAML). A scenario is either a bare vehicle state held for
//! the whole run, or a timeline:
//!
//! ```yaml
//! steps:
//!   - at_ms: 0
//!     state: { speed: 0, rpm: 800 }
//!   - at_ms: 500
//!     state: { speed: 80, rpm: 3000, gear: 3 }
//!     press_button: 1
//! ```
//!
//! Each keyframe replaces the whole state; omitted fields take their
//! defaults, not the previous keyframe's values.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use opencluster_bmw_protocol::{E46Options, ESeriesOptions, FSeriesOptions};
use opencluster_core::{CalibrationOverrides, SharedVehicleState, VehicleState};
use opencluster_vw_protocol::MqbOptions;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CliError;

/// Per-run encoder configuration: calibration overrides plus the options of
/// every platform. Only the selected platform's section is used.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub calibration: CalibrationOverrides,
    pub f_series: FSeriesOptions,
    pub e_series: ESeriesOptions,
    pub e46: E46Options,
    pub mqb: MqbOptions,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let config: RunConfig = load_document(path)?;
        config.calibration.validate()?;
        debug!(path = %path.display(), ?config, "Loaded run configuration");
        Ok(config)
    }
}

/// One point on a scenario timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    #[serde(default)]
    pub at_ms: u64,
    #[serde(default)]
    pub state: VehicleState,
    /// Steering-wheel button pressed when the keyframe is applied.
    #[serde(default)]
    pub press_button: Option<u8>,
}

#[derive(Deserialize)]
struct Timeline {
    steps: Vec<Keyframe>,
}

/// Keyframes applied to the shared state as simulated time passes.
#[derive(Clone, Debug)]
pub struct Scenario {
    steps: Vec<Keyframe>,
    next: usize,
}

impl Scenario {
    /// Hold one state for the whole run.
    pub fn steady(state: VehicleState) -> Self {
        Self::from_steps(vec![Keyframe {
            at_ms: 0,
            state,
            press_button: None,
        }])
    }

    pub fn from_steps(mut steps: Vec<Keyframe>) -> Self {
        steps.sort_by_key(|step| step.at_ms);
        Self { steps, next: 0 }
    }

    pub fn load(path: &Path) -> Result<Self, CliError> {
        let document: serde_json::Value = load_document(path)?;
        let scenario = if document.get("steps").is_some() {
            let timeline: Timeline = serde_json::from_value(document)?;
            let scenario = Self::from_steps(timeline.steps);
            if scenario.is_empty() {
                return Err(CliError::InvalidConfiguration(format!(
                    "scenario {} has an empty timeline",
                    path.display()
                )));
            }
            scenario
        } else {
            Self::steady(serde_json::from_value(document)?)
        };
        debug!(path = %path.display(), steps = scenario.len(), "Loaded scenario");
        Ok(scenario)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Apply every keyframe due at `elapsed_ms` that has not been applied
    /// yet. Returns how many were applied.
    pub fn apply_due(&mut self, elapsed_ms: u64, shared: &SharedVehicleState) -> usize {
        let mut applied = 0;
        while let Some(step) = self.steps.get(self.next) {
            if step.at_ms > elapsed_ms {
                break;
            }
            shared.replace(step.state.clone());
            if let Some(code) = step.press_button {
                shared.press_button(code);
            }
            debug!(at_ms = step.at_ms, "Applied keyframe");
            self.next += 1;
            applied += 1;
        }
        applied
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::steady(VehicleState::default())
    }
}

/// Read a YAML or JSON document, chosen by extension.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let text = fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => CliError::ScenarioNotFound(path.display().to_string()),
        _ => CliError::IoError(err),
    })?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(&text)?)
    } else {
        Ok(serde_yaml::from_str(&text)?)
    }
}
