//! `clusterctl platforms`

use anyhow::Result;
use opencluster_core::Platform;

use crate::bench::effective_calibration;
use crate::output::{self, PlatformInfo};
use crate::scenario::RunConfig;

/// List every supported cluster with its default calibration.
pub fn execute(json: bool) -> Result<()> {
    let config = RunConfig::default();
    let platforms: Vec<PlatformInfo> = Platform::ALL
        .into_iter()
        .map(|platform| PlatformInfo {
            name: platform.name(),
            description: platform.description(),
            calibration: effective_calibration(platform, &config),
        })
        .collect();
    output::print_platforms(&platforms, json);
    Ok(())
}
