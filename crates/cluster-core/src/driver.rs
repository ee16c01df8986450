//! Control loop driving one or more encoders.

use std::time::Instant;

use tracing::debug;

use crate::encoder::{ClusterEncoder, Platform};
use crate::frame::CanFrame;
use crate::shared::SharedVehicleState;

/// Owns the encoders and feeds them one snapshot per tick.
pub struct ClusterDriver {
    encoders: Vec<Box<dyn ClusterEncoder + Send>>,
    state: SharedVehicleState,
    ticks: u64,
}

impl ClusterDriver {
    pub fn new(state: SharedVehicleState) -> Self {
        Self {
            encoders: Vec::new(),
            state,
            ticks: 0,
        }
    }

    pub fn with_encoder(mut self, encoder: Box<dyn ClusterEncoder + Send>) -> Self {
        self.add_encoder(encoder);
        self
    }

    pub fn add_encoder(&mut self, encoder: Box<dyn ClusterEncoder + Send>) {
        debug!(platform = %encoder.platform(), "encoder attached");
        self.encoders.push(encoder);
    }

    /// Handle for writers.
    pub fn state(&self) -> &SharedVehicleState {
        &self.state
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.encoders.iter().map(|e| e.platform()).collect()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one control-loop iteration.
    ///
    /// Each encoder gets its own copy of the snapshot so every cluster sees
    /// a pending button press. The press is acknowledged once any encoder
    /// consumed it.
    pub fn tick(&mut self, now: Instant) {
        let snapshot = self.state.snapshot();
        let pressed = snapshot.button_event;
        let mut consumed = false;
        for encoder in &mut self.encoders {
            let mut view = snapshot.clone();
            encoder.update(&mut view, now);
            consumed |= pressed != 0 && view.button_event != pressed;
        }
        if consumed {
            self.state.acknowledge_button(pressed);
        }
        self.ticks += 1;
    }

    /// Offer a donor-bus frame to every encoder.
    pub fn route_inbound(&mut self, frame: &CanFrame) {
        for encoder in &mut self.encoders {
            encoder.handle_inbound(frame);
        }
    }
}

impl core::fmt::Debug for ClusterDriver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClusterDriver")
            .field("platforms", &self.platforms())
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}
