//! Handoff between telemetry writers and the control loop.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::state::VehicleState;

/// Vehicle state shared between writers and the driver.
///
/// Writers mutate individual fields in place, so concurrent writers touching
/// different fields never clobber each other. The driver copies one snapshot
/// per tick and hands it to the encoders, which therefore see a consistent
/// state for the whole tick.
#[derive(Clone, Debug, Default)]
pub struct SharedVehicleState {
    inner: Arc<Mutex<VehicleState>>,
}

impl SharedVehicleState {
    pub fn new(state: VehicleState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Mutate the live state.
    pub fn update<R>(&self, f: impl FnOnce(&mut VehicleState) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Replace the live state wholesale, keeping an unconsumed button press.
    pub fn replace(&self, mut state: VehicleState) {
        let mut live = self.inner.lock();
        if state.button_event == 0 {
            state.button_event = live.button_event;
        }
        *live = state;
    }

    /// Copy of the live state.
    pub fn snapshot(&self) -> VehicleState {
        self.inner.lock().clone()
    }

    /// Post a steering-wheel button press, overwriting any pending one.
    pub fn press_button(&self, code: u8) {
        self.inner.lock().button_event = code;
    }

    /// Clear the mailbox if it still holds `code`.
    ///
    /// A press posted after the snapshot was taken survives to the next tick.
    /// Returns whether the mailbox was cleared.
    pub fn acknowledge_button(&self, code: u8) -> bool {
        let mut live = self.inner.lock();
        if code != 0 && live.button_event == code {
            live.button_event = 0;
            true
        } else {
            false
        }
    }
}
