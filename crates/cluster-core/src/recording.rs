//! In-memory transports.
//!
//! Each recorder is a cheap clonable handle over shared storage: hand one
//! clone to the encoder and keep another to inspect what it sent.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::TransportError;
use crate::frame::CanFrame;
use crate::transport::{
    CanBus, DiscreteOutputs, FuelPot, FuelPotentiometers, OutputLine, PinLevel, SerialBus,
    ToneOutput,
};

/// Records every CAN frame sent through it.
#[derive(Clone, Debug, Default)]
pub struct RecordingCanBus {
    frames: Arc<Mutex<Vec<CanFrame>>>,
}

impl RecordingCanBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn frames(&self) -> Vec<CanFrame> {
        self.frames.lock().clone()
    }

    /// Drain the recording.
    pub fn take(&self) -> Vec<CanFrame> {
        std::mem::take(&mut *self.frames.lock())
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    /// Frames sent with `id`, oldest first.
    pub fn with_id(&self, id: u16) -> Vec<CanFrame> {
        self.frames
            .lock()
            .iter()
            .filter(|f| f.raw_id() == id)
            .copied()
            .collect()
    }

    /// Most recent frame sent with `id`.
    pub fn last(&self, id: u16) -> Option<CanFrame> {
        self.frames
            .lock()
            .iter()
            .rev()
            .find(|f| f.raw_id() == id)
            .copied()
    }

    /// Identifiers in send order.
    pub fn ids(&self) -> Vec<u16> {
        self.frames.lock().iter().map(CanFrame::raw_id).collect()
    }
}

impl CanBus for RecordingCanBus {
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError> {
        self.frames.lock().push(*frame);
        Ok(())
    }
}

/// Records every K-bus write.
#[derive(Clone, Debug, Default)]
pub struct RecordingSerialBus {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingSerialBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().clone()
    }

    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.writes.lock())
    }
}

impl SerialBus for RecordingSerialBus {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.writes.lock().push(bytes.to_vec());
        Ok(())
    }
}

/// One call observed by [`RecordingOutputs`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OutputEvent {
    Level(OutputLine, PinLevel),
    Tone(f32),
    Silence,
    Fuel {
        pot: FuelPot,
        position: u8,
        forced: bool,
    },
}

/// Records discrete, tone and fuel-pot outputs.
#[derive(Clone, Debug, Default)]
pub struct RecordingOutputs {
    events: Arc<Mutex<Vec<OutputEvent>>>,
}

impl RecordingOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OutputEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<OutputEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Last level written to `line`.
    pub fn level(&self, line: OutputLine) -> Option<PinLevel> {
        self.events.lock().iter().rev().find_map(|e| match e {
            OutputEvent::Level(l, level) if *l == line => Some(*level),
            _ => None,
        })
    }

    /// Last wiper position written to `pot`.
    pub fn fuel_position(&self, pot: FuelPot) -> Option<u8> {
        self.events.lock().iter().rev().find_map(|e| match e {
            OutputEvent::Fuel { pot: p, position, .. } if *p == pot => Some(*position),
            _ => None,
        })
    }

    /// Current tone frequency, `None` when silent or never started.
    pub fn current_tone(&self) -> Option<f32> {
        self.events.lock().iter().rev().find_map(|e| match e {
            OutputEvent::Tone(hz) => Some(Some(*hz)),
            OutputEvent::Silence => Some(None),
            _ => None,
        })?
    }

    /// Number of tone or silence calls.
    pub fn tone_calls(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, OutputEvent::Tone(_) | OutputEvent::Silence))
            .count()
    }

    fn push(&self, event: OutputEvent) {
        self.events.lock().push(event);
    }
}

impl DiscreteOutputs for RecordingOutputs {
    fn set_level(&mut self, line: OutputLine, level: PinLevel) -> Result<(), TransportError> {
        self.push(OutputEvent::Level(line, level));
        Ok(())
    }
}

impl ToneOutput for RecordingOutputs {
    fn tone(&mut self, hz: f32) -> Result<(), TransportError> {
        self.push(OutputEvent::Tone(hz));
        Ok(())
    }

    fn silence(&mut self) -> Result<(), TransportError> {
        self.push(OutputEvent::Silence);
        Ok(())
    }
}

impl FuelPotentiometers for RecordingOutputs {
    fn set_position(
        &mut self,
        pot: FuelPot,
        position: u8,
        forced: bool,
    ) -> Result<(), TransportError> {
        self.push(OutputEvent::Fuel {
            pot,
            position,
            forced,
        });
        Ok(())
    }
}
