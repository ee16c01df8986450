//! Transport seams between encoders and hardware.
//!
//! Encoders only see these traits. Every send is fire-and-forget: a failure
//! is logged at `warn` and the cycle continues; nothing is retried.

use tracing::{trace, warn};

use crate::error::TransportError;
use crate::frame::CanFrame;

/// Sends CAN frames.
pub trait CanBus {
    /// Queue `frame` for transmission.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the controller rejects the frame.
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError>;
}

/// Writes raw K-bus/I-bus bytes.
pub trait SerialBus {
    /// Write one complete frame, checksum included.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the UART rejects the write.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}

/// Output line level. `HighImpedance` releases an open-drain line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PinLevel {
    High,
    Low,
    HighImpedance,
}

/// Discrete cluster inputs driven directly instead of over a bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputLine {
    Handbrake,
    Abs,
    OilPressure,
    BrakeFluid,
    SprinklerWater,
    CoolantShortage,
}

/// One of the two fuel sender inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FuelPot {
    Primary,
    Secondary,
}

pub trait DiscreteOutputs {
    /// Drive `line` to `level`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the pin cannot be driven.
    fn set_level(&mut self, line: OutputLine, level: PinLevel) -> Result<(), TransportError>;
}

/// Square-wave generator feeding a frequency-coded input.
pub trait ToneOutput {
    /// Start or retune the tone.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the generator cannot be configured.
    fn tone(&mut self, hz: f32) -> Result<(), TransportError>;

    /// Stop the tone.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the generator cannot be stopped.
    fn silence(&mut self) -> Result<(), TransportError>;
}

/// Digital potentiometers emulating the tank sender.
pub trait FuelPotentiometers {
    /// Move a wiper. `forced` writes even when the position is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the potentiometer does not respond.
    fn set_position(&mut self, pot: FuelPot, position: u8, forced: bool)
    -> Result<(), TransportError>;
}

/// Every non-bus output an encoder may drive.
pub trait AuxiliaryOutputs: DiscreteOutputs + ToneOutput + FuelPotentiometers {}

impl<T: DiscreteOutputs + ToneOutput + FuelPotentiometers + ?Sized> AuxiliaryOutputs for T {}

/// Fire-and-forget helpers for [`CanBus`].
pub trait CanBusExt: CanBus {
    /// Build and send a frame, logging instead of failing.
    fn emit(&mut self, id: u16, data: &[u8]) {
        match CanFrame::new(id, data) {
            Ok(frame) => self.emit_frame(&frame),
            Err(e) => warn!(id, error = %e, "dropping malformed frame"),
        }
    }

    /// Send an already-built frame, logging instead of failing.
    fn emit_frame(&mut self, frame: &CanFrame) {
        match self.send(frame) {
            Ok(()) => trace!(%frame, "sent"),
            Err(e) => warn!(%frame, error = %e, "CAN send failed"),
        }
    }
}

impl<T: CanBus + ?Sized> CanBusExt for T {}

/// Fire-and-forget helpers for [`SerialBus`].
pub trait SerialBusExt: SerialBus {
    fn emit_bytes(&mut self, bytes: &[u8]) {
        match self.write_bytes(bytes) {
            Ok(()) => trace!(len = bytes.len(), "K-bus frame written"),
            Err(e) => warn!(error = %e, "K-bus write failed"),
        }
    }
}

impl<T: SerialBus + ?Sized> SerialBusExt for T {}

/// Fire-and-forget helpers for [`AuxiliaryOutputs`].
pub trait AuxiliaryOutputsExt: AuxiliaryOutputs {
    fn drive(&mut self, line: OutputLine, level: PinLevel) {
        if let Err(e) = self.set_level(line, level) {
            warn!(?line, ?level, error = %e, "output line failed");
        }
    }

    fn drive_tone(&mut self, hz: Option<f32>) {
        let result = match hz {
            Some(hz) => self.tone(hz),
            None => self.silence(),
        };
        if let Err(e) = result {
            warn!(?hz, error = %e, "tone output failed");
        }
    }

    fn drive_fuel(&mut self, pot: FuelPot, position: u8, forced: bool) {
        if let Err(e) = self.set_position(pot, position, forced) {
            warn!(?pot, position, error = %e, "fuel potentiometer failed");
        }
    }
}

impl<T: AuxiliaryOutputs + ?Sized> AuxiliaryOutputsExt for T {}

impl<T: CanBus + ?Sized> CanBus for Box<T> {
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError> {
        (**self).send(frame)
    }
}

impl<T: SerialBus + ?Sized> SerialBus for Box<T> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write_bytes(bytes)
    }
}

/// Outputs for clusters wired with CAN only.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullOutputs;

impl DiscreteOutputs for NullOutputs {
    fn set_level(&mut self, _line: OutputLine, _level: PinLevel) -> Result<(), TransportError> {
        Ok(())
    }
}

impl ToneOutput for NullOutputs {
    fn tone(&mut self, _hz: f32) -> Result<(), TransportError> {
        Ok(())
    }

    fn silence(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl FuelPotentiometers for NullOutputs {
    fn set_position(
        &mut self,
        _pot: FuelPot,
        _position: u8,
        _forced: bool,
    ) -> Result<(), TransportError> {
        Ok(())
    }
}

/// [`CanBus`] over any blocking `embedded-can` controller.
#[derive(Debug)]
pub struct EmbeddedCanBus<C> {
    controller: C,
}

impl<C> EmbeddedCanBus<C>
where
    C: embedded_can::blocking::Can,
{
    pub fn new(controller: C) -> Self {
        Self { controller }
    }

    pub fn into_inner(self) -> C {
        self.controller
    }

    /// Block for the next standard-ID frame.
    ///
    /// Extended and remote frames are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Driver`] when the controller reports an error.
    pub fn receive(&mut self) -> Result<CanFrame, TransportError> {
        use embedded_can::{Error as _, Frame as _, Id};
        loop {
            let frame = self
                .controller
                .receive()
                .map_err(|e| TransportError::Driver(format!("{:?}", e.kind())))?;
            if frame.is_remote_frame() {
                continue;
            }
            if let Id::Standard(id) = frame.id() {
                if let Ok(frame) = CanFrame::new(id.as_raw(), frame.data()) {
                    return Ok(frame);
                }
            }
        }
    }
}

impl<C> CanBus for EmbeddedCanBus<C>
where
    C: embedded_can::blocking::Can,
{
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError> {
        use embedded_can::{Error as _, Frame as _, StandardId};
        let id = StandardId::new(frame.raw_id())
            .ok_or_else(|| TransportError::driver("identifier out of range"))?;
        let native = C::Frame::new(id, frame.data())
            .ok_or_else(|| TransportError::driver("controller rejected frame layout"))?;
        self.controller
            .transmit(&native)
            .map_err(|e| TransportError::Driver(format!("{:?}", e.kind())))
    }
}
