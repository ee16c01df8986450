//! Shared building blocks for instrument-cluster encoders.
//!
//! A cluster encoder turns one [`VehicleState`] snapshot into the frames a
//! factory instrument cluster expects. This crate holds everything that is not
//! specific to one vehicle platform:
//!
//! - [`VehicleState`] and [`CalibrationConfig`]: the normalized input and the
//!   per-installation gauge calibration.
//! - [`SignalMapping`]: speed, RPM and coolant scaling plus a total gear table.
//! - [`Cadence`] and [`RollingCounter`]: level-triggered timing and the wrap
//!   rules of frame counters.
//! - [`CanBus`], [`SerialBus`] and [`AuxiliaryOutputs`]: the transport seams,
//!   with in-memory recorders for tests and dry runs.
//! - [`ClusterEncoder`], [`SharedVehicleState`] and [`ClusterDriver`]: the
//!   encoder contract and the control loop that feeds it.

#![deny(static_mut_refs)]
#![warn(missing_debug_implementations)]

pub mod cadence;
pub mod calibration;
pub mod counter;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod fuel;
pub mod mapping;
pub mod recording;
pub mod shared;
pub mod state;
pub mod transport;

pub use cadence::Cadence;
pub use calibration::{CalibrationConfig, CalibrationOverrides};
pub use counter::{FlashPhase, RollingCounter};
pub use driver::ClusterDriver;
pub use encoder::{ClusterEncoder, Platform};
pub use error::{ConfigError, FrameError, TransportError};
pub use frame::CanFrame;
pub use fuel::{FuelPotTargets, drive_fuel_pots, fuel_pot_positions, init_fuel_pots};
pub use mapping::{GearTable, SignalMapping, clamp_scaled};
pub use recording::{OutputEvent, RecordingCanBus, RecordingOutputs, RecordingSerialBus};
pub use shared::SharedVehicleState;
pub use state::{DriveMode, GearState, VehicleState};
pub use transport::{
    AuxiliaryOutputs, AuxiliaryOutputsExt, CanBus, CanBusExt, DiscreteOutputs, EmbeddedCanBus,
    FuelPot, FuelPotentiometers, NullOutputs, OutputLine, PinLevel, SerialBus, SerialBusExt,
    ToneOutput,
};
