//! Volkswagen instrument-cluster encoders.
//!
//! - [`mqb`]: MQB (Golf 7 generation). Most frames are protected by the
//!   rolling end-to-end checksum and carry a 4-bit sequence counter. Supports
//!   a passthrough mode that bridges a live donor bus.
//! - [`pq`]: PQ25 and PQ46. Plain CAN frames plus switch inputs for the oil
//!   pressure and handbrake lamps; [`pq25`] and [`pq46`] hold the body frames
//!   that differ between the two.
//!
//! Frame builders are pure; the cluster types own cadence, counters and
//! the running distance counters.

#![deny(static_mut_refs)]
#![warn(missing_debug_implementations)]

pub mod ids;
pub mod kennung;
pub mod mqb;
pub mod pq;
pub mod pq25;
pub mod pq46;

pub use mqb::{MqbCluster, MqbOptions, MqbTables, PassthroughFilter};
pub use pq::{PqCluster, PqVariant};
