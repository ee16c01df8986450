//! Gauge calibration curves for instrument clusters.
//!
//! Cluster gauges are rarely linear. Fuel senders in particular follow the
//! shape of the tank, so a fuel percentage has to pass through a small
//! breakpoint table before it becomes a potentiometer position or a litre
//! reading the cluster understands.
//!
//! - [`BreakpointTable`]: validated piecewise-linear table over `f32` or `i32`
//!   samples. Queries outside the table clamp to the nearest endpoint.
//! - [`interpolate`]: the same lookup over borrowed slices, for constant tables.
//! - [`map_range`]: integer linear rescaling with truncating division, the
//!   convention every cluster firmware in this workspace was tuned against.
//!
//! # Example
//!
//! ```
//! use opencluster_curves::{BreakpointTable, map_range};
//!
//! let fuel = BreakpointTable::new(vec![0.0, 50.0, 100.0], vec![18.0, 50.0, 83.0])?;
//! assert_eq!(fuel.lookup(75.0), 66.5);
//! assert_eq!(fuel.lookup(150.0), 83.0);
//!
//! assert_eq!(map_range(50, 0, 100, 0, 253), 126);
//! # Ok::<(), opencluster_curves::CurveError>(())
//! ```

#![deny(static_mut_refs)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod breakpoint;
pub mod error;
pub mod range;

pub use breakpoint::{BreakpointTable, Sample, interpolate};
pub use error::CurveError;
pub use range::map_range;
