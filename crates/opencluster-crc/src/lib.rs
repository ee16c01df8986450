//! Checksum engines for instrument-cluster CAN frames.
//!
//! Two unrelated CRC8 flavours show up on the buses this workspace emulates:
//!
//! - [`j1850`]: CRC-8/SAE-J1850 (polynomial `0x1D`, seed `0xFF`) with a
//!   per-frame final XOR. BMW F-series body and chassis frames carry it in
//!   byte 0.
//! - [`e2e`]: the Volkswagen rolling end-to-end checksum. It folds a
//!   CRC-8/AUTOSAR table (polynomial `0x2F`) over the protected bytes, mixes in
//!   a per-frame data-ID ("Kennung") indexed by the 4-bit sequence counter and
//!   complements the result.
//!
//! Both lookup tables are built by the same `const fn` at compile time, so the
//! engines are pure functions with no shared mutable state.
//!
//! # Example
//!
//! ```
//! use opencluster_crc::{e2e, j1850};
//!
//! assert_eq!(j1850::crc8(b"123456789", 0xFF), 0x4B);
//!
//! let kennung = [0xC3; 16];
//! let crc = e2e::rolling_crc(0x00, 5, &[0x03, 0x00], &kennung);
//! assert_eq!(crc, e2e::autosar_crc8(&[0x05, 0x03, 0x00, 0xC3]));
//! ```

#![deny(static_mut_refs)]
#![warn(missing_docs)]

pub mod e2e;
pub mod j1850;
mod table;

pub use e2e::{Kennung, rolling_crc};
pub use j1850::crc8;
pub use table::build_table;
