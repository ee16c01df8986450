//! Error types for breakpoint table construction.

use std::fmt;

/// Error type for breakpoint table validation.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveError {
    /// Input and output arrays differ in length.
    LengthMismatch {
        /// Number of input breakpoints.
        inputs: usize,
        /// Number of output values.
        outputs: usize,
    },
    /// A table needs at least two breakpoints to interpolate.
    TooFewPoints(usize),
    /// Input breakpoints must be strictly ascending.
    NotAscending {
        /// Index of the first breakpoint that is not above its predecessor.
        index: usize,
    },
    /// A breakpoint or output value is NaN or infinite.
    NonFinite {
        /// Index of the offending entry.
        index: usize,
    },
}

impl fmt::Display for CurveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { inputs, outputs } => write!(
                f,
                "Breakpoint table has {inputs} inputs but {outputs} outputs"
            ),
            Self::TooFewPoints(count) => {
                write!(f, "Breakpoint table needs at least 2 points, got {count}")
            }
            Self::NotAscending { index } => {
                write!(f, "Input breakpoint {index} is not above the previous one")
            }
            Self::NonFinite { index } => write!(f, "Breakpoint entry {index} is not finite"),
        }
    }
}

impl std::error::Error for CurveError {}
