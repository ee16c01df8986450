//! Piecewise-linear breakpoint tables.

use serde::{Deserialize, Serialize};

use crate::error::CurveError;

/// Numeric type a breakpoint table can interpolate over.
///
/// `f32` interpolates exactly; `i32` truncates toward zero after the multiply,
/// which is what cluster firmware tables were calibrated with.
pub trait Sample: Copy + PartialOrd {
    /// Value on the segment `(x0, y0)..(x1, y1)` at `x`. Callers guarantee
    /// `x0 < x1`.
    fn lerp(x: Self, x0: Self, x1: Self, y0: Self, y1: Self) -> Self;

    /// Whether the value can take part in a table.
    fn is_valid(self) -> bool {
        true
    }
}

impl Sample for f32 {
    #[inline]
    fn lerp(x: Self, x0: Self, x1: Self, y0: Self, y1: Self) -> Self {
        y0 + (x - x0) * (y1 - y0) / (x1 - x0)
    }

    fn is_valid(self) -> bool {
        self.is_finite()
    }
}

impl Sample for i32 {
    #[inline]
    fn lerp(x: Self, x0: Self, x1: Self, y0: Self, y1: Self) -> Self {
        let span = i64::from(x1) - i64::from(x0);
        if span == 0 {
            return y0;
        }
        let scaled = (i64::from(x) - i64::from(x0)) * (i64::from(y1) - i64::from(y0)) / span;
        i32::try_from(scaled + i64::from(y0)).unwrap_or(if y1 >= y0 { i32::MAX } else { i32::MIN })
    }
}

/// Look `query` up in the table formed by `inputs` and `outputs`.
///
/// `inputs` must be ascending; `outputs` may run in either direction. Queries
/// at or beyond either end return that end's output. Only the common prefix
/// of the two slices is used. An empty table yields `None`.
pub fn interpolate<T: Sample>(inputs: &[T], outputs: &[T], query: T) -> Option<T> {
    let len = inputs.len().min(outputs.len());
    let inputs = inputs.get(..len)?;
    let outputs = outputs.get(..len)?;

    let (&first_in, &first_out) = (inputs.first()?, outputs.first()?);
    if query <= first_in {
        return Some(first_out);
    }
    let (&last_in, &last_out) = (inputs.last()?, outputs.last()?);
    if query >= last_in {
        return Some(last_out);
    }

    let upper = inputs.iter().position(|&x| query <= x)?;
    let lower = upper.checked_sub(1)?;
    let (x0, x1) = (*inputs.get(lower)?, *inputs.get(upper)?);
    let (y0, y1) = (*outputs.get(lower)?, *outputs.get(upper)?);
    if query == x1 {
        return Some(y1);
    }
    Some(T::lerp(query, x0, x1, y0, y1))
}

/// Validated breakpoint table.
///
/// # Example
///
/// ```
/// use opencluster_curves::BreakpointTable;
///
/// // Descending outputs are fine: litres remaining on a BMW F-series sender.
/// let litres = BreakpointTable::new(vec![0, 50, 100], vec![37, 18, 4])?;
/// assert_eq!(litres.lookup(25), 28);
/// # Ok::<(), opencluster_curves::CurveError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable<T>", into = "RawTable<T>")]
#[serde(bound(
    serialize = "T: Sample + Serialize",
    deserialize = "T: Sample + Deserialize<'de>"
))]
pub struct BreakpointTable<T: Sample> {
    inputs: Vec<T>,
    outputs: Vec<T>,
}

#[derive(Clone, Serialize, Deserialize)]
struct RawTable<T> {
    inputs: Vec<T>,
    outputs: Vec<T>,
}

impl<T: Sample> TryFrom<RawTable<T>> for BreakpointTable<T> {
    type Error = CurveError;

    fn try_from(raw: RawTable<T>) -> Result<Self, Self::Error> {
        Self::new(raw.inputs, raw.outputs)
    }
}

impl<T: Sample> From<BreakpointTable<T>> for RawTable<T> {
    fn from(table: BreakpointTable<T>) -> Self {
        Self {
            inputs: table.inputs,
            outputs: table.outputs,
        }
    }
}

impl<T: Sample> BreakpointTable<T> {
    /// Build a table, checking lengths, ordering and finiteness.
    ///
    /// # Errors
    ///
    /// Returns a [`CurveError`] describing the first problem found.
    pub fn new(inputs: Vec<T>, outputs: Vec<T>) -> Result<Self, CurveError> {
        if inputs.len() != outputs.len() {
            return Err(CurveError::LengthMismatch {
                inputs: inputs.len(),
                outputs: outputs.len(),
            });
        }
        if inputs.len() < 2 {
            return Err(CurveError::TooFewPoints(inputs.len()));
        }
        for (index, (x, y)) in inputs.iter().zip(&outputs).enumerate() {
            if !x.is_valid() || !y.is_valid() {
                return Err(CurveError::NonFinite { index });
            }
        }
        for (index, pair) in inputs.windows(2).enumerate() {
            if let [a, b] = pair {
                if b.partial_cmp(a) != Some(std::cmp::Ordering::Greater) {
                    return Err(CurveError::NotAscending { index: index + 1 });
                }
            }
        }
        Ok(Self { inputs, outputs })
    }

    /// Interpolated output for `query`, clamped to the table's endpoints.
    pub fn lookup(&self, query: T) -> T {
        match interpolate(&self.inputs, &self.outputs, query) {
            Some(value) => value,
            // Unreachable for a validated table; fall back to the first output.
            None => self.outputs.first().copied().unwrap_or(query),
        }
    }

    /// Input breakpoints.
    pub fn inputs(&self) -> &[T] {
        &self.inputs
    }

    /// Output values.
    pub fn outputs(&self) -> &[T] {
        &self.outputs
    }

    /// Whether the outputs never change direction.
    pub fn is_monotonic(&self) -> bool {
        let rising = self.outputs.windows(2).all(|w| matches!(w, [a, b] if a <= b));
        let falling = self.outputs.windows(2).all(|w| matches!(w, [a, b] if a >= b));
        rising || falling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn fuel_pot_table_interpolates_between_breakpoints() -> TestResult {
        let table = BreakpointTable::new(vec![0.0, 50.0, 100.0], vec![18.0, 50.0, 83.0])?;
        assert!((table.lookup(75.0) - 66.5).abs() < 1e-4);
        assert!((table.lookup(25.0) - 34.0).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn fuel_pot_table_clamps_outside_range() -> TestResult {
        let table = BreakpointTable::new(vec![0.0, 50.0, 100.0], vec![18.0, 50.0, 83.0])?;
        assert!((table.lookup(-10.0) - 18.0).abs() < f32::EPSILON);
        assert!((table.lookup(150.0) - 83.0).abs() < f32::EPSILON);
        Ok(())
    }

    #[test]
    fn integer_table_truncates() -> TestResult {
        let table = BreakpointTable::new(vec![0, 50, 100], vec![18, 50, 83])?;
        assert_eq!(table.lookup(75), 66);
        assert_eq!(table.lookup(-10), 18);
        assert_eq!(table.lookup(150), 83);
        assert_eq!(table.lookup(50), 50);
        Ok(())
    }

    #[test]
    fn descending_outputs() -> TestResult {
        let table = BreakpointTable::new(vec![0, 50, 100], vec![37, 18, 4])?;
        assert_eq!(table.lookup(0), 37);
        assert_eq!(table.lookup(50), 18);
        assert_eq!(table.lookup(75), 11);
        assert_eq!(table.lookup(100), 4);
        assert!(table.is_monotonic());
        Ok(())
    }

    #[test]
    fn rejects_bad_tables() {
        assert_eq!(
            BreakpointTable::new(vec![0.0, 1.0], vec![0.0]),
            Err(CurveError::LengthMismatch {
                inputs: 2,
                outputs: 1
            })
        );
        assert_eq!(
            BreakpointTable::new(vec![0.0], vec![0.0]),
            Err(CurveError::TooFewPoints(1))
        );
        assert_eq!(
            BreakpointTable::new(vec![0.0, 50.0, 50.0], vec![0.0, 1.0, 2.0]),
            Err(CurveError::NotAscending { index: 2 })
        );
        assert_eq!(
            BreakpointTable::new(vec![0.0, f32::NAN], vec![0.0, 1.0]),
            Err(CurveError::NonFinite { index: 1 })
        );
    }

    #[test]
    fn slice_interpolation_handles_empty_tables() {
        assert_eq!(interpolate::<i32>(&[], &[], 5), None);
        assert_eq!(interpolate(&[0, 10], &[5, 15], 5), Some(10));
    }

    #[test]
    fn serde_roundtrip_validates() -> TestResult {
        let table = BreakpointTable::new(vec![0, 50, 100], vec![18, 50, 83])?;
        let json = serde_json::to_string(&table)?;
        let back: BreakpointTable<i32> = serde_json::from_str(&json)?;
        assert_eq!(back, table);

        let bad = r#"{"inputs":[10,0],"outputs":[1,2]}"#;
        assert!(serde_json::from_str::<BreakpointTable<i32>>(bad).is_err());
        Ok(())
    }
}
