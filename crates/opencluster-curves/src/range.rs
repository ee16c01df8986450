//! Integer linear range mapping.

/// Rescale `x` from `in_min..=in_max` onto `out_min..=out_max`.
///
/// Integer arithmetic with truncating division and no clamping, so inputs
/// outside the source range extrapolate. A degenerate source range maps
/// everything to `out_min`.
///
/// ```
/// use opencluster_curves::map_range;
///
/// assert_eq!(map_range(3000, 0, 6900, 0x00, 0x2B), 18);
/// assert_eq!(map_range(90, 50, 130, 0x80, 0xED), 0xB6);
/// ```
pub fn map_range(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    let span = i64::from(in_max) - i64::from(in_min);
    if span == 0 {
        return out_min;
    }
    let scaled = (i64::from(x) - i64::from(in_min)) * (i64::from(out_max) - i64::from(out_min)) / span
        + i64::from(out_min);
    i32::try_from(scaled).unwrap_or(if scaled < 0 { i32::MIN } else { i32::MAX })
}
