//! CRC-8/SAE-J1850 with a per-frame final XOR.
//!
//! BMW F-series frames prepend this checksum as byte 0 of the transmitted
//! payload. The register starts at [`SEED`]; after the last byte the frame
//! specific `final_xor` is applied instead of the standard `0xFF`.

use crate::table::build_table;

/// Generator polynomial, x^8 + x^4 + x^3 + x^2 + 1.
pub const POLYNOMIAL: u8 = 0x1D;

/// Register value before the first message byte.
pub const SEED: u8 = 0xFF;

static TABLE: [u8; 256] = build_table(POLYNOMIAL);

/// The lookup table used by [`crc8`].
pub fn table() -> &'static [u8; 256] {
    &TABLE
}

/// Checksum `message` and apply `final_xor`.
///
/// With `final_xor = 0xFF` this is the textbook CRC-8/SAE-J1850.
#[inline]
pub fn crc8(message: &[u8], final_xor: u8) -> u8 {
    message
        .iter()
        .fold(SEED, |crc, &byte| TABLE[usize::from(crc ^ byte)])
        ^ final_xor
}

/// Build a frame of `N + 1` bytes: the checksum followed by `payload`.
pub fn with_checksum<const N: usize, const M: usize>(payload: [u8; N], final_xor: u8) -> [u8; M] {
    debug_assert_eq!(M, N + 1, "frame must be one byte longer than its payload");
    let mut frame = [0u8; M];
    if let Some((first, rest)) = frame.split_first_mut() {
        *first = crc8(&payload, final_xor);
        for (dst, src) in rest.iter_mut().zip(payload) {
            *dst = src;
        }
    }
    frame
}
