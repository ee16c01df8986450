//! Volkswagen rolling end-to-end checksum.
//!
//! Every protected MQB frame carries `[crc, header | seq, data...]`. The
//! checksum is CRC-8/AUTOSAR taken over the second byte, the protected data
//! bytes and one data-ID byte picked from a 16-entry table by the sequence
//! counter. The data-ID tables are calibrated per frame type and are opaque.

use crate::table::build_table;

/// CRC-8/AUTOSAR generator polynomial.
pub const POLYNOMIAL: u8 = 0x2F;

/// Per-frame data-ID table, indexed by the 4-bit sequence counter.
pub type Kennung = [u8; 16];

static TABLE: [u8; 256] = build_table(POLYNOMIAL);

/// The lookup table shared by every VW frame family.
pub fn table() -> &'static [u8; 256] {
    &TABLE
}

#[inline]
fn step(crc: u8) -> u8 {
    TABLE[usize::from(crc)]
}

/// Compute the rolling checksum for one frame.
///
/// `header` is the frame's constant high nibble (or full selector byte, for
/// WBA_03); only the low nibble of `sequence` is used. `payload` is the run of
/// protected bytes, normally bytes 2..=7 of the frame.
pub fn rolling_crc(header: u8, sequence: u8, payload: &[u8], kennung: &Kennung) -> u8 {
    let seq = sequence & 0x0F;
    let mut crc = (header | seq) ^ 0xFF;
    for &byte in payload {
        crc = step(crc) ^ byte;
    }
    crc = step(crc) ^ kennung[usize::from(seq)];
    !step(crc)
}

/// Write `[crc, header | seq]` into the first two bytes of `frame`.
///
/// The checksum covers `frame[2..end]`. Frames shorter than two bytes are left
/// untouched.
pub fn seal(frame: &mut [u8], end: usize, header: u8, sequence: u8, kennung: &Kennung) {
    let seq = sequence & 0x0F;
    let end = end.min(frame.len());
    let Some(protected) = frame.get(2..end) else {
        return;
    };
    let crc = rolling_crc(header, seq, protected, kennung);
    if let [first, second, ..] = frame {
        *first = crc;
        *second = header | seq;
    }
}

/// Plain CRC-8/AUTOSAR (seed and final XOR `0xFF`), used to cross-check
/// [`rolling_crc`].
pub fn autosar_crc8(data: &[u8]) -> u8 {
    data.iter().fold(0xFF, |crc, &byte| step(crc ^ byte)) ^ 0xFF
}

#[cfg(test)]
mod tests {
    use super::*;

    const KLEMMEN_STATUS: Kennung = [0xC3; 16];

    #[test]
    fn autosar_check_value() {
        assert_eq!(autosar_crc8(b"123456789"), 0xDF);
    }

    #[test]
    fn rolling_crc_is_autosar_over_framed_bytes() {
        let payload = [0x03, 0x00];
        for seq in 0..16u8 {
            let expected = autosar_crc8(&[seq, 0x03, 0x00, 0xC3]);
            assert_eq!(rolling_crc(0x00, seq, &payload, &KLEMMEN_STATUS), expected);
        }
    }

    #[test]
    fn only_low_nibble_of_sequence_counts() {
        let payload = [1, 2, 3, 4, 5, 6];
        assert_eq!(
            rolling_crc(0x30, 0x13, &payload, &KLEMMEN_STATUS),
            rolling_crc(0x30, 0x03, &payload, &KLEMMEN_STATUS)
        );
    }

    #[test]
    fn seal_writes_crc_and_counter() {
        let mut frame = [0u8, 0, 0x03, 0x00];
        seal(&mut frame, 4, 0x00, 7, &KLEMMEN_STATUS);
        assert_eq!(frame[1], 0x07);
        assert_eq!(frame[0], rolling_crc(0x00, 7, &[0x03, 0x00], &KLEMMEN_STATUS));
    }

    #[test]
    fn seal_ignores_short_frames() {
        let mut frame = [0xAAu8];
        seal(&mut frame, 8, 0xD0, 1, &KLEMMEN_STATUS);
        assert_eq!(frame, [0xAA]);
    }
}
