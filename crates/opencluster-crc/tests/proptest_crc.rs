//! Property-based tests for the CRC engines.
//!
//! Checks the table-driven engines against straightforward bitwise
//! definitions for arbitrary 8-byte frames and every sequence value.

use opencluster_crc::{e2e, j1850};
use proptest::prelude::*;

fn bitwise_crc8(polynomial: u8, seed: u8, data: &[u8]) -> u8 {
    let mut crc = seed;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ polynomial
            } else {
                crc << 1
            };
        }
    }
    crc
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// The J1850 engine equals bitwise polynomial division for any frame and
    /// any final XOR constant.
    #[test]
    fn prop_j1850_matches_bitwise(frame in any::<[u8; 8]>(), len in 0usize..=8, final_xor in any::<u8>()) {
        let data = &frame[..len];
        let expected = bitwise_crc8(0x1D, 0xFF, data) ^ final_xor;
        prop_assert_eq!(j1850::crc8(data, final_xor), expected);
    }

    /// A single flipped bit always changes the checksum.
    #[test]
    fn prop_j1850_detects_single_bit_errors(frame in any::<[u8; 7]>(), byte in 0usize..7, bit in 0u8..8) {
        let mut corrupted = frame;
        corrupted[byte] ^= 1 << bit;
        prop_assert_ne!(j1850::crc8(&frame, 0x44), j1850::crc8(&corrupted, 0x44));
    }

    /// The rolling checksum is CRC-8/AUTOSAR over header, payload and data-ID.
    #[test]
    fn prop_rolling_crc_equivalence(
        header in (0u8..16).prop_map(|h| h << 4),
        seq in 0u8..16,
        payload in any::<[u8; 6]>(),
        kennung in any::<[u8; 16]>(),
    ) {
        let mut framed = vec![header | seq];
        framed.extend_from_slice(&payload);
        framed.push(kennung[usize::from(seq)]);
        let expected = bitwise_crc8(0x2F, 0xFF, &framed) ^ 0xFF;
        prop_assert_eq!(e2e::rolling_crc(header, seq, &payload, &kennung), expected);
    }

    /// Sealing a frame twice is stable: bytes 0 and 1 are outputs only.
    #[test]
    fn prop_seal_idempotent(mut frame in any::<[u8; 8]>(), seq in 0u8..16, kennung in any::<[u8; 16]>()) {
        e2e::seal(&mut frame, 8, 0xD0, seq, &kennung);
        let once = frame;
        e2e::seal(&mut frame, 8, 0xD0, seq, &kennung);
        prop_assert_eq!(once, frame);
        prop_assert_eq!(frame[1], 0xD0 | seq);
    }
}
