//! Table generation shared by both engines.

/// Build a 256-entry MSB-first CRC8 lookup table for `polynomial`.
///
/// Each entry is the register value after shifting the index byte through
/// eight rounds of polynomial division.
pub const fn build_table(polynomial: u8) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut index = 0usize;
    while index < 256 {
        let mut crc = index as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ polynomial
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[index] = crc;
        index += 1;
    }
    table
}
