//! CRC-16/CCITT-FALSE
//!
//! - Polynomial: 0x1021
//! - Initial value: 0xFFFF
//! - No input/output reflection
//! - XOR out: 0x0000
//!
//! Computed over the logical (unescaped) bytes `LENGTH | SEQ | CMD | PAYLOAD`.
//! Both nodes use this exact routine.

const POLYNOMIAL: u16 = 0x1021;
const INITIAL: u16 = 0xFFFF;

/// Lookup table, one entry per leading byte
static TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute the CRC over `data`
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(INITIAL, |crc, &byte| {
        let index = ((crc >> 8) ^ byte as u16) & 0x00FF;
        (crc << 8) ^ TABLE[index as usize]
    })
}

/// Recompute the CRC over `data` and compare it with `received`
pub fn verify(data: &[u8], received: u16) -> bool {
    crc16(data) == received
}
