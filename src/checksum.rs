// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
//! Packet error code and message integrity check.
//!
//! The PEC is the SMBus CRC-8 (polynomial 0x07, zero seed, MSB first). The
//! MIC is CRC-32C (polynomial 0x1EDC6F41 reflected, seed 0xFFFFFFFF, inverted
//! result),
//! transmitted little-endian after the last message byte. Both lookup tables
//! are generated at compile time.

pub const PEC: crc::Crc<u8> = crc::Crc::<u8>::new(&crc::CRC_8_SMBUS);
pub const MIC: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISCSI);

pub const MIC_LEN: usize = 4;

pub fn crc8(bytes: &[u8]) -> u8 {
    PEC.checksum(bytes)
}

pub fn crc32(bytes: &[u8]) -> u32 {
    MIC.checksum(bytes)
}

#[cfg(test)]
mod test {
    use super::{crc8, crc32};

    #[test]
    fn crc8_check_value() {
        assert_eq!(crc8(b"123456789"), 0xf4);
    }

    #[test]
    fn crc8_empty() {
        assert_eq!(crc8(&[]), 0);
    }

    #[test]
    fn crc8_single_byte() {
        // One step of the polynomial: 0x80 << 1 overflows into 0x07
        assert_eq!(crc8(&[0x80]), 0x89);
        assert_eq!(crc8(&[0x01]), 0x07);
    }

    #[test]
    fn crc32_check_value() {
        assert_eq!(crc32(b"123456789"), 0xe306_9283);
    }

    #[test]
    fn crc32_empty() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn crc32_management_response() {
        // Invalid Parameter response to an MI command
        #[rustfmt::skip]
        const MSG: [u8; 8] = [
            0x84, 0x88, 0x00, 0x00,
            0x04, 0x00, 0x00, 0x00,
        ];
        assert_eq!(crc32(&MSG).to_le_bytes(), [0xd7, 0x64, 0x55, 0x59]);
    }

    #[test]
    fn crc32_detects_single_bit_error() {
        let msg = *b"123456789";
        let reference = crc32(&msg);
        for byte in 0..msg.len() {
            for bit in 0..8 {
                let mut flipped = msg;
                flipped[byte] ^= 1 << bit;
                assert_ne!(crc32(&flipped), reference, "byte {byte} bit {bit}");
            }
        }
    }
}
