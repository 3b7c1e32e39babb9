// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checksums of the two serial transmission modes.

/// Computes the _Modbus_ CRC-16 used by RTU frames.
///
/// The register starts at `0xFFFF` and is shifted LSB-first with the
/// reflected polynomial `0xA001`. On the wire the low byte is sent first.
#[must_use]
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc = 0xFFFF;
    for x in bytes {
        crc ^= u16::from(*x);
        for _ in 0..8 {
            if (crc & 0x0001) != 0 {
                crc >>= 1;
                crc ^= 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Computes the longitudinal redundancy check used by ASCII frames.
///
/// This is the two's complement of the 8-bit truncated sum of all bytes.
#[must_use]
pub fn lrc(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |sum, b| sum.wrapping_add(*b))
        .wrapping_neg()
}
