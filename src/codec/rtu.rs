// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTU framing: `[address][PDU][CRC low][CRC high]`

use std::io::{self, Error, ErrorKind};

use crate::{
    bytes::{BufMut as _, Bytes, BytesMut},
    checksum::crc16,
    frame::{adu::ChecksumStatus, MEI_TYPE_READ_DEVICE_IDENTIFICATION},
    slave::Slave,
};

use super::{is_exception, MAX_PDU_SIZE};

// address + function code + CRC
const MIN_ADU_LEN: usize = 1 + 1 + 2;

const CRC_LEN: usize = 2;

pub(crate) fn encode(buf: &mut BytesMut, slave: Slave, pdu: &[u8]) {
    buf.reserve(pdu.len() + 1 + CRC_LEN);
    let start = buf.len();
    buf.put_u8(slave.into());
    buf.put_slice(pdu);
    let crc = crc16(&buf[start..]);
    buf.put_u16_le(crc);
}

/// Splits a complete RTU frame into address and PDU.
///
/// A checksum mismatch does not prevent the PDU from being extracted.
pub(crate) fn decode(adu: &[u8]) -> io::Result<(Slave, Bytes, ChecksumStatus)> {
    if adu.len() < MIN_ADU_LEN {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("RTU frame too short: {} byte(s)", adu.len()),
        ));
    }
    let (data, crc) = adu.split_at(adu.len() - CRC_LEN);
    let received = u16::from_le_bytes([crc[0], crc[1]]);
    let checksum = ChecksumStatus::verify(crc16(data), received);
    let slave = Slave(data[0]);
    let pdu = Bytes::copy_from_slice(&data[1..]);
    Ok((slave, pdu, checksum))
}

/// Determines the PDU length of a response from the frame received so far.
///
/// `buf` starts with the address byte. Returns `None` if more bytes are
/// needed to tell the length. Diagnostics responses echo their request,
/// so their length is the one of the request PDU that has been sent.
pub(crate) fn response_pdu_len(
    buf: &[u8],
    diagnostics_len: Option<usize>,
) -> io::Result<Option<usize>> {
    if buf.len() < 2 {
        // incomplete frame
        return Ok(None);
    }
    let fn_code = buf[1];
    let len = match fn_code {
        0x01..=0x04 | 0x0C | 0x11 | 0x14 | 0x15 | 0x17 => {
            if buf.len() > 2 {
                Some(2 + usize::from(buf[2]))
            } else {
                // incomplete frame
                None
            }
        }
        0x05 | 0x06 | 0x0B | 0x0F | 0x10 => Some(5),
        0x07 => Some(2),
        0x08 => Some(diagnostics_len.ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidData,
                "unsolicited diagnostics response",
            )
        })?),
        0x16 => Some(7),
        0x18 => {
            if buf.len() > 3 {
                Some(3 + usize::from(u16::from_be_bytes([buf[2], buf[3]])))
            } else {
                // incomplete frame
                None
            }
        }
        0x2B => device_identification_pdu_len(buf)?,
        fn_code if is_exception(fn_code) => Some(2),
        _ => {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("unknown length of response with function code 0x{fn_code:02X}"),
            ));
        }
    };
    if let Some(len) = len {
        if len > MAX_PDU_SIZE {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("response PDU too long: {len} bytes"),
            ));
        }
    }
    Ok(len)
}

/// Walks the objects of a device identification response.
fn device_identification_pdu_len(buf: &[u8]) -> io::Result<Option<usize>> {
    // address, function code, MEI type, read code, conformity level,
    // more follows, next object id, number of objects
    const HEADER_LEN: usize = 8;
    if buf.len() > 2 && buf[2] != MEI_TYPE_READ_DEVICE_IDENTIFICATION {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("unsupported MEI type: 0x{:02X}", buf[2]),
        ));
    }
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }
    let mut offset = HEADER_LEN;
    for _ in 0..buf[HEADER_LEN - 1] {
        if buf.len() < offset + 2 {
            return Ok(None);
        }
        offset += 2 + usize::from(buf[offset + 1]);
    }
    // The PDU excludes the address byte.
    Ok(Some(offset - 1))
}

/// Takes the next complete response frame out of `buf`.
pub(crate) fn split_response_frame(
    buf: &mut BytesMut,
    diagnostics_len: Option<usize>,
) -> io::Result<Option<BytesMut>> {
    let Some(pdu_len) = response_pdu_len(buf, diagnostics_len)? else {
        return Ok(None);
    };
    let adu_len = 1 + pdu_len + CRC_LEN;
    if buf.len() < adu_len {
        // incomplete frame
        return Ok(None);
    }
    Ok(Some(buf.split_to(adu_len)))
}
