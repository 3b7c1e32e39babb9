// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ASCII framing: `':' hex(address, PDU, LRC) "\r\n"`

use std::io::{self, Error, ErrorKind};

use crate::{
    bytes::{BufMut as _, Bytes, BytesMut},
    checksum::lrc,
    frame::adu::ChecksumStatus,
    slave::Slave,
};

const START: u8 = b':';
const END: &[u8] = b"\r\n";

// address + function code + LRC
const MIN_DECODED_LEN: usize = 3;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

fn put_hex(buf: &mut BytesMut, byte: u8) {
    buf.put_u8(HEX_DIGITS[usize::from(byte >> 4)]);
    buf.put_u8(HEX_DIGITS[usize::from(byte & 0x0F)]);
}

fn hex_value(c: u8) -> io::Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        _ => Err(Error::new(
            ErrorKind::InvalidData,
            format!("invalid hex character: 0x{c:02X}"),
        )),
    }
}

pub(crate) fn encode(buf: &mut BytesMut, slave: Slave, pdu: &[u8]) {
    buf.reserve(1 + (pdu.len() + 2) * 2 + END.len());
    let slave_id = slave.into();
    buf.put_u8(START);
    put_hex(buf, slave_id);
    for byte in pdu {
        put_hex(buf, *byte);
    }
    let checksum = lrc(&[slave_id]).wrapping_add(lrc(pdu));
    put_hex(buf, checksum);
    buf.put_slice(END);
}

/// Splits a complete ASCII frame into address and PDU.
///
/// Hex digits are accepted in either case. A checksum mismatch does
/// not prevent the PDU from being extracted.
pub(crate) fn decode(adu: &[u8]) -> io::Result<(Slave, Bytes, ChecksumStatus)> {
    let hex = adu
        .strip_prefix(&[START])
        .and_then(|rest| rest.strip_suffix(END))
        .ok_or_else(|| Error::new(ErrorKind::InvalidData, "missing ASCII frame delimiters"))?;
    if hex.len() % 2 != 0 {
        return Err(Error::new(
            ErrorKind::InvalidData,
            "odd number of hex characters",
        ));
    }
    let data = hex
        .chunks_exact(2)
        .map(|pair| -> io::Result<u8> { Ok((hex_value(pair[0])? << 4) | hex_value(pair[1])?) })
        .collect::<io::Result<Vec<u8>>>()?;
    if data.len() < MIN_DECODED_LEN {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("ASCII frame too short: {} byte(s)", data.len()),
        ));
    }
    let (data, received) = data.split_at(data.len() - 1);
    let checksum = ChecksumStatus::verify(lrc(data).into(), received[0].into());
    let slave = Slave(data[0]);
    let pdu = Bytes::copy_from_slice(&data[1..]);
    Ok((slave, pdu, checksum))
}

/// Takes the next complete frame out of `buf`.
///
/// Characters preceding the start character are discarded.
pub(crate) fn split_frame(buf: &mut BytesMut) -> Option<BytesMut> {
    let Some(start) = buf.iter().position(|c| *c == START) else {
        if !buf.is_empty() {
            log::debug!("Discarding {} byte(s) outside of an ASCII frame", buf.len());
            buf.clear();
        }
        return None;
    };
    if start > 0 {
        log::debug!("Discarding {start} byte(s) before the start of an ASCII frame");
        let _ = buf.split_to(start);
    }
    let end = buf
        .windows(END.len())
        .position(|window| window == END)?;
    Some(buf.split_to(end + END.len()))
}
