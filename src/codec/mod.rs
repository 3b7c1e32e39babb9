// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encoding of request PDUs and decoding of response PDUs

use std::{
    convert::TryFrom,
    io::{self, BufRead as _, Cursor, Error, ErrorKind},
};

use byteorder::{BigEndian, ReadBytesExt as _};

use crate::{
    bytes::{Buf as _, BufMut as _, Bytes, BytesMut},
    config::Mode,
    frame::{adu::ChecksumStatus, *},
    slave::Slave,
};

pub(crate) mod ascii;
pub(crate) mod rtu;
pub(crate) mod serial;

/// Maximum request/response PDU size.
///
/// As defined for the Modbus serial line.
pub(crate) const MAX_PDU_SIZE: usize = 253;

/// Size of a file record sub-request header:
/// reference type, file number, record number and record length.
const FILE_RECORD_HEADER_SIZE: usize = 7;

#[allow(clippy::cast_possible_truncation)]
fn u16_len(len: usize) -> u16 {
    // This type conversion should always be safe, because either
    // the caller is responsible to pass a valid usize or the
    // possible values are limited by the protocol.
    debug_assert!(len <= u16::MAX.into());
    len as u16
}

#[allow(clippy::cast_possible_truncation)]
fn u8_len(len: usize) -> u8 {
    // This type conversion should always be safe, because either
    // the caller is responsible to pass a valid usize or the
    // possible values are limited by the protocol.
    debug_assert!(len <= u8::MAX.into());
    len as u8
}

fn file_record_size(record: &FileRecord) -> usize {
    FILE_RECORD_HEADER_SIZE + record.data.len() * 2
}

pub(crate) fn encode_request_pdu(buf: &mut BytesMut, request: &Request<'_>) {
    use crate::frame::Request::*;
    buf.put_u8(request.function_code().value());
    match request {
        ReadCoils(address, quantity)
        | ReadDiscreteInputs(address, quantity)
        | ReadInputRegisters(address, quantity)
        | ReadHoldingRegisters(address, quantity) => {
            buf.put_u16(*address);
            buf.put_u16(*quantity);
        }
        WriteSingleCoil(address, state) => {
            buf.put_u16(*address);
            buf.put_u16(bool_to_coil(*state));
        }
        WriteMultipleCoils(address, coils) => {
            buf.put_u16(*address);
            buf.put_u16(u16_len(coils.len()));
            buf.put_u8(u8_len(packed_coils_size(coils)));
            encode_packed_coils(buf, coils);
        }
        WriteSingleRegister(address, word) => {
            buf.put_u16(*address);
            buf.put_u16(*word);
        }
        WriteMultipleRegisters(address, words) => {
            buf.put_u16(*address);
            let len = words.len();
            buf.put_u16(u16_len(len));
            buf.put_u8(u8_len(len * 2));
            for w in words.as_ref() {
                buf.put_u16(*w);
            }
        }
        ReadExceptionStatus | GetCommEventCounter | GetCommEventLog | ReportServerId => {}
        Diagnostics(sub_function, data) => {
            buf.put_u16(sub_function.value());
            buf.put_slice(data);
        }
        ReadFileRecord(requests) => {
            buf.put_u8(u8_len(requests.len() * FILE_RECORD_HEADER_SIZE));
            for request in requests.iter() {
                buf.put_u8(FILE_RECORD_REFERENCE_TYPE);
                buf.put_u16(request.file_number);
                buf.put_u16(request.record_number);
                buf.put_u16(request.record_length);
            }
        }
        WriteFileRecord(records) => {
            buf.put_u8(u8_len(records.iter().map(file_record_size).sum()));
            for record in records.iter() {
                buf.put_u8(FILE_RECORD_REFERENCE_TYPE);
                buf.put_u16(record.file_number);
                buf.put_u16(record.record_number);
                buf.put_u16(u16_len(record.data.len()));
                for w in &record.data {
                    buf.put_u16(*w);
                }
            }
        }
        MaskWriteRegister(address, and_mask, or_mask) => {
            buf.put_u16(*address);
            buf.put_u16(*and_mask);
            buf.put_u16(*or_mask);
        }
        ReadWriteMultipleRegisters(read_address, quantity, write_address, words) => {
            buf.put_u16(*read_address);
            buf.put_u16(*quantity);
            buf.put_u16(*write_address);
            let len = words.len();
            buf.put_u16(u16_len(len));
            buf.put_u8(u8_len(len * 2));
            for w in words.as_ref() {
                buf.put_u16(*w);
            }
        }
        ReadFifoQueue(address) => {
            buf.put_u16(*address);
        }
        ReadDeviceIdentification(read_code, object_id) => {
            buf.put_u8(MEI_TYPE_READ_DEVICE_IDENTIFICATION);
            buf.put_u8(read_code.value());
            buf.put_u8(*object_id);
        }
        Custom(_, custom_data) => {
            buf.put_slice(custom_data.as_ref());
        }
    }
}

pub(crate) fn request_pdu_size(request: &Request<'_>) -> io::Result<usize> {
    use crate::frame::Request::*;
    let size = match request {
        ReadCoils(_, _)
        | ReadDiscreteInputs(_, _)
        | ReadInputRegisters(_, _)
        | ReadHoldingRegisters(_, _)
        | WriteSingleRegister(_, _)
        | WriteSingleCoil(_, _) => 5,
        WriteMultipleCoils(_, coils) => 6 + packed_coils_size(coils),
        WriteMultipleRegisters(_, data) => 6 + data.len() * 2,
        ReadExceptionStatus | GetCommEventCounter | GetCommEventLog | ReportServerId => 1,
        Diagnostics(_, data) => 3 + data.len(),
        ReadFileRecord(requests) => 2 + requests.len() * FILE_RECORD_HEADER_SIZE,
        WriteFileRecord(records) => 2 + records.iter().map(file_record_size).sum::<usize>(),
        MaskWriteRegister(_, _, _) => 7,
        ReadWriteMultipleRegisters(_, _, _, data) => 10 + data.len() * 2,
        ReadFifoQueue(_) => 3,
        ReadDeviceIdentification(_, _) => 4,
        Custom(_, data) => 1 + data.len(),
    };
    if size > MAX_PDU_SIZE {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            "request PDU size exceeded",
        ));
    }
    Ok(size)
}

/// Frames a PDU addressed to `slave` in the given transmission mode.
///
/// The first byte of `pdu` is the function code.
#[must_use]
pub fn encode_adu(mode: Mode, slave: Slave, pdu: &[u8]) -> Bytes {
    let mut buf = BytesMut::new();
    match mode {
        Mode::Rtu => rtu::encode(&mut buf, slave, pdu),
        Mode::Ascii => ascii::encode(&mut buf, slave, pdu),
    }
    buf.freeze()
}

/// Splits a complete frame received in the given transmission mode
/// into address and PDU.
///
/// The checksum is verified but a mismatch is only reported, the PDU is
/// extracted anyway.
///
/// # Errors
///
/// Fails if the frame is malformed, i.e. too short or, in ASCII mode,
/// without delimiters or with invalid hex characters.
pub fn decode_adu(mode: Mode, adu: &[u8]) -> io::Result<(Slave, Bytes, ChecksumStatus)> {
    match mode {
        Mode::Rtu => rtu::decode(adu),
        Mode::Ascii => ascii::decode(adu),
    }
}

fn read_u16_be(reader: &mut impl io::Read) -> io::Result<u16> {
    reader.read_u16::<BigEndian>()
}

/// Reads a byte count followed by bit-packed coils.
///
/// The number of requested coils is unknown at this point, so
/// all bits of the received bytes are unpacked.
fn read_packed_coils(bytes: &Bytes, rdr: &mut Cursor<&Bytes>) -> io::Result<Vec<Coil>> {
    let byte_count = rdr.read_u8()?;
    if bytes.len() < 2 + usize::from(byte_count) {
        return Err(io::Error::new(ErrorKind::InvalidData, "too short"));
    }
    let packed_coils = &bytes[2..2 + usize::from(byte_count)];
    rdr.consume(byte_count.into());
    let quantity = u16::from(byte_count) * 8;
    Ok(decode_packed_coils(packed_coils, quantity))
}

/// Reads a byte count followed by 16 bit registers.
fn read_words(rdr: &mut Cursor<&Bytes>) -> io::Result<Vec<Word>> {
    let byte_count = rdr.read_u8()?;
    if byte_count % 2 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid quantity",
        ));
    }
    let quantity = byte_count / 2;
    let mut data = Vec::with_capacity(quantity.into());
    for _ in 0..quantity {
        data.push(read_u16_be(rdr)?);
    }
    Ok(data)
}

/// Walks the length-prefixed sub-responses of a "Read File Record" response.
fn read_file_record_groups(bytes: &Bytes, rdr: &mut Cursor<&Bytes>) -> io::Result<Vec<Vec<Word>>> {
    let data_len = usize::from(rdr.read_u8()?);
    let end = 2 + data_len;
    if bytes.len() < end {
        return Err(io::Error::new(ErrorKind::InvalidData, "too short"));
    }
    let mut groups = Vec::new();
    let mut offset = 2;
    while offset < end {
        // The sub-response length includes the reference type.
        let sub_len = usize::from(bytes[offset]);
        if sub_len == 0 || (sub_len - 1) % 2 != 0 || offset + 1 + sub_len > end {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("invalid file record sub-response length: {sub_len}"),
            ));
        }
        let reference_type = bytes[offset + 1];
        if reference_type != FILE_RECORD_REFERENCE_TYPE {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("invalid file record reference type: 0x{reference_type:02X}"),
            ));
        }
        let words = bytes[offset + 2..offset + 1 + sub_len]
            .chunks_exact(2)
            .map(|word| u16::from_be_bytes([word[0], word[1]]))
            .collect();
        groups.push(words);
        offset += sub_len + 1;
    }
    rdr.consume(data_len);
    Ok(groups)
}

/// Reads the records echoed by a "Write File Record" response.
fn read_file_records(rdr: &mut Cursor<&Bytes>) -> io::Result<Vec<FileRecord>> {
    let mut remaining = usize::from(rdr.read_u8()?);
    let mut records = Vec::new();
    while remaining > 0 {
        if remaining < FILE_RECORD_HEADER_SIZE {
            return Err(io::Error::new(ErrorKind::InvalidData, "too short"));
        }
        let reference_type = rdr.read_u8()?;
        if reference_type != FILE_RECORD_REFERENCE_TYPE {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("invalid file record reference type: 0x{reference_type:02X}"),
            ));
        }
        let file_number = read_u16_be(rdr)?;
        let record_number = read_u16_be(rdr)?;
        let record_length = read_u16_be(rdr)?;
        let mut data = Vec::with_capacity(record_length.into());
        for _ in 0..record_length {
            data.push(read_u16_be(rdr)?);
        }
        let record = FileRecord {
            file_number,
            record_number,
            data,
        };
        remaining = remaining
            .checked_sub(file_record_size(&record))
            .ok_or_else(|| io::Error::new(ErrorKind::InvalidData, "invalid byte count"))?;
        records.push(record);
    }
    Ok(records)
}

fn decode_read_device_identification(
    bytes: &Bytes,
) -> io::Result<ReadDeviceIdentificationResponse> {
    if bytes.len() < 7 {
        return Err(io::Error::new(ErrorKind::InvalidData, "too short"));
    }
    let mei_type = bytes[1];
    if mei_type != MEI_TYPE_READ_DEVICE_IDENTIFICATION {
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            format!("unsupported MEI type: 0x{mei_type:02X}"),
        ));
    }
    let read_code = ReadCode::try_from_value(bytes[2]).ok_or_else(|| {
        io::Error::new(
            ErrorKind::InvalidData,
            format!("invalid read device ID code: 0x{:02X}", bytes[2]),
        )
    })?;
    let conformity_level = ConformityLevel::try_from_value(bytes[3]).ok_or_else(|| {
        io::Error::new(
            ErrorKind::InvalidData,
            format!("invalid conformity level: 0x{:02X}", bytes[3]),
        )
    })?;
    let more_follows = bytes[4] != 0x00;
    let next_object_id = bytes[5];
    let object_count = bytes[6];

    let mut device_id_objects = Vec::with_capacity(object_count.into());
    let mut offset = 7;
    for _ in 0..object_count {
        if bytes.len() < offset + 2 {
            return Err(io::Error::new(ErrorKind::InvalidData, "too short"));
        }
        let id = bytes[offset];
        let start = offset + 2;
        let end = start + usize::from(bytes[offset + 1]);
        if bytes.len() < end {
            return Err(io::Error::new(ErrorKind::InvalidData, "too short"));
        }
        device_id_objects.push(DeviceIdObject {
            id,
            value: bytes.slice(start..end),
        });
        offset = end;
    }
    if offset != bytes.len() {
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            "undecoded response data",
        ));
    }

    Ok(ReadDeviceIdentificationResponse {
        read_code,
        conformity_level,
        more_follows,
        next_object_id,
        device_id_objects,
    })
}

impl TryFrom<Bytes> for Response {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        use crate::frame::Response::*;
        if bytes.len() > MAX_PDU_SIZE {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "response PDU size exceeded",
            ));
        }
        let rdr = &mut Cursor::new(&bytes);
        let fn_code = rdr.read_u8()?;
        let rsp = match fn_code {
            0x01 => ReadCoils(read_packed_coils(&bytes, rdr)?),
            0x02 => ReadDiscreteInputs(read_packed_coils(&bytes, rdr)?),
            0x03 => ReadHoldingRegisters(read_words(rdr)?),
            0x04 => ReadInputRegisters(read_words(rdr)?),
            0x05 => WriteSingleCoil(read_u16_be(rdr)?, coil_to_bool(read_u16_be(rdr)?)?),
            0x06 => WriteSingleRegister(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x07 => ReadExceptionStatus(rdr.read_u8()?),
            0x08 => {
                let sub_function = DiagnosticSubFunction::new(read_u16_be(rdr)?);
                let data = bytes.slice(3..);
                rdr.consume(data.len());
                Diagnostics(sub_function, data)
            }
            0x0B => {
                let status = read_u16_be(rdr)?;
                let event_count = read_u16_be(rdr)?;
                GetCommEventCounter(CommEventCounter {
                    busy: status != 0x0000,
                    event_count,
                })
            }
            0x0C => {
                let byte_count = usize::from(rdr.read_u8()?);
                if byte_count < 6 || bytes.len() < 2 + byte_count {
                    return Err(io::Error::new(ErrorKind::InvalidData, "too short"));
                }
                let status = read_u16_be(rdr)?;
                let event_count = read_u16_be(rdr)?;
                let message_count = read_u16_be(rdr)?;
                let events = bytes[8..2 + byte_count]
                    .iter()
                    .copied()
                    .map(CommEvent::new)
                    .collect();
                rdr.consume(byte_count - 6);
                GetCommEventLog(CommEventLog {
                    busy: status != 0x0000,
                    event_count,
                    message_count,
                    events,
                })
            }
            0x0F => WriteMultipleCoils(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x10 => WriteMultipleRegisters(read_u16_be(rdr)?, read_u16_be(rdr)?),
            0x11 => {
                let byte_count = rdr.read_u8()?;
                if byte_count < 2 {
                    return Err(io::Error::new(io::ErrorKind::InvalidData, "too short"));
                }
                let data_len = (byte_count - 2).into();
                let server_id = rdr.read_u8()?;
                let run_indication_status = match rdr.read_u8()? {
                    0x00 => false,
                    0xFF => true,
                    status => {
                        return Err(Error::new(
                            ErrorKind::InvalidData,
                            format!("invalid run indication status: 0x{status:02X}"),
                        ));
                    }
                };
                let mut data = Vec::with_capacity(data_len);
                for _ in 0..data_len {
                    data.push(rdr.read_u8()?);
                }
                ReportServerId(server_id, run_indication_status, data)
            }
            0x14 => ReadFileRecord(read_file_record_groups(&bytes, rdr)?),
            0x15 => WriteFileRecord(read_file_records(rdr)?),
            0x16 => {
                let address = read_u16_be(rdr)?;
                let and_mask = read_u16_be(rdr)?;
                let or_mask = read_u16_be(rdr)?;
                MaskWriteRegister(address, and_mask, or_mask)
            }
            0x17 => ReadWriteMultipleRegisters(read_words(rdr)?),
            0x18 => {
                let byte_count = read_u16_be(rdr)?;
                let fifo_count = read_u16_be(rdr)?;
                if usize::from(byte_count) != 2 + usize::from(fifo_count) * 2 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "invalid FIFO count",
                    ));
                }
                let mut data = Vec::with_capacity(fifo_count.into());
                for _ in 0..fifo_count {
                    data.push(read_u16_be(rdr)?);
                }
                ReadFifoQueue(data)
            }
            0x2B => {
                // Validates that all data has been consumed.
                return decode_read_device_identification(&bytes).map(ReadDeviceIdentification);
            }
            _ => {
                // Consume all remaining bytes as custom data.
                let mut bytes = bytes;
                return Ok(Custom(fn_code, bytes.split_off(1)));
            }
        };
        // Verify that all data has been consumed and decoded.
        if rdr.has_remaining() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "undecoded response data",
            ));
        }
        Ok(rsp)
    }
}

impl TryFrom<Bytes> for ExceptionResponse {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let mut rdr = Cursor::new(&bytes);
        let fn_err_code = rdr.read_u8()?;
        if fn_err_code < 0x80 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "Invalid exception function code",
            ));
        }
        let function = fn_err_code - 0x80;
        let exception = ExceptionCode::new(rdr.read_u8()?);
        Ok(ExceptionResponse {
            function: FunctionCode::new(function),
            exception,
        })
    }
}

impl TryFrom<Bytes> for ResponsePdu {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        let fn_code = Cursor::new(&bytes).read_u8()?;
        let pdu = if is_exception(fn_code) {
            ExceptionResponse::try_from(bytes)?.into()
        } else {
            Response::try_from(bytes)?.into()
        };
        Ok(pdu)
    }
}

/// Exception responses echo the function code with the high bit set.
pub(crate) const fn is_exception(fn_code: u8) -> bool {
    fn_code & 0x80 != 0
}

fn bool_to_coil(state: bool) -> u16 {
    if state {
        0xFF00
    } else {
        0x0000
    }
}

fn coil_to_bool(coil: u16) -> io::Result<bool> {
    match coil {
        0xFF00 => Ok(true),
        0x0000 => Ok(false),
        _ => Err(Error::new(
            ErrorKind::InvalidData,
            format!("Invalid coil value: 0x{coil:04X}"),
        )),
    }
}

fn packed_coils_size(coils: &[Coil]) -> usize {
    (coils.len() + 7) / 8
}

fn encode_packed_coils(buf: &mut BytesMut, coils: &[Coil]) -> usize {
    let packed_coils_size = packed_coils_size(coils);
    let offset = buf.len();
    buf.resize(offset + packed_coils_size, 0);
    let buf = &mut buf[offset..];
    for (i, b) in coils.iter().enumerate() {
        let v = u8::from(*b); // 0 or 1
        buf[i / 8] |= v << (i % 8);
    }
    packed_coils_size
}

/// Unpacks `count` bits LSB-first, discarding the padding bits of the last byte.
pub(crate) fn decode_packed_coils(bytes: &[u8], count: u16) -> Vec<Coil> {
    let mut res = Vec::with_capacity(count.into());
    for i in 0usize..count.into() {
        res.push((bytes[i / 8] >> (i % 8)) & 0b1 > 0);
    }
    res
}
