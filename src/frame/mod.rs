// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

pub(crate) mod adu;

use std::{
    borrow::Cow,
    error,
    fmt::{self, Display},
};

use crate::bytes::Bytes;

/// MEI type code (`0x0E`) for Modbus "Read Device Identification" (function 0x2B).
pub(crate) const MEI_TYPE_READ_DEVICE_IDENTIFICATION: u8 = 0x0E;

/// Reference type of every file record sub-request.
pub(crate) const FILE_RECORD_REFERENCE_TYPE: u8 = 0x06;

/// A Modbus function code.
///
/// All function codes as defined by the protocol specification V1.1b3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCode {
    /// 01 (0x01) Read Coils.
    ReadCoils,

    /// 02 (0x02) Read Discrete Inputs
    ReadDiscreteInputs,

    /// 03 (0x03) Read Holding Registers
    ReadHoldingRegisters,

    /// 04 (0x04) Read Input Registers
    ReadInputRegisters,

    /// 05 (0x05) Write Single Coil
    WriteSingleCoil,

    /// 06 (0x06) Write Single Register
    WriteSingleRegister,

    /// 07 (0x07) Read Exception Status (Serial Line only)
    ReadExceptionStatus,

    /// 08 (0x08) Diagnostics (Serial Line only)
    Diagnostics,

    /// 11 (0x0B) Get Comm Event Counter (Serial Line only)
    GetCommEventCounter,

    /// 12 (0x0C) Get Comm Event Log (Serial Line only)
    GetCommEventLog,

    /// 15 (0x0F) Write Multiple Coils
    WriteMultipleCoils,

    /// 16 (0x10) Write Multiple Registers
    WriteMultipleRegisters,

    /// 17 (0x11) Report Slave ID (Serial Line only)
    ReportServerId,

    /// 20 (0x14) Read File Record
    ReadFileRecord,

    /// 21 (0x15) Write File Record
    WriteFileRecord,

    /// 22 (0x16) Mask Write Register
    MaskWriteRegister,

    /// 23 (0x17) Read/Write Multiple Registers
    ReadWriteMultipleRegisters,

    /// 24 (0x18) Read FIFO Queue
    ReadFifoQueue,

    /// 43 (0x2B) Encapsulated Interface Transport
    EncapsulatedInterfaceTransport,

    /// Custom Modbus Function Code.
    Custom(u8),
}

impl FunctionCode {
    /// All function codes with a dedicated request encoder and response decoder.
    pub const SUPPORTED: [FunctionCode; 19] = [
        Self::ReadCoils,
        Self::ReadDiscreteInputs,
        Self::ReadHoldingRegisters,
        Self::ReadInputRegisters,
        Self::WriteSingleCoil,
        Self::WriteSingleRegister,
        Self::ReadExceptionStatus,
        Self::Diagnostics,
        Self::GetCommEventCounter,
        Self::GetCommEventLog,
        Self::WriteMultipleCoils,
        Self::WriteMultipleRegisters,
        Self::ReportServerId,
        Self::ReadFileRecord,
        Self::WriteFileRecord,
        Self::MaskWriteRegister,
        Self::ReadWriteMultipleRegisters,
        Self::ReadFifoQueue,
        Self::EncapsulatedInterfaceTransport,
    ];

    /// Create a new [`FunctionCode`] with `value`.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        match value {
            0x01 => Self::ReadCoils,
            0x02 => Self::ReadDiscreteInputs,
            0x03 => Self::ReadHoldingRegisters,
            0x04 => Self::ReadInputRegisters,
            0x05 => Self::WriteSingleCoil,
            0x06 => Self::WriteSingleRegister,
            0x07 => Self::ReadExceptionStatus,
            0x08 => Self::Diagnostics,
            0x0B => Self::GetCommEventCounter,
            0x0C => Self::GetCommEventLog,
            0x0F => Self::WriteMultipleCoils,
            0x10 => Self::WriteMultipleRegisters,
            0x11 => Self::ReportServerId,
            0x14 => Self::ReadFileRecord,
            0x15 => Self::WriteFileRecord,
            0x16 => Self::MaskWriteRegister,
            0x17 => Self::ReadWriteMultipleRegisters,
            0x18 => Self::ReadFifoQueue,
            0x2B => Self::EncapsulatedInterfaceTransport,
            code => Self::Custom(code),
        }
    }

    /// Gets the [`u8`] value of the current [`FunctionCode`].
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::ReadCoils => 0x01,
            Self::ReadDiscreteInputs => 0x02,
            Self::ReadHoldingRegisters => 0x03,
            Self::ReadInputRegisters => 0x04,
            Self::WriteSingleCoil => 0x05,
            Self::WriteSingleRegister => 0x06,
            Self::ReadExceptionStatus => 0x07,
            Self::Diagnostics => 0x08,
            Self::GetCommEventCounter => 0x0B,
            Self::GetCommEventLog => 0x0C,
            Self::WriteMultipleCoils => 0x0F,
            Self::WriteMultipleRegisters => 0x10,
            Self::ReportServerId => 0x11,
            Self::ReadFileRecord => 0x14,
            Self::WriteFileRecord => 0x15,
            Self::MaskWriteRegister => 0x16,
            Self::ReadWriteMultipleRegisters => 0x17,
            Self::ReadFifoQueue => 0x18,
            Self::EncapsulatedInterfaceTransport => 0x2B,
            Self::Custom(code) => code,
        }
    }
}

impl Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value().fmt(f)
    }
}

/// A Modbus protocol address is represented by 16 bit from `0` to `65535`.
///
/// This *protocol address* uses 0-based indexing, while the *coil address* or
/// *register address* is often specified as a number with 1-based indexing.
/// Please consult the specification of your devices if 1-based coil/register
/// addresses need to be converted to 0-based protocol addresses by subtracting 1.
pub type Address = u16;

/// A Coil represents a single bit.
///
/// - `true` is equivalent to `ON`, `1` and `0xFF00`.
/// - `false` is equivalent to `OFF`, `0` and `0x0000`.
pub type Coil = bool;

/// Modbus uses 16 bit for its data items.
///
/// Transmitted using a big-endian representation.
pub type Word = u16;

/// Number of items to process.
pub type Quantity = u16;

/// Sub-function of the serial line diagnostics (function 0x08).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticSubFunction {
    /// 0x00: echo the request data.
    ReturnQueryData,
    /// 0x01: restart the serial line port, optionally clearing the event log.
    RestartCommunications,
    /// 0x02
    ReturnDiagnosticRegister,
    /// 0x03: set the end of message character of ASCII frames.
    ChangeAsciiInputDelimiter,
    /// 0x04: the device stops responding until it is restarted.
    ForceListenOnlyMode,
    /// 0x0A
    ClearCountersAndDiagnosticRegister,
    /// 0x0B
    ReturnBusMessageCount,
    /// 0x0C
    ReturnBusCommunicationErrorCount,
    /// 0x0D
    ReturnBusExceptionErrorCount,
    /// 0x0E
    ReturnServerMessageCount,
    /// 0x0F
    ReturnServerNoResponseCount,
    /// 0x10
    ReturnServerNakCount,
    /// 0x11
    ReturnServerBusyCount,
    /// 0x12
    ReturnBusCharacterOverrunCount,
    /// 0x14
    ClearOverrunCounterAndFlag,
    /// Any other sub-function code.
    Unknown(u16),
}

impl DiagnosticSubFunction {
    #[must_use]
    pub const fn new(value: u16) -> Self {
        match value {
            0x00 => Self::ReturnQueryData,
            0x01 => Self::RestartCommunications,
            0x02 => Self::ReturnDiagnosticRegister,
            0x03 => Self::ChangeAsciiInputDelimiter,
            0x04 => Self::ForceListenOnlyMode,
            0x0A => Self::ClearCountersAndDiagnosticRegister,
            0x0B => Self::ReturnBusMessageCount,
            0x0C => Self::ReturnBusCommunicationErrorCount,
            0x0D => Self::ReturnBusExceptionErrorCount,
            0x0E => Self::ReturnServerMessageCount,
            0x0F => Self::ReturnServerNoResponseCount,
            0x10 => Self::ReturnServerNakCount,
            0x11 => Self::ReturnServerBusyCount,
            0x12 => Self::ReturnBusCharacterOverrunCount,
            0x14 => Self::ClearOverrunCounterAndFlag,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn value(self) -> u16 {
        match self {
            Self::ReturnQueryData => 0x00,
            Self::RestartCommunications => 0x01,
            Self::ReturnDiagnosticRegister => 0x02,
            Self::ChangeAsciiInputDelimiter => 0x03,
            Self::ForceListenOnlyMode => 0x04,
            Self::ClearCountersAndDiagnosticRegister => 0x0A,
            Self::ReturnBusMessageCount => 0x0B,
            Self::ReturnBusCommunicationErrorCount => 0x0C,
            Self::ReturnBusExceptionErrorCount => 0x0D,
            Self::ReturnServerMessageCount => 0x0E,
            Self::ReturnServerNoResponseCount => 0x0F,
            Self::ReturnServerNakCount => 0x10,
            Self::ReturnServerBusyCount => 0x11,
            Self::ReturnBusCharacterOverrunCount => 0x12,
            Self::ClearOverrunCounterAndFlag => 0x14,
            Self::Unknown(value) => value,
        }
    }
}

/// Selects a range of records within a file (function 0x14).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRecordRequest {
    pub file_number: u16,
    pub record_number: u16,
    /// Number of 16 bit registers to read.
    pub record_length: u16,
}

/// Records written to a file (function 0x15).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub file_number: u16,
    pub record_number: u16,
    pub data: Vec<Word>,
}

/// A request represents a message from the client (master) to the server (slave).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    /// A request to read multiple coils.
    /// The first parameter is the address of the first coil to read.
    /// The second parameter is the number of coils to read.
    ReadCoils(Address, Quantity),

    /// A request to read multiple discrete inputs
    /// The first parameter is the address of the first discrete input to read.
    /// The second parameter is the number of discrete inputs to read.
    ReadDiscreteInputs(Address, Quantity),

    /// A request to write a single coil.
    /// The first parameter is the address of the coil.
    /// The second parameter is the value to write to the coil.
    WriteSingleCoil(Address, Coil),

    /// A request to write multiple coils.
    /// The first parameter is the address of the first coil to write.
    /// The second parameter is the vector of values to write to the coils.
    WriteMultipleCoils(Address, Cow<'a, [Coil]>),

    /// A request to read multiple input registers.
    /// The first parameter is the address of the first input register to read.
    /// The second parameter is the number of input registers to read.
    ReadInputRegisters(Address, Quantity),

    /// A request to read multiple holding registers.
    /// The first parameter is the address of the first holding register to read.
    /// The second parameter is the number of holding registers to read.
    ReadHoldingRegisters(Address, Quantity),

    /// A request to write a single register.
    /// The first parameter is the address of the register to read.
    /// The second parameter is the value to write to the register.
    WriteSingleRegister(Address, Word),

    /// A request to write to multiple registers.
    /// The first parameter is the address of the first register to write.
    /// The second parameter is the vector of values to write to the registers.
    WriteMultipleRegisters(Address, Cow<'a, [Word]>),

    /// A request to read the eight exception status outputs (Serial Line only).
    ReadExceptionStatus,

    /// A diagnostics request (Serial Line only).
    /// The first parameter selects the sub-function.
    /// The second parameter is the raw data following the sub-function.
    Diagnostics(DiagnosticSubFunction, Cow<'a, [u8]>),

    /// A request to get the status word and event count (Serial Line only).
    GetCommEventCounter,

    /// A request to get the status, counters and event log (Serial Line only).
    GetCommEventLog,

    /// A request to report server ID (Serial Line only).
    ReportServerId,

    /// A request to read one or more groups of file records.
    ReadFileRecord(Cow<'a, [FileRecordRequest]>),

    /// A request to write one or more groups of file records.
    WriteFileRecord(Cow<'a, [FileRecord]>),

    /// A request to set or clear individual bits of a holding register.
    /// The first parameter is the address of the holding register.
    /// The second parameter is the AND mask.
    /// The third parameter is the OR mask.
    MaskWriteRegister(Address, Word, Word),

    /// A request to simultaneously read multiple registers and write multiple registers.
    /// The first parameter is the address of the first register to read.
    /// The second parameter is the number of registers to read.
    /// The third parameter is the address of the first register to write.
    /// The fourth parameter is the vector of values to write to the registers.
    ReadWriteMultipleRegisters(Address, Quantity, Address, Cow<'a, [Word]>),

    /// A request to read the contents of a FIFO queue of registers.
    /// The parameter is the address of the FIFO pointer register.
    ReadFifoQueue(Address),

    /// A request to read device identification.
    /// The first parameter is the [`ReadCode`].
    /// The second parameter is the object ID: the first object to return (stream access)
    /// or the specific object to read (individual access).
    ReadDeviceIdentification(ReadCode, ObjectId),

    /// A raw Modbus request.
    /// The first parameter is the Modbus function code.
    /// The second parameter is the raw bytes of the request.
    Custom(u8, Cow<'a, [u8]>),
}

impl Request<'_> {
    /// Converts the request into an owned instance with `'static'` lifetime.
    #[must_use]
    pub fn into_owned(self) -> Request<'static> {
        use Request::*;

        match self {
            ReadCoils(addr, qty) => ReadCoils(addr, qty),
            ReadDiscreteInputs(addr, qty) => ReadDiscreteInputs(addr, qty),
            WriteSingleCoil(addr, coil) => WriteSingleCoil(addr, coil),
            WriteMultipleCoils(addr, coils) => {
                WriteMultipleCoils(addr, Cow::Owned(coils.into_owned()))
            }
            ReadInputRegisters(addr, qty) => ReadInputRegisters(addr, qty),
            ReadHoldingRegisters(addr, qty) => ReadHoldingRegisters(addr, qty),
            WriteSingleRegister(addr, word) => WriteSingleRegister(addr, word),
            WriteMultipleRegisters(addr, words) => {
                WriteMultipleRegisters(addr, Cow::Owned(words.into_owned()))
            }
            ReadExceptionStatus => ReadExceptionStatus,
            Diagnostics(sub_function, data) => {
                Diagnostics(sub_function, Cow::Owned(data.into_owned()))
            }
            GetCommEventCounter => GetCommEventCounter,
            GetCommEventLog => GetCommEventLog,
            ReportServerId => ReportServerId,
            ReadFileRecord(requests) => ReadFileRecord(Cow::Owned(requests.into_owned())),
            WriteFileRecord(records) => WriteFileRecord(Cow::Owned(records.into_owned())),
            MaskWriteRegister(addr, and_mask, or_mask) => {
                MaskWriteRegister(addr, and_mask, or_mask)
            }
            ReadWriteMultipleRegisters(addr, qty, write_addr, words) => {
                ReadWriteMultipleRegisters(addr, qty, write_addr, Cow::Owned(words.into_owned()))
            }
            ReadFifoQueue(addr) => ReadFifoQueue(addr),
            ReadDeviceIdentification(read_code, object_id) => {
                ReadDeviceIdentification(read_code, object_id)
            }
            Custom(func, bytes) => Custom(func, Cow::Owned(bytes.into_owned())),
        }
    }

    /// Get the [`FunctionCode`] of the [`Request`].
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        use Request::*;

        match self {
            ReadCoils(_, _) => FunctionCode::ReadCoils,
            ReadDiscreteInputs(_, _) => FunctionCode::ReadDiscreteInputs,

            WriteSingleCoil(_, _) => FunctionCode::WriteSingleCoil,
            WriteMultipleCoils(_, _) => FunctionCode::WriteMultipleCoils,

            ReadInputRegisters(_, _) => FunctionCode::ReadInputRegisters,
            ReadHoldingRegisters(_, _) => FunctionCode::ReadHoldingRegisters,

            WriteSingleRegister(_, _) => FunctionCode::WriteSingleRegister,
            WriteMultipleRegisters(_, _) => FunctionCode::WriteMultipleRegisters,

            ReadExceptionStatus => FunctionCode::ReadExceptionStatus,
            Diagnostics(_, _) => FunctionCode::Diagnostics,
            GetCommEventCounter => FunctionCode::GetCommEventCounter,
            GetCommEventLog => FunctionCode::GetCommEventLog,
            ReportServerId => FunctionCode::ReportServerId,

            ReadFileRecord(_) => FunctionCode::ReadFileRecord,
            WriteFileRecord(_) => FunctionCode::WriteFileRecord,

            MaskWriteRegister(_, _, _) => FunctionCode::MaskWriteRegister,

            ReadWriteMultipleRegisters(_, _, _, _) => FunctionCode::ReadWriteMultipleRegisters,

            ReadFifoQueue(_) => FunctionCode::ReadFifoQueue,

            ReadDeviceIdentification(_, _) => FunctionCode::EncapsulatedInterfaceTransport,

            Custom(code, _) => FunctionCode::Custom(*code),
        }
    }

    /// Whether the addressed device answers this request at all.
    ///
    /// A device switched into listen only mode never replies.
    #[must_use]
    pub const fn expects_response(&self) -> bool {
        !matches!(
            self,
            Request::Diagnostics(DiagnosticSubFunction::ForceListenOnlyMode, _)
        )
    }
}

/// The data of a successful request.
///
/// ReadCoils/ReadDiscreteInputs: The length of the result Vec is always a
/// multiple of 8. Only the values of the first bits/coils that have actually
/// been requested are defined. The value of the remaining bits depend on the
/// server implementation and those coils should be ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Response to a `ReadCoils` request
    /// The parameter contains the coil values that have been read
    /// See also the note above regarding the vector length
    ReadCoils(Vec<Coil>),

    /// Response to a `ReadDiscreteInputs` request
    /// The parameter contains the discrete input values that have been read
    /// See also the note above regarding the vector length
    ReadDiscreteInputs(Vec<Coil>),

    /// Response to a `WriteSingleCoil` request
    /// The first parameter contains the address of the coil that has been written to
    /// The second parameter contains the value that has been written to the coil the given address
    WriteSingleCoil(Address, Coil),

    /// Response to a `WriteMultipleCoils` request
    /// The first parameter contains the address at the start of the range that has been written to
    /// The second parameter contains the amount of values that have been written
    WriteMultipleCoils(Address, Quantity),

    /// Response to a `ReadInputRegisters` request
    /// The parameter contains the register values that have been read
    ReadInputRegisters(Vec<Word>),

    /// Response to a `ReadHoldingRegisters` request
    /// The parameter contains the register values that have been read
    ReadHoldingRegisters(Vec<Word>),

    /// Response to a `WriteSingleRegister` request
    /// The first parameter contains the address of the register that has been written to
    /// The second parameter contains the value that has been written to the register at the given address
    WriteSingleRegister(Address, Word),

    /// Response to a `WriteMultipleRegisters` request
    /// The first parameter contains the address at the start of the register range that has been written to
    /// The second parameter contains the amount of register that have been written
    WriteMultipleRegisters(Address, Quantity),

    /// Response to a `ReadExceptionStatus` request
    /// The parameter contains the eight exception status outputs, LSB first
    ReadExceptionStatus(u8),

    /// Response to a `Diagnostics` request
    /// The first parameter is the echoed sub-function
    /// The second parameter contains the data following the sub-function
    Diagnostics(DiagnosticSubFunction, Bytes),

    /// Response to a `GetCommEventCounter` request
    GetCommEventCounter(CommEventCounter),

    /// Response to a `GetCommEventLog` request
    GetCommEventLog(CommEventLog),

    /// Response to a `ReportServerId` request
    /// The first parameter contains the server ID
    /// The second parameter indicates whether the server is running
    /// The third parameter contains additional data from the server
    ReportServerId(u8, bool, Vec<u8>),

    /// Response to a `ReadFileRecord` request
    /// The parameter contains the registers of each requested group in request order
    ReadFileRecord(Vec<Vec<Word>>),

    /// Response to a `WriteFileRecord` request
    /// The parameter contains the echoed records
    WriteFileRecord(Vec<FileRecord>),

    /// Response `MaskWriteRegister`
    /// The first parameter is the address of the holding register.
    /// The second parameter is the AND mask.
    /// The third parameter is the OR mask.
    MaskWriteRegister(Address, Word, Word),

    /// Response to a `ReadWriteMultipleRegisters` request
    /// The parameter contains the register values that have been read as part of the read instruction
    ReadWriteMultipleRegisters(Vec<Word>),

    /// Response to a `ReadFifoQueue` request
    /// The parameter contains the queued register values
    ReadFifoQueue(Vec<Word>),

    /// Response to a `ReadDeviceIdentification` request
    ReadDeviceIdentification(ReadDeviceIdentificationResponse),

    /// Response to a raw Modbus request
    /// The first parameter contains the returned Modbus function code
    /// The second parameter contains the bytes read following the function code
    Custom(u8, Bytes),
}

impl Response {
    /// Get the [`FunctionCode`] of the [`Response`].
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        use Response::*;

        match self {
            ReadCoils(_) => FunctionCode::ReadCoils,
            ReadDiscreteInputs(_) => FunctionCode::ReadDiscreteInputs,

            WriteSingleCoil(_, _) => FunctionCode::WriteSingleCoil,
            WriteMultipleCoils(_, _) => FunctionCode::WriteMultipleCoils,

            ReadInputRegisters(_) => FunctionCode::ReadInputRegisters,
            ReadHoldingRegisters(_) => FunctionCode::ReadHoldingRegisters,

            WriteSingleRegister(_, _) => FunctionCode::WriteSingleRegister,
            WriteMultipleRegisters(_, _) => FunctionCode::WriteMultipleRegisters,

            ReadExceptionStatus(_) => FunctionCode::ReadExceptionStatus,
            Diagnostics(_, _) => FunctionCode::Diagnostics,
            GetCommEventCounter(_) => FunctionCode::GetCommEventCounter,
            GetCommEventLog(_) => FunctionCode::GetCommEventLog,
            ReportServerId(_, _, _) => FunctionCode::ReportServerId,

            ReadFileRecord(_) => FunctionCode::ReadFileRecord,
            WriteFileRecord(_) => FunctionCode::WriteFileRecord,

            MaskWriteRegister(_, _, _) => FunctionCode::MaskWriteRegister,

            ReadWriteMultipleRegisters(_) => FunctionCode::ReadWriteMultipleRegisters,

            ReadFifoQueue(_) => FunctionCode::ReadFifoQueue,

            ReadDeviceIdentification(_) => FunctionCode::EncapsulatedInterfaceTransport,

            Custom(code, _) => FunctionCode::Custom(*code),
        }
    }
}

/// Status word and event counter of a serial line device (function 0x0B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommEventCounter {
    /// A previously issued program command is still being processed.
    pub busy: bool,
    pub event_count: u16,
}

/// Status, counters and event log of a serial line device (function 0x0C).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommEventLog {
    pub busy: bool,
    pub event_count: u16,
    pub message_count: u16,
    /// Most recent event first.
    pub events: Vec<CommEvent>,
}

/// A single entry of the communication event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommEvent {
    /// The device received a message.
    Received {
        broadcast: bool,
        listen_only: bool,
        character_overrun: bool,
        communication_error: bool,
    },
    /// The device completed processing of a message.
    Sent {
        listen_only: bool,
        read_timeout: bool,
        nak_exception: bool,
        busy_exception: bool,
        abort_exception: bool,
        read_exception: bool,
    },
    /// The device entered listen only mode.
    EnteredListenOnlyMode,
    /// The communications port was restarted.
    CommunicationRestart,
}

impl CommEvent {
    #[must_use]
    pub const fn new(value: u8) -> Self {
        const fn bit(value: u8, mask: u8) -> bool {
            value & mask != 0
        }
        match value {
            0x00 => Self::CommunicationRestart,
            0x04 => Self::EnteredListenOnlyMode,
            value if bit(value, 0x80) => Self::Received {
                broadcast: bit(value, 0x40),
                listen_only: bit(value, 0x20),
                character_overrun: bit(value, 0x10),
                communication_error: bit(value, 0x02),
            },
            value => Self::Sent {
                listen_only: bit(value, 0x20),
                read_timeout: bit(value, 0x10),
                nak_exception: bit(value, 0x08),
                busy_exception: bit(value, 0x04),
                abort_exception: bit(value, 0x02),
                read_exception: bit(value, 0x01),
            },
        }
    }
}

/// A server (slave) exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    /// 0x01
    IllegalFunction,
    /// 0x02
    IllegalDataAddress,
    /// 0x03
    IllegalDataValue,
    /// 0x04
    ServerDeviceFailure,
    /// 0x05
    Acknowledge,
    /// 0x06
    ServerDeviceBusy,
    /// 0x08
    MemoryParityError,
    /// 0x0A
    GatewayPathUnavailable,
    /// 0x0B
    GatewayTargetDevice,
    /// None of the above, e.g. the unassigned codes 0x07 and 0x09.
    Unknown(u8),
}

impl From<ExceptionCode> for u8 {
    fn from(from: ExceptionCode) -> Self {
        use crate::frame::ExceptionCode::*;
        match from {
            IllegalFunction => 0x01,
            IllegalDataAddress => 0x02,
            IllegalDataValue => 0x03,
            ServerDeviceFailure => 0x04,
            Acknowledge => 0x05,
            ServerDeviceBusy => 0x06,
            MemoryParityError => 0x08,
            GatewayPathUnavailable => 0x0A,
            GatewayTargetDevice => 0x0B,
            Unknown(code) => code,
        }
    }
}

impl ExceptionCode {
    /// Create a new [`ExceptionCode`] with `value`.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        use crate::frame::ExceptionCode::*;

        match value {
            0x01 => IllegalFunction,
            0x02 => IllegalDataAddress,
            0x03 => IllegalDataValue,
            0x04 => ServerDeviceFailure,
            0x05 => Acknowledge,
            0x06 => ServerDeviceBusy,
            0x08 => MemoryParityError,
            0x0A => GatewayPathUnavailable,
            0x0B => GatewayTargetDevice,
            other => Unknown(other),
        }
    }

    /// Human readable message of the exception.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        use crate::frame::ExceptionCode::*;

        match *self {
            IllegalFunction => "Illegal Function",
            IllegalDataAddress => "Illegal Data Address",
            IllegalDataValue => "Illegal Data Value",
            ServerDeviceFailure => "Slave Device Failure",
            Acknowledge => "Acknowledge",
            ServerDeviceBusy => "Slave Device Busy",
            MemoryParityError => "Memory Parity Error",
            GatewayPathUnavailable => "Gateway Path Unavailable",
            GatewayTargetDevice => "Gateway Target Device Failed to Respond",
            Unknown(_) => "Unknown exception",
        }
    }
}

/// Represents the Modbus read device identification access type.
///
/// Used to specify the type of information to retrieve from a device during a
/// "Read Device Identification" Modbus function (0x2B / 0x0E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCode {
    /// Basic identification (stream access).
    /// Corresponds to value `0x01`. Returns a minimal set of identification data.
    Basic,
    /// Regular identification (stream access).
    /// Corresponds to value `0x02`. Returns additional identification beyond basic.
    Regular,
    /// Extended identification (stream access).
    /// Corresponds to value `0x03`. Returns the most comprehensive set of device info.
    Extended,
    /// Specific identification (individual access).
    /// Corresponds to value `0x04`. Used to retrieve a specific object by ID.
    Specific,
}

impl ReadCode {
    /// Attempts to convert a raw [`u8`] value to a [`ReadCode`].
    #[must_use]
    pub const fn try_from_value(value: u8) -> Option<Self> {
        Some(match value {
            0x01 => ReadCode::Basic,
            0x02 => ReadCode::Regular,
            0x03 => ReadCode::Extended,
            0x04 => ReadCode::Specific,
            _ => return None,
        })
    }

    /// Returns the [`u8`] representation of the current [`ReadCode`] variant.
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            ReadCode::Basic => 0x01,
            ReadCode::Regular => 0x02,
            ReadCode::Extended => 0x03,
            ReadCode::Specific => 0x04,
        }
    }
}

/// Represents the conformity level of a Modbus device's identification support.
///
/// Indicates what types of identification objects a device supports,
/// and whether access is limited to stream access or includes individual access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConformityLevel {
    /// Only basic identification objects via stream access (`0x01`).
    BasicIdentificationStreamOnly,

    /// Only regular identification objects via stream access (`0x02`).
    RegularIdentificationStreamOnly,

    /// Only extended identification objects via stream access (`0x03`).
    ExtendedIdentificationStreamOnly,

    /// Basic identification objects, with individual access supported (`0x81`).
    BasicIdentification,

    /// Regular identification objects, with individual access supported (`0x82`).
    RegularIdentification,

    /// Extended identification objects, with individual access supported (`0x83`).
    ExtendedIdentification,
}

impl ConformityLevel {
    /// Attempts to convert a raw [`u8`] to a [`ConformityLevel`].
    #[must_use]
    pub const fn try_from_value(value: u8) -> Option<Self> {
        Some(match value {
            0x01 => ConformityLevel::BasicIdentificationStreamOnly,
            0x02 => ConformityLevel::RegularIdentificationStreamOnly,
            0x03 => ConformityLevel::ExtendedIdentificationStreamOnly,
            0x81 => ConformityLevel::BasicIdentification,
            0x82 => ConformityLevel::RegularIdentification,
            0x83 => ConformityLevel::ExtendedIdentification,
            _ => return None,
        })
    }

    /// Returns the [`u8`] representation of the current [`ConformityLevel`] variant.
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            ConformityLevel::BasicIdentificationStreamOnly => 0x01,
            ConformityLevel::RegularIdentificationStreamOnly => 0x02,
            ConformityLevel::ExtendedIdentificationStreamOnly => 0x03,
            ConformityLevel::BasicIdentification => 0x81,
            ConformityLevel::RegularIdentification => 0x82,
            ConformityLevel::ExtendedIdentification => 0x83,
        }
    }
}

/// Identifier of a single device ID object.
///
/// Each object represents a specific type of information (e.g., vendor name, product code).
pub type ObjectId = u8;

/// Indicates whether more identification objects follow in the response.
pub type MoreFollows = bool;

/// Specifies the ID of the next object to be requested in case of partial data.
///
/// Used when `MoreFollows` is `true`, should be 0 otherwise.
pub type NextObjectId = u8;

/// A vector of device identification objects ([`DeviceIdObject`]).
pub type DeviceIdObjects = Vec<DeviceIdObject>;

/// Represents a single Modbus device identification object.
///
/// The value is stored as raw bytes and may be interpreted as a UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdObject {
    /// Object identifier (0x00 to 0xFF), as defined by the Modbus specification.
    ///
    /// Common IDs include:
    /// - 0x00: `VendorName`
    /// - 0x01: `ProductCode`
    /// - 0x02: `MajorMinorRevision`
    pub id: ObjectId,

    /// Raw byte value associated with this object.
    pub value: Bytes,
}

impl DeviceIdObject {
    /// Attempts to interpret the object's value as a UTF-8 string.
    pub fn value_as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }
}

/// Response data returned from a Modbus "Read Device Identification" request (0x2B/0x0E).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadDeviceIdentificationResponse {
    /// Indicates the type of Read Device Identification request that was performed.
    pub read_code: ReadCode,
    /// Indicates the level of conformity supported by the device for identification.
    pub conformity_level: ConformityLevel,
    /// Signals whether additional identification objects are available.
    pub more_follows: MoreFollows,
    /// Specifies the next object ID to request if `more_follows` is true.
    pub next_object_id: NextObjectId,
    /// The list of device ID objects returned in this response.
    pub device_id_objects: DeviceIdObjects,
}

/// A server (slave) exception response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionResponse {
    pub function: FunctionCode,
    pub exception: ExceptionCode,
}

/// Represents a message from the client (master) to the server (slave).
#[derive(Debug, Clone)]
pub(crate) struct RequestPdu<'a>(pub(crate) Request<'a>);

impl<'a> From<Request<'a>> for RequestPdu<'a> {
    fn from(from: Request<'a>) -> Self {
        RequestPdu(from)
    }
}

impl<'a> From<RequestPdu<'a>> for Request<'a> {
    fn from(from: RequestPdu<'a>) -> Self {
        from.0
    }
}

/// Represents a message from the server (slave) to the client (master).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResponsePdu(pub(crate) Result<Response, ExceptionResponse>);

impl From<Response> for ResponsePdu {
    fn from(from: Response) -> Self {
        ResponsePdu(Ok(from))
    }
}

impl From<ExceptionResponse> for ResponsePdu {
    fn from(from: ExceptionResponse) -> Self {
        ResponsePdu(Err(from))
    }
}

impl From<ResponsePdu> for Result<Response, ExceptionResponse> {
    fn from(from: ResponsePdu) -> Self {
        from.0
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "{} (0x{code:02X})", self.description()),
            _ => f.write_str(self.description()),
        }
    }
}

impl error::Error for ExceptionCode {}

impl fmt::Display for ExceptionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Modbus function {}: {}", self.function, self.exception)
    }
}

impl error::Error for ExceptionResponse {}

/// Check that `req_hdr` is the same `Header` as `rsp_hdr`.
///
/// # Errors
///
/// If the 2 headers are different, an error message with the details will be returned.
pub(crate) fn verify_response_header<H: Eq + std::fmt::Debug>(
    req_hdr: &H,
    rsp_hdr: &H,
) -> Result<(), String> {
    if req_hdr != rsp_hdr {
        return Err(format!(
            "expected/request = {req_hdr:?}, actual/response = {rsp_hdr:?}"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_function_code() {
        assert_eq!(FunctionCode::ReadCoils, FunctionCode::new(0x01));
        assert_eq!(FunctionCode::ReadDiscreteInputs, FunctionCode::new(0x02));
        assert_eq!(FunctionCode::ReadExceptionStatus, FunctionCode::new(0x07));
        assert_eq!(FunctionCode::Diagnostics, FunctionCode::new(0x08));
        assert_eq!(FunctionCode::GetCommEventCounter, FunctionCode::new(0x0B));
        assert_eq!(FunctionCode::GetCommEventLog, FunctionCode::new(0x0C));
        assert_eq!(FunctionCode::ReadFileRecord, FunctionCode::new(0x14));
        assert_eq!(FunctionCode::WriteFileRecord, FunctionCode::new(0x15));
        assert_eq!(FunctionCode::ReadFifoQueue, FunctionCode::new(0x18));
        assert_eq!(
            FunctionCode::EncapsulatedInterfaceTransport,
            FunctionCode::new(0x2B)
        );
        assert_eq!(FunctionCode::Custom(70), FunctionCode::new(70));
    }

    #[test]
    fn supported_function_codes_round_trip_their_values() {
        for code in FunctionCode::SUPPORTED {
            assert!(!matches!(code, FunctionCode::Custom(_)));
            assert_eq!(FunctionCode::new(code.value()), code);
            assert!(code.value() < 0x80);
        }
    }

    #[test]
    fn function_code_from_request() {
        use Request::*;

        assert_eq!(ReadCoils(0, 0).function_code(), FunctionCode::ReadCoils);
        assert_eq!(
            ReadExceptionStatus.function_code(),
            FunctionCode::ReadExceptionStatus
        );
        assert_eq!(
            Diagnostics(DiagnosticSubFunction::ReturnQueryData, Cow::Borrowed(&[]))
                .function_code(),
            FunctionCode::Diagnostics
        );
        assert_eq!(
            ReadFileRecord(Cow::Borrowed(&[])).function_code(),
            FunctionCode::ReadFileRecord
        );
        assert_eq!(
            WriteFileRecord(Cow::Borrowed(&[])).function_code(),
            FunctionCode::WriteFileRecord
        );
        assert_eq!(ReadFifoQueue(0).function_code(), FunctionCode::ReadFifoQueue);
        assert_eq!(
            ReadDeviceIdentification(ReadCode::Basic, 0).function_code(),
            FunctionCode::EncapsulatedInterfaceTransport
        );
        assert_eq!(Custom(88, Cow::Borrowed(&[])).function_code().value(), 88);
    }

    #[test]
    fn function_code_from_response() {
        use Response::*;

        assert_eq!(ReadCoils(vec![]).function_code(), FunctionCode::ReadCoils);
        assert_eq!(
            ReadExceptionStatus(0).function_code(),
            FunctionCode::ReadExceptionStatus
        );
        assert_eq!(
            GetCommEventCounter(CommEventCounter {
                busy: false,
                event_count: 0
            })
            .function_code(),
            FunctionCode::GetCommEventCounter
        );
        assert_eq!(
            ReadFifoQueue(vec![]).function_code(),
            FunctionCode::ReadFifoQueue
        );
        assert_eq!(
            Custom(99, Bytes::from_static(&[])).function_code().value(),
            99
        );
    }

    #[test]
    fn diagnostic_sub_functions() {
        for value in [0x00, 0x01, 0x02, 0x03, 0x04, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E] {
            let sub_function = DiagnosticSubFunction::new(value);
            assert!(!matches!(sub_function, DiagnosticSubFunction::Unknown(_)));
            assert_eq!(sub_function.value(), value);
        }
        for value in [0x0F, 0x10, 0x11, 0x12, 0x14] {
            assert_eq!(DiagnosticSubFunction::new(value).value(), value);
        }
        assert_eq!(
            DiagnosticSubFunction::new(0x13),
            DiagnosticSubFunction::Unknown(0x13)
        );
        assert_eq!(DiagnosticSubFunction::Unknown(0x15).value(), 0x15);
    }

    #[test]
    fn only_listen_only_mode_goes_unanswered() {
        let listen_only =
            Request::Diagnostics(DiagnosticSubFunction::ForceListenOnlyMode, Cow::Borrowed(&[]));
        assert!(!listen_only.expects_response());
        assert!(Request::ReadHoldingRegisters(0, 1).expects_response());
        assert!(Request::Diagnostics(
            DiagnosticSubFunction::ClearCountersAndDiagnosticRegister,
            Cow::Borrowed(&[])
        )
        .expects_response());
    }

    #[test]
    fn exception_code_table() {
        assert_eq!(ExceptionCode::new(1).to_string(), "Illegal Function");
        assert_eq!(ExceptionCode::new(2).to_string(), "Illegal Data Address");
        assert_eq!(ExceptionCode::new(3).to_string(), "Illegal Data Value");
        assert_eq!(ExceptionCode::new(4).to_string(), "Slave Device Failure");
        assert_eq!(ExceptionCode::new(5).to_string(), "Acknowledge");
        assert_eq!(ExceptionCode::new(6).to_string(), "Slave Device Busy");
        assert_eq!(ExceptionCode::new(8).to_string(), "Memory Parity Error");
        assert_eq!(ExceptionCode::new(10).to_string(), "Gateway Path Unavailable");
    }

    #[test]
    fn unassigned_exception_codes_are_unknown() {
        assert_eq!(ExceptionCode::new(7), ExceptionCode::Unknown(7));
        assert_eq!(ExceptionCode::new(9), ExceptionCode::Unknown(9));
        assert_eq!(ExceptionCode::new(9).description(), "Unknown exception");
        assert_eq!(
            ExceptionCode::new(7).to_string(),
            "Unknown exception (0x07)"
        );
        assert_eq!(u8::from(ExceptionCode::new(9)), 9);
    }

    #[test]
    fn comm_events() {
        assert_eq!(CommEvent::new(0x00), CommEvent::CommunicationRestart);
        assert_eq!(CommEvent::new(0x04), CommEvent::EnteredListenOnlyMode);
        assert_eq!(
            CommEvent::new(0b1100_0010),
            CommEvent::Received {
                broadcast: true,
                listen_only: false,
                character_overrun: false,
                communication_error: true,
            }
        );
        assert_eq!(
            CommEvent::new(0b0101_0001),
            CommEvent::Sent {
                listen_only: false,
                read_timeout: true,
                nak_exception: false,
                busy_exception: false,
                abort_exception: false,
                read_exception: true,
            }
        );
    }

    #[test]
    fn device_id_object_as_str() {
        let object = DeviceIdObject {
            id: 0x00,
            value: Bytes::from_static(b"slowtec"),
        };
        assert_eq!(object.value_as_str(), Some("slowtec"));

        let object = DeviceIdObject {
            id: 0x01,
            value: Bytes::from_static(&[0xFF, 0xFE]),
        };
        assert_eq!(object.value_as_str(), None);
    }
}
