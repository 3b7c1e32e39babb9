// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus clients

use std::{borrow::Cow, fmt::Debug, io, time::Duration};

use async_trait::async_trait;

use crate::{
    bytes::Bytes,
    config::{ChecksumPolicy, Config, Mode, Parity, SessionContext},
    frame::*,
    master::Reply,
    slave::*,
    Error, ProtocolError, Result,
};

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(feature = "sync")]
pub mod sync;

/// Upper bound of "Read Device Identification" requests for
/// collecting all objects.
pub const MAX_DEVICE_IDENTIFICATION_PAGES: usize = 64;

/// Transport independent asynchronous client trait
#[async_trait]
pub trait Client: SlaveContext + SessionContext + Send + Debug {
    /// Invokes a _Modbus_ function.
    async fn call(&mut self, request: Request<'_>) -> Result<Response>;

    /// Invokes a _Modbus_ function and also reports whether the checksum
    /// of the response frame matched.
    async fn exchange(&mut self, request: Request<'_>) -> std::result::Result<Reply, Error>;

    /// Disconnects the client.
    ///
    /// Permanently disconnects the client by shutting down the
    /// underlying stream. All subsequent calls fail.
    async fn disconnect(&mut self) -> io::Result<()>;
}

/// Asynchronous _Modbus_ reader
#[async_trait]
pub trait Reader: Client {
    /// Read multiple coils (0x01)
    async fn read_coils(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>>;

    /// Read multiple discrete inputs (0x02)
    async fn read_discrete_inputs(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>>;

    /// Read multiple holding registers (0x03)
    async fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;

    /// Read multiple input registers (0x04)
    async fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;

    /// Read and write multiple holding registers (0x17)
    ///
    /// The write operation is performed before the read unlike
    /// the name of the operation might suggest!
    async fn read_write_multiple_registers(
        &mut self,
        read_addr: Address,
        read_count: Quantity,
        write_addr: Address,
        write_data: &[Word],
    ) -> Result<Vec<Word>>;

    /// Read groups of file records (0x14)
    ///
    /// Returns the registers of each group in request order.
    async fn read_file_record(
        &mut self,
        requests: &[FileRecordRequest],
    ) -> Result<Vec<Vec<Word>>>;

    /// Read the contents of a FIFO queue of registers (0x18)
    async fn read_fifo_queue(&mut self, addr: Address) -> Result<Vec<Word>>;

    /// Read device identification (0x2B/0x0E)
    ///
    /// Starting at `object_id` the request is repeated as long as the
    /// device indicates that more objects follow. The returned response
    /// contains the objects of all pages in the order of their arrival.
    async fn read_device_identification(
        &mut self,
        read_code: ReadCode,
        object_id: ObjectId,
    ) -> Result<ReadDeviceIdentificationResponse>;
}

/// Asynchronous Modbus writer
#[async_trait]
pub trait Writer: Client {
    /// Write a single coil (0x05)
    async fn write_single_coil(&mut self, addr: Address, coil: Coil) -> Result<()>;

    /// Write a single holding register (0x06)
    async fn write_single_register(&mut self, addr: Address, word: Word) -> Result<()>;

    /// Write multiple coils (0x0F)
    async fn write_multiple_coils(&mut self, addr: Address, coils: &'_ [Coil]) -> Result<()>;

    /// Write multiple holding registers (0x10)
    async fn write_multiple_registers(&mut self, addr: Address, words: &[Word]) -> Result<()>;

    /// Write groups of file records (0x15)
    async fn write_file_record(&mut self, records: &[FileRecord]) -> Result<()>;

    /// Set or clear individual bits of a holding register (0x16)
    async fn masked_write_register(
        &mut self,
        addr: Address,
        and_mask: Word,
        or_mask: Word,
    ) -> Result<()>;
}

/// Functions that are only available on a serial line.
#[async_trait]
pub trait SerialLine: Client {
    /// Read the eight exception status outputs (0x07)
    ///
    /// The first output is the least significant bit.
    async fn read_exception_status(&mut self) -> Result<[bool; 8]>;

    /// Diagnostics (0x08) with an arbitrary sub-function
    ///
    /// Returns the data of the response.
    async fn diagnostics(
        &mut self,
        sub_function: DiagnosticSubFunction,
        data: &[u8],
    ) -> Result<Bytes>;

    /// Echo the given data (0x08/0x00)
    async fn return_query_data(&mut self, data: &[u8]) -> Result<Bytes>;

    /// Restart the serial line port of the device (0x08/0x01)
    ///
    /// Also leaves listen only mode.
    async fn restart_communications(&mut self, clear_event_log: bool) -> Result<()>;

    /// Read the diagnostic register (0x08/0x02)
    async fn return_diagnostic_register(&mut self) -> Result<Word>;

    /// Replace the end of message character of ASCII frames (0x08/0x03)
    async fn change_ascii_input_delimiter(&mut self, delimiter: u8) -> Result<()>;

    /// Switch the device into listen only mode (0x08/0x04)
    ///
    /// The device does not respond to this request and nothing
    /// is received.
    async fn force_listen_only_mode(&mut self) -> Result<()>;

    /// Reset all counters and the diagnostic register (0x08/0x0A)
    async fn clear_counters_and_diagnostic_register(&mut self) -> Result<()>;

    /// Number of messages on the bus (0x08/0x0B)
    async fn return_bus_message_count(&mut self) -> Result<Word>;

    /// Number of checksum errors on the bus (0x08/0x0C)
    async fn return_bus_communication_error_count(&mut self) -> Result<Word>;

    /// Number of exception responses sent by the device (0x08/0x0D)
    async fn return_bus_exception_error_count(&mut self) -> Result<Word>;

    /// Number of messages addressed to the device (0x08/0x0E)
    async fn return_server_message_count(&mut self) -> Result<Word>;

    /// Number of messages the device did not respond to (0x08/0x0F)
    async fn return_server_no_response_count(&mut self) -> Result<Word>;

    /// Number of NAK exception responses (0x08/0x10)
    async fn return_server_nak_count(&mut self) -> Result<Word>;

    /// Number of "Server Device Busy" exception responses (0x08/0x11)
    async fn return_server_busy_count(&mut self) -> Result<Word>;

    /// Number of character overruns (0x08/0x12)
    async fn return_bus_character_overrun_count(&mut self) -> Result<Word>;

    /// Reset the overrun counter and error flag (0x08/0x14)
    async fn clear_overrun_counter_and_flag(&mut self) -> Result<()>;

    /// Get the communication event counter (0x0B)
    async fn get_comm_event_counter(&mut self) -> Result<CommEventCounter>;

    /// Get the communication event log (0x0C)
    async fn get_comm_event_log(&mut self) -> Result<CommEventLog>;

    /// Report the server id and run indicator status (0x11)
    ///
    /// Returns the server id, the run indicator and any additional
    /// device specific data.
    async fn report_server_id(&mut self) -> Result<(u8, bool, Vec<u8>)>;

    /// CANopen general reference (0x2B/0x0D)
    ///
    /// Not supported. Fails with [`Error::Unimplemented`] without
    /// transmitting anything.
    async fn canopen_general_reference(&mut self, data: &[u8]) -> Result<Bytes>;
}

/// Asynchronous Modbus client context
#[derive(Debug)]
pub struct Context {
    client: Box<dyn Client>,
}

impl From<Box<dyn Client>> for Context {
    fn from(client: Box<dyn Client>) -> Self {
        Self { client }
    }
}

impl From<Context> for Box<dyn Client> {
    fn from(val: Context) -> Self {
        val.client
    }
}

impl Context {
    async fn diagnostics_word(
        &mut self,
        sub_function: DiagnosticSubFunction,
        word: Word,
    ) -> Result<Word> {
        let data = match self.diagnostics(sub_function, &word.to_be_bytes()).await? {
            Ok(data) => data,
            Err(exception) => return Ok(Err(exception)),
        };
        match data[..] {
            [hi, lo] => Ok(Ok(u16::from_be_bytes([hi, lo]))),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "unexpected data length of diagnostics response: {}",
                    data.len()
                ),
            )
            .into()),
        }
    }
}

fn unexpected_quantity(what: &str, requested: usize, received: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("requested {requested} {what}, but received {received}"),
    )
}

/// Drops the padding bits of the last byte.
fn requested_coils(mut coils: Vec<Coil>, cnt: Quantity) -> io::Result<Vec<Coil>> {
    let cnt = usize::from(cnt);
    if coils.len() < cnt {
        return Err(unexpected_quantity("coils", cnt, coils.len()));
    }
    coils.truncate(cnt);
    Ok(coils)
}

fn requested_words(words: Vec<Word>, cnt: Quantity) -> io::Result<Vec<Word>> {
    let cnt = usize::from(cnt);
    if words.len() != cnt {
        return Err(unexpected_quantity("registers", cnt, words.len()));
    }
    Ok(words)
}

#[async_trait]
impl Client for Context {
    async fn call(&mut self, request: Request<'_>) -> Result<Response> {
        self.client.call(request).await
    }

    async fn exchange(&mut self, request: Request<'_>) -> std::result::Result<Reply, Error> {
        self.client.exchange(request).await
    }

    async fn disconnect(&mut self) -> io::Result<()> {
        self.client.disconnect().await
    }
}

impl SlaveContext for Context {
    fn set_slave(&mut self, slave: Slave) {
        self.client.set_slave(slave);
    }
}

impl SessionContext for Context {
    fn config(&self) -> &Config {
        self.client.config()
    }

    fn set_mode(&mut self, mode: Mode) {
        self.client.set_mode(mode);
    }

    fn set_parity(&mut self, parity: Parity) {
        self.client.set_parity(parity);
    }

    fn set_verbose(&mut self, verbose: bool) {
        self.client.set_verbose(verbose);
    }

    fn set_debug(&mut self, debug: bool) {
        self.client.set_debug(debug);
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.client.set_timeout(timeout);
    }

    fn set_checksum_policy(&mut self, checksum_policy: ChecksumPolicy) {
        self.client.set_checksum_policy(checksum_policy);
    }
}

#[async_trait]
impl Reader for Context {
    async fn read_coils<'a>(&'a mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        let coils = match self.client.call(Request::ReadCoils(addr, cnt)).await? {
            Ok(Response::ReadCoils(coils)) => coils,
            Ok(_) => unreachable!("call() should reject mismatching responses"),
            Err(exception) => return Ok(Err(exception)),
        };
        Ok(Ok(requested_coils(coils, cnt)?))
    }

    async fn read_discrete_inputs<'a>(
        &'a mut self,
        addr: Address,
        cnt: Quantity,
    ) -> Result<Vec<Coil>> {
        let coils = match self.client.call(Request::ReadDiscreteInputs(addr, cnt)).await? {
            Ok(Response::ReadDiscreteInputs(coils)) => coils,
            Ok(_) => unreachable!("call() should reject mismatching responses"),
            Err(exception) => return Ok(Err(exception)),
        };
        Ok(Ok(requested_coils(coils, cnt)?))
    }

    async fn read_input_registers<'a>(
        &'a mut self,
        addr: Address,
        cnt: Quantity,
    ) -> Result<Vec<Word>> {
        let words = match self.client.call(Request::ReadInputRegisters(addr, cnt)).await? {
            Ok(Response::ReadInputRegisters(words)) => words,
            Ok(_) => unreachable!("call() should reject mismatching responses"),
            Err(exception) => return Ok(Err(exception)),
        };
        Ok(Ok(requested_words(words, cnt)?))
    }

    async fn read_holding_registers<'a>(
        &'a mut self,
        addr: Address,
        cnt: Quantity,
    ) -> Result<Vec<Word>> {
        let words = match self.client.call(Request::ReadHoldingRegisters(addr, cnt)).await? {
            Ok(Response::ReadHoldingRegisters(words)) => words,
            Ok(_) => unreachable!("call() should reject mismatching responses"),
            Err(exception) => return Ok(Err(exception)),
        };
        Ok(Ok(requested_words(words, cnt)?))
    }

    async fn read_write_multiple_registers<'a>(
        &'a mut self,
        read_addr: Address,
        read_count: Quantity,
        write_addr: Address,
        write_data: &[Word],
    ) -> Result<Vec<Word>> {
        let words = match self
            .client
            .call(Request::ReadWriteMultipleRegisters(
                read_addr,
                read_count,
                write_addr,
                Cow::Borrowed(write_data),
            ))
            .await?
        {
            Ok(Response::ReadWriteMultipleRegisters(words)) => words,
            Ok(_) => unreachable!("call() should reject mismatching responses"),
            Err(exception) => return Ok(Err(exception)),
        };
        Ok(Ok(requested_words(words, read_count)?))
    }

    async fn read_file_record<'a>(
        &'a mut self,
        requests: &[FileRecordRequest],
    ) -> Result<Vec<Vec<Word>>> {
        let groups = match self
            .client
            .call(Request::ReadFileRecord(Cow::Borrowed(requests)))
            .await?
        {
            Ok(Response::ReadFileRecord(groups)) => groups,
            Ok(_) => unreachable!("call() should reject mismatching responses"),
            Err(exception) => return Ok(Err(exception)),
        };
        if groups.len() != requests.len() {
            return Err(unexpected_quantity("file records", requests.len(), groups.len()).into());
        }
        Ok(Ok(groups))
    }

    async fn read_fifo_queue<'a>(&'a mut self, addr: Address) -> Result<Vec<Word>> {
        self.client
            .call(Request::ReadFifoQueue(addr))
            .await
            .map(|result| {
                result.map(|response| match response {
                    Response::ReadFifoQueue(words) => words,
                    _ => unreachable!("call() should reject mismatching responses"),
                })
            })
    }

    async fn read_device_identification<'a>(
        &'a mut self,
        read_code: ReadCode,
        object_id: ObjectId,
    ) -> Result<ReadDeviceIdentificationResponse> {
        let mut device_id_objects = Vec::new();
        let mut object_id = object_id;
        for _ in 0..MAX_DEVICE_IDENTIFICATION_PAGES {
            let page = match self
                .client
                .call(Request::ReadDeviceIdentification(read_code, object_id))
                .await?
            {
                Ok(Response::ReadDeviceIdentification(page)) => page,
                Ok(_) => unreachable!("call() should reject mismatching responses"),
                Err(exception) => return Ok(Err(exception)),
            };
            let ReadDeviceIdentificationResponse {
                read_code: rsp_read_code,
                conformity_level,
                more_follows,
                next_object_id,
                device_id_objects: objects,
            } = page;
            device_id_objects.extend(objects);
            if !more_follows {
                return Ok(Ok(ReadDeviceIdentificationResponse {
                    read_code: rsp_read_code,
                    conformity_level,
                    more_follows,
                    next_object_id,
                    device_id_objects,
                }));
            }
            log::debug!("More device identification objects follow, next = 0x{next_object_id:02X}");
            object_id = next_object_id;
        }
        Err(ProtocolError::TooManyPages {
            pages: MAX_DEVICE_IDENTIFICATION_PAGES,
        }
        .into())
    }
}

#[async_trait]
impl Writer for Context {
    async fn write_single_coil<'a>(&'a mut self, addr: Address, coil: Coil) -> Result<()> {
        self.client
            .call(Request::WriteSingleCoil(addr, coil))
            .await
            .map(|result| {
                result.map(|response| match response {
                    Response::WriteSingleCoil(rsp_addr, rsp_coil) => {
                        debug_assert_eq!(addr, rsp_addr);
                        debug_assert_eq!(coil, rsp_coil);
                    }
                    _ => unreachable!("call() should reject mismatching responses"),
                })
            })
    }

    async fn write_multiple_coils<'a>(&'a mut self, addr: Address, coils: &[Coil]) -> Result<()> {
        let cnt = coils.len();
        self.client
            .call(Request::WriteMultipleCoils(addr, Cow::Borrowed(coils)))
            .await
            .map(|result| {
                result.map(|response| match response {
                    Response::WriteMultipleCoils(rsp_addr, rsp_cnt) => {
                        debug_assert_eq!(addr, rsp_addr);
                        debug_assert_eq!(cnt, rsp_cnt.into());
                    }
                    _ => unreachable!("call() should reject mismatching responses"),
                })
            })
    }

    async fn write_single_register<'a>(&'a mut self, addr: Address, word: Word) -> Result<()> {
        self.client
            .call(Request::WriteSingleRegister(addr, word))
            .await
            .map(|result| {
                result.map(|response| match response {
                    Response::WriteSingleRegister(rsp_addr, rsp_word) => {
                        debug_assert_eq!(addr, rsp_addr);
                        debug_assert_eq!(word, rsp_word);
                    }
                    _ => unreachable!("call() should reject mismatching responses"),
                })
            })
    }

    async fn write_multiple_registers<'a>(
        &'a mut self,
        addr: Address,
        data: &[Word],
    ) -> Result<()> {
        let cnt = data.len();
        self.client
            .call(Request::WriteMultipleRegisters(addr, Cow::Borrowed(data)))
            .await
            .map(|result| {
                result.map(|response| match response {
                    Response::WriteMultipleRegisters(rsp_addr, rsp_cnt) => {
                        debug_assert_eq!(addr, rsp_addr);
                        debug_assert_eq!(cnt, rsp_cnt.into());
                    }
                    _ => unreachable!("call() should reject mismatching responses"),
                })
            })
    }

    async fn write_file_record<'a>(&'a mut self, records: &[FileRecord]) -> Result<()> {
        self.client
            .call(Request::WriteFileRecord(Cow::Borrowed(records)))
            .await
            .map(|result| {
                result.map(|response| match response {
                    Response::WriteFileRecord(rsp_records) => {
                        debug_assert_eq!(records, &rsp_records[..]);
                    }
                    _ => unreachable!("call() should reject mismatching responses"),
                })
            })
    }

    async fn masked_write_register<'a>(
        &'a mut self,
        addr: Address,
        and_mask: Word,
        or_mask: Word,
    ) -> Result<()> {
        self.client
            .call(Request::MaskWriteRegister(addr, and_mask, or_mask))
            .await
            .map(|result| {
                result.map(|response| match response {
                    Response::MaskWriteRegister(rsp_addr, rsp_and_mask, rsp_or_mask) => {
                        debug_assert_eq!(addr, rsp_addr);
                        debug_assert_eq!(and_mask, rsp_and_mask);
                        debug_assert_eq!(or_mask, rsp_or_mask);
                    }
                    _ => unreachable!("call() should reject mismatching responses"),
                })
            })
    }
}

#[async_trait]
impl SerialLine for Context {
    async fn read_exception_status<'a>(&'a mut self) -> Result<[bool; 8]> {
        self.client
            .call(Request::ReadExceptionStatus)
            .await
            .map(|result| {
                result.map(|response| match response {
                    Response::ReadExceptionStatus(status) => {
                        let mut outputs = [false; 8];
                        for (i, output) in outputs.iter_mut().enumerate() {
                            *output = (status >> i) & 0b1 != 0;
                        }
                        outputs
                    }
                    _ => unreachable!("call() should reject mismatching responses"),
                })
            })
    }

    async fn diagnostics<'a>(
        &'a mut self,
        sub_function: DiagnosticSubFunction,
        data: &[u8],
    ) -> Result<Bytes> {
        self.client
            .call(Request::Diagnostics(sub_function, Cow::Borrowed(data)))
            .await
            .map(|result| {
                result.map(|response| match response {
                    Response::Diagnostics(rsp_sub_function, rsp_data) => {
                        debug_assert_eq!(sub_function, rsp_sub_function);
                        rsp_data
                    }
                    _ => unreachable!("call() should reject mismatching responses"),
                })
            })
    }

    async fn return_query_data<'a>(&'a mut self, data: &[u8]) -> Result<Bytes> {
        self.diagnostics(DiagnosticSubFunction::ReturnQueryData, data)
            .await
    }

    async fn restart_communications<'a>(&'a mut self, clear_event_log: bool) -> Result<()> {
        let word = if clear_event_log { 0xFF00 } else { 0x0000 };
        self.diagnostics_word(DiagnosticSubFunction::RestartCommunications, word)
            .await
            .map(|result| result.map(|_| ()))
    }

    async fn return_diagnostic_register<'a>(&'a mut self) -> Result<Word> {
        self.diagnostics_word(DiagnosticSubFunction::ReturnDiagnosticRegister, 0x0000)
            .await
    }

    async fn change_ascii_input_delimiter<'a>(&'a mut self, delimiter: u8) -> Result<()> {
        self.diagnostics_word(
            DiagnosticSubFunction::ChangeAsciiInputDelimiter,
            u16::from_be_bytes([delimiter, 0x00]),
        )
        .await
        .map(|result| result.map(|_| ()))
    }

    async fn force_listen_only_mode<'a>(&'a mut self) -> Result<()> {
        self.diagnostics(DiagnosticSubFunction::ForceListenOnlyMode, &[0x00, 0x00])
            .await
            .map(|result| result.map(|_| ()))
    }

    async fn clear_counters_and_diagnostic_register<'a>(&'a mut self) -> Result<()> {
        self.diagnostics_word(
            DiagnosticSubFunction::ClearCountersAndDiagnosticRegister,
            0x0000,
        )
        .await
        .map(|result| result.map(|_| ()))
    }

    async fn return_bus_message_count<'a>(&'a mut self) -> Result<Word> {
        self.diagnostics_word(DiagnosticSubFunction::ReturnBusMessageCount, 0x0000)
            .await
    }

    async fn return_bus_communication_error_count<'a>(&'a mut self) -> Result<Word> {
        self.diagnostics_word(
            DiagnosticSubFunction::ReturnBusCommunicationErrorCount,
            0x0000,
        )
        .await
    }

    async fn return_bus_exception_error_count<'a>(&'a mut self) -> Result<Word> {
        self.diagnostics_word(DiagnosticSubFunction::ReturnBusExceptionErrorCount, 0x0000)
            .await
    }

    async fn return_server_message_count<'a>(&'a mut self) -> Result<Word> {
        self.diagnostics_word(DiagnosticSubFunction::ReturnServerMessageCount, 0x0000)
            .await
    }

    async fn return_server_no_response_count<'a>(&'a mut self) -> Result<Word> {
        self.diagnostics_word(DiagnosticSubFunction::ReturnServerNoResponseCount, 0x0000)
            .await
    }

    async fn return_server_nak_count<'a>(&'a mut self) -> Result<Word> {
        self.diagnostics_word(DiagnosticSubFunction::ReturnServerNakCount, 0x0000)
            .await
    }

    async fn return_server_busy_count<'a>(&'a mut self) -> Result<Word> {
        self.diagnostics_word(DiagnosticSubFunction::ReturnServerBusyCount, 0x0000)
            .await
    }

    async fn return_bus_character_overrun_count<'a>(&'a mut self) -> Result<Word> {
        self.diagnostics_word(
            DiagnosticSubFunction::ReturnBusCharacterOverrunCount,
            0x0000,
        )
        .await
    }

    async fn clear_overrun_counter_and_flag<'a>(&'a mut self) -> Result<()> {
        self.diagnostics_word(DiagnosticSubFunction::ClearOverrunCounterAndFlag, 0x0000)
            .await
            .map(|result| result.map(|_| ()))
    }

    async fn get_comm_event_counter<'a>(&'a mut self) -> Result<CommEventCounter> {
        self.client
            .call(Request::GetCommEventCounter)
            .await
            .map(|result| {
                result.map(|response| match response {
                    Response::GetCommEventCounter(counter) => counter,
                    _ => unreachable!("call() should reject mismatching responses"),
                })
            })
    }

    async fn get_comm_event_log<'a>(&'a mut self) -> Result<CommEventLog> {
        self.client
            .call(Request::GetCommEventLog)
            .await
            .map(|result| {
                result.map(|response| match response {
                    Response::GetCommEventLog(log) => log,
                    _ => unreachable!("call() should reject mismatching responses"),
                })
            })
    }

    async fn report_server_id<'a>(&'a mut self) -> Result<(u8, bool, Vec<u8>)> {
        self.client
            .call(Request::ReportServerId)
            .await
            .map(|result| {
                result.map(|response| match response {
                    Response::ReportServerId(server_id, run_indication, data) => {
                        (server_id, run_indication, data)
                    }
                    _ => unreachable!("call() should reject mismatching responses"),
                })
            })
    }

    async fn canopen_general_reference<'a>(&'a mut self, _data: &[u8]) -> Result<Bytes> {
        log::warn!("CANopen general reference is not implemented");
        Err(Error::Unimplemented("CANopen general reference (0x2B/0x0D)"))
    }
}

#[cfg(test)]
mod tests {
    use crate::{ChecksumStatus, Error, ExceptionCode, Result};

    use super::*;
    use std::{collections::VecDeque, io, sync::Mutex};

    #[derive(Default, Debug)]
    pub(crate) struct ClientMock {
        slave: Option<Slave>,
        config: Config,
        requests: Mutex<Vec<Request<'static>>>,
        next_responses: VecDeque<Result<Response>>,
    }

    #[allow(dead_code)]
    impl ClientMock {
        pub(crate) fn slave(&self) -> Option<Slave> {
            self.slave
        }

        pub(crate) fn requests(&self) -> &Mutex<Vec<Request<'static>>> {
            &self.requests
        }

        pub(crate) fn push_next_response(&mut self, next_response: Result<Response>) {
            self.next_responses.push_back(next_response);
        }
    }

    #[async_trait]
    impl Client for ClientMock {
        async fn call(&mut self, request: Request<'_>) -> Result<Response> {
            self.requests.lock().unwrap().push(request.into_owned());
            match self.next_responses.pop_front().unwrap() {
                Ok(response) => Ok(response),
                Err(Error::Transport(err)) => {
                    Err(io::Error::new(err.kind(), format!("{err}")).into())
                }
                Err(err) => Err(err),
            }
        }

        async fn exchange(
            &mut self,
            request: Request<'_>,
        ) -> std::result::Result<Reply, Error> {
            let slave = self.slave.unwrap_or(Slave::broadcast());
            let response = self.call(request).await?;
            Ok(Reply {
                slave,
                checksum: ChecksumStatus::Valid,
                response,
            })
        }

        async fn disconnect(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SlaveContext for ClientMock {
        fn set_slave(&mut self, slave: Slave) {
            self.slave = Some(slave);
        }
    }

    impl SessionContext for ClientMock {
        fn config(&self) -> &Config {
            &self.config
        }

        fn set_mode(&mut self, mode: Mode) {
            self.config.mode = mode;
        }

        fn set_parity(&mut self, parity: Parity) {
            self.config.parity = parity;
        }

        fn set_verbose(&mut self, verbose: bool) {
            self.config.verbose = verbose;
        }

        fn set_debug(&mut self, debug: bool) {
            self.config.debug = debug;
        }

        fn set_timeout(&mut self, timeout: Option<Duration>) {
            self.config.timeout = timeout;
        }

        fn set_checksum_policy(&mut self, checksum_policy: ChecksumPolicy) {
            self.config.checksum_policy = checksum_policy;
        }
    }

    fn context_with_responses(responses: Vec<Result<Response>>) -> Context {
        let mut client = Box::<ClientMock>::default();
        for response in responses {
            client.push_next_response(response);
        }
        Context { client }
    }

    fn device_id_page(
        more_follows: bool,
        next_object_id: ObjectId,
        objects: &[(ObjectId, &'static [u8])],
    ) -> Response {
        Response::ReadDeviceIdentification(ReadDeviceIdentificationResponse {
            read_code: ReadCode::Regular,
            conformity_level: ConformityLevel::RegularIdentification,
            more_follows,
            next_object_id,
            device_id_objects: objects
                .iter()
                .map(|(id, value)| DeviceIdObject {
                    id: *id,
                    value: Bytes::from_static(value),
                })
                .collect(),
        })
    }

    #[test]
    fn read_some_coils() {
        // The protocol will always return entire bytes with, i.e.
        // a multiple of 8 coils.
        let response_coils = [true, false, false, true, false, true, false, true];
        for num_coils in 1..8 {
            let mut context =
                context_with_responses(vec![Ok(Ok(Response::ReadCoils(response_coils.to_vec())))]);
            context.set_slave(Slave(1));
            let coils = futures::executor::block_on(context.read_coils(1, num_coils))
                .unwrap()
                .unwrap();
            assert_eq!(&response_coils[0..num_coils as usize], &coils[..]);
        }
    }

    #[test]
    fn read_ten_coils_discards_padding() {
        let response_coils = crate::codec::decode_packed_coils(&[0b1011_0101, 0b0000_0010], 16);
        let mut context =
            context_with_responses(vec![Ok(Ok(Response::ReadCoils(response_coils)))]);
        let coils = futures::executor::block_on(context.read_coils(0x13, 10))
            .unwrap()
            .unwrap();
        assert_eq!(
            coils,
            [true, false, true, false, true, true, false, true, false, true]
        );
    }

    #[test]
    fn read_some_discrete_inputs() {
        // The protocol will always return entire bytes with, i.e.
        // a multiple of 8 coils.
        let response_inputs = [true, false, false, true, false, true, false, true];
        for num_inputs in 1..8 {
            let mut context = context_with_responses(vec![Ok(Ok(Response::ReadDiscreteInputs(
                response_inputs.to_vec(),
            )))]);
            context.set_slave(Slave(1));
            let inputs = futures::executor::block_on(context.read_discrete_inputs(1, num_inputs))
                .unwrap()
                .unwrap();
            assert_eq!(&response_inputs[0..num_inputs as usize], &inputs[..]);
        }
    }

    #[test]
    fn exception_yields_no_result() {
        let mut context =
            context_with_responses(vec![Ok(Err(ExceptionCode::IllegalDataAddress))]);
        let res = futures::executor::block_on(context.read_holding_registers(0x1000, 2)).unwrap();
        assert_eq!(res, Err(ExceptionCode::IllegalDataAddress));
    }

    #[test]
    fn read_exception_status_outputs() {
        let mut context = context_with_responses(vec![Ok(Ok(Response::ReadExceptionStatus(
            0b0110_1101,
        )))]);
        let outputs = futures::executor::block_on(context.read_exception_status())
            .unwrap()
            .unwrap();
        assert_eq!(
            outputs,
            [true, false, true, true, false, true, true, false]
        );
    }

    #[test]
    fn device_identification_pages_are_accumulated() {
        let mut context = context_with_responses(vec![
            Ok(Ok(device_id_page(true, 0x02, &[(0x00, b"ACME"), (0x01, b"M1")]))),
            Ok(Ok(device_id_page(false, 0x00, &[(0x02, b"V1.0")]))),
        ]);
        let rsp = futures::executor::block_on(
            context.read_device_identification(ReadCode::Regular, 0x00),
        )
        .unwrap()
        .unwrap();
        assert!(!rsp.more_follows);
        let ids: Vec<_> = rsp.device_id_objects.iter().map(|obj| obj.id).collect();
        assert_eq!(ids, [0x00, 0x01, 0x02]);
        assert_eq!(rsp.device_id_objects[2].value_as_str(), Some("V1.0"));

        let Context { client } = context;
        let client = format!("{client:?}");
        assert!(client.contains("ReadDeviceIdentification(Regular, 0)"));
        assert!(client.contains("ReadDeviceIdentification(Regular, 2)"));
    }

    #[test]
    fn device_identification_exception_on_second_page() {
        let mut context = context_with_responses(vec![
            Ok(Ok(device_id_page(true, 0x02, &[(0x00, b"ACME")]))),
            Ok(Err(ExceptionCode::IllegalDataAddress)),
        ]);
        let res = futures::executor::block_on(
            context.read_device_identification(ReadCode::Regular, 0x00),
        )
        .unwrap();
        assert_eq!(res, Err(ExceptionCode::IllegalDataAddress));
    }

    #[test]
    fn endless_device_identification_is_aborted() {
        let pages = (0..MAX_DEVICE_IDENTIFICATION_PAGES)
            .map(|_| Ok(Ok(device_id_page(true, 0x01, &[(0x00, b"ACME")]))))
            .collect();
        let mut context = context_with_responses(pages);
        let err = futures::executor::block_on(
            context.read_device_identification(ReadCode::Basic, 0x00),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::TooManyPages {
                pages: MAX_DEVICE_IDENTIFICATION_PAGES
            })
        ));
    }

    #[test]
    fn diagnostics_counter() {
        let mut context = context_with_responses(vec![Ok(Ok(Response::Diagnostics(
            DiagnosticSubFunction::ReturnBusMessageCount,
            Bytes::from_static(&[0x01, 0x2C]),
        )))]);
        let count = futures::executor::block_on(context.return_bus_message_count())
            .unwrap()
            .unwrap();
        assert_eq!(count, 300);
    }

    #[test]
    fn diagnostics_counter_with_unexpected_length() {
        let mut context = context_with_responses(vec![Ok(Ok(Response::Diagnostics(
            DiagnosticSubFunction::ReturnServerBusyCount,
            Bytes::from_static(&[0x01]),
        )))]);
        let err = futures::executor::block_on(context.return_server_busy_count()).unwrap_err();
        assert!(matches!(err, Error::Transport(err) if err.kind() == io::ErrorKind::InvalidData));
    }

    #[test]
    fn restart_communications_clears_event_log() {
        let mut client = Box::<ClientMock>::default();
        client.push_next_response(Ok(Ok(Response::Diagnostics(
            DiagnosticSubFunction::RestartCommunications,
            Bytes::from_static(&[0xFF, 0x00]),
        ))));
        let mut context = Context { client };
        futures::executor::block_on(context.restart_communications(true))
            .unwrap()
            .unwrap();
        let Context { client } = context;
        assert!(format!("{client:?}").contains("Diagnostics(RestartCommunications, [255, 0])"));
    }

    #[test]
    fn canopen_is_not_implemented() {
        let mut context = context_with_responses(vec![]);
        let err = futures::executor::block_on(context.canopen_general_reference(&[0x01]))
            .unwrap_err();
        assert!(matches!(err, Error::Unimplemented(_)));
    }

    #[test]
    fn read_coils_with_short_response() {
        let mut context = context_with_responses(vec![Ok(Ok(Response::ReadCoils(vec![true; 8])))]);
        let err = futures::executor::block_on(context.read_coils(0, 10)).unwrap_err();
        assert!(matches!(err, Error::Transport(err) if err.kind() == io::ErrorKind::InvalidData));
    }

    #[test]
    fn read_registers_with_wrong_quantity() {
        let mut context = context_with_responses(vec![
            Ok(Ok(Response::ReadHoldingRegisters(vec![0x0001]))),
            Ok(Ok(Response::ReadInputRegisters(vec![0x0001, 0x0002, 0x0003]))),
        ]);
        let err = futures::executor::block_on(context.read_holding_registers(0, 2)).unwrap_err();
        assert!(matches!(err, Error::Transport(err) if err.kind() == io::ErrorKind::InvalidData));
        let err = futures::executor::block_on(context.read_input_registers(0, 2)).unwrap_err();
        assert!(matches!(err, Error::Transport(err) if err.kind() == io::ErrorKind::InvalidData));
    }

    #[test]
    fn session_settings_reach_the_client() {
        let mut context = context_with_responses(vec![Ok(Ok(Response::WriteSingleCoil(
            0x0001, true,
        )))]);
        assert!(context.is_rtu());
        context.set_mode(Mode::Ascii);
        context.set_verbose(true);
        context.set_timeout(None);
        assert!(!context.is_rtu());
        assert!(context.config().verbose);
        assert_eq!(context.config().timeout, None);

        context.set_slave(Slave(0x11));
        let reply =
            futures::executor::block_on(context.exchange(Request::WriteSingleCoil(0x0001, true)))
                .unwrap();
        assert_eq!(reply.slave, Slave(0x11));
        assert!(reply.checksum.is_valid());
        assert_eq!(reply.response, Ok(Response::WriteSingleCoil(0x0001, true)));
    }
}
