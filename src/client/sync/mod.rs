// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronous Modbus context access

#[cfg(feature = "serial")]
pub mod serial;

use std::{io, time::Duration};

use super::{
    Client as AsyncClient, Context as AsyncContext, Reader as AsyncReader,
    SerialLine as AsyncSerialLine, SlaveContext, Writer as AsyncWriter,
};

use crate::{
    bytes::Bytes,
    config::{ChecksumPolicy, Config, Mode, Parity, SessionContext},
    frame::*,
    master::Reply,
    slave::*,
    Error, Result,
};

fn new_runtime() -> io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// A transport independent synchronous client trait.
pub trait Client: SlaveContext + SessionContext {
    /// Invokes a _Modbus_ function.
    fn call(&mut self, req: Request<'_>) -> Result<Response>;

    /// Invokes a _Modbus_ function and also reports whether the checksum
    /// of the response frame matched.
    fn exchange(&mut self, req: Request<'_>) -> std::result::Result<Reply, Error>;

    /// Disconnects the client.
    fn disconnect(&mut self) -> io::Result<()>;
}

/// A transport independent synchronous reader trait.
pub trait Reader: Client {
    fn read_coils(&mut self, _: Address, _: Quantity) -> Result<Vec<Coil>>;
    fn read_discrete_inputs(&mut self, _: Address, _: Quantity) -> Result<Vec<Coil>>;
    fn read_holding_registers(&mut self, _: Address, _: Quantity) -> Result<Vec<Word>>;
    fn read_input_registers(&mut self, _: Address, _: Quantity) -> Result<Vec<Word>>;
    fn read_write_multiple_registers(
        &mut self,
        _: Address,
        _: Quantity,
        _: Address,
        _: &[Word],
    ) -> Result<Vec<Word>>;
    fn read_file_record(&mut self, _: &[FileRecordRequest]) -> Result<Vec<Vec<Word>>>;
    fn read_fifo_queue(&mut self, _: Address) -> Result<Vec<Word>>;
    fn read_device_identification(
        &mut self,
        _: ReadCode,
        _: ObjectId,
    ) -> Result<ReadDeviceIdentificationResponse>;
}

/// A transport independent synchronous writer trait.
pub trait Writer: Client {
    fn write_single_coil(&mut self, _: Address, _: Coil) -> Result<()>;
    fn write_multiple_coils(&mut self, _: Address, _: &[Coil]) -> Result<()>;
    fn write_single_register(&mut self, _: Address, _: Word) -> Result<()>;
    fn write_multiple_registers(&mut self, _: Address, _: &[Word]) -> Result<()>;
    fn write_file_record(&mut self, _: &[FileRecord]) -> Result<()>;
    fn masked_write_register(&mut self, _: Address, _: Word, _: Word) -> Result<()>;
}

/// Synchronous access to the serial line functions.
///
/// See [`super::SerialLine`] for details.
pub trait SerialLine: Client {
    fn read_exception_status(&mut self) -> Result<[bool; 8]>;
    fn diagnostics(&mut self, _: DiagnosticSubFunction, _: &[u8]) -> Result<Bytes>;
    fn return_query_data(&mut self, _: &[u8]) -> Result<Bytes>;
    fn restart_communications(&mut self, clear_event_log: bool) -> Result<()>;
    fn return_diagnostic_register(&mut self) -> Result<Word>;
    fn change_ascii_input_delimiter(&mut self, _: u8) -> Result<()>;
    fn force_listen_only_mode(&mut self) -> Result<()>;
    fn clear_counters_and_diagnostic_register(&mut self) -> Result<()>;
    fn return_bus_message_count(&mut self) -> Result<Word>;
    fn return_bus_communication_error_count(&mut self) -> Result<Word>;
    fn return_bus_exception_error_count(&mut self) -> Result<Word>;
    fn return_server_message_count(&mut self) -> Result<Word>;
    fn return_server_no_response_count(&mut self) -> Result<Word>;
    fn return_server_nak_count(&mut self) -> Result<Word>;
    fn return_server_busy_count(&mut self) -> Result<Word>;
    fn return_bus_character_overrun_count(&mut self) -> Result<Word>;
    fn clear_overrun_counter_and_flag(&mut self) -> Result<()>;
    fn get_comm_event_counter(&mut self) -> Result<CommEventCounter>;
    fn get_comm_event_log(&mut self) -> Result<CommEventLog>;
    fn report_server_id(&mut self) -> Result<(u8, bool, Vec<u8>)>;
    fn canopen_general_reference(&mut self, _: &[u8]) -> Result<Bytes>;
}

/// A synchronous Modbus client context.
///
/// Each call drives the asynchronous context to completion on a
/// private single threaded runtime.
#[derive(Debug)]
pub struct Context {
    runtime: tokio::runtime::Runtime,
    async_ctx: AsyncContext,
}

impl Context {
    /// Wraps an asynchronous context.
    ///
    /// Transports that need the IO driver of a runtime when they are
    /// created, like serial ports, must be opened through the functions
    /// of the `serial` submodule instead.
    pub fn new(async_ctx: AsyncContext) -> io::Result<Self> {
        let runtime = new_runtime()?;
        Ok(Self { runtime, async_ctx })
    }
}

impl Client for Context {
    fn call(&mut self, req: Request<'_>) -> Result<Response> {
        self.runtime.block_on(self.async_ctx.call(req))
    }

    fn exchange(&mut self, req: Request<'_>) -> std::result::Result<Reply, Error> {
        self.runtime.block_on(self.async_ctx.exchange(req))
    }

    fn disconnect(&mut self) -> io::Result<()> {
        self.runtime.block_on(self.async_ctx.disconnect())
    }
}

impl SlaveContext for Context {
    fn set_slave(&mut self, slave: Slave) {
        self.async_ctx.set_slave(slave);
    }
}

impl SessionContext for Context {
    fn config(&self) -> &Config {
        self.async_ctx.config()
    }

    fn set_mode(&mut self, mode: Mode) {
        self.async_ctx.set_mode(mode);
    }

    fn set_parity(&mut self, parity: Parity) {
        self.async_ctx.set_parity(parity);
    }

    fn set_verbose(&mut self, verbose: bool) {
        self.async_ctx.set_verbose(verbose);
    }

    fn set_debug(&mut self, debug: bool) {
        self.async_ctx.set_debug(debug);
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.async_ctx.set_timeout(timeout);
    }

    fn set_checksum_policy(&mut self, checksum_policy: ChecksumPolicy) {
        self.async_ctx.set_checksum_policy(checksum_policy);
    }
}

impl Reader for Context {
    fn read_coils(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        self.runtime.block_on(self.async_ctx.read_coils(addr, cnt))
    }

    fn read_discrete_inputs(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        self.runtime
            .block_on(self.async_ctx.read_discrete_inputs(addr, cnt))
    }

    fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        self.runtime
            .block_on(self.async_ctx.read_input_registers(addr, cnt))
    }

    fn read_holding_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        self.runtime
            .block_on(self.async_ctx.read_holding_registers(addr, cnt))
    }

    fn read_write_multiple_registers(
        &mut self,
        read_addr: Address,
        read_count: Quantity,
        write_addr: Address,
        write_data: &[Word],
    ) -> Result<Vec<Word>> {
        self.runtime
            .block_on(self.async_ctx.read_write_multiple_registers(
                read_addr, read_count, write_addr, write_data,
            ))
    }

    fn read_file_record(&mut self, requests: &[FileRecordRequest]) -> Result<Vec<Vec<Word>>> {
        self.runtime.block_on(self.async_ctx.read_file_record(requests))
    }

    fn read_fifo_queue(&mut self, addr: Address) -> Result<Vec<Word>> {
        self.runtime.block_on(self.async_ctx.read_fifo_queue(addr))
    }

    fn read_device_identification(
        &mut self,
        read_code: ReadCode,
        object_id: ObjectId,
    ) -> Result<ReadDeviceIdentificationResponse> {
        self.runtime.block_on(
            self.async_ctx
                .read_device_identification(read_code, object_id),
        )
    }
}

impl Writer for Context {
    fn write_single_coil(&mut self, addr: Address, coil: Coil) -> Result<()> {
        self.runtime.block_on(self.async_ctx.write_single_coil(addr, coil))
    }

    fn write_multiple_coils(&mut self, addr: Address, coils: &[Coil]) -> Result<()> {
        self.runtime
            .block_on(self.async_ctx.write_multiple_coils(addr, coils))
    }

    fn write_single_register(&mut self, addr: Address, word: Word) -> Result<()> {
        self.runtime
            .block_on(self.async_ctx.write_single_register(addr, word))
    }

    fn write_multiple_registers(&mut self, addr: Address, words: &[Word]) -> Result<()> {
        self.runtime
            .block_on(self.async_ctx.write_multiple_registers(addr, words))
    }

    fn write_file_record(&mut self, records: &[FileRecord]) -> Result<()> {
        self.runtime.block_on(self.async_ctx.write_file_record(records))
    }

    fn masked_write_register(&mut self, addr: Address, and_mask: Word, or_mask: Word) -> Result<()> {
        self.runtime
            .block_on(self.async_ctx.masked_write_register(addr, and_mask, or_mask))
    }
}

impl SerialLine for Context {
    fn read_exception_status(&mut self) -> Result<[bool; 8]> {
        self.runtime.block_on(self.async_ctx.read_exception_status())
    }

    fn diagnostics(&mut self, sub_function: DiagnosticSubFunction, data: &[u8]) -> Result<Bytes> {
        self.runtime.block_on(self.async_ctx.diagnostics(sub_function, data))
    }

    fn return_query_data(&mut self, data: &[u8]) -> Result<Bytes> {
        self.runtime.block_on(self.async_ctx.return_query_data(data))
    }

    fn restart_communications(&mut self, clear_event_log: bool) -> Result<()> {
        self.runtime
            .block_on(self.async_ctx.restart_communications(clear_event_log))
    }

    fn return_diagnostic_register(&mut self) -> Result<Word> {
        self.runtime.block_on(self.async_ctx.return_diagnostic_register())
    }

    fn change_ascii_input_delimiter(&mut self, delimiter: u8) -> Result<()> {
        self.runtime
            .block_on(self.async_ctx.change_ascii_input_delimiter(delimiter))
    }

    fn force_listen_only_mode(&mut self) -> Result<()> {
        self.runtime.block_on(self.async_ctx.force_listen_only_mode())
    }

    fn clear_counters_and_diagnostic_register(&mut self) -> Result<()> {
        self.runtime
            .block_on(self.async_ctx.clear_counters_and_diagnostic_register())
    }

    fn return_bus_message_count(&mut self) -> Result<Word> {
        self.runtime.block_on(self.async_ctx.return_bus_message_count())
    }

    fn return_bus_communication_error_count(&mut self) -> Result<Word> {
        self.runtime
            .block_on(self.async_ctx.return_bus_communication_error_count())
    }

    fn return_bus_exception_error_count(&mut self) -> Result<Word> {
        self.runtime
            .block_on(self.async_ctx.return_bus_exception_error_count())
    }

    fn return_server_message_count(&mut self) -> Result<Word> {
        self.runtime.block_on(self.async_ctx.return_server_message_count())
    }

    fn return_server_no_response_count(&mut self) -> Result<Word> {
        self.runtime
            .block_on(self.async_ctx.return_server_no_response_count())
    }

    fn return_server_nak_count(&mut self) -> Result<Word> {
        self.runtime.block_on(self.async_ctx.return_server_nak_count())
    }

    fn return_server_busy_count(&mut self) -> Result<Word> {
        self.runtime.block_on(self.async_ctx.return_server_busy_count())
    }

    fn return_bus_character_overrun_count(&mut self) -> Result<Word> {
        self.runtime
            .block_on(self.async_ctx.return_bus_character_overrun_count())
    }

    fn clear_overrun_counter_and_flag(&mut self) -> Result<()> {
        self.runtime
            .block_on(self.async_ctx.clear_overrun_counter_and_flag())
    }

    fn get_comm_event_counter(&mut self) -> Result<CommEventCounter> {
        self.runtime.block_on(self.async_ctx.get_comm_event_counter())
    }

    fn get_comm_event_log(&mut self) -> Result<CommEventLog> {
        self.runtime.block_on(self.async_ctx.get_comm_event_log())
    }

    fn report_server_id(&mut self) -> Result<(u8, bool, Vec<u8>)> {
        self.runtime.block_on(self.async_ctx.report_server_id())
    }

    fn canopen_general_reference(&mut self, data: &[u8]) -> Result<Bytes> {
        self.runtime.block_on(self.async_ctx.canopen_general_reference(data))
    }
}
