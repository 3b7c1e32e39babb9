// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A [Modbus](https://en.wikipedia.org/wiki/Modbus) serial line
//! master based on [tokio](https://tokio.rs).
//!
//! Requests are sent to a single slave device over a serial line,
//! either as binary RTU frames protected by a CRC-16 or as hex encoded
//! ASCII frames protected by an LRC. The transmission mode can be
//! switched between calls.
//!
//! The client is asynchronous. A blocking API on top of it is available
//! with the `sync` feature.
//!
//! ## Example
//!
//! ```no_run
//! # #[cfg(feature = "serial")]
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     use serial_modbus::prelude::*;
//!
//!     let mut ctx = serial::connect_slave("/dev/ttyUSB0", Slave(0x11), Config::ascii())?;
//!     let registers = ctx.read_holding_registers(0x006B, 3).await??;
//!     println!("Registers: {registers:?}");
//!     ctx.disconnect().await?;
//!     Ok(())
//! }
//! # #[cfg(not(feature = "serial"))]
//! # fn main() {}
//! ```

#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(unreachable_pub)]
#![warn(unsafe_code)]
#![warn(clippy::pedantic)]
// Additional restrictions
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::self_named_module_files)]
// Exceptions
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod bytes {
    //! Re-export the `bytes` crate
    //!
    //! Needed to prevent version conflicts with types that are exposed by the public API.
    pub use bytes::*;
}

pub mod checksum;

pub mod client;

pub mod config;
pub use self::config::{ChecksumPolicy, Config, Mode, Parity, SessionContext, StopBits};

pub mod master;
pub use self::master::{Reply, RequestContext};

pub mod prelude;

#[cfg(feature = "serial")]
pub mod serial;

pub mod slave;
pub use self::slave::{Slave, SlaveContext, SlaveId};

mod codec;
pub use self::codec::{decode_adu, encode_adu};

mod error;
pub use self::error::{Error, ProtocolError, Result};

mod frame;
pub use self::frame::{
    adu::ChecksumStatus, Address, Coil, CommEvent, CommEventCounter, CommEventLog,
    ConformityLevel, DeviceIdObject, DeviceIdObjects, DiagnosticSubFunction, ExceptionCode,
    ExceptionResponse, FileRecord, FileRecordRequest, FunctionCode, MoreFollows, NextObjectId,
    ObjectId, Quantity, ReadCode, ReadDeviceIdentificationResponse, Request, Response, Word,
};
