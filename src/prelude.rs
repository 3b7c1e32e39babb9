// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types and traits

///////////////////////////////////////////////////////////////////
/// Modules
///////////////////////////////////////////////////////////////////
pub use crate::client;

#[allow(missing_docs)]
#[cfg(feature = "serial")]
pub mod serial {
    pub use crate::client::serial::*;
}

#[allow(missing_docs)]
#[cfg(feature = "sync")]
pub mod sync {
    pub use crate::client::sync::*;
}

///////////////////////////////////////////////////////////////////
/// Types
///////////////////////////////////////////////////////////////////
pub use crate::{
    ChecksumPolicy, ChecksumStatus, Config, DiagnosticSubFunction, ExceptionCode, Mode, Parity,
    ReadCode, Reply, Request, Response, StopBits,
};
pub use crate::{Slave, SlaveId};

///////////////////////////////////////////////////////////////////
/// Traits
///////////////////////////////////////////////////////////////////
pub use crate::client::{Client, Reader, SerialLine, Writer};
pub use crate::config::SessionContext;
pub use crate::slave::SlaveContext;

#[cfg(feature = "sync")]
pub use crate::client::sync::{
    Client as SyncClient, Reader as SyncReader, SerialLine as SyncSerialLine,
    Writer as SyncWriter,
};
