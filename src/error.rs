// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types.

use thiserror::Error;

use crate::{ExceptionCode, ExceptionResponse, FunctionCode, Response};

/// _Modbus_ protocol error.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The checksum of a received frame did not match its content.
    ///
    /// Only reported if the session rejects corrupted frames.
    #[error("checksum mismatch: computed = 0x{computed:04X}, received = 0x{received:04X}")]
    ChecksumMismatch { computed: u16, received: u16 },

    /// The response was sent by another device than the one addressed.
    #[error("mismatching headers: {message} {result:?}")]
    HeaderMismatch {
        message: String,
        result: std::result::Result<Response, ExceptionResponse>,
    },

    /// The function codes of request and response do not match.
    #[error("mismatching function codes: {request} {result:?}")]
    FunctionCodeMismatch {
        request: FunctionCode,
        result: std::result::Result<Response, ExceptionResponse>,
    },

    /// A paginated response did not terminate.
    #[error("response still incomplete after {pages} pages")]
    TooManyPages { pages: usize },
}

/// Failure of a _Modbus_ exchange.
#[derive(Debug, Error)]
pub enum Error {
    /// The response did not fit the request.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Sending or receiving a frame failed, e.g. because the device
    /// did not respond in time.
    #[error(transparent)]
    Transport(#[from] std::io::Error),

    /// The function is not supported by this client and nothing
    /// has been transmitted.
    #[error("not implemented: {0}")]
    Unimplemented(&'static str),
}

/// Result of a _Modbus_ exchange.
///
/// The outer error reports a failed exchange. The inner error is the
/// exception that the device responded with instead of a result.
pub type Result<T> = std::result::Result<std::result::Result<T, ExceptionCode>, Error>;
