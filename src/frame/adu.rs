// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;

use crate::{master::RequestContext, ProtocolError, Result, Slave};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Header {
    pub(crate) slave: Slave,
}

/// Outcome of the checksum verification of a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumStatus {
    Valid,
    /// The frame has been decoded nevertheless and may be corrupted.
    ///
    /// RTU frames carry a 16 bit CRC, ASCII frames an 8 bit LRC that
    /// is zero-extended.
    Mismatch { computed: u16, received: u16 },
}

impl ChecksumStatus {
    pub(crate) fn verify(computed: u16, received: u16) -> Self {
        if computed == received {
            Self::Valid
        } else {
            Self::Mismatch { computed, received }
        }
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RequestAdu<'a> {
    pub(crate) hdr: Header,
    pub(crate) pdu: RequestPdu<'a>,
}

impl RequestAdu<'_> {
    pub(crate) fn context(&self) -> RequestContext {
        RequestContext {
            function_code: self.pdu.0.function_code(),
            header: self.hdr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResponseAdu {
    pub(crate) hdr: Header,
    pub(crate) pdu: ResponsePdu,
    pub(crate) checksum: ChecksumStatus,
}

impl ResponseAdu {
    pub(crate) fn try_into_response(self, request_context: RequestContext) -> Result<Response> {
        let RequestContext {
            function_code: req_function_code,
            header: req_hdr,
        } = request_context;

        let ResponseAdu {
            hdr: rsp_hdr,
            pdu: rsp_pdu,
            checksum: _,
        } = self;
        let ResponsePdu(result) = rsp_pdu;

        if let Err(message) = verify_response_header(&req_hdr, &rsp_hdr) {
            return Err(ProtocolError::HeaderMismatch { message, result }.into());
        }

        // Match function codes of request and response.
        let rsp_function_code = match &result {
            Ok(response) => response.function_code(),
            Err(ExceptionResponse { function, .. }) => *function,
        };
        if req_function_code != rsp_function_code {
            return Err(ProtocolError::FunctionCodeMismatch {
                request: req_function_code,
                result,
            }
            .into());
        }

        Ok(result.map_err(
            |ExceptionResponse {
                 function: _,
                 exception,
             }| exception,
        ))
    }
}

impl<'a> From<RequestAdu<'a>> for Request<'a> {
    fn from(from: RequestAdu<'a>) -> Self {
        from.pdu.into()
    }
}
