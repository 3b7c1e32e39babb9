// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io;

use tokio_util::codec::{Decoder, Encoder};

use crate::{
    bytes::BytesMut,
    config::Mode,
    frame::{adu::*, *},
};

use super::{ascii, encode_request_pdu, request_pdu_size, rtu};

/// Frames requests and unframes responses in the active transmission mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClientCodec {
    mode: Mode,
    // Bit 7 of every character on the line, if it is not left to the UART.
    parity_bit: Option<bool>,
    // Diagnostics responses echo the request.
    diagnostics_len: Option<usize>,
    debug: bool,
}

impl ClientCodec {
    pub(crate) const fn new(mode: Mode, parity_bit: Option<bool>) -> Self {
        Self {
            mode,
            parity_bit,
            diagnostics_len: None,
            debug: false,
        }
    }

    pub(crate) fn set_mode(&mut self, mode: Mode, parity_bit: Option<bool>) {
        self.mode = mode;
        self.parity_bit = parity_bit;
    }

    /// Log the raw frames at debug instead of trace level.
    pub(crate) fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    fn log_frame(&self, direction: &str, frame: &[u8]) {
        let level = if self.debug {
            log::Level::Debug
        } else {
            log::Level::Trace
        };
        log::log!(level, "{direction} {:?} frame: {frame:02X?}", self.mode);
    }
}

impl Default for ClientCodec {
    fn default() -> Self {
        Self::new(Mode::default(), None)
    }
}

impl<'a> Encoder<RequestAdu<'a>> for ClientCodec {
    type Error = io::Error;

    fn encode(&mut self, adu: RequestAdu<'a>, buf: &mut BytesMut) -> io::Result<()> {
        let RequestAdu {
            hdr,
            pdu: RequestPdu(request),
        } = adu;
        let pdu_len = request_pdu_size(&request)?;
        let mut pdu = BytesMut::with_capacity(pdu_len);
        encode_request_pdu(&mut pdu, &request);
        self.diagnostics_len = matches!(request, Request::Diagnostics(..)).then_some(pdu_len);

        let start = buf.len();
        match self.mode {
            Mode::Rtu => rtu::encode(buf, hdr.slave, &pdu),
            Mode::Ascii => ascii::encode(buf, hdr.slave, &pdu),
        }
        if let Some(parity_bit) = self.parity_bit {
            for c in &mut buf[start..] {
                if parity_bit {
                    *c |= 0x80;
                } else {
                    *c &= 0x7F;
                }
            }
        }
        self.log_frame("Sending", &buf[start..]);
        Ok(())
    }
}

impl ClientCodec {
    fn decode_frame(&self, frame: &[u8]) -> io::Result<ResponseAdu> {
        self.log_frame("Received", frame);
        let (slave, pdu, checksum) = match self.mode {
            Mode::Rtu => rtu::decode(frame)?,
            Mode::Ascii => ascii::decode(frame)?,
        };
        let pdu = ResponsePdu::try_from(pdu)?;
        Ok(ResponseAdu {
            hdr: Header { slave },
            pdu,
            checksum,
        })
    }
}

/// Malformed responses are yielded as items.
///
/// An error returned from [`Decoder::decode`] would end the stream of
/// the underlying `Framed` for good, failing all subsequent exchanges.
impl Decoder for ClientCodec {
    type Item = io::Result<ResponseAdu>;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> io::Result<Option<Self::Item>> {
        if self.parity_bit.is_some() {
            for c in buf.iter_mut() {
                *c &= 0x7F;
            }
        }
        let frame = match self.mode {
            Mode::Rtu => rtu::split_response_frame(buf, self.diagnostics_len),
            Mode::Ascii => Ok(ascii::split_frame(buf)),
        };
        match frame {
            Ok(Some(frame)) => Ok(Some(self.decode_frame(&frame))),
            Ok(None) => Ok(None),
            Err(err) => {
                log::debug!("Discarding {} unframed byte(s): {err}", buf.len());
                buf.clear();
                Ok(Some(Err(err)))
            }
        }
    }
}
