// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory serial line with a simulated slave device

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    fmt, io,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll, Waker},
};

use serial_modbus::{
    bytes::Bytes,
    client::Context as ClientContext,
    decode_adu, encode_adu,
    master::{self, ClientContext as MasterContext},
    ChecksumStatus, Config, Mode, Slave,
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Answers a request frame with the bytes that appear on the line.
///
/// An empty answer means the device stays silent.
pub type Handler = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

/// All request frames that have been sent, one entry per frame.
pub type SentFrames = Arc<Mutex<Vec<Vec<u8>>>>;

pub struct Device {
    handler: Handler,
    sent: SentFrames,
    pending_write: Vec<u8>,
    readable: VecDeque<u8>,
    read_waker: Option<Waker>,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("sent", &self.sent)
            .field("readable", &self.readable)
            .finish_non_exhaustive()
    }
}

impl Device {
    pub fn new(handler: Handler) -> (Self, SentFrames) {
        let sent = SentFrames::default();
        let device = Self {
            handler,
            sent: Arc::clone(&sent),
            pending_write: Vec::new(),
            readable: VecDeque::new(),
            read_waker: None,
        };
        (device, sent)
    }

    /// Replies with the given frames in order, one per request.
    pub fn scripted(replies: impl IntoIterator<Item = Vec<u8>>) -> (Self, SentFrames) {
        let mut replies: VecDeque<_> = replies.into_iter().collect();
        Self::new(Box::new(move |_| replies.pop_front().unwrap_or_default()))
    }

    /// Never replies.
    pub fn silent() -> (Self, SentFrames) {
        Self::new(Box::new(|_| Vec::new()))
    }

    /// Decodes each request and replies with the PDU returned by `respond`.
    ///
    /// The reply is sent from the addressed slave in the same mode.
    pub fn responder<F>(mode: Mode, mut respond: F) -> (Self, SentFrames)
    where
        F: FnMut(Slave, &[u8]) -> Option<Vec<u8>> + Send + 'static,
    {
        Self::new(Box::new(move |frame| {
            let (slave, pdu, checksum) = decode_adu(mode, frame).expect("valid request frame");
            assert_eq!(checksum, ChecksumStatus::Valid);
            respond(slave, &pdu)
                .map(|pdu| encode_adu(mode, slave, &pdu).to_vec())
                .unwrap_or_default()
        }))
    }
}

impl AsyncRead for Device {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.readable.is_empty() {
            this.read_waker = Some(cx.waker().clone());
            return Poll::Pending;
        }
        let len = buf.remaining().min(this.readable.len());
        let chunk: Vec<u8> = this.readable.drain(..len).collect();
        buf.put_slice(&chunk);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for Device {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut().pending_write.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.pending_write.is_empty() {
            return Poll::Ready(Ok(()));
        }
        let request = std::mem::take(&mut this.pending_write);
        let reply = (this.handler)(&request);
        this.sent.lock().unwrap().push(request);
        if !reply.is_empty() {
            this.readable.extend(reply);
            if let Some(waker) = this.read_waker.take() {
                waker.wake();
            }
        }
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.poll_flush(cx)
    }
}

pub fn rtu_frame(slave: u8, pdu: &[u8]) -> Vec<u8> {
    encode_adu(Mode::Rtu, Slave(slave), pdu).to_vec()
}

pub fn ascii_frame(slave: u8, pdu: &[u8]) -> Vec<u8> {
    encode_adu(Mode::Ascii, Slave(slave), pdu).to_vec()
}

pub fn bytes(data: &'static [u8]) -> Bytes {
    Bytes::from_static(data)
}

/// A session with the device that is driven through the client traits.
pub fn attach(device: Device, slave: u8, config: Config) -> ClientContext {
    MasterContext::new(master::Client::new(device, &config), Slave(slave), config)
        .boxed()
        .into()
}

/// A session with the device that reports the outcome of each exchange.
pub fn session(device: Device, slave: u8, config: Config) -> MasterContext<Device> {
    MasterContext::new(master::Client::new(device, &config), Slave(slave), config)
}
