// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request/response exchanges with serial line devices

use std::{fmt, io, time::Duration};

use futures_util::{SinkExt as _, StreamExt as _};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt as _};
use tokio_util::codec::Framed;

use crate::{
    bytes::Bytes,
    codec::serial::ClientCodec,
    config::{ChecksumPolicy, Config, Mode, Parity, SessionContext},
    frame::{adu::*, *},
    slave::*,
    Error, ProtocolError, Result,
};

/// Identifies the response that is expected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestContext {
    pub(crate) function_code: FunctionCode,
    pub(crate) header: Header,
}

impl RequestContext {
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        self.function_code
    }

    #[must_use]
    pub const fn slave(&self) -> Slave {
        self.header.slave
    }
}

/// Outcome of a complete exchange.
///
/// Besides the decoded response or the exception reported by the
/// device this also tells if the response frame has been corrupted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The responding device.
    pub slave: Slave,
    pub checksum: ChecksumStatus,
    pub response: std::result::Result<Response, ExceptionCode>,
}

/// _Modbus_ serial line client.
///
/// Sends requests and receives the responses over a single byte stream.
#[derive(Debug)]
pub struct Client<T> {
    framed: Framed<T, ClientCodec>,
}

impl<T> Client<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(transport: T, config: &Config) -> Self {
        let mut codec = ClientCodec::new(config.mode, config.emulated_parity_bit());
        codec.set_debug(config.debug);
        let framed = Framed::new(transport, codec);
        Self { framed }
    }

    pub async fn disconnect(self) -> io::Result<()> {
        let Self { framed } = self;
        framed.into_inner().shutdown().await
    }

    /// Sends a request and waits at most `timeout` for its response.
    pub async fn call(
        &mut self,
        slave: Slave,
        request: Request<'_>,
        timeout: Option<Duration>,
    ) -> std::result::Result<Reply, Error> {
        let request_context = self.send_request(slave, request).await?;
        self.recv_reply(request_context, timeout).await
    }

    pub async fn send_request(
        &mut self,
        slave: Slave,
        request: Request<'_>,
    ) -> io::Result<RequestContext> {
        let request_adu = request_adu(slave, request);
        let request_context = request_adu.context();

        // Stale data must not be taken for the response.
        self.framed.read_buffer_mut().clear();
        self.framed.send(request_adu).await?;

        Ok(request_context)
    }

    pub async fn recv_reply(
        &mut self,
        request_context: RequestContext,
        timeout: Option<Duration>,
    ) -> std::result::Result<Reply, Error> {
        let next = self.framed.next();
        let response_adu = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, next).await.map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no response within {timeout:?}"),
                )
            })?,
            None => next.await,
        }
        .unwrap_or_else(|| Err(io::Error::from(io::ErrorKind::BrokenPipe)))??;

        let slave = response_adu.hdr.slave;
        let checksum = response_adu.checksum;
        let response = response_adu.try_into_response(request_context)?;
        Ok(Reply {
            slave,
            checksum,
            response,
        })
    }
}

impl<T> Client<T> {
    fn codec_mut(&mut self) -> &mut ClientCodec {
        self.framed.codec_mut()
    }
}

/// _Modbus_ serial line client with slave selection, session settings
/// and connection state.
///
/// The slave can be switched between calls. Exchanges are strictly
/// sequential: each one borrows the context mutably from sending the
/// request until the response has been decoded.
#[derive(Debug)]
pub struct ClientContext<T> {
    client: Option<Client<T>>,
    slave: Slave,
    config: Config,
}

impl<T> ClientContext<T> {
    pub fn new(client: Client<T>, slave: Slave, config: Config) -> Self {
        Self {
            client: Some(client),
            slave,
            config,
        }
    }

    /// A context without a transport.
    ///
    /// All calls fail with [`io::ErrorKind::NotConnected`] and nothing
    /// is transmitted.
    #[must_use]
    pub const fn detached(slave: Slave, config: Config) -> Self {
        Self {
            client: None,
            slave,
            config,
        }
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    #[must_use]
    pub const fn slave(&self) -> Slave {
        self.slave
    }

    pub fn set_slave(&mut self, slave: Slave) {
        self.slave = slave;
    }

    fn update_codec(&mut self) {
        let mode = self.config.mode;
        let parity_bit = self.config.emulated_parity_bit();
        if let Some(client) = &mut self.client {
            client.codec_mut().set_mode(mode, parity_bit);
        }
    }
}

impl<T> SessionContext for ClientContext<T> {
    fn config(&self) -> &Config {
        &self.config
    }

    fn set_mode(&mut self, mode: Mode) {
        self.config.mode = mode;
        self.update_codec();
    }

    fn set_parity(&mut self, parity: Parity) {
        self.config.parity = parity;
        self.update_codec();
    }

    fn set_verbose(&mut self, verbose: bool) {
        self.config.verbose = verbose;
    }

    fn set_debug(&mut self, debug: bool) {
        self.config.debug = debug;
        if let Some(client) = &mut self.client {
            client.codec_mut().set_debug(debug);
        }
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.config.timeout = timeout;
    }

    fn set_checksum_policy(&mut self, checksum_policy: ChecksumPolicy) {
        self.config.checksum_policy = checksum_policy;
    }
}

impl<T> ClientContext<T>
where
    T: AsyncWrite + Unpin,
{
    pub async fn disconnect(&mut self) -> io::Result<()> {
        let Some(client) = self.client.take() else {
            // Already disconnected.
            return Ok(());
        };
        client.framed.into_inner().shutdown().await
    }
}

impl<T> ClientContext<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Performs a complete exchange with the selected slave.
    ///
    /// Unlike [`Self::call`] the reply tells whether the checksum of the
    /// response frame matched.
    pub async fn exchange(&mut self, request: Request<'_>) -> std::result::Result<Reply, Error> {
        log::debug!("Call {:?} on slave {}", request, self.slave);

        let Some(client) = &mut self.client else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "no transport").into());
        };

        if self.slave.is_broadcast() || !request.expects_response() {
            let response = echo_response(&request).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "function {} without response from slave {}",
                        request.function_code(),
                        self.slave
                    ),
                )
            })?;
            client.send_request(self.slave, request).await?;
            log::debug!("Not waiting for a response from slave {}", self.slave);
            return Ok(Reply {
                slave: self.slave,
                checksum: ChecksumStatus::Valid,
                response: Ok(response),
            });
        }

        let reply = client.call(self.slave, request, self.config.timeout).await?;

        if let ChecksumStatus::Mismatch { computed, received } = reply.checksum {
            log::warn!(
                "Checksum mismatch in response from slave {}: computed = 0x{computed:04X}, received = 0x{received:04X}",
                reply.slave
            );
            if self.config.checksum_policy == ChecksumPolicy::Reject {
                return Err(ProtocolError::ChecksumMismatch { computed, received }.into());
            }
        }
        match &reply.response {
            Ok(response) => {
                if self.config.verbose {
                    log::info!("Slave {} responded: {response:?}", reply.slave);
                }
            }
            Err(exception) => {
                log::warn!(
                    "Slave {} responded with exception 0x{:02X}: {exception}",
                    reply.slave,
                    u8::from(*exception)
                );
            }
        }
        Ok(reply)
    }

    pub async fn call(&mut self, request: Request<'_>) -> Result<Response> {
        self.exchange(request).await.map(|reply| reply.response)
    }
}

impl<T> ClientContext<T>
where
    T: AsyncRead + AsyncWrite + Unpin + fmt::Debug + Send + 'static,
{
    #[must_use]
    pub fn boxed(self) -> Box<dyn crate::client::Client> {
        Box::new(self)
    }
}

impl<T> SlaveContext for ClientContext<T> {
    fn set_slave(&mut self, slave: Slave) {
        self.slave = slave;
    }
}

#[async_trait::async_trait]
impl<T> crate::client::Client for ClientContext<T>
where
    T: fmt::Debug + AsyncRead + AsyncWrite + Send + Unpin,
{
    async fn call(&mut self, request: Request<'_>) -> Result<Response> {
        self.call(request).await
    }

    async fn exchange(&mut self, request: Request<'_>) -> std::result::Result<Reply, Error> {
        self.exchange(request).await
    }

    async fn disconnect(&mut self) -> io::Result<()> {
        self.disconnect().await
    }
}

fn request_adu<'a, R>(slave: Slave, request_pdu: R) -> RequestAdu<'a>
where
    R: Into<RequestPdu<'a>>,
{
    let hdr = Header { slave };
    let pdu = request_pdu.into();
    RequestAdu { hdr, pdu }
}

// Stands in for the response of requests that are never answered.
//
// Only requests that are answered with an echo can be sent without
// waiting for their response.
fn echo_response(request: &Request<'_>) -> Option<Response> {
    use Request::*;

    let response = match request {
        WriteSingleCoil(addr, coil) => Response::WriteSingleCoil(*addr, *coil),
        WriteMultipleCoils(addr, coils) => {
            Response::WriteMultipleCoils(*addr, coils.len() as Quantity)
        }
        WriteSingleRegister(addr, word) => Response::WriteSingleRegister(*addr, *word),
        WriteMultipleRegisters(addr, words) => {
            Response::WriteMultipleRegisters(*addr, words.len() as Quantity)
        }
        WriteFileRecord(records) => Response::WriteFileRecord(records.to_vec()),
        MaskWriteRegister(addr, and_mask, or_mask) => {
            Response::MaskWriteRegister(*addr, *and_mask, *or_mask)
        }
        Diagnostics(sub_function, data) => {
            Response::Diagnostics(*sub_function, Bytes::copy_from_slice(data))
        }
        _ => return None,
    };
    Some(response)
}
