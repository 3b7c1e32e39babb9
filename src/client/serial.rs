// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connecting a Modbus serial line context

use std::{fmt, io};

use tokio::io::{AsyncRead, AsyncWrite};

use super::*;

use crate::{
    config::Config,
    master::{self, ClientContext},
};

/// Attach a new client context to a direct transport connection
/// for sending broadcast messages.
pub fn attach<T>(transport: T, config: Config) -> Context
where
    T: AsyncRead + AsyncWrite + fmt::Debug + Unpin + Send + 'static,
{
    attach_slave(transport, Slave::broadcast(), config)
}

/// Attach a new client context to a transport connection
/// with a particular slave device.
pub fn attach_slave<T>(transport: T, slave: Slave, config: Config) -> Context
where
    T: AsyncRead + AsyncWrite + fmt::Debug + Unpin + Send + 'static,
{
    let client = master::Client::new(transport, &config);
    Context {
        client: ClientContext::new(client, slave, config).boxed(),
    }
}

/// Open the serial port at `path` for sending broadcast messages.
pub fn connect(path: &str, config: Config) -> io::Result<Context> {
    connect_slave(path, Slave::broadcast(), config)
}

/// Open the serial port at `path` for talking to a particular slave device.
pub fn connect_slave(path: &str, slave: Slave, config: Config) -> io::Result<Context> {
    let port = crate::serial::open(path, &config)?;
    log::debug!("Opened serial port {path} in {:?} mode", config.mode);
    Ok(attach_slave(port, slave, config))
}

/// Open the serial port at `path` and fall back to a context without
/// transport if that fails.
///
/// The failure is only logged. All calls on a detached context fail
/// with [`io::ErrorKind::NotConnected`] and transmit nothing.
pub fn connect_or_detached(path: &str, slave: Slave, config: Config) -> Context {
    match crate::serial::open(path, &config) {
        Ok(port) => attach_slave(port, slave, config),
        Err(err) => {
            log::error!("Failed to open serial port {path}: {err}");
            Context {
                client: ClientContext::<tokio_serial::SerialStream>::detached(slave, config)
                    .boxed(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detached_context_transmits_nothing() {
        let mut ctx = connect_or_detached(
            "/dev/does-not-exist",
            Slave(0x11),
            Config::ascii(),
        );
        let err = ctx.read_holding_registers(0x006B, 3).await.unwrap_err();
        assert!(
            matches!(err, crate::Error::Transport(err) if err.kind() == io::ErrorKind::NotConnected)
        );
        assert!(ctx.disconnect().await.is_ok());
    }

    #[tokio::test]
    async fn connect_missing_port() {
        assert!(connect("/dev/does-not-exist", Config::rtu()).is_err());
    }
}
