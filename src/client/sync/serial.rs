// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connecting a synchronous Modbus serial line context

use std::io;

use super::{new_runtime, Context};

use crate::{client::serial as async_serial, config::Config, slave::Slave};

/// Open the serial port at `path` for sending broadcast messages.
pub fn connect(path: &str, config: Config) -> io::Result<Context> {
    connect_slave(path, Slave::broadcast(), config)
}

/// Open the serial port at `path` for talking to a particular slave device.
pub fn connect_slave(path: &str, slave: Slave, config: Config) -> io::Result<Context> {
    let runtime = new_runtime()?;
    // The port is registered with the IO driver of the runtime.
    let async_ctx = {
        let _guard = runtime.enter();
        async_serial::connect_slave(path, slave, config)?
    };
    Ok(Context { runtime, async_ctx })
}

/// Open the serial port at `path` and fall back to a context without
/// transport if that fails.
///
/// Only fails if the runtime can not be created.
pub fn connect_or_detached(path: &str, slave: Slave, config: Config) -> io::Result<Context> {
    let runtime = new_runtime()?;
    let async_ctx = {
        let _guard = runtime.enter();
        async_serial::connect_or_detached(path, slave, config)
    };
    Ok(Context { runtime, async_ctx })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        client::sync::{Reader as _, SerialLine as _},
        Error,
    };

    #[test]
    fn detached_context_transmits_nothing() {
        let mut ctx =
            connect_or_detached("/dev/does-not-exist", Slave(0x01), Config::rtu()).unwrap();
        let err = ctx.read_coils(0x0013, 10).unwrap_err();
        assert!(matches!(err, Error::Transport(err) if err.kind() == io::ErrorKind::NotConnected));
        let err = ctx.canopen_general_reference(&[]).unwrap_err();
        assert!(matches!(err, Error::Unimplemented(_)));
    }

    #[test]
    fn connect_missing_port() {
        assert!(connect_slave("/dev/does-not-exist", Slave(0x01), Config::rtu()).is_err());
    }
}
