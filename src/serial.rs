// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serial port settings
//!
//! The serial driver only knows none, odd and even parity. Mark and
//! space parity are emulated: 7 bit ASCII characters are sent as
//! 8 bit characters with a fixed most significant bit, and for RTU a
//! constant mark bit is indistinguishable from a second stop bit.

use std::io;

use tokio_serial::{DataBits, SerialPortBuilder, SerialStream};

use crate::config::{Config, Mode, Parity, StopBits};

/// Translates the session settings into a port builder.
///
/// # Errors
///
/// Space parity can not be emulated for 8 bit characters and is
/// rejected in RTU mode.
pub fn builder(path: &str, config: &Config) -> io::Result<SerialPortBuilder> {
    let mut data_bits = data_bits(config.data_bits());
    let mut stop_bits = config.stop_bits;
    let parity = match (config.mode, config.parity) {
        (_, Parity::None) => tokio_serial::Parity::None,
        (_, Parity::Odd) => tokio_serial::Parity::Odd,
        (_, Parity::Even) => tokio_serial::Parity::Even,
        (Mode::Ascii, Parity::Mark | Parity::Space) => {
            data_bits = DataBits::Eight;
            tokio_serial::Parity::None
        }
        (Mode::Rtu, Parity::Mark) => {
            stop_bits = StopBits::Two;
            tokio_serial::Parity::None
        }
        (Mode::Rtu, Parity::Space) => {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "space parity is not supported in RTU mode",
            ));
        }
    };
    let stop_bits = match stop_bits {
        StopBits::One => tokio_serial::StopBits::One,
        StopBits::Two => tokio_serial::StopBits::Two,
    };
    log::debug!(
        "Serial port {path}: {} baud, {data_bits:?} data bits, {parity:?} parity, {stop_bits:?} stop bits",
        config.baud_rate
    );
    Ok(tokio_serial::new(path, config.baud_rate)
        .data_bits(data_bits)
        .parity(parity)
        .stop_bits(stop_bits))
}

/// Opens the serial port at `path`.
pub fn open(path: &str, config: &Config) -> io::Result<SerialStream> {
    let builder = builder(path, config)?;
    SerialStream::open(&builder).map_err(Into::into)
}

fn data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}
