// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session configuration

use std::time::Duration;

/// Default baud rate of a serial line session.
pub const DEFAULT_BAUD_RATE: u32 = 19_200;

/// Default time to wait for a response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Serial line transmission mode.
///
/// The mode selects the frame syntax, the checksum algorithm and the
/// character width of the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Binary frames protected by a CRC-16.
    #[default]
    Rtu,
    /// Hex encoded text frames protected by an LRC.
    Ascii,
}

impl Mode {
    /// Number of data bits per character.
    #[must_use]
    pub const fn data_bits(self) -> u8 {
        match self {
            Self::Rtu => 8,
            Self::Ascii => 7,
        }
    }

    #[must_use]
    pub const fn is_rtu(self) -> bool {
        matches!(self, Self::Rtu)
    }
}

/// Parity scheme of the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Parity {
    None,
    Odd,
    #[default]
    Even,
    /// The parity bit is always set.
    Mark,
    /// The parity bit is always cleared.
    Space,
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StopBits {
    #[default]
    One,
    Two,
}

/// How to treat a response whose checksum does not match its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChecksumPolicy {
    /// Log a warning and decode the frame anyway.
    ///
    /// The mismatch is still reported in [`crate::Reply::checksum`].
    #[default]
    Warn,
    /// Fail the exchange with [`crate::ProtocolError::ChecksumMismatch`].
    Reject,
}

/// Settings of a single client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: Mode,
    pub baud_rate: u32,
    pub stop_bits: StopBits,
    pub parity: Parity,
    /// Maximum time to wait for a response, `None` waits forever.
    pub timeout: Option<Duration>,
    pub checksum_policy: ChecksumPolicy,
    /// Log a summary of every decoded response.
    pub verbose: bool,
    /// Log the raw frames that are sent and received.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            baud_rate: DEFAULT_BAUD_RATE,
            stop_bits: StopBits::default(),
            parity: Parity::default(),
            timeout: Some(DEFAULT_TIMEOUT),
            checksum_policy: ChecksumPolicy::default(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    #[must_use]
    pub fn rtu() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ascii() -> Self {
        Self {
            mode: Mode::Ascii,
            ..Default::default()
        }
    }

    #[must_use]
    pub const fn data_bits(&self) -> u8 {
        self.mode.data_bits()
    }

    /// Whether bit 7 of every ASCII character carries an emulated
    /// mark (`Some(true)`) or space (`Some(false)`) parity bit.
    ///
    /// The serial driver only supports none/odd/even, so for 7 bit
    /// characters the line is opened with 8 data bits and the most
    /// significant bit acts as parity bit.
    #[must_use]
    pub const fn emulated_parity_bit(&self) -> Option<bool> {
        match (self.mode, self.parity) {
            (Mode::Ascii, Parity::Mark) => Some(true),
            (Mode::Ascii, Parity::Space) => Some(false),
            _ => None,
        }
    }
}

/// Changes the settings of a session between calls.
pub trait SessionContext {
    /// The current settings.
    fn config(&self) -> &Config;

    /// Switches between RTU and ASCII framing for all subsequent calls.
    ///
    /// The character width of an already opened serial port is not
    /// changed.
    fn set_mode(&mut self, mode: Mode);

    fn is_rtu(&self) -> bool {
        self.config().mode.is_rtu()
    }

    fn set_parity(&mut self, parity: Parity);

    fn set_verbose(&mut self, verbose: bool);

    fn set_debug(&mut self, debug: bool);

    fn set_timeout(&mut self, timeout: Option<Duration>);

    fn set_checksum_policy(&mut self, checksum_policy: ChecksumPolicy);
}
