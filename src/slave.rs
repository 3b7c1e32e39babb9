// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Addressing of serial line devices

use std::fmt;

/// Raw address of a Modbus slave device.
pub type SlaveId = u8;

/// A single byte for addressing Modbus slave devices.
///
/// Every serial line frame starts with this address, both in
/// requests and in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slave(pub SlaveId);

impl Slave {
    /// The special address for sending a broadcast message to all
    /// connected Modbus slave devices at once.
    ///
    /// Broadcast messages are never answered.
    #[must_use]
    pub const fn broadcast() -> Self {
        Slave(0)
    }

    /// The minimum address of a single Modbus slave device.
    #[must_use]
    pub const fn min_device() -> Self {
        Slave(1)
    }

    /// The maximum address of a single Modbus slave device.
    #[must_use]
    pub const fn max_device() -> Self {
        Slave(247)
    }

    #[must_use]
    pub fn is_broadcast(self) -> bool {
        self == Self::broadcast()
    }

    #[must_use]
    pub fn is_single_device(self) -> bool {
        self >= Self::min_device() && self <= Self::max_device()
    }

    /// Addresses 248 to 255 are reserved.
    #[must_use]
    pub fn is_reserved(self) -> bool {
        self > Self::max_device()
    }
}

impl From<SlaveId> for Slave {
    fn from(from: SlaveId) -> Self {
        Slave(from)
    }
}

impl From<Slave> for SlaveId {
    fn from(from: Slave) -> Self {
        from.0
    }
}

impl fmt::Display for Slave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:0>2X})", self.0, self.0)
    }
}

/// Selects the device that subsequent requests are addressed to.
pub trait SlaveContext {
    /// Select a slave device for all subsequent outgoing requests.
    fn set_slave(&mut self, slave: Slave);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_ranges() {
        assert!(Slave(0).is_broadcast());
        assert!(!Slave(0).is_single_device());
        assert!(Slave(1).is_single_device());
        assert!(Slave(247).is_single_device());
        assert!(!Slave(247).is_reserved());
        assert!(Slave(248).is_reserved());
        assert!(!Slave(255).is_single_device());
    }

    #[test]
    fn format() {
        assert_eq!(Slave(0x11).to_string(), "17 (0x11)");
        assert_eq!(Slave(0).to_string(), "0 (0x00)");
    }
}
