// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error taxonomy for the transceiver / autonegotiation management core.
//!
//! A flat, `Copy`-able error enum with `From` impls bridging lower layers,
//! rather than a generic boxed error.

use core::fmt;

use crate::platform::PlatformError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MgmtError {
    NoMem,
    InvalidArgument,
    InvalidPort,
    InvalidSwitch,
    /// Carries the offending ability bit, if known, for diagnostics.
    Unsupported,
    NotFound,
    NoFreeResources,
    StateMachineHandle,
    StateMachineType,
    I2cBusFailure,
    ChecksumInvalid,
}

impl fmt::Display for MgmtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MgmtError::NoMem => "out of memory",
            MgmtError::InvalidArgument => "invalid argument",
            MgmtError::InvalidPort => "invalid port index",
            MgmtError::InvalidSwitch => "invalid switch handle",
            MgmtError::Unsupported => "unsupported ability or configuration",
            MgmtError::NotFound => "not found",
            MgmtError::NoFreeResources => "no free resources",
            MgmtError::StateMachineHandle => "invalid state machine handle",
            MgmtError::StateMachineType => "state machine type mismatch",
            MgmtError::I2cBusFailure => "i2c bus failure",
            MgmtError::ChecksumInvalid => "eeprom checksum invalid",
        };
        f.write_str(s)
    }
}

impl std::error::Error for MgmtError {}

impl From<PlatformError> for MgmtError {
    fn from(e: PlatformError) -> Self {
        match e {
            PlatformError::I2cNack
            | PlatformError::I2cTimeout
            | PlatformError::BusSelectFailed => MgmtError::I2cBusFailure,
            PlatformError::NotSupported => MgmtError::Unsupported,
            PlatformError::InvalidPort => MgmtError::InvalidPort,
        }
    }
}
