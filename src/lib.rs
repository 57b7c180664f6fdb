// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transceiver management and Clause 37 / Clause 73 autonegotiation core
//! for a high-radix Ethernet switch device driver.
//!
//! This crate owns the per-port transceiver and autonegotiation state
//! ([`port_table`]), the SFF-8472/SFF-8436 EEPROM codec ([`eeprom`]), the
//! background management engine ([`xcvr_engine`]), and the Clause 37/73
//! autonegotiation components ([`an`]). Hardware access, the PHY driver,
//! the SerDes TX-equalization table, and switch registers are reached only
//! through the seam traits in [`platform`] — this crate never talks to
//! hardware directly.

pub mod an;
pub mod api;
pub mod config;
pub mod eeprom;
pub mod error;
pub mod platform;
pub mod port_table;
pub mod trace;
pub mod xcvr_engine;

pub use api::{PortDump, SwitchMgmt};
pub use config::MgmtConfig;
pub use error::MgmtError;
