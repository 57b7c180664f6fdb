// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transceiver state table — the per-port config and per-port-index
//! records.
//!
//! Per-port records are reached through plain index handles into arrays
//! owned by the switch, rather than pointers or global macros.

use crate::an::sm::AnRuntimeState;
use crate::an::{AbilityMask, AnMode, BasePage, NextPageWord};
use crate::eeprom::XcvrType;

/// Number of EEPROM bytes cached per port.
/// SFF-8472 lower + upper memory pages, enough for identification fields,
/// the base checksum, and the extended-ID checksum.
pub const CACHE_SIZE: usize = 256;

pub const MAX_EEPROM_READ_RETRY: u8 = 4;
pub const MAX_CONFIG_RETRY: u8 = 4;

/// Maximum number of consecutive I2C failures tolerated on an otherwise
/// present, enabled port before it is administratively disabled.
pub const MAX_CONSECUTIVE_ERRORS: u8 = 3;

/// Index into the per-switch port arrays. Not a pointer: indices are the
/// only handle to a port's records.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortIndex(pub usize);

/// An EPL (Ethernet Port Logic) block groups four SerDes lanes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EplId(pub u8);

/// A lane within an EPL, 0..=3.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Lane(pub u8);

/// The physical form factor / fan-out role a port-index plays.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IntfType {
    Sfpp,
    /// QSFP lane 0 owns the EEPROM cache and SerDes config for the module;
    /// lanes 1..3 redirect EEPROM queries to it.
    QsfpLane0,
    QsfpLane1,
    QsfpLane2,
    QsfpLane3,
    Other,
}

impl IntfType {
    pub fn is_qsfp(self) -> bool {
        matches!(
            self,
            IntfType::QsfpLane0
                | IntfType::QsfpLane1
                | IntfType::QsfpLane2
                | IntfType::QsfpLane3
        )
    }
}

/// Module hardware-signal bitset.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ModBits(pub u8);

impl ModBits {
    pub const PRESENT: ModBits = ModBits(1 << 0);
    pub const ENABLE: ModBits = ModBits(1 << 1);
    pub const RXLOS: ModBits = ModBits(1 << 2);
    pub const TXFAULT: ModBits = ModBits(1 << 3);
    pub const INTR: ModBits = ModBits(1 << 4);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, bit: ModBits) -> bool {
        (self.0 & bit.0) != 0
    }

    pub const fn set(self, bit: ModBits) -> Self {
        Self(self.0 | bit.0)
    }

    pub const fn clear(self, bit: ModBits) -> Self {
        Self(self.0 & !bit.0)
    }

    pub const fn xor(self, other: ModBits) -> Self {
        Self(self.0 ^ other.0)
    }

    pub const fn and(self, other: ModBits) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn or(self, other: ModBits) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn not(self) -> Self {
        Self(!self.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl core::ops::BitOr for ModBits {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Ethernet mode, both administratively-set and AN-derived (HCD outcomes).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EthMode {
    Disabled,
    Sgmii,
    /// 1000BASE-X, the fiber/SFP Clause 37 mode.
    OneGBaseX,
    /// Administrative request: negotiate over Clause 73.
    An73,
    /// 1000BASE-KX, the Clause 73 HCD outcome for KX.
    OneGBaseKx,
    TenGBaseKr,
    TwentyFiveGBaseKr,
    TwentyFiveGBaseCr,
    FortyGBaseKr4,
    FortyGBaseCr4,
    HundredGBaseKr4,
    HundredGBaseCr4,
}

/// Immutable per-session port configuration.
#[derive(Clone, Debug)]
pub struct PortConfig {
    pub port_id: u32,
    pub intf_type: IntfType,
    pub epl: EplId,
    pub lane: Lane,
    pub hw_resource_id: u32,
    pub declared_capabilities: AbilityMask,
    pub initial_eth_mode: EthMode,
    /// Whether this port's EPL can run 40G/100G quad-lane modes; used by
    /// the HCD picker to synthesize a supported-ability mask when the base
    /// page is absent.
    pub multilane_capable: bool,
}

/// Per-port-index transceiver record.
#[derive(Clone, Debug)]
pub struct TransceiverRecord {
    pub mod_state: ModBits,
    pub present: bool,
    pub eth_mode: EthMode,
    pub an_enabled: bool,
    pub xcvr_type: XcvrType,
    pub cable_length: u16,
    pub eeprom: Vec<u8>,
    pub eeprom_base_valid: bool,
    pub eeprom_ext_valid: bool,
    pub eeprom_read_retries: u8,
    pub config_retries: u8,
    pub disabled: bool,
    pub consecutive_errors: u8,
}

impl TransceiverRecord {
    pub fn absent(initial_eth_mode: EthMode) -> Self {
        Self {
            mod_state: ModBits::empty(),
            present: false,
            eth_mode: initial_eth_mode,
            an_enabled: false,
            xcvr_type: XcvrType::NotPresent,
            cable_length: 0,
            eeprom: vec![0xFF; CACHE_SIZE],
            eeprom_base_valid: false,
            eeprom_ext_valid: false,
            eeprom_read_retries: 0,
            config_retries: 0,
            disabled: false,
            consecutive_errors: 0,
        }
    }

    /// Wipes downstream state on a PRESENT -> !PRESENT transition, or on an
    /// absence->presence reset.
    pub fn reset_eeprom_state(&mut self) {
        self.eeprom.iter_mut().for_each(|b| *b = 0xFF);
        self.xcvr_type = XcvrType::NotPresent;
        self.cable_length = 0;
        self.eeprom_base_valid = false;
        self.eeprom_ext_valid = false;
        self.eeprom_read_retries = 0;
        self.config_retries = 0;
    }

    /// Checks the presence/EEPROM-validity consistency invariants at sweep
    /// boundaries; also available to callers for diagnostics.
    pub fn check_invariants(&self) -> bool {
        let presence_ok = if !self.present {
            self.eeprom.iter().all(|&b| b == 0xFF)
                && self.xcvr_type == XcvrType::NotPresent
                && self.cable_length == 0
        } else {
            true
        };
        let checksum_ok =
            !self.eeprom_base_valid || self.xcvr_type != XcvrType::Unknown;
        presence_ok && checksum_ok
    }
}

/// AN port extension.
#[derive(Clone, Debug)]
pub struct AnPortExt {
    pub an_runtime: AnRuntimeState,
    pub an_interrupt_mask: u32,
    pub base_page: BasePage,
    pub next_pages: Vec<NextPageWord>,
    pub autoneg_mode: AnMode,
    pub partner_next_pages: Vec<NextPageWord>,
    pub negotiated_eee_enabled: bool,
    pub ignore_nonce_match: bool,
    pub link_fail_inhibit_ms: Option<u32>,
}

impl Default for AnPortExt {
    fn default() -> Self {
        Self {
            an_runtime: AnRuntimeState::stopped(),
            an_interrupt_mask: 0,
            base_page: BasePage(0),
            next_pages: Vec::new(),
            autoneg_mode: AnMode::Clause37,
            partner_next_pages: Vec::new(),
            negotiated_eee_enabled: false,
            ignore_nonce_match: false,
            link_fail_inhibit_ms: None,
        }
    }
}

/// Owns every port's config + mutable records, indexed by [`PortIndex`].
pub struct PortTable {
    configs: Vec<PortConfig>,
    records: Vec<TransceiverRecord>,
    an_ext: Vec<AnPortExt>,
}

impl PortTable {
    pub fn new(configs: Vec<PortConfig>) -> Self {
        let records = configs
            .iter()
            .map(|c| TransceiverRecord::absent(c.initial_eth_mode))
            .collect();
        let an_ext = configs.iter().map(|_| AnPortExt::default()).collect();
        Self {
            configs,
            records,
            an_ext,
        }
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn indices(&self) -> impl Iterator<Item = PortIndex> + '_ {
        (0..self.configs.len()).map(PortIndex)
    }

    pub fn config(&self, idx: PortIndex) -> &PortConfig {
        &self.configs[idx.0]
    }

    pub fn record(&self, idx: PortIndex) -> &TransceiverRecord {
        &self.records[idx.0]
    }

    pub fn record_mut(&mut self, idx: PortIndex) -> &mut TransceiverRecord {
        &mut self.records[idx.0]
    }

    pub fn an(&self, idx: PortIndex) -> &AnPortExt {
        &self.an_ext[idx.0]
    }

    pub fn an_mut(&mut self, idx: PortIndex) -> &mut AnPortExt {
        &mut self.an_ext[idx.0]
    }

    /// Finds the port index by its `hw_resource_id`, the facade's addressing
    /// scheme. Returns `None` if no port owns that resource id.
    pub fn index_of_hw_resource(&self, hw_res_id: u32) -> Option<PortIndex> {
        self.configs
            .iter()
            .position(|c| c.hw_resource_id == hw_res_id)
            .map(PortIndex)
    }

    /// Redirects QSFP lanes 1..3 to the lane-0 port index that owns the
    /// EEPROM cache.
    pub fn eeprom_owner(&self, idx: PortIndex) -> PortIndex {
        match self.configs[idx.0].intf_type {
            IntfType::QsfpLane1
            | IntfType::QsfpLane2
            | IntfType::QsfpLane3 => self
                .lanes_of(self.configs[idx.0].epl)
                .into_iter()
                .flatten()
                .find(|&p| self.configs[p.0].intf_type == IntfType::QsfpLane0)
                .unwrap_or(idx),
            _ => idx,
        }
    }

    /// The EPL-lane-to-port-index map: for a given EPL, the
    /// port index owning each of its four lanes, if any port is configured
    /// there.
    pub fn lanes_of(&self, epl: EplId) -> [Option<PortIndex>; 4] {
        let mut out = [None; 4];
        for (i, c) in self.configs.iter().enumerate() {
            if c.epl == epl && (c.lane.0 as usize) < 4 {
                out[c.lane.0 as usize] = Some(PortIndex(i));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(port_id: u32, intf: IntfType, epl: u8, lane: u8) -> PortConfig {
        PortConfig {
            port_id,
            intf_type: intf,
            epl: EplId(epl),
            lane: Lane(lane),
            hw_resource_id: port_id,
            declared_capabilities: AbilityMask::empty(),
            initial_eth_mode: EthMode::Disabled,
            multilane_capable: false,
        }
    }

    #[test]
    fn absent_port_satisfies_invariants() {
        let rec = TransceiverRecord::absent(EthMode::Disabled);
        assert!(rec.check_invariants());
    }

    #[test]
    fn eeprom_owner_redirects_lanes_1_to_3() {
        let configs = vec![
            cfg(0, IntfType::QsfpLane0, 3, 0),
            cfg(1, IntfType::QsfpLane1, 3, 1),
            cfg(2, IntfType::QsfpLane2, 3, 2),
            cfg(3, IntfType::QsfpLane3, 3, 3),
        ];
        let table = PortTable::new(configs);
        assert_eq!(table.eeprom_owner(PortIndex(1)), PortIndex(0));
        assert_eq!(table.eeprom_owner(PortIndex(2)), PortIndex(0));
        assert_eq!(table.eeprom_owner(PortIndex(0)), PortIndex(0));
    }

    #[test]
    fn lanes_of_maps_fixed_array() {
        let configs = vec![
            cfg(0, IntfType::QsfpLane0, 5, 0),
            cfg(1, IntfType::QsfpLane1, 5, 1),
        ];
        let table = PortTable::new(configs);
        let lanes = table.lanes_of(EplId(5));
        assert_eq!(lanes[0], Some(PortIndex(0)));
        assert_eq!(lanes[1], Some(PortIndex(1)));
        assert_eq!(lanes[2], None);
        assert_eq!(lanes[3], None);
    }
}
