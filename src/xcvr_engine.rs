// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transceiver management engine.
//!
//! The single background task's algorithms, expressed as free functions
//! over [`PortTable`] and the platform facade seams rather than as methods
//! on a task struct — an ordinary thread driving these functions, not a
//! dedicated supervised task.

use log::{debug, error, warn};

use crate::eeprom;
use crate::error::MgmtError;
use crate::platform::{BusKind, PhyDriver, PlatformFacade, SerdesApplier};
use crate::port_table::{
    EthMode, IntfType, ModBits, PortIndex, PortTable, CACHE_SIZE, MAX_CONFIG_RETRY,
    MAX_CONSECUTIVE_ERRORS, MAX_EEPROM_READ_RETRY,
};
use crate::trace::{Trace, Tracer};

/// SFF-8472 device-1 offsets written to switch a dual-rate SFP+ between 1G
/// and 10G.
const DEV1_RX_RATE_OFFSET: u8 = 110;
const DEV1_TX_RATE_OFFSET: u8 = 118;
const RATE_SELECT_1G: u8 = 0x00;
const RATE_SELECT_10G: u8 = 0x08;
const EEPROM_DEVICE1: u8 = 1;

/// A port's hardware-state bits that changed during one `update-state` pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ModStateChange {
    pub port: PortIndex,
    pub changed: ModBits,
}

/// Upward notification set composed from changed presence/signal bits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct XcvrSignals {
    pub modpres: bool,
    pub rxlos: bool,
    pub txfault: bool,
}

/// Read-and-validate-EEPROM.
///
/// `is_retry` selects the retry-path failure behavior: a first-attempt
/// failure arms the retry counter to [`MAX_EEPROM_READ_RETRY`] and leaves
/// it to the background sweep; a retry-attempt failure only decrements.
pub fn read_and_validate_eeprom<P: PlatformFacade>(
    table: &mut PortTable,
    platform: &P,
    port: PortIndex,
    is_retry: bool,
) -> Result<(), MgmtError> {
    let mut buf = vec![0u8; CACHE_SIZE];
    let result = platform.xcvr_eeprom_read(port, 0, 0, &mut buf);
    let rec = table.record_mut(port);

    match result {
        Ok(()) => {
            rec.eeprom = buf;
            rec.eeprom_base_valid = eeprom::is_base_csum_valid(&rec.eeprom);
            rec.eeprom_ext_valid = eeprom::is_ext_csum_valid(&rec.eeprom);
            rec.xcvr_type = eeprom::get_type(&rec.eeprom);
            rec.cable_length = eeprom::get_length(&rec.eeprom);
            rec.eeprom_read_retries = 0;
            rec.consecutive_errors = 0;
            Ok(())
        }
        Err(e) => {
            if is_retry {
                rec.eeprom_read_retries = rec.eeprom_read_retries.saturating_sub(1);
            } else {
                rec.eeprom_read_retries = MAX_EEPROM_READ_RETRY;
            }
            rec.xcvr_type = crate::eeprom::XcvrType::Unknown;
            Err(e.into())
        }
    }
}

/// Bumps a port's consecutive-I2C-error counter and administratively
/// disables it once [`MAX_CONSECUTIVE_ERRORS`] is reached.
fn record_i2c_error(
    table: &mut PortTable,
    tracer: &mut Tracer,
    port: PortIndex,
) -> bool {
    let rec = table.record_mut(port);
    if !rec.present || rec.disabled {
        return rec.disabled;
    }
    rec.consecutive_errors = rec.consecutive_errors.saturating_add(1);
    if rec.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
        rec.disabled = true;
        rec.eth_mode = EthMode::Disabled;
        tracer.push(Trace::PortDisabledByPolicy(port));
        true
    } else {
        false
    }
}

/// Configure-sfpp-xcvr.
pub fn configure_sfpp_xcvr<P: PlatformFacade, R: PhyDriver>(
    table: &mut PortTable,
    platform: &P,
    phy: &mut R,
    port: PortIndex,
) -> Result<(), MgmtError> {
    if !table.record(port).mod_state.contains(ModBits::ENABLE) {
        return Ok(());
    }

    let eth_mode = table.record(port).eth_mode;
    let eeprom = table.record(port).eeprom.clone();

    if eeprom::is_10g1g_dual_rate(&eeprom) {
        let rate = match eth_mode {
            EthMode::Disabled | EthMode::Sgmii | EthMode::OneGBaseX | EthMode::OneGBaseKx => {
                RATE_SELECT_1G
            }
            _ => RATE_SELECT_10G,
        };
        platform.xcvr_mem_write(port, EEPROM_DEVICE1, DEV1_RX_RATE_OFFSET, &[rate])?;
        platform.xcvr_mem_write(port, EEPROM_DEVICE1, DEV1_TX_RATE_OFFSET, &[rate])?;
    }

    if eeprom::is_1000base_t(&eeprom) {
        let desired_an = !matches!(eth_mode, EthMode::Disabled);
        if table.record(port).an_enabled != desired_an {
            phy.enable_1000baset_an(port, desired_an)
                .map_err(MgmtError::from)?;
            table.record_mut(port).an_enabled = desired_an;
        }
    }

    Ok(())
}

/// Update-SerDes.
pub fn update_serdes<S: SerdesApplier>(
    table: &PortTable,
    serdes: &mut S,
    port: PortIndex,
) -> Result<(), MgmtError> {
    let intf = table.config(port).intf_type;
    match intf {
        IntfType::Sfpp => {
            let eth_mode = table.record(port).eth_mode;
            serdes
                .apply_single_lane_tx_config(port, eth_mode)
                .map_err(MgmtError::from)
        }
        IntfType::QsfpLane0 => {
            if table.config(port).multilane_capable {
                serdes.apply_multi_lane_tx_config(port).map_err(MgmtError::from)
            } else {
                let epl = table.config(port).epl;
                for lane_port in table.lanes_of(epl).into_iter().flatten() {
                    let eth_mode = table.record(lane_port).eth_mode;
                    serdes
                        .apply_single_lane_tx_config(lane_port, eth_mode)
                        .map_err(MgmtError::from)?;
                }
                Ok(())
            }
        }
        _ => Ok(()),
    }
}

/// Retry-eeprom-read sweep.
pub fn retry_eeprom_read_sweep<P: PlatformFacade, S: SerdesApplier>(
    table: &mut PortTable,
    platform: &P,
    serdes: &mut S,
) {
    let candidates: Vec<PortIndex> = table
        .indices()
        .filter(|&p| table.record(p).eeprom_read_retries > 0)
        .collect();
    for port in candidates {
        if read_and_validate_eeprom(table, platform, port, true).is_ok() {
            let _ = update_serdes(table, serdes, port);
        }
    }
}

/// Retry-config sweep.
///
/// Guarded by `eeprom_base_valid` rather than a generic I2C-write-capability
/// check: the condition the algorithm actually needs is a validated base-ID
/// EEPROM on an SFP+ port, not merely that some write primitive exists
/// (see DESIGN.md).
pub fn retry_config_sweep<P: PlatformFacade, R: PhyDriver>(
    table: &mut PortTable,
    platform: &P,
    phy: &mut R,
    tracer: &mut Tracer,
) {
    let candidates: Vec<PortIndex> = table
        .indices()
        .filter(|&p| {
            table.config(p).intf_type == IntfType::Sfpp
                && table.record(p).eeprom_base_valid
                && table.record(p).config_retries > 0
        })
        .collect();

    for port in candidates {
        table.record_mut(port).config_retries =
            table.record(port).config_retries.saturating_sub(1);
        match configure_sfpp_xcvr(table, platform, phy, port) {
            Ok(()) => table.record_mut(port).config_retries = 0,
            Err(e) => {
                record_i2c_error(table, tracer, port);
                if table.record(port).config_retries == 0 {
                    error!(
                        target: "xcvr_mgmt::mod_state",
                        "port {}: configure_sfpp_xcvr retries exhausted: {e}",
                        table.config(port).port_id
                    );
                    tracer.push(Trace::ConfigRetryExhausted(port));
                }
            }
        }
    }
}

/// Update-state. Returns the set of ports whose hardware
/// state changed and which bits changed, for diagnostics/tests.
#[allow(clippy::too_many_arguments)]
pub fn update_state<P, S, R, Ev>(
    table: &mut PortTable,
    platform: &P,
    serdes: &mut S,
    phy: &mut R,
    events: &mut Ev,
    tracer: &mut Tracer,
    interrupt: bool,
) -> Vec<ModStateChange>
where
    P: PlatformFacade,
    S: SerdesApplier,
    R: PhyDriver,
    Ev: crate::platform::EventSink,
{
    let candidates = candidate_ports(table, platform, interrupt);
    if candidates.is_empty() {
        return Vec::new();
    }

    let hw_res_ids: Vec<u32> = candidates
        .iter()
        .map(|&p| table.config(p).hw_resource_id)
        .collect();

    if let Some(&first) = hw_res_ids.first() {
        if let Err(e) = platform.select_bus(BusKind::Qsfp, first) {
            warn!(target: "xcvr_mgmt::mod_state", "select_bus failed: {e:?}");
        }
    }

    let states = match platform.get_port_xcvr_state(&hw_res_ids) {
        Ok(s) => s,
        Err(e) => {
            warn!(target: "xcvr_mgmt::mod_state", "get_port_xcvr_state failed: {e:?}");
            return Vec::new();
        }
    };

    let mut changes = Vec::new();
    for (port, hw) in candidates.into_iter().zip(states.into_iter()) {
        let old = table.record(port).mod_state;
        let changed = old.xor(hw.state).and(hw.valid);
        let mut notify = false;

        if changed.contains(ModBits::PRESENT) {
            let now_present = hw.state.contains(ModBits::PRESENT);
            let rec = table.record_mut(port);
            rec.present = now_present;
            rec.reset_eeprom_state();
            if !now_present && rec.disabled {
                rec.disabled = false;
                tracer.push(Trace::PortClearedByPolicy(port));
            }
            notify = true;
        }
        if changed.contains(ModBits::ENABLE) {
            let rec = table.record_mut(port);
            rec.an_enabled = false;
            rec.config_retries = 0;
            notify = true;
        }
        if changed.contains(ModBits::RXLOS) || changed.contains(ModBits::TXFAULT) {
            notify = true;
        }
        if changed.contains(ModBits::INTR) {
            debug!(target: "xcvr_mgmt::mod_intr", "port {}: INTR bit observed", table.config(port).port_id);
        }

        if !changed.is_empty() {
            let merged = old.and(hw.valid.not()).or(hw.state.and(hw.valid));
            table.record_mut(port).mod_state = merged;
            changes.push(ModStateChange { port, changed });
        }

        let present_enabled = table.record(port).present
            && table.record(port).mod_state.contains(ModBits::ENABLE);
        if notify && present_enabled {
            if read_and_validate_eeprom(table, platform, port, false).is_ok() {
                let _ = update_serdes(table, serdes, port);
                table.record_mut(port).config_retries = MAX_CONFIG_RETRY;
                if configure_sfpp_xcvr(table, platform, phy, port).is_ok() {
                    table.record_mut(port).config_retries = 0;
                } else {
                    record_i2c_error(table, tracer, port);
                }
            }
        }

        if notify {
            emit_xcvr_change(table, events, port);
        }
    }

    changes
}

fn candidate_ports<P: PlatformFacade>(
    table: &PortTable,
    platform: &P,
    interrupt: bool,
) -> Vec<PortIndex> {
    if interrupt {
        match platform.get_port_intr_pending(table.len()) {
            Ok(ids) => ids
                .into_iter()
                .filter_map(|id| {
                    let found = table.index_of_hw_resource(id);
                    if found.is_none() {
                        debug!(target: "xcvr_mgmt::mod_intr", "pending hw_res_id {id} has no owning port");
                    }
                    found
                })
                .collect(),
            Err(_) => Vec::new(),
        }
    } else {
        table
            .indices()
            .filter(|&p| {
                matches!(
                    table.config(p).intf_type,
                    IntfType::Sfpp | IntfType::QsfpLane0
                )
            })
            .collect()
    }
}

fn emit_xcvr_change<Ev: crate::platform::EventSink>(
    table: &PortTable,
    events: &mut Ev,
    port: PortIndex,
) {
    let rec = table.record(port);
    let signals = XcvrSignals {
        modpres: rec.mod_state.contains(ModBits::PRESENT),
        rxlos: rec.mod_state.contains(ModBits::RXLOS),
        txfault: rec.mod_state.contains(ModBits::TXFAULT),
    };

    let notify_port = |events: &mut Ev, p: PortIndex| {
        if table.record(p).eth_mode != EthMode::Disabled {
            events.notify_xcvr_change(p, signals.modpres, signals.rxlos, signals.txfault);
        }
    };

    match table.config(port).intf_type {
        IntfType::QsfpLane0 if !table.config(port).multilane_capable => {
            for lane_port in table.lanes_of(table.config(port).epl).into_iter().flatten() {
                notify_port(events, lane_port);
            }
        }
        IntfType::QsfpLane0 => {
            // Multi-lane mode: one logical port spans all four lanes, so the
            // upward notification fires once per lane index 0..3, each on
            // this lane-0 port.
            for _lane in 0..4u8 {
                notify_port(events, port);
            }
        }
        _ => notify_port(events, port),
    }
    events.xcvr_state_event(port);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::an::AbilityMask;
    use crate::platform::{PlatformError, PortHwState};
    use crate::port_table::{EplId, Lane, PortConfig};

    struct FakePlatform {
        states: Vec<PortHwState>,
        eeprom_bytes: Vec<u8>,
        fail_eeprom: bool,
    }

    impl PlatformFacade for FakePlatform {
        fn select_bus(&self, _b: BusKind, _id: u32) -> Result<(), PlatformError> {
            Ok(())
        }
        fn get_port_xcvr_state(
            &self,
            hw_res_ids: &[u32],
        ) -> Result<Vec<PortHwState>, PlatformError> {
            Ok(hw_res_ids.iter().map(|_| self.states[0]).collect())
        }
        fn xcvr_eeprom_read(
            &self,
            _port: PortIndex,
            _dev: u8,
            _reg: u8,
            buf: &mut [u8],
        ) -> Result<(), PlatformError> {
            if self.fail_eeprom {
                return Err(PlatformError::I2cTimeout);
            }
            buf[..self.eeprom_bytes.len()].copy_from_slice(&self.eeprom_bytes);
            Ok(())
        }
        fn xcvr_mem_write(
            &self,
            _port: PortIndex,
            _dev: u8,
            _reg: u8,
            _bytes: &[u8],
        ) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    struct NoopSerdes;
    impl SerdesApplier for NoopSerdes {
        fn apply_single_lane_tx_config(
            &mut self,
            _port: PortIndex,
            _eth_mode: EthMode,
        ) -> Result<(), PlatformError> {
            Ok(())
        }
        fn apply_multi_lane_tx_config(&mut self, _port: PortIndex) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    struct NoopPhy;
    impl PhyDriver for NoopPhy {
        fn enable_1000baset_an(
            &mut self,
            _port: PortIndex,
            _enable: bool,
        ) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    struct RecordingEvents {
        changes: Vec<PortIndex>,
    }
    impl crate::platform::EventSink for RecordingEvents {
        fn notify_xcvr_change(&mut self, port: PortIndex, _m: bool, _r: bool, _t: bool) {
            self.changes.push(port);
        }
        fn xcvr_state_event(&mut self, _port: PortIndex) {}
        fn xcvr_disabled_event(&mut self, _port: PortIndex) {}
    }

    fn one_sfpp_table() -> PortTable {
        PortTable::new(vec![PortConfig {
            port_id: 0,
            intf_type: IntfType::Sfpp,
            epl: EplId(0),
            lane: Lane(0),
            hw_resource_id: 0,
            declared_capabilities: AbilityMask::SUPPORTED,
            initial_eth_mode: EthMode::OneGBaseX,
            multilane_capable: false,
        }])
    }

    #[test]
    fn present_transition_resets_eeprom_and_notifies() {
        let mut table = one_sfpp_table();
        let platform = FakePlatform {
            states: vec![PortHwState {
                valid: ModBits::PRESENT.or(ModBits::ENABLE),
                state: ModBits::PRESENT.or(ModBits::ENABLE),
            }],
            eeprom_bytes: vec![0xFFu8; CACHE_SIZE],
            fail_eeprom: true,
        };
        let mut serdes = NoopSerdes;
        let mut phy = NoopPhy;
        let mut events = RecordingEvents { changes: vec![] };
        let mut tracer = Tracer::default();

        let changes = update_state(
            &mut table, &platform, &mut serdes, &mut phy, &mut events, &mut tracer, false,
        );

        assert_eq!(changes.len(), 1);
        assert!(changes[0].changed.contains(ModBits::PRESENT));
        assert!(table.record(PortIndex(0)).present);
        // eeprom_read_retries armed because the fake facade fails the read.
        assert_eq!(
            table.record(PortIndex(0)).eeprom_read_retries,
            MAX_EEPROM_READ_RETRY
        );
    }

    #[test]
    fn dual_rate_sfp_writes_both_rate_offsets() {
        let mut table = one_sfpp_table();
        table.record_mut(PortIndex(0)).present = true;
        table.record_mut(PortIndex(0)).mod_state = ModBits::PRESENT.or(ModBits::ENABLE);
        table.record_mut(PortIndex(0)).eth_mode = EthMode::TenGBaseKr;

        let mut eeprom = vec![0u8; CACHE_SIZE];
        eeprom[6] = 1 << 4; // 1000BASE-T bit
        eeprom[3] = 1 << 4; // 10G SR bit -> dual rate with the 1G bit above
        table.record_mut(PortIndex(0)).eeprom = eeprom;

        let platform = FakePlatform {
            states: vec![],
            eeprom_bytes: vec![],
            fail_eeprom: false,
        };
        let mut phy = NoopPhy;
        assert!(configure_sfpp_xcvr(&mut table, &platform, &mut phy, PortIndex(0)).is_ok());
    }

    #[test]
    fn consecutive_errors_disable_port_after_threshold() {
        let mut table = one_sfpp_table();
        table.record_mut(PortIndex(0)).present = true;
        let mut tracer = Tracer::default();
        for _ in 0..MAX_CONSECUTIVE_ERRORS {
            record_i2c_error(&mut table, &mut tracer, PortIndex(0));
        }
        assert!(table.record(PortIndex(0)).disabled);
    }
}
