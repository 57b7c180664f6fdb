// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Upward API: the entry points a caller outside this crate
//! (an interrupt handler, a polling thread, a management-plane RPC server)
//! drives. [`SwitchMgmt`] owns the port table, the platform facade and its
//! sibling collaborator traits, runtime config, and the trace ring buffer,
//! generic over the facade implementations rather than naming concrete
//! transport clients.

use log::info;

use crate::an::hcd::{self, LaneMode};
use crate::an::sm::{AnConfigEvent, AnEventSink, AnState};
use crate::an::{restart, timer, validate, AnMode, BasePage, NextPageWord};
use crate::config::MgmtConfig;
use crate::eeprom::XcvrType;
use crate::error::MgmtError;
use crate::platform::{EventSink, PhyDriver, PlatformFacade, RegisterAccess, SerdesApplier};
use crate::port_table::{EthMode, ModBits, PortConfig, PortIndex, PortTable};
use crate::trace::{Trace, Tracer};
use crate::xcvr_engine;

/// Hardware count-field width for the Clause 73 link-fail-inhibit timer.
const LINK_FAIL_INHIBIT_MAX_COUNT: u64 = 1024;

/// A structured diagnostic snapshot of one port.
#[derive(Clone, Debug)]
pub struct PortDump {
    pub port_id: u32,
    pub present: bool,
    pub disabled: bool,
    pub eth_mode: EthMode,
    pub xcvr_type: XcvrType,
    pub cable_length: u16,
    pub mod_state: ModBits,
    pub consecutive_errors: u8,
    pub an_sm_type: crate::an::SmType,
    pub an_state: AnState,
    pub negotiated_eee_enabled: bool,
}

/// The transceiver management + autonegotiation core.
///
/// Generic over the platform facade and its sibling external-collaborator
/// traits so callers supply their own board support layer; `Ev` is the event sink
/// upward notifications are delivered through.
pub struct SwitchMgmt<P, R, S, Ev> {
    table: PortTable,
    platform: P,
    phy: R,
    serdes: S,
    events: Ev,
    config: MgmtConfig,
    tracer: Tracer,
    enable_mgmt: bool,
}

impl<P, R, S, Ev> SwitchMgmt<P, R, S, Ev>
where
    P: PlatformFacade,
    R: PhyDriver,
    S: SerdesApplier,
    Ev: EventSink,
{
    /// `mgmt_init`: builds the port table from static config.
    pub fn mgmt_init(
        configs: Vec<PortConfig>,
        platform: P,
        phy: R,
        serdes: S,
        events: Ev,
        config: MgmtConfig,
    ) -> Self {
        Self {
            table: PortTable::new(configs),
            platform,
            phy,
            serdes,
            events,
            config,
            tracer: Tracer::default(),
            enable_mgmt: false,
        }
    }

    /// `mgmt_xcvr_initialize`: per-port GPIO direction setup
    /// ahead of interrupt-driven operation.
    pub fn mgmt_xcvr_initialize(&mut self) -> Result<(), MgmtError> {
        if let Some(gpio) = self.config.gpio_port_intr {
            self.platform.gpio_set_dir(gpio, false)?;
        }
        Ok(())
    }

    /// `mgmt_enable_interrupt`: unmasks the interrupt and runs
    /// one forced update sweep before `enable_mgmt` is set.
    pub fn mgmt_enable_interrupt(&mut self) -> Result<(), MgmtError> {
        if let Some(gpio) = self.config.gpio_port_intr {
            self.platform.gpio_unmask_intr(gpio)?;
        }
        xcvr_engine::update_state(
            &mut self.table,
            &self.platform,
            &mut self.serdes,
            &mut self.phy,
            &mut self.events,
            &mut self.tracer,
            false,
        );
        self.enable_mgmt = true;
        Ok(())
    }

    /// `mgmt_signal_interrupt`: runs `update-state`
    /// for an interrupt-originated wakeup.
    pub fn mgmt_signal_interrupt(&mut self) {
        if !self.enable_mgmt {
            return;
        }
        xcvr_engine::update_state(
            &mut self.table,
            &self.platform,
            &mut self.serdes,
            &mut self.phy,
            &mut self.events,
            &mut self.tracer,
            true,
        );
    }

    /// `mgmt_signal_polling_thread`: runs the
    /// retry-eeprom-read and retry-config sweeps.
    pub fn mgmt_signal_polling_thread(&mut self) {
        if !self.enable_mgmt {
            return;
        }
        xcvr_engine::retry_eeprom_read_sweep(&mut self.table, &self.platform, &mut self.serdes);
        xcvr_engine::retry_config_sweep(
            &mut self.table,
            &self.platform,
            &mut self.phy,
            &mut self.tracer,
        );
    }

    /// `mgmt_get_transceiver_type`: resolves QSFP lane
    /// redirection before returning the cached type.
    pub fn mgmt_get_transceiver_type(&self, port: PortIndex) -> XcvrType {
        let owner = self.table.eeprom_owner(port);
        self.table.record(owner).xcvr_type
    }

    /// `mgmt_notify_eth_mode_change`: administrative request to
    /// change a port's ethernet mode, chaining into an AN restart when the
    /// mode implies autonegotiation.
    pub fn mgmt_notify_eth_mode_change(
        &mut self,
        port: PortIndex,
        eth_mode: EthMode,
    ) -> Result<(), MgmtError> {
        self.table.record_mut(port).eth_mode = eth_mode;
        let an_mode = match eth_mode {
            EthMode::An73 => AnMode::Clause73,
            EthMode::Sgmii => AnMode::Sgmii,
            EthMode::OneGBaseX => AnMode::Clause37,
            _ => return Ok(()),
        };
        self.an_restart_on_new_config(port, eth_mode, an_mode, BasePage(0), Vec::new())
    }

    /// `mgmt_config_sfpp_xcvr_autoneg`.
    pub fn mgmt_config_sfpp_xcvr_autoneg(&mut self, port: PortIndex) -> Result<(), MgmtError> {
        xcvr_engine::configure_sfpp_xcvr(&mut self.table, &self.platform, &mut self.phy, port)
    }

    /// `mgmt_dump_port`.
    pub fn mgmt_dump_port(&self, port: PortIndex) -> PortDump {
        let cfg = self.table.config(port);
        let rec = self.table.record(port);
        let an = self.table.an(port);
        PortDump {
            port_id: cfg.port_id,
            present: rec.present,
            disabled: rec.disabled,
            eth_mode: rec.eth_mode,
            xcvr_type: rec.xcvr_type,
            cable_length: rec.cable_length,
            mod_state: rec.mod_state,
            consecutive_errors: rec.consecutive_errors,
            an_sm_type: an.an_runtime.sm_type,
            an_state: an.an_runtime.state,
            negotiated_eee_enabled: an.negotiated_eee_enabled,
        }
    }

    /// `an_event_handler`: dispatches one EPL/lane AN
    /// interrupt-pending mask.
    pub fn an_event_handler(
        &mut self,
        regs: &mut dyn RegisterAccess,
        epl: crate::port_table::EplId,
        lane: crate::port_table::Lane,
        an_ip_mask: u32,
    ) -> crate::an::dispatch::DispatchOutcome {
        let mut sink = SinkAdapter {
            tracer: &mut self.tracer,
        };
        crate::an::dispatch::dispatch_an_interrupt(
            &mut self.table,
            &mut sink,
            regs,
            epl,
            lane,
            an_ip_mask,
        )
    }

    /// `an_restart_on_new_config`.
    pub fn an_restart_on_new_config(
        &mut self,
        port: PortIndex,
        eth_mode: EthMode,
        an_mode: AnMode,
        base_page: BasePage,
        next_pages: Vec<NextPageWord>,
    ) -> Result<(), MgmtError> {
        let mut sink = SinkAdapter {
            tracer: &mut self.tracer,
        };
        let mut regs = NoopRegs;
        let result = restart::an_restart_on_new_config(
            &mut self.table,
            &mut sink,
            &mut regs,
            port,
            eth_mode,
            an_mode,
            base_page,
            next_pages,
        );
        if result.is_ok() {
            self.tracer.push(Trace::AnRestart(port));
        }
        result
    }

    /// `an_validate_base_page`.
    pub fn an_validate_base_page(
        &self,
        port: PortIndex,
        page: BasePage,
    ) -> Result<BasePage, MgmtError> {
        let caps = self.table.config(port).declared_capabilities;
        validate::validate_base_page(self.table.config(port).port_id, page, caps)
    }

    /// `an_get_max_speed_ability_and_mode`.
    pub fn an_get_max_speed_ability_and_mode(&self, port: PortIndex) -> (u32, LaneMode) {
        let an = self.table.an(port);
        let multilane = self.table.config(port).multilane_capable;
        hcd::get_max_speed_ability_and_mode(
            an.autoneg_mode,
            an.base_page,
            &an.next_pages,
            multilane,
            self.config.autoneg_25g_nxt_pg_oui,
        )
    }

    /// `an_add_next_page`. Appends a next page to the port's outgoing
    /// sequence, automatically setting the predecessor's NP bit.
    pub fn an_add_next_page(&mut self, port: PortIndex, page: NextPageWord) {
        let an = self.table.an_mut(port);
        if let Some(last) = an.next_pages.last_mut() {
            *last = last.set_next_page_bit(true);
        }
        an.next_pages.push(page);
    }

    /// `an_verify_eee_negotiation`.
    pub fn an_verify_eee_negotiation(&mut self, port: PortIndex, is_10g: bool) -> bool {
        let an_mode = self.table.an(port).autoneg_mode;
        let ok = hcd::verify_eee_negotiation(
            an_mode,
            &self.table.an(port).partner_next_pages,
            is_10g,
        );
        self.table.an_mut(port).negotiated_eee_enabled = ok;
        ok
    }

    /// `an_73_set_link_inhibit_timer`: Clause 73
    /// link-fail-inhibit timer, applied via the register-access seam.
    pub fn an_73_set_link_inhibit_timer(
        &mut self,
        port: PortIndex,
        regs: &mut dyn RegisterAccess,
        ms: u32,
    ) -> Result<(), MgmtError> {
        let validated =
            timer::validate_link_fail_inhibit_ms(ms, self.config.an_timer_allow_out_spec)?;
        self.table.an_mut(port).link_fail_inhibit_ms = validated;
        if let Some(ms) = validated {
            if let Some((timescale, count, _effective_us)) =
                timer::get_time_scale(ms as u64 * 1000, LINK_FAIL_INHIBIT_MAX_COUNT)
            {
                regs.set_link_fail_inhibit_timer(port, timescale, count)?;
            }
        }
        Ok(())
    }

    /// `an_73_set_link_inhibit_timer_kx`: the 1000BASE-KX
    /// variant of the same timer, same validation range.
    pub fn an_73_set_link_inhibit_timer_kx(
        &mut self,
        port: PortIndex,
        regs: &mut dyn RegisterAccess,
        ms: u32,
    ) -> Result<(), MgmtError> {
        self.an_73_set_link_inhibit_timer(port, regs, ms)
    }

    /// `an_73_set_ignore_nonce`: toggles `AN_73_CFG.IgnoreNonceMatch`
    /// through the register-access seam.
    pub fn an_73_set_ignore_nonce(
        &mut self,
        port: PortIndex,
        regs: &mut dyn RegisterAccess,
        ignore: bool,
    ) -> Result<(), MgmtError> {
        regs.set_ignore_nonce_match(port, ignore)?;
        self.table.an_mut(port).ignore_nonce_match = ignore;
        Ok(())
    }

    pub fn table(&self) -> &PortTable {
        &self.table
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }
}

/// Adapts [`Tracer`] + [`MgmtConfig`]'s logging into the [`AnEventSink`]
/// seam the event dispatcher and restart orchestrator deliver events through.
struct SinkAdapter<'a> {
    tracer: &'a mut Tracer,
}

impl AnEventSink for SinkAdapter<'_> {
    fn handle_state(&mut self, port: PortIndex, state: AnState) -> Result<(), MgmtError> {
        info!(target: "xcvr_mgmt::an", "port {}: AN state -> {state:?}", port.0);
        Ok(())
    }

    fn handle_config_event(&mut self, port: PortIndex, event: AnConfigEvent) {
        match event {
            AnConfigEvent::Disable { .. } => {
                info!(target: "xcvr_mgmt::an", "port {}: AN_DISABLE_REQ", port.0);
            }
            AnConfigEvent::Config { .. } => {
                info!(target: "xcvr_mgmt::an", "port {}: AN_CONFIG_REQ", port.0);
            }
        }
    }
}

/// The register-access seam is out of scope for this crate;
/// `an_restart_on_new_config`'s interrupt-mask write is a no-op absent a
/// real register backend. Callers driving real hardware pass their own
/// [`RegisterAccess`] impl to [`SwitchMgmt::an_event_handler`] and the
/// `an_73_*` setters instead.
struct NoopRegs;

impl RegisterAccess for NoopRegs {
    fn set_ignore_nonce_match(
        &mut self,
        _port: PortIndex,
        _ignore: bool,
    ) -> Result<(), crate::platform::PlatformError> {
        Ok(())
    }
    fn unmask_an_ip(
        &mut self,
        _port: PortIndex,
        _consumed_mask: u32,
    ) -> Result<(), crate::platform::PlatformError> {
        Ok(())
    }
    fn set_an_interrupt_mask(
        &mut self,
        _port: PortIndex,
        _mask: u32,
    ) -> Result<(), crate::platform::PlatformError> {
        Ok(())
    }
    fn set_link_fail_inhibit_timer(
        &mut self,
        _port: PortIndex,
        _timescale: u8,
        _count: u64,
    ) -> Result<(), crate::platform::PlatformError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::an::AbilityMask;
    use crate::platform::{PlatformError, PortHwState};
    use crate::port_table::{EplId, IntfType, Lane};

    struct FakePlatform;
    impl PlatformFacade for FakePlatform {
        fn get_port_xcvr_state(
            &self,
            hw_res_ids: &[u32],
        ) -> Result<Vec<PortHwState>, PlatformError> {
            Ok(hw_res_ids
                .iter()
                .map(|_| PortHwState {
                    valid: ModBits::empty(),
                    state: ModBits::empty(),
                })
                .collect())
        }
    }

    struct NoopSerdes;
    impl SerdesApplier for NoopSerdes {
        fn apply_single_lane_tx_config(
            &mut self,
            _p: PortIndex,
            _m: EthMode,
        ) -> Result<(), PlatformError> {
            Ok(())
        }
        fn apply_multi_lane_tx_config(&mut self, _p: PortIndex) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    struct NoopPhy;
    impl PhyDriver for NoopPhy {
        fn enable_1000baset_an(&mut self, _p: PortIndex, _e: bool) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    struct NoopEvents;
    impl EventSink for NoopEvents {
        fn notify_xcvr_change(&mut self, _p: PortIndex, _m: bool, _r: bool, _t: bool) {}
        fn xcvr_state_event(&mut self, _p: PortIndex) {}
        fn xcvr_disabled_event(&mut self, _p: PortIndex) {}
    }

    fn mgmt() -> SwitchMgmt<FakePlatform, NoopPhy, NoopSerdes, NoopEvents> {
        let configs = vec![PortConfig {
            port_id: 7,
            intf_type: IntfType::Sfpp,
            epl: EplId(0),
            lane: Lane(0),
            hw_resource_id: 7,
            declared_capabilities: AbilityMask::SUPPORTED,
            initial_eth_mode: EthMode::Disabled,
            multilane_capable: false,
        }];
        SwitchMgmt::mgmt_init(
            configs,
            FakePlatform,
            NoopPhy,
            NoopSerdes,
            NoopEvents,
            MgmtConfig::default(),
        )
    }

    #[test]
    fn dump_reflects_initial_state() {
        let sw = mgmt();
        let dump = sw.mgmt_dump_port(PortIndex(0));
        assert_eq!(dump.port_id, 7);
        assert!(!dump.present);
        assert_eq!(dump.an_sm_type, crate::an::SmType::None);
    }

    #[test]
    fn eth_mode_change_to_an73_drives_restart() {
        let mut sw = mgmt();
        sw.table.record_mut(PortIndex(0)).present = true;
        sw.mgmt_notify_eth_mode_change(PortIndex(0), EthMode::An73)
            .unwrap();
        assert_eq!(sw.table.an(PortIndex(0)).an_runtime.sm_type, crate::an::SmType::C73);
        assert_eq!(sw.table.an(PortIndex(0)).autoneg_mode, AnMode::Clause73);
    }

    #[test]
    fn add_next_page_sets_predecessor_np_bit() {
        let mut sw = mgmt();
        sw.an_add_next_page(PortIndex(0), NextPageWord(0));
        sw.an_add_next_page(PortIndex(0), NextPageWord(0));
        let pages = &sw.table.an(PortIndex(0)).next_pages;
        assert!(pages[0].has_next_page());
        assert!(!pages[1].has_next_page());
    }

    #[test]
    fn link_inhibit_timer_rejects_out_of_range() {
        let mut sw = mgmt();
        let mut regs = NoopRegs;
        assert!(sw
            .an_73_set_link_inhibit_timer(PortIndex(0), &mut regs, 600)
            .is_err());
        assert!(sw
            .an_73_set_link_inhibit_timer(PortIndex(0), &mut regs, 100)
            .is_ok());
    }
}
