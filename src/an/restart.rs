// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AN restart orchestrator — the single entry point that
//! makes a live mode switch on a port safe: old state is torn down with an
//! `AN_DISABLE_REQ` before any new config is applied, the bound SM is
//! stopped and restarted if its type changes, and only then is the new
//! config delivered via `AN_CONFIG_REQ`.

use log::debug;

use super::sm::{AnConfigEvent, AnEventSink, AnRuntimeState, AnState};
use super::{AnMode, BasePage, NextPageWord, SmType};
use crate::error::MgmtError;
use crate::platform::RegisterAccess;
use crate::port_table::{EthMode, PortIndex, PortTable};

/// Restarts autonegotiation on `port` for a newly-requested configuration.
/// `eth_mode` is the administrative mode driving the request;
/// `an_mode`/`base_page`/`next_pages` are the new AN parameters.
///
/// Steps, in order:
/// 1. Readiness check — a port with no transceiver present cannot be
///    reconfigured, and `eth_mode` must match the mode family `an_mode`
///    implies (Clause 73 requires `eth_mode = AN_73`; Clause 37 requires
///    `eth_mode = 1000BASE_X`; SGMII requires `eth_mode = SGMII`). Any other
///    combination returns without touching state.
/// 2. `AN_DISABLE_REQ` carrying the port's *old* bound AN mode/page state;
///    if the SM type the new mode requires differs from the one currently
///    bound, the old SM instance is stopped and a new one started in the
///    disabled state.
/// 3. The port's AN interrupt mask is updated to match the new SM type's
///    bit layout (all bits unmasked; sweeps narrow it from there).
/// 4. `AN_CONFIG_REQ` carrying the new mode/page state is emitted.
pub fn an_restart_on_new_config<S: AnEventSink>(
    table: &mut PortTable,
    sink: &mut S,
    regs: &mut dyn RegisterAccess,
    port: PortIndex,
    eth_mode: EthMode,
    an_mode: AnMode,
    base_page: BasePage,
    next_pages: Vec<NextPageWord>,
) -> Result<(), MgmtError> {
    // Step 1: readiness.
    if !table.record(port).present {
        return Err(MgmtError::InvalidPort);
    }
    let ready = match an_mode {
        AnMode::Clause73 => eth_mode == EthMode::An73,
        AnMode::Clause37 => eth_mode == EthMode::OneGBaseX,
        AnMode::Sgmii => eth_mode == EthMode::Sgmii,
    };
    if !ready {
        debug!(
            target: "xcvr_mgmt::an",
            "port {}: not ready for restart (eth_mode {:?}, an_mode {:?})",
            port.0, eth_mode, an_mode
        );
        return Err(MgmtError::InvalidArgument);
    }

    let old_mode = table.an(port).autoneg_mode;
    let old_base_page = table.an(port).base_page;
    let old_next_pages = table.an(port).next_pages.clone();

    // Step 2: tear down the old configuration.
    sink.handle_config_event(
        port,
        AnConfigEvent::Disable {
            an_mode: old_mode,
            base_page: old_base_page,
            next_pages: old_next_pages,
        },
    );

    let new_sm_type = an_mode.sm_type();
    let old_sm_type = table.an(port).an_runtime.sm_type;
    if old_sm_type != new_sm_type {
        // Stop the old instance, start a new one parked in Disabled.
        table.an_mut(port).an_runtime = AnRuntimeState {
            sm_type: new_sm_type,
            state: AnState::Disabled,
        };
    } else {
        table.an_mut(port).an_runtime.state = AnState::Disabled;
    }

    // Step 3: interrupt mask reflects the (possibly new) SM type.
    let mask = match new_sm_type {
        SmType::C73 => 0x7F,
        SmType::C37 => 0xFF,
        SmType::None => 0,
    };
    table.an_mut(port).an_interrupt_mask = mask;
    regs.set_an_interrupt_mask(port, mask)?;

    // Step 4: deliver the new configuration.
    table.an_mut(port).autoneg_mode = an_mode;
    table.an_mut(port).base_page = base_page;
    table.an_mut(port).next_pages = next_pages.clone();
    sink.handle_config_event(
        port,
        AnConfigEvent::Config {
            an_mode,
            base_page,
            next_pages,
        },
    );

    Ok(())
}
