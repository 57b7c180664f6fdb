// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The generic state-machine shell the event dispatcher and restart
//! orchestrator drive. The Clause 37 / Clause 73 state diagrams themselves
//! are not reimplemented here; what's modeled is only the dispatcher's view
//! of them: a per-port state tag that event delivery advances, plus the two
//! upward config-plane events a restart emits. A small owned engine per
//! port, where events are tagged variants and actions are delivered through
//! a sink trait rather than the numeric transition tables themselves.

use super::{AnMode, BasePage, NextPageWord, SmType};
use crate::error::MgmtError;
use crate::port_table::PortIndex;

/// A state-indication an AN interrupt-pending bit reports. Clause 37's
/// `NextPageWait` bit is deliberately *not* folded into `AnGoodCheck` — the
/// two indications are kept as distinct states rather than aliased onto the
/// same event id (see DESIGN.md).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AnState {
    Disabled,
    // Clause 73
    AbilityDetect,
    AcknowledgeDetect,
    CompleteAcknowledge,
    NextPageWait,
    AnGoodCheck,
    AnGood,
    TransmitDisable,
    // Clause 37
    AnEnable,
    AnRestart,
    DisableLinkOk,
    C37NextPageWait,
    IdleDetect,
    LinkOk,
}

/// A config-plane request delivered by the restart orchestrator.
#[derive(Clone, Debug)]
pub enum AnConfigEvent {
    Disable {
        an_mode: AnMode,
        base_page: BasePage,
        next_pages: Vec<NextPageWord>,
    },
    Config {
        an_mode: AnMode,
        base_page: BasePage,
        next_pages: Vec<NextPageWord>,
    },
}

/// Destination for the upward events the dispatcher and restart orchestrator
/// produce. A full state-machine framework would drive behavior from these
/// callbacks; tests implement it by just recording state.
///
/// `handle_state` is fallible: a real backing state machine can reject an
/// event with [`MgmtError::StateMachineHandle`] (no live instance bound to
/// this port) or [`MgmtError::StateMachineType`] (the bound instance is the
/// wrong clause for the event). The dispatcher aborts its event chain on
/// the first such error.
pub trait AnEventSink {
    fn handle_state(&mut self, port: PortIndex, state: AnState) -> Result<(), MgmtError>;
    fn handle_config_event(&mut self, port: PortIndex, event: AnConfigEvent);
}

/// Per-port state tag plus the SM type it's bound to. Lives inside
/// [`crate::port_table::AnPortExt`] as `an_runtime`; this type is the
/// runtime companion used while dispatching.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AnRuntimeState {
    pub sm_type: SmType,
    pub state: AnState,
}

impl Default for AnState {
    fn default() -> Self {
        AnState::Disabled
    }
}

impl AnRuntimeState {
    pub fn stopped() -> Self {
        Self {
            sm_type: SmType::None,
            state: AnState::Disabled,
        }
    }

    pub fn advance(&mut self, state: AnState) {
        self.state = state;
    }
}
