// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AN event dispatcher.
//!
//! Decodes a per-EPL AN interrupt-pending bitmask into an ordered sequence
//! of state events, delivering each to the owning port's state machine in a
//! fixed, clause-specific bit order. The chain aborts at the first event
//! whose delivery fails; everything still in the mask past that point stays
//! set and will be retried on the next interrupt.

use super::sm::{AnEventSink, AnState};
use super::SmType;
use crate::error::MgmtError;
use crate::platform::RegisterAccess;
use crate::port_table::{EplId, Lane, PortTable};

/// Clause 73 AN-IP bit order: ability detect through
/// transmit disable, low bit first.
const C73_BITS: [(u32, AnState); 7] = [
    (1 << 0, AnState::AbilityDetect),
    (1 << 1, AnState::AcknowledgeDetect),
    (1 << 2, AnState::CompleteAcknowledge),
    (1 << 3, AnState::NextPageWait),
    (1 << 4, AnState::AnGoodCheck),
    (1 << 5, AnState::AnGood),
    (1 << 6, AnState::TransmitDisable),
];

/// Clause 37 AN-IP bit order. Bit 5 (`NextPageWait`) maps to
/// [`AnState::C37NextPageWait`], not [`AnState::AnGoodCheck`] — kept
/// distinct rather than aliased onto the Clause 73 event (see DESIGN.md).
const C37_BITS: [(u32, AnState); 8] = [
    (1 << 0, AnState::AnEnable),
    (1 << 1, AnState::AnRestart),
    (1 << 2, AnState::DisableLinkOk),
    (1 << 3, AnState::AbilityDetect),
    (1 << 4, AnState::CompleteAcknowledge),
    (1 << 5, AnState::C37NextPageWait),
    (1 << 6, AnState::IdleDetect),
    (1 << 7, AnState::LinkOk),
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No port owns this lane; the mask is re-armed unconsumed.
    NoOwner,
    /// Every set bit was delivered.
    Delivered { consumed: u32 },
    /// Delivery stopped after the first failing event; `consumed` covers
    /// only the events that succeeded.
    Aborted { consumed: u32, err: MgmtError },
}

/// Dispatches one EPL/lane's pending AN-IP bitmask.
///
/// `regs` re-arms (unmasks) the bits actually consumed in a single call made
/// once the chain is done, whether it ran to completion or aborted early —
/// an event that never made it to the state machine stays masked and will be
/// redelivered on the next interrupt, but bits that already delivered must
/// not be replayed.
pub fn dispatch_an_interrupt<S: AnEventSink>(
    table: &mut PortTable,
    sink: &mut S,
    regs: &mut dyn RegisterAccess,
    epl: EplId,
    lane: Lane,
    an_ip_mask: u32,
) -> DispatchOutcome {
    let lanes = table.lanes_of(epl);
    let Some(port) = lanes.get(lane.0 as usize).copied().flatten() else {
        return DispatchOutcome::NoOwner;
    };

    let sm_type = table.an(port).an_runtime.sm_type;
    let order: &[(u32, AnState)] = match sm_type {
        SmType::C73 => &C73_BITS,
        SmType::C37 => &C37_BITS,
        SmType::None => {
            // Bound to no SM: drop silently but still re-arm.
            let _ = regs.unmask_an_ip(port, an_ip_mask);
            return DispatchOutcome::Delivered {
                consumed: an_ip_mask,
            };
        }
    };

    let mut consumed = 0u32;
    let mut sm_err = None;
    for &(bit, state) in order {
        if an_ip_mask & bit == 0 {
            continue;
        }
        if let Err(err) = sink.handle_state(port, state) {
            sm_err = Some(err);
            break;
        }
        table.an_mut(port).an_runtime.advance(state);
        consumed |= bit;
    }

    if let Some(err) = sm_err {
        // Re-arm whatever did deliver before the failure; the failing event
        // and everything after it stay masked for redelivery.
        let _ = regs.unmask_an_ip(port, consumed);
        return DispatchOutcome::Aborted { consumed, err };
    }

    if let Err(err) = regs.unmask_an_ip(port, consumed) {
        return DispatchOutcome::Aborted {
            consumed,
            err: err.into(),
        };
    }

    DispatchOutcome::Delivered { consumed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::an::{AbilityMask, AnMode};
    use crate::platform::PlatformError;
    use crate::port_table::{EthMode, IntfType, PortConfig, PortIndex};

    struct RecordingSink {
        delivered: Vec<(PortIndex, AnState)>,
        fail_on: Option<AnState>,
    }

    impl AnEventSink for RecordingSink {
        fn handle_state(&mut self, port: PortIndex, state: AnState) -> Result<(), MgmtError> {
            if self.fail_on == Some(state) {
                return Err(MgmtError::StateMachineHandle);
            }
            self.delivered.push((port, state));
            Ok(())
        }
        fn handle_config_event(
            &mut self,
            _port: PortIndex,
            _event: super::super::sm::AnConfigEvent,
        ) {
        }
    }

    struct FakeRegs {
        unmasked: Vec<u32>,
        fail_on_mask: Option<u32>,
    }

    impl RegisterAccess for FakeRegs {
        fn set_ignore_nonce_match(
            &mut self,
            _port: PortIndex,
            _ignore: bool,
        ) -> Result<(), PlatformError> {
            Ok(())
        }
        fn unmask_an_ip(
            &mut self,
            _port: PortIndex,
            consumed_mask: u32,
        ) -> Result<(), PlatformError> {
            if self.fail_on_mask == Some(consumed_mask) {
                return Err(PlatformError::I2cTimeout);
            }
            self.unmasked.push(consumed_mask);
            Ok(())
        }
        fn set_an_interrupt_mask(
            &mut self,
            _port: PortIndex,
            _mask: u32,
        ) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    fn one_port_table(sm_type: SmType) -> PortTable {
        let configs = vec![PortConfig {
            port_id: 0,
            intf_type: IntfType::Sfpp,
            epl: EplId(0),
            lane: Lane(0),
            hw_resource_id: 0,
            declared_capabilities: AbilityMask::SUPPORTED,
            initial_eth_mode: EthMode::Disabled,
            multilane_capable: false,
        }];
        let mut table = PortTable::new(configs);
        table.an_mut(PortIndex(0)).an_runtime.sm_type = sm_type;
        table.an_mut(PortIndex(0)).autoneg_mode = match sm_type {
            SmType::C73 => AnMode::Clause73,
            _ => AnMode::Clause37,
        };
        table
    }

    #[test]
    fn c73_events_delivered_in_order() {
        let mut table = one_port_table(SmType::C73);
        let mut sink = RecordingSink {
            delivered: vec![],
            fail_on: None,
        };
        let mut regs = FakeRegs {
            unmasked: vec![],
            fail_on_mask: None,
        };
        let mask = (1 << 0) | (1 << 2) | (1 << 5);
        let outcome =
            dispatch_an_interrupt(&mut table, &mut sink, &mut regs, EplId(0), Lane(0), mask);
        assert_eq!(outcome, DispatchOutcome::Delivered { consumed: mask });
        assert_eq!(
            sink.delivered,
            vec![
                (PortIndex(0), AnState::AbilityDetect),
                (PortIndex(0), AnState::CompleteAcknowledge),
                (PortIndex(0), AnState::AnGood),
            ]
        );
        // Re-armed once, with the aggregate mask, not once per bit.
        assert_eq!(regs.unmasked, vec![mask]);
    }

    #[test]
    fn c37_next_page_wait_is_distinct_from_c73_an_good_check() {
        let mut table = one_port_table(SmType::C37);
        let mut sink = RecordingSink {
            delivered: vec![],
            fail_on: None,
        };
        let mut regs = FakeRegs {
            unmasked: vec![],
            fail_on_mask: None,
        };
        let mask = 1 << 5;
        dispatch_an_interrupt(&mut table, &mut sink, &mut regs, EplId(0), Lane(0), mask);
        assert_eq!(sink.delivered, vec![(PortIndex(0), AnState::C37NextPageWait)]);
    }

    #[test]
    fn aborts_on_first_sm_failure_leaving_rest_pending() {
        let mut table = one_port_table(SmType::C73);
        let mut sink = RecordingSink {
            delivered: vec![],
            fail_on: Some(AnState::CompleteAcknowledge),
        };
        let mut regs = FakeRegs {
            unmasked: vec![],
            fail_on_mask: None,
        };
        let mask = (1 << 0) | (1 << 2) | (1 << 5);
        let outcome =
            dispatch_an_interrupt(&mut table, &mut sink, &mut regs, EplId(0), Lane(0), mask);
        match outcome {
            DispatchOutcome::Aborted { consumed, err } => {
                assert_eq!(consumed, 1 << 0);
                assert_eq!(err, MgmtError::StateMachineHandle);
            }
            other => panic!("expected Aborted, got {other:?}"),
        }
        // AnGood (bit 5) never delivered because the chain stopped at bit 2.
        assert_eq!(sink.delivered, vec![(PortIndex(0), AnState::AbilityDetect)]);
        // Only the bit that actually delivered (bit 0) is re-armed.
        assert_eq!(regs.unmasked, vec![1 << 0]);
    }

    #[test]
    fn aborts_on_register_failure_after_full_delivery() {
        let mut table = one_port_table(SmType::C73);
        let mut sink = RecordingSink {
            delivered: vec![],
            fail_on: None,
        };
        let mask = (1 << 0) | (1 << 2);
        let mut regs = FakeRegs {
            unmasked: vec![],
            fail_on_mask: Some(mask),
        };
        let outcome =
            dispatch_an_interrupt(&mut table, &mut sink, &mut regs, EplId(0), Lane(0), mask);
        match outcome {
            DispatchOutcome::Aborted { consumed, err } => {
                assert_eq!(consumed, mask);
                assert_eq!(err, MgmtError::I2cBusFailure);
            }
            other => panic!("expected Aborted, got {other:?}"),
        }
        assert_eq!(sink.delivered.len(), 2);
    }

    #[test]
    fn unowned_lane_drops_silently_but_reports_rearm() {
        let mut table = one_port_table(SmType::C73);
        let mut sink = RecordingSink {
            delivered: vec![],
            fail_on: None,
        };
        let mut regs = FakeRegs {
            unmasked: vec![],
            fail_on_mask: None,
        };
        let outcome =
            dispatch_an_interrupt(&mut table, &mut sink, &mut regs, EplId(0), Lane(3), 0xFF);
        assert_eq!(outcome, DispatchOutcome::NoOwner);
        assert!(sink.delivered.is_empty());
    }
}
