// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Platform-library facade, plus the seam traits for the other external
//! collaborators this crate never talks to directly: the PHY driver, the
//! SerDes TX equalization table, and the switch register primitives. Every
//! method is optional — a default implementation returns
//! [`PlatformError::NotSupported`] — so a caller wiring up a partial board
//! support layer degrades cleanly instead of needing every method present,
//! the same shape as `vsc85xx::PhyRw`.
//!
//! All facade calls are serialized by the bus lock; the facade
//! itself must not take it — that's the caller's job (see `xcvr_engine.rs`).

use crate::port_table::{ModBits, PortIndex};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlatformError {
    I2cNack,
    I2cTimeout,
    BusSelectFailed,
    NotSupported,
    InvalidPort,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusKind {
    Sfpp,
    Qsfp,
}

/// Per-port hardware state as reported by a bulk query: which bits are
/// meaningful (`valid`) and their value (`state`).
#[derive(Copy, Clone, Debug, Default)]
pub struct PortHwState {
    pub valid: ModBits,
    pub state: ModBits,
}

/// Thin capability-typed interface over the board support library.
pub trait PlatformFacade {
    fn select_bus(
        &self,
        _bus_kind: BusKind,
        _hw_res_id: u32,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported)
    }

    fn i2c_write_read(
        &self,
        _port: PortIndex,
        _dev: u8,
        _reg: u8,
        _write: &[u8],
        _read: &mut [u8],
    ) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported)
    }

    fn xcvr_mem_write(
        &self,
        _port: PortIndex,
        _dev: u8,
        _reg: u8,
        _bytes: &[u8],
    ) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported)
    }

    /// Compound read respecting page boundaries.
    fn xcvr_eeprom_read(
        &self,
        _port: PortIndex,
        _dev: u8,
        _reg: u8,
        _buf: &mut [u8],
    ) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported)
    }

    /// Bulk query returning, per requested `hw_res_id`, which bits are
    /// meaningful and their value.
    fn get_port_xcvr_state(
        &self,
        hw_res_ids: &[u32],
    ) -> Result<Vec<PortHwState>, PlatformError> {
        let _ = hw_res_ids;
        Err(PlatformError::NotSupported)
    }

    /// Dequeues edge-triggered pending hardware resource ids, up to `cap`.
    fn get_port_intr_pending(
        &self,
        _cap: usize,
    ) -> Result<Vec<u32>, PlatformError> {
        Err(PlatformError::NotSupported)
    }

    fn enable_port_intr(
        &self,
        _hw_res_ids: &[u32],
        _enable: &[bool],
    ) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported)
    }

    fn gpio_set_dir(
        &self,
        _gpio: u32,
        _output: bool,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported)
    }

    fn gpio_unmask_intr(&self, _gpio: u32) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported)
    }
}

/// External collaborator: the PHY driver's 1000BASE-T AN controls. Modeled
/// the way `vsc85xx::PhyRw` models MIIM access: a narrow trait owned by the
/// consumer, not this crate.
pub trait PhyDriver {
    fn enable_1000baset_an(
        &mut self,
        port: PortIndex,
        enable: bool,
    ) -> Result<(), PlatformError>;
}

/// External collaborator: the SerDes TX equalization table. The update-SerDes
/// path calls through this seam only; the numerical training itself is
/// never reimplemented here.
pub trait SerdesApplier {
    fn apply_single_lane_tx_config(
        &mut self,
        port: PortIndex,
        eth_mode: crate::port_table::EthMode,
    ) -> Result<(), PlatformError>;

    fn apply_multi_lane_tx_config(
        &mut self,
        port: PortIndex,
    ) -> Result<(), PlatformError>;
}

/// External collaborator: switch-level register read/write primitives,
/// used by the AN path (e.g. `AN_73_CFG.IgnoreNonceMatch`) and to
/// re-arm/unmask consumed AN-IP bits after an interrupt is dispatched.
pub trait RegisterAccess {
    fn set_ignore_nonce_match(
        &mut self,
        _port: PortIndex,
        _ignore: bool,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported)
    }

    fn unmask_an_ip(
        &mut self,
        _port: PortIndex,
        _consumed_mask: u32,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported)
    }

    fn set_an_interrupt_mask(
        &mut self,
        _port: PortIndex,
        _mask: u32,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported)
    }

    /// Programs the Clause 73 link-fail-inhibit timer's `(timescale, count)`
    /// pair.
    fn set_link_fail_inhibit_timer(
        &mut self,
        _port: PortIndex,
        _timescale: u8,
        _count: u64,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported)
    }
}

/// External collaborator: the logical event-delivery fabric, the
/// destination of `notify_xcvr_change` / `xcvr_state` / the upward AN
/// config events.
pub trait EventSink {
    fn notify_xcvr_change(
        &mut self,
        port: PortIndex,
        modpres: bool,
        rxlos: bool,
        txfault: bool,
    );

    fn xcvr_state_event(&mut self, port: PortIndex);

    fn xcvr_disabled_event(&mut self, port: PortIndex);
}
