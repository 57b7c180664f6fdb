// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Runtime configuration for the management core.
//!
//! Since this runs as an ordinary thread rather than a build-time-configured
//! task, the knobs are collected into a plain struct a caller can build by
//! hand or load from a TOML file with [`MgmtConfig::from_toml`].

use serde::Deserialize;
use std::time::Duration;

/// `debug` bit flags, e.g. `CFG_DBG_MOD_INTR`.
///
/// A small hand-rolled bitmask newtype, matching the idiom used for
/// `LogicalPortMask` throughout `drv-sidecar-front-io` rather than pulling
/// in the `bitflags` crate for three bits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct DebugFlags(u32);

impl DebugFlags {
    pub const MOD_STATE: DebugFlags = DebugFlags(1 << 0);
    pub const MOD_TYPE: DebugFlags = DebugFlags(1 << 1);
    pub const MOD_INTR: DebugFlags = DebugFlags(1 << 2);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl core::ops::BitOr for DebugFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Configuration recognised by the management core.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MgmtConfig {
    /// `xcvrPollPeriodMsec`. Zero disables the background management task.
    pub xcvr_poll_period_msec: u32,

    /// `gpioPortIntr`. `None` if no GPIO is wired to port interrupts.
    pub gpio_port_intr: Option<u32>,

    /// `anTimerAllowOutSpec`. Widens link-fail-inhibit-timer valid range.
    pub an_timer_allow_out_spec: bool,

    /// `autoNeg25GNxtPgOui`. Expected OUI in the 25G extended-tech-ability
    /// next-page message.
    pub autoneg_25g_nxt_pg_oui: u32,

    /// `debug` bit flags.
    pub debug: DebugFlags,
}

impl Default for MgmtConfig {
    fn default() -> Self {
        Self {
            xcvr_poll_period_msec: 1000,
            gpio_port_intr: None,
            an_timer_allow_out_spec: false,
            autoneg_25g_nxt_pg_oui: 0x6A737D,
            debug: DebugFlags::empty(),
        }
    }
}

impl MgmtConfig {
    pub fn poll_period(&self) -> Option<Duration> {
        if self.xcvr_poll_period_msec == 0 {
            None
        } else {
            Some(Duration::from_millis(self.xcvr_poll_period_msec as u64))
        }
    }

    /// Parses configuration from a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_poll_period_is_one_second() {
        let cfg = MgmtConfig::default();
        assert_eq!(cfg.poll_period(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn zero_poll_period_disables_task() {
        let cfg = MgmtConfig {
            xcvr_poll_period_msec: 0,
            ..MgmtConfig::default()
        };
        assert_eq!(cfg.poll_period(), None);
    }

    #[test]
    fn parses_from_toml() {
        let cfg = MgmtConfig::from_toml(
            "xcvr_poll_period_msec = 250\nan_timer_allow_out_spec = true\n",
        )
        .unwrap();
        assert_eq!(cfg.xcvr_poll_period_msec, 250);
        assert!(cfg.an_timer_allow_out_spec);
    }
}
