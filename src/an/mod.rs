// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared Clause 37 / Clause 73 autonegotiation types, plus the components
//! built on top of them.

pub mod dispatch;
pub mod hcd;
pub mod restart;
pub mod sm;
pub mod timer;
pub mod validate;

/// Which per-port AN state machine is currently bound.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SmType {
    #[default]
    None,
    C37,
    C73,
}

/// The negotiation mode requested for a port.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AnMode {
    Clause37,
    Clause73,
    Sgmii,
}

impl AnMode {
    /// The SM type a mode is expected to run on.
    pub fn sm_type(self) -> SmType {
        match self {
            AnMode::Clause73 => SmType::C73,
            AnMode::Clause37 | AnMode::Sgmii => SmType::C37,
        }
    }
}

/// A Clause 73 advertised-ability bitmask: one bit per supported speed.
/// Bit positions are internal to this crate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AbilityMask(pub u16);

impl AbilityMask {
    pub const ONE_G_KX: AbilityMask = AbilityMask(1 << 0);
    pub const TEN_G_KR: AbilityMask = AbilityMask(1 << 1);
    pub const TWENTY_FIVE_G_KR: AbilityMask = AbilityMask(1 << 2);
    pub const TWENTY_FIVE_G_CR: AbilityMask = AbilityMask(1 << 3);
    pub const FORTY_G_KR4: AbilityMask = AbilityMask(1 << 4);
    pub const FORTY_G_CR4: AbilityMask = AbilityMask(1 << 5);
    pub const HUNDRED_G_KR4: AbilityMask = AbilityMask(1 << 6);
    pub const HUNDRED_G_CR4: AbilityMask = AbilityMask(1 << 7);

    /// Every ability this crate's rewrite understands.
    pub const SUPPORTED: AbilityMask = AbilityMask(
        Self::ONE_G_KX.0
            | Self::TEN_G_KR.0
            | Self::TWENTY_FIVE_G_KR.0
            | Self::TWENTY_FIVE_G_CR.0
            | Self::FORTY_G_KR4.0
            | Self::FORTY_G_CR4.0
            | Self::HUNDRED_G_KR4.0
            | Self::HUNDRED_G_CR4.0,
    );

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn and(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn or(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn not(self) -> Self {
        Self(!self.0)
    }

    /// Iterates the set bits, highest speed first, for priority scans.
    pub fn iter_by_priority() -> [AbilityMask; 8] {
        [
            Self::HUNDRED_G_KR4,
            Self::HUNDRED_G_CR4,
            Self::FORTY_G_KR4,
            Self::FORTY_G_CR4,
            Self::TWENTY_FIVE_G_KR,
            Self::TWENTY_FIVE_G_CR,
            Self::TEN_G_KR,
            Self::ONE_G_KX,
        ]
    }
}

/// A Clause 73 base page. The ability field occupies an internal 24-bit
/// slice (bits 21..=44); everything else is opaque passthrough (selector,
/// nonce, etc. are not modeled, since the rewrite's scope is ability
/// validation and HCD resolution, not wire framing).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BasePage(pub u64);

const ABILITY_SHIFT: u32 = 21;
const ABILITY_WIDTH: u32 = 24;
const ABILITY_MASK_BITS: u64 = (1u64 << ABILITY_WIDTH) - 1;

impl BasePage {
    pub fn ability(self) -> AbilityMask {
        AbilityMask(((self.0 >> ABILITY_SHIFT) & ABILITY_MASK_BITS) as u16)
    }

    /// Returns a copy of this page with the ability field replaced,
    /// preserving every other bit.
    pub fn with_ability(self, ability: AbilityMask) -> Self {
        let cleared = self.0 & !(ABILITY_MASK_BITS << ABILITY_SHIFT);
        Self(cleared | ((ability.0 as u64 & ABILITY_MASK_BITS) << ABILITY_SHIFT))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// A decoded next-page record: the already-coalesced logical value of a
/// message/unformatted next-page pair, not a raw 16-bit wire word.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NextPageWord(pub u64);

const NP_BIT: u64 = 1 << 15;
const MP_BIT: u64 = 1 << 13;

/// Extracts bits `[lo..=hi]` of `word`, shifted down to bit 0.
fn bits(word: u64, lo: u32, hi: u32) -> u64 {
    let width = hi - lo + 1;
    let mask = if width >= 64 { u64::MAX } else { (1u64 << width) - 1 };
    (word >> lo) & mask
}

impl NextPageWord {
    pub fn has_next_page(self) -> bool {
        self.0 & NP_BIT != 0
    }

    pub fn set_next_page_bit(self, set: bool) -> Self {
        if set {
            Self(self.0 | NP_BIT)
        } else {
            Self(self.0 & !NP_BIT)
        }
    }

    /// `true` for a message next-page; `false` for an unformatted next-page.
    pub fn is_message(self) -> bool {
        self.0 & MP_BIT != 0
    }

    /// 11-bit message code field (meaningful when [`Self::is_message`]).
    pub fn message_code(self) -> u16 {
        bits(self.0, 0, 10) as u16
    }

    /// `bits [8:0]` of an unformatted next-page.
    pub fn unformatted_code(self) -> u16 {
        bits(self.0, 0, 8) as u16
    }

    /// Reconstructs the 24-bit OUI for an OUI-tagged extended-technology-
    /// ability exchange: bits `[9..10]` of the unformatted
    /// page contribute OUI bits `[0..1]`; bits `[32..42]` of the message
    /// page contribute OUI bits `[2..12]`; bits `[16..26]` of the message
    /// page contribute OUI bits `[13..23]`.
    pub fn reconstruct_oui(unformatted: Self, message: Self) -> u32 {
        let lo = bits(unformatted.0, 9, 10) as u32;
        let mid = bits(message.0, 32, 42) as u32;
        let hi = bits(message.0, 16, 26) as u32;
        lo | (mid << 2) | (hi << 13)
    }

    /// Extended Technology Ability unformatted code.
    pub const EXT_TECH_ABILITY_CODE: u16 = 0x3;
    /// Annex 28C OUI-tag message code.
    pub const OUI_MESSAGE_CODE: u16 = 5;
    /// Annex 78 EEE advertisement message code.
    pub const EEE_MESSAGE_CODE: u16 = 13;

    /// Bit 20 of an extended-technology-ability page: 25GBASE-CR1 support.
    pub fn supports_25g_cr1(self) -> bool {
        bits(self.0, 20, 20) != 0
    }

    /// Bit 21 of an extended-technology-ability page: 25GBASE-KR1 support.
    pub fn supports_25g_kr1(self) -> bool {
        bits(self.0, 21, 21) != 0
    }
}

/// Validates every page but the last in a sequence has the NP bit set.
pub fn next_page_sequence_valid(pages: &[NextPageWord]) -> bool {
    match pages.len() {
        0 => true,
        n => pages[..n - 1].iter().all(|p| p.has_next_page()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ability_round_trips_through_base_page() {
        let page = BasePage(0xDEAD_0000_0000u64);
        let mask = AbilityMask::TEN_G_KR.or(AbilityMask::HUNDRED_G_CR4);
        let updated = page.with_ability(mask);
        assert_eq!(updated.ability(), mask);
        // Non-ability bits unaffected.
        assert_eq!(updated.0 & !((ABILITY_MASK_BITS) << ABILITY_SHIFT), page.0 & !((ABILITY_MASK_BITS) << ABILITY_SHIFT));
    }

    #[test]
    fn oui_reconstruction() {
        // OUI = 0x6A737D (arbitrary 24-bit test value)
        let oui: u32 = 0x6A737D;
        let lo = oui & 0x3;
        let mid = (oui >> 2) & 0x7FF;
        let hi = (oui >> 13) & 0x7FF;

        let unformatted = NextPageWord((lo as u64) << 9);
        let message = NextPageWord(((mid as u64) << 32) | ((hi as u64) << 16));

        assert_eq!(NextPageWord::reconstruct_oui(unformatted, message), oui);
    }

    #[test]
    fn next_page_sequence_validity() {
        let a = NextPageWord(0).set_next_page_bit(true);
        let b = NextPageWord(0).set_next_page_bit(true);
        let c = NextPageWord(0).set_next_page_bit(false);
        assert!(next_page_sequence_valid(&[a, b, c]));
        assert!(!next_page_sequence_valid(&[a, c, b]));
        assert!(next_page_sequence_valid(&[]));
    }
}
