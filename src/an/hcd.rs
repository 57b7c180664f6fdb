// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HCD and next-page interpreter.

use super::{AbilityMask, AnMode, BasePage, NextPageWord};
use crate::port_table::EthMode;

/// Raw Clause 73 HCD codes. `Other` keeps [`hcd_to_eth_mode`]
/// total over any hardware-reported value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HcdCode {
    Kx,
    Kx4,
    TenKr,
    FortyCr4,
    FortyKr4,
    HundredKr4,
    HundredCr4,
    HundredCr10,
    HundredKp4,
    TwentyFiveKr,
    TwentyFiveCr,
    Incompatible,
    Other(u8),
}

impl HcdCode {
    /// A human-readable name, including for HCDs that map to `Disabled`.
    pub fn debug_name(self) -> &'static str {
        match self {
            HcdCode::Kx => "1000BASE-KX",
            HcdCode::Kx4 => "10GBASE-KX4",
            HcdCode::TenKr => "10GBASE-KR",
            HcdCode::FortyCr4 => "40GBASE-CR4",
            HcdCode::FortyKr4 => "40GBASE-KR4",
            HcdCode::HundredKr4 => "100GBASE-KR4",
            HcdCode::HundredCr4 => "100GBASE-CR4",
            HcdCode::HundredCr10 => "100GBASE-CR10",
            HcdCode::HundredKp4 => "100GBASE-KP4",
            HcdCode::TwentyFiveKr => "25GBASE-KR",
            HcdCode::TwentyFiveCr => "25GBASE-CR",
            HcdCode::Incompatible => "INCOMPATIBLE",
            HcdCode::Other(_) => "UNKNOWN",
        }
    }
}

/// Maps a Clause 73 HCD to an ethernet mode. Total:
/// every `HcdCode`, including `Other`, maps to a defined `EthMode`.
pub fn hcd_to_eth_mode(hcd: HcdCode) -> EthMode {
    match hcd {
        HcdCode::Kx => EthMode::OneGBaseKx,
        HcdCode::TenKr => EthMode::TenGBaseKr,
        HcdCode::FortyCr4 => EthMode::FortyGBaseCr4,
        HcdCode::FortyKr4 => EthMode::FortyGBaseKr4,
        HcdCode::HundredKr4 => EthMode::HundredGBaseKr4,
        HcdCode::HundredCr4 => EthMode::HundredGBaseCr4,
        HcdCode::TwentyFiveKr => EthMode::TwentyFiveGBaseKr,
        HcdCode::TwentyFiveCr => EthMode::TwentyFiveGBaseCr,
        HcdCode::Kx4
        | HcdCode::HundredCr10
        | HcdCode::HundredKp4
        | HcdCode::Incompatible
        | HcdCode::Other(_) => EthMode::Disabled,
    }
}

/// The inverse mapping, defined only for the eight HCDs that round-trip.
pub fn eth_mode_to_hcd(mode: EthMode) -> Option<HcdCode> {
    match mode {
        EthMode::OneGBaseKx => Some(HcdCode::Kx),
        EthMode::TenGBaseKr => Some(HcdCode::TenKr),
        EthMode::FortyGBaseCr4 => Some(HcdCode::FortyCr4),
        EthMode::FortyGBaseKr4 => Some(HcdCode::FortyKr4),
        EthMode::HundredGBaseKr4 => Some(HcdCode::HundredKr4),
        EthMode::HundredGBaseCr4 => Some(HcdCode::HundredCr4),
        EthMode::TwentyFiveGBaseKr => Some(HcdCode::TwentyFiveKr),
        EthMode::TwentyFiveGBaseCr => Some(HcdCode::TwentyFiveCr),
        _ => None,
    }
}

/// Lane fan-out mode for a resolved speed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LaneMode {
    Single,
    Quad,
}

/// Scans a next-page sequence for an OUI-tagged 25G extended-technology-
/// ability message, returning the index of the unformatted
/// ext-tech-ability page if found and its OUI matches `expected_oui`.
pub fn find_25g_ext_tech_ability(
    pages: &[NextPageWord],
    expected_oui: u32,
) -> Option<usize> {
    let mut i = 0;
    while i + 1 < pages.len() {
        let message = pages[i];
        let unformatted = pages[i + 1];
        if message.is_message()
            && message.message_code() == NextPageWord::OUI_MESSAGE_CODE
            && !unformatted.is_message()
            && unformatted.unformatted_code()
                == NextPageWord::EXT_TECH_ABILITY_CODE
        {
            let oui = NextPageWord::reconstruct_oui(unformatted, message);
            if oui == expected_oui {
                return Some(i + 1);
            }
        }
        i += 1;
    }
    None
}

/// `true` if the 25G next-page indicator (bit 20 or 21 of the ext-tech-
/// ability page) is present, regardless of the base-page ability field.
pub fn has_25g_next_page_indicator(
    pages: &[NextPageWord],
    expected_oui: u32,
) -> bool {
    find_25g_ext_tech_ability(pages, expected_oui)
        .map(|idx| pages[idx].supports_25g_cr1() || pages[idx].supports_25g_kr1())
        .unwrap_or(false)
}

/// Verifies partner EEE advertisement: walks `partner_next_pages`, looking for an EEE message whose
/// page body advertises the capability matching the negotiated rate.
pub fn verify_eee_negotiation(
    an_mode: AnMode,
    partner_next_pages: &[NextPageWord],
    is_10g: bool,
) -> bool {
    if an_mode != AnMode::Clause73 {
        return false;
    }
    partner_next_pages.iter().any(|p| {
        p.is_message() && p.message_code() == NextPageWord::EEE_MESSAGE_CODE && {
            let ability = AbilityMask(p.0 as u16);
            if is_10g {
                ability.intersects(AbilityMask::TEN_G_KR)
            } else {
                ability.intersects(AbilityMask::ONE_G_KX)
            }
        }
    })
}

/// Max-speed ability and lane-mode picker.
pub fn get_max_speed_ability_and_mode(
    an_mode: AnMode,
    base_page: BasePage,
    next_pages: &[NextPageWord],
    multilane_capable: bool,
    expected_oui: u32,
) -> (u32, LaneMode) {
    match an_mode {
        AnMode::Clause37 | AnMode::Sgmii => (1_000, LaneMode::Single),
        AnMode::Clause73 => {
            let ability = if base_page.is_zero() {
                let mut synth = AbilityMask::SUPPORTED;
                if !multilane_capable {
                    synth = synth.and(
                        AbilityMask::FORTY_G_KR4
                            .or(AbilityMask::FORTY_G_CR4)
                            .or(AbilityMask::HUNDRED_G_KR4)
                            .or(AbilityMask::HUNDRED_G_CR4)
                            .not(),
                    );
                }
                synth
            } else {
                base_page.ability()
            };

            // The 25G next-page indicator forces 25G into consideration
            // even if the base-page ability field doesn't carry it.
            let ability = if has_25g_next_page_indicator(next_pages, expected_oui) {
                ability.or(AbilityMask::TWENTY_FIVE_G_KR)
            } else {
                ability
            };

            for bit in AbilityMask::iter_by_priority() {
                if ability.intersects(bit) {
                    return (speed_for(bit), lane_mode_for(bit));
                }
            }
            (0, LaneMode::Single)
        }
    }
}

fn speed_for(bit: AbilityMask) -> u32 {
    match bit {
        AbilityMask::HUNDRED_G_KR4 | AbilityMask::HUNDRED_G_CR4 => 100_000,
        AbilityMask::FORTY_G_KR4 | AbilityMask::FORTY_G_CR4 => 40_000,
        AbilityMask::TWENTY_FIVE_G_KR | AbilityMask::TWENTY_FIVE_G_CR => 25_000,
        AbilityMask::TEN_G_KR => 10_000,
        AbilityMask::ONE_G_KX => 1_000,
        _ => 0,
    }
}

fn lane_mode_for(bit: AbilityMask) -> LaneMode {
    match bit {
        AbilityMask::HUNDRED_G_KR4
        | AbilityMask::HUNDRED_G_CR4
        | AbilityMask::FORTY_G_KR4
        | AbilityMask::FORTY_G_CR4 => LaneMode::Quad,
        _ => LaneMode::Single,
    }
}
