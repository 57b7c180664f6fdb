// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transceiver EEPROM codec.
//!
//! Pure functions over a cached SFF-8472/SFF-8436 byte buffer: no I/O. The
//! buffer layout mirrors the lower-memory-map offsets used to decode module
//! identity in `drv-transceivers-server` (`get_transceiver_interface`
//! reading the SFF-8024 identifier byte at offset 0), extended here to the
//! full identification field set this crate's module-type decoding needs.

/// Offset of the SFF-8024 identifier byte.
const OFFSET_IDENTIFIER: usize = 0;
/// SFF-8472 Table 5-3: Ethernet compliance codes.
const OFFSET_ETHERNET_COMPLIANCE: usize = 6;
/// SFF-8472 Table 5-3: Infiniband / cable-technology compliance codes.
const OFFSET_CABLE_TECHNOLOGY: usize = 8;
/// SFF-8472 Table 5-3: 10G Ethernet compliance codes.
const OFFSET_10G_COMPLIANCE: usize = 3;
/// SFF-8472: cable length for copper/active-cable assemblies, in metres.
const OFFSET_LENGTH_CABLE: usize = 18;
/// SFF-8472: base ID fields checksum, sum of bytes 0..62 inclusive.
const OFFSET_CC_BASE: usize = 63;
/// SFF-8472: extended ID fields checksum, sum of bytes 64..94 inclusive.
const OFFSET_CC_EXT: usize = 95;

const ETH_COMPLIANCE_1000BASE_T: u8 = 1 << 4;
const ETH_COMPLIANCE_1000BASE_CX: u8 = 1 << 5;
const ETH_COMPLIANCE_1000BASE_LX: u8 = 1 << 6;
const ETH_COMPLIANCE_1000BASE_SX: u8 = 1 << 7;
const ETH_1G_MASK: u8 = ETH_COMPLIANCE_1000BASE_T
    | ETH_COMPLIANCE_1000BASE_CX
    | ETH_COMPLIANCE_1000BASE_LX
    | ETH_COMPLIANCE_1000BASE_SX;

const TENG_COMPLIANCE_SR: u8 = 1 << 4;
const TENG_COMPLIANCE_LR: u8 = 1 << 5;
const TENG_COMPLIANCE_LRM: u8 = 1 << 6;
const TENG_COMPLIANCE_ER: u8 = 1 << 7;
const TENG_MASK: u8 = TENG_COMPLIANCE_SR
    | TENG_COMPLIANCE_LR
    | TENG_COMPLIANCE_LRM
    | TENG_COMPLIANCE_ER;

const CABLE_TECH_ACTIVE: u8 = 1 << 2;
const CABLE_TECH_PASSIVE: u8 = 1 << 3;

/// SFF-8024 identifier values we recognise.
mod sff8024 {
    pub const SFP: u8 = 0x03;
    pub const QSFP: u8 = 0x0C;
    pub const QSFP_PLUS: u8 = 0x0D;
    pub const QSFP28: u8 = 0x11;
    pub const QSFP_DD: u8 = 0x18;
}

/// Decoded module type.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum XcvrType {
    #[default]
    NotPresent,
    Unknown,
    SfpSr,
    SfpLr,
    SfpT,
    Qsfp,
    Aoc,
    Dac,
}

/// Sums `buf[lo..=hi]` mod 256, per SFF-8472's checksum definition.
fn checksum(buf: &[u8], lo: usize, hi: usize) -> u8 {
    buf.get(lo..=hi)
        .unwrap_or(&[])
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Validates the base-ID-fields checksum (bytes 0..62 vs. byte 63).
pub fn is_base_csum_valid(buf: &[u8]) -> bool {
    buf.len() > OFFSET_CC_BASE
        && checksum(buf, 0, OFFSET_CC_BASE - 1) == buf[OFFSET_CC_BASE]
}

/// Validates the extended-ID-fields checksum (bytes 64..94 vs. byte 95).
pub fn is_ext_csum_valid(buf: &[u8]) -> bool {
    buf.len() > OFFSET_CC_EXT
        && checksum(buf, 64, OFFSET_CC_EXT - 1) == buf[OFFSET_CC_EXT]
}

/// Decodes the module type from the cached buffer.
pub fn get_type(buf: &[u8]) -> XcvrType {
    let Some(&id) = buf.get(OFFSET_IDENTIFIER) else {
        return XcvrType::NotPresent;
    };
    let eth = buf.get(OFFSET_ETHERNET_COMPLIANCE).copied().unwrap_or(0);
    let teng = buf.get(OFFSET_10G_COMPLIANCE).copied().unwrap_or(0);
    let cable = buf.get(OFFSET_CABLE_TECHNOLOGY).copied().unwrap_or(0);

    match id {
        sff8024::QSFP
        | sff8024::QSFP_PLUS
        | sff8024::QSFP28
        | sff8024::QSFP_DD => XcvrType::Qsfp,
        sff8024::SFP => {
            if cable & CABLE_TECH_PASSIVE != 0 {
                XcvrType::Dac
            } else if cable & CABLE_TECH_ACTIVE != 0 {
                XcvrType::Aoc
            } else if eth & ETH_COMPLIANCE_1000BASE_T != 0 {
                XcvrType::SfpT
            } else if teng & (TENG_COMPLIANCE_LR | TENG_COMPLIANCE_ER) != 0 {
                XcvrType::SfpLr
            } else if teng & TENG_MASK != 0
                || eth & (ETH_COMPLIANCE_1000BASE_SX | ETH_COMPLIANCE_1000BASE_LX) != 0
            {
                XcvrType::SfpSr
            } else {
                XcvrType::Unknown
            }
        }
        _ => XcvrType::Unknown,
    }
}

/// Cable length in metres; 0 for optical or unknown modules.
pub fn get_length(buf: &[u8]) -> u16 {
    match get_type(buf) {
        XcvrType::Dac | XcvrType::Aoc => {
            buf.get(OFFSET_LENGTH_CABLE).copied().unwrap_or(0) as u16
        }
        _ => 0,
    }
}

/// Whether the module advertises 1000BASE-T Ethernet compliance.
pub fn is_1000base_t(buf: &[u8]) -> bool {
    buf.get(OFFSET_ETHERNET_COMPLIANCE)
        .is_some_and(|&b| b & ETH_COMPLIANCE_1000BASE_T != 0)
}

/// Whether the module is a dual-rate (1G/10G) SFP+, i.e. it advertises both
/// a 1G and a 10G Ethernet compliance code (SFF-8472 Table 3.17 vendor
/// dual-rate indication — advertising both families is how dual-rate
/// modules self-identify in the absence of a dedicated bit).
pub fn is_10g1g_dual_rate(buf: &[u8]) -> bool {
    let eth = buf.get(OFFSET_ETHERNET_COMPLIANCE).copied().unwrap_or(0);
    let teng = buf.get(OFFSET_10G_COMPLIANCE).copied().unwrap_or(0);
    (eth & ETH_1G_MASK != 0) && (teng & TENG_MASK != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf_with(mutate: impl FnOnce(&mut [u8; 128])) -> [u8; 128] {
        let mut buf = [0u8; 128];
        mutate(&mut buf);
        let cc_base = checksum(&buf, 0, OFFSET_CC_BASE - 1);
        buf[OFFSET_CC_BASE] = cc_base;
        buf
    }

    #[test]
    fn absent_module_is_not_present() {
        assert_eq!(get_type(&[]), XcvrType::NotPresent);
    }

    #[test]
    fn sfp_dac_reports_length_and_type() {
        let buf = buf_with(|b| {
            b[OFFSET_IDENTIFIER] = sff8024::SFP;
            b[OFFSET_CABLE_TECHNOLOGY] = CABLE_TECH_PASSIVE;
            b[OFFSET_LENGTH_CABLE] = 3;
        });
        assert_eq!(get_type(&buf), XcvrType::Dac);
        assert_eq!(get_length(&buf), 3);
        assert!(is_base_csum_valid(&buf));
    }

    #[test]
    fn sfp_optical_has_zero_length() {
        let buf = buf_with(|b| {
            b[OFFSET_IDENTIFIER] = sff8024::SFP;
            b[OFFSET_10G_COMPLIANCE] = TENG_COMPLIANCE_SR;
        });
        assert_eq!(get_type(&buf), XcvrType::SfpSr);
        assert_eq!(get_length(&buf), 0);
    }

    #[test]
    fn dual_rate_detection() {
        let buf = buf_with(|b| {
            b[OFFSET_IDENTIFIER] = sff8024::SFP;
            b[OFFSET_ETHERNET_COMPLIANCE] = ETH_COMPLIANCE_1000BASE_T;
            b[OFFSET_10G_COMPLIANCE] = TENG_COMPLIANCE_SR;
        });
        assert!(is_10g1g_dual_rate(&buf));
        assert!(is_1000base_t(&buf));
    }

    #[test]
    fn bad_checksum_detected() {
        let mut buf = buf_with(|b| b[OFFSET_IDENTIFIER] = sff8024::SFP);
        buf[OFFSET_CC_BASE] ^= 0xFF;
        assert!(!is_base_csum_valid(&buf));
    }

    #[test]
    fn qsfp_identifier_maps_to_qsfp_type() {
        let buf = buf_with(|b| b[OFFSET_IDENTIFIER] = sff8024::QSFP28);
        assert_eq!(get_type(&buf), XcvrType::Qsfp);
    }
}
