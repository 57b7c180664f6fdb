// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AN configuration validator: masks and cross-checks advertised abilities
//! against a port's declared capabilities before a base page is sent.

use log::debug;

use super::{AbilityMask, BasePage};
use crate::error::MgmtError;

/// Validates a Clause 73 base page against a port's declared capabilities.
///
/// Unsupported bits (outside [`AbilityMask::SUPPORTED`]) are masked off with
/// a debug log. If nothing remains, fails with [`MgmtError::Unsupported`].
/// Each remaining bit is then cross-checked against `declared_capabilities`;
/// a bit the port cannot support also fails with [`MgmtError::Unsupported`].
/// The cleaned ability is written back into the returned base page.
///
/// Idempotent: `validate(validate(p)) == validate(p)`, since masking an
/// already-masked, already-checked page is a no-op.
pub fn validate_base_page(
    port: u32,
    page: BasePage,
    declared_capabilities: AbilityMask,
) -> Result<BasePage, MgmtError> {
    let raw = page.ability();
    let masked = raw.and(AbilityMask::SUPPORTED);
    if masked.0 != raw.0 {
        debug!(
            target: "xcvr_mgmt::an",
            "port {port}: masking unsupported ability bits {:#06x}",
            raw.0 & !AbilityMask::SUPPORTED.0
        );
    }

    if masked.is_empty() {
        return Err(MgmtError::Unsupported);
    }

    for bit in AbilityMask::iter_by_priority() {
        if masked.intersects(bit) && !declared_capabilities.intersects(bit) {
            debug!(
                target: "xcvr_mgmt::an",
                "port {port}: ability bit {:#06x} not in declared capabilities",
                bit.0
            );
            return Err(MgmtError::Unsupported);
        }
    }

    Ok(page.with_ability(masked))
}
