// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AN timer scaler: converts a desired wall-clock timeout into the hardware
//! timer's `(timescale, count)` representation.

use crate::error::MgmtError;

/// Converts a desired microsecond timeout into the hardware's
/// `(timescale, count)` pair.
///
/// `scale` starts at 1; for each candidate `timescale` in `2..=7`,
/// `count = desired_us / scale` is tried, then `scale` is multiplied by 10
/// for the next candidate. The first `(timescale, count)` with
/// `count < max_count` wins.
///
/// Returns `(timescale, count, effective_us)`, where `effective_us` is the
/// timeout the hardware will actually produce given that `(timescale,
/// count)` pair.
pub fn get_time_scale(desired_us: u64, max_count: u64) -> Option<(u8, u64, u64)> {
    let mut scale: u64 = 1;
    for timescale in 2u8..=7 {
        let count = desired_us / scale;
        let scale_used = scale;
        scale = scale.saturating_mul(10);
        if count < max_count {
            let effective_us = scale_used * count;
            return Some((timescale, count, effective_us));
        }
    }
    None
}

/// Link-fail-inhibit timer millisecond input validation. `0` means "use
/// default". Returns `Ok(None)` for the default request, or
/// `Ok(Some(ms))` for a validated explicit value.
pub fn validate_link_fail_inhibit_ms(
    ms: u32,
    allow_out_of_spec: bool,
) -> Result<Option<u32>, MgmtError> {
    if ms == 0 {
        return Ok(None);
    }
    let max = if allow_out_of_spec { 1023 } else { 511 };
    if ms >= 1 && ms <= max {
        Ok(Some(ms))
    } else {
        Err(MgmtError::InvalidArgument)
    }
}
