// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ring-buffer event trace: a flat enum of notable events plus a
//! fixed-capacity circular buffer of the last N entries, inspectable for
//! diagnostics.

use crate::error::MgmtError;
use crate::port_table::{ModBits, PortIndex};

/// Notable events recorded during management-engine and AN processing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Trace {
    None,
    ModulePresenceUpdate(PortIndex, ModBits),
    EepromReadError(PortIndex, MgmtError),
    ConfigRetryExhausted(PortIndex),
    PortDisabledByPolicy(PortIndex),
    PortClearedByPolicy(PortIndex),
    AnRestart(PortIndex),
    AnDispatchAborted(PortIndex, MgmtError),
}

/// Fixed-capacity circular buffer of the most recent [`Trace`] entries.
pub struct RingBuf<const N: usize> {
    entries: [Trace; N],
    next: usize,
    len: usize,
}

impl<const N: usize> Default for RingBuf<N> {
    fn default() -> Self {
        Self {
            entries: [Trace::None; N],
            next: 0,
            len: 0,
        }
    }
}

impl<const N: usize> RingBuf<N> {
    pub fn push(&mut self, entry: Trace) {
        self.entries[self.next] = entry;
        self.next = (self.next + 1) % N;
        self.len = (self.len + 1).min(N);
    }

    /// Entries oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &Trace> {
        let start = if self.len < N { 0 } else { self.next };
        (0..self.len).map(move |i| &self.entries[(start + i) % N])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

pub const TRACE_CAPACITY: usize = 16;

pub type Tracer = RingBuf<TRACE_CAPACITY>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_and_keeps_oldest_first_order() {
        let mut buf: RingBuf<3> = RingBuf::default();
        buf.push(Trace::PortDisabledByPolicy(PortIndex(0)));
        buf.push(Trace::PortDisabledByPolicy(PortIndex(1)));
        buf.push(Trace::PortDisabledByPolicy(PortIndex(2)));
        buf.push(Trace::PortDisabledByPolicy(PortIndex(3)));
        let collected: Vec<_> = buf.iter().copied().collect();
        assert_eq!(
            collected,
            vec![
                Trace::PortDisabledByPolicy(PortIndex(1)),
                Trace::PortDisabledByPolicy(PortIndex(2)),
                Trace::PortDisabledByPolicy(PortIndex(3)),
            ]
        );
    }

    #[test]
    fn empty_buffer_iterates_nothing() {
        let buf: RingBuf<4> = RingBuf::default();
        assert!(buf.is_empty());
        assert_eq!(buf.iter().count(), 0);
    }
}
