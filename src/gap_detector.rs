/// Sequence number gap detection across frames
///
/// Tracks the next expected sequence per session and reports loss,
/// out-of-order delivery, and session rollover. Heartbeat and end-of-session
/// frames take part in the same arithmetic as zero-message frames, so a gap
/// that spans into one is still caught. The tracker only reports; requesting
/// retransmission is up to the caller.

use crate::framing::{FrameHeader, SessionId};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Uninitialized,
    Tracking,
    SessionEnded,
}

/// Outcome of feeding one frame header to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GapReport {
    pub has_gap: bool,
    pub gap_start: u64,
    pub gap_count: u64,
    pub out_of_order: bool,
    pub session_changed: bool,
}

impl GapReport {
    pub fn none() -> Self {
        GapReport::default()
    }

    pub fn gap(start: u64, count: u64) -> Self {
        GapReport {
            has_gap: true,
            gap_start: start,
            gap_count: count,
            ..GapReport::default()
        }
    }

    pub fn out_of_order() -> Self {
        GapReport {
            out_of_order: true,
            ..GapReport::default()
        }
    }

    pub fn session_rollover() -> Self {
        GapReport {
            session_changed: true,
            ..GapReport::default()
        }
    }

    /// Missing sequences as a half-open range, suitable for a retransmit request
    pub fn missing(&self) -> Option<Range<u64>> {
        if self.has_gap {
            Some(self.gap_start..self.gap_start + self.gap_count)
        } else {
            None
        }
    }

    pub fn is_clean(&self) -> bool {
        !(self.has_gap || self.out_of_order || self.session_changed)
    }
}

#[derive(Debug, Clone)]
pub struct GapDetector {
    state: TrackerState,
    session: SessionId,
    expected: u64,
    total_missing: u64,
    gap_events: u64,
    out_of_order_events: u64,
    rollovers: u64,
}

impl GapDetector {
    pub fn new() -> Self {
        GapDetector {
            state: TrackerState::Uninitialized,
            session: SessionId::default(),
            expected: 0,
            total_missing: 0,
            gap_events: 0,
            out_of_order_events: 0,
            rollovers: 0,
        }
    }

    /// Process one frame header and report what its sequence implies
    pub fn process(&mut self, header: &FrameHeader) -> GapReport {
        let base = header.first_sequence();

        if self.state == TrackerState::Uninitialized {
            self.adopt(header);
            return GapReport::none();
        }

        if header.session != self.session {
            // New session restarts numbering; comparing against the old
            // expected value would produce a bogus gap.
            self.adopt(header);
            self.rollovers += 1;
            return GapReport::session_rollover();
        }

        if base < self.expected {
            self.out_of_order_events += 1;
            return GapReport::out_of_order();
        }

        let report = if base > self.expected {
            let count = base - self.expected;
            self.total_missing += count;
            self.gap_events += 1;
            GapReport::gap(self.expected, count)
        } else {
            GapReport::none()
        };

        self.expected = header.next_sequence();
        if header.is_end_of_session() {
            self.state = TrackerState::SessionEnded;
        }
        report
    }

    fn adopt(&mut self, header: &FrameHeader) {
        self.session = header.session;
        self.expected = header.next_sequence();
        self.state = if header.is_end_of_session() {
            TrackerState::SessionEnded
        } else {
            TrackerState::Tracking
        };
    }

    pub fn expected_sequence(&self) -> u64 {
        self.expected
    }

    pub fn current_session(&self) -> Option<&SessionId> {
        match self.state {
            TrackerState::Uninitialized => None,
            _ => Some(&self.session),
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn is_end_of_session(&self) -> bool {
        self.state == TrackerState::SessionEnded
    }

    /// Total number of missing sequence numbers reported
    pub fn total_missing(&self) -> u64 {
        self.total_missing
    }

    pub fn gap_events(&self) -> u64 {
        self.gap_events
    }

    pub fn out_of_order_events(&self) -> u64 {
        self.out_of_order_events
    }

    pub fn rollovers(&self) -> u64 {
        self.rollovers
    }

    /// Reset state
    pub fn reset(&mut self) {
        *self = GapDetector::new();
    }
}

impl Default for GapDetector {
    fn default() -> Self {
        Self::new()
    }
}
