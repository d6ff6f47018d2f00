/// Feed statistics tracking
///
/// Counts messages per family, rejected frames/messages/mutations, sequencing
/// events, and a rolling window of per-packet processing latency.

use crate::decoder::MessageFamily;
use crate::gap_detector::GapReport;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::info;

const WINDOW_SIZE: usize = 10000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyStats {
    pub samples: usize,
    pub min_ns: u64,
    pub max_ns: u64,
    pub mean_ns: f64,
    pub p50_ns: u64,
    pub p99_ns: u64,
}

impl LatencyStats {
    fn from_window(window: &VecDeque<u64>) -> Option<Self> {
        if window.is_empty() {
            return None;
        }

        let mut sorted: Vec<u64> = window.iter().copied().collect();
        sorted.sort_unstable();

        let n = sorted.len();
        Some(LatencyStats {
            samples: n,
            min_ns: sorted[0],
            max_ns: sorted[n - 1],
            mean_ns: sorted.iter().sum::<u64>() as f64 / n as f64,
            p50_ns: sorted[n / 2],
            p99_ns: sorted[(n * 99) / 100],
        })
    }
}

/// Messages decoded, by family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FamilyCounts {
    pub administrative: u64,
    pub order_book: u64,
    pub trade: u64,
    pub indicator: u64,
}

impl FamilyCounts {
    pub fn total(&self) -> u64 {
        self.administrative + self.order_book + self.trade + self.indicator
    }
}

#[derive(Debug, Clone)]
pub struct FeedStats {
    start_time: Option<Instant>,
    total_packets: u64,
    total_bytes: u64,
    heartbeats: u64,

    messages: FamilyCounts,

    frame_errors: u64,
    decode_errors: u64,
    book_errors: u64,
    unrouted: u64,

    // Sequencing
    total_gaps: u64,
    gap_events: u64,
    out_of_order: u64,
    rollovers: u64,

    // Per-packet processing time (nanoseconds)
    packet_latencies: VecDeque<u64>,
}

impl FeedStats {
    pub fn new() -> Self {
        FeedStats {
            start_time: None,
            total_packets: 0,
            total_bytes: 0,
            heartbeats: 0,
            messages: FamilyCounts::default(),
            frame_errors: 0,
            decode_errors: 0,
            book_errors: 0,
            unrouted: 0,
            total_gaps: 0,
            gap_events: 0,
            out_of_order: 0,
            rollovers: 0,
            packet_latencies: VecDeque::with_capacity(WINDOW_SIZE),
        }
    }

    /// Record a packet received, valid or not
    pub fn record_packet(&mut self, size: usize) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
        self.total_packets += 1;
        self.total_bytes += size as u64;
    }

    pub fn record_heartbeat(&mut self) {
        self.heartbeats += 1;
    }

    pub fn record_message(&mut self, family: MessageFamily) {
        match family {
            MessageFamily::Administrative => self.messages.administrative += 1,
            MessageFamily::OrderBook => self.messages.order_book += 1,
            MessageFamily::Trade => self.messages.trade += 1,
            MessageFamily::Indicator => self.messages.indicator += 1,
        }
    }

    pub fn record_frame_error(&mut self) {
        self.frame_errors += 1;
    }

    pub fn record_decode_error(&mut self) {
        self.decode_errors += 1;
    }

    pub fn record_book_error(&mut self) {
        self.book_errors += 1;
    }

    /// Book message for a stock locate with no configured book
    pub fn record_unrouted(&mut self) {
        self.unrouted += 1;
    }

    pub fn record_sequencing(&mut self, report: &GapReport) {
        if report.has_gap {
            self.total_gaps += report.gap_count;
            self.gap_events += 1;
        }
        if report.out_of_order {
            self.out_of_order += 1;
        }
        if report.session_changed {
            self.rollovers += 1;
        }
    }

    /// Record packet processing latency in nanoseconds
    pub fn record_packet_latency(&mut self, nanos: u64) {
        if self.packet_latencies.len() >= WINDOW_SIZE {
            self.packet_latencies.pop_front();
        }
        self.packet_latencies.push_back(nanos);
    }

    /// Get decoded messages per second
    pub fn messages_per_sec(&self) -> f64 {
        self.rate(self.messages.total())
    }

    /// Get bytes per second
    pub fn bytes_per_sec(&self) -> f64 {
        self.rate(self.total_bytes)
    }

    fn rate(&self, count: u64) -> f64 {
        match self.start_time {
            None => 0.0,
            Some(start) => {
                let elapsed = start.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    count as f64 / elapsed
                } else {
                    0.0
                }
            }
        }
    }

    /// Latency over the recent window of parsed packets, stale ones included
    pub fn packet_latency_stats(&self) -> Option<LatencyStats> {
        LatencyStats::from_window(&self.packet_latencies)
    }

    /// Get total elapsed time
    pub fn elapsed(&self) -> Option<Duration> {
        self.start_time.map(|st| st.elapsed())
    }

    pub fn total_packets(&self) -> u64 {
        self.total_packets
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn heartbeats(&self) -> u64 {
        self.heartbeats
    }

    pub fn messages(&self) -> &FamilyCounts {
        &self.messages
    }

    pub fn total_messages(&self) -> u64 {
        self.messages.total()
    }

    pub fn frame_errors(&self) -> u64 {
        self.frame_errors
    }

    pub fn decode_errors(&self) -> u64 {
        self.decode_errors
    }

    pub fn book_errors(&self) -> u64 {
        self.book_errors
    }

    pub fn unrouted(&self) -> u64 {
        self.unrouted
    }

    /// Total missing sequence numbers across all gaps
    pub fn total_gaps(&self) -> u64 {
        self.total_gaps
    }

    pub fn gap_events(&self) -> u64 {
        self.gap_events
    }

    pub fn out_of_order(&self) -> u64 {
        self.out_of_order
    }

    pub fn rollovers(&self) -> u64 {
        self.rollovers
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = FeedStats::new();
    }

    /// Log statistics summary at info level
    pub fn log_summary(&self) {
        info!(
            packets = self.total_packets,
            bytes = self.total_bytes,
            heartbeats = self.heartbeats,
            elapsed = ?self.elapsed(),
            msgs_per_sec = %format!("{:.2}", self.messages_per_sec()),
            "feed totals"
        );
        info!(
            administrative = self.messages.administrative,
            order_book = self.messages.order_book,
            trade = self.messages.trade,
            indicator = self.messages.indicator,
            "messages by family"
        );
        info!(
            frame = self.frame_errors,
            decode = self.decode_errors,
            book = self.book_errors,
            unrouted = self.unrouted,
            "rejections"
        );
        info!(
            missing = self.total_gaps,
            gap_events = self.gap_events,
            out_of_order = self.out_of_order,
            rollovers = self.rollovers,
            "sequencing"
        );

        if let Some(stats) = self.packet_latency_stats() {
            info!(
                min_ns = stats.min_ns,
                max_ns = stats.max_ns,
                mean_ns = %format!("{:.1}", stats.mean_ns),
                p50_ns = stats.p50_ns,
                p99_ns = stats.p99_ns,
                "packet latency"
            );
        }
    }
}

impl Default for FeedStats {
    fn default() -> Self {
        Self::new()
    }
}
