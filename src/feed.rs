/// Single-writer ingestion pipeline
///
/// One packet in: frame validation, sequence tracking, per-block decode, and
/// routing of book mutations to the instrument's book by stock locate. All
/// state here is owned by the calling thread; only each book's top of book is
/// shared, through its seqlock subscriber.

use crate::book_builder::{OrderBook, TopOfBook};
use crate::config::{ConfigResult, FeedConfig};
use crate::decoder::{Decoder, Message};
use crate::framing::{Frame, FrameResult};
use crate::gap_detector::{GapDetector, GapReport};
use crate::seqlock::Subscriber;
use crate::stats::FeedStats;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// What one accepted frame amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketOutcome {
    pub sequencing: GapReport,
    /// Messages decoded and dispatched
    pub messages: usize,
    pub decode_errors: usize,
    pub book_errors: usize,
    /// Frame was older than the expected sequence and was not applied
    pub skipped: bool,
}

pub struct FeedHandler {
    config: FeedConfig,
    books: HashMap<u16, OrderBook>,
    tracker: GapDetector,
    stats: FeedStats,
}

impl FeedHandler {
    pub fn new(config: FeedConfig) -> ConfigResult<Self> {
        config.validate()?;
        let mut books = HashMap::with_capacity(config.instruments.len());
        for inst in &config.instruments {
            books.insert(inst.stock_locate, OrderBook::new(inst.clone())?);
        }
        Ok(FeedHandler {
            config,
            books,
            tracker: GapDetector::new(),
            stats: FeedStats::new(),
        })
    }

    pub fn handle_packet(&mut self, buf: &[u8]) -> FrameResult<PacketOutcome> {
        self.handle_packet_with(buf, |_, _| {})
    }

    /// Process one packet, offering every decoded message to `on_message`
    /// with its absolute sequence number before it touches a book.
    ///
    /// A malformed frame is rejected whole. Malformed messages and dropped
    /// book mutations are counted and skipped.
    pub fn handle_packet_with<F>(&mut self, buf: &[u8], mut on_message: F) -> FrameResult<PacketOutcome>
    where
        F: FnMut(u64, &Message),
    {
        let start = Instant::now();
        self.stats.record_packet(buf.len());

        let frame = match Frame::parse_with_limit(buf, self.config.max_messages_per_frame) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, len = buf.len(), "rejected frame");
                self.stats.record_frame_error();
                return Err(e);
            }
        };

        let header = *frame.header();
        let report = self.tracker.process(&header);
        self.stats.record_sequencing(&report);
        let mut outcome = PacketOutcome {
            sequencing: report,
            ..PacketOutcome::default()
        };

        if report.session_changed {
            warn!(session = %header.session, sequence = header.sequence, "session rollover, resetting books");
            for book in self.books.values_mut() {
                book.reset();
            }
        }
        if let Some(missing) = report.missing() {
            warn!(
                session = %header.session,
                from = missing.start,
                to = missing.end,
                count = report.gap_count,
                "sequence gap"
            );
        }
        if report.out_of_order {
            debug!(
                sequence = header.sequence,
                expected = self.tracker.expected_sequence(),
                "skipping stale frame"
            );
            outcome.skipped = true;
            self.stats.record_packet_latency(start.elapsed().as_nanos() as u64);
            return Ok(outcome);
        }

        if frame.is_heartbeat() {
            self.stats.record_heartbeat();
        } else if frame.is_end_of_session() {
            info!(session = %header.session, sequence = header.sequence, "end of session");
        }

        for block in frame.blocks() {
            let msg = match Decoder::decode(block.data) {
                Ok(msg) => msg,
                Err(e) => {
                    debug!(sequence = block.sequence, error = %e, "rejected message");
                    self.stats.record_decode_error();
                    outcome.decode_errors += 1;
                    continue;
                }
            };
            self.stats.record_message(msg.family());
            outcome.messages += 1;
            on_message(block.sequence, &msg);

            if !msg.is_order_book() {
                continue;
            }
            match self.books.get_mut(&msg.stock_locate()) {
                Some(book) => {
                    if book.apply_message(&msg).is_err() {
                        self.stats.record_book_error();
                        outcome.book_errors += 1;
                    }
                }
                None => self.stats.record_unrouted(),
            }
        }

        let elapsed = start.elapsed().as_nanos() as u64;
        self.stats.record_packet_latency(elapsed);
        trace!(
            sequence = header.sequence,
            messages = outcome.messages,
            elapsed_ns = elapsed,
            "processed packet"
        );
        Ok(outcome)
    }

    pub fn book(&self, stock_locate: u16) -> Option<&OrderBook> {
        self.books.get(&stock_locate)
    }

    pub fn book_by_symbol(&self, symbol: &str) -> Option<&OrderBook> {
        self.books.values().find(|b| b.config().symbol == symbol)
    }

    pub fn books(&self) -> impl Iterator<Item = &OrderBook> {
        self.books.values()
    }

    /// Reader handle for one instrument's top of book
    pub fn subscribe(&self, stock_locate: u16) -> Option<Subscriber<TopOfBook>> {
        self.books.get(&stock_locate).map(OrderBook::subscribe)
    }

    pub fn tracker(&self) -> &GapDetector {
        &self.tracker
    }

    pub fn stats(&self) -> &FeedStats {
        &self.stats
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }
}
