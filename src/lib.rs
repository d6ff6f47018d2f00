/// ITCH Feed - Market Data Feed Processor
///
/// Single-writer ingestion core for NASDAQ ITCH 5.0 delivered in
/// MoldUDP64-style frames:
/// - Fixed-layout decoding of all 23 ITCH record kinds
/// - Frame unwrapping with up-front validation
/// - Sequence gap, out-of-order and session rollover detection
/// - Dense price-ladder order books per instrument
/// - Lock-free top-of-book publication (seqlock)
/// - Feed statistics

pub mod protocol;
pub mod decoder;
pub mod seqlock;
pub mod framing;
pub mod gap_detector;
pub mod config;
pub mod book_builder;
pub mod stats;
pub mod feed;

pub use protocol::{MessageType, MessageHeader, Side, Symbol, Alpha, Price, Quantity, OrderRef, PriceDisplay};
pub use decoder::{Decoder, DecodeError, Message, MessageFamily};
pub use seqlock::{sequenced, Publisher, Subscriber, SequencedValue};
pub use framing::{Frame, FrameError, FrameHeader, MessageBlock, SessionId};
pub use gap_detector::{GapDetector, GapReport, TrackerState};
pub use config::{ConfigError, FeedConfig, InstrumentConfig};
pub use book_builder::{BookDepth, BookDiagnostics, BookError, OrderBook, OrderEntry, PriceLevel, TopOfBook};
pub use stats::{FeedStats, LatencyStats};
pub use feed::{FeedHandler, PacketOutcome};
