/// End-to-end feed handler tests: frames in, top of book out

mod common;

use common::*;
use itch_feed::{FeedConfig, FeedHandler, InstrumentConfig, Message, TopOfBook};

const LOCATE: u16 = 3;
const SYMBOL: &str = "ZVZZT";

fn handler() -> FeedHandler {
    let config = FeedConfig::new(vec![InstrumentConfig::new(SYMBOL, LOCATE, 100, 500_000, 1_500_000)]);
    FeedHandler::new(config).unwrap()
}

fn top(bid_price: u32, bid_qty: u64, ask_price: u32, ask_qty: u64) -> TopOfBook {
    TopOfBook { bid_price, bid_qty, ask_price, ask_qty }
}

#[test]
fn test_open_build_and_partial_fill() {
    let mut feed = handler();
    let reader = feed.subscribe(LOCATE).unwrap();

    let mut market_open = false;
    feed.handle_packet_with(&frame(SESSION, 1, &[system_event(34_200_000_000_000, b'Q')]), |_, msg| {
        if let Message::SystemEvent(ev) = msg {
            market_open = ev.is_market_open();
        }
    })
    .unwrap();
    assert!(market_open);
    assert!(reader.read().is_empty());

    let mut seq = 2u64;
    let mut send = |feed: &mut FeedHandler, msg: Vec<u8>| {
        let outcome = feed.handle_packet(&frame(SESSION, seq, &[msg])).unwrap();
        assert!(outcome.sequencing.is_clean());
        assert_eq!(outcome.messages, 1);
        assert_eq!(outcome.book_errors, 0);
        seq += 1;
    };

    let adds = [
        (1u64, b'B', 100u32, 999_900u32, top(999_900, 100, 0, 0)),
        (2, b'S', 150, 1_000_100, top(999_900, 100, 1_000_100, 150)),
        (3, b'B', 200, 999_800, top(999_900, 100, 1_000_100, 150)),
        (4, b'S', 250, 1_000_200, top(999_900, 100, 1_000_100, 150)),
        (5, b'B', 300, 999_700, top(999_900, 100, 1_000_100, 150)),
        (6, b'S', 350, 1_000_300, top(999_900, 100, 1_000_100, 150)),
    ];
    for (order_ref, side, shares, price, expected) in adds {
        send(&mut feed, add_order(LOCATE, order_ref, side, shares, SYMBOL, price));
        assert_eq!(reader.read(), expected, "after add {}", order_ref);
    }
    assert_eq!(reader.read().mid_price(), Some(1_000_000));
    assert_eq!(reader.read().spread(), Some(200));

    send(&mut feed, order_executed(LOCATE, 1, 40, 1));
    assert_eq!(reader.read(), top(999_900, 60, 1_000_100, 150));

    let book = feed.book(LOCATE).unwrap();
    assert_eq!(book.order_count(), 6);
    assert_eq!(book.depth(3).bids, vec![(999_900, 60), (999_800, 200), (999_700, 300)]);

    let stats = feed.stats();
    assert_eq!(stats.total_packets(), 8);
    assert_eq!(stats.messages().administrative, 1);
    assert_eq!(stats.messages().order_book, 7);
    assert!(stats.packet_latency_stats().is_some());
}

#[test]
fn test_gap_is_reported_and_processing_continues() {
    let mut feed = handler();
    feed.handle_packet(&frame(SESSION, 1, &[add_order(LOCATE, 1, b'B', 100, SYMBOL, 999_900)]))
        .unwrap();

    let outcome = feed
        .handle_packet(&frame(SESSION, 10, &[add_order(LOCATE, 2, b'S', 100, SYMBOL, 1_000_100)]))
        .unwrap();
    assert_eq!(outcome.sequencing.missing(), Some(2..10));
    assert!(!outcome.skipped);
    assert_eq!(feed.stats().total_gaps(), 8);
    assert_eq!(feed.book(LOCATE).unwrap().order_count(), 2);
}

#[test]
fn test_rollover_resets_books() {
    let mut feed = handler();
    let reader = feed.subscribe(LOCATE).unwrap();
    feed.handle_packet(&frame("SESSA", 50, &[add_order(LOCATE, 1, b'B', 100, SYMBOL, 999_900)]))
        .unwrap();
    assert_eq!(reader.read().bid_qty, 100);

    let outcome = feed
        .handle_packet(&frame("SESSB", 1, &[add_order(LOCATE, 1, b'S', 10, SYMBOL, 1_000_100)]))
        .unwrap();
    assert!(outcome.sequencing.session_changed);
    assert!(!outcome.sequencing.has_gap);
    assert_eq!(reader.read(), top(0, 0, 1_000_100, 10));
    assert_eq!(feed.tracker().expected_sequence(), 2);
    assert_eq!(feed.stats().rollovers(), 1);
}

#[test]
fn test_malformed_frame_has_no_effect() {
    let mut feed = handler();
    let mut buf = frame(SESSION, 1, &[add_order(LOCATE, 1, b'B', 100, SYMBOL, 999_900)]);
    buf.push(0xFF);
    assert!(feed.handle_packet(&buf).is_err());
    assert_eq!(feed.book(LOCATE).unwrap().order_count(), 0);
    assert_eq!(feed.stats().frame_errors(), 1);
    assert_eq!(feed.tracker().current_session(), None);
}

#[test]
fn test_config_from_json() {
    let json = r#"{"instruments":[{"symbol":"ZVZZT","stock_locate":3,"tick_size":100,"min_price":500000,"max_price":1500000}],"max_messages_per_frame":2}"#;
    let mut feed = FeedHandler::new(FeedConfig::from_json_str(json).unwrap()).unwrap();
    assert!(feed.book_by_symbol(SYMBOL).is_some());

    let blocks = [order_delete(LOCATE, 1), order_delete(LOCATE, 2), order_delete(LOCATE, 3)];
    assert!(feed.handle_packet(&frame(SESSION, 1, &blocks)).is_err());
}
