/// Order book correctness tests

mod common;

use common::*;
use itch_feed::{BookError, Decoder, InstrumentConfig, OrderBook, Side, TopOfBook};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap};

const LOCATE: u16 = 1;
const SYMBOL: &str = "AAPL";

fn new_book() -> OrderBook {
    OrderBook::new(InstrumentConfig::new(SYMBOL, LOCATE, 100, 1_000_000, 2_000_000)).unwrap()
}

fn apply(book: &mut OrderBook, bytes: &[u8]) -> Result<(), BookError> {
    let msg = Decoder::decode(bytes).unwrap();
    book.apply_message(&msg)
}

fn top(bid_price: u32, bid_qty: u64, ask_price: u32, ask_qty: u64) -> TopOfBook {
    TopOfBook { bid_price, bid_qty, ask_price, ask_qty }
}

#[test]
fn test_empty_book() {
    let book = new_book();
    assert_eq!(book.best_bid(), None);
    assert_eq!(book.best_ask(), None);
    assert_eq!(book.spread(), None);
    assert_eq!(book.order_count(), 0);
}

#[test]
fn test_add_single_bid() {
    let mut book = new_book();
    apply(&mut book, &add_order(LOCATE, 1, b'B', 100, SYMBOL, 1_500_000)).unwrap();

    assert_eq!(book.best_bid(), Some((1_500_000, 100)));
    assert_eq!(book.best_ask(), None);
    assert_eq!(book.order_count(), 1);
    assert_eq!(book.top_of_book(), top(1_500_000, 100, 0, 0));
}

#[test]
fn test_lifecycle_scenario() {
    let mut book = new_book();
    let reader = book.subscribe();

    apply(&mut book, &add_order(LOCATE, 101, b'B', 100, SYMBOL, 1_500_000)).unwrap();
    apply(&mut book, &add_order(LOCATE, 102, b'B', 200, SYMBOL, 1_500_100)).unwrap();
    apply(&mut book, &add_order(LOCATE, 201, b'S', 150, SYMBOL, 1_500_500)).unwrap();
    apply(&mut book, &add_order(LOCATE, 202, b'S', 250, SYMBOL, 1_500_400)).unwrap();
    assert_eq!(reader.read(), top(1_500_100, 200, 1_500_400, 250));
    assert_eq!(book.spread(), Some(300));

    apply(&mut book, &order_executed(LOCATE, 102, 50, 1)).unwrap();
    assert_eq!(reader.read(), top(1_500_100, 150, 1_500_400, 250));

    apply(&mut book, &order_delete(LOCATE, 202)).unwrap();
    assert_eq!(reader.read(), top(1_500_100, 150, 1_500_500, 150));

    apply(&mut book, &order_executed(LOCATE, 102, 150, 2)).unwrap();
    assert_eq!(reader.read(), top(1_500_000, 100, 1_500_500, 150));
    assert!(book.order(102).is_none());

    apply(&mut book, &order_replace(LOCATE, 201, 301, 300, 1_500_300)).unwrap();
    assert_eq!(reader.read(), top(1_500_000, 100, 1_500_300, 300));
    assert_eq!(book.order(301).map(|o| o.side), Some(Side::Ask));
    assert!(book.order(201).is_none());
    assert_eq!(book.order_count(), 2);
}

#[test]
fn test_same_level_aggregates() {
    let mut book = new_book();
    apply(&mut book, &add_order(LOCATE, 1, b'S', 100, SYMBOL, 1_600_000)).unwrap();
    apply(&mut book, &add_order_mpid(LOCATE, 2, b'S', 40, SYMBOL, 1_600_000, "GSCO")).unwrap();

    let level = book.level(Side::Ask, 1_600_000).unwrap();
    assert_eq!(level.quantity, 140);
    assert_eq!(level.order_count, 2);
    assert_eq!(book.ask_levels(), 1);

    apply(&mut book, &order_cancel(LOCATE, 1, 30)).unwrap();
    assert_eq!(book.best_ask(), Some((1_600_000, 110)));
    assert_eq!(book.level(Side::Ask, 1_600_000).unwrap().order_count, 2);
}

#[test]
fn test_execute_with_price_reduces_resting_level() {
    let mut book = new_book();
    apply(&mut book, &add_order(LOCATE, 1, b'B', 100, SYMBOL, 1_500_000)).unwrap();
    apply(&mut book, &order_executed_with_price(LOCATE, 1, 60, 9, 1_499_000)).unwrap();
    assert_eq!(book.best_bid(), Some((1_500_000, 40)));
    assert!(book.level(Side::Bid, 1_499_000).is_none());
}

#[test]
fn test_cancel_larger_than_remaining_clamps() {
    let mut book = new_book();
    apply(&mut book, &add_order(LOCATE, 1, b'B', 100, SYMBOL, 1_500_000)).unwrap();
    apply(&mut book, &order_cancel(LOCATE, 1, 1_000)).unwrap();
    assert_eq!(book.order_count(), 0);
    assert_eq!(book.best_bid(), None);
    assert_eq!(book.diagnostics().clamped, 1);
}

#[test]
fn test_unknown_order_is_dropped() {
    let mut book = new_book();
    apply(&mut book, &add_order(LOCATE, 1, b'B', 100, SYMBOL, 1_500_000)).unwrap();

    assert_eq!(apply(&mut book, &order_executed(LOCATE, 77, 10, 1)), Err(BookError::UnknownOrder(77)));
    assert_eq!(apply(&mut book, &order_delete(LOCATE, 78)), Err(BookError::UnknownOrder(78)));
    assert_eq!(
        apply(&mut book, &order_replace(LOCATE, 79, 80, 10, 1_500_100)),
        Err(BookError::UnknownOrder(79))
    );
    assert_eq!(book.diagnostics().unknown_order, 3);
    assert_eq!(book.best_bid(), Some((1_500_000, 100)));
    assert!(book.order(80).is_none());
}

#[test]
fn test_zero_share_add_can_be_replaced_or_deleted() {
    let mut book = new_book();
    let reader = book.subscribe();
    apply(&mut book, &add_order(LOCATE, 1, b'B', 0, SYMBOL, 1_500_000)).unwrap();
    apply(&mut book, &add_order(LOCATE, 2, b'S', 0, SYMBOL, 1_500_100)).unwrap();
    assert!(reader.read().is_empty());
    assert_eq!(book.order_count(), 2);

    apply(&mut book, &order_replace(LOCATE, 1, 3, 10, 1_500_000)).unwrap();
    assert_eq!(reader.read(), top(1_500_000, 10, 0, 0));

    apply(&mut book, &order_delete(LOCATE, 2)).unwrap();
    assert_eq!(book.order_count(), 1);
    assert_eq!(book.ask_levels(), 0);
    assert_eq!(book.diagnostics().dropped(), 0);
}

#[test]
fn test_wrong_instrument_is_dropped() {
    let mut book = new_book();
    assert!(matches!(
        apply(&mut book, &add_order(2, 1, b'B', 100, SYMBOL, 1_500_000)),
        Err(BookError::WrongInstrument { expected: 1, got: 2 })
    ));
    assert!(matches!(
        apply(&mut book, &add_order(LOCATE, 1, b'B', 100, "MSFT", 1_500_000)),
        Err(BookError::WrongInstrument { .. })
    ));
    assert_eq!(book.diagnostics().wrong_instrument, 2);
    assert_eq!(book.order_count(), 0);
}

#[test]
fn test_out_of_range_price_is_dropped() {
    let mut book = new_book();
    assert!(matches!(
        apply(&mut book, &add_order(LOCATE, 1, b'B', 100, SYMBOL, 2_500_000)),
        Err(BookError::PriceOutOfRange { .. })
    ));
    assert!(matches!(
        apply(&mut book, &add_order(LOCATE, 2, b'B', 100, SYMBOL, 1_500_001)),
        Err(BookError::PriceOffTick { .. })
    ));
    assert_eq!(book.order_count(), 0);
    assert!(book.top_of_book().is_empty());
}

#[test]
fn test_invalid_side_and_non_book_message() {
    let mut book = new_book();
    assert_eq!(
        apply(&mut book, &add_order(LOCATE, 1, b'?', 100, SYMBOL, 1_500_000)),
        Err(BookError::InvalidSide(b'?'))
    );
    assert!(matches!(
        apply(&mut book, &system_event(0, b'Q')),
        Err(BookError::NotABookMessage(_))
    ));
    assert_eq!(book.diagnostics().invalid_side, 1);
}

#[test]
fn test_depth_skips_empty_levels() {
    let mut book = new_book();
    for (i, price) in [1_500_000u32, 1_499_500, 1_498_000].iter().enumerate() {
        book.add_order(i as u64 + 1, Side::Bid, *price, 10 * (i as u32 + 1)).unwrap();
    }
    book.add_order(10, Side::Ask, 1_501_000, 5).unwrap();

    let depth = book.depth(2);
    assert_eq!(depth.bids, vec![(1_500_000, 10), (1_499_500, 20)]);
    assert_eq!(depth.asks, vec![(1_501_000, 5)]);
}

#[derive(Clone, Copy)]
struct ModelOrder {
    side: Side,
    price: u32,
    remaining: u32,
}

/// Checks every live level against a model and that bests are the extreme non-empty prices
fn check_against_model(book: &OrderBook, model: &HashMap<u64, ModelOrder>) {
    let mut bids: BTreeMap<u32, u64> = BTreeMap::new();
    let mut asks: BTreeMap<u32, u64> = BTreeMap::new();
    for o in model.values() {
        let levels = match o.side {
            Side::Bid => &mut bids,
            Side::Ask => &mut asks,
        };
        *levels.entry(o.price).or_insert(0) += o.remaining as u64;
    }

    assert_eq!(book.bid_levels(), bids.len());
    assert_eq!(book.ask_levels(), asks.len());
    for (&price, &qty) in &bids {
        assert_eq!(book.level(Side::Bid, price).map(|l| l.quantity), Some(qty));
    }
    for (&price, &qty) in &asks {
        assert_eq!(book.level(Side::Ask, price).map(|l| l.quantity), Some(qty));
    }

    let best_bid = bids.iter().next_back().map(|(&p, &q)| (p, q));
    let best_ask = asks.iter().next().map(|(&p, &q)| (p, q));
    assert_eq!(book.best_bid(), best_bid);
    assert_eq!(book.best_ask(), best_ask);

    let published = book.top_of_book();
    assert_eq!(published.bid(), best_bid);
    assert_eq!(published.ask(), best_ask);
    assert_eq!(book.order_count(), model.len());
}

#[test]
fn test_random_operations_keep_levels_consistent() {
    let mut rng = StdRng::seed_from_u64(0x17C4);
    let mut book = new_book();
    let mut model: HashMap<u64, ModelOrder> = HashMap::new();
    let mut next_ref = 1u64;

    for _ in 0..5_000 {
        let live: Vec<u64> = model.keys().copied().collect();
        let op = if live.is_empty() { 0 } else { rng.gen_range(0..5) };

        match op {
            0 => {
                let side = if rng.gen_bool(0.5) { Side::Bid } else { Side::Ask };
                let price = 1_490_000 + 100 * rng.gen_range(0..200u32);
                let shares = rng.gen_range(1..500u32);
                let bytes = add_order(LOCATE, next_ref, side.as_u8(), shares, SYMBOL, price);
                apply(&mut book, &bytes).unwrap();
                model.insert(next_ref, ModelOrder { side, price, remaining: shares });
                next_ref += 1;
            }
            1 | 2 => {
                let r = live[rng.gen_range(0..live.len())];
                let o = model[&r];
                let shares = rng.gen_range(1..=o.remaining + 50);
                let bytes = if op == 1 {
                    order_executed(LOCATE, r, shares, next_ref)
                } else {
                    order_cancel(LOCATE, r, shares)
                };
                apply(&mut book, &bytes).unwrap();
                let left = o.remaining.saturating_sub(shares);
                if left == 0 {
                    model.remove(&r);
                } else {
                    model.insert(r, ModelOrder { remaining: left, ..o });
                }
            }
            3 => {
                let r = live[rng.gen_range(0..live.len())];
                apply(&mut book, &order_delete(LOCATE, r)).unwrap();
                model.remove(&r);
            }
            _ => {
                let r = live[rng.gen_range(0..live.len())];
                let o = model[&r];
                let price = 1_490_000 + 100 * rng.gen_range(0..200u32);
                let shares = rng.gen_range(1..500u32);
                apply(&mut book, &order_replace(LOCATE, r, next_ref, shares, price)).unwrap();
                model.remove(&r);
                model.insert(next_ref, ModelOrder { side: o.side, price, remaining: shares });
                next_ref += 1;
            }
        }

        check_against_model(&book, &model);
    }
}
