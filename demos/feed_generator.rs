/// Synthetic ITCH feed generator and replay
///
/// Creates random two-sided order flow for one instrument, wraps it in
/// frames, and replays it through `FeedHandler` while a reader thread polls
/// the published top of book. One frame in every 500 is dropped so the gap
/// path shows up in the logs. Optionally writes the frames to a file, each
/// prefixed with its big-endian u16 length.
///
/// Usage: feed_generator [message_count] [output_path]
/// Log level comes from RUST_LOG (default info).

#[path = "../tests/common/mod.rs"]
mod common;

use byteorder::{BigEndian, WriteBytesExt};
use itch_feed::{FeedConfig, FeedHandler, InstrumentConfig, PriceDisplay};
use rand::Rng;
use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOCATE: u16 = 1;
const SYMBOL: &str = "ZVZZT";
const MID: u32 = 1_000_000;
const TICK: u32 = 100;
const MESSAGES_PER_FRAME: usize = 10;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let message_count: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(100_000);
    let mut output = match args.get(2) {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };

    let config = FeedConfig::new(vec![InstrumentConfig::new(SYMBOL, LOCATE, TICK, 500_000, 1_500_000)]);
    let mut feed = FeedHandler::new(config)?;
    let reader = feed.subscribe(LOCATE).ok_or("no book for configured locate")?;

    let done = Arc::new(AtomicBool::new(false));
    let poller = {
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut reads = 0u64;
            let mut crossed = 0u64;
            while !done.load(Ordering::Acquire) {
                if reader.read().is_crossed() {
                    crossed += 1;
                }
                reads += 1;
            }
            (reads, crossed)
        })
    };

    info!(message_count, "generating feed");

    let mut rng = rand::thread_rng();
    let mut live: Vec<u64> = Vec::new();
    let mut next_ref = 1u64;
    let mut match_number = 1u64;
    let mut sequence = 1u64;
    let mut frames = 0u64;
    let mut pending: Vec<Vec<u8>> = vec![common::system_event(34_200_000_000_000, b'Q')];

    for _ in 0..message_count {
        let msg = match rng.gen_range(0..10u8) {
            0..=4 => {
                // Bids sit below MID, asks above, so the book rarely crosses
                let bid = rng.gen_bool(0.5);
                let offset = TICK * rng.gen_range(1..200u32);
                let (side, price) = if bid { (b'B', MID - offset) } else { (b'S', MID + offset) };
                let r = next_ref;
                next_ref += 1;
                live.push(r);
                common::add_order(LOCATE, r, side, rng.gen_range(1..1_000u32), SYMBOL, price)
            }
            // Refs filled or cancelled away stay in `live`; the book counts them as unknown
            5 if !live.is_empty() => {
                let r = live[rng.gen_range(0..live.len())];
                match_number += 1;
                common::order_executed(LOCATE, r, rng.gen_range(1..300u32), match_number)
            }
            6 if !live.is_empty() => {
                let r = live[rng.gen_range(0..live.len())];
                common::order_cancel(LOCATE, r, rng.gen_range(1..300u32))
            }
            7 if !live.is_empty() => {
                let r = live.swap_remove(rng.gen_range(0..live.len()));
                common::order_delete(LOCATE, r)
            }
            8 if !live.is_empty() => {
                let idx = rng.gen_range(0..live.len());
                let r = next_ref;
                next_ref += 1;
                let old = std::mem::replace(&mut live[idx], r);
                // May land on the other side of MID and cross the book
                let price = MID - 20_000 + TICK * rng.gen_range(0..400u32);
                common::order_replace(LOCATE, old, r, rng.gen_range(1..1_000u32), price)
            }
            _ => {
                match_number += 1;
                common::trade(LOCATE, 0, b'B', rng.gen_range(1..500u32), SYMBOL, MID, match_number)
            }
        };
        pending.push(msg);

        if pending.len() >= MESSAGES_PER_FRAME {
            let buf = common::frame(common::SESSION, sequence, &pending);
            sequence += pending.len() as u64;
            pending.clear();
            frames += 1;

            if let Some(out) = output.as_mut() {
                out.write_u16::<BigEndian>(buf.len() as u16)?;
                out.write_all(&buf)?;
            }
            // Simulated loss
            if frames % 500 == 0 {
                continue;
            }
            // Frame errors are already logged and counted by the handler
            let _ = feed.handle_packet(&buf);

            if frames % 100 == 0 {
                let _ = feed.handle_packet(&common::heartbeat(common::SESSION, sequence));
            }
        }
    }

    if !pending.is_empty() {
        let buf = common::frame(common::SESSION, sequence, &pending);
        sequence += pending.len() as u64;
        let _ = feed.handle_packet(&buf);
    }
    let _ = feed.handle_packet(&common::end_of_session(common::SESSION, sequence));

    if let Some(out) = output.as_mut() {
        out.flush()?;
    }

    done.store(true, Ordering::Release);
    let (reads, crossed) = poller.join().map_err(|_| "reader thread panicked")?;

    if let Some(book) = feed.book(LOCATE) {
        let top = book.top_of_book();
        info!(
            symbol = SYMBOL,
            bid = %PriceDisplay(top.bid_price as u64),
            bid_qty = top.bid_qty,
            ask = %PriceDisplay(top.ask_price as u64),
            ask_qty = top.ask_qty,
            orders = book.order_count(),
            bid_levels = book.bid_levels(),
            ask_levels = book.ask_levels(),
            "final top of book"
        );
        info!(diagnostics = ?book.diagnostics(), "book diagnostics");
    }
    info!(reads, crossed, "reader thread");
    feed.stats().log_summary();

    Ok(())
}
