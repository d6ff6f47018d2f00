/// Order book builder from incremental updates
///
/// Price levels live in a dense array indexed by `(price - min_price) / tick_size`
/// over the instrument's configured range, so every update touches one slot.
/// Best bid/ask indices are kept incrementally; only when the inside level
/// empties is the ladder scanned toward the interior for the next one.
///
/// Every successful mutation publishes a fresh `TopOfBook` through a seqlock,
/// readable from any thread without blocking the writer.

use crate::config::{ConfigResult, InstrumentConfig};
use crate::decoder::Message;
use crate::protocol::{OrderRef, Price, PriceDisplay, Quantity, Side, Symbol};
use crate::seqlock::{sequenced, Publisher, Subscriber};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookError {
    #[error("unknown order ref {0}")]
    UnknownOrder(OrderRef),

    #[error("message for stock locate {got} routed to book for {expected}")]
    WrongInstrument { expected: u16, got: u16 },

    #[error("price {price} outside configured range {min}..={max}")]
    PriceOutOfRange { price: Price, min: Price, max: Price },

    #[error("price {price} is not a multiple of tick {tick} from {min}")]
    PriceOffTick { price: Price, tick: Price, min: Price },

    #[error("order ref {0} already live")]
    DuplicateOrder(OrderRef),

    #[error("invalid side byte {0:#04x}")]
    InvalidSide(u8),

    #[error("{0} does not mutate the book")]
    NotABookMessage(&'static str),
}

pub type BookResult<T> = Result<T, BookError>;

/// Published snapshot of the inside market. A side with zero quantity is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TopOfBook {
    pub bid_price: Price,
    pub bid_qty: u64,
    pub ask_price: Price,
    pub ask_qty: u64,
}

impl TopOfBook {
    pub fn bid(&self) -> Option<(Price, u64)> {
        (self.bid_qty > 0).then_some((self.bid_price, self.bid_qty))
    }

    pub fn ask(&self) -> Option<(Price, u64)> {
        (self.ask_qty > 0).then_some((self.ask_price, self.ask_qty))
    }

    pub fn is_empty(&self) -> bool {
        self.bid_qty == 0 && self.ask_qty == 0
    }

    pub fn is_crossed(&self) -> bool {
        match (self.bid(), self.ask()) {
            (Some((bid, _)), Some((ask, _))) => bid >= ask,
            _ => false,
        }
    }

    /// Ask minus bid, when both sides are present and not crossed
    pub fn spread(&self) -> Option<Price> {
        match (self.bid(), self.ask()) {
            (Some((bid, _)), Some((ask, _))) if bid < ask => Some(ask - bid),
            _ => None,
        }
    }

    /// Midpoint, rounded down to the nearest price unit
    pub fn mid_price(&self) -> Option<Price> {
        match (self.bid(), self.ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(((bid as u64 + ask as u64) / 2) as Price),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceLevel {
    pub quantity: u64,
    pub order_count: u32,
}

impl PriceLevel {
    pub fn is_empty(&self) -> bool {
        self.order_count == 0
    }
}

/// A live order as the book tracks it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderEntry {
    pub side: Side,
    pub price: Price,
    pub remaining: Quantity,
}

/// Counts of dropped or adjusted mutations. Cumulative across `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BookDiagnostics {
    pub unknown_order: u64,
    pub wrong_instrument: u64,
    pub price_out_of_range: u64,
    pub price_off_tick: u64,
    pub duplicate_order: u64,
    pub invalid_side: u64,
    /// Executes/cancels larger than the order's remaining quantity
    pub clamped: u64,
}

impl BookDiagnostics {
    pub fn dropped(&self) -> u64 {
        self.unknown_order
            + self.wrong_instrument
            + self.price_out_of_range
            + self.price_off_tick
            + self.duplicate_order
            + self.invalid_side
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDepth {
    pub bids: Vec<(Price, u64)>,
    pub asks: Vec<(Price, u64)>,
}

/// Order book for one instrument
pub struct OrderBook {
    config: InstrumentConfig,
    symbol: Symbol,

    // Dense ladders, index i <=> min_price + i * tick_size
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
    best_bid: Option<usize>,
    best_ask: Option<usize>,
    bid_levels: usize,
    ask_levels: usize,

    orders: HashMap<OrderRef, OrderEntry>,
    diagnostics: BookDiagnostics,
    publisher: Publisher<TopOfBook>,
}

impl OrderBook {
    pub fn new(config: InstrumentConfig) -> ConfigResult<Self> {
        config.validate()?;
        let levels = config.levels();
        let (publisher, _) = sequenced(TopOfBook::default());

        info!(
            symbol = %config.symbol,
            stock_locate = config.stock_locate,
            levels,
            min = %PriceDisplay(config.min_price as u64),
            max = %PriceDisplay(config.max_price as u64),
            "created order book"
        );

        Ok(OrderBook {
            symbol: Symbol::padded(&config.symbol),
            bids: vec![PriceLevel::default(); levels],
            asks: vec![PriceLevel::default(); levels],
            best_bid: None,
            best_ask: None,
            bid_levels: 0,
            ask_levels: 0,
            orders: HashMap::new(),
            diagnostics: BookDiagnostics::default(),
            publisher,
            config,
        })
    }

    pub fn config(&self) -> &InstrumentConfig {
        &self.config
    }

    pub fn stock_locate(&self) -> u16 {
        self.config.stock_locate
    }

    /// Handle for readers on other threads
    pub fn subscribe(&self) -> Subscriber<TopOfBook> {
        self.publisher.subscribe()
    }

    /// Last published top of book
    pub fn top_of_book(&self) -> TopOfBook {
        self.publisher.read()
    }

    /// Apply one decoded message. Messages that do not mutate a book yield
    /// `NotABookMessage` and are not counted.
    pub fn apply_message(&mut self, msg: &Message) -> BookResult<()> {
        if !msg.is_order_book() {
            return Err(BookError::NotABookMessage(msg.name()));
        }
        let locate = msg.stock_locate();
        if locate != self.config.stock_locate {
            return self.record(Err(BookError::WrongInstrument {
                expected: self.config.stock_locate,
                got: locate,
            }));
        }

        match msg {
            Message::AddOrder(m) => {
                if m.symbol != self.symbol {
                    return self.record(Err(BookError::WrongInstrument {
                        expected: self.config.stock_locate,
                        got: locate,
                    }));
                }
                let side = Side::from_u8(m.side).ok_or(BookError::InvalidSide(m.side));
                match side {
                    Ok(side) => self.add_order(m.order_ref, side, m.price, m.shares),
                    Err(e) => self.record(Err(e)),
                }
            }
            Message::AddOrderMpid(m) => {
                if m.symbol != self.symbol {
                    return self.record(Err(BookError::WrongInstrument {
                        expected: self.config.stock_locate,
                        got: locate,
                    }));
                }
                let side = Side::from_u8(m.side).ok_or(BookError::InvalidSide(m.side));
                match side {
                    Ok(side) => self.add_order(m.order_ref, side, m.price, m.shares),
                    Err(e) => self.record(Err(e)),
                }
            }
            Message::OrderExecuted(m) => self.execute(m.order_ref, m.executed_shares),
            Message::OrderExecutedWithPrice(m) => {
                self.execute_with_price(m.order_ref, m.executed_shares, m.execution_price)
            }
            Message::OrderCancel(m) => self.cancel(m.order_ref, m.cancelled_shares),
            Message::OrderDelete(m) => self.delete(m.order_ref),
            Message::OrderReplace(m) => self.replace(m.original_ref, m.new_ref, m.shares, m.price),
            other => Err(BookError::NotABookMessage(other.name())),
        }
    }

    pub fn add_order(&mut self, order_ref: OrderRef, side: Side, price: Price, shares: Quantity) -> BookResult<()> {
        let result = self.try_add(order_ref, side, price, shares);
        self.commit(result)
    }

    /// Fill against a resting order; unknown refs are dropped
    pub fn execute(&mut self, order_ref: OrderRef, shares: Quantity) -> BookResult<()> {
        let result = self.try_reduce(order_ref, shares);
        self.commit(result)
    }

    /// Fill at a price that may differ from the resting price. The resting
    /// level is what gets reduced.
    pub fn execute_with_price(&mut self, order_ref: OrderRef, shares: Quantity, _price: Price) -> BookResult<()> {
        self.execute(order_ref, shares)
    }

    /// Partial cancel; a quantity above what remains is clamped
    pub fn cancel(&mut self, order_ref: OrderRef, shares: Quantity) -> BookResult<()> {
        let result = self.try_reduce(order_ref, shares);
        self.commit(result)
    }

    pub fn delete(&mut self, order_ref: OrderRef) -> BookResult<()> {
        let result = match self.orders.get(&order_ref) {
            Some(entry) => {
                let remaining = entry.remaining;
                self.try_reduce(order_ref, remaining)
            }
            None => Err(BookError::UnknownOrder(order_ref)),
        };
        self.commit(result)
    }

    /// Remove `original_ref` and add `new_ref` on the same side. Nothing
    /// changes unless the whole replace can be applied.
    pub fn replace(&mut self, original_ref: OrderRef, new_ref: OrderRef, shares: Quantity, price: Price) -> BookResult<()> {
        let result = self.try_replace(original_ref, new_ref, shares, price);
        self.commit(result)
    }

    fn try_replace(&mut self, original_ref: OrderRef, new_ref: OrderRef, shares: Quantity, price: Price) -> BookResult<()> {
        let old = *self
            .orders
            .get(&original_ref)
            .ok_or(BookError::UnknownOrder(original_ref))?;
        self.index_of(price)?;
        if new_ref != original_ref && self.orders.contains_key(&new_ref) {
            return Err(BookError::DuplicateOrder(new_ref));
        }

        self.try_reduce(original_ref, old.remaining)?;
        self.try_add(new_ref, old.side, price, shares)
    }

    fn try_add(&mut self, order_ref: OrderRef, side: Side, price: Price, shares: Quantity) -> BookResult<()> {
        let idx = self.index_of(price)?;
        if self.orders.contains_key(&order_ref) {
            return Err(BookError::DuplicateOrder(order_ref));
        }
        self.orders.insert(order_ref, OrderEntry { side, price, remaining: shares });
        // A zero-share order is tracked but never joins a level
        if shares == 0 {
            return Ok(());
        }

        let (ladder, best, count) = self.side_mut(side);
        let level = &mut ladder[idx];
        if level.is_empty() {
            *count += 1;
        }
        level.quantity += shares as u64;
        level.order_count += 1;

        let improves = match (side, *best) {
            (_, None) => true,
            (Side::Bid, Some(b)) => idx > b,
            (Side::Ask, Some(a)) => idx < a,
        };
        if improves {
            *best = Some(idx);
        }
        Ok(())
    }

    /// Take up to `shares` off an order, removing it once nothing remains
    fn try_reduce(&mut self, order_ref: OrderRef, shares: Quantity) -> BookResult<()> {
        let entry = self
            .orders
            .get_mut(&order_ref)
            .ok_or(BookError::UnknownOrder(order_ref))?;
        let on_ladder = entry.remaining > 0;

        let taken = if shares > entry.remaining {
            debug!(order_ref, requested = shares, remaining = entry.remaining, "clamped oversized reduction");
            self.diagnostics.clamped += 1;
            entry.remaining
        } else {
            shares
        };
        entry.remaining -= taken;
        let OrderEntry { side, price, remaining } = *entry;
        if remaining == 0 {
            self.orders.remove(&order_ref);
        }
        if !on_ladder {
            return Ok(());
        }

        // Prices of live orders were range-checked on entry
        let idx = ((price - self.config.min_price) / self.config.tick_size) as usize;
        let (ladder, best, count) = self.side_mut(side);
        let level = &mut ladder[idx];
        level.quantity -= taken as u64;
        if remaining == 0 {
            level.order_count -= 1;
        }
        if level.is_empty() {
            *count -= 1;
            if *best == Some(idx) {
                *best = Self::scan_inward(ladder, side, idx, *count);
            }
        }
        Ok(())
    }

    /// Next non-empty level moving from a depleted best toward the interior
    fn scan_inward(ladder: &[PriceLevel], side: Side, from: usize, nonempty: usize) -> Option<usize> {
        if nonempty == 0 {
            return None;
        }
        match side {
            Side::Bid => (0..from).rev().find(|&i| !ladder[i].is_empty()),
            Side::Ask => (from + 1..ladder.len()).find(|&i| !ladder[i].is_empty()),
        }
    }

    fn side_mut(&mut self, side: Side) -> (&mut Vec<PriceLevel>, &mut Option<usize>, &mut usize) {
        match side {
            Side::Bid => (&mut self.bids, &mut self.best_bid, &mut self.bid_levels),
            Side::Ask => (&mut self.asks, &mut self.best_ask, &mut self.ask_levels),
        }
    }

    fn index_of(&self, price: Price) -> BookResult<usize> {
        let InstrumentConfig { min_price: min, max_price: max, tick_size: tick, .. } = self.config;
        if price < min || price > max {
            return Err(BookError::PriceOutOfRange { price, min, max });
        }
        let offset = price - min;
        if offset % tick != 0 {
            return Err(BookError::PriceOffTick { price, tick, min });
        }
        Ok((offset / tick) as usize)
    }

    fn price_at(&self, idx: usize) -> Price {
        self.config.min_price + idx as Price * self.config.tick_size
    }

    fn commit(&mut self, result: BookResult<()>) -> BookResult<()> {
        if result.is_ok() {
            self.publish();
        }
        self.record(result)
    }

    fn record(&mut self, result: BookResult<()>) -> BookResult<()> {
        if let Err(e) = &result {
            let d = &mut self.diagnostics;
            match e {
                BookError::UnknownOrder(_) => d.unknown_order += 1,
                BookError::WrongInstrument { .. } => d.wrong_instrument += 1,
                BookError::PriceOutOfRange { .. } => d.price_out_of_range += 1,
                BookError::PriceOffTick { .. } => d.price_off_tick += 1,
                BookError::DuplicateOrder(_) => d.duplicate_order += 1,
                BookError::InvalidSide(_) => d.invalid_side += 1,
                BookError::NotABookMessage(_) => {}
            }
            debug!(symbol = %self.config.symbol, error = %e, "dropped book mutation");
        }
        result
    }

    fn publish(&mut self) {
        let mut top = TopOfBook::default();
        if let Some(i) = self.best_bid {
            top.bid_price = self.price_at(i);
            top.bid_qty = self.bids[i].quantity;
        }
        if let Some(i) = self.best_ask {
            top.ask_price = self.price_at(i);
            top.ask_qty = self.asks[i].quantity;
        }
        self.publisher.write(top);
    }

    /// Get best bid price and aggregate quantity
    pub fn best_bid(&self) -> Option<(Price, u64)> {
        self.best_bid.map(|i| (self.price_at(i), self.bids[i].quantity))
    }

    /// Get best ask price and aggregate quantity
    pub fn best_ask(&self) -> Option<(Price, u64)> {
        self.best_ask.map(|i| (self.price_at(i), self.asks[i].quantity))
    }

    /// Get spread (best ask - best bid), None if a side is empty or the book is crossed
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) if bid < ask => Some(ask - bid),
            _ => None,
        }
    }

    /// Get market depth: top n non-empty levels on each side
    pub fn depth(&self, n: usize) -> BookDepth {
        let bids = match self.best_bid {
            Some(b) => (0..=b)
                .rev()
                .filter(|&i| !self.bids[i].is_empty())
                .take(n)
                .map(|i| (self.price_at(i), self.bids[i].quantity))
                .collect(),
            None => Vec::new(),
        };
        let asks = match self.best_ask {
            Some(a) => (a..self.asks.len())
                .filter(|&i| !self.asks[i].is_empty())
                .take(n)
                .map(|i| (self.price_at(i), self.asks[i].quantity))
                .collect(),
            None => Vec::new(),
        };
        BookDepth { bids, asks }
    }

    /// Aggregate at one price; None when off the ladder or empty
    pub fn level(&self, side: Side, price: Price) -> Option<PriceLevel> {
        let idx = self.index_of(price).ok()?;
        let level = match side {
            Side::Bid => self.bids[idx],
            Side::Ask => self.asks[idx],
        };
        (!level.is_empty()).then_some(level)
    }

    pub fn order(&self, order_ref: OrderRef) -> Option<&OrderEntry> {
        self.orders.get(&order_ref)
    }

    /// Get number of live orders
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Get bid side non-empty level count
    pub fn bid_levels(&self) -> usize {
        self.bid_levels
    }

    /// Get ask side non-empty level count
    pub fn ask_levels(&self) -> usize {
        self.ask_levels
    }

    pub fn diagnostics(&self) -> &BookDiagnostics {
        &self.diagnostics
    }

    /// Drop every order and publish an empty top of book
    pub fn reset(&mut self) {
        self.bids.fill(PriceLevel::default());
        self.asks.fill(PriceLevel::default());
        self.best_bid = None;
        self.best_ask = None;
        self.bid_levels = 0;
        self.ask_levels = 0;
        self.orders.clear();
        self.publish();
    }
}
