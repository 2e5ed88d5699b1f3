pub mod checksum;

use crate::errors::BookError;
use crate::models::{BookSide, PricePoint};
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

/// Levels per side covered by the exchange checksum.
pub const CHECKSUM_DEPTH: usize = 25;

/// One `[price, count, amount]` entry as sent by the exchange.
/// The sign of `amount` selects the side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawLevel {
    pub price: f64,
    pub count: u64,
    pub amount: f64,
}

impl RawLevel {
    pub fn new(price: f64, count: u64, amount: f64) -> Self {
        Self { price, count, amount }
    }

    fn side(&self) -> BookSide {
        BookSide::from_signed_amount(self.amount)
    }

    fn to_price_point(self) -> PricePoint {
        PricePoint {
            price: self.price,
            count: self.count,
            amount: self.amount.abs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BookMessage {
    Heartbeat,
    Checksum(i32),
    Snapshot(Vec<RawLevel>),
    Update(RawLevel),
}

/// What an applied message did. Everything except `Ignored` is a book
/// change the view emitter has to publish.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BookEvent {
    Ignored,
    Snapshot { levels: usize },
    Upserted { side: BookSide, price: f64 },
    Deleted { side: BookSide, price: f64 },
    /// Delete for a price we do not hold; the local copy already diverged.
    DeleteMissed { side: BookSide, price: f64 },
    Verified { checksum: i32 },
}

impl BookEvent {
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Book {
    // price → level. BTreeMap keeps keys sorted ascending.
    bids: BTreeMap<OrderedFloat<f64>, PricePoint>,
    asks: BTreeMap<OrderedFloat<f64>, PricePoint>,
    // Price snapshots: bids descending, asks ascending. Rebuilt after every
    // mutation; views and checksums read these, never the maps' own order.
    bid_prices: Vec<f64>,
    ask_prices: Vec<f64>,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    fn side(&self, side: BookSide) -> &BTreeMap<OrderedFloat<f64>, PricePoint> {
        match side {
            BookSide::Bids => &self.bids,
            BookSide::Asks => &self.asks,
        }
    }

    fn side_mut(&mut self, side: BookSide) -> &mut BTreeMap<OrderedFloat<f64>, PricePoint> {
        match side {
            BookSide::Bids => &mut self.bids,
            BookSide::Asks => &mut self.asks,
        }
    }

    pub fn get(&self, side: BookSide, price: f64) -> Option<&PricePoint> {
        self.side(side).get(&OrderedFloat(price))
    }

    pub fn len(&self, side: BookSide) -> usize {
        self.side(side).len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Sorted distinct prices of a side, best first.
    pub fn prices(&self, side: BookSide) -> &[f64] {
        match side {
            BookSide::Bids => &self.bid_prices,
            BookSide::Asks => &self.ask_prices,
        }
    }

    /// Best `n` levels of a side in price-snapshot order.
    pub fn top(&self, side: BookSide, n: usize) -> Vec<PricePoint> {
        self.prices(side)
            .iter()
            .take(n)
            .filter_map(|p| self.get(side, *p).copied())
            .collect()
    }

    /// Prices present on both sides at once. Always empty for a healthy feed.
    pub fn crossed_prices(&self) -> Vec<f64> {
        self.bids
            .keys()
            .filter(|p| self.asks.contains_key(*p))
            .map(|p| p.into_inner())
            .collect()
    }

    fn insert(&mut self, side: BookSide, point: PricePoint) {
        self.side_mut(side).insert(OrderedFloat(point.price), point);
    }

    fn remove(&mut self, side: BookSide, price: f64) -> Option<PricePoint> {
        self.side_mut(side).remove(&OrderedFloat(price))
    }

    fn refresh_price_snapshots(&mut self) {
        // reversed keys put the highest bid first
        self.bid_prices = self.bids.keys().rev().map(|p| p.into_inner()).collect();
        self.ask_prices = self.asks.keys().map(|p| p.into_inner()).collect();
    }

    fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.bid_prices.clear();
        self.ask_prices.clear();
    }
}

/// Rebuilds one instrument's book from a snapshot followed by incremental
/// updates, and checks it against the exchange's periodic checksums.
#[derive(Debug)]
pub struct OrderBookEngine {
    feed: &'static str,
    book: Book,
    messages: u64,
}

impl OrderBookEngine {
    pub fn new(feed: &'static str) -> Self {
        Self {
            feed,
            book: Book::new(),
            messages: 0,
        }
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    /// Snapshot and update messages applied since the last reset.
    pub fn message_count(&self) -> u64 {
        self.messages
    }

    /// Must run once per connection before the first book message.
    pub fn reset_for_connection(&mut self) {
        self.book.clear();
        self.messages = 0;
    }

    pub fn apply(&mut self, msg: BookMessage) -> Result<BookEvent, BookError> {
        let event = match msg {
            BookMessage::Heartbeat => return Ok(BookEvent::Ignored),
            BookMessage::Checksum(expected) => {
                let checksum = self.verify_checksum(expected)?;
                return Ok(BookEvent::Verified { checksum });
            }
            // The first message of a connection is the full book, whatever its shape.
            BookMessage::Snapshot(levels) if self.messages == 0 => self.apply_snapshot(&levels),
            BookMessage::Update(level) if self.messages == 0 => self.apply_snapshot(&[level]),
            BookMessage::Snapshot(_) => {
                return Err(BookError::UnexpectedSnapshot {
                    messages: self.messages,
                });
            }
            BookMessage::Update(level) => self.apply_update(level),
        };

        self.book.refresh_price_snapshots();
        self.messages += 1;
        Ok(event)
    }

    /// Recomputes the CRC over the top levels and compares it with `expected`.
    /// Does not touch book state.
    pub fn verify_checksum(&self, expected: i32) -> Result<i32, BookError> {
        let input = checksum::checksum_input(&self.book, CHECKSUM_DEPTH);
        let computed = checksum::crc32_signed(&input);

        if computed != expected {
            metrics::counter!("book_checksum_total", "feed" => self.feed, "result" => "mismatch")
                .increment(1);
            tracing::error!(
                "[{}] CHECKSUM FAILED expected={expected} computed={computed}",
                self.feed
            );
            return Err(BookError::ChecksumMismatch {
                expected,
                computed,
                input,
            });
        }

        metrics::counter!("book_checksum_total", "feed" => self.feed, "result" => "ok").increment(1);
        tracing::debug!("[{}] checksum {computed} ok", self.feed);
        Ok(computed)
    }

    fn apply_snapshot(&mut self, levels: &[RawLevel]) -> BookEvent {
        for level in levels {
            self.upsert(*level);
        }
        tracing::debug!(
            "[{}] snapshot: {} bids, {} asks",
            self.feed,
            self.book.len(BookSide::Bids),
            self.book.len(BookSide::Asks)
        );
        BookEvent::Snapshot {
            levels: levels.len(),
        }
    }

    fn apply_update(&mut self, level: RawLevel) -> BookEvent {
        let side = level.side();

        if level.count > 0 {
            self.upsert(level);
            return BookEvent::Upserted {
                side,
                price: level.price,
            };
        }

        if self.book.remove(side, level.price).is_some() {
            BookEvent::Deleted {
                side,
                price: level.price,
            }
        } else {
            metrics::counter!("book_delete_missing_total", "feed" => self.feed).increment(1);
            tracing::warn!(
                "[{}] book delete failed, price point {} not found in {side}",
                self.feed,
                level.price
            );
            BookEvent::DeleteMissed {
                side,
                price: level.price,
            }
        }
    }

    // A price that moves sides leaves its old entry behind. The exchange's
    // checksum is computed the same way, so it is reported, not cleaned up.
    fn upsert(&mut self, level: RawLevel) {
        let side = level.side();
        let other = match side {
            BookSide::Bids => BookSide::Asks,
            BookSide::Asks => BookSide::Bids,
        };

        if self.book.get(other, level.price).is_some() {
            metrics::counter!("book_crossed_price_total", "feed" => self.feed).increment(1);
            tracing::warn!(
                "[{}] price {} present on both sides after update to {side}",
                self.feed,
                level.price
            );
        }

        self.book.insert(side, level.to_price_point());
    }
}
