use crate::models::{TradeRecord, TradeSide};
use std::collections::VecDeque;

/// Most recent trades kept per side.
pub const TRADES_PER_SIDE: usize = 10;

/// A trade as received; the sign of `amount` carries the taker side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTrade {
    pub timestamp: i64,
    pub amount: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TradeMessage {
    Heartbeat,
    Snapshot(Vec<RawTrade>),
    Executed(RawTrade),
    /// Other tags on the trades channel (e.g. execution updates).
    Other,
}

/// Bounded, newest-first trade history per side.
#[derive(Debug, Default)]
pub struct TradeLedger {
    buy: VecDeque<TradeRecord>,
    sell: VecDeque<TradeRecord>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buys(&self) -> Vec<TradeRecord> {
        self.buy.iter().copied().collect()
    }

    pub fn sells(&self) -> Vec<TradeRecord> {
        self.sell.iter().copied().collect()
    }

    pub fn reset_for_connection(&mut self) {
        self.buy.clear();
        self.sell.clear();
    }

    /// Returns whether trade state changed and views should be republished.
    pub fn apply(&mut self, msg: TradeMessage) -> bool {
        match msg {
            TradeMessage::Heartbeat | TradeMessage::Other => false,
            TradeMessage::Snapshot(trades) => {
                // snapshot lists are treated like trades arriving in list order
                for trade in trades {
                    self.record(trade);
                }
                true
            }
            TradeMessage::Executed(trade) => {
                self.record(trade);
                true
            }
        }
    }

    fn record(&mut self, trade: RawTrade) {
        let side = TradeSide::from_signed_amount(trade.amount);
        let list = match side {
            TradeSide::Buy => &mut self.buy,
            TradeSide::Sell => &mut self.sell,
        };

        list.push_front(TradeRecord {
            timestamp: trade.timestamp,
            amount: trade.amount.abs(),
            price: trade.price,
            side,
        });
        list.truncate(TRADES_PER_SIDE);
    }
}
