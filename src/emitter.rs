use crate::models::BookSide;
use crate::orderbook::Book;
use crate::trades::TradeLedger;
use serde::Serialize;
use tokio::sync::mpsc;

/// Levels per side in a published book view.
pub const VIEW_DEPTH: usize = 10;

pub const ORDERBOOK_BUY: &str = "orderbook-buy";
pub const ORDERBOOK_SELL: &str = "orderbook-sell";
pub const TRADES_BUY: &str = "trades-buy";
pub const TRADES_SELL: &str = "trades-sell";

/// A value ready for the publish sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub key: String,
    pub value: serde_json::Value,
}

/// Turns book and trade state into normalized views and queues them for
/// publishing. Never blocks: the queue is drained by the sink task.
#[derive(Debug, Clone)]
pub struct ViewEmitter {
    namespace: String,
    tx: mpsc::UnboundedSender<Publication>,
}

impl ViewEmitter {
    /// `namespace` is prepended to every key, e.g. `bitfinex:BTCUSD`.
    pub fn new(namespace: impl Into<String>, tx: mpsc::UnboundedSender<Publication>) -> Self {
        Self {
            namespace: namespace.into(),
            tx,
        }
    }

    pub fn key(&self, event: &str) -> String {
        format!("{}:{}", self.namespace, event)
    }

    pub fn emit_book(&self, book: &Book) {
        self.publish(ORDERBOOK_SELL, &book.top(BookSide::Asks, VIEW_DEPTH));
        self.publish(ORDERBOOK_BUY, &book.top(BookSide::Bids, VIEW_DEPTH));
    }

    pub fn emit_trades(&self, ledger: &TradeLedger) {
        self.publish(TRADES_SELL, &ledger.sells());
        self.publish(TRADES_BUY, &ledger.buys());
    }

    fn publish<T: Serialize>(&self, event: &str, data: &T) {
        let value = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("[{}] failed to serialize {event}: {e}", self.namespace);
                return;
            }
        };

        let publication = Publication {
            key: self.key(event),
            value,
        };
        if self.tx.send(publication).is_err() {
            tracing::warn!("[{}] publish queue closed, dropping {event}", self.namespace);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::{BookMessage, OrderBookEngine, RawLevel};
    use crate::trades::{RawTrade, TradeMessage};
    use serde_json::json;

    #[test]
    fn book_views_publish_sell_then_buy() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let emitter = ViewEmitter::new("bitfinex:BTCUSD", tx);
        let mut engine = OrderBookEngine::new("test");
        engine
            .apply(BookMessage::Snapshot(vec![
                RawLevel::new(100.0, 1, 2.0),
                RawLevel::new(99.0, 1, -3.0),
            ]))
            .unwrap();

        emitter.emit_book(engine.book());

        let sell = rx.try_recv().unwrap();
        assert_eq!(sell.key, "bitfinex:BTCUSD:orderbook-sell");
        assert_eq!(sell.value, json!([{"price": 99.0, "count": 1, "amount": 3.0}]));
        let buy = rx.try_recv().unwrap();
        assert_eq!(buy.key, "bitfinex:BTCUSD:orderbook-buy");
        assert_eq!(buy.value, json!([{"price": 100.0, "count": 1, "amount": 2.0}]));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unchanged_state_is_still_published() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let emitter = ViewEmitter::new("x", tx);
        let engine = OrderBookEngine::new("test");

        emitter.emit_book(engine.book());
        emitter.emit_book(engine.book());

        let mut count = 0;
        while let Ok(p) = rx.try_recv() {
            assert_eq!(p.value, json!([]));
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn trade_views_carry_side() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let emitter = ViewEmitter::new("x", tx);
        let mut ledger = TradeLedger::new();
        ledger.apply(TradeMessage::Executed(RawTrade {
            timestamp: 1700000000000,
            amount: -0.5,
            price: 42000.0,
        }));

        emitter.emit_trades(&ledger);

        let sell = rx.try_recv().unwrap();
        assert_eq!(sell.key, "x:trades-sell");
        assert_eq!(
            sell.value,
            json!([{"timestamp": 1700000000000i64, "amount": 0.5, "price": 42000.0, "side": "sell"}])
        );
        assert_eq!(rx.try_recv().unwrap().value, json!([]));
    }
}
