use super::wire::{self, ControlEvent, Frame};
use crate::channels::ChannelRouter;
use crate::emitter::ViewEmitter;
use crate::errors::FeedError;
use crate::models::{ChannelId, StreamKind};
use crate::orderbook::OrderBookEngine;
use crate::trades::TradeLedger;
use serde_json::Value;

/// Everything one connection owns. Messages are applied strictly in arrival
/// order; nothing here is shared with other connections.
#[derive(Debug)]
pub struct Session {
    feed: &'static str,
    router: ChannelRouter,
    book: OrderBookEngine,
    trades: TradeLedger,
    emitter: ViewEmitter,
}

impl Session {
    pub fn new(feed: &'static str, emitter: ViewEmitter) -> Self {
        Self {
            feed,
            router: ChannelRouter::new(),
            book: OrderBookEngine::new(feed),
            trades: TradeLedger::new(),
            emitter,
        }
    }

    pub fn book(&self) -> &OrderBookEngine {
        &self.book
    }

    pub fn trades(&self) -> &TradeLedger {
        &self.trades
    }

    pub fn router(&self) -> &ChannelRouter {
        &self.router
    }

    /// Drops all state from the previous connection. Call before the handshake.
    pub fn reset_for_connection(&mut self) {
        self.router.clear();
        self.book.reset_for_connection();
        self.trades.reset_for_connection();
    }

    /// Applies one raw text frame. Malformed frames are logged and dropped;
    /// only a book integrity failure comes back as an error.
    pub fn handle_text(&mut self, text: &str) -> Result<(), FeedError> {
        metrics::counter!("feed_messages_total", "feed" => self.feed).increment(1);

        let result = wire::decode_frame(text).and_then(|frame| match frame {
            Frame::Event(event) => {
                self.handle_event(event);
                Ok(())
            }
            Frame::Data { channel, payload } => self.handle_data(&channel, &payload),
        });

        match result {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                metrics::counter!("feed_malformed_total", "feed" => self.feed).increment(1);
                tracing::warn!("[{}] dropping message: {e}", self.feed);
                tracing::debug!("[{}] dropped frame: {text}", self.feed);
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    fn handle_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Subscribed {
                chan_id,
                channel,
                symbol,
            } => match StreamKind::from_channel_name(&channel) {
                Some(kind) => {
                    tracing::info!(
                        "[{}] subscribed to {channel} {} on channel {chan_id}",
                        self.feed,
                        symbol.unwrap_or_default()
                    );
                    self.router.register(chan_id, kind);
                }
                None => tracing::debug!("[{}] ignoring subscription to {channel}", self.feed),
            },
            ControlEvent::Error { msg, code } => {
                tracing::warn!("[{}] exchange error {code:?}: {msg}", self.feed)
            }
            ControlEvent::Info { version } => {
                tracing::debug!("[{}] info, api version {version:?}", self.feed)
            }
            ControlEvent::Conf { status } => {
                tracing::debug!("[{}] conf status {status:?}", self.feed)
            }
            ControlEvent::Other => {}
        }
    }

    fn handle_data(&mut self, channel: &ChannelId, payload: &[Value]) -> Result<(), FeedError> {
        match self.router.classify(channel) {
            Some(StreamKind::Book) => {
                let msg = wire::decode_book(payload)?;
                let event = self.book.apply(msg).map_err(|e| {
                    if e.is_fatal() {
                        FeedError::Integrity(e)
                    } else {
                        FeedError::UnexpectedData(e.to_string())
                    }
                })?;
                if event.is_change() {
                    self.emitter.emit_book(self.book.book());
                }
            }
            Some(StreamKind::Trades) => {
                let msg = wire::decode_trades(payload)?;
                if self.trades.apply(msg) {
                    self.emitter.emit_trades(&self.trades);
                }
            }
            None => tracing::trace!("[{}] no route for channel {channel}", self.feed),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::Publication;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn session() -> (Session, mpsc::UnboundedReceiver<Publication>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut session = Session::new("bitfinex", ViewEmitter::new("bitfinex:BTCUSD", tx));
        session.reset_for_connection();
        (session, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Publication>) -> Vec<Publication> {
        let mut out = Vec::new();
        while let Ok(p) = rx.try_recv() {
            out.push(p);
        }
        out
    }

    #[test]
    fn unrouted_channels_are_dropped() {
        let (mut session, mut rx) = session();
        session.handle_text(r#"[5,[[100,1,2]]]"#).unwrap();

        assert!(session.book().book().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn malformed_frames_do_not_stop_the_stream() {
        let (mut session, mut rx) = session();
        session
            .handle_text(r#"{"event":"subscribed","channel":"book","chanId":1}"#)
            .unwrap();

        session.handle_text("{oops").unwrap();
        session.handle_text(r#"[1,[100,"bad",2]]"#).unwrap();
        session.handle_text(r#"[1,[[100,1,2]]]"#).unwrap();

        assert_eq!(session.book().message_count(), 1);
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[test]
    fn trades_are_published_on_each_change() {
        let (mut session, mut rx) = session();
        session
            .handle_text(r#"{"event":"subscribed","channel":"trades","chanId":9,"symbol":"tBTCUSD"}"#)
            .unwrap();

        session.handle_text(r#"[9,"hb"]"#).unwrap();
        session
            .handle_text(r#"[9,"te",[1,1000,-0.25,42000]]"#)
            .unwrap();

        let published = drain(&mut rx);
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].key, "bitfinex:BTCUSD:trades-sell");
        assert_eq!(
            published[0].value,
            json!([{"timestamp": 1000, "amount": 0.25, "price": 42000.0, "side": "sell"}])
        );
        assert_eq!(published[1].key, "bitfinex:BTCUSD:trades-buy");
    }

    #[test]
    fn reset_forgets_channels() {
        let (mut session, _rx) = session();
        session
            .handle_text(r#"{"event":"subscribed","channel":"book","chanId":1}"#)
            .unwrap();
        session.handle_text(r#"[1,[[100,1,2]]]"#).unwrap();

        session.reset_for_connection();

        assert!(session.router().is_empty());
        assert!(session.book().book().is_empty());
        assert_eq!(session.book().message_count(), 0);
    }
}
