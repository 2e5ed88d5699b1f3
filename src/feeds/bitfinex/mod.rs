pub mod session;
pub mod wire;

use super::{Connector, Feed, ReconnectPolicy, supervise};
use crate::config::Config;
use crate::emitter::{Publication, ViewEmitter};
use crate::errors::FeedError;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use session::Session;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

pub struct Bitfinex {
    ws_url: String,
}

impl Bitfinex {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }
}

/// One pair's websocket connection plus the state rebuilt on every connect.
pub struct PairStream {
    url: String,
    pair: String,
    session: Session,
}

impl PairStream {
    pub fn new(url: String, pair: String, session: Session) -> Self {
        Self { url, pair, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[async_trait]
impl Connector for PairStream {
    /// Connects, resets the session, subscribes, then applies messages until
    /// the stream closes or the book fails its checksum.
    async fn run_once(&mut self) -> Result<(), FeedError> {
        let name = NAME;
        let pair = self.pair.as_str();

        tracing::info!("[{name}] {pair} stream connecting to {}", self.url);

        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| FeedError::WebSocket(e.to_string()))?;

        let (mut write_stream, mut read_stream) = ws_stream.split();

        self.session.reset_for_connection();

        for request in [
            wire::conf_message(),
            wire::subscribe_book(pair),
            wire::subscribe_trades(pair),
        ] {
            write_stream
                .send(Message::text(request))
                .await
                .map_err(|e| FeedError::WebSocket(e.to_string()))?;
        }

        while let Some(msg) = read_stream.next().await {
            let msg = msg.map_err(|e| FeedError::WebSocket(e.to_string()))?;

            match msg {
                Message::Text(text) => self.session.handle_text(&text)?,
                Message::Close(frame) => {
                    tracing::info!("[{name}] {pair} close frame: {frame:?}");
                    break;
                }
                _ => {}
            }
        }

        Ok(())
    }
}

const NAME: &str = "bitfinex";

#[async_trait]
impl Feed for Bitfinex {
    fn name(&self) -> &'static str {
        NAME
    }

    /// Spawns one tokio task per configured pair, each with its own
    /// connection and book. A failing pair never affects the others.
    async fn run_streams(
        &self,
        config: &Config,
        publisher: mpsc::UnboundedSender<Publication>,
    ) -> Result<(), FeedError> {
        let policy = ReconnectPolicy::from_config(config);

        for pair in &config.pairs {
            let name = self.name();
            let emitter = ViewEmitter::new(config.namespace(name, pair), publisher.clone());
            let mut stream = PairStream::new(
                self.ws_url.clone(),
                pair.clone(),
                Session::new(name, emitter),
            );
            let pair = pair.clone();

            tokio::spawn(async move {
                if let Err(e) = supervise(name, &pair, &mut stream, policy).await {
                    tracing::error!("[{name}] {pair} stream stopped: {e}");
                }
            });
        }

        Ok(())
    }
}
