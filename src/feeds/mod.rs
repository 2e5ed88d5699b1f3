use crate::config::Config;
use crate::emitter::Publication;
use crate::errors::FeedError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

pub mod bitfinex;

#[async_trait]
pub trait Feed: Send + Sync {
    fn name(&self) -> &'static str;

    /// Spawn one tokio task per configured pair. Each task owns its
    /// connection state and pushes normalized views onto `publisher`.
    async fn run_streams(
        &self,
        config: &Config,
        publisher: mpsc::UnboundedSender<Publication>,
    ) -> Result<(), FeedError>;
}

/// A single connection attempt: connect, handshake, process until the stream ends.
#[async_trait]
pub trait Connector: Send {
    async fn run_once(&mut self) -> Result<(), FeedError>;
}

#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub resync_on_checksum_failure: bool,
}

impl ReconnectPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            delay: config.reconnect_delay,
            resync_on_checksum_failure: config.resync_on_checksum_failure,
        }
    }
}

/// Reconnects after closes and transport errors. A fatal integrity error
/// stops the loop unless the policy asks for a fresh snapshot instead.
pub async fn supervise<C: Connector>(
    feed: &'static str,
    pair: &str,
    connector: &mut C,
    policy: ReconnectPolicy,
) -> Result<(), FeedError> {
    loop {
        match connector.run_once().await {
            Ok(()) => tracing::warn!("[{feed}] {pair} stream closed"),
            Err(e) if e.is_fatal() => {
                tracing::error!("[{feed}] {pair} {e}");
                if !policy.resync_on_checksum_failure {
                    return Err(e);
                }
                tracing::warn!("[{feed}] {pair} resubscribing for a fresh snapshot");
            }
            Err(e) => tracing::warn!("[{feed}] {pair} stream error: {e}"),
        }

        metrics::counter!("feed_reconnects_total", "feed" => feed).increment(1);
        tokio::time::sleep(policy.delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BookError;
    use std::collections::VecDeque;

    struct Scripted {
        results: VecDeque<Result<(), FeedError>>,
        attempts: u32,
    }

    impl Scripted {
        fn new(results: Vec<Result<(), FeedError>>) -> Self {
            Self {
                results: results.into(),
                attempts: 0,
            }
        }
    }

    #[async_trait]
    impl Connector for Scripted {
        async fn run_once(&mut self) -> Result<(), FeedError> {
            self.attempts += 1;
            match self.results.pop_front() {
                Some(result) => result,
                None => std::future::pending().await,
            }
        }
    }

    fn mismatch() -> FeedError {
        FeedError::Integrity(BookError::ChecksumMismatch {
            expected: 1,
            computed: 2,
            input: String::new(),
        })
    }

    fn policy(resync: bool) -> ReconnectPolicy {
        ReconnectPolicy {
            delay: Duration::ZERO,
            resync_on_checksum_failure: resync,
        }
    }

    #[tokio::test]
    async fn stops_on_integrity_failure_by_default() {
        let mut conn = Scripted::new(vec![
            Err(FeedError::WebSocket("reset".into())),
            Ok(()),
            Err(mismatch()),
        ]);

        let err = supervise("test", "BTCUSD", &mut conn, policy(false))
            .await
            .unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(conn.attempts, 3);
    }

    #[tokio::test]
    async fn resyncs_after_integrity_failure_when_enabled() {
        let mut conn = Scripted::new(vec![Err(mismatch()), Err(mismatch())]);

        let run = supervise("test", "BTCUSD", &mut conn, policy(true));
        let timed_out = tokio::time::timeout(Duration::from_millis(50), run).await;

        assert!(timed_out.is_err());
        assert_eq!(conn.attempts, 3);
    }
}
