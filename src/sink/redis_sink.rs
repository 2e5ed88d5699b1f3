use super::Sink;
use crate::errors::SinkError;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

/// Writes each view as a JSON string with `SET key value`.
///
/// The connection is established in the background; until it is up,
/// `publish` reports `NotConnected` and the view is skipped. Views are
/// republished on every change, so nothing is lost for good.
#[derive(Clone)]
pub struct RedisSink {
    url: String,
    conn: Arc<OnceCell<ConnectionManager>>,
}

impl RedisSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            conn: Arc::new(OnceCell::new()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.initialized()
    }

    /// Keeps trying to connect every `retry_delay` until Redis answers.
    /// The manager reconnects on its own afterwards.
    pub fn spawn_connect(&self, retry_delay: Duration) -> JoinHandle<()> {
        let url = self.url.clone();
        let cell = Arc::clone(&self.conn);

        tokio::spawn(async move {
            let conn = retry_until_ok("redis", retry_delay, || open(url.clone())).await;
            if cell.set(conn).is_ok() {
                tracing::info!("Connected to {url}");
            }
        })
    }
}

async fn open(url: String) -> Result<ConnectionManager, SinkError> {
    let client = redis::Client::open(url.as_str())?;
    Ok(client.get_connection_manager().await?)
}

/// Runs `attempt` until it succeeds, sleeping `delay` between failures.
pub(crate) async fn retry_until_ok<T, E, F, Fut>(what: &str, delay: Duration, mut attempt: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut failures: u64 = 0;
    loop {
        match attempt().await {
            Ok(value) => return value,
            Err(e) => {
                failures += 1;
                tracing::warn!("[{what}] connect attempt {failures} failed, retrying in {delay:?}: {e}");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[async_trait]
impl Sink for RedisSink {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn publish(&self, key: &str, value: &serde_json::Value) -> Result<(), SinkError> {
        let Some(conn) = self.conn.get() else {
            return Err(SinkError::NotConnected);
        };
        let payload = serde_json::to_string(value)?;
        // ConnectionManager is a cheap handle over one multiplexed connection
        let mut conn = conn.clone();
        let (): () = conn.set(key, payload).await?;
        Ok(())
    }
}
