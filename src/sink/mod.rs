pub mod memory;
pub mod redis_sink;

use crate::emitter::Publication;
use crate::errors::SinkError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, mpsc};

pub use memory::MemorySink;
pub use redis_sink::RedisSink;

/// Downstream key/value store for normalized views.
#[async_trait]
pub trait Sink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn publish(&self, key: &str, value: &serde_json::Value) -> Result<(), SinkError>;
}

#[derive(Default)]
struct Pending {
    order: VecDeque<String>,
    values: HashMap<String, serde_json::Value>,
    closed: bool,
}

/// Publications waiting for one sink. Views are latest-value state, so a
/// newer value replaces an unsent one under the same key; the backlog never
/// holds more than one entry per key.
#[derive(Default)]
struct Backlog {
    pending: Mutex<Pending>,
    notify: Notify,
}

impl Backlog {
    async fn push(&self, publication: Publication) {
        let Publication { key, value } = publication;
        let mut pending = self.pending.lock().await;
        if pending.values.insert(key.clone(), value).is_none() {
            pending.order.push_back(key);
        }
        drop(pending);
        self.notify.notify_one();
    }

    async fn close(&self) {
        self.pending.lock().await.closed = true;
        self.notify.notify_one();
    }

    async fn take(&self) -> (Vec<Publication>, bool) {
        let mut pending = self.pending.lock().await;
        let order = std::mem::take(&mut pending.order);
        let batch = order
            .into_iter()
            .filter_map(|key| {
                let value = pending.values.remove(&key)?;
                Some(Publication { key, value })
            })
            .collect();
        (batch, pending.closed)
    }
}

/// Fans every publication out to one worker per sink, so a slow or stuck
/// sink only delays itself. Returns once all emitters are gone and every
/// worker has flushed.
pub async fn drain(
    mut rx: mpsc::UnboundedReceiver<Publication>,
    sinks: Vec<Arc<dyn Sink>>,
    publish_timeout: Duration,
) {
    let mut backlogs = Vec::with_capacity(sinks.len());
    let mut workers = Vec::with_capacity(sinks.len());

    for sink in sinks {
        let backlog = Arc::new(Backlog::default());
        workers.push(tokio::spawn(run_worker(
            sink,
            Arc::clone(&backlog),
            publish_timeout,
        )));
        backlogs.push(backlog);
    }

    while let Some(publication) = rx.recv().await {
        for backlog in &backlogs {
            backlog.push(publication.clone()).await;
        }
    }

    for backlog in &backlogs {
        backlog.close().await;
    }
    for worker in workers {
        if let Err(e) = worker.await {
            tracing::error!("sink worker failed: {e}");
        }
    }

    tracing::info!("publish queue closed, sink task exiting");
}

async fn run_worker(sink: Arc<dyn Sink>, backlog: Arc<Backlog>, publish_timeout: Duration) {
    loop {
        backlog.notify.notified().await;
        let (batch, closed) = backlog.take().await;

        for publication in batch {
            publish_one(sink.as_ref(), &publication, publish_timeout).await;
        }
        if closed {
            break;
        }
    }
}

/// Sink failures are logged and counted; they never reach the feeds.
async fn publish_one(sink: &dyn Sink, publication: &Publication, publish_timeout: Duration) {
    let result = tokio::time::timeout(
        publish_timeout,
        sink.publish(&publication.key, &publication.value),
    )
    .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(SinkError::NotConnected)) => {
            tracing::debug!("[{}] not connected, skipping {}", sink.name(), publication.key)
        }
        Ok(Err(e)) => {
            metrics::counter!("sink_publish_errors_total", "sink" => sink.name()).increment(1);
            tracing::warn!("[{}] publish {} failed: {e}", sink.name(), publication.key);
        }
        Err(_) => {
            metrics::counter!("sink_publish_errors_total", "sink" => sink.name()).increment(1);
            tracing::warn!(
                "[{}] publish {} timed out after {publish_timeout:?}",
                sink.name(),
                publication.key
            );
        }
    }
}
