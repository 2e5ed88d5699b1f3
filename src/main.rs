use axum_prometheus::PrometheusMetricLayer;
use feedbook::api::ApiServer;
use feedbook::config::{Config, LogFormat};
use feedbook::feeds::Feed;
use feedbook::feeds::bitfinex::Bitfinex;
use feedbook::sink::{self, MemorySink, RedisSink, Sink};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }

    // recorder goes in before any feed starts counting
    let (metrics_layer, metric_handle) = PrometheusMetricLayer::pair();

    tracing::info!(
        "Feedbook starting — pairs: {:?}, api port {}",
        config.pairs,
        config.api_port
    );

    // ── 1. Publish sinks ───────────────────────────────────────────
    let views = MemorySink::new();
    let mut sinks: Vec<Arc<dyn Sink>> = vec![Arc::new(views.clone())];

    if let Some(url) = &config.redis_url {
        let redis = RedisSink::new(url.as_str());
        redis.spawn_connect(config.reconnect_delay);
        sinks.push(Arc::new(redis));
    }

    let (publisher, queue) = mpsc::unbounded_channel();
    tokio::spawn(sink::drain(queue, sinks, config.sink_timeout));

    // ── 2. Spawn feed streams ──────────────────────────────────────
    let feeds: Vec<Box<dyn Feed>> = vec![Box::new(Bitfinex::new(config.bitfinex_ws_url.clone()))];

    for feed in &feeds {
        if let Err(e) = feed.run_streams(&config, publisher.clone()).await {
            tracing::error!("[{}] Failed to start stream: {}", feed.name(), e);
        }
    }
    drop(publisher);

    // ── 3. Serve views and metrics ─────────────────────────────────
    let api = ApiServer::new(views);
    let api_config = config.clone();
    tokio::spawn(async move {
        if let Err(e) = api
            .run(api_config, metrics_layer, move || metric_handle.render())
            .await
        {
            tracing::error!("API server stopped: {e}");
        }
    });

    // ── 4. Keep main alive until Ctrl+C ───────────────────────────
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    Ok(())
}
