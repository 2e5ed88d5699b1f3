pub mod handlers;
pub mod models;
pub mod router;

use crate::config::Config;
use crate::sink::MemorySink;
use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use std::net::SocketAddr;

pub struct ApiServer {
    views: MemorySink,
}

impl ApiServer {
    pub fn new(views: MemorySink) -> Self {
        Self { views }
    }

    /// Binds the server to the configured port and starts serving.
    /// `render` produces the Prometheus exposition for GET /metrics.
    pub async fn run<R>(
        self,
        config: Config,
        metrics_layer: PrometheusMetricLayer<'static>,
        render: R,
    ) -> anyhow::Result<()>
    where
        R: Fn() -> String + Clone + Send + Sync + 'static,
    {
        let app = router::build(self.views)
            .route("/metrics", get(move || std::future::ready(render())))
            .layer(metrics_layer);
        let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));

        tracing::info!("API server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
