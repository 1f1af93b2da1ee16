// Periodic refresh of the sensor exporter

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::prom::SensorMetricExporter;

/// Drives the exporter on a fixed interval until cancelled
pub struct MetricCollector {
    exporter: Arc<SensorMetricExporter>,
    interval: Duration,
}

impl MetricCollector {
    pub fn new(exporter: Arc<SensorMetricExporter>, interval: Duration) -> Self {
        Self { exporter, interval }
    }

    pub fn exporter(&self) -> Arc<SensorMetricExporter> {
        Arc::clone(&self.exporter)
    }

    /// Start the collection loop
    pub fn start(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tracing::warn!(
            "Starting sensor collection every {} ms",
            self.interval.as_millis()
        );

        tokio::spawn(async move {
            self.collection_loop(cancel_token).await;
        })
    }

    async fn collection_loop(self, cancel_token: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    tracing::info!("Collection loop cancelled");
                    break;
                }
                _ = interval.tick() => {
                    self.exporter.collect().await;
                }
            }
        }
    }
}
