use metrics_exporter_prometheus::PrometheusHandle;
use placement_portal::store::Store;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) store: Store,
}

/// Resolves on Ctrl-C, flipping readiness off first so probes drain traffic.
pub(crate) async fn shutdown_signal(readiness: Arc<AtomicBool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
    readiness.store(false, Ordering::Release);
    info!("shutdown signal received");
}
