use crate::cli::{ServeArgs, StoreArgs};
use crate::infra::{shutdown_signal, AppState};
use crate::routes::with_experience_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use placement_portal::auth::TokenVerifier;
use placement_portal::config::AppConfig;
use placement_portal::error::AppError;
use placement_portal::store::Store;
use placement_portal::telemetry;
use placement_portal::workflows::experiences::{
    ExperienceRepository, ExperienceRouterState, ExperienceService,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Loads configuration and applies the database override shared by every subcommand.
pub(crate) fn load_config(store: &mut StoreArgs) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(url) = store.database_url.take() {
        config.database.url = url;
    }
    Ok(config)
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = load_config(&mut args.store)?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let store = Store::connect(&config.database).await?;
    store.migrate().await?;
    store.health_check().await?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        store: store.clone(),
    };

    let experience_service = Arc::new(ExperienceService::new(ExperienceRepository::new(
        store.pool().clone(),
    )));
    let tokens = Arc::new(TokenVerifier::new(&config.auth.jwt_secret));

    let app = with_experience_routes(ExperienceRouterState {
        service: experience_service,
        tokens,
    })
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "placement portal api ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(readiness_flag))
        .await?;

    store.close().await;
    info!("placement portal api stopped");
    Ok(())
}
