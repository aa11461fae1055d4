use crate::cli::ServeArgs;
use crate::infra::{build_service, load_catalog, AppState};
use crate::routes::with_matching_routes;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use railmatch::config::AppConfig;
use railmatch::error::AppError;
use railmatch::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) async fn run(args: ServeArgs) -> Result<(), AppError> {
    let ServeArgs {
        host,
        port,
        catalog,
    } = args;

    let mut config = AppConfig::load()?;
    config.server.host = host.unwrap_or(config.server.host);
    config.server.port = port.unwrap_or(config.server.port);
    telemetry::init(&config.telemetry)?;

    let service = Arc::new(build_service(&config, load_catalog(&catalog)?)?);
    let readiness = Arc::new(AtomicBool::new(false));
    let app = instrumented(with_matching_routes(service), Arc::clone(&readiness));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness.store(true, Ordering::Release);
    tracing::info!(stage = ?config.stage, %addr, "rail marketplace matcher ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(readiness))
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

/// Attach the Prometheus layer and the state read by `/ready` and `/metrics`.
fn instrumented(router: Router, readiness: Arc<AtomicBool>) -> Router {
    let (metrics_layer, metrics) = PrometheusMetricLayer::pair();
    router
        .layer(Extension(AppState {
            readiness,
            metrics: Arc::new(metrics),
        }))
        .layer(metrics_layer)
}

async fn shutdown_signal(readiness: Arc<AtomicBool>) {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("ctrl-c handler unavailable, serving until killed");
        std::future::pending::<()>().await;
    }
    readiness.store(false, Ordering::Release);
    tracing::info!("shutdown requested, draining connections");
}
