use crate::cli::ServeArgs;
use crate::infra::{memory_marketplace, AppState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use immo_market::config::AppConfig;
use immo_market::error::AppError;
use immo_market::marketplace::LocalImageStore;
use immo_market::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(upload_dir) = args.upload_dir.take() {
        config.marketplace.upload_dir = upload_dir;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    tokio::fs::create_dir_all(&config.marketplace.upload_dir).await?;
    let uploads = Arc::new(LocalImageStore::new(
        config.marketplace.upload_dir.clone(),
    ));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        uploads: uploads.clone(),
    };

    let marketplace = memory_marketplace(&config.marketplace, uploads);
    let app = with_service_routes(marketplace)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        upload_dir = %config.marketplace.upload_dir.display(),
        publish_fee = config.marketplace.fees.publish,
        unlock_fee = config.marketplace.fees.phone_unlock,
        "classifieds marketplace ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
