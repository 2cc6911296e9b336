use crate::cli::ServeArgs;
use crate::demo::{load_profiles, seed_history};
use crate::infra::{demo_jobs, demo_users, AppState, Marketplace};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use gigboard::config::AppConfig;
use gigboard::error::AppError;
use gigboard::telemetry;
use std::sync::atomic::Ordering;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let profiles = load_profiles(args.profiles_csv.take())?;
    let marketplace = Marketplace::assemble(
        config.ranking.clone(),
        demo_jobs(),
        profiles,
        demo_users(),
    );
    if args.seed_demo {
        seed_history(&marketplace, false).await?;
    }

    let app = with_marketplace_routes(&marketplace)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "gig marketplace ready");

    axum::serve(listener, app).await?;
    Ok(())
}
