use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use estate_link::config::AppConfig;
use estate_link::error::AppError;
use estate_link::marketplace::credits::CreditService;
use estate_link::marketplace::identity::IdentityService;
use estate_link::marketplace::listings::ListingCatalog;
use estate_link::supabase::SupabaseClient;
use estate_link::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let supabase = Arc::new(SupabaseClient::new(&config.supabase));
    let supabase_connected = supabase.health().await;
    if !supabase_connected {
        warn!("hosted backend health probe failed, reporting degraded status");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        supabase_connected,
    };

    let identity = Arc::new(IdentityService::new(
        supabase.clone(),
        supabase.clone(),
        supabase.clone(),
    ));
    let credits = Arc::new(CreditService::new(
        supabase.clone(),
        supabase.clone(),
        supabase.clone(),
    ));
    let listings = Arc::new(ListingCatalog::new(supabase));

    let app = marketplace_routes(identity, credits, listings)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "property marketplace api ready");

    axum::serve(listener, app).await?;
    Ok(())
}
