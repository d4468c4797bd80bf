use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use estate_link::marketplace::credits::{credits_router, CreditLedger, CreditService};
use estate_link::marketplace::error_body;
use estate_link::marketplace::identity::{
    identity_router, IdentityProvider, IdentityService, UserDirectory,
};
use estate_link::marketplace::listings::{listings_router, ListingCatalog, ListingStore};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) message: &'static str,
    pub(crate) supabase_connected: bool,
}

pub(crate) fn marketplace_routes<P, D, L, S>(
    identity: Arc<IdentityService<P, D, L>>,
    credits: Arc<CreditService<P, D, L>>,
    listings: Arc<ListingCatalog<S>>,
) -> Router
where
    P: IdentityProvider + 'static,
    D: UserDirectory + 'static,
    L: CreditLedger + 'static,
    S: ListingStore + 'static,
{
    identity_router(identity)
        .merge(credits_router(credits))
        .merge(listings_router(listings))
        .route("/api/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .fallback(unknown_route)
}

pub(crate) async fn healthcheck(Extension(state): Extension<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "API is running",
        supabase_connected: state.supabase_connected,
    })
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn unknown_route() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        error_body("The requested resource was not found"),
    )
}
