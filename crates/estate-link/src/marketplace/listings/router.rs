use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use tracing::error;

use super::catalog::ListingStore;
use super::service::ListingCatalog;
use crate::marketplace::{error_body, StoreError};

/// Router exposing the listings CRUD under `/api/properties/properties`, the
/// doubled prefix being the published contract.
pub fn listings_router<S>(catalog: Arc<ListingCatalog<S>>) -> Router
where
    S: ListingStore + 'static,
{
    Router::new()
        .route(
            "/api/properties/properties",
            get(list_handler::<S>).post(create_handler::<S>),
        )
        .route(
            "/api/properties/properties/:id",
            get(get_handler::<S>)
                .put(update_handler::<S>)
                .delete(delete_handler::<S>),
        )
        .with_state(catalog)
}

fn storage_failure(error: StoreError) -> Response {
    error!(%error, "listing storage call failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_body("Internal server error"),
    )
        .into_response()
}

async fn create_handler<S>(
    State(catalog): State<Arc<ListingCatalog<S>>>,
    Json(body): Json<Value>,
) -> Response
where
    S: ListingStore + 'static,
{
    match catalog.create(body).await {
        Ok(rows) => (StatusCode::CREATED, Json(rows)).into_response(),
        Err(error) => storage_failure(error),
    }
}

async fn list_handler<S>(State(catalog): State<Arc<ListingCatalog<S>>>) -> Response
where
    S: ListingStore + 'static,
{
    match catalog.list().await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(error) => storage_failure(error),
    }
}

async fn get_handler<S>(
    State(catalog): State<Arc<ListingCatalog<S>>>,
    Path(id): Path<String>,
) -> Response
where
    S: ListingStore + 'static,
{
    match catalog.get(&id).await {
        Ok(row) => (StatusCode::OK, Json(row)).into_response(),
        Err(error) => storage_failure(error),
    }
}

async fn update_handler<S>(
    State(catalog): State<Arc<ListingCatalog<S>>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response
where
    S: ListingStore + 'static,
{
    match catalog.update(&id, body).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(error) => storage_failure(error),
    }
}

async fn delete_handler<S>(
    State(catalog): State<Arc<ListingCatalog<S>>>,
    Path(id): Path<String>,
) -> Response
where
    S: ListingStore + 'static,
{
    match catalog.delete(&id).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(error) => storage_failure(error),
    }
}
