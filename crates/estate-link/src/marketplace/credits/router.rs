use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use super::domain::PaymentMethod;
use super::ledger::CreditLedger;
use super::service::{CreditError, CreditService};
use crate::marketplace::identity::{IdentityProvider, ProviderError, UserDirectory};
use crate::marketplace::{bearer_token, error_body, StoreError};

/// Router exposing the agent credit endpoints under `/api/credits`.
pub fn credits_router<P, D, L>(service: Arc<CreditService<P, D, L>>) -> Router
where
    P: IdentityProvider + 'static,
    D: UserDirectory + 'static,
    L: CreditLedger + 'static,
{
    Router::new()
        .route("/api/credits/balance", get(balance_handler::<P, D, L>))
        .route("/api/credits/purchase", post(purchase_handler::<P, D, L>))
        .route("/api/credits/use", post(use_handler::<P, D, L>))
        .route(
            "/api/credits/transactions",
            get(transactions_handler::<P, D, L>),
        )
        .with_state(service)
}

fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, error_body(message)).into_response()
}

fn not_signed_in() -> Response {
    (StatusCode::UNAUTHORIZED, error_body("User is not signed in")).into_response()
}

/// Maps a service failure onto its HTTP status: stale-token failures are 401,
/// a lost balance race is 409, everything else is a 400 with the cause.
fn credit_failure(context: &str, error: CreditError) -> Response {
    let status = match &error {
        CreditError::Provider(ProviderError::InvalidToken) => StatusCode::UNAUTHORIZED,
        CreditError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, error_body(format!("{context}: {error}"))).into_response()
}

async fn balance_handler<P, D, L>(
    State(service): State<Arc<CreditService<P, D, L>>>,
    headers: HeaderMap,
) -> Response
where
    P: IdentityProvider + 'static,
    D: UserDirectory + 'static,
    L: CreditLedger + 'static,
{
    let Some(token) = bearer_token(&headers) else {
        return not_signed_in();
    };

    match service.balance(&token).await {
        Ok(account) => {
            let payload = json!({
                "status": "success",
                "credits": account,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => credit_failure("Failed to load credit balance", error),
    }
}

async fn purchase_handler<P, D, L>(
    State(service): State<Arc<CreditService<P, D, L>>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response
where
    P: IdentityProvider + 'static,
    D: UserDirectory + 'static,
    L: CreditLedger + 'static,
{
    let Some(token) = bearer_token(&headers) else {
        return not_signed_in();
    };

    if body.get("amount").is_none() {
        return bad_request("Missing credit amount");
    }

    let Some(raw_method) = body.get("payment_method").and_then(Value::as_str) else {
        return bad_request("Missing payment method");
    };
    let Some(method) = PaymentMethod::parse(raw_method) else {
        return bad_request("Invalid payment method. Allowed values: card, bank_transfer");
    };

    let amount = match body["amount"].as_i64() {
        Some(amount) if amount > 0 => amount,
        Some(_) => return bad_request("Credit amount must be a positive number"),
        None => return bad_request("Credit amount must be a number"),
    };

    match service.purchase(&token, amount, method).await {
        Ok(receipt) => {
            let payload = json!({
                "status": "success",
                "message": "Payment initiated",
                "payment_info": receipt,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => credit_failure("Credit purchase failed", error),
    }
}

async fn use_handler<P, D, L>(
    State(service): State<Arc<CreditService<P, D, L>>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response
where
    P: IdentityProvider + 'static,
    D: UserDirectory + 'static,
    L: CreditLedger + 'static,
{
    let Some(token) = bearer_token(&headers) else {
        return not_signed_in();
    };

    let Some(property_id) = body.get("property_id").and_then(Value::as_str) else {
        return bad_request("Missing property id");
    };

    match service.unlock_contact(&token, property_id).await {
        Ok(access) => {
            let payload = json!({
                "status": "success",
                "message": "Contact access granted",
                "access_info": access,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => credit_failure("Credit usage failed", error),
    }
}

async fn transactions_handler<P, D, L>(
    State(service): State<Arc<CreditService<P, D, L>>>,
    headers: HeaderMap,
) -> Response
where
    P: IdentityProvider + 'static,
    D: UserDirectory + 'static,
    L: CreditLedger + 'static,
{
    let Some(token) = bearer_token(&headers) else {
        return not_signed_in();
    };

    match service.history(&token).await {
        Ok(transactions) => {
            let payload = json!({
                "status": "success",
                "transactions": transactions,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => credit_failure("Failed to load transaction history", error),
    }
}
