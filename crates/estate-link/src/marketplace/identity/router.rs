use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use super::directory::UserDirectory;
use super::domain::{NewRegistration, UserType};
use super::provider::IdentityProvider;
use super::service::IdentityService;
use crate::marketplace::credits::CreditLedger;
use crate::marketplace::{bearer_token, error_body};

/// Router exposing the authentication endpoints under `/api/auth`.
pub fn identity_router<P, D, L>(service: Arc<IdentityService<P, D, L>>) -> Router
where
    P: IdentityProvider + 'static,
    D: UserDirectory + 'static,
    L: CreditLedger + 'static,
{
    Router::new()
        .route("/api/auth/register", post(register_handler::<P, D, L>))
        .route("/api/auth/login", post(login_handler::<P, D, L>))
        .route("/api/auth/google", post(google_handler::<P, D, L>))
        .route("/api/auth/logout", post(logout_handler::<P, D, L>))
        .route("/api/auth/me", get(me_handler::<P, D, L>))
        .with_state(service)
}

fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, error_body(message)).into_response()
}

fn unauthorized(message: impl Into<String>) -> Response {
    (StatusCode::UNAUTHORIZED, error_body(message)).into_response()
}

async fn register_handler<P, D, L>(
    State(service): State<Arc<IdentityService<P, D, L>>>,
    Json(body): Json<Value>,
) -> Response
where
    P: IdentityProvider + 'static,
    D: UserDirectory + 'static,
    L: CreditLedger + 'static,
{
    for field in ["email", "password", "user_type", "full_name"] {
        if body.get(field).and_then(Value::as_str).is_none() {
            return bad_request(format!("Missing required field: {field}"));
        }
    }

    let raw_type = body["user_type"].as_str().unwrap_or_default();
    let Some(user_type) = UserType::parse(raw_type) else {
        return bad_request("Invalid user type. Allowed values: seller, agent");
    };

    let registration = NewRegistration {
        email: body["email"].as_str().unwrap_or_default().to_string(),
        password: body["password"].as_str().unwrap_or_default().to_string(),
        user_type,
        full_name: body["full_name"].as_str().unwrap_or_default().to_string(),
        phone: body
            .get("phone")
            .and_then(Value::as_str)
            .map(str::to_string),
    };

    match service.register(registration).await {
        Ok(user) => {
            let payload = json!({
                "status": "success",
                "message": "User registered successfully",
                "user": user,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(error) => bad_request(format!("Registration failed: {error}")),
    }
}

async fn login_handler<P, D, L>(
    State(service): State<Arc<IdentityService<P, D, L>>>,
    Json(body): Json<Value>,
) -> Response
where
    P: IdentityProvider + 'static,
    D: UserDirectory + 'static,
    L: CreditLedger + 'static,
{
    let email = body.get("email").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);
    let (Some(email), Some(password)) = (email, password) else {
        return bad_request("Missing email or password");
    };

    match service.login(email, password).await {
        Ok(session) => {
            let payload = json!({
                "status": "success",
                "message": "Login successful",
                "user": session.user,
                "token": session.access_token,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => unauthorized(format!("Login failed: {error}")),
    }
}

async fn google_handler<P, D, L>(
    State(service): State<Arc<IdentityService<P, D, L>>>,
    Json(body): Json<Value>,
) -> Response
where
    P: IdentityProvider + 'static,
    D: UserDirectory + 'static,
    L: CreditLedger + 'static,
{
    let Some(id_token) = body.get("token").and_then(Value::as_str) else {
        return bad_request("Missing Google token");
    };
    let user_type = body.get("user_type").and_then(Value::as_str);

    match service.login_with_google(id_token, user_type).await {
        Ok(login) => {
            let payload = json!({
                "status": "success",
                "message": "Google login successful",
                "user": login.user,
                "token": login.access_token,
                "is_new_user": login.is_new_user,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => unauthorized(format!("Google login failed: {error}")),
    }
}

async fn logout_handler<P, D, L>(
    State(service): State<Arc<IdentityService<P, D, L>>>,
    headers: HeaderMap,
) -> Response
where
    P: IdentityProvider + 'static,
    D: UserDirectory + 'static,
    L: CreditLedger + 'static,
{
    let token = bearer_token(&headers);
    match service.logout(token.as_deref()).await {
        Ok(()) => {
            let payload = json!({
                "status": "success",
                "message": "Logout successful",
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => bad_request(format!("Logout failed: {error}")),
    }
}

async fn me_handler<P, D, L>(
    State(service): State<Arc<IdentityService<P, D, L>>>,
    headers: HeaderMap,
) -> Response
where
    P: IdentityProvider + 'static,
    D: UserDirectory + 'static,
    L: CreditLedger + 'static,
{
    let Some(token) = bearer_token(&headers) else {
        return unauthorized("User is not signed in");
    };

    match service.current_user(&token).await {
        Ok(user) => {
            let payload = json!({
                "status": "success",
                "user": user,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => unauthorized(format!("Failed to load user info: {error}")),
    }
}
