use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::gate::AuthGate;
use crate::config::GateKind;
use crate::http::request::request_id_of;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::client_ip;

/// Generic failure; never says whether a password is configured at all.
pub const INCORRECT_PASSWORD: &str = "Incorrect password";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub authenticated: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

pub async fn preview_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    login(state.gates.get(GateKind::Preview), &headers, &body)
}

pub async fn preview_logout(State(state): State<AppState>) -> Response {
    logout(state.gates.get(GateKind::Preview))
}

pub async fn preview_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<StatusResponse> {
    status(state.gates.get(GateKind::Preview), &headers)
}

pub async fn admin_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    login(state.gates.get(GateKind::Admin), &headers, &body)
}

pub async fn admin_logout(State(state): State<AppState>) -> Response {
    logout(state.gates.get(GateKind::Admin))
}

pub async fn admin_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<StatusResponse> {
    status(state.gates.get(GateKind::Admin), &headers)
}

fn login(gate: &AuthGate, headers: &HeaderMap, body: &[u8]) -> Response {
    // A body that is not JSON, or has no password, is just a wrong password.
    let supplied = serde_json::from_slice::<LoginRequest>(body)
        .ok()
        .and_then(|req| req.password);

    let accepted = supplied
        .as_deref()
        .map(|password| gate.verify(password))
        .unwrap_or(false);

    let client = client_ip::resolve(headers);
    let request_id = request_id_of(headers);
    metrics::record_login_attempt(gate.kind().as_str(), accepted);

    if accepted {
        tracing::info!(
            request_id = %request_id,
            gate = %gate.kind(),
            client = %client,
            "Login accepted"
        );
        (
            StatusCode::OK,
            [(header::SET_COOKIE, gate.issue_session())],
            Json(SuccessResponse { success: true }),
        )
            .into_response()
    } else {
        tracing::warn!(
            request_id = %request_id,
            gate = %gate.kind(),
            client = %client,
            "Login rejected"
        );
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: INCORRECT_PASSWORD,
            }),
        )
            .into_response()
    }
}

fn logout(gate: &AuthGate) -> Response {
    tracing::debug!(gate = %gate.kind(), "Session cleared");
    (
        StatusCode::OK,
        [(header::SET_COOKIE, gate.clear_session())],
        Json(SuccessResponse { success: true }),
    )
        .into_response()
}

fn status(gate: &AuthGate, headers: &HeaderMap) -> Json<StatusResponse> {
    Json(StatusResponse {
        authenticated: gate.check_session(headers),
    })
}
