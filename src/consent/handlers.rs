use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument};

use crate::{
    auth::services::AuthUser,
    consent::dto::{AcceptRequest, ConsentStatus},
    consent::repo::Consent,
    state::AppState,
};

pub fn consent_routes() -> Router<AppState> {
    Router::new()
        .route("/consent/status", get(status))
        .route("/consent/accept", post(accept))
}

/// GET /consent/status — `{accepted: false}` when no record exists yet;
/// never an error for a missing record.
#[instrument(skip(state))]
pub async fn status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ConsentStatus>, (StatusCode, String)> {
    let consent = Consent::find_by_user(&state.db, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "consent lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    Ok(Json(
        consent.map(ConsentStatus::from).unwrap_or_else(ConsentStatus::none),
    ))
}

/// POST /consent/accept — upsert; re-accepting overwrites version and
/// timestamp instead of creating duplicates. Body is optional.
#[instrument(skip(state, payload))]
pub async fn accept(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Option<Json<AcceptRequest>>,
) -> Result<Json<ConsentStatus>, (StatusCode, String)> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let consent = Consent::upsert_accept(&state.db, user_id, &payload.version)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "consent accept failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    info!(%user_id, version = %consent.version, "consent accepted");
    Ok(Json(ConsentStatus::from(consent)))
}
