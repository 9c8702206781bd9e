use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{repo::User, roles::Role, services::AuthUser},
    predict::repo::Prediction,
    state::AppState,
};

const RECENT_LIMIT: i64 = 10;

#[derive(Debug, Serialize)]
pub struct RecentPrediction {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub predicted_stage: i32,
    pub probability: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub total_predictions: i64,
    pub total_users: i64,
    pub recent_predictions: Vec<RecentPrediction>,
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/metrics", get(metrics))
}

/// GET /admin/metrics — admin only.
#[instrument(skip(state))]
pub async fn metrics(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MetricsResponse>, (StatusCode, String)> {
    let role = Role::of_user(&state.db, user_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if !role.map(Role::is_admin).unwrap_or(false) {
        warn!(%user_id, ?role, "metrics access denied");
        return Err((StatusCode::FORBIDDEN, "Admin role required".into()));
    }

    let total_predictions = Prediction::count(&state.db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let total_users = User::count(&state.db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let recent_predictions = Prediction::recent(&state.db, RECENT_LIMIT)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .into_iter()
        .map(|p| RecentPrediction {
            id: p.id,
            user_id: p.user_id,
            predicted_stage: p.predicted_stage,
            probability: p.probability,
            created_at: p.created_at,
        })
        .collect();

    Ok(Json(MetricsResponse {
        total_predictions,
        total_users,
        recent_predictions,
    }))
}
