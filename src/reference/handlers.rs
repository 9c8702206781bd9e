use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::instrument;

use crate::{
    reference::repo::{Faq, Hospital},
    state::AppState,
};

pub fn reference_routes() -> Router<AppState> {
    Router::new()
        .route("/faqs", get(list_faqs))
        .route("/hospitals", get(list_hospitals))
}

/// GET /faqs — public, ordered by the display-order field.
#[instrument(skip(state))]
pub async fn list_faqs(
    State(state): State<AppState>,
) -> Result<Json<Vec<Faq>>, (StatusCode, String)> {
    let faqs = Faq::list(&state.db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(faqs))
}

/// GET /hospitals — public, unordered.
#[instrument(skip(state))]
pub async fn list_hospitals(
    State(state): State<AppState>,
) -> Result<Json<Vec<Hospital>>, (StatusCode, String)> {
    let hospitals = Hospital::list(&state.db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(hospitals))
}
