use axum::{
    extract::State,
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use time::format_description::well_known::Rfc3339;
use tracing::{error, info, instrument};

use crate::{
    auth::{
        roles::{Role, Visibility},
        services::{AuthUser, MaybeAuthUser},
    },
    ml::{coerce_features, stage_probability_map, MlError},
    predict::dto::{FeatureNamesResponse, PredictRequest, PredictResponse},
    predict::repo::Prediction,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/features", get(get_features))
        .route("/predictions", get(list_predictions))
        .route("/predictions/export", get(export_predictions))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/predict", post(predict))
}

/// GET /features — the ordered feature schema the classifier expects.
#[instrument(skip(state))]
pub async fn get_features(
    State(state): State<AppState>,
) -> Result<Json<FeatureNamesResponse>, (StatusCode, String)> {
    let bundle = state.model_bundle().map_err(bad_request)?;
    Ok(Json(FeatureNamesResponse {
        features: bundle.feature_names.clone(),
    }))
}

/// POST /predict — validate, invoke the classifier once, persist the record.
/// Authentication is optional; anonymous records have no owner.
#[instrument(skip(state, payload))]
pub async fn predict(
    State(state): State<AppState>,
    MaybeAuthUser(user_id): MaybeAuthUser,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<PredictResponse>, (StatusCode, String)> {
    // A missing or mistyped "features" key is a 400, not the Json
    // extractor's 422.
    let payload: PredictRequest = serde_json::from_value(payload).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            "Provide 'features' as a list".to_string(),
        )
    })?;
    if payload.features.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Provide 'features' as a non-empty list".into(),
        ));
    }

    let bundle = state.model_bundle().map_err(bad_request)?;
    let values = coerce_features(&payload.features).map_err(bad_request)?;
    let outcome = bundle.infer(&values).map_err(bad_request)?;

    let probability = outcome
        .probabilities
        .as_deref()
        .map(|probs| probs.iter().cloned().fold(f64::NEG_INFINITY, f64::max));

    let features = serde_json::json!(values);
    let record = Prediction::create(
        &state.db,
        user_id,
        &features,
        outcome.stage,
        probability,
        &bundle.version,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "persist prediction failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(
        record_id = %record.id,
        stage = outcome.stage,
        owner = ?user_id,
        "prediction recorded"
    );

    Ok(Json(PredictResponse {
        predicted_stage: outcome.stage,
        probabilities: outcome.probabilities.as_deref().map(stage_probability_map),
        record,
    }))
}

/// GET /predictions — patients see their own records, clinicians and admins
/// see everything, anyone else sees an empty list.
#[instrument(skip(state))]
pub async fn list_predictions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Prediction>>, (StatusCode, String)> {
    let role = Role::of_user(&state.db, user_id).await.map_err(internal)?;
    let records = match Visibility::for_caller(user_id, role) {
        Visibility::Own(owner) => Prediction::list_for_user(&state.db, owner)
            .await
            .map_err(internal)?,
        Visibility::All => Prediction::list_all(&state.db).await.map_err(internal)?,
        Visibility::Denied => Vec::new(),
    };
    Ok(Json(records))
}

/// GET /predictions/export — CSV attachment under the same visibility rule;
/// 403 when the caller's role grants no visibility at all.
#[instrument(skip(state))]
pub async fn export_predictions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<([(header::HeaderName, &'static str); 2], Vec<u8>), (StatusCode, String)> {
    let role = Role::of_user(&state.db, user_id).await.map_err(internal)?;
    let records = match Visibility::for_caller(user_id, role) {
        Visibility::Own(owner) => Prediction::list_for_user(&state.db, owner)
            .await
            .map_err(internal)?,
        Visibility::All => Prediction::list_all(&state.db).await.map_err(internal)?,
        Visibility::Denied => {
            return Err((StatusCode::FORBIDDEN, "Not authorized".into()));
        }
    };

    let csv = render_csv(&records).map_err(internal)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"predictions.csv\"",
            ),
        ],
        csv,
    ))
}

fn render_csv(records: &[Prediction]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "id",
        "created_at",
        "predicted_stage",
        "probability",
        "model_version",
        "features",
    ])?;
    for record in records {
        writer.write_record([
            record.id.to_string(),
            record.created_at.format(&Rfc3339)?,
            record.predicted_stage.to_string(),
            record
                .probability
                .map(|p| p.to_string())
                .unwrap_or_default(),
            record.model_version.clone().unwrap_or_default(),
            serde_json::to_string(&record.features)?,
        ])?;
    }
    Ok(writer.into_inner()?)
}

fn bad_request(e: MlError) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, e.to_string())
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn post_predict(body: &'static str) -> StatusCode {
        let app = axum::Router::new()
            .route("/predict", axum::routing::post(predict))
            .with_state(AppState::fake());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/predict")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn missing_features_key_is_bad_request() {
        assert_eq!(post_predict("{}").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_list_features_is_bad_request() {
        assert_eq!(
            post_predict(r#"{"features": 5}"#).await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn empty_features_list_is_bad_request() {
        assert_eq!(
            post_predict(r#"{"features": []}"#).await,
            StatusCode::BAD_REQUEST
        );
    }

    fn record(stage: i32, probability: Option<f64>) -> Prediction {
        Prediction {
            id: Uuid::new_v4(),
            user_id: Some(Uuid::new_v4()),
            features: json!([45.0, 1.0, 0.0, 2.3]),
            predicted_stage: stage,
            probability,
            model_version: Some("offline_v1".into()),
            created_at: time::macros::datetime!(2025-03-01 12:00:00 UTC),
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_record() {
        let bytes = render_csv(&[record(2, Some(0.81)), record(4, None)]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "id,created_at,predicted_stage,probability,model_version,features"
        );
        assert!(lines[1].contains("0.81"));
        assert!(lines[1].contains("2025-03-01T12:00:00Z"));
    }

    #[test]
    fn csv_quotes_serialized_feature_vector() {
        let bytes = render_csv(&[record(1, Some(0.5))]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        // JSON array contains commas, so the field must be quoted.
        assert!(text.contains("\"[45.0,1.0,0.0,2.3]\""));
    }

    #[test]
    fn csv_of_no_records_is_just_the_header() {
        let bytes = render_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
