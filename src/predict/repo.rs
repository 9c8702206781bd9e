use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Immutable prediction record. Created once per inference call, never
/// mutated or deleted; the owner reference nulls out if the user is removed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Prediction {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub features: serde_json::Value,
    pub predicted_stage: i32,
    pub probability: Option<f64>,
    pub model_version: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Prediction {
    pub async fn create(
        db: &PgPool,
        user_id: Option<Uuid>,
        features: &serde_json::Value,
        predicted_stage: i32,
        probability: Option<f64>,
        model_version: &str,
    ) -> anyhow::Result<Prediction> {
        let record = sqlx::query_as::<_, Prediction>(
            r#"
            INSERT INTO predictions (user_id, features, predicted_stage, probability, model_version)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, features, predicted_stage, probability, model_version, created_at
            "#,
        )
        .bind(user_id)
        .bind(features)
        .bind(predicted_stage)
        .bind(probability)
        .bind(model_version)
        .fetch_one(db)
        .await?;
        Ok(record)
    }

    /// All records owned by one user, newest first.
    pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Prediction>> {
        let rows = sqlx::query_as::<_, Prediction>(
            r#"
            SELECT id, user_id, features, predicted_stage, probability, model_version, created_at
            FROM predictions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Every record, newest first.
    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Prediction>> {
        let rows = sqlx::query_as::<_, Prediction>(
            r#"
            SELECT id, user_id, features, predicted_stage, probability, model_version, created_at
            FROM predictions
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count(db: &PgPool) -> anyhow::Result<i64> {
        let n = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM predictions"#)
            .fetch_one(db)
            .await?;
        Ok(n)
    }

    pub async fn recent(db: &PgPool, limit: i64) -> anyhow::Result<Vec<Prediction>> {
        let rows = sqlx::query_as::<_, Prediction>(
            r#"
            SELECT id, user_id, features, predicted_stage, probability, model_version, created_at
            FROM predictions
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
