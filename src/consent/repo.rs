use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Per-user consent state. At most one row per user; re-acceptance
/// overwrites version and timestamp in place.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Consent {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub accepted: bool,
    pub version: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub accepted_at: Option<OffsetDateTime>,
}

impl Consent {
    pub async fn find_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Consent>> {
        let consent = sqlx::query_as::<_, Consent>(
            r#"
            SELECT id, user_id, accepted, version, accepted_at
            FROM consents
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(consent)
    }

    /// Accept the policy at `version`. Creates the row on first call,
    /// overwrites version and timestamp on repeat calls. Idempotent for a
    /// fixed version apart from the refreshed timestamp.
    pub async fn upsert_accept(
        db: &PgPool,
        user_id: Uuid,
        version: &str,
    ) -> anyhow::Result<Consent> {
        let consent = sqlx::query_as::<_, Consent>(
            r#"
            INSERT INTO consents (user_id, accepted, version, accepted_at)
            VALUES ($1, TRUE, $2, now())
            ON CONFLICT (user_id) DO UPDATE
            SET accepted = TRUE, version = EXCLUDED.version, accepted_at = now()
            RETURNING id, user_id, accepted, version, accepted_at
            "#,
        )
        .bind(user_id)
        .bind(version)
        .fetch_one(db)
        .await?;
        Ok(consent)
    }
}
