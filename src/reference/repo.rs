use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// FAQ entry, managed out-of-band and read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Faq {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub display_order: i32,
}

/// Hospital directory entry, managed out-of-band and read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Hospital {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub phone: Option<String>,
}

impl Faq {
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Faq>> {
        let rows = sqlx::query_as::<_, Faq>(
            r#"
            SELECT id, question, answer, display_order
            FROM faqs
            ORDER BY display_order
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

impl Hospital {
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Hospital>> {
        let rows = sqlx::query_as::<_, Hospital>(
            r#"
            SELECT id, name, address, lat, lon, phone
            FROM hospitals
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
