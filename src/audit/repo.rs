use sqlx::PgPool;
use uuid::Uuid;

/// Append a single audit entry. Callers treat failures as best-effort; the
/// entry is never read back by this service.
pub async fn insert(
    db: &PgPool,
    user_id: Option<Uuid>,
    path: &str,
    method: &str,
    body: Option<serde_json::Value>,
    ip: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (user_id, path, method, body, ip)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(path)
    .bind(method)
    .bind(body)
    .bind(ip)
    .execute(db)
    .await?;
    Ok(())
}
