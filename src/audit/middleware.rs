use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRef, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use crate::auth::services::{JwtKeys, TokenKind};
use crate::state::AppState;

/// Bodies above this size are forwarded untouched and audited with a null body.
const BODY_CAPTURE_LIMIT: usize = 64 * 1024;

/// Best-effort audit of every API call: path, method, parsed JSON body,
/// resolved caller, source address. Runs after the handler and spawns the
/// write so it can neither block nor fail the primary response.
pub async fn record_request(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if !is_audited(&path) {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string());
    let caller = resolve_caller(&state, req.headers());
    let (req, body) = buffer_body(req).await;

    let response = next.run(req).await;

    let db = state.db.clone();
    tokio::spawn(async move {
        let parsed = body.and_then(|bytes| parse_body(&bytes));
        if let Err(e) =
            crate::audit::repo::insert(&db, caller, &path, &method, parsed, ip.as_deref()).await
        {
            debug!(error = %e, path = %path, "audit write failed");
        }
    });

    response
}

fn is_audited(path: &str) -> bool {
    path.starts_with("/api/")
}

/// Resolve the caller from a bearer token if one is present and valid.
/// Any failure here means an anonymous entry, never a rejected request.
fn resolve_caller(state: &AppState, headers: &HeaderMap) -> Option<Uuid> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let token = header.strip_prefix("Bearer ")?;
    JwtKeys::from_ref(state)
        .verify(token)
        .ok()
        .filter(|claims| claims.kind == TokenKind::Access)
        .map(|claims| claims.sub)
}

fn parse_body(bytes: &Bytes) -> Option<serde_json::Value> {
    if bytes.is_empty() {
        return None;
    }
    serde_json::from_slice(bytes).ok()
}

/// Read the request body into memory and hand the request back rebuilt.
/// Oversized or unreadable bodies are not captured; the request itself is
/// left as intact as possible.
async fn buffer_body(req: Request) -> (Request, Option<Bytes>) {
    // Only declared, small bodies are captured; streaming or oversized
    // bodies pass through unread.
    let known_small = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .is_some_and(|n| n <= BODY_CAPTURE_LIMIT as u64);
    if !known_small {
        return (req, None);
    }

    let (parts, body) = req.into_parts();
    match axum::body::to_bytes(body, BODY_CAPTURE_LIMIT).await {
        Ok(bytes) => {
            let rebuilt = Request::from_parts(parts, Body::from(bytes.clone()));
            (rebuilt, Some(bytes))
        }
        Err(_) => (Request::from_parts(parts, Body::empty()), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_api_paths_are_audited() {
        assert!(is_audited("/api/predict"));
        assert!(is_audited("/api/auth/login"));
        assert!(!is_audited("/metrics"));
        assert!(!is_audited("/api"));
        assert!(!is_audited("/"));
    }

    #[test]
    fn malformed_body_parses_to_none() {
        assert!(parse_body(&Bytes::from_static(b"not json {")).is_none());
        assert!(parse_body(&Bytes::new()).is_none());
    }

    #[test]
    fn json_body_is_captured() {
        let parsed = parse_body(&Bytes::from_static(b"{\"features\":[1,2]}")).unwrap();
        assert_eq!(parsed["features"][0], 1);
    }

    #[tokio::test]
    async fn caller_resolution_swallows_bad_tokens() {
        let state = AppState::fake();
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Bearer garbage".parse().unwrap(),
        );
        assert!(resolve_caller(&state, &headers).is_none());
        assert!(resolve_caller(&state, &HeaderMap::new()).is_none());
    }

    async fn audited_app() -> axum::Router {
        // The fake state's pool has no server behind it, so every spawned
        // audit write fails.
        let state = AppState::fake();
        axum::Router::new()
            .route("/api/health", axum::routing::get(|| async { "ok" }))
            .route("/api/echo", axum::routing::post(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(state, record_request))
    }

    #[tokio::test]
    async fn failed_audit_write_does_not_change_the_response() {
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let response = audited_app()
            .await
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn failed_audit_of_a_malformed_body_does_not_change_the_response() {
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let body = "not json {";
        let response = audited_app()
            .await
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/echo")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, body.len().to_string())
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn caller_resolution_accepts_valid_access_token() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        assert_eq!(resolve_caller(&state, &headers), Some(user_id));
    }
}
