use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::consent::repo::Consent;

/// Body of POST /consent/accept. The whole body is optional; the version
/// defaults to "v1".
#[derive(Debug, Deserialize)]
pub struct AcceptRequest {
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for AcceptRequest {
    fn default() -> Self {
        Self {
            version: default_version(),
        }
    }
}

fn default_version() -> String {
    "v1".into()
}

/// Consent status as seen by the client. A user with no consent record gets
/// `{accepted: false}` with the other fields omitted.
#[derive(Debug, Serialize)]
pub struct ConsentStatus {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub accepted_at: Option<OffsetDateTime>,
}

impl ConsentStatus {
    pub fn none() -> Self {
        Self {
            accepted: false,
            version: None,
            accepted_at: None,
        }
    }
}

impl From<Consent> for ConsentStatus {
    fn from(c: Consent) -> Self {
        Self {
            accepted: c.accepted,
            version: Some(c.version),
            accepted_at: c.accepted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn accept_version_defaults_to_v1() {
        let req: AcceptRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.version, "v1");
        assert_eq!(AcceptRequest::default().version, "v1");
    }

    #[test]
    fn accept_version_can_be_overridden() {
        let req: AcceptRequest = serde_json::from_str(r#"{"version":"v2"}"#).unwrap();
        assert_eq!(req.version, "v2");
    }

    #[test]
    fn absent_record_serializes_to_accepted_false_only() {
        let json = serde_json::to_value(ConsentStatus::none()).unwrap();
        assert_eq!(json, serde_json::json!({"accepted": false}));
    }

    #[test]
    fn accepted_record_carries_version_and_timestamp() {
        let status: ConsentStatus = Consent {
            id: Uuid::new_v4(),
            user_id: Some(Uuid::new_v4()),
            accepted: true,
            version: "v2".into(),
            accepted_at: Some(time::macros::datetime!(2025-03-01 09:30:00 UTC)),
        }
        .into();
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["accepted"], true);
        assert_eq!(json["version"], "v2");
        assert_eq!(json["accepted_at"], "2025-03-01T09:30:00Z");
    }
}
