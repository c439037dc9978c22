use std::collections::BTreeMap;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use vigil_core::Identity;

use crate::error::AuthError;

/// Claims read from a session token's payload.
///
/// The signature is NOT verified. The identity provider that issued the token
/// is trusted to have done so; this is only used to learn who is signed in
/// and until when.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClaims {
    /// Raw token as stored.
    pub raw_jwt: String,
    /// Provider user ID (`sub` claim).
    pub subject: String,
    pub email: Option<String>,
    /// Token expiration time (`exp` claim).
    pub expires_at: DateTime<Utc>,
    /// `user_metadata`, passed through to [`Identity::attributes`].
    pub attributes: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct Payload {
    sub: String,
    exp: i64,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: BTreeMap<String, serde_json::Value>,
}

impl SessionClaims {
    /// Decode the payload segment of a compact JWT.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MalformedToken` if the token does not have three
    /// segments, the payload is not base64url JSON, or `sub`/`exp` are missing.
    pub fn decode(jwt: &str) -> Result<Self, AuthError> {
        let jwt = jwt.trim();
        let mut segments = jwt.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(AuthError::MalformedToken("invalid JWT format".into()));
        };

        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::MalformedToken(format!("base64 decode failed: {e}")))?;
        let payload: Payload = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::MalformedToken(format!("claims: {e}")))?;
        let expires_at = DateTime::from_timestamp(payload.exp, 0)
            .ok_or_else(|| AuthError::MalformedToken("invalid exp timestamp".into()))?;

        Ok(Self {
            raw_jwt: jwt.to_string(),
            subject: payload.sub,
            email: payload.email.filter(|email| !email.is_empty()),
            expires_at,
            attributes: payload.user_metadata,
        })
    }

    #[must_use]
    pub fn to_identity(&self) -> Identity {
        Identity {
            id: self.subject.clone(),
            email: self.email.clone(),
            attributes: self.attributes.clone(),
        }
    }

    /// Check if the token is expired or expires within `buffer_secs`.
    #[must_use]
    pub fn is_near_expiry(&self, buffer_secs: i64) -> bool {
        let threshold = Utc::now() + chrono::TimeDelta::seconds(buffer_secs);
        self.expires_at <= threshold
    }
}

#[cfg(test)]
pub(crate) fn unsigned_jwt(payload: &serde_json::Value) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = engine.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let body = engine.encode(payload.to_string());
    let signature = engine.encode("unsigned");
    format!("{header}.{body}.{signature}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decode_reads_subject_email_and_metadata() {
        let exp = Utc::now().timestamp() + 3600;
        let jwt = unsigned_jwt(&json!({
            "sub": "user_42",
            "email": "pat@example.com",
            "exp": exp,
            "role": "authenticated",
            "user_metadata": { "display_name": "Pat" },
        }));

        let claims = SessionClaims::decode(&jwt).unwrap();
        assert_eq!(claims.subject, "user_42");
        assert_eq!(claims.email.as_deref(), Some("pat@example.com"));
        assert_eq!(claims.expires_at.timestamp(), exp);

        let identity = claims.to_identity();
        assert_eq!(identity.id, "user_42");
        assert_eq!(identity.attributes["display_name"], json!("Pat"));
    }

    #[test]
    fn empty_email_is_dropped() {
        let jwt = unsigned_jwt(&json!({ "sub": "u", "email": "", "exp": 4_102_444_800_i64 }));
        assert_eq!(SessionClaims::decode(&jwt).unwrap().email, None);
    }

    #[test]
    fn decode_rejects_wrong_segment_count() {
        let error = SessionClaims::decode("not-a-jwt").unwrap_err();
        assert!(error.to_string().contains("invalid JWT format"));

        let error = SessionClaims::decode("a.b.c.d").unwrap_err();
        assert!(error.to_string().contains("invalid JWT format"));
    }

    #[test]
    fn decode_rejects_bad_base64() {
        let error = SessionClaims::decode("header.!!!invalid!!!.signature").unwrap_err();
        assert!(error.to_string().contains("base64 decode failed"));
    }

    #[test]
    fn decode_requires_exp() {
        let jwt = unsigned_jwt(&json!({ "sub": "user_42" }));
        let error = SessionClaims::decode(&jwt).unwrap_err();
        assert!(matches!(error, AuthError::MalformedToken(_)));
        assert!(error.to_string().contains("exp"));
    }

    #[test]
    fn near_expiry_respects_buffer() {
        let in_30s = Utc::now().timestamp() + 30;
        let jwt = unsigned_jwt(&json!({ "sub": "u", "exp": in_30s }));
        let claims = SessionClaims::decode(&jwt).unwrap();
        assert!(claims.is_near_expiry(60));
        assert!(!claims.is_near_expiry(0));

        let past = Utc::now().timestamp() - 10;
        let jwt = unsigned_jwt(&json!({ "sub": "u", "exp": past }));
        assert!(SessionClaims::decode(&jwt).unwrap().is_near_expiry(0));
    }
}
