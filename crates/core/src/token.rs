//! Access token inspection
//!
//! Tokens are compact JWS strings (`header.payload.signature`). Only the
//! payload is read, and only to learn when the token expires. Signatures are
//! never checked here: the API is the authority on whether a token is good.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Standard alphabet, padding optional, lenient about trailing bits.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decoded token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiration time (seconds since the Unix epoch)
    #[serde(default)]
    pub exp: Option<f64>,
    /// Remaining claims, untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    /// Subject claim, when it is a string
    pub fn subject(&self) -> Option<&str> {
        self.extra.get("sub").and_then(serde_json::Value::as_str)
    }
}

/// Reasons a token payload could not be read
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("expected 3 token segments, found {0}")]
    SegmentCount(usize),

    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("payload is not a JSON claims object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode the payload segment of `token`, reporting why it failed.
pub fn try_decode_claims(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::SegmentCount(segments.len()));
    }

    let payload: String = segments[1]
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let bytes = PAYLOAD_ENGINE.decode(payload)?;
    let text = String::from_utf8(bytes)?;
    Ok(serde_json::from_str(&text)?)
}

/// Decode the payload segment of `token`.
///
/// Returns `None` for anything malformed; callers treat that as an unusable
/// token.
pub fn decode_claims(token: &str) -> Option<Claims> {
    match try_decode_claims(token) {
        Ok(claims) => Some(claims),
        Err(e) => {
            debug!(error = %e, "Discarding undecodable token");
            None
        }
    }
}

/// Whether `token` is unusable at `now_ms` (milliseconds since the epoch).
///
/// Absent, undecodable and `exp`-less tokens count as expired. The expiry
/// instant itself is already expired.
#[allow(clippy::cast_precision_loss)]
pub fn is_expired_at(token: Option<&str>, now_ms: i64) -> bool {
    match token.and_then(decode_claims) {
        Some(Claims { exp: Some(exp), .. }) => now_ms as f64 >= exp * 1000.0,
        _ => true,
    }
}

/// Whether `token` is unusable right now.
pub fn is_expired(token: Option<&str>) -> bool {
    is_expired_at(token, Utc::now().timestamp_millis())
}

/// Expiry instant of `token`, if it carries one.
#[allow(clippy::cast_possible_truncation)]
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let exp = decode_claims(token)?.exp?;
    DateTime::from_timestamp_millis((exp * 1000.0) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn token_with(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.signature")
    }

    #[test]
    fn test_decode_claims() {
        let token = token_with(&json!({"sub": "user-1", "exp": 1_700_000_000, "role": "admin"}));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, Some(1_700_000_000.0));
        assert_eq!(claims.subject(), Some("user-1"));
        assert_eq!(claims.extra["role"], "admin");
    }

    #[test]
    fn test_decode_claims_with_url_safe_characters() {
        // "?>" and "~~" in the payload force '-' and '_' into the encoding.
        let token = token_with(&json!({"exp": 10, "note": "??>>~~"}));
        assert!(token.split('.').nth(1).unwrap().contains(['-', '_']));
        assert_eq!(decode_claims(&token).unwrap().extra["note"], "??>>~~");
    }

    #[test]
    fn test_decode_claims_accepts_padding() {
        let body = base64::engine::general_purpose::URL_SAFE.encode(r#"{"exp":12}"#);
        assert!(body.ends_with('='));
        let claims = decode_claims(&format!("h.{body}.s")).unwrap();
        assert_eq!(claims.exp, Some(12.0));
    }

    #[test]
    fn test_decode_claims_utf8_payload() {
        let token = token_with(&json!({"exp": 5, "name": "Zoë Ångström"}));
        assert_eq!(decode_claims(&token).unwrap().extra["name"], "Zoë Ångström");
    }

    #[test]
    fn test_decode_rejects_malformed_tokens() {
        let invalid_utf8 = URL_SAFE_NO_PAD.encode([0xff_u8, 0xfe, 0xfd]);
        let not_json = URL_SAFE_NO_PAD.encode("not json");
        let cases = [
            String::new(),
            "only-one-segment".to_string(),
            "two.segments".to_string(),
            "a.b.c.d".to_string(),
            "h.!!!.s".to_string(),
            format!("h.{invalid_utf8}.s"),
            format!("h.{not_json}.s"),
            "h..s".to_string(),
        ];

        for token in &cases {
            assert!(decode_claims(token).is_none(), "decoded {token:?}");
            assert!(is_expired(Some(token)), "{token:?} should count as expired");
        }

        assert!(matches!(
            try_decode_claims("two.segments"),
            Err(DecodeError::SegmentCount(2))
        ));
    }

    #[test]
    fn test_absent_token_is_expired() {
        assert!(is_expired(None));
    }

    #[test]
    fn test_missing_exp_is_expired() {
        let token = token_with(&json!({"sub": "user-1"}));
        assert!(is_expired_at(Some(&token), 0));
    }

    #[test]
    fn test_non_object_payload_is_expired() {
        let token = token_with(&json!(12345));
        assert!(is_expired_at(Some(&token), 0));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let token = token_with(&json!({"exp": 1_000}));
        assert!(!is_expired_at(Some(&token), 999_999));
        assert!(is_expired_at(Some(&token), 1_000_000));
        assert!(is_expired_at(Some(&token), 1_000_001));
    }

    #[test]
    fn test_is_expired_against_wall_clock() {
        let now = Utc::now().timestamp();
        let fresh = token_with(&json!({"exp": now + 600}));
        let stale = token_with(&json!({"exp": now - 1}));
        assert!(!is_expired(Some(&fresh)));
        assert!(is_expired(Some(&stale)));
    }

    #[test]
    fn test_expires_at() {
        let token = token_with(&json!({"exp": 1_700_000_000}));
        let expiry = expires_at(&token).unwrap();
        assert_eq!(expiry.timestamp(), 1_700_000_000);
        assert!(expires_at("garbage").is_none());
    }
}
