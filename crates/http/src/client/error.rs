//! Client error types

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request exceeded its time budget and was aborted
    #[error("Request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The server could not be reached
    #[error("Unable to reach the server at {url}: {message}")]
    Connection { url: String, message: String },

    /// The server answered with a redirect, which the API never does
    #[error("Unexpected redirect ({status}) to {location}")]
    UnexpectedRedirect { status: u16, location: String },

    /// Any other network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The request was rejected field by field
    #[error("Validation failed:\n{0}")]
    Validation(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code and the raw response body
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = error_message(body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        });

        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            422 => Self::Validation(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether the credential used for the request was rejected
    pub const fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }

    /// Whether the request never produced a response
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Connection { .. }
                | Self::UnexpectedRedirect { .. }
                | Self::Request(_)
        )
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Detail>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Fields(Vec<FieldError>),
    Other(Value),
}

#[derive(Debug, Deserialize)]
struct FieldError {
    #[serde(default)]
    loc: Vec<Value>,
    msg: String,
}

/// Pull a human-readable message out of an error body.
///
/// Field errors (`{"detail": [{"loc": [...], "msg": ...}]}`) are grouped
/// into one line per field, in the order the fields first appear.
fn error_message(body: &str) -> Option<String> {
    let body: ErrorBody = serde_json::from_str(body).ok()?;

    match body.detail {
        Some(Detail::Text(text)) => return Some(text),
        Some(Detail::Fields(errors)) if !errors.is_empty() => {
            return Some(aggregate_field_errors(&errors));
        }
        _ => {}
    }

    body.message.or(body.error)
}

fn aggregate_field_errors(errors: &[FieldError]) -> String {
    let mut fields: Vec<(String, Vec<&str>)> = Vec::new();

    for error in errors {
        let field = error
            .loc
            .iter()
            .rev()
            .find_map(Value::as_str)
            .filter(|name| *name != "body")
            .unwrap_or("request")
            .to_string();

        match fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, messages)) => messages.push(&error.msg),
            None => fields.push((field, vec![&error.msg])),
        }
    }

    fields
        .into_iter()
        .map(|(field, messages)| format!("{field}: {}", messages.join("; ")))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_maps_variants() {
        assert!(matches!(
            ClientError::from_status(StatusCode::UNAUTHORIZED, ""),
            ClientError::AuthenticationFailed(m) if m == "Unauthorized"
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::NOT_FOUND, "gone"),
            ClientError::NotFound(m) if m == "gone"
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::BAD_GATEWAY, r#"{"message":"upstream down"}"#),
            ClientError::ServerError { status: 502, message } if message == "upstream down"
        ));
    }

    #[test]
    fn test_detail_string_is_surfaced() {
        let err = ClientError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"detail":"Email already registered"}"#,
        );
        assert_eq!(err.to_string(), "Bad request: Email already registered");
    }

    #[test]
    fn test_field_errors_are_grouped_per_field() {
        let body = r#"{"detail":[
            {"loc":["body","email"],"msg":"value is not a valid email address","type":"value_error"},
            {"loc":["body","password"],"msg":"too short"},
            {"loc":["body","password"],"msg":"needs a digit"},
            {"loc":["body"],"msg":"malformed"}
        ]}"#;

        let err = ClientError::from_status(StatusCode::UNPROCESSABLE_ENTITY, body);
        let ClientError::Validation(message) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            message,
            "email: value is not a valid email address\npassword: too short; needs a digit\nrequest: malformed"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert!(ClientError::AuthenticationFailed(String::new()).is_auth_error());
        assert!(!ClientError::Forbidden(String::new()).is_auth_error());
        assert!(
            ClientError::Timeout {
                url: "http://x".into(),
                timeout_secs: 1
            }
            .is_transport()
        );
        assert!(!ClientError::NotFound(String::new()).is_transport());
    }
}
