use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Body of a non-success response.
///
/// The backend answers failures with `{"message": "..."}` when it has
/// something to say; anything else is kept as (truncated) raw text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPayload {
    pub message: Option<String>,
    pub raw: String,
}

#[derive(Deserialize)]
struct MessageBody {
    message: Option<String>,
}

impl ErrorPayload {
    pub fn parse(body: &str) -> Self {
        let message = serde_json::from_str::<MessageBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty());

        Self {
            message,
            raw: truncate_body(body),
        }
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message {
            Some(ref message) => f.write_str(message),
            None => f.write_str(&self.raw),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(ErrorPayload),

    #[error("Unauthorized - token may be expired")]
    Unauthorized(ErrorPayload),

    #[error("Access denied: {0}")]
    AccessDenied(ErrorPayload),

    #[error("Resource not found: {0}")]
    NotFound(ErrorPayload),

    #[error("Conflict: {0}")]
    Conflict(ErrorPayload),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(ErrorPayload),

    #[error("Not signed in")]
    MissingToken,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        body.to_string()
    } else {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }
}

impl ApiError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let payload = ErrorPayload::parse(body);
        match status.as_u16() {
            400 | 422 => ApiError::BadRequest(payload),
            401 => ApiError::Unauthorized(payload),
            403 => ApiError::AccessDenied(payload),
            404 => ApiError::NotFound(payload),
            409 => ApiError::Conflict(payload),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(payload),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, payload)),
        }
    }

    /// The `message` field of the backend's error payload, if it sent one.
    pub fn payload_message(&self) -> Option<&str> {
        match self {
            ApiError::BadRequest(p)
            | ApiError::Unauthorized(p)
            | ApiError::AccessDenied(p)
            | ApiError::NotFound(p)
            | ApiError::Conflict(p)
            | ApiError::ServerError(p) => p.message.as_deref(),
            _ => None,
        }
    }

    /// True when the backend no longer accepts our token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_) | ApiError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_payload_message_extracted() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"message":"Bad credentials"}"#);
        assert!(err.is_unauthorized());
        assert_eq!(err.payload_message(), Some("Bad credentials"));
    }

    #[test]
    fn test_payload_without_message() {
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "<html>boom</html>");
        assert!(matches!(err, ApiError::ServerError(_)));
        assert_eq!(err.payload_message(), None);
        assert_eq!(err.to_string(), "Server error: <html>boom</html>");
    }

    #[test]
    fn test_blank_message_is_ignored() {
        let payload = ErrorPayload::parse(r#"{"message":"   "}"#);
        assert_eq!(payload.message, None);
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(ApiError::from_status(StatusCode::BAD_REQUEST, ""), ApiError::BadRequest(_)));
        assert!(matches!(ApiError::from_status(StatusCode::FORBIDDEN, ""), ApiError::AccessDenied(_)));
        assert!(matches!(ApiError::from_status(StatusCode::NOT_FOUND, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(StatusCode::CONFLICT, ""), ApiError::Conflict(_)));
        assert!(matches!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""), ApiError::RateLimited));
        assert!(matches!(ApiError::from_status(StatusCode::IM_A_TEAPOT, ""), ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_long_body_truncated() {
        let body = "x".repeat(2000);
        let payload = ErrorPayload::parse(&body);
        assert!(payload.raw.starts_with(&"x".repeat(500)));
        assert!(payload.raw.ends_with("(truncated, 2000 total bytes)"));
    }
}
