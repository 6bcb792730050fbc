use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failures surfaced by the catalog client, the document store and the
/// orchestrators built on top of them.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Non-2xx response, or a 2xx payload flagged `success: false`.
    #[error("API error (HTTP {status}): {}", .message.as_deref().unwrap_or("request failed"))]
    Api { status: u16, message: Option<String> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Duplicate(String),

    /// No response was received at all.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Error::Api {
            status,
            message: Some(message.into()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Error::Duplicate(_))
    }

    /// Short message suitable for an inline notice in the affected section.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::Network(_) => "Network error. Please check your connection and try again.",
            Error::NotFound(_) | Error::Api { status: 404, .. } => {
                "The requested content was not found."
            }
            Error::Api { status: 401, .. } => "You are not authorized to access this content.",
            Error::Api { status: 429, .. } => {
                "Too many requests. Please wait a moment and try again."
            }
            Error::Api { .. } | Error::Decode(_) => {
                "Failed to fetch data from the server. Please try again later."
            }
            Error::Duplicate(_) => "Failed to update favorites. Please try again.",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Duplicate(_) => StatusCode::CONFLICT,
            Error::Api { status, .. } => match *status {
                401 => StatusCode::UNAUTHORIZED,
                404 => StatusCode::NOT_FOUND,
                429 => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_GATEWAY,
            },
            Error::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Decode(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "message": self.user_message(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_falls_back_to_generic_text() {
        let err = Error::Api {
            status: 500,
            message: None,
        };
        assert_eq!(err.to_string(), "API error (HTTP 500): request failed");

        let err = Error::api(401, "Invalid API key");
        assert_eq!(err.to_string(), "API error (HTTP 401): Invalid API key");
    }

    #[test]
    fn user_message_follows_status() {
        assert!(Error::api(429, "slow down").user_message().starts_with("Too many"));
        assert!(Error::Network("reset".into()).user_message().starts_with("Network"));
        assert!(Error::NotFound("x".into()).user_message().contains("not found"));
    }

    #[test]
    fn responses_carry_mapped_status() {
        let res = Error::Duplicate("42".into()).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let res = Error::api(500, "boom").into_response();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        let res = Error::Network("refused".into()).into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
