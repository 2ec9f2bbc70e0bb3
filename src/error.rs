use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {}", format_body(.body))]
    Transport { status: StatusCode, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Cancelled")]
    Cancelled,
}

impl Error {
    /// HTTP status carried by the error, if the backend produced one.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            Self::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Whether the error came from the backend rejecting the request.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Pull a readable message out of an error body.
///
/// FastAPI reports failures as `{"detail": "..."}`; anything else is shown as-is.
fn format_body(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "<empty body>".to_string();
    }
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(detail) = json.get("detail").and_then(|v| v.as_str())
    {
        return detail.to_string();
    }
    body.to_string()
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display_extracts_detail() {
        let err = Error::Transport {
            status: StatusCode::NOT_FOUND,
            body: r#"{"detail":"Not Found"}"#.to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404 Not Found: Not Found");
    }

    #[test]
    fn test_transport_display_plain_body() {
        let err = Error::Transport {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "Internal Server Error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP 500 Internal Server Error: Internal Server Error"
        );
    }

    #[test]
    fn test_transport_display_empty_body() {
        let err = Error::Transport {
            status: StatusCode::BAD_GATEWAY,
            body: "  ".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502 Bad Gateway: <empty body>");
    }

    #[test]
    fn test_status_accessor() {
        let err = Error::Transport {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(err.is_transport());
        assert_eq!(Error::Cancelled.status(), None);
        assert!(!Error::Cancelled.is_transport());
    }
}
