use thiserror::Error;

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized Access";

/// Failure of a single backend call.
///
/// `Display` yields exactly the message shown to the merchant, so the
/// backend's own `message` text comes through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No credential was available; nothing was sent.
    #[error("{}", UNAUTHORIZED_MESSAGE)]
    Unauthorized,
    #[error("{0}")]
    Transport(String),
    #[error("{message}")]
    Http { status: u16, message: String },
    /// The backend answered 2xx with `status: false`.
    #[error("{0}")]
    Rejected(String),
    /// The descriptor could not be turned into a request; nothing was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// The backend answered 2xx with a body that is not JSON.
    #[error("Corrupt response from backend: {0}")]
    CorruptResponse(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Builds the failure for a non-2xx response from its raw body.
    ///
    /// Prefers a JSON `message` field, then the raw text, then a generic
    /// `HTTP Error: <status>`.
    pub fn from_http_body(status: u16, body: &str) -> Self {
        let structured = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(|m| m.to_string())
            });

        let message = match structured {
            Some(message) => message,
            None if !body.is_empty() => body.to_string(),
            None => format!("HTTP Error: {}", status),
        };

        ApiError::Http { status, message }
    }
}
