use super::error::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized result of one backend call. Never partially constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    Success { status: u16, data: Value },
    Failure { message: String, status: Option<u16> },
}

impl ResponseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseOutcome::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            ResponseOutcome::Success { data, .. } => Some(data),
            ResponseOutcome::Failure { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ResponseOutcome::Success { .. } => None,
            ResponseOutcome::Failure { message, .. } => Some(message),
        }
    }

    /// The `{status, data, error}` shape some screens consume directly.
    pub fn into_envelope(self) -> Envelope {
        match self {
            ResponseOutcome::Success { status, data } => Envelope {
                status: Some(status),
                data: Some(data),
                error: None,
            },
            ResponseOutcome::Failure { message, status } => Envelope {
                status,
                data: None,
                error: Some(message),
            },
        }
    }
}

impl From<Result<(u16, Value), ApiError>> for ResponseOutcome {
    fn from(result: Result<(u16, Value), ApiError>) -> Self {
        match result {
            Ok((status, data)) => ResponseOutcome::Success { status, data },
            Err(e) => ResponseOutcome::Failure {
                status: e.status(),
                message: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: Option<u16>,
    pub data: Option<Value>,
    pub error: Option<String>,
}

/// Strips the backend's `{status, data, message?}` wrapper when present.
///
/// Some read endpoints answer with the bare resource instead, which is
/// returned as is. A successful wrapper without `data` carries its payload
/// next to `status`, so everything but `status` and `message` is kept. A
/// wrapper whose boolean `status` is false becomes [`ApiError::Rejected`].
pub fn unwrap_envelope(value: Value) -> Result<Value, ApiError> {
    let Value::Object(mut map) = value else {
        return Ok(value);
    };

    match map.get("status").and_then(Value::as_bool) {
        Some(true) => match map.remove("data") {
            Some(data) => Ok(data),
            None => {
                map.remove("status");
                map.remove("message");
                Ok(Value::Object(map))
            }
        },
        Some(false) => {
            let message = map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Request was rejected")
                .to_string();
            Err(ApiError::Rejected(message))
        }
        None => Ok(Value::Object(map)),
    }
}
