use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Invalid server response: {0}")]
    Validation(String),

    /// 401. Carries the server's own message when the body had one.
    #[error("Unauthorized - session missing or expired")]
    Unauthorized(Option<String>),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body shape used by the backend (`{"errorMessage": "..."}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
    error: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// `errorMessage` (or `error`) from a JSON error body.
    fn body_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error_message.or(b.error))
            .filter(|m| !m.is_empty())
    }

    /// Prefer the server's own message, fall back to the raw body.
    fn server_message(body: &str) -> String {
        Self::body_message(body).unwrap_or_else(|| Self::truncate_body(body))
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => ApiError::Unauthorized(Self::body_message(body)),
            _ => ApiError::Server {
                status,
                message: Self::server_message(body),
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Message suitable for an inline form error.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => {
                "No response from server. Please check your connection.".to_string()
            }
            ApiError::Server { status, message } if message.is_empty() => {
                format!("Server error: {}", status)
            }
            ApiError::Server { message, .. } => message.clone(),
            ApiError::Validation(_) => "Invalid server response".to_string(),
            ApiError::Unauthorized(Some(message)) => message.clone(),
            ApiError::Unauthorized(None) => "Invalid email or password".to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Validation(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::from_status(status.as_u16(), "")
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
