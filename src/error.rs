use serde::Deserialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlaylistError>;

/// Failures surfaced by the playlist core. Transport errors never leave the
/// provider layer raw; they are folded into one of these kinds.
#[derive(Error, Debug)]
pub enum PlaylistError {
    /// Missing, expired or rejected credential. Never retried locally.
    #[error("authentication required: {0}")]
    Auth(String),

    /// Non-success response or malformed payload from the remote store.
    #[error("{}", upstream_message(.status, .message))]
    Upstream { status: Option<u16>, message: String },

    /// Caller input rejected before any network call.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("operation cancelled")]
    Cancelled,
}

fn upstream_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("YouTube API error {}: {}", code, message),
        None => format!("YouTube API request failed: {}", message),
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl PlaylistError {
    /// Builds an error from an HTTP status code and the raw response body.
    /// The message is pulled out of the `{"error": {"message": ..}}` envelope
    /// when the body has one.
    pub fn from_status(code: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.trim().to_string());

        match code {
            401 => Self::Auth(message),
            _ => Self::Upstream {
                status: Some(code),
                message,
            },
        }
    }

    pub fn malformed(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Upstream {
            status: None,
            message: format!("{}: {}", context, err),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl From<reqwest::Error> for PlaylistError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
