//! Error types for calls against the timetable server.

use reqwest::StatusCode;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while talking to the timetable server.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    /// Network/HTTP transport failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// The server rejected a request with a structured message
    /// (double-booked room, lecturer on a day off, ...). Shown verbatim.
    #[error("{message}")]
    Conflict { status: u16, message: String },

    /// Server returned an unexpected status or body
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    /// Response body did not match the expected JSON shape
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// URL parsing/construction failed
    #[error("URL error: {message}")]
    UrlError { message: String },

    /// Request was refused before being sent
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl ApiError {
    /// Builds the error for a non-success response, preferring the server's
    /// own `message` field when the body carries one.
    pub fn from_response_body(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            });

        match message {
            Some(message) if status.is_client_error() => ApiError::Conflict {
                status: status.as_u16(),
                message,
            },
            Some(message) => ApiError::UnexpectedResponse {
                message: format!("status {status}: {message}"),
            },
            None => ApiError::UnexpectedResponse {
                message: format!("status {status}"),
            },
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        ApiError::InvalidInput {
            message: message.into(),
        }
    }

    /// Returns true if the server refused the request on its merits.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }

    /// Returns true if this error is potentially transient and retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Network { .. } | ApiError::UnexpectedResponse { .. }
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode {
                message: err.to_string(),
            }
        } else {
            ApiError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::UrlError {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode {
            message: err.to_string(),
        }
    }
}
