use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error body returned by the registry API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    #[serde(default = "ServerError::unknown_code")]
    pub code: String,
    #[serde(default = "ServerError::unknown_message")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ServerError {
    fn unknown_code() -> String {
        "unknown".to_string()
    }

    fn unknown_message() -> String {
        "An unknown error occurred.".to_string()
    }

    /// Parses a registry error body, falling back to the generic error when
    /// the body is not the expected JSON.
    pub fn from_body(body: &[u8]) -> Self {
        sonic_rs::from_slice(body).unwrap_or_default()
    }

    /// `message` followed by `details`, as shown next to a failed form action.
    pub fn describe(&self) -> String {
        format!("{} {}", self.message, self.details.as_deref().unwrap_or(""))
    }
}

impl Default for ServerError {
    fn default() -> Self {
        Self {
            code: Self::unknown_code(),
            message: Self::unknown_message(),
            details: None,
        }
    }
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)?;
        if let Some(details) = &self.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// The registry answered with an error body.
    #[error("Registry error: {0}")]
    Server(ServerError),

    /// The registry could not be reached or answered garbage.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A brick bundle could not be decoded.
    #[error("Bundle error: {0}")]
    Bundle(String),

    /// A JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] sonic_rs::Error),

    /// The session cookie or access token could not be read.
    #[error("Session error: {0}")]
    Session(String),

    /// An encryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<ServerError> for AppError {
    fn from(e: ServerError) -> Self {
        AppError::Server(e)
    }
}

impl AppError {
    /// The registry error behind this error, if any.
    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            AppError::Server(e) => Some(e),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Server(ref e) => {
                tracing::warn!("Registry error: {}", e);
                (StatusCode::BAD_GATEWAY, e.message.clone())
            }

            AppError::Http(ref e) => {
                tracing::error!("Registry unreachable: {}", e);
                (StatusCode::BAD_GATEWAY, "Registry unavailable".to_string())
            }

            AppError::Bundle(ref msg) => {
                tracing::error!("Bundle error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Invalid brick bundle".to_string())
            }

            AppError::Json(ref e) => {
                tracing::error!("JSON error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Session(ref msg) => {
                tracing::warn!("Session error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Session error".to_string())
            }

            AppError::Encryption(ref msg) => {
                tracing::error!("Encryption error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Encryption error".to_string())
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (
            status,
            [(http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}
