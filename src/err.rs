#![allow(non_snake_case)]

use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use serde::Serialize;

pub async fn handler404(path: Uri) -> (StatusCode, Json<Error>) {
    (
        StatusCode::NOT_FOUND,
        Json(Error::NotFound {
            message: format!("Invalid path: {}", path),
        }),
    )
}

pub fn Fine<V>(v: V) -> Success<V>
where
    V: Serialize,
{
    Success::of(v)
}

#[derive(Debug, Clone, Serialize)]
pub struct Success<V> {
    success: bool,
    #[serde(flatten)]
    value: V,
}

impl<V: Serialize> Success<V> {
    pub fn of(value: V) -> Self {
        Self {
            success: true,
            value,
        }
    }
}

/// Every failure the admin backend reports. Serialized with the variant name
/// under `error`, so the console can branch on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "error")]
pub enum Error {
    #[error("invalid value for `{field}`: {message}")]
    ValidationError { field: String, message: String },
    #[error("conflict on `{field}`: {message}")]
    ConflictError { field: String, message: String },
    #[error("configuration error: {message}")]
    ConfigurationError { message: String },
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("{kind}: {message}")]
    InternalError { kind: &'static str, message: String },
}

impl Error {
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Error {
        Error::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn conflict<F: Into<String>, M: Into<String>>(field: F, message: M) -> Error {
        Error::ConflictError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn configuration<M: Into<String>>(message: M) -> Error {
        Error::ConfigurationError {
            message: message.into(),
        }
    }

    pub fn not_found<M: Into<String>>(message: M) -> Error {
        Error::NotFound {
            message: message.into(),
        }
    }

    /// Name of the offending field for validation and conflict errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::ValidationError { field, .. } | Error::ConflictError { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::ValidationError { .. } => StatusCode::BAD_REQUEST,
            Error::ConflictError { .. } => StatusCode::CONFLICT,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::ConfigurationError { .. } | Error::InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::InternalError {
            kind: "DatabaseError",
            message: err.to_string(),
        }
    }
}

impl From<pbkdf2::password_hash::Error> for Error {
    fn from(err: pbkdf2::password_hash::Error) -> Self {
        Self::InternalError {
            kind: "PasswordHashError",
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError {
            kind: "SerializationError",
            message: err.to_string(),
        }
    }
}
