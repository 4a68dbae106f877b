use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Reported on `email` when another user already holds the address.
pub const EMAIL_TAKEN: &str = "Email is already in use";

/// Field name → human readable message, rendered as `{"errors": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Keeps the first message reported for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(value)` when nothing was reported.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Failures raised by a repository backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint on `field` rejected the write.
    #[error("duplicate value for {0}")]
    Duplicate(&'static str),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                let field = match db.constraint() {
                    Some(c) if c.contains("email") => "email",
                    _ => "id",
                };
                return StoreError::Duplicate(field);
            }
        }
        StoreError::Backend(e.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Everything a handler can answer with besides success.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("invalid request body: {0}")]
    MalformedBody(#[from] JsonRejection),
    #[error("{context}: {source}")]
    Storage {
        context: &'static str,
        source: StoreError,
    },
}

impl ApiError {
    /// Builds a `map_err` adapter that tags a store failure with the message
    /// returned to the client. Duplicate-key failures surface as validation
    /// errors on the offending field.
    pub fn storage(context: &'static str) -> impl FnOnce(StoreError) -> ApiError {
        move |source| match source {
            StoreError::Duplicate("email") => {
                ApiError::Validation(FieldErrors::single("email", EMAIL_TAKEN))
            }
            source => ApiError::Storage { context, source },
        }
    }

    /// Same as [`ApiError::storage`] for failures outside the store, such as hashing.
    pub fn internal(context: &'static str) -> impl FnOnce(anyhow::Error) -> ApiError {
        move |e| ApiError::Storage {
            context,
            source: StoreError::Backend(e),
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
            }
            ApiError::MalformedBody(rejection) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "message": "Invalid request body",
                    "error": rejection.body_text(),
                })),
            )
                .into_response(),
            ApiError::Storage { context, source } => {
                tracing::error!(error = %source, "{}", context);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": context, "error": source.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

/// Unwraps an optional JSON body extraction into the handler's error type.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(v)| v).map_err(ApiError::from)
}

/// A path segment that is not a UUID cannot name any stored record.
pub fn parse_id(raw: &str, not_found: &'static str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(raw.trim()).map_err(|_| ApiError::NotFound(not_found))
}
