use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value as JsonValue};

use crate::services::meta_service::MetaApiError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{error}")]
    BadRequestDetailed {
        error: &'static str,
        message: &'static str,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Contact not found")]
    ContactNotFound,

    #[error("Session window expired")]
    SessionExpired {
        last_interaction_at: Option<chrono::DateTime<chrono::Utc>>,
        meta_error: Option<MetaApiError>,
    },

    #[error("Template not found: {0}")]
    TemplateNotFound(String, MetaApiError),

    #[error("Template parameter mismatch for {0}")]
    TemplateParamMismatch(String, MetaApiError),

    #[error("Template paused: {0}")]
    TemplatePaused(String, MetaApiError),

    #[error("{context}")]
    Provider {
        context: &'static str,
        #[source]
        source: MetaApiError,
    },

    #[error("Template catalog fetch failed: {0}")]
    TemplateCatalog(MetaApiError),

    #[error("Media upload failed: {0}")]
    MediaUpload(MetaApiError),

    #[error("Test notification failed: {0}")]
    NotificationSend(MetaApiError),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, body): (StatusCode, JsonValue) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            Error::BadRequestDetailed { error, message } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": error, "message": message }),
            ),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            Error::ContactNotFound => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": "Contact not found",
                    "message": "The recipient is not in your contacts. They must send you a message first.",
                }),
            ),
            Error::SessionExpired {
                last_interaction_at,
                meta_error,
            } => {
                let mut body = json!({
                    "error": "Session window expired",
                    "message": "Session window expired. Use template message.",
                    "session_status": "expired",
                });
                if let Some(last) = last_interaction_at {
                    body["last_interaction_at"] = json!(last);
                }
                if let Some(err) = meta_error {
                    body["meta_error"] = json!(err);
                }
                (StatusCode::BAD_REQUEST, body)
            }
            Error::TemplateNotFound(name, err) => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": "Template not found",
                    "message": format!("Template '{}' does not exist or is not approved.", name),
                    "meta_error": err,
                }),
            ),
            Error::TemplateParamMismatch(_, err) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Invalid template parameters",
                    "message": "The provided components don't match the template requirements.",
                    "meta_error": err,
                }),
            ),
            Error::TemplatePaused(name, err) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Template paused",
                    "message": format!("Template '{}' has been paused due to quality issues.", name),
                    "meta_error": err,
                }),
            ),
            Error::Provider { context, source } => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": context, "meta_error": source }),
            ),
            Error::TemplateCatalog(err) => {
                let message = err.message.clone();
                (
                    StatusCode::BAD_GATEWAY,
                    json!({
                        "error": "Failed to fetch templates",
                        "message": message,
                        "meta_error": err,
                    }),
                )
            }
            Error::MediaUpload(err) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "Failed to upload media", "message": err.message }),
            ),
            Error::NotificationSend(err) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "Failed to send test notification", "message": err.message }),
            ),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
            Error::Database(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": err.to_string() }),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
            Error::Reqwest(err) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": format!("External service error: {}", err) }),
            ),
            Error::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Server configuration error", "message": msg }),
            ),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg })),
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": err.to_string() }),
            ),
            Error::Anyhow(err) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}
