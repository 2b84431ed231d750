use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

use crate::store::StoreError;
use crate::sync::SyncError;

/// Everything a handler can fail with, mapped to a response in one place.
/// Internal causes are logged here and never shown to the visitor.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("template: {0}")]
    Template(#[from] askama::Error),
    #[error("session: {0}")]
    Session(#[from] tower_sessions::session::Error),
    #[error("store: {0}")]
    Store(StoreError),
    #[error("form upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error("{0}")]
    BadRequest(String),
    #[error("sign-in required")]
    SignInRequired,
    #[error("not found")]
    NotFound,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let public = match &self {
            AppError::NotFound => return (StatusCode::NOT_FOUND, "Not found").into_response(),
            AppError::SignInRequired => return Redirect::to("/login").into_response(),
            AppError::Multipart(e) => return (e.status(), e.body_text()).into_response(),
            AppError::BadRequest(message) => {
                return (StatusCode::BAD_REQUEST, message.clone()).into_response();
            }
            AppError::Store(_) => "Something went wrong saving your memory",
            AppError::Database(_) | AppError::Template(_) | AppError::Session(_) => {
                "Internal server error"
            }
        };
        tracing::error!("Request failed: {self}");
        (StatusCode::INTERNAL_SERVER_ERROR, public).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::NotFound,
            other => AppError::Store(other),
        }
    }
}

impl From<SyncError> for AppError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::NoSession => AppError::SignInRequired,
            SyncError::Comment(e) => AppError::BadRequest(e.to_string()),
            SyncError::Store(e) => e.into(),
        }
    }
}
