use axum::{
    extract::multipart::MultipartError,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("Photo not found")]
    PhotoNotFound,

    #[error("Method Not Allowed")]
    MethodNotAllowed(&'static [&'static str]),

    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            AppError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
            }
            AppError::PhotoNotFound => (StatusCode::NOT_FOUND, "Photo not found").into_response(),
            AppError::MethodNotAllowed(allowed) => {
                let mut res = (
                    StatusCode::METHOD_NOT_ALLOWED,
                    Json(json!({ "error": "Method Not Allowed" })),
                )
                    .into_response();
                if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
                    res.headers_mut().insert(header::ALLOW, value);
                }
                res
            }
            AppError::Multipart(e) => {
                (e.status(), Json(json!({ "error": e.body_text() }))).into_response()
            }
            AppError::Store(e) => {
                error!(error = %e, "Store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            AppError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::PhotoNotFound.into_response().status(), StatusCode::NOT_FOUND);
        let io = StoreError::Io {
            path: "db.json".into(),
            source: std::io::Error::other("disk on fire"),
        };
        assert_eq!(
            AppError::from(io).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn method_not_allowed_sets_allow_header() {
        let res = AppError::MethodNotAllowed(&["GET", "PUT", "DELETE"]).into_response();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[header::ALLOW], "GET, PUT, DELETE");
    }
}
