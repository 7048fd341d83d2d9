pub mod inventory;
pub mod search;
pub mod upload;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
    Form,
};
use serde::de::DeserializeOwned;

use crate::{error::AppError, AppState};

/// `scheme://host` of the incoming request, used to build `photo_url`.
#[derive(Debug, Clone)]
pub struct Origin(pub String);

impl Origin {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Origin {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let host = header_str(&parts.headers, header::HOST)
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| state.fallback_host.to_string());
        let scheme = header_str(&parts.headers, "x-forwarded-proto")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("http");
        Ok(Origin(format!("{}://{}", scheme, host)))
    }
}

fn header_str(headers: &HeaderMap, name: impl header::AsHeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Body accepted as JSON or urlencoded form. Any other content type, or an
/// empty JSON body, yields `T::default()` (every field absent).
#[derive(Debug)]
pub struct FormOrJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for FormOrJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = header_str(req.headers(), header::CONTENT_TYPE)
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(Self(value));
        }

        if content_type.starts_with("application/json") || content_type.ends_with("+json") {
            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Self(T::default()));
            }
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))?;
            return Ok(Self(value));
        }

        Ok(Self(T::default()))
    }
}
