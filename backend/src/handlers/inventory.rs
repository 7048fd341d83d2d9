use std::time::Instant;

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    models::{Item, ItemView, UpdateItem},
    AppState,
};

use super::{upload, FormOrJson, Origin};

/// Fixed content type for photo downloads, whatever the file actually holds.
const PHOTO_CONTENT_TYPE: &str = "image/jpeg";

// ── Register ──────────────────────────────────────────────────────────────────

pub async fn register(
    State(state): State<AppState>,
    req: Request,
) -> AppResult<(StatusCode, Json<Item>)> {
    let form = upload::read_form(&state, req).await?;
    let item = state
        .service
        .register(form.inventory_name, form.description, form.photo)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_items(
    State(state): State<AppState>,
    origin: Origin,
) -> AppResult<Json<Vec<ItemView>>> {
    let start = Instant::now();
    let items = state.service.list().await?;

    info!(
        count = items.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Listed items"
    );

    Ok(Json(
        items
            .into_iter()
            .map(|it| ItemView::project(it, Some(origin.as_str())))
            .collect(),
    ))
}

// ── Get by ID ─────────────────────────────────────────────────────────────────

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    origin: Origin,
) -> AppResult<Json<ItemView>> {
    let item = state.service.get(&id).await?;
    Ok(Json(ItemView::project(item, Some(origin.as_str()))))
}

// ── Update ────────────────────────────────────────────────────────────────────

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    FormOrJson(changes): FormOrJson<UpdateItem>,
) -> AppResult<Json<Item>> {
    let item = state.service.update(&id, changes).await?;
    Ok(Json(item))
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = state.service.delete(&id).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

// ── Photo ─────────────────────────────────────────────────────────────────────

/// Streams the file from disk; `ServeFile` also answers range and
/// conditional requests.
pub async fn get_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
) -> AppResult<Response> {
    let photo = state.service.photo(&id).await?;
    let mut res = match ServeFile::new(&photo.path).oneshot(req).await {
        Ok(res) => res,
        Err(never) => match never {},
    };
    // Removed between the lookup and the open.
    if res.status() == StatusCode::NOT_FOUND {
        return Err(AppError::PhotoNotFound);
    }

    res.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(PHOTO_CONTENT_TYPE));
    info!(id = %id, photo = %photo.name, status = %res.status(), "Serving photo");
    Ok(res.into_response())
}

pub async fn replace_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
) -> AppResult<Json<Item>> {
    let form = upload::read_form(&state, req).await?;
    let item = state.service.replace_photo(&id, form.photo).await?;
    Ok(Json(item))
}
