use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{is_truthy, ItemView, QueryId, SearchBody, SearchQuery},
    AppState,
};

use super::{FormOrJson, Origin};

/// `GET /search?id=...&includePhoto=...`
pub async fn search_query(
    State(state): State<AppState>,
    origin: Origin,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> AppResult<Json<ItemView>> {
    let Query(pairs) = pairs.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let query = SearchQuery::from_pairs(pairs);
    let id = match query.id() {
        QueryId::Missing => None,
        QueryId::One(id) => Some(id),
        QueryId::Many => return Err(AppError::NotFound),
    };
    let item = state.service.search(id).await?;
    let origin = query.wants_photo().then_some(origin.as_str());
    Ok(Json(ItemView::project(item, origin)))
}

/// `POST /search` with `{ id, has_photo }`.
pub async fn search_body(
    State(state): State<AppState>,
    origin: Origin,
    FormOrJson(body): FormOrJson<SearchBody>,
) -> AppResult<Json<ItemView>> {
    let id = match body.id.as_ref().filter(|v| is_truthy(v)) {
        None => None,
        Some(serde_json::Value::String(id)) => Some(id.as_str()),
        // A truthy non-string id can never equal a stored id.
        Some(_) => return Err(AppError::NotFound),
    };
    let item = state.service.search(id).await?;
    let origin = body.wants_photo().then_some(origin.as_str());
    Ok(Json(ItemView::project(item, origin)))
}
