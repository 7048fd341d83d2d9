use axum::{
    extract::{DefaultBodyLimit, Request},
    handler::HandlerWithoutStateExt,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{config::MAX_BODY_BYTES, error::AppError, handlers, AppState};

/// A known path and the methods it answers to.
#[derive(Debug)]
pub struct RouteRule {
    pub pattern: &'static str,
    pub allowed: &'static [&'static str],
}

/// Every routed path. Requests to these paths with any other method get a 405.
pub const ROUTES: &[RouteRule] = &[
    RouteRule { pattern: "/register", allowed: &["POST"] },
    RouteRule { pattern: "/inventory", allowed: &["GET"] },
    RouteRule { pattern: "/inventory/:id", allowed: &["GET", "PUT", "DELETE"] },
    RouteRule { pattern: "/inventory/:id/photo", allowed: &["GET", "PUT"] },
    RouteRule { pattern: "/search", allowed: &["GET", "POST"] },
];

pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.public_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found.into_service());

    Router::new()
        .route("/register", post(handlers::inventory::register))
        .route("/inventory", get(handlers::inventory::list_items))
        .route(
            "/inventory/:id",
            get(handlers::inventory::get_item)
                .put(handlers::inventory::update_item)
                .delete(handlers::inventory::delete_item),
        )
        .route(
            "/inventory/:id/photo",
            get(handlers::inventory::get_photo).put(handlers::inventory::replace_photo),
        )
        .route(
            "/search",
            get(handlers::search::search_query).post(handlers::search::search_body),
        )
        .layer(middleware::from_fn(enforce_allowed_methods))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    AppError::NotFound
}

/// Allowed methods for `path`, or `None` when it isn't a routed path.
pub fn allowed_methods(path: &str) -> Option<&'static [&'static str]> {
    ROUTES
        .iter()
        .find(|rule| path_matches(rule.pattern, path))
        .map(|rule| rule.allowed)
}

fn path_matches(pattern: &str, path: &str) -> bool {
    let mut expected = pattern.split('/');
    let mut actual = path.split('/');
    loop {
        match (expected.next(), actual.next()) {
            (None, None) => return true,
            (Some(e), Some(a)) if e.starts_with(':') => {
                if a.is_empty() {
                    return false;
                }
            }
            (Some(e), Some(a)) if e == a => {}
            _ => return false,
        }
    }
}

async fn enforce_allowed_methods(req: Request, next: Next) -> Response {
    if let Some(allowed) = allowed_methods(req.uri().path()) {
        let method = req.method().as_str();
        let permitted =
            allowed.contains(&method) || (method == "HEAD" && allowed.contains(&"GET"));
        if !permitted {
            return AppError::MethodNotAllowed(allowed).into_response();
        }
    }
    next.run(req).await
}
