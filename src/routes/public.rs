use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token. Course reads only ever return non-deleted rows.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/register
        .route("/auth/register", post(handlers::register))
        // POST /auth/login
        // Issues a two-hour bearer token.
        .route("/auth/login", post(handlers::login))
        // GET /courses?category=&search=&orderBy=&page=&pageSize=
        // Cached for 60s; ETag revalidation via If-None-Match.
        .route("/courses", get(handlers::list_courses))
        // GET /courses/{id}
        .route("/courses/{id}", get(handlers::get_course))
}
