use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get},
};

/// Admin Router Module
///
/// Account administration and destructive operations. Mounted behind the same
/// authentication layer as the authenticated router; the Admin role itself is
/// checked by each workflow before storage is touched.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /students
        .route(
            "/students",
            get(handlers::list_students).post(handlers::create_student),
        )
        // DELETE /students/{id}
        // Soft delete plus deactivation.
        .route("/students/{id}", delete(handlers::delete_student))
        // DELETE /courses/{id}
        .route("/courses/{id}", delete(handlers::delete_course))
        // DELETE /enrollments/{id}
        // Active -> Cancelled.
        .route("/enrollments/{id}", delete(handlers::cancel_enrollment))
}
