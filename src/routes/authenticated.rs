use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Endpoints that need a resolved `AuthUser`. Which roles may proceed is decided
/// per operation: course writes need Admin or Instructor, student records need
/// Admin or the student themself.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /courses (Admin, Instructor)
        .route("/courses", post(handlers::create_course))
        // PUT /courses/{id} (Admin, Instructor)
        .route("/courses/{id}", put(handlers::update_course))
        // POST /enrollments
        // Non-admins always enroll themselves.
        .route("/enrollments", post(handlers::create_enrollment))
        // GET /students/me
        .route("/students/me", get(handlers::get_me))
        // GET/PUT /students/{id} (Admin or self)
        .route(
            "/students/{id}",
            get(handlers::get_student).put(handlers::update_student),
        )
        // GET /students/{id}/enrollments (Admin or self)
        .route(
            "/students/{id}/enrollments",
            get(handlers::list_student_enrollments),
        )
}
