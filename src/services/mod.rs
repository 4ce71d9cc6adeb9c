//! Workflows behind the HTTP handlers.
//!
//! Each service owns a handle to the shared repository. Operations gated by role run
//! their capability check on the caller (`AuthUser`) before touching storage.

pub mod auth;
pub mod courses;
pub mod enrollments;
pub mod students;

pub use auth::AuthService;
pub use courses::CourseService;
pub use enrollments::EnrollmentService;
pub use students::StudentService;
