use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::RepositoryError,
    models::{
        Course, CourseQuery, CourseRequest, Enrollment, EnrollmentQuery, EnrollmentResponse,
        Identity, NewIdentity,
    },
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence contract behind the three stores: credentials, courses and enrollments.
/// Every read states its own visibility predicate in its documentation; no method relies
/// on an implicit soft-delete filter.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across axum tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---

    /// Any identity by id, deleted and inactive ones included.
    async fn find_identity(&self, id: Uuid) -> RepoResult<Option<Identity>>;
    /// Non-deleted identity by username (case-insensitive).
    async fn find_live_identity_by_username(&self, username: &str)
    -> RepoResult<Option<Identity>>;
    /// Non-deleted identity by id.
    async fn get_live_identity(&self, id: Uuid) -> RepoResult<Option<Identity>>;
    /// All non-deleted identities, oldest first.
    async fn list_live_identities(&self) -> RepoResult<Vec<Identity>>;
    /// Whether a non-deleted identity already uses `username` (case-insensitive).
    async fn username_taken(&self, username: &str) -> RepoResult<bool>;
    /// Whether a non-deleted identity already uses `email` (case-insensitive).
    async fn email_taken(&self, email: &str) -> RepoResult<bool>;
    /// Inserts an active identity with a fresh id and the current timestamp.
    async fn insert_identity(&self, new: NewIdentity) -> RepoResult<Identity>;
    /// Overwrites the full name of a non-deleted identity. False if none matched.
    async fn update_identity_name(&self, id: Uuid, full_name: &str) -> RepoResult<bool>;
    /// Sets `is_deleted` and clears `is_active` on a non-deleted identity in one write.
    async fn soft_delete_identity(&self, id: Uuid) -> RepoResult<bool>;

    // --- Courses ---

    /// Whether a non-deleted course other than `except` already uses `title`.
    async fn course_title_taken(&self, title: &str, except: Option<Uuid>) -> RepoResult<bool>;
    /// Inserts a course with a fresh id and the current timestamp.
    async fn insert_course(&self, req: CourseRequest) -> RepoResult<Course>;
    /// One page of non-deleted courses matching `query`, plus the total match count.
    async fn list_courses(&self, query: &CourseQuery) -> RepoResult<(Vec<Course>, i64)>;
    /// Non-deleted course by id.
    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>>;
    /// Overwrites the mutable fields of a non-deleted course. False if none matched.
    async fn update_course(&self, id: Uuid, req: CourseRequest) -> RepoResult<bool>;
    /// Flags a non-deleted course as deleted. The row is kept.
    async fn soft_delete_course(&self, id: Uuid) -> RepoResult<bool>;

    // --- Enrollments ---

    /// Whether a non-deleted enrollment exists for the (student, course) pair.
    async fn enrollment_exists(&self, student_id: Uuid, course_id: Uuid) -> RepoResult<bool>;
    /// Inserts an `Active` enrollment with a fresh id and the current timestamp.
    async fn insert_enrollment(&self, student_id: Uuid, course_id: Uuid)
    -> RepoResult<Enrollment>;
    /// One page of a student's enrollments joined with course titles, newest first.
    /// Without a status filter only non-deleted rows are visible; with one, every row of
    /// the student in that status is (cancellation soft-deletes the row).
    async fn list_enrollments(
        &self,
        student_id: Uuid,
        query: &EnrollmentQuery,
    ) -> RepoResult<(Vec<EnrollmentResponse>, i64)>;
    /// Sets `Cancelled` and `is_deleted` on a non-deleted enrollment in one write.
    async fn cancel_enrollment(&self, id: Uuid) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Escapes LIKE metacharacters and wraps the term for a substring match.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
