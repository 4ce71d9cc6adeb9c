use async_trait::async_trait;
use chrono::Utc;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::{RepoResult, Repository};
use crate::{
    error::RepositoryError,
    models::{
        Course, CourseOrder, CourseQuery, CourseRequest, Enrollment, EnrollmentQuery,
        EnrollmentResponse, EnrollmentStatus, Identity, NewIdentity,
    },
};

#[derive(Default)]
struct Tables {
    identities: Vec<Identity>,
    courses: Vec<Course>,
    enrollments: Vec<Enrollment>,
}

/// InMemoryRepository
///
/// Process-local implementation of `Repository` used by the test suite and by local
/// runs without `DATABASE_URL`. Enforces the same partial unique rules as the
/// Postgres indexes (username, email, course title and enrollment pair among
/// non-deleted rows).
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".into()))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".into()))
    }

    /// Number of enrollment rows (deleted included) for a (student, course) pair.
    pub fn enrollment_rows(&self, student_id: Uuid, course_id: Uuid) -> RepoResult<usize> {
        Ok(self
            .read()?
            .enrollments
            .iter()
            .filter(|e| e.student_id == student_id && e.course_id == course_id)
            .count())
    }

    /// Clears `is_active` without deleting. No HTTP operation does this; it exists
    /// to stage inactive accounts.
    pub fn deactivate_identity(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.write()?;
        match tables.identities.iter_mut().find(|i| i.id == id) {
            Some(identity) => {
                identity.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn matches_course(course: &Course, query: &CourseQuery) -> bool {
    if course.is_deleted {
        return false;
    }
    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        if course.category != category {
            return false;
        }
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        if !course.title.to_lowercase().contains(&needle)
            && !course.category.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    true
}

/// Matches `lower(a) = lower(b)` as the unique indexes compare.
fn same_text(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn window<T>(rows: Vec<T>, offset: i64, limit: i64) -> Vec<T> {
    let skip = usize::try_from(offset).unwrap_or(usize::MAX);
    let take = usize::try_from(limit).unwrap_or(0);
    rows.into_iter().skip(skip).take(take).collect()
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_identity(&self, id: Uuid) -> RepoResult<Option<Identity>> {
        Ok(self.read()?.identities.iter().find(|i| i.id == id).cloned())
    }

    async fn find_live_identity_by_username(
        &self,
        username: &str,
    ) -> RepoResult<Option<Identity>> {
        Ok(self
            .read()?
            .identities
            .iter()
            .find(|i| !i.is_deleted && same_text(&i.username, username))
            .cloned())
    }

    async fn get_live_identity(&self, id: Uuid) -> RepoResult<Option<Identity>> {
        Ok(self
            .read()?
            .identities
            .iter()
            .find(|i| i.id == id && !i.is_deleted)
            .cloned())
    }

    async fn list_live_identities(&self) -> RepoResult<Vec<Identity>> {
        let mut live: Vec<Identity> = self
            .read()?
            .identities
            .iter()
            .filter(|i| !i.is_deleted)
            .cloned()
            .collect();
        live.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(live)
    }

    async fn username_taken(&self, username: &str) -> RepoResult<bool> {
        Ok(self
            .read()?
            .identities
            .iter()
            .any(|i| !i.is_deleted && same_text(&i.username, username)))
    }

    async fn email_taken(&self, email: &str) -> RepoResult<bool> {
        Ok(self
            .read()?
            .identities
            .iter()
            .any(|i| !i.is_deleted && same_text(&i.email, email)))
    }

    async fn insert_identity(&self, new: NewIdentity) -> RepoResult<Identity> {
        let mut tables = self.write()?;
        let clash = tables.identities.iter().any(|i| {
            !i.is_deleted
                && (same_text(&i.username, &new.username)
                    || same_text(&i.email, &new.email))
        });
        if clash {
            return Err(RepositoryError::UniqueViolation(
                "username or email already registered".into(),
            ));
        }

        let identity = Identity {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            full_name: new.full_name,
            is_active: true,
            is_deleted: false,
            created_at: Utc::now(),
            roles: new.roles,
        };
        tables.identities.push(identity.clone());
        Ok(identity)
    }

    async fn update_identity_name(&self, id: Uuid, full_name: &str) -> RepoResult<bool> {
        let mut tables = self.write()?;
        match tables
            .identities
            .iter_mut()
            .find(|i| i.id == id && !i.is_deleted)
        {
            Some(identity) => {
                identity.full_name = full_name.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn soft_delete_identity(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.write()?;
        match tables
            .identities
            .iter_mut()
            .find(|i| i.id == id && !i.is_deleted)
        {
            Some(identity) => {
                identity.is_deleted = true;
                identity.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn course_title_taken(&self, title: &str, except: Option<Uuid>) -> RepoResult<bool> {
        Ok(self
            .read()?
            .courses
            .iter()
            .any(|c| !c.is_deleted && c.title == title && Some(c.id) != except))
    }

    async fn insert_course(&self, req: CourseRequest) -> RepoResult<Course> {
        let mut tables = self.write()?;
        if tables
            .courses
            .iter()
            .any(|c| !c.is_deleted && c.title == req.title)
        {
            return Err(RepositoryError::UniqueViolation(
                "course title already exists".into(),
            ));
        }

        let course = Course {
            id: Uuid::new_v4(),
            title: req.title,
            description: req.description,
            category: req.category,
            workload: req.workload,
            created_at: Utc::now(),
            is_deleted: false,
        };
        tables.courses.push(course.clone());
        Ok(course)
    }

    async fn list_courses(&self, query: &CourseQuery) -> RepoResult<(Vec<Course>, i64)> {
        let mut matching: Vec<Course> = self
            .read()?
            .courses
            .iter()
            .filter(|c| matches_course(c, query))
            .cloned()
            .collect();

        match query.order() {
            CourseOrder::NewestFirst => matching
                .sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id))),
            CourseOrder::Title => {
                matching.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)))
            }
        }

        let total = matching.len() as i64;
        Ok((window(matching, query.offset(), query.page_size), total))
    }

    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>> {
        Ok(self
            .read()?
            .courses
            .iter()
            .find(|c| c.id == id && !c.is_deleted)
            .cloned())
    }

    async fn update_course(&self, id: Uuid, req: CourseRequest) -> RepoResult<bool> {
        let mut tables = self.write()?;
        if tables
            .courses
            .iter()
            .any(|c| !c.is_deleted && c.id != id && c.title == req.title)
        {
            return Err(RepositoryError::UniqueViolation(
                "course title already exists".into(),
            ));
        }

        match tables
            .courses
            .iter_mut()
            .find(|c| c.id == id && !c.is_deleted)
        {
            Some(course) => {
                course.title = req.title;
                course.description = req.description;
                course.category = req.category;
                course.workload = req.workload;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn soft_delete_course(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.write()?;
        match tables
            .courses
            .iter_mut()
            .find(|c| c.id == id && !c.is_deleted)
        {
            Some(course) => {
                course.is_deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn enrollment_exists(&self, student_id: Uuid, course_id: Uuid) -> RepoResult<bool> {
        Ok(self.read()?.enrollments.iter().any(|e| {
            !e.is_deleted && e.student_id == student_id && e.course_id == course_id
        }))
    }

    async fn insert_enrollment(&self, student_id: Uuid, course_id: Uuid) -> RepoResult<Enrollment> {
        let mut tables = self.write()?;
        if tables
            .enrollments
            .iter()
            .any(|e| !e.is_deleted && e.student_id == student_id && e.course_id == course_id)
        {
            return Err(RepositoryError::UniqueViolation("already enrolled".into()));
        }

        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            student_id,
            course_id,
            status: EnrollmentStatus::Active,
            created_at: Utc::now(),
            is_deleted: false,
        };
        tables.enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn list_enrollments(
        &self,
        student_id: Uuid,
        query: &EnrollmentQuery,
    ) -> RepoResult<(Vec<EnrollmentResponse>, i64)> {
        let tables = self.read()?;
        let mut matching: Vec<EnrollmentResponse> = tables
            .enrollments
            .iter()
            .filter(|e| e.student_id == student_id)
            .filter(|e| match query.status {
                Some(status) => e.status == status,
                None => !e.is_deleted,
            })
            .filter_map(|e| {
                // Inner join: rows whose course row vanished are not listed.
                let course = tables.courses.iter().find(|c| c.id == e.course_id)?;
                Some(EnrollmentResponse::from_parts(e.clone(), course.title.clone()))
            })
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matching.len() as i64;
        Ok((window(matching, query.offset(), query.page_size), total))
    }

    async fn cancel_enrollment(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.write()?;
        match tables
            .enrollments
            .iter_mut()
            .find(|e| e.id == id && !e.is_deleted)
        {
            Some(enrollment) => {
                enrollment.status = EnrollmentStatus::Cancelled;
                enrollment.is_deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn new_identity(username: &str, email: &str) -> NewIdentity {
        NewIdentity {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            full_name: "Test User".into(),
            roles: vec![Role::Student],
        }
    }

    fn course(title: &str, category: &str) -> CourseRequest {
        CourseRequest {
            title: title.into(),
            description: None,
            category: category.into(),
            workload: 10,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let repo = InMemoryRepository::new();
        repo.insert_identity(new_identity("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = repo
            .insert_identity(new_identity("alice2", "ALICE@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn deleted_identity_frees_its_username() {
        let repo = InMemoryRepository::new();
        let first = repo
            .insert_identity(new_identity("bob", "bob@example.com"))
            .await
            .unwrap();
        assert!(repo.soft_delete_identity(first.id).await.unwrap());

        assert!(!repo.username_taken("bob").await.unwrap());
        repo.insert_identity(new_identity("bob", "bob@example.com"))
            .await
            .unwrap();

        // The deleted row is still reachable by id.
        let old = repo.find_identity(first.id).await.unwrap().unwrap();
        assert!(old.is_deleted && !old.is_active);
    }

    #[tokio::test]
    async fn search_matches_title_or_category_ignoring_case() {
        let repo = InMemoryRepository::new();
        repo.insert_course(course("Rust for Beginners", "Programming"))
            .await
            .unwrap();
        repo.insert_course(course("Watercolour Basics", "Art"))
            .await
            .unwrap();

        let query = CourseQuery {
            search: Some("PROGRAM".into()),
            ..CourseQuery::default()
        };
        let (page, total) = repo.list_courses(&query).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].title, "Rust for Beginners");
    }

    #[tokio::test]
    async fn like_metacharacters_are_literal_in_search() {
        let repo = InMemoryRepository::new();
        repo.insert_course(course("Percent % Course", "Math"))
            .await
            .unwrap();
        repo.insert_course(course("Plain Title Course", "Math"))
            .await
            .unwrap();

        let query = CourseQuery {
            search: Some("%".into()),
            ..CourseQuery::default()
        };
        let (_, total) = repo.list_courses(&query).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn cancelled_enrollment_is_hidden_unless_filtered_by_status() {
        let repo = InMemoryRepository::new();
        let student = repo
            .insert_identity(new_identity("carol", "carol@example.com"))
            .await
            .unwrap();
        let c = repo
            .insert_course(course("Distributed Systems", "CS"))
            .await
            .unwrap();
        let enrollment = repo.insert_enrollment(student.id, c.id).await.unwrap();
        assert!(repo.cancel_enrollment(enrollment.id).await.unwrap());
        assert!(!repo.cancel_enrollment(enrollment.id).await.unwrap());

        let (_, unfiltered) = repo
            .list_enrollments(student.id, &EnrollmentQuery::default())
            .await
            .unwrap();
        assert_eq!(unfiltered, 0);

        let cancelled = EnrollmentQuery {
            status: Some(EnrollmentStatus::Cancelled),
            ..EnrollmentQuery::default()
        };
        let (rows, total) = repo.list_enrollments(student.id, &cancelled).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].status, EnrollmentStatus::Cancelled);
        assert_eq!(rows[0].course_title, "Distributed Systems");
    }

    #[tokio::test]
    async fn identity_lookups_fold_non_ascii_case() {
        let repo = InMemoryRepository::new();
        repo.insert_identity(new_identity("Émilie", "émilie@example.com"))
            .await
            .unwrap();

        assert!(repo.username_taken("éMILIE").await.unwrap());
        assert!(repo.email_taken("ÉMILIE@example.com").await.unwrap());
        assert!(
            repo.find_live_identity_by_username("ÉMILIE")
                .await
                .unwrap()
                .is_some()
        );
        let err = repo
            .insert_identity(new_identity("other", "ÉMILIE@EXAMPLE.COM"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn second_live_enrollment_for_same_pair_is_a_unique_violation() {
        let repo = InMemoryRepository::new();
        let student = repo
            .insert_identity(new_identity("dave", "dave@example.com"))
            .await
            .unwrap();
        let c = repo
            .insert_course(course("Operating Systems", "CS"))
            .await
            .unwrap();

        repo.insert_enrollment(student.id, c.id).await.unwrap();
        let err = repo.insert_enrollment(student.id, c.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueViolation(_)));
        assert_eq!(repo.enrollment_rows(student.id, c.id).unwrap(), 1);
    }

    #[tokio::test]
    async fn page_past_the_end_of_i64_is_empty() {
        let repo = InMemoryRepository::new();
        repo.insert_course(course("Compilers in Practice", "CS"))
            .await
            .unwrap();

        let query = CourseQuery {
            page: i64::MAX,
            page_size: 2,
            ..CourseQuery::default()
        };
        assert_eq!(query.offset(), i64::MAX);
        let (rows, total) = repo.list_courses(&query).await.unwrap();
        assert_eq!(total, 1);
        assert!(rows.is_empty());
    }
}
