use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{RepoResult, Repository, like_pattern};
use crate::{
    error::RepositoryError,
    models::{
        Course, CourseOrder, CourseQuery, CourseRequest, Enrollment, EnrollmentQuery,
        EnrollmentResponse, EnrollmentStatus, Identity, NewIdentity,
    },
};

/// PostgresRepository
///
/// The production implementation of `Repository`, backed by a PostgreSQL pool.
/// Queries are built at runtime (`query_as`/`QueryBuilder`) and always bind user input.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw `identities` row. Roles are stored as a TEXT[] of role names.
#[derive(FromRow)]
struct IdentityRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    full_name: String,
    is_active: bool,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    roles: Vec<String>,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        let roles = row
            .roles
            .iter()
            .filter_map(|name| match name.parse() {
                Ok(role) => Some(role),
                Err(e) => {
                    tracing::warn!(identity = %row.id, error = %e, "ignoring stored role");
                    None
                }
            })
            .collect();

        Identity {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            is_active: row.is_active,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            roles,
        }
    }
}

/// Unique-index violations become `UniqueViolation(what)`; everything else stays a database error.
fn map_write_error(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RepositoryError::UniqueViolation(what.to_string());
        }
    }
    tracing::error!(error = ?err, "write failed");
    RepositoryError::Database(err)
}

fn push_course_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &CourseQuery) {
    builder.push(" WHERE is_deleted = false");

    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        builder.push(" AND category = ");
        builder.push_bind(category.to_string());
    }

    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        builder.push(" AND (title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR category ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

fn push_enrollment_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    student_id: Uuid,
    query: &EnrollmentQuery,
) {
    builder.push(" WHERE e.student_id = ");
    builder.push_bind(student_id);

    match query.status {
        Some(status) => {
            builder.push(" AND e.status = ");
            builder.push_bind(status);
        }
        None => {
            builder.push(" AND e.is_deleted = false");
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_identity(&self, id: Uuid) -> RepoResult<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"SELECT id, username, email, password_hash, full_name,
                      is_active, is_deleted, created_at, roles
               FROM identities
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Identity::from))
    }

    async fn find_live_identity_by_username(
        &self,
        username: &str,
    ) -> RepoResult<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"SELECT id, username, email, password_hash, full_name,
                      is_active, is_deleted, created_at, roles
               FROM identities
               WHERE lower(username) = lower($1) AND is_deleted = false"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Identity::from))
    }

    async fn get_live_identity(&self, id: Uuid) -> RepoResult<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"SELECT id, username, email, password_hash, full_name,
                      is_active, is_deleted, created_at, roles
               FROM identities
               WHERE id = $1 AND is_deleted = false"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Identity::from))
    }

    async fn list_live_identities(&self) -> RepoResult<Vec<Identity>> {
        let rows = sqlx::query_as::<_, IdentityRow>(
            r#"SELECT id, username, email, password_hash, full_name,
                      is_active, is_deleted, created_at, roles
               FROM identities
               WHERE is_deleted = false
               ORDER BY created_at ASC, id ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Identity::from).collect())
    }

    async fn username_taken(&self, username: &str) -> RepoResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM identities WHERE lower(username) = lower($1) AND is_deleted = false)",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn email_taken(&self, email: &str) -> RepoResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM identities WHERE lower(email) = lower($1) AND is_deleted = false)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn insert_identity(&self, new: NewIdentity) -> RepoResult<Identity> {
        let roles: Vec<String> = new.roles.iter().map(|r| r.as_str().to_string()).collect();
        sqlx::query_as::<_, IdentityRow>(
            r#"INSERT INTO identities
                   (id, username, email, password_hash, full_name, is_active, is_deleted, roles, created_at)
               VALUES ($1, $2, $3, $4, $5, true, false, $6, $7)
               RETURNING id, username, email, password_hash, full_name,
                         is_active, is_deleted, created_at, roles"#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.full_name)
        .bind(roles)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map(Identity::from)
        .map_err(|e| map_write_error(e, "username or email already registered"))
    }

    async fn update_identity_name(&self, id: Uuid, full_name: &str) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE identities SET full_name = $2 WHERE id = $1 AND is_deleted = false",
        )
        .bind(id)
        .bind(full_name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete_identity(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE identities SET is_deleted = true, is_active = false WHERE id = $1 AND is_deleted = false",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn course_title_taken(&self, title: &str, except: Option<Uuid>) -> RepoResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                   SELECT 1 FROM courses
                   WHERE title = $1 AND is_deleted = false
                     AND ($2::uuid IS NULL OR id <> $2)
               )"#,
        )
        .bind(title)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn insert_course(&self, req: CourseRequest) -> RepoResult<Course> {
        sqlx::query_as::<_, Course>(
            r#"INSERT INTO courses (id, title, description, category, workload, created_at, is_deleted)
               VALUES ($1, $2, $3, $4, $5, $6, false)
               RETURNING id, title, description, category, workload, created_at, is_deleted"#,
        )
        .bind(Uuid::new_v4())
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.category)
        .bind(req.workload)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "course title already exists"))
    }

    /// Filters, orders and paginates with `QueryBuilder` so every user-supplied value is bound.
    async fn list_courses(&self, query: &CourseQuery) -> RepoResult<(Vec<Course>, i64)> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM courses");
        push_course_filters(&mut count, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut page: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, title, description, category, workload, created_at, is_deleted FROM courses",
        );
        push_course_filters(&mut page, query);
        page.push(match query.order() {
            CourseOrder::NewestFirst => " ORDER BY created_at DESC, id ASC",
            CourseOrder::Title => " ORDER BY title ASC, id ASC",
        });
        page.push(" LIMIT ");
        page.push_bind(query.page_size);
        page.push(" OFFSET ");
        page.push_bind(query.offset());

        let courses = page
            .build_query_as::<Course>()
            .fetch_all(&self.pool)
            .await?;

        Ok((courses, total))
    }

    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(
            r#"SELECT id, title, description, category, workload, created_at, is_deleted
               FROM courses
               WHERE id = $1 AND is_deleted = false"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(course)
    }

    async fn update_course(&self, id: Uuid, req: CourseRequest) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"UPDATE courses
               SET title = $2, description = $3, category = $4, workload = $5
               WHERE id = $1 AND is_deleted = false"#,
        )
        .bind(id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.category)
        .bind(req.workload)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "course title already exists"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete_course(&self, id: Uuid) -> RepoResult<bool> {
        let result =
            sqlx::query("UPDATE courses SET is_deleted = true WHERE id = $1 AND is_deleted = false")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn enrollment_exists(&self, student_id: Uuid, course_id: Uuid) -> RepoResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                   SELECT 1 FROM enrollments
                   WHERE student_id = $1 AND course_id = $2 AND is_deleted = false
               )"#,
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_enrollment(&self, student_id: Uuid, course_id: Uuid) -> RepoResult<Enrollment> {
        sqlx::query_as::<_, Enrollment>(
            r#"INSERT INTO enrollments (id, student_id, course_id, status, created_at, is_deleted)
               VALUES ($1, $2, $3, $4, $5, false)
               RETURNING id, student_id, course_id, status, created_at, is_deleted"#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(course_id)
        .bind(EnrollmentStatus::Active)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "already enrolled"))
    }

    async fn list_enrollments(
        &self,
        student_id: Uuid,
        query: &EnrollmentQuery,
    ) -> RepoResult<(Vec<EnrollmentResponse>, i64)> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM enrollments e");
        push_enrollment_filters(&mut count, student_id, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut page: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"SELECT e.id, e.student_id, e.course_id, c.title AS course_title, e.status, e.created_at
               FROM enrollments e
               JOIN courses c ON c.id = e.course_id"#,
        );
        push_enrollment_filters(&mut page, student_id, query);
        page.push(" ORDER BY e.created_at DESC, e.id ASC LIMIT ");
        page.push_bind(query.page_size);
        page.push(" OFFSET ");
        page.push_bind(query.offset());

        let rows = page
            .build_query_as::<EnrollmentResponse>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn cancel_enrollment(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE enrollments SET status = $2, is_deleted = true WHERE id = $1 AND is_deleted = false",
        )
        .bind(id)
        .bind(EnrollmentStatus::Cancelled)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
