use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Roles & Statuses ---

/// Role
///
/// Named permission group attached to an identity at creation time.
/// Used purely for access-control decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum Role {
    Admin,
    Instructor,
    Student,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Instructor, Role::Student];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Instructor => "Instructor",
            Role::Student => "Student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

/// EnrollmentStatus
///
/// Lifecycle of an enrollment. Only `Active -> Cancelled` is ever performed;
/// `Completed` exists in the schema but no operation produces it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "enrollment_status")]
#[ts(export)]
pub enum EnrollmentStatus {
    Active,
    Cancelled,
    Completed,
}

// --- Core Records (Mapped to Database) ---

/// Identity
///
/// A registered account (student, instructor or admin). Doubles as the credential
/// record, so it is never serialized directly; see `StudentResponse`.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<Role>,
}

impl Identity {
    /// Whether the account may authenticate and be enrolled.
    pub fn is_live(&self) -> bool {
        self.is_active && !self.is_deleted
    }
}

/// NewIdentity
///
/// Insert payload for the credential store. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub roles: Vec<Role>,
}

/// Course
///
/// A course offered on the platform, stored in the `courses` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub workload: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    // Soft-deleted rows never leave the repository, so this is internal only.
    #[serde(skip)]
    #[ts(skip)]
    pub is_deleted: bool,
}

/// Enrollment
///
/// Raw enrollment row. Links one identity to one course by id.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}

/// EnrollmentResponse
///
/// Enrollment joined with its course title for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct EnrollmentResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub course_title: String,
    pub status: EnrollmentStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl EnrollmentResponse {
    pub fn from_parts(enrollment: Enrollment, course_title: String) -> Self {
        Self {
            id: enrollment.id,
            student_id: enrollment.student_id,
            course_id: enrollment.course_id,
            course_title,
            status: enrollment.status,
            created_at: enrollment.created_at,
        }
    }
}

/// StudentResponse
///
/// Public view of an identity. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StudentResponse {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub roles: Vec<Role>,
}

impl From<Identity> for StudentResponse {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            username: identity.username,
            full_name: identity.full_name,
            email: identity.email,
            is_active: identity.is_active,
            created_at: identity.created_at,
            roles: identity.roles,
        }
    }
}

/// Page
///
/// Offset-pagination envelope. `total` counts every matching row so clients can
/// compute the number of pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Page<T> {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub data: Vec<T>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for self-registration (POST /auth/register).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "jdoe@example.com")]
    pub email: String,
    #[schema(example = "Jane Doe")]
    pub full_name: String,
    #[schema(example = "Str0ngPassword")]
    pub password: String,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// LoginResponse
///
/// Bearer token plus the instant after which it is rejected.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
}

/// MessageResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

/// CourseRequest
///
/// Payload for both course creation (POST /courses) and full replacement (PUT /courses/{id}).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CourseRequest {
    #[schema(example = "Intro to Systems Programming")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[schema(example = "CS")]
    pub category: String,
    #[schema(example = 40)]
    pub workload: i32,
}

/// CreateStudentRequest
///
/// Admin-side account creation (POST /students). The email doubles as the username.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateStudentRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// UpdateStudentRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateStudentRequest {
    pub full_name: String,
}

/// CreateEnrollmentRequest
///
/// `student_id` is only honoured for Admin callers; everyone else enrolls themself.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateEnrollmentRequest {
    pub course_id: Uuid,
    #[serde(default)]
    pub student_id: Option<Uuid>,
}

// --- Query Parameters ---

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

/// Rows to skip for a 1-based `page`, or `None` when the product leaves `i64`.
pub fn page_offset(page: i64, page_size: i64) -> Option<i64> {
    page.max(1).checked_sub(1)?.checked_mul(page_size.max(0))
}

/// CourseQuery
///
/// Filtering, ordering and pagination for GET /courses.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CourseQuery {
    /// Exact category match.
    pub category: Option<String>,
    /// Case-insensitive substring over title or category.
    pub search: Option<String>,
    /// `date` for newest first; anything else sorts by title.
    #[serde(alias = "order_by")]
    pub order_by: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size", alias = "page_size")]
    pub page_size: i64,
}

impl Default for CourseQuery {
    fn default() -> Self {
        Self {
            category: None,
            search: None,
            order_by: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl CourseQuery {
    pub fn order(&self) -> CourseOrder {
        match self.order_by.as_deref() {
            Some("date") => CourseOrder::NewestFirst,
            _ => CourseOrder::Title,
        }
    }

    /// Saturates at `i64::MAX`, which selects an empty page.
    pub fn offset(&self) -> i64 {
        page_offset(self.page, self.page_size).unwrap_or(i64::MAX)
    }
}

/// CourseOrder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseOrder {
    Title,
    NewestFirst,
}

/// EnrollmentQuery
///
/// Pagination and status filter for GET /students/{id}/enrollments.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EnrollmentQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size", alias = "page_size")]
    pub page_size: i64,
    pub status: Option<EnrollmentStatus>,
}

impl Default for EnrollmentQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            status: None,
        }
    }
}

impl EnrollmentQuery {
    /// Saturates at `i64::MAX`, which selects an empty page.
    pub fn offset(&self) -> i64 {
        page_offset(self.page, self.page_size).unwrap_or(i64::MAX)
    }
}
