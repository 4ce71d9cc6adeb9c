use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    etag::cached_json,
    models::{
        Course, CourseQuery, CourseRequest, CreateEnrollmentRequest, CreateStudentRequest,
        EnrollmentQuery, EnrollmentResponse, LoginRequest, LoginResponse, MessageResponse, Page,
        RegisterRequest, StudentResponse, UpdateStudentRequest,
    },
};
use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

// --- Extractors ---

/// AppJson
///
/// `axum::Json` whose rejection (malformed body, wrong content type) is reported
/// through `ApiError` as a 400 validation failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// AppQuery
///
/// `axum::extract::Query` with the same rejection mapping as `AppJson`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

fn created_with_location(location: String, body: impl IntoResponse) -> Response {
    (StatusCode::CREATED, [(header::LOCATION, location)], body).into_response()
}

fn no_content_or_not_found(found: bool, what: &str) -> Result<StatusCode, ApiError> {
    if found {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("{what} not found")))
    }
}

// --- Auth ---

/// register
///
/// [Public Route] Self-registration. Returns a confirmation message only; the client
/// logs in separately to obtain a token.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered", body = MessageResponse),
        (status = 400, description = "Invalid fields or username taken"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let message = state.auth_service().register(payload).await?;
    Ok(Json(message))
}

/// login
///
/// [Public Route] Exchanges credentials for a bearer token valid for two hours.
/// Unknown, inactive and deleted accounts are indistinguishable from a bad password.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    state
        .auth_service()
        .login(payload)
        .await?
        .map(Json)
        .ok_or(ApiError::Unauthorized)
}

// --- Courses ---

/// list_courses
///
/// [Public Route] Paginated course catalogue with category filter, free-text search and
/// ordering. Served with an ETag; a matching `If-None-Match` yields 304.
#[utoipa::path(
    get,
    path = "/courses",
    params(CourseQuery),
    responses(
        (status = 200, description = "Page of courses", body = Page<Course>),
        (status = 304, description = "Not modified"),
        (status = 400, description = "Invalid pagination")
    )
)]
pub async fn list_courses(
    State(state): State<AppState>,
    headers: HeaderMap,
    AppQuery(query): AppQuery<CourseQuery>,
) -> Result<Response, ApiError> {
    let page = state.courses().list(&query).await?;
    cached_json(&headers, &page)
}

/// get_course
///
/// [Public Route] A single non-deleted course. Served with an ETag.
#[utoipa::path(
    get,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Found", body = Course),
        (status = 304, description = "Not modified"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let course = state
        .courses()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("course not found".into()))?;
    cached_json(&headers, &course)
}

/// create_course
///
/// [Authenticated Route] Admin or Instructor. Titles are unique among live courses.
#[utoipa::path(
    post,
    path = "/courses",
    request_body = CourseRequest,
    responses(
        (status = 201, description = "Created", body = Course),
        (status = 400, description = "Invalid fields"),
        (status = 403, description = "Not an Admin or Instructor"),
        (status = 409, description = "Title already exists")
    )
)]
pub async fn create_course(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CourseRequest>,
) -> Result<Response, ApiError> {
    let course = state.courses().create(&user, payload).await?;
    Ok(created_with_location(format!("/courses/{}", course.id), Json(course)))
}

/// update_course
///
/// [Authenticated Route] Admin or Instructor. Replaces every mutable field.
#[utoipa::path(
    put,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = CourseRequest,
    responses(
        (status = 204, description = "Updated"),
        (status = 400, description = "Invalid fields"),
        (status = 403, description = "Not an Admin or Instructor"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Title already exists")
    )
)]
pub async fn update_course(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<CourseRequest>,
) -> Result<StatusCode, ApiError> {
    let updated = state.courses().update(&user, id, payload).await?;
    no_content_or_not_found(updated, "course")
}

/// delete_course
///
/// [Admin Route] Soft delete. The course disappears from every read.
#[utoipa::path(
    delete,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an Admin"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_course(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.courses().delete(&user, id).await?;
    no_content_or_not_found(deleted, "course")
}

// --- Enrollments ---

/// create_enrollment
///
/// [Authenticated Route] Enrolls the caller, or for Admins the requested `student_id`.
#[utoipa::path(
    post,
    path = "/enrollments",
    request_body = CreateEnrollmentRequest,
    responses(
        (status = 201, description = "Enrolled", body = EnrollmentResponse),
        (status = 400, description = "Invalid student"),
        (status = 409, description = "Already enrolled"),
        (status = 422, description = "Student inactive or course not found")
    )
)]
pub async fn create_enrollment(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateEnrollmentRequest>,
) -> Result<Response, ApiError> {
    let enrollment = state.enrollments().enroll(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(enrollment)).into_response())
}

/// list_student_enrollments
///
/// [Authenticated Route] Admin or the student themself. `?status=` also reaches
/// cancelled enrollments.
#[utoipa::path(
    get,
    path = "/students/{id}/enrollments",
    params(("id" = Uuid, Path, description = "Student ID"), EnrollmentQuery),
    responses(
        (status = 200, description = "Page of enrollments", body = Page<EnrollmentResponse>),
        (status = 400, description = "Invalid pagination"),
        (status = 403, description = "Not this student or an Admin")
    )
)]
pub async fn list_student_enrollments(
    user: AuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
    AppQuery(query): AppQuery<EnrollmentQuery>,
) -> Result<Json<Page<EnrollmentResponse>>, ApiError> {
    let page = state
        .enrollments()
        .list_by_student(&user, student_id, &query)
        .await?;
    Ok(Json(page))
}

/// cancel_enrollment
///
/// [Admin Route] `Active -> Cancelled`. Cancelling twice yields 404 the second time.
#[utoipa::path(
    delete,
    path = "/enrollments/{id}",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 204, description = "Cancelled"),
        (status = 403, description = "Not an Admin"),
        (status = 404, description = "Not found or already cancelled")
    )
)]
pub async fn cancel_enrollment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let cancelled = state.enrollments().cancel(&user, id).await?;
    no_content_or_not_found(cancelled, "enrollment")
}

// --- Students ---

/// create_student
///
/// [Admin Route] Creates a Student account; the email is also the username.
#[utoipa::path(
    post,
    path = "/students",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Created", body = StudentResponse),
        (status = 400, description = "Invalid fields"),
        (status = 403, description = "Not an Admin"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_student(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateStudentRequest>,
) -> Result<Response, ApiError> {
    let student = state.students().create(&user, payload).await?;
    Ok(created_with_location(format!("/students/{}", student.id), Json(student)))
}

/// list_students
///
/// [Admin Route] Every non-deleted account.
#[utoipa::path(
    get,
    path = "/students",
    responses(
        (status = 200, description = "Students", body = [StudentResponse]),
        (status = 403, description = "Not an Admin")
    )
)]
pub async fn list_students(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentResponse>>, ApiError> {
    Ok(Json(state.students().list_all(&user).await?))
}

/// get_student
///
/// [Authenticated Route] Admin or the student themself.
#[utoipa::path(
    get,
    path = "/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Found", body = StudentResponse),
        (status = 403, description = "Not this student or an Admin"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_student(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StudentResponse>, ApiError> {
    state
        .students()
        .get(&user, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("student not found".into()))
}

/// update_student
///
/// [Authenticated Route] Admin or the student themself. Only the full name changes.
#[utoipa::path(
    put,
    path = "/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    request_body = UpdateStudentRequest,
    responses(
        (status = 204, description = "Updated"),
        (status = 400, description = "Invalid fields"),
        (status = 403, description = "Not this student or an Admin"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_student(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateStudentRequest>,
) -> Result<StatusCode, ApiError> {
    let updated = state.students().update(&user, id, payload).await?;
    no_content_or_not_found(updated, "student")
}

/// delete_student
///
/// [Admin Route] Soft delete plus deactivation.
#[utoipa::path(
    delete,
    path = "/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an Admin"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_student(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = state.students().delete(&user, id).await?;
    no_content_or_not_found(deleted, "student")
}

/// get_me
///
/// [Authenticated Route] The caller's own account.
#[utoipa::path(
    get,
    path = "/students/me",
    responses(
        (status = 200, description = "Profile", body = StudentResponse),
        (status = 404, description = "Account no longer exists")
    )
)]
pub async fn get_me(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<StudentResponse>, ApiError> {
    state
        .students()
        .me(&user)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("student not found".into()))
}
