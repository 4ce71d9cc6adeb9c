use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{CreateEnrollmentRequest, EnrollmentQuery, EnrollmentResponse, Page, Role},
    repository::RepositoryState,
    validation::check_page,
};

/// EnrollmentService
///
/// Enrollment lifecycle: `Active -> Cancelled`, cancellation being terminal.
#[derive(Clone)]
pub struct EnrollmentService {
    repo: RepositoryState,
}

impl EnrollmentService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// Admins enroll the requested student; every other caller enrolls themself.
    ///
    /// Checks run in a fixed order: student id present (400), student live (422),
    /// course live (422), no live enrollment for the pair (409).
    pub async fn enroll(
        &self,
        caller: &AuthUser,
        req: CreateEnrollmentRequest,
    ) -> Result<EnrollmentResponse, ApiError> {
        let student_id = if caller.is_admin() {
            req.student_id
        } else {
            Some(caller.id)
        };
        let student_id = student_id.ok_or_else(|| ApiError::validation("invalid student"))?;

        match self.repo.find_identity(student_id).await? {
            Some(student) if student.is_live() => {}
            _ => {
                return Err(ApiError::BusinessRule(
                    "student not found or inactive".into(),
                ));
            }
        }

        let course = self
            .repo
            .get_course(req.course_id)
            .await?
            .ok_or_else(|| ApiError::BusinessRule("course not found".into()))?;

        if self.repo.enrollment_exists(student_id, course.id).await? {
            return Err(ApiError::Conflict("already enrolled".into()));
        }

        // A concurrent enroll that wins the race surfaces here as a unique violation (409).
        let enrollment = self.repo.insert_enrollment(student_id, course.id).await?;
        tracing::info!(
            enrollment = %enrollment.id,
            student = %student_id,
            course = %course.id,
            "student enrolled"
        );

        Ok(EnrollmentResponse::from_parts(enrollment, course.title))
    }

    pub async fn list_by_student(
        &self,
        caller: &AuthUser,
        student_id: Uuid,
        query: &EnrollmentQuery,
    ) -> Result<Page<EnrollmentResponse>, ApiError> {
        caller.require_self_or_admin(student_id)?;
        check_page(query.page, query.page_size)?;

        let (data, total) = self.repo.list_enrollments(student_id, query).await?;
        Ok(Page {
            page: query.page,
            page_size: query.page_size,
            total,
            data,
        })
    }

    /// `false` when the enrollment is missing or already cancelled.
    pub async fn cancel(&self, caller: &AuthUser, id: Uuid) -> Result<bool, ApiError> {
        caller.require_any_role(&[Role::Admin])?;
        let cancelled = self.repo.cancel_enrollment(id).await?;
        if cancelled {
            tracing::info!(enrollment = %id, caller = %caller.id, "enrollment cancelled");
        }
        Ok(cancelled)
    }
}
