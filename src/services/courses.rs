use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{Course, CourseQuery, CourseRequest, Page, Role},
    repository::RepositoryState,
    validation::{FieldErrors, check_page},
};

const COURSE_EDITORS: &[Role] = &[Role::Admin, Role::Instructor];

/// CourseService
///
/// Course catalogue management. Reads are public; writes are role-gated.
#[derive(Clone)]
pub struct CourseService {
    repo: RepositoryState,
}

/// Trims text fields and drops a blank description, then validates the result.
fn normalize(req: CourseRequest) -> Result<CourseRequest, ApiError> {
    let req = CourseRequest {
        title: req.title.trim().to_string(),
        description: req
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        category: req.category.trim().to_string(),
        workload: req.workload,
    };

    let mut errors = FieldErrors::new();
    errors.check_length("title", &req.title, 10, 200);
    errors.check_length("category", &req.category, 1, 100);
    if let Some(description) = &req.description {
        errors.check_max_length("description", description, 2000);
    }
    if req.workload <= 0 {
        errors.push("workload must be greater than 0");
    }
    errors.into_result()?;

    Ok(req)
}

impl CourseService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn create(&self, caller: &AuthUser, req: CourseRequest) -> Result<Course, ApiError> {
        caller.require_any_role(COURSE_EDITORS)?;
        let req = normalize(req)?;

        if self.repo.course_title_taken(&req.title, None).await? {
            return Err(ApiError::Conflict("course title already exists".into()));
        }

        let course = self.repo.insert_course(req).await?;
        tracing::info!(course = %course.id, caller = %caller.id, "course created");
        Ok(course)
    }

    pub async fn list(&self, query: &CourseQuery) -> Result<Page<Course>, ApiError> {
        check_page(query.page, query.page_size)?;
        let (data, total) = self.repo.list_courses(query).await?;
        Ok(Page {
            page: query.page,
            page_size: query.page_size,
            total,
            data,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Course>, ApiError> {
        Ok(self.repo.get_course(id).await?)
    }

    /// Full replacement. `false` when the course is missing or deleted.
    pub async fn update(
        &self,
        caller: &AuthUser,
        id: Uuid,
        req: CourseRequest,
    ) -> Result<bool, ApiError> {
        caller.require_any_role(COURSE_EDITORS)?;
        let req = normalize(req)?;

        if self.repo.get_course(id).await?.is_none() {
            return Ok(false);
        }
        if self.repo.course_title_taken(&req.title, Some(id)).await? {
            return Err(ApiError::Conflict("course title already exists".into()));
        }

        Ok(self.repo.update_course(id, req).await?)
    }

    pub async fn delete(&self, caller: &AuthUser, id: Uuid) -> Result<bool, ApiError> {
        caller.require_any_role(&[Role::Admin])?;
        let deleted = self.repo.soft_delete_course(id).await?;
        if deleted {
            tracing::info!(course = %id, caller = %caller.id, "course soft-deleted");
        }
        Ok(deleted)
    }
}
