use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{CreateStudentRequest, NewIdentity, Role, StudentResponse, UpdateStudentRequest},
    password::hash_password,
    repository::RepositoryState,
    validation::FieldErrors,
};

/// StudentService
///
/// Account administration. Reads and name updates are open to the account itself;
/// everything else is Admin only.
#[derive(Clone)]
pub struct StudentService {
    repo: RepositoryState,
}

impl StudentService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// Creates a Student account whose username is its email.
    pub async fn create(
        &self,
        caller: &AuthUser,
        req: CreateStudentRequest,
    ) -> Result<StudentResponse, ApiError> {
        caller.require_any_role(&[Role::Admin])?;

        let email = req.email.trim();
        let full_name = req.full_name.trim();

        let mut errors = FieldErrors::new();
        errors.check_email(email);
        errors.check_length("full name", full_name, 3, 200);
        errors.check_password(&req.password);
        errors.into_result()?;

        if self.repo.email_taken(email).await? || self.repo.username_taken(email).await? {
            return Err(ApiError::Conflict("email already registered".into()));
        }

        let identity = self
            .repo
            .insert_identity(NewIdentity {
                username: email.to_string(),
                email: email.to_string(),
                password_hash: hash_password(&req.password)?,
                full_name: full_name.to_string(),
                roles: vec![Role::Student],
            })
            .await?;

        tracing::info!(student = %identity.id, caller = %caller.id, "student created");
        Ok(identity.into())
    }

    pub async fn list_all(&self, caller: &AuthUser) -> Result<Vec<StudentResponse>, ApiError> {
        caller.require_any_role(&[Role::Admin])?;
        let identities = self.repo.list_live_identities().await?;
        Ok(identities.into_iter().map(StudentResponse::from).collect())
    }

    pub async fn get(
        &self,
        caller: &AuthUser,
        id: Uuid,
    ) -> Result<Option<StudentResponse>, ApiError> {
        caller.require_self_or_admin(id)?;
        Ok(self.repo.get_live_identity(id).await?.map(StudentResponse::from))
    }

    /// Only the full name is mutable. `false` when the account is missing or deleted.
    pub async fn update(
        &self,
        caller: &AuthUser,
        id: Uuid,
        req: UpdateStudentRequest,
    ) -> Result<bool, ApiError> {
        caller.require_self_or_admin(id)?;

        let full_name = req.full_name.trim();
        let mut errors = FieldErrors::new();
        errors.check_length("full name", full_name, 3, 200);
        errors.into_result()?;

        Ok(self.repo.update_identity_name(id, full_name).await?)
    }

    /// Soft delete: the account is flagged deleted and deactivated in one write.
    pub async fn delete(&self, caller: &AuthUser, id: Uuid) -> Result<bool, ApiError> {
        caller.require_any_role(&[Role::Admin])?;
        let deleted = self.repo.soft_delete_identity(id).await?;
        if deleted {
            tracing::info!(student = %id, caller = %caller.id, "student soft-deleted");
        }
        Ok(deleted)
    }

    pub async fn me(&self, caller: &AuthUser) -> Result<Option<StudentResponse>, ApiError> {
        Ok(self
            .repo
            .get_live_identity(caller.id)
            .await?
            .map(StudentResponse::from))
    }
}
