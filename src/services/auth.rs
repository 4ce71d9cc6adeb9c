use crate::{
    error::ApiError,
    models::{
        Identity, LoginRequest, LoginResponse, MessageResponse, NewIdentity, RegisterRequest,
        Role,
    },
    password::{hash_password, verify_password},
    repository::RepositoryState,
    token::TokenIssuer,
    validation::FieldErrors,
};

/// AuthService
///
/// Self-registration, credential verification and token issuance.
#[derive(Clone)]
pub struct AuthService {
    repo: RepositoryState,
    tokens: TokenIssuer,
    assign_student_role: bool,
}

impl AuthService {
    pub fn new(repo: RepositoryState, tokens: TokenIssuer, assign_student_role: bool) -> Self {
        Self {
            repo,
            tokens,
            assign_student_role,
        }
    }

    /// Creates an active identity.
    ///
    /// A taken email is a conflict (409). Every other problem, a taken username
    /// included, is collected into one validation failure (400).
    pub async fn register(&self, req: RegisterRequest) -> Result<MessageResponse, ApiError> {
        let username = req.username.trim();
        let email = req.email.trim();
        let full_name = req.full_name.trim();

        if !email.is_empty() && self.repo.email_taken(email).await? {
            return Err(ApiError::Conflict("email already registered".into()));
        }

        let mut errors = FieldErrors::new();
        errors.check_length("username", username, 3, 256);
        errors.check_email(email);
        errors.check_length("full name", full_name, 3, 200);
        errors.check_password(&req.password);
        if !username.is_empty() && self.repo.username_taken(username).await? {
            errors.push(format!("username '{username}' is already taken"));
        }
        errors.into_result()?;

        let roles = if self.assign_student_role {
            vec![Role::Student]
        } else {
            Vec::new()
        };

        let identity = self
            .repo
            .insert_identity(NewIdentity {
                username: username.to_string(),
                email: email.to_string(),
                password_hash: hash_password(&req.password)?,
                full_name: full_name.to_string(),
                roles,
            })
            .await?;

        tracing::info!(identity = %identity.id, "identity registered");
        Ok(MessageResponse {
            message: "registration successful".into(),
        })
    }

    /// Returns the identity when the username names a live account and the password matches.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>, ApiError> {
        let Some(identity) = self
            .repo
            .find_live_identity_by_username(username.trim())
            .await?
        else {
            return Ok(None);
        };

        if !identity.is_live() {
            return Ok(None);
        }

        if verify_password(password, &identity.password_hash)? {
            Ok(Some(identity))
        } else {
            Ok(None)
        }
    }

    /// `None` when the credentials do not verify; the handler turns that into a 401.
    pub async fn login(&self, req: LoginRequest) -> Result<Option<LoginResponse>, ApiError> {
        let Some(identity) = self.verify_credentials(&req.username, &req.password).await? else {
            tracing::debug!(username = %req.username, "login rejected");
            return Ok(None);
        };

        let issued = self.tokens.issue(&identity, &identity.roles)?;
        tracing::info!(identity = %identity.id, "token issued");

        Ok(Some(LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
        }))
    }
}
