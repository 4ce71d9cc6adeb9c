use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::errors::ErrorKind;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    models::Role,
    repository::RepositoryState,
    token::TokenIssuer,
};

/// Header accepted in `Env::Local` to act as a known identity without a token.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// AuthUser
///
/// The resolved identity of an authenticated request. Workflows receive it as the
/// caller context and run their capability checks against `roles`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub roles: Vec<Role>,
}

impl AuthUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Capability check: the caller must hold at least one of `allowed`.
    pub fn require_any_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.iter().any(|role| self.has_role(*role)) {
            Ok(())
        } else {
            tracing::debug!(caller = %self.id, ?allowed, "role check failed");
            Err(ApiError::Forbidden)
        }
    }

    /// Capability check for per-student resources: Admins pass, everyone else only for themself.
    pub fn require_self_or_admin(&self, student_id: Uuid) -> Result<(), ApiError> {
        if self.is_admin() || self.id == student_id {
            Ok(())
        } else {
            tracing::debug!(caller = %self.id, target = %student_id, "ownership check failed");
            Err(ApiError::Forbidden)
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Resolves the current identity of a request:
/// 1. Local bypass: in `Env::Local` an `x-user-id` header naming a live identity is accepted.
/// 2. Bearer token: the `Authorization` header is verified by the `TokenIssuer`
///    (signature, expiry, issuer, audience) and the claims become the identity.
///
/// Rejection: `ApiError::Unauthorized` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
    TokenIssuer: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(user) = dev_bypass(parts, &RepositoryState::from_ref(state)).await {
                return Ok(user);
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let claims = TokenIssuer::from_ref(state).verify(token).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("expired bearer token"),
                other => tracing::debug!(kind = ?other, "rejected bearer token"),
            }
            ApiError::Unauthorized
        })?;

        Ok(AuthUser {
            id: claims.sub,
            username: claims.username,
            email: claims.email,
            roles: claims.roles,
        })
    }
}

/// Looks up the identity named by the dev header. Falls through (returns `None`) on a
/// missing or malformed header, or when the identity is unknown or no longer live.
async fn dev_bypass(parts: &Parts, repo: &RepositoryState) -> Option<AuthUser> {
    let raw = parts.headers.get(DEV_USER_HEADER)?.to_str().ok()?;
    let id = Uuid::parse_str(raw).ok()?;

    match repo.find_identity(id).await {
        Ok(Some(identity)) if identity.is_live() => Some(AuthUser {
            id: identity.id,
            username: identity.username,
            email: identity.email,
            roles: identity.roles,
        }),
        Ok(_) => None,
        Err(e) => {
            tracing::error!(error = %e, "dev bypass lookup failed");
            None
        }
    }
}
