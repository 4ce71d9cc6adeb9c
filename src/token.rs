use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    models::{Identity, Role},
};

/// Lifetime of every issued token. Tokens are not revocable before this elapses.
pub const TOKEN_TTL_HOURS: i64 = 2;

/// Claims
///
/// Payload signed into every bearer token. The token is self-contained: the identity
/// and its roles are read straight from these claims on each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the identity id.
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    /// One entry per role held at issuance time.
    pub roles: Vec<Role>,
    pub iss: String,
    pub aud: String,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
}

/// IssuedToken
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// TokenIssuer
///
/// Signs and verifies HS256 bearer tokens with the configured secret, issuer and audience.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, issuer: &str, audience: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, &config.jwt_issuer, &config.jwt_audience)
    }

    /// Issues a token for `identity` carrying `roles`, valid for two hours from now.
    pub fn issue(&self, identity: &Identity, roles: &[Role]) -> anyhow::Result<IssuedToken> {
        self.issue_at(identity, roles, Utc::now())
    }

    /// Same as [`issue`](Self::issue) with an explicit issuance instant.
    pub fn issue_at(
        &self,
        identity: &Identity,
        roles: &[Role],
        issued_at: DateTime<Utc>,
    ) -> anyhow::Result<IssuedToken> {
        let expires_at = issued_at + Duration::hours(TOKEN_TTL_HOURS);
        let claims = Claims {
            sub: identity.id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            roles: roles.to_vec(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: issued_at.timestamp().max(0) as usize,
            exp: expires_at.timestamp().max(0) as usize,
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| anyhow::anyhow!("token signing failed: {e}"))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Validates signature, expiry (no leeway), issuer and audience.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}
