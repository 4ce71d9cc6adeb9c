use std::env;

/// Fallback signing secret for local runs. Never accepted in production.
pub const LOCAL_JWT_SECRET: &str = "local-dev-course-platform-signing-secret";

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup,
/// immutable afterwards, and pulled into handlers and extractors via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the dev auth bypass, log format and seeding.
    pub env: Env,
    // Postgres connection string. `None` (local only) selects the in-memory repository.
    pub db_url: Option<String>,
    // HMAC secret used to sign and verify bearer tokens.
    pub jwt_secret: String,
    // `iss` claim written into and required from every token.
    pub jwt_issuer: String,
    // `aud` claim written into and required from every token.
    pub jwt_audience: String,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Whether self-registration grants the `Student` role.
    pub register_assigns_student_role: bool,
    // Whether the demo Admin/Instructor/Student accounts are ensured at startup.
    pub seed_demo_accounts: bool,
}

/// Env
///
/// Defines the runtime context, used to switch between development utilities
/// (header bypass, in-memory storage, demo accounts) and hardened production settings.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking configuration for tests and in-process tooling.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            jwt_issuer: "course-platform".to_string(),
            jwt_audience: "course-platform-clients".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            register_assigns_student_role: true,
            seed_demo_accounts: false,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from environment variables (call `dotenv` first).
    ///
    /// # Panics
    /// Panics in production when `DATABASE_URL` or `JWT_SECRET` is missing, so the
    /// service never starts with an incomplete or insecure configuration.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let (db_url, jwt_secret) = match env {
            Env::Production => (
                Some(env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod")),
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production."),
            ),
            Env::Local => (
                env::var("DATABASE_URL").ok(),
                env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        let seed_default = env == Env::Local;

        Self {
            db_url,
            jwt_secret,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "course-platform".to_string()),
            jwt_audience: env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "course-platform-clients".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            register_assigns_student_role: flag("REGISTER_ASSIGNS_STUDENT_ROLE", true),
            seed_demo_accounts: flag("SEED_DEMO_ACCOUNTS", seed_default),
            env,
        }
    }
}

/// Reads a boolean switch; anything other than a recognised spelling keeps the default.
fn flag(name: &str, default: bool) -> bool {
    match env::var(name).map(|v| v.to_ascii_lowercase()).as_deref() {
        Ok("1" | "true" | "yes" | "on") => true,
        Ok("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
