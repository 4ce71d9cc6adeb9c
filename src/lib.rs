use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod etag;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;
pub mod seed;
pub mod services;
pub mod token;
pub mod validation;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiError, RepositoryError};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use services::{AuthService, CourseService, EnrollmentService, StudentService};
pub use token::TokenIssuer;

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::login,
        handlers::list_courses, handlers::get_course, handlers::create_course,
        handlers::update_course, handlers::delete_course,
        handlers::create_enrollment, handlers::list_student_enrollments,
        handlers::cancel_enrollment,
        handlers::create_student, handlers::list_students, handlers::get_student,
        handlers::update_student, handlers::delete_student, handlers::get_me
    ),
    components(
        schemas(
            models::Role, models::EnrollmentStatus, models::Course, models::CourseRequest,
            models::EnrollmentResponse, models::CreateEnrollmentRequest,
            models::StudentResponse, models::CreateStudentRequest, models::UpdateStudentRequest,
            models::RegisterRequest, models::LoginRequest, models::LoginResponse,
            models::MessageResponse,
        )
    ),
    tags(
        (name = "course-platform", description = "Course enrollment API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared container for the repository handle, token issuer and
/// configuration. Cloned per request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Signs and verifies bearer tokens.
    pub tokens: TokenIssuer,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            repo,
            tokens: TokenIssuer::from_config(&config),
            config,
        }
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(
            self.repo.clone(),
            self.tokens.clone(),
            self.config.register_assigns_student_role,
        )
    }

    pub fn courses(&self) -> CourseService {
        CourseService::new(self.repo.clone())
    }

    pub fn students(&self) -> StudentService {
        StudentService::new(self.repo.clone())
    }

    pub fn enrollments(&self) -> EnrollmentService {
        EnrollmentService::new(self.repo.clone())
    }
}

// --- Axum FromRef Extractor Implementations ---

// Lets the `AuthUser` extractor pull just the pieces it needs from the shared state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenIssuer {
    fn from_ref(app_state: &AppState) -> TokenIssuer {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 before any handler runs unless an `AuthUser`
/// can be resolved (bearer token, or the local dev header).
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the public, authenticated and admin routers, the Swagger UI and the
/// observability layers around them.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id))
                // Innermost, so a panicking handler still gets a request id and a trace line.
                .layer(CatchPanicLayer::custom(error::panic_response)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span carrying method, URI and the generated `x-request-id`,
/// so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
