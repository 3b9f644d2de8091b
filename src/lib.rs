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
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod article_service;
pub mod auth;
pub mod auth_service;
pub mod config;
pub mod error;
pub mod handlers;
pub mod in_memory;
pub mod models;
pub mod repository;
pub mod response;
pub mod validation;

pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use in_memory::InMemoryRepository;
pub use repository::{PostgresRepository, RepositoryState};
pub use response::{ApiResponse, ResponseStatus};

/// ApiDoc
///
/// OpenAPI document aggregated from the `#[utoipa::path]` handlers and the
/// `ToSchema` models. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::refresh, handlers::logout, handlers::current_user,
        handlers::list_articles, handlers::create_article, handlers::get_article,
        handlers::update_article, handlers::delete_article, handlers::list_trashed_articles,
        handlers::restore_article, handlers::force_delete_article, handlers::update_stock
    ),
    components(
        schemas(
            models::Article, models::ArticlePayload, models::User, models::LoginRequest,
            models::RefreshRequest, models::LoginResponse, models::RefreshResponse,
            models::TokenDescriptor, models::BatchReport, models::FailedUpdate,
            response::ResponseStatus,
        )
    ),
    tags(
        (name = "boutique", description = "Gestion de stock et authentification")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single, cloneable container shared by every request: the store and the
/// immutable configuration. Services are built from it through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated routes. Extracting `AuthUser` rejects the request with a
/// 401 envelope before the handler runs when the bearer token is missing, invalid or
/// revoked.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// Header carrying the per-request correlation id, generated when absent.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// create_router
///
/// Assembles the shop API:
/// - `/swagger-ui` and `/api-docs/openapi.json` (documentation);
/// - the public group (health, login, refresh);
/// - the bearer-protected group (logout, current user, `/v1/articles…`).
///
/// Every response, including 401 rejections from the auth layer, passes through the
/// correlation and tracing stack, so each log line of a request carries its id.
pub fn create_router(state: AppState) -> Router {
    // 1. Routes. Auth is a `route_layer`, so unknown paths still 404 instead of 401.
    let protected = authenticated::authenticated_routes().route_layer(
        middleware::from_fn_with_state(state.clone(), auth_middleware),
    );

    let routes = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(protected)
        .with_state(state);

    // 2. Correlation + tracing. Outermost first: the id is set before the span opens
    // and copied onto the response on the way out.
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let observability = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace_span_logger)
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(tower_http::LatencyUnit::Millis),
                ),
        )
        .layer(PropagateRequestIdLayer::new(request_id));

    // 3. CORS: any origin, method and header.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    routes.layer(observability).layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: one `http_request` span per request with the
/// method, the path and the correlation id (`unknown` if the header is unreadable).
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}
