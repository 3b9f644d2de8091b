use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a bearer token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /login
        // Exchanges credentials for an access token and a refresh token.
        .route("/login", post(handlers::login))
        // POST /refresh
        // Rotates the refresh token; all earlier access tokens are revoked.
        .route("/refresh", post(handlers::refresh))
}
