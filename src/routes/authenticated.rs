use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

/// Authenticated Router Module
///
/// Every route here relies on the bearer-token layer applied in `create_router`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /logout
        // Revokes the presented token only; other sessions stay valid.
        .route("/logout", post(handlers::logout))
        // GET /user
        // The authenticated user's record.
        .route("/user", get(handlers::current_user))
        .nest("/v1", v1_routes())
}

/// Versioned resource routes.
fn v1_routes() -> Router<AppState> {
    Router::new()
        // GET|POST /v1/articles
        .route(
            "/articles",
            get(handlers::list_articles).post(handlers::create_article),
        )
        // GET /v1/articles/trashed
        // Static segments win over `{id}`, so this never reaches `get_article`.
        .route("/articles/trashed", get(handlers::list_trashed_articles))
        // POST /v1/articles/stock
        // Batch stock update, committed atomically for the valid items.
        .route("/articles/stock", post(handlers::update_stock))
        // GET|PUT|PATCH|DELETE /v1/articles/{id}
        .route(
            "/articles/{id}",
            get(handlers::get_article)
                .put(handlers::update_article)
                .patch(handlers::update_article)
                .delete(handlers::delete_article),
        )
        // PATCH /v1/articles/{id}/restore
        .route("/articles/{id}/restore", patch(handlers::restore_article))
        // DELETE /v1/articles/{id}/force-delete
        .route(
            "/articles/{id}/force-delete",
            delete(handlers::force_delete_article),
        )
}
