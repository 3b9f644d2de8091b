use crate::{
    article_service::ArticleService,
    auth::AuthUser,
    auth_service::AuthService,
    error::ApiError,
    models::{
        Article, ArticlePayload, BatchReport, BatchUpdateRequest, LoginRequest, LoginResponse,
        RefreshRequest, RefreshResponse, User,
    },
    response::{ApiResponse, messages},
};
use axum::{
    Json,
    extract::{FromRequestParts, Path, State, rejection::JsonRejection},
    http::{StatusCode, request::Parts},
};

type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

/// ArticleId
///
/// The `{id}` segment of an article route. A segment that is not an integer cannot
/// name any article, so it is rejected with the usual 404 envelope.
pub struct ArticleId(pub i64);

impl<S> FromRequestParts<S> for ArticleId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<i64>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(ArticleId(id)),
            Err(rejection) => {
                tracing::debug!("unusable article id in path: {}", rejection.body_text());
                Err(ApiError::NotFound(messages::ARTICLE_NOT_FOUND.to_string()))
            }
        }
    }
}

// --- Auth Handlers ---

/// login
///
/// [Public Route] Exchanges a login/password pair for an access token and a refresh token.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Connexion réussie", body = LoginResponse),
        (status = 401, description = "Les identifiants sont incorrects"),
        (status = 422, description = "Champs manquants")
    )
)]
pub async fn login(
    State(auth): State<AuthService>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(payload) = payload?;
    let session = auth.login(payload).await?;
    Ok(ApiResponse::ok(session, messages::LOGIN_SUCCESS))
}

/// refresh
///
/// [Public Route] Rotates the refresh token and revokes every previous access token.
#[utoipa::path(
    post,
    path = "/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token rafraîchi avec succès", body = RefreshResponse),
        (status = 401, description = "Refresh token invalide")
    )
)]
pub async fn refresh(
    State(auth): State<AuthService>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<RefreshResponse> {
    let Json(payload) = payload?;
    let tokens = auth.refresh(payload).await?;
    Ok(ApiResponse::ok(tokens, messages::TOKEN_REFRESHED))
}

/// logout
///
/// [Authenticated Route] Revokes the presented access token only.
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Déconnexion réussie"),
        (status = 401, description = "Non authentifié")
    )
)]
pub async fn logout(auth_user: AuthUser, State(auth): State<AuthService>) -> ApiResult<()> {
    auth.logout(&auth_user).await?;
    Ok(ApiResponse::empty(messages::LOGOUT_SUCCESS))
}

/// current_user
///
/// [Authenticated Route] Returns the user behind the presented token.
#[utoipa::path(
    get,
    path = "/user",
    responses((status = 200, description = "Utilisateur authentifié", body = User))
)]
pub async fn current_user(auth_user: AuthUser, State(auth): State<AuthService>) -> ApiResult<User> {
    Ok(ApiResponse::ok(
        auth.current_user(auth_user),
        messages::CURRENT_USER,
    ))
}

// --- Article Handlers ---

/// list_articles
///
/// [Authenticated Route] Lists every article that is not in the trash.
#[utoipa::path(
    get,
    path = "/v1/articles",
    responses((status = 200, description = "Articles récupérés avec succès", body = [Article]))
)]
pub async fn list_articles(State(articles): State<ArticleService>) -> ApiResult<Vec<Article>> {
    Ok(ApiResponse::ok(
        articles.list().await?,
        messages::ARTICLES_LISTED,
    ))
}

/// create_article
///
/// [Authenticated Route] Creates an article. `stock` is the initial quantity.
#[utoipa::path(
    post,
    path = "/v1/articles",
    request_body = ArticlePayload,
    responses(
        (status = 201, description = "Article créé avec succès", body = Article),
        (status = 422, description = "Données invalides")
    )
)]
pub async fn create_article(
    State(articles): State<ArticleService>,
    payload: Result<Json<ArticlePayload>, JsonRejection>,
) -> ApiResult<Article> {
    let Json(payload) = payload?;
    let article = articles.create(payload).await?;
    Ok(ApiResponse::created(article, messages::ARTICLE_CREATED))
}

/// get_article
///
/// [Authenticated Route] Fetches one active article.
#[utoipa::path(
    get,
    path = "/v1/articles/{id}",
    params(("id" = i64, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Article récupéré avec succès", body = Article),
        (status = 404, description = "Article introuvable")
    )
)]
pub async fn get_article(
    State(articles): State<ArticleService>,
    ArticleId(id): ArticleId,
) -> ApiResult<Article> {
    Ok(ApiResponse::ok(
        articles.get(id).await?,
        messages::ARTICLE_FETCHED,
    ))
}

/// update_article
///
/// [Authenticated Route] Partial update. `stock` is a delta added to the current stock.
#[utoipa::path(
    put,
    path = "/v1/articles/{id}",
    params(("id" = i64, Path, description = "Article ID")),
    request_body = ArticlePayload,
    responses(
        (status = 200, description = "Article mis à jour avec succès", body = Article),
        (status = 404, description = "Article introuvable"),
        (status = 422, description = "Données invalides")
    )
)]
pub async fn update_article(
    State(articles): State<ArticleService>,
    ArticleId(id): ArticleId,
    payload: Result<Json<ArticlePayload>, JsonRejection>,
) -> ApiResult<Article> {
    let Json(payload) = payload?;
    let article = articles.update(id, payload).await?;
    Ok(ApiResponse::ok(article, messages::ARTICLE_UPDATED))
}

/// delete_article
///
/// [Authenticated Route] Moves an article to the trash.
#[utoipa::path(
    delete,
    path = "/v1/articles/{id}",
    params(("id" = i64, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Article supprimé avec succès"),
        (status = 404, description = "Article introuvable")
    )
)]
pub async fn delete_article(
    State(articles): State<ArticleService>,
    ArticleId(id): ArticleId,
) -> ApiResult<()> {
    articles.delete(id).await?;
    Ok(ApiResponse::empty(messages::ARTICLE_DELETED))
}

/// list_trashed_articles
///
/// [Authenticated Route] Lists the trash.
#[utoipa::path(
    get,
    path = "/v1/articles/trashed",
    responses((status = 200, description = "Articles supprimés récupérés avec succès", body = [Article]))
)]
pub async fn list_trashed_articles(
    State(articles): State<ArticleService>,
) -> ApiResult<Vec<Article>> {
    Ok(ApiResponse::ok(
        articles.list_trashed().await?,
        messages::TRASHED_LISTED,
    ))
}

/// restore_article
///
/// [Authenticated Route] Takes an article out of the trash.
#[utoipa::path(
    patch,
    path = "/v1/articles/{id}/restore",
    params(("id" = i64, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Article restauré avec succès", body = Article),
        (status = 400, description = "Cet article n'est pas dans la corbeille"),
        (status = 404, description = "Article introuvable")
    )
)]
pub async fn restore_article(
    State(articles): State<ArticleService>,
    ArticleId(id): ArticleId,
) -> ApiResult<Article> {
    Ok(ApiResponse::ok(
        articles.restore(id).await?,
        messages::ARTICLE_RESTORED,
    ))
}

/// force_delete_article
///
/// [Authenticated Route] Permanently removes an article that is already in the trash.
#[utoipa::path(
    delete,
    path = "/v1/articles/{id}/force-delete",
    params(("id" = i64, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Article supprimé définitivement"),
        (status = 400, description = "L'article n'est pas dans la corbeille"),
        (status = 404, description = "Article introuvable")
    )
)]
pub async fn force_delete_article(
    State(articles): State<ArticleService>,
    ArticleId(id): ArticleId,
) -> ApiResult<()> {
    articles.force_delete(id).await?;
    Ok(ApiResponse::empty(messages::ARTICLE_FORCE_DELETED))
}

/// update_stock
///
/// [Authenticated Route] Batch update. The body is `{ "articles": [...] }` or a bare
/// array of `{ id, name?, price?, stock? }` items, `stock` being a delta. Valid items
/// are committed together; the envelope is ECHEC/422 as soon as one item failed.
#[utoipa::path(
    post,
    path = "/v1/articles/stock",
    request_body(
        content = Vec<ArticlePayload>,
        description = "Tableau d'articles `{ id, name?, price?, stock? }`, nu ou sous la clé `articles`"
    ),
    responses(
        (status = 200, description = "Toutes les mises à jour ont réussi", body = BatchReport),
        (status = 422, description = "Certaines mises à jour ont échoué", body = BatchReport),
        (status = 500, description = "Erreur lors de la mise à jour multiple")
    )
)]
pub async fn update_stock(
    State(articles): State<ArticleService>,
    payload: Result<Json<BatchUpdateRequest>, JsonRejection>,
) -> ApiResult<BatchReport> {
    let items = match payload {
        Ok(Json(request)) => request.into_items(),
        // Anything that is neither an object nor an array counts as "no articles".
        Err(JsonRejection::JsonDataError(_)) => Vec::new(),
        Err(rejection) => return Err(rejection.into()),
    };

    let report = articles.update_multiple(items).await?;

    if report.has_failures() {
        Ok(ApiResponse::failure(
            Some(report),
            messages::BATCH_PARTIAL,
            StatusCode::UNPROCESSABLE_ENTITY,
        ))
    } else {
        Ok(ApiResponse::ok(report, messages::BATCH_SUCCESS))
    }
}
