use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Outcome marker carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum ResponseStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "ECHEC")]
    Echec,
}

/// ApiResponse
///
/// The uniform JSON envelope returned by every endpoint:
/// `{ status, data, message, httpStatusCode }`. The HTTP status of the response
/// always matches `httpStatusCode`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    pub data: Option<T>,
    pub message: String,
    pub http_status_code: u16,
}

impl<T> ApiResponse<T> {
    pub fn new(
        status: ResponseStatus,
        data: Option<T>,
        message: impl Into<String>,
        code: StatusCode,
    ) -> Self {
        Self {
            status,
            data,
            message: message.into(),
            http_status_code: code.as_u16(),
        }
    }

    /// 200 with a payload.
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(ResponseStatus::Success, Some(data), message, StatusCode::OK)
    }

    /// 201 with the created resource.
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(
            ResponseStatus::Success,
            Some(data),
            message,
            StatusCode::CREATED,
        )
    }

    /// 200 with `data: null`.
    pub fn empty(message: impl Into<String>) -> Self {
        Self::new(ResponseStatus::Success, None, message, StatusCode::OK)
    }

    pub fn failure(data: Option<T>, message: impl Into<String>, code: StatusCode) -> Self {
        Self::new(ResponseStatus::Echec, data, message, code)
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.http_status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

/// User-facing messages, one per operation and outcome. Clients match on these
/// strings, so they are part of the contract.
pub mod messages {
    pub const ARTICLES_LISTED: &str = "Articles récupérés avec succès";
    pub const ARTICLE_REQUIRED: &str = "Au moins un article est requis";
    pub const ARTICLE_CREATED: &str = "Article créé avec succès";
    pub const ARTICLE_FETCHED: &str = "Article récupéré avec succès";
    pub const ARTICLE_FIELD_REQUIRED: &str =
        "Au moins un champ d'article est requis pour la mise à jour";
    pub const ARTICLE_UPDATED: &str = "Article mis à jour avec succès";
    pub const ARTICLE_DELETED: &str = "Article supprimé avec succès";
    pub const TRASHED_LISTED: &str = "Articles supprimés récupérés avec succès";
    pub const NOT_IN_TRASH: &str = "Cet article n'est pas dans la corbeille";
    pub const ARTICLE_RESTORED: &str = "Article restauré avec succès";
    pub const FORCE_DELETE_NOT_IN_TRASH: &str =
        "Vous ne pouvez pas supprimer définitivement un article qui n'est pas dans la corbeille";
    pub const ARTICLE_FORCE_DELETED: &str = "Article supprimé définitivement";
    pub const ARTICLE_NOT_FOUND: &str = "Article introuvable";

    pub const BATCH_REQUIRED: &str = "Au moins un article est requis pour la mise à jour multiple";
    pub const BATCH_PARTIAL: &str =
        "Certaines mises à jour ont échoué, mais les articles valides ont été mis à jour";
    pub const BATCH_SUCCESS: &str = "Toutes les mises à jour ont réussi";
    pub const BATCH_ERROR_PREFIX: &str = "Erreur lors de la mise à jour multiple : ";
    pub const BATCH_ID_MISSING: &str = "L'ID de l'article est manquant";
    pub const BATCH_NEGATIVE_STOCK: &str = "Le stock ne peut pas être négatif";

    pub const STOCK_OVERFLOW: &str = "Le stock dépasse la capacité autorisée";
    pub const INVALID_DATA: &str = "Les données fournies sont invalides";

    pub const BAD_CREDENTIALS: &str = "Les identifiants sont incorrects";
    pub const LOGIN_SUCCESS: &str = "Connexion réussie";
    pub const INVALID_REFRESH_TOKEN: &str = "Refresh token invalide";
    pub const TOKEN_REFRESHED: &str = "Token rafraîchi avec succès";
    pub const LOGOUT_SUCCESS: &str = "Déconnexion réussie";
    pub const CURRENT_USER: &str = "Utilisateur authentifié";
    pub const UNAUTHENTICATED: &str = "Non authentifié";

    pub const INTERNAL_ERROR: &str = "Erreur interne du serveur";

    /// "Article avec l'ID {id} introuvable"
    pub fn batch_article_not_found(id: impl std::fmt::Display) -> String {
        format!("Article avec l'ID {id} introuvable")
    }
}
