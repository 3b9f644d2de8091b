use validator::{Validate, ValidationErrors};

use crate::{
    error::{ApiError, FieldErrors},
    models::{
        ArticleChanges, ArticlePayload, LoginRequest, NewArticle, NewArticleRequest,
        RefreshRequest,
    },
    response::messages,
};

/// Flattens `validator` output into the `{ field: [messages…] }` map carried by the
/// 422 envelope. Rules without an explicit message get a French one from their code.
fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut fields = FieldErrors::new();
    for (field, problems) in errors.field_errors() {
        let field = field.to_string();
        let rendered = problems
            .iter()
            .map(|problem| match &problem.message {
                Some(message) => message.to_string(),
                None if problem.code == "blank" => {
                    format!("Le champ {field} ne peut pas être vide.")
                }
                None => format!("Le champ {field} est invalide."),
            })
            .collect::<Vec<_>>();
        fields.entry(field).or_default().extend(rendered);
    }
    fields
}

fn check<T: Validate>(payload: &T) -> Result<(), ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::invalid_fields(field_errors(&e)))
}

/// validate_new_article
///
/// Rules for `POST /v1/articles`. An entirely empty payload is reported with its own
/// message before any field rule runs.
pub fn validate_new_article(payload: ArticlePayload) -> Result<NewArticle, ApiError> {
    if payload.is_empty() {
        return Err(ApiError::validation(messages::ARTICLE_REQUIRED));
    }

    let request = NewArticleRequest::from(payload);
    check(&request)?;

    match (request.name, request.price) {
        (Some(name), Some(price)) => Ok(NewArticle {
            name: name.trim().to_string(),
            price,
            stock: request.stock.unwrap_or(0),
        }),
        _ => Err(ApiError::validation(messages::INVALID_DATA)),
    }
}

/// validate_article_changes
///
/// Rules shared by `PUT|PATCH /v1/articles/{id}` and batch items. At least one field
/// must be present; `stock` is a signed delta.
pub fn validate_article_changes(payload: ArticlePayload) -> Result<ArticleChanges, ApiError> {
    if payload.is_empty() {
        return Err(ApiError::validation(messages::ARTICLE_FIELD_REQUIRED));
    }

    check(&payload)?;

    Ok(ArticleChanges {
        name: payload.name.map(|n| n.trim().to_string()),
        price: payload.price,
        stock_delta: payload.stock,
    })
}

/// Credentials extracted from a login body once both fields are present.
pub fn validate_login(payload: LoginRequest) -> Result<(String, String), ApiError> {
    check(&payload)?;

    match (payload.login, payload.password) {
        (Some(login), Some(password)) => Ok((login, password)),
        _ => Err(ApiError::validation(messages::INVALID_DATA)),
    }
}

pub fn validate_refresh_token(payload: RefreshRequest) -> Result<String, ApiError> {
    check(&payload)?;

    payload
        .refresh_token
        .ok_or_else(|| ApiError::validation(messages::INVALID_DATA))
}

/// First human-readable message carried by a validation error, used as the
/// `error_message` of a rejected batch item.
pub fn first_message(error: &ApiError) -> String {
    match error {
        ApiError::Validation {
            errors: Some(errors),
            message,
        } => errors
            .values()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| message.clone()),
        other => other.to_string(),
    }
}
