use std::collections::HashMap;

use axum::extract::FromRef;
use serde_json::Value;

use crate::{
    AppState,
    error::ApiError,
    models::{Article, ArticleChanges, ArticlePayload, BatchReport, FailedUpdate},
    repository::RepositoryState,
    response::messages,
    validation::{first_message, validate_article_changes, validate_new_article},
};

/// ArticleService
///
/// Article lifecycle: CRUD over the default (active) scope, trash management and the
/// batch stock update.
#[derive(Clone)]
pub struct ArticleService {
    repo: RepositoryState,
}

impl FromRef<AppState> for ArticleService {
    fn from_ref(app_state: &AppState) -> ArticleService {
        ArticleService::new(app_state.repo.clone())
    }
}

impl ArticleService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<Article>, ApiError> {
        Ok(self.repo.list_articles().await?)
    }

    pub async fn create(&self, payload: ArticlePayload) -> Result<Article, ApiError> {
        let new_article = validate_new_article(payload)?;
        let article = self.repo.create_article(new_article).await?;
        tracing::info!(article_id = article.id, "article created");
        Ok(article)
    }

    pub async fn get(&self, id: i64) -> Result<Article, ApiError> {
        self.repo
            .find_article(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(messages::ARTICLE_NOT_FOUND.to_string()))
    }

    /// update
    ///
    /// `stock` is added to the current stock. The result is not checked for
    /// negativity here, unlike the batch path.
    pub async fn update(&self, id: i64, payload: ArticlePayload) -> Result<Article, ApiError> {
        let mut article = self.get(id).await?;
        let changes = validate_article_changes(payload)?;

        article
            .apply(&changes)
            .ok_or_else(|| ApiError::validation(messages::STOCK_OVERFLOW))?;

        Ok(self.repo.update_article(&article).await?)
    }

    /// Soft delete. Articles already in the trash are outside the default scope (404).
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        if self.repo.soft_delete_article(id).await? {
            tracing::info!(article_id = id, "article moved to trash");
            Ok(())
        } else {
            Err(ApiError::NotFound(messages::ARTICLE_NOT_FOUND.to_string()))
        }
    }

    pub async fn list_trashed(&self) -> Result<Vec<Article>, ApiError> {
        Ok(self.repo.list_trashed_articles().await?)
    }

    async fn find_trashed(&self, id: i64, not_trashed_message: &str) -> Result<Article, ApiError> {
        let article = self
            .repo
            .find_article_with_trashed(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(messages::ARTICLE_NOT_FOUND.to_string()))?;

        if !article.is_trashed() {
            return Err(ApiError::InvalidState(not_trashed_message.to_string()));
        }
        Ok(article)
    }

    pub async fn restore(&self, id: i64) -> Result<Article, ApiError> {
        self.find_trashed(id, messages::NOT_IN_TRASH).await?;

        let restored = self
            .repo
            .restore_article(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(messages::ARTICLE_NOT_FOUND.to_string()))?;
        tracing::info!(article_id = id, "article restored");
        Ok(restored)
    }

    pub async fn force_delete(&self, id: i64) -> Result<(), ApiError> {
        self.find_trashed(id, messages::FORCE_DELETE_NOT_IN_TRASH)
            .await?;

        if !self.repo.force_delete_article(id).await? {
            return Err(ApiError::NotFound(messages::ARTICLE_NOT_FOUND.to_string()));
        }
        tracing::info!(article_id = id, "article permanently deleted");
        Ok(())
    }

    /// update_multiple
    ///
    /// Two phases:
    /// 1. Every item is checked on its own against a working copy of its article.
    ///    Nothing is written; a rejected item becomes a `FailedUpdate` and never
    ///    aborts its siblings.
    /// 2. Every touched article is written in one atomic store call. A store error
    ///    here rolls everything back and surfaces as a 500.
    ///
    /// Items targeting the same id accumulate on the same working copy.
    pub async fn update_multiple(&self, items: Vec<Value>) -> Result<BatchReport, ApiError> {
        if items.is_empty() {
            return Err(ApiError::validation(messages::BATCH_REQUIRED));
        }

        let mut working: HashMap<i64, Article> = HashMap::new();
        let mut touched: Vec<i64> = Vec::new();
        let mut report = BatchReport::default();

        for item in items {
            match self.stage_item(&item, &mut working).await {
                Ok(staged) => {
                    if !touched.contains(&staged.id) {
                        touched.push(staged.id);
                    }
                    report.updated_articles.push(staged);
                }
                Err(error_message) => report.failed_updates.push(FailedUpdate {
                    article_data: item,
                    error_message,
                }),
            }
        }

        let to_save: Vec<Article> = touched
            .iter()
            .filter_map(|id| working.get(id).cloned())
            .collect();

        if !to_save.is_empty() {
            let saved = self.repo.update_articles(&to_save).await.map_err(|e| {
                tracing::error!("batch stock update rolled back: {}", e);
                ApiError::Internal(format!("{}{}", messages::BATCH_ERROR_PREFIX, e))
            })?;

            // Carry the store's timestamps over to every reported snapshot.
            let stamps: HashMap<i64, _> = saved.iter().map(|a| (a.id, a.updated_at)).collect();
            for article in &mut report.updated_articles {
                if let Some(updated_at) = stamps.get(&article.id) {
                    article.updated_at = *updated_at;
                }
            }
        }

        tracing::info!(
            updated = report.updated_articles.len(),
            failed = report.failed_updates.len(),
            "batch stock update committed"
        );
        Ok(report)
    }

    /// Validates one raw batch item and applies it to the working copy of its article.
    /// Returns the article state after this item, or the reason it was rejected.
    async fn stage_item(
        &self,
        item: &Value,
        working: &mut HashMap<i64, Article>,
    ) -> Result<Article, String> {
        let raw_id = match item.get("id") {
            Some(id) if !id.is_null() => id,
            _ => return Err(messages::BATCH_ID_MISSING.to_string()),
        };
        let id = article_id(raw_id)
            .ok_or_else(|| messages::batch_article_not_found(display_id(raw_id)))?;

        let current = match working.get(&id) {
            Some(article) => article.clone(),
            None => self
                .repo
                .find_article_with_trashed(id)
                .await
                .map_err(|e| {
                    tracing::error!("batch lookup of article {} failed: {}", id, e);
                    messages::INTERNAL_ERROR.to_string()
                })?
                .ok_or_else(|| messages::batch_article_not_found(id))?,
        };

        let payload: ArticlePayload = serde_json::from_value(item.clone())
            .map_err(|e| format!("{} : {}", messages::INVALID_DATA, e))?;
        let changes: ArticleChanges =
            validate_article_changes(payload).map_err(|e| first_message(&e))?;

        if let Some(delta) = changes.stock_delta {
            let new_stock = current
                .stock
                .checked_add(delta)
                .ok_or_else(|| messages::STOCK_OVERFLOW.to_string())?;
            if new_stock < 0 {
                return Err(messages::BATCH_NEGATIVE_STOCK.to_string());
            }
        }

        let mut staged = current;
        staged
            .apply(&changes)
            .ok_or_else(|| messages::STOCK_OVERFLOW.to_string())?;
        working.insert(id, staged.clone());
        Ok(staged)
    }
}

/// Reads a batch item id the way clients send it: a JSON integer, an integral float
/// (`1.0`) or a numeric string (`"1"`).
fn article_id(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Raw id as echoed in messages: strings without their JSON quotes.
fn display_id(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
