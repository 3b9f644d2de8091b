use crate::models::{
    Article, ArticleRow, NewArticle, NewUser, PersonalAccessToken, User,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// RepositoryError
///
/// Failures surfaced by a store. Services turn them into `ApiError::Repository`
/// (or into the batch-specific 500 message).
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A write targeted a row that disappeared between read and write.
    #[error("article {0} no longer exists")]
    RowNotFound(i64),

    /// The store refuses writes (used by the in-memory store to simulate outages).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence contract for articles, users and access tokens. Handlers and
/// services only ever see `Arc<dyn Repository>`, so Postgres and the in-memory store
/// are interchangeable.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Articles: default scope (active only) ---
    async fn list_articles(&self) -> RepoResult<Vec<Article>>;
    async fn find_article(&self, id: i64) -> RepoResult<Option<Article>>;

    // --- Articles: trash ---
    async fn list_trashed_articles(&self) -> RepoResult<Vec<Article>>;
    // Ignores the soft-delete scope.
    async fn find_article_with_trashed(&self, id: i64) -> RepoResult<Option<Article>>;

    // --- Articles: writes ---
    async fn create_article(&self, article: NewArticle) -> RepoResult<Article>;
    // Persists name/price/stock of `article`; never touches `deleted_at`.
    async fn update_article(&self, article: &Article) -> RepoResult<Article>;
    // Persists every article in one atomic unit: all rows are written or none is.
    async fn update_articles(&self, articles: &[Article]) -> RepoResult<Vec<Article>>;
    async fn soft_delete_article(&self, id: i64) -> RepoResult<bool>;
    async fn restore_article(&self, id: i64) -> RepoResult<Option<Article>>;
    async fn force_delete_article(&self, id: i64) -> RepoResult<bool>;

    // --- Users ---
    async fn find_user(&self, id: i64) -> RepoResult<Option<User>>;
    async fn find_user_by_login(&self, login: &str) -> RepoResult<Option<User>>;
    async fn find_user_by_refresh_token(&self, token: &str) -> RepoResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    // Overwrites (or clears, with `None`) the single refresh token of a user.
    async fn set_refresh_token(&self, user_id: i64, token: Option<&str>) -> RepoResult<()>;

    // --- Access tokens ---
    async fn create_access_token(
        &self,
        user_id: i64,
        name: &str,
        abilities: &[String],
    ) -> RepoResult<PersonalAccessToken>;
    async fn find_access_token(&self, id: i64) -> RepoResult<Option<PersonalAccessToken>>;
    async fn revoke_access_token(&self, id: i64) -> RepoResult<bool>;
    // Returns how many tokens were revoked.
    async fn revoke_all_access_tokens(&self, user_id: i64) -> RepoResult<u64>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const ARTICLE_COLUMNS: &str = "id, name, price, stock, deleted_at, created_at, updated_at";
const USER_COLUMNS: &str = "id, login, password_hash, refresh_token, created_at, updated_at";
const TOKEN_COLUMNS: &str = "id, user_id, name, abilities, created_at";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_articles(&self) -> RepoResult<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE deleted_at IS NULL ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn find_article(&self, id: i64) -> RepoResult<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Article::from))
    }

    async fn list_trashed_articles(&self) -> RepoResult<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE deleted_at IS NOT NULL ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn find_article_with_trashed(&self, id: i64) -> RepoResult<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Article::from))
    }

    async fn create_article(&self, article: NewArticle) -> RepoResult<Article> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "INSERT INTO articles (name, price, stock, created_at, updated_at) \
             VALUES ($1, $2, $3, NOW(), NOW()) RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(&article.name)
        .bind(article.price)
        .bind(article.stock)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_article(&self, article: &Article) -> RepoResult<Article> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "UPDATE articles SET name = $2, price = $3, stock = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(article.id)
        .bind(&article.name)
        .bind(article.price)
        .bind(article.stock)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Article::from)
            .ok_or(RepositoryError::RowNotFound(article.id))
    }

    /// update_articles
    ///
    /// Writes every article inside one transaction. Any failure returns early, which
    /// drops the transaction and rolls back the rows already written.
    async fn update_articles(&self, articles: &[Article]) -> RepoResult<Vec<Article>> {
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(articles.len());

        for article in articles {
            let row = sqlx::query_as::<_, ArticleRow>(&format!(
                "UPDATE articles SET name = $2, price = $3, stock = $4, updated_at = NOW() \
                 WHERE id = $1 RETURNING {ARTICLE_COLUMNS}"
            ))
            .bind(article.id)
            .bind(&article.name)
            .bind(article.price)
            .bind(article.stock)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::RowNotFound(article.id))?;
            saved.push(Article::from(row));
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn soft_delete_article(&self, id: i64) -> RepoResult<bool> {
        let res = sqlx::query(
            "UPDATE articles SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn restore_article(&self, id: i64) -> RepoResult<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "UPDATE articles SET deleted_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NOT NULL RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Article::from))
    }

    async fn force_delete_article(&self, id: i64) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM articles WHERE id = $1 AND deleted_at IS NOT NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn find_user(&self, id: i64) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_login(&self, login: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE login = $1"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_refresh_token(&self, token: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE refresh_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (login, password_hash, created_at, updated_at) \
             VALUES ($1, $2, NOW(), NOW()) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.login)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_refresh_token(&self, user_id: i64, token: Option<&str>) -> RepoResult<()> {
        sqlx::query("UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_access_token(
        &self,
        user_id: i64,
        name: &str,
        abilities: &[String],
    ) -> RepoResult<PersonalAccessToken> {
        let token = sqlx::query_as::<_, PersonalAccessToken>(&format!(
            "INSERT INTO personal_access_tokens (user_id, name, abilities, created_at) \
             VALUES ($1, $2, $3, NOW()) RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(user_id)
        .bind(name)
        .bind(abilities.to_vec())
        .fetch_one(&self.pool)
        .await?;
        Ok(token)
    }

    async fn find_access_token(&self, id: i64) -> RepoResult<Option<PersonalAccessToken>> {
        let token = sqlx::query_as::<_, PersonalAccessToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM personal_access_tokens WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    async fn revoke_access_token(&self, id: i64) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM personal_access_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn revoke_all_access_tokens(&self, user_id: i64) -> RepoResult<u64> {
        let res = sqlx::query("DELETE FROM personal_access_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}
