use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::models::{Article, Lifecycle, NewArticle, NewUser, PersonalAccessToken, User};
use crate::repository::{RepoResult, Repository, RepositoryError};

#[derive(Default)]
struct Tables {
    articles: BTreeMap<i64, Article>,
    users: BTreeMap<i64, User>,
    tokens: BTreeMap<i64, PersonalAccessToken>,
    next_article_id: i64,
    next_user_id: i64,
    next_token_id: i64,
}

impl Tables {
    fn bump(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// InMemoryRepository
///
/// A `Repository` kept entirely in process memory. Used by the test suites and for
/// running the API without a database. Ids are assigned sequentially from 1, like a
/// fresh `BIGSERIAL`.
///
/// `set_fail_writes(true)` makes every write return `RepositoryError::Unavailable`,
/// which lets tests exercise the rollback paths.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn writable(&self) -> RepoResult<MutexGuard<'_, Tables>> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "writes are disabled".to_string(),
            ));
        }
        Ok(self.tables())
    }

    fn write_fields(stored: &mut Article, from: &Article) {
        stored.name = from.name.clone();
        stored.price = from.price;
        stored.stock = from.stock;
        stored.updated_at = Utc::now();
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_articles(&self) -> RepoResult<Vec<Article>> {
        Ok(self
            .tables()
            .articles
            .values()
            .filter(|a| !a.is_trashed())
            .cloned()
            .collect())
    }

    async fn find_article(&self, id: i64) -> RepoResult<Option<Article>> {
        Ok(self
            .tables()
            .articles
            .get(&id)
            .filter(|a| !a.is_trashed())
            .cloned())
    }

    async fn list_trashed_articles(&self) -> RepoResult<Vec<Article>> {
        Ok(self
            .tables()
            .articles
            .values()
            .filter(|a| a.is_trashed())
            .cloned()
            .collect())
    }

    async fn find_article_with_trashed(&self, id: i64) -> RepoResult<Option<Article>> {
        Ok(self.tables().articles.get(&id).cloned())
    }

    async fn create_article(&self, article: NewArticle) -> RepoResult<Article> {
        let mut tables = self.writable()?;
        let id = Tables::bump(&mut tables.next_article_id);
        let now = Utc::now();
        let created = Article {
            id,
            name: article.name,
            price: article.price,
            stock: article.stock,
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        };
        tables.articles.insert(id, created.clone());
        Ok(created)
    }

    async fn update_article(&self, article: &Article) -> RepoResult<Article> {
        let mut tables = self.writable()?;
        let stored = tables
            .articles
            .get_mut(&article.id)
            .ok_or(RepositoryError::RowNotFound(article.id))?;
        Self::write_fields(stored, article);
        Ok(stored.clone())
    }

    async fn update_articles(&self, articles: &[Article]) -> RepoResult<Vec<Article>> {
        let mut tables = self.writable()?;

        // Check every row first so a missing one leaves the table untouched.
        if let Some(missing) = articles
            .iter()
            .find(|a| !tables.articles.contains_key(&a.id))
        {
            return Err(RepositoryError::RowNotFound(missing.id));
        }

        let mut saved = Vec::with_capacity(articles.len());
        for article in articles {
            if let Some(stored) = tables.articles.get_mut(&article.id) {
                Self::write_fields(stored, article);
                saved.push(stored.clone());
            }
        }
        Ok(saved)
    }

    async fn soft_delete_article(&self, id: i64) -> RepoResult<bool> {
        let mut tables = self.writable()?;
        match tables.articles.get_mut(&id) {
            Some(article) if !article.is_trashed() => {
                article.lifecycle = Lifecycle::Deleted { at: Utc::now() };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn restore_article(&self, id: i64) -> RepoResult<Option<Article>> {
        let mut tables = self.writable()?;
        match tables.articles.get_mut(&id) {
            Some(article) if article.is_trashed() => {
                article.lifecycle = Lifecycle::Active;
                article.updated_at = Utc::now();
                Ok(Some(article.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn force_delete_article(&self, id: i64) -> RepoResult<bool> {
        let mut tables = self.writable()?;
        let trashed = tables.articles.get(&id).is_some_and(Article::is_trashed);
        if trashed {
            tables.articles.remove(&id);
        }
        Ok(trashed)
    }

    async fn find_user(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.tables().users.get(&id).cloned())
    }

    async fn find_user_by_login(&self, login: &str) -> RepoResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| u.login == login)
            .cloned())
    }

    async fn find_user_by_refresh_token(&self, token: &str) -> RepoResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| u.refresh_token.as_deref() == Some(token))
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut tables = self.writable()?;
        let id = Tables::bump(&mut tables.next_user_id);
        let now = Utc::now();
        let created = User {
            id,
            login: user.login,
            password_hash: user.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn set_refresh_token(&self, user_id: i64, token: Option<&str>) -> RepoResult<()> {
        let mut tables = self.writable()?;
        if let Some(user) = tables.users.get_mut(&user_id) {
            user.refresh_token = token.map(str::to_string);
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn create_access_token(
        &self,
        user_id: i64,
        name: &str,
        abilities: &[String],
    ) -> RepoResult<PersonalAccessToken> {
        let mut tables = self.writable()?;
        let id = Tables::bump(&mut tables.next_token_id);
        let token = PersonalAccessToken {
            id,
            user_id,
            name: name.to_string(),
            abilities: abilities.to_vec(),
            created_at: Utc::now(),
        };
        tables.tokens.insert(id, token.clone());
        Ok(token)
    }

    async fn find_access_token(&self, id: i64) -> RepoResult<Option<PersonalAccessToken>> {
        Ok(self.tables().tokens.get(&id).cloned())
    }

    async fn revoke_access_token(&self, id: i64) -> RepoResult<bool> {
        let mut tables = self.writable()?;
        Ok(tables.tokens.remove(&id).is_some())
    }

    async fn revoke_all_access_tokens(&self, user_id: i64) -> RepoResult<u64> {
        let mut tables = self.writable()?;
        let before = tables.tokens.len();
        tables.tokens.retain(|_, t| t.user_id != user_id);
        Ok((before - tables.tokens.len()) as u64)
    }
}
