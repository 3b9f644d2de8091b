use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

// --- Core Application Schemas (Mapped to Database) ---

/// Lifecycle
///
/// Soft-delete state of an article. On the wire (and in the `articles.deleted_at`
/// column) this is a nullable timestamp: `null` means `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Active,
    Deleted { at: DateTime<Utc> },
}

impl Lifecycle {
    pub fn from_deleted_at(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            Some(at) => Lifecycle::Deleted { at },
            None => Lifecycle::Active,
        }
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Lifecycle::Active => None,
            Lifecycle::Deleted { at } => Some(*at),
        }
    }

    pub fn is_trashed(&self) -> bool {
        matches!(self, Lifecycle::Deleted { .. })
    }
}

impl Serialize for Lifecycle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.deleted_at().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Lifecycle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<DateTime<Utc>>::deserialize(deserializer).map(Lifecycle::from_deleted_at)
    }
}

/// Article
///
/// An inventory item from the `articles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Article {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub stock: i32,

    #[serde(rename = "deleted_at")]
    #[ts(type = "string | null")]
    #[schema(value_type = Option<String>)]
    pub lifecycle: Lifecycle,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn is_trashed(&self) -> bool {
        self.lifecycle.is_trashed()
    }

    /// Applies validated changes to this (unsaved) copy. `stock_delta` is relative.
    ///
    /// Returns `None` when the stock arithmetic overflows.
    pub fn apply(&mut self, changes: &ArticleChanges) -> Option<()> {
        if let Some(delta) = changes.stock_delta {
            self.stock = self.stock.checked_add(delta)?;
        }
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        Some(())
    }
}

/// ArticleRow
///
/// Raw database row. `deleted_at` is folded into [`Lifecycle`] on conversion.
#[derive(Debug, Clone, FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub stock: i32,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: row.id,
            name: row.name,
            price: row.price,
            stock: row.stock,
            lifecycle: Lifecycle::from_deleted_at(row.deleted_at),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// User
///
/// Account record from the `users` table. The password hash and refresh token
/// never leave the server.
#[derive(Debug, Clone, Serialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub login: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub refresh_token: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// PersonalAccessToken
///
/// One issued access token (`personal_access_tokens` row). The bearer string only
/// stays valid while this row exists.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PersonalAccessToken {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub abilities: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// ArticlePayload
///
/// Body of `POST /v1/articles`, `PUT|PATCH /v1/articles/{id}` and of each batch item.
/// Unknown keys are ignored; a payload with every field absent is "empty".
///
/// The derived rules are the update rules: every field optional, `stock` a signed
/// delta. Creation goes through [`NewArticleRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Validate)]
#[ts(export)]
pub struct ArticlePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(
        custom(function = "not_blank"),
        length(max = 255, message = "Le champ name ne doit pas dépasser 255 caractères.")
    )]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "Le champ price doit être un nombre positif."))]
    pub price: Option<f64>,

    /// Initial stock on creation, relative delta on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i32>,
}

impl ArticlePayload {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none() && self.stock.is_none()
    }
}

/// NewArticleRequest
///
/// Creation rules over the same body: `name` and `price` required, `stock` optional
/// and non-negative.
#[derive(Debug, Clone, Default, Validate)]
pub struct NewArticleRequest {
    #[validate(
        required(message = "Le champ name est obligatoire."),
        custom(function = "not_blank"),
        length(max = 255, message = "Le champ name ne doit pas dépasser 255 caractères.")
    )]
    pub name: Option<String>,

    #[validate(
        required(message = "Le champ price est obligatoire."),
        range(min = 0.0, message = "Le champ price doit être un nombre positif.")
    )]
    pub price: Option<f64>,

    #[validate(range(min = 0, message = "Le champ stock doit être supérieur ou égal à 0."))]
    pub stock: Option<i32>,
}

impl From<ArticlePayload> for NewArticleRequest {
    fn from(payload: ArticlePayload) -> Self {
        Self {
            name: payload.name,
            price: payload.price,
            stock: payload.stock,
        }
    }
}

/// Rejects strings made only of whitespace. The message is filled in per field when
/// the errors are collected.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Validated input for inserting a new article.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub name: String,
    pub price: f64,
    pub stock: i32,
}

/// Validated, non-empty set of changes for an existing article.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArticleChanges {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub stock_delta: Option<i32>,
}

/// BatchUpdateRequest
///
/// Body of `POST /v1/articles/stock`: either `{ "articles": [...] }` or a bare array.
/// Items stay raw JSON so each failure can echo back exactly what was sent.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BatchUpdateRequest {
    Wrapped {
        #[serde(default)]
        articles: Option<Vec<Value>>,
    },
    Bare(Vec<Value>),
}

impl BatchUpdateRequest {
    pub fn into_items(self) -> Vec<Value> {
        match self {
            BatchUpdateRequest::Wrapped { articles } => articles.unwrap_or_default(),
            BatchUpdateRequest::Bare(items) => items,
        }
    }
}

/// LoginRequest
///
/// Body of `POST /login`. Both fields are required; they are optional here so that
/// a missing one yields a field error instead of a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, Validate)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(
        required(message = "Le champ login est obligatoire."),
        custom(function = "not_blank")
    )]
    pub login: Option<String>,
    #[serde(default)]
    #[validate(
        required(message = "Le champ password est obligatoire."),
        length(min = 1, message = "Le champ password est obligatoire.")
    )]
    pub password: Option<String>,
}

/// RefreshRequest
///
/// Body of `POST /refresh`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, Validate)]
#[ts(export)]
pub struct RefreshRequest {
    #[serde(default)]
    #[validate(
        required(message = "Le champ refresh_token est obligatoire."),
        length(min = 1, message = "Le champ refresh_token est obligatoire.")
    )]
    pub refresh_token: Option<String>,
}

/// Validated input for inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub password_hash: String,
}

// --- Response Payloads (Output Schemas) ---

/// FailedUpdate
///
/// One rejected batch item: the raw item as received plus the reason.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct FailedUpdate {
    #[ts(type = "unknown")]
    #[schema(value_type = Object)]
    pub article_data: Value,
    pub error_message: String,
}

/// BatchReport
///
/// Payload of `POST /v1/articles/stock`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BatchReport {
    pub updated_articles: Vec<Article>,
    pub failed_updates: Vec<FailedUpdate>,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        !self.failed_updates.is_empty()
    }
}

/// TokenDescriptor
///
/// Expanded view of the issued access token (`token_full` in the login payload).
#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenDescriptor {
    pub id: i64,
    pub token: String,
    pub abilities: Vec<String>,
}

/// LoginResponse
///
/// Payload of a successful `POST /login`.
#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub user: User,
    pub access_token: String,
    pub token_full: TokenDescriptor,
    pub refresh_token: String,
    pub token_type: String,
}

/// RefreshResponse
///
/// Payload of a successful `POST /refresh`.
#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}
