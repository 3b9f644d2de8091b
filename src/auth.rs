use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    error::ApiError,
    models::{PersonalAccessToken, User},
    repository::RepositoryState,
    response::messages,
};

/// Length of every generated refresh token.
pub const REFRESH_TOKEN_LEN: usize = 60;
/// Name recorded on every issued access token.
pub const ACCESS_TOKEN_NAME: &str = "auth_token";
pub const TOKEN_TYPE: &str = "Bearer";

/// Ability list granted when none is requested.
pub fn default_abilities() -> Vec<String> {
    vec!["*".to_string()]
}

/// Claims
///
/// Payload signed into every access token. `jti` points at the
/// `personal_access_tokens` row; deleting that row revokes the token even though the
/// signature is still valid.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id, as a string.
    pub sub: String,
    /// Token row id.
    pub jti: i64,
    pub abilities: Vec<String>,
    pub iat: usize,
    pub exp: usize,
}

/// TokenIssuer
///
/// Signs and verifies access tokens with the configured HMAC secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.access_token_ttl_secs)
    }

    /// Turns a stored token row into the bearer string handed to the client.
    pub fn sign(&self, token: &PersonalAccessToken) -> Result<String, ApiError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: token.user_id.to_string(),
            jti: token.id,
            abilities: token.abilities.clone(),
            iat: now.max(0) as usize,
            exp: (now + self.ttl_secs).max(0) as usize,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("failed to sign access token: {:?}", e);
            ApiError::Internal(messages::INTERNAL_ERROR.to_string())
        })
    }

    /// Checks signature and expiry. Revocation is checked separately against the store.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .ok()
    }
}

/// Generates a refresh token: `REFRESH_TOKEN_LEN` alphanumeric characters drawn from
/// the thread-local CSPRNG.
pub fn generate_refresh_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Hashes a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!("failed to hash password: {}", e);
            ApiError::Internal(messages::INTERNAL_ERROR.to_string())
        })
}

/// Verifies a password against a stored PHC string. A malformed hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request: the user and the id of the
/// access token that was presented (needed by logout).
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub token_id: i64,
}

/// AuthUser Extractor Implementation
///
/// 1. Pulls the repository and configuration from the app state.
/// 2. Extracts the `Authorization: Bearer` token.
/// 3. Verifies signature and expiry.
/// 4. Checks that the token row still exists for that user (revocation).
/// 5. Loads the user.
///
/// Rejection: a 401 envelope ("Non authentifié") on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        let unauthenticated = || ApiError::Unauthorized(messages::UNAUTHENTICATED.to_string());

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(unauthenticated)?;

        let claims = TokenIssuer::from_config(&config)
            .verify(token)
            .ok_or_else(unauthenticated)?;
        let user_id: i64 = claims.sub.parse().map_err(|_| unauthenticated())?;

        let stored = repo
            .find_access_token(claims.jti)
            .await?
            .filter(|t| t.user_id == user_id)
            .ok_or_else(unauthenticated)?;

        let user = repo.find_user(user_id).await?.ok_or_else(unauthenticated)?;

        Ok(AuthUser {
            user,
            token_id: stored.id,
        })
    }
}
