use axum::extract::FromRef;

use crate::{
    AppState,
    auth::{
        ACCESS_TOKEN_NAME, AuthUser, TOKEN_TYPE, TokenIssuer, default_abilities,
        generate_refresh_token, verify_password,
    },
    error::ApiError,
    models::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, TokenDescriptor, User},
    repository::RepositoryState,
    response::messages,
    validation::{validate_login, validate_refresh_token},
};

/// AuthService
///
/// Login, refresh-token rotation and logout.
#[derive(Clone)]
pub struct AuthService {
    repo: RepositoryState,
    issuer: TokenIssuer,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(app_state: &AppState) -> AuthService {
        AuthService::new(
            app_state.repo.clone(),
            TokenIssuer::from_config(&app_state.config),
        )
    }
}

impl AuthService {
    pub fn new(repo: RepositoryState, issuer: TokenIssuer) -> Self {
        Self { repo, issuer }
    }

    /// login
    ///
    /// Checks the credentials, issues a fresh access token and overwrites the user's
    /// refresh token. Unknown login and wrong password are indistinguishable.
    pub async fn login(&self, payload: LoginRequest) -> Result<LoginResponse, ApiError> {
        let (login, password) = validate_login(payload)?;
        let bad_credentials = || ApiError::Unauthorized(messages::BAD_CREDENTIALS.to_string());

        let user = self
            .repo
            .find_user_by_login(&login)
            .await?
            .ok_or_else(bad_credentials)?;

        if !verify_password(&password, &user.password_hash) {
            tracing::warn!(user_id = user.id, "login rejected: wrong password");
            return Err(bad_credentials());
        }

        let stored = self
            .repo
            .create_access_token(user.id, ACCESS_TOKEN_NAME, &default_abilities())
            .await?;
        let access_token = self.issuer.sign(&stored)?;

        let refresh_token = generate_refresh_token();
        self.repo
            .set_refresh_token(user.id, Some(&refresh_token))
            .await?;

        tracing::info!(user_id = user.id, token_id = stored.id, "user logged in");

        Ok(LoginResponse {
            user,
            access_token: access_token.clone(),
            token_full: TokenDescriptor {
                id: stored.id,
                token: access_token,
                abilities: stored.abilities,
            },
            refresh_token,
            token_type: TOKEN_TYPE.to_string(),
        })
    }

    /// refresh
    ///
    /// Rotates the refresh token: every access token of the user is revoked, one new
    /// access token is issued and a new refresh token replaces the old one.
    pub async fn refresh(&self, payload: RefreshRequest) -> Result<RefreshResponse, ApiError> {
        let presented = validate_refresh_token(payload)?;

        let user = self
            .repo
            .find_user_by_refresh_token(&presented)
            .await?
            .ok_or_else(|| ApiError::Unauthorized(messages::INVALID_REFRESH_TOKEN.to_string()))?;

        let revoked = self.repo.revoke_all_access_tokens(user.id).await?;

        let stored = self
            .repo
            .create_access_token(user.id, ACCESS_TOKEN_NAME, &default_abilities())
            .await?;
        let access_token = self.issuer.sign(&stored)?;

        let refresh_token = generate_refresh_token();
        self.repo
            .set_refresh_token(user.id, Some(&refresh_token))
            .await?;

        tracing::info!(user_id = user.id, revoked, "tokens refreshed");

        Ok(RefreshResponse {
            access_token,
            refresh_token,
            token_type: TOKEN_TYPE.to_string(),
        })
    }

    /// logout
    ///
    /// Revokes only the presented access token and clears the refresh token.
    pub async fn logout(&self, auth: &AuthUser) -> Result<(), ApiError> {
        self.repo.revoke_access_token(auth.token_id).await?;
        self.repo.set_refresh_token(auth.user.id, None).await?;
        tracing::info!(user_id = auth.user.id, token_id = auth.token_id, "user logged out");
        Ok(())
    }

    pub fn current_user(&self, auth: AuthUser) -> User {
        auth.user
    }
}
