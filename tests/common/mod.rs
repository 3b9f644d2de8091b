#![allow(dead_code)]

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHasher, SaltString},
};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use boutique_api::{
    AppConfig, AppState, InMemoryRepository, create_router,
    models::{Article, NewArticle, NewUser, User},
    repository::{Repository, RepositoryState},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "motdepasse-boutique";

/// Argon2 hash with tiny cost parameters so the suites stay fast. Verification reads
/// the parameters back from the PHC string, so the production verifier accepts it.
pub fn cheap_hash(password: &str) -> String {
    let params = Params::new(1024, 1, 1, None).unwrap();
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::generate(&mut rand::thread_rng());
    argon2
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

pub async fn seed_user(repo: &InMemoryRepository, login: &str) -> User {
    repo.create_user(NewUser {
        login: login.to_string(),
        password_hash: cheap_hash(PASSWORD),
    })
    .await
    .unwrap()
}

pub async fn seed_article(repo: &InMemoryRepository, name: &str, price: f64, stock: i32) -> Article {
    repo.create_article(NewArticle {
        name: name.to_string(),
        price,
        stock,
    })
    .await
    .unwrap()
}

/// In-process application: the real router over an in-memory store.
pub struct TestApp {
    pub repo: Arc<InMemoryRepository>,
    pub router: Router,
    pub config: AppConfig,
}

pub fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let config = AppConfig::default();
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        config: config.clone(),
    };
    TestApp {
        repo,
        router: create_router(state),
        config,
    }
}

impl TestApp {
    /// Sends one request and returns the status plus the decoded JSON body
    /// (`Value::Null` when the body is not JSON).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Logs `login` in with the shared test password and returns the `data` payload.
    pub async fn login(&self, login: &str) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                "/login",
                None,
                Some(serde_json::json!({ "login": login, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"].clone()
    }

    pub async fn access_token(&self, login: &str) -> String {
        self.login(login).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }
}
