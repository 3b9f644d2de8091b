use boutique_api::{
    AppState,
    auth::hash_password,
    config::{AppConfig, Env, SeedUser},
    create_router,
    models::NewUser,
    repository::{PostgresRepository, Repository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, connects and migrates the database, seeds
/// the bootstrap account if configured, then serves HTTP.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "boutique_api=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to run database migrations.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    if let Some(seed) = &config.seed_user {
        seed_user(repo.as_ref(), seed).await;
    }

    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState { repo, config });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API documentation available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}

/// Creates the bootstrap account unless a user with that login already exists.
async fn seed_user(repo: &dyn Repository, seed: &SeedUser) {
    match repo.find_user_by_login(&seed.login).await {
        Ok(Some(_)) => tracing::debug!(login = %seed.login, "seed user already present"),
        Ok(None) => {
            let password_hash = match hash_password(&seed.password) {
                Ok(hash) => hash,
                Err(e) => {
                    tracing::error!("could not hash seed password: {}", e);
                    return;
                }
            };
            let new_user = NewUser {
                login: seed.login.clone(),
                password_hash,
            };
            match repo.create_user(new_user).await {
                Ok(user) => tracing::info!(user_id = user.id, "seed user created"),
                Err(e) => tracing::error!("could not create seed user: {}", e),
            }
        }
        Err(e) => tracing::error!("seed user lookup failed: {}", e),
    }
}
