//! Application state - shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use quill_core::ports::{
    Cache, CommentRepository, PasswordService, PostRepository, TokenService, UserRepository,
};
use quill_core::services::BlogService;
use quill_infra::{
    Argon2PasswordService, InMemoryCache, InMemoryCommentRepository, InMemoryPostRepository,
    InMemoryStore, InMemoryUserRepository, JwtTokenService,
};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub blog: BlogService,
    pub users: Arc<dyn UserRepository>,
    pub cache: Arc<dyn Cache>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub list_cache_ttl: Duration,
}

struct Repositories {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl Repositories {
    fn in_memory() -> Self {
        let store = InMemoryStore::new();
        Self {
            users: Arc::new(InMemoryUserRepository::new(store.clone())),
            posts: Arc::new(InMemoryPostRepository::new(store.clone())),
            comments: Arc::new(InMemoryCommentRepository::new(store)),
        }
    }
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let repos = build_repositories(config).await;
        let cache = build_cache(config).await;

        tracing::info!("Application state initialized");

        Self::assemble(
            repos,
            cache,
            Arc::new(JwtTokenService::new(config.jwt.clone())),
            Arc::new(Argon2PasswordService::new()),
            config.list_cache_ttl,
        )
    }

    /// State backed entirely by in-memory adapters.
    pub fn in_memory(
        tokens: Arc<dyn TokenService>,
        passwords: Arc<dyn PasswordService>,
        list_cache_ttl: Duration,
    ) -> Self {
        Self::assemble(
            Repositories::in_memory(),
            Arc::new(InMemoryCache::new()),
            tokens,
            passwords,
            list_cache_ttl,
        )
    }

    fn assemble(
        repos: Repositories,
        cache: Arc<dyn Cache>,
        tokens: Arc<dyn TokenService>,
        passwords: Arc<dyn PasswordService>,
        list_cache_ttl: Duration,
    ) -> Self {
        Self {
            blog: BlogService::new(repos.posts, repos.comments, repos.users.clone()),
            users: repos.users,
            cache,
            tokens,
            passwords,
            list_cache_ttl,
        }
    }
}

#[cfg(feature = "postgres")]
async fn build_repositories(config: &AppConfig) -> Repositories {
    use migration::{Migrator, MigratorTrait};
    use quill_infra::database::{
        PostgresCommentRepository, PostgresPostRepository, PostgresUserRepository, connect,
    };

    let Some(db_config) = config.database.as_ref() else {
        tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        return Repositories::in_memory();
    };

    let conn = match connect(db_config).await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database. Using in-memory fallback.");
            return Repositories::in_memory();
        }
    };

    if let Err(e) = Migrator::up(&conn, None).await {
        tracing::error!(error = %e, "Failed to apply migrations. Using in-memory fallback.");
        return Repositories::in_memory();
    }

    Repositories {
        users: Arc::new(PostgresUserRepository::new(conn.clone())),
        posts: Arc::new(PostgresPostRepository::new(conn.clone())),
        comments: Arc::new(PostgresCommentRepository::new(conn)),
    }
}

#[cfg(not(feature = "postgres"))]
async fn build_repositories(_config: &AppConfig) -> Repositories {
    tracing::info!("Running without postgres feature - using in-memory repositories");
    Repositories::in_memory()
}

#[cfg(feature = "redis")]
async fn build_cache(config: &AppConfig) -> Arc<dyn Cache> {
    use quill_infra::RedisCache;

    let Some(redis_config) = config.redis.as_ref() else {
        tracing::info!("REDIS_URL not set. Using in-memory list cache.");
        return Arc::new(InMemoryCache::new());
    };

    match RedisCache::new(redis_config).await {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable. Using in-memory list cache.");
            Arc::new(InMemoryCache::new())
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn build_cache(_config: &AppConfig) -> Arc<dyn Cache> {
    Arc::new(InMemoryCache::new())
}
