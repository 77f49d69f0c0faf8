//! Application state shared across all route handlers.
//!
//! AppState holds the configuration, the database and the repositories built
//! on it, and the token keys. It is passed to handlers via axum's State
//! extractor.

use std::sync::Arc;
use std::time::Instant;

use tracing::warn;

use growlog_core::config::GrowlogConfig;
use growlog_storage::{
    Database, EmotionRepository, QueryService, ReflectionRepository, TodoRepository,
    UserRepository,
};

use crate::auth::{generate_secret, Passwords, TokenKeys};

/// Shared application state.
///
/// All fields are cheap to clone; nothing here is mutated after startup.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Application configuration, fixed at startup.
    pub config: Arc<GrowlogConfig>,
    /// SQLite database for persistent storage.
    pub database: Arc<Database>,
    pub users: UserRepository,
    pub todos: TodoRepository,
    pub reflections: ReflectionRepository,
    pub emotions: EmotionRepository,
    pub queries: QueryService,
    /// JWT signing and verification keys.
    pub keys: Arc<TokenKeys>,
    pub passwords: Arc<Passwords>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState from the configuration and an open database.
    ///
    /// Without a configured JWT secret a random one is generated, so issued
    /// tokens stop verifying after a restart.
    pub fn new(config: GrowlogConfig, database: Database) -> Self {
        let secret = match &config.auth.jwt_secret {
            Some(secret) => secret.clone(),
            None => {
                warn!("No JWT secret configured; generated a random one for this process");
                generate_secret()
            }
        };
        let keys = TokenKeys::new(&secret, config.auth.token_ttl_secs);
        let database = Arc::new(database);

        Self {
            config: Arc::new(config),
            users: UserRepository::new(Arc::clone(&database)),
            todos: TodoRepository::new(Arc::clone(&database)),
            reflections: ReflectionRepository::new(Arc::clone(&database)),
            emotions: EmotionRepository::new(Arc::clone(&database)),
            queries: QueryService::new(Arc::clone(&database)),
            database,
            keys: Arc::new(keys),
            passwords: Arc::new(Passwords::new()),
            start_time: Instant::now(),
        }
    }
}
