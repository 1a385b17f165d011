pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod rate_limit;
pub mod rest;
pub mod store;
pub mod validation;

use sqlx::SqlitePool;

use crate::auth::SessionManager;
use crate::config::Config;
use crate::rate_limit::RateLimiter;
use crate::store::{PostStore, UserStore};

/// Process-wide dependencies, built once at startup and shared by handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub users: UserStore,
    pub posts: PostStore,
    pub sessions: SessionManager,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(db: SqlitePool, config: &Config) -> Self {
        Self {
            users: UserStore::new(db.clone()),
            posts: PostStore::new(db.clone()),
            sessions: SessionManager::new(&config.session, db.clone()),
            limiter: RateLimiter::new(
                config.auth_rate_limit,
                config.auth_rate_window,
                config.trust_proxy,
            ),
            db,
        }
    }
}
