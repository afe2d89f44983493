pub mod appresult;
pub mod catalog;
pub mod config;
pub mod db;
pub mod ratelimit;
pub mod res;
pub mod sanitize;
pub mod snippets;

use std::time::Duration;

use axum::{
    Router,
    extract::FromRef,
    http::{Method, header::CONTENT_TYPE},
    middleware,
};
use sqlx::SqlitePool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use appresult::{AppError, AppResult};
use config::Config;
use ratelimit::Limiter;
use snippets::{SnippetService, repo::SnippetRepo};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub snippets: SnippetService,
    pub limiter: Limiter,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            snippets: SnippetService::new(SnippetRepo::new(db_pool), config.max_snippets),
            limiter: Limiter::from_config(&config.rate_limit)?,
        })
    }
}

/// The whole HTTP surface, ready to serve.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .merge(snippets::router())
        .merge(catalog::router())
        .layer(middleware::from_fn_with_state(state.clone(), ratelimit::limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
