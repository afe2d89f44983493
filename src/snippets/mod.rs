mod create;
mod fetch;
mod list;
mod modify;

pub mod filter;
pub mod model;
pub mod repo;
pub mod secrets;
pub mod service;
pub mod tags;
pub mod validate;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub use service::SnippetService;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/snippets", get(list::list).post(create::create))
        .route("/snippets/random", get(fetch::random))
        .route("/snippets/batch-get", post(fetch::batch))
        .route(
            "/snippets/{id}",
            get(fetch::one).put(modify::update).delete(modify::delete),
        )
        .route("/snippets/{id}/verify-modification-code", post(modify::verify))
}
