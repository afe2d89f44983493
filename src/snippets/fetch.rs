use axum::{
    Json, debug_handler,
    extract::{Path, State, rejection::JsonRejection},
};
use serde_json::Value;

use crate::{AppResult, AppState};

use super::{SnippetService, model::Snippet};

#[debug_handler(state = AppState)]
pub(crate) async fn one(
    State(snippets): State<SnippetService>,
    Path(id): Path<String>,
) -> AppResult<Json<Snippet>> {
    Ok(Json(snippets.get(&id).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn random(State(snippets): State<SnippetService>) -> AppResult<Json<Snippet>> {
    Ok(Json(snippets.random().await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn batch(
    State(snippets): State<SnippetService>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Vec<Snippet>>> {
    let Json(body) = body?;
    Ok(Json(snippets.batch(&body).await?))
}
