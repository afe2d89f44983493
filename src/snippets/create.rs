use axum::{
    Json, debug_handler,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::Value;

use crate::{AppResult, AppState};

use super::{SnippetService, model::CreatedSnippet};

#[debug_handler(state = AppState)]
pub(crate) async fn create(
    State(snippets): State<SnippetService>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CreatedSnippet>)> {
    let Json(body) = body?;
    let created = snippets.create(&body).await?;

    Ok((StatusCode::CREATED, Json(created)))
}
