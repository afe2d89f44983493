use axum::{Json, Router, debug_handler, extract::State, routing::get};

use crate::{AppResult, AppState, snippets::SnippetService};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/languages", get(languages))
        .route("/tags", get(tags))
}

#[debug_handler(state = AppState)]
async fn languages(State(snippets): State<SnippetService>) -> AppResult<Json<Vec<String>>> {
    Ok(Json(snippets.languages().await?))
}

#[debug_handler(state = AppState)]
async fn tags(State(snippets): State<SnippetService>) -> AppResult<Json<Vec<String>>> {
    Ok(Json(snippets.tags().await?))
}
