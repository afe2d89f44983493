use axum::{
    Json, debug_handler,
    extract::{Query, State, rejection::QueryRejection},
};

use crate::{AppResult, AppState};

use super::{SnippetService, filter::ListParams, model::Page};

#[debug_handler(state = AppState)]
pub(crate) async fn list(
    State(snippets): State<SnippetService>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> AppResult<Json<Page>> {
    let Query(params) = params?;
    Ok(Json(snippets.list(&params).await?))
}
