use axum::{
    Json, debug_handler,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppResult, AppState};

use super::{SnippetService, model::Snippet};

#[derive(Debug, Deserialize)]
pub(crate) struct CodeQuery {
    modification_code: Option<String>,
}

fn code_from_body(body: Result<Json<Value>, JsonRejection>) -> Option<String> {
    let Json(body) = body.ok()?;
    body.get("modification_code")?.as_str().map(str::to_owned)
}

#[debug_handler(state = AppState)]
pub(crate) async fn update(
    State(snippets): State<SnippetService>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Snippet>> {
    let Json(body) = body?;
    Ok(Json(snippets.update(&id, &body).await?))
}

/// The code may come as `?modification_code=` or in a JSON body.
#[debug_handler(state = AppState)]
pub(crate) async fn delete(
    State(snippets): State<SnippetService>,
    Path(id): Path<String>,
    query: Result<Query<CodeQuery>, QueryRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Query(CodeQuery { modification_code }) = query?;
    let code = modification_code.or_else(|| code_from_body(body));
    snippets.delete(&id, code.as_deref()).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler(state = AppState)]
pub(crate) async fn verify(
    State(snippets): State<SnippetService>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let code = code_from_body(body);
    let verified = snippets.verify(&id, code.as_deref()).await?;

    Ok(Json(json!({ "verified": verified })))
}
