use anyhow::{Context, anyhow};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::appresult::{AppError, AppResult};

use super::{
    filter::{ListParams, QuerySpec},
    model::{CreatedSnippet, NewSnippet, Page, Pagination, Snippet},
    repo::SnippetRepo,
    secrets, validate,
};

/// Business rules around [`SnippetRepo`]: validation, the snippet cap and
/// modification-code checks.
#[derive(Debug, Clone)]
pub struct SnippetService {
    repo: SnippetRepo,
    max_snippets: i64,
}

impl SnippetService {
    pub fn new(repo: SnippetRepo, max_snippets: i64) -> Self {
        Self { repo, max_snippets }
    }

    /// Count and page run as two separate statements, so the total may be
    /// stale relative to the page under concurrent writes.
    pub async fn list(&self, params: &ListParams) -> AppResult<Page> {
        let spec = QuerySpec::build(params);

        let total_items = self.repo.count(&spec).await.context("counting snippets")?;
        let rows = self.repo.page(&spec).await.context("listing snippets")?;
        let data: Vec<Snippet> = rows.into_iter().map(Snippet::from).collect();

        Ok(Page {
            pagination: Pagination {
                current_page: spec.page,
                per_page: spec.per_page,
                total_pages: spec.total_pages(total_items),
                total_items,
                items_on_page: data.len(),
            },
            data,
        })
    }

    pub async fn get(&self, id: &str) -> AppResult<Snippet> {
        let id = parse_id(id)?;
        self.repo
            .get_by_id(&id)
            .await
            .with_context(|| format!("fetching snippet {id}"))?
            .map(Snippet::from)
            .ok_or_else(|| not_found(&id))
    }

    pub async fn random(&self) -> AppResult<Snippet> {
        self.repo
            .get_random()
            .await
            .context("fetching random snippet")?
            .map(Snippet::from)
            .ok_or_else(|| AppError::NotFound("No snippets exist yet".to_owned()))
    }

    /// Looks up every well-formed id of `{"ids": [...]}`; unknown ids are omitted.
    pub async fn batch(&self, body: &Value) -> AppResult<Vec<Snippet>> {
        let ids: Vec<&str> = body
            .get("ids")
            .and_then(Value::as_array)
            .ok_or_else(|| AppError::InvalidArgument("The ids field must be an array of snippet ids".to_owned()))?
            .iter()
            .filter_map(Value::as_str)
            .collect();

        let rows = self.repo.get_batch(&ids).await.context("fetching snippet batch")?;
        Ok(rows.into_iter().map(Snippet::from).collect())
    }

    pub async fn create(&self, body: &Value) -> AppResult<CreatedSnippet> {
        let total = self.repo.count_all().await.context("counting snippets")?;
        if total >= self.max_snippets {
            warn!(total, max = self.max_snippets, "snippet limit reached");
            return Err(AppError::ResourceExhausted);
        }

        let draft = validate::create(body)?;
        let snippet = NewSnippet {
            id: Uuid::now_v7().to_string(),
            title: draft.title,
            description: draft.description,
            username: draft.username.unwrap_or_else(secrets::username),
            language: draft.language,
            code: draft.code,
            tags: draft.tags,
            modification_code: secrets::modification_code(),
            created_at: OffsetDateTime::now_utc(),
        };

        self.repo
            .insert(&snippet)
            .await
            .with_context(|| format!("inserting snippet {}", snippet.id))?;

        let row = self
            .repo
            .get_by_id(&snippet.id)
            .await
            .with_context(|| format!("re-reading snippet {}", snippet.id))?
            .ok_or_else(|| anyhow!("snippet {} missing right after insert", snippet.id))?;

        info!(id = %row.id, language = %row.language, "snippet created");
        Ok(row.into())
    }

    pub async fn update(&self, id: &str, body: &Value) -> AppResult<Snippet> {
        let id = parse_id(id)?;
        let code = validate::modification_code(validate::object(body)?)?;

        let changes = validate::update(body)?;
        self.authorize(&id, &code).await?;
        if changes.is_empty() {
            return Err(AppError::InvalidArgument("Nothing to update".to_owned()));
        }

        let affected = self
            .repo
            .update_fields(&id, &code, &changes, OffsetDateTime::now_utc())
            .await
            .with_context(|| format!("updating snippet {id}"))?;
        if affected == 0 {
            return Err(vanished(&id));
        }

        let row = self
            .repo
            .get_by_id(&id)
            .await
            .with_context(|| format!("re-reading snippet {id}"))?
            .ok_or_else(|| anyhow!("snippet {id} missing right after update"))?;

        info!(%id, "snippet updated");
        Ok(row.into())
    }

    pub async fn delete(&self, id: &str, code: Option<&str>) -> AppResult<()> {
        let id = parse_id(id)?;
        let code = validate::check_modification_code(code)?;
        self.authorize(&id, code).await?;

        let affected = self
            .repo
            .delete(&id, code)
            .await
            .with_context(|| format!("deleting snippet {id}"))?;
        if affected == 0 {
            return Err(vanished(&id));
        }

        info!(%id, "snippet deleted");
        Ok(())
    }

    /// Every failure except a storage error reads as `false`.
    pub async fn verify(&self, id: &str, code: Option<&str>) -> AppResult<bool> {
        let (Ok(id), Ok(code)) = (parse_id(id), validate::check_modification_code(code)) else {
            return Ok(false);
        };

        match self.authorize(&id, code).await {
            Ok(()) => Ok(true),
            Err(err @ AppError::Internal(_)) => Err(err),
            Err(_) => Ok(false),
        }
    }

    pub async fn languages(&self) -> AppResult<Vec<String>> {
        Ok(self.repo.distinct_languages().await.context("listing languages")?)
    }

    pub async fn tags(&self) -> AppResult<Vec<String>> {
        Ok(self.repo.distinct_tags().await.context("listing tags")?)
    }

    async fn authorize(&self, id: &str, code: &str) -> AppResult<()> {
        let stored = self
            .repo
            .modification_code(id)
            .await
            .with_context(|| format!("loading modification code of snippet {id}"))?
            .ok_or_else(|| not_found(id))?;

        if stored != code {
            warn!(%id, "modification code mismatch");
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}

/// Canonical (lowercase, hyphenated) form of a snippet id.
fn parse_id(id: &str) -> AppResult<String> {
    Uuid::parse_str(id)
        .map(|id| id.to_string())
        .map_err(|_| AppError::InvalidArgument("Invalid snippet id".to_owned()))
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("No snippet found with id {id}"))
}

fn vanished(id: &str) -> AppError {
    AppError::NotFound(format!("Snippet {id} was removed before the change could be applied"))
}
