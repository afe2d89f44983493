use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use super::tags;

/// A `snippets` row exactly as stored.
#[derive(Debug, Clone, FromRow)]
pub struct SnippetRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub username: String,
    pub language: String,
    pub code: String,
    pub tags: Option<String>,
    pub modification_code: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Public representation. Never carries the modification code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snippet {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub username: String,
    pub language: String,
    pub tags: Vec<String>,
    pub code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<SnippetRow> for Snippet {
    fn from(row: SnippetRow) -> Self {
        Self {
            tags: tags::decode_opt(row.tags.as_deref()),
            id: row.id,
            title: row.title,
            description: row.description,
            username: row.username,
            language: row.language,
            code: row.code,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Response of a successful create, the only place the code is disclosed.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedSnippet {
    #[serde(flatten)]
    pub snippet: Snippet,
    pub modification_code: String,
}

impl From<SnippetRow> for CreatedSnippet {
    fn from(mut row: SnippetRow) -> Self {
        let modification_code = std::mem::take(&mut row.modification_code);
        Self {
            snippet: row.into(),
            modification_code,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSnippet {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub username: String,
    pub language: String,
    pub code: String,
    pub tags: Vec<String>,
    pub modification_code: String,
    pub created_at: OffsetDateTime,
}

/// Fields targeted by a partial update. `None` leaves the column alone;
/// `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub username: Option<String>,
    pub language: Option<String>,
    pub code: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl SnippetChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.username.is_none()
            && self.language.is_none()
            && self.code.is_none()
            && self.tags.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub data: Vec<Snippet>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: i64,
    pub per_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_on_page: usize,
}
