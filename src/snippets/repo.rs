use std::collections::BTreeSet;

use futures_util::TryStreamExt;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    filter::QuerySpec,
    model::{NewSnippet, SnippetChanges, SnippetRow},
    tags,
};

const COLUMNS: &str =
    "id, title, description, username, language, code, tags, modification_code, created_at, updated_at";

/// All SQL touching the `snippets` table.
#[derive(Debug, Clone)]
pub struct SnippetRepo {
    db_pool: SqlitePool,
}

impl SnippetRepo {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    pub async fn count_all(&self) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM snippets")
            .fetch_one(&self.db_pool)
            .await
    }

    /// Rows matching the filters of `spec`, ignoring its order and paging.
    pub async fn count(&self, spec: &QuerySpec) -> sqlx::Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM snippets{}", spec.where_clause());

        let mut query = sqlx::query_scalar::<Sqlite, i64>(&sql);
        for param in spec.params() {
            query = query.bind(param);
        }
        query.fetch_one(&self.db_pool).await
    }

    pub async fn page(&self, spec: &QuerySpec) -> sqlx::Result<Vec<SnippetRow>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM snippets{} {} LIMIT ? OFFSET ?",
            spec.where_clause(),
            spec.order.to_sql(),
        );

        let mut query = sqlx::query_as::<Sqlite, SnippetRow>(&sql);
        for param in spec.params() {
            query = query.bind(param);
        }
        query
            .bind(spec.limit())
            .bind(spec.offset())
            .fetch_all(&self.db_pool)
            .await
    }

    pub async fn get_by_id(&self, id: &str) -> sqlx::Result<Option<SnippetRow>> {
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM snippets WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await
    }

    pub async fn get_random(&self) -> sqlx::Result<Option<SnippetRow>> {
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM snippets ORDER BY RANDOM() LIMIT 1"))
            .fetch_optional(&self.db_pool)
            .await
    }

    /// Malformed ids are skipped. Result order is whatever SQLite returns.
    pub async fn get_batch<S: AsRef<str>>(&self, ids: &[S]) -> sqlx::Result<Vec<SnippetRow>> {
        let ids: Vec<String> = ids
            .iter()
            .filter_map(|id| Uuid::parse_str(id.as_ref()).ok())
            .map(|id| id.to_string())
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM snippets WHERE id IN ("));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        qb.build_query_as().fetch_all(&self.db_pool).await
    }

    pub async fn modification_code(&self, id: &str) -> sqlx::Result<Option<String>> {
        sqlx::query_scalar("SELECT modification_code FROM snippets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await
    }

    pub async fn insert(&self, snippet: &NewSnippet) -> sqlx::Result<()> {
        sqlx::query(&format!(
            "INSERT INTO snippets ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&snippet.id)
        .bind(&snippet.title)
        .bind(&snippet.description)
        .bind(&snippet.username)
        .bind(&snippet.language)
        .bind(&snippet.code)
        .bind(tags::encode(&snippet.tags))
        .bind(&snippet.modification_code)
        .bind(snippet.created_at)
        .bind(snippet.created_at)
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }

    /// Writes only the columns present in `changes` plus `updated_at`. The
    /// modification code is checked again in the same statement.
    pub async fn update_fields(
        &self,
        id: &str,
        modification_code: &str,
        changes: &SnippetChanges,
        updated_at: OffsetDateTime,
    ) -> sqlx::Result<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE snippets SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(title) = &changes.title {
                set.push("title = ").push_bind_unseparated(title.clone());
            }
            if let Some(description) = &changes.description {
                set.push("description = ").push_bind_unseparated(description.clone());
            }
            if let Some(username) = &changes.username {
                set.push("username = ").push_bind_unseparated(username.clone());
            }
            if let Some(language) = &changes.language {
                set.push("language = ").push_bind_unseparated(language.clone());
            }
            if let Some(code) = &changes.code {
                set.push("code = ").push_bind_unseparated(code.clone());
            }
            if let Some(tag_list) = &changes.tags {
                set.push("tags = ").push_bind_unseparated(tags::encode(tag_list));
            }
            set.push("updated_at = ").push_bind_unseparated(updated_at);
        }
        qb.push(" WHERE id = ")
            .push_bind(id.to_owned())
            .push(" AND modification_code = ")
            .push_bind(modification_code.to_owned());

        let result = qb.build().execute(&self.db_pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: &str, modification_code: &str) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM snippets WHERE id = ? AND modification_code = ?")
            .bind(id)
            .bind(modification_code)
            .execute(&self.db_pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn distinct_languages(&self) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT DISTINCT language FROM snippets \
             WHERE language IS NOT NULL AND language <> '' \
             ORDER BY language ASC",
        )
        .fetch_all(&self.db_pool)
        .await
    }

    /// Every tag of every snippet, de-duplicated and sorted.
    pub async fn distinct_tags(&self) -> sqlx::Result<Vec<String>> {
        let mut rows = sqlx::query_scalar::<_, Option<String>>("SELECT tags FROM snippets")
            .fetch(&self.db_pool);

        let mut all = BTreeSet::new();
        while let Some(raw) = rows.try_next().await? {
            all.extend(
                tags::decode_opt(raw.as_deref())
                    .into_iter()
                    .filter(|tag| !tag.is_empty()),
            );
        }
        Ok(all.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, snippets::filter::ListParams};

    async fn repo() -> SnippetRepo {
        SnippetRepo::new(db::connect("sqlite::memory:").await.unwrap())
    }

    fn new_snippet(title: &str, language: &str, tags: &[&str], code: &str) -> NewSnippet {
        NewSnippet {
            id: Uuid::now_v7().to_string(),
            title: title.to_owned(),
            description: None,
            username: "QuietOtter".to_owned(),
            language: language.to_owned(),
            code: "fn main() {}".to_owned(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            modification_code: code.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn insert_and_fetch() {
        let repo = repo().await;
        let snippet = new_snippet("Hello", "rust", &["cli", r#"say "hi""#], "aaaaaaaaaaaa");
        repo.insert(&snippet).await.unwrap();

        let row = repo.get_by_id(&snippet.id).await.unwrap().unwrap();
        assert_eq!(row.title, "Hello");
        assert_eq!(row.tags.as_deref(), Some(r#"{"cli","say \"hi\""}"#));
        assert_eq!(row.created_at, row.updated_at);
        assert_eq!(repo.modification_code(&snippet.id).await.unwrap().as_deref(), Some("aaaaaaaaaaaa"));
        assert!(repo.get_by_id(&Uuid::now_v7().to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_modification_code_is_rejected() {
        let repo = repo().await;
        repo.insert(&new_snippet("a", "rust", &[], "samecodesame")).await.unwrap();
        assert!(repo.insert(&new_snippet("b", "rust", &[], "samecodesame")).await.is_err());
    }

    #[tokio::test]
    async fn filtered_count_and_page_agree() {
        let repo = repo().await;
        repo.insert(&new_snippet("Parse args", "rust", &["cli"], "code00000001")).await.unwrap();
        repo.insert(&new_snippet("Parse json", "python", &["json"], "code00000002")).await.unwrap();
        repo.insert(&new_snippet("Render", "rust", &["javascript"], "code00000003")).await.unwrap();

        let spec = QuerySpec::build(&ListParams {
            search: Some("PARSE".into()),
            ..Default::default()
        });
        assert_eq!(repo.count(&spec).await.unwrap(), 2);
        assert_eq!(repo.page(&spec).await.unwrap().len(), 2);

        let spec = QuerySpec::build(&ListParams {
            language: Some("rust".into()),
            sort_by: Some("title".into()),
            order: Some("asc".into()),
            ..Default::default()
        });
        let titles: Vec<String> = repo.page(&spec).await.unwrap().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, ["Parse args", "Render"]);

        // Case-sensitive language match.
        let spec = QuerySpec::build(&ListParams {
            language: Some("Rust".into()),
            ..Default::default()
        });
        assert_eq!(repo.count(&spec).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_covers_description_and_username() {
        let repo = repo().await;
        let mut described = new_snippet("Untitled", "rust", &[], "code00000001");
        described.description = Some("Reads a TOML manifest".into());
        repo.insert(&described).await.unwrap();

        let mut authored = new_snippet("Untitled", "rust", &[], "code00000002");
        authored.username = "BraveHeron".into();
        repo.insert(&authored).await.unwrap();

        repo.insert(&new_snippet("Untitled", "rust", &[], "code00000003")).await.unwrap();

        for (term, id) in [("toml", &described.id), ("heron", &authored.id)] {
            let spec = QuerySpec::build(&ListParams {
                search: Some(term.into()),
                ..Default::default()
            });
            assert_eq!(repo.count(&spec).await.unwrap(), 1, "{term}");
            let rows = repo.page(&spec).await.unwrap();
            assert_eq!(rows.len(), 1, "{term}");
            assert_eq!(&rows[0].id, id);
        }
    }

    #[tokio::test]
    async fn tag_filter_is_a_substring_match() {
        let repo = repo().await;
        repo.insert(&new_snippet("a", "js", &["javascript"], "code00000001")).await.unwrap();
        repo.insert(&new_snippet("b", "java", &["java"], "code00000002")).await.unwrap();

        // Known limitation: "java" also matches the "javascript" tag.
        let spec = QuerySpec::build(&ListParams {
            tag: Some("java".into()),
            ..Default::default()
        });
        assert_eq!(repo.count(&spec).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn page_respects_limit_and_offset() {
        let repo = repo().await;
        for i in 0..5 {
            repo.insert(&new_snippet(&format!("s{i}"), "rust", &[], &format!("code0000000{i}")))
                .await
                .unwrap();
        }

        let spec = QuerySpec::build(&ListParams {
            sort_by: Some("title".into()),
            order: Some("asc".into()),
            page: Some("2".into()),
            per_page: Some("2".into()),
            ..Default::default()
        });
        let titles: Vec<String> = repo.page(&spec).await.unwrap().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, ["s2", "s3"]);
    }

    #[tokio::test]
    async fn batch_skips_malformed_ids() {
        let repo = repo().await;
        let first = new_snippet("a", "rust", &[], "code00000001");
        let second = new_snippet("b", "rust", &[], "code00000002");
        repo.insert(&first).await.unwrap();
        repo.insert(&second).await.unwrap();

        let never = Uuid::now_v7().to_string();
        let upper = second.id.to_uppercase();
        let rows = repo
            .get_batch(&[first.id.as_str(), "not-a-uuid", upper.as_str(), never.as_str()])
            .await
            .unwrap();
        let mut ids: Vec<String> = rows.into_iter().map(|r| r.id).collect();
        ids.sort();
        let mut expected = vec![first.id, second.id];
        expected.sort();
        assert_eq!(ids, expected);

        assert!(repo.get_batch(&["nope"]).await.unwrap().is_empty());
        assert!(repo.get_batch::<&str>(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_touches_only_given_fields() {
        let repo = repo().await;
        let snippet = new_snippet("Before", "rust", &["x"], "code00000001");
        repo.insert(&snippet).await.unwrap();

        let changes = SnippetChanges {
            title: Some("After".into()),
            description: Some(Some("now described".into())),
            ..Default::default()
        };
        let later = OffsetDateTime::now_utc() + time::Duration::seconds(5);
        let affected = repo.update_fields(&snippet.id, "code00000001", &changes, later).await.unwrap();
        assert_eq!(affected, 1);

        let row = repo.get_by_id(&snippet.id).await.unwrap().unwrap();
        assert_eq!(row.title, "After");
        assert_eq!(row.description.as_deref(), Some("now described"));
        assert_eq!(row.language, "rust");
        assert_eq!(row.tags.as_deref(), Some(r#"{"x"}"#));
        assert!(row.updated_at > row.created_at);
    }

    #[tokio::test]
    async fn update_rechecks_modification_code() {
        let repo = repo().await;
        let snippet = new_snippet("Before", "rust", &[], "code00000001");
        repo.insert(&snippet).await.unwrap();

        let changes = SnippetChanges {
            title: Some("After".into()),
            ..Default::default()
        };
        let affected = repo
            .update_fields(&snippet.id, "wrongcode000", &changes, OffsetDateTime::now_utc())
            .await
            .unwrap();
        assert_eq!(affected, 0);
        assert_eq!(repo.get_by_id(&snippet.id).await.unwrap().unwrap().title, "Before");
    }

    #[tokio::test]
    async fn delete_requires_matching_code() {
        let repo = repo().await;
        let snippet = new_snippet("a", "rust", &[], "code00000001");
        repo.insert(&snippet).await.unwrap();

        assert_eq!(repo.delete(&snippet.id, "code00000002").await.unwrap(), 0);
        assert_eq!(repo.delete(&snippet.id, "code00000001").await.unwrap(), 1);
        assert_eq!(repo.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn distinct_catalogs() {
        let repo = repo().await;
        repo.insert(&new_snippet("a", "rust", &["web", "cli"], "code00000001")).await.unwrap();
        repo.insert(&new_snippet("b", "go", &["cli", "async"], "code00000002")).await.unwrap();
        repo.insert(&new_snippet("c", "rust", &[], "code00000003")).await.unwrap();

        assert_eq!(repo.distinct_languages().await.unwrap(), ["go", "rust"]);
        assert_eq!(repo.distinct_tags().await.unwrap(), ["async", "cli", "web"]);
    }
}
