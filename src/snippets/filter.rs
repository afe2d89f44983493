//! Turns untrusted list parameters into a parameterised query description.
//!
//! Every user supplied value ends up as a bound parameter. The sort column is
//! the only thing spliced into SQL text and it always comes from
//! [`SORTABLE_FIELDS`].

use serde::Deserialize;

pub const SORTABLE_FIELDS: [&str; 5] = ["created_at", "updated_at", "title", "language", "username"];
pub const DEFAULT_SORT_FIELD: &str = "created_at";
pub const DEFAULT_PER_PAGE: i64 = 15;
pub const MAX_PER_PAGE: i64 = 100;

const SEARCH_SQL: &str =
    r"(title LIKE ? ESCAPE '\' OR description LIKE ? ESCAPE '\' OR username LIKE ? ESCAPE '\')";
const LANGUAGE_SQL: &str = "language = ?";
const TAG_SQL: &str = r"tags LIKE ? ESCAPE '\'";

/// Raw query string of `GET /snippets`. Everything stays a string so a bad
/// `page` falls back to its default instead of rejecting the request.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub language: Option<String>,
    pub tag: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

/// One `WHERE` condition. `sql` holds one `?` per entry of `params`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub sql: &'static str,
    pub params: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(order) if order.trim().eq_ignore_ascii_case("asc") => Direction::Asc,
            _ => Direction::Desc,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: &'static str,
    pub direction: Direction,
}

impl SortOrder {
    fn parse(sort_by: Option<&str>, order: Option<&str>) -> Self {
        let field = sort_by
            .map(str::trim)
            .and_then(|requested| {
                SORTABLE_FIELDS
                    .iter()
                    .copied()
                    .find(|field| field.eq_ignore_ascii_case(requested))
            })
            .unwrap_or(DEFAULT_SORT_FIELD);

        Self {
            field,
            direction: Direction::parse(order),
        }
    }

    pub fn to_sql(self) -> String {
        format!("ORDER BY {} {}", self.field, self.direction.as_sql())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub predicates: Vec<Predicate>,
    pub order: SortOrder,
    pub page: i64,
    pub per_page: i64,
}

impl QuerySpec {
    pub fn build(params: &ListParams) -> Self {
        let mut predicates = Vec::new();

        if let Some(term) = non_blank(&params.search) {
            let pattern = contains_pattern(term);
            predicates.push(Predicate {
                sql: SEARCH_SQL,
                params: vec![pattern.clone(), pattern.clone(), pattern],
            });
        }
        if let Some(language) = non_blank(&params.language) {
            predicates.push(Predicate {
                sql: LANGUAGE_SQL,
                params: vec![language.to_owned()],
            });
        }
        // Matches against the encoded tag literal, so "java" also hits "javascript".
        if let Some(tag) = non_blank(&params.tag) {
            predicates.push(Predicate {
                sql: TAG_SQL,
                params: vec![contains_pattern(tag)],
            });
        }

        Self {
            predicates,
            order: SortOrder::parse(params.sort_by.as_deref(), params.order.as_deref()),
            page: parse_int(&params.page).unwrap_or(1).max(1),
            per_page: parse_int(&params.per_page)
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        }
    }

    /// Empty when there are no predicates, otherwise ` WHERE a AND b ...`.
    pub fn where_clause(&self) -> String {
        if self.predicates.is_empty() {
            return String::new();
        }

        let conditions: Vec<&str> = self.predicates.iter().map(|p| p.sql).collect();
        format!(" WHERE {}", conditions.join(" AND "))
    }

    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.predicates
            .iter()
            .flat_map(|p| p.params.iter().map(String::as_str))
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn total_pages(&self, total_items: i64) -> i64 {
        if total_items <= 0 {
            return 0;
        }
        (total_items + self.per_page - 1) / self.per_page
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_int(value: &Option<String>) -> Option<i64> {
    value.as_deref().and_then(|v| v.trim().parse().ok())
}

/// `%term%` with LIKE wildcards in `term` escaped.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        let mut params = ListParams::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "search" => params.search = value,
                "language" => params.language = value,
                "tag" => params.tag = value,
                "sort_by" => params.sort_by = value,
                "order" => params.order = value,
                "page" => params.page = value,
                "per_page" => params.per_page = value,
                other => panic!("unknown param {other}"),
            }
        }
        params
    }

    #[test]
    fn defaults_without_params() {
        let spec = QuerySpec::build(&ListParams::default());
        assert!(spec.predicates.is_empty());
        assert_eq!(spec.where_clause(), "");
        assert_eq!(spec.order.to_sql(), "ORDER BY created_at DESC");
        assert_eq!((spec.page, spec.per_page), (1, DEFAULT_PER_PAGE));
        assert_eq!((spec.limit(), spec.offset()), (15, 0));
    }

    #[test]
    fn pagination_is_clamped() {
        for page in ["-5", "0", "1", "2"] {
            for per_page in ["-1", "0", "1", "100", "101", "1000"] {
                let spec = QuerySpec::build(&params(&[("page", page), ("per_page", per_page)]));
                assert!(spec.page >= 1, "page {page} -> {}", spec.page);
                assert!((1..=MAX_PER_PAGE).contains(&spec.per_page), "per_page {per_page} -> {}", spec.per_page);
            }
        }

        let spec = QuerySpec::build(&params(&[("page", "3"), ("per_page", "1000")]));
        assert_eq!((spec.per_page, spec.offset()), (100, 200));

        let spec = QuerySpec::build(&params(&[("page", "two"), ("per_page", "lots")]));
        assert_eq!((spec.page, spec.per_page), (1, DEFAULT_PER_PAGE));
    }

    #[test]
    fn huge_page_does_not_overflow() {
        let spec = QuerySpec::build(&params(&[("page", &i64::MAX.to_string())]));
        assert_eq!(spec.offset(), i64::MAX);
    }

    #[test]
    fn sort_field_is_allow_listed() {
        let spec = QuerySpec::build(&params(&[("sort_by", "DROP TABLE x"), ("order", "DESC; --")]));
        assert_eq!(spec.order.to_sql(), "ORDER BY created_at DESC");

        let spec = QuerySpec::build(&params(&[("sort_by", "Title"), ("order", "ASC")]));
        assert_eq!(spec.order.to_sql(), "ORDER BY title ASC");

        let spec = QuerySpec::build(&params(&[("sort_by", "username"), ("order", "upwards")]));
        assert_eq!(spec.order.to_sql(), "ORDER BY username DESC");
    }

    #[test]
    fn user_input_never_reaches_sql_text() {
        let hostile = "'; DROP TABLE snippets; --";
        let spec = QuerySpec::build(&params(&[
            ("search", hostile),
            ("language", hostile),
            ("tag", hostile),
            ("sort_by", hostile),
            ("order", hostile),
        ]));

        let sql = format!("{} {}", spec.where_clause(), spec.order.to_sql());
        assert!(!sql.contains("DROP"));
        assert_eq!(spec.params().count(), 5);
        assert!(spec.params().all(|p| p.contains("DROP TABLE")));
    }

    #[test]
    fn search_binds_one_pattern_for_three_columns() {
        let spec = QuerySpec::build(&params(&[("search", "  hello  ")]));
        assert_eq!(spec.predicates.len(), 1);
        assert_eq!(spec.predicates[0].params, ["%hello%", "%hello%", "%hello%"]);
        assert_eq!(spec.where_clause().matches('?').count(), 3);
    }

    #[test]
    fn predicates_combine_with_and() {
        let spec = QuerySpec::build(&params(&[("search", "x"), ("language", " rust "), ("tag", "cli")]));
        assert_eq!(
            spec.where_clause(),
            format!(" WHERE {SEARCH_SQL} AND {LANGUAGE_SQL} AND {TAG_SQL}")
        );
        assert_eq!(spec.params().collect::<Vec<_>>(), ["%x%", "%x%", "%x%", "rust", "%cli%"]);
    }

    #[test]
    fn blank_filters_are_ignored() {
        let spec = QuerySpec::build(&params(&[("search", "   "), ("language", ""), ("tag", " ")]));
        assert!(spec.predicates.is_empty());
        assert_eq!(spec.where_clause(), "");
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(contains_pattern("100%_done\\"), r"%100\%\_done\\%");
    }

    #[test]
    fn total_pages_rounds_up() {
        let spec = QuerySpec::build(&params(&[("per_page", "10")]));
        assert_eq!(spec.total_pages(0), 0);
        assert_eq!(spec.total_pages(1), 1);
        assert_eq!(spec.total_pages(10), 1);
        assert_eq!(spec.total_pages(11), 2);
    }
}
