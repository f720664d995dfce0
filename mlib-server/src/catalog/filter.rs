//! Filtered, paginated catalog queries
//!
//! Filterable columns are a closed enum; only their static column names ever
//! reach the SQL text. Caller values travel as bound parameters.
//!
//! Substring filters compare the folded `_key` columns against a folded
//! pattern, so matching ignores case for any script.

use chrono::NaiveDate;
use mlib_common::db::fold_key;
use mlib_common::PageRequest;
use std::collections::BTreeMap;

const LIST_SELECT: &str = "SELECT s.id, g.group_name, s.song_name, s.release_date, s.text, s.link \
     FROM songs AS s \
     JOIN groups AS g ON s.group_id = g.id";

/// Columns a catalog listing can be filtered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterColumn {
    Id,
    Group,
    Song,
    ReleaseDate,
    Text,
    Link,
}

/// How a predicate compares its column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Matching {
    /// Case-insensitive substring (`LIKE '%value%'` on the folded key)
    Substring,
    /// Exact equality
    Exact,
}

impl FilterColumn {
    /// Qualified column name in the songs/groups join
    pub fn column(self) -> &'static str {
        match self {
            FilterColumn::Id => "s.id",
            FilterColumn::Group => "g.group_name",
            FilterColumn::Song => "s.song_name",
            FilterColumn::ReleaseDate => "s.release_date",
            FilterColumn::Text => "s.text",
            FilterColumn::Link => "s.link",
        }
    }

    /// Folded shadow column used for substring matching
    fn key_column(self) -> Option<&'static str> {
        match self {
            FilterColumn::Group => Some("g.group_key"),
            FilterColumn::Song => Some("s.song_key"),
            FilterColumn::Text => Some("s.text_key"),
            FilterColumn::Id | FilterColumn::ReleaseDate | FilterColumn::Link => None,
        }
    }

    pub(crate) fn matching(self) -> Matching {
        match self.key_column() {
            Some(_) => Matching::Substring,
            None => Matching::Exact,
        }
    }
}

/// Positional query argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryArg {
    Int(i64),
    Text(String),
    Date(NaiveDate),
}

/// Ordered column → value predicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    predicates: BTreeMap<FilterColumn, QueryArg>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the predicate on `column`
    pub fn insert(&mut self, column: FilterColumn, value: QueryArg) -> &mut Self {
        self.predicates.insert(column, value);
        self
    }

    pub fn with(mut self, column: FilterColumn, value: QueryArg) -> Self {
        self.insert(column, value);
        self
    }

    pub(crate) fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterColumn, &QueryArg)> {
        self.predicates.iter().map(|(column, value)| (*column, value))
    }
}

/// SQL text plus its positional arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub sql: String,
    pub args: Vec<QueryArg>,
}

/// Build the filtered, paginated listing query
///
/// Rows come back in song id order so pages stay stable between calls.
/// `LIMIT` and `OFFSET` are always the last two arguments.
pub fn build_list_query(filters: &FilterSet, page: PageRequest) -> ListQuery {
    let mut sql = String::from(LIST_SELECT);
    let mut args = Vec::with_capacity(filters.len() + 2);

    for (i, (column, value)) in filters.iter().enumerate() {
        sql.push_str(if i == 0 { " WHERE " } else { " AND " });
        match (column.matching(), column.key_column(), value) {
            (Matching::Substring, Some(key), QueryArg::Text(raw)) => {
                sql.push_str(key);
                sql.push_str(" LIKE ? ESCAPE '\\'");
                args.push(substring_pattern(raw));
            }
            // Non-text values on a text column compare exactly
            _ => {
                sql.push_str(column.column());
                sql.push_str(" = ?");
                args.push(value.clone());
            }
        }
    }

    sql.push_str(" ORDER BY s.id LIMIT ? OFFSET ?");
    args.push(QueryArg::Int(page.limit));
    args.push(QueryArg::Int(page.offset()));

    ListQuery { sql, args }
}

/// Fold `raw` and wrap it as `%value%`, escaping LIKE wildcards so they match literally
fn substring_pattern(raw: &str) -> QueryArg {
    let raw = fold_key(raw);

    let mut pattern = String::with_capacity(raw.len() + 2);
    pattern.push('%');
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');

    QueryArg::Text(pattern)
}
