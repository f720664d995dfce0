//! Catalog repository
//!
//! Owns transaction lifetime for every catalog mutation. Each mutation runs
//! in exactly one transaction; any `?` exit drops the uncommitted
//! transaction, which rolls it back.

use mlib_common::db::{fold_key, Group, NewSong, Song, SongChanges};
use mlib_common::PageRequest;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::query::Query;
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::{debug, error, info};

use super::error::{storage, CatalogError, CatalogResult};
use super::filter::{build_list_query, FilterSet, QueryArg};
use super::reconcile::{reconcile_group, GroupChange};

/// Song columns an edit may touch besides the group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SongField {
    Name,
    ReleaseDate,
    Text,
    Link,
}

impl SongField {
    /// `SET` fragment; a second placeholder takes the folded `_key` value
    fn assignment(self) -> &'static str {
        match self {
            SongField::Name => "song_name = ?, song_key = ?",
            SongField::ReleaseDate => "release_date = ?",
            SongField::Text => "text = ?, text_key = ?",
            SongField::Link => "link = ?",
        }
    }

    fn has_key(self) -> bool {
        matches!(self, SongField::Name | SongField::Text)
    }
}

/// Result of a song deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub group_id: i64,
    /// The song was the group's last one, so the group row went too
    pub group_removed: bool,
}

/// Result of a song edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOutcome {
    pub group_change: Option<GroupChange>,
    pub fields_updated: usize,
}

impl EditOutcome {
    fn noop() -> Self {
        Self {
            group_change: None,
            fields_updated: 0,
        }
    }
}

/// Transactional access to the songs/groups catalog
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// List songs matching `filters`, one page at a time
    ///
    /// No match is an empty page, not an error.
    pub async fn list(&self, filters: &FilterSet, page: PageRequest) -> CatalogResult<Vec<Song>> {
        let query = build_list_query(filters, page);
        debug!(sql = %query.sql, args = ?query.args, "Listing songs");

        let rows = bind_args(sqlx::query(&query.sql), query.args)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Song listing failed: {}", e);
                storage("list songs: query")(e)
            })?;

        let songs = rows
            .iter()
            .map(song_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage("list songs: decode row"))?;

        info!(count = songs.len(), page = page.page, limit = page.limit, "Fetched songs");
        Ok(songs)
    }

    /// Fetch one song with its group name
    pub async fn get(&self, id: i64) -> CatalogResult<Song> {
        let row = sqlx::query(
            "SELECT s.id, g.group_name, s.song_name, s.release_date, s.text, s.link \
             FROM songs AS s JOIN groups AS g ON s.group_id = g.id \
             WHERE s.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage("get song: query"))?
        .ok_or(CatalogError::SongNotFound(id))?;

        song_from_row(&row).map_err(storage("get song: decode row"))
    }

    /// All groups in id order
    pub async fn groups(&self) -> CatalogResult<Vec<Group>> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, group_name FROM groups ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage("list groups: query"))?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| Group { id, name })
            .collect())
    }

    /// Raw lyrics body of one song (`None` when the song has no text)
    pub async fn fetch_text(&self, id: i64) -> CatalogResult<Option<String>> {
        let text: Option<String> = sqlx::query_scalar("SELECT text FROM songs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("fetch text: query"))?
            .ok_or(CatalogError::SongNotFound(id))?;

        debug!(song_id = id, has_text = text.is_some(), "Fetched song text");
        Ok(text)
    }

    /// Insert an enriched song, creating its group on first use
    pub async fn add(&self, song: &NewSong) -> CatalogResult<Song> {
        let group = required("group", &song.group)?;
        let name = required("song", &song.song)?;

        let mut tx = self.pool.begin().await.map_err(storage("add song: begin"))?;

        let group_key = fold_key(group);

        sqlx::query(
            "INSERT INTO groups (group_name, group_key) VALUES (?, ?) ON CONFLICT(group_key) DO NOTHING",
        )
        .bind(group)
        .bind(&group_key)
        .execute(&mut *tx)
        .await
        .map_err(storage("add song: insert group"))?;

        // Resolves an existing case variant too; its spelling wins
        let (group_id, group_name): (i64, String) =
            sqlx::query_as("SELECT id, group_name FROM groups WHERE group_key = ?")
                .bind(&group_key)
                .fetch_one(&mut *tx)
                .await
                .map_err(storage("add song: resolve group id"))?;
        debug!(group_id, group = %group_name, "Group resolved for new song");

        let song_id: i64 = sqlx::query_scalar(
            "INSERT INTO songs (group_id, song_name, song_key, release_date, text, text_key, link) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(group_id)
        .bind(name)
        .bind(fold_key(name))
        .bind(song.release_date)
        .bind(&song.text)
        .bind(song.text.as_deref().map(fold_key))
        .bind(&song.link)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage("add song: insert song"))?;

        tx.commit().await.map_err(storage("add song: commit"))?;

        info!(song_id, group_id, "Added song '{}' by '{}'", name, group_name);
        Ok(Song {
            id: song_id,
            group: group_name,
            song: name.to_string(),
            release_date: song.release_date,
            text: song.text.clone(),
            link: song.link.clone(),
        })
    }

    /// Apply `changes` to a song, reconciling its group first
    ///
    /// An empty change set succeeds without touching the store.
    pub async fn edit(&self, id: i64, changes: &SongChanges) -> CatalogResult<EditOutcome> {
        if changes.is_empty() {
            info!(song_id = id, "Edit with no changes");
            return Ok(EditOutcome::noop());
        }
        if let Some(name) = &changes.song {
            required("song", name)?;
        }

        let mut tx = self.pool.begin().await.map_err(storage("edit song: begin"))?;

        let group_change = match &changes.group {
            Some(group) => Some(reconcile_group(&mut tx, id, group).await?),
            None => None,
        };

        let (assignments, args) = field_updates(changes);
        let fields_updated = assignments.len();

        if fields_updated > 0 {
            let sql = format!("UPDATE songs SET {} WHERE id = ?", assignments.join(", "));
            debug!(song_id = id, sql = %sql, "Updating song fields");

            let result = bind_args(sqlx::query(&sql), args)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(storage("edit song: update fields"))?;

            if result.rows_affected() == 0 {
                return Err(CatalogError::SongNotFound(id));
            }
        }

        tx.commit().await.map_err(storage("edit song: commit"))?;

        info!(song_id = id, ?group_change, fields_updated, "Edited song");
        Ok(EditOutcome {
            group_change,
            fields_updated,
        })
    }

    /// Delete a song, and its group when no other song references it
    pub async fn delete(&self, id: i64) -> CatalogResult<DeleteOutcome> {
        let mut tx = self.pool.begin().await.map_err(storage("delete song: begin"))?;

        let group_id: i64 = sqlx::query_scalar("SELECT group_id FROM songs WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage("delete song: look up group"))?
            .ok_or(CatalogError::SongNotFound(id))?;
        debug!(song_id = id, group_id, "Retrieved group for song");

        sqlx::query("DELETE FROM songs WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage("delete song: delete song"))?;

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE group_id = ?")
            .bind(group_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(storage("delete song: count group songs"))?;

        let group_removed = remaining == 0;
        if group_removed {
            sqlx::query("DELETE FROM groups WHERE id = ?")
                .bind(group_id)
                .execute(&mut *tx)
                .await
                .map_err(storage("delete song: delete group"))?;
            debug!(group_id, "Deleted emptied group");
        }

        tx.commit().await.map_err(storage("delete song: commit"))?;

        info!(song_id = id, group_id, group_removed, "Deleted song");
        Ok(DeleteOutcome {
            group_id,
            group_removed,
        })
    }
}

/// Trimmed, non-empty value or `InvalidInput`
fn required<'a>(field: &str, value: &'a str) -> CatalogResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(trimmed)
}

/// One `SET` fragment per non-group field present in `changes`, with its arguments
fn field_updates(changes: &SongChanges) -> (Vec<&'static str>, Vec<QueryArg>) {
    let mut fields = Vec::new();
    if let Some(name) = &changes.song {
        fields.push((SongField::Name, QueryArg::Text(name.trim().to_string())));
    }
    if let Some(date) = changes.release_date {
        fields.push((SongField::ReleaseDate, QueryArg::Date(date)));
    }
    if let Some(text) = &changes.text {
        fields.push((SongField::Text, QueryArg::Text(text.clone())));
    }
    if let Some(link) = &changes.link {
        fields.push((SongField::Link, QueryArg::Text(link.clone())));
    }

    let mut assignments = Vec::with_capacity(fields.len());
    let mut args = Vec::with_capacity(fields.len() * 2);
    for (field, arg) in fields {
        assignments.push(field.assignment());
        let key = match (&arg, field.has_key()) {
            (QueryArg::Text(value), true) => Some(QueryArg::Text(fold_key(value))),
            _ => None,
        };
        args.push(arg);
        args.extend(key);
    }

    (assignments, args)
}

fn bind_args<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    args: Vec<QueryArg>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for arg in args {
        query = match arg {
            QueryArg::Int(v) => query.bind(v),
            QueryArg::Text(v) => query.bind(v),
            QueryArg::Date(v) => query.bind(v),
        };
    }
    query
}

fn song_from_row(row: &SqliteRow) -> Result<Song, sqlx::Error> {
    Ok(Song {
        id: row.try_get(0)?,
        group: row.try_get(1)?,
        song: row.try_get(2)?,
        release_date: row.try_get(3)?,
        text: row.try_get(4)?,
        link: row.try_get(5)?,
    })
}
