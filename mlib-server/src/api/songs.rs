//! Song catalog endpoints
//!
//! - `GET /songs`: filtered, paginated listing
//! - `GET /songs/:id`: paginated verses of one song
//! - `POST /songs`: add a song, enriched through the metadata provider
//! - `PUT /songs/:id`: edit a song
//! - `DELETE /songs/:id`: delete a song

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use mlib_common::db::{Song, SongChanges};
use mlib_common::pagination::PageQuery;
use mlib_common::time::parse_release_date;
use mlib_common::PageRequest;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{FilterColumn, FilterSet, QueryArg};
use crate::error::{ApiError, ApiResult};
use crate::verses::paginate_verses;
use crate::AppState;

/// Query parameters for `GET /songs`
///
/// Empty values are treated as absent.
#[derive(Debug, Default, Deserialize)]
pub struct SongListQuery {
    pub id: Option<i64>,
    pub group: Option<String>,
    pub song: Option<String>,
    #[serde(rename = "releaseDate")]
    pub release_date: Option<String>,
    pub text: Option<String>,
    pub link: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl SongListQuery {
    /// Collect the present filters into a `FilterSet`
    pub fn filters(&self) -> ApiResult<FilterSet> {
        let mut filters = FilterSet::new();

        if let Some(id) = self.id {
            filters.insert(FilterColumn::Id, QueryArg::Int(id));
        }
        if let Some(raw) = present(&self.release_date) {
            let date = parse_release_date(raw)
                .map_err(|e| ApiError::BadRequest(format!("invalid releaseDate '{}': {}", raw, e)))?;
            if let Some(date) = date {
                filters.insert(FilterColumn::ReleaseDate, QueryArg::Date(date));
            }
        }

        let text_filters = [
            (FilterColumn::Group, &self.group),
            (FilterColumn::Song, &self.song),
            (FilterColumn::Text, &self.text),
            (FilterColumn::Link, &self.link),
        ];
        for (column, value) in text_filters {
            if let Some(value) = present(value) {
                filters.insert(column, QueryArg::Text(value.to_string()));
            }
        }

        Ok(filters)
    }

    pub fn page(&self) -> PageRequest {
        PageRequest::normalize(self.page, self.limit)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Body of `POST /songs`
#[derive(Debug, Deserialize)]
pub struct AddSongRequest {
    pub group: String,
    pub song: String,
}

/// Success body for mutations
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song: Option<Song>,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            song: None,
        }
    }
}

fn song_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    let Path(id) = path.map_err(|e| {
        warn!("Invalid song ID: {}", e);
        ApiError::BadRequest(format!("invalid song id: {}", e.body_text()))
    })?;
    Ok(id)
}

/// GET /songs
pub async fn list_songs(
    State(state): State<AppState>,
    query: Result<Query<SongListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Song>>> {
    let Query(query) = query.map_err(|e| {
        warn!("Failed to parse query parameters: {}", e);
        ApiError::BadRequest(e.body_text())
    })?;
    debug!(?query, "Listing songs");

    let filters = query.filters()?;
    let songs = state.repo.list(&filters, query.page()).await?;
    Ok(Json(songs))
}

/// GET /songs/:id
///
/// Returns one page of the song's verses.
pub async fn get_song_text(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<String>>> {
    let id = song_id(path)?;
    let Query(query) = query.map_err(|e| {
        warn!("Invalid page parameters: {}", e);
        ApiError::BadRequest(e.body_text())
    })?;
    let page = PageRequest::from(query);
    debug!(song_id = id, page = page.page, limit = page.limit, "Fetching song text");

    let text = state.repo.fetch_text(id).await?;
    let verses = paginate_verses(text.as_deref(), page)?;

    info!(song_id = id, count = verses.len(), "Fetched verses");
    Ok(Json(verses))
}

/// POST /songs
pub async fn add_song(
    State(state): State<AppState>,
    body: Result<Json<AddSongRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = body.map_err(|e| {
        warn!("Failed to parse new song: {}", e);
        ApiError::BadRequest(e.body_text())
    })?;

    let group = request.group.trim();
    let name = request.song.trim();
    if group.is_empty() || name.is_empty() {
        return Err(ApiError::BadRequest("group and song must not be empty".to_string()));
    }

    debug!(group = %group, song = %name, "Enriching new song");
    let details = state.metadata.song_details(group, name).await?;
    let new_song = details.into_new_song(group, name);

    let song = state.repo.add(&new_song).await?;
    info!(song_id = song.id, "Song added");

    Ok(Json(MessageResponse {
        message: "Song added successfully".to_string(),
        song: Some(song),
    }))
}

/// PUT /songs/:id
pub async fn edit_song(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<SongChanges>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let id = song_id(path)?;
    let Json(changes) = body.map_err(|e| {
        warn!("Failed to parse edit request: {}", e);
        ApiError::BadRequest(e.body_text())
    })?;

    let outcome = state.repo.edit(id, &changes).await?;
    info!(song_id = id, ?outcome, "Song edited");

    Ok(Json(MessageResponse::new("Song edited successfully")))
}

/// DELETE /songs/:id
pub async fn delete_song(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let id = song_id(path)?;

    let outcome = state.repo.delete(id).await?;
    info!(song_id = id, ?outcome, "Song deleted");

    Ok(Json(MessageResponse::new("Song deleted successfully")))
}

/// Build song routes
pub fn song_routes() -> Router<AppState> {
    Router::new()
        .route("/songs", get(list_songs).post(add_song))
        .route(
            "/songs/:id",
            get(get_song_text).put(edit_song).delete(delete_song),
        )
}
