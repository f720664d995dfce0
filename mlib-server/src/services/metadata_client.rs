//! Song metadata provider client
//!
//! Looks up release date, lyrics and link for a `(group, song)` pair from the
//! external info service: `GET {base}/info?group=..&song=..`.

use async_trait::async_trait;
use chrono::NaiveDate;
use mlib_common::db::NewSong;
use mlib_common::time::optional_date;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("mlib-server/", env!("CARGO_PKG_VERSION"));

/// Metadata provider errors
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Provider rejected the lookup (HTTP 400)
    #[error("Metadata provider rejected request: {0}")]
    BadRequest(String),

    #[error("Metadata provider error {0}: {1}")]
    Upstream(u16, String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Details returned by the provider
///
/// `group` and `song` are present when the provider reports canonical names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongDetails {
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default, rename = "releaseDate", with = "optional_date")]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl SongDetails {
    /// Merge the provider's details into an insertable song
    ///
    /// Canonical names from the provider win over the requested ones unless
    /// they are blank.
    pub fn into_new_song(self, group: &str, song: &str) -> NewSong {
        NewSong {
            group: non_blank(self.group).unwrap_or_else(|| group.trim().to_string()),
            song: non_blank(self.song).unwrap_or_else(|| song.trim().to_string()),
            release_date: self.release_date,
            text: self.text,
            link: non_blank(self.link),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Source of song metadata used when adding songs
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn song_details(&self, group: &str, song: &str) -> Result<SongDetails, MetadataError>;
}

/// HTTP client for the external info service
pub struct HttpMetadataClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpMetadataClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MetadataError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| MetadataError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn info_url(&self) -> String {
        format!("{}/info", self.base_url)
    }
}

#[async_trait]
impl MetadataProvider for HttpMetadataClient {
    async fn song_details(&self, group: &str, song: &str) -> Result<SongDetails, MetadataError> {
        let url = self.info_url();
        tracing::debug!(group = %group, song = %song, url = %url, "Querying metadata provider");

        let response = self
            .http_client
            .get(&url)
            .query(&[("group", group), ("song", song)])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Metadata request failed: {}", e);
                MetadataError::Network(e.to_string())
            })?;

        let status = response.status();
        tracing::info!(status = status.as_u16(), "Metadata provider responded");

        if status == reqwest::StatusCode::BAD_REQUEST {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(group = %group, song = %song, "Metadata provider returned 400");
            return Err(MetadataError::BadRequest(error_text));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "Metadata provider returned an unexpected status");
            return Err(MetadataError::Upstream(status.as_u16(), error_text));
        }

        let details: SongDetails = response
            .json()
            .await
            .map_err(|e| MetadataError::Parse(e.to_string()))?;

        tracing::info!(
            group = %group,
            song = %song,
            release_date = ?details.release_date,
            has_text = details.text.is_some(),
            "Retrieved song details"
        );

        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HttpMetadataClient::new("http://127.0.0.1:8081/", Duration::from_secs(5));
        assert!(client.is_ok());
        assert_eq!(client.unwrap().info_url(), "http://127.0.0.1:8081/info");
    }

    #[test]
    fn test_details_accept_provider_date_format() {
        let details: SongDetails = serde_json::from_str(
            r#"{"releaseDate": "16.07.2006", "text": "Ooh baby", "link": "https://example.com"}"#,
        )
        .unwrap();
        assert_eq!(details.release_date, NaiveDate::from_ymd_opt(2006, 7, 16));
        assert_eq!(details.group, None);
    }

    #[test]
    fn test_bad_date_is_parse_error() {
        let result: Result<SongDetails, _> = serde_json::from_str(r#"{"releaseDate": "July 2006"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_canonical_names_override_request() {
        let details = SongDetails {
            group: Some("Muse".to_string()),
            song: Some("  ".to_string()),
            ..Default::default()
        };
        let song = details.into_new_song("muse", " Supermassive Black Hole ");
        assert_eq!(song.group, "Muse");
        assert_eq!(song.song, "Supermassive Black Hole");
    }

    #[test]
    fn test_blank_link_dropped() {
        let details = SongDetails {
            link: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(details.into_new_song("Muse", "Uprising").link, None);
    }
}
