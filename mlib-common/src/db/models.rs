//! Catalog models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::time::optional_date;

/// Group (artist) row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

/// Song as served to clients, with the group name resolved through the join
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub group: String,
    pub song: String,
    #[serde(default, rename = "releaseDate", with = "optional_date")]
    pub release_date: Option<NaiveDate>,
    pub text: Option<String>,
    pub link: Option<String>,
}

/// Fully enriched song ready for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSong {
    pub group: String,
    pub song: String,
    pub release_date: Option<NaiveDate>,
    pub text: Option<String>,
    pub link: Option<String>,
}

/// Sparse set of field changes for an existing song
///
/// `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongChanges {
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

impl SongChanges {
    /// True when the request changes nothing
    pub fn is_empty(&self) -> bool {
        self.group.is_none()
            && self.song.is_none()
            && self.release_date.is_none()
            && self.text.is_none()
            && self.link.is_none()
    }
}
