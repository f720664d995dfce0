//! Catalog error taxonomy

use thiserror::Error;

/// Catalog operation errors
///
/// Storage and conflict errors carry the tag of the step that failed.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Malformed caller input (client fault, never retried)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Referenced song does not exist
    #[error("Song {0} not found")]
    SongNotFound(i64),

    /// Concurrent writer or uniqueness collision; the transaction was rolled back
    #[error("Conflict during {op}: {message}")]
    Conflict { op: &'static str, message: String },

    /// Store or connectivity failure
    #[error("{op}: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl CatalogError {
    /// Whether a caller may retry the whole operation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CatalogError::Storage { .. } | CatalogError::Conflict { .. }
        )
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Tag a storage error with the operation that produced it
///
/// Unique violations and SQLite busy/locked results mean another writer got
/// there first; those become `Conflict`.
pub(crate) fn storage(op: &'static str) -> impl FnOnce(sqlx::Error) -> CatalogError {
    move |source| {
        if let sqlx::Error::Database(db_err) = &source {
            if db_err.is_unique_violation() {
                return CatalogError::Conflict {
                    op,
                    message: db_err.message().to_string(),
                };
            }
            if db_err.code().as_deref().is_some_and(is_busy_code) {
                return CatalogError::Conflict {
                    op,
                    message: db_err.message().to_string(),
                };
            }
        }
        CatalogError::Storage { op, source }
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes such as
/// SQLITE_BUSY_SNAPSHOT (517)
fn is_busy_code(code: &str) -> bool {
    code.parse::<i32>()
        .map(|c| matches!(c & 0xff, 5 | 6))
        .unwrap_or(false)
}
