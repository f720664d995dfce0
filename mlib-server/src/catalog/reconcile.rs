//! Group reconciliation for song group changes
//!
//! Moves one song to a new group name while keeping every group row
//! referenced by at least one song and group names unique (ignoring case).
//! Runs inside the caller's transaction and never commits or rolls back.

use mlib_common::db::fold_key;
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};

use super::error::{storage, CatalogError, CatalogResult};

/// Group-table effect of a reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupChange {
    /// Song already belongs to the target group; nothing was written
    Unchanged { group_id: i64 },
    /// Song moved to an existing group; `removed_old` when its old group was left empty and deleted
    Reassigned { from: i64, to: i64, removed_old: bool },
    /// Song's exclusive group was renamed in place
    Renamed { group_id: i64 },
    /// Song left a shared group for a newly created one
    Created { from: i64, to: i64 },
}

impl GroupChange {
    /// Group the song references afterwards
    pub fn group_id(&self) -> i64 {
        match *self {
            GroupChange::Unchanged { group_id } | GroupChange::Renamed { group_id } => group_id,
            GroupChange::Reassigned { to, .. } | GroupChange::Created { to, .. } => to,
        }
    }

    /// Whether any group row was inserted, renamed, or deleted
    pub fn mutated_groups(&self) -> bool {
        match *self {
            GroupChange::Unchanged { .. } => false,
            GroupChange::Reassigned { removed_old, .. } => removed_old,
            GroupChange::Renamed { .. } | GroupChange::Created { .. } => true,
        }
    }
}

/// Point `song_id` at the group named `target`
///
/// Branches:
/// - target exists and is already the song's group: no-op
/// - target exists: reassign, then delete the old group if this song was its last
/// - target missing, old group exclusive to this song: rename the old group
/// - target missing, old group shared: create the target group and reassign
///
/// A concurrent writer that creates the same name first makes the rename or
/// insert fail the unique constraint, reported as `Conflict`.
pub async fn reconcile_group(
    tx: &mut Transaction<'_, Sqlite>,
    song_id: i64,
    target: &str,
) -> CatalogResult<GroupChange> {
    let target = target.trim();
    if target.is_empty() {
        return Err(CatalogError::InvalidInput("group name must not be empty".into()));
    }

    let target_key = fold_key(target);

    let target_id: Option<i64> = sqlx::query_scalar("SELECT id FROM groups WHERE group_key = ?")
        .bind(&target_key)
        .fetch_optional(&mut **tx)
        .await
        .map_err(storage("reconcile: look up target group"))?;
    debug!(song_id, target, ?target_id, "Target group lookup");

    let old_id: i64 = sqlx::query_scalar("SELECT group_id FROM songs WHERE id = ?")
        .bind(song_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(storage("reconcile: look up current group"))?
        .ok_or(CatalogError::SongNotFound(song_id))?;

    let old_song_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE group_id = ?")
        .bind(old_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(storage("reconcile: count songs in current group"))?;
    debug!(song_id, old_id, old_song_count, "Current group resolved");

    let exclusive = old_song_count == 1;

    let change = match target_id {
        Some(to) if to == old_id => GroupChange::Unchanged { group_id: old_id },
        Some(to) => {
            assign_song(tx, song_id, to, "reconcile: reassign song to existing group").await?;

            if exclusive {
                sqlx::query("DELETE FROM groups WHERE id = ?")
                    .bind(old_id)
                    .execute(&mut **tx)
                    .await
                    .map_err(storage("reconcile: delete emptied group"))?;
            }

            GroupChange::Reassigned {
                from: old_id,
                to,
                removed_old: exclusive,
            }
        }
        None if exclusive => {
            sqlx::query("UPDATE groups SET group_name = ?, group_key = ? WHERE id = ?")
                .bind(target)
                .bind(&target_key)
                .bind(old_id)
                .execute(&mut **tx)
                .await
                .map_err(storage("reconcile: rename exclusive group"))?;

            GroupChange::Renamed { group_id: old_id }
        }
        None => {
            let to: i64 = sqlx::query_scalar(
                "INSERT INTO groups (group_name, group_key) VALUES (?, ?) RETURNING id",
            )
            .bind(target)
            .bind(&target_key)
            .fetch_one(&mut **tx)
            .await
            .map_err(storage("reconcile: insert new group"))?;

            assign_song(tx, song_id, to, "reconcile: reassign song to new group").await?;

            GroupChange::Created { from: old_id, to }
        }
    };

    info!(song_id, target, ?change, "Group reconciled");
    Ok(change)
}

async fn assign_song(
    tx: &mut Transaction<'_, Sqlite>,
    song_id: i64,
    group_id: i64,
    op: &'static str,
) -> CatalogResult<()> {
    sqlx::query("UPDATE songs SET group_id = ? WHERE id = ?")
        .bind(group_id)
        .bind(song_id)
        .execute(&mut **tx)
        .await
        .map_err(storage(op))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlib_common::db::init_in_memory_database;
    use sqlx::SqlitePool;

    async fn seed(pool: &SqlitePool, group: &str, song: &str) -> (i64, i64) {
        sqlx::query(
            "INSERT INTO groups (group_name, group_key) VALUES (?, ?) ON CONFLICT(group_key) DO NOTHING",
        )
        .bind(group)
        .bind(fold_key(group))
        .execute(pool)
        .await
        .unwrap();
        let group_id: i64 = sqlx::query_scalar("SELECT id FROM groups WHERE group_key = ?")
            .bind(fold_key(group))
            .fetch_one(pool)
            .await
            .unwrap();
        let song_id: i64 = sqlx::query_scalar(
            "INSERT INTO songs (group_id, song_name, song_key) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(group_id)
        .bind(song)
        .bind(fold_key(song))
        .fetch_one(pool)
        .await
        .unwrap();
        (group_id, song_id)
    }

    async fn group_names(pool: &SqlitePool) -> Vec<String> {
        sqlx::query_scalar("SELECT group_name FROM groups ORDER BY id")
            .fetch_all(pool)
            .await
            .unwrap()
    }

    async fn song_group(pool: &SqlitePool, song_id: i64) -> i64 {
        sqlx::query_scalar("SELECT group_id FROM songs WHERE id = ?")
            .bind(song_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_case_variant_of_current_group_is_noop() {
        let pool = init_in_memory_database().await.unwrap();
        let (queen, song) = seed(&pool, "Queen", "Bohemian Rhapsody").await;

        let mut tx = pool.begin().await.unwrap();
        let change = reconcile_group(&mut tx, song, "queen").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(change, GroupChange::Unchanged { group_id: queen });
        assert!(!change.mutated_groups());
        assert_eq!(group_names(&pool).await, vec!["Queen"]);
        assert_eq!(song_group(&pool, song).await, queen);
    }

    #[tokio::test]
    async fn test_non_ascii_case_variant_is_noop() {
        let pool = init_in_memory_database().await.unwrap();
        let (troll, song) = seed(&pool, "Мумий Тролль", "Владивосток 2000").await;

        let mut tx = pool.begin().await.unwrap();
        let change = reconcile_group(&mut tx, song, "мумий тролль").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(change, GroupChange::Unchanged { group_id: troll });
        assert_eq!(group_names(&pool).await, vec!["Мумий Тролль"]);
    }

    #[tokio::test]
    async fn test_rename_to_non_ascii_variant_of_other_group_reassigns() {
        let pool = init_in_memory_database().await.unwrap();
        let (_, song) = seed(&pool, "Toten Hosen", "Tage wie diese").await;
        let (arzte, _) = seed(&pool, "Ärzte", "Schrei nach Liebe").await;

        let mut tx = pool.begin().await.unwrap();
        let change = reconcile_group(&mut tx, song, "ÄRZTE").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(change.group_id(), arzte);
        assert!(matches!(change, GroupChange::Reassigned { removed_old: true, .. }));
        assert_eq!(group_names(&pool).await, vec!["Ärzte"]);
    }

    #[tokio::test]
    async fn test_exclusive_group_moves_to_existing_and_is_removed() {
        let pool = init_in_memory_database().await.unwrap();
        let (oasis, song) = seed(&pool, "Oasis", "Wonderwall").await;
        let (blur, _) = seed(&pool, "Blur", "Song 2").await;

        let mut tx = pool.begin().await.unwrap();
        let change = reconcile_group(&mut tx, song, "Blur").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            change,
            GroupChange::Reassigned {
                from: oasis,
                to: blur,
                removed_old: true
            }
        );
        assert_eq!(group_names(&pool).await, vec!["Blur"]);
        assert_eq!(song_group(&pool, song).await, blur);
    }

    #[tokio::test]
    async fn test_shared_group_stays_when_moving_to_existing() {
        let pool = init_in_memory_database().await.unwrap();
        let (abba, first) = seed(&pool, "ABBA", "Waterloo").await;
        let (_, second) = seed(&pool, "ABBA", "SOS").await;
        let (muse, _) = seed(&pool, "Muse", "Uprising").await;

        let mut tx = pool.begin().await.unwrap();
        let change = reconcile_group(&mut tx, first, "MUSE").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            change,
            GroupChange::Reassigned {
                from: abba,
                to: muse,
                removed_old: false
            }
        );
        assert!(!change.mutated_groups());
        assert_eq!(song_group(&pool, second).await, abba);
        assert_eq!(group_names(&pool).await, vec!["ABBA", "Muse"]);
    }

    #[tokio::test]
    async fn test_exclusive_group_renamed_in_place() {
        let pool = init_in_memory_database().await.unwrap();
        let (oasis, song) = seed(&pool, "Oasis", "Wonderwall").await;

        let mut tx = pool.begin().await.unwrap();
        let change = reconcile_group(&mut tx, song, "Supergrass").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(change, GroupChange::Renamed { group_id: oasis });
        assert_eq!(group_names(&pool).await, vec!["Supergrass"]);
        assert_eq!(song_group(&pool, song).await, oasis);
    }

    #[tokio::test]
    async fn test_shared_group_split_into_new_group() {
        let pool = init_in_memory_database().await.unwrap();
        let (abba, first) = seed(&pool, "ABBA", "Waterloo").await;
        let (_, second) = seed(&pool, "ABBA", "SOS").await;

        let mut tx = pool.begin().await.unwrap();
        let change = reconcile_group(&mut tx, first, "Björn Again").await.unwrap();
        tx.commit().await.unwrap();

        let new_id = change.group_id();
        assert_eq!(change, GroupChange::Created { from: abba, to: new_id });
        assert_ne!(new_id, abba);
        assert_eq!(song_group(&pool, first).await, new_id);
        assert_eq!(song_group(&pool, second).await, abba);
        assert_eq!(group_names(&pool).await, vec!["ABBA", "Björn Again"]);
    }

    #[tokio::test]
    async fn test_missing_song_is_not_found() {
        let pool = init_in_memory_database().await.unwrap();
        seed(&pool, "Queen", "Bohemian Rhapsody").await;

        let mut tx = pool.begin().await.unwrap();
        let err = reconcile_group(&mut tx, 999, "Muse").await.unwrap_err();
        assert!(matches!(err, CatalogError::SongNotFound(999)));
    }

    #[tokio::test]
    async fn test_blank_target_rejected() {
        let pool = init_in_memory_database().await.unwrap();
        let (_, song) = seed(&pool, "Queen", "Bohemian Rhapsody").await;

        let mut tx = pool.begin().await.unwrap();
        let err = reconcile_group(&mut tx, song, "   ").await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_rolled_back_transaction_leaves_groups_untouched() {
        let pool = init_in_memory_database().await.unwrap();
        let (oasis, song) = seed(&pool, "Oasis", "Wonderwall").await;

        {
            let mut tx = pool.begin().await.unwrap();
            reconcile_group(&mut tx, song, "Supergrass").await.unwrap();
            tx.rollback().await.unwrap();
        }

        assert_eq!(group_names(&pool).await, vec!["Oasis"]);
        assert_eq!(song_group(&pool, song).await, oasis);
    }
}
