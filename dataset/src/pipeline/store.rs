//! Game store writer.

use crate::persistence::{Database, GameRecord, PersistenceError, SqliteGameRepository};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreReport {
    pub inserted: u64,
    pub total: i64,
}

/// Persist extracted games. Already known URLs are skipped, so re-importing
/// overlapping input is harmless. Committed before returning.
#[tracing::instrument(level = "info", skip_all, fields(games = games.len()))]
pub async fn write_games(
    db: &Database,
    games: &[GameRecord],
) -> Result<StoreReport, PersistenceError> {
    let repo = SqliteGameRepository::new(db.pool().clone());
    let inserted = repo.insert_games(games).await?;
    let total = repo.count().await?;

    tracing::info!(inserted, total, "Games stored");
    Ok(StoreReport { inserted, total })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<GameRecord> {
        ["a", "b"]
            .iter()
            .map(|url| GameRecord {
                url: url.to_string(),
                pgn: "1. e4 1-0".to_string(),
                result: 1,
                elo_white: Some(2000),
                elo_black: Some(2100),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_rewriting_is_idempotent() {
        let db = Database::new_in_memory().await.unwrap();

        let first = write_games(&db, &records()).await.unwrap();
        assert_eq!(first, StoreReport { inserted: 2, total: 2 });

        let second = write_games(&db, &records()).await.unwrap();
        assert_eq!(second, StoreReport { inserted: 0, total: 2 });
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let db = Database::new_in_memory().await.unwrap();
        let report = write_games(&db, &[]).await.unwrap();
        assert_eq!(report, StoreReport::default());
    }
}
