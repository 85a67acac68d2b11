//! SQLite-backed repository for imported games.

use sqlx::SqlitePool;

use crate::persistence::{GameRecord, PersistenceError, UnexpandedGame};

pub struct SqliteGameRepository {
    pool: SqlitePool,
}

impl SqliteGameRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert all `games` in one transaction, ignoring URLs already stored.
    ///
    /// Returns the number of rows actually inserted.
    pub async fn insert_games(&self, games: &[GameRecord]) -> Result<u64, PersistenceError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for game in games {
            let done = sqlx::query(
                r#"
                INSERT OR IGNORE INTO games (url, pgn, result, elo_white, elo_black)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&game.url)
            .bind(&game.pgn)
            .bind(game.result)
            .bind(game.elo_white)
            .bind(game.elo_black)
            .execute(&mut *tx)
            .await?;
            inserted += done.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Games with no row in `positions` yet, in insertion order.
    pub async fn unexpanded_games(&self) -> Result<Vec<UnexpandedGame>, PersistenceError> {
        let games = sqlx::query_as::<_, UnexpandedGame>(
            r#"
            SELECT g.rowid AS game_id, g.pgn AS pgn
            FROM games g
            WHERE NOT EXISTS (
                SELECT 1 FROM positions p WHERE p.game_id = g.rowid
            )
            ORDER BY g.rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(games)
    }

    pub async fn count(&self) -> Result<i64, PersistenceError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM games")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
