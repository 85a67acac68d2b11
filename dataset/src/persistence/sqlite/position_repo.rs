//! SQLite-backed repository for per-ply positions and their evaluations.

use chess::PlyPosition;
use sqlx::{SqliteConnection, SqlitePool};

use crate::persistence::{PendingPosition, PersistenceError, PositionEvaluation};

pub struct SqlitePositionRepository {
    pool: SqlitePool,
}

impl SqlitePositionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert the snapshots of one game atomically. Existing
    /// `(game_id, ply)` pairs are left untouched.
    pub async fn insert_positions(
        &self,
        game_id: i64,
        positions: &[PlyPosition],
    ) -> Result<u64, PersistenceError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for position in positions {
            let done = sqlx::query(
                "INSERT OR IGNORE INTO positions (game_id, ply, fen) VALUES (?, ?, ?)",
            )
            .bind(game_id)
            .bind(position.ply as i64)
            .bind(&position.fen)
            .execute(&mut *tx)
            .await?;
            inserted += done.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Positions whose `eval` is still NULL, in row order.
    pub async fn pending_positions(&self) -> Result<Vec<PendingPosition>, PersistenceError> {
        let rows = sqlx::query_as::<_, PendingPosition>(
            r#"
            SELECT rowid AS position_id, fen
            FROM positions
            WHERE eval IS NULL
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Write an evaluation inside a caller-managed transaction.
    ///
    /// Only a row whose `eval` is still NULL is updated; returns whether a
    /// row changed.
    pub async fn write_evaluation(
        conn: &mut SqliteConnection,
        position_id: i64,
        evaluation: &PositionEvaluation,
    ) -> Result<bool, PersistenceError> {
        let done = sqlx::query(
            r#"
            UPDATE positions
            SET eval = ?, win_chance = ?, draw_chance = ?, lose_chance = ?
            WHERE rowid = ? AND eval IS NULL
            "#,
        )
        .bind(evaluation.eval)
        .bind(evaluation.win_chance)
        .bind(evaluation.draw_chance)
        .bind(evaluation.lose_chance)
        .bind(position_id)
        .execute(conn)
        .await?;

        Ok(done.rows_affected() == 1)
    }

    pub async fn count(&self) -> Result<i64, PersistenceError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM positions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_pending(&self) -> Result<i64, PersistenceError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM positions WHERE eval IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::Database;

    fn snapshots(n: u32) -> Vec<PlyPosition> {
        (1..=n)
            .map(|ply| PlyPosition {
                ply,
                fen: format!("fen-{ply}"),
            })
            .collect()
    }

    fn evaluation(eval: f64) -> PositionEvaluation {
        PositionEvaluation {
            eval,
            win_chance: Some(0.5),
            draw_chance: Some(0.4),
            lose_chance: Some(0.1),
        }
    }

    #[tokio::test]
    async fn test_insert_positions_ignores_duplicates() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = SqlitePositionRepository::new(db.pool().clone());

        assert_eq!(repo.insert_positions(1, &snapshots(4)).await.unwrap(), 4);
        assert_eq!(repo.insert_positions(1, &snapshots(6)).await.unwrap(), 2);
        assert_eq!(repo.insert_positions(2, &snapshots(3)).await.unwrap(), 3);
        assert_eq!(repo.count().await.unwrap(), 9);

        // Existing rows keep their original FEN
        let (fen,): (String,) =
            sqlx::query_as("SELECT fen FROM positions WHERE game_id = 1 AND ply = 2")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(fen, "fen-2");
    }

    #[tokio::test]
    async fn test_pending_and_write_evaluation() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = SqlitePositionRepository::new(db.pool().clone());
        repo.insert_positions(7, &snapshots(3)).await.unwrap();

        let pending = repo.pending_positions().await.unwrap();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].fen, "fen-1");

        let mut tx = db.pool().begin().await.unwrap();
        let updated =
            SqlitePositionRepository::write_evaluation(&mut tx, pending[0].position_id, &evaluation(31.0))
                .await
                .unwrap();
        assert!(updated);
        tx.commit().await.unwrap();

        assert_eq!(repo.count_pending().await.unwrap(), 2);
        let row: (f64, Option<f64>, Option<f64>, Option<f64>) = sqlx::query_as(
            "SELECT eval, win_chance, draw_chance, lose_chance FROM positions WHERE rowid = ?",
        )
        .bind(pending[0].position_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(row, (31.0, Some(0.5), Some(0.4), Some(0.1)));
    }

    #[tokio::test]
    async fn test_evaluated_rows_are_never_overwritten() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = SqlitePositionRepository::new(db.pool().clone());
        repo.insert_positions(1, &snapshots(1)).await.unwrap();
        let id = repo.pending_positions().await.unwrap()[0].position_id;

        let mut tx = db.pool().begin().await.unwrap();
        assert!(SqlitePositionRepository::write_evaluation(&mut tx, id, &evaluation(10.0))
            .await
            .unwrap());
        assert!(!SqlitePositionRepository::write_evaluation(&mut tx, id, &evaluation(-99.0))
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let (eval,): (f64,) = sqlx::query_as("SELECT eval FROM positions WHERE rowid = ?")
            .bind(id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(eval, 10.0);
    }

    #[tokio::test]
    async fn test_rolled_back_evaluations_stay_pending() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = SqlitePositionRepository::new(db.pool().clone());
        repo.insert_positions(1, &snapshots(2)).await.unwrap();
        let id = repo.pending_positions().await.unwrap()[0].position_id;

        {
            let mut tx = db.pool().begin().await.unwrap();
            SqlitePositionRepository::write_evaluation(&mut tx, id, &evaluation(5.0))
                .await
                .unwrap();
            // dropped without commit
        }

        assert_eq!(repo.count_pending().await.unwrap(), 2);
    }
}
