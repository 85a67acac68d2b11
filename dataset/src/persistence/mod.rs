//! Persistence layer for the dataset.
//!
//! Two tables back the pipeline: `games` (one row per imported game, unique
//! by URL) and `positions` (one row per mainline ply, unique by
//! `(game_id, ply)`). Both are written with `INSERT OR IGNORE`, so replaying
//! any stage over the same input never duplicates or overwrites rows.

pub mod sqlite;

pub use sqlite::{Database, SqliteGameRepository, SqlitePositionRepository};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration failed: {0}")]
    Migration(String),
}

/// A game ready to be written to the `games` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    pub url: String,
    /// Headerless movetext.
    pub pgn: String,
    /// +1 white win, -1 black win, 0 otherwise.
    pub result: i64,
    pub elo_white: Option<i64>,
    pub elo_black: Option<i64>,
}

/// A stored game whose positions have not been expanded yet.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnexpandedGame {
    pub game_id: i64,
    pub pgn: String,
}

/// A position still waiting for an engine evaluation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingPosition {
    pub position_id: i64,
    pub fen: String,
}

/// Evaluation fields written back to one `positions` row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionEvaluation {
    /// Centipawns from White's point of view, mate capped.
    pub eval: f64,
    pub win_chance: Option<f64>,
    pub draw_chance: Option<f64>,
    pub lose_chance: Option<f64>,
}
