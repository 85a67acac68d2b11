//! SQLite-backed repositories.
//!
//! [`Database`] wraps a `sqlx::SqlitePool` in WAL mode and applies the
//! embedded migrations from `dataset/migrations/` on open. The schema is
//! idempotent (`CREATE TABLE IF NOT EXISTS`).
//!
//! | Type | Table |
//! |------|-------|
//! | [`SqliteGameRepository`] | `games` |
//! | [`SqlitePositionRepository`] | `positions` |
//!
//! Rows are addressed by SQLite's implicit `rowid`: `positions.game_id` holds
//! a `games.rowid`, and pending positions are identified by their own rowid.

mod database;
mod game_repo;
mod position_repo;

pub use database::Database;
pub use game_repo::SqliteGameRepository;
pub use position_repo::SqlitePositionRepository;
