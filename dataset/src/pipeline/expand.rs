//! Position expansion: replay stored games into per-ply rows.

use chess::{mainline_positions, parse_pgn, PgnError};

use crate::persistence::{
    Database, PersistenceError, SqliteGameRepository, SqlitePositionRepository,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandReport {
    pub games_expanded: usize,
    pub positions_inserted: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ExpandError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("Cannot replay game {game_id}: {source}")]
    Replay {
        game_id: i64,
        #[source]
        source: PgnError,
    },
}

/// Expand every game that has no positions yet.
///
/// Each game's rows are committed together, so a game is either fully
/// expanded or still selected by the next run.
#[tracing::instrument(level = "info", skip_all)]
pub async fn expand_positions(db: &Database) -> Result<ExpandReport, ExpandError> {
    let games = SqliteGameRepository::new(db.pool().clone());
    let positions = SqlitePositionRepository::new(db.pool().clone());

    let pending = games.unexpanded_games().await?;
    tracing::info!(games = pending.len(), "Expanding games");

    let mut report = ExpandReport::default();
    for game in pending {
        let parsed = parse_pgn(&game.pgn).map_err(|source| ExpandError::Replay {
            game_id: game.game_id,
            source,
        })?;

        let snapshots = mainline_positions(&parsed);
        if snapshots.is_empty() {
            // Nothing to insert, so the game stays selected on later runs
            tracing::debug!(game_id = game.game_id, "Game has no moves, skipping");
            continue;
        }

        let inserted = positions.insert_positions(game.game_id, &snapshots).await?;
        tracing::debug!(game_id = game.game_id, plies = snapshots.len(), inserted, "Game expanded");

        if inserted > 0 {
            report.games_expanded += 1;
        }
        report.positions_inserted += inserted;
    }

    tracing::info!(
        games = report.games_expanded,
        positions = report.positions_inserted,
        "Expansion complete"
    );
    Ok(report)
}
