//! Game extraction from a PGN source.

use chess::{export_movetext, PgnError, PgnReader};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::persistence::GameRecord;

/// Termination tag value of games that ended on the board.
const NORMAL_TERMINATION: &str = "Normal";

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Maximum number of games to read, kept or not.
    pub game_count: usize,
    /// Tag holding the game's unique source URL.
    pub url_tag: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub games_read: usize,
    pub games_kept: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Game {index}: {source}")]
    Pgn {
        index: usize,
        #[source]
        source: PgnError,
    },
    #[error("Game {index} has no {tag} tag")]
    MissingTag { index: usize, tag: String },
}

/// Read up to `options.game_count` games and keep the normally terminated
/// ones.
pub fn extract_games<R: BufRead>(
    reader: &mut PgnReader<R>,
    options: &ExtractOptions,
) -> Result<(Vec<GameRecord>, ExtractReport), ExtractError> {
    let mut games = Vec::new();
    let mut report = ExtractReport::default();

    for index in 1..=options.game_count {
        let game = match reader.read_game() {
            Ok(Some(game)) => game,
            Ok(None) => break,
            Err(source) => return Err(ExtractError::Pgn { index, source }),
        };
        report.games_read += 1;

        let termination = game
            .tag("Termination")
            .ok_or_else(|| ExtractError::MissingTag {
                index,
                tag: "Termination".to_string(),
            })?;
        if !termination.eq_ignore_ascii_case(NORMAL_TERMINATION) {
            tracing::debug!(index, termination, "Skipping game");
            continue;
        }

        let url = game
            .tag(&options.url_tag)
            .ok_or_else(|| ExtractError::MissingTag {
                index,
                tag: options.url_tag.clone(),
            })?
            .to_string();

        // The Result tag, not the movetext token, decides the outcome
        let result = chess::GameResult::from_token(game.tag("Result").unwrap_or("*")).score();

        games.push(GameRecord {
            url,
            pgn: export_movetext(&game),
            result,
            elo_white: parse_elo(game.tag("WhiteElo")),
            elo_black: parse_elo(game.tag("BlackElo")),
        });
        report.games_kept += 1;
    }

    Ok((games, report))
}

/// Open `path` and run [`extract_games`] over it.
#[tracing::instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn extract_games_from_path(
    path: &Path,
    options: &ExtractOptions,
) -> Result<(Vec<GameRecord>, ExtractReport), ExtractError> {
    let file = File::open(path).map_err(|source| ExtractError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = PgnReader::new(BufReader::new(file));
    extract_games(&mut reader, options)
}

/// Ratings such as `?` or `-` are stored as NULL.
fn parse_elo(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}
