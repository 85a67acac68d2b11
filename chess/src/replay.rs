//! Mainline replay into per-ply board snapshots.

use crate::fen::format_fen;
use crate::pgn::PgnGame;

/// Board state after one half-move of the mainline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyPosition {
    /// Half-moves played from the game's start position, starting at 1.
    pub ply: u32,
    /// FEN of the position after that half-move.
    pub fen: String,
}

/// Replay a game's mainline, yielding one snapshot per half-move.
///
/// The start position itself is not included, so a game with K half-moves
/// yields exactly K snapshots with plies `1..=K`.
pub fn mainline_positions(game: &PgnGame) -> Vec<PlyPosition> {
    let mut board = game.start.clone();
    game.moves
        .iter()
        .zip(1u32..)
        .map(|(&mv, ply)| {
            board.play_unchecked(mv);
            PlyPosition {
                ply,
                fen: format_fen(&board),
            }
        })
        .collect()
}
