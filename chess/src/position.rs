//! Legal move listing and end-of-game detection.

use cozy_chess::{Board, Move};

/// How a position with no legal moves ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// The side to move is checkmated.
    Checkmate,
    /// The side to move has no legal move and is not in check.
    Stalemate,
}

/// All legal moves in `board`, castling encoded king-captures-rook.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

/// Returns `Some` when the side to move has no legal move.
///
/// Draws by the fifty-move rule or repetition still have legal moves and
/// are reported as `None`.
pub fn terminal_state(board: &Board) -> Option<Terminal> {
    let has_moves = board.generate_moves(|_| true);
    if has_moves {
        return None;
    }

    if board.checkers().is_empty() {
        Some(Terminal::Stalemate)
    } else {
        Some(Terminal::Checkmate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::parse_fen;

    #[test]
    fn test_start_position_has_twenty_moves() {
        assert_eq!(legal_moves(&Board::default()).len(), 20);
        assert_eq!(terminal_state(&Board::default()), None);
    }

    #[test]
    fn test_fools_mate_is_checkmate() {
        let board =
            parse_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
        assert_eq!(terminal_state(&board), Some(Terminal::Checkmate));
    }

    #[test]
    fn test_stalemate_detected() {
        let board = parse_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(terminal_state(&board), Some(Terminal::Stalemate));
    }
}
