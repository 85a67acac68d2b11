use cozy_chess::Color;

use super::parser::PgnGame;
use super::san::format_san;
use crate::fen::format_fen;

/// Line width used when wrapping exported movetext.
const MAX_LINE_WIDTH: usize = 80;

/// Render a game's mainline as PGN movetext without the tag section.
///
/// Comments, NAGs and variations are not reproduced. A game that starts from
/// a custom position keeps its `SetUp` and `FEN` tags, since the movetext
/// alone could not be replayed otherwise.
pub fn export_movetext(game: &PgnGame) -> String {
    let mut tokens = Vec::with_capacity(game.moves.len() * 3 / 2 + 1);
    let mut board = game.start.clone();

    for (i, &mv) in game.moves.iter().enumerate() {
        let number = board.fullmove_number();
        match board.side_to_move() {
            Color::White => tokens.push(format!("{}.", number)),
            Color::Black if i == 0 => tokens.push(format!("{}...", number)),
            Color::Black => {}
        }
        tokens.push(format_san(&board, mv));
        board.play_unchecked(mv);
    }
    tokens.push(game.result.as_str().to_string());

    let mut out = String::new();
    if game.has_custom_start() {
        out.push_str("[SetUp \"1\"]\n");
        out.push_str(&format!("[FEN \"{}\"]\n\n", format_fen(&game.start)));
    }

    let mut line_len = 0;
    for token in tokens {
        if line_len > 0 && line_len + 1 + token.len() > MAX_LINE_WIDTH {
            out.push('\n');
            line_len = 0;
        }
        if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        line_len += token.len();
        out.push_str(&token);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pgn::parser::parse_pgn;

    #[test]
    fn test_strips_headers_and_annotations() {
        let input = "[Event \"x\"]\n[Result \"1-0\"]\n\n1. e4 {best by test} e5 2. Bc4 Nc6 3. Qh5 Nf6?? (3... g6) 4. Qxf7# 1-0\n";
        let game = parse_pgn(input).unwrap();
        assert_eq!(
            export_movetext(&game),
            "1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6 4. Qxf7# 1-0"
        );
    }

    #[test]
    fn test_export_reparses_to_same_moves() {
        let input = "1. d4 d5 2. c4 e6 3. Nc3 Nf6 4. Bg5 Be7 5. e3 O-O 6. Nf3 Nbd7 7. Rc1 c6 \
                     8. Bd3 dxc4 9. Bxc4 Nd5 10. Bxe7 Qxe7 11. O-O Nxc3 12. Rxc3 e5 13. dxe5 \
                     Nxe5 14. Nxe5 Qxe5 15. f4 Qe4 *";
        let game = parse_pgn(input).unwrap();
        let exported = export_movetext(&game);

        assert!(exported.lines().all(|l| l.len() <= MAX_LINE_WIDTH));
        assert!(exported.lines().count() > 1);

        let again = parse_pgn(&exported).unwrap();
        assert_eq!(again.moves, game.moves);
        assert_eq!(export_movetext(&again), exported);
    }

    #[test]
    fn test_custom_start_keeps_fen() {
        let input = "[SetUp \"1\"]\n[FEN \"4k3/8/8/8/8/8/8/R3K3 b - - 0 40\"]\n\n40... Kd7 41. Ra7+ *\n";
        let game = parse_pgn(input).unwrap();
        let exported = export_movetext(&game);
        assert!(exported.starts_with("[SetUp \"1\"]\n[FEN \"4k3/8/8/8/8/8/8/R3K3 b - - 0 40\"]"));
        assert!(exported.ends_with("40... Kd7 41. Ra7+ *"));

        let again = parse_pgn(&exported).unwrap();
        assert_eq!(again.moves, game.moves);
    }

    #[test]
    fn test_game_without_moves() {
        let game = parse_pgn("[Result \"1/2-1/2\"]\n\n1/2-1/2\n").unwrap();
        assert_eq!(export_movetext(&game), "1/2-1/2");
    }
}
