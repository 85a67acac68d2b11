use cozy_chess::{Board, Move};
use std::collections::HashMap;
use std::io::BufRead;

use super::san::{parse_san, SanError};
use crate::fen::{parse_fen, FenError};

/// A parsed PGN game
#[derive(Debug, Clone)]
pub struct PgnGame {
    pub tags: HashMap<String, String>,
    /// Position the movetext starts from (`FEN` tag or the standard setup).
    pub start: Board,
    /// Mainline moves, validated against the board while parsing.
    pub moves: Vec<Move>,
    pub result: GameResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    Ongoing,
}

impl GameResult {
    /// Interpret a result token or `Result` tag value. Unknown values map to
    /// `Ongoing`.
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "1-0" => Self::WhiteWins,
            "0-1" => Self::BlackWins,
            "1/2-1/2" => Self::Draw,
            _ => Self::Ongoing,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WhiteWins => "1-0",
            Self::BlackWins => "0-1",
            Self::Draw => "1/2-1/2",
            Self::Ongoing => "*",
        }
    }

    /// Signed outcome from White's point of view: +1, -1, or 0.
    pub fn score(self) -> i64 {
        match self {
            Self::WhiteWins => 1,
            Self::BlackWins => -1,
            Self::Draw | Self::Ongoing => 0,
        }
    }
}

impl PgnGame {
    /// Look up a tag value by name.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    /// True when the game does not start from the standard position.
    pub fn has_custom_start(&self) -> bool {
        self.tags.contains_key("FEN")
    }
}

/// Streams games out of a PGN source one at a time.
pub struct PgnReader<R> {
    reader: R,
    pending: Option<String>,
    line_no: usize,
}

impl<R: BufRead> PgnReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: None,
            line_no: 0,
        }
    }

    /// Read the next game, or `None` at end of input.
    pub fn read_game(&mut self) -> Result<Option<PgnGame>, PgnError> {
        let mut tags = HashMap::new();
        let mut movetext = String::new();
        let mut in_comment = false;
        let mut blank_after_tags = false;

        while let Some(line) = self.next_line()? {
            let trimmed = line.trim();

            if !in_comment {
                if trimmed.starts_with('%') {
                    continue;
                }
                if trimmed.starts_with('[') {
                    if !movetext.trim().is_empty() || blank_after_tags {
                        // Tag section of the following game
                        self.pending = Some(line);
                        break;
                    }
                    let (name, value) = parse_tag(trimmed, self.line_no)?;
                    tags.insert(name, value);
                    continue;
                }
                if trimmed.is_empty() {
                    if !movetext.trim().is_empty() {
                        break;
                    }
                    if !tags.is_empty() {
                        blank_after_tags = true;
                    }
                    continue;
                }
            }

            in_comment = scan_comment_state(&line, in_comment);
            movetext.push_str(&line);
            movetext.push('\n');
        }

        if tags.is_empty() && movetext.trim().is_empty() {
            return Ok(None);
        }

        let (sans, movetext_result) = tokenize_movetext(&movetext)?;
        build_game(tags, &sans, movetext_result).map(Some)
    }

    fn next_line(&mut self) -> Result<Option<String>, PgnError> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }

        let mut line = String::new();
        let read = self.reader.read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        self.line_no += 1;

        if self.line_no == 1 {
            if let Some(stripped) = line.strip_prefix('\u{feff}') {
                line = stripped.to_string();
            }
        }
        let len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(len);
        Ok(Some(line))
    }
}

/// Parse a single game from a string.
///
/// Unlike [`PgnReader::read_game`], an input without any game is an error.
pub fn parse_pgn(input: &str) -> Result<PgnGame, PgnError> {
    PgnReader::new(input.as_bytes())
        .read_game()?
        .ok_or(PgnError::NoGame)
}

fn parse_tag(line: &str, line_no: usize) -> Result<(String, String), PgnError> {
    let invalid = || PgnError::InvalidTag {
        line: line_no,
        text: line.to_string(),
    };

    let inner = line
        .strip_prefix('[')
        .and_then(|l| l.strip_suffix(']'))
        .ok_or_else(invalid)?
        .trim();

    let (name, rest) = inner.split_once(char::is_whitespace).ok_or_else(invalid)?;
    let quoted = rest.trim();
    let value = quoted
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or_else(invalid)?;

    let value = value.replace("\\\"", "\"").replace("\\\\", "\\");
    Ok((name.to_string(), value))
}

/// Whether a brace comment is still open at the end of `line`.
fn scan_comment_state(line: &str, mut in_comment: bool) -> bool {
    for c in line.chars() {
        match c {
            '}' if in_comment => in_comment = false,
            '{' if !in_comment => in_comment = true,
            ';' if !in_comment => break,
            _ => {}
        }
    }
    in_comment
}

/// Split movetext into mainline SAN tokens plus the terminating result.
fn tokenize_movetext(text: &str) -> Result<(Vec<String>, Option<GameResult>), PgnError> {
    let mut sans = Vec::new();
    let mut result = None;
    let mut depth = 0usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                }
            }
            ';' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '$' => {
                while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                    chars.next();
                }
            }
            c if c.is_whitespace() => {}
            c => {
                let mut token = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || "{}();$".contains(next) {
                        break;
                    }
                    token.push(next);
                    chars.next();
                }

                if depth > 0 {
                    continue;
                }

                match token.as_str() {
                    "1-0" | "0-1" | "1/2-1/2" | "*" => {
                        result = Some(GameResult::from_token(&token));
                        break;
                    }
                    "--" | "Z0" => return Err(PgnError::NullMove),
                    _ => {}
                }

                if let Some(san) = strip_move_number(&token) {
                    sans.push(san.to_string());
                }
            }
        }
    }

    Ok((sans, result))
}

/// Drop a leading move number (`12.`, `12...`, `12.e4`) from a token.
fn strip_move_number(token: &str) -> Option<&str> {
    let bare = token.trim_end_matches(['+', '#', '!', '?']);
    if matches!(bare, "0-0" | "0-0-0") {
        return Some(token);
    }

    let rest = if token.starts_with(|c: char| c.is_ascii_digit()) {
        token
            .trim_start_matches(|c: char| c.is_ascii_digit())
            .trim_start_matches('.')
    } else {
        token.trim_start_matches('.')
    };

    let rest = rest.trim_end_matches(['!', '?']);
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

fn build_game(
    tags: HashMap<String, String>,
    sans: &[String],
    movetext_result: Option<GameResult>,
) -> Result<PgnGame, PgnError> {
    let start = match tags.get("FEN") {
        Some(fen) => parse_fen(fen)?,
        None => Board::default(),
    };

    let mut board = start.clone();
    let mut moves = Vec::with_capacity(sans.len());
    for (i, san) in sans.iter().enumerate() {
        let mv = parse_san(&board, san).map_err(|source| PgnError::IllegalMove {
            ply: i + 1,
            san: san.clone(),
            source,
        })?;
        board.play_unchecked(mv);
        moves.push(mv);
    }

    let result = match tags.get("Result") {
        Some(value) => GameResult::from_token(value),
        None => movetext_result.unwrap_or(GameResult::Ongoing),
    };

    Ok(PgnGame {
        tags,
        start,
        moves,
        result,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum PgnError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No game found in PGN input")]
    NoGame,
    #[error("Invalid tag on line {line}: {text}")]
    InvalidTag { line: usize, text: String },
    #[error("Null moves are not supported")]
    NullMove,
    #[error("Illegal move {san} at ply {ply}: {source}")]
    IllegalMove {
        ply: usize,
        san: String,
        #[source]
        source: SanError,
    },
    #[error("Invalid FEN tag: {0}")]
    Fen(#[from] FenError),
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_GAMES: &str = r#"[Event "Rated Blitz game"]
[LichessURL "https://lichess.org/abc"]
[Result "1-0"]
[Termination "Normal"]

1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6?? 4. Qxf7# 1-0

[Event "Rated Blitz game"]
[LichessURL "https://lichess.org/def"]
[Result "1/2-1/2"]
[Termination "Normal"]

1. d4 { a comment
spanning lines } d5 (1... Nf6 2. c4) 2. c4 $1 c6 ; rest of line
3. Nf3 1/2-1/2
"#;

    #[test]
    fn test_reads_games_in_order() {
        let mut reader = PgnReader::new(TWO_GAMES.as_bytes());

        let first = reader.read_game().unwrap().unwrap();
        assert_eq!(first.tag("LichessURL"), Some("https://lichess.org/abc"));
        assert_eq!(first.moves.len(), 7);
        assert_eq!(first.result, GameResult::WhiteWins);

        let second = reader.read_game().unwrap().unwrap();
        assert_eq!(second.tag("LichessURL"), Some("https://lichess.org/def"));
        assert_eq!(second.moves.len(), 5, "variation and comments are skipped");
        assert_eq!(second.result, GameResult::Draw);

        assert!(reader.read_game().unwrap().is_none());
        assert!(reader.read_game().unwrap().is_none());
    }

    #[test]
    fn test_headerless_movetext() {
        let game = parse_pgn("1. e4 c5 2. Nf3 *").unwrap();
        assert!(game.tags.is_empty());
        assert_eq!(game.moves.len(), 3);
        assert_eq!(game.result, GameResult::Ongoing);
    }

    #[test]
    fn test_tags_without_movetext_are_separate_games() {
        let input = "[Event \"a\"]\n\n[Event \"b\"]\n\n1. e4 *\n";
        let mut reader = PgnReader::new(input.as_bytes());
        let first = reader.read_game().unwrap().unwrap();
        assert_eq!(first.tag("Event"), Some("a"));
        assert!(first.moves.is_empty());
        let second = reader.read_game().unwrap().unwrap();
        assert_eq!(second.tag("Event"), Some("b"));
        assert_eq!(second.moves.len(), 1);
    }

    #[test]
    fn test_custom_start_position() {
        let input = "[SetUp \"1\"]\n[FEN \"4k3/8/8/8/8/8/8/R3K3 w - - 0 1\"]\n\n1. Ra8+ Kd7 *\n";
        let game = parse_pgn(input).unwrap();
        assert!(game.has_custom_start());
        assert_eq!(game.moves.len(), 2);
    }

    #[test]
    fn test_empty_input_is_no_game() {
        assert!(matches!(parse_pgn(""), Err(PgnError::NoGame)));
        assert!(matches!(parse_pgn("\n\n  \n"), Err(PgnError::NoGame)));
    }

    #[test]
    fn test_illegal_move_reports_ply() {
        let err = parse_pgn("1. e4 e5 2. Ke3 *").unwrap_err();
        match err {
            PgnError::IllegalMove { ply, san, .. } => {
                assert_eq!(ply, 3);
                assert_eq!(san, "Ke3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_escaped_tag_value() {
        let (name, value) = parse_tag(r#"[White "Nimzo \"the\" Great"]"#, 1).unwrap();
        assert_eq!(name, "White");
        assert_eq!(value, "Nimzo \"the\" Great");
        assert!(parse_tag("[Broken]", 1).is_err());
    }

    #[test]
    fn test_result_tag_wins_over_movetext() {
        let game = parse_pgn("[Result \"0-1\"]\n\n1. e4 *\n").unwrap();
        assert_eq!(game.result, GameResult::BlackWins);
        assert_eq!(game.result.score(), -1);
        assert_eq!(GameResult::from_token("garbage").score(), 0);
    }

    #[test]
    fn test_castling_with_zeros_and_numbers_glued() {
        let game = parse_pgn("1.e4 e5 2.Nf3 Nc6 3.Bc4 Bc5 4.0-0 Nf6 *").unwrap();
        assert_eq!(game.moves.len(), 8);

        // Castling is encoded king-to-rook
        let castle = game.moves[6];
        assert_eq!(castle.from, cozy_chess::Square::E1);
        assert_eq!(castle.to, cozy_chess::Square::H1);
        assert_eq!(castle.promotion, None);
    }
}
