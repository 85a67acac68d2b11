use cozy_chess::{Board, Color, File, Move, Piece, Rank, Square};

use crate::position::{legal_moves, terminal_state, Terminal};

/// Parse Standard Algebraic Notation (SAN) move
pub fn parse_san(board: &Board, san: &str) -> Result<Move, SanError> {
    let text = san.trim_end_matches(['+', '#', '!', '?']);
    if text.is_empty() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let legal = legal_moves(board);

    match text {
        "O-O" | "0-0" => return find_castle(board, &legal, true, san),
        "O-O-O" | "0-0-0" => return find_castle(board, &legal, false, san),
        _ => {}
    }

    let mut chars: Vec<char> = text.chars().collect();

    let piece = match chars[0] {
        'N' => Piece::Knight,
        'B' => Piece::Bishop,
        'R' => Piece::Rook,
        'Q' => Piece::Queen,
        'K' => Piece::King,
        'a'..='h' => Piece::Pawn,
        _ => return Err(SanError::InvalidFormat(san.to_string())),
    };
    if piece != Piece::Pawn {
        chars.remove(0);
    }

    // Promotion suffix: "e8=Q" or the older "e8Q"
    let mut promotion = None;
    if piece == Piece::Pawn {
        if let Some(&last) = chars.last() {
            if matches!(last, 'N' | 'B' | 'R' | 'Q') {
                promotion = Some(parse_promotion(last, san)?);
                chars.pop();
                if chars.last() == Some(&'=') {
                    chars.pop();
                }
            }
        }
    }

    chars.retain(|&c| c != 'x' && c != ':' && c != '-');
    if chars.len() < 2 {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let dest_chars = chars.split_off(chars.len() - 2);
    let to = Square::new(parse_file(dest_chars[0])?, parse_rank(dest_chars[1])?);

    let mut from_file = None;
    let mut from_rank = None;
    for c in chars {
        match c {
            'a'..='h' => from_file = Some(parse_file(c)?),
            '1'..='8' => from_rank = Some(parse_rank(c)?),
            _ => return Err(SanError::InvalidFormat(san.to_string())),
        }
    }

    let side = board.side_to_move();
    let mut candidates = legal.iter().copied().filter(|mv| {
        mv.to == to
            && mv.promotion == promotion
            && board.piece_on(mv.from) == Some(piece)
            && board.color_on(mv.to) != Some(side)
            && from_file.map_or(true, |f| mv.from.file() == f)
            && from_rank.map_or(true, |r| mv.from.rank() == r)
    });

    match (candidates.next(), candidates.next()) {
        (Some(mv), None) => Ok(mv),
        (None, _) => Err(SanError::NoLegalMove(san.to_string())),
        (Some(_), Some(_)) => Err(SanError::AmbiguousMove(san.to_string())),
    }
}

/// Format a move as SAN
///
/// `mv` must be legal in `board`.
pub fn format_san(board: &Board, mv: Move) -> String {
    let side = board.side_to_move();
    let piece = board.piece_on(mv.from).unwrap_or(Piece::Pawn);

    let mut san = String::new();

    if piece == Piece::King && board.color_on(mv.to) == Some(side) {
        if mv.to.file() > mv.from.file() {
            san.push_str("O-O");
        } else {
            san.push_str("O-O-O");
        }
    } else {
        let is_capture = board.piece_on(mv.to).is_some()
            || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

        if piece == Piece::Pawn {
            if is_capture {
                san.push(file_char(mv.from.file()));
            }
        } else {
            san.push(piece_char(piece));
            san.push_str(&disambiguation(board, mv, piece));
        }

        if is_capture {
            san.push('x');
        }
        san.push(file_char(mv.to.file()));
        san.push(rank_char(mv.to.rank()));

        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(piece_char(promo));
        }
    }

    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        if terminal_state(&after) == Some(Terminal::Checkmate) {
            san.push('#');
        } else {
            san.push('+');
        }
    }

    san
}

fn find_castle(board: &Board, legal: &[Move], short: bool, san: &str) -> Result<Move, SanError> {
    let side = board.side_to_move();
    legal
        .iter()
        .copied()
        .find(|mv| {
            board.piece_on(mv.from) == Some(Piece::King)
                && board.color_on(mv.to) == Some(side)
                && board.piece_on(mv.to) == Some(Piece::Rook)
                && (mv.to.file() > mv.from.file()) == short
        })
        .ok_or_else(|| SanError::NoLegalMove(san.to_string()))
}

/// Minimal origin qualifier so that `mv` is the only match for its SAN.
fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let side: Color = board.side_to_move();
    let rivals: Vec<Square> = legal_moves(board)
        .into_iter()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && board.piece_on(other.from) == Some(piece)
                && board.color_on(other.to) != Some(side)
        })
        .map(|other| other.from)
        .collect();

    if rivals.is_empty() {
        return String::new();
    }

    let file = file_char(mv.from.file());
    let rank = rank_char(mv.from.rank());
    if rivals.iter().all(|sq| sq.file() != mv.from.file()) {
        file.to_string()
    } else if rivals.iter().all(|sq| sq.rank() != mv.from.rank()) {
        rank.to_string()
    } else {
        format!("{}{}", file, rank)
    }
}

fn parse_promotion(c: char, san: &str) -> Result<Piece, SanError> {
    match c {
        'Q' => Ok(Piece::Queen),
        'R' => Ok(Piece::Rook),
        'B' => Ok(Piece::Bishop),
        'N' => Ok(Piece::Knight),
        _ => Err(SanError::InvalidPromotion(san.to_string())),
    }
}

fn parse_file(c: char) -> Result<File, SanError> {
    match c {
        'a' => Ok(File::A),
        'b' => Ok(File::B),
        'c' => Ok(File::C),
        'd' => Ok(File::D),
        'e' => Ok(File::E),
        'f' => Ok(File::F),
        'g' => Ok(File::G),
        'h' => Ok(File::H),
        _ => Err(SanError::InvalidFile(c)),
    }
}

fn parse_rank(c: char) -> Result<Rank, SanError> {
    match c {
        '1' => Ok(Rank::First),
        '2' => Ok(Rank::Second),
        '3' => Ok(Rank::Third),
        '4' => Ok(Rank::Fourth),
        '5' => Ok(Rank::Fifth),
        '6' => Ok(Rank::Sixth),
        '7' => Ok(Rank::Seventh),
        '8' => Ok(Rank::Eighth),
        _ => Err(SanError::InvalidRank(c)),
    }
}

fn piece_char(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

fn file_char(file: File) -> char {
    match file {
        File::A => 'a',
        File::B => 'b',
        File::C => 'c',
        File::D => 'd',
        File::E => 'e',
        File::F => 'f',
        File::G => 'g',
        File::H => 'h',
    }
}

fn rank_char(rank: Rank) -> char {
    match rank {
        Rank::First => '1',
        Rank::Second => '2',
        Rank::Third => '3',
        Rank::Fourth => '4',
        Rank::Fifth => '5',
        Rank::Sixth => '6',
        Rank::Seventh => '7',
        Rank::Eighth => '8',
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid file: {0}")]
    InvalidFile(char),
    #[error("Invalid rank: {0}")]
    InvalidRank(char),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}
