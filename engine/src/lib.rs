pub mod session;
pub mod uci;

pub use session::{EngineConfig, EngineError, EngineSession};
pub use uci::{UciError, UciMessage};

use cozy_chess::{Color, Move};
use std::time::Duration;

/// Which UCI engine family is on the other end of the pipe.
///
/// The family decides which option names are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    #[default]
    Stockfish,
    Lc0,
}

/// Explicit option set sent to the engine right after the handshake.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
    /// Stockfish's `Use NNUE` toggle. Ignored for other engines.
    pub use_nnue: Option<bool>,
    /// Ask for `wdl` statistics in info lines (`UCI_ShowWDL`).
    pub show_wdl: bool,
    /// Additional `(name, value)` pairs passed through verbatim.
    pub extra: Vec<(String, String)>,
}

impl EngineOptions {
    /// Resolve to the `setoption` pairs understood by `kind`.
    pub fn uci_options(&self, kind: EngineKind) -> Vec<(String, String)> {
        let mut options = Vec::new();

        if let Some(threads) = self.threads {
            options.push(("Threads".to_string(), threads.to_string()));
        }
        if kind == EngineKind::Stockfish {
            if let Some(hash_mb) = self.hash_mb {
                options.push(("Hash".to_string(), hash_mb.to_string()));
            }
            if let Some(use_nnue) = self.use_nnue {
                options.push(("Use NNUE".to_string(), use_nnue.to_string()));
            }
        }
        if self.show_wdl {
            options.push(("UCI_ShowWDL".to_string(), "true".to_string()));
        }

        options.extend(self.extra.iter().cloned());
        options
    }
}

/// Search budget for a single `analyse` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchLimit {
    Nodes(u64),
    Time(Duration),
}

/// The parts of an `info` line the annotator uses. Other keywords are skipped.
#[derive(Debug, Clone, Default)]
pub struct EngineInfo {
    pub depth: Option<u8>,
    pub nodes: Option<u64>,
    pub score: Option<Score>,
    pub wdl: Option<Wdl>,
    pub multipv: Option<u8>,
}

/// Score from the side to move's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32), // Negative for being mated
}

impl Score {
    /// Collapse to centipawns, mapping mate in N to `mate_score - N`
    /// (and mated in N to `-mate_score + N`).
    pub fn to_cp(self, mate_score: i32) -> i32 {
        match self {
            Self::Centipawns(cp) => cp,
            Self::Mate(m) if m > 0 => mate_score - m,
            Self::Mate(m) => -mate_score - m,
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Self::Centipawns(cp) => Self::Centipawns(-cp),
            Self::Mate(m) => Self::Mate(-m),
        }
    }
}

/// Win/draw/loss statistics in per-mille, from the side to move's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wdl {
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
}

impl Wdl {
    /// Per-mille values as fractions in `[0, 1]`.
    pub fn fractions(self) -> (f64, f64, f64) {
        (
            self.win as f64 / 1000.0,
            self.draw as f64 / 1000.0,
            self.loss as f64 / 1000.0,
        )
    }
}

/// Final result of one `analyse` call.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Side to move in the analysed position.
    pub turn: Color,
    pub score: Score,
    pub wdl: Option<Wdl>,
    pub depth: Option<u8>,
    pub nodes: Option<u64>,
    pub best_move: Move,
}

impl Analysis {
    /// Score from White's point of view.
    pub fn white_score(&self) -> Score {
        match self.turn {
            Color::White => self.score,
            Color::Black => self.score.negate(),
        }
    }
}
