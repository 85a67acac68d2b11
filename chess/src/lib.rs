//! Board-level helpers for the dataset pipeline.
//!
//! Everything here sits on top of `cozy-chess`: FEN conversion, SAN move
//! notation, a streaming PGN reader with a headerless movetext exporter, and
//! mainline replay into per-ply FEN snapshots.

pub mod fen;
pub mod pgn;
pub mod position;
pub mod replay;

pub use fen::{format_fen, parse_fen, FenError};
pub use pgn::{
    export_movetext, parse_pgn, parse_san, format_san, GameResult, PgnError, PgnGame, PgnReader,
    SanError,
};
pub use position::{legal_moves, terminal_state, Terminal};
pub use replay::{mainline_positions, PlyPosition};
