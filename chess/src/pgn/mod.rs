//! PGN reading and writing.
//!
//! [`PgnReader`] pulls games one at a time from any `BufRead` source and
//! resolves their SAN movetext against the board, so a returned
//! [`PgnGame`] always holds a legal mainline. [`export_movetext`] writes the
//! mainline back out without the tag section.

pub mod parser;
pub mod san;
pub mod writer;

pub use parser::{parse_pgn, GameResult, PgnError, PgnGame, PgnReader};
pub use san::{format_san, parse_san, SanError};
pub use writer::export_movetext;
