//! Command-line and environment configuration.
//!
//! Every tunable has a compile-time default; the most commonly changed ones
//! can also be set through a `CHESS_DATASET_*` environment variable.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{EngineConfig, EngineKind, EngineOptions, SearchLimit};

use crate::pipeline::{AnnotateOptions, ExtractOptions, DEFAULT_MATE_SCORE};

const DEFAULT_DATABASE: &str = "games.sqlite";
const DEFAULT_GAME_COUNT: usize = 1050;
const DEFAULT_URL_TAG: &str = "LichessURL";
const DEFAULT_ENGINE: &str = "stockfish";
const DEFAULT_NODES: u64 = 3_000_000;
const DEFAULT_THREADS: u32 = 14;
const DEFAULT_HASH_MB: u32 = 3000;
const DEFAULT_COMMIT_EVERY: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No input PGN given (use --input or CHESS_DATASET_INPUT)")]
    MissingInput,
    #[error("Search time must be a positive number of seconds, got {0}")]
    InvalidTime(f64),
    #[error("--commit-every must be at least 1")]
    InvalidCommitInterval,
    #[error("Expected NAME=VALUE, got {0:?}")]
    InvalidOption(String),
}

/// Build a chess evaluation dataset from PGN games.
///
/// Without a subcommand all stages run in order.
#[derive(Debug, Parser)]
#[command(name = "chess-dataset", version, args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// SQLite database file, created when missing.
    #[arg(long, global = true, env = "CHESS_DATASET_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: PathBuf,

    /// Also write logs to a daily rolling file in this directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,
}

impl Cli {
    /// The selected command, `run` when none was given.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Run(self.run))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract, store, expand and annotate.
    Run(RunArgs),
    /// Extract games from the input PGN and store them.
    Extract(ExtractArgs),
    /// Expand stored games into per-ply positions.
    Expand,
    /// Evaluate every position that has no evaluation yet.
    Annotate(EngineArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub extract: ExtractArgs,
    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Debug, Clone, Args)]
pub struct ExtractArgs {
    /// PGN file to read games from.
    #[arg(long, env = "CHESS_DATASET_INPUT")]
    pub input: Option<PathBuf>,

    /// Number of games to read, including the ones that get filtered out.
    #[arg(long = "games", env = "CHESS_DATASET_GAMES", default_value_t = DEFAULT_GAME_COUNT)]
    pub game_count: usize,

    /// Header tag holding each game's unique URL.
    #[arg(long, default_value = DEFAULT_URL_TAG)]
    pub url_tag: String,
}

impl ExtractArgs {
    pub fn input_path(&self) -> Result<PathBuf, ConfigError> {
        self.input.clone().ok_or(ConfigError::MissingInput)
    }

    pub fn options(&self) -> ExtractOptions {
        ExtractOptions {
            game_count: self.game_count,
            url_tag: self.url_tag.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineKindArg {
    Stockfish,
    Lc0,
}

impl From<EngineKindArg> for EngineKind {
    fn from(kind: EngineKindArg) -> Self {
        match kind {
            EngineKindArg::Stockfish => EngineKind::Stockfish,
            EngineKindArg::Lc0 => EngineKind::Lc0,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct EngineArgs {
    /// UCI engine executable.
    #[arg(long, env = "CHESS_DATASET_ENGINE", default_value = DEFAULT_ENGINE)]
    pub engine: PathBuf,

    /// Argument passed to the engine executable. Repeatable.
    #[arg(long = "engine-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    #[arg(long, value_enum, default_value_t = EngineKindArg::Stockfish)]
    pub engine_kind: EngineKindArg,

    /// Node budget per position [default: 3000000]
    #[arg(long, conflicts_with = "time")]
    pub nodes: Option<u64>,

    /// Wall-clock budget per position, in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub time: Option<f64>,

    #[arg(long, default_value_t = DEFAULT_THREADS)]
    pub threads: u32,

    /// Hash table size in MB (Stockfish only).
    #[arg(long = "hash", value_name = "MB", default_value_t = DEFAULT_HASH_MB)]
    pub hash_mb: u32,

    /// Turn off Stockfish's NNUE evaluation.
    #[arg(long)]
    pub no_nnue: bool,

    /// Do not ask the engine for win/draw/loss statistics.
    #[arg(long)]
    pub no_wdl: bool,

    /// Extra UCI option. Repeatable.
    #[arg(long = "option", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    pub options: Vec<(String, String)>,

    /// Positions evaluated per database commit.
    #[arg(long, default_value_t = DEFAULT_COMMIT_EVERY)]
    pub commit_every: usize,
}

impl EngineArgs {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            path: self.engine.clone(),
            args: self.engine_args.clone(),
            kind: self.engine_kind.into(),
            options: EngineOptions {
                threads: Some(self.threads),
                hash_mb: Some(self.hash_mb),
                use_nnue: Some(!self.no_nnue),
                show_wdl: !self.no_wdl,
                extra: self.options.clone(),
            },
        }
    }

    pub fn search_limit(&self) -> Result<SearchLimit, ConfigError> {
        match (self.time, self.nodes) {
            (Some(seconds), _) => Duration::try_from_secs_f64(seconds)
                .ok()
                .filter(|d| !d.is_zero())
                .map(SearchLimit::Time)
                .ok_or(ConfigError::InvalidTime(seconds)),
            (None, nodes) => Ok(SearchLimit::Nodes(nodes.unwrap_or(DEFAULT_NODES))),
        }
    }

    pub fn annotate_options(&self) -> Result<AnnotateOptions, ConfigError> {
        if self.commit_every == 0 {
            return Err(ConfigError::InvalidCommitInterval);
        }
        Ok(AnnotateOptions {
            limit: self.search_limit()?,
            commit_every: self.commit_every,
            mate_score: DEFAULT_MATE_SCORE,
            record_wdl: !self.no_wdl,
        })
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), ConfigError> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidOption(s.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::InvalidOption(s.to_string()));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
