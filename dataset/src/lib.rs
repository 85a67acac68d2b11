//! Chess evaluation dataset builder: configuration, SQLite persistence and
//! the pipeline stages driven by the `chess-dataset` binary.

pub mod config;
pub mod persistence;
pub mod pipeline;
