//! A single long-lived UCI engine process.
//!
//! [`EngineSession::spawn`] starts the process, performs the `uci` /
//! `uciok` handshake and applies the configured options. The session is then
//! reused for every [`EngineSession::analyse`] call of a batch. The child is
//! spawned with `kill_on_drop`, so dropping a session on an error path never
//! leaks the engine; [`EngineSession::shutdown`] is the graceful exit.

use crate::uci::{parse_uci_message, UciMessage};
use crate::{Analysis, EngineInfo, EngineKind, EngineOptions, SearchLimit};
use cozy_chess::{Board, Move};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const READY_TIMEOUT: Duration = Duration::from_secs(60);
const QUIT_GRACE: Duration = Duration::from_secs(1);

/// How to launch and configure the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub args: Vec<String>,
    pub kind: EngineKind,
    pub options: EngineOptions,
}

/// Events forwarded by the stdout reader task
#[derive(Debug, Clone)]
enum EngineEvent {
    UciOk,
    ReadyOk,
    Info(EngineInfo),
    BestMove(Option<Move>),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Failed to spawn engine {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error talking to engine: {0}")]
    Io(#[from] std::io::Error),
    #[error("Engine has no {0}")]
    MissingPipe(&'static str),
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("Engine closed its output")]
    Closed,
    #[error("Engine returned no move for {fen}")]
    NoBestMove { fen: String },
    #[error("Engine reported no score for {fen}")]
    NoScore { fen: String },
}

pub struct EngineSession {
    process: Child,
    stdin: ChildStdin,
    event_rx: mpsc::Receiver<EngineEvent>,
    name: Option<String>,
}

impl EngineSession {
    /// Spawn the engine, complete the UCI handshake and apply `config.options`.
    #[tracing::instrument(level = "info", skip(config), fields(path = %config.path.display(), kind = ?config.kind))]
    pub async fn spawn(config: &EngineConfig) -> Result<Self, EngineError> {
        tracing::debug!("Spawning engine process");
        let mut process = tokio::process::Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                tracing::error!("Failed to spawn engine: {}", source);
                EngineError::Spawn {
                    path: config.path.clone(),
                    source,
                }
            })?;

        let stdin = process.stdin.take().ok_or(EngineError::MissingPipe("stdin"))?;
        let stdout = process
            .stdout
            .take()
            .ok_or(EngineError::MissingPipe("stdout"))?;

        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(64);
        let (name_tx, mut name_rx) = mpsc::channel::<String>(1);

        // Spawn output reader task
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        tracing::debug!("Engine stdout EOF");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        tracing::trace!("UCI << {}", trimmed);

                        let event = match parse_uci_message(trimmed) {
                            Ok(UciMessage::UciOk) => EngineEvent::UciOk,
                            Ok(UciMessage::ReadyOk) => EngineEvent::ReadyOk,
                            Ok(UciMessage::Info(info)) => EngineEvent::Info(info),
                            Ok(UciMessage::BestMove { mv, .. }) => EngineEvent::BestMove(mv),
                            Ok(UciMessage::Id { name, value }) => {
                                if name == "name" {
                                    let _ = name_tx.try_send(value);
                                }
                                continue;
                            }
                            Err(_) => continue,
                        };

                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Error reading from engine stdout: {}", e);
                        break;
                    }
                }
            }
        });

        let mut session = Self {
            process,
            stdin,
            event_rx,
            name: None,
        };

        session.send("uci").await?;
        session
            .wait_for(HANDSHAKE_TIMEOUT, "uciok", |event| {
                matches!(event, EngineEvent::UciOk)
            })
            .await?;
        session.name = name_rx.try_recv().ok();
        tracing::info!(name = ?session.name, "Engine ready");

        let options = config.options.uci_options(config.kind);
        session.configure(&options).await?;

        Ok(session)
    }

    /// Engine name from its `id name` line, if it sent one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Send `setoption` for every pair and wait until the engine is ready.
    pub async fn configure(&mut self, options: &[(String, String)]) -> Result<(), EngineError> {
        for (name, value) in options {
            tracing::info!("Setting {} to {}", name, value);
            self.send(&format!("setoption name {} value {}", name, value))
                .await?;
        }

        self.send("isready").await?;
        self.wait_for(READY_TIMEOUT, "readyok", |event| {
            matches!(event, EngineEvent::ReadyOk)
        })
        .await
    }

    /// Search `board` within `limit` and return the final score.
    ///
    /// The reported score and WDL are the last ones seen for the principal
    /// line before `bestmove`.
    pub async fn analyse(
        &mut self,
        board: &Board,
        limit: SearchLimit,
    ) -> Result<Analysis, EngineError> {
        let fen = chess::format_fen(board);
        self.send(&format!("position fen {}", fen)).await?;

        let go = match limit {
            SearchLimit::Nodes(nodes) => format!("go nodes {}", nodes),
            SearchLimit::Time(duration) => format!("go movetime {}", duration.as_millis().max(1)),
        };
        self.send(&go).await?;

        let mut last = EngineInfo::default();
        loop {
            match self.event_rx.recv().await {
                Some(EngineEvent::Info(info)) => {
                    if info.multipv.is_some_and(|n| n > 1) {
                        continue;
                    }
                    if info.score.is_some() {
                        last.score = info.score;
                        last.depth = info.depth.or(last.depth);
                        last.nodes = info.nodes.or(last.nodes);
                    }
                    if info.wdl.is_some() {
                        last.wdl = info.wdl;
                    }
                }
                Some(EngineEvent::BestMove(mv)) => {
                    let best_move = mv.ok_or_else(|| EngineError::NoBestMove { fen: fen.clone() })?;
                    let score = last.score.ok_or(EngineError::NoScore { fen })?;
                    return Ok(Analysis {
                        turn: board.side_to_move(),
                        score,
                        wdl: last.wdl,
                        depth: last.depth,
                        nodes: last.nodes,
                        best_move,
                    });
                }
                Some(_) => continue,
                None => return Err(EngineError::Closed),
            }
        }
    }

    /// Ask the engine to quit, killing it if it does not exit promptly.
    pub async fn shutdown(mut self) {
        tracing::debug!("Shutting down engine");
        let _ = self.send("quit").await;
        if tokio::time::timeout(QUIT_GRACE, self.process.wait())
            .await
            .is_err()
        {
            tracing::warn!("Engine did not exit after quit, killing it");
            let _ = self.process.kill().await;
        }
    }

    async fn send(&mut self, command: &str) -> Result<(), EngineError> {
        tracing::trace!("UCI >> {}", command);
        self.stdin.write_all(command.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn wait_for(
        &mut self,
        timeout: Duration,
        what: &'static str,
        done: impl Fn(&EngineEvent) -> bool,
    ) -> Result<(), EngineError> {
        let wait = async {
            while let Some(event) = self.event_rx.recv().await {
                if done(&event) {
                    return Ok(());
                }
            }
            Err(EngineError::Closed)
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| EngineError::Timeout(what))?
    }
}
