//! Position annotation with a UCI engine.

use chess::{parse_fen, terminal_state, FenError, Terminal};
use cozy_chess::{Board, Color};
use engine::{Analysis, EngineConfig, EngineError, EngineSession, SearchLimit};
use std::future::Future;

use crate::persistence::{
    Database, PersistenceError, PositionEvaluation, SqlitePositionRepository,
};

/// Centipawn value standing in for a forced mate.
pub const DEFAULT_MATE_SCORE: i32 = 10_000;

#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    pub limit: SearchLimit,
    /// Rows written per transaction.
    pub commit_every: usize,
    pub mate_score: i32,
    /// Store win/draw/loss fractions. When off, every row keeps them NULL,
    /// terminal rows included.
    pub record_wdl: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotateReport {
    /// Rows that received an evaluation, terminal ones included.
    pub annotated: usize,
    /// Checkmate or stalemate rows valued without the engine.
    pub terminal: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum AnnotateError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Position {position_id} has a bad FEN: {source}")]
    Fen {
        position_id: i64,
        #[source]
        source: FenError,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Anything that can analyse a single position.
pub trait Evaluator {
    fn evaluate(
        &mut self,
        board: &Board,
        limit: SearchLimit,
    ) -> impl Future<Output = Result<Analysis, EngineError>> + Send;
}

impl Evaluator for EngineSession {
    async fn evaluate(
        &mut self,
        board: &Board,
        limit: SearchLimit,
    ) -> Result<Analysis, EngineError> {
        self.analyse(board, limit).await
    }
}

/// Launch the configured engine, annotate every pending position and shut
/// the engine down again, whether or not the pass succeeded.
#[tracing::instrument(level = "info", skip_all, fields(engine = %config.path.display()))]
pub async fn annotate_with_engine(
    db: &Database,
    config: &EngineConfig,
    options: &AnnotateOptions,
) -> Result<AnnotateReport, AnnotateError> {
    let mut session = EngineSession::spawn(config).await?;

    let result = annotate_positions(db, &mut session, options).await;
    session.shutdown().await;
    result
}

/// Evaluate every position whose `eval` is still NULL, in row order.
///
/// Evaluations are committed every `commit_every` rows. On error the open
/// transaction is rolled back, so those rows stay pending for the next run.
#[tracing::instrument(level = "info", skip_all)]
pub async fn annotate_positions<E: Evaluator>(
    db: &Database,
    evaluator: &mut E,
    options: &AnnotateOptions,
) -> Result<AnnotateReport, AnnotateError> {
    let pending = SqlitePositionRepository::new(db.pool().clone())
        .pending_positions()
        .await?;
    let total = pending.len();
    tracing::info!(total, "Annotating positions");

    let commit_every = options.commit_every.max(1);
    let mut report = AnnotateReport::default();
    let mut tx = db.pool().begin().await?;
    let mut uncommitted = 0;

    for row in pending {
        let board = parse_fen(&row.fen).map_err(|source| AnnotateError::Fen {
            position_id: row.position_id,
            source,
        })?;

        let evaluation = match terminal_state(&board) {
            Some(terminal) => {
                tracing::debug!(position_id = row.position_id, ?terminal, "Terminal position");
                report.terminal += 1;
                terminal_evaluation(terminal, board.side_to_move(), options.mate_score)
            }
            None => {
                let analysis = evaluator.evaluate(&board, options.limit).await?;
                tracing::debug!(
                    position_id = row.position_id,
                    depth = ?analysis.depth,
                    nodes = ?analysis.nodes,
                    best_move = %analysis.best_move,
                    "Position analysed"
                );
                engine_evaluation(&analysis, options.mate_score)
            }
        };
        let evaluation = if options.record_wdl {
            evaluation
        } else {
            PositionEvaluation {
                win_chance: None,
                draw_chance: None,
                lose_chance: None,
                ..evaluation
            }
        };

        SqlitePositionRepository::write_evaluation(&mut *tx, row.position_id, &evaluation)
            .await?;
        report.annotated += 1;
        uncommitted += 1;

        if uncommitted == commit_every {
            tx.commit().await?;
            tx = db.pool().begin().await?;
            uncommitted = 0;
            tracing::info!(done = report.annotated, total, "Committed evaluations");
        }
    }

    tx.commit().await?;
    tracing::info!(
        annotated = report.annotated,
        terminal = report.terminal,
        "Annotation complete"
    );
    Ok(report)
}

/// Canonical value of a game-ending position. The side to move is the one
/// mated, so WDL is always a loss from its point of view.
fn terminal_evaluation(terminal: Terminal, turn: Color, mate_score: i32) -> PositionEvaluation {
    match terminal {
        Terminal::Checkmate => PositionEvaluation {
            eval: match turn {
                Color::White => -mate_score as f64,
                Color::Black => mate_score as f64,
            },
            win_chance: Some(0.0),
            draw_chance: Some(0.0),
            lose_chance: Some(1.0),
        },
        Terminal::Stalemate => PositionEvaluation {
            eval: 0.0,
            win_chance: Some(0.0),
            draw_chance: Some(1.0),
            lose_chance: Some(0.0),
        },
    }
}

fn engine_evaluation(analysis: &Analysis, mate_score: i32) -> PositionEvaluation {
    let cp = analysis
        .white_score()
        .to_cp(mate_score)
        .clamp(-mate_score, mate_score);
    let (win_chance, draw_chance, lose_chance) = match analysis.wdl {
        Some(wdl) => {
            let (w, d, l) = wdl.fractions();
            (Some(w), Some(d), Some(l))
        }
        None => (None, None, None),
    };

    PositionEvaluation {
        eval: cp as f64,
        win_chance,
        draw_chance,
        lose_chance,
    }
}
