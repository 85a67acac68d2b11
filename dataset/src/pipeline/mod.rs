//! The four dataset stages, run in order: extract games from PGN, store them,
//! expand each game into per-ply positions and annotate those positions with
//! engine evaluations.
//!
//! Every stage only works on rows the previous runs left unfinished, so the
//! whole pipeline can be interrupted and restarted.

pub mod annotate;
pub mod expand;
pub mod extract;
pub mod store;

pub use annotate::{
    annotate_positions, annotate_with_engine, AnnotateError, AnnotateOptions, AnnotateReport,
    Evaluator, DEFAULT_MATE_SCORE,
};
pub use expand::{expand_positions, ExpandError, ExpandReport};
pub use extract::{
    extract_games, extract_games_from_path, ExtractError, ExtractOptions, ExtractReport,
};
pub use store::{write_games, StoreReport};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{Database, SqliteGameRepository};
    use cozy_chess::{Board, Move, Square};
    use engine::{Analysis, EngineError, Score, SearchLimit, Wdl};
    use std::io::Write;

    const INPUT: &str = r#"[Event "Rated Blitz game"]
[LichessURL "https://lichess.org/aaaa"]
[Result "1-0"]
[WhiteElo "2012"]
[BlackElo "1987"]
[Termination "Normal"]

1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6 4. Qxf7# 1-0

[Event "Rated Blitz game"]
[LichessURL "https://lichess.org/bbbb"]
[Result "1/2-1/2"]
[WhiteElo "2200"]
[BlackElo "2210"]
[Termination "Normal"]

1. d4 { a comment } d5 2. c4 (2. Nf3 Nf6) e6 1/2-1/2

[Event "Rated Blitz game"]
[LichessURL "https://lichess.org/cccc"]
[Result "0-1"]
[WhiteElo "1500"]
[BlackElo "?"]
[Termination "Abandoned"]

1. e4 0-1
"#;

    struct Material;

    impl Evaluator for Material {
        async fn evaluate(
            &mut self,
            board: &Board,
            _limit: SearchLimit,
        ) -> Result<Analysis, EngineError> {
            Ok(Analysis {
                turn: board.side_to_move(),
                score: Score::Centipawns(15),
                wdl: Some(Wdl {
                    win: 300,
                    draw: 600,
                    loss: 100,
                }),
                depth: Some(1),
                nodes: Some(1),
                best_move: Move {
                    from: Square::A2,
                    to: Square::A3,
                    promotion: None,
                },
            })
        }
    }

    #[tokio::test]
    async fn test_full_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("games.pgn");
        std::fs::File::create(&input)
            .unwrap()
            .write_all(INPUT.as_bytes())
            .unwrap();
        let db = Database::open(&dir.path().join("games.sqlite")).await.unwrap();

        let options = ExtractOptions {
            game_count: 3,
            url_tag: "LichessURL".to_string(),
        };
        let (games, report) = extract_games_from_path(&input, &options).unwrap();
        assert_eq!(report, ExtractReport { games_read: 3, games_kept: 2 });

        let stored = write_games(&db, &games).await.unwrap();
        assert_eq!(stored.total, 2);

        let expanded = expand_positions(&db).await.unwrap();
        assert_eq!(expanded.games_expanded, 2);
        // 7 plies in the mate, 4 mainline plies in the draw
        assert_eq!(expanded.positions_inserted, 11);

        let annotated = annotate_positions(
            &db,
            &mut Material,
            &AnnotateOptions {
                limit: SearchLimit::Nodes(1),
                commit_every: 3,
                mate_score: DEFAULT_MATE_SCORE,
                record_wdl: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(annotated.annotated, 11);
        assert_eq!(annotated.terminal, 1);

        let evals: Vec<(Option<f64>,)> = sqlx::query_as("SELECT eval FROM positions")
            .fetch_all(db.pool())
            .await
            .unwrap();
        assert!(evals
            .iter()
            .all(|(e,)| e.is_some_and(|e| (-10000.0..=10000.0).contains(&e))));

        let (mate_eval,): (f64,) = sqlx::query_as(
            "SELECT eval FROM positions WHERE game_id = 1 ORDER BY ply DESC LIMIT 1",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(mate_eval, 10000.0);

        let rows: Vec<(String, i64, Option<i64>, Option<i64>)> =
            sqlx::query_as("SELECT url, result, elo_white, elo_black FROM games ORDER BY rowid")
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert_eq!(
            rows,
            vec![
                ("https://lichess.org/aaaa".to_string(), 1, Some(2012), Some(1987)),
                ("https://lichess.org/bbbb".to_string(), 0, Some(2200), Some(2210)),
            ]
        );

        // Nothing is left for a second run
        assert_eq!(write_games(&db, &games).await.unwrap().inserted, 0);
        assert_eq!(expand_positions(&db).await.unwrap(), ExpandReport::default());
        let again = annotate_positions(
            &db,
            &mut Material,
            &AnnotateOptions {
                limit: SearchLimit::Nodes(1),
                commit_every: 3,
                mate_score: DEFAULT_MATE_SCORE,
                record_wdl: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(again, AnnotateReport::default());
        assert_eq!(
            SqliteGameRepository::new(db.pool().clone()).count().await.unwrap(),
            2
        );

        db.close().await;
    }
}
