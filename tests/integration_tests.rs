//! Integration tests for the board, scoring, and search driver working
//! together end to end, the way a GTP session would exercise them.
//!
//! Tactical shapes are built from raw point arithmetic off `BOARD_IMIN`
//! (as `board.rs`'s own unit tests do) rather than GTP letters, so the
//! shapes stay exactly where intended regardless of board size.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use gotree::board::Board;
use gotree::constants::{BOARD_IMIN, W};
use gotree::point::{parse_coord, str_coord, Color, PASS};
use gotree::scoring;
use gotree::search::{KnowledgeParams, PlayoutParams, SearchBudget, SearchParams, UctSearch};

/// An interior point with all four orthogonal neighbours (and their own
/// neighbours) still on the board, regardless of whether N is 9 or 13.
fn centre() -> usize {
    BOARD_IMIN + 2 * W + 2
}

// =============================================================================
// Coordinate parsing
// =============================================================================

#[test]
fn coord_roundtrip_for_every_board_point() {
    let board = Board::new();
    for p in board.iter_board() {
        let s = str_coord(p);
        assert_eq!(parse_coord(&s), Some(p));
    }
}

#[test]
fn parse_coord_rejects_the_skipped_i_column() {
    assert_eq!(parse_coord("I5"), None);
}

#[test]
fn pass_parses_and_plays() {
    let mut board = Board::new();
    let undo = board.play(PASS, Color::Black).unwrap();
    assert_eq!(board.move_number(), 1);
    board.undo(&undo);
    assert_eq!(board.move_number(), 0);
}

// =============================================================================
// Capture and liberty bookkeeping
// =============================================================================

#[test]
fn single_stone_capture_empties_the_point() {
    let mut board = Board::new();
    let p = centre();
    board.play(p, Color::White).unwrap();
    board.play(p - W, Color::Black).unwrap();
    board.play(p + W, Color::Black).unwrap();
    board.play(p + 1, Color::Black).unwrap();
    board.play(p - 1, Color::Black).unwrap();
    assert_eq!(board.color_at(p), Color::Empty);
}

#[test]
fn two_stone_group_is_captured_together() {
    let mut board = Board::new();
    let top = centre();
    let bottom = top + W;
    board.play(top, Color::Black).unwrap();
    board.play(bottom, Color::Black).unwrap();
    board.play(top - W, Color::White).unwrap();
    board.play(top - 1, Color::White).unwrap();
    board.play(top + 1, Color::White).unwrap();
    board.play(bottom - 1, Color::White).unwrap();
    board.play(bottom + 1, Color::White).unwrap();
    board.play(bottom + W, Color::White).unwrap();
    assert_eq!(board.color_at(top), Color::Empty);
    assert_eq!(board.color_at(bottom), Color::Empty);
}

#[test]
fn block_in_atari_reports_its_one_liberty() {
    let mut board = Board::new();
    let p = centre();
    board.play(p, Color::Black).unwrap();
    board.play(p - W, Color::White).unwrap();
    board.play(p - 1, Color::White).unwrap();
    board.play(p + 1, Color::White).unwrap();
    assert!(board.in_atari(p));
    assert_eq!(board.the_liberty(p), Some(p + W));
}

// =============================================================================
// Ko
// =============================================================================

#[test]
fn simple_ko_forbids_immediate_recapture() {
    // Corner ko: Black b2/c1, White b1/a2, Black a1 captures b1, leaving a
    // ko point at b1 that White cannot immediately retake.
    let a1 = BOARD_IMIN;
    let b1 = a1 + 1;
    let c1 = a1 + 2;
    let a2 = a1 + W;
    let b2 = a1 + W + 1;

    let mut board = Board::new();
    board.play(b2, Color::Black).unwrap();
    board.play(c1, Color::Black).unwrap();
    board.play(b1, Color::White).unwrap();
    board.play(a2, Color::White).unwrap();
    board.play(a1, Color::Black).unwrap();

    assert_eq!(board.color_at(b1), Color::Empty);
    assert_eq!(board.ko_point(), b1);
    assert!(board.play(b1, Color::White).is_err());
}

// =============================================================================
// Eyes
// =============================================================================

#[test]
fn point_surrounded_on_all_sides_is_eyeish() {
    let mut board = Board::new();
    let p = centre();
    board.play(p - W, Color::Black).unwrap();
    board.play(p + W, Color::Black).unwrap();
    board.play(p - 1, Color::Black).unwrap();
    board.play(p + 1, Color::Black).unwrap();
    assert!(board.is_eyeish(p, Color::Black));
    assert!(!board.is_eyeish(p, Color::White));
}

// =============================================================================
// Scoring
// =============================================================================

#[test]
fn tromp_taylor_score_is_zero_on_a_fully_neutral_empty_board() {
    let board = Board::new();
    assert_eq!(scoring::tromp_taylor_score(&board), 0.0);
}

#[test]
fn root_filter_drops_a_losing_self_atari() {
    let mut board = Board::new();
    let p = centre();
    board.play(p - W, Color::White).unwrap();
    board.play(p - 1, Color::White).unwrap();
    board.play(p + 1, Color::White).unwrap();
    // p's only remaining liberty is south; Black playing there walks into
    // a self-atari that captures nothing.
    let filtered = scoring::root_filter(&board, &[p]);
    assert!(!filtered.contains(&p));
}

// =============================================================================
// Search sanity
// =============================================================================

fn tiny_params() -> SearchParams {
    SearchParams { num_threads: 2, tree_capacity: 5_000, expand_visits: 1, ..SearchParams::default() }
}

#[test]
fn search_from_empty_board_returns_an_on_board_move_or_pass() {
    let board = Board::new();
    let search = UctSearch::new(tiny_params(), PlayoutParams::default(), KnowledgeParams::default());
    let budget = SearchBudget { max_simulations: Some(200), max_time: None };
    let cancel = Arc::new(AtomicBool::new(false));
    let result = search.search(&board, budget, cancel);
    assert!(result.simulations_run > 0);
    assert!(result.best_move == PASS || board.on_board(result.best_move));
}

#[test]
fn subtree_reuse_does_not_panic_after_advancing_the_root() {
    let board = Board::new();
    let mut search = UctSearch::new(tiny_params(), PlayoutParams::default(), KnowledgeParams::default());
    let budget = SearchBudget { max_simulations: Some(300), max_time: None };
    let cancel = Arc::new(AtomicBool::new(false));
    let result = search.search(&board, budget, cancel);
    search.advance_root(result.best_move);
    assert!(!search.tree_truncated());
}

#[test]
fn search_prefers_a_clean_capture_over_an_unrelated_quiet_move() {
    // A 2-stone White block down to its last liberty, with a second White
    // stone placed elsewhere purely to leave Black on move. Taking the
    // block is the only root candidate with any material behind it; an
    // unrelated quiet point on the far side of the board has none.
    let top = centre();
    let bottom = top + W;
    let far_extra = BOARD_IMIN + 6 * W + 2;
    let mv_other = BOARD_IMIN + 6 * W + 6;
    let mv_capture = bottom + W;

    let mut board = Board::new();
    board.rules.komi = 0.0;
    board.play(top, Color::White).unwrap();
    board.play(bottom, Color::White).unwrap();
    board.play(top - W, Color::Black).unwrap();
    board.play(top - 1, Color::Black).unwrap();
    board.play(top + 1, Color::Black).unwrap();
    board.play(bottom - 1, Color::Black).unwrap();
    board.play(bottom + 1, Color::Black).unwrap();
    board.play(far_extra, Color::White).unwrap();

    assert_eq!(board.to_play(), Color::Black);
    assert!(board.in_atari(top));
    assert_eq!(board.the_liberty(top), Some(mv_capture));
    assert_eq!(board.color_at(mv_other), Color::Empty);

    let search = UctSearch::new(tiny_params(), PlayoutParams::default(), KnowledgeParams::default());
    let budget = SearchBudget { max_simulations: Some(1500), max_time: None };
    let cancel = Arc::new(AtomicBool::new(false));
    let result = search.search(&board, budget, cancel);

    assert_eq!(result.best_move, mv_capture);
    assert!(result.root_mean > 0.5, "a winning capture should not back up as a losing move: {}", result.root_mean);
}
