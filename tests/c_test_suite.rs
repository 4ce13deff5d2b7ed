//! Tactical regression tests for the pattern matcher, prior knowledge, and
//! playout policy, in the spirit of the original engine's fix_atari/
//! large-pattern GTP regression suite but built directly against this
//! crate's board/policy API rather than replayed GTP transcripts.
//!
//! Shapes are built from raw point arithmetic, as `board.rs`'s own unit
//! tests do, so they land on the intended points regardless of board size.

use gotree::board::Board;
use gotree::constants::{BOARD_IMIN, N, W};
use gotree::knowledge::compute_prior;
use gotree::patterns::pat3_match;
use gotree::playout_board::PlayoutBoard;
use gotree::point::Color;
use gotree::policy::{PlayoutPolicy, PlayoutPolicyParams};

// =============================================================================
// 3x3 pattern matching
// =============================================================================

/// The "enclosing hane" shape (mover stones on both diagonal corners ahead
/// of an opponent stone, with the flanking points open) from the mover's
/// perspective.
#[test]
fn enclosing_hane_shape_matches_pat3() {
    let mut board = Board::new();
    let p = BOARD_IMIN + 3 * W + 3;
    let north = p - W;
    let northwest = p - W - 1;
    let northeast = p - W + 1;

    board.play(northwest, Color::Black).unwrap();
    board.play(northeast, Color::Black).unwrap();
    board.play(north, Color::White).unwrap(); // played last: to_play() -> Black

    assert_eq!(board.to_play(), Color::Black);
    assert!(pat3_match(&board, p));
}

/// The same shape rotated 90 degrees must still match: the pattern table is
/// built symmetry-closed over all 8 rotations/flips (`patterns.rs`'s
/// `pat_enumerate`), so a rotated tactical shape is exactly as recognizable
/// as the original orientation.
#[test]
fn enclosing_hane_shape_still_matches_after_90_degree_rotation() {
    let mut board = Board::new();
    let p = BOARD_IMIN + 3 * W + 3;
    let east = p + 1;
    let northeast = p - W + 1;
    let southeast = p + W + 1;

    board.play(southeast, Color::Black).unwrap();
    board.play(northeast, Color::Black).unwrap();
    board.play(east, Color::White).unwrap(); // played last: to_play() -> Black

    assert_eq!(board.to_play(), Color::Black);
    assert!(pat3_match(&board, p));
}

#[test]
fn diamond_context_flag_bits_are_independent_of_board_state() {
    let board = Board::new();
    let p = BOARD_IMIN + (N / 2) * W + (N / 2);

    let base = gotree::patterns::diamond_context(&board, p, false, false);
    let with_ko = gotree::patterns::diamond_context(&board, p, true, false);
    let with_both = gotree::patterns::diamond_context(&board, p, true, true);

    assert_eq!(with_ko, base | (1 << 24));
    assert_eq!(with_both, base | (1 << 24) | (1 << 25));
}

// =============================================================================
// Prior knowledge
// =============================================================================

#[test]
fn capturing_move_gets_a_higher_prior_mean_than_a_neutral_move() {
    let mut board = Board::new();
    let white_pt = BOARD_IMIN + W + 1;
    let capture_pt = white_pt + W; // White's one remaining liberty

    board.play(white_pt - W, Color::Black).unwrap();
    board.play(white_pt - 1, Color::Black).unwrap();
    board.play(white_pt + 1, Color::Black).unwrap();
    board.play(white_pt, Color::White).unwrap(); // played last: to_play() -> Black

    assert_eq!(board.to_play(), Color::Black);
    assert!(board.in_atari(white_pt));

    let capture_prior = compute_prior(&board, capture_pt, true, 1);

    let neutral_pt = BOARD_IMIN + (N / 2) * W + (N / 2);
    let neutral_prior = compute_prior(&board, neutral_pt, false, 0);

    assert!(capture_prior.mean > neutral_prior.mean);
}

// =============================================================================
// Playout policy: atari defence
// =============================================================================

#[test]
fn policy_extends_a_group_put_into_atari_by_the_last_move() {
    let mut board = PlayoutBoard::from_board(&Board::new());
    let p = BOARD_IMIN + 3 * W + 3;

    board.play(p, Color::Black).unwrap();
    board.play(p - W, Color::White).unwrap();
    board.play(p - 1, Color::White).unwrap();
    board.play(p + 1, Color::White).unwrap(); // played last, puts p into atari

    assert!(board.in_atari(p));
    assert_eq!(board.the_liberty(p), Some(p + W));

    let policy = PlayoutPolicy::new(PlayoutPolicyParams {
        fillboard_tries: 0,
        gamma_weighted: false,
        prob_heuristic_capture: 1.0,
        prob_heuristic_pat3: 0.0,
    });
    let rng = fastrand::Rng::with_seed(1);

    assert_eq!(policy.generate_move(&board, &rng), p + W);
}

#[test]
fn policy_never_returns_an_occupied_point() {
    let mut board = PlayoutBoard::from_board(&Board::new());
    let p = BOARD_IMIN + 3 * W + 3;
    board.play(p, Color::Black).unwrap();
    board.play(p + 2, Color::White).unwrap();

    let policy = PlayoutPolicy::new(PlayoutPolicyParams::default());
    let rng = fastrand::Rng::with_seed(7);

    for _ in 0..100 {
        let mv = policy.generate_move(&board, &rng);
        if mv != gotree::point::PASS {
            assert_ne!(mv, p);
            assert_ne!(mv, p + 2);
        }
    }
}
