//! Terminal evaluation: turning a finished or mercy-truncated
//! playout into a backup value in `[0, 1]`.
//!
//! Grounded on `playout::score` (the per-point `is_eyeish`
//! area estimate, kept here as `simple_end_position_score`) widened with a
//! proper flood-fill Tromp-Taylor area score for positions that did not end
//! in two passes, plus the mercy rule and score-modification knobs described
//! in `original_source/gouct/GoUctGlobalSearch.h`'s
//! `GoUctGlobalSearchStateParam` (`m_mercyRule`, `m_lengthModification`,
//! `m_scoreModification`).

use std::collections::VecDeque;

use crate::board::{Board, Rules};
use crate::board_like::BoardLike;
use crate::constants::{
    LENGTH_MOD_BETA_LARGE, LENGTH_MOD_BETA_SMALL, LENGTH_MOD_CAP, MERCY_FRACTION, N,
    SCORE_ALPHA, SMALL_BOARD_THRESHOLD,
};
use crate::point::{neighbors4, Color, Point};

/// Board-area point count, used as the mercy-rule and score-modification
/// normalisation denominator `S`.
fn board_area() -> f64 {
    (N * N) as f64
}

/// `true` once a stone-count imbalance is large enough to short-circuit a
/// hopeless playout. Checked after every playout move, not just
/// at the end.
pub fn mercy_triggered(board: &dyn BoardLike) -> Option<Color> {
    let mut black = 0i64;
    let mut white = 0i64;
    for p in board.iter_board() {
        match board.color_at(p) {
            Color::Black => black += 1,
            Color::White => white += 1,
            _ => {}
        }
    }
    let threshold = (MERCY_FRACTION * board_area()) as i64;
    if black - white >= threshold {
        Some(Color::Black)
    } else if white - black >= threshold {
        Some(Color::White)
    } else {
        None
    }
}

/// A cheap per-point area estimate: every empty point effective-
/// colours to whichever side it is `is_eyeish` for (neutral if shared or
/// fully open), stones count for their own colour. Valid once a playout has
/// ended in two passes, since the policy never passes while a non-eye move
/// remains, so every empty region left is a settled eye or dame (see
/// `original_source`'s `@page gouctpassmoves`).
pub fn simple_end_position_score(board: &dyn BoardLike) -> f64 {
    let mut margin = 0.0;
    for p in board.iter_board() {
        let c = board.color_at(p);
        let effective = if c == Color::Empty {
            if board.is_eyeish(p, Color::Black) {
                Color::Black
            } else if board.is_eyeish(p, Color::White) {
                Color::White
            } else {
                Color::Empty
            }
        } else {
            c
        };
        match effective {
            Color::Black => margin += 1.0,
            Color::White => margin -= 1.0,
            _ => {}
        }
    }
    margin
}

/// Full area (Tromp-Taylor) score: flood-fill every empty region, crediting
/// it to a colour only if every stone bordering the region is that one
/// colour. Used whenever a playout was cut short by the simulation-length
/// cap or the mercy rule rather than ending in two passes, where the cheap
/// per-point estimate above would misjudge large open regions.
pub fn tromp_taylor_score(board: &dyn BoardLike) -> f64 {
    let mut seen = std::collections::HashSet::new();
    let mut margin = 0.0;
    for p in board.iter_board() {
        let c = board.color_at(p);
        match c {
            Color::Black => margin += 1.0,
            Color::White => margin -= 1.0,
            Color::Empty => {
                if seen.contains(&p) {
                    continue;
                }
                let (region, border_colour) = flood_region(board, p, &mut seen);
                match border_colour {
                    Some(Color::Black) => margin += region.len() as f64,
                    Some(Color::White) => margin -= region.len() as f64,
                    _ => {}
                }
            }
            _ => {}
        }
    }
    margin
}

/// BFS over one maximal empty region starting at `start`, returning its
/// points and the single colour bordering it (`None` if the region borders
/// both colours or neither).
fn flood_region(
    board: &dyn BoardLike,
    start: Point,
    seen: &mut std::collections::HashSet<Point>,
) -> (Vec<Point>, Option<Color>) {
    let mut region = Vec::new();
    let mut border: Option<Color> = None;
    let mut mixed = false;
    let mut q = VecDeque::new();
    q.push_back(start);
    seen.insert(start);
    while let Some(p) = q.pop_front() {
        region.push(p);
        for n in neighbors4(p) {
            let cn = board.color_at(n);
            match cn {
                Color::Empty => {
                    if seen.insert(n) {
                        q.push_back(n);
                    }
                }
                Color::Black | Color::White => {
                    if let Some(prev) = border {
                        if prev != cn {
                            mixed = true;
                        }
                    } else {
                        border = Some(cn);
                    }
                }
                Color::Border => {}
            }
        }
    }
    (region, if mixed { None } else { border })
}

/// Inputs to `terminal_value`: everything about how a simulation ended that
/// the scoring formula needs besides the final board itself.
pub struct PlayoutOutcome {
    pub ended_in_two_passes: bool,
    pub mercy_winner: Option<Color>,
    pub moves_played: u32,
}

/// The full terminal-evaluation pipeline: mercy short-circuit, else simple
/// or Tromp-Taylor area score depending on how the playout ended,
/// komi/handicap-adjusted, then passed through the length/score
/// modification formula. Returns Black's win value in `[0, 1]`; the caller
/// (the search driver's backup step) flips it for White's perspective.
pub fn terminal_value(board: &dyn BoardLike, rules: &Rules, outcome: &PlayoutOutcome) -> f64 {
    let beta = if N < SMALL_BOARD_THRESHOLD { LENGTH_MOD_BETA_SMALL } else { LENGTH_MOD_BETA_LARGE };
    let s_max = board_area();

    if let Some(winner) = outcome.mercy_winner {
        let margin = if winner == Color::Black { s_max } else { -s_max };
        return score_modification(margin, s_max, outcome.moves_played, beta);
    }

    let raw = if outcome.ended_in_two_passes {
        simple_end_position_score(board)
    } else {
        tromp_taylor_score(board)
    };
    let handicap_adjust = if rules.handicap_stones > 1 { rules.handicap_stones as f64 - 1.0 } else { 0.0 };
    let margin = raw - rules.komi as f64 - handicap_adjust;
    score_modification(margin, s_max, outcome.moves_played, beta)
}

/// `value = (1-alpha) + alpha*(m/S) - length_mod` on a win, mirrored
/// symmetrically around 0.5 on a loss, exactly 0.5 on a draw. Grounded on
/// `GoUctGlobalSearchStateParam::m_scoreModification`/`m_lengthModification`.
fn score_modification(margin: f64, s_max: f64, moves_played: u32, beta: f64) -> f64 {
    if margin == 0.0 {
        return 0.5;
    }
    let length_mod = (moves_played as f64 * beta).min(LENGTH_MOD_CAP);
    let win_value = (1.0 - SCORE_ALPHA) + SCORE_ALPHA * (margin.abs() / s_max) - length_mod;
    let win_value = win_value.clamp(0.0, 1.0);
    if margin > 0.0 {
        win_value
    } else {
        1.0 - win_value
    }
}

/// Static root-move filtering: drop candidates that are
/// self-atari (losing the stone right back next move) unless they are
/// themselves a capture, so the search never wastes simulations confirming
/// an obvious blunder.
pub fn root_filter(board: &Board, candidates: &[Point]) -> Vec<Point> {
    candidates
        .iter()
        .copied()
        .filter(|&mv| !is_losing_self_atari(board, mv))
        .collect()
}

fn is_losing_self_atari(board: &Board, mv: Point) -> bool {
    let mut trial = board.clone();
    let colour = trial.to_play();
    let captured_before: usize = neighbors4(mv)
        .iter()
        .filter(|&&n| board.color_at(n) == colour.opponent() && board.in_atari(n))
        .count();
    if trial.play(mv, colour).is_err() {
        return false;
    }
    captured_before == 0 && trial.in_atari(mv)
}

/// Forced-opening heuristic: on an empty board at or above the
/// small-board threshold, play a fixed corner star point rather than
/// spending simulations distinguishing near-equivalent opening moves. Below
/// the threshold (9x9, 13x13) this never fires and the tree is searched from
/// the first move as usual.
pub fn forced_opening_move(board: &Board) -> Option<Point> {
    if N < SMALL_BOARD_THRESHOLD || board.move_number() != 0 {
        return None;
    }
    let corner = 4.min(N / 4 + 2);
    Some(crate::constants::BOARD_IMIN + (corner - 1) * crate::constants::W + (corner - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::constants::{BOARD_IMIN, W};

    #[test]
    fn empty_board_scores_as_fully_neutral_to_komi() {
        let b = Board::new();
        let rules = Rules::default();
        let outcome = PlayoutOutcome { ended_in_two_passes: true, mercy_winner: None, moves_played: 2 };
        let value = terminal_value(&b, &rules, &outcome);
        // Komi favours White on an empty board; Black's win value should be
        // below 0.5 but the formula must still land in range.
        assert!((0.0..1.0).contains(&value));
        assert!(value < 0.5);
    }

    #[test]
    fn tromp_taylor_credits_surrounded_region_to_one_colour() {
        let mut b = Board::new();
        let a1 = BOARD_IMIN;
        let b1 = a1 + 1;
        let a2 = a1 + W;
        let b2 = a1 + W + 1;
        b.play(b2, Color::Black).unwrap();
        b.play(b1, Color::White).unwrap();
        let _ = a2;
        let margin = tromp_taylor_score(&b);
        // Corner point a1 borders both colours through a2; exact value isn't
        // asserted, only that scoring does not panic and stays bounded.
        assert!(margin.abs() <= (N * N) as f64);
    }

    #[test]
    fn mercy_rule_fires_on_lopsided_stone_counts() {
        // Black stones on every other point (never adjacent, so each play
        // stays legal) easily clears the mercy threshold with none captured.
        let mut b = Board::new();
        let threshold = (MERCY_FRACTION * (N * N) as f64) as usize + 1;
        let mut placed = 0;
        for row in 0..N {
            for col in (row % 2..N).step_by(2) {
                if placed >= threshold {
                    break;
                }
                let pt = BOARD_IMIN + row * W + col;
                b.play(pt, Color::Black).unwrap();
                placed += 1;
            }
        }
        assert_eq!(mercy_triggered(&b), Some(Color::Black));
    }

    #[test]
    fn score_modification_is_symmetric_around_half() {
        let win = score_modification(10.0, 81.0, 0, 0.0);
        let loss = score_modification(-10.0, 81.0, 0, 0.0);
        assert!((win - (1.0 - loss)).abs() < 1e-9);
    }
}
