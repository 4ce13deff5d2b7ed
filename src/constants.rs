//! Board geometry, MCTS tuning, playout heuristic and scoring constants.
//!
//! The board uses a padded 1D array representation. Board size is
//! controlled by Cargo features:
//!
//! ```sh
//! cargo build                                               # 9x9 (default)
//! cargo build --no-default-features --features board13x13   # 13x13
//! ```

// =============================================================================
// Board Geometry
// =============================================================================

#[cfg(feature = "board9x9")]
pub const N: usize = 9;

#[cfg(feature = "board13x13")]
pub const N: usize = 13;

#[cfg(all(feature = "board9x9", feature = "board13x13"))]
compile_error!("Cannot enable both 'board9x9' and 'board13x13' features at the same time");

#[cfg(not(any(feature = "board9x9", feature = "board13x13")))]
compile_error!("Must enable exactly one board size feature: 'board9x9' or 'board13x13'");

/// Board width including left padding (N + 2 for padding on both sides).
pub const W: usize = N + 2;

/// Total board array size including all padding.
pub const BOARDSIZE: usize = (N + 2) * (N + 2);

/// First valid board index (skips top and left padding).
pub const BOARD_IMIN: usize = W + 1;

/// Last valid board index (before bottom padding).
pub const BOARD_IMAX: usize = BOARDSIZE - W - 1;

/// Maximum playout length (3 times board area allows for captures and replays).
pub const MAX_GAME_LEN: usize = N * N * 3;

/// Board-size threshold below which the "small board" Greenpeep table family
/// and length-modification beta are used (9x9-style boards vs. 19x19-style).
pub const SMALL_BOARD_THRESHOLD: usize = 15;

/// Offsets to the 8 neighbours of a point in the padded 1D array.
/// Order: North, East, South, West, NE, SE, SW, NW.
pub const DELTA: [isize; 8] = [
    -(W as isize),
    1,
    W as isize,
    -1,
    -(W as isize) + 1,
    W as isize + 1,
    W as isize - 1,
    -(W as isize) - 1,
];

// =============================================================================
// Rules defaults
// =============================================================================

pub const DEFAULT_KOMI: f32 = 7.5;

/// Fraction of total board points by which a stone-count differential
/// triggers the mercy rule during a playout.
pub const MERCY_FRACTION: f64 = 0.25;

// =============================================================================
// MCTS (Monte Carlo Tree Search) Parameters
// =============================================================================

pub const N_SIMS: usize = 1400;
pub const RAVE_EQUIV: f64 = 3500.0;
pub const EXPAND_VISITS: u32 = 8;
pub const REPORT_PERIOD: usize = 200;
pub const RESIGN_THRES: f64 = 0.2;
pub const FASTPLAY20_THRES: f64 = 0.8;
pub const FASTPLAY5_THRES: f64 = 0.95;

/// UCT exploration bias constant `c`. Fuego and both default
/// this near zero when RAVE is carrying most of the exploration weight.
pub const UCT_BIAS_CONSTANT: f64 = 0.0;

/// First-play urgency: the selection value assigned to an as-yet-unvisited
/// child so it can still lose to a confidently good sibling.
pub const FIRST_PLAY_URGENCY: f64 = 1.1;

/// Fraction of the simulation budget after which the early-abort check begins.
pub const EARLY_ABORT_AFTER_FRACTION: f64 = 0.2;
/// Win-rate threshold for early abort / resign-the-other-way decisions.
pub const SURE_WIN_THRESHOLD: f64 = 0.8;
/// Minimum root visits before early abort is allowed to fire.
pub const EARLY_ABORT_MIN_VISITS: u64 = 100;

/// Fraction of empty points whose territory statistic must be decisive for
/// the early-pass probe to commit to a pass.
pub const EARLY_PASS_TERRITORY_FRACTION: f64 = 0.9;
/// An empty point's owner statistic (`owner_map[p] / simulations`, in
/// `[-1, 1]`) counts as decisive once its magnitude reaches this.
pub const EARLY_PASS_DECISIVE_OWNER: f64 = 0.8;

/// Default worker thread count, mirroring the `min(4, hw concurrency)`.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Default node pool capacity (summed across all worker allocators).
pub const DEFAULT_TREE_CAPACITY: usize = 1_000_000;

// =============================================================================
// Prior Values (for MCTS node initialization)
// =============================================================================

pub const PRIOR_EVEN: u32 = 10;
pub const PRIOR_SELFATARI: u32 = 10;
pub const PRIOR_CAPTURE_ONE: u32 = 15;
pub const PRIOR_CAPTURE_MANY: u32 = 30;
pub const PRIOR_PAT3: u32 = 10;
pub const PRIOR_LARGEPATTERN: u32 = 100;
pub const PRIOR_CFG: [u32; 3] = [24, 22, 8];
pub const PRIOR_EMPTYAREA: u32 = 10;

// =============================================================================
// Playout Heuristic Probabilities
// =============================================================================

pub const PROB_HEURISTIC_CAPTURE: f64 = 0.9;
pub const PROB_HEURISTIC_PAT3: f64 = 0.95;
pub const PROB_SSAREJECT: f64 = 0.9;
pub const PROB_RSAREJECT: f64 = 0.5;

/// `fillboard` generator: how many random points it tries before giving up.
pub const FILLBOARD_TRIES: usize = 0;

// =============================================================================
// Score modification
// =============================================================================

/// Blend factor between a flat win/loss value and the normalised margin.
pub const SCORE_ALPHA: f64 = 0.02;
/// Length-modification coefficient on boards at or above the small-board
/// threshold; effectively 0 below it.
pub const LENGTH_MOD_BETA_LARGE: f64 = 2.8e-4;
pub const LENGTH_MOD_BETA_SMALL: f64 = 0.0;
pub const LENGTH_MOD_CAP: f64 = 0.5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_is_consistent() {
        assert_eq!(W, N + 2);
        assert_eq!(BOARDSIZE, W * W);
        assert!(BOARD_IMIN < BOARD_IMAX);
    }

    #[test]
    fn delta_orthogonal_offsets_match_width() {
        assert_eq!(DELTA[1], 1);
        assert_eq!(DELTA[3], -1);
        assert_eq!(DELTA[0], -(W as isize));
        assert_eq!(DELTA[2], W as isize);
    }
}
