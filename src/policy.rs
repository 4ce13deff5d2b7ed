//! The playout policy: a deterministic cascade of heuristic
//! move generators. The first generator producing a non-empty candidate set
//! wins; one of its candidates is picked (uniformly, or gamma-weighted
//! under patterns — no gamma table is loaded in this crate, so the pattern
//! generator always falls back to a uniform pick among its candidates, a
//! simplification noted in `DESIGN.md`).
//!
//! Grounded on the `playout::choose_playout_move` cascade (capture →
//! pattern → random), widened to a full nine-generator order, using
//! `PlayoutBoard`'s block/liberty queries instead of `fix_atari` over a
//! swap-colour `Position`.

use crate::constants::{FILLBOARD_TRIES, PROB_HEURISTIC_CAPTURE, PROB_HEURISTIC_PAT3};
use crate::patterns::pat3_match;
use crate::playout_board::PlayoutBoard;
use crate::point::{neighbors4, Color, Point, NULL_POINT, PASS};

#[derive(Debug, Clone, Copy)]
pub struct PlayoutPolicyParams {
    pub fillboard_tries: usize,
    pub gamma_weighted: bool,
    pub prob_heuristic_capture: f64,
    pub prob_heuristic_pat3: f64,
}

impl Default for PlayoutPolicyParams {
    fn default() -> Self {
        PlayoutPolicyParams {
            fillboard_tries: FILLBOARD_TRIES,
            gamma_weighted: false,
            prob_heuristic_capture: PROB_HEURISTIC_CAPTURE,
            prob_heuristic_pat3: PROB_HEURISTIC_PAT3,
        }
    }
}

pub struct PlayoutPolicy {
    pub params: PlayoutPolicyParams,
}

impl PlayoutPolicy {
    pub fn new(params: PlayoutPolicyParams) -> Self {
        PlayoutPolicy { params }
    }

    /// Run the cascade and return the move the policy commits to. Never
    /// returns an illegal move or a simple eye of the mover.
    pub fn generate_move(&self, board: &PlayoutBoard, rng: &fastrand::Rng) -> Point {
        let mover = board.to_play();

        if self.params.fillboard_tries > 0 {
            if let Some(mv) = self.fill_board(board, rng) {
                return self.post_correct(board, mv, rng);
            }
        }
        if let Some(mv) = self.nakade(board) {
            return self.post_correct(board, mv, rng);
        }
        if rng.f64() < self.params.prob_heuristic_capture {
            if let Some(mv) = self.atari_capture(board, rng) {
                return self.post_correct(board, mv, rng);
            }
            if let Some(mv) = self.atari_defence(board, rng) {
                return self.post_correct(board, mv, rng);
            }
        }
        if let Some(mv) = self.low_lib(board, rng) {
            return mv;
        }
        if rng.f64() < self.params.prob_heuristic_pat3 {
            if let Some(mv) = self.pattern(board, rng) {
                return mv;
            }
        }
        if let Some(mv) = self.global_capture(board, rng) {
            return mv;
        }
        if let Some(mv) = self.pure_random(board, mover, rng) {
            return mv;
        }
        PASS
    }

    // -- 1. fill-board ------------------------------------------------

    fn fill_board(&self, board: &PlayoutBoard, rng: &fastrand::Rng) -> Option<Point> {
        for _ in 0..self.params.fillboard_tries {
            let candidates: Vec<Point> = board.iter_empty().collect();
            if candidates.is_empty() {
                return None;
            }
            let p = candidates[rng.usize(..candidates.len())];
            if neighbors4(p).iter().all(|&n| board.color_at(n) == Color::Empty || board.color_at(n) == Color::Border) {
                return Some(p);
            }
        }
        None
    }

    // -- 2. nakade ------------------------------------------------------

    fn nakade(&self, board: &PlayoutBoard) -> Option<Point> {
        let last = board.last_move();
        if last == PASS || last == NULL_POINT {
            return None;
        }
        let opp = board.to_play().opponent();
        for n in neighbors4(last) {
            if board.color_at(n) != Color::Empty {
                continue;
            }
            if let Some(region) = small_empty_region(board, n, 3) {
                if surrounded_by(board, &region, opp) {
                    if let Some(vital) = vital_point_of_three(&region) {
                        if legal_non_eye(board, vital) {
                            return Some(vital);
                        }
                    }
                }
            }
        }
        None
    }

    // -- 3. atari-capture -------------------------------------------

    fn atari_capture(&self, board: &PlayoutBoard, rng: &fastrand::Rng) -> Option<Point> {
        let last = board.last_move();
        if last == PASS || last == NULL_POINT {
            return None;
        }
        if board.color_at(last).is_stone() {
            if let Some(lib) = atari_liberty(board, last) {
                if !is_self_atari(board, lib) {
                    return Some(lib);
                }
            }
        }
        let _ = rng;
        None
    }

    // -- 4. atari-defence ---------------------------------------------

    fn atari_defence(&self, board: &PlayoutBoard, rng: &fastrand::Rng) -> Option<Point> {
        let last = board.last_move();
        if last == PASS || last == NULL_POINT {
            return None;
        }
        let mover = board.to_play();
        let mut candidates = Vec::new();
        for n in neighbors4(last) {
            if board.color_at(n) != mover {
                continue;
            }
            for mv in fix_atari_moves(board, n) {
                if !candidates.contains(&mv) && !is_self_atari(board, mv) {
                    candidates.push(mv);
                }
            }
        }
        pick(&candidates, rng)
    }

    // -- 5. low-lib -------------------------------------------------

    fn low_lib(&self, board: &PlayoutBoard, rng: &fastrand::Rng) -> Option<Point> {
        let last = board.last_move();
        if last == PASS || last == NULL_POINT {
            return None;
        }
        let mover = board.to_play();
        let mut candidates = Vec::new();
        for n in neighbors4(last) {
            if board.color_at(n) != mover || board.num_liberties(n) != 2 {
                continue;
            }
            let before = board.num_liberties(n);
            let block = board.block_at(board.anchor(n));
            let libs: Vec<Point> = block.map(|b| b.liberties.iter().collect()).unwrap_or_default();
            for lib in libs {
                if is_self_atari(board, lib) {
                    continue;
                }
                if liberty_count_after(board, n, lib) > before && !candidates.contains(&lib) {
                    candidates.push(lib);
                }
            }
        }
        pick(&candidates, rng)
    }

    // -- 6. pattern --------------------------------------------------

    fn pattern(&self, board: &PlayoutBoard, rng: &fastrand::Rng) -> Option<Point> {
        let mut candidates = Vec::new();
        for last in [board.last_move(), board.last_move2()] {
            if last == PASS || last == NULL_POINT {
                continue;
            }
            for n in neighbors4(last) {
                if board.color_at(n) == Color::Empty
                    && pat3_match(board, n)
                    && !is_self_atari(board, n)
                    && !candidates.contains(&n)
                {
                    candidates.push(n);
                }
            }
        }
        if self.params.gamma_weighted {
            // No gamma table is embedded in this crate (the pretrained
            // pattern-gamma file is an external asset, out of scope here);
            // fall through to a uniform pick among matches.
        }
        pick(&candidates, rng)
    }

    // -- 7. global capture -------------------------------------------

    fn global_capture(&self, board: &PlayoutBoard, rng: &fastrand::Rng) -> Option<Point> {
        let mut candidates = Vec::new();
        for p in board.iter_board() {
            let c = board.color_at(p);
            if !c.is_stone() || board.anchor(p) != p {
                continue; // only consider each block once, at its anchor
            }
            if board.num_liberties(p) == 1 {
                if let Some(lib) = board.the_liberty(p) {
                    let _ = c;
                    if !is_self_atari(board, lib) && !candidates.contains(&lib) {
                        candidates.push(lib);
                    }
                }
            }
        }
        pick(&candidates, rng)
    }

    // -- 8. pure random ------------------------------------------------

    fn pure_random(&self, board: &PlayoutBoard, mover: Color, rng: &fastrand::Rng) -> Option<Point> {
        let candidates: Vec<Point> =
            board.iter_empty().filter(|&p| !board.is_eye(p, mover) && board.is_legal(p, mover)).collect();
        pick(&candidates, rng)
    }

    // -- post-corrections ------------------------------------------------

    /// Reroute a self-atari choice to a nearby capture when one exists;
    /// otherwise leave the move as selected by the cascade.
    fn post_correct(&self, board: &PlayoutBoard, mv: Point, rng: &fastrand::Rng) -> Point {
        if !is_self_atari(board, mv) {
            return mv;
        }
        for n in neighbors4(mv) {
            let c = board.color_at(n);
            if c.is_stone() && c != board.to_play() {
                if let Some(lib) = atari_liberty(board, n) {
                    if !is_self_atari(board, lib) {
                        return lib;
                    }
                }
            }
        }
        let _ = rng;
        mv
    }
}

fn pick(candidates: &[Point], rng: &fastrand::Rng) -> Option<Point> {
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.usize(..candidates.len())])
    }
}

fn legal_non_eye(board: &PlayoutBoard, p: Point) -> bool {
    let mover = board.to_play();
    board.is_legal(p, mover) && !board.is_eye(p, mover)
}

/// The single liberty of `pt`'s block, if that block is in atari.
fn atari_liberty(board: &PlayoutBoard, pt: Point) -> Option<Point> {
    if board.color_at(pt).is_stone() && board.in_atari(pt) {
        board.the_liberty(pt)
    } else {
        None
    }
}

/// Candidate saving moves for the block at `pt` (assumed to be the
/// mover's own colour): its one liberty (extend or escape), plus the
/// liberty of any enemy neighbour block that is itself in atari (capture
/// to gain a liberty). No recursive ladder search is performed — this
/// matches non-ladder `fix_atari`, simplified further since
/// `PlayoutBoard` has no undo log to try-and-revert candidate extensions.
fn fix_atari_moves(board: &PlayoutBoard, pt: Point) -> Vec<Point> {
    let mut moves = Vec::new();
    if let Some(lib) = atari_liberty(board, pt) {
        moves.push(lib);
        let mover = board.color_at(pt);
        for n in neighbors4(pt) {
            let c = board.color_at(n);
            if c.is_stone() && c != mover {
                if let Some(enemy_lib) = atari_liberty(board, n) {
                    if !moves.contains(&enemy_lib) {
                        moves.push(enemy_lib);
                    }
                }
            }
        }
    }
    moves
}

/// `true` if playing `mv` as the mover leaves the mover's own new block in
/// atari (a self-atari, per its "never returns ... a self-atari"
/// post-correction clause) or is otherwise illegal.
fn is_self_atari(board: &PlayoutBoard, mv: Point) -> bool {
    let mover = board.to_play();
    let mut trial = board.clone();
    if trial.play(mv, mover).is_err() {
        return true;
    }
    trial.in_atari(mv)
}

fn liberty_count_after(board: &PlayoutBoard, block_point: Point, mv: Point) -> usize {
    let mover = board.color_at(block_point);
    let mut trial = board.clone();
    if trial.play(mv, mover).is_err() {
        return 0;
    }
    trial.num_liberties(mv)
}

fn small_empty_region(board: &PlayoutBoard, start: Point, cap: usize) -> Option<Vec<Point>> {
    let mut seen = vec![start];
    let mut frontier = vec![start];
    while let Some(p) = frontier.pop() {
        for n in neighbors4(p) {
            if board.color_at(n) == Color::Empty && !seen.contains(&n) {
                if seen.len() >= cap {
                    return None;
                }
                seen.push(n);
                frontier.push(n);
            }
        }
    }
    if seen.len() == cap {
        Some(seen)
    } else {
        None
    }
}

fn surrounded_by(board: &PlayoutBoard, region: &[Point], colour: Color) -> bool {
    region.iter().all(|&p| {
        neighbors4(p).iter().all(|&n| region.contains(&n) || board.color_at(n) == colour || board.color_at(n) == Color::Border)
    })
}

fn vital_point_of_three(region: &[Point]) -> Option<Point> {
    for &p in region {
        let others: Vec<Point> = region.iter().copied().filter(|&q| q != p).collect();
        if others.len() == 2 {
            let n4 = neighbors4(p);
            if n4.contains(&others[0]) && n4.contains(&others[1]) {
                return Some(p);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;

    fn rng() -> fastrand::Rng {
        fastrand::Rng::with_seed(42)
    }

    #[test]
    fn policy_terminates_from_empty_board() {
        let b = Board::new();
        let mut pb = PlayoutBoard::from_board(&b);
        let policy = PlayoutPolicy::new(PlayoutPolicyParams::default());
        let r = rng();
        let mut passes = 0;
        let mut moves = 0;
        while passes < 2 && moves < crate::constants::MAX_GAME_LEN * 4 {
            let mv = policy.generate_move(&pb, &r);
            if mv == PASS {
                pb.play_pass(pb.to_play());
                passes += 1;
            } else {
                let colour = pb.to_play();
                pb.play(mv, colour).expect("policy must never return an illegal move");
                passes = 0;
            }
            moves += 1;
        }
        assert_eq!(passes, 2, "playout should terminate in two passes");
    }

    #[test]
    fn policy_never_returns_simple_eye_of_mover() {
        let b = Board::new();
        let pb = PlayoutBoard::from_board(&b);
        let policy = PlayoutPolicy::new(PlayoutPolicyParams::default());
        let r = rng();
        for _ in 0..50 {
            let mv = policy.generate_move(&pb, &r);
            if mv != PASS {
                assert!(!pb.is_eye(mv, pb.to_play()));
            }
        }
    }
}
