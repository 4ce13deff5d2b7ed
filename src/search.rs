//! The UCT search driver and its worker-thread concurrency
//! model.
//!
//! Grounded on `mcts.rs` for the overall shape (descend with
//! a UCT+RAVE `rave_urgency`, expand at a visit threshold, play out,
//! back up along the path) and on `original_source/gouct/GoUctSearch.h` /
//! `GoUctGlobalSearch.h` for the worker-pool split (one board, one
//! playout-policy instance, one RNG per thread, `std::thread::scope`
//! instead of Fuego's raw `boost::thread` pool) and the early-abort /
//! sure-win / pondering knobs. Selection reads and backup writes go
//! through `tree.rs`'s atomics directly; nothing here takes a lock.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::board::Board;
use crate::constants::{
    BOARDSIZE, EARLY_ABORT_AFTER_FRACTION, EARLY_ABORT_MIN_VISITS, EARLY_PASS_DECISIVE_OWNER,
    EARLY_PASS_TERRITORY_FRACTION, EXPAND_VISITS, FASTPLAY20_THRES, FASTPLAY5_THRES,
    FIRST_PLAY_URGENCY, MAX_GAME_LEN, RAVE_EQUIV, RESIGN_THRES, SMALL_BOARD_THRESHOLD,
    SURE_WIN_THRESHOLD, UCT_BIAS_CONSTANT,
};
use crate::knowledge::{compute_prior, AdditivePredictor, GreenpeepTable, PlainPredictor};
use crate::patterns::init_patterns;
use crate::playout_board::PlayoutBoard;
use crate::point::{neighbors4, Color, Point, NULL_POINT, PASS};
use crate::policy::{PlayoutPolicy, PlayoutPolicyParams};
use crate::scoring::{self, PlayoutOutcome};
use crate::tree::{Node, NodeId, Tree};

/// Tuning knobs for the tree phase. Mutable at runtime via the GTP
/// `uct_param_search` command family; constants.rs holds the
/// compiled-in defaults this `Default` impl reads from.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    pub num_threads: usize,
    pub tree_capacity: usize,
    pub uct_bias_constant: f64,
    pub rave_equiv: f64,
    pub expand_visits: u32,
    pub first_play_urgency: f64,
    pub early_abort_after_fraction: f64,
    pub sure_win_threshold: f64,
    pub early_abort_min_visits: u64,
    pub resign_threshold: f64,
    pub fastplay20_threshold: f64,
    pub fastplay5_threshold: f64,
    pub subtree_reuse: bool,
    pub pondering: bool,
    /// When set, a search that finishes decisively winning re-checks the
    /// territory statistics gathered during its own playouts and, if every
    /// empty point is decisively owned, reports `PASS` instead of the
    /// tree's normal most-visited child.
    pub early_pass_enabled: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            num_threads: crate::constants::DEFAULT_MAX_WORKERS,
            tree_capacity: crate::constants::DEFAULT_TREE_CAPACITY,
            uct_bias_constant: UCT_BIAS_CONSTANT,
            rave_equiv: RAVE_EQUIV,
            expand_visits: EXPAND_VISITS,
            first_play_urgency: FIRST_PLAY_URGENCY,
            early_abort_after_fraction: EARLY_ABORT_AFTER_FRACTION,
            sure_win_threshold: SURE_WIN_THRESHOLD,
            early_abort_min_visits: EARLY_ABORT_MIN_VISITS,
            resign_threshold: RESIGN_THRES,
            fastplay20_threshold: FASTPLAY20_THRES,
            fastplay5_threshold: FASTPLAY5_THRES,
            subtree_reuse: true,
            pondering: false,
            early_pass_enabled: false,
        }
    }
}

/// Playout-phase tuning. A plain alias onto `policy.rs`'s params struct:
/// the generator cascade's knobs already form a complete, independently
/// testable struct, so `search.rs` just names it the way expects
/// rather than re-declaring the same fields twice.
pub type PlayoutParams = PlayoutPolicyParams;

/// Knowledge-layer configuration: whether to seed expansion priors, and
/// which additive predictor (if any) biases selection.
pub struct KnowledgeParams {
    pub use_prior: bool,
    pub predictor: Option<Arc<dyn AdditivePredictor>>,
}

impl Default for KnowledgeParams {
    fn default() -> Self {
        let small_board = crate::constants::N < SMALL_BOARD_THRESHOLD;
        let table = GreenpeepTable::for_board_size(crate::constants::N);
        KnowledgeParams {
            use_prior: true,
            predictor: Some(Arc::new(PlainPredictor { small_board, table })),
        }
    }
}

impl Clone for KnowledgeParams {
    fn clone(&self) -> Self {
        KnowledgeParams { use_prior: self.use_prior, predictor: self.predictor.clone() }
    }
}

/// How long a call to `UctSearch::search` is allowed to run. `None` in both
/// fields plus an external cancellation flag is how pondering is expressed:
/// the search simply never stops on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchBudget {
    pub max_simulations: Option<u64>,
    pub max_time: Option<Duration>,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchResult {
    pub best_move: Point,
    pub root_visits: u64,
    pub root_mean: f64,
    pub simulations_run: u64,
    pub tree_truncated: bool,
    pub should_resign: bool,
}

/// Owns the concurrent tree across searches so that subtree reuse can carry
/// statistics from one move to the next.
pub struct UctSearch {
    params: SearchParams,
    playout_params: PlayoutParams,
    knowledge: KnowledgeParams,
    tree: Tree,
    /// Per-point playout territory counter, `+1` per playout a point ends
    /// Black, `-1` per playout it ends White. Cleared at the start of every
    /// `search` call and accumulated by every worker thread across all its
    /// simulations that call.
    owner_map: Vec<AtomicI32>,
}

impl UctSearch {
    pub fn new(params: SearchParams, playout_params: PlayoutParams, knowledge: KnowledgeParams) -> Self {
        init_patterns();
        let tree = new_tree(&params);
        let owner_map = (0..BOARDSIZE).map(|_| AtomicI32::new(0)).collect();
        UctSearch { params, playout_params, knowledge, tree, owner_map }
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut SearchParams {
        &mut self.params
    }

    pub fn playout_params_mut(&mut self) -> &mut PlayoutParams {
        &mut self.playout_params
    }

    pub fn reset(&mut self) {
        self.tree = new_tree(&self.params);
    }

    /// Discard everything outside the subtree reached by `played` (subtree
    /// reuse), or clear the tree entirely if reuse is off, the move wasn't
    /// a root child, or the arena is full.
    pub fn advance_root(&mut self, played: Point) {
        if !self.params.subtree_reuse {
            self.reset();
            return;
        }
        let root = self.tree.root_id();
        let child = self
            .tree
            .children_of(root)
            .into_iter()
            .find(|&c| self.tree.node(c).mv() == played);
        match child {
            Some(cid) => {
                let fresh = new_tree(&self.params);
                fresh.extract_subtree(&self.tree, cid, 1);
                self.tree = fresh;
            }
            None => self.reset(),
        }
    }

    pub fn tree_truncated(&self) -> bool {
        self.tree.was_truncated()
    }

    /// A snapshot of the territory counters gathered by the most recent
    /// `search`/`choose_move` call, one entry per board point (raw counts,
    /// not yet divided by the simulation count).
    pub fn owner_map_snapshot(&self) -> Vec<i32> {
        self.owner_map.iter().map(|a| a.load(Ordering::Relaxed)).collect()
    }

    /// Forced-opening fast path, then the full worker-pool UCT search.
    pub fn choose_move(&self, root_board: &Board, budget: SearchBudget, cancel: Arc<std::sync::atomic::AtomicBool>) -> SearchResult {
        if let Some(mv) = scoring::forced_opening_move(root_board) {
            return SearchResult {
                best_move: mv,
                root_visits: 0,
                root_mean: 0.5,
                simulations_run: 0,
                tree_truncated: false,
                should_resign: false,
            };
        }
        self.search(root_board, budget, cancel)
    }

    /// Run simulations across `params.num_threads` worker threads until the
    /// budget is exhausted or `cancel` is set, then report the root child
    /// with the most visits (the standard "robust child" choice).
    pub fn search(&self, root_board: &Board, budget: SearchBudget, cancel: Arc<std::sync::atomic::AtomicBool>) -> SearchResult {
        let sims_done = AtomicU64::new(0);
        let start = Instant::now();
        let num_threads = self.params.num_threads.max(1);
        let predictor = self.knowledge.predictor.clone();
        for a in &self.owner_map {
            a.store(0, Ordering::Relaxed);
        }

        std::thread::scope(|scope| {
            for t in 0..num_threads {
                let tree = &self.tree;
                let params = &self.params;
                let playout_params = &self.playout_params;
                let use_prior = self.knowledge.use_prior;
                let predictor = predictor.clone();
                let cancel = Arc::clone(&cancel);
                let sims_done = &sims_done;
                let owner_map = &self.owner_map;
                scope.spawn(move || {
                    let mut rng = fastrand::Rng::with_seed(worker_seed(t));
                    loop {
                        if cancel.load(Ordering::Relaxed) {
                            break;
                        }
                        if let Some(max) = budget.max_simulations {
                            if sims_done.load(Ordering::Relaxed) >= max {
                                break;
                            }
                        }
                        if let Some(max_time) = budget.max_time {
                            if start.elapsed() >= max_time {
                                break;
                            }
                        }
                        run_simulation(tree, root_board, t, params, playout_params, predictor.as_deref(), use_prior, &rng, owner_map);
                        let done = sims_done.fetch_add(1, Ordering::Relaxed) + 1;
                        if t == 0
                            && done % crate::constants::REPORT_PERIOD as u64 == 0
                            && should_abort_early(tree, params, &budget, start, done)
                        {
                            cancel.store(true, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        let simulations_run = sims_done.load(Ordering::Relaxed);
        let mut result = self.summarize(simulations_run);
        if self.params.early_pass_enabled {
            if let Some(mv) = self.early_pass_move(root_board, simulations_run, &result) {
                result.best_move = mv;
            }
        }
        result
    }

    /// After a decisively-won search, check whether every empty point's
    /// territory statistic is decisive enough to commit to a pass rather
    /// than the tree's normal most-visited recommendation. Reuses the
    /// territory counts the search's own playouts just accumulated, rather
    /// than running a separate probe search.
    fn early_pass_move(&self, root_board: &Board, simulations_run: u64, result: &SearchResult) -> Option<Point> {
        if simulations_run == 0 || result.root_mean < self.params.sure_win_threshold {
            return None;
        }
        let mover_sign = if root_board.to_play() == Color::Black { 1.0 } else { -1.0 };
        let mut total = 0usize;
        let mut decisive = 0usize;
        for p in root_board.iter_empty() {
            total += 1;
            let owned = self.owner_map[p].load(Ordering::Relaxed) as f64 / simulations_run as f64;
            if owned * mover_sign >= EARLY_PASS_DECISIVE_OWNER {
                decisive += 1;
            }
        }
        if total > 0 && (decisive as f64 / total as f64) >= EARLY_PASS_TERRITORY_FRACTION {
            Some(PASS)
        } else {
            None
        }
    }

    fn summarize(&self, simulations_run: u64) -> SearchResult {
        let root = self.tree.root_id();
        let children = self.tree.children_of(root);
        if children.is_empty() {
            return SearchResult {
                best_move: PASS,
                root_visits: 0,
                root_mean: 0.5,
                simulations_run,
                tree_truncated: self.tree.was_truncated(),
                should_resign: false,
            };
        }
        let best = children
            .iter()
            .copied()
            .max_by(|&a, &b| {
                self.tree
                    .node(a)
                    .move_count()
                    .cmp(&self.tree.node(b).move_count())
                    .then(self.tree.node(a).mean().partial_cmp(&self.tree.node(b).mean()).unwrap())
            })
            .unwrap();
        let best_node = self.tree.node(best);
        let root_visits = best_node.move_count();
        let root_mean = best_node.mean();
        let should_resign = root_visits >= self.params.early_abort_min_visits && root_mean < self.params.resign_threshold;
        SearchResult {
            best_move: best_node.mv(),
            root_visits,
            root_mean,
            simulations_run,
            tree_truncated: self.tree.was_truncated(),
            should_resign,
        }
    }
}

fn new_tree(params: &SearchParams) -> Tree {
    let num_threads = params.num_threads.max(1);
    let per_allocator = (params.tree_capacity / num_threads).max(1);
    Tree::new(num_threads, per_allocator)
}

fn worker_seed(thread_index: usize) -> u64 {
    0xD1CE_5EED_u64.wrapping_add((thread_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// The early-abort condition: once past a fraction of the budget, stop as
/// soon as the best root child has enough visits and a
/// sufficiently lopsided mean that further search cannot plausibly change
/// the recommendation.
fn should_abort_early(tree: &Tree, params: &SearchParams, budget: &SearchBudget, start: Instant, done: u64) -> bool {
    let elapsed_fraction = match (budget.max_simulations, budget.max_time) {
        (Some(max), _) if max > 0 => done as f64 / max as f64,
        (_, Some(max_time)) if !max_time.is_zero() => start.elapsed().as_secs_f64() / max_time.as_secs_f64(),
        _ => return false,
    };
    if elapsed_fraction < params.early_abort_after_fraction {
        return false;
    }
    let root = tree.root_id();
    let children = tree.children_of(root);
    if children.is_empty() {
        return false;
    }
    let best = children.iter().map(|&c| tree.node(c)).max_by_key(|n| n.move_count());
    match best {
        Some(n) => n.move_count() >= params.early_abort_min_visits && (n.mean() >= params.sure_win_threshold || n.mean() <= 1.0 - params.sure_win_threshold),
        None => false,
    }
}

fn is_terminal(board: &Board) -> bool {
    (board.last_move() == PASS && board.last_move2() == PASS) || board.move_number() as usize >= MAX_GAME_LEN
}

/// Selection value for one child: a UCT exploration term plus a
/// visit-weighted blend of the raw mean and its RAVE estimate (Silver &
/// Gelly's formula), plus the additive knowledge bias. Unvisited children
/// fall back to `first_play_urgency` so a confident sibling can still beat
/// them without every child needing a real visit first.
fn selection_score(parent_ln_visits: f64, child: &Node, params: &SearchParams) -> f64 {
    let move_count = child.move_count() as f64;
    let virtual_loss = child.virtual_loss_count() as f64;
    let rave_count = child.rave_count();

    if move_count == 0.0 && rave_count == 0.0 {
        return params.first_play_urgency + child.predictor_value();
    }

    let effective_visits = move_count + virtual_loss;
    let blended_mean = if effective_visits > 0.0 { (child.mean() * move_count) / effective_visits } else { child.mean() };

    let beta = if params.rave_equiv <= 0.0 || rave_count == 0.0 {
        0.0
    } else {
        rave_count / (rave_count + move_count + (move_count * rave_count) / params.rave_equiv)
    };
    let value = (1.0 - beta) * blended_mean + beta * child.rave_value();

    let exploration = if move_count > 0.0 && params.uct_bias_constant > 0.0 {
        params.uct_bias_constant * (parent_ln_visits / move_count).sqrt()
    } else {
        0.0
    };

    value + exploration + child.predictor_value()
}

fn select_child(tree: &Tree, node_id: NodeId, first: NodeId, count: u32, params: &SearchParams) -> NodeId {
    let parent_visits = tree.node(node_id).move_count().max(1) as f64;
    let parent_ln = parent_visits.ln();
    let mut best_idx = 0u32;
    let mut best_score = f64::MIN;
    for i in 0..count {
        let cid = NodeId { allocator: first.allocator, index: first.index + i };
        let score = selection_score(parent_ln, tree.node(cid), params);
        if score > best_score {
            best_score = score;
            best_idx = i;
        }
    }
    NodeId { allocator: first.allocator, index: first.index + best_idx }
}

/// Which stone counts (and how many) a move at `mv` would capture, used to
/// feed `compute_prior`'s capture feature during expansion.
fn captures_at(board: &Board, mv: Point, mover: Color) -> (bool, u32) {
    let mut anchors = HashSet::new();
    for n in neighbors4(mv) {
        if board.color_at(n) == mover.opponent() && board.in_atari(n) && board.the_liberty(n) == Some(mv) {
            anchors.insert(board.anchor(n));
        }
    }
    let size: u32 = anchors.iter().filter_map(|&a| board.block_at(a)).map(|b| b.stones.len() as u32).sum();
    (!anchors.is_empty(), size)
}

fn candidate_moves(board: &Board, mover: Color) -> Vec<Point> {
    let mut moves: Vec<Point> = board
        .iter_empty()
        .filter(|&p| board.is_legal(p, mover) && !board.is_eye(p, mover))
        .collect();
    moves.push(PASS);
    moves
}

/// Expand `node_id` (already known to have no children) with one child per
/// legal move, seeding prior knowledge and additive-predictor bias on each.
/// Returns `None` if the node's allocator is full (: the branch
/// stays a leaf for the rest of the search).
fn expand(
    tree: &Tree,
    node_id: NodeId,
    allocator_index: usize,
    board: &Board,
    mover: Color,
    predictor: Option<&dyn AdditivePredictor>,
    use_prior: bool,
) -> Option<(NodeId, u32)> {
    let mut moves = candidate_moves(board, mover);
    if node_id == tree.root_id() {
        let non_pass: Vec<Point> = moves.iter().copied().filter(|&p| p != PASS).collect();
        let filtered = scoring::root_filter(board, &non_pass);
        moves = if filtered.is_empty() { vec![PASS] } else {
            let mut m = filtered;
            m.push(PASS);
            m
        };
    }

    let (start, count) = tree.allocator(allocator_index).create_n(&moves)?;
    let first = NodeId { allocator: allocator_index as u16, index: start };
    tree.node(node_id).link_children(first, count);

    for (i, &mv) in moves.iter().enumerate() {
        let child = NodeId { allocator: allocator_index as u16, index: start + i as u32 };
        if mv == PASS {
            continue;
        }
        if use_prior {
            let (is_capture, capture_size) = captures_at(board, mv, mover);
            let prior = compute_prior(board, mv, is_capture, capture_size);
            tree.node(child).seed_prior(prior.mean, prior.count, prior.rave_value, prior.rave_count);
        }
    }
    if let Some(pred) = predictor {
        let values = pred.predict(board, &moves);
        for (i, &value) in values.iter().enumerate() {
            let child = NodeId { allocator: allocator_index as u16, index: start + i as u32 };
            tree.node(child).set_predictor_value(value);
        }
    }
    Some((first, count))
}

/// One full simulation: select down the tree, expand once if due, play out
/// to a terminal (or length-capped) position, evaluate, then back up the
/// game result and RAVE statistics along the path. All tree access is via
/// `&Tree`'s atomics; this function never blocks another worker.
fn run_simulation(
    tree: &Tree,
    root_board: &Board,
    allocator_index: usize,
    params: &SearchParams,
    playout_params: &PlayoutParams,
    predictor: Option<&dyn AdditivePredictor>,
    use_prior: bool,
    rng: &fastrand::Rng,
    owner_map: &[AtomicI32],
) {
    let mut board = root_board.clone();
    let mut node_id = tree.root_id();
    // Each entry pairs a node with the colour whose move created it (root is
    // paired with its own to-play, since no move led into it). This is the
    // mover whose perspective `tree.node(nid).mean()` is kept in, so backup
    // must apply `value_for(mover, ...)` using this same colour, not
    // whichever side happens to be on move once the walk has moved past it.
    let mut path: Vec<(NodeId, Color)> = vec![(node_id, board.to_play())];
    let mut virtual_loss_path: Vec<NodeId> = Vec::new();
    let mut black_moves: HashSet<Point> = HashSet::new();
    let mut white_moves: HashSet<Point> = HashSet::new();

    loop {
        if is_terminal(&board) {
            break;
        }
        let mover = board.to_play();
        match tree.node(node_id).children_range() {
            Some((first, count)) => {
                let chosen = select_child(tree, node_id, first, count, params);
                tree.node(chosen).add_virtual_loss();
                virtual_loss_path.push(chosen);
                let mv = tree.node(chosen).mv();
                record_move(&mut black_moves, &mut white_moves, mover, mv);
                let _ = if mv == PASS { Ok(board.play_pass(mover)) } else { board.play(mv, mover) };
                node_id = chosen;
                path.push((node_id, mover));
            }
            None => {
                let due = tree.node(node_id).move_count() >= params.expand_visits as u64 || node_id == tree.root_id();
                if due {
                    if let Some((first, count)) =
                        expand(tree, node_id, allocator_index, &board, mover, predictor, use_prior)
                    {
                        let idx = rng.u32(..count);
                        let chosen = NodeId { allocator: first.allocator, index: first.index + idx };
                        tree.node(chosen).add_virtual_loss();
                        virtual_loss_path.push(chosen);
                        let mv = tree.node(chosen).mv();
                        record_move(&mut black_moves, &mut white_moves, mover, mv);
                        let _ = if mv == PASS { Ok(board.play_pass(mover)) } else { board.play(mv, mover) };
                        node_id = chosen;
                        path.push((node_id, mover));
                        continue;
                    }
                }
                break;
            }
        }
    }

    let (outcome, playout_board) =
        run_playout(&board, playout_params, rng, &mut black_moves, &mut white_moves, path.len() as u32);
    let black_value = scoring::terminal_value(&playout_board, &root_board.rules, &outcome);

    for p in playout_board.iter_board() {
        match playout_board.color_at(p) {
            Color::Black => {
                owner_map[p].fetch_add(1, Ordering::Relaxed);
            }
            Color::White => {
                owner_map[p].fetch_sub(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    for &(nid, mover) in path.iter() {
        let value_for_mover = value_for(mover, black_value);
        tree.node(nid).add_game_result(value_for_mover);
        tree.node(nid).touch_pos_count();
        let amaf_set = if mover == Color::Black { &black_moves } else { &white_moves };
        for child in tree.children_of(nid) {
            let cmv = tree.node(child).mv();
            if cmv != PASS && amaf_set.contains(&cmv) {
                tree.node(child).add_rave_result(value_for_mover, 1.0);
            }
        }
    }
    for nid in virtual_loss_path {
        tree.node(nid).remove_virtual_loss();
    }
}

#[inline]
fn value_for(mover: Color, black_value: f64) -> f64 {
    if mover == Color::Black {
        black_value
    } else {
        1.0 - black_value
    }
}

fn record_move(black_moves: &mut HashSet<Point>, white_moves: &mut HashSet<Point>, colour: Color, mv: Point) {
    if mv == PASS || mv == NULL_POINT {
        return;
    }
    match colour {
        Color::Black => {
            black_moves.insert(mv);
        }
        Color::White => {
            white_moves.insert(mv);
        }
        _ => {}
    }
}

/// Rebuilds a `PlayoutBoard` once from the in-tree position and plays the
/// policy cascade forward until two passes, the mercy rule, or the
/// simulation-length cap. Returns the terminal outcome classification
/// alongside the board the caller scores against.
fn run_playout(
    tree_board: &Board,
    playout_params: &PlayoutParams,
    rng: &fastrand::Rng,
    black_moves: &mut HashSet<Point>,
    white_moves: &mut HashSet<Point>,
    moves_so_far: u32,
) -> (PlayoutOutcome, PlayoutBoard) {
    let mut pb = PlayoutBoard::from_board(tree_board);
    let policy = PlayoutPolicy::new(*playout_params);
    let mut passes = 0u32;
    let mut moves_played = moves_so_far;
    let mut mercy_winner = None;

    while (moves_played as usize) < MAX_GAME_LEN {
        if let Some(winner) = scoring::mercy_triggered(&pb) {
            mercy_winner = Some(winner);
            break;
        }
        let mover = pb.to_play();
        let mv = policy.generate_move(&pb, rng);
        if mv == PASS {
            passes += 1;
        } else {
            passes = 0;
        }
        record_move(black_moves, white_moves, mover, mv);
        let _ = pb.play(mv, mover);
        moves_played += 1;
        if passes >= 2 {
            break;
        }
    }

    (PlayoutOutcome { ended_in_two_passes: passes >= 2, mercy_winner, moves_played }, pb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use std::sync::atomic::AtomicBool;

    fn tiny_params() -> SearchParams {
        SearchParams { num_threads: 1, tree_capacity: 2000, expand_visits: 1, ..SearchParams::default() }
    }

    #[test]
    fn search_returns_a_legal_or_pass_move_from_empty_board() {
        let board = Board::new();
        let search = UctSearch::new(tiny_params(), PlayoutParams::default(), KnowledgeParams::default());
        let budget = SearchBudget { max_simulations: Some(50), max_time: None };
        let cancel = Arc::new(AtomicBool::new(false));
        let result = search.search(&board, budget, cancel);
        assert!(result.simulations_run > 0);
        assert!(result.best_move == PASS || board.on_board(result.best_move));
    }

    #[test]
    fn cancellation_flag_stops_the_search_promptly() {
        let board = Board::new();
        let search = UctSearch::new(tiny_params(), PlayoutParams::default(), KnowledgeParams::default());
        let cancel = Arc::new(AtomicBool::new(true));
        let budget = SearchBudget::default();
        let result = search.search(&board, budget, cancel);
        assert_eq!(result.simulations_run, 0);
    }

    #[test]
    fn advance_root_without_reuse_clears_the_tree() {
        let board = Board::new();
        let mut params = tiny_params();
        params.subtree_reuse = false;
        let mut search = UctSearch::new(params, PlayoutParams::default(), KnowledgeParams::default());
        let budget = SearchBudget { max_simulations: Some(20), max_time: None };
        let cancel = Arc::new(AtomicBool::new(false));
        let result = search.search(&board, budget, cancel);
        search.advance_root(result.best_move);
        assert_eq!(search.tree.children_of(search.tree.root_id()).len(), 0);
    }

    #[test]
    fn selection_prefers_first_play_urgency_over_a_losing_visited_child() {
        let node_a = Node::default();
        node_a.seed_prior(0.1, 10, 0.1, 10.0);
        let node_b = Node::default();
        let params = SearchParams::default();
        let score_a = selection_score(1.0, &node_a, &params);
        let score_b = selection_score(1.0, &node_b, &params);
        assert!(score_b > score_a);
    }
}
