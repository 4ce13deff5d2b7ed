//! The knowledge layer: prior knowledge seeded into a node at
//! first expansion, and additive predictors consulted on every selection.
//!
//! Grounded on `original_source/gouct/GoUctPlayoutPolicy.h` (the feature set
//! behind prior knowledge: capture/atari/pattern/distance/line), and the
//! `GoUctAdditiveKnowledge{Fuego,Greenpeep,Multiple}` family for the
//! predictor side. `GoUctAdditiveKnowledgeMultiple`'s
//! `COMBINE_{MULTIPLY,GEOMETRIC_MEAN,ADD,AVERAGE,MAX}` enum is reproduced as
//! `CombineMode`.

use std::collections::HashMap;

use crate::board::Board;
use crate::board_like::BoardLike;
use crate::constants::{
    PRIOR_CAPTURE_MANY, PRIOR_CAPTURE_ONE, PRIOR_CFG, PRIOR_EMPTYAREA, PRIOR_EVEN, PRIOR_PAT3,
    PRIOR_SELFATARI, SMALL_BOARD_THRESHOLD,
};
use crate::patterns::{diamond_context, pat3_match};
use crate::point::{neighbors4, Color, Point};

/// Synthetic initial statistics computed once, the first time a node is
/// expanded. Added directly as seed visits on the new node.
#[derive(Debug, Clone, Copy)]
pub struct PriorKnowledge {
    pub mean: f64,
    pub count: u64,
    pub rave_value: f64,
    pub rave_count: f64,
}

/// Feature-based prior for one candidate child move, mirroring
/// `apply_priors` (itself grounded on Fuego's rule-of-thumb feature set)
/// but expressed against `BoardLike` rather than a concrete swap-colour
/// `Position`.
pub fn compute_prior(parent: &Board, mv: Point, is_capture: bool, capture_size: u32) -> PriorKnowledge {
    let mut pv: i64 = PRIOR_EVEN as i64;
    let mut pw: i64 = (PRIOR_EVEN / 2) as i64;

    if parent.color_at(mv) == Color::Empty && pat3_match(parent, mv) {
        pv += PRIOR_PAT3 as i64;
        pw += PRIOR_PAT3 as i64;
    }

    if is_capture {
        let bonus = if capture_size <= 1 { PRIOR_CAPTURE_ONE } else { PRIOR_CAPTURE_MANY };
        pv += bonus as i64;
        pw += bonus as i64;
    }

    if parent.last_move() != crate::point::PASS && parent.last_move() != crate::point::NULL_POINT {
        let dist = cfg_distance(parent, parent.last_move(), mv);
        if let Some(d) = dist {
            if d >= 1 && (d as usize) <= PRIOR_CFG.len() {
                let bonus = PRIOR_CFG[d as usize - 1];
                pv += bonus as i64;
                pw += bonus as i64;
            }
        }
    }

    let line = line_height(mv);
    if line <= 2 && empty_area(parent, mv, 3) {
        pv += PRIOR_EMPTYAREA as i64;
        if line == 2 {
            pw += PRIOR_EMPTYAREA as i64;
        }
    }

    // Self-atari candidates get the visit weight without the matching win
    // weight, biasing the seeded mean down without a negative prior field.
    if is_self_atari_after(parent, mv) {
        pv += PRIOR_SELFATARI as i64;
    }

    let pv = pv.max(1) as f64;
    let pw = pw.max(0) as f64;
    PriorKnowledge { mean: (pw / pv).clamp(0.0, 1.0), count: pv as u64, rave_value: 0.5, rave_count: 0.0 }
}

/// Crude Manhattan-ish common-fate distance: direct neighbour chain length
/// up to 3, computed by BFS through same-colour blocks the way
/// `compute_cfg_distances` does, but bounded (priors only care about small
/// distances).
fn cfg_distance(board: &Board, from: Point, to: Point) -> Option<u32> {
    use std::collections::VecDeque;
    let mut dist: HashMap<Point, u32> = HashMap::new();
    dist.insert(from, 0);
    let mut q = VecDeque::new();
    q.push_back(from);
    while let Some(p) = q.pop_front() {
        let d = dist[&p];
        if d >= PRIOR_CFG.len() as u32 {
            continue;
        }
        for n in neighbors4(p) {
            if !board.on_board(n) {
                continue;
            }
            let step = if board.color_at(n).is_stone() && board.color_at(n) == board.color_at(p) { 0 } else { 1 };
            let nd = d + step;
            if dist.get(&n).map(|&old| nd < old).unwrap_or(true) {
                dist.insert(n, nd);
                q.push_back(n);
            }
        }
        if p == to {
            return Some(d);
        }
    }
    dist.get(&to).copied()
}

fn line_height(p: Point) -> i32 {
    let w = crate::constants::W;
    let n = crate::constants::N;
    let row = p / w;
    let col = p % w;
    let row_dist = row.min(n + 1 - row);
    let col_dist = col.min(n + 1 - col);
    row_dist.min(col_dist).saturating_sub(1) as i32
}

fn empty_area(board: &Board, p: Point, depth: u32) -> bool {
    if depth == 0 {
        return true;
    }
    for n in neighbors4(p) {
        if !board.on_board(n) {
            continue;
        }
        let c = board.color_at(n);
        if c.is_stone() {
            return false;
        }
        if c == Color::Empty && depth > 1 && !empty_area(board, n, depth - 1) {
            return false;
        }
    }
    true
}

fn is_self_atari_after(board: &Board, mv: Point) -> bool {
    let mut trial = board.clone();
    let colour = trial.to_play();
    if trial.play(mv, colour).is_err() {
        return false;
    }
    trial.in_atari(mv)
}

/// A stateless per-move additive bias function: a function from
/// (board, candidate moves) to one `predictor_value` per candidate.
pub trait AdditivePredictor: Send + Sync {
    fn predict(&self, board: &dyn BoardLike, candidates: &[Point]) -> Vec<f64>;
}

/// Raw feature-based value, used verbatim as the additive bias.
pub struct PlainPredictor {
    pub small_board: bool,
    pub table: GreenpeepTable,
}

impl AdditivePredictor for PlainPredictor {
    fn predict(&self, board: &dyn BoardLike, candidates: &[Point]) -> Vec<f64> {
        candidates
            .iter()
            .map(|&mv| {
                let ctx = diamond_context(board, mv, false, false);
                let raw = self.table.lookup(ctx) as f64;
                (raw - GreenpeepTable::NEUTRAL as f64) / GreenpeepTable::NEUTRAL as f64
            })
            .collect()
    }
}

/// Per-move probabilities (summing to 1) combined in PUCT style:
/// `bias = scale * p * sqrt(total)`. The bias is set once per child at
/// expansion time, before the child has any visits of its own, so the
/// usual `/ (1 + child_count)` PUCT denominator is always 1 here and is
/// omitted rather than written in as a no-op.
pub struct ProbabilityBasedPredictor {
    pub scale: f64,
    pub probabilities: HashMap<Point, f64>,
    pub total: f64,
}

impl AdditivePredictor for ProbabilityBasedPredictor {
    fn predict(&self, _board: &dyn BoardLike, candidates: &[Point]) -> Vec<f64> {
        let sqrt_total = self.total.max(0.0).sqrt();
        candidates
            .iter()
            .map(|mv| {
                let p = self.probabilities.get(mv).copied().unwrap_or(0.0);
                self.scale * p * sqrt_total
            })
            .collect()
    }
}

/// PUCB-style combination: `bias = scale * sqrt(total * max) / value`,
/// where `value` is the per-move probability (rarer moves get a larger
/// exploration bonus).
pub struct PucbPredictor {
    pub scale: f64,
    pub probabilities: HashMap<Point, f64>,
    pub total: f64,
}

impl AdditivePredictor for PucbPredictor {
    fn predict(&self, _board: &dyn BoardLike, candidates: &[Point]) -> Vec<f64> {
        let max = self.probabilities.values().cloned().fold(0.0_f64, f64::max).max(1e-6);
        let common = self.scale * (self.total.max(0.0) * max).sqrt();
        candidates
            .iter()
            .map(|mv| {
                let value = self.probabilities.get(mv).copied().unwrap_or(1e-6).max(1e-6);
                common / value
            })
            .collect()
    }
}

/// How `MultiplePredictor` folds several predictors' per-move biases into
/// one value, mirroring `GoUctKnowledgeCombinationType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineMode {
    Multiply,
    GeometricMean,
    Sum,
    Average,
    Max,
}

pub struct MultiplePredictor {
    pub predictors: Vec<Box<dyn AdditivePredictor>>,
    pub mode: CombineMode,
}

impl AdditivePredictor for MultiplePredictor {
    fn predict(&self, board: &dyn BoardLike, candidates: &[Point]) -> Vec<f64> {
        if self.predictors.is_empty() {
            return vec![0.0; candidates.len()];
        }
        let per_predictor: Vec<Vec<f64>> = self.predictors.iter().map(|p| p.predict(board, candidates)).collect();
        (0..candidates.len())
            .map(|i| {
                let values: Vec<f64> = per_predictor.iter().map(|v| v[i]).collect();
                combine(&values, self.mode)
            })
            .collect()
    }
}

fn combine(values: &[f64], mode: CombineMode) -> f64 {
    match mode {
        CombineMode::Sum => values.iter().sum(),
        CombineMode::Average => values.iter().sum::<f64>() / values.len() as f64,
        CombineMode::Max => values.iter().cloned().fold(f64::MIN, f64::max),
        CombineMode::Multiply => values.iter().product(),
        CombineMode::GeometricMean => {
            let product: f64 = values.iter().map(|v| v.max(1e-9)).product();
            product.powf(1.0 / values.len() as f64)
        }
    }
}

/// A Greenpeep-style predictor table keyed by the 12-point diamond context:
/// `2^26` entries for boards under the small-board threshold, `2^24` for
/// boards at or above it. The real Greenpeep weights are a pretrained
/// external asset out of scope here; rather than allocating a 64-256MB
/// array of a single repeated constant, unseen contexts are served the
/// documented neutral value (512) from a sparse override map, which a real
/// weight loader would populate from an embedded binary blob.
pub struct GreenpeepTable {
    mask: u32,
    overrides: HashMap<u32, u16>,
}

impl GreenpeepTable {
    pub const NEUTRAL: u16 = 512;

    pub fn for_board_size(n: usize) -> Self {
        let bits = if n < SMALL_BOARD_THRESHOLD { 26 } else { 24 };
        GreenpeepTable { mask: (1u32 << bits) - 1, overrides: HashMap::new() }
    }

    pub fn lookup(&self, context: u32) -> u16 {
        let key = context & self.mask;
        self.overrides.get(&key).copied().unwrap_or(Self::NEUTRAL)
    }

    pub fn set(&mut self, context: u32, value: u16) {
        self.overrides.insert(context & self.mask, value);
    }
}

/// Parses the feature-weight text blob from :
/// `size:<n>,k:<k>\n` followed by `n` `(index, weight)` pairs and `n`
/// `(index, {k weights})` rows. Grounded line-for-line on
/// `original_source/features/FeFeatureWeights.cpp`'s `Read()`.
pub struct FeatureWeights {
    pub k: usize,
    pub weights: Vec<(u32, f32)>,
    pub weight_vectors: Vec<(u32, Vec<f32>)>,
}

impl FeatureWeights {
    pub fn parse(text: &str) -> Result<FeatureWeights, crate::error::EngineError> {
        let bad = |reason: &str| crate::error::EngineError::DataLoad {
            path: "<feature weights>".to_string(),
            reason: reason.to_string(),
        };
        let mut lines = text.lines();
        let header = lines.next().ok_or_else(|| bad("empty file"))?;
        let (n, k) = parse_header(header).ok_or_else(|| bad("malformed header"))?;

        let mut weights = Vec::with_capacity(n);
        for _ in 0..n {
            let line = lines.next().ok_or_else(|| bad("truncated weight section"))?;
            let (idx, rest) = line.split_once(',').ok_or_else(|| bad("malformed weight row"))?;
            let idx: u32 = idx.trim().parse().map_err(|_| bad("bad index"))?;
            let w: f32 = rest.trim().parse().map_err(|_| bad("bad weight"))?;
            weights.push((idx, w));
        }

        let mut weight_vectors = Vec::with_capacity(n);
        for _ in 0..n {
            let line = lines.next().ok_or_else(|| bad("truncated weight-vector section"))?;
            let (idx, rest) = line.split_once(',').ok_or_else(|| bad("malformed weight-vector row"))?;
            let idx: u32 = idx.trim().parse().map_err(|_| bad("bad index"))?;
            let rest = rest.trim().trim_start_matches('{').trim_end_matches('}');
            let vec: Vec<f32> = rest
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().parse::<f32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| bad("bad weight vector"))?;
            if vec.len() != k {
                return Err(bad("weight vector length mismatch"));
            }
            weight_vectors.push((idx, vec));
        }

        Ok(FeatureWeights { k, weights, weight_vectors })
    }
}

fn parse_header(header: &str) -> Option<(usize, usize)> {
    let mut n = None;
    let mut k = None;
    for part in header.split(',') {
        let (key, val) = part.split_once(':')?;
        match key.trim() {
            "size" => n = val.trim().parse().ok(),
            "k" => k = val.trim().parse().ok(),
            _ => {}
        }
    }
    Some((n?, k?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greenpeep_unseen_context_is_neutral() {
        let table = GreenpeepTable::for_board_size(9);
        assert_eq!(table.lookup(12345), GreenpeepTable::NEUTRAL);
    }

    #[test]
    fn greenpeep_override_roundtrips() {
        let mut table = GreenpeepTable::for_board_size(9);
        table.set(42, 700);
        assert_eq!(table.lookup(42), 700);
        assert_eq!(table.lookup(43), GreenpeepTable::NEUTRAL);
    }

    #[test]
    fn feature_weights_parses_minimal_blob() {
        let blob = "size:1,k:2\n0,1.5\n0,{0.1,0.2}\n";
        let parsed = FeatureWeights::parse(blob).unwrap();
        assert_eq!(parsed.k, 2);
        assert_eq!(parsed.weights, vec![(0, 1.5)]);
        assert_eq!(parsed.weight_vectors[0].0, 0);
        assert_eq!(parsed.weight_vectors[0].1.len(), 2);
    }

    #[test]
    fn combine_modes_agree_on_constant_input() {
        let values = [2.0, 2.0, 2.0];
        assert_eq!(combine(&values, CombineMode::Average), 2.0);
        assert_eq!(combine(&values, CombineMode::Max), 2.0);
        assert!((combine(&values, CombineMode::GeometricMean) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn prior_knowledge_is_probability_like() {
        let board = Board::new();
        let mv = crate::constants::BOARD_IMIN + 2;
        let prior = compute_prior(&board, mv, false, 0);
        assert!(prior.mean >= 0.0 && prior.mean <= 1.0);
        assert!(prior.count >= 1);
    }
}
