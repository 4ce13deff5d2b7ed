//! The concurrent search tree: a bounded, per-thread
//! allocated node pool with atomically updated statistics and the
//! `first_child`/`num_children` publication pair as the sole cross-thread
//! ordering guarantee.
//!
//! Grounded on `original_source/smartgame/SgUctTree.cpp`'s `SgUctAllocator`
//! (bump-pointer arena, `Contains`/`SetMaxNodes`) and `SgUctNode` (the field
//! list duplicated here almost verbatim), with Fuego's ad-hoc memory fences
//! replaced by Rust's atomic `Ordering`.

use std::sync::atomic::{fence, AtomicBool, AtomicI8, AtomicU32, AtomicU64, Ordering};

use crate::point::Point;

/// Whether a node's subtree outcome has been statically proven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvenType {
    NotProven,
    ProvenWin,
    ProvenLoss,
}

impl ProvenType {
    fn to_i8(self) -> i8 {
        match self {
            ProvenType::NotProven => 0,
            ProvenType::ProvenWin => 1,
            ProvenType::ProvenLoss => 2,
        }
    }

    fn from_i8(v: i8) -> Self {
        match v {
            1 => ProvenType::ProvenWin,
            2 => ProvenType::ProvenLoss,
            _ => ProvenType::NotProven,
        }
    }
}

/// Address of a node: which allocator it lives in, and its index within
/// that allocator's arena. Children are always created in the *same*
/// allocator as the thread performing the expansion, so a contiguous
/// `[first_child, first_child + num_children)` range needs only one such
/// address plus a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId {
    pub allocator: u16,
    pub index: u32,
}

impl NodeId {
    pub const NULL: NodeId = NodeId { allocator: u16::MAX, index: u32::MAX };

    fn pack(self) -> u64 {
        ((self.allocator as u64) << 32) | self.index as u64
    }

    fn unpack(bits: u64) -> NodeId {
        NodeId { allocator: (bits >> 32) as u16, index: bits as u32 }
    }

    pub fn is_null(self) -> bool {
        self == NodeId::NULL
    }
}

/// One node's statistics, exactly the field list from All fields
/// are atomics; `mean`/`rave_value`/`rave_count` are stored as `f64` bit
/// patterns behind relaxed compare-exchange loops, which is the idiomatic
/// Rust equivalent of Fuego's "count and mean as independent, racy atomics".
pub struct Node {
    mv: AtomicU64, // Point stored as u64 (usize may be 32 or 64 bit)
    first_child: AtomicU64,
    num_children: AtomicU32,
    move_count: AtomicU64,
    pos_count: AtomicU64,
    mean_bits: AtomicU64,
    rave_count_bits: AtomicU64,
    rave_value_bits: AtomicU64,
    predictor_value_bits: AtomicU64,
    virtual_loss_count: AtomicU32,
    knowledge_count: AtomicU32,
    proven_type: AtomicI8,
}

impl Default for Node {
    fn default() -> Self {
        Node {
            mv: AtomicU64::new(0),
            first_child: AtomicU64::new(NodeId::NULL.pack()),
            num_children: AtomicU32::new(0),
            move_count: AtomicU64::new(0),
            pos_count: AtomicU64::new(0),
            mean_bits: AtomicU64::new(0.5f64.to_bits()),
            rave_count_bits: AtomicU64::new(0),
            rave_value_bits: AtomicU64::new(0.5f64.to_bits()),
            predictor_value_bits: AtomicU64::new(0),
            virtual_loss_count: AtomicU32::new(0),
            knowledge_count: AtomicU32::new(0),
            proven_type: AtomicI8::new(ProvenType::NotProven.to_i8()),
        }
    }
}

/// Lock-free running-average update, shared by `add_game_result` and the
/// RAVE equivalent: reads the current value, computes the new running
/// value, and retries the whole window on CAS failure. Occasional lost
/// updates under heavy contention are an accepted tradeoff for staying
/// lock-free.
fn running_average_update(count: &AtomicU64, value_bits: &AtomicU64, value: f64) -> u64 {
    let new_count = count.fetch_add(1, Ordering::Relaxed) + 1;
    loop {
        let old_bits = value_bits.load(Ordering::Relaxed);
        let old_mean = f64::from_bits(old_bits);
        let new_mean = old_mean + (value - old_mean) / new_count as f64;
        if value_bits
            .compare_exchange_weak(old_bits, new_mean.to_bits(), Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            break;
        }
    }
    new_count
}

impl Node {
    pub fn mv(&self) -> Point {
        self.mv.load(Ordering::Relaxed) as Point
    }

    pub fn move_count(&self) -> u64 {
        self.move_count.load(Ordering::Relaxed)
    }

    pub fn pos_count(&self) -> u64 {
        self.pos_count.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        f64::from_bits(self.mean_bits.load(Ordering::Relaxed))
    }

    pub fn rave_count(&self) -> f64 {
        f64::from_bits(self.rave_count_bits.load(Ordering::Relaxed))
    }

    pub fn rave_value(&self) -> f64 {
        f64::from_bits(self.rave_value_bits.load(Ordering::Relaxed))
    }

    pub fn predictor_value(&self) -> f64 {
        f64::from_bits(self.predictor_value_bits.load(Ordering::Relaxed))
    }

    pub fn set_predictor_value(&self, value: f64) {
        self.predictor_value_bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn virtual_loss_count(&self) -> u32 {
        self.virtual_loss_count.load(Ordering::Relaxed)
    }

    pub fn add_virtual_loss(&self) {
        self.virtual_loss_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn remove_virtual_loss(&self) {
        self.virtual_loss_count.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn knowledge_count(&self) -> u32 {
        self.knowledge_count.load(Ordering::Relaxed)
    }

    pub fn bump_knowledge_count(&self) -> u32 {
        self.knowledge_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn proven_type(&self) -> ProvenType {
        ProvenType::from_i8(self.proven_type.load(Ordering::Relaxed))
    }

    pub fn set_proven_type(&self, t: ProvenType) {
        self.proven_type.store(t.to_i8(), Ordering::Relaxed);
    }

    pub fn touch_pos_count(&self) {
        self.pos_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Concurrent: atomic running-average update of `mean`/`move_count`.
    pub fn add_game_result(&self, value: f64) {
        running_average_update(&self.move_count, &self.mean_bits, value);
    }

    /// Concurrent: weighted running-average update of the RAVE statistic.
    /// `weight` lets a single simulation contribute a fractional
    /// all-moves-as-first sample.
    pub fn add_rave_result(&self, value: f64, weight: f64) {
        loop {
            let old_count_bits = self.rave_count_bits.load(Ordering::Relaxed);
            let old_count = f64::from_bits(old_count_bits);
            let new_count = old_count + weight;
            if self
                .rave_count_bits
                .compare_exchange_weak(old_count_bits, new_count.to_bits(), Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                loop {
                    let old_val_bits = self.rave_value_bits.load(Ordering::Relaxed);
                    let old_val = f64::from_bits(old_val_bits);
                    let new_val = old_val + weight * (value - old_val) / new_count.max(1.0);
                    if self
                        .rave_value_bits
                        .compare_exchange_weak(old_val_bits, new_val.to_bits(), Ordering::Relaxed, Ordering::Relaxed)
                        .is_ok()
                    {
                        return;
                    }
                }
            }
        }
    }

    /// Seed synthetic initial statistics from the knowledge layer's prior
    /// knowledge; adds `count` synthetic visits at `mean` in one
    /// shot rather than one `add_game_result` call per synthetic visit.
    pub fn seed_prior(&self, mean: f64, count: u64, rave_value: f64, rave_count: f64) {
        self.move_count.store(count, Ordering::Relaxed);
        self.mean_bits.store(mean.to_bits(), Ordering::Relaxed);
        self.rave_count_bits.store(rave_count.to_bits(), Ordering::Relaxed);
        self.rave_value_bits.store(rave_value.to_bits(), Ordering::Relaxed);
    }

    /// Ordered publication: store `first_child`, fence, store
    /// `num_children`. This is the sole reason the tree is lock-free-safe.
    pub fn link_children(&self, first: NodeId, count: u32) {
        self.first_child.store(first.pack(), Ordering::Relaxed);
        fence(Ordering::Release);
        self.num_children.store(count, Ordering::Relaxed);
    }

    /// Ordered read: load `num_children`, fence, load `first_child`.
    /// Returns `None` if the node has no children yet.
    pub fn children_range(&self) -> Option<(NodeId, u32)> {
        let count = self.num_children.load(Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        fence(Ordering::Acquire);
        Some((NodeId::unpack(self.first_child.load(Ordering::Relaxed)), count))
    }

    pub fn num_children(&self) -> u32 {
        self.num_children.load(Ordering::Relaxed)
    }

    fn reset_for(&self, mv: Point) {
        self.mv.store(mv as u64, Ordering::Relaxed);
        self.first_child.store(NodeId::NULL.pack(), Ordering::Relaxed);
        self.num_children.store(0, Ordering::Relaxed);
        self.move_count.store(0, Ordering::Relaxed);
        self.pos_count.store(0, Ordering::Relaxed);
        self.mean_bits.store(0.5f64.to_bits(), Ordering::Relaxed);
        self.rave_count_bits.store(0.0f64.to_bits(), Ordering::Relaxed);
        self.rave_value_bits.store(0.5f64.to_bits(), Ordering::Relaxed);
        self.predictor_value_bits.store(0.0f64.to_bits(), Ordering::Relaxed);
        self.virtual_loss_count.store(0, Ordering::Relaxed);
        self.knowledge_count.store(0, Ordering::Relaxed);
        self.proven_type.store(ProvenType::NotProven.to_i8(), Ordering::Relaxed);
    }
}

/// A bump-pointer arena owned (for *creation*) by one search thread.
/// Nodes are preallocated with `Default` (inert) values; claiming a slot
/// just overwrites its atomics in place, so no unsafe placement-new is
/// needed the way Fuego's raw-malloc arena requires.
pub struct Allocator {
    nodes: Box<[Node]>,
    finish: AtomicU32,
    truncated: AtomicBool,
}

impl Allocator {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut v = Vec::with_capacity(capacity);
        v.resize_with(capacity, Node::default);
        Allocator { nodes: v.into_boxed_slice(), finish: AtomicU32::new(0), truncated: AtomicBool::new(false) }
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn len(&self) -> usize {
        self.finish.load(Ordering::Relaxed) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn node(&self, index: u32) -> &Node {
        &self.nodes[index as usize]
    }

    pub fn was_truncated(&self) -> bool {
        self.truncated.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.finish.store(0, Ordering::Relaxed);
        self.truncated.store(false, Ordering::Relaxed);
    }

    /// Single-threaded by convention: called only by the allocator's owning
    /// worker. Creates one child node; fails silently if the arena is full.
    pub fn create_one(&self, mv: Point) -> Option<u32> {
        let idx = self.finish.fetch_add(1, Ordering::Relaxed);
        if idx as usize >= self.nodes.len() {
            self.truncated.store(true, Ordering::Relaxed);
            return None;
        }
        self.nodes[idx as usize].reset_for(mv);
        Some(idx)
    }

    /// Single-threaded by convention: creates `moves.len()` children
    /// contiguously. Returns `None` (fully aborting, leaving the arena
    /// otherwise consistent) if the whole batch would not fit.
    pub fn create_n(&self, moves: &[Point]) -> Option<(u32, u32)> {
        let count = moves.len() as u32;
        if count == 0 {
            return None;
        }
        let start = self.finish.fetch_add(count, Ordering::Relaxed);
        if start as u64 + count as u64 > self.nodes.len() as u64 {
            self.truncated.store(true, Ordering::Relaxed);
            return None;
        }
        for (i, &mv) in moves.iter().enumerate() {
            self.nodes[start as usize + i].reset_for(mv);
        }
        Some((start, count))
    }
}

/// Owns every worker's allocator plus the root. Two `Tree`s alternate
/// across searches (current/scratch) so subtree reuse can copy
/// from one into the other without the old tree's allocators being mutated
/// concurrently with the new search.
pub struct Tree {
    allocators: Vec<Allocator>,
    root_allocator: u16,
    root_index: u32,
}

impl Tree {
    /// `per_allocator_capacity * num_allocators` is the configured tree
    /// size bound.
    pub fn new(num_allocators: usize, per_allocator_capacity: usize) -> Self {
        let mut allocators = Vec::with_capacity(num_allocators);
        for _ in 0..num_allocators {
            allocators.push(Allocator::with_capacity(per_allocator_capacity));
        }
        // Root always lives in allocator 0, slot 0.
        allocators[0].create_one(crate::point::NULL_POINT).expect("root allocator has capacity >= 1");
        Tree { allocators, root_allocator: 0, root_index: 0 }
    }

    pub fn num_allocators(&self) -> usize {
        self.allocators.len()
    }

    pub fn allocator(&self, i: usize) -> &Allocator {
        &self.allocators[i]
    }

    pub fn root_id(&self) -> NodeId {
        NodeId { allocator: self.root_allocator, index: self.root_index }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.allocators[id.allocator as usize].node(id.index)
    }

    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        match self.node(id).children_range() {
            None => Vec::new(),
            Some((first, count)) => {
                (0..count).map(|i| NodeId { allocator: first.allocator, index: first.index + i }).collect()
            }
        }
    }

    /// Total `pos_count` across every reachable node (used to check subtree
    /// extraction fidelity).
    pub fn total_pos_count(&self, id: NodeId) -> u64 {
        let mut total = self.node(id).pos_count();
        for c in self.children_of(id) {
            total += self.total_pos_count(c);
        }
        total
    }

    pub fn was_truncated(&self) -> bool {
        self.allocators.iter().any(|a| a.was_truncated())
    }

    pub fn clear(&self) {
        for a in &self.allocators {
            a.clear();
        }
        self.allocators[self.root_allocator as usize].create_one(crate::point::NULL_POINT);
    }

    /// Filtered copy / subtree extraction: copy `source_id`
    /// from `source` into `self`, dropping any subtree whose `move_count`
    /// is below `threshold` unless it is proven. Target allocators are
    /// chosen round-robin to spread load; if the target allocator a node
    /// would land in is full, that branch is truncated (ancestors keep
    /// their accumulated statistics, but lose `ProvenWin`/`ProvenLoss`
    /// per failure semantics).
    pub fn extract_subtree(&self, source: &Tree, source_id: NodeId, threshold: u64) -> NodeId {
        let mut next_allocator: u16 = 0;
        let root_dest = self.root_id();
        self.copy_node(source, source_id, root_dest, threshold, &mut next_allocator);
        root_dest
    }

    fn copy_node(
        &self,
        source: &Tree,
        src_id: NodeId,
        dest_id: NodeId,
        threshold: u64,
        next_allocator: &mut u16,
    ) {
        let src_node = source.node(src_id);
        let dest_node = self.node(dest_id);
        dest_node.seed_prior(src_node.mean(), src_node.move_count(), src_node.rave_value(), src_node.rave_count());
        for _ in 0..src_node.pos_count() {
            dest_node.touch_pos_count();
        }
        dest_node.set_predictor_value(src_node.predictor_value());

        let src_children: Vec<NodeId> = source.children_of(src_id);
        if src_children.is_empty() {
            dest_node.set_proven_type(src_node.proven_type());
            return;
        }

        let kept: Vec<NodeId> = src_children
            .iter()
            .copied()
            .filter(|&c| {
                let n = source.node(c);
                n.move_count() >= threshold || n.proven_type() != ProvenType::NotProven
            })
            .collect();
        if kept.is_empty() {
            dest_node.set_proven_type(ProvenType::NotProven);
            return;
        }

        let moves: Vec<Point> = kept.iter().map(|&c| source.node(c).mv()).collect();
        let allocator_idx = (*next_allocator as usize) % self.num_allocators();
        *next_allocator = next_allocator.wrapping_add(1);
        match self.allocators[allocator_idx].create_n(&moves) {
            None => {
                // Truncated: this branch stops here, proven-type downgraded.
                dest_node.set_proven_type(ProvenType::NotProven);
            }
            Some((start, count)) => {
                let first = NodeId { allocator: allocator_idx as u16, index: start };
                dest_node.link_children(first, count);
                for i in 0..count {
                    let child_dest = NodeId { allocator: allocator_idx as u16, index: start + i };
                    self.copy_node(source, kept[i as usize], child_dest, threshold, next_allocator);
                }
                recompute_proven(self, dest_id);
            }
        }
    }
}

/// A node is `ProvenWin` iff any child is `ProvenLoss`; `ProvenLoss` iff
/// every child is `ProvenWin`; else `NotProven`.
pub fn recompute_proven(tree: &Tree, id: NodeId) {
    let children = tree.children_of(id);
    if children.is_empty() {
        return;
    }
    let any_loss = children.iter().any(|&c| tree.node(c).proven_type() == ProvenType::ProvenLoss);
    if any_loss {
        tree.node(id).set_proven_type(ProvenType::ProvenWin);
        return;
    }
    let all_win = children.iter().all(|&c| tree.node(c).proven_type() == ProvenType::ProvenWin);
    if all_win {
        tree.node(id).set_proven_type(ProvenType::ProvenLoss);
    } else {
        tree.node(id).set_proven_type(ProvenType::NotProven);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_create_and_link() {
        let alloc = Allocator::with_capacity(8);
        let (start, count) = alloc.create_n(&[1, 2, 3]).unwrap();
        assert_eq!(count, 3);
        assert_eq!(alloc.node(start).mv(), 1);
        assert_eq!(alloc.node(start + 2).mv(), 3);
    }

    #[test]
    fn allocator_full_aborts_cleanly() {
        let alloc = Allocator::with_capacity(2);
        assert!(alloc.create_n(&[1, 2, 3]).is_none());
        assert!(alloc.was_truncated());
    }

    #[test]
    fn link_children_publishes_in_order() {
        let tree = Tree::new(1, 16);
        let root = tree.root_id();
        let (start, count) = tree.allocator(0).create_n(&[10, 20]).unwrap();
        let first = NodeId { allocator: 0, index: start };
        assert!(tree.node(root).children_range().is_none());
        tree.node(root).link_children(first, count);
        let (got_first, got_count) = tree.node(root).children_range().unwrap();
        assert_eq!(got_count, 2);
        assert_eq!(got_first, first);
    }

    #[test]
    fn running_average_converges() {
        let node = Node::default();
        for _ in 0..100 {
            node.add_game_result(1.0);
        }
        assert!((node.mean() - 1.0).abs() < 1e-9);
        assert_eq!(node.move_count(), 100);
    }

    #[test]
    fn monotone_visits() {
        let node = Node::default();
        let mut last = 0;
        for _ in 0..10 {
            node.add_game_result(0.5);
            let now = node.move_count();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn proven_propagation_any_loss_child_is_win() {
        let tree = Tree::new(1, 8);
        let root = tree.root_id();
        let (start, count) = tree.allocator(0).create_n(&[1, 2]).unwrap();
        let first = NodeId { allocator: 0, index: start };
        tree.node(root).link_children(first, count);
        let children = tree.children_of(root);
        tree.node(children[0]).set_proven_type(ProvenType::ProvenLoss);
        tree.node(children[1]).set_proven_type(ProvenType::NotProven);
        recompute_proven(&tree, root);
        assert_eq!(tree.node(root).proven_type(), ProvenType::ProvenWin);
    }

    #[test]
    fn subtree_extraction_preserves_pos_count_above_threshold() {
        let source = Tree::new(1, 16);
        let root = source.root_id();
        let (start, count) = source.allocator(0).create_n(&[1, 2]).unwrap();
        let first = NodeId { allocator: 0, index: start };
        source.node(root).link_children(first, count);
        for c in source.children_of(root) {
            source.node(c).touch_pos_count();
            source.node(c).add_game_result(1.0);
        }
        source.node(root).touch_pos_count();

        let target = Tree::new(1, 16);
        let new_root = target.extract_subtree(&source, root, 0);
        assert_eq!(target.total_pos_count(new_root), source.total_pos_count(root));
    }
}
