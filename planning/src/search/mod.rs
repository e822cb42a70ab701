use crate::plan::Plan;
use crate::state::StateIndex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};
use vega_collections::{Idx, SegmentedVec};
use vega_formalism::GroundAction;

pub mod astar;
pub mod event;
pub mod gbfs;

pub use astar::astar;
pub use event::{DefaultEventHandler, EventHandler, Statistics};
pub use gbfs::gbfs;

/// Terminal outcome of a search run.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SearchStatus {
    Solved,
    Unsolvable,
    Exhausted,
    OutOfTime,
    OutOfStates,
}

pub struct SearchResult {
    pub status: SearchStatus,
    pub plan: Option<Plan>,
}

impl SearchResult {
    pub fn terminal(status: SearchStatus) -> Self {
        SearchResult { status, plan: None }
    }
}

/// Search budgets; exceeding one ends the run cleanly with `OutOfStates`
/// resp. `OutOfTime`, leaving all repositories queryable.
#[derive(Clone, Debug)]
pub struct SearchOptions {
    pub max_num_states: usize,
    pub max_time: Option<Duration>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            max_num_states: usize::MAX,
            max_time: None,
        }
    }
}

/// Wall-clock budget checked at the top of every search iteration.
pub struct CountdownWatch {
    deadline: Instant,
}

impl CountdownWatch {
    pub fn new(budget: Duration) -> Self {
        CountdownWatch {
            deadline: Instant::now() + budget,
        }
    }

    pub fn has_finished(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum SearchNodeStatus {
    New,
    Open,
    Closed,
    Goal,
    DeadEnd,
}

/// Per-state search bookkeeping, densely indexed by [`StateIndex`].
#[derive(Copy, Clone)]
pub struct SearchNode {
    pub g_value: f64,
    /// Cost accumulator on the path behind `g_value`; equal to it unless the
    /// task declares a metric expression.
    pub auxiliary: f64,
    pub parent_state: StateIndex,
    /// Action whose application created this node on the cheapest known
    /// path; walking these labels backwards yields the plan.
    pub parent_action: Idx<GroundAction>,
    pub status: SearchNodeStatus,
}

impl SearchNode {
    fn fresh() -> Self {
        SearchNode {
            g_value: f64::INFINITY,
            auxiliary: f64::INFINITY,
            parent_state: StateIndex::unset(),
            parent_action: Idx::unset(),
            status: SearchNodeStatus::New,
        }
    }
}

/// Grow-only table of search nodes. Backed by a segmented vector so node
/// references never move while the table grows during expansion.
#[derive(Default)]
pub struct SearchSpace {
    nodes: SegmentedVec<SearchNode>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, state: StateIndex) -> &SearchNode {
        &self.nodes[usize::from(state)]
    }

    pub fn node_mut(&mut self, state: StateIndex) -> &mut SearchNode {
        let i = usize::from(state);
        while self.nodes.len() <= i {
            self.nodes.push(SearchNode::fresh());
        }
        &mut self.nodes[i]
    }
}

/// Total order on `f64` keys for the open lists.
#[derive(Copy, Clone, Debug)]
pub struct TotalF64(pub f64);

impl PartialEq for TotalF64 {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for TotalF64 {}

impl PartialOrd for TotalF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TotalF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

struct OpenEntry<K> {
    key: K,
    step: u64,
    state: StateIndex,
}

impl<K: Ord> PartialEq for OpenEntry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: Ord> Eq for OpenEntry<K> {}

impl<K: Ord> PartialOrd for OpenEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord> Ord for OpenEntry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we pop the minimum key, with
        // ties broken by insertion order.
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.step.cmp(&self.step))
    }
}

/// Priority queue keyed by an ordered key, breaking ties by insertion step.
pub struct OpenList<K> {
    heap: BinaryHeap<OpenEntry<K>>,
    step: u64,
}

impl<K: Ord> Default for OpenList<K> {
    fn default() -> Self {
        OpenList {
            heap: BinaryHeap::new(),
            step: 0,
        }
    }
}

impl<K: Ord> OpenList<K> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn push(&mut self, key: K, state: StateIndex) {
        let step = self.step;
        self.step += 1;
        self.heap.push(OpenEntry { key, step, state });
    }

    pub fn pop(&mut self) -> Option<(K, StateIndex)> {
        self.heap.pop().map(|entry| (entry.key, entry.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_list_pops_minimum_with_insertion_order_ties() {
        let mut open: OpenList<TotalF64> = OpenList::new();
        open.push(TotalF64(2.0), Idx::new(0));
        open.push(TotalF64(1.0), Idx::new(1));
        open.push(TotalF64(1.0), Idx::new(2));
        open.push(TotalF64(3.0), Idx::new(3));

        let order: Vec<u32> = std::iter::from_fn(|| open.pop())
            .map(|(_, s)| s.raw())
            .collect();
        assert_eq!(order, vec![1, 2, 0, 3]);
    }

    #[test]
    fn search_space_grows_on_demand() {
        let mut space = SearchSpace::new();
        let idx: StateIndex = Idx::new(5);
        space.node_mut(idx).g_value = 1.5;
        assert_eq!(space.len(), 6);
        assert_eq!(space.node(idx).g_value, 1.5);
        assert_eq!(space.node(Idx::new(0)).status, SearchNodeStatus::New);
    }
}
