use crate::plan::Plan;
use crate::successor::Node;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};
use tracing::debug;
use vega_collections::Idx;
use vega_formalism::GroundAction;

/// Observer of the search loop.
///
/// Implementations must not block indefinitely and must not panic; apart
/// from their own observation buffers they should be side-effect free. All
/// callbacks default to no-ops so observers implement only what they need.
pub trait EventHandler {
    fn on_start_search(&mut self, _start: &Node, _f_value: f64) {}
    fn on_expand_node(&mut self, _node: &Node) {}
    fn on_expand_goal_node(&mut self, _node: &Node) {}
    fn on_generate_node(&mut self, _action: Idx<GroundAction>, _node: &Node) {}
    fn on_prune_node(&mut self, _node: &Node) {}
    fn on_close_node(&mut self, _node: &Node) {}
    fn on_dead_end(&mut self, _node: &Node) {}
    fn on_finish_f_layer(&mut self, _f_value: f64) {}
    fn on_end_search(&mut self) {}
    fn on_solved(&mut self, _plan: &Plan) {}
    fn on_unsolvable(&mut self) {}
    fn on_exhausted(&mut self) {}
}

/// Search counters accumulated by the default handler.
#[derive(Clone, Debug, Default)]
pub struct Statistics {
    pub num_expanded: usize,
    pub num_generated: usize,
    pub num_deadends: usize,
    pub num_pruned: usize,
    pub search_time: Duration,
}

impl Display for Statistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[summary] expanded:{} generated:{} deadends:{} pruned:{} time:{}ms",
            self.num_expanded,
            self.num_generated,
            self.num_deadends,
            self.num_pruned,
            self.search_time.as_millis()
        )
    }
}

/// Default observer: keeps [`Statistics`] and logs the coarse progress.
#[derive(Default)]
pub struct DefaultEventHandler {
    statistics: Statistics,
    started: Option<Instant>,
}

impl DefaultEventHandler {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }
}

impl EventHandler for DefaultEventHandler {
    fn on_start_search(&mut self, _start: &Node, f_value: f64) {
        self.started = Some(Instant::now());
        debug!(f = f_value, "search started");
    }

    fn on_expand_node(&mut self, _node: &Node) {
        self.statistics.num_expanded += 1;
    }

    fn on_generate_node(&mut self, _action: Idx<GroundAction>, _node: &Node) {
        self.statistics.num_generated += 1;
    }

    fn on_prune_node(&mut self, _node: &Node) {
        self.statistics.num_pruned += 1;
    }

    fn on_dead_end(&mut self, _node: &Node) {
        self.statistics.num_deadends += 1;
    }

    fn on_finish_f_layer(&mut self, f_value: f64) {
        debug!(
            f = f_value,
            expanded = self.statistics.num_expanded,
            generated = self.statistics.num_generated,
            "finished f-layer"
        );
    }

    fn on_end_search(&mut self) {
        if let Some(started) = self.started {
            self.statistics.search_time = started.elapsed();
        }
        debug!("{}", self.statistics);
    }

    fn on_solved(&mut self, plan: &Plan) {
        debug!(length = plan.len(), cost = plan.cost(), "solved");
    }

    fn on_unsolvable(&mut self) {
        debug!("unsolvable");
    }

    fn on_exhausted(&mut self) {
        debug!("exhausted");
    }
}
