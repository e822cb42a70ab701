use crate::state::StateIndex;
use itertools::Itertools;
use std::fmt::{Display, Formatter};
use vega_collections::Idx;
use vega_formalism::fmt::view;
use vega_formalism::{Action, Find, GroundAction, Object, Symbols};

/// One labelled step of a plan: the action taken and the node it produced.
#[derive(Copy, Clone, Debug)]
pub struct PlanStep {
    pub action: Idx<GroundAction>,
    pub state: StateIndex,
    /// Task metric after this step.
    pub metric: f64,
}

/// A total-ordered solution: the initial node plus labelled steps. An empty
/// step list is a valid plan for a task whose initial state is a goal.
#[derive(Clone, Debug)]
pub struct Plan {
    pub initial: StateIndex,
    pub initial_metric: f64,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The plan's cost: the metric of its final node.
    pub fn cost(&self) -> f64 {
        self.steps.last().map_or(self.initial_metric, |step| step.metric)
    }

    /// Renders the plan one action per line.
    pub fn display<'a, C>(&'a self, ctx: &'a C) -> impl Display + 'a
    where
        C: Find<GroundAction> + Find<Action> + Find<Object> + Symbols,
    {
        DisplayPlan { plan: self, ctx }
    }
}

struct DisplayPlan<'a, C> {
    plan: &'a Plan,
    ctx: &'a C,
}

impl<'a, C> Display for DisplayPlan<'a, C>
where
    C: Find<GroundAction> + Find<Action> + Find<Object> + Symbols,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.plan
                .steps
                .iter()
                .map(|step| view(step.action, self.ctx))
                .format("\n")
        )
    }
}
