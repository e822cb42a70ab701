use crate::heuristics::Heuristic;
use crate::state::UnpackedState;
use crate::task::LiftedTask;
use vega_collections::Idx;
use vega_formalism::eval;
use vega_formalism::{Find, GroundConjunctiveCondition, GroundLiteral};
use vega_grounder::{AtomFactSets, KindFacts};

/// Counts the unsatisfied goal literals and constraints. Cheap and
/// goal-aware but inadmissible; meant for greedy search.
#[derive(Default)]
pub struct GoalCountHeuristic {
    goal: Option<Idx<GroundConjunctiveCondition>>,
}

impl GoalCountHeuristic {
    pub fn new() -> Self {
        Default::default()
    }
}

fn count_unsatisfied<K: KindFacts>(
    task: &LiftedTask,
    literals: &[Idx<GroundLiteral<K>>],
    atoms: &AtomFactSets<K>,
) -> usize
where
    vega_formalism::Repository: vega_formalism::Store<GroundLiteral<K>>,
{
    literals
        .iter()
        .filter(|&&index| {
            let literal = Find::<GroundLiteral<K>>::resolve(&task.ctx, index);
            atoms.contains(literal.atom) != literal.polarity
        })
        .count()
}

impl Heuristic for GoalCountHeuristic {
    fn set_goal(&mut self, goal: Idx<GroundConjunctiveCondition>) {
        self.goal = Some(goal);
    }

    fn evaluate(&mut self, task: &LiftedTask, state: &UnpackedState, auxiliary: f64) -> f32 {
        let Some(goal) = self.goal else {
            return 0.0;
        };
        let data = Find::<GroundConjunctiveCondition>::resolve(&task.ctx, goal);
        let context = task.state_context(state, auxiliary);

        let mut unsatisfied = count_unsatisfied(task, &data.static_literals, &task.static_facts)
            + count_unsatisfied(task, &data.fluent_literals, &state.fluent_atoms)
            + count_unsatisfied(task, &data.derived_literals, &state.derived_atoms);
        unsatisfied += data
            .constraints
            .iter()
            .filter(|&&c| !eval::holds(c, &task.ctx, &context))
            .count();

        unsatisfied as f32
    }
}
