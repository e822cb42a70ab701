use crate::axioms::AxiomEvaluator;
use crate::executor::apply_action;
use crate::metric::evaluate_metric;
use crate::state::{StateIndex, UnpackedState};
use crate::state_repository::StateRepository;
use crate::task::LiftedTask;
use vega_collections::{Idx, PoolPtr};
use vega_formalism::{ContextExt, Derived, Fluent, GroundAction, GroundAtoms, Object, Predicate};
use vega_grounder::{collect_bindings, AssignmentSets, FactsView, GroundingWorkspace};

/// A reached state together with its cost accumulator and metric value.
#[derive(Copy, Clone, Debug)]
pub struct Node {
    pub state: StateIndex,
    /// Value of the cost accumulator on the path that created this node.
    pub auxiliary: f64,
    /// Task metric at this node; the g-value of the search.
    pub metric: f64,
}

/// Produces the initial node and, per state, all applicable ground actions
/// with their successor nodes. Owns the state repository and the grounding
/// scratch; the task provides the interned scopes and per-action graphs.
pub struct SuccessorGenerator {
    pub repository: StateRepository,
    axiom_evaluator: Option<AxiomEvaluator>,
    grounding: GroundingWorkspace,
    fluent_assignments: AssignmentSets<Fluent>,
    derived_assignments: AssignmentSets<Derived>,
}

impl SuccessorGenerator {
    pub fn new(task: &LiftedTask) -> Self {
        SuccessorGenerator {
            repository: StateRepository::new(),
            axiom_evaluator: task.axioms.as_ref().map(|_| AxiomEvaluator::new(&task.ctx)),
            grounding: GroundingWorkspace::new(),
            fluent_assignments: AssignmentSets::new(
                &task.ctx,
                task.ctx.num::<Predicate<Fluent>>(),
                task.ctx.num::<Object>(),
            ),
            derived_assignments: AssignmentSets::new(
                &task.ctx,
                task.ctx.num::<Predicate<Derived>>(),
                task.ctx.num::<Object>(),
            ),
        }
    }

    /// Builds and registers the initial state, closed under the axioms.
    pub fn initial_node(&mut self, task: &mut LiftedTask) -> Node {
        let state = self.repository.blank_state();
        {
            let mut state = state.borrow_mut();
            for &atom in &task.task_data.fluent_atoms {
                state.fluent_atoms.insert(atom);
            }
            state.numeric.extend_from_slice(&task.initial_fluent_values);

            if let (Some(evaluator), Some(program)) =
                (self.axiom_evaluator.as_mut(), task.axioms.as_ref())
            {
                evaluator.extend(&mut task.ctx, program, &mut state);
            }
        }
        let (index, _) = self.repository.register(&mut state.borrow_mut());

        let auxiliary = task.task_data.auxiliary_initial_value.get();
        let state = state.borrow();
        let context = task.state_context(&state, auxiliary);
        let metric = evaluate_metric(&task.ctx, &task.task_data, &context);

        Node {
            state: index,
            auxiliary,
            metric,
        }
    }

    /// All applicable ground actions in `node`'s state, each with the node
    /// produced by applying it. Deterministic: action schemas in declaration
    /// order, bindings in canonical enumeration order.
    pub fn successors(
        &mut self,
        task: &mut LiftedTask,
        node: &Node,
        out: &mut Vec<(Idx<GroundAction>, Node)>,
    ) {
        out.clear();
        let parent = self.repository.unpack(node.state);
        let parent = parent.borrow();

        self.fluent_assignments.reset();
        for fact in parent.fluent_atoms.iter() {
            let binding = task.ctx.ground_atom(fact).binding.clone();
            self.fluent_assignments.insert(fact.predicate, &binding);
        }
        self.derived_assignments.reset();
        for fact in parent.derived_atoms.iter() {
            let binding = task.ctx.ground_atom(fact).binding.clone();
            self.derived_assignments.insert(fact.predicate, &binding);
        }

        for position in 0..task.actions.len() {
            let facts = FactsView {
                static_atoms: &task.static_facts,
                fluent_atoms: &parent.fluent_atoms,
                derived_atoms: &parent.derived_atoms,
                static_values: &task.static_values,
                fluent_values: &parent.numeric,
            };
            collect_bindings(
                &task.ctx,
                &task.actions[position].precondition,
                &facts,
                &self.fluent_assignments,
                &self.derived_assignments,
                &mut self.grounding,
            );

            let bindings = std::mem::take(&mut self.grounding.bindings);
            for binding in &bindings {
                let action = task.ground_action(position, binding);
                let successor = apply_action(
                    task,
                    action,
                    &parent,
                    node.auxiliary,
                    &mut self.repository,
                    &mut self.axiom_evaluator,
                );
                out.push((action, successor));
            }
            self.grounding.bindings = bindings;
        }
    }

    /// Decodes a registered state.
    pub fn state(&self, index: StateIndex) -> PoolPtr<UnpackedState> {
        self.repository.unpack(index)
    }
}
