use crate::axioms::AxiomEvaluator;
use crate::metric::{evaluate_metric, is_applicable};
use crate::state::UnpackedState;
use crate::state_repository::StateRepository;
use crate::successor::Node;
use crate::task::LiftedTask;
use vega_collections::Idx;
use vega_formalism::eval;
use vega_formalism::{
    AssignOp, Find, Fluent, GroundAction, GroundAtomIdx, GroundAuxiliaryEffect,
    GroundConditionalEffect, GroundFunctionTerm, GroundNumericEffect,
};
use vega_grounder::facts::set_numeric_value;

fn fold_assign(op: AssignOp, current: f64, value: f64) -> f64 {
    match op {
        AssignOp::Assign => value,
        AssignOp::Increase => current + value,
        AssignOp::Decrease => current - value,
    }
}

/// Whether the ground action's precondition holds in `state`.
pub fn action_applicable(
    task: &LiftedTask,
    action: Idx<GroundAction>,
    state: &UnpackedState,
    auxiliary: f64,
) -> bool {
    let precondition = Find::<GroundAction>::resolve(&task.ctx, action).precondition;
    let context = task.state_context(state, auxiliary);
    is_applicable(&task.ctx, precondition, &context)
}

/// Applies a ground action to `parent`, producing the registered successor.
///
/// Conditional effects trigger against the parent state; deletes apply
/// before adds so an atom that is both added and deleted stays added.
/// Numeric effects are evaluated against the parent state and assigned
/// afterwards. The successor is closed under the axioms, registered, and
/// returned as a node carrying the updated accumulator and metric.
pub fn apply_action(
    task: &mut LiftedTask,
    action: Idx<GroundAction>,
    parent: &UnpackedState,
    parent_auxiliary: f64,
    repository: &mut StateRepository,
    axioms: &mut Option<AxiomEvaluator>,
) -> Node {
    let mut adds: Vec<GroundAtomIdx<Fluent>> = Vec::new();
    let mut deletes: Vec<GroundAtomIdx<Fluent>> = Vec::new();
    let mut numerics: Vec<(AssignOp, Idx<GroundFunctionTerm<Fluent>>, f64)> = Vec::new();
    let mut auxiliary = parent_auxiliary;
    let mut any_auxiliary = false;

    {
        // Evaluate every triggered effect against the parent state before
        // touching the successor.
        let parent_context = task.state_context(parent, parent_auxiliary);
        let effects: Vec<Idx<GroundConditionalEffect>> =
            Find::<GroundAction>::resolve(&task.ctx, action).effects.clone();

        for effect in effects {
            let data = Find::<GroundConditionalEffect>::resolve(&task.ctx, effect).clone();
            if !is_applicable(&task.ctx, data.condition, &parent_context) {
                continue;
            }
            adds.extend_from_slice(&data.add_atoms);
            deletes.extend_from_slice(&data.delete_atoms);
            for GroundNumericEffect { op, target, expr } in data.numeric_effects {
                let value = eval::evaluate(expr, &task.ctx, &parent_context);
                numerics.push((op, target, value));
            }
            if let Some(GroundAuxiliaryEffect { op, expr }) = data.auxiliary_effect {
                let value = eval::evaluate(expr, &task.ctx, &parent_context);
                auxiliary = fold_assign(op, auxiliary, value);
                any_auxiliary = true;
            }
        }
    }

    // Without a cost accumulator in the task every action costs one.
    if task.task_data.auxiliary_fterm.is_none() && !any_auxiliary {
        auxiliary += 1.0;
    }

    let successor = repository.blank_state();
    {
        let mut successor = successor.borrow_mut();
        successor.assign_fluents(parent);

        for &atom in &deletes {
            successor.fluent_atoms.remove(atom);
        }
        for &atom in &adds {
            successor.fluent_atoms.insert(atom);
        }
        for &(op, target, value) in &numerics {
            let slot = usize::from(target);
            let current = successor.numeric.get(slot).copied().unwrap_or(f64::NAN);
            set_numeric_value(&mut successor.numeric, slot, fold_assign(op, current, value));
        }

        if let (Some(evaluator), Some(program)) = (axioms.as_mut(), task.axioms.as_ref()) {
            evaluator.extend(&mut task.ctx, program, &mut successor);
        }
    }

    let (state_index, _) = repository.register(&mut successor.borrow_mut());

    let successor_ref = successor.borrow();
    let successor_context = task.state_context(&successor_ref, auxiliary);
    let metric = evaluate_metric(&task.ctx, &task.task_data, &successor_context);

    Node {
        state: state_index,
        auxiliary,
        metric,
    }
}
