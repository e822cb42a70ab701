use crate::axioms::{compile_axioms, AxiomProgram};
use crate::metric::StateContext;
use crate::state::UnpackedState;
use hashbrown::HashMap;
use smallvec::SmallVec;
use streaming_iterator::StreamingIterator;
use vega_collections::Idx;
use vega_formalism::{
    Action, AuxiliaryEffect, Binding, ConditionalEffect, ConstructionError, ContextExt, Domain,
    Find, Fluent, FunctionTerm, GroundAction, GroundAuxiliaryEffect, GroundAtoms,
    GroundConditionalEffect, GroundFunctionTerm, GroundFunctionTermValue, GroundNumericEffect,
    NumericEffect, Object, Overlay, Predicate, Repository, Static, Store, Task,
};
use vega_grounder::{
    combinations, ground_atom, ground_condition, ground_expression, parameter_domains, substitute,
    AssignmentSets, AtomFactSets, BodyInfo, ConditionParts,
};

/// State-independent grounding data of one conditional effect: the flattened
/// condition, the effect lists, and conservative domains for the effect's
/// extra variables.
pub struct EffectInfo {
    pub effect: Idx<ConditionalEffect>,
    pub condition_parts: ConditionParts,
    pub add_atoms: Vec<Idx<vega_formalism::Atom<Fluent>>>,
    pub delete_atoms: Vec<Idx<vega_formalism::Atom<Fluent>>>,
    pub numeric_effects: Vec<NumericEffect>,
    pub auxiliary_effect: Option<AuxiliaryEffect>,
    pub extra_domains: Vec<Vec<Idx<Object>>>,
}

/// State-independent grounding data of one action schema.
pub struct ActionInfo {
    pub action: Idx<Action>,
    pub arity: usize,
    pub precondition: BodyInfo,
    pub effects: Vec<EffectInfo>,
}

/// A planning task prepared for search: the interned domain/problem scopes,
/// the static-fact analysis, per-action consistency graphs and the compiled
/// axiom program.
pub struct LiftedTask {
    pub ctx: Overlay<Repository>,
    pub task: Idx<Task>,
    pub task_data: Task,
    pub static_facts: AtomFactSets<Static>,
    pub static_assignments: AssignmentSets<Static>,
    pub static_values: Vec<f64>,
    pub initial_fluent_values: Vec<f64>,
    pub actions: Vec<ActionInfo>,
    pub axioms: Option<AxiomProgram>,
    ground_action_cache: HashMap<(Idx<Action>, Binding), Idx<GroundAction>>,
}

impl LiftedTask {
    /// Finishes construction after ingest: analyses the static facts, builds
    /// the per-action consistency graphs and compiles the axioms. Fails when
    /// the axioms cannot be stratified.
    pub fn new(task: Idx<Task>, mut ctx: Overlay<Repository>) -> Result<Self, ConstructionError> {
        let task_data = Find::<Task>::resolve(&ctx, task).clone();
        let domain = Find::<Domain>::resolve(&ctx, task_data.domain).clone();

        let mut static_facts = AtomFactSets::new();
        let mut static_assignments =
            AssignmentSets::new(&ctx, ctx.num::<Predicate<Static>>(), ctx.num::<Object>());
        for &atom in &task_data.static_atoms {
            static_facts.insert(atom);
            let binding = ctx.ground_atom(atom).binding.clone();
            static_assignments.insert(atom.predicate, &binding);
        }

        let mut static_values = Vec::new();
        for &value in &task_data.static_fterm_values {
            let data = Find::<GroundFunctionTermValue<Static>>::resolve(&ctx, value);
            vega_grounder::facts::set_numeric_value(&mut static_values, usize::from(data.fterm), data.value.get());
        }
        let mut initial_fluent_values = Vec::new();
        for &value in &task_data.fluent_fterm_values {
            let data = Find::<GroundFunctionTermValue<Fluent>>::resolve(&ctx, value);
            vega_grounder::facts::set_numeric_value(
                &mut initial_fluent_values,
                usize::from(data.fterm),
                data.value.get(),
            );
        }

        // Compiling axioms first: the program's mapped predicates must exist
        // before anything sizes per-predicate containers.
        let axioms = compile_axioms(&mut ctx, &domain, &task_data)?;

        let mut actions = Vec::with_capacity(domain.actions.len());
        for &action in &domain.actions {
            let data = Find::<Action>::resolve(&ctx, action).clone();
            let precondition = BodyInfo::new(
                &ctx,
                data.precondition,
                &task_data.objects,
                &static_assignments,
                &static_facts,
            );

            let mut effects = Vec::with_capacity(data.effects.len());
            for &effect in &data.effects {
                let effect_data = Find::<ConditionalEffect>::resolve(&ctx, effect).clone();
                let (condition_parts, scope_arity) = ConditionParts::new(&ctx, effect_data.condition);
                let condition = Find::<vega_formalism::ConjunctiveCondition>::resolve(&ctx, effect_data.condition).clone();
                let domains = parameter_domains(&ctx, &condition, &task_data.objects, &static_assignments);
                debug_assert_eq!(scope_arity, domains.len());
                // Only the extra variables are enumerated per effect; the
                // action parameters are fixed by the action binding.
                let extra_domains = domains[data.arity as usize..].to_vec();
                effects.push(EffectInfo {
                    effect,
                    condition_parts,
                    add_atoms: effect_data.add_atoms,
                    delete_atoms: effect_data.delete_atoms,
                    numeric_effects: effect_data.numeric_effects,
                    auxiliary_effect: effect_data.auxiliary_effect,
                    extra_domains,
                });
            }

            actions.push(ActionInfo {
                action,
                arity: data.arity as usize,
                precondition,
                effects,
            });
        }

        Ok(LiftedTask {
            ctx,
            task,
            task_data,
            static_facts,
            static_assignments,
            static_values,
            initial_fluent_values,
            actions,
            axioms,
            ground_action_cache: HashMap::new(),
        })
    }

    pub fn state_context<'a>(&'a self, state: &'a UnpackedState, auxiliary: f64) -> StateContext<'a> {
        StateContext {
            static_atoms: &self.static_facts,
            fluent_atoms: &state.fluent_atoms,
            derived_atoms: &state.derived_atoms,
            static_values: &self.static_values,
            fluent_values: &state.numeric,
            auxiliary,
        }
    }

    /// Interns the ground action of schema position `position` under
    /// `binding`, enumerating and grounding its conditional effects. Cached:
    /// the same (action, binding) pair always returns the same index.
    pub fn ground_action(&mut self, position: usize, binding: &[Idx<Object>]) -> Idx<GroundAction> {
        let info = &self.actions[position];
        let key = (info.action, Binding::from_slice(binding));
        if let Some(&cached) = self.ground_action_cache.get(&key) {
            return cached;
        }

        let ctx = &mut self.ctx;
        let precondition = ground_condition(ctx, &info.precondition.parts, binding);

        let mut effects = Vec::new();
        for effect_info in &info.effects {
            let mut extras = combinations(effect_info.extra_domains.clone());
            while let Some(extra) = extras.next() {
                let mut full: SmallVec<[Idx<Object>; 8]> = SmallVec::from_slice(binding);
                full.extend_from_slice(extra);

                let condition = ground_condition(ctx, &effect_info.condition_parts, &full);
                let mut ground_effect = GroundConditionalEffect {
                    condition,
                    add_atoms: Vec::with_capacity(effect_info.add_atoms.len()),
                    delete_atoms: Vec::with_capacity(effect_info.delete_atoms.len()),
                    numeric_effects: Vec::new(),
                    auxiliary_effect: None,
                };
                for &atom in &effect_info.add_atoms {
                    ground_effect.add_atoms.push(ground_atom(ctx, atom, &full));
                }
                for &atom in &effect_info.delete_atoms {
                    ground_effect.delete_atoms.push(ground_atom(ctx, atom, &full));
                }
                for numeric in &effect_info.numeric_effects {
                    let target_data = Find::<FunctionTerm<Fluent>>::resolve(ctx, numeric.target).clone();
                    let target = ctx
                        .get_or_create(GroundFunctionTerm {
                            function: target_data.function,
                            binding: substitute(&target_data.terms, &full),
                        })
                        .0;
                    ground_effect.numeric_effects.push(GroundNumericEffect {
                        op: numeric.op,
                        target,
                        expr: ground_expression(ctx, numeric.expr, &full),
                    });
                }
                if let Some(auxiliary) = &effect_info.auxiliary_effect {
                    ground_effect.auxiliary_effect = Some(GroundAuxiliaryEffect {
                        op: auxiliary.op,
                        expr: ground_expression(ctx, auxiliary.expr, &full),
                    });
                }
                effects.push(ctx.get_or_create(ground_effect).0);
            }
        }

        let (index, _) = ctx.get_or_create(GroundAction {
            action: info.action,
            binding: Binding::from_slice(binding),
            precondition,
            effects,
        });
        self.ground_action_cache.insert(key, index);
        index
    }
}
