use vega_collections::Idx;
use vega_formalism::eval::{self, NumericSource};
use vega_formalism::{
    Auxiliary, Context, Find, Fluent, GroundConjunctiveCondition, GroundFunctionTerm, GroundLiteral,
    Static, Task,
};
use vega_grounder::{AtomFactSets, KindFacts};

/// A state viewed together with the running cost accumulator: what ground
/// conditions, numeric constraints and the task metric are evaluated against.
pub struct StateContext<'a> {
    pub static_atoms: &'a AtomFactSets<Static>,
    pub fluent_atoms: &'a AtomFactSets<Fluent>,
    pub derived_atoms: &'a AtomFactSets<vega_formalism::Derived>,
    pub static_values: &'a [f64],
    pub fluent_values: &'a [f64],
    /// Current value of the cost accumulator.
    pub auxiliary: f64,
}

impl<'a> NumericSource for StateContext<'a> {
    fn static_value(&self, fterm: Idx<GroundFunctionTerm<Static>>) -> f64 {
        self.static_values.get(usize::from(fterm)).copied().unwrap_or(f64::NAN)
    }

    fn fluent_value(&self, fterm: Idx<GroundFunctionTerm<Fluent>>) -> f64 {
        self.fluent_values.get(usize::from(fterm)).copied().unwrap_or(f64::NAN)
    }

    fn auxiliary_value(&self, _fterm: Idx<GroundFunctionTerm<Auxiliary>>) -> f64 {
        self.auxiliary
    }
}

fn literals_hold<K, C>(ctx: &C, literals: &[Idx<GroundLiteral<K>>], atoms: &AtomFactSets<K>) -> bool
where
    K: KindFacts,
    C: Context + Find<GroundLiteral<K>>,
{
    literals.iter().all(|&index| {
        let literal = Find::<GroundLiteral<K>>::resolve(ctx, index);
        atoms.contains(literal.atom) == literal.polarity
    })
}

/// Whether a ground condition holds in the state: every literal with its
/// polarity, every numeric constraint true.
pub fn is_applicable<C: Context>(
    ctx: &C,
    condition: Idx<GroundConjunctiveCondition>,
    state: &StateContext,
) -> bool {
    let data = Find::<GroundConjunctiveCondition>::resolve(ctx, condition);
    literals_hold(ctx, &data.static_literals, state.static_atoms)
        && literals_hold(ctx, &data.fluent_literals, state.fluent_atoms)
        && literals_hold(ctx, &data.derived_literals, state.derived_atoms)
        && data.constraints.iter().all(|&c| eval::holds(c, ctx, state))
}

/// Whether the static part of a condition can ever be satisfied. States only
/// grow fluent/derived facts; a condition failing here fails everywhere, so
/// this is the static-pruning test run before any search.
pub fn is_statically_applicable<C: Context>(
    ctx: &C,
    condition: Idx<GroundConjunctiveCondition>,
    static_atoms: &AtomFactSets<Static>,
) -> bool {
    let data = Find::<GroundConjunctiveCondition>::resolve(ctx, condition);
    literals_hold(ctx, &data.static_literals, static_atoms)
}

/// The task's objective value in a state: the metric expression when one is
/// declared, otherwise the cost accumulator itself.
pub fn evaluate_metric<C: Context>(ctx: &C, task: &Task, state: &StateContext) -> f64 {
    match task.metric {
        Some(expr) => eval::evaluate(expr, ctx, state),
        None => state.auxiliary,
    }
}
