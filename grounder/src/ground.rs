use crate::assignment::AssignmentSets;
use crate::consistency::{literal_consistent, StaticConsistencyGraph};
use crate::domains::parameter_domains;
use crate::facts::{AtomFactSets, FactsView, KindFacts};
use crate::kpkc::{enumerate_cliques, KpkcWorkspace};
use smallvec::SmallVec;
use vega_collections::Idx;
use vega_formalism::eval::NumericSource;
use vega_formalism::{
    Atom, BinaryOp, Binding, ConjunctiveCondition, Context, Derived, Find, Fluent, FunctionExpression,
    FunctionTerm, GroundAtom, GroundAtomIdx, GroundAtoms, GroundAtomsMut, GroundConjunctiveCondition,
    GroundFunctionExpression, GroundFunctionTerm, GroundLiteral, GroundNumericConstraint, GroundRule,
    Literal, MultiOp, NumericConstraint, Object, Rule, Static, Store, Term,
};

/// Flattened literal and constraint lists of one conjunctive condition,
/// copied out of the repository so grounding can iterate them while the
/// repository is being written to.
#[derive(Clone, Default)]
pub struct ConditionParts {
    pub static_literals: Vec<Idx<Literal<Static>>>,
    pub fluent_literals: Vec<Idx<Literal<Fluent>>>,
    pub derived_literals: Vec<Idx<Literal<Derived>>>,
    pub constraints: Vec<Idx<NumericConstraint>>,
}

impl ConditionParts {
    /// Copies the parts of `condition`; also returns its parameter count.
    pub fn new<C: Context>(ctx: &C, condition: Idx<ConjunctiveCondition>) -> (Self, usize) {
        let data = Find::<ConjunctiveCondition>::resolve(ctx, condition);
        (
            ConditionParts {
                static_literals: data.static_literals.clone(),
                fluent_literals: data.fluent_literals.clone(),
                derived_literals: data.derived_literals.clone(),
                constraints: data.constraints.clone(),
            },
            data.variables.len(),
        )
    }
}

/// Everything state-independent the grounder needs about one condition body:
/// the flattened parts and the static consistency graph over its parameters.
pub struct BodyInfo {
    pub condition: Idx<ConjunctiveCondition>,
    pub arity: usize,
    pub parts: ConditionParts,
    pub graph: StaticConsistencyGraph,
}

impl BodyInfo {
    pub fn new<C: Context>(
        ctx: &C,
        condition: Idx<ConjunctiveCondition>,
        objects: &[Idx<Object>],
        static_assignments: &AssignmentSets<Static>,
        static_facts: &AtomFactSets<Static>,
    ) -> Self {
        let data = Find::<ConjunctiveCondition>::resolve(ctx, condition).clone();
        let (parts, arity) = ConditionParts::new(ctx, condition);
        let domains = parameter_domains(ctx, &data, objects, static_assignments);
        let graph = StaticConsistencyGraph::new(ctx, &data, &domains, static_assignments, static_facts);
        BodyInfo {
            condition,
            arity,
            parts,
            graph,
        }
    }
}

/// Reusable scratch for per-state grounding.
#[derive(Default)]
pub struct GroundingWorkspace {
    pub kpkc: KpkcWorkspace,
    /// Verified bindings of the last [`collect_bindings`] call, in canonical
    /// enumeration order.
    pub bindings: Vec<Binding>,
    partial: Vec<Option<Idx<Object>>>,
}

impl GroundingWorkspace {
    pub fn new() -> Self {
        Default::default()
    }
}

/// Substitutes parameters by the binding's objects.
pub fn substitute(terms: &[Term], binding: &[Idx<Object>]) -> Binding {
    terms
        .iter()
        .map(|&term| match term {
            Term::Object(o) => o,
            Term::Parameter(p) => binding[p as usize],
        })
        .collect()
}

/// Exact truth of one literal under a full binding.
fn ground_literal_holds<K, C>(
    ctx: &C,
    literal: Idx<Literal<K>>,
    binding: &[Idx<Object>],
    facts: &FactsView,
) -> bool
where
    K: KindFacts,
    C: Context + Find<Literal<K>> + Find<Atom<K>> + GroundAtoms<K>,
{
    let literal = Find::<Literal<K>>::resolve(ctx, literal);
    let atom = Find::<Atom<K>>::resolve(ctx, literal.atom);
    let present = ctx
        .find_ground_atom(&GroundAtom {
            predicate: atom.predicate,
            binding: substitute(&atom.terms, binding),
        })
        .is_some_and(|index| facts.contains(index));
    present == literal.polarity
}

/// Evaluates a lifted expression under a binding without interning anything;
/// unknown function terms read as `NaN`.
fn evaluate_lifted<C: Context>(
    ctx: &C,
    expr: Idx<FunctionExpression>,
    binding: &[Idx<Object>],
    facts: &FactsView,
) -> f64 {
    match Find::<FunctionExpression>::resolve(ctx, expr) {
        FunctionExpression::Number(value) => value.get(),
        FunctionExpression::Minus(inner) => -evaluate_lifted(ctx, *inner, binding, facts),
        FunctionExpression::Binary(op, lhs, rhs) => {
            let lhs = evaluate_lifted(ctx, *lhs, binding, facts);
            let rhs = evaluate_lifted(ctx, *rhs, binding, facts);
            match op {
                BinaryOp::Add => lhs + rhs,
                BinaryOp::Sub => lhs - rhs,
                BinaryOp::Mul => lhs * rhs,
                BinaryOp::Div => lhs / rhs,
            }
        }
        FunctionExpression::Multi(op, args) => {
            let mut acc = match op {
                MultiOp::Add => 0.0,
                MultiOp::Mul => 1.0,
            };
            for &arg in args.iter() {
                let value = evaluate_lifted(ctx, arg, binding, facts);
                match op {
                    MultiOp::Add => acc += value,
                    MultiOp::Mul => acc *= value,
                }
            }
            acc
        }
        FunctionExpression::StaticTerm(fterm) => {
            let fterm = Find::<FunctionTerm<Static>>::resolve(ctx, *fterm);
            match Find::<GroundFunctionTerm<Static>>::find(
                ctx,
                &GroundFunctionTerm {
                    function: fterm.function,
                    binding: substitute(&fterm.terms, binding),
                },
            ) {
                Some(index) => facts.static_value(index),
                None => f64::NAN,
            }
        }
        FunctionExpression::FluentTerm(fterm) => {
            let fterm = Find::<FunctionTerm<Fluent>>::resolve(ctx, *fterm);
            match Find::<GroundFunctionTerm<Fluent>>::find(
                ctx,
                &GroundFunctionTerm {
                    function: fterm.function,
                    binding: substitute(&fterm.terms, binding),
                },
            ) {
                Some(index) => facts.fluent_value(index),
                None => f64::NAN,
            }
        }
    }
}

fn constraint_holds<C: Context>(
    ctx: &C,
    constraint: Idx<NumericConstraint>,
    binding: &[Idx<Object>],
    facts: &FactsView,
) -> bool {
    let &NumericConstraint { comparator, lhs, rhs } = Find::<NumericConstraint>::resolve(ctx, constraint);
    let lhs = evaluate_lifted(ctx, lhs, binding, facts);
    let rhs = evaluate_lifted(ctx, rhs, binding, facts);
    if lhs.is_nan() || rhs.is_nan() {
        return false;
    }
    match comparator {
        vega_formalism::Comparator::Eq => lhs == rhs,
        vega_formalism::Comparator::Ne => lhs != rhs,
        vega_formalism::Comparator::Lt => lhs < rhs,
        vega_formalism::Comparator::Le => lhs <= rhs,
        vega_formalism::Comparator::Gt => lhs > rhs,
        vega_formalism::Comparator::Ge => lhs >= rhs,
    }
}

/// Exact verification of a complete binding against the current facts: every
/// literal of every kind must hold and every numeric constraint must be true.
pub fn verify_binding<C: Context>(
    ctx: &C,
    parts: &ConditionParts,
    facts: &FactsView,
    binding: &[Idx<Object>],
) -> bool {
    parts
        .static_literals
        .iter()
        .all(|&l| ground_literal_holds(ctx, l, binding, facts))
        && parts
            .fluent_literals
            .iter()
            .all(|&l| ground_literal_holds(ctx, l, binding, facts))
        && parts
            .derived_literals
            .iter()
            .all(|&l| ground_literal_holds(ctx, l, binding, facts))
        && parts
            .constraints
            .iter()
            .all(|&c| constraint_holds(ctx, c, binding, facts))
}

/// Computes all bindings of `info`'s parameters satisfying the body in the
/// current facts, into `ws.bindings` in canonical order.
///
/// The clique enumeration over the static consistency graph is pruned by the
/// fluent/derived assignment masks; every surviving clique is then verified
/// exactly, so the result is precisely the set of satisfying bindings.
pub fn collect_bindings<C: Context>(
    ctx: &C,
    info: &BodyInfo,
    facts: &FactsView,
    fluent_assignments: &AssignmentSets<Fluent>,
    derived_assignments: &AssignmentSets<Derived>,
    ws: &mut GroundingWorkspace,
) {
    ws.bindings.clear();
    ws.kpkc.prepare(&info.graph);

    // Mask vertices that no current fact can support.
    ws.partial.clear();
    ws.partial.resize(info.arity, None);
    for p in 0..info.graph.num_partitions() {
        for v in info.graph.vertex_range(p) {
            let o = info.graph.partitions[p][v - info.graph.offsets[p]];
            ws.partial[p] = Some(o);
            let viable = info
                .parts
                .fluent_literals
                .iter()
                .all(|&l| literal_consistent(ctx, l, &ws.partial, fluent_assignments, facts.fluent_atoms))
                && info
                    .parts
                    .derived_literals
                    .iter()
                    .all(|&l| literal_consistent(ctx, l, &ws.partial, derived_assignments, facts.derived_atoms));
            ws.partial[p] = None;
            if !viable {
                ws.kpkc.vertex_mask.set(v, false);
            }
        }
    }

    let bindings = &mut ws.bindings;
    let parts = &info.parts;
    enumerate_cliques(&info.graph, &mut ws.kpkc, &mut |clique| {
        if verify_binding(ctx, parts, facts, clique) {
            bindings.push(SmallVec::from_slice(clique));
        }
    });
}

/// Grounds a lifted atom under a binding, interning the ground atom.
pub fn ground_atom<C: Context + Find<Atom<K>> + GroundAtomsMut<K>, K: KindFacts>(
    ctx: &mut C,
    atom: Idx<Atom<K>>,
    binding: &[Idx<Object>],
) -> GroundAtomIdx<K> {
    let data = Find::<Atom<K>>::resolve(ctx, atom);
    let predicate = data.predicate;
    let terms = data.terms.clone();
    ctx.intern_ground_atom(GroundAtom {
        predicate,
        binding: substitute(&terms, binding),
    })
    .0
}

/// Grounds a lifted expression under a binding, interning the result.
pub fn ground_expression<C: Context>(
    ctx: &mut C,
    expr: Idx<FunctionExpression>,
    binding: &[Idx<Object>],
) -> Idx<GroundFunctionExpression> {
    let data = Find::<FunctionExpression>::resolve(ctx, expr).clone();
    let ground = match data {
        FunctionExpression::Number(value) => GroundFunctionExpression::Number(value),
        FunctionExpression::Minus(inner) => {
            GroundFunctionExpression::Minus(ground_expression(ctx, inner, binding))
        }
        FunctionExpression::Binary(op, lhs, rhs) => GroundFunctionExpression::Binary(
            op,
            ground_expression(ctx, lhs, binding),
            ground_expression(ctx, rhs, binding),
        ),
        FunctionExpression::Multi(op, args) => GroundFunctionExpression::Multi(
            op,
            args.into_iter().map(|arg| ground_expression(ctx, arg, binding)).collect(),
        ),
        FunctionExpression::StaticTerm(fterm) => {
            let data = Find::<FunctionTerm<Static>>::resolve(ctx, fterm).clone();
            GroundFunctionExpression::StaticTerm(
                ctx.get_or_create(GroundFunctionTerm {
                    function: data.function,
                    binding: substitute(&data.terms, binding),
                })
                .0,
            )
        }
        FunctionExpression::FluentTerm(fterm) => {
            let data = Find::<FunctionTerm<Fluent>>::resolve(ctx, fterm).clone();
            GroundFunctionExpression::FluentTerm(
                ctx.get_or_create(GroundFunctionTerm {
                    function: data.function,
                    binding: substitute(&data.terms, binding),
                })
                .0,
            )
        }
    };
    ctx.get_or_create(ground).0
}

fn ground_literals<C: Context + Find<Literal<K>> + Find<Atom<K>> + GroundAtomsMut<K> + Store<GroundLiteral<K>>, K: KindFacts>(
    ctx: &mut C,
    literals: &[Idx<Literal<K>>],
    binding: &[Idx<Object>],
    out: &mut Vec<Idx<GroundLiteral<K>>>,
) {
    for &literal in literals {
        let data = Find::<Literal<K>>::resolve(ctx, literal);
        let polarity = data.polarity;
        let atom = data.atom;
        let atom = ground_atom(ctx, atom, binding);
        out.push(ctx.get_or_create(GroundLiteral { polarity, atom }).0);
    }
}

/// Grounds a full condition, interning every part.
pub fn ground_condition<C: Context>(
    ctx: &mut C,
    parts: &ConditionParts,
    binding: &[Idx<Object>],
) -> Idx<GroundConjunctiveCondition> {
    let mut data = GroundConjunctiveCondition::default();
    ground_literals(ctx, &parts.static_literals, binding, &mut data.static_literals);
    ground_literals(ctx, &parts.fluent_literals, binding, &mut data.fluent_literals);
    ground_literals(ctx, &parts.derived_literals, binding, &mut data.derived_literals);
    for &constraint in &parts.constraints {
        let &NumericConstraint { comparator, lhs, rhs } = Find::<NumericConstraint>::resolve(ctx, constraint);
        let lhs = ground_expression(ctx, lhs, binding);
        let rhs = ground_expression(ctx, rhs, binding);
        data.constraints.push(
            ctx.get_or_create(GroundNumericConstraint {
                comparator,
                lhs,
                rhs,
            })
            .0,
        );
    }
    ctx.get_or_create(data).0
}

/// Grounds one rule instance: body and head under a verified binding.
pub fn ground_rule_instance<C: Context>(
    ctx: &mut C,
    rule: Idx<Rule>,
    info: &BodyInfo,
    binding: &[Idx<Object>],
) -> Idx<GroundRule> {
    let head = Find::<Rule>::resolve(ctx, rule).head;
    let body = ground_condition(ctx, &info.parts, binding);
    let head = ground_atom(ctx, head, binding);
    ctx.get_or_create(GroundRule { body, head }).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::AssignmentSets;
    use crate::facts::AtomFactSets;
    use smallvec::smallvec;
    use vega_formalism::{ContextExt, GroundConjunctiveCondition, Predicate, Repository, Symbols, Variable};

    struct Fixture {
        repo: Repository,
        objects: Vec<Idx<Object>>,
        rule: Idx<Rule>,
        static_facts: AtomFactSets<Static>,
        static_assignments: AssignmentSets<Static>,
        fluent_facts: AtomFactSets<Fluent>,
        fluent_assignments: AssignmentSets<Fluent>,
    }

    /// thing(a), thing(b); links a->b, b->c, a->c.
    /// Rule body: thing(X), link(X, Y), not link(Y, X).
    fn fixture() -> Fixture {
        let mut repo = Repository::new();
        let thing_sym = repo.intern_symbol("thing");
        let link_sym = repo.intern_symbol("link");
        let (thing, _) = repo.get_or_create(Predicate {
            name: thing_sym,
            arity: 1,
            kind: Static,
        });
        let (link, _) = repo.get_or_create(Predicate {
            name: link_sym,
            arity: 2,
            kind: Fluent,
        });
        let reaches_sym = repo.intern_symbol("reaches");
        let (reaches, _) = repo.get_or_create(Predicate {
            name: reaches_sym,
            arity: 2,
            kind: Fluent,
        });

        let objects: Vec<Idx<Object>> = ["a", "b", "c"]
            .iter()
            .map(|n| {
                let sym = repo.intern_symbol(n);
                repo.get_or_create(Object { name: sym }).0
            })
            .collect();

        let mut static_facts = AtomFactSets::new();
        for &o in &objects[..2] {
            let (idx, _) = repo.intern_ground_atom(GroundAtom {
                predicate: thing,
                binding: smallvec![o],
            });
            static_facts.insert(idx);
        }
        let mut static_assignments =
            AssignmentSets::new(&repo, repo.num::<Predicate<Static>>(), repo.num::<Object>());
        for idx in static_facts.iter() {
            let binding = repo.ground_atom(idx).binding.clone();
            static_assignments.insert(idx.predicate, &binding);
        }

        let mut fluent_facts = AtomFactSets::new();
        for (x, y) in [(0usize, 1usize), (1, 2), (0, 2)] {
            let (idx, _) = repo.intern_ground_atom(GroundAtom {
                predicate: link,
                binding: smallvec![objects[x], objects[y]],
            });
            fluent_facts.insert(idx);
        }
        let mut fluent_assignments =
            AssignmentSets::new(&repo, repo.num::<Predicate<Fluent>>(), repo.num::<Object>());
        for idx in fluent_facts.iter() {
            let binding = repo.ground_atom(idx).binding.clone();
            fluent_assignments.insert(idx.predicate, &binding);
        }

        let vars: Vec<Idx<Variable>> = ["?x", "?y"]
            .iter()
            .map(|n| {
                let sym = repo.intern_symbol(n);
                repo.get_or_create(Variable { name: sym }).0
            })
            .collect();

        let (thing_x, _) = repo.get_or_create(Atom {
            predicate: thing,
            terms: smallvec![Term::Parameter(0)],
        });
        let (link_xy, _) = repo.get_or_create(Atom {
            predicate: link,
            terms: smallvec![Term::Parameter(0), Term::Parameter(1)],
        });
        let (link_yx, _) = repo.get_or_create(Atom {
            predicate: link,
            terms: smallvec![Term::Parameter(1), Term::Parameter(0)],
        });
        let (pos_thing, _) = repo.get_or_create(Literal {
            polarity: true,
            atom: thing_x,
        });
        let (pos_link, _) = repo.get_or_create(Literal {
            polarity: true,
            atom: link_xy,
        });
        let (neg_link, _) = repo.get_or_create(Literal {
            polarity: false,
            atom: link_yx,
        });
        let (body, _) = repo.get_or_create(ConjunctiveCondition {
            variables: vars,
            static_literals: vec![pos_thing],
            fluent_literals: vec![pos_link, neg_link],
            ..Default::default()
        });
        let (head, _) = repo.get_or_create(Atom {
            predicate: reaches,
            terms: smallvec![Term::Parameter(0), Term::Parameter(1)],
        });
        let (rule, _) = repo.get_or_create(Rule { body, head });

        Fixture {
            repo,
            objects,
            rule,
            static_facts,
            static_assignments,
            fluent_facts,
            fluent_assignments,
        }
    }

    #[test]
    fn collected_bindings_equal_brute_force() {
        let mut f = fixture();
        let body = Find::<Rule>::resolve(&f.repo, f.rule).body;
        let info = BodyInfo::new(&f.repo, body, &f.objects, &f.static_assignments, &f.static_facts);

        let derived_facts: AtomFactSets<Derived> = AtomFactSets::new();
        let derived_assignments: AssignmentSets<Derived> =
            AssignmentSets::new(&f.repo, 0, f.repo.num::<Object>());
        let facts = FactsView {
            static_atoms: &f.static_facts,
            fluent_atoms: &f.fluent_facts,
            derived_atoms: &derived_facts,
            static_values: &[],
            fluent_values: &[],
        };

        let mut ws = GroundingWorkspace::new();
        collect_bindings(
            &f.repo,
            &info,
            &facts,
            &f.fluent_assignments,
            &derived_assignments,
            &mut ws,
        );

        // Every pair of objects, checked by exact verification alone.
        let mut expected = Vec::new();
        for &x in &f.objects {
            for &y in &f.objects {
                let candidate = [x, y];
                if verify_binding(&f.repo, &info.parts, &facts, &candidate) {
                    expected.push(Binding::from_slice(&candidate));
                }
            }
        }
        assert_eq!(ws.bindings, expected);
        // thing(a) & link(a,b) & not link(b,a); same for (a,c) and (b,c).
        assert_eq!(ws.bindings.len(), 3);

        // Ground rule instances intern a body and head per binding.
        let bindings = ws.bindings.clone();
        for binding in &bindings {
            let instance = ground_rule_instance(&mut f.repo, f.rule, &info, binding);
            let data = Find::<GroundRule>::resolve(&f.repo, instance).clone();
            let body = Find::<GroundConjunctiveCondition>::resolve(&f.repo, data.body);
            assert_eq!(body.static_literals.len(), 1);
            assert_eq!(body.fluent_literals.len(), 2);
            assert_eq!(f.repo.ground_atom(data.head).binding.len(), 2);
        }
        assert_eq!(f.repo.num::<GroundRule>(), 3);
    }
}
