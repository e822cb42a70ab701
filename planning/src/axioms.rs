use crate::state::UnpackedState;
use hashbrown::HashMap;
use vega_collections::Idx;
use vega_formalism::{
    Atom, Axiom, ConjunctiveCondition, ConstructionError, Context, Derived, Domain, Find, Fluent,
    GroundAtom, GroundAtoms, GroundAtomsMut, Literal, Predicate, Program, Rule, Store, Task,
};
use vega_grounder::{solve_bottom_up, ProgramContext, ProgramWorkspace};

/// The task's axioms compiled into a rule program.
///
/// Rule heads are fluent at the program level, so every derived predicate is
/// mapped onto a fresh fluent predicate of the same name and arity; the maps
/// translate facts across the boundary in both directions.
pub struct AxiomProgram {
    pub context: ProgramContext,
    pub derived_to_program: HashMap<Idx<Predicate<Derived>>, Idx<Predicate<Fluent>>>,
    pub program_to_derived: HashMap<Idx<Predicate<Fluent>>, Idx<Predicate<Derived>>>,
}

fn map_atom<C: Context>(
    ctx: &mut C,
    atom: Idx<Atom<Derived>>,
    mapping: &HashMap<Idx<Predicate<Derived>>, Idx<Predicate<Fluent>>>,
) -> Idx<Atom<Fluent>> {
    let data = Find::<Atom<Derived>>::resolve(ctx, atom).clone();
    ctx.get_or_create(Atom {
        predicate: mapping[&data.predicate],
        terms: data.terms,
    })
    .0
}

/// Compiles the domain's axioms into a [`ProgramContext`], or `None` when
/// there are no axioms. Fails when the axiom set cannot be stratified.
pub fn compile_axioms<C: Context>(
    ctx: &mut C,
    domain: &Domain,
    task: &Task,
) -> Result<Option<AxiomProgram>, ConstructionError> {
    if domain.axioms.is_empty() {
        return Ok(None);
    }

    let mut derived_to_program = HashMap::new();
    let mut program_to_derived = HashMap::new();
    let mut mapped_predicates = Vec::with_capacity(domain.derived_predicates.len());
    for &derived in &domain.derived_predicates {
        let data = Find::<Predicate<Derived>>::resolve(ctx, derived).clone();
        let mapped = ctx
            .get_or_create(Predicate {
                name: data.name,
                arity: data.arity,
                kind: Fluent,
            })
            .0;
        derived_to_program.insert(derived, mapped);
        program_to_derived.insert(mapped, derived);
        mapped_predicates.push(mapped);
    }

    let mut rules = Vec::with_capacity(domain.axioms.len());
    for &axiom in &domain.axioms {
        let data = Find::<Axiom>::resolve(ctx, axiom).clone();
        let body = Find::<ConjunctiveCondition>::resolve(ctx, data.body).clone();

        // Derived literals of the body become fluent literals over the
        // mapped predicates; everything else carries over unchanged.
        let mut compiled = ConjunctiveCondition {
            variables: body.variables,
            static_literals: body.static_literals,
            fluent_literals: body.fluent_literals,
            derived_literals: Vec::new(),
            constraints: body.constraints,
        };
        for &literal in &body.derived_literals {
            let literal = Find::<Literal<Derived>>::resolve(ctx, literal).clone();
            let atom = map_atom(ctx, literal.atom, &derived_to_program);
            compiled.fluent_literals.push(
                ctx.get_or_create(Literal {
                    polarity: literal.polarity,
                    atom,
                })
                .0,
            );
        }
        let body = ctx.get_or_create(compiled).0;
        let head = map_atom(ctx, data.head, &derived_to_program);
        rules.push(ctx.get_or_create(Rule { body, head }).0);
    }

    let mut fluent_predicates = domain.fluent_predicates.clone();
    fluent_predicates.extend(mapped_predicates);

    let program = ctx
        .get_or_create(Program {
            objects: task.objects.clone(),
            static_predicates: domain.static_predicates.clone(),
            fluent_predicates,
            static_atoms: task.static_atoms.clone(),
            static_fterm_values: task.static_fterm_values.clone(),
            fluent_functions: domain.fluent_functions.clone(),
            rules,
        })
        .0;

    let context = ProgramContext::new(ctx, program)?;
    Ok(Some(AxiomProgram {
        context,
        derived_to_program,
        program_to_derived,
    }))
}

/// Closes states under the derived-predicate rules.
///
/// Owns one [`ProgramWorkspace`]; safe to reuse across states because the
/// fact scratch is reset on entry.
pub struct AxiomEvaluator {
    workspace: ProgramWorkspace,
}

impl AxiomEvaluator {
    pub fn new<C: Context>(ctx: &C) -> Self {
        AxiomEvaluator {
            workspace: ProgramWorkspace::new(ctx),
        }
    }

    /// Recomputes `state`'s derived atoms from its fluent part.
    pub fn extend<C: Context>(&mut self, ctx: &mut C, program: &AxiomProgram, state: &mut UnpackedState) {
        self.workspace.reset();

        for fact in state.fluent_atoms.iter() {
            self.workspace.insert_fact(ctx, fact);
        }
        for (fterm, &value) in state.numeric.iter().enumerate() {
            if !value.is_nan() {
                self.workspace.insert_value(fterm, value);
            }
        }

        solve_bottom_up(ctx, &program.context, &mut self.workspace);

        state.derived_atoms.clear();
        for (&mapped, &derived) in &program.program_to_derived {
            let facts: Vec<_> = self.workspace.fluent_facts.facts_of(mapped).collect();
            for fact in facts {
                let binding = ctx.ground_atom(fact).binding.clone();
                let (index, _) = ctx.intern_ground_atom(GroundAtom {
                    predicate: derived,
                    binding,
                });
                state.derived_atoms.insert(index);
            }
        }
    }
}
