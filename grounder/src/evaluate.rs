use crate::assignment::AssignmentSets;
use crate::facts::{set_numeric_value, AtomFactSets, FactsView};
use crate::ground::{collect_bindings, ground_atom, BodyInfo, GroundingWorkspace};
use crate::stratify::stratify;
use tracing::trace;
use vega_collections::Idx;
use vega_formalism::{
    Atom, ConstructionError, Context, ContextExt, Derived, Find, Fluent, GroundAtomIdx, GroundAtoms,
    GroundFunctionTermValue, Object, Predicate, Program, Rule, Static,
};

/// Immutable evaluation context of one program: rule order, strata, the
/// per-rule consistency graphs and the program's static facts. Built once;
/// any number of workspaces (one per worker) can evaluate against it.
pub struct ProgramContext {
    pub program: Idx<Program>,
    pub rules: Vec<RuleInfo>,
    /// Rule positions grouped by stratum, ascending.
    pub strata: Vec<Vec<usize>>,
    pub objects: Vec<Idx<Object>>,
    pub static_facts: AtomFactSets<Static>,
    pub static_values: Vec<f64>,
}

pub struct RuleInfo {
    pub rule: Idx<Rule>,
    pub head: Idx<Atom<Fluent>>,
    pub body: BodyInfo,
}

impl ProgramContext {
    pub fn new<C: Context>(ctx: &C, program: Idx<Program>) -> Result<Self, ConstructionError> {
        let data = Find::<Program>::resolve(ctx, program).clone();

        let mut static_facts = AtomFactSets::new();
        let mut static_assignments =
            AssignmentSets::new(ctx, ctx.num::<Predicate<Static>>(), ctx.num::<Object>());
        for &atom in &data.static_atoms {
            static_facts.insert(atom);
            let binding = ctx.ground_atom(atom).binding.clone();
            static_assignments.insert(atom.predicate, &binding);
        }

        let mut static_values = Vec::new();
        for &value in &data.static_fterm_values {
            let value = Find::<GroundFunctionTermValue<Static>>::resolve(ctx, value);
            set_numeric_value(&mut static_values, usize::from(value.fterm), value.value.get());
        }

        let strata = stratify(ctx, &data.rules)?;

        let mut rules = Vec::with_capacity(data.rules.len());
        for &rule in &data.rules {
            let resolved = Find::<Rule>::resolve(ctx, rule);
            let head = resolved.head;
            let body = resolved.body;
            rules.push(RuleInfo {
                rule,
                head,
                body: BodyInfo::new(ctx, body, &data.objects, &static_assignments, &static_facts),
            });
        }

        Ok(ProgramContext {
            program,
            rules,
            strata,
            objects: data.objects,
            static_facts,
            static_values,
        })
    }
}

/// Mutable evaluation state: the current fluent facts with their assignment
/// masks, the numeric variables, and grounding scratch. Reset at every use;
/// workers own one each when rule grounding is parallelised.
pub struct ProgramWorkspace {
    pub fluent_facts: AtomFactSets<Fluent>,
    pub fluent_values: Vec<f64>,
    pub fluent_assignments: AssignmentSets<Fluent>,
    // Programs carry no derived facts; these stay empty and exist so the
    // grounder can take one facts view for both programs and states.
    derived_facts: AtomFactSets<Derived>,
    derived_assignments: AssignmentSets<Derived>,
    pub grounding: GroundingWorkspace,
    pending: Vec<GroundAtomIdx<Fluent>>,
}

impl ProgramWorkspace {
    pub fn new<C: Context>(ctx: &C) -> Self {
        ProgramWorkspace {
            fluent_facts: AtomFactSets::new(),
            fluent_values: Vec::new(),
            fluent_assignments: AssignmentSets::new(
                ctx,
                ctx.num::<Predicate<Fluent>>(),
                ctx.num::<Object>(),
            ),
            derived_facts: AtomFactSets::new(),
            derived_assignments: AssignmentSets::new(ctx, 0, ctx.num::<Object>()),
            grounding: GroundingWorkspace::new(),
            pending: Vec::new(),
        }
    }

    /// Clears all facts; the assignment capacity is retained.
    pub fn reset(&mut self) {
        self.fluent_facts.clear();
        self.fluent_values.clear();
        self.fluent_assignments.reset();
        self.pending.clear();
    }

    /// Adds one fluent fact, keeping the assignment masks in sync. Returns
    /// whether the fact was new.
    pub fn insert_fact<C: Context>(&mut self, ctx: &C, fact: GroundAtomIdx<Fluent>) -> bool {
        if !self.fluent_facts.insert(fact) {
            return false;
        }
        let binding = ctx.ground_atom(fact).binding.clone();
        self.fluent_assignments.insert(fact.predicate, &binding);
        true
    }

    pub fn insert_value(&mut self, fterm: usize, value: f64) {
        set_numeric_value(&mut self.fluent_values, fterm, value);
    }
}

/// Runs the program to its stratified fixpoint.
///
/// Strata are evaluated in ascending order; within a stratum, rules are
/// re-ground against the growing fact set until an iteration derives nothing
/// new. Newly derived heads are committed after each sweep over the stratum's
/// rules, so one iteration sees a consistent snapshot. At the fixpoint of a
/// stratum every negated predicate of higher strata is stable, which is what
/// makes negation-as-failure sound here.
pub fn solve_bottom_up<C: Context>(ctx: &mut C, pctx: &ProgramContext, ws: &mut ProgramWorkspace) {
    for (level, stratum) in pctx.strata.iter().enumerate() {
        loop {
            for &position in stratum {
                let info = &pctx.rules[position];
                let facts = FactsView {
                    static_atoms: &pctx.static_facts,
                    fluent_atoms: &ws.fluent_facts,
                    derived_atoms: &ws.derived_facts,
                    static_values: &pctx.static_values,
                    fluent_values: &ws.fluent_values,
                };
                collect_bindings(
                    ctx,
                    &info.body,
                    &facts,
                    &ws.fluent_assignments,
                    &ws.derived_assignments,
                    &mut ws.grounding,
                );
                let head = info.head;
                let bindings = std::mem::take(&mut ws.grounding.bindings);
                for binding in &bindings {
                    let fact = ground_atom(ctx, head, binding);
                    if !ws.fluent_facts.contains(fact) {
                        ws.pending.push(fact);
                    }
                }
                ws.grounding.bindings = bindings;
            }

            let mut changed = false;
            let pending = std::mem::take(&mut ws.pending);
            for fact in pending {
                if ws.insert_fact(ctx, fact) {
                    changed = true;
                }
            }
            if !changed {
                break;
            }
            trace!(stratum = level, facts = ws.fluent_facts.len(), "fixpoint iteration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;
    use vega_formalism::{
        ConjunctiveCondition, GroundAtom, GroundAtomsMut, Literal, Object, Store, Symbols, Term, Variable,
    };
    use vega_formalism::Repository;

    /// path(X, Y) <- edge(X, Y).
    /// path(X, Z) <- edge(X, Y), path(Y, Z).   (transitive closure)
    fn closure_program(repo: &mut Repository) -> (Idx<Program>, Vec<Idx<Object>>) {
        let edge_sym = repo.intern_symbol("edge");
        let path_sym = repo.intern_symbol("path");
        let (edge, _) = repo.get_or_create(Predicate {
            name: edge_sym,
            arity: 2,
            kind: Fluent,
        });
        let (path, _) = repo.get_or_create(Predicate {
            name: path_sym,
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

        let vars: Vec<Idx<Variable>> = ["?x", "?y", "?z"]
            .iter()
            .map(|n| {
                let sym = repo.intern_symbol(n);
                repo.get_or_create(Variable { name: sym }).0
            })
            .collect();

        let atom = |repo: &mut Repository, p, a: u32, b: u32| {
            repo.get_or_create(Atom {
                predicate: p,
                terms: smallvec![Term::Parameter(a), Term::Parameter(b)],
            })
            .0
        };
        let positive = |repo: &mut Repository, atom| {
            repo.get_or_create(Literal {
                polarity: true,
                atom,
            })
            .0
        };

        // path(X, Y) <- edge(X, Y).
        let edge_xy = atom(repo, edge, 0, 1);
        let body1 = ConjunctiveCondition {
            variables: vars[..2].to_vec(),
            fluent_literals: vec![positive(repo, edge_xy)],
            ..Default::default()
        };
        let (body1, _) = repo.get_or_create(body1);
        let head1 = atom(repo, path, 0, 1);
        let (rule1, _) = repo.get_or_create(Rule { body: body1, head: head1 });

        // path(X, Z) <- edge(X, Y), path(Y, Z).
        let edge_xy2 = atom(repo, edge, 0, 1);
        let path_yz = atom(repo, path, 1, 2);
        let body2 = ConjunctiveCondition {
            variables: vars.clone(),
            fluent_literals: vec![positive(repo, edge_xy2), positive(repo, path_yz)],
            ..Default::default()
        };
        let (body2, _) = repo.get_or_create(body2);
        let head2 = atom(repo, path, 0, 2);
        let (rule2, _) = repo.get_or_create(Rule { body: body2, head: head2 });

        let (program, _) = repo.get_or_create(Program {
            objects: objects.clone(),
            fluent_predicates: vec![edge, path],
            rules: vec![rule1, rule2],
            ..Default::default()
        });
        (program, objects)
    }

    #[test]
    fn transitive_closure_reaches_fixpoint() {
        let mut repo = Repository::new();
        let (program, objects) = closure_program(&mut repo);
        let pctx = ProgramContext::new(&repo, program).unwrap();
        let mut ws = ProgramWorkspace::new(&repo);

        // edge(a, b), edge(b, c).
        let edge = Find::<Program>::resolve(&repo, program).fluent_predicates[0];
        let path = Find::<Program>::resolve(&repo, program).fluent_predicates[1];
        for (x, y) in [(0, 1), (1, 2)] {
            let (fact, _) = repo.intern_ground_atom(GroundAtom {
                predicate: edge,
                binding: smallvec![objects[x], objects[y]],
            });
            ws.insert_fact(&repo, fact);
        }

        solve_bottom_up(&mut repo, &pctx, &mut ws);

        let paths: Vec<_> = ws.fluent_facts.facts_of(path).collect();
        assert_eq!(paths.len(), 3); // a-b, b-c, a-c

        // Idempotence: running again from the fixpoint adds nothing.
        let before = ws.fluent_facts.len();
        solve_bottom_up(&mut repo, &pctx, &mut ws);
        assert_eq!(ws.fluent_facts.len(), before);
    }

    #[test]
    fn negation_is_stratified() {
        let mut repo = Repository::new();

        let p_sym = repo.intern_symbol("covered");
        let q_sym = repo.intern_symbol("bare");
        let (covered, _) = repo.get_or_create(Predicate {
            name: p_sym,
            arity: 1,
            kind: Fluent,
        });
        let (bare, _) = repo.get_or_create(Predicate {
            name: q_sym,
            arity: 1,
            kind: Fluent,
        });

        let objects: Vec<Idx<Object>> = ["a", "b"]
            .iter()
            .map(|n| {
                let sym = repo.intern_symbol(n);
                repo.get_or_create(Object { name: sym }).0
            })
            .collect();
        let var = repo.intern_symbol("?x");
        let (v, _) = repo.get_or_create(Variable { name: var });

        // bare(X) <- not covered(X).
        let (cov_atom, _) = repo.get_or_create(Atom {
            predicate: covered,
            terms: smallvec![Term::Parameter(0)],
        });
        let (neg, _) = repo.get_or_create(Literal {
            polarity: false,
            atom: cov_atom,
        });
        let (body, _) = repo.get_or_create(ConjunctiveCondition {
            variables: vec![v],
            fluent_literals: vec![neg],
            ..Default::default()
        });
        let (head, _) = repo.get_or_create(Atom {
            predicate: bare,
            terms: smallvec![Term::Parameter(0)],
        });
        let (rule, _) = repo.get_or_create(Rule { body, head });

        let (program, _) = repo.get_or_create(Program {
            objects: objects.clone(),
            fluent_predicates: vec![covered, bare],
            rules: vec![rule],
            ..Default::default()
        });

        let pctx = ProgramContext::new(&repo, program).unwrap();
        let mut ws = ProgramWorkspace::new(&repo);

        let (fact, _) = repo.intern_ground_atom(GroundAtom {
            predicate: covered,
            binding: smallvec![objects[0]],
        });
        ws.insert_fact(&repo, fact);

        solve_bottom_up(&mut repo, &pctx, &mut ws);

        let bare_facts: Vec<_> = ws.fluent_facts.facts_of(bare).collect();
        assert_eq!(bare_facts.len(), 1);
        assert_eq!(repo.ground_atom(bare_facts[0]).binding[0], objects[1]);
    }
}
