use crate::entities::*;
use crate::kinds::{Auxiliary, Derived, FactKind, Fluent, Static};
use crate::store::{Find, GroundAtoms, GroundAtomsMut, Store, Symbols};
use crate::symbols::{StringInterner, Sym};
use vega_collections::{Idx, IndexedHashSet};

/// Grouped interning store for ground atoms: one deduplicating set per
/// predicate, so a ground atom's index is the pair (predicate, dense value).
#[derive(Debug, PartialEq)]
pub struct GroundAtomStore<K: FactKind> {
    groups: Vec<IndexedHashSet<GroundAtom<K>>>,
}

impl<K: FactKind> Default for GroundAtomStore<K> {
    fn default() -> Self {
        GroundAtomStore { groups: Vec::new() }
    }
}

impl<K: FactKind> GroundAtomStore<K> {
    pub fn find(&self, data: &GroundAtom<K>) -> Option<GroundAtomIdx<K>> {
        let group = self.groups.get(usize::from(data.predicate))?;
        group.find(data).map(|value| GroundAtomIdx {
            predicate: data.predicate,
            value: u32::from(value),
        })
    }

    pub fn insert(&mut self, data: GroundAtom<K>) -> (GroundAtomIdx<K>, bool) {
        let predicate = data.predicate;
        let slot = usize::from(predicate);
        while self.groups.len() <= slot {
            self.groups.push(IndexedHashSet::new());
        }
        let (value, inserted) = self.groups[slot].insert(data);
        (
            GroundAtomIdx {
                predicate,
                value: u32::from(value),
            },
            inserted,
        )
    }

    pub fn get(&self, index: GroundAtomIdx<K>) -> &GroundAtom<K> {
        self.groups[usize::from(index.predicate)].get(Idx::new(index.value))
    }

    pub fn group_len(&self, predicate: Idx<Predicate<K>>) -> usize {
        self.groups.get(usize::from(predicate)).map_or(0, |g| g.len())
    }

    pub fn total_len(&self) -> usize {
        self.groups.iter().map(|g| g.len()).sum()
    }
}

/// The interned object graph of a planning domain/problem.
///
/// One deduplicating store per entity kind; indices are dense per store and
/// stable for the repository's lifetime. Construction happens through the
/// [`Store`] trait so code can be generic over a bare repository or an
/// [`crate::Overlay`] chain.
#[derive(Default, Debug, PartialEq)]
pub struct Repository {
    symbols: StringInterner,

    objects: IndexedHashSet<Object>,
    variables: IndexedHashSet<Variable>,

    static_predicates: IndexedHashSet<Predicate<Static>>,
    fluent_predicates: IndexedHashSet<Predicate<Fluent>>,
    derived_predicates: IndexedHashSet<Predicate<Derived>>,

    static_atoms: IndexedHashSet<Atom<Static>>,
    fluent_atoms: IndexedHashSet<Atom<Fluent>>,
    derived_atoms: IndexedHashSet<Atom<Derived>>,

    static_literals: IndexedHashSet<Literal<Static>>,
    fluent_literals: IndexedHashSet<Literal<Fluent>>,
    derived_literals: IndexedHashSet<Literal<Derived>>,

    static_ground_atoms: GroundAtomStore<Static>,
    fluent_ground_atoms: GroundAtomStore<Fluent>,
    derived_ground_atoms: GroundAtomStore<Derived>,

    static_ground_literals: IndexedHashSet<GroundLiteral<Static>>,
    fluent_ground_literals: IndexedHashSet<GroundLiteral<Fluent>>,
    derived_ground_literals: IndexedHashSet<GroundLiteral<Derived>>,

    static_functions: IndexedHashSet<Function<Static>>,
    fluent_functions: IndexedHashSet<Function<Fluent>>,
    auxiliary_functions: IndexedHashSet<Function<Auxiliary>>,

    static_fterms: IndexedHashSet<FunctionTerm<Static>>,
    fluent_fterms: IndexedHashSet<FunctionTerm<Fluent>>,
    auxiliary_fterms: IndexedHashSet<FunctionTerm<Auxiliary>>,

    static_ground_fterms: IndexedHashSet<GroundFunctionTerm<Static>>,
    fluent_ground_fterms: IndexedHashSet<GroundFunctionTerm<Fluent>>,
    auxiliary_ground_fterms: IndexedHashSet<GroundFunctionTerm<Auxiliary>>,

    static_fterm_values: IndexedHashSet<GroundFunctionTermValue<Static>>,
    fluent_fterm_values: IndexedHashSet<GroundFunctionTermValue<Fluent>>,
    auxiliary_fterm_values: IndexedHashSet<GroundFunctionTermValue<Auxiliary>>,

    fexprs: IndexedHashSet<FunctionExpression>,
    ground_fexprs: IndexedHashSet<GroundFunctionExpression>,
    constraints: IndexedHashSet<NumericConstraint>,
    ground_constraints: IndexedHashSet<GroundNumericConstraint>,

    conditions: IndexedHashSet<ConjunctiveCondition>,
    ground_conditions: IndexedHashSet<GroundConjunctiveCondition>,

    rules: IndexedHashSet<Rule>,
    ground_rules: IndexedHashSet<GroundRule>,

    cond_effects: IndexedHashSet<ConditionalEffect>,
    ground_cond_effects: IndexedHashSet<GroundConditionalEffect>,

    actions: IndexedHashSet<Action>,
    ground_actions: IndexedHashSet<GroundAction>,

    axioms: IndexedHashSet<Axiom>,

    programs: IndexedHashSet<Program>,
    domains: IndexedHashSet<Domain>,
    tasks: IndexedHashSet<Task>,
}

impl Repository {
    pub fn new() -> Self {
        Default::default()
    }
}

macro_rules! impl_flat_store {
    ($($field:ident : $t:ty),* $(,)?) => {
        $(
            impl Find<$t> for Repository {
                fn find(&self, data: &$t) -> Option<Idx<$t>> {
                    self.$field.find(data)
                }

                fn count(&self) -> usize {
                    self.$field.len()
                }

                fn resolve(&self, index: Idx<$t>) -> &$t {
                    self.$field.get(index)
                }
            }

            impl Store<$t> for Repository {
                fn get_or_create(&mut self, mut data: $t) -> (Idx<$t>, bool) {
                    data.canonicalize();
                    self.$field.insert(data)
                }
            }
        )*
    };
}

impl_flat_store!(
    objects: Object,
    variables: Variable,
    static_predicates: Predicate<Static>,
    fluent_predicates: Predicate<Fluent>,
    derived_predicates: Predicate<Derived>,
    static_atoms: Atom<Static>,
    fluent_atoms: Atom<Fluent>,
    derived_atoms: Atom<Derived>,
    static_literals: Literal<Static>,
    fluent_literals: Literal<Fluent>,
    derived_literals: Literal<Derived>,
    static_ground_literals: GroundLiteral<Static>,
    fluent_ground_literals: GroundLiteral<Fluent>,
    derived_ground_literals: GroundLiteral<Derived>,
    static_functions: Function<Static>,
    fluent_functions: Function<Fluent>,
    auxiliary_functions: Function<Auxiliary>,
    static_fterms: FunctionTerm<Static>,
    fluent_fterms: FunctionTerm<Fluent>,
    auxiliary_fterms: FunctionTerm<Auxiliary>,
    static_ground_fterms: GroundFunctionTerm<Static>,
    fluent_ground_fterms: GroundFunctionTerm<Fluent>,
    auxiliary_ground_fterms: GroundFunctionTerm<Auxiliary>,
    static_fterm_values: GroundFunctionTermValue<Static>,
    fluent_fterm_values: GroundFunctionTermValue<Fluent>,
    auxiliary_fterm_values: GroundFunctionTermValue<Auxiliary>,
    fexprs: FunctionExpression,
    ground_fexprs: GroundFunctionExpression,
    constraints: NumericConstraint,
    ground_constraints: GroundNumericConstraint,
    conditions: ConjunctiveCondition,
    ground_conditions: GroundConjunctiveCondition,
    rules: Rule,
    ground_rules: GroundRule,
    cond_effects: ConditionalEffect,
    ground_cond_effects: GroundConditionalEffect,
    actions: Action,
    ground_actions: GroundAction,
    axioms: Axiom,
    programs: Program,
    domains: Domain,
    tasks: Task,
);

macro_rules! impl_ground_atoms {
    ($($field:ident : $k:ty),* $(,)?) => {
        $(
            impl GroundAtoms<$k> for Repository {
                fn find_ground_atom(&self, data: &GroundAtom<$k>) -> Option<GroundAtomIdx<$k>> {
                    self.$field.find(data)
                }

                fn ground_atom(&self, index: GroundAtomIdx<$k>) -> &GroundAtom<$k> {
                    self.$field.get(index)
                }

                fn num_ground_atoms(&self, predicate: Idx<Predicate<$k>>) -> usize {
                    self.$field.group_len(predicate)
                }
            }

            impl GroundAtomsMut<$k> for Repository {
                fn intern_ground_atom(&mut self, data: GroundAtom<$k>) -> (GroundAtomIdx<$k>, bool) {
                    self.$field.insert(data)
                }
            }
        )*
    };
}

impl_ground_atoms!(
    static_ground_atoms: Static,
    fluent_ground_atoms: Fluent,
    derived_ground_atoms: Derived,
);

impl Symbols for Repository {
    fn find_symbol(&self, name: &str) -> Option<Sym> {
        self.symbols.find(name)
    }

    fn intern_symbol(&mut self, name: &str) -> Sym {
        self.symbols.intern(name)
    }

    fn symbol(&self, sym: Sym) -> &str {
        self.symbols.resolve(sym)
    }

    fn num_symbols(&self) -> usize {
        self.symbols.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ContextExt;
    use smallvec::smallvec;

    #[test]
    fn interning_is_idempotent() {
        let mut repo = Repository::new();
        let name = repo.intern_symbol("ball");
        let (p1, inserted1) = repo.get_or_create(Predicate {
            name,
            arity: 1,
            kind: Static,
        });
        let (p2, inserted2) = repo.get_or_create(Predicate {
            name,
            arity: 1,
            kind: Static,
        });
        assert!(inserted1);
        assert!(!inserted2);
        assert_eq!(p1, p2);
        assert_eq!(repo.num::<Predicate<Static>>(), 1);
    }

    #[test]
    fn canonical_equality_of_conditions() {
        let mut repo = Repository::new();
        let name = repo.intern_symbol("p");
        let (pred, _) = repo.get_or_create(Predicate {
            name,
            arity: 1,
            kind: Fluent,
        });
        let mut literals = Vec::new();
        for i in 0..3u32 {
            let (atom, _) = repo.get_or_create(Atom {
                predicate: pred,
                terms: smallvec![Term::Parameter(i)],
            });
            let (lit, _) = repo.get_or_create(Literal {
                polarity: true,
                atom,
            });
            literals.push(lit);
        }

        let forward = ConjunctiveCondition {
            fluent_literals: literals.clone(),
            ..Default::default()
        };
        let mut backward = literals.clone();
        backward.reverse();
        let reversed = ConjunctiveCondition {
            fluent_literals: backward,
            ..Default::default()
        };

        let (a, _) = repo.get_or_create(forward);
        let (b, inserted) = repo.get_or_create(reversed);
        assert_eq!(a, b);
        assert!(!inserted);
    }

    #[test]
    fn ground_atoms_are_group_indexed() {
        let mut repo = Repository::new();
        let p_name = repo.intern_symbol("at");
        let q_name = repo.intern_symbol("free");
        let (p, _) = repo.get_or_create(Predicate {
            name: p_name,
            arity: 1,
            kind: Fluent,
        });
        let (q, _) = repo.get_or_create(Predicate {
            name: q_name,
            arity: 1,
            kind: Fluent,
        });
        let o_name = repo.intern_symbol("ball1");
        let (o, _) = repo.get_or_create(Object { name: o_name });

        let (pa, _) = repo.intern_ground_atom(GroundAtom {
            predicate: p,
            binding: smallvec![o],
        });
        let (qa, _) = repo.intern_ground_atom(GroundAtom {
            predicate: q,
            binding: smallvec![o],
        });

        // Values are dense per predicate, not globally; ordering is
        // lexicographic with the predicate group first.
        assert_eq!(pa.value, 0);
        assert_eq!(qa.value, 0);
        assert_ne!(pa, qa);
        assert_eq!(repo.num_ground_atoms(p), 1);
        assert_eq!(pa < qa, pa.predicate < qa.predicate);
    }
}
