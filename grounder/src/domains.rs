use crate::assignment::AssignmentSets;
use smallvec::SmallVec;
use vega_collections::Idx;
use vega_formalism::{ConjunctiveCondition, Context, Find, Object, Static, Term};

/// Conservative per-parameter object domains for a condition.
///
/// Starting from all task objects, a parameter keeps an object only if every
/// positive static literal mentioning the parameter can still be matched with
/// the object at that position (typed parameters are unary static predicates,
/// so this is where typing bites). The result feeds the consistency graph's
/// vertex sets.
pub fn parameter_domains<C: Context>(
    ctx: &C,
    condition: &ConjunctiveCondition,
    objects: &[Idx<Object>],
    static_assignments: &AssignmentSets<Static>,
) -> Vec<Vec<Idx<Object>>> {
    let arity = condition.variables.len();

    // (parameter, predicate, position) triples from the positive static body.
    let mut occurrences: Vec<SmallVec<[(Idx<vega_formalism::Predicate<Static>>, u32); 4]>> =
        vec![SmallVec::new(); arity];
    for &literal in &condition.static_literals {
        let literal = Find::<vega_formalism::Literal<Static>>::resolve(ctx, literal);
        if !literal.polarity {
            continue;
        }
        let atom = Find::<vega_formalism::Atom<Static>>::resolve(ctx, literal.atom);
        for (position, &term) in atom.terms.iter().enumerate() {
            if let Term::Parameter(p) = term {
                occurrences[p as usize].push((atom.predicate, position as u32));
            }
        }
    }

    (0..arity)
        .map(|p| {
            objects
                .iter()
                .copied()
                .filter(|&o| {
                    occurrences[p]
                        .iter()
                        .all(|&(predicate, position)| {
                            static_assignments.get(predicate).possible_single(position, o)
                        })
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::AssignmentSets;
    use crate::facts::AtomFactSets;
    use smallvec::smallvec;
    use vega_formalism::{
        Atom, ContextExt, GroundAtom, GroundAtoms, GroundAtomsMut, Literal, Predicate, Repository, Store, Symbols,
    };

    #[test]
    fn unary_static_literals_type_the_parameters() {
        let mut repo = Repository::new();
        let room_sym = repo.intern_symbol("room");
        let (room, _) = repo.get_or_create(Predicate {
            name: room_sym,
            arity: 1,
            kind: Static,
        });

        let names: Vec<_> = ["a", "b", "ball1"].iter().map(|n| repo.intern_symbol(n)).collect();
        let objects: Vec<Idx<Object>> = names
            .into_iter()
            .map(|name| repo.get_or_create(Object { name }).0)
            .collect();

        // room(a), room(b); ball1 is no room.
        let mut static_facts = AtomFactSets::new();
        for &o in &objects[..2] {
            let (idx, _) = repo.intern_ground_atom(GroundAtom {
                predicate: room,
                binding: smallvec![o],
            });
            static_facts.insert(idx);
        }
        let mut assignments =
            AssignmentSets::new(&repo, repo.num::<Predicate<Static>>(), repo.num::<Object>());
        for idx in static_facts.iter() {
            let binding = repo.ground_atom(idx).binding.clone();
            assignments.insert(idx.predicate, &binding);
        }

        // Body: room(?x) over one parameter.
        let var = repo.intern_symbol("?x");
        let (v, _) = repo.get_or_create(vega_formalism::Variable { name: var });
        let (atom, _) = repo.get_or_create(Atom {
            predicate: room,
            terms: smallvec![Term::Parameter(0)],
        });
        let (lit, _) = repo.get_or_create(Literal {
            polarity: true,
            atom,
        });
        let condition = ConjunctiveCondition {
            variables: vec![v],
            static_literals: vec![lit],
            ..Default::default()
        };

        let domains = parameter_domains(&repo, &condition, &objects, &assignments);
        assert_eq!(domains.len(), 1);
        assert_eq!(domains[0], objects[..2].to_vec());
    }
}
