use vega_collections::Idx;
use vega_formalism::{
    ConjunctiveCondition, ConstructionError, Context, ContextExt, Find, Fluent, Predicate, Rule, Symbols,
};

/// Splits `rules` into strata such that a rule with a negative dependency on
/// a predicate sits strictly above every rule deriving that predicate.
///
/// Returned groups hold rule *positions* (into the input slice) in ascending
/// stratum order, preserving input order within a stratum. Fails with
/// [`ConstructionError::NotStratifiable`] when negation cycles through a
/// derived predicate.
pub fn stratify<C: Context>(ctx: &C, rules: &[Idx<Rule>]) -> Result<Vec<Vec<usize>>, ConstructionError> {
    let num_predicates = ctx.num::<Predicate<Fluent>>();
    let mut stratum = vec![0usize; num_predicates];

    // (head predicate, [(body predicate, polarity)]) per rule.
    let mut dependencies = Vec::with_capacity(rules.len());
    for &rule in rules {
        let data = Find::<Rule>::resolve(ctx, rule);
        let head = Find::<vega_formalism::Atom<Fluent>>::resolve(ctx, data.head).predicate;
        let body = Find::<ConjunctiveCondition>::resolve(ctx, data.body);
        let mut deps = Vec::with_capacity(body.fluent_literals.len());
        for &literal in &body.fluent_literals {
            let literal = Find::<vega_formalism::Literal<Fluent>>::resolve(ctx, literal);
            let predicate = Find::<vega_formalism::Atom<Fluent>>::resolve(ctx, literal.atom).predicate;
            deps.push((predicate, literal.polarity));
        }
        dependencies.push((head, deps));
    }

    // Longest-chain iteration; a stratum beyond the predicate count proves a
    // cycle through negation.
    let mut changed = true;
    while changed {
        changed = false;
        for (head, deps) in &dependencies {
            for &(predicate, polarity) in deps {
                let required = stratum[usize::from(predicate)] + usize::from(!polarity);
                let h = usize::from(*head);
                if stratum[h] < required {
                    if required > num_predicates {
                        let name = Find::<Predicate<Fluent>>::resolve(ctx, *head).name;
                        return Err(ConstructionError::NotStratifiable(ctx.symbol(name).to_string()));
                    }
                    stratum[h] = required;
                    changed = true;
                }
            }
        }
    }

    let max_stratum = dependencies
        .iter()
        .map(|(head, _)| stratum[usize::from(*head)])
        .max()
        .unwrap_or(0);
    let mut groups = vec![Vec::new(); max_stratum + 1];
    for (position, (head, _)) in dependencies.iter().enumerate() {
        groups[stratum[usize::from(*head)]].push(position);
    }
    groups.retain(|group| !group.is_empty());
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;
    use vega_formalism::{Atom, Literal, Repository, Store, Term, Variable};

    fn rule(
        repo: &mut Repository,
        head: Idx<Predicate<Fluent>>,
        body: &[(Idx<Predicate<Fluent>>, bool)],
    ) -> Idx<Rule> {
        let var = repo.intern_symbol("?x");
        let (v, _) = repo.get_or_create(Variable { name: var });
        let mut condition = ConjunctiveCondition {
            variables: vec![v],
            ..Default::default()
        };
        for &(predicate, polarity) in body {
            let (atom, _) = repo.get_or_create(Atom {
                predicate,
                terms: smallvec![Term::Parameter(0)],
            });
            let (literal, _) = repo.get_or_create(Literal { polarity, atom });
            condition.fluent_literals.push(literal);
        }
        let (body, _) = repo.get_or_create(condition);
        let (head, _) = repo.get_or_create(Atom {
            predicate: head,
            terms: smallvec![Term::Parameter(0)],
        });
        repo.get_or_create(Rule { body, head }).0
    }

    fn predicate(repo: &mut Repository, name: &str) -> Idx<Predicate<Fluent>> {
        let name = repo.intern_symbol(name);
        repo.get_or_create(Predicate {
            name,
            arity: 1,
            kind: Fluent,
        })
        .0
    }

    #[test]
    fn negation_forces_a_higher_stratum() {
        let mut repo = Repository::new();
        let p = predicate(&mut repo, "p");
        let q = predicate(&mut repo, "q");
        let r = predicate(&mut repo, "r");

        // q(X) <- p(X).   r(X) <- not q(X).
        let r1 = rule(&mut repo, q, &[(p, true)]);
        let r2 = rule(&mut repo, r, &[(q, false)]);

        let strata = stratify(&repo, &[r1, r2]).unwrap();
        assert_eq!(strata, vec![vec![0], vec![1]]);
    }

    #[test]
    fn negative_cycle_is_rejected() {
        let mut repo = Repository::new();
        let p = predicate(&mut repo, "p");
        let q = predicate(&mut repo, "q");

        // p(X) <- not q(X).   q(X) <- not p(X).  Not stratifiable.
        let r1 = rule(&mut repo, p, &[(q, false)]);
        let r2 = rule(&mut repo, q, &[(p, false)]);

        assert!(matches!(
            stratify(&repo, &[r1, r2]),
            Err(ConstructionError::NotStratifiable(_))
        ));
    }

    #[test]
    fn positive_recursion_stays_in_one_stratum() {
        let mut repo = Repository::new();
        let p = predicate(&mut repo, "edge");
        let q = predicate(&mut repo, "path");

        let r1 = rule(&mut repo, q, &[(p, true)]);
        let r2 = rule(&mut repo, q, &[(q, true)]);

        let strata = stratify(&repo, &[r1, r2]).unwrap();
        assert_eq!(strata, vec![vec![0, 1]]);
    }
}
