use crate::assignment::AssignmentSets;
use crate::facts::{AtomFactSets, KindFacts};
use fixedbitset::FixedBitSet;
use smallvec::SmallVec;
use vega_collections::Idx;
use vega_formalism::{
    Binding, ConjunctiveCondition, Context, Find, GroundAtom, GroundAtoms, Literal, Object, Static, Term,
};

pub type PartialBinding = [Option<Idx<Object>>];

/// Tests one literal against a partial binding.
///
/// Fully bound literals are checked exactly against the fact sets. Partially
/// bound positive literals are checked through the assignment masks (a sound
/// overapproximation); partially bound negative literals never prune.
pub fn literal_consistent<K, C>(
    ctx: &C,
    literal: Idx<Literal<K>>,
    partial: &PartialBinding,
    assignments: &AssignmentSets<K>,
    facts: &AtomFactSets<K>,
) -> bool
where
    K: KindFacts,
    C: Context
        + Find<Literal<K>>
        + Find<vega_formalism::Atom<K>>
        + GroundAtoms<K>,
{
    let literal = Find::<Literal<K>>::resolve(ctx, literal);
    let atom = Find::<vega_formalism::Atom<K>>::resolve(ctx, literal.atom);

    let mut bound: SmallVec<[(u32, Idx<Object>); 4]> = SmallVec::new();
    let mut fully_bound = true;
    for (position, &term) in atom.terms.iter().enumerate() {
        let object = match term {
            Term::Object(o) => Some(o),
            Term::Parameter(p) => partial[p as usize],
        };
        match object {
            Some(o) => bound.push((position as u32, o)),
            None => fully_bound = false,
        }
    }

    if fully_bound {
        let binding: Binding = bound.iter().map(|&(_, o)| o).collect();
        let present = ctx
            .find_ground_atom(&GroundAtom {
                predicate: atom.predicate,
                binding,
            })
            .is_some_and(|index| facts.contains(index));
        return present == literal.polarity;
    }

    if !literal.polarity {
        return true;
    }

    let set = assignments.get(atom.predicate);
    if bound.is_empty() {
        return set.has_any();
    }
    for (i, &(pos1, obj1)) in bound.iter().enumerate() {
        if !set.possible_single(pos1, obj1) {
            return false;
        }
        for &(pos2, obj2) in bound.iter().skip(i + 1) {
            if !set.possible_pair(pos1, obj1, pos2, obj2) {
                return false;
            }
        }
    }
    true
}

/// K-partite graph over (parameter, object) vertices whose edges survive
/// every binary static constraint of a condition body. Built once per rule or
/// action; per-state work only masks vertices.
pub struct StaticConsistencyGraph {
    /// Vertex objects per parameter partition, in object-index order.
    pub partitions: Vec<Vec<Idx<Object>>>,
    /// First global vertex id of each partition.
    pub offsets: Vec<usize>,
    pub num_vertices: usize,
    /// Per-vertex adjacency over global vertex ids (cross-partition only).
    pub adjacency: Vec<FixedBitSet>,
    /// Whether the fully ground static literals of the body hold at all; a
    /// body that fails here has no instances regardless of bindings.
    pub nullary_consistent: bool,
}

impl StaticConsistencyGraph {
    pub fn new<C: Context>(
        ctx: &C,
        condition: &ConjunctiveCondition,
        domains: &[Vec<Idx<Object>>],
        static_assignments: &AssignmentSets<Static>,
        static_facts: &AtomFactSets<Static>,
    ) -> Self {
        let arity = domains.len();
        let mut partial: Vec<Option<Idx<Object>>> = vec![None; arity];

        let nullary_consistent = condition.static_literals.iter().all(|&literal| {
            let data = Find::<Literal<Static>>::resolve(ctx, literal);
            let atom = Find::<vega_formalism::Atom<Static>>::resolve(ctx, data.atom);
            let ground = atom.terms.iter().all(|t| matches!(t, Term::Object(_)));
            !ground || literal_consistent(ctx, literal, &partial, static_assignments, static_facts)
        });

        // Unary-inconsistent vertices are dropped from the partitions.
        let mut partitions = Vec::with_capacity(arity);
        for (p, domain) in domains.iter().enumerate() {
            let mut vertices = Vec::with_capacity(domain.len());
            for &o in domain {
                partial[p] = Some(o);
                let consistent = condition.static_literals.iter().all(|&literal| {
                    literal_consistent(ctx, literal, &partial, static_assignments, static_facts)
                });
                partial[p] = None;
                if consistent {
                    vertices.push(o);
                }
            }
            partitions.push(vertices);
        }

        let mut offsets = Vec::with_capacity(arity);
        let mut num_vertices = 0;
        for partition in &partitions {
            offsets.push(num_vertices);
            num_vertices += partition.len();
        }

        let mut adjacency = vec![FixedBitSet::with_capacity(num_vertices); num_vertices];
        for p in 0..arity {
            for q in p + 1..arity {
                for (i, &o1) in partitions[p].iter().enumerate() {
                    partial[p] = Some(o1);
                    for (j, &o2) in partitions[q].iter().enumerate() {
                        partial[q] = Some(o2);
                        let consistent = condition.static_literals.iter().all(|&literal| {
                            literal_consistent(ctx, literal, &partial, static_assignments, static_facts)
                        });
                        if consistent {
                            let v = offsets[p] + i;
                            let w = offsets[q] + j;
                            adjacency[v].insert(w);
                            adjacency[w].insert(v);
                        }
                    }
                    partial[q] = None;
                }
                partial[p] = None;
            }
        }

        StaticConsistencyGraph {
            partitions,
            offsets,
            num_vertices,
            adjacency,
            nullary_consistent,
        }
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Global vertex ids of one partition.
    pub fn vertex_range(&self, partition: usize) -> std::ops::Range<usize> {
        let start = self.offsets[partition];
        start..start + self.partitions[partition].len()
    }
}
