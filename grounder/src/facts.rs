use fixedbitset::FixedBitSet;
use vega_collections::Idx;
use vega_formalism::eval::NumericSource;
use vega_formalism::{
    Auxiliary, Derived, FactKind, Fluent, GroundAtomIdx, GroundFunctionTerm, Predicate, Static,
};

/// Membership sets for the known ground atoms of one fact kind, grouped by
/// predicate. A ground atom index `(p, v)` is a member iff bit `v` of
/// predicate `p`'s set is on; bits beyond a set's current size read as
/// absent, so the sets lazily grow with the repository.
pub struct AtomFactSets<K: FactKind> {
    sets: Vec<FixedBitSet>,
    len: usize,
    _kind: std::marker::PhantomData<K>,
}

impl<K: FactKind> Default for AtomFactSets<K> {
    fn default() -> Self {
        AtomFactSets {
            sets: Vec::new(),
            len: 0,
            _kind: std::marker::PhantomData,
        }
    }
}

impl<K: FactKind> AtomFactSets<K> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Number of facts currently in the sets.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        for set in &mut self.sets {
            set.clear();
        }
        self.len = 0;
    }

    /// Inserts a fact; returns whether it was new.
    pub fn insert(&mut self, index: GroundAtomIdx<K>) -> bool {
        let group = usize::from(index.predicate);
        while self.sets.len() <= group {
            self.sets.push(FixedBitSet::new());
        }
        let set = &mut self.sets[group];
        let bit = index.value as usize;
        if bit >= set.len() {
            set.grow(bit + 1);
        }
        let new = !set.contains(bit);
        if new {
            set.insert(bit);
            self.len += 1;
        }
        new
    }

    /// Removes a fact; returns whether it was present.
    pub fn remove(&mut self, index: GroundAtomIdx<K>) -> bool {
        let Some(set) = self.sets.get_mut(usize::from(index.predicate)) else {
            return false;
        };
        let bit = index.value as usize;
        if bit < set.len() && set.contains(bit) {
            set.set(bit, false);
            self.len -= 1;
            true
        } else {
            false
        }
    }

    /// Makes `self` an exact copy of `other`, reusing allocations.
    pub fn copy_from(&mut self, other: &Self) {
        self.sets.resize_with(other.sets.len(), FixedBitSet::new);
        for (dst, src) in self.sets.iter_mut().zip(other.sets.iter()) {
            dst.clone_from(src);
        }
        self.len = other.len;
    }

    pub fn contains(&self, index: GroundAtomIdx<K>) -> bool {
        self.sets
            .get(usize::from(index.predicate))
            .is_some_and(|set| set.contains(index.value as usize))
    }

    /// Facts of one predicate in ascending `value` order.
    pub fn facts_of(&self, predicate: Idx<Predicate<K>>) -> impl Iterator<Item = GroundAtomIdx<K>> + '_ {
        self.sets
            .get(usize::from(predicate))
            .into_iter()
            .flat_map(move |set| {
                set.ones().map(move |value| GroundAtomIdx {
                    predicate,
                    value: value as u32,
                })
            })
    }

    /// All facts in lexicographic (predicate, value) order.
    pub fn iter(&self) -> impl Iterator<Item = GroundAtomIdx<K>> + '_ {
        self.sets.iter().enumerate().flat_map(|(group, set)| {
            set.ones().map(move |value| GroundAtomIdx {
                predicate: Idx::from(group),
                value: value as u32,
            })
        })
    }
}

/// Randomised access to everything the grounder may test a ground instance
/// against: the three atom kinds plus the numeric variables. Numeric slots
/// are indexed by flat ground-function-term index; `NaN` means undefined.
pub struct FactsView<'a> {
    pub static_atoms: &'a AtomFactSets<Static>,
    pub fluent_atoms: &'a AtomFactSets<Fluent>,
    pub derived_atoms: &'a AtomFactSets<Derived>,
    pub static_values: &'a [f64],
    pub fluent_values: &'a [f64],
}

/// Per-kind access used by code generic over the fact kind.
pub trait KindFacts: FactKind {
    fn atoms<'a>(view: &FactsView<'a>) -> &'a AtomFactSets<Self>;
}

impl KindFacts for Static {
    fn atoms<'a>(view: &FactsView<'a>) -> &'a AtomFactSets<Static> {
        view.static_atoms
    }
}

impl KindFacts for Fluent {
    fn atoms<'a>(view: &FactsView<'a>) -> &'a AtomFactSets<Fluent> {
        view.fluent_atoms
    }
}

impl KindFacts for Derived {
    fn atoms<'a>(view: &FactsView<'a>) -> &'a AtomFactSets<Derived> {
        view.derived_atoms
    }
}

impl<'a> FactsView<'a> {
    pub fn contains<K: KindFacts>(&self, index: GroundAtomIdx<K>) -> bool {
        K::atoms(self).contains(index)
    }
}

impl<'a> NumericSource for FactsView<'a> {
    fn static_value(&self, fterm: Idx<GroundFunctionTerm<Static>>) -> f64 {
        self.static_values.get(usize::from(fterm)).copied().unwrap_or(f64::NAN)
    }

    fn fluent_value(&self, fterm: Idx<GroundFunctionTerm<Fluent>>) -> f64 {
        self.fluent_values.get(usize::from(fterm)).copied().unwrap_or(f64::NAN)
    }

    // Programs have no cost accumulator; the planner substitutes its own
    // source when evaluating metrics.
    fn auxiliary_value(&self, _fterm: Idx<GroundFunctionTerm<Auxiliary>>) -> f64 {
        f64::NAN
    }
}

/// Writes `value` into the numeric slot of `fterm`, growing with `NaN`.
pub fn set_numeric_value(values: &mut Vec<f64>, fterm: usize, value: f64) {
    if fterm >= values.len() {
        values.resize(fterm + 1, f64::NAN);
    }
    values[fterm] = value;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_contains_iterate() {
        let mut sets: AtomFactSets<Fluent> = AtomFactSets::new();
        let p: Idx<Predicate<Fluent>> = Idx::new(1);
        let q: Idx<Predicate<Fluent>> = Idx::new(0);
        let a = GroundAtomIdx { predicate: p, value: 3 };
        let b = GroundAtomIdx { predicate: q, value: 1 };

        assert!(sets.insert(a));
        assert!(!sets.insert(a));
        assert!(sets.insert(b));
        assert!(sets.contains(a));
        assert!(!sets.contains(GroundAtomIdx { predicate: p, value: 2 }));
        assert_eq!(sets.len(), 2);

        // Lexicographic iteration: group first.
        let all: Vec<_> = sets.iter().collect();
        assert_eq!(all, vec![b, a]);

        sets.clear();
        assert!(!sets.contains(a));
        assert_eq!(sets.len(), 0);
    }

    #[test]
    fn numeric_slots_grow_with_nan() {
        let mut values = Vec::new();
        set_numeric_value(&mut values, 2, 4.5);
        assert_eq!(values.len(), 3);
        assert!(values[0].is_nan());
        assert_eq!(values[2], 4.5);
    }
}
