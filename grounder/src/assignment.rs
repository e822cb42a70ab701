use fixedbitset::FixedBitSet;
use vega_collections::Idx;
use vega_formalism::{FactKind, Find, Object, Predicate};

/// Per-predicate membership masks over partial bindings.
///
/// For a predicate of arity `k` over `n` objects, the set answers in O(1)
/// whether any known atom of the predicate places object `o` at position `i`
/// (a *single* assignment) and whether any atom places `o` at `i` *and* `o'`
/// at `j` (a *pair*). The grounder uses these as a sound overapproximation
/// when filtering consistency-graph vertices and edges; exact membership of a
/// full binding is checked against the fact sets instead.
pub struct AssignmentSet {
    arity: u32,
    num_objects: u32,
    count: usize,
    singles: FixedBitSet,
    pairs: FixedBitSet,
}

impl AssignmentSet {
    pub fn new(arity: u32, num_objects: u32) -> Self {
        let slots = (arity * num_objects) as usize;
        AssignmentSet {
            arity,
            num_objects,
            count: 0,
            singles: FixedBitSet::with_capacity(slots),
            pairs: FixedBitSet::with_capacity(slots * slots),
        }
    }

    fn rank(&self, position: u32, object: Idx<Object>) -> usize {
        debug_assert!(position < self.arity);
        (position * self.num_objects + object.raw()) as usize
    }

    pub fn reset(&mut self) {
        self.singles.clear();
        self.pairs.clear();
        self.count = 0;
    }

    /// Whether any atom at all has been inserted (the only question a
    /// nullary predicate can be asked).
    pub fn has_any(&self) -> bool {
        self.count > 0
    }

    pub fn insert(&mut self, binding: &[Idx<Object>]) {
        debug_assert_eq!(binding.len(), self.arity as usize);
        self.count += 1;
        let slots = (self.arity * self.num_objects) as usize;
        for (i, &o) in binding.iter().enumerate() {
            let ri = self.rank(i as u32, o);
            self.singles.insert(ri);
            for (j, &p) in binding.iter().enumerate().skip(i + 1) {
                let rj = self.rank(j as u32, p);
                self.pairs.insert(ri * slots + rj);
            }
        }
    }

    pub fn possible_single(&self, position: u32, object: Idx<Object>) -> bool {
        self.singles.contains(self.rank(position, object))
    }

    /// `position1 < position2` is required.
    pub fn possible_pair(&self, position1: u32, object1: Idx<Object>, position2: u32, object2: Idx<Object>) -> bool {
        debug_assert!(position1 < position2);
        let slots = (self.arity * self.num_objects) as usize;
        self.pairs
            .contains(self.rank(position1, object1) * slots + self.rank(position2, object2))
    }
}

/// One [`AssignmentSet`] per predicate of kind `K`.
pub struct AssignmentSets<K: FactKind> {
    sets: Vec<AssignmentSet>,
    _kind: std::marker::PhantomData<K>,
}

impl<K: FactKind> AssignmentSets<K> {
    /// Allocates sets for predicates `0..count`, reading arities from `ctx`.
    pub fn new<C: Find<Predicate<K>>>(ctx: &C, count: usize, num_objects: usize) -> Self {
        let mut sets = Vec::with_capacity(count);
        for p in 0..count {
            let arity = ctx.resolve(Idx::from(p)).arity;
            sets.push(AssignmentSet::new(arity, num_objects as u32));
        }
        AssignmentSets {
            sets,
            _kind: std::marker::PhantomData,
        }
    }

    pub fn reset(&mut self) {
        for set in &mut self.sets {
            set.reset();
        }
    }

    pub fn insert(&mut self, predicate: Idx<Predicate<K>>, binding: &[Idx<Object>]) {
        self.sets[usize::from(predicate)].insert(binding);
    }

    pub fn get(&self, predicate: Idx<Predicate<K>>) -> &AssignmentSet {
        &self.sets[usize::from(predicate)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn o(i: u32) -> Idx<Object> {
        Idx::new(i)
    }

    #[test]
    fn singles_and_pairs() {
        let mut set = AssignmentSet::new(2, 4);
        assert!(!set.has_any());
        set.insert(&[o(0), o(2)]);
        set.insert(&[o(1), o(2)]);

        assert!(set.has_any());
        assert!(set.possible_single(0, o(0)));
        assert!(set.possible_single(1, o(2)));
        assert!(!set.possible_single(0, o(2)));
        assert!(set.possible_pair(0, o(0), 1, o(2)));
        assert!(!set.possible_pair(0, o(0), 1, o(3)));

        set.reset();
        assert!(!set.has_any());
        assert!(!set.possible_single(0, o(0)));
    }
}
