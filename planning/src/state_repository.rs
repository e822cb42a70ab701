use crate::state::{PackedState, StateIndex, UnpackedState};
use vega_collections::{FloatTable, IndexedHashSet, PoolPtr, SharedObjectPool, SlotTree};
use vega_grounder::facts::set_numeric_value;

/// Content-addressed store of every state reached during search.
///
/// Registering packs a state into three slot trees and interns the triple:
/// states seen before come back with their existing [`StateIndex`], so the
/// search never holds two copies of the same state. Unpacking decodes a
/// packed state into a pool-borrowed [`UnpackedState`].
#[derive(Default)]
pub struct StateRepository {
    slots: SlotTree,
    floats: FloatTable,
    packed: IndexedHashSet<PackedState>,
    pool: SharedObjectPool<UnpackedState>,
    encode_buffer: Vec<u32>,
}

impl StateRepository {
    pub fn new() -> Self {
        Default::default()
    }

    /// Number of distinct registered states.
    pub fn len(&self) -> usize {
        self.packed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packed.is_empty()
    }

    /// A cleared scratch state from the pool, not yet registered.
    pub fn blank_state(&self) -> PoolPtr<UnpackedState> {
        self.pool.acquire()
    }

    /// Interns `state`'s content and assigns its index. Returns the index
    /// and whether the state was new.
    pub fn register(&mut self, state: &mut UnpackedState) -> (StateIndex, bool) {
        self.encode_buffer.clear();
        for atom in state.fluent_atoms.iter() {
            self.encode_buffer.push(atom.predicate.raw());
            self.encode_buffer.push(atom.value);
        }
        let fluent = self.slots.insert_sequence(&self.encode_buffer);

        self.encode_buffer.clear();
        for atom in state.derived_atoms.iter() {
            self.encode_buffer.push(atom.predicate.raw());
            self.encode_buffer.push(atom.value);
        }
        let derived = self.slots.insert_sequence(&self.encode_buffer);

        // Trailing undefined variables are identical to absent ones; drop
        // them so equal states pack equal.
        let mut numeric_len = state.numeric.len();
        while numeric_len > 0 && state.numeric[numeric_len - 1].is_nan() {
            numeric_len -= 1;
        }
        self.encode_buffer.clear();
        for &value in &state.numeric[..numeric_len] {
            self.encode_buffer.push(self.floats.intern(value));
        }
        let numeric = self.slots.insert_sequence(&self.encode_buffer);

        let (index, inserted) = self.packed.insert(PackedState {
            fluent,
            derived,
            numeric,
        });
        state.index = index;
        (index, inserted)
    }

    /// Decodes a registered state into a pooled scratch object.
    pub fn unpack(&self, index: StateIndex) -> PoolPtr<UnpackedState> {
        let packed = *self.packed.get(index);
        let ptr = self.pool.acquire();
        {
            let mut state = ptr.borrow_mut();
            state.index = index;

            let mut buffer = Vec::new();
            self.slots.read_sequence(packed.fluent, &mut buffer);
            for pair in buffer.chunks_exact(2) {
                state.fluent_atoms.insert(vega_formalism::GroundAtomIdx {
                    predicate: vega_collections::Idx::new(pair[0]),
                    value: pair[1],
                });
            }

            buffer.clear();
            self.slots.read_sequence(packed.derived, &mut buffer);
            for pair in buffer.chunks_exact(2) {
                state.derived_atoms.insert(vega_formalism::GroundAtomIdx {
                    predicate: vega_collections::Idx::new(pair[0]),
                    value: pair[1],
                });
            }

            buffer.clear();
            self.slots.read_sequence(packed.numeric, &mut buffer);
            for (i, &code) in buffer.iter().enumerate() {
                set_numeric_value(&mut state.numeric, i, self.floats.resolve(code));
            }
        }
        ptr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vega_collections::Idx;
    use vega_formalism::GroundAtomIdx;

    fn atom<K: vega_formalism::FactKind>(predicate: u32, value: u32) -> GroundAtomIdx<K> {
        GroundAtomIdx {
            predicate: Idx::new(predicate),
            value,
        }
    }

    #[test]
    fn roundtrip() {
        let mut repo = StateRepository::new();
        let ptr = repo.blank_state();
        {
            let mut state = ptr.borrow_mut();
            state.fluent_atoms.insert(atom(0, 2));
            state.fluent_atoms.insert(atom(3, 0));
            state.derived_atoms.insert(atom(1, 1));
            state.numeric = vec![1.5, f64::NAN, -3.0];
        }
        let (index, inserted) = repo.register(&mut ptr.borrow_mut());
        assert!(inserted);

        let unpacked = repo.unpack(index);
        let state = unpacked.borrow();
        assert_eq!(state.index, index);
        let fluents: Vec<_> = state.fluent_atoms.iter().collect();
        assert_eq!(fluents, vec![atom(0, 2), atom(3, 0)]);
        let derived: Vec<_> = state.derived_atoms.iter().collect();
        assert_eq!(derived, vec![atom(1, 1)]);
        assert_eq!(state.numeric[0], 1.5);
        assert!(state.numeric[1].is_nan());
        assert_eq!(state.numeric[2], -3.0);
    }

    #[test]
    fn equal_states_share_an_index() {
        let mut repo = StateRepository::new();

        let a = repo.blank_state();
        a.borrow_mut().fluent_atoms.insert(atom(0, 1));
        let (ia, inserted_a) = repo.register(&mut a.borrow_mut());
        assert!(inserted_a);

        let b = repo.blank_state();
        b.borrow_mut().fluent_atoms.insert(atom(0, 1));
        let (ib, inserted_b) = repo.register(&mut b.borrow_mut());
        assert!(!inserted_b);
        assert_eq!(ia, ib);
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn empty_state_roundtrips() {
        let mut repo = StateRepository::new();
        let ptr = repo.blank_state();
        let (index, _) = repo.register(&mut ptr.borrow_mut());
        let unpacked = repo.unpack(index);
        let state = unpacked.borrow();
        assert!(state.fluent_atoms.is_empty());
        assert!(state.derived_atoms.is_empty());
        assert!(state.numeric.is_empty());
    }

    #[test]
    fn trailing_undefined_numerics_do_not_split_states() {
        let mut repo = StateRepository::new();

        let a = repo.blank_state();
        a.borrow_mut().numeric = vec![2.0];
        let (ia, _) = repo.register(&mut a.borrow_mut());

        let b = repo.blank_state();
        b.borrow_mut().numeric = vec![2.0, f64::NAN];
        let (ib, inserted) = repo.register(&mut b.borrow_mut());
        assert!(!inserted);
        assert_eq!(ia, ib);
    }
}
