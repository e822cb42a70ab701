use vega_collections::pool::Reusable;
use vega_collections::{Idx, Slot};
use vega_grounder::AtomFactSets;
use vega_formalism::{Derived, Fluent};

/// Content-addressed form of a state: three interned slot trees (sorted
/// fluent-atom codes, sorted derived-atom codes, numeric-variable codes).
/// Two states with the same facts share the same packed value and therefore
/// the same [`StateIndex`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct PackedState {
    pub fluent: Slot,
    pub derived: Slot,
    pub numeric: Slot,
}

/// Dense stable identity of a registered state.
pub type StateIndex = Idx<PackedState>;

/// Decoded, mutable form of a state, recycled through the state repository's
/// pool. The derived sets are recomputed by the axiom evaluator whenever the
/// fluent part changes.
pub struct UnpackedState {
    /// Index assigned at registration; unset for scratch states.
    pub index: StateIndex,
    pub fluent_atoms: AtomFactSets<Fluent>,
    pub derived_atoms: AtomFactSets<Derived>,
    /// Numeric variables by flat fluent ground-function-term index;
    /// `NaN` = undefined.
    pub numeric: Vec<f64>,
}

impl Default for UnpackedState {
    fn default() -> Self {
        UnpackedState {
            index: StateIndex::unset(),
            fluent_atoms: AtomFactSets::new(),
            derived_atoms: AtomFactSets::new(),
            numeric: Vec::new(),
        }
    }
}

impl UnpackedState {
    /// Copies the fluent content of `other` (atoms and numerics); the
    /// derived part is left cleared for re-derivation.
    pub fn assign_fluents(&mut self, other: &UnpackedState) {
        self.fluent_atoms.copy_from(&other.fluent_atoms);
        self.numeric.clear();
        self.numeric.extend_from_slice(&other.numeric);
    }
}

impl Reusable for UnpackedState {
    fn reset(&mut self) {
        self.index = StateIndex::unset();
        self.fluent_atoms.clear();
        self.derived_atoms.clear();
        self.numeric.clear();
    }
}
