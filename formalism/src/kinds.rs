use std::fmt::Debug;
use std::hash::Hash;

/// Marker trait for the four fact kinds.
///
/// Entities carry their kind as a zero-sized type parameter, so a fluent atom
/// and a derived atom of the same shape are different types with different
/// stores, and mixing them up is a compile error rather than a runtime one.
pub trait FactKind: Copy + Clone + Default + Eq + Ord + Hash + Debug + 'static {
    const LABEL: &'static str;
}

/// Facts that never change during search (type predicates, rigid relations).
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Static;

/// Facts subject to action effects; the mutable part of a state.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Fluent;

/// Facts computed by axiom closure from the fluent and static facts.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Derived;

/// Reserved for the single cost accumulator.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Auxiliary;

impl FactKind for Static {
    const LABEL: &'static str = "static";
}

impl FactKind for Fluent {
    const LABEL: &'static str = "fluent";
}

impl FactKind for Derived {
    const LABEL: &'static str = "derived";
}

impl FactKind for Auxiliary {
    const LABEL: &'static str = "auxiliary";
}
