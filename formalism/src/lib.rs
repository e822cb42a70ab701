//! The planning formalism: predicates, atoms, literals, numeric functions,
//! conditions, rules, actions and axioms, stored exactly once in an interning
//! [`repository::Repository`] and addressed through compact typed indices.
//!
//! Entities are plain data; their derived `Hash`/`Eq` over all fields is the
//! identifying-members contract, and [`entities::Entity::canonicalize`] sorts
//! the unordered components so that logically equal values have equal
//! representations. Scopes compose through [`overlay::Overlay`], which extends
//! a parent repository's index spaces without renumbering anything.

pub mod ast;
pub mod entities;
pub mod error;
pub mod eval;
pub mod fmt;
pub mod kinds;
pub mod overlay;
pub mod repository;
pub mod store;
pub mod symbols;

pub use entities::*;
pub use error::ConstructionError;
pub use kinds::{Auxiliary, Derived, FactKind, Fluent, Static};
pub use overlay::Overlay;
pub use repository::Repository;
pub use store::{Context, ContextExt, Find, GroundAtoms, GroundAtomsMut, Store, Symbols};
pub use symbols::Sym;
pub use vega_collections::Idx;
