use thiserror::Error;

/// Errors raised while turning an AST into an interned domain/task.
///
/// All of these abort planning before any search starts; once a task has been
/// built successfully, everything below the search boundary is total.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("duplicate predicate `{0}`")]
    DuplicatePredicate(String),

    #[error("duplicate function `{0}`")]
    DuplicateFunction(String),

    #[error("duplicate action `{0}`")]
    DuplicateAction(String),

    #[error("duplicate parameter `{1}` in `{0}`")]
    DuplicateParameter(String, String),

    #[error("`{0}` expects {1} arguments, got {2}")]
    ArityMismatch(String, u32, u32),

    #[error("unknown predicate `{0}`")]
    UnknownPredicate(String),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("unknown object `{0}`")]
    UnknownObject(String),

    #[error("variable `{1}` in `{0}` is not bound by a parameter")]
    UnboundVariable(String, String),

    #[error("`{0}` is not fluent and cannot be changed by an effect")]
    NotFluent(String),

    #[error("initial state mentions derived predicate `{0}`")]
    DerivedInInitialState(String),

    #[error("axiom head `{0}` is not a derived predicate")]
    HeadNotDerived(String),

    #[error("derived predicates cannot be stratified (negative cycle through `{0}`)")]
    NotStratifiable(String),
}
