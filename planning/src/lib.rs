//! The state-space search core: packed states, successor generation through
//! the lifted grounder, axiom closure, and best-first search.
//!
//! The entry path is: ingest a domain/problem AST
//! ([`vega_formalism::ast::build_domain`] / [`vega_formalism::ast::build_task`]),
//! wrap the result in a [`LiftedTask`], create a [`SuccessorGenerator`], and
//! hand both to [`search::astar`] or [`search::gbfs`] with a heuristic and an
//! event handler.

pub mod axioms;
pub mod executor;
pub mod heuristics;
pub mod metric;
pub mod plan;
pub mod search;
pub mod state;
pub mod state_repository;
pub mod successor;
pub mod task;

pub use axioms::{AxiomEvaluator, AxiomProgram};
pub use executor::{action_applicable, apply_action};
pub use heuristics::{BlindHeuristic, GoalCountHeuristic, Heuristic};
pub use metric::{evaluate_metric, is_applicable, is_statically_applicable, StateContext};
pub use plan::{Plan, PlanStep};
pub use search::{
    astar, gbfs, DefaultEventHandler, EventHandler, SearchOptions, SearchResult, SearchStatus,
    Statistics,
};
pub use state::{PackedState, StateIndex, UnpackedState};
pub use state_repository::StateRepository;
pub use successor::{Node, SuccessorGenerator};
pub use task::{ActionInfo, EffectInfo, LiftedTask};
