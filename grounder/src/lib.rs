//! Bottom-up rule grounding and evaluation.
//!
//! Given a program (facts, rules) the grounder computes every satisfying
//! parameter binding of every rule by enumerating k-cliques of per-rule
//! static consistency graphs, pruned by assignment masks over the current
//! facts and verified exactly against the fact sets. The evaluator iterates
//! this to a stratified fixpoint; the planner reuses the same machinery to
//! find applicable actions and to close states under axioms.

pub mod assignment;
pub mod cartesian;
pub mod consistency;
pub mod domains;
pub mod evaluate;
pub mod facts;
pub mod ground;
pub mod kpkc;
pub mod stratify;

pub use assignment::{AssignmentSet, AssignmentSets};
pub use cartesian::{combinations, Combinations};
pub use consistency::StaticConsistencyGraph;
pub use domains::parameter_domains;
pub use evaluate::{solve_bottom_up, ProgramContext, ProgramWorkspace, RuleInfo};
pub use facts::{AtomFactSets, FactsView, KindFacts};
pub use ground::{
    collect_bindings, ground_atom, ground_condition, ground_expression, ground_rule_instance,
    substitute, verify_binding, BodyInfo, ConditionParts, GroundingWorkspace,
};
pub use kpkc::{enumerate_cliques, KpkcWorkspace};
pub use stratify::stratify;
