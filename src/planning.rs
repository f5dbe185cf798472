//! Leveled planning graph over grounded STRIPS actions.
//!
//! The graph alternates literal levels and action levels, starting from a literal
//! level built out of a decoded state, until two consecutive literal levels hold the
//! same literals. Sibling nodes carry mutual exclusion relations computed by
//! [`mutex::MutexEngine`], and the finished levels feed the heuristics in [`heuristic`].

pub mod action;
pub mod graph;
pub mod heuristic;
pub mod literal;
pub mod mutex;
pub mod node;
pub mod problem;
pub mod timer;

pub use action::{noop_actions, Action};
pub use graph::PlanningGraph;
pub use heuristic::{level_sum, max_level, set_level, Cost};
pub use literal::{symbol, FluentState, Literal, State, Symbol};
pub use mutex::{ActionMutex, LiteralMutex, MutexConfig, MutexEngine};
pub use node::{ActionKey, ActionNode, Level, Links, LiteralNode, PgNode};
pub use problem::{Problem, StripsProblem};
pub use timer::{NoopRecorder, Phase, Recorder, TimingRecorder};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("planning graph already created; construct a new planning graph for each new state")]
    AlreadyBuilt,
    #[error("symbol {0} is not part of the state map")]
    UnknownSymbol(Symbol),
    #[error("encoded state has {found} fluents but the state map has {expected}")]
    StateLength { expected: usize, found: usize },
    #[error("unexpected fluent '{0}' in encoded state, expected T or F")]
    InvalidFluent(char),
}

pub type Result<T> = std::result::Result<T, Error>;
