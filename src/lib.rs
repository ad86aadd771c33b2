//! Stochagraph: a tracing compiler from probabilistic model code to a typed
//! immutable computation graph.
//!
//! Model code built from [`RandomVariable`] declarations is executed once
//! under a [`Tracer`]; every arithmetic operation over traced values is
//! intercepted and recorded as a node in an append-only, deduplicated store.
//! Each node carries a type from a small numeric lattice, and operators
//! insert the minimal conversion nodes their operands need. The frozen graph
//! renders as deterministic DOT text via [`to_dot`] or is handed to an
//! external inference engine via [`infer`].

pub mod compile;
pub mod display;
pub mod error;
pub mod graph;
pub mod lattice;
pub mod model;
pub mod report;
pub mod trace;

pub use compile::{infer, to_dot, GraphExecutor, Observation, QueryFn};
pub use error::CompileError;
pub use graph::{Family, NodeId, NodeKind, OpKind, Registry};
pub use lattice::LatticeType;
pub use model::{DistributionSpec, RandomVariable};
pub use report::{Diagnostic, Role};
pub use trace::{Expr, Tracer};
