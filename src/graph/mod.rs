//! The typed, immutable computation graph and its node store.

mod registry;
mod types;

pub use registry::Registry;
pub use types::{Family, NodeId, NodeKind, OpKind};
