//! The Diagnostic Reporter.
//!
//! Explains the first unsupported construct reachable from a requested query
//! in terms of its graph position: which construct, and which role it plays
//! for its immediate consumer.

use std::fmt;

use thiserror::Error;

use crate::display::node_label;
use crate::graph::{NodeId, NodeKind, Registry};

/// The position an unsupported node occupies relative to its immediate
/// consumer in the partially built graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The unsupported node is itself the thing being queried.
    Operator,
    /// Left operand slot of a binary operator.
    Left,
    /// Right operand slot of a binary operator.
    Right,
    /// Any other input slot (unary operator, distribution parameter).
    Operand,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Operator => "operator",
            Role::Left => "left",
            Role::Right => "right",
            Role::Operand => "operand",
        };
        f.write_str(s)
    }
}

/// A single unsupported-construct diagnostic. The two-line text is matched
/// verbatim by conformance tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "The model uses a {operation} operation unsupported by Stochagraph.\n\
     The unsupported node is the {role} of a {consumer}."
)]
pub struct Diagnostic {
    /// Display text of the unsupported construct.
    pub operation: String,
    pub role: Role,
    /// Display label of the immediate consumer.
    pub consumer: String,
}

/// The diagnostic for the first unsupported node, in creation order, that is
/// reachable from any of `roots`. `None` when every reachable node is
/// executable.
pub(crate) fn first_violation(reg: &Registry, roots: &[NodeId]) -> Option<Diagnostic> {
    let reachable = reg.upstream_of(roots);
    for id in reg.ids() {
        let NodeKind::Unsupported(display) = reg.kind(id) else {
            continue;
        };
        if !reachable.contains(&id) {
            continue;
        }
        // First consumer in creation order is the immediate graph position.
        let Some(consumer) = reg.children(id).into_iter().next() else {
            continue;
        };
        let role = match reg.kind(consumer) {
            NodeKind::Query => Role::Operator,
            NodeKind::Operator(_) if reg.parents(consumer).len() == 2 => {
                match reg.parents(consumer).iter().position(|&p| p == id) {
                    Some(0) => Role::Left,
                    _ => Role::Right,
                }
            }
            NodeKind::Unsupported(_) if reg.parents(consumer).len() == 2 => {
                match reg.parents(consumer).iter().position(|&p| p == id) {
                    Some(0) => Role::Left,
                    _ => Role::Right,
                }
            }
            _ => Role::Operand,
        };
        return Some(Diagnostic {
            operation: display.clone(),
            role,
            consumer: node_label(reg, consumer),
        });
    }
    None
}
