//! Rendering of the frozen graph: display labels and the DOT text form.

pub mod dot;

use crate::graph::{NodeId, NodeKind, Registry};

/// The display label of a node, shared by the serializer and the diagnostic
/// reporter. Constants use the value library's default numeric text form.
pub(crate) fn node_label(reg: &Registry, id: NodeId) -> String {
    match reg.kind(id) {
        NodeKind::Constant(v) => format!("{}", v),
        NodeKind::Distribution(f) => f.name().to_string(),
        NodeKind::Sample => "Sample".to_string(),
        NodeKind::Operator(op) => op.symbol().to_string(),
        NodeKind::Query => "Query".to_string(),
        NodeKind::Unsupported(d) => d.clone(),
    }
}
