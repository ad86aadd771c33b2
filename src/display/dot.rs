//! The Graph Serializer: deterministic DOT text over the frozen graph.
//!
//! Only nodes reachable upstream from the given roots (the attached queries
//! and observations) are emitted; abandoned intermediates stay in the store
//! but never reach the rendered form. Emitted nodes take dense display ids
//! in creation order, zero-padded to the decimal width of the largest one,
//! so a small graph reads `N0..N9` and a larger one `N00..N16`. Node lines
//! come first, then edges grouped by source node in creation order,
//! destinations in the order the source feeds them.

use std::collections::HashMap;
use std::fmt::Write;

use super::node_label;
use crate::graph::{NodeId, Registry};

/// Serializes the part of the frozen graph reachable from `roots`.
/// Byte-identical across repeated calls and across repeated compiles of the
/// same model/query set.
pub fn to_dot(reg: &Registry, roots: &[NodeId]) -> String {
    let reachable = reg.upstream_of(roots);
    let mut display: HashMap<NodeId, usize> = HashMap::new();
    let mut ordered: Vec<NodeId> = Vec::new();
    for id in reg.ids() {
        if reachable.contains(&id) {
            display.insert(id, ordered.len());
            ordered.push(id);
        }
    }
    let width = if ordered.len() <= 1 {
        1
    } else {
        (ordered.len() - 1).to_string().len()
    };

    let mut out = String::new();
    out.push_str("digraph \"graph\" {\n");
    for (idx, &id) in ordered.iter().enumerate() {
        let label = render_label(&node_label(reg, id));
        let _ = writeln!(out, "  N{:0width$}[label={}];", idx, label);
    }
    for &src in &ordered {
        let s = display[&src];
        for dst in reg.children(src) {
            if let Some(&d) = display.get(&dst) {
                let _ = writeln!(out, "  N{:0width$} -> N{:0width$};", s, d);
            }
        }
    }
    out.push('}');
    out
}

/// Labels stay unquoted when identifier-like or numeral-like; anything else
/// (operator symbols, arbitrary text) is quoted with escapes.
fn render_label(label: &str) -> String {
    if is_identifier(label) || is_numeral(label) {
        label.to_string()
    } else {
        let escaped = label.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\"", escaped)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_numeral(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    if body.is_empty() {
        return false;
    }
    let mut seen_dot = false;
    for c in body.chars() {
        match c {
            '0'..='9' => {}
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    true
}
