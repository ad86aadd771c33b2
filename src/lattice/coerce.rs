//! The Coercion Engine.
//!
//! Resolves an operand's actual lattice type against a consumer's declared
//! requirement, inserting at most one converter node per operand. Converters
//! only ever walk up the lattice; a downcast is never synthesized.

use crate::graph::{NodeId, NodeKind, OpKind, Registry};
use crate::lattice::{self, LatticeType};

/// A consumer's declared requirement for one input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// The operand must carry exactly this type; a strict subtype is
    /// converted up to it.
    Exactly(LatticeType),
    /// Any subtype is consumed as-is; only an unrelated type forces a
    /// conversion up to the bound.
    Within(LatticeType),
}

/// Raised when no coercion edge leads from the operand's type to the
/// requirement. The caller turns this into an unsupported-operand diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoCoercionPath {
    pub actual: LatticeType,
    pub required: LatticeType,
}

/// The converter node able to re-tag a value as `target`, if one exists.
fn converter(target: LatticeType) -> Option<OpKind> {
    match target {
        LatticeType::Probability => Some(OpKind::ToProbability),
        LatticeType::PosReal => Some(OpKind::ToPosReal),
        LatticeType::Real => Some(OpKind::ToReal),
        _ => None,
    }
}

/// Resolves `node` against `req`, returning the node to wire as the actual
/// input: the original node when it already satisfies the requirement, or a
/// freshly inserted converter node otherwise.
pub fn meet(reg: &mut Registry, node: NodeId, req: Requirement) -> Result<NodeId, NoCoercionPath> {
    let actual = reg.type_of(node);
    let target = match req {
        Requirement::Within(t) => {
            if lattice::le(actual, t) {
                return Ok(node);
            }
            t
        }
        Requirement::Exactly(t) => {
            if actual == t {
                return Ok(node);
            }
            t
        }
    };

    // Constants are flexible: a value representable in the target type
    // satisfies the slot directly, with no converter node.
    if let NodeKind::Constant(v) = reg.kind(node) {
        if lattice::admits(target, *v) {
            return Ok(node);
        }
    }

    if lattice::le(actual, target) {
        if let Some(op) = converter(target) {
            return Ok(reg.operator(op, &[node], target));
        }
    }
    Err(NoCoercionPath {
        actual,
        required: target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Family;
    use LatticeType::*;

    fn beta_sample(reg: &mut Registry) -> NodeId {
        let c = reg.constant(2.0);
        let d = reg.distribution(Family::Beta, &[c, c]);
        reg.sample(d)
    }

    #[test]
    fn satisfied_requirement_inserts_nothing() {
        let mut reg = Registry::new();
        let s = beta_sample(&mut reg);
        let before = reg.count();
        let got = meet(&mut reg, s, Requirement::Within(PosReal)).unwrap();
        assert_eq!(got, s);
        assert_eq!(reg.count(), before);
    }

    #[test]
    fn exact_requirement_converts_a_strict_subtype() {
        let mut reg = Registry::new();
        let s = beta_sample(&mut reg);
        let got = meet(&mut reg, s, Requirement::Exactly(Real)).unwrap();
        assert_ne!(got, s);
        assert_eq!(reg.kind(got), &NodeKind::Operator(OpKind::ToReal));
        assert_eq!(reg.type_of(got), Real);
        assert_eq!(reg.parents(got), &[s]);
    }

    #[test]
    fn representable_constant_passes_without_conversion() {
        let mut reg = Registry::new();
        let c = reg.constant(3.0); // PosInt naturally
        let before = reg.count();
        let got = meet(&mut reg, c, Requirement::Exactly(PosReal)).unwrap();
        assert_eq!(got, c);
        assert_eq!(reg.count(), before);
    }

    #[test]
    fn downcast_is_refused() {
        let mut reg = Registry::new();
        let c = reg.constant(2.0);
        let d = reg.distribution(Family::Normal, &[c, c]);
        let s = reg.sample(d); // Real
        let err = meet(&mut reg, s, Requirement::Within(Probability)).unwrap_err();
        assert_eq!(err.actual, Real);
        assert_eq!(err.required, Probability);
    }
}
