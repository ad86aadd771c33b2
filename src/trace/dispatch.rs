//! The Operator Dispatch Table.
//!
//! A fixed mapping from interceptable operator symbols to node constructors,
//! or to unsupported markers for the symbols the graph engine cannot
//! execute. Construction consults the Coercion Engine before wiring any
//! operand, so every Operator node's inputs satisfy its declared requirement
//! by the time the node exists.

use crate::graph::{NodeId, NodeKind, OpKind, Registry};
use crate::lattice::coerce::{self, Requirement};
use crate::lattice::{self, LatticeType};

/// An operand as seen at the intercept point, before lifting.
#[derive(Debug, Clone)]
pub(crate) enum Operand {
    /// A plain host value not yet in the graph.
    Plain(f64),
    /// An already-traced graph node.
    Node(NodeId),
    /// A host value with no graph representation (reported in place of the
    /// operator symbol).
    Text(String),
}

/// Interceptable binary operator symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Rem,
}

impl BinOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Rem => "%",
        }
    }

    /// Host-level evaluation for two plain operands, where the host notation
    /// defines the operation on numbers. `None` means the symbol has no
    /// numeric meaning and must be dispatched as a graph construct.
    pub(crate) fn host_eval(self, a: f64, b: f64) -> Option<f64> {
        match self {
            BinOp::Add => Some(a + b),
            BinOp::Sub => Some(a - b),
            BinOp::Mul => Some(a * b),
            BinOp::Div => Some(a / b),
            BinOp::Rem => Some(a % b),
            _ => None,
        }
    }
}

fn lift(reg: &mut Registry, operand: &Operand) -> NodeId {
    match operand {
        Operand::Plain(v) => reg.constant(*v),
        Operand::Node(n) => *n,
        Operand::Text(s) => reg.unsupported(s.clone(), &[]),
    }
}

fn is_unsupported(reg: &Registry, id: NodeId) -> bool {
    matches!(reg.kind(id), NodeKind::Unsupported(_))
}

/// Coercion with the no-silent-drop guarantee: a failed resolution leaves an
/// unsupported marker in place of the operand so the reporter names it.
/// Unsupported operands pass through untouched; the marker that is already in
/// the graph precedes anything built here.
fn meet_or_mark(reg: &mut Registry, node: NodeId, req: Requirement) -> NodeId {
    if is_unsupported(reg, node) {
        return node;
    }
    match coerce::meet(reg, node, req) {
        Ok(n) => n,
        Err(e) => reg.unsupported(e.actual.name().to_string(), &[node]),
    }
}

/// Builds a typed node for `lhs <op> rhs`, or an unsupported marker when the
/// table has no constructor for the symbol.
pub(crate) fn binary(reg: &mut Registry, op: BinOp, lhs: Operand, rhs: Operand) -> NodeId {
    match op {
        BinOp::Add => {
            let l = lift(reg, &lhs);
            let r = lift(reg, &rhs);
            add(reg, l, r)
        }
        BinOp::Sub => sub(reg, lhs, rhs),
        BinOp::Mul => {
            let l = lift(reg, &lhs);
            let r = lift(reg, &rhs);
            mul(reg, l, r)
        }
        _ => {
            let l = lift(reg, &lhs);
            let r = lift(reg, &rhs);
            reg.unsupported(op.symbol().to_string(), &[l, r])
        }
    }
}

/// Unary negation: lift, then a distinct Negate node whose result flips the
/// input's sign class.
pub(crate) fn negate(reg: &mut Registry, operand: Operand) -> NodeId {
    let x = lift(reg, &operand);
    neg_node(reg, x)
}

/// Bitwise invert and any other unary symbol without a constructor.
pub(crate) fn unary_unsupported(reg: &mut Registry, symbol: &str, operand: Operand) -> NodeId {
    let x = lift(reg, &operand);
    reg.unsupported(symbol.to_string(), &[x])
}

fn add(reg: &mut Registry, l: NodeId, r: NodeId) -> NodeId {
    if is_unsupported(reg, l) || is_unsupported(reg, r) {
        return reg.operator(OpKind::Add, &[l, r], LatticeType::Real);
    }
    let target = lattice::additive_target(reg.type_of(l), reg.type_of(r));
    let l = meet_or_mark(reg, l, Requirement::Exactly(target));
    let r = meet_or_mark(reg, r, Requirement::Exactly(target));
    reg.operator(OpKind::Add, &[l, r], target)
}

fn mul(reg: &mut Registry, l: NodeId, r: NodeId) -> NodeId {
    if is_unsupported(reg, l) || is_unsupported(reg, r) {
        return reg.operator(OpKind::Multiply, &[l, r], LatticeType::Real);
    }
    let target = lattice::multiplicative_target(reg.type_of(l), reg.type_of(r));
    let l = meet_or_mark(reg, l, Requirement::Exactly(target));
    let r = meet_or_mark(reg, r, Requirement::Exactly(target));
    reg.operator(OpKind::Multiply, &[l, r], target)
}

/// Subtraction never emits a native subtract node. `1 - p` over a
/// Probability-bounded value lowers to a complement node; everything else
/// lowers to addition of the negation.
fn sub(reg: &mut Registry, lhs: Operand, rhs: Operand) -> NodeId {
    let lhs_is_one = match &lhs {
        Operand::Plain(v) => *v == 1.0,
        Operand::Node(n) => matches!(reg.kind(*n), NodeKind::Constant(v) if *v == 1.0),
        Operand::Text(_) => false,
    };
    let r = lift(reg, &rhs);
    if lhs_is_one
        && !is_unsupported(reg, r)
        && lattice::le(reg.type_of(r), LatticeType::Probability)
    {
        let ty = reg.type_of(r);
        return reg.operator(OpKind::Complement, &[r], ty);
    }
    let l = lift(reg, &lhs);
    let neg = neg_node(reg, r);
    add(reg, l, neg)
}

fn neg_node(reg: &mut Registry, x: NodeId) -> NodeId {
    if is_unsupported(reg, x) {
        return reg.operator(OpKind::Negate, &[x], LatticeType::Real);
    }
    let class = lattice::sign_class(reg.type_of(x));
    let x = meet_or_mark(reg, x, Requirement::Exactly(class));
    reg.operator(OpKind::Negate, &[x], lattice::flip_sign(class))
}

/// `exp` of a non-positive value lands in the unit interval; anything else
/// is evaluated over the reals and stays positive.
pub(crate) fn exp(reg: &mut Registry, x: NodeId) -> NodeId {
    if !is_unsupported(reg, x) && reg.type_of(x) == LatticeType::NegReal {
        return reg.operator(OpKind::Exp, &[x], LatticeType::Probability);
    }
    let x = meet_or_mark(reg, x, Requirement::Exactly(LatticeType::Real));
    reg.operator(OpKind::Exp, &[x], LatticeType::PosReal)
}

/// `expm1` preserves the sign class of its input.
pub(crate) fn expm1(reg: &mut Registry, x: NodeId) -> NodeId {
    if is_unsupported(reg, x) {
        return reg.operator(OpKind::ExpM1, &[x], LatticeType::Real);
    }
    let class = lattice::sign_class(reg.type_of(x));
    let x = meet_or_mark(reg, x, Requirement::Exactly(class));
    reg.operator(OpKind::ExpM1, &[x], class)
}

/// The logistic function consumes exactly Real, even where a narrower input
/// type is semantically implied, and always yields a Probability.
pub(crate) fn logistic(reg: &mut Registry, x: NodeId) -> NodeId {
    let x = meet_or_mark(reg, x, Requirement::Exactly(LatticeType::Real));
    reg.operator(OpKind::Logistic, &[x], LatticeType::Probability)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Family;

    fn prob_sample(reg: &mut Registry) -> NodeId {
        let c = reg.constant(2.0);
        let d = reg.distribution(Family::Beta, &[c, c]);
        reg.sample(d)
    }

    fn posreal_sample(reg: &mut Registry) -> NodeId {
        let c = reg.constant(1.0);
        let d = reg.distribution(Family::HalfCauchy, &[c]);
        reg.sample(d)
    }

    #[test]
    fn addition_of_two_probabilities_promotes_to_posreal() {
        let mut reg = Registry::new();
        let s = prob_sample(&mut reg);
        let sum = add(&mut reg, s, s);
        assert_eq!(reg.type_of(sum), LatticeType::PosReal);
        // One ToPosReal per operand slot, shared node since both slots hold s.
        let inputs = reg.parents(sum).to_vec();
        assert_eq!(inputs.len(), 2);
        for i in inputs {
            assert_eq!(reg.kind(i), &NodeKind::Operator(OpKind::ToPosReal));
        }
    }

    #[test]
    fn multiplication_of_two_probabilities_stays_probability() {
        let mut reg = Registry::new();
        let s = prob_sample(&mut reg);
        let before = reg.count();
        let prod = mul(&mut reg, s, s);
        assert_eq!(reg.type_of(prod), LatticeType::Probability);
        assert_eq!(reg.parents(prod), &[s, s]);
        assert_eq!(reg.count(), before + 1);
    }

    #[test]
    fn subtraction_lowers_to_negate_plus_add() {
        let mut reg = Registry::new();
        let n = posreal_sample(&mut reg);
        let m = posreal_sample(&mut reg);
        let diff = sub(&mut reg, Operand::Node(n), Operand::Node(m));
        assert_eq!(reg.kind(diff), &NodeKind::Operator(OpKind::Add));
        // Right input chain: ToReal over Negate over m.
        let rhs = reg.parents(diff)[1];
        assert_eq!(reg.kind(rhs), &NodeKind::Operator(OpKind::ToReal));
        let neg = reg.parents(rhs)[0];
        assert_eq!(reg.kind(neg), &NodeKind::Operator(OpKind::Negate));
        assert_eq!(reg.parents(neg), &[m]);
        assert_eq!(reg.type_of(neg), LatticeType::NegReal);
    }

    #[test]
    fn one_minus_probability_is_a_complement() {
        let mut reg = Registry::new();
        let s = prob_sample(&mut reg);
        let c = sub(&mut reg, Operand::Plain(1.0), Operand::Node(s));
        assert_eq!(reg.kind(c), &NodeKind::Operator(OpKind::Complement));
        assert_eq!(reg.type_of(c), LatticeType::Probability);
        assert_eq!(reg.parents(c), &[s]);
        // No constant node for the 1 was materialized.
        assert!(!reg.ids().any(|i| matches!(reg.kind(i), NodeKind::Constant(v) if *v == 1.0)));
    }

    #[test]
    fn one_minus_posreal_takes_the_general_path() {
        let mut reg = Registry::new();
        let s = posreal_sample(&mut reg);
        let r = sub(&mut reg, Operand::Plain(1.0), Operand::Node(s));
        assert_eq!(reg.kind(r), &NodeKind::Operator(OpKind::Add));
    }

    #[test]
    fn exp_of_negreal_is_a_probability() {
        let mut reg = Registry::new();
        let s = posreal_sample(&mut reg);
        let n = negate(&mut reg, Operand::Node(s));
        assert_eq!(reg.type_of(n), LatticeType::NegReal);
        let e = exp(&mut reg, n);
        assert_eq!(reg.type_of(e), LatticeType::Probability);
        assert_eq!(reg.parents(e), &[n]);
    }

    #[test]
    fn bitwise_symbols_build_unsupported_markers() {
        let mut reg = Registry::new();
        let s = prob_sample(&mut reg);
        let m = binary(&mut reg, BinOp::BitAnd, Operand::Node(s), Operand::Node(s));
        assert_eq!(reg.kind(m), &NodeKind::Unsupported("&".to_string()));
        assert_eq!(reg.parents(m), &[s, s]);
    }

    #[test]
    fn text_operands_become_input_less_markers() {
        let mut reg = Registry::new();
        let s = prob_sample(&mut reg);
        let a = binary(
            &mut reg,
            BinOp::Add,
            Operand::Node(s),
            Operand::Text("foo".to_string()),
        );
        assert_eq!(reg.kind(a), &NodeKind::Operator(OpKind::Add));
        let marker = reg.parents(a)[1];
        assert_eq!(reg.kind(marker), &NodeKind::Unsupported("foo".to_string()));
        assert!(reg.parents(marker).is_empty());
    }
}
