use serde::{Deserialize, Serialize};

use crate::lattice::coerce::Requirement;
use crate::lattice::LatticeType;

/// A unique, stable identifier for a node within the graph.
///
/// Ids are dense, zero-based and strictly increasing by creation order; they
/// are never reused or renumbered once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
    pub fn new(idx: usize) -> Self {
        Self(idx as u32)
    }
}

/// A distribution family known to the graph engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Family {
    Beta,
    Normal,
    HalfCauchy,
    Bernoulli,
    Binomial,
}

impl Family {
    pub fn name(&self) -> &'static str {
        match self {
            Family::Beta => "Beta",
            Family::Normal => "Normal",
            Family::HalfCauchy => "HalfCauchy",
            Family::Bernoulli => "Bernoulli",
            Family::Binomial => "Binomial",
        }
    }

    /// Per-slot parameter requirements, in declaration order.
    ///
    /// Parameter slots accept any subtype as-is; only a value outside the
    /// slot's bound forces a converter node.
    pub fn param_requirements(&self) -> &'static [Requirement] {
        use LatticeType::*;
        match self {
            Family::Beta => &[Requirement::Within(PosReal), Requirement::Within(PosReal)],
            Family::Normal => &[Requirement::Within(Real), Requirement::Within(PosReal)],
            Family::HalfCauchy => &[Requirement::Within(PosReal)],
            Family::Bernoulli => &[Requirement::Within(Probability)],
            Family::Binomial => &[Requirement::Within(PosInt), Requirement::Within(Probability)],
        }
    }

    /// Lattice type of a sample drawn from this family.
    pub fn sample_type(&self) -> LatticeType {
        match self {
            Family::Beta => LatticeType::Probability,
            Family::Normal => LatticeType::Real,
            Family::HalfCauchy => LatticeType::PosReal,
            Family::Bernoulli => LatticeType::Boolean,
            Family::Binomial => LatticeType::PosInt,
        }
    }
}

/// The operation performed by an Operator node.
///
/// The three `To*` variants are coercion nodes: operator-like nodes that
/// re-tag a value's lattice type without changing its numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    Add,
    Multiply,
    Negate,
    Exp,
    ExpM1,
    Logistic,
    Complement,
    ToProbability,
    ToPosReal,
    ToReal,
}

impl OpKind {
    /// Display label, as rendered in the DOT output and in diagnostics.
    pub fn symbol(&self) -> &'static str {
        match self {
            OpKind::Add => "+",
            OpKind::Multiply => "*",
            OpKind::Negate => "-",
            OpKind::Exp => "Exp",
            OpKind::ExpM1 => "ExpM1",
            OpKind::Logistic => "Logistic",
            OpKind::Complement => "complement",
            OpKind::ToProbability => "ToProbability",
            OpKind::ToPosReal => "ToPosReal",
            OpKind::ToReal => "ToReal",
        }
    }
}

/// The primary enum representing a node in the computation graph.
///
/// Nodes are immutable once created. The inputs (parents) and lattice tag
/// live in the registry's columnar arrays; this enum holds the kind-specific
/// payload only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// A concrete value lifted into the graph.
    Constant(f64),
    /// A distribution; its parameter nodes are the inputs.
    Distribution(Family),
    /// A draw from the single input distribution node.
    Sample,
    Operator(OpKind),
    /// Marks the single input as a requested inference output.
    Query,
    /// A construct the graph engine cannot execute, kept in the graph so the
    /// reporter can name it and its position. Payload is the display text.
    Unsupported(String),
}
