//! The numeric subtype lattice.
//!
//! Every graph node carries one lattice tag. The partial order below governs
//! which values are substitutable where, and the Coercion Engine in
//! [`coerce`] decides when a converter node must be interposed.
//!
//! ```text
//!                 Tensor
//!                   |
//!                  Real
//!                 /    \
//!            PosReal   NegReal
//!            /     \
//!     Probability  PosInt
//!            \     /
//!            Boolean
//! ```
//!
//! `Probability`/`NegReal` and `Probability`/`PosInt` are incomparable.

pub mod coerce;

use serde::{Deserialize, Serialize};

/// A value of the numeric subtype lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LatticeType {
    Boolean,
    Probability,
    PosInt,
    PosReal,
    NegReal,
    Real,
    /// Unconstrained top element. Only unsupported markers carry it.
    Tensor,
}

/// Candidates in ascending order, used to pick least upper bounds.
const ASCENDING: [LatticeType; 7] = [
    LatticeType::Boolean,
    LatticeType::Probability,
    LatticeType::PosInt,
    LatticeType::NegReal,
    LatticeType::PosReal,
    LatticeType::Real,
    LatticeType::Tensor,
];

impl LatticeType {
    pub fn name(&self) -> &'static str {
        match self {
            LatticeType::Boolean => "Boolean",
            LatticeType::Probability => "Probability",
            LatticeType::PosInt => "PosInt",
            LatticeType::PosReal => "PosReal",
            LatticeType::NegReal => "NegReal",
            LatticeType::Real => "Real",
            LatticeType::Tensor => "Tensor",
        }
    }
}

/// True when `a` is a subtype of (or equal to) `b`.
pub fn le(a: LatticeType, b: LatticeType) -> bool {
    use LatticeType::*;
    if a == b || b == Tensor {
        return true;
    }
    matches!(
        (a, b),
        (Boolean, Probability | PosInt | PosReal | Real)
            | (Probability, PosReal | Real)
            | (PosInt, PosReal | Real)
            | (PosReal, Real)
            | (NegReal, Real)
    )
}

/// Least upper bound of two lattice values.
pub fn sup(a: LatticeType, b: LatticeType) -> LatticeType {
    for t in ASCENDING {
        if le(a, t) && le(b, t) {
            return t;
        }
    }
    LatticeType::Tensor
}

/// The most specific lattice value containing `v`.
pub fn natural_type_of(v: f64) -> LatticeType {
    if !v.is_finite() {
        return LatticeType::Real;
    }
    if v == 0.0 || v == 1.0 {
        LatticeType::Boolean
    } else if v > 0.0 && v < 1.0 {
        LatticeType::Probability
    } else if v > 0.0 && v.fract() == 0.0 {
        LatticeType::PosInt
    } else if v > 0.0 {
        LatticeType::PosReal
    } else {
        LatticeType::NegReal
    }
}

/// True when the value `v` is representable in type `t`.
///
/// Constants are flexible: a Constant node satisfies any requirement whose
/// type admits its value, with no converter node inserted.
pub fn admits(t: LatticeType, v: f64) -> bool {
    match t {
        LatticeType::Boolean => v == 0.0 || v == 1.0,
        LatticeType::Probability => (0.0..=1.0).contains(&v),
        LatticeType::PosInt => v >= 0.0 && v.fract() == 0.0 && v.is_finite(),
        LatticeType::PosReal => v >= 0.0,
        LatticeType::NegReal => v <= 0.0,
        LatticeType::Real | LatticeType::Tensor => true,
    }
}

/// The narrowest signed real type able to hold `t`: PosReal, NegReal or Real.
///
/// Negation and expm1 demand one of these exactly; a Probability input to
/// negation is first converted to PosReal, never consumed as-is.
pub fn sign_class(t: LatticeType) -> LatticeType {
    if le(t, LatticeType::PosReal) {
        LatticeType::PosReal
    } else if t == LatticeType::NegReal {
        LatticeType::NegReal
    } else {
        LatticeType::Real
    }
}

/// Result type of negation: the sign class of the input, flipped.
pub fn flip_sign(t: LatticeType) -> LatticeType {
    match t {
        LatticeType::PosReal => LatticeType::NegReal,
        LatticeType::NegReal => LatticeType::PosReal,
        other => other,
    }
}

/// Result/requirement type for an additive combination of `a` and `b`.
///
/// Both operands are promoted to this exact type. Conservative rule: the sum
/// of two non-negatives is PosReal, of two non-positives NegReal, anything
/// else Real.
pub fn additive_target(a: LatticeType, b: LatticeType) -> LatticeType {
    let s = sup(a, b);
    if le(s, LatticeType::PosReal) {
        LatticeType::PosReal
    } else if s == LatticeType::NegReal {
        LatticeType::NegReal
    } else {
        LatticeType::Real
    }
}

/// Result/requirement type for a multiplicative combination of `a` and `b`.
pub fn multiplicative_target(a: LatticeType, b: LatticeType) -> LatticeType {
    let s = sup(a, b);
    if le(s, LatticeType::Probability) {
        LatticeType::Probability
    } else if le(s, LatticeType::PosReal) {
        LatticeType::PosReal
    } else {
        LatticeType::Real
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use LatticeType::*;

    #[rstest]
    #[case(Boolean, Probability, true)]
    #[case(Boolean, PosInt, true)]
    #[case(Probability, PosReal, true)]
    #[case(PosInt, PosReal, true)]
    #[case(PosReal, Real, true)]
    #[case(NegReal, Real, true)]
    #[case(Boolean, Real, true)]
    #[case(Probability, NegReal, false)]
    #[case(NegReal, Probability, false)]
    #[case(Probability, PosInt, false)]
    #[case(PosInt, Probability, false)]
    #[case(Real, PosReal, false)]
    #[case(Real, Tensor, true)]
    fn partial_order(#[case] a: LatticeType, #[case] b: LatticeType, #[case] expected: bool) {
        assert_eq!(le(a, b), expected);
    }

    #[rstest]
    #[case(Probability, Probability, Probability)]
    #[case(Probability, PosInt, PosReal)]
    #[case(Probability, NegReal, Real)]
    #[case(Boolean, NegReal, Real)]
    #[case(NegReal, NegReal, NegReal)]
    #[case(PosReal, Real, Real)]
    #[case(Boolean, Boolean, Boolean)]
    fn least_upper_bound(#[case] a: LatticeType, #[case] b: LatticeType, #[case] expected: LatticeType) {
        assert_eq!(sup(a, b), expected);
        assert_eq!(sup(b, a), expected);
    }

    #[rstest]
    #[case(0.0, Boolean)]
    #[case(1.0, Boolean)]
    #[case(0.5, Probability)]
    #[case(2.0, PosInt)]
    #[case(3.5, PosReal)]
    #[case(-0.01, NegReal)]
    #[case(-3.0, NegReal)]
    #[case(f64::INFINITY, Real)]
    fn natural_typing(#[case] v: f64, #[case] expected: LatticeType) {
        assert_eq!(natural_type_of(v), expected);
    }

    #[rstest]
    #[case(PosReal, 2.0, true)]
    #[case(PosReal, -2.0, false)]
    #[case(Probability, 0.5, true)]
    #[case(Probability, 1.5, false)]
    #[case(PosInt, 3.0, true)]
    #[case(PosInt, 3.5, false)]
    #[case(NegReal, -0.5, true)]
    #[case(Real, f64::NAN, true)]
    fn value_admission(#[case] t: LatticeType, #[case] v: f64, #[case] expected: bool) {
        assert_eq!(admits(t, v), expected);
    }

    #[test]
    fn sign_classes() {
        assert_eq!(sign_class(Probability), PosReal);
        assert_eq!(sign_class(Boolean), PosReal);
        assert_eq!(sign_class(PosReal), PosReal);
        assert_eq!(sign_class(NegReal), NegReal);
        assert_eq!(sign_class(Real), Real);
        assert_eq!(flip_sign(PosReal), NegReal);
        assert_eq!(flip_sign(NegReal), PosReal);
        assert_eq!(flip_sign(Real), Real);
    }

    #[test]
    fn combination_targets() {
        assert_eq!(additive_target(Probability, Probability), PosReal);
        assert_eq!(additive_target(NegReal, NegReal), NegReal);
        assert_eq!(additive_target(Real, NegReal), Real);
        assert_eq!(additive_target(Boolean, NegReal), Real);
        assert_eq!(multiplicative_target(Probability, Probability), Probability);
        assert_eq!(multiplicative_target(Probability, PosInt), PosReal);
        assert_eq!(multiplicative_target(NegReal, Boolean), Real);
    }
}
