//! The traced-value proxy.
//!
//! Model code performs ordinary Rust arithmetic over [`Expr`] values; the
//! `std::ops` implementations below are the intercept points that route every
//! operation through the dispatch table. Plain host values stay host-level
//! until they meet a traced value, at which point they are lifted through the
//! store's constant dedup.
//!
//! Rebinding a variable (including `+=`/`-=`/`*=`) only changes which node
//! the name denotes; nodes are never mutated. A consequence the compiler
//! inherits from the host notation: when a plain mutable container is aliased
//! by two names and mutated in place, the trace captures its value at the
//! moment it first meets a traced value, and later mutations through the
//! other name are not observed. This divergence is accepted and documented,
//! not corrected.

use std::cell::RefCell;
use std::ops;
use std::rc::Rc;

use super::dispatch::{self, BinOp, Operand};
use super::tracer::TraceState;
use crate::graph::NodeId;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Repr {
    /// A plain host value not yet lifted into the graph.
    Plain(f64),
    /// A traced graph node.
    Node(NodeId),
}

/// A value flowing through a traced model: either a plain host number or a
/// handle to a graph node. Cloning is cheap and shares the trace context.
#[derive(Clone)]
pub struct Expr {
    pub(crate) state: Rc<RefCell<TraceState>>,
    pub(crate) repr: Repr,
}

impl Expr {
    pub(crate) fn with(state: Rc<RefCell<TraceState>>, repr: Repr) -> Self {
        Self { state, repr }
    }

    fn operand(&self) -> Operand {
        match self.repr {
            Repr::Plain(v) => Operand::Plain(v),
            Repr::Node(n) => Operand::Node(n),
        }
    }

    fn binary(self, rhs: Expr, op: BinOp) -> Expr {
        debug_assert!(
            Rc::ptr_eq(&self.state, &rhs.state),
            "operands belong to different tracer contexts"
        );
        if let (Repr::Plain(a), Repr::Plain(b)) = (&self.repr, &rhs.repr) {
            if let Some(v) = op.host_eval(*a, *b) {
                return Expr::with(self.state, Repr::Plain(v));
            }
        }
        let node = {
            let st = &mut *self.state.borrow_mut();
            dispatch::binary(&mut st.reg, op, self.operand(), rhs.operand())
        };
        Expr::with(self.state, Repr::Node(node))
    }

    fn binary_text(self, text: &str, op: BinOp, text_on_left: bool) -> Expr {
        let node = {
            let st = &mut *self.state.borrow_mut();
            let t = Operand::Text(text.to_string());
            if text_on_left {
                dispatch::binary(&mut st.reg, op, t, self.operand())
            } else {
                dispatch::binary(&mut st.reg, op, self.operand(), t)
            }
        };
        Expr::with(self.state, Repr::Node(node))
    }

    fn lift_plain(&self, v: f64) -> Expr {
        Expr::with(self.state.clone(), Repr::Plain(v))
    }

    fn unary_node(self, f: impl FnOnce(&mut crate::graph::Registry, NodeId) -> NodeId) -> Expr {
        let node = {
            let st = &mut *self.state.borrow_mut();
            let x = match self.repr {
                Repr::Plain(v) => st.reg.constant(v),
                Repr::Node(n) => n,
            };
            f(&mut st.reg, x)
        };
        Expr::with(self.state, Repr::Node(node))
    }

    /// Unary plus: erased at trace time. Produces no node; the traced value
    /// is the operand, unchanged.
    pub fn plus(self) -> Expr {
        self
    }

    pub fn exp(self) -> Expr {
        if let Repr::Plain(v) = self.repr {
            return self.lift_plain(v.exp());
        }
        self.unary_node(dispatch::exp)
    }

    pub fn expm1(self) -> Expr {
        if let Repr::Plain(v) = self.repr {
            return self.lift_plain(v.exp_m1());
        }
        self.unary_node(dispatch::expm1)
    }

    /// The logistic (sigmoid) function.
    pub fn sigmoid(self) -> Expr {
        if let Repr::Plain(v) = self.repr {
            return self.lift_plain(1.0 / (1.0 + (-v).exp()));
        }
        self.unary_node(dispatch::logistic)
    }
}

// --- Binary operators between traced values ---

macro_rules! expr_binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl ops::$trait for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                self.binary(rhs, $op)
            }
        }
    };
}

expr_binop!(Add, add, BinOp::Add);
expr_binop!(Sub, sub, BinOp::Sub);
expr_binop!(Mul, mul, BinOp::Mul);
expr_binop!(Div, div, BinOp::Div);
expr_binop!(BitAnd, bitand, BinOp::BitAnd);
expr_binop!(BitOr, bitor, BinOp::BitOr);
expr_binop!(BitXor, bitxor, BinOp::BitXor);
expr_binop!(Shl, shl, BinOp::Shl);
expr_binop!(Shr, shr, BinOp::Shr);
expr_binop!(Rem, rem, BinOp::Rem);

// --- Mixed arithmetic with plain host numbers ---

macro_rules! expr_f64_binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl ops::$trait<f64> for Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                let rhs = self.lift_plain(rhs);
                self.binary(rhs, $op)
            }
        }
        impl ops::$trait<Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                let lhs = rhs.lift_plain(self);
                lhs.binary(rhs, $op)
            }
        }
    };
}

expr_f64_binop!(Add, add, BinOp::Add);
expr_f64_binop!(Sub, sub, BinOp::Sub);
expr_f64_binop!(Mul, mul, BinOp::Mul);

// --- Non-liftable (textual) operands ---

impl ops::Add<&str> for Expr {
    type Output = Expr;
    fn add(self, rhs: &str) -> Expr {
        self.binary_text(rhs, BinOp::Add, false)
    }
}

impl ops::Add<Expr> for &str {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        rhs.binary_text(self, BinOp::Add, true)
    }
}

impl ops::Mul<&str> for Expr {
    type Output = Expr;
    fn mul(self, rhs: &str) -> Expr {
        self.binary_text(rhs, BinOp::Mul, false)
    }
}

// --- Unary operators ---

impl ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        if let Repr::Plain(v) = self.repr {
            return self.lift_plain(-v);
        }
        let node = {
            let st = &mut *self.state.borrow_mut();
            dispatch::negate(&mut st.reg, self.operand())
        };
        Expr::with(self.state, Repr::Node(node))
    }
}

impl ops::Not for Expr {
    type Output = Expr;
    fn not(self) -> Expr {
        let node = {
            let st = &mut *self.state.borrow_mut();
            dispatch::unary_unsupported(&mut st.reg, "!", self.operand())
        };
        Expr::with(self.state, Repr::Node(node))
    }
}

// --- Augmented assignment: rebinds the name to a new node ---

macro_rules! expr_assign {
    ($trait:ident, $method:ident, $op:tt) => {
        impl ops::$trait for Expr {
            fn $method(&mut self, rhs: Expr) {
                *self = self.clone() $op rhs;
            }
        }
        impl ops::$trait<f64> for Expr {
            fn $method(&mut self, rhs: f64) {
                *self = self.clone() $op rhs;
            }
        }
    };
}

expr_assign!(AddAssign, add_assign, +);
expr_assign!(SubAssign, sub_assign, -);
expr_assign!(MulAssign, mul_assign, *);
