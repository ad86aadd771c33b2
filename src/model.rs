//! The model-declaration seam.
//!
//! The full declaration layer (decorating callables, proxy materialization)
//! is an external collaborator; this module carries only what the tracer
//! needs from it: a callable with a stable identity that yields a
//! distribution when invoked under a tracer.

use std::rc::Rc;

use crate::graph::Family;
use crate::trace::{Expr, Tracer};

type Body = Rc<dyn Fn(&Tracer, &[i64]) -> DistributionSpec>;

/// A model-defining callable. Cloning shares the underlying body, so clones
/// memoize together; two separately declared variables never do, even with
/// identical bodies.
#[derive(Clone)]
pub struct RandomVariable {
    body: Body,
}

impl RandomVariable {
    pub fn new(body: impl Fn(&Tracer, &[i64]) -> DistributionSpec + 'static) -> Self {
        Self {
            body: Rc::new(body),
        }
    }

    /// Callable identity for memoization: the address of the shared body.
    /// Only meaningful while some clone of the variable is alive; the tracer
    /// retains a clone for each identity it keys on.
    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.body) as *const () as usize
    }

    pub(crate) fn build(&self, tracer: &Tracer, args: &[i64]) -> DistributionSpec {
        (self.body)(tracer, args)
    }
}

/// A distribution family applied to traced parameters, as returned by a
/// random-variable body.
pub struct DistributionSpec {
    pub(crate) family: Family,
    pub(crate) params: Vec<Expr>,
}

impl DistributionSpec {
    pub fn beta(alpha: Expr, beta: Expr) -> Self {
        Self {
            family: Family::Beta,
            params: vec![alpha, beta],
        }
    }

    pub fn normal(mean: Expr, std_dev: Expr) -> Self {
        Self {
            family: Family::Normal,
            params: vec![mean, std_dev],
        }
    }

    pub fn half_cauchy(scale: Expr) -> Self {
        Self {
            family: Family::HalfCauchy,
            params: vec![scale],
        }
    }

    pub fn bernoulli(prob: Expr) -> Self {
        Self {
            family: Family::Bernoulli,
            params: vec![prob],
        }
    }

    pub fn binomial(count: Expr, prob: Expr) -> Self {
        Self {
            family: Family::Binomial,
            params: vec![count, prob],
        }
    }
}
