//! The Expression Tracer.
//!
//! Drives one execution of the model code, threading a single node store
//! through every interception. The store is owned exclusively by one compile;
//! the graph freezes the instant the last requested query has been traced.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use smallvec::SmallVec;

use super::expr::{Expr, Repr};
use crate::graph::{NodeId, Registry};
use crate::lattice::coerce;
use crate::model::RandomVariable;

type MemoKey = (usize, SmallVec<[i64; 2]>);

#[derive(Clone, Default)]
pub(crate) struct TraceState {
    pub(crate) reg: Registry,
    /// (callable identity, argument tuple) -> Sample node. Lookup order never
    /// leaks into id assignment; ids follow trace order alone.
    memo: HashMap<MemoKey, NodeId>,
    /// Variables holding live memo keys. An identity is an allocation
    /// address, so every keyed body must outlive the compile; otherwise a
    /// later variable could reuse the address and alias a dead key.
    retained: Vec<RandomVariable>,
}

/// The tracing context handed to model code. One tracer owns one node store
/// end to end; two tracers never share a store.
pub struct Tracer {
    pub(crate) state: Rc<RefCell<TraceState>>,
}

impl Tracer {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(TraceState::default())),
        }
    }

    /// Wraps a plain host value. No node is created until the value meets a
    /// traced quantity.
    pub fn lift(&self, value: f64) -> Expr {
        Expr::with(self.state.clone(), Repr::Plain(value))
    }

    /// Invokes a random variable, memoized per (callable identity, argument
    /// tuple): identical keys reuse the already-built Distribution+Sample
    /// pair, distinct argument tuples build independent pairs.
    pub fn sample(&self, variable: &RandomVariable, args: &[i64]) -> Expr {
        let key: MemoKey = (variable.identity(), SmallVec::from_slice(args));
        if let Some(&node) = self.state.borrow().memo.get(&key) {
            return Expr::with(self.state.clone(), Repr::Node(node));
        }

        // The body may recurse into other random variables; no borrow is
        // held while it runs.
        let spec = variable.build(self, args);

        let node = {
            let st = &mut *self.state.borrow_mut();
            let mut params: SmallVec<[NodeId; 2]> = SmallVec::new();
            let reqs = spec.family.param_requirements();
            for (i, p) in spec.params.iter().enumerate() {
                let raw = match p.repr {
                    Repr::Plain(v) => st.reg.constant(v),
                    Repr::Node(n) => n,
                };
                // A parameter outside its slot's bound is the inference
                // engine's problem, not a graph-construction failure; it is
                // wired as-is when no coercion path exists.
                let wired = match reqs.get(i) {
                    Some(&req) => coerce::meet(&mut st.reg, raw, req).unwrap_or(raw),
                    None => raw,
                };
                params.push(wired);
            }
            let dist = st.reg.distribution(spec.family, &params);
            let sample = st.reg.sample(dist);
            st.memo.insert(key, sample);
            st.retained.push(variable.clone());
            sample
        };
        Expr::with(self.state.clone(), Repr::Node(node))
    }

    /// Forces an expression into the graph, lifting a still-plain value
    /// through the constant dedup.
    pub(crate) fn lift_to_node(&self, expr: &Expr) -> NodeId {
        match expr.repr {
            Repr::Node(n) => n,
            Repr::Plain(v) => self.state.borrow_mut().reg.constant(v),
        }
    }

    /// Marks a traced expression as a requested inference output.
    pub(crate) fn attach_query(&self, expr: Expr) -> NodeId {
        let target = self.lift_to_node(&expr);
        self.state.borrow_mut().reg.query(target)
    }

    /// Freezes and surrenders the graph. After this point no node can be
    /// created, mutated or deleted.
    pub(crate) fn finish(self) -> Registry {
        match Rc::try_unwrap(self.state) {
            Ok(cell) => cell.into_inner().reg,
            // A model closure kept a value alive past the compile; the store
            // is still frozen from the caller's point of view.
            Err(shared) => shared.borrow().reg.clone(),
        }
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Family, NodeKind};
    use crate::model::DistributionSpec;

    fn beta_rv() -> RandomVariable {
        RandomVariable::new(|t, _| DistributionSpec::beta(t.lift(2.0), t.lift(2.0)))
    }

    #[test]
    fn identical_invocations_reuse_the_node_pair() {
        let t = Tracer::new();
        let rv = beta_rv();
        let a = t.lift_to_node(&t.sample(&rv, &[]));
        let b = t.lift_to_node(&t.sample(&rv, &[]));
        assert_eq!(a, b);
        // 2.0 constant, Beta, Sample: three nodes total.
        assert_eq!(t.state.borrow().reg.count(), 3);
    }

    #[test]
    fn distinct_argument_tuples_build_independent_pairs() {
        let t = Tracer::new();
        let rv = RandomVariable::new(|t, _| DistributionSpec::half_cauchy(t.lift(1.0)));
        let a = t.lift_to_node(&t.sample(&rv, &[0]));
        let b = t.lift_to_node(&t.sample(&rv, &[1]));
        assert_ne!(a, b);
        let st = t.state.borrow();
        assert_ne!(st.reg.parents(a)[0], st.reg.parents(b)[0]);
    }

    #[test]
    fn distinct_variables_with_equal_bodies_stay_distinct() {
        let t = Tracer::new();
        let a = t.lift_to_node(&t.sample(&beta_rv(), &[]));
        let b = t.lift_to_node(&t.sample(&beta_rv(), &[]));
        assert_ne!(a, b);
    }

    #[test]
    fn dropped_variables_never_collide_with_later_ones() {
        let t = Tracer::new();
        let first = {
            let tmp = beta_rv();
            t.lift_to_node(&t.sample(&tmp, &[]))
        };
        // The temporary's allocation may be recycled for the next variable;
        // its memo key must not resolve to the dead variable's nodes.
        let fresh = beta_rv();
        let second = t.lift_to_node(&t.sample(&fresh, &[]));
        assert_ne!(first, second);
        // Shared 2.0 constant plus two independent Beta+Sample pairs.
        assert_eq!(t.state.borrow().reg.count(), 5);
    }

    #[test]
    fn nested_invocation_is_traced_once() {
        let t = Tracer::new();
        let inner = RandomVariable::new(|t, _| DistributionSpec::beta(t.lift(2.0), t.lift(2.0)));
        let outer = {
            let inner = inner.clone();
            RandomVariable::new(move |t, _| DistributionSpec::bernoulli(t.sample(&inner, &[])))
        };
        let s = t.lift_to_node(&t.sample(&outer, &[]));
        let inner_again = t.lift_to_node(&t.sample(&inner, &[]));
        let st = t.state.borrow();
        assert_eq!(st.reg.kind(s), &NodeKind::Sample);
        assert_eq!(
            st.reg.kind(st.reg.parents(s)[0]),
            &NodeKind::Distribution(Family::Bernoulli)
        );
        // The Bernoulli's parameter is the memoized Beta sample.
        assert_eq!(st.reg.parents(st.reg.parents(s)[0]), &[inner_again]);
    }

    #[test]
    fn plain_values_stay_host_level_until_combined() {
        let t = Tracer::new();
        let x = t.lift(3.0);
        let y = x * 2.0 + 1.0; // host arithmetic only
        assert_eq!(t.state.borrow().reg.count(), 0);
        let rv = beta_rv();
        let _z = t.sample(&rv, &[]) * y;
        assert!(t.state.borrow().reg.count() > 0);
    }
}
