//! Entry points handed to the model-declaration and inference collaborators.
//!
//! Both operations trace and validate identically; rendering never invokes
//! the executor, and inference hands the frozen graph over only when no
//! unsupported construct is reachable from a requested query.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use crate::display::dot;
use crate::error::CompileError;
use crate::graph::{NodeId, Registry};
use crate::model::RandomVariable;
use crate::report;
use crate::trace::{Expr, Tracer};

/// A requested query: a callable traced once under the compile's tracer.
pub type QueryFn<'a> = &'a dyn Fn(&Tracer) -> Expr;

/// Binds an observed concrete value to a random-variable invocation.
pub struct Observation {
    pub variable: RandomVariable,
    pub args: Vec<i64>,
    pub value: f64,
}

impl Observation {
    pub fn new(variable: &RandomVariable, args: &[i64], value: f64) -> Self {
        Self {
            variable: variable.clone(),
            args: args.to_vec(),
            value,
        }
    }
}

/// The external inference engine seam. Implementations may read the frozen
/// graph concurrently; the graph is immutable and side-effect-free once
/// handed over.
pub trait GraphExecutor {
    type Output;

    /// Runs inference over the frozen graph. `observations` maps Sample
    /// node ids to their observed values.
    fn execute(
        &mut self,
        graph: &Registry,
        queries: &[NodeId],
        observations: &BTreeMap<NodeId, f64>,
        num_samples: NonZeroU32,
    ) -> Self::Output;
}

/// Traces the queries and observations into a frozen graph, failing fast on
/// the first unsupported construct reachable from a requested query.
fn compile(
    queries: &[QueryFn<'_>],
    observations: &[Observation],
) -> Result<(Registry, Vec<NodeId>, BTreeMap<NodeId, f64>), CompileError> {
    let tracer = Tracer::new();
    let mut query_ids = Vec::with_capacity(queries.len());
    for query in queries {
        let expr = query(&tracer);
        query_ids.push(tracer.attach_query(expr));
        let violation = {
            let st = tracer.state.borrow();
            report::first_violation(&st.reg, &query_ids)
        };
        if let Some(diagnostic) = violation {
            return Err(diagnostic.into());
        }
    }

    let mut observed = BTreeMap::new();
    let mut roots = query_ids.clone();
    for obs in observations {
        let sample = tracer.sample(&obs.variable, &obs.args);
        let id = tracer.lift_to_node(&sample);
        observed.insert(id, obs.value);
        roots.push(id);
        let violation = {
            let st = tracer.state.borrow();
            report::first_violation(&st.reg, &roots)
        };
        if let Some(diagnostic) = violation {
            return Err(diagnostic.into());
        }
    }

    Ok((tracer.finish(), query_ids, observed))
}

/// Renders the compiled graph in its deterministic text form without
/// invoking the executor.
pub fn to_dot(
    queries: &[QueryFn<'_>],
    observations: &[Observation],
) -> Result<String, CompileError> {
    let (reg, query_ids, observed) = compile(queries, observations)?;
    let mut roots = query_ids;
    roots.extend(observed.keys().copied());
    Ok(dot::to_dot(&reg, &roots))
}

/// Compiles and, when validation passes, hands the frozen graph, the query
/// nodes, the observation mapping and the sample count to the executor.
pub fn infer<E: GraphExecutor>(
    executor: &mut E,
    queries: &[QueryFn<'_>],
    observations: &[Observation],
    num_samples: NonZeroU32,
) -> Result<E::Output, CompileError> {
    let (reg, query_ids, observed) = compile(queries, observations)?;
    Ok(executor.execute(&reg, &query_ids, &observed, num_samples))
}
