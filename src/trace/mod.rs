//! Tracing: operator interception, dispatch and the per-compile context.

pub(crate) mod dispatch;
mod expr;
mod tracer;

pub use expr::Expr;
pub use tracer::Tracer;
