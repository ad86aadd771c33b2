//! The compile-time error surface.

use thiserror::Error;

use crate::report::Diagnostic;

/// Failure to compile a model into an executable graph.
///
/// Unsupported operators and unsupported operands surface through the same
/// kind, differentiated only by the diagnostic's message text. These are
/// fail-fast correctness failures: the first occurrence reachable from any
/// requested query aborts the whole compile and no partial graph is
/// returned. Failures from collaborators (the inference engine, the value
/// library) are theirs to report and never pass through here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Unsupported(#[from] Diagnostic),
}
