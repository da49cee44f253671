//! Error taxonomy for the reasoner.
//!
//! Mirrors how the rest of this workspace reports fallible operations:
//! a small `derive_more`-backed error enum tagging the failure mode, wrapped
//! in a [`problemo::Problem`] at the boundary via the `.via(...)` extension
//! from [`problemo::ProblemResult`].

use derive_more::{Display, Error};

/// Failure modes surfaced by the reasoner and term store.
///
/// Configuration and shape errors are caller mistakes and fail fast, before
/// any iteration runs. They are not used for non-convergence or infeasible
/// constraints — those are reported through [`crate::reasoner::SolveReport`]
/// instead, since they are expected outcomes of a correct solve, not bugs.
#[derive(Debug, Display, Error, PartialEq)]
pub enum AdmmError {
    /// An `Options` value that cannot be used to run a solve, e.g. a
    /// non-positive step size or a zero iteration budget.
    #[display("invalid ADMM configuration: {_0}")]
    Configuration(String),

    /// A term store that does not match the shape the reasoner expects,
    /// e.g. an empty store or a global index referenced by no term.
    #[display("term store shape error: {_0}")]
    Shape(String),

    /// The parallel worker pool could not be built with the requested
    /// thread count.
    #[display("failed to build worker pool: {_0}")]
    Pool(String),
}
