use std::any::Any;

use dyn_clone::DynClone;
use macros::build_options;

/// Floating point type used throughout the reasoner. Fixed at single
/// precision by design — see [`error`] for why this must not be silently
/// widened to `f64`.
pub type E = f32;
/// Index type for global (consensus) variables.
pub type I = u32;

pub mod atom_store;
pub mod callback;
pub mod config;
pub mod error;
pub mod hyperplane;
pub mod parallel;
pub mod reasoner;
pub mod term;
pub mod term_builder;
pub mod term_store;
pub mod terminators;
pub mod variable;

#[cfg(test)]
pub mod tests;

pub use atom_store::{AtomStore, AtomValues, HashMapAtomStore};
pub use callback::Callback;
pub use config::InitialValue;
pub use error::AdmmError;
pub use hyperplane::Hyperplane;
pub use parallel::ParallelPool;
pub use reasoner::{AdmmHooks, AdmmReasoner, IterationTelemetry, Reasoner, SolveReport};
pub use term::{InequalitySense, ObjectiveTerm};
pub use term_builder::TermBuilder;
pub use term_store::TermStore;
pub use terminators::Terminator;
pub use variable::{GlobalIndex, LocalVariable, LocalVariableRef};

pub trait OptionTrait: Any + Sync + Send + DynClone {}
impl OptionTrait for &'static str {}
impl OptionTrait for String {}
impl OptionTrait for bool {}
impl OptionTrait for usize {}
impl OptionTrait for u8 {}
impl OptionTrait for u16 {}
impl OptionTrait for u32 {}
impl OptionTrait for u64 {}
impl OptionTrait for i8 {}
impl OptionTrait for i16 {}
impl OptionTrait for i32 {}
impl OptionTrait for i64 {}
impl OptionTrait for f32 {}
impl OptionTrait for f64 {}

impl Clone for Box<dyn OptionTrait> {
    fn clone(&self) -> Self {
        dyn_clone::clone_box(&**self)
    }
}

/// Status codes reported by the reasoner after a solve.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Status {
    #[default]
    /// The solver is still running.
    InProgress,
    /// The residuals fell under tolerance with no constraint violations.
    Optimal,
    /// The iteration limit was reached with constraints still violated.
    Infeasible,
    /// The status is unknown or not determined.
    Unknown,
    /// The solver stopped due to a time limit.
    TimeLimit,
    /// The solver stopped because `maxIter` was reached without convergence.
    IterationLimit,
    /// The solver was interrupted (e.g., by user or signal).
    Interrupted,
}

build_options!(name = Options, registry_name = OPTION_REGISTRY);
