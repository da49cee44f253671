use macros::build_option_enum;

use crate::Options;
use crate::reasoner::IterationTelemetry;

/// Hook invoked once per ADMM iteration for logging, monitoring, or
/// recording a convergence trace.
pub trait Callback {
    /// Creates a new callback from the reasoner's options.
    fn new(options: &Options) -> Self
    where
        Self: Sized;

    /// Called at the end of each iteration with that iteration's telemetry.
    fn call(&mut self, telemetry: &IterationTelemetry);
}

/// A callback that does nothing. The default when no per-iteration output
/// is needed — `tracing` already records residuals at `debug`, so this is
/// not the only way to observe a solve.
pub struct NoOpCallback {}

impl Callback for NoOpCallback {
    fn new(_options: &Options) -> Self {
        Self {}
    }

    fn call(&mut self, _telemetry: &IterationTelemetry) {}
}

/// Prints primal/dual residuals and the current objective (when computed)
/// to stdout each iteration.
pub struct ConvergenceOutput {}

impl Callback for ConvergenceOutput {
    fn new(_options: &Options) -> Self {
        Self {}
    }

    fn call(&mut self, telemetry: &IterationTelemetry) {
        println!(
            "| {:6} | {:<10.3e} | {:<10.3e} | {:<10.3e} | {:<10.3e} | {:>5} |",
            telemetry.iteration,
            telemetry.primal_residual,
            telemetry.dual_residual,
            telemetry.epsilon_primal,
            telemetry.epsilon_dual,
            telemetry.violated_constraints,
        );
    }
}

build_option_enum!(
    trait_ = Callback,
    name = "Callbacks",
    variants = (NoOpCallback, ConvergenceOutput),
    new_arguments = (&Options,),
    doc_header = "An enum representing the callbacks available to the reasoner. Each variant corresponds to a specific telemetry strategy."
);
