//! The top-level ADMM iteration: the `Reasoner` trait plus `AdmmReasoner`,
//! this workspace's counterpart to the `Solver`/`SolverState`/`SolverHooks`
//! trio used elsewhere in this workspace, generalized from a single dense
//! problem to a sparse term store shared across a rayon worker pool.

use macros::{explicit_options, use_option};
use problemo::{Problem, ProblemResult};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::atom_store::AtomValues;
use crate::callback::Callback;
use crate::config::InitialValue;
use crate::error::AdmmError;
use crate::parallel::{ParallelPool, block_size};
use crate::term_store::TermStore;
use crate::terminators::Terminator;
use crate::{E, Status};

/// Per-iteration numbers handed to a [`Callback`] and folded into the final
/// [`SolveReport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IterationTelemetry {
    pub iteration: usize,
    pub primal_residual: E,
    pub dual_residual: E,
    pub epsilon_primal: E,
    pub epsilon_dual: E,
    /// `Some` only on iterations where `admm.compute_period` (or the final
    /// iteration) triggers a full objective evaluation.
    pub objective: Option<E>,
    pub violated_constraints: usize,
    /// `Σ y·(x − z)` across all local variables this iteration.
    pub lagrange_penalty: E,
    /// `Σ y·(x − z) + ½ρ‖x − z‖²` across all local variables this iteration.
    pub aug_lagrangian_penalty: E,
}

/// Final outcome of a call to [`Reasoner::optimize`].
#[derive(Debug, Clone, Copy)]
pub struct SolveReport {
    pub status: Status,
    pub iterations: usize,
    pub primal_residual: E,
    pub dual_residual: E,
    pub violated_constraints: usize,
    pub objective: Option<E>,
}

/// Bundles the two hooks a solve accepts: a [`Callback`] for per-iteration
/// telemetry and a [`Terminator`] for cooperative cancellation. Mirrors this
/// workspace's `SolverHooks` pattern used by its other solvers.
pub struct AdmmHooks {
    callback: Box<dyn Callback>,
    terminator: Box<dyn Terminator>,
}

impl AdmmHooks {
    pub fn new(callback: Box<dyn Callback>, terminator: Box<dyn Terminator>) -> Self {
        Self { callback, terminator }
    }
}

/// Trait for the reasoner's top-level iteration, mirroring the shape of this
/// workspace's `Solver` trait (`solve(state, hooks) -> Result<Status, Problem>`)
/// generalized to return a full [`SolveReport`] instead of a bare status.
///
/// `atoms` backs the `ATOM` init policies and is where the converged
/// consensus values are written back to; pass `None` to work purely against
/// `store.z()` with no external atom store.
pub trait Reasoner {
    fn optimize(
        &mut self,
        store: &mut TermStore,
        atoms: Option<&mut dyn AtomValues>,
        hooks: &mut AdmmHooks,
    ) -> Result<SolveReport, Problem>;
}

/// Per-`g` accumulator folded across the variable phase; field names mirror
/// the per-iteration residual and penalty quantities ADMM tracks.
#[derive(Debug, Clone, Copy, Default)]
struct VarAcc {
    primal_res_sq: E,
    dual_res_sq: E,
    ax_norm_sq: E,
    ay_norm_sq: E,
    bz_norm_sq: E,
    lagrange_penalty: E,
    aug_lagrangian_penalty: E,
}

impl VarAcc {
    fn merge(self, other: Self) -> Self {
        Self {
            primal_res_sq: self.primal_res_sq + other.primal_res_sq,
            dual_res_sq: self.dual_res_sq + other.dual_res_sq,
            ax_norm_sq: self.ax_norm_sq + other.ax_norm_sq,
            ay_norm_sq: self.ay_norm_sq + other.ay_norm_sq,
            bz_norm_sq: self.bz_norm_sq + other.bz_norm_sq,
            lagrange_penalty: self.lagrange_penalty + other.lagrange_penalty,
            aug_lagrangian_penalty: self.aug_lagrangian_penalty + other.aug_lagrangian_penalty,
        }
    }
}

/// Parallel ADMM reasoner: runs the bulk-synchronous term/variable phases
/// over a [`TermStore`] until the residuals converge, the iteration budget
/// is exhausted, or a [`Terminator`] fires.
#[explicit_options(name = Options)]
#[use_option(name = "max_iterations", type_ = u32, default = "25000", description = "Upper bound on ADMM iterations.")]
#[use_option(name = "step_size", type_ = E, default = "1.0", description = "ADMM augmentation penalty rho (must be > 0).")]
#[use_option(name = "epsilon_abs", type_ = E, default = "1e-5", description = "Absolute residual tolerance.")]
#[use_option(name = "epsilon_rel", type_ = E, default = "1e-3", description = "Relative residual tolerance.")]
#[use_option(
    name = "compute_period",
    type_ = u32,
    default = "50",
    description = "Iterations between full objective/violation evaluations."
)]
#[use_option(
    name = "objective_break",
    type_ = bool,
    default = "false",
    description = "Stop early once the objective stops moving between compute_period checks."
)]
#[use_option(
    name = "initial_consensus_value",
    type_ = InitialValue,
    default = "zero",
    description = "Seeding policy for consensus variables."
)]
#[use_option(
    name = "initial_local_value",
    type_ = InitialValue,
    default = "zero",
    description = "Seeding policy for local variable copies."
)]
#[use_option(name = "random_seed", type_ = u64, default = "0", description = "Seed for the RANDOM init policy's RNG.")]
#[use_option(
    name = "num_threads",
    type_ = usize,
    default = "0",
    description = "Worker pool width; 0 auto-detects logical CPUs."
)]
pub struct AdmmReasoner {}

impl AdmmReasoner {
    pub fn new(options: &Options) -> Self {
        Self { options: options.into() }
    }

    fn validate(&self) -> Result<(), Problem> {
        if !(self.options.step_size > 0.0) {
            return Err(AdmmError::Configuration(format!(
                "step_size must be positive, got {}",
                self.options.step_size
            )))
            .via("validating ADMM configuration");
        }
        if self.options.max_iterations == 0 {
            return Err(AdmmError::Configuration("max_iterations must be nonzero".to_string()))
                .via("validating ADMM configuration");
        }
        Ok(())
    }
}

impl Reasoner for AdmmReasoner {
    fn optimize(
        &mut self,
        store: &mut TermStore,
        atoms: Option<&mut dyn AtomValues>,
        hooks: &mut AdmmHooks,
    ) -> Result<SolveReport, Problem> {
        self.validate()?;
        if store.is_empty() {
            return Err(AdmmError::Shape("term store has no terms".to_string())).via("starting ADMM solve");
        }

        let _span = tracing::info_span!("admm.optimize").entered();
        let pool = ParallelPool::build(self.options.num_threads)?;
        tracing::info!(
            num_terms = store.num_terms(),
            num_globals = store.num_globals(),
            num_threads = pool.num_threads(),
            "admm.optimize: starting"
        );

        let atoms_read: Option<&dyn AtomValues> = atoms.as_deref();
        let mut rng = StdRng::seed_from_u64(self.options.random_seed);
        store.init_consensus(self.options.initial_consensus_value, atoms_read, &mut rng);
        store.reset_locals(self.options.initial_local_value, atoms_read, &mut rng);

        hooks.terminator.initialize();

        let rho = self.options.step_size;
        let term_block = block_size(store.num_terms(), pool.num_threads());
        let num_locals_sqrt = (store.num_locals() as E).sqrt();

        let mut status = Status::InProgress;
        let mut iter = 0usize;
        let mut primal_residual = 0.0;
        let mut dual_residual = 0.0;
        let mut violated = 0usize;
        let mut objective: Option<E> = None;
        let mut prev_objective: Option<E> = None;
        let mut awaiting_confirmation = false;

        loop {
            iter += 1;
            let _span = tracing::debug_span!("admm.iteration", iter).entered();

            {
                let (terms, z) = store.terms_mut_with_z();
                pool.for_each_chunk_mut(terms, term_block, |chunk| {
                    for term in chunk.iter_mut() {
                        term.update_lagrange(rho, z);
                        term.minimize(rho, z);
                    }
                });
            }

            let acc = {
                let (z, locals_index, terms) = store.z_mut_with_locals();
                pool.for_each_global_mut_reduce(
                    z,
                    VarAcc::default(),
                    |g, z_old| variable_update(g, z_old, rho, locals_index, terms),
                    VarAcc::merge,
                )
            };

            primal_residual = acc.primal_res_sq.sqrt();
            dual_residual = rho * acc.dual_res_sq.sqrt();
            let epsilon_abs_term = num_locals_sqrt * self.options.epsilon_abs;
            let epsilon_primal = epsilon_abs_term + self.options.epsilon_rel * acc.ax_norm_sq.sqrt().max(acc.bz_norm_sq.sqrt());
            let epsilon_dual = epsilon_abs_term + self.options.epsilon_rel * acc.ay_norm_sq.sqrt();

            let should_evaluate = awaiting_confirmation || iter == 1 || iter % (self.options.compute_period.max(1) as usize) == 0;
            if should_evaluate {
                let (obj, viol) = evaluate(store);
                prev_objective = objective;
                objective = Some(obj);
                violated = viol;
            }

            tracing::debug!(
                iter,
                primal_residual,
                dual_residual,
                epsilon_primal,
                epsilon_dual,
                violated,
                ?objective,
                "admm.iteration: residuals"
            );

            hooks.callback.call(&IterationTelemetry {
                iteration: iter,
                primal_residual,
                dual_residual,
                epsilon_primal,
                epsilon_dual,
                objective,
                violated_constraints: violated,
                lagrange_penalty: acc.lagrange_penalty,
                aug_lagrangian_penalty: acc.aug_lagrangian_penalty,
            });

            if let Some(term_status) = hooks.terminator.terminate() {
                status = term_status;
                break;
            }

            if awaiting_confirmation {
                status = if violated == 0 { Status::Optimal } else { Status::Infeasible };
                break;
            }

            let residual_converged = iter > 1 && primal_residual < epsilon_primal && dual_residual < epsilon_dual && violated == 0;
            let objective_converged = self.options.objective_break
                && prev_objective
                    .zip(objective)
                    .map(|(p, o)| (p - o).abs() <= E::EPSILON)
                    .unwrap_or(false);

            if residual_converged {
                status = Status::Optimal;
                break;
            }
            if objective_converged {
                if violated == 0 {
                    status = Status::Optimal;
                    break;
                }
                // Constraints are still violated: take exactly one more pass
                // to confirm before accepting the break, then decide without
                // rechecking a second time.
                awaiting_confirmation = true;
            }

            if iter >= self.options.max_iterations as usize {
                status = Status::IterationLimit;
                break;
            }
        }

        if let Some(atoms) = atoms {
            store.write_back(atoms);
        }

        if violated > 0 {
            tracing::warn!(violated, iterations = iter, "admm.optimize: finished with violated constraints");
        }
        tracing::info!(?status, iterations = iter, primal_residual, dual_residual, "admm.optimize: finished");

        Ok(SolveReport {
            status,
            iterations: iter,
            primal_residual,
            dual_residual,
            violated_constraints: violated,
            objective,
        })
    }
}

fn variable_update(
    g: usize,
    z_old: f32,
    rho: E,
    locals_index: &[Vec<crate::variable::LocalVariableRef>],
    terms: &[crate::term::ObjectiveTerm],
) -> (f32, VarAcc) {
    let refs = &locals_index[g];
    let count = refs.len() as E;

    let mut sum = 0.0;
    let mut ax_norm_sq = 0.0;
    let mut ay_norm_sq = 0.0;
    for r in refs {
        let l = &terms[r.term].locals()[r.slot];
        sum += l.value + l.lagrange / rho;
        ax_norm_sq += l.value * l.value;
        ay_norm_sq += l.lagrange * l.lagrange;
    }
    let new_z = (sum / count).clamp(0.0, 1.0);

    let dual_res_sq = (z_old - new_z).powi(2) * count;
    let bz_norm_sq = new_z * new_z * count;

    let mut primal_res_sq = 0.0;
    let mut lagrange_penalty = 0.0;
    let mut aug_lagrangian_penalty = 0.0;
    for r in refs {
        let l = &terms[r.term].locals()[r.slot];
        let diff = l.value - new_z;
        primal_res_sq += diff * diff;
        lagrange_penalty += l.lagrange * diff;
        aug_lagrangian_penalty += l.lagrange * diff + 0.5 * rho * diff * diff;
    }

    (
        new_z,
        VarAcc {
            primal_res_sq,
            dual_res_sq,
            ax_norm_sq,
            ay_norm_sq,
            bz_norm_sq,
            lagrange_penalty,
            aug_lagrangian_penalty,
        },
    )
}

/// Full objective evaluation: `Σ evaluate(z)` plus the number of terms
/// currently reporting a nonzero constraint violation.
fn evaluate(store: &TermStore) -> (E, usize) {
    let z = store.z();
    let mut objective = 0.0;
    let mut violated = 0usize;
    for term in store.terms() {
        let value = term.evaluate(z);
        objective += value;
        if term.is_constraint() && value > 0.0 {
            violated += 1;
        }
    }
    (objective, violated)
}
