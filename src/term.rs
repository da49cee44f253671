//! Ground-rule terms: the convex penalties and linear constraints that the
//! reasoner minimizes a sum of.
//!
//! `Hinge`, `SquaredHinge`, and the equality/inequality `LinearConstraint`
//! kinds are one tagged enum matched on kind rather than a class hierarchy —
//! a closed set, so `match` dispatch is both simpler and cheaper than the
//! trait-object route `enum_dispatch` gives elsewhere in this workspace.

use crate::hyperplane::Hyperplane;
use crate::variable::{GlobalIndex, LocalVariable};
use crate::E;

/// Tolerance below which a constraint violation is treated as exactly zero.
/// Matches the single-precision tolerance class the rest of the reasoner
/// uses for its residual checks.
pub const VIOLATION_EPS: E = 1e-5;

/// Which side of `aᵀx = c` a [`ObjectiveTerm::LinearInequality`] constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InequalitySense {
    /// `aᵀx ≤ c`
    AtMost,
    /// `aᵀx ≥ c`
    AtLeast,
}

/// A ground-rule term: a hyperplane plus the penalty or constraint applied
/// to it, and the term's private local-variable copies.
///
/// Invariant: constraint variants (`LinearEquality`, `LinearInequality`)
/// carry no weight; objective variants (`Hinge`, `SquaredHinge`) carry
/// `weight >= 0`.
#[derive(Debug, Clone)]
pub enum ObjectiveTerm {
    /// `w · max(0, aᵀx − c)`
    Hinge {
        hyperplane: Hyperplane,
        weight: E,
        locals: Vec<LocalVariable>,
    },
    /// `w · max(0, aᵀx − c)²`
    SquaredHinge {
        hyperplane: Hyperplane,
        weight: E,
        locals: Vec<LocalVariable>,
    },
    /// `aᵀx = c`
    LinearEquality {
        hyperplane: Hyperplane,
        locals: Vec<LocalVariable>,
    },
    /// `aᵀx ≤ c` or `aᵀx ≥ c`
    LinearInequality {
        hyperplane: Hyperplane,
        sense: InequalitySense,
        locals: Vec<LocalVariable>,
    },
}

impl ObjectiveTerm {
    pub fn hinge(hyperplane: Hyperplane, weight: E) -> Self {
        assert!(weight >= 0.0, "hinge weight must be non-negative");
        let locals = local_variables_for(&hyperplane);
        Self::Hinge {
            hyperplane,
            weight,
            locals,
        }
    }

    pub fn squared_hinge(hyperplane: Hyperplane, weight: E) -> Self {
        assert!(weight >= 0.0, "squared hinge weight must be non-negative");
        let locals = local_variables_for(&hyperplane);
        Self::SquaredHinge {
            hyperplane,
            weight,
            locals,
        }
    }

    pub fn linear_equality(hyperplane: Hyperplane) -> Self {
        let locals = local_variables_for(&hyperplane);
        Self::LinearEquality { hyperplane, locals }
    }

    pub fn linear_inequality(hyperplane: Hyperplane, sense: InequalitySense) -> Self {
        let locals = local_variables_for(&hyperplane);
        Self::LinearInequality {
            hyperplane,
            sense,
            locals,
        }
    }

    pub fn hyperplane(&self) -> &Hyperplane {
        match self {
            Self::Hinge { hyperplane, .. }
            | Self::SquaredHinge { hyperplane, .. }
            | Self::LinearEquality { hyperplane, .. }
            | Self::LinearInequality { hyperplane, .. } => hyperplane,
        }
    }

    pub fn locals(&self) -> &[LocalVariable] {
        match self {
            Self::Hinge { locals, .. }
            | Self::SquaredHinge { locals, .. }
            | Self::LinearEquality { locals, .. }
            | Self::LinearInequality { locals, .. } => locals,
        }
    }

    pub fn locals_mut(&mut self) -> &mut [LocalVariable] {
        match self {
            Self::Hinge { locals, .. }
            | Self::SquaredHinge { locals, .. }
            | Self::LinearEquality { locals, .. }
            | Self::LinearInequality { locals, .. } => locals,
        }
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, Self::LinearEquality { .. } | Self::LinearInequality { .. })
    }

    /// `y_i ← y_i + ρ · (x_i − z[g_i])` for every local variable. Must run
    /// before `minimize` in the same iteration.
    pub fn update_lagrange(&mut self, rho: E, z: &[E]) {
        for local in self.locals_mut() {
            let z_g = z[local.global_index as usize];
            local.lagrange += rho * (local.value - z_g);
        }
    }

    /// Solves the term's ADMM x-subproblem in closed form and writes the
    /// result into this term's local copies. Reads `z` only; never writes it.
    pub fn minimize(&mut self, rho: E, z: &[E]) {
        let degenerate = self.hyperplane().is_degenerate();
        let u: Vec<E> = self
            .locals()
            .iter()
            .map(|l| z[l.global_index as usize] - l.lagrange / rho)
            .collect();

        if degenerate {
            // `a` is the zero vector: `aᵀx` is identically zero regardless
            // of `x`, so there is nothing to project onto and the
            // unconstrained minimizer `u` is already optimal.
            self.hyperplane().log_degenerate_once();
            for (local, u_i) in self.locals_mut().iter_mut().zip(&u) {
                local.value = *u_i;
            }
            return;
        }

        let hp = self.hyperplane();
        let norm_sq = hp.norm_sq();
        let constant = hp.constant();
        let au = hp.dot(&u);

        let x: Vec<E> = match self {
            Self::SquaredHinge {
                hyperplane, weight, ..
            } => {
                if au <= constant {
                    u.clone()
                } else {
                    let scale = (2.0 * *weight * (au - constant)) / (rho + 2.0 * *weight * norm_sq);
                    u.iter()
                        .zip(hyperplane.coefficients())
                        .map(|(u_i, a_i)| u_i - scale * a_i)
                        .collect()
                }
            }
            Self::Hinge {
                hyperplane, weight, ..
            } => {
                let active_scale = *weight / rho;
                let candidate_au = au - active_scale * norm_sq;
                if candidate_au >= constant {
                    u.iter()
                        .zip(hyperplane.coefficients())
                        .map(|(u_i, a_i)| u_i - active_scale * a_i)
                        .collect()
                } else if au <= constant {
                    u.clone()
                } else {
                    let scale = (au - constant) / norm_sq;
                    u.iter()
                        .zip(hyperplane.coefficients())
                        .map(|(u_i, a_i)| u_i - scale * a_i)
                        .collect()
                }
            }
            Self::LinearEquality { hyperplane, .. } => {
                let scale = (au - constant) / norm_sq;
                u.iter()
                    .zip(hyperplane.coefficients())
                    .map(|(u_i, a_i)| u_i - scale * a_i)
                    .collect()
            }
            Self::LinearInequality {
                hyperplane, sense, ..
            } => {
                let feasible = match sense {
                    InequalitySense::AtMost => au <= constant,
                    InequalitySense::AtLeast => au >= constant,
                };
                if feasible {
                    u.clone()
                } else {
                    let scale = (au - constant) / norm_sq;
                    u.iter()
                        .zip(hyperplane.coefficients())
                        .map(|(u_i, a_i)| u_i - scale * a_i)
                        .collect()
                }
            }
        };

        for (local, x_i) in self.locals_mut().iter_mut().zip(x) {
            local.value = x_i;
        }
    }

    /// For objective terms, the weighted penalty at `z`. For constraint
    /// terms, the violation amount (0 if feasible). Violations within
    /// [`VIOLATION_EPS`] of zero are reported as exactly zero.
    pub fn evaluate(&self, z: &[E]) -> E {
        let hp = self.hyperplane();
        let slack = hp.dot_global(z) - hp.constant();
        let value = match self {
            Self::Hinge { weight, .. } => *weight * slack.max(0.0),
            Self::SquaredHinge { weight, .. } => {
                let h = slack.max(0.0);
                *weight * h * h
            }
            Self::LinearEquality { .. } => slack.abs(),
            Self::LinearInequality { sense, .. } => match sense {
                InequalitySense::AtMost => slack.max(0.0),
                InequalitySense::AtLeast => (-slack).max(0.0),
            },
        };
        if self.is_constraint() && value <= VIOLATION_EPS {
            0.0
        } else {
            value
        }
    }

    /// Whether this term is a constraint currently violated at `z`.
    pub fn is_violated(&self, z: &[E]) -> bool {
        self.is_constraint() && self.evaluate(z) > 0.0
    }
}

fn local_variables_for(hyperplane: &Hyperplane) -> Vec<LocalVariable> {
    hyperplane
        .variables()
        .iter()
        .map(|&g: &GlobalIndex| LocalVariable::new(g))
        .collect()
}
