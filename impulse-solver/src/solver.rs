//! Projected Gauss-Seidel sweeps over constraint rows.
//!
//! The solver relaxes one scalar row at a time against the current block
//! velocities, which makes the whole solve matrix-free: each update needs
//! only the row's residual, its cached Schur diagonal, and its effective
//! mass rows. For row `i`:
//!
//! ```text
//! r_i      = cq . v + cfm * lambda_i - target_rate_i
//! lambda_i = project(lambda_i - omega * r_i / g_i)
//! v       += eq * (lambda_i_new - lambda_i_old)
//! ```
//!
//! Updates are visible to later rows within the same sweep (Gauss-Seidel
//! ordering), and the projection after every update is what handles the
//! unilateral and friction rows.
//!
//! # Warm starting
//!
//! Multipliers persist on their rows across solves. When warm starting is
//! enabled, the solver pre-applies each row's persisted multiplier to the
//! (unconstrained) velocities before sweeping, so the multiplier state and
//! velocity state stay consistent and a solve of an unchanged system
//! terminates almost immediately. Callers are expected to hand the solver
//! freshly seeded velocities each step (see
//! [`VariableSet::compute_free_velocities`]).
//!
//! # Termination
//!
//! Hitting the sweep cap is an expected outcome for real-time callers, not
//! an error: the best-effort multipliers and velocities are kept and the
//! result reports how far the solve got.

use impulse_types::{Result, SolverError};

use crate::constraint::Constraint;
use crate::variables::VariableSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the projected Gauss-Seidel solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Maximum number of sweeps over the constraint list.
    pub max_sweeps: usize,

    /// Convergence tolerance on the largest projected multiplier change
    /// within a sweep.
    pub tolerance: f64,

    /// Successive over-relaxation factor.
    /// - 1.0: standard Gauss-Seidel
    /// - < 1.0: under-relaxation (more stable)
    /// - > 1.0: over-relaxation (faster convergence, typically 1.2-1.8)
    pub omega: f64,

    /// Keep and pre-apply multipliers from the previous solve.
    pub warm_starting: bool,

    /// Rows whose Schur diagonal magnitude falls below this are skipped
    /// for the sweep instead of dividing by a near-zero.
    pub degenerate_threshold: f64,

    /// Minimum sweeps before checking convergence.
    pub min_sweeps: usize,

    /// Record the per-sweep violation history in the solver statistics.
    pub track_convergence: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_sweeps: 50,
            tolerance: 1e-6,
            omega: 1.0, // Standard Gauss-Seidel
            warm_starting: true,
            degenerate_threshold: 1e-12,
            min_sweeps: 1,
            track_convergence: false,
        }
    }
}

impl SolverConfig {
    /// High-accuracy configuration for precise simulations.
    #[must_use]
    pub fn high_accuracy() -> Self {
        Self {
            max_sweeps: 200,
            tolerance: 1e-10,
            omega: 1.0, // Standard GS for stability
            warm_starting: true,
            degenerate_threshold: 1e-14,
            min_sweeps: 2,
            track_convergence: false,
        }
    }

    /// Fast configuration for real-time applications.
    #[must_use]
    pub fn realtime() -> Self {
        Self {
            max_sweeps: 16,
            tolerance: 1e-4,
            omega: 1.3, // Mild over-relaxation
            warm_starting: true,
            degenerate_threshold: 1e-10,
            min_sweeps: 1,
            track_convergence: false,
        }
    }

    /// Set the sweep cap.
    #[must_use]
    pub const fn with_max_sweeps(mut self, max_sweeps: usize) -> Self {
        self.max_sweeps = max_sweeps;
        self
    }

    /// Set the convergence tolerance.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the over-relaxation factor.
    #[must_use]
    pub const fn with_omega(mut self, omega: f64) -> Self {
        self.omega = omega;
        self
    }

    /// Enable or disable warm starting.
    #[must_use]
    pub const fn with_warm_starting(mut self, enabled: bool) -> Self {
        self.warm_starting = enabled;
        self
    }

    /// Enable convergence tracking.
    #[must_use]
    pub const fn with_convergence_tracking(mut self, enabled: bool) -> Self {
        self.track_convergence = enabled;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvalidConfig`] if any value is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.omega <= 0.0 || self.omega >= 2.0 {
            return Err(SolverError::invalid_config("omega must be in range (0, 2)"));
        }
        if self.tolerance <= 0.0 || !self.tolerance.is_finite() {
            return Err(SolverError::invalid_config(
                "tolerance must be positive and finite",
            ));
        }
        if self.degenerate_threshold <= 0.0 || !self.degenerate_threshold.is_finite() {
            return Err(SolverError::invalid_config(
                "degenerate threshold must be positive and finite",
            ));
        }
        if self.max_sweeps == 0 {
            return Err(SolverError::invalid_config("max sweeps must be at least 1"));
        }
        if self.min_sweeps > self.max_sweeps {
            return Err(SolverError::invalid_config(
                "min sweeps cannot exceed max sweeps",
            ));
        }
        Ok(())
    }
}

/// How a solve ended. Neither outcome is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The largest multiplier change fell below tolerance.
    Converged,

    /// The sweep cap was reached; multipliers and velocities hold the
    /// best-effort state of the last sweep.
    SweepLimit,
}

/// Outcome of one solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveResult {
    /// Why sweeping stopped.
    pub termination: Termination,

    /// Number of sweeps performed.
    pub sweeps_used: usize,

    /// Largest projected multiplier change in the final sweep.
    pub max_delta: f64,

    /// Largest row violation observed in the final sweep.
    pub max_violation: f64,
}

impl SolveResult {
    /// Result of solving an empty system.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            termination: Termination::Converged,
            sweeps_used: 0,
            max_delta: 0.0,
            max_violation: 0.0,
        }
    }

    /// Whether the solve converged within tolerance.
    #[must_use]
    pub fn converged(&self) -> bool {
        matches!(self.termination, Termination::Converged)
    }
}

/// Statistics from the last solve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverStats {
    /// Number of blocks in the variable set (active and inactive).
    pub num_variables: usize,
    /// Number of valid constraint rows.
    pub num_constraints: usize,
    /// Valid bilateral rows.
    pub num_bilateral: usize,
    /// Valid bounded rows (unilateral and friction).
    pub num_bounded: usize,
    /// Row updates skipped on degenerate diagonals, summed over sweeps.
    pub degenerate_skips: usize,
    /// Whether persisted multipliers were pre-applied.
    pub used_warm_start: bool,
    /// Largest violation before the first sweep.
    pub initial_violation: f64,
    /// Largest violation in the final sweep.
    pub final_violation: f64,
    /// Violation history (initial, then one entry per sweep), when
    /// convergence tracking is enabled.
    pub convergence_history: Option<Vec<f64>>,
}

/// Per-sweep maxima shared between the sequential and colored sweeps.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SweepOutcome {
    pub max_delta: f64,
    pub max_violation: f64,
    pub degenerate_skips: usize,
}

/// Refresh auxiliaries and reconcile multipliers with the velocity state.
///
/// Returns whether any persisted multiplier was pre-applied.
pub(crate) fn prepare(
    variables: &mut VariableSet,
    constraints: &mut [Constraint],
    warm_starting: bool,
) -> bool {
    for constraint in constraints.iter_mut() {
        constraint.update_auxiliary(variables);
    }

    let mut warm = false;
    if warm_starting {
        for constraint in constraints.iter() {
            let lambda = constraint.multiplier();
            if constraint.is_valid() && lambda != 0.0 {
                constraint.apply_impulse(variables, lambda);
                warm = true;
            }
        }
    } else {
        for constraint in constraints.iter_mut() {
            constraint.reset_multiplier();
        }
    }
    warm
}

/// Multiplier of the paired normal row, for friction bounds. The pairing
/// reads as zero unless it resolves to a valid row: an invalid normal may
/// still carry a stale multiplier from before a failed rebind.
pub(crate) fn normal_multiplier(constraints: &[Constraint], index: usize) -> f64 {
    match constraints[index].kind().normal_index() {
        Some(normal) => constraints
            .get(normal.index())
            .filter(|c| c.is_valid())
            .map_or(0.0, Constraint::multiplier),
        None => 0.0,
    }
}

/// One Gauss-Seidel sweep over the constraint list, in slice order.
pub(crate) fn sweep_once(
    config: &SolverConfig,
    variables: &mut VariableSet,
    constraints: &mut [Constraint],
) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();

    for index in 0..constraints.len() {
        if !constraints[index].is_valid() {
            continue;
        }

        let g = constraints[index].schur_diag();
        if g.abs() < config.degenerate_threshold {
            outcome.degenerate_skips += 1;
            continue;
        }

        let bound = normal_multiplier(constraints, index);
        let residual = constraints[index].residual(variables);
        let old = constraints[index].multiplier();
        let candidate = old - config.omega * residual / g;
        let projected = constraints[index].kind().project(candidate, bound);
        let delta = projected - old;

        constraints[index].apply_impulse(variables, delta);
        constraints[index].set_multiplier(projected);

        outcome.max_delta = outcome.max_delta.max(delta.abs());
        outcome.max_violation = outcome.max_violation.max(residual.abs());
    }

    outcome
}

/// Largest absolute violation over valid rows at the current velocities.
pub(crate) fn max_violation(variables: &VariableSet, constraints: &[Constraint]) -> f64 {
    constraints
        .iter()
        .filter(|c| c.is_valid())
        .map(|c| c.residual(variables).abs())
        .fold(0.0, f64::max)
}

/// Projected Gauss-Seidel constraint solver.
///
/// Owns a configuration and the statistics of its last run. The constraint
/// rows themselves carry the solution (multipliers persist on the rows),
/// so the solver holds no per-row state and one instance can serve many
/// independent systems.
#[derive(Debug, Clone)]
pub struct ProjectedGaussSeidel {
    config: SolverConfig,
    last_stats: SolverStats,
}

impl Default for ProjectedGaussSeidel {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl ProjectedGaussSeidel {
    /// Create a solver with the given configuration.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            last_stats: SolverStats::default(),
        }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Get mutable configuration.
    pub fn config_mut(&mut self) -> &mut SolverConfig {
        &mut self.config
    }

    /// Get statistics from the last solve.
    #[must_use]
    pub fn last_stats(&self) -> &SolverStats {
        &self.last_stats
    }

    /// Run projected Gauss-Seidel sweeps until the largest multiplier
    /// change falls below tolerance or the sweep cap is hit.
    ///
    /// `variables` should hold the unconstrained velocities for the
    /// current step; persisted multipliers are pre-applied before the
    /// first sweep when warm starting is enabled. Invalid rows are
    /// skipped, degenerate rows are skipped per sweep, and both show up
    /// only in the statistics - a solve never fails.
    pub fn solve(
        &mut self,
        variables: &mut VariableSet,
        constraints: &mut [Constraint],
    ) -> SolveResult {
        if constraints.is_empty() {
            self.last_stats = SolverStats {
                num_variables: variables.len(),
                ..SolverStats::default()
            };
            return SolveResult::empty();
        }

        let used_warm_start = prepare(variables, constraints, self.config.warm_starting);
        let initial_violation = max_violation(variables, constraints);
        let mut history = self
            .config
            .track_convergence
            .then(|| vec![initial_violation]);

        let mut termination = Termination::SweepLimit;
        let mut sweeps_used = 0;
        let mut degenerate_skips = 0;
        let mut last = SweepOutcome::default();

        for sweep in 0..self.config.max_sweeps {
            last = sweep_once(&self.config, variables, constraints);
            sweeps_used = sweep + 1;
            degenerate_skips += last.degenerate_skips;

            if let Some(history) = history.as_mut() {
                history.push(last.max_violation);
            }

            if sweeps_used >= self.config.min_sweeps && last.max_delta < self.config.tolerance {
                termination = Termination::Converged;
                break;
            }
        }

        let num_constraints = constraints.iter().filter(|c| c.is_valid()).count();
        let num_bilateral = constraints
            .iter()
            .filter(|c| c.is_valid() && c.kind().is_bilateral())
            .count();

        self.last_stats = SolverStats {
            num_variables: variables.len(),
            num_constraints,
            num_bilateral,
            num_bounded: num_constraints - num_bilateral,
            degenerate_skips,
            used_warm_start,
            initial_violation,
            final_violation: last.max_violation,
            convergence_history: history,
        };

        let result = SolveResult {
            termination,
            sweeps_used,
            max_delta: last.max_delta,
            max_violation: last.max_violation,
        };

        match termination {
            Termination::Converged => tracing::debug!(
                "pgs converged in {} sweeps (max |dlambda| = {:.3e})",
                sweeps_used,
                result.max_delta
            ),
            Termination::SweepLimit => tracing::debug!(
                "pgs hit the sweep cap at {} (max |dlambda| = {:.3e}, max violation = {:.3e})",
                sweeps_used,
                result.max_delta,
                result.max_violation
            ),
        }

        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::projection::ConstraintKind;
    use crate::variables::{InverseMass, Variable};
    use approx::assert_relative_eq;
    use impulse_types::{ConstraintId, VariableId};

    fn velocity_pair(va: f64, vb: f64) -> (VariableSet, Vec<Constraint>) {
        let mut variables = VariableSet::new();
        let a = variables.insert(Variable::new(InverseMass::identity(3)));
        let b = variables.insert(Variable::new(InverseMass::identity(3)));
        variables.assign_offsets();
        variables.get_mut(a).unwrap().set_velocity(&[va, 0.0, 0.0]).unwrap();
        variables.get_mut(b).unwrap().set_velocity(&[vb, 0.0, 0.0]).unwrap();

        let mut c = Constraint::between(&variables, Some(a), Some(b), ConstraintKind::Equality);
        c.set_jacobian_a(&[1.0, 0.0, 0.0]).unwrap();
        c.set_jacobian_b(&[-1.0, 0.0, 0.0]).unwrap();

        (variables, vec![c])
    }

    #[test]
    fn test_config_defaults_and_presets() {
        let config = SolverConfig::default();
        assert_eq!(config.max_sweeps, 50);
        assert!(config.warm_starting);
        assert_relative_eq!(config.omega, 1.0, epsilon = 1e-12);

        let realtime = SolverConfig::realtime();
        assert!(realtime.max_sweeps <= 20);
        assert!(realtime.omega > 1.0); // Should use over-relaxation

        let high_accuracy = SolverConfig::high_accuracy();
        assert!(high_accuracy.max_sweeps >= 100);
        assert!(high_accuracy.tolerance < 1e-8);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SolverConfig::default();
        assert!(config.validate().is_ok());

        config.omega = 0.0;
        assert!(config.validate().is_err());
        config.omega = 2.0;
        assert!(config.validate().is_err());
        config.omega = 1.5;
        assert!(config.validate().is_ok());

        config.min_sweeps = 100;
        assert!(config.validate().is_err());

        let config = SolverConfig::default().with_tolerance(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_solve_empty() {
        let mut variables = VariableSet::new();
        let mut solver = ProjectedGaussSeidel::default();
        let result = solver.solve(&mut variables, &mut []);

        assert!(result.converged());
        assert_eq!(result.sweeps_used, 0);
    }

    #[test]
    fn test_bilateral_row_converges() {
        let (mut variables, mut constraints) = velocity_pair(1.0, 0.0);
        let config = SolverConfig::default().with_convergence_tracking(true);
        let mut solver = ProjectedGaussSeidel::new(config);

        let result = solver.solve(&mut variables, &mut constraints);
        assert!(result.converged());

        // Both blocks meet in the middle, multiplier carries the impulse
        assert_relative_eq!(variables.get(VariableId::new(0)).unwrap().velocity()[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(variables.get(VariableId::new(1)).unwrap().velocity()[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(constraints[0].multiplier(), -0.5, epsilon = 1e-9);
        assert_relative_eq!(constraints[0].residual(&variables), 0.0, epsilon = 1e-9);

        // Violation shrinks from the initial value to (numerically) zero
        let stats = solver.last_stats();
        assert_relative_eq!(stats.initial_violation, 1.0, epsilon = 1e-12);
        assert!(stats.final_violation < stats.initial_violation);
        let history = stats.convergence_history.as_ref().unwrap();
        assert_relative_eq!(history[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(*history.last().unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unilateral_row_separating_contact() {
        let mut variables = VariableSet::new();
        let a = variables.insert(Variable::new(InverseMass::identity(1)));
        let wall = variables.insert(Variable::fixed());
        variables.assign_offsets();
        variables.get_mut(a).unwrap().set_velocity(&[1.0]).unwrap();

        let mut c = Constraint::between(&variables, Some(a), Some(wall), ConstraintKind::LowerBounded);
        c.set_jacobian_a(&[1.0]).unwrap();

        let mut solver = ProjectedGaussSeidel::default();
        let result = solver.solve(&mut variables, std::slice::from_mut(&mut c));

        // Separating contact: candidate multiplier is negative, projection
        // pins it at zero and the velocity is left alone.
        assert!(result.converged());
        assert_relative_eq!(c.multiplier(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(variables.get(a).unwrap().velocity()[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unilateral_row_stops_approach() {
        let mut variables = VariableSet::new();
        let a = variables.insert(Variable::new(InverseMass::identity(1)));
        let wall = variables.insert(Variable::fixed());
        variables.assign_offsets();
        variables.get_mut(a).unwrap().set_velocity(&[-1.0]).unwrap();

        let mut c = Constraint::between(&variables, Some(a), Some(wall), ConstraintKind::LowerBounded);
        c.set_jacobian_a(&[1.0]).unwrap();

        let mut solver = ProjectedGaussSeidel::default();
        let result = solver.solve(&mut variables, std::slice::from_mut(&mut c));

        assert!(result.converged());
        assert_relative_eq!(c.multiplier(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(variables.get(a).unwrap().velocity()[0], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_row_is_skipped() {
        let (mut variables, mut constraints) = velocity_pair(1.0, 0.0);
        // Zero Jacobian leaves the Schur diagonal at zero
        constraints[0].set_jacobian_a(&[0.0, 0.0, 0.0]).unwrap();
        constraints[0].set_jacobian_b(&[0.0, 0.0, 0.0]).unwrap();

        let mut solver = ProjectedGaussSeidel::default();
        let result = solver.solve(&mut variables, &mut constraints);

        assert!(result.converged());
        assert!(solver.last_stats().degenerate_skips > 0);
        assert_relative_eq!(constraints[0].multiplier(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(variables.get(VariableId::new(0)).unwrap().velocity()[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_warm_start_reconverges_immediately() {
        let (mut variables, mut constraints) = velocity_pair(1.0, 0.0);
        let mut solver = ProjectedGaussSeidel::default();

        let first = solver.solve(&mut variables, &mut constraints);
        assert!(first.converged());
        assert!(!solver.last_stats().used_warm_start);
        let lambda = constraints[0].multiplier();

        // Re-seed the unconstrained velocities, as a stepper would, and
        // solve the identical system again.
        variables.get_mut(VariableId::new(0)).unwrap().set_velocity(&[1.0, 0.0, 0.0]).unwrap();
        variables.get_mut(VariableId::new(1)).unwrap().set_velocity(&[0.0, 0.0, 0.0]).unwrap();

        let second = solver.solve(&mut variables, &mut constraints);
        assert!(second.converged());
        assert!(solver.last_stats().used_warm_start);
        assert!(second.sweeps_used <= first.sweeps_used);
        assert_relative_eq!(constraints[0].multiplier(), lambda, epsilon = 1e-9);
        assert_relative_eq!(variables.get(VariableId::new(0)).unwrap().velocity()[0], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_cold_start_resets_multipliers() {
        let (mut variables, mut constraints) = velocity_pair(1.0, 0.0);
        constraints[0].set_multiplier(123.0);

        let config = SolverConfig::default().with_warm_starting(false);
        let mut solver = ProjectedGaussSeidel::new(config);
        let result = solver.solve(&mut variables, &mut constraints);

        assert!(result.converged());
        assert!(!solver.last_stats().used_warm_start);
        assert_relative_eq!(constraints[0].multiplier(), -0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_sweep_cap_is_reported_not_fatal() {
        let (mut variables, mut constraints) = velocity_pair(1.0, 0.0);
        let config = SolverConfig {
            max_sweeps: 1,
            tolerance: 1e-300,
            ..SolverConfig::default()
        };
        let mut solver = ProjectedGaussSeidel::new(config);

        let result = solver.solve(&mut variables, &mut constraints);
        assert_eq!(result.termination, Termination::SweepLimit);
        assert_eq!(result.sweeps_used, 1);
        // Best-effort state is still the fixed point for this system
        assert_relative_eq!(variables.get(VariableId::new(0)).unwrap().velocity()[0], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_friction_pair_clamps_to_cone() {
        let mut variables = VariableSet::new();
        let a = variables.insert(Variable::new(InverseMass::identity(2)));
        let ground = variables.insert(Variable::fixed());
        variables.assign_offsets();
        // Approaching the ground on axis 0, sliding fast on axis 1
        variables.get_mut(a).unwrap().set_velocity(&[-2.0, 10.0]).unwrap();

        let mut normal = Constraint::between(&variables, Some(a), Some(ground), ConstraintKind::LowerBounded);
        normal.set_jacobian_a(&[1.0, 0.0]).unwrap();

        let mut friction = Constraint::between(
            &variables,
            Some(a),
            Some(ground),
            ConstraintKind::FrictionCone {
                normal: ConstraintId::new(0),
                friction: 0.5,
            },
        );
        friction.set_jacobian_a(&[0.0, 1.0]).unwrap();

        let mut constraints = vec![normal, friction];
        let mut solver = ProjectedGaussSeidel::default();
        let result = solver.solve(&mut variables, &mut constraints);

        assert!(result.converged());
        // Normal stops the approach, friction saturates at mu * lambda_n
        assert_relative_eq!(constraints[0].multiplier(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(constraints[1].multiplier(), -1.0, epsilon = 1e-9);
        let v = variables.get(a).unwrap().velocity();
        assert_relative_eq!(v[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(v[1], 9.0, epsilon = 1e-9);
    }

    #[test]
    fn test_friction_bound_reads_only_valid_normals() {
        let mut variables = VariableSet::new();
        let a = variables.insert(Variable::new(InverseMass::identity(1)));
        let b = variables.insert(Variable::new(InverseMass::identity(1)));
        variables.assign_offsets();

        let friction = Constraint::between(
            &variables,
            Some(a),
            Some(b),
            ConstraintKind::FrictionCone {
                normal: ConstraintId::new(0),
                friction: 0.5,
            },
        );

        // Bound normal: the friction bound follows its multiplier
        let mut live = Constraint::between(&variables, Some(a), Some(b), ConstraintKind::LowerBounded);
        live.set_multiplier(3.0);
        assert_relative_eq!(
            normal_multiplier(&[live, friction.clone()], 1),
            3.0,
            epsilon = 1e-12
        );

        // Unbound normal: the stale multiplier it carries reads as zero
        let mut stale = Constraint::new(ConstraintKind::LowerBounded);
        stale.set_multiplier(10.0);
        assert_relative_eq!(
            normal_multiplier(&[stale, friction], 1),
            0.0,
            epsilon = 1e-12
        );

        // Pairing past the end of the list reads as zero
        let orphan = Constraint::between(
            &variables,
            Some(a),
            Some(b),
            ConstraintKind::FrictionCone {
                normal: ConstraintId::new(7),
                friction: 0.5,
            },
        );
        assert_relative_eq!(normal_multiplier(&[orphan], 0), 0.0, epsilon = 1e-12);
    }
}
