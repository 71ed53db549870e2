//! Matrix-free constraint solving over blocks of velocity unknowns.
//!
//! This crate provides the constraint core of an impulse-based dynamics
//! solver: scalar two-body constraint rows, a projected Gauss-Seidel
//! solver that relaxes them without ever forming a global matrix, and the
//! supporting pieces (sparse export, parallel batch scheduling).
//!
//! # Building Blocks
//!
//! - [`Variable`]: one block of velocity unknowns with its inverse-mass
//!   operator, stored in a [`VariableSet`] arena and addressed by
//!   [`VariableId`]
//! - [`Constraint`]: a scalar row linking up to two blocks through dense
//!   per-block Jacobian slices
//! - [`ConstraintKind`]: the admissible set of a row's multiplier
//!   (bilateral, non-negative, or friction box coupled to a normal row)
//!
//! # Solving
//!
//! [`ProjectedGaussSeidel`] sweeps the rows in place: each update reads
//! one row's residual against the live block velocities, divides by the
//! row's cached Schur diagonal, projects the multiplier, and pushes the
//! change back through the inverse mass. Multipliers persist on their
//! rows, so consecutive solves warm start for free.
//!
//! Running out of sweeps is a reported outcome, not an error; see
//! [`Termination`].
//!
//! # Parallel Sweeps
//!
//! [`ConstraintColoring`] partitions rows into batches that share no
//! movable block, and [`solve_colored`] relaxes each batch on the rayon
//! thread pool while keeping batches ordered, preserving Gauss-Seidel
//! convergence behavior.
//!
//! # Example
//!
//! ```
//! use impulse_solver::{
//!     Constraint, ConstraintKind, InverseMass, ProjectedGaussSeidel, SolverConfig, Variable,
//!     VariableSet,
//! };
//!
//! let mut variables = VariableSet::new();
//! let a = variables.insert(Variable::new(InverseMass::identity(3)));
//! let b = variables.insert(Variable::new(InverseMass::identity(3)));
//! variables.assign_offsets();
//! variables.get_mut(a).unwrap().set_velocity(&[1.0, 0.0, 0.0]).unwrap();
//!
//! // Drive the two x velocities together
//! let mut row = Constraint::between(&variables, Some(a), Some(b), ConstraintKind::Equality);
//! row.set_jacobian_a(&[1.0, 0.0, 0.0]).unwrap();
//! row.set_jacobian_b(&[-1.0, 0.0, 0.0]).unwrap();
//!
//! let mut solver = ProjectedGaussSeidel::new(SolverConfig::default());
//! let result = solver.solve(&mut variables, std::slice::from_mut(&mut row));
//!
//! assert!(result.converged());
//! assert!((variables.get(a).unwrap().velocity()[0] - 0.5).abs() < 1e-6);
//! assert!((variables.get(b).unwrap().velocity()[0] - 0.5).abs() < 1e-6);
//! ```

#![doc(html_root_url = "https://docs.rs/impulse-solver/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod coloring;
mod constraint;
mod parallel;
mod projection;
mod solver;
mod sparse;
mod variables;

pub use coloring::ConstraintColoring;
pub use constraint::{Constraint, ConstraintRecord};
pub use parallel::solve_colored;
pub use projection::ConstraintKind;
pub use solver::{ProjectedGaussSeidel, SolveResult, SolverConfig, SolverStats, Termination};
pub use sparse::SparseAssembly;
pub use variables::{InverseMass, Variable, VariableSet};

// Re-export the id and error types constraints are wired with
pub use impulse_types::{ConstraintId, Result, SolverError, VariableId};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_public_surface_round_trip() {
        let mut variables = VariableSet::new();
        let a = variables.insert(Variable::new(InverseMass::identity(2)));
        let b = variables.insert(Variable::new(InverseMass::identity(2)));
        variables.assign_offsets();
        variables.get_mut(a).unwrap().set_velocity(&[2.0, 0.0]).unwrap();

        let mut row = Constraint::between(&variables, Some(a), Some(b), ConstraintKind::Equality);
        row.set_jacobian_a(&[1.0, 0.0]).unwrap();
        row.set_jacobian_b(&[-1.0, 0.0]).unwrap();

        let mut solver = ProjectedGaussSeidel::default();
        let result = solver.solve(&mut variables, std::slice::from_mut(&mut row));

        assert!(result.converged());
        assert_relative_eq!(variables.get(a).unwrap().velocity()[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(row.multiplier(), -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_colored_surface_round_trip() {
        let mut variables = VariableSet::new();
        let a = variables.insert(Variable::new(InverseMass::identity(1)));
        let b = variables.insert(Variable::new(InverseMass::identity(1)));
        variables.assign_offsets();
        variables.get_mut(a).unwrap().set_velocity(&[1.0]).unwrap();

        let mut row = Constraint::between(&variables, Some(a), Some(b), ConstraintKind::Equality);
        row.set_jacobian_a(&[1.0]).unwrap();
        row.set_jacobian_b(&[-1.0]).unwrap();

        let mut constraints = vec![row];
        let coloring = ConstraintColoring::build(&variables, &constraints);
        let result = solve_colored(
            &SolverConfig::default(),
            &mut variables,
            &mut constraints,
            &coloring,
            1,
        );

        assert!(result.converged());
        assert_relative_eq!(variables.get(b).unwrap().velocity()[0], 0.5, epsilon = 1e-6);
    }
}
