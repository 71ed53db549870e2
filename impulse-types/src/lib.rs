//! Core types for the impulse constraint solver.
//!
//! This crate provides the shared vocabulary used across the solver crates:
//!
//! - [`VariableId`] - Stable index of a velocity block in the variable arena
//! - [`ConstraintId`] - Index of a constraint row in the caller's constraint list
//! - [`SolverError`] - Error type for configuration and checked setters
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They carry no solver logic and no math
//! dependencies, so they can be shared between:
//!
//! - The constraint core (impulse-solver)
//! - Time-stepping code that owns bodies and builds Jacobians
//! - Logging and replay tooling (serialized multiplier snapshots)
//!
//! Identifiers are plain newtypes over `u32`. Using ids instead of references
//! keeps constraint/variable links cheap to copy, trivially serializable, and
//! free of aliasing questions when the solver mutates shared velocity state.
//!
//! # Example
//!
//! ```
//! use impulse_types::{ConstraintId, VariableId};
//!
//! let var = VariableId::new(3);
//! assert_eq!(var.index(), 3);
//!
//! let row = ConstraintId::from(7);
//! assert_eq!(row.index(), 7);
//! ```

#![doc(html_root_url = "https://docs.rs/impulse-types/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod error;
mod ids;

pub use error::SolverError;
pub use ids::{ConstraintId, VariableId};

/// Result type for solver operations.
pub type Result<T> = std::result::Result<T, SolverError>;
