//! Admissible sets for constraint multipliers.
//!
//! Every constraint row carries a [`ConstraintKind`] naming the set its
//! multiplier must stay in. After each Gauss-Seidel update the candidate
//! multiplier is projected back onto that set, which is all it takes to
//! turn the plain linear sweep into a projected solver for the mixed
//! complementarity problem.
//!
//! The kinds form a closed enum rather than an open trait: the solver can
//! match exhaustively, the tag serializes as plain data, and a friction row
//! can name its paired normal row by [`ConstraintId`] instead of holding a
//! reference into the constraint list.

use impulse_types::ConstraintId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The admissible set of a constraint multiplier.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConstraintKind {
    /// Bilateral constraint - the multiplier is unrestricted.
    ///
    /// Used for joints, welds, and any row that must hold exactly.
    Equality,

    /// Unilateral constraint - the multiplier stays in `[0, +inf)`.
    ///
    /// Used for contact normals and one-sided limits: the row may push but
    /// never pull.
    LowerBounded,

    /// Tangential friction row, box-bounded by the paired normal row.
    ///
    /// The multiplier is clamped to `[-friction * normal_multiplier,
    /// +friction * normal_multiplier]`, a box linearization of the Coulomb
    /// cone. The paired row should be a [`ConstraintKind::LowerBounded`]
    /// normal; if it resolves to nothing, the bound collapses to zero and
    /// the friction row transmits no impulse.
    FrictionCone {
        /// Index of the paired normal row in the caller's constraint list.
        normal: ConstraintId,
        /// Friction coefficient (negative values are treated as zero).
        friction: f64,
    },
}

impl ConstraintKind {
    /// Project a candidate multiplier onto the admissible set.
    ///
    /// `normal_multiplier` is the current multiplier of the paired normal
    /// row; it is ignored by every kind except [`ConstraintKind::FrictionCone`].
    #[must_use]
    pub fn project(&self, candidate: f64, normal_multiplier: f64) -> f64 {
        match self {
            Self::Equality => candidate,
            Self::LowerBounded => candidate.max(0.0),
            Self::FrictionCone { friction, .. } => {
                let limit = friction.max(0.0) * normal_multiplier.max(0.0);
                candidate.clamp(-limit, limit)
            }
        }
    }

    /// Whether this row holds in both directions.
    #[must_use]
    pub fn is_bilateral(&self) -> bool {
        matches!(self, Self::Equality)
    }

    /// The paired normal row, for friction kinds.
    #[must_use]
    pub fn normal_index(&self) -> Option<ConstraintId> {
        match self {
            Self::FrictionCone { normal, .. } => Some(*normal),
            _ => None,
        }
    }
}
