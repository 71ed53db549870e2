//! Strongly-typed identifiers for solver entities.
//!
//! Newtype wrappers prevent accidental mixing of variable-block indices
//! with constraint-row indices.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable index of a velocity block inside a variable arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariableId(pub u32);

/// Index of a constraint row within a constraint list.
///
/// Used by friction rows to name their paired normal row, so the pairing
/// survives serialization and slice reordering done by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintId(pub u32);

impl VariableId {
    /// Create a new variable ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the raw index as `usize` for array indexing.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl ConstraintId {
    /// Create a new constraint ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the raw index as `usize` for array indexing.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for VariableId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<u32> for ConstraintId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for VariableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Variable({})", self.0)
    }
}

impl std::fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Constraint({})", self.0)
    }
}
