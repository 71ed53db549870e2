//! Velocity blocks and their inverse mass operators.
//!
//! A [`Variable`] is one block of generalized velocity state: a rigid body,
//! a particle cluster, or any other entity whose response to impulses is
//! described by a per-block inverse mass operator. Constraints never see
//! mass matrices directly - they only ever ask a block to apply `M^-1` to a
//! vector, which keeps the solver matrix-free.
//!
//! Blocks live in a [`VariableSet`] arena and are addressed by
//! [`VariableId`]. The arena is append-only, so ids handed out by
//! [`VariableSet::insert`] stay valid for the lifetime of the set and the
//! degrees of freedom of a block never change after construction.
//!
//! # Fixed entities
//!
//! A wall, the ground, or any immovable anchor is modeled as
//! [`Variable::fixed`]: a block with zero degrees of freedom. Constraints
//! bound to such a block simply get a zero-length Jacobian row on that side
//! and the side contributes nothing to any product.

use nalgebra::{DMatrix, DVector, Matrix3};

use impulse_types::{Result, SolverError, VariableId};

/// Inverse mass operator of a single velocity block.
///
/// The operator maps a generalized force/impulse vector to the resulting
/// velocity change: `dv = M^-1 * f`. The number of degrees of freedom of the
/// owning block is derived from the operator, so the two can never disagree.
#[derive(Debug, Clone, PartialEq)]
pub enum InverseMass {
    /// Per-DOF inverse masses (particles, decoupled generalized coordinates).
    Diagonal(DVector<f64>),

    /// Full inverse mass matrix. Must be square; use [`InverseMass::dense`]
    /// to construct with the shape checked.
    Dense(DMatrix<f64>),

    /// Six-DOF rigid body block: scalar inverse mass on the linear triple,
    /// world-frame inverse inertia on the angular triple.
    RigidBody {
        /// Inverse mass (same for all 3 linear components).
        inv_mass: f64,
        /// Inverse inertia tensor in world frame.
        inv_inertia: Matrix3<f64>,
    },
}

impl InverseMass {
    /// Identity operator with `ndof` degrees of freedom (unit masses).
    #[must_use]
    pub fn identity(ndof: usize) -> Self {
        Self::Diagonal(DVector::from_element(ndof, 1.0))
    }

    /// Full inverse mass matrix.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::DimensionMismatch`] if the matrix is not square.
    pub fn dense(matrix: DMatrix<f64>) -> Result<Self> {
        if !matrix.is_square() {
            return Err(SolverError::dimension_mismatch(
                matrix.nrows(),
                matrix.ncols(),
            ));
        }
        Ok(Self::Dense(matrix))
    }

    /// Rigid body operator from scalar inverse mass and inverse inertia.
    #[must_use]
    pub fn rigid_body(inv_mass: f64, inv_inertia: Matrix3<f64>) -> Self {
        Self::RigidBody {
            inv_mass,
            inv_inertia,
        }
    }

    /// Number of degrees of freedom this operator acts on.
    #[must_use]
    pub fn ndof(&self) -> usize {
        match self {
            Self::Diagonal(d) => d.len(),
            Self::Dense(m) => m.nrows(),
            Self::RigidBody { .. } => 6,
        }
    }

    /// Compute `M^-1 * rhs` into a fresh vector.
    #[must_use]
    pub fn apply(&self, rhs: &DVector<f64>) -> DVector<f64> {
        let mut out = DVector::zeros(self.ndof());
        self.apply_into(rhs, &mut out);
        out
    }

    /// Compute `M^-1 * rhs` into `out`, resizing `out` if needed.
    ///
    /// A `rhs` whose length does not match the operator yields a zero result
    /// rather than a panic; the mismatch is a caller bug and is caught by
    /// `debug_assert` in debug builds.
    pub fn apply_into(&self, rhs: &DVector<f64>, out: &mut DVector<f64>) {
        let n = self.ndof();
        if out.len() != n {
            *out = DVector::zeros(n);
        }
        debug_assert_eq!(rhs.len(), n, "inverse mass applied to wrong-size vector");
        if rhs.len() != n {
            out.fill(0.0);
            return;
        }

        match self {
            Self::Diagonal(d) => {
                out.copy_from(rhs);
                out.component_mul_assign(d);
            }
            Self::Dense(m) => {
                if m.ncols() == rhs.len() {
                    out.gemv(1.0, m, rhs, 0.0);
                } else {
                    out.fill(0.0);
                }
            }
            Self::RigidBody {
                inv_mass,
                inv_inertia,
            } => {
                let linear = rhs.fixed_rows::<3>(0) * *inv_mass;
                let angular = inv_inertia * rhs.fixed_rows::<3>(3);
                out.fixed_rows_mut::<3>(0).copy_from(&linear);
                out.fixed_rows_mut::<3>(3).copy_from(&angular);
            }
        }
    }
}

/// One block of generalized velocity state.
///
/// Holds the block's current velocity, a generalized force accumulator used
/// to seed unconstrained velocities, an activity flag, and the offset of the
/// block inside the conceptual global velocity vector. The velocity and
/// force buffers always have exactly `ndof` entries; the mutable accessors
/// hand out slices so the lengths cannot drift.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    active: bool,
    offset: usize,
    velocity: DVector<f64>,
    force: DVector<f64>,
    inv_mass: InverseMass,
}

impl Variable {
    /// Create an active block with zeroed velocity and force.
    #[must_use]
    pub fn new(inv_mass: InverseMass) -> Self {
        let ndof = inv_mass.ndof();
        Self {
            active: true,
            offset: 0,
            velocity: DVector::zeros(ndof),
            force: DVector::zeros(ndof),
            inv_mass,
        }
    }

    /// Create a fixed (immovable) block with zero degrees of freedom.
    #[must_use]
    pub fn fixed() -> Self {
        Self::new(InverseMass::Diagonal(DVector::zeros(0)))
    }

    /// Set the initial velocity, consuming and returning the block.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::DimensionMismatch`] on wrong slice length.
    pub fn with_velocity(mut self, velocity: &[f64]) -> Result<Self> {
        self.set_velocity(velocity)?;
        Ok(self)
    }

    /// Set the generalized force, consuming and returning the block.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::DimensionMismatch`] on wrong slice length.
    pub fn with_force(mut self, force: &[f64]) -> Result<Self> {
        self.set_force(force)?;
        Ok(self)
    }

    /// Number of degrees of freedom.
    #[must_use]
    pub fn ndof(&self) -> usize {
        self.inv_mass.ndof()
    }

    /// Whether this block participates in solves.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Enable or disable this block. Inactive blocks contribute nothing to
    /// any constraint product and are skipped by offset assignment.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Offset of this block inside the global velocity vector.
    ///
    /// Only meaningful for active blocks after
    /// [`VariableSet::assign_offsets`] has run.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Set the global offset directly (for callers with their own layout).
    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Current generalized velocity.
    #[must_use]
    pub fn velocity(&self) -> &DVector<f64> {
        &self.velocity
    }

    /// Mutable view of the velocity entries.
    pub fn velocity_mut(&mut self) -> &mut [f64] {
        self.velocity.as_mut_slice()
    }

    /// Overwrite the velocity from a slice.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::DimensionMismatch`] on wrong slice length.
    pub fn set_velocity(&mut self, velocity: &[f64]) -> Result<()> {
        if velocity.len() != self.velocity.len() {
            return Err(SolverError::dimension_mismatch(
                self.velocity.len(),
                velocity.len(),
            ));
        }
        self.velocity.copy_from_slice(velocity);
        Ok(())
    }

    /// Generalized force accumulator.
    #[must_use]
    pub fn force(&self) -> &DVector<f64> {
        &self.force
    }

    /// Mutable view of the force entries.
    pub fn force_mut(&mut self) -> &mut [f64] {
        self.force.as_mut_slice()
    }

    /// Overwrite the force accumulator from a slice.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::DimensionMismatch`] on wrong slice length.
    pub fn set_force(&mut self, force: &[f64]) -> Result<()> {
        if force.len() != self.force.len() {
            return Err(SolverError::dimension_mismatch(
                self.force.len(),
                force.len(),
            ));
        }
        self.force.copy_from_slice(force);
        Ok(())
    }

    /// The block's inverse mass operator.
    #[must_use]
    pub fn inverse_mass(&self) -> &InverseMass {
        &self.inv_mass
    }

    /// Compute `M^-1 * rhs` for this block.
    #[must_use]
    pub fn apply_inverse_mass(&self, rhs: &DVector<f64>) -> DVector<f64> {
        self.inv_mass.apply(rhs)
    }

    /// `velocity += direction * scale`, used by constraints to push impulses
    /// through their effective mass rows.
    pub(crate) fn accumulate_velocity(&mut self, direction: &DVector<f64>, scale: f64) {
        debug_assert_eq!(direction.len(), self.velocity.len());
        if direction.len() == self.velocity.len() {
            self.velocity.axpy(scale, direction, 1.0);
        }
    }
}

/// Append-only arena of velocity blocks.
///
/// Ids returned by [`VariableSet::insert`] are stable: blocks are never
/// removed or reordered, and a block's degrees of freedom never change.
/// Deactivate a block with [`Variable::set_active`] instead of removing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableSet {
    variables: Vec<Variable>,
    system_size: usize,
}

impl VariableSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            system_size: 0,
        }
    }

    /// Create an empty set with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            variables: Vec::with_capacity(capacity),
            system_size: 0,
        }
    }

    /// Add a block and return its stable id.
    #[allow(clippy::cast_possible_truncation)] // arenas never approach u32::MAX blocks
    pub fn insert(&mut self, variable: Variable) -> VariableId {
        debug_assert!(self.variables.len() < u32::MAX as usize);
        let id = VariableId::new(self.variables.len() as u32);
        self.variables.push(variable);
        id
    }

    /// Look up a block by id.
    #[must_use]
    pub fn get(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.index())
    }

    /// Look up a block by id, mutably.
    pub fn get_mut(&mut self, id: VariableId) -> Option<&mut Variable> {
        self.variables.get_mut(id.index())
    }

    /// Number of blocks (active and inactive).
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether the set holds no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterate over all blocks.
    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.variables.iter()
    }

    /// Iterate over all blocks, mutably.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Variable> {
        self.variables.iter_mut()
    }

    /// Assign cumulative global offsets to active blocks and return the
    /// total system size (sum of active degrees of freedom).
    ///
    /// Inactive and zero-DOF blocks are skipped; their offsets are left
    /// untouched and must not be relied on.
    pub fn assign_offsets(&mut self) -> usize {
        let mut offset = 0;
        for var in &mut self.variables {
            if var.active && var.ndof() > 0 {
                var.offset = offset;
                offset += var.ndof();
            }
        }
        self.system_size = offset;
        offset
    }

    /// System size recorded by the last [`VariableSet::assign_offsets`].
    #[must_use]
    pub fn system_size(&self) -> usize {
        self.system_size
    }

    /// Sum of degrees of freedom over active blocks.
    #[must_use]
    pub fn total_dof(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.active && v.ndof() > 0)
            .map(Variable::ndof)
            .sum()
    }

    /// Seed each active block's velocity with its unconstrained response:
    /// `velocity = M^-1 * force`.
    ///
    /// Steppers call this once per step after accumulating external forces,
    /// before handing the set to the solver.
    pub fn compute_free_velocities(&mut self) {
        for var in &mut self.variables {
            if var.active && var.ndof() > 0 {
                let v = var.inv_mass.apply(&var.force);
                var.velocity.copy_from(&v);
            }
        }
    }

    /// Zero every block's force accumulator.
    pub fn clear_forces(&mut self) {
        for var in &mut self.variables {
            var.force.fill(0.0);
        }
    }

    /// Pack active block velocities into a global vector laid out by the
    /// offsets from the last [`VariableSet::assign_offsets`].
    #[must_use]
    pub fn gather_velocities(&self) -> DVector<f64> {
        let mut out = DVector::zeros(self.system_size);
        for var in &self.variables {
            if var.active && var.ndof() > 0 && var.offset + var.ndof() <= out.len() {
                out.rows_mut(var.offset, var.ndof()).copy_from(&var.velocity);
            }
        }
        out
    }

    /// Unpack a global vector back into active block velocities.
    ///
    /// Segments that fall outside `velocities` (stale offsets) are skipped.
    pub fn scatter_velocities(&mut self, velocities: &DVector<f64>) {
        for var in &mut self.variables {
            if var.active && var.ndof() > 0 && var.offset + var.ndof() <= velocities.len() {
                var.velocity
                    .copy_from(&velocities.rows(var.offset, var.ndof()));
            }
        }
    }
}
