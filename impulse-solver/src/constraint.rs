//! Scalar two-body constraint rows.
//!
//! A [`Constraint`] is one row of the global constraint Jacobian, linking up
//! to two velocity blocks. It owns its slice of the Jacobian (`cq_a`,
//! `cq_b`), the derived effective-mass rows (`eq = M^-1 * cq^T`), and the
//! scalar Schur-complement diagonal that the iterative solver divides by.
//! With those cached per row, a whole solve never forms a global matrix:
//!
//! - row residual: `cq_a . v_a + cq_b . v_b + cfm * lambda - target_rate`
//! - impulse application: `v_side += eq_side * delta_lambda`
//!
//! Both Jacobian and effective-mass rows are stored as plain vectors and
//! combined only through dot products, so there is no row/column storage
//! convention to get wrong.
//!
//! # Validity
//!
//! A row is valid only when both sides were bound to ids that resolve in
//! the arena. Invalid rows are inert: every operation on them is a no-op,
//! never an error, so a partially built constraint list is always safe to
//! hand to the solver. A fixed entity is a *valid* side with zero degrees
//! of freedom - it participates structurally but contributes nothing.
//!
//! # Durable state
//!
//! Only the kind tag, the compliance `cfm`, and the multiplier survive
//! serialization (see [`ConstraintRecord`]). Jacobian rows, effective-mass
//! rows, and the Schur diagonal are step-local and recomputed; variable
//! links are ids into an arena that must be rebuilt, so a restored row is
//! invalid until [`Constraint::bind`] runs again.

use nalgebra::DVector;

use impulse_types::{Result, SolverError, VariableId};

use crate::projection::ConstraintKind;
use crate::sparse::SparseAssembly;
use crate::variables::{Variable, VariableSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Resolve a side to its block, if the id is present, in range, active,
/// and carries any degrees of freedom.
fn active_side(variables: &VariableSet, id: Option<VariableId>) -> Option<&Variable> {
    let var = variables.get(id?)?;
    (var.is_active() && var.ndof() > 0).then_some(var)
}

fn active_side_mut(variables: &mut VariableSet, id: Option<VariableId>) -> Option<&mut Variable> {
    let var = variables.get_mut(id?)?;
    (var.is_active() && var.ndof() > 0).then_some(var)
}

/// A scalar constraint row between two velocity blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    var_a: Option<VariableId>,
    var_b: Option<VariableId>,
    valid: bool,
    kind: ConstraintKind,
    /// Jacobian row restricted to side a, length = ndof of that block.
    cq_a: DVector<f64>,
    cq_b: DVector<f64>,
    /// Effective mass rows `M^-1 * cq^T`, refreshed by `update_auxiliary`.
    eq_a: DVector<f64>,
    eq_b: DVector<f64>,
    schur_diag: f64,
    cfm: f64,
    target_rate: f64,
    lambda: f64,
}

impl Constraint {
    /// Create an unbound (invalid) row of the given kind.
    #[must_use]
    pub fn new(kind: ConstraintKind) -> Self {
        Self {
            var_a: None,
            var_b: None,
            valid: false,
            kind,
            cq_a: DVector::zeros(0),
            cq_b: DVector::zeros(0),
            eq_a: DVector::zeros(0),
            eq_b: DVector::zeros(0),
            schur_diag: 0.0,
            cfm: 0.0,
            target_rate: 0.0,
            lambda: 0.0,
        }
    }

    /// Create a row and immediately bind it to two blocks.
    #[must_use]
    pub fn between(
        variables: &VariableSet,
        a: Option<VariableId>,
        b: Option<VariableId>,
        kind: ConstraintKind,
    ) -> Self {
        let mut constraint = Self::new(kind);
        constraint.bind(variables, a, b);
        constraint
    }

    /// Link the row to its two blocks.
    ///
    /// Both sides must be present and resolve in the arena for the row to
    /// become valid; otherwise the row is marked invalid and every later
    /// operation on it is a no-op. On success the Jacobian and
    /// effective-mass rows are resized to each side's degrees of freedom
    /// and zeroed, so the row must be refilled after every rebind.
    pub fn bind(
        &mut self,
        variables: &VariableSet,
        a: Option<VariableId>,
        b: Option<VariableId>,
    ) {
        self.var_a = a;
        self.var_b = b;
        self.schur_diag = 0.0;

        let resolved_a = a.and_then(|id| variables.get(id));
        let resolved_b = b.and_then(|id| variables.get(id));

        if let (Some(va), Some(vb)) = (resolved_a, resolved_b) {
            self.valid = true;
            self.cq_a = DVector::zeros(va.ndof());
            self.eq_a = DVector::zeros(va.ndof());
            self.cq_b = DVector::zeros(vb.ndof());
            self.eq_b = DVector::zeros(vb.ndof());
        } else {
            self.valid = false;
            self.cq_a = DVector::zeros(0);
            self.eq_a = DVector::zeros(0);
            self.cq_b = DVector::zeros(0);
            self.eq_b = DVector::zeros(0);
        }
    }

    /// Whether both sides resolved at the last bind.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The admissible set of this row's multiplier.
    #[must_use]
    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    /// Id of side a, as last bound.
    #[must_use]
    pub fn variable_a(&self) -> Option<VariableId> {
        self.var_a
    }

    /// Id of side b, as last bound.
    #[must_use]
    pub fn variable_b(&self) -> Option<VariableId> {
        self.var_b
    }

    /// Refresh the derived per-row quantities from the current Jacobian:
    /// `eq_side = M_side^-1 * cq_side^T` and the Schur diagonal
    /// `g = cq_a . eq_a + cq_b . eq_b + cfm`.
    ///
    /// Must run after every Jacobian refresh and before sweeping. Inactive
    /// or zero-DOF sides contribute nothing and their effective-mass rows
    /// are zeroed.
    pub fn update_auxiliary(&mut self, variables: &VariableSet) {
        if !self.valid {
            return;
        }

        let mut g = 0.0;

        if let Some(var) = active_side(variables, self.var_a) {
            var.inverse_mass().apply_into(&self.cq_a, &mut self.eq_a);
            g += self.cq_a.dot(&self.eq_a);
        } else {
            self.eq_a.fill(0.0);
        }

        if let Some(var) = active_side(variables, self.var_b) {
            var.inverse_mass().apply_into(&self.cq_b, &mut self.eq_b);
            g += self.cq_b.dot(&self.eq_b);
        } else {
            self.eq_b.fill(0.0);
        }

        if self.cfm != 0.0 {
            g += self.cfm;
        }
        self.schur_diag = g;
    }

    /// Current constraint-space velocity `cq_a . v_a + cq_b . v_b`.
    #[must_use]
    pub fn constraint_velocity(&self, variables: &VariableSet) -> f64 {
        if !self.valid {
            return 0.0;
        }

        let mut rate = 0.0;
        if let Some(var) = active_side(variables, self.var_a) {
            rate += self.cq_a.dot(var.velocity());
        }
        if let Some(var) = active_side(variables, self.var_b) {
            rate += self.cq_b.dot(var.velocity());
        }
        rate
    }

    /// Signed violation of this row at the current velocities:
    /// `constraint_velocity + cfm * lambda - target_rate`. Zero for
    /// invalid rows.
    #[must_use]
    pub fn residual(&self, variables: &VariableSet) -> f64 {
        if !self.valid {
            return 0.0;
        }
        self.constraint_velocity(variables) + self.cfm * self.lambda - self.target_rate
    }

    /// Push a multiplier change through the effective-mass rows:
    /// `v_side += eq_side * delta` for each active side.
    pub fn apply_impulse(&self, variables: &mut VariableSet, delta: f64) {
        if !self.valid {
            return;
        }

        if let Some(var) = active_side_mut(variables, self.var_a) {
            var.accumulate_velocity(&self.eq_a, delta);
        }
        if let Some(var) = active_side_mut(variables, self.var_b) {
            var.accumulate_velocity(&self.eq_b, delta);
        }
    }

    /// Accumulate this row's product with a global velocity vector:
    /// `*accumulator += cq . velocities[offset..offset + ndof]` per side.
    ///
    /// Segments that fall outside `velocities` (stale offsets) are skipped.
    pub fn add_jacobian_product(
        &self,
        variables: &VariableSet,
        velocities: &DVector<f64>,
        accumulator: &mut f64,
    ) {
        if !self.valid {
            return;
        }

        if let Some(var) = active_side(variables, self.var_a) {
            let (offset, n) = (var.offset(), var.ndof());
            if offset + n <= velocities.len() {
                *accumulator += self.cq_a.dot(&velocities.rows(offset, n));
            }
        }
        if let Some(var) = active_side(variables, self.var_b) {
            let (offset, n) = (var.offset(), var.ndof());
            if offset + n <= velocities.len() {
                *accumulator += self.cq_b.dot(&velocities.rows(offset, n));
            }
        }
    }

    /// Accumulate this row's transpose product into a global vector:
    /// `out[offset..offset + ndof] += cq * factor` per side.
    pub fn add_jacobian_transpose_product(
        &self,
        variables: &VariableSet,
        factor: f64,
        out: &mut DVector<f64>,
    ) {
        if !self.valid {
            return;
        }

        if let Some(var) = active_side(variables, self.var_a) {
            let (offset, n) = (var.offset(), var.ndof());
            if offset + n <= out.len() {
                out.rows_mut(offset, n).axpy(factor, &self.cq_a, 1.0);
            }
        }
        if let Some(var) = active_side(variables, self.var_b) {
            let (offset, n) = (var.offset(), var.ndof());
            if offset + n <= out.len() {
                out.rows_mut(offset, n).axpy(factor, &self.cq_b, 1.0);
            }
        }
    }

    /// Overlay this row into a sparse assembly target at `row`, writing the
    /// full dense row-block of each active side at its global offset.
    pub fn write_jacobian(&self, variables: &VariableSet, target: &mut SparseAssembly, row: usize) {
        if !self.valid {
            return;
        }

        if let Some(var) = active_side(variables, self.var_a) {
            for (k, &value) in self.cq_a.iter().enumerate() {
                target.put(row, var.offset() + k, value);
            }
        }
        if let Some(var) = active_side(variables, self.var_b) {
            for (k, &value) in self.cq_b.iter().enumerate() {
                target.put(row, var.offset() + k, value);
            }
        }
    }

    /// Overlay this row transposed into a sparse assembly target at `column`.
    pub fn write_jacobian_transpose(
        &self,
        variables: &VariableSet,
        target: &mut SparseAssembly,
        column: usize,
    ) {
        if !self.valid {
            return;
        }

        if let Some(var) = active_side(variables, self.var_a) {
            for (k, &value) in self.cq_a.iter().enumerate() {
                target.put(var.offset() + k, column, value);
            }
        }
        if let Some(var) = active_side(variables, self.var_b) {
            for (k, &value) in self.cq_b.iter().enumerate() {
                target.put(var.offset() + k, column, value);
            }
        }
    }

    /// Jacobian row of side a.
    #[must_use]
    pub fn jacobian_a(&self) -> &[f64] {
        self.cq_a.as_slice()
    }

    /// Jacobian row of side b.
    #[must_use]
    pub fn jacobian_b(&self) -> &[f64] {
        self.cq_b.as_slice()
    }

    /// Mutable Jacobian row of side a. The length is fixed by the last bind.
    pub fn jacobian_a_mut(&mut self) -> &mut [f64] {
        self.cq_a.as_mut_slice()
    }

    /// Mutable Jacobian row of side b. The length is fixed by the last bind.
    pub fn jacobian_b_mut(&mut self) -> &mut [f64] {
        self.cq_b.as_mut_slice()
    }

    /// Overwrite the Jacobian row of side a.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::DimensionMismatch`] if the slice length does
    /// not match the bound block's degrees of freedom.
    pub fn set_jacobian_a(&mut self, row: &[f64]) -> Result<()> {
        if row.len() != self.cq_a.len() {
            return Err(SolverError::dimension_mismatch(self.cq_a.len(), row.len()));
        }
        self.cq_a.copy_from_slice(row);
        Ok(())
    }

    /// Overwrite the Jacobian row of side b.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::DimensionMismatch`] if the slice length does
    /// not match the bound block's degrees of freedom.
    pub fn set_jacobian_b(&mut self, row: &[f64]) -> Result<()> {
        if row.len() != self.cq_b.len() {
            return Err(SolverError::dimension_mismatch(self.cq_b.len(), row.len()));
        }
        self.cq_b.copy_from_slice(row);
        Ok(())
    }

    /// Effective mass row of side a (`M_a^-1 * cq_a^T`).
    #[must_use]
    pub fn effective_mass_a(&self) -> &[f64] {
        self.eq_a.as_slice()
    }

    /// Effective mass row of side b (`M_b^-1 * cq_b^T`).
    #[must_use]
    pub fn effective_mass_b(&self) -> &[f64] {
        self.eq_b.as_slice()
    }

    /// Scalar Schur-complement diagonal from the last
    /// [`Constraint::update_auxiliary`].
    #[must_use]
    pub fn schur_diag(&self) -> f64 {
        self.schur_diag
    }

    /// Constraint force mixing (compliance) added to the Schur diagonal.
    #[must_use]
    pub fn cfm(&self) -> f64 {
        self.cfm
    }

    /// Set the compliance term. Takes effect at the next
    /// [`Constraint::update_auxiliary`].
    pub fn set_cfm(&mut self, cfm: f64) {
        self.cfm = cfm;
    }

    /// Rate the constraint velocity is driven toward (restitution or
    /// stabilization bias; zero for a plain velocity-level row).
    #[must_use]
    pub fn target_rate(&self) -> f64 {
        self.target_rate
    }

    /// Set the target rate.
    pub fn set_target_rate(&mut self, target_rate: f64) {
        self.target_rate = target_rate;
    }

    /// Current Lagrange multiplier.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        self.lambda
    }

    /// Overwrite the multiplier (e.g. when seeding from a snapshot).
    pub fn set_multiplier(&mut self, multiplier: f64) {
        self.lambda = multiplier;
    }

    /// Zero the multiplier, discarding warm-start state for this row.
    pub fn reset_multiplier(&mut self) {
        self.lambda = 0.0;
    }

    /// Snapshot the durable subset of this row.
    #[must_use]
    pub fn record(&self) -> ConstraintRecord {
        ConstraintRecord {
            kind: self.kind,
            cfm: self.cfm,
            multiplier: self.lambda,
        }
    }

    /// Rebuild a row from a snapshot. The result is unbound (invalid) until
    /// [`Constraint::bind`] relinks it to a rebuilt arena.
    #[must_use]
    pub fn from_record(record: ConstraintRecord) -> Self {
        let mut constraint = Self::new(record.kind);
        constraint.cfm = record.cfm;
        constraint.lambda = record.multiplier;
        constraint
    }
}

/// The durable subset of a constraint row.
///
/// Everything else on a [`Constraint`] is either step-local (Jacobian and
/// effective-mass rows, Schur diagonal) or an arena id that does not survive
/// a rebuild, so this is all that persistence needs to carry.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintRecord {
    /// Admissible set tag.
    pub kind: ConstraintKind,
    /// Compliance term.
    pub cfm: f64,
    /// Multiplier, kept for warm starting across a save/load boundary.
    pub multiplier: f64,
}
