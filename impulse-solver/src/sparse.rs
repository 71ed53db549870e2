//! Sparse assembly surface for materializing global matrices.
//!
//! The iterative solver never forms a global matrix, but direct-method
//! fallbacks and diagnostics sometimes need the assembled Jacobian (or its
//! transpose). [`SparseAssembly`] is the projection target constraints
//! write into: a position-keyed accumulator with **overwrite** semantics -
//! writing the same position twice replaces the value, it never sums.
//! That matches how rows project themselves (each row owns its entries and
//! may legitimately be projected more than once after a refresh), which is
//! exactly where triplet-accumulating formats would silently double values.
//!
//! Export to [`CsrMatrix`] for sparse consumers, or to a dense matrix for
//! tests and small systems.

use hashbrown::HashMap;
use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Write-only sparse matrix assembly target with last-write-wins entries.
#[derive(Debug, Clone)]
pub struct SparseAssembly {
    entries: HashMap<(usize, usize), f64>,
    nrows: usize,
    ncols: usize,
}

impl SparseAssembly {
    /// Create an empty assembly target with fixed dimensions.
    #[must_use]
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            entries: HashMap::new(),
            nrows,
            ncols,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[must_use]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of positions written so far.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write `value` at `(row, col)`, replacing any previous value there.
    ///
    /// Out-of-range positions are a caller bug; they are caught by
    /// `debug_assert` in debug builds and ignored in release builds.
    pub fn put(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.nrows, "row {row} out of range");
        debug_assert!(col < self.ncols, "col {col} out of range");
        if row < self.nrows && col < self.ncols {
            self.entries.insert((row, col), value);
        }
    }

    /// Discard all written entries, keeping the dimensions.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Export to CSR, dropping near-zero entries.
    ///
    /// The export is deterministic: entries are sorted by position before
    /// conversion, so identical contents produce identical matrices
    /// regardless of write order.
    #[must_use]
    pub fn to_csr(&self) -> CsrMatrix<f64> {
        let mut triplets: Vec<(usize, usize, f64)> = self
            .entries
            .iter()
            .map(|(&(row, col), &value)| (row, col, value))
            .collect();
        triplets.sort_unstable_by_key(|&(row, col, _)| (row, col));

        let mut coo = CooMatrix::new(self.nrows, self.ncols);
        for (row, col, value) in triplets {
            if value.abs() > 1e-15 {
                coo.push(row, col, value);
            }
        }

        CsrMatrix::from(&coo)
    }

    /// Export to a dense matrix (for testing or small systems).
    #[must_use]
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.nrows, self.ncols);
        for (&(row, col), &value) in &self.entries {
            dense[(row, col)] = value;
        }
        dense
    }
}
