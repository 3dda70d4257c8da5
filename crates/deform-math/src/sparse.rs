//! Sparse matrix representation.
//!
//! Provides a CSR (Compressed Sparse Row) matrix with the handful of
//! kernels the global step needs: triplet assembly, mat-vec (serial and
//! rayon), diagonal extraction, and sparse-sparse products for the
//! accelerated Jacobi precomputation.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Compressed Sparse Row (CSR) matrix.
///
/// Stores a sparse matrix in row-major order. This is the standard
/// input format for sparse linear algebra libraries (faer, SuiteSparse).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// Row pointer array (length = rows + 1).
    /// `row_ptr[i]..row_ptr[i+1]` are the indices into `col_idx` and `values`
    /// for non-zeros in row `i`.
    pub row_ptr: Vec<usize>,
    /// Column indices of non-zero entries, ascending within each row.
    pub col_idx: Vec<usize>,
    /// Non-zero values.
    pub values: Vec<f32>,
}

impl CsrMatrix {
    /// Creates an empty CSR matrix with the given dimensions.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_ptr: vec![0; rows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Returns the number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Returns true for a square matrix.
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Creates a CSR matrix from triplets (row, col, value).
    ///
    /// Duplicate entries are summed, so per-constraint contributions
    /// can be pushed without pre-merging.
    pub fn from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, f32)]) -> Self {
        // Count entries per row
        let mut row_counts = vec![0usize; rows];
        for &(r, _, _) in triplets {
            row_counts[r] += 1;
        }

        let mut row_start = vec![0usize; rows + 1];
        for i in 0..rows {
            row_start[i + 1] = row_start[i] + row_counts[i];
        }

        // Bucket by row, using a per-row write cursor
        let mut entries = vec![(0usize, 0.0f32); row_start[rows]];
        let mut cursor = row_start[..rows].to_vec();
        for &(r, c, v) in triplets {
            entries[cursor[r]] = (c, v);
            cursor[r] += 1;
        }

        // Sort each row by column and merge duplicates
        let mut row_ptr = Vec::with_capacity(rows + 1);
        let mut col_idx = Vec::with_capacity(entries.len());
        let mut values: Vec<f32> = Vec::with_capacity(entries.len());
        row_ptr.push(0);

        for i in 0..rows {
            let row = &mut entries[row_start[i]..row_start[i + 1]];
            row.sort_by_key(|&(c, _)| c);

            let start = row_ptr[i];
            for &(c, v) in row.iter() {
                let duplicate = col_idx.len() > start && col_idx.last() == Some(&c);
                if duplicate {
                    if let Some(last) = values.last_mut() {
                        *last += v;
                    }
                } else {
                    col_idx.push(c);
                    values.push(v);
                }
            }
            row_ptr.push(col_idx.len());
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Returns the stored value at `(row, col)`, or zero.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        match self.col_idx[range.clone()].binary_search(&col) {
            Ok(k) => self.values[range.start + k],
            Err(_) => 0.0,
        }
    }

    /// Returns the main diagonal (zeros where nothing is stored).
    pub fn diagonal(&self) -> Vec<f32> {
        (0..self.rows.min(self.cols)).map(|i| self.get(i, i)).collect()
    }

    /// Computes `out = self * x` sequentially.
    pub fn mul_vec(&self, x: &[f32], out: &mut [f32]) {
        debug_assert_eq!(x.len(), self.cols);
        debug_assert_eq!(out.len(), self.rows);
        for (row, o) in out.iter_mut().enumerate() {
            *o = self.row_dot(row, x);
        }
    }

    /// Computes `out = self * x` with one rayon task per row chunk.
    pub fn mul_vec_par(&self, x: &[f32], out: &mut [f32]) {
        debug_assert_eq!(x.len(), self.cols);
        debug_assert_eq!(out.len(), self.rows);
        out.par_iter_mut()
            .enumerate()
            .for_each(|(row, o)| *o = self.row_dot(row, x));
    }

    /// Dot product of row `row` with `x`.
    #[inline]
    pub fn row_dot(&self, row: usize, x: &[f32]) -> f32 {
        let mut sum = 0.0f32;
        for k in self.row_ptr[row]..self.row_ptr[row + 1] {
            sum += self.values[k] * x[self.col_idx[k]];
        }
        sum
    }

    /// Dot product of row `row` with `x`, skipping the diagonal entry.
    #[inline]
    pub fn row_dot_off_diagonal(&self, row: usize, x: &[f32]) -> f32 {
        let mut sum = 0.0f32;
        for k in self.row_ptr[row]..self.row_ptr[row + 1] {
            let col = self.col_idx[k];
            if col != row {
                sum += self.values[k] * x[col];
            }
        }
        sum
    }

    /// Sparse-sparse product `self * rhs` (Gustavson, row by row).
    ///
    /// Entries that cancel to exactly zero are still stored; the
    /// sparsity pattern is the structural product.
    pub fn mul(&self, rhs: &CsrMatrix) -> CsrMatrix {
        debug_assert_eq!(self.cols, rhs.rows);

        let mut row_ptr = Vec::with_capacity(self.rows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);

        // Dense accumulator + marker, reused across rows
        let mut acc = vec![0.0f32; rhs.cols];
        let mut marker = vec![usize::MAX; rhs.cols];
        let mut touched: Vec<usize> = Vec::new();

        for i in 0..self.rows {
            touched.clear();
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                let a = self.values[k];
                let mid = self.col_idx[k];
                for kk in rhs.row_ptr[mid]..rhs.row_ptr[mid + 1] {
                    let j = rhs.col_idx[kk];
                    if marker[j] != i {
                        marker[j] = i;
                        acc[j] = 0.0;
                        touched.push(j);
                    }
                    acc[j] += a * rhs.values[kk];
                }
            }
            touched.sort_unstable();
            for &j in &touched {
                col_idx.push(j);
                values.push(acc[j]);
            }
            row_ptr.push(col_idx.len());
        }

        CsrMatrix {
            rows: self.rows,
            cols: rhs.cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Euclidean norm of the residual `b - self * x`, accumulated in f64.
    pub fn residual_norm(&self, x: &[f32], b: &[f32]) -> f64 {
        (0..self.rows)
            .into_par_iter()
            .map(|row| {
                let r = b[row] as f64 - self.row_dot(row, x) as f64;
                r * r
            })
            .sum::<f64>()
            .sqrt()
    }
}

/// Euclidean norm of a vector, accumulated in f64.
pub fn norm(x: &[f32]) -> f64 {
    x.iter().map(|&v| (v as f64) * (v as f64)).sum::<f64>().sqrt()
}
