use crate::error::{NnError, Result};

/// Row-granular access to a 2-D weight array.
///
/// Layers only ever touch their weights through whole rows, so the same
/// layer code runs on an in-memory [`Matrix`](crate::math::matrix::Matrix)
/// and on a disk-backed [`MatrixStore`](crate::math::matrix_store::MatrixStore).
pub trait WeightStorage: Sized + Send + Sync {
    /// Allocates a zero-filled `rows × cols` array.
    fn allocate(rows: usize, cols: usize) -> Result<Self>;

    fn rows(&self) -> usize;

    fn cols(&self) -> usize;

    /// Returns row `index`. The view is valid until the next access.
    fn row(&mut self, index: usize) -> Result<&[f64]>;

    /// Lets `edit` modify row `index` in place and persists the result.
    fn update_row<F>(&mut self, index: usize, edit: F) -> Result<()>
    where
        F: FnOnce(&mut [f64]);

    /// Overwrites row `index` with `values`.
    fn fill_row(&mut self, index: usize, values: &[f64]) -> Result<()> {
        if values.len() != self.cols() {
            return Err(NnError::shape("row values", self.cols(), values.len()));
        }
        self.update_row(index, |row| row.copy_from_slice(values))
    }

    /// Builds a `rows × cols` array from rows produced one at a time.
    ///
    /// Nothing is reserved until `next_row` has produced the first row, so
    /// a source that fails early never costs a `rows × cols` allocation.
    fn from_row_source<F>(rows: usize, cols: usize, mut next_row: F) -> Result<Self>
    where
        F: FnMut(usize) -> Result<Vec<f64>>,
    {
        if rows == 0 {
            return Self::allocate(rows, cols);
        }
        let first = next_row(0)?;
        let mut array = Self::allocate(rows, cols)?;
        array.fill_row(0, &first)?;
        for i in 1..rows {
            let row = next_row(i)?;
            array.fill_row(i, &row)?;
        }
        Ok(array)
    }

    /// Copies the whole array out, row-major.
    fn to_rows(&mut self) -> Result<Vec<Vec<f64>>> {
        (0..self.rows())
            .map(|i| self.row(i).map(<[f64]>::to_vec))
            .collect()
    }
}
