use serde::{Serialize, Deserialize};

use crate::error::{NnError, Result};
use crate::math::storage::WeightStorage;

/// Plain in-memory weight matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    /// Builds a matrix from row vectors; every row must have the same length.
    pub fn from_data(data: Vec<Vec<f64>>) -> Result<Matrix> {
        let cols = data.first().map_or(0, Vec::len);
        if let Some(bad) = data.iter().find(|row| row.len() != cols) {
            return Err(NnError::shape("matrix row", cols, bad.len()));
        }
        Ok(Matrix {
            rows: data.len(),
            cols,
            data
        })
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row][col] = value;
    }

    fn check_row(&self, index: usize) -> Result<()> {
        if index >= self.rows {
            return Err(NnError::RowOutOfRange { row: index, rows: self.rows });
        }
        Ok(())
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

impl WeightStorage for Matrix {
    fn allocate(rows: usize, cols: usize) -> Result<Self> {
        Ok(Matrix::zeros(rows, cols))
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn row(&mut self, index: usize) -> Result<&[f64]> {
        self.check_row(index)?;
        Ok(&self.data[index])
    }

    fn update_row<F>(&mut self, index: usize, edit: F) -> Result<()>
    where
        F: FnOnce(&mut [f64]),
    {
        self.check_row(index)?;
        edit(&mut self.data[index]);
        Ok(())
    }

    /// Grows one row at a time instead of allocating `rows × cols` up front.
    fn from_row_source<F>(rows: usize, cols: usize, mut next_row: F) -> Result<Self>
    where
        F: FnMut(usize) -> Result<Vec<f64>>,
    {
        let mut data = Vec::new();
        for i in 0..rows {
            let row = next_row(i)?;
            if row.len() != cols {
                return Err(NnError::shape("matrix row", cols, row.len()));
            }
            data.push(row);
        }
        Ok(Matrix { rows, cols, data })
    }
}
