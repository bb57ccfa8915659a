use std::{
    fmt::{self, Display},
    ops::{Index, IndexMut},
};

use serde::{Serialize, Serializer};

use crate::{shape::Shape, storage::Element, storage::Storage};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("row {row} has {actual} columns, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// A dense, row-major `rows x cols` matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T: Element> {
    shape: Shape,
    storage: Storage<T>,
}

impl<T: Element> Matrix<T> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        let shape = Shape::new(&[rows, cols]);
        let storage = Storage::zeros(shape.size());
        Self { shape, storage }
    }

    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        let shape = Shape::new(&[rows, cols]);
        let storage = Storage::filled(shape.size(), value);
        Self { shape, storage }
    }

    /// Builds a matrix by calling `f(row, col)` for every entry in row-major order.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let mut matrix = Self::zeros(rows, cols);
        for k in 0..matrix.len() {
            let idx = matrix.shape.unravel_index(k);
            matrix.storage[k] = f(idx[0], idx[1]);
        }
        matrix
    }

    /// Builds a matrix from nested rows. Every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, ShapeError> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(ShapeError::RaggedRows {
                row,
                expected: cols,
                actual: r.len(),
            });
        }
        let shape = Shape::new(&[rows.len(), cols]);
        let data = rows.into_iter().flatten().collect();
        Ok(Self {
            shape,
            storage: Storage { data },
        })
    }

    pub fn rows(&self) -> usize {
        self.shape.dims[0]
    }

    pub fn cols(&self) -> usize {
        self.shape.dims[1]
    }

    /// `(rows, cols)`
    pub fn dims(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    pub fn row(&self, row: usize) -> &[T] {
        let start = self.shape.ravel_index(&[row, 0]);
        &self.storage.data[start..start + self.cols()]
    }

    pub fn row_iter(&self) -> impl Iterator<Item = &[T]> {
        (0..self.rows()).map(move |r| self.row(r))
    }

    /// All entries in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.storage.data.iter()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.len() == 0
    }
}

impl<T: Element> Index<[usize; 2]> for Matrix<T> {
    type Output = T;

    fn index(&self, idx: [usize; 2]) -> &Self::Output {
        &self.storage[self.shape.ravel_index(&idx)]
    }
}

impl<T: Element> IndexMut<[usize; 2]> for Matrix<T> {
    fn index_mut(&mut self, idx: [usize; 2]) -> &mut Self::Output {
        &mut self.storage[self.shape.ravel_index(&idx)]
    }
}

impl<T: Element> Display for Matrix<T> {
    /// Prints one bracketed row per line with columns right-aligned. The formatter's precision
    /// (`{:.2}`) controls the digits shown, defaulting to 4.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(4);
        writeln!(f, "Matrix({}):", self.shape)?;

        let cells = self
            .iter()
            .map(|v| format!("{v:.precision$}"))
            .collect::<Vec<_>>();
        let max_width = cells.iter().map(String::len).max().unwrap_or(1);

        for r in 0..self.rows() {
            write!(f, "[")?;
            for c in 0..self.cols() {
                if c > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:>width$}", cells[r * self.cols() + c], width = max_width)?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

impl<T: Element + Serialize> Serialize for Matrix<T> {
    /// Serializes as nested rows, `[[w00, w01, ..], [w10, ..], ..]`.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.row_iter())
    }
}
