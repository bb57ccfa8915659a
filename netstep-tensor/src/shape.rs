use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Shape {
    /// Length of each dimension.
    pub(crate) dims: Vec<usize>,
    /// Pre-computed row-major strides for each dimension.
    pub(crate) strides: Vec<usize>,
}

impl Shape {
    pub(crate) fn new(dims: &[usize]) -> Self {
        let mut strides = vec![1; dims.len()];
        (0..dims.len().saturating_sub(1)).rev().for_each(|i| {
            strides[i] = strides[i + 1] * dims[i + 1];
        });
        Self {
            dims: dims.to_vec(),
            strides,
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.dims.iter().product()
    }

    /// Converts n-dimensional indices to a linear index.
    pub(crate) fn ravel_index(&self, indices: &[usize]) -> usize {
        assert_eq!(
            indices.len(),
            self.dims.len(),
            "Indices length must match shape dimensions"
        );

        indices
            .iter()
            .zip(self.dims.iter().zip(self.strides.iter()))
            .map(|(&idx, (&dim, &stride))| {
                assert!(idx < dim, "Index {idx} out of bounds for dimension of {dim}");
                idx * stride
            })
            .sum()
    }

    /// Converts a linear index to n-dimensional indices.
    pub(crate) fn unravel_index(&self, index: usize) -> Vec<usize> {
        let mut indices = vec![0; self.dims.len()];
        let mut remaining_index = index;
        for (i, &stride) in self.strides.iter().enumerate() {
            indices[i] = remaining_index / stride;
            remaining_index %= stride;
        }
        indices
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = self
            .dims
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("x");
        write!(f, "{dims}")
    }
}
