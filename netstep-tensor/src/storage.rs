use std::{
    fmt::{Debug, Display},
    ops::{Index, IndexMut},
};

use num_traits::Zero;

/// Scalar types a [`crate::Matrix`] can hold.
pub trait Element: Zero + Copy + PartialOrd + Display + Debug {}

impl Element for f32 {}
impl Element for f64 {}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Storage<T: Element> {
    pub(crate) data: Vec<T>,
}

impl<T: Element> Storage<T> {
    pub(crate) fn zeros(size: usize) -> Self {
        Self {
            data: vec![T::zero(); size],
        }
    }

    pub(crate) fn filled(size: usize, value: T) -> Self {
        Self {
            data: vec![value; size],
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }
}

impl<T: Element> Index<usize> for Storage<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl<T: Element> IndexMut<usize> for Storage<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.data[index]
    }
}
