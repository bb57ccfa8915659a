mod matrix;
mod shape;
mod storage;

pub use matrix::{Matrix, ShapeError};
pub use storage::Element;
