use thiserror::Error;

/// Shape and axis failures raised while validating array inputs.
///
/// These travel inside `anyhow::Error`; use `downcast_ref::<ShapeError>()` to
/// match on them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    Mismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("axis {axis} is out of bounds for an array of rank {rank}")]
    AxisOutOfBounds { axis: usize, rank: usize },
    #[error("axis {0} appears more than once")]
    DuplicateAxis(usize),
    #[error("state of length {len} is not a whole number of rings of size {dimension}")]
    RingLength { len: usize, dimension: usize },
    #[error("{0}")]
    Layout(&'static str),
}
