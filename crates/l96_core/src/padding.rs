//! Periodic padding for convolutional models on circular domains.
//!
//! Inputs are laid out as (batch, spatial, channels). The spatial axis is
//! extended on both sides by copying values from the opposite edge.

use crate::error::ShapeError;
use anyhow::{bail, Result};
use ndarray::{Array3, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

/// Something that can pad a (batch, spatial, channels) array.
pub trait Padding {
    fn output_shape(&self, input_shape: &[usize]) -> Result<[usize; 3]>;

    fn pad<T: Clone>(&self, input: ArrayView3<'_, T>) -> Result<Array3<T>>;
}

/// Wrap-around padding with independent left and right widths.
/// Holds no parameters beyond the widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicPadding {
    pub left: usize,
    pub right: usize,
}

impl PeriodicPadding {
    pub fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }

    pub fn symmetric(width: usize) -> Self {
        Self::new(width, width)
    }

    fn padded_len(&self, spatial: usize) -> Result<usize> {
        match spatial
            .checked_add(self.left)
            .and_then(|len| len.checked_add(self.right))
        {
            Some(len) => Ok(len),
            None => bail!(
                "Padded length overflows: {spatial} + {} + {}.",
                self.left,
                self.right
            ),
        }
    }
}

impl From<usize> for PeriodicPadding {
    fn from(width: usize) -> Self {
        Self::symmetric(width)
    }
}

impl From<(usize, usize)> for PeriodicPadding {
    fn from((left, right): (usize, usize)) -> Self {
        Self::new(left, right)
    }
}

impl Padding for PeriodicPadding {
    fn output_shape(&self, input_shape: &[usize]) -> Result<[usize; 3]> {
        if input_shape.len() != 3 {
            return Err(ShapeError::Layout("Input shape should be 1D with channel at last").into());
        }
        Ok([
            input_shape[0],
            self.padded_len(input_shape[1])?,
            input_shape[2],
        ])
    }

    /// Output index `p` on the spatial axis reads input index `(p - left) mod spatial`,
    /// so the left border is the last `left` samples and the right border the first `right`.
    fn pad<T: Clone>(&self, input: ArrayView3<'_, T>) -> Result<Array3<T>> {
        let (batch, spatial, channels) = input.dim();
        if self.left == 0 && self.right == 0 {
            return Ok(input.to_owned());
        }
        if spatial == 0 {
            bail!("Cannot periodically pad an empty spatial axis.");
        }

        let padded = self.padded_len(spatial)?;
        let shift = spatial - self.left % spatial;
        let source: Vec<usize> = (0..padded).map(|p| (p + shift) % spatial).collect();
        let out = input.select(Axis(1), &source);
        debug_assert_eq!(out.dim(), (batch, padded, channels));
        Ok(out)
    }
}
