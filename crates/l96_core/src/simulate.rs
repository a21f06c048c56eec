//! Trajectory and ensemble rollout with burn-in.

use crate::error::ShapeError;
use crate::traits::{ForwardMap, Scalar};
use anyhow::{anyhow, bail, Context, Result};
use ndarray::{ArrayD, ArrayView, Dimension, IxDyn};
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BURNIN: usize = 500;

fn default_burnin() -> usize {
    DEFAULT_BURNIN
}

/// Rollout configuration. `steps` has no meaningful default and must always
/// be given when deserializing; the other fields fall back to their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Number of samples kept after burn-in.
    pub steps: usize,
    /// Leading samples discarded while the trajectory settles.
    #[serde(default = "default_burnin")]
    pub burnin: usize,
    /// Number of members; 0 means a single trajectory.
    #[serde(default)]
    pub ensemble_size: usize,
    /// Expected length of the trailing (node) axis; inferred when absent.
    #[serde(default)]
    pub state_dim: Option<usize>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            steps: 0,
            burnin: DEFAULT_BURNIN,
            ensemble_size: 0,
            state_dim: None,
        }
    }
}

impl SimulationSettings {
    pub fn new(steps: usize) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Total number of samples generated, burn-in included.
    pub fn total_samples(&self) -> Result<usize> {
        self.steps
            .checked_add(self.burnin)
            .ok_or_else(|| anyhow!("steps + burnin overflows usize."))
    }

    /// Shape of one retained sample: `[M]` or `[N, M]`.
    pub fn sample_shape(&self, state_dim: usize) -> Vec<usize> {
        if self.ensemble_size == 0 {
            vec![state_dim]
        } else {
            vec![self.ensemble_size, state_dim]
        }
    }
}

/// Lays out the initial condition as one flat sample, broadcasting a single
/// state over every ensemble member when needed. Returns the flat sample and
/// the node count.
pub fn seed_sample<T: Scalar, D: Dimension>(
    initial_state: &ArrayView<'_, T, D>,
    settings: &SimulationSettings,
) -> Result<(Vec<T>, usize)> {
    let shape = initial_state.shape();
    let state_dim = match shape.last() {
        Some(&m) => m,
        None => bail!("Initial state must have at least one axis."),
    };
    if let Some(expected) = settings.state_dim {
        if expected != state_dim {
            return Err(ShapeError::Mismatch {
                expected: settings.sample_shape(expected),
                actual: shape.to_vec(),
            }
            .into());
        }
    }

    let members = settings.ensemble_size;
    let sample = match (members, shape.len()) {
        (0, 1) => initial_state.iter().copied().collect(),
        (n, 1) if n > 0 => (0..n).flat_map(move |_| initial_state.iter().copied()).collect(),
        (n, 2) if n > 0 && shape[0] == n => initial_state.iter().copied().collect(),
        _ => {
            return Err(ShapeError::Mismatch {
                expected: settings.sample_shape(state_dim),
                actual: shape.to_vec(),
            }
            .into())
        }
    };
    Ok((sample, state_dim))
}

/// Rolls `forward` out from `initial_state` and returns the post-burn-in samples.
///
/// The result has shape `(steps, M)` without an ensemble and `(steps, N, M)`
/// with one. Sample 0 of the result is the state reached after `burnin`
/// applications of the map, so the map runs `steps + burnin - 1` times in total.
/// A failing map aborts the whole run.
pub fn simulate<T, F, D>(
    forward: &mut F,
    settings: &SimulationSettings,
    initial_state: ArrayView<'_, T, D>,
) -> Result<ArrayD<T>>
where
    T: Scalar,
    F: ForwardMap<T> + ?Sized,
    D: Dimension,
{
    let (seed, state_dim) = seed_sample(&initial_state, settings)?;
    let total = settings.total_samples()?;
    if total == 0 {
        bail!("steps + burnin must be at least 1 to hold the initial state.");
    }

    let stride = seed.len();
    let len = total
        .checked_mul(stride)
        .ok_or_else(|| anyhow!("Trajectory buffer size overflows usize."))?;

    debug!(
        steps = settings.steps,
        burnin = settings.burnin,
        ensemble_size = settings.ensemble_size,
        state_dim,
        "starting simulation"
    );

    let mut buffer = vec![T::zero(); len];
    buffer[..stride].copy_from_slice(&seed);
    for i in 1..total {
        let (filled, rest) = buffer.split_at_mut(i * stride);
        forward
            .advance(&filled[(i - 1) * stride..], &mut rest[..stride])
            .with_context(|| format!("Forward map failed at step {i}."))?;
    }

    let retained = buffer.split_off(settings.burnin * stride);
    let mut shape = vec![settings.steps];
    shape.extend(settings.sample_shape(state_dim));
    let trajectory = ArrayD::from_shape_vec(IxDyn(&shape), retained)
        .context("Failed to shape the trajectory buffer.")?;

    debug!(shape = ?trajectory.shape(), "simulation finished");
    Ok(trajectory)
}
