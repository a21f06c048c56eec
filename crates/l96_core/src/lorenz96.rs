//! The Lorenz-96 model on a ring of `dimension` nodes.
//!
//! dx_j/dt = (x_{j+1} - x_{j-2}) * x_{j-1} - x_j + F, indices taken modulo the ring size.

use crate::error::ShapeError;
use crate::solvers::Rk4Map;
use crate::traits::{Scalar, VectorField};
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lorenz96Settings {
    pub force: f64,
    pub dt: f64,
}

impl Default for Lorenz96Settings {
    fn default() -> Self {
        Self {
            force: 8.0,
            dt: 0.01,
        }
    }
}

impl Lorenz96Settings {
    pub fn model(&self, dimension: usize) -> Lorenz96<f64> {
        Lorenz96::new(dimension, self.force)
    }

    /// RK4 with step `dt` over the forced model.
    pub fn forward_map(&self, dimension: usize) -> Rk4Map<f64, Lorenz96<f64>> {
        Rk4Map::new(self.model(dimension), self.dt)
    }
}

/// Lorenz-96 vector field.
///
/// A state may hold several rings back to back (an ensemble laid out member by
/// member); each block of `dimension` values is evolved on its own.
#[derive(Debug, Clone, Copy)]
pub struct Lorenz96<T: Scalar> {
    dimension: usize,
    force: T,
}

impl<T: Scalar> Lorenz96<T> {
    pub fn new(dimension: usize, force: T) -> Self {
        Self { dimension, force }
    }

    pub fn force(&self) -> T {
        self.force
    }

    /// Advection and damping terms without the forcing.
    pub fn autonomous(&self, x: &[T], out: &mut [T]) -> Result<()> {
        let m = self.check_len(x.len())?;
        for (ring, ring_out) in x.chunks_exact(m).zip(out.chunks_exact_mut(m)) {
            for j in 0..m {
                let next = ring[(j + 1) % m];
                let prev = ring[(j + m - 1) % m];
                let prev2 = ring[(j + 2 * m - 2) % m];
                ring_out[j] = (next - prev2) * prev - ring[j];
            }
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<usize> {
        if self.dimension == 0 || len == 0 || len % self.dimension != 0 {
            return Err(ShapeError::RingLength {
                len,
                dimension: self.dimension,
            }
            .into());
        }
        Ok(self.dimension)
    }
}

impl<T: Scalar> VectorField<T> for Lorenz96<T> {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn apply(&self, x: &[T], out: &mut [T]) -> Result<()> {
        self.autonomous(x, out)?;
        for value in out.iter_mut() {
            *value = *value + self.force;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Lorenz96, Lorenz96Settings};
    use crate::error::ShapeError;
    use crate::traits::{ForwardMap, VectorField};

    #[test]
    fn forcing_level_state_is_a_fixed_point() {
        let model = Lorenz96::<f64>::new(40, 8.0);
        let x = vec![8.0; 40];
        let mut out = vec![1.0; 40];
        model.apply(&x, &mut out).expect("apply");
        assert!(out.iter().all(|v| v.abs() < 1e-12));

        let mut map = Lorenz96Settings::default().forward_map(40);
        let mut next = vec![0.0; 40];
        map.advance(&x, &mut next).expect("advance");
        assert!(next.iter().all(|v| (v - 8.0).abs() < 1e-12));
    }

    #[test]
    fn derivative_wraps_around_the_ring() {
        let model = Lorenz96::<f64>::new(5, 0.0);
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let mut out = [0.0; 5];
        model.apply(&x, &mut out).expect("apply");
        // j = 0: (x1 - x3) * x4 - x0 = (2 - 4) * 5 - 1
        assert_eq!(out[0], -11.0);
        // j = 4: (x0 - x2) * x3 - x4 = (1 - 3) * 4 - 5
        assert_eq!(out[4], -13.0);
        // j = 2: (x3 - x0) * x1 - x2 = (4 - 1) * 2 - 3
        assert_eq!(out[2], 3.0);
    }

    #[test]
    fn forcing_is_added_to_the_autonomous_part() {
        let model = Lorenz96::<f64>::new(4, 3.5);
        let x = [0.3, -1.2, 2.0, 0.7];
        let mut bare = [0.0; 4];
        let mut forced = [0.0; 4];
        model.autonomous(&x, &mut bare).expect("autonomous");
        model.apply(&x, &mut forced).expect("apply");
        for (b, f) in bare.iter().zip(&forced) {
            assert!((f - b - 3.5).abs() < 1e-12);
        }
    }

    #[test]
    fn stacked_rings_evolve_independently() {
        let model = Lorenz96::<f64>::new(4, 8.0);
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [-1.0, 0.5, 7.0, 2.0];
        let stacked: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
        let mut out = vec![0.0; 8];
        model.apply(&stacked, &mut out).expect("apply");

        let mut out_a = [0.0; 4];
        let mut out_b = [0.0; 4];
        model.apply(&a, &mut out_a).expect("apply");
        model.apply(&b, &mut out_b).expect("apply");
        assert_eq!(&out[..4], &out_a);
        assert_eq!(&out[4..], &out_b);
    }

    #[test]
    fn rejects_partial_rings() {
        let model = Lorenz96::<f64>::new(4, 8.0);
        let mut out = [0.0; 6];
        let err = model.apply(&[0.0; 6], &mut out).expect_err("should fail");
        assert_eq!(
            err.downcast_ref::<ShapeError>(),
            Some(&ShapeError::RingLength {
                len: 6,
                dimension: 4
            })
        );
    }

    #[test]
    fn settings_default_to_standard_forcing_and_step() {
        let settings = Lorenz96Settings::default();
        assert_eq!(settings.force, 8.0);
        assert_eq!(settings.dt, 0.01);
        let map = settings.forward_map(10);
        assert_eq!(map.dt(), 0.01);
        assert_eq!(map.field().dimension(), 10);
        assert_eq!(map.field().force(), 8.0);
    }
}
