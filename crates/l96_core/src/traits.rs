use anyhow::Result;
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in our dynamical systems.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// An autonomous vector field x -> dx/dt.
pub trait VectorField<T: Scalar> {
    /// Length of a single state vector.
    fn dimension(&self) -> usize;

    /// Evaluates the derivative of `x` into `out`.
    /// `out` has the same length as `x`.
    fn apply(&self, x: &[T], out: &mut [T]) -> Result<()>;
}

/// A one-step map x_t -> x_{t+dt}.
///
/// Closures of the form `FnMut(&[T], &mut [T]) -> Result<()>` are forward maps too,
/// which is how tests and callers plug in arbitrary dynamics.
pub trait ForwardMap<T: Scalar> {
    /// Writes the successor of `state` into `next`. Both slices have the same length.
    fn advance(&mut self, state: &[T], next: &mut [T]) -> Result<()>;
}

impl<T, F> ForwardMap<T> for F
where
    T: Scalar,
    F: FnMut(&[T], &mut [T]) -> Result<()>,
{
    fn advance(&mut self, state: &[T], next: &mut [T]) -> Result<()> {
        self(state, next)
    }
}

/// A trait for solvers that can step a vector field forward in place.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt.
    /// state: current state (updated after step)
    fn step(&mut self, field: &impl VectorField<T>, state: &mut [T], dt: T) -> Result<()>;
}
