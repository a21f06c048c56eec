pub mod comparison;
pub mod error;
pub mod lorenz96;
pub mod metrics;
pub mod padding;
pub mod simulate;
pub mod solvers;
/// The `l96_core` crate holds the numerics behind the Lorenz-96 experiments.
/// The integrator and simulator are generic over the scalar type and over the
/// dynamics, so any vector field or one-step map can be plugged in.
///
/// Key components:
/// - **Traits**: `Scalar`, `VectorField` (derivatives), `ForwardMap` (one-step maps), `Steppable` (solvers).
/// - **Solvers**: the classical RK4 stepper and the pure `integrate` wrapper.
/// - **Simulate**: burn-in aware trajectory and ensemble rollout.
/// - **Metrics**: normalized RMSE over arbitrary axes.
/// - **Padding**: periodic (wrap-around) padding for circular spatial domains.
/// - **Comparison**: plot-ready reference/estimate/difference panels.
pub mod traits;
