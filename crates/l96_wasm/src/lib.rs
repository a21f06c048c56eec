//! WASM bridge for `l96_core`.
//!
//! Exposes the Lorenz-96 model, the simulator (one-shot and batched), the
//! error metric, periodic padding and comparison panels to JavaScript. All
//! numerics live in the core crate; this crate only converts arguments and
//! errors.

mod arrays;
mod model;
mod runner;

pub use arrays::{compare_trajectories, periodic_pad, rmse};
pub use model::WasmLorenz96;
pub use runner::WasmSimulationRunner;
