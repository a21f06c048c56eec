//! Lorenz-96 model wrapper.

use crate::arrays::{required_settings, serialize, ArrayPayload};
use anyhow::{bail, Context};
use l96_core::lorenz96::{Lorenz96, Lorenz96Settings};
use l96_core::simulate::{simulate, SimulationSettings};
use l96_core::solvers::Rk4Map;
use l96_core::traits::{ForwardMap, VectorField};
use ndarray::{ArrayD, IxDyn};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmLorenz96 {
    settings: Lorenz96Settings,
    dimension: usize,
    forward: Rk4Map<f64, Lorenz96<f64>>,
    state: Vec<f64>,
    next: Vec<f64>,
    t: f64,
}

/// Lays out a flat initial condition: (N, M) when it holds a full ensemble,
/// otherwise as given, leaving the shape checks to the simulator.
pub(crate) fn initial_array(
    initial_state: Vec<f64>,
    dimension: usize,
    ensemble_size: usize,
) -> anyhow::Result<ArrayD<f64>> {
    let shape = if ensemble_size > 0 && initial_state.len() == ensemble_size * dimension {
        vec![ensemble_size, dimension]
    } else {
        vec![initial_state.len()]
    };
    ArrayD::from_shape_vec(IxDyn(&shape), initial_state).context("Failed to shape initial state.")
}

pub(crate) fn simulation_payload(
    forward: &mut Rk4Map<f64, Lorenz96<f64>>,
    dimension: usize,
    initial_state: Vec<f64>,
    settings: &SimulationSettings,
) -> anyhow::Result<ArrayPayload> {
    let settings = SimulationSettings {
        state_dim: Some(dimension),
        ..*settings
    };
    let x0 = initial_array(initial_state, dimension, settings.ensemble_size)?;
    Ok(simulate(forward, &settings, x0.view())?.into())
}

#[wasm_bindgen]
impl WasmLorenz96 {
    #[wasm_bindgen(constructor)]
    pub fn new(dimension: u32, force: f64, dt: f64) -> Result<WasmLorenz96, JsValue> {
        #[cfg(target_arch = "wasm32")]
        console_error_panic_hook::set_once();

        Self::build(dimension as usize, Lorenz96Settings { force, dt })
            .map_err(|e| JsValue::from_str(&format!("{}", e)))
    }

    pub fn set_state(&mut self, state: &[f64]) -> Result<(), JsValue> {
        if state.is_empty() || state.len() % self.dimension != 0 {
            return Err(JsValue::from_str(
                "State length must be a positive multiple of the ring size.",
            ));
        }
        self.state = state.to_vec();
        self.next = vec![0.0; state.len()];
        Ok(())
    }

    pub fn get_state(&self) -> Vec<f64> {
        self.state.clone()
    }

    pub fn set_t(&mut self, t: f64) {
        self.t = t;
    }

    pub fn get_t(&self) -> f64 {
        self.t
    }

    pub fn dimension(&self) -> u32 {
        self.dimension as u32
    }

    /// Advances the current state by one RK4 step of size `dt`.
    pub fn step(&mut self) -> Result<(), JsValue> {
        self.forward
            .advance(&self.state, &mut self.next)
            .map_err(|e| JsValue::from_str(&format!("Step failed: {}", e)))?;
        std::mem::swap(&mut self.state, &mut self.next);
        self.t += self.settings.dt;
        Ok(())
    }

    /// Vector field evaluated at the current state.
    pub fn derivative(&self) -> Result<Vec<f64>, JsValue> {
        let mut out = vec![0.0; self.state.len()];
        self.forward
            .field()
            .apply(&self.state, &mut out)
            .map_err(|e| JsValue::from_str(&format!("{}", e)))?;
        Ok(out)
    }

    pub fn simulate(&mut self, initial_state: Vec<f64>, settings: JsValue) -> Result<JsValue, JsValue> {
        let settings: SimulationSettings = required_settings(settings)?;
        let payload = simulation_payload(&mut self.forward, self.dimension, initial_state, &settings)
            .map_err(|e| JsValue::from_str(&format!("Simulation failed: {:#}", e)))?;
        serialize(&payload)
    }
}

impl WasmLorenz96 {
    pub(crate) fn build(dimension: usize, settings: Lorenz96Settings) -> anyhow::Result<Self> {
        if dimension == 0 {
            bail!("Ring size must be positive.");
        }
        if settings.dt <= 0.0 {
            bail!("dt must be positive.");
        }
        Ok(Self {
            settings,
            dimension,
            forward: settings.forward_map(dimension),
            state: vec![settings.force; dimension],
            next: vec![0.0; dimension],
            t: 0.0,
        })
    }
}
