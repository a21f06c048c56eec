//! Batched simulation runner so long rollouts do not block the UI thread.

use crate::arrays::{required_settings, serialize, ArrayPayload};
use crate::model::initial_array;
use anyhow::{bail, Context};
use l96_core::lorenz96::{Lorenz96, Lorenz96Settings};
use l96_core::simulate::{seed_sample, SimulationSettings};
use l96_core::solvers::Rk4Map;
use l96_core::traits::ForwardMap;
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct SimulationProgress {
    done: bool,
    current_step: usize,
    max_steps: usize,
}

struct SimulationRunnerState {
    forward: Rk4Map<f64, Lorenz96<f64>>,
    settings: SimulationSettings,
    sample_shape: Vec<usize>,
    current: Vec<f64>,
    scratch: Vec<f64>,
    retained: Vec<f64>,
    next_index: usize,
    total: usize,
    done: bool,
}

impl SimulationRunnerState {
    fn new(
        dimension: usize,
        model: Lorenz96Settings,
        initial_state: Vec<f64>,
        settings: SimulationSettings,
    ) -> anyhow::Result<Self> {
        if dimension == 0 {
            bail!("Ring size must be positive.");
        }
        if model.dt <= 0.0 {
            bail!("dt must be positive.");
        }
        let settings = SimulationSettings {
            state_dim: Some(dimension),
            ..settings
        };
        let total = settings.total_samples()?;
        if total == 0 {
            bail!("steps + burnin must be at least 1 to hold the initial state.");
        }

        let x0 = initial_array(initial_state, dimension, settings.ensemble_size)?;
        let (seed, _) = seed_sample(&x0.view(), &settings)?;
        let retained_len = settings
            .steps
            .checked_mul(seed.len())
            .context("Trajectory buffer size overflows usize.")?;

        Ok(Self {
            forward: model.forward_map(dimension),
            sample_shape: settings.sample_shape(dimension),
            scratch: vec![0.0; seed.len()],
            current: seed,
            retained: Vec::with_capacity(retained_len),
            next_index: 0,
            total,
            done: false,
            settings,
        })
    }

    fn progress(&self) -> SimulationProgress {
        SimulationProgress {
            done: self.done,
            current_step: self.next_index,
            max_steps: self.total,
        }
    }

    /// Produces up to `batch_size` more samples, in the same order `simulate` would.
    fn advance(&mut self, batch_size: usize) -> anyhow::Result<SimulationProgress> {
        for _ in 0..batch_size {
            if self.next_index >= self.total {
                break;
            }
            if self.next_index > 0 {
                self.forward
                    .advance(&self.current, &mut self.scratch)
                    .with_context(|| format!("Forward map failed at step {}.", self.next_index))?;
                std::mem::swap(&mut self.current, &mut self.scratch);
            }
            if self.next_index >= self.settings.burnin {
                self.retained.extend_from_slice(&self.current);
            }
            self.next_index += 1;
        }

        if self.next_index >= self.total {
            self.done = true;
        }
        Ok(self.progress())
    }

    fn result(&self) -> anyhow::Result<ArrayPayload> {
        if !self.done {
            bail!("Simulation has not finished.");
        }
        let mut shape = vec![self.settings.steps];
        shape.extend(&self.sample_shape);
        Ok(ArrayPayload {
            shape,
            data: self.retained.clone(),
        })
    }
}

#[wasm_bindgen]
pub struct WasmSimulationRunner {
    state: Option<SimulationRunnerState>,
}

#[wasm_bindgen]
impl WasmSimulationRunner {
    #[wasm_bindgen(constructor)]
    pub fn new(
        dimension: u32,
        force: f64,
        dt: f64,
        initial_state: Vec<f64>,
        settings: JsValue,
    ) -> Result<WasmSimulationRunner, JsValue> {
        #[cfg(target_arch = "wasm32")]
        console_error_panic_hook::set_once();

        let settings: SimulationSettings = required_settings(settings)?;
        let state = SimulationRunnerState::new(
            dimension as usize,
            Lorenz96Settings { force, dt },
            initial_state,
            settings,
        )
        .map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;

        Ok(WasmSimulationRunner { state: Some(state) })
    }

    pub fn is_done(&self) -> bool {
        self.state.as_ref().map_or(true, |state| state.done)
    }

    pub fn run_steps(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;
        let progress = state
            .advance(batch_size as usize)
            .map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;
        serialize(&progress)
    }

    pub fn get_progress(&self) -> Result<JsValue, JsValue> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;
        serialize(&state.progress())
    }

    pub fn get_result(&self) -> Result<JsValue, JsValue> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;
        let payload = state
            .result()
            .map_err(|e| JsValue::from_str(&format!("{}", e)))?;
        serialize(&payload)
    }
}
