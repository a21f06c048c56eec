//! Flat-array helpers and the free functions built on them.

use anyhow::{bail, Context};
use l96_core::comparison::{compare, Comparison, ComparisonSettings};
use l96_core::metrics::{rmse as core_rmse, RmseSettings};
use l96_core::padding::{Padding, PeriodicPadding};
use ndarray::{Array2, Array3, ArrayD, IxDyn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

/// Row-major array handed back to JavaScript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ArrayPayload {
    pub(crate) shape: Vec<usize>,
    pub(crate) data: Vec<f64>,
}

impl From<ArrayD<f64>> for ArrayPayload {
    fn from(array: ArrayD<f64>) -> Self {
        Self {
            shape: array.shape().to_vec(),
            data: array.iter().copied().collect(),
        }
    }
}

pub(crate) fn to_array(data: Vec<f64>, shape: &[u32]) -> anyhow::Result<ArrayD<f64>> {
    let shape: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
    let expected: usize = shape.iter().product();
    if expected != data.len() {
        bail!(
            "Data length {} does not match shape {:?} ({} values).",
            data.len(),
            shape,
            expected
        );
    }
    ArrayD::from_shape_vec(IxDyn(&shape), data).context("Failed to shape input data.")
}

pub(crate) fn settings_or_default<T: DeserializeOwned + Default>(
    value: JsValue,
) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    required_settings(value)
}

/// For settings with a field the caller must always choose.
pub(crate) fn required_settings<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    from_value(value).map_err(|e| JsValue::from_str(&format!("Invalid settings: {}", e)))
}

pub(crate) fn serialize<T: Serialize>(payload: &T) -> Result<JsValue, JsValue> {
    to_value(payload).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

pub(crate) fn rmse_payload(
    reference: Vec<f64>,
    estimate: Vec<f64>,
    shape: &[u32],
    settings: &RmseSettings,
) -> anyhow::Result<ArrayPayload> {
    let reference = to_array(reference, shape).context("Invalid reference.")?;
    let estimate = to_array(estimate, shape).context("Invalid estimate.")?;
    Ok(core_rmse(&reference, &estimate, settings)?.into())
}

pub(crate) fn pad_payload(
    input: Vec<f64>,
    shape: &[u32],
    left: usize,
    right: usize,
) -> anyhow::Result<ArrayPayload> {
    let padding = PeriodicPadding::new(left, right);
    let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
    padding.output_shape(&dims)?;
    let input = Array3::from_shape_vec((dims[0], dims[1], dims[2]), input)
        .context("Data length does not match shape.")?;
    Ok(padding.pad(input.view())?.into_dyn().into())
}

pub(crate) fn comparison_payload(
    reference: Vec<f64>,
    estimate: Vec<f64>,
    shape: &[u32],
    times: &[f64],
    labels: [&str; 2],
    settings: &ComparisonSettings,
) -> anyhow::Result<Comparison> {
    if shape.len() != 2 {
        bail!("Trajectories must be two-dimensional (time, node).");
    }
    let dims = (shape[0] as usize, shape[1] as usize);
    let reference = Array2::from_shape_vec(dims, reference).context("Invalid reference.")?;
    let estimate = Array2::from_shape_vec(dims, estimate).context("Invalid estimate.")?;
    compare(reference.view(), estimate.view(), times, labels, settings)
}

/// Normalized RMSE of two row-major arrays sharing `shape`.
#[wasm_bindgen]
pub fn rmse(
    reference: Vec<f64>,
    estimate: Vec<f64>,
    shape: Vec<u32>,
    settings: JsValue,
) -> Result<JsValue, JsValue> {
    let settings: RmseSettings = settings_or_default(settings)?;
    let payload = rmse_payload(reference, estimate, &shape, &settings)
        .map_err(|e| JsValue::from_str(&format!("RMSE computation failed: {:#}", e)))?;
    serialize(&payload)
}

/// Periodic padding of a (batch, spatial, channels) array.
#[wasm_bindgen]
pub fn periodic_pad(
    input: Vec<f64>,
    shape: Vec<u32>,
    left: u32,
    right: u32,
) -> Result<JsValue, JsValue> {
    let payload = pad_payload(input, &shape, left as usize, right as usize)
        .map_err(|e| JsValue::from_str(&format!("Periodic padding failed: {:#}", e)))?;
    serialize(&payload)
}

/// Panel data for a reference/estimate/difference plot.
#[wasm_bindgen]
pub fn compare_trajectories(
    reference: Vec<f64>,
    estimate: Vec<f64>,
    shape: Vec<u32>,
    times: Vec<f64>,
    reference_label: &str,
    estimate_label: &str,
    settings: JsValue,
) -> Result<JsValue, JsValue> {
    let settings: ComparisonSettings = settings_or_default(settings)?;
    let comparison = comparison_payload(
        reference,
        estimate,
        &shape,
        &times,
        [reference_label, estimate_label],
        &settings,
    )
    .map_err(|e| JsValue::from_str(&format!("Comparison failed: {:#}", e)))?;
    serialize(&comparison)
}
