//! Plot-ready comparison of a reference trajectory and an estimate.
//!
//! Builds the three heat-map panels (reference, estimate, estimate - reference)
//! with shared colour scaling. Rendering is up to the caller.

use crate::error::ShapeError;
use anyhow::{bail, Result};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Optional colour limits; anything left unset is derived from the data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonSettings {
    pub vmin: Option<f64>,
    pub vmax: Option<f64>,
    pub vdelta: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    Viridis,
    Bwr,
}

/// One heat map, stored node-major: `values[node * cols + step]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub label: String,
    pub colormap: Colormap,
    pub range: (f64, f64),
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// [t_first, t_last, 0, nodes]
    pub extent: [f64; 4],
    pub nodes: usize,
    pub panels: [Panel; 3],
}

pub fn compare(
    reference: ArrayView2<'_, f64>,
    estimate: ArrayView2<'_, f64>,
    times: &[f64],
    labels: [&str; 2],
    settings: &ComparisonSettings,
) -> Result<Comparison> {
    if reference.shape() != estimate.shape() {
        return Err(ShapeError::Mismatch {
            expected: reference.shape().to_vec(),
            actual: estimate.shape().to_vec(),
        }
        .into());
    }
    let (steps, nodes) = reference.dim();
    if times.is_empty() {
        bail!("Time axis must not be empty.");
    }
    if times.len() != steps {
        bail!(
            "Time axis length mismatch. Expected {}, got {}.",
            steps,
            times.len()
        );
    }

    let (vmin, vmax) = match settings.vmin {
        None => (nan_min(reference.iter().copied()), nan_max(reference.iter().copied())),
        Some(vmin) => (
            vmin,
            settings
                .vmax
                .unwrap_or_else(|| nan_max(reference.iter().copied())),
        ),
    };
    let difference: Array2<f64> = &estimate - &reference;
    let vdelta = settings
        .vdelta
        .unwrap_or_else(|| nan_max(difference.iter().map(|v| v.abs())));

    let panel = |label: String, colormap, range, data: ArrayView2<f64>| Panel {
        label,
        colormap,
        range,
        rows: nodes,
        cols: steps,
        values: data.t().iter().copied().collect(),
    };
    let delta_label = format!("{} - {}", prefix(labels[1]), prefix(labels[0]));

    Ok(Comparison {
        extent: [times[0], times[steps - 1], 0.0, nodes as f64],
        nodes,
        panels: [
            panel(labels[0].to_string(), Colormap::Viridis, (vmin, vmax), reference),
            panel(labels[1].to_string(), Colormap::Viridis, (vmin, vmax), estimate),
            panel(delta_label, Colormap::Bwr, (-vdelta, vdelta), difference.view()),
        ],
    })
}

fn prefix(label: &str) -> String {
    label.chars().take(2).collect()
}

// NaN entries are skipped; an all-NaN input yields NaN.
fn nan_min(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::NAN, f64::min)
}

fn nan_max(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::NAN, f64::max)
}
