// ─────────────────────────────────────────────────────────────────────
// SCPN PIC Tracker — Adaptive Timestep
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-particle timestep selection.
//!
//! Candidates per tracked particle:
//! - one per grid the particle currently occupies: `0.5 * ds_min / v_max`
//!   (infinite for grids the particle is not on);
//! - one global gyroperiod candidate `2π m / (|q| B_max)`, divided by the
//!   configured steps per gyroperiod (infinite when `B_max == 0`).
//!
//! All candidates are clamped into `[dt_min, dt_max]` and the smallest one
//! wins. A particle whose candidates are all infinite falls back to the
//! largest grid-crossing step.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use pictrack_types::config::TimestepPolicy;
use pictrack_types::error::{TrackerError, TrackerResult};
use std::f64::consts::PI;

/// Inputs sampled during one push, restricted to tracked particles.
#[derive(Debug, Clone, Copy)]
pub struct TimestepInputs<'a> {
    /// On-grid flags, shape `[n_tracked, n_grids]`.
    pub on_grid: ArrayView2<'a, bool>,
    /// Finest node spacing of each grid (m).
    pub grid_resolution: &'a [f64],
    /// Largest tracked speed (m/s).
    pub v_max: f64,
    /// Largest interpolated |B| at tracked particles (T).
    pub b_max: f64,
    pub charge_c: f64,
    pub mass_kg: f64,
    pub steps_per_gyroperiod: f64,
}

/// Timestep applied by one push.
#[derive(Debug, Clone, PartialEq)]
pub enum Timestep {
    /// One step for every tracked particle.
    Uniform(f64),
    /// One step per tracked particle, in tracked order.
    PerParticle(Array1<f64>),
}

impl Timestep {
    /// Expand to one value per tracked particle.
    pub fn to_array(&self, n_tracked: usize) -> Array1<f64> {
        match self {
            Timestep::Uniform(dt) => Array1::from_elem(n_tracked, *dt),
            Timestep::PerParticle(dt) => dt.clone(),
        }
    }

    /// `(min, max)` over the applied steps.
    pub fn range(&self) -> (f64, f64) {
        match self {
            Timestep::Uniform(dt) => (*dt, *dt),
            Timestep::PerParticle(dt) => dt.iter().fold((f64::INFINITY, 0.0f64), |(lo, hi), &d| {
                (lo.min(d), hi.max(d))
            }),
        }
    }
}

/// Grid-crossing step per grid: half a cell at the fastest tracked speed.
pub fn grid_steps(grid_resolution: &[f64], v_max: f64) -> Vec<f64> {
    grid_resolution.iter().map(|ds| 0.5 * ds / v_max).collect()
}

/// Cyclotron period `2π m / (|q| B)`; infinite in a vanishing field.
pub fn gyroperiod(charge_c: f64, mass_kg: f64, b_max: f64) -> f64 {
    if b_max == 0.0 {
        f64::INFINITY
    } else {
        2.0 * PI * mass_kg / (charge_c.abs() * b_max)
    }
}

/// Clamped candidate matrix, shape `[n_tracked, n_grids + 1]`; the last
/// column holds the gyroperiod candidate.
pub fn timestep_candidates(inputs: &TimestepInputs<'_>, bounds: (f64, f64)) -> Array2<f64> {
    let (dt_min, dt_max) = bounds;
    let n = inputs.on_grid.nrows();
    let n_grids = inputs.grid_resolution.len();
    let gridstep = grid_steps(inputs.grid_resolution, inputs.v_max);
    let gyro =
        gyroperiod(inputs.charge_c, inputs.mass_kg, inputs.b_max) / inputs.steps_per_gyroperiod;

    Array2::from_shape_fn((n, n_grids + 1), |(i, c)| {
        let candidate = if c < n_grids {
            if inputs.on_grid[[i, c]] {
                gridstep[c]
            } else {
                f64::INFINITY
            }
        } else {
            gyro
        };
        candidate.clamp(dt_min, dt_max)
    })
}

/// Select the timestep for one push.
pub fn select_timestep(
    policy: &TimestepPolicy,
    inputs: &TimestepInputs<'_>,
) -> TrackerResult<Timestep> {
    if let TimestepPolicy::Fixed { dt } = *policy {
        return Ok(Timestep::Uniform(dt));
    }
    let bounds = policy.bounds();
    let candidates = timestep_candidates(inputs, bounds);

    let fallback = grid_steps(inputs.grid_resolution, inputs.v_max)
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max)
        .clamp(bounds.0, bounds.1);

    let mut dt = Array1::zeros(candidates.nrows());
    for (slot, row) in dt.iter_mut().zip(candidates.axis_iter(Axis(0))) {
        let best = row.iter().copied().fold(f64::INFINITY, f64::min);
        *slot = if best.is_infinite() { fallback } else { best };
    }

    if dt.iter().any(|d| !d.is_finite() || *d <= 0.0) {
        let reason = if inputs.v_max == 0.0 && inputs.b_max == 0.0 {
            "tracked particles are at rest and feel no magnetic field, so neither \
             grid crossing nor gyration sets a time scale"
        } else {
            "every candidate is infinite or zero"
        };
        return Err(TrackerError::PhysicsViolation(format!(
            "no usable timestep: {reason} (v_max={}, B_max={}, bounds={bounds:?}); \
             set dt_max or a fixed timestep",
            inputs.v_max, inputs.b_max
        )));
    }
    Ok(Timestep::PerParticle(dt))
}
