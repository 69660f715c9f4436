// ─────────────────────────────────────────────────────────────────────
// SCPN PIC Tracker — Field Grid
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Field grids consumed by the tracker.
//!
//! `FieldGrid` is the provider contract: membership tests and interpolation
//! never fail for points outside the domain, they report `false` / NaN.
//! `CartesianGrid` is the uniform-mesh implementation used by the engine
//! and its tests.

use ndarray::{Array1, Array3, ArrayView2, ArrayView3, Axis};
use pictrack_math::interp;
use pictrack_types::config::FieldWeighting;
use pictrack_types::error::{TrackerError, TrackerResult};
use pictrack_types::state::{FieldQuantity, Grid3D};
use rayon::prelude::*;
use std::collections::HashMap;

/// Provider of electromagnetic field samples on a spatial grid.
pub trait FieldGrid {
    /// Node spacing along each axis (m).
    fn resolution(&self) -> [f64; 3];

    /// Membership flag per row of an `[N, 3]` position array.
    fn on_grid(&self, positions: ArrayView2<f64>) -> Array1<bool>;

    /// One `[N]` array per requested quantity, NaN wherever a point is off
    /// this grid.
    fn interpolate(
        &self,
        positions: ArrayView2<f64>,
        quantities: &[FieldQuantity],
        weighting: FieldWeighting,
    ) -> Vec<Array1<f64>>;

    /// Raw samples of a stored quantity, if present.
    fn field_samples(&self, quantity: FieldQuantity) -> Option<ArrayView3<'_, f64>>;

    /// Finest spacing, used for the grid-crossing timestep.
    fn min_resolution(&self) -> f64 {
        self.resolution().into_iter().fold(f64::INFINITY, f64::min)
    }
}

fn row_point(positions: &ArrayView2<f64>, i: usize) -> [f64; 3] {
    [positions[[i, 0]], positions[[i, 1]], positions[[i, 2]]]
}

/// Uniform Cartesian grid storing any subset of the six field components.
/// Components that are not stored read as zero inside the domain.
#[derive(Debug, Clone)]
pub struct CartesianGrid {
    geometry: Grid3D,
    fields: HashMap<FieldQuantity, Array3<f64>>,
}

impl CartesianGrid {
    pub fn new(geometry: Grid3D) -> TrackerResult<Self> {
        geometry.validate()?;
        Ok(CartesianGrid {
            geometry,
            fields: HashMap::new(),
        })
    }

    /// Grid carrying spatially uniform `E` and `B` everywhere on its domain.
    pub fn uniform(geometry: Grid3D, e_v_m: [f64; 3], b_t: [f64; 3]) -> TrackerResult<Self> {
        let shape = geometry.shape();
        let mut grid = CartesianGrid::new(geometry)?;
        for (quantity, value) in FieldQuantity::ALL
            .into_iter()
            .zip(e_v_m.into_iter().chain(b_t))
        {
            grid.set_quantity(quantity, Array3::from_elem(shape, value))?;
        }
        Ok(grid)
    }

    pub fn with_quantity(
        mut self,
        quantity: FieldQuantity,
        samples: Array3<f64>,
    ) -> TrackerResult<Self> {
        self.set_quantity(quantity, samples)?;
        Ok(self)
    }

    pub fn set_quantity(
        &mut self,
        quantity: FieldQuantity,
        samples: Array3<f64>,
    ) -> TrackerResult<()> {
        let expected = self.geometry.shape();
        if samples.shape() != expected {
            return Err(TrackerError::PhysicsViolation(format!(
                "{quantity} samples have shape {:?}, grid expects {:?}",
                samples.shape(),
                expected
            )));
        }
        self.fields.insert(quantity, samples);
        Ok(())
    }

    pub fn geometry(&self) -> &Grid3D {
        &self.geometry
    }

    pub fn has_quantity(&self, quantity: FieldQuantity) -> bool {
        self.fields.contains_key(&quantity)
    }
}

impl FieldGrid for CartesianGrid {
    fn resolution(&self) -> [f64; 3] {
        self.geometry.spacing()
    }

    fn on_grid(&self, positions: ArrayView2<f64>) -> Array1<bool> {
        Array1::from_shape_fn(positions.nrows(), |i| {
            self.geometry.contains(row_point(&positions, i))
        })
    }

    fn interpolate(
        &self,
        positions: ArrayView2<f64>,
        quantities: &[FieldQuantity],
        weighting: FieldWeighting,
    ) -> Vec<Array1<f64>> {
        let points: Vec<[f64; 3]> = (0..positions.nrows())
            .map(|i| row_point(&positions, i))
            .collect();
        let geometry = &self.geometry;

        quantities
            .iter()
            .map(|quantity| match self.fields.get(quantity) {
                Some(samples) => {
                    let samples = samples.view();
                    let values: Vec<f64> = points
                        .par_iter()
                        .map(|&p| interp::interpolate(samples, geometry, p, weighting))
                        .collect();
                    Array1::from_vec(values)
                }
                None => points
                    .iter()
                    .map(|&p| if geometry.contains(p) { 0.0 } else { f64::NAN })
                    .collect(),
            })
            .collect()
    }

    fn field_samples(&self, quantity: FieldQuantity) -> Option<ArrayView3<'_, f64>> {
        self.fields.get(&quantity).map(|samples| samples.view())
    }
}

/// Non-fatal field-quality finding raised before a run.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAdvisory {
    pub grid: usize,
    pub quantity: FieldQuantity,
    /// Largest magnitude found on any boundary face.
    pub edge_max: f64,
    /// Largest magnitude anywhere on the grid.
    pub field_max: f64,
}

/// Largest absolute sample on the six boundary faces.
pub fn boundary_max_abs(samples: ArrayView3<f64>) -> f64 {
    let mut edge_max = 0.0f64;
    for axis in 0..3 {
        let n = samples.len_of(Axis(axis));
        if n == 0 {
            continue;
        }
        for index in [0, n - 1] {
            for v in samples.index_axis(Axis(axis), index).iter() {
                edge_max = edge_max.max(v.abs());
            }
        }
    }
    edge_max
}

/// Check every stored field component of one grid.
///
/// Non-finite samples abort setup. Fields that do not decay towards the
/// boundary produce an advisory (and a warning) when the edge maximum
/// exceeds `edge_tolerance` times the field maximum.
pub fn validate_field_quality(
    grid_index: usize,
    grid: &dyn FieldGrid,
    edge_tolerance: f64,
) -> TrackerResult<Vec<FieldAdvisory>> {
    let mut advisories = Vec::new();
    for quantity in FieldQuantity::ALL {
        let Some(samples) = grid.field_samples(quantity) else {
            continue;
        };
        if samples.iter().any(|v| !v.is_finite()) {
            return Err(TrackerError::NonFiniteField {
                grid: grid_index,
                quantity: quantity.key().to_string(),
            });
        }
        let field_max = samples.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        let edge_max = boundary_max_abs(samples);
        if edge_max > edge_tolerance * field_max {
            tracing::warn!(
                grid = grid_index,
                quantity = quantity.key(),
                edge_max,
                "{quantity} does not decay at the grid boundary (edge max {edge_max:.2e} {}, \
                 field max {field_max:.2e}); particles crossing the edge see a field jump, \
                 apply an envelope so the field vanishes there",
                quantity.unit()
            );
            advisories.push(FieldAdvisory {
                grid: grid_index,
                quantity,
                edge_max,
                field_max,
            });
        }
    }
    Ok(advisories)
}
