// ─────────────────────────────────────────────────────────────────────
// SCPN PIC Tracker — Particle Ensemble
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Particle state store: positions, velocities and lifecycle status of a
//! single-species ensemble.
//!
//! Lifecycle lives in an explicit status vector next to `x`/`v`. NaN
//! sentinels only appear in the masked exports, where a stopped particle has
//! a NaN velocity and a removed particle has NaN position and velocity.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use pictrack_math::vector::{is_finite, norm};
use pictrack_types::error::{TrackerError, TrackerResult};
use pictrack_types::state::{ParticleStatus, Species};

#[derive(Debug, Clone)]
pub struct ParticleEnsemble {
    x: Array2<f64>,
    v: Array2<f64>,
    status: Vec<ParticleStatus>,
    species: Species,
}

fn check_columns(arr: &Array2<f64>, label: &str) -> TrackerResult<()> {
    if arr.ncols() != 3 {
        return Err(TrackerError::ShapeMismatch {
            context: format!("{label} columns (expected shape [N, 3])"),
            expected: 3,
            actual: arr.ncols(),
        });
    }
    Ok(())
}

impl ParticleEnsemble {
    /// Build an ensemble from `[N, 3]` positions (m) and velocities (m/s).
    pub fn new(x: Array2<f64>, v: Array2<f64>, species: Species) -> TrackerResult<Self> {
        check_columns(&x, "positions")?;
        check_columns(&v, "velocities")?;
        if x.nrows() != v.nrows() {
            return Err(TrackerError::ShapeMismatch {
                context: "particle count of velocities vs positions".to_string(),
                expected: x.nrows(),
                actual: v.nrows(),
            });
        }
        species.validate()?;
        if let Some(idx) = x
            .rows()
            .into_iter()
            .zip(v.rows())
            .position(|(xr, vr)| {
                !is_finite([xr[0], xr[1], xr[2]]) || !is_finite([vr[0], vr[1], vr[2]])
            })
        {
            return Err(TrackerError::PhysicsViolation(format!(
                "particle[{idx}] position and velocity components must be finite"
            )));
        }

        let n = x.nrows();
        Ok(ParticleEnsemble {
            x,
            v,
            status: vec![ParticleStatus::Tracked; n],
            species,
        })
    }

    pub fn len(&self) -> usize {
        self.status.len()
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_empty()
    }

    pub fn species(&self) -> &Species {
        &self.species
    }

    /// Raw positions. Rows of removed particles are stale.
    pub fn positions(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    /// Raw velocities. Rows of stopped and removed particles are stale.
    pub fn velocities(&self) -> ArrayView2<'_, f64> {
        self.v.view()
    }

    pub fn status(&self) -> &[ParticleStatus] {
        &self.status
    }

    pub fn tracked_mask(&self) -> Array1<bool> {
        self.status
            .iter()
            .map(|s| *s == ParticleStatus::Tracked)
            .collect()
    }

    pub fn tracked_indices(&self) -> Vec<usize> {
        self.status
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == ParticleStatus::Tracked)
            .map(|(i, _)| i)
            .collect()
    }

    fn count(&self, status: ParticleStatus) -> usize {
        self.status.iter().filter(|s| **s == status).count()
    }

    pub fn tracked_count(&self) -> usize {
        self.count(ParticleStatus::Tracked)
    }

    pub fn stopped_count(&self) -> usize {
        self.count(ParticleStatus::Stopped)
    }

    pub fn removed_count(&self) -> usize {
        self.count(ParticleStatus::Removed)
    }

    fn check_mask(&self, mask: &[bool]) -> TrackerResult<()> {
        if mask.len() != self.len() {
            return Err(TrackerError::ShapeMismatch {
                context: "particle mask".to_string(),
                expected: self.len(),
                actual: mask.len(),
            });
        }
        Ok(())
    }

    /// Freeze the masked particles in place. Removed particles stay removed.
    /// Returns how many particles changed state.
    pub fn stop(&mut self, mask: &[bool]) -> TrackerResult<usize> {
        self.check_mask(mask)?;
        let mut changed = 0;
        for (status, _) in self.status.iter_mut().zip(mask).filter(|(_, m)| **m) {
            if *status == ParticleStatus::Tracked {
                *status = ParticleStatus::Stopped;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Discard the masked particles. Returns how many particles changed state.
    pub fn remove(&mut self, mask: &[bool]) -> TrackerResult<usize> {
        self.check_mask(mask)?;
        let mut changed = 0;
        for (status, _) in self.status.iter_mut().zip(mask).filter(|(_, m)| **m) {
            if *status != ParticleStatus::Removed {
                *status = ParticleStatus::Removed;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Positions with NaN rows for removed particles.
    pub fn masked_positions(&self) -> Array2<f64> {
        let mut out = self.x.clone();
        for (mut row, status) in out.rows_mut().into_iter().zip(&self.status) {
            if *status == ParticleStatus::Removed {
                row.fill(f64::NAN);
            }
        }
        out
    }

    /// Velocities with NaN rows for stopped and removed particles.
    pub fn masked_velocities(&self) -> Array2<f64> {
        let mut out = self.v.clone();
        for (mut row, status) in out.rows_mut().into_iter().zip(&self.status) {
            if *status != ParticleStatus::Tracked {
                row.fill(f64::NAN);
            }
        }
        out
    }

    /// Largest speed among tracked particles; zero when none are tracked.
    pub fn max_tracked_speed(&self) -> f64 {
        self.v
            .rows()
            .into_iter()
            .zip(&self.status)
            .filter(|(_, s)| **s == ParticleStatus::Tracked)
            .map(|(row, _)| norm([row[0], row[1], row[2]]))
            .fold(0.0, f64::max)
    }

    /// Compact copies of the rows at `indices`.
    pub fn gather(&self, indices: &[usize]) -> (Array2<f64>, Array2<f64>) {
        (
            self.x.select(Axis(0), indices),
            self.v.select(Axis(0), indices),
        )
    }

    /// Write compact rows back to their original slots.
    pub(crate) fn scatter(&mut self, indices: &[usize], x: &Array2<f64>, v: &Array2<f64>) {
        for (row, &i) in indices.iter().enumerate() {
            self.x.row_mut(i).assign(&x.row(row));
            self.v.row_mut(i).assign(&v.row(row));
        }
    }
}
