// ─────────────────────────────────────────────────────────────────────
// SCPN PIC Tracker — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{ALPHA_MASS, ELECTRON_MASS, ELEMENTARY_CHARGE, PROTON_MASS};
use crate::error::{TrackerError, TrackerResult};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Uniform 3D Cartesian grid with precomputed node coordinates.
/// Field samples on this grid are indexed `[ix, iy, iz]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid3D {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub x: Array1<f64>, // linspace(x_min, x_max, nx)
    pub y: Array1<f64>,
    pub z: Array1<f64>,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Grid3D {
    pub fn new(shape: [usize; 3], lower: [f64; 3], upper: [f64; 3]) -> Self {
        let x = Array1::linspace(lower[0], upper[0], shape[0]);
        let y = Array1::linspace(lower[1], upper[1], shape[1]);
        let z = Array1::linspace(lower[2], upper[2], shape[2]);
        let spacing = |axis: &Array1<f64>, lo: f64, hi: f64| {
            if axis.len() > 1 {
                axis[1] - axis[0]
            } else {
                hi - lo
            }
        };
        let dx = spacing(&x, lower[0], upper[0]);
        let dy = spacing(&y, lower[1], upper[1]);
        let dz = spacing(&z, lower[2], upper[2]);

        Grid3D {
            nx: shape[0],
            ny: shape[1],
            nz: shape[2],
            x,
            y,
            z,
            dx,
            dy,
            dz,
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.nx, self.ny, self.nz]
    }

    pub fn spacing(&self) -> [f64; 3] {
        [self.dx, self.dy, self.dz]
    }

    /// Lower corner; only meaningful on a validated grid.
    pub fn lower(&self) -> [f64; 3] {
        [self.x[0], self.y[0], self.z[0]]
    }

    /// Upper corner; only meaningful on a validated grid.
    pub fn upper(&self) -> [f64; 3] {
        [self.x[self.nx - 1], self.y[self.ny - 1], self.z[self.nz - 1]]
    }

    /// Inclusive bounding-box test. Non-finite points are never inside.
    pub fn contains(&self, point: [f64; 3]) -> bool {
        let lo = self.lower();
        let hi = self.upper();
        (0..3).all(|k| point[k] >= lo[k] && point[k] <= hi[k])
    }

    pub fn validate(&self) -> TrackerResult<()> {
        for (name, n) in [("nx", self.nx), ("ny", self.ny), ("nz", self.nz)] {
            if n < 2 {
                return Err(TrackerError::PhysicsViolation(format!(
                    "grid requires at least 2 nodes per axis, got {name}={n}"
                )));
            }
        }
        if self.x.len() != self.nx || self.y.len() != self.ny || self.z.len() != self.nz {
            return Err(TrackerError::PhysicsViolation(format!(
                "grid axis length mismatch: x={}, y={}, z={}, shape={:?}",
                self.x.len(),
                self.y.len(),
                self.z.len(),
                self.shape()
            )));
        }
        for (name, d) in [("dx", self.dx), ("dy", self.dy), ("dz", self.dz)] {
            if !d.is_finite() || d <= 0.0 {
                return Err(TrackerError::PhysicsViolation(format!(
                    "grid spacing must be finite and > 0, got {name}={d}"
                )));
            }
        }
        if self.x.iter().chain(&self.y).chain(&self.z).any(|v| !v.is_finite()) {
            return Err(TrackerError::PhysicsViolation(
                "grid axes must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// The six field components a tracker reads from every grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldQuantity {
    #[serde(rename = "E_x")]
    Ex,
    #[serde(rename = "E_y")]
    Ey,
    #[serde(rename = "E_z")]
    Ez,
    #[serde(rename = "B_x")]
    Bx,
    #[serde(rename = "B_y")]
    By,
    #[serde(rename = "B_z")]
    Bz,
}

impl FieldQuantity {
    /// Electric components first, then magnetic; the push relies on this order.
    pub const ALL: [FieldQuantity; 6] = [
        FieldQuantity::Ex,
        FieldQuantity::Ey,
        FieldQuantity::Ez,
        FieldQuantity::Bx,
        FieldQuantity::By,
        FieldQuantity::Bz,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            FieldQuantity::Ex => "E_x",
            FieldQuantity::Ey => "E_y",
            FieldQuantity::Ez => "E_z",
            FieldQuantity::Bx => "B_x",
            FieldQuantity::By => "B_y",
            FieldQuantity::Bz => "B_z",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            FieldQuantity::Ex | FieldQuantity::Ey | FieldQuantity::Ez => "V/m",
            FieldQuantity::Bx | FieldQuantity::By | FieldQuantity::Bz => "T",
        }
    }
}

impl fmt::Display for FieldQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Single particle species shared by a whole ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    pub charge_c: f64,
    pub mass_kg: f64,
}

impl Species {
    pub fn new(name: &str, charge_c: f64, mass_kg: f64) -> TrackerResult<Self> {
        let species = Species {
            name: name.to_string(),
            charge_c,
            mass_kg,
        };
        species.validate()?;
        Ok(species)
    }

    pub fn proton() -> Self {
        Species {
            name: "p+".to_string(),
            charge_c: ELEMENTARY_CHARGE,
            mass_kg: PROTON_MASS,
        }
    }

    pub fn electron() -> Self {
        Species {
            name: "e-".to_string(),
            charge_c: -ELEMENTARY_CHARGE,
            mass_kg: ELECTRON_MASS,
        }
    }

    pub fn alpha() -> Self {
        Species {
            name: "He-4 2+".to_string(),
            charge_c: 2.0 * ELEMENTARY_CHARGE,
            mass_kg: ALPHA_MASS,
        }
    }

    /// Charge-to-mass ratio q/m (C/kg).
    pub fn charge_to_mass(&self) -> f64 {
        self.charge_c / self.mass_kg
    }

    pub fn validate(&self) -> TrackerResult<()> {
        if !self.mass_kg.is_finite() || self.mass_kg <= 0.0 {
            return Err(TrackerError::PhysicsViolation(format!(
                "species {} mass_kg must be finite and > 0, got {}",
                self.name, self.mass_kg
            )));
        }
        if !self.charge_c.is_finite() || self.charge_c == 0.0 {
            return Err(TrackerError::PhysicsViolation(format!(
                "species {} charge_c must be finite and non-zero, got {}",
                self.name, self.charge_c
            )));
        }
        Ok(())
    }
}

impl Default for Species {
    fn default() -> Self {
        Species::proton()
    }
}

/// Lifecycle of one particle in an ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticleStatus {
    /// Pushed every step.
    #[default]
    Tracked,
    /// Frozen in place; the last position stays meaningful.
    Stopped,
    /// Discarded; neither position nor velocity is meaningful.
    Removed,
}

/// Phase of a tracker's one-shot lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    Uninitialized,
    ParticlesLoaded,
    Running,
    Done,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: usize,
    pub tracked: usize,
    pub stopped: usize,
    pub removed: usize,
    /// Particles that were on at least one grid at some push.
    pub entered_grid: usize,
    pub mean_elapsed_time_s: f64,
    pub run_time_ms: f64,
}
