// ─────────────────────────────────────────────────────────────────────
// SCPN PIC Tracker — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::{TrackerError, TrackerResult};
use crate::state::Grid3D;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How grid samples are weighted when a field is read at a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldWeighting {
    /// Trilinear weighting of the eight surrounding vertices.
    #[default]
    #[serde(rename = "volume averaged")]
    VolumeAveraged,
    /// Value of the closest grid vertex.
    #[serde(rename = "nearest neighbor")]
    NearestNeighbor,
}

impl FieldWeighting {
    pub const ALL: [FieldWeighting; 2] = [
        FieldWeighting::VolumeAveraged,
        FieldWeighting::NearestNeighbor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldWeighting::VolumeAveraged => "volume averaged",
            FieldWeighting::NearestNeighbor => "nearest neighbor",
        }
    }
}

impl fmt::Display for FieldWeighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldWeighting {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldWeighting::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| {
                TrackerError::ConfigError(format!(
                    "unknown field weighting '{s}', expected one of {:?}",
                    FieldWeighting::ALL.map(|w| w.as_str())
                ))
            })
    }
}

/// Timestep selection policy for a run.
///
/// `Fixed` forces one uniform step for every particle and disables all
/// adaptivity. `Adaptive` clamps every candidate into `[dt_min, dt_max]`;
/// an absent `dt_max` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimestepPolicy {
    Fixed {
        dt: f64,
    },
    Adaptive {
        #[serde(default)]
        dt_min: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dt_max: Option<f64>,
    },
}

impl Default for TimestepPolicy {
    fn default() -> Self {
        TimestepPolicy::Adaptive {
            dt_min: 0.0,
            dt_max: None,
        }
    }
}

impl TimestepPolicy {
    pub fn fixed(dt: f64) -> Self {
        TimestepPolicy::Fixed { dt }
    }

    pub fn bounded(dt_min: f64, dt_max: f64) -> Self {
        TimestepPolicy::Adaptive {
            dt_min,
            dt_max: if dt_max.is_finite() { Some(dt_max) } else { None },
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, TimestepPolicy::Fixed { .. })
    }

    /// `(dt_min, dt_max)` clamp bounds; a fixed step collapses both to `dt`.
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            TimestepPolicy::Fixed { dt } => (dt, dt),
            TimestepPolicy::Adaptive { dt_min, dt_max } => {
                (dt_min, dt_max.unwrap_or(f64::INFINITY))
            }
        }
    }

    pub fn validate(&self) -> TrackerResult<()> {
        match *self {
            TimestepPolicy::Fixed { dt } => {
                if !dt.is_finite() || dt <= 0.0 {
                    return Err(TrackerError::ConfigError(format!(
                        "fixed timestep must be finite and > 0, got {dt}"
                    )));
                }
            }
            TimestepPolicy::Adaptive { dt_min, dt_max } => {
                if !dt_min.is_finite() || dt_min < 0.0 {
                    return Err(TrackerError::ConfigError(format!(
                        "dt_min must be finite and >= 0, got {dt_min}"
                    )));
                }
                if let Some(max) = dt_max {
                    if max.is_nan() || max <= 0.0 || max < dt_min {
                        return Err(TrackerError::ConfigError(format!(
                            "dt_max must be > 0 and >= dt_min, got dt_min={dt_min}, dt_max={max}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn default_verbose() -> bool {
    true
}
fn default_steps_per_gyroperiod() -> f64 {
    1.0
}
fn default_edge_tolerance() -> f64 {
    1e-3
}

/// Run configuration for a particle tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub field_weighting: FieldWeighting,
    #[serde(default)]
    pub timestep: TimestepPolicy,
    /// Show the progress meter and run summary.
    #[serde(default = "default_verbose")]
    pub verbose: bool,
    /// Divisor applied to the gyroperiod before it enters the candidate set.
    #[serde(default = "default_steps_per_gyroperiod")]
    pub steps_per_gyroperiod: f64,
    /// Edge maxima above `edge_tolerance * max|field|` raise an advisory.
    #[serde(default = "default_edge_tolerance")]
    pub edge_tolerance: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            field_weighting: FieldWeighting::default(),
            timestep: TimestepPolicy::default(),
            verbose: default_verbose(),
            steps_per_gyroperiod: default_steps_per_gyroperiod(),
            edge_tolerance: default_edge_tolerance(),
        }
    }
}

impl TrackerConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &str) -> TrackerResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TrackerResult<()> {
        self.timestep.validate()?;
        if !self.steps_per_gyroperiod.is_finite() || self.steps_per_gyroperiod <= 0.0 {
            return Err(TrackerError::ConfigError(format!(
                "steps_per_gyroperiod must be finite and > 0, got {}",
                self.steps_per_gyroperiod
            )));
        }
        if !self.edge_tolerance.is_finite() || self.edge_tolerance < 0.0 {
            return Err(TrackerError::ConfigError(format!(
                "edge_tolerance must be finite and >= 0, got {}",
                self.edge_tolerance
            )));
        }
        Ok(())
    }
}

/// Geometry of one uniform Cartesian field grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Node counts along x, y, z.
    pub shape: [usize; 3],
    /// Lower corner (m).
    pub lower: [f64; 3],
    /// Upper corner (m).
    pub upper: [f64; 3],
}

impl GridConfig {
    pub fn from_file(path: &str) -> TrackerResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn create_grid(&self) -> Grid3D {
        Grid3D::new(self.shape, self.lower, self.upper)
    }
}
