// ─────────────────────────────────────────────────────────────────────
// SCPN PIC Tracker — Tracking Engine
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Grid-coupled particle tracking engine.
//!
//! Stage 1: grids, particle store, timestep selection, Boris push
//! Stage 2: stop conditions, saving routines, run loop

pub mod boris;
pub mod grid;
pub mod particles;
pub mod saving;
pub mod stop;
pub mod timestep;
pub mod tracker;

pub use grid::{CartesianGrid, FieldGrid};
pub use saving::{SavingRoutine, TimestepSnapshot, TrajectoryRecorder};
pub use stop::{ElapsedTime, GridExit, StepCount, StopCondition};
pub use tracker::ParticleTracker;
