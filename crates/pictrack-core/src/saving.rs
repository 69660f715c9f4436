// ─────────────────────────────────────────────────────────────────────
// SCPN PIC Tracker — Saving Routines
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Post-push output hooks.
//!
//! Hooks receive a shared borrow of the tracker and therefore cannot touch
//! particle state.

use crate::tracker::ParticleTracker;
use ndarray::{Array1, Array2};
use ndarray_npy::NpzWriter;
use pictrack_types::error::{TrackerError, TrackerResult};
use std::fs::File;
use std::path::{Path, PathBuf};

pub trait SavingRoutine {
    /// Called once before the first push. Fail here to abort the run before
    /// any state changes.
    fn prepare(&mut self, _tracker: &ParticleTracker) -> TrackerResult<()> {
        Ok(())
    }

    /// Called after every push, before the stop condition is re-evaluated.
    fn post_push_hook(&mut self, tracker: &ParticleTracker) -> TrackerResult<()>;
}

/// Writes `<step>.npz` with masked `x`, `v` and per-particle `t` after
/// every push. Requires a fixed timestep so that the step index is global.
#[derive(Debug, Clone)]
pub struct TimestepSnapshot {
    output_directory: PathBuf,
}

impl TimestepSnapshot {
    pub fn new(output_directory: impl Into<PathBuf>) -> Self {
        TimestepSnapshot {
            output_directory: output_directory.into(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Path of the snapshot written after `step` pushes.
    pub fn snapshot_path(&self, step: usize) -> PathBuf {
        self.output_directory.join(format!("{step}.npz"))
    }

    fn require_fixed_timestep(tracker: &ParticleTracker) -> TrackerResult<()> {
        if !tracker.timestep_policy().is_fixed() {
            return Err(TrackerError::ConfigError(
                "Snapshots are named by global step count and need a fixed timestep; \
                 run with TimestepPolicy::Fixed"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl SavingRoutine for TimestepSnapshot {
    fn prepare(&mut self, tracker: &ParticleTracker) -> TrackerResult<()> {
        Self::require_fixed_timestep(tracker)?;
        std::fs::create_dir_all(&self.output_directory)?;
        Ok(())
    }

    fn post_push_hook(&mut self, tracker: &ParticleTracker) -> TrackerResult<()> {
        Self::require_fixed_timestep(tracker)?;
        let ensemble = tracker.ensemble().ok_or_else(|| {
            TrackerError::OrderViolation("no particles loaded to snapshot".to_string())
        })?;
        let path = self.snapshot_path(tracker.steps_taken());

        let file = File::create(&path)?;
        let mut npz = NpzWriter::new(file);
        let snapshot_err = |e: ndarray_npy::WriteNpzError| {
            TrackerError::Snapshot(format!("{}: {e}", path.display()))
        };
        npz.add_array("x", &ensemble.masked_positions())
            .map_err(snapshot_err)?;
        npz.add_array("v", &ensemble.masked_velocities())
            .map_err(snapshot_err)?;
        npz.add_array("t", &tracker.time()).map_err(snapshot_err)?;
        npz.finish().map_err(snapshot_err)?;

        tracing::debug!(path = %path.display(), "snapshot written");
        Ok(())
    }
}

/// One recorded frame of a [`TrajectoryRecorder`].
#[derive(Debug, Clone)]
pub struct TrajectoryFrame {
    pub step: usize,
    pub x: Array2<f64>,
    pub v: Array2<f64>,
    pub t: Array1<f64>,
}

/// Keeps masked particle state in memory every `every` pushes.
#[derive(Debug, Clone)]
pub struct TrajectoryRecorder {
    every: usize,
    frames: Vec<TrajectoryFrame>,
}

impl TrajectoryRecorder {
    pub fn new(every: usize) -> TrackerResult<Self> {
        if every == 0 {
            return Err(TrackerError::ConfigError(
                "TrajectoryRecorder interval must be >= 1".to_string(),
            ));
        }
        Ok(TrajectoryRecorder {
            every,
            frames: Vec::new(),
        })
    }

    pub fn frames(&self) -> &[TrajectoryFrame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<TrajectoryFrame> {
        self.frames
    }
}

impl SavingRoutine for TrajectoryRecorder {
    fn post_push_hook(&mut self, tracker: &ParticleTracker) -> TrackerResult<()> {
        let step = tracker.steps_taken();
        if step % self.every != 0 {
            return Ok(());
        }
        if let Some(ensemble) = tracker.ensemble() {
            self.frames.push(TrajectoryFrame {
                step,
                x: ensemble.masked_positions(),
                v: ensemble.masked_velocities(),
                t: tracker.time().to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CartesianGrid, FieldGrid};
    use crate::stop::StepCount;
    use ndarray::array;
    use ndarray_npy::NpzReader;
    use pictrack_types::config::{FieldWeighting, TimestepPolicy};
    use pictrack_types::state::{Grid3D, Species};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn loaded_tracker() -> ParticleTracker {
        let geometry = Grid3D::new([4, 4, 4], [-1.0; 3], [1.0; 3]);
        let grid = CartesianGrid::uniform(geometry, [0.0; 3], [0.0; 3]).unwrap();
        let grids: Vec<Box<dyn FieldGrid>> = vec![Box::new(grid)];
        let mut tracker = ParticleTracker::new(grids, false).unwrap();
        tracker
            .load_particles(
                array![[0.0, 0.0, 0.0], [0.5, 0.0, 0.0]],
                array![[0.01, 0.0, 0.0], [0.0, -0.01, 0.0]],
                Species::proton(),
            )
            .unwrap();
        tracker
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        let epoch_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "pictrack_{tag}_{}_{}",
            std::process::id(),
            epoch_ns
        ))
    }

    #[test]
    fn test_snapshot_writes_one_file_per_push() {
        let dir = scratch_dir("snapshot");
        let mut tracker = loaded_tracker();
        let mut saver = TimestepSnapshot::new(dir.clone());
        tracker
            .run(
                &StepCount { steps: 3 },
                Some(&mut saver),
                Some(TimestepPolicy::fixed(0.5)),
                FieldWeighting::VolumeAveraged,
            )
            .unwrap();

        for step in 1..=3 {
            assert!(saver.snapshot_path(step).exists(), "missing snapshot {step}");
        }
        assert!(!saver.snapshot_path(0).exists());

        let mut npz = NpzReader::new(File::open(saver.snapshot_path(3)).unwrap()).unwrap();
        let x: Array2<f64> = npz.by_name("x.npy").unwrap();
        let t: Array1<f64> = npz.by_name("t.npy").unwrap();
        assert_eq!(x.dim(), (2, 3));
        assert!((x[[0, 0]] - 0.015).abs() < 1e-12);
        assert!((t[1] - 1.5).abs() < 1e-12);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_snapshot_requires_fixed_timestep() {
        let dir = scratch_dir("snapshot_adaptive");
        let mut tracker = loaded_tracker();
        let mut saver = TimestepSnapshot::new(dir.clone());
        let err = tracker
            .run(
                &StepCount { steps: 3 },
                Some(&mut saver),
                None,
                FieldWeighting::VolumeAveraged,
            )
            .unwrap_err();
        match err {
            TrackerError::ConfigError(msg) => assert!(msg.contains("fixed timestep")),
            other => panic!("Unexpected error: {other:?}"),
        }
        assert_eq!(tracker.steps_taken(), 0);
        assert!(!dir.exists());
    }

    #[test]
    fn test_trajectory_recorder_interval() {
        assert!(TrajectoryRecorder::new(0).is_err());
        let mut tracker = loaded_tracker();
        let mut recorder = TrajectoryRecorder::new(2).unwrap();
        tracker
            .run(
                &StepCount { steps: 5 },
                Some(&mut recorder),
                Some(TimestepPolicy::fixed(1.0)),
                FieldWeighting::NearestNeighbor,
            )
            .unwrap();
        let steps: Vec<usize> = recorder.frames().iter().map(|f| f.step).collect();
        assert_eq!(steps, vec![2, 4]);
        let frame = &recorder.frames()[1];
        assert!((frame.x[[1, 1]] + 0.04).abs() < 1e-12);
        assert!((frame.t[0] - 4.0).abs() < 1e-12);
    }
}
