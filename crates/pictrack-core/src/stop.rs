// ─────────────────────────────────────────────────────────────────────
// SCPN PIC Tracker — Stop Conditions
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Termination strategies for the run loop.
//!
//! A stop condition only reads tracker state. Conditions that need
//! particles frozen (e.g. once they reach a target time) nominate them via
//! [`StopCondition::particles_to_stop`] and the run loop applies the stop.

use crate::tracker::ParticleTracker;
use pictrack_types::error::{TrackerError, TrackerResult};
use pictrack_types::state::ParticleStatus;

pub trait StopCondition {
    /// Label for the progress meter.
    fn description(&self) -> &str;

    fn is_finished(&self, tracker: &ParticleTracker) -> bool;

    /// Current position on the `[0, total]` progress scale.
    fn progress(&self, tracker: &ParticleTracker) -> f64;

    fn total(&self, tracker: &ParticleTracker) -> f64;

    /// Mask of tracked particles that should be stopped before the next
    /// termination check. `None` leaves every particle alone.
    fn particles_to_stop(&self, _tracker: &ParticleTracker) -> Option<Vec<bool>> {
        None
    }
}

/// Track every particle until it has accumulated `stop_time` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElapsedTime {
    stop_time: f64,
}

impl ElapsedTime {
    pub fn new(stop_time: f64) -> TrackerResult<Self> {
        if !stop_time.is_finite() || stop_time <= 0.0 {
            return Err(TrackerError::ConfigError(format!(
                "stop_time must be finite and > 0, got {stop_time}"
            )));
        }
        Ok(ElapsedTime { stop_time })
    }

    pub fn stop_time(&self) -> f64 {
        self.stop_time
    }
}

impl StopCondition for ElapsedTime {
    fn description(&self) -> &str {
        "Particle time"
    }

    fn is_finished(&self, tracker: &ParticleTracker) -> bool {
        tracker.tracked_count() == 0
    }

    fn progress(&self, tracker: &ParticleTracker) -> f64 {
        tracker.time().mean().unwrap_or(0.0)
    }

    fn total(&self, _tracker: &ParticleTracker) -> f64 {
        self.stop_time
    }

    fn particles_to_stop(&self, tracker: &ParticleTracker) -> Option<Vec<bool>> {
        let ensemble = tracker.ensemble()?;
        let mask: Vec<bool> = ensemble
            .tracked_mask()
            .iter()
            .zip(tracker.time())
            .map(|(&tracked, &t)| tracked && t >= self.stop_time)
            .collect();
        mask.iter().any(|&m| m).then_some(mask)
    }
}

/// Track until most particles have crossed the grids and almost none remain
/// on them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridExit {
    /// Fraction of the ensemble that must have entered a grid.
    pub min_entered_fraction: f64,
    /// Fraction of the entered particles allowed to still be on a grid.
    pub max_remaining_fraction: f64,
}

impl Default for GridExit {
    fn default() -> Self {
        GridExit {
            min_entered_fraction: 0.1,
            max_remaining_fraction: 0.001,
        }
    }
}

impl GridExit {
    /// `(entered, still_on)` particle counts. Only tracked particles count
    /// as still on a grid.
    fn counts(tracker: &ParticleTracker) -> (usize, usize) {
        let entered = tracker.entered_grid().iter().filter(|&&n| n > 0).count();
        let still_on = match tracker.ensemble() {
            Some(ensemble) => tracker
                .on_any_grid()
                .iter()
                .zip(ensemble.status())
                .filter(|&(&on, status)| on && *status == ParticleStatus::Tracked)
                .count(),
            None => 0,
        };
        (entered, still_on)
    }
}

impl StopCondition for GridExit {
    fn description(&self) -> &str {
        "Particles exited grid"
    }

    fn is_finished(&self, tracker: &ParticleTracker) -> bool {
        if tracker.tracked_count() == 0 {
            return true;
        }
        let n = tracker.num_particles();
        let (entered, still_on) = Self::counts(tracker);
        if n == 0 || entered == 0 {
            return false;
        }
        let entered_fraction = entered as f64 / n as f64;
        let remaining_fraction = still_on as f64 / entered as f64;
        entered_fraction > self.min_entered_fraction
            && remaining_fraction < self.max_remaining_fraction
    }

    fn progress(&self, tracker: &ParticleTracker) -> f64 {
        let (entered, still_on) = Self::counts(tracker);
        entered.saturating_sub(still_on) as f64
    }

    fn total(&self, tracker: &ParticleTracker) -> f64 {
        tracker.num_particles() as f64
    }
}

/// Track for a fixed number of pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepCount {
    pub steps: usize,
}

impl StopCondition for StepCount {
    fn description(&self) -> &str {
        "Steps"
    }

    fn is_finished(&self, tracker: &ParticleTracker) -> bool {
        tracker.steps_taken() >= self.steps || tracker.tracked_count() == 0
    }

    fn progress(&self, tracker: &ParticleTracker) -> f64 {
        tracker.steps_taken() as f64
    }

    fn total(&self, _tracker: &ParticleTracker) -> f64 {
        self.steps as f64
    }
}
