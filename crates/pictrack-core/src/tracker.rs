// ─────────────────────────────────────────────────────────────────────
// SCPN PIC Tracker — Particle Tracker
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Run loop: push the tracked ensemble through the summed fields of every
//! attached grid until the stop condition reports completion.
//!
//! Phases: `Uninitialized -> ParticlesLoaded -> Running -> Done`. A tracker
//! runs once; reloading or re-running after the loop has started is an
//! [`TrackerError::OrderViolation`].

use crate::boris::boris_push;
use crate::grid::{validate_field_quality, FieldAdvisory, FieldGrid};
use crate::particles::ParticleEnsemble;
use crate::saving::SavingRoutine;
use crate::stop::StopCondition;
use crate::timestep::{select_timestep, Timestep, TimestepInputs};
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use pictrack_math::vector::{is_finite, norm};
use pictrack_types::config::{FieldWeighting, TimestepPolicy, TrackerConfig};
use pictrack_types::constants::SPEED_OF_LIGHT;
use pictrack_types::error::{TrackerError, TrackerResult};
use pictrack_types::state::{FieldQuantity, ParticleStatus, RunSummary, Species, TrackerPhase};
use std::time::Instant;

/// Resolution of the progress meter.
const PROGRESS_TICKS: u64 = 1000;

/// Above this fraction of c the non-relativistic push is flagged once.
const RELATIVISTIC_WARN_FRACTION: f64 = 0.1;

/// Below this fraction of particles entering any grid the run summary warns.
const LOW_ENTRY_FRACTION: f64 = 0.1;

pub struct ParticleTracker {
    grids: Vec<Box<dyn FieldGrid>>,
    grid_resolution: Vec<f64>,
    config: TrackerConfig,
    phase: TrackerPhase,
    ensemble: Option<ParticleEnsemble>,
    time: Array1<f64>,
    on_grid: Array2<bool>,
    entered_grid: Array1<u64>,
    timestep: TimestepPolicy,
    field_weighting: FieldWeighting,
    last_timestep: Option<Timestep>,
    v_max: f64,
    steps: usize,
    advisories: Vec<FieldAdvisory>,
    relativistic_warned: bool,
}

impl ParticleTracker {
    /// Tracker with default configuration.
    pub fn new(grids: Vec<Box<dyn FieldGrid>>, verbose: bool) -> TrackerResult<Self> {
        Self::with_config(
            grids,
            TrackerConfig {
                verbose,
                ..TrackerConfig::default()
            },
        )
    }

    /// Validate the configuration and the field quality of every grid.
    pub fn with_config(
        grids: Vec<Box<dyn FieldGrid>>,
        config: TrackerConfig,
    ) -> TrackerResult<Self> {
        config.validate()?;
        if grids.is_empty() {
            return Err(TrackerError::ConfigError(
                "at least one field grid is required".to_string(),
            ));
        }

        let mut advisories = Vec::new();
        for (index, grid) in grids.iter().enumerate() {
            advisories.extend(validate_field_quality(
                index,
                grid.as_ref(),
                config.edge_tolerance,
            )?);
        }
        let grid_resolution: Vec<f64> = grids.iter().map(|g| g.min_resolution()).collect();
        if let Some(idx) = grid_resolution
            .iter()
            .position(|ds| !ds.is_finite() || *ds <= 0.0)
        {
            return Err(TrackerError::ConfigError(format!(
                "grid[{idx}] resolution must be finite and > 0, got {}",
                grid_resolution[idx]
            )));
        }

        Ok(ParticleTracker {
            grids,
            grid_resolution,
            timestep: config.timestep,
            field_weighting: config.field_weighting,
            config,
            phase: TrackerPhase::Uninitialized,
            ensemble: None,
            time: Array1::zeros(0),
            on_grid: Array2::from_elem((0, 0), false),
            entered_grid: Array1::zeros(0),
            last_timestep: None,
            v_max: 0.0,
            steps: 0,
            advisories,
            relativistic_warned: false,
        })
    }

    fn enforce_order(&self) -> TrackerResult<()> {
        match self.phase {
            TrackerPhase::Running | TrackerPhase::Done => Err(TrackerError::OrderViolation(
                "the particles of a tracker cannot be changed once it has run; \
                 create a new tracker instead"
                    .to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Load the ensemble. May be repeated until the tracker runs.
    pub fn load_particles(
        &mut self,
        x: Array2<f64>,
        v: Array2<f64>,
        species: Species,
    ) -> TrackerResult<()> {
        self.enforce_order()?;
        let ensemble = ParticleEnsemble::new(x, v, species)?;
        let n = ensemble.len();
        self.time = Array1::zeros(n);
        self.on_grid = Array2::from_elem((n, self.grids.len()), false);
        self.entered_grid = Array1::zeros(n);
        self.v_max = ensemble.max_tracked_speed();
        self.ensemble = Some(ensemble);
        self.phase = TrackerPhase::ParticlesLoaded;
        Ok(())
    }

    fn ensemble_mut(&mut self) -> TrackerResult<&mut ParticleEnsemble> {
        self.ensemble
            .as_mut()
            .ok_or_else(|| {
                TrackerError::OrderViolation("no particles have been loaded".to_string())
            })
    }

    /// Freeze the masked particles; their positions stay meaningful.
    pub fn stop_particles(&mut self, mask: &[bool]) -> TrackerResult<usize> {
        self.ensemble_mut()?.stop(mask)
    }

    /// Discard the masked particles.
    pub fn remove_particles(&mut self, mask: &[bool]) -> TrackerResult<usize> {
        self.ensemble_mut()?.remove(mask)
    }

    /// Run with the configured timestep policy and field weighting.
    pub fn run_configured(
        &mut self,
        stop_condition: &dyn StopCondition,
        saving_routine: Option<&mut dyn SavingRoutine>,
    ) -> TrackerResult<RunSummary> {
        let weighting = self.config.field_weighting;
        self.run(stop_condition, saving_routine, None, weighting)
    }

    /// Push until `stop_condition` is finished.
    ///
    /// `dt` overrides the configured timestep policy for this run. Errors
    /// raised before the first push leave the tracker loaded and runnable;
    /// once the loop starts the tracker ends `Done` whatever the outcome.
    pub fn run(
        &mut self,
        stop_condition: &dyn StopCondition,
        mut saving_routine: Option<&mut dyn SavingRoutine>,
        dt: Option<TimestepPolicy>,
        field_weighting: FieldWeighting,
    ) -> TrackerResult<RunSummary> {
        match self.phase {
            TrackerPhase::Uninitialized => {
                return Err(TrackerError::OrderViolation(
                    "particles must be loaded before running the tracker".to_string(),
                ))
            }
            TrackerPhase::Running | TrackerPhase::Done => {
                return Err(TrackerError::OrderViolation(
                    "this tracker has already run; create a new tracker instead".to_string(),
                ))
            }
            TrackerPhase::ParticlesLoaded => {}
        }

        let policy = dt.unwrap_or(self.config.timestep);
        policy.validate()?;
        self.timestep = policy;
        self.field_weighting = field_weighting;
        self.time.fill(0.0);
        self.on_grid.fill(false);
        self.entered_grid.fill(0);
        self.steps = 0;
        self.last_timestep = None;

        if let Some(routine) = saving_routine.as_mut() {
            routine.prepare(self)?;
        }

        self.phase = TrackerPhase::Running;
        let started = Instant::now();
        tracing::info!(
            particles = self.num_particles(),
            grids = self.grids.len(),
            timestep = ?self.timestep,
            weighting = %self.field_weighting,
            "Tracker run started"
        );

        let bar = self.progress_bar(stop_condition);
        let outcome = self.run_loop(stop_condition, saving_routine, &bar);
        bar.finish();
        self.phase = TrackerPhase::Done;
        outcome?;

        let summary = self.summary(started.elapsed().as_secs_f64() * 1e3);
        let n = self.num_particles();
        if n > 0 && (summary.entered_grid as f64) < LOW_ENTRY_FRACTION * n as f64 {
            tracing::warn!(
                entered = summary.entered_grid,
                particles = n,
                "Only {:.2}% of particles entered a field grid",
                100.0 * summary.entered_grid as f64 / n as f64
            );
        }
        tracing::info!(
            steps = summary.steps,
            tracked = summary.tracked,
            stopped = summary.stopped,
            removed = summary.removed,
            run_time_ms = summary.run_time_ms,
            "Run completed"
        );
        Ok(summary)
    }

    fn run_loop(
        &mut self,
        stop_condition: &dyn StopCondition,
        mut saving_routine: Option<&mut dyn SavingRoutine>,
        bar: &ProgressBar,
    ) -> TrackerResult<()> {
        loop {
            if let Some(mask) = stop_condition.particles_to_stop(self) {
                self.stop_particles(&mask)?;
            }
            if stop_condition.is_finished(self) {
                break;
            }
            self.update_progress(stop_condition, bar);
            self.push()?;
            if let Some(routine) = saving_routine.as_mut() {
                routine.post_push_hook(self)?;
            }
        }
        self.update_progress(stop_condition, bar);
        Ok(())
    }

    fn progress_bar(&self, stop_condition: &dyn StopCondition) -> ProgressBar {
        if !self.config.verbose {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(PROGRESS_TICKS);
        let style = ProgressStyle::with_template(
            "{prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {msg}",
        )
        .map(|s| s.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_prefix(stop_condition.description().to_string());
        bar
    }

    fn update_progress(&self, stop_condition: &dyn StopCondition, bar: &ProgressBar) {
        let progress = stop_condition.progress(self);
        let total = stop_condition.total(self);
        let fraction = if total > 0.0 && total.is_finite() {
            (progress / total).clamp(0.0, 1.0)
        } else {
            0.0
        };
        bar.set_position((fraction * PROGRESS_TICKS as f64) as u64);
        bar.set_message(format!("{progress:.1e}/{total:.1e}"));
    }

    /// Advance every tracked particle by one step.
    fn push(&mut self) -> TrackerResult<()> {
        let Some(ensemble) = self.ensemble.as_mut() else {
            return Err(TrackerError::OrderViolation(
                "no particles have been loaded".to_string(),
            ));
        };
        let n = ensemble.len();
        let n_grids = self.grids.len();

        // Membership at the current positions, removed particles excluded.
        let mut on_grid = Array2::from_elem((n, n_grids), false);
        for (g, grid) in self.grids.iter().enumerate() {
            let flags = grid.on_grid(ensemble.positions());
            check_len(&format!("grid[{g}] on_grid flags"), n, flags.len())?;
            Zip::from(on_grid.column_mut(g))
                .and(&flags)
                .and(ArrayView1::from(ensemble.status()))
                .for_each(|on, &flag, status| *on = flag && *status != ParticleStatus::Removed);
        }
        // Only pushes a tracked particle spends on a grid count as entries.
        Zip::from(&mut self.entered_grid)
            .and(on_grid.rows())
            .and(ArrayView1::from(ensemble.status()))
            .for_each(|entered, row, status| {
                if *status == ParticleStatus::Tracked && row.iter().any(|&on| on) {
                    *entered = entered.saturating_add(1);
                }
            });

        let tracked = ensemble.tracked_indices();
        self.on_grid = on_grid;
        self.steps += 1;
        if tracked.is_empty() {
            self.v_max = 0.0;
            return Ok(());
        }
        let n_tracked = tracked.len();
        let (mut x, mut v) = ensemble.gather(&tracked);

        // Per-grid NaN (off that grid) is zeroed before the sum so a
        // particle off one grid still feels the others.
        let mut e = Array2::<f64>::zeros((n_tracked, 3));
        let mut b = Array2::<f64>::zeros((n_tracked, 3));
        for (g, grid) in self.grids.iter().enumerate() {
            let values = grid.interpolate(x.view(), &FieldQuantity::ALL, self.field_weighting);
            check_len(
                &format!("grid[{g}] interpolated quantities"),
                FieldQuantity::ALL.len(),
                values.len(),
            )?;
            for (c, component) in values.iter().enumerate() {
                check_len(
                    &format!("grid[{g}] {}", FieldQuantity::ALL[c]),
                    n_tracked,
                    component.len(),
                )?;
                let mut target = if c < 3 {
                    e.column_mut(c)
                } else {
                    b.column_mut(c - 3)
                };
                Zip::from(&mut target).and(component).for_each(|sum, &val| {
                    if !val.is_nan() {
                        *sum += val;
                    }
                });
            }
        }

        let b_max = b
            .rows()
            .into_iter()
            .map(|row| norm([row[0], row[1], row[2]]))
            .fold(0.0, f64::max);
        let v_max = ensemble.max_tracked_speed();
        if !self.relativistic_warned && v_max > RELATIVISTIC_WARN_FRACTION * SPEED_OF_LIGHT {
            tracing::warn!(
                v_max,
                "Particle speeds exceed {:.0}% of c; the Boris push used here is non-relativistic",
                100.0 * RELATIVISTIC_WARN_FRACTION
            );
            self.relativistic_warned = true;
        }

        let tracked_on_grid = self.on_grid.select(Axis(0), &tracked);
        let species = ensemble.species();
        let inputs = TimestepInputs {
            on_grid: tracked_on_grid.view(),
            grid_resolution: &self.grid_resolution,
            v_max,
            b_max,
            charge_c: species.charge_c,
            mass_kg: species.mass_kg,
            steps_per_gyroperiod: self.config.steps_per_gyroperiod,
        };
        let timestep = select_timestep(&self.timestep, &inputs)?;
        let dt = timestep.to_array(n_tracked);

        boris_push(
            x.view_mut(),
            v.view_mut(),
            e.view(),
            b.view(),
            species.charge_to_mass(),
            dt.view(),
        );

        if let Some(row) = x
            .rows()
            .into_iter()
            .zip(v.rows())
            .position(|(xr, vr)| {
                !is_finite([xr[0], xr[1], xr[2]]) || !is_finite([vr[0], vr[1], vr[2]])
            })
        {
            return Err(TrackerError::PhysicsViolation(format!(
                "push {} produced a non-finite state for particle[{}]",
                self.steps, tracked[row]
            )));
        }

        ensemble.scatter(&tracked, &x, &v);
        for (&i, &step) in tracked.iter().zip(dt.iter()) {
            self.time[i] += step;
        }

        let (dt_lo, dt_hi) = timestep.range();
        tracing::debug!(
            step = self.steps,
            tracked = n_tracked,
            dt_min = dt_lo,
            dt_max = dt_hi,
            b_max,
            v_max,
            "push"
        );
        self.v_max = v_max;
        self.last_timestep = Some(timestep);
        Ok(())
    }

    fn summary(&self, run_time_ms: f64) -> RunSummary {
        let (tracked, stopped, removed) = self
            .ensemble
            .as_ref()
            .map(|e| (e.tracked_count(), e.stopped_count(), e.removed_count()))
            .unwrap_or((0, 0, 0));
        RunSummary {
            steps: self.steps,
            tracked,
            stopped,
            removed,
            entered_grid: self.entered_grid.iter().filter(|&&n| n > 0).count(),
            mean_elapsed_time_s: self.time.mean().unwrap_or(0.0),
            run_time_ms,
        }
    }

    // ── Observables ──────────────────────────────────────────────────

    pub fn num_grids(&self) -> usize {
        self.grids.len()
    }

    pub fn num_particles(&self) -> usize {
        self.ensemble.as_ref().map_or(0, |e| e.len())
    }

    pub fn tracked_count(&self) -> usize {
        self.ensemble.as_ref().map_or(0, |e| e.tracked_count())
    }

    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn ensemble(&self) -> Option<&ParticleEnsemble> {
        self.ensemble.as_ref()
    }

    /// Elapsed time per particle (s).
    pub fn time(&self) -> ArrayView1<'_, f64> {
        self.time.view()
    }

    /// `[N, G]` membership sampled at the start of the latest push.
    pub fn on_grid(&self) -> ArrayView2<'_, bool> {
        self.on_grid.view()
    }

    pub fn on_any_grid(&self) -> Array1<bool> {
        self.on_grid
            .rows()
            .into_iter()
            .map(|row| row.iter().any(|&on| on))
            .collect()
    }

    /// Number of pushes each particle spent on at least one grid.
    pub fn entered_grid(&self) -> ArrayView1<'_, u64> {
        self.entered_grid.view()
    }

    /// Largest tracked speed seen by the latest push (m/s).
    pub fn v_max(&self) -> f64 {
        self.v_max
    }

    pub fn steps_taken(&self) -> usize {
        self.steps
    }

    pub fn timestep_policy(&self) -> &TimestepPolicy {
        &self.timestep
    }

    pub fn field_weighting(&self) -> FieldWeighting {
        self.field_weighting
    }

    pub fn last_timestep(&self) -> Option<&Timestep> {
        self.last_timestep.as_ref()
    }

    pub fn advisories(&self) -> &[FieldAdvisory] {
        &self.advisories
    }
}

fn check_len(context: &str, expected: usize, actual: usize) -> TrackerResult<()> {
    if expected != actual {
        return Err(TrackerError::ShapeMismatch {
            context: context.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}
