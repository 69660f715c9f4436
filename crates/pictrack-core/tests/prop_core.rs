// ─────────────────────────────────────────────────────────────────────
// SCPN PIC Tracker — Property-Based Tests (proptest) for pictrack-core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for pictrack-core using proptest.
//!
//! Covers: lifecycle exclusivity under random stop/remove sequences,
//! timestep selection bounds, Boris speed conservation.

use ndarray::{Array1, Array2};
use pictrack_core::boris::boris_step;
use pictrack_core::grid::{CartesianGrid, FieldGrid};
use pictrack_core::particles::ParticleEnsemble;
use pictrack_core::stop::StepCount;
use pictrack_core::timestep::{select_timestep, timestep_candidates, TimestepInputs};
use pictrack_core::tracker::ParticleTracker;
use pictrack_math::vector::norm;
use pictrack_types::config::{FieldWeighting, TimestepPolicy};
use pictrack_types::state::{Grid3D, ParticleStatus, Species};
use proptest::prelude::*;

fn assert_lifecycle_consistent(ensemble: &ParticleEnsemble) -> Result<(), TestCaseError> {
    let x = ensemble.masked_positions();
    let v = ensemble.masked_velocities();
    for (i, status) in ensemble.status().iter().enumerate() {
        let x_nan = x.row(i).iter().any(|c| c.is_nan());
        let v_nan = v.row(i).iter().any(|c| c.is_nan());
        // no half-removed rows: a NaN position always comes with a NaN velocity
        prop_assert!(!x_nan || v_nan, "particle {} has NaN x but finite v", i);
        prop_assert_eq!(x_nan, *status == ParticleStatus::Removed);
        prop_assert_eq!(!v_nan, *status == ParticleStatus::Tracked);
        prop_assert_eq!(x.row(i).iter().all(|c| c.is_nan()), x_nan);
        prop_assert_eq!(v.row(i).iter().all(|c| c.is_nan()), v_nan);
    }
    prop_assert_eq!(
        ensemble.tracked_count() + ensemble.stopped_count() + ensemble.removed_count(),
        ensemble.len()
    );
    Ok(())
}

// ── Lifecycle Exclusivity ────────────────────────────────────────────

proptest! {
    /// Random stop/remove sequences never leave a mixed masked state, and
    /// removal is never undone.
    #[test]
    fn lifecycle_masks_stay_exclusive(
        n in 1usize..24,
        ops in prop::collection::vec(
            (any::<bool>(), prop::collection::vec(any::<bool>(), 24)),
            0..8,
        ),
    ) {
        let x = Array2::from_shape_fn((n, 3), |(i, k)| i as f64 + 0.1 * k as f64);
        let v = Array2::from_shape_fn((n, 3), |(i, k)| 1.0 + i as f64 - k as f64);
        let mut ensemble = ParticleEnsemble::new(x, v, Species::proton()).unwrap();
        assert_lifecycle_consistent(&ensemble)?;

        for (is_remove, mask) in ops {
            let before = ensemble.status().to_vec();
            let mask = &mask[..n];
            if is_remove {
                ensemble.remove(mask).unwrap();
            } else {
                ensemble.stop(mask).unwrap();
            }
            for (old, new) in before.iter().zip(ensemble.status()) {
                if *old == ParticleStatus::Removed {
                    prop_assert_eq!(*new, ParticleStatus::Removed);
                }
            }
            assert_lifecycle_consistent(&ensemble)?;
        }
    }

    /// Lifecycle stays consistent through a run with particles stopped and
    /// removed before it.
    #[test]
    fn lifecycle_survives_pushes(
        stop_mask in prop::collection::vec(any::<bool>(), 6),
        remove_mask in prop::collection::vec(any::<bool>(), 6),
        steps in 1usize..6,
    ) {
        let geometry = Grid3D::new([5, 5, 5], [-1.0; 3], [1.0; 3]);
        let grid = CartesianGrid::uniform(geometry, [1e-3, 0.0, 0.0], [0.0, 0.0, 1e-7]).unwrap();
        let grids: Vec<Box<dyn FieldGrid>> = vec![Box::new(grid)];
        let mut tracker = ParticleTracker::new(grids, false).unwrap();
        let x = Array2::from_shape_fn((6, 3), |(i, k)| {
            if k == 0 { -0.5 + 0.2 * i as f64 } else { 0.0 }
        });
        let v = Array2::from_shape_fn((6, 3), |(_, k)| if k == 1 { 1e-2 } else { 0.0 });
        tracker.load_particles(x, v, Species::proton()).unwrap();
        tracker.stop_particles(&stop_mask).unwrap();
        tracker.remove_particles(&remove_mask).unwrap();
        let frozen = tracker.ensemble().unwrap().positions().to_owned();

        tracker
            .run(
                &StepCount { steps },
                None,
                Some(TimestepPolicy::fixed(1e-2)),
                FieldWeighting::VolumeAveraged,
            )
            .unwrap();

        let ensemble = tracker.ensemble().unwrap();
        assert_lifecycle_consistent(ensemble)?;
        for (i, status) in ensemble.status().iter().enumerate() {
            if *status == ParticleStatus::Tracked {
                prop_assert!(tracker.time()[i] > 0.0);
            } else {
                prop_assert_eq!(tracker.time()[i], 0.0);
                let positions = ensemble.positions();
                prop_assert_eq!(positions.row(i), frozen.row(i));
            }
        }
    }
}

// ── Timestep Monotonic Safety ────────────────────────────────────────

proptest! {
    /// The selected step lies inside the bounds and never exceeds any finite
    /// clamped candidate.
    #[test]
    fn selected_timestep_respects_candidates(
        flags in prop::collection::vec(any::<bool>(), 12),
        res in prop::collection::vec(1e-4f64..1.0, 3),
        v_max in 1e-2f64..1e6,
        b_max in prop_oneof![Just(0.0), 1e-9f64..10.0],
        dt_min in prop_oneof![Just(0.0), 1e-12f64..1e-6],
        dt_max_factor in prop_oneof![Just(f64::INFINITY), 1.0f64..1e6],
        steps_per_gyroperiod in 1.0f64..50.0,
    ) {
        let on_grid = Array2::from_shape_vec((4, 3), flags).unwrap();
        let dt_max = if dt_max_factor.is_finite() {
            dt_min.max(1e-12) * dt_max_factor
        } else {
            f64::INFINITY
        };
        let policy = TimestepPolicy::bounded(dt_min, dt_max);
        let inputs = TimestepInputs {
            on_grid: on_grid.view(),
            grid_resolution: &res,
            v_max,
            b_max,
            charge_c: Species::proton().charge_c,
            mass_kg: Species::proton().mass_kg,
            steps_per_gyroperiod,
        };
        let dt: Array1<f64> = select_timestep(&policy, &inputs).unwrap().to_array(4);
        let (lo, hi) = policy.bounds();
        let candidates = timestep_candidates(&inputs, (lo, hi));

        for i in 0..4 {
            prop_assert!(dt[i].is_finite() && dt[i] > 0.0);
            prop_assert!(dt[i] >= lo && dt[i] <= hi, "dt {} outside [{}, {}]", dt[i], lo, hi);
            for &c in candidates.row(i).iter().filter(|c| c.is_finite()) {
                prop_assert!(dt[i] <= c, "dt {} above candidate {}", dt[i], c);
            }
        }
    }
}

// ── Boris Speed Conservation ─────────────────────────────────────────

proptest! {
    /// Pure magnetic rotation conserves speed for any field orientation.
    #[test]
    fn boris_conserves_speed_without_electric_field(
        v0 in prop::array::uniform3(-1e6f64..1e6),
        b in prop::array::uniform3(-5.0f64..5.0),
        omega_dt in 1e-3f64..1.0,
        steps in 1usize..200,
    ) {
        let speed_0 = norm(v0);
        let b_mag = norm(b);
        prop_assume!(speed_0 > 1.0 && b_mag > 1e-6);
        let qm = Species::proton().charge_to_mass();
        let dt = omega_dt / (qm * b_mag);
        let mut x = [0.0; 3];
        let mut v = v0;
        for _ in 0..steps {
            boris_step(&mut x, &mut v, [0.0; 3], b, qm, dt);
        }
        let rel = (norm(v) - speed_0).abs() / speed_0;
        prop_assert!(rel < 1e-10, "speed drift {}", rel);
    }
}
