// ─────────────────────────────────────────────────────────────────────
// SCPN PIC Tracker — Property-Based Tests (proptest) for pictrack-types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for pictrack-types using proptest.
//!
//! Covers: Grid3D construction invariants, timestep policy bounds,
//! configuration serialization roundtrip.

use pictrack_types::config::{FieldWeighting, TimestepPolicy, TrackerConfig};
use pictrack_types::state::Grid3D;
use proptest::prelude::*;

// ── Grid3D Construction Invariants ───────────────────────────────────

proptest! {
    /// Grid dimensions match constructor arguments.
    #[test]
    fn grid_dimensions_match(
        nx in 2usize..40,
        ny in 2usize..40,
        nz in 2usize..40,
    ) {
        let grid = Grid3D::new([nx, ny, nz], [-1.0, -2.0, -3.0], [1.0, 2.0, 3.0]);

        prop_assert_eq!(grid.shape(), [nx, ny, nz]);
        prop_assert_eq!(grid.x.len(), nx);
        prop_assert_eq!(grid.y.len(), ny);
        prop_assert_eq!(grid.z.len(), nz);
        prop_assert!(grid.validate().is_ok());
    }

    /// Spacing times cell count spans the requested extent.
    #[test]
    fn grid_spacing_spans_extent(
        n in 2usize..64,
        lo in -10.0f64..0.0,
        width in 0.01f64..20.0,
    ) {
        let grid = Grid3D::new([n, n, n], [lo; 3], [lo + width; 3]);
        for d in grid.spacing() {
            let span = d * (n - 1) as f64;
            prop_assert!((span - width).abs() < 1e-9 * width.max(1.0),
                "span {} != width {}", span, width);
        }
        prop_assert!(grid.contains([lo + 0.5 * width; 3]));
        prop_assert!(!grid.contains([lo - 1e-3; 3]));
    }
}

// ── Timestep Policy ──────────────────────────────────────────────────

proptest! {
    /// Valid adaptive bounds keep their ordering after conversion.
    #[test]
    fn adaptive_bounds_ordered(dt_min in 0.0f64..1e-6, extra in 0.0f64..1e-6) {
        let policy = TimestepPolicy::bounded(dt_min, dt_min + extra);
        prop_assume!(dt_min + extra > 0.0);
        prop_assert!(policy.validate().is_ok());
        let (lo, hi) = policy.bounds();
        prop_assert!(lo <= hi);
        prop_assert_eq!(lo, dt_min);
    }

    /// Any strictly positive finite fixed step validates and collapses the bounds.
    #[test]
    fn fixed_step_collapses_bounds(dt in 1e-15f64..1e3) {
        let policy = TimestepPolicy::fixed(dt);
        prop_assert!(policy.validate().is_ok());
        prop_assert_eq!(policy.bounds(), (dt, dt));
        prop_assert!(policy.is_fixed());
    }
}

// ── Config Serialization ─────────────────────────────────────────────

proptest! {
    /// Tracker configuration survives a JSON roundtrip.
    #[test]
    fn tracker_config_json_roundtrip(
        nearest in any::<bool>(),
        fixed in any::<bool>(),
        dt in 1e-12f64..1e-3,
        verbose in any::<bool>(),
        divisor in 1.0f64..64.0,
    ) {
        let cfg = TrackerConfig {
            field_weighting: if nearest {
                FieldWeighting::NearestNeighbor
            } else {
                FieldWeighting::VolumeAveraged
            },
            timestep: if fixed {
                TimestepPolicy::fixed(dt)
            } else {
                TimestepPolicy::bounded(0.0, dt)
            },
            verbose,
            steps_per_gyroperiod: divisor,
            edge_tolerance: 1e-3,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TrackerConfig = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, cfg);
    }
}
