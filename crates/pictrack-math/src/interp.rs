// ─────────────────────────────────────────────────────────────────────
// SCPN PIC Tracker — Interpolation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Point interpolation on a Grid3D.
//!
//! Both kernels return NaN for points outside the grid instead of clamping,
//! so callers can tell "off this grid" apart from "field is zero here".

use ndarray::ArrayView3;
use pictrack_types::config::FieldWeighting;
use pictrack_types::state::Grid3D;

/// Fractional node coordinates of `point` along each axis.
fn fractional_index(grid: &Grid3D, point: [f64; 3]) -> [f64; 3] {
    let lo = grid.lower();
    let d = grid.spacing();
    [
        (point[0] - lo[0]) / d[0],
        (point[1] - lo[1]) / d[1],
        (point[2] - lo[2]) / d[2],
    ]
}

/// Value of the grid vertex closest to `point`.
pub fn nearest_neighbor(field: ArrayView3<f64>, grid: &Grid3D, point: [f64; 3]) -> f64 {
    if !grid.contains(point) {
        return f64::NAN;
    }
    let f = fractional_index(grid, point);
    let shape = grid.shape();
    let idx = |k: usize| (f[k].round() as isize).clamp(0, shape[k] as isize - 1) as usize;
    field[[idx(0), idx(1), idx(2)]]
}

/// Trilinear (volume-averaged) value from the eight vertices of the cell
/// containing `point`.
pub fn volume_averaged(field: ArrayView3<f64>, grid: &Grid3D, point: [f64; 3]) -> f64 {
    if !grid.contains(point) {
        return f64::NAN;
    }
    let f = fractional_index(grid, point);
    let shape = grid.shape();

    let mut i0 = [0usize; 3];
    let mut t = [0.0f64; 3];
    for k in 0..3 {
        // Upper boundary falls into the last cell with t = 1.
        i0[k] = (f[k].floor() as isize).clamp(0, shape[k] as isize - 2) as usize;
        t[k] = (f[k] - i0[k] as f64).clamp(0.0, 1.0);
    }
    let [ix, iy, iz] = i0;
    let [tx, ty, tz] = t;

    let c000 = field[[ix, iy, iz]];
    let c100 = field[[ix + 1, iy, iz]];
    let c010 = field[[ix, iy + 1, iz]];
    let c110 = field[[ix + 1, iy + 1, iz]];
    let c001 = field[[ix, iy, iz + 1]];
    let c101 = field[[ix + 1, iy, iz + 1]];
    let c011 = field[[ix, iy + 1, iz + 1]];
    let c111 = field[[ix + 1, iy + 1, iz + 1]];

    let c00 = c000 * (1.0 - tx) + c100 * tx;
    let c10 = c010 * (1.0 - tx) + c110 * tx;
    let c01 = c001 * (1.0 - tx) + c101 * tx;
    let c11 = c011 * (1.0 - tx) + c111 * tx;

    let c0 = c00 * (1.0 - ty) + c10 * ty;
    let c1 = c01 * (1.0 - ty) + c11 * ty;

    c0 * (1.0 - tz) + c1 * tz
}

/// Dispatch on the weighting policy.
pub fn interpolate(
    field: ArrayView3<f64>,
    grid: &Grid3D,
    point: [f64; 3],
    weighting: FieldWeighting,
) -> f64 {
    match weighting {
        FieldWeighting::VolumeAveraged => volume_averaged(field, grid, point),
        FieldWeighting::NearestNeighbor => nearest_neighbor(field, grid, point),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn linear_field(grid: &Grid3D) -> Array3<f64> {
        // f(x, y, z) = x + 2y - 3z
        Array3::from_shape_fn(grid.shape(), |(i, j, k)| {
            grid.x[i] + 2.0 * grid.y[j] - 3.0 * grid.z[k]
        })
    }

    #[test]
    fn test_volume_averaged_exact_gridpoint() {
        let grid = Grid3D::new([5, 5, 5], [0.0; 3], [4.0; 3]);
        let field = Array3::from_shape_fn((5, 5, 5), |(i, j, k)| (i * 100 + j * 10 + k) as f64);
        let val = volume_averaged(field.view(), &grid, [2.0, 3.0, 1.0]);
        assert!((val - 231.0).abs() < 1e-10, "val = {val}, expected 231");
    }

    #[test]
    fn test_volume_averaged_reproduces_linear_field() {
        let grid = Grid3D::new([11, 7, 9], [-1.0, 0.0, 2.0], [1.0, 3.0, 6.0]);
        let field = linear_field(&grid);
        for p in [[0.13, 1.7, 3.3], [-0.99, 2.95, 5.9], [0.999, 3.0, 6.0]] {
            let expected = p[0] + 2.0 * p[1] - 3.0 * p[2];
            let val = volume_averaged(field.view(), &grid, p);
            assert!((val - expected).abs() < 1e-10, "at {p:?}: {val} vs {expected}");
        }
    }

    #[test]
    fn test_nearest_neighbor_snaps_to_vertex() {
        let grid = Grid3D::new([5, 5, 5], [0.0; 3], [4.0; 3]);
        let field = Array3::from_shape_fn((5, 5, 5), |(i, j, k)| (i * 100 + j * 10 + k) as f64);
        let val = nearest_neighbor(field.view(), &grid, [1.4, 2.6, 3.9]);
        assert_eq!(val, 134.0);
    }

    #[test]
    fn test_off_grid_is_nan() {
        let grid = Grid3D::new([4, 4, 4], [0.0; 3], [1.0; 3]);
        let field = Array3::from_elem((4, 4, 4), 5.0);
        for weighting in FieldWeighting::ALL {
            let val = interpolate(field.view(), &grid, [1.5, 0.5, 0.5], weighting);
            assert!(val.is_nan(), "{weighting} should be NaN off grid");
            let val = interpolate(field.view(), &grid, [f64::NAN, 0.5, 0.5], weighting);
            assert!(val.is_nan());
        }
    }

    #[test]
    fn test_constant_field_any_weighting() {
        let grid = Grid3D::new([6, 6, 6], [-3.0; 3], [3.0; 3]);
        let field = Array3::from_elem((6, 6, 6), 7.0);
        for weighting in FieldWeighting::ALL {
            let val = interpolate(field.view(), &grid, [0.3, -2.2, 2.9], weighting);
            assert!((val - 7.0).abs() < 1e-12);
        }
    }
}
