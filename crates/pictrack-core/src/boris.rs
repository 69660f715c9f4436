// ─────────────────────────────────────────────────────────────────────
// SCPN PIC Tracker — Boris Pusher
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Non-relativistic Boris push.
//!
//! Half electric kick, magnetic rotation, half electric kick, then the
//! position advances with the *updated* velocity.

use ndarray::{ArrayView1, ArrayView2, ArrayViewMut2, Zip};
use pictrack_math::vector::{add, cross, dot, scale};

/// Advance one particle state by `dt`.
pub fn boris_step(
    x: &mut [f64; 3],
    v: &mut [f64; 3],
    electric_v_m: [f64; 3],
    magnetic_t: [f64; 3],
    q_over_m: f64,
    dt: f64,
) {
    let qmdt2 = 0.5 * q_over_m * dt;
    let half_kick = scale(electric_v_m, qmdt2);

    let v_minus = add(*v, half_kick);
    let t = scale(magnetic_t, qmdt2);
    let s = scale(t, 2.0 / (1.0 + dot(t, t)));
    let v_prime = add(v_minus, cross(v_minus, t));
    let v_plus = add(v_minus, cross(v_prime, s));

    *v = add(v_plus, half_kick);
    *x = add(*x, scale(*v, dt));
}

/// Push every row of `x`/`v` with its own field sample and timestep.
///
/// All arrays share the leading particle axis; `e`/`b` are `[N, 3]` and
/// `dt` is `[N]`. No validation happens here.
pub fn boris_push(
    mut x: ArrayViewMut2<f64>,
    mut v: ArrayViewMut2<f64>,
    e: ArrayView2<f64>,
    b: ArrayView2<f64>,
    q_over_m: f64,
    dt: ArrayView1<f64>,
) {
    Zip::from(x.rows_mut())
        .and(v.rows_mut())
        .and(e.rows())
        .and(b.rows())
        .and(&dt)
        .par_for_each(|mut xr, mut vr, er, br, &dt| {
            let mut xp = [xr[0], xr[1], xr[2]];
            let mut vp = [vr[0], vr[1], vr[2]];
            boris_step(
                &mut xp,
                &mut vp,
                [er[0], er[1], er[2]],
                [br[0], br[1], br[2]],
                q_over_m,
                dt,
            );
            for k in 0..3 {
                xr[k] = xp[k];
                vr[k] = vp[k];
            }
        });
}
