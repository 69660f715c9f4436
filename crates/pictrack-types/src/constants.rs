// ─────────────────────────────────────────────────────────────────────
// SCPN PIC Tracker — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Elementary charge (C)
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;

/// Proton mass (kg)
pub const PROTON_MASS: f64 = 1.672_621_923_69e-27;

/// Electron mass (kg)
pub const ELECTRON_MASS: f64 = 9.109_383_701_5e-31;

/// Alpha particle mass (kg)
pub const ALPHA_MASS: f64 = 6.644_657_335_7e-27;

/// Speed of light in vacuum (m/s). Only used to flag pushes that leave
/// the non-relativistic regime.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
