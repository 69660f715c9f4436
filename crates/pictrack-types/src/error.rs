// ─────────────────────────────────────────────────────────────────────
// SCPN PIC Tracker — Error
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Tracker order violation: {0}")]
    OrderViolation(String),

    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Physics constraint violated: {0}")]
    PhysicsViolation(String),

    #[error("Non-finite field value: grid {grid} quantity {quantity} contains NaN or infinite samples")]
    NonFiniteField { grid: usize, quantity: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl TrackerError {
    /// Misuse of the API (bad settings or out-of-order calls) rather than a
    /// failure of the physics or of I/O.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            TrackerError::ConfigError(_) | TrackerError::OrderViolation(_)
        )
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
