use thiserror::Error;

use crate::fitting::FitResult;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Insufficient data: need {needed} usable bands, have {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The optimizer ran out of budget. `partial` holds the best point seen.
    #[error("Fit did not converge after {iterations} iterations (best Mw {:.3})", partial.mw)]
    FitDidNotConverge {
        iterations: usize,
        partial: Box<FitResult>,
    },

    #[error("Numeric divergence: {0}")]
    NumericDivergence(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CalibrationError {
    /// Best-effort fit carried by a non-converged result, if any.
    pub fn partial_fit(&self) -> Option<&FitResult> {
        match self {
            Self::FitDidNotConverge { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CalibrationError>;

/// Reject NaN/inf produced mid-computation instead of letting it flow onward.
pub(crate) fn ensure_finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalibrationError::NumericDivergence(format!(
            "{} evaluated to {}",
            what, value
        )))
    }
}
