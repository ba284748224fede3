mod mdac;

pub use mdac::{MdacSourceModel, SpectrumPoint, calculate_k};

use crate::constants::{LOG10_M0_OFFSET, MW_SLOPE};
use crate::error::Result;
use crate::model::{Phase, PhaseAttenuationParams, SourcePhysicsParams};

/// A parametric source spectrum the fitter and site-term solver evaluate.
///
/// Amplitudes are log10 moment-rate in dyne·cm, the same units as
/// path-corrected coda amplitudes. Implementations must be cheap and free of
/// allocation: they are called for every band at every optimizer step.
pub trait SourceSpectrum: Send + Sync {
    fn log_amplitude(&self, frequency: f64, mw: f64, apparent_stress: f64) -> Result<f64>;

    fn corner_frequency(&self, mw: f64, apparent_stress: f64) -> Result<f64>;

    /// Apparent stress assumed for an event of size `mw` when none is known.
    fn catalog_apparent_stress(&self, mw: f64) -> f64;

    /// Closed-form radiated energy implied by the model, log10 joules.
    fn log_energy(&self, mw: f64, apparent_stress: f64) -> Result<f64>;
}

pub fn mw_to_log_m0(mw: f64) -> f64 {
    MW_SLOPE * mw + LOG10_M0_OFFSET
}

pub fn log_m0_to_mw(log_m0: f64) -> f64 {
    (log_m0 - LOG10_M0_OFFSET) / MW_SLOPE
}

pub fn mw_to_m0(mw: f64) -> f64 {
    10f64.powf(mw_to_log_m0(mw))
}

/// Evaluate the MDAC source amplitude for one phase without keeping a model.
pub fn amplitude(
    frequency: f64,
    mw: f64,
    apparent_stress: f64,
    phase: Phase,
    source: &SourcePhysicsParams,
    path: &PhaseAttenuationParams,
) -> Result<f64> {
    let path = PhaseAttenuationParams { phase, ..*path };
    MdacSourceModel::new(source, &path)?.log_amplitude(frequency, mw, apparent_stress)
}
