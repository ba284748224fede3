use serde::Serialize;

use super::spectrum::{log_spaced_frequencies, synthetic_samples};
use crate::config::EnergyConfig;
use crate::energy::EnergyIntegrator;
use crate::error::Result;
use crate::source::MdacSourceModel;

/// Frequency range used to sample dense synthetic spectra (Hz).
pub const SWEEP_LOW_HZ: f64 = 0.01;
pub const SWEEP_HIGH_HZ: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepRow {
    pub mw: f64,
    pub stress: f64,
    pub samples: usize,
    pub log_energy: f64,
    pub log_energy_mdac: f64,
    /// |E / E_model - 1| in linear energy
    pub relative_error: f64,
}

/// Integration error against the closed form for model spectra sampled at
/// each of `sample_counts` log-spaced frequencies.
pub fn energy_error_sweep(
    model: &MdacSourceModel,
    config: &EnergyConfig,
    mw: f64,
    stress: f64,
    sample_counts: &[usize],
) -> Result<Vec<SweepRow>> {
    let integrator = EnergyIntegrator::from_model(*model, config);
    sample_counts
        .iter()
        .map(|&n| {
            let frequencies = log_spaced_frequencies(SWEEP_LOW_HZ, SWEEP_HIGH_HZ, n);
            let samples = synthetic_samples(model, &frequencies, mw, stress)?;
            let info = integrator.integrate_samples(&samples, mw, stress)?;
            Ok(SweepRow {
                mw,
                stress,
                samples: n,
                log_energy: info.log_total_energy,
                log_energy_mdac: info.log_energy_mdac,
                relative_error: relative_energy_error(info.log_total_energy, info.log_energy_mdac),
            })
        })
        .collect()
}

pub fn relative_energy_error(log_energy: f64, log_reference: f64) -> f64 {
    (10f64.powf(log_energy - log_reference) - 1.0).abs()
}
