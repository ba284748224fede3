//! Radiated energy from a band-limited moment-rate spectrum.
//!
//! The energy of an omega-square source is
//! `E = 4 / (pi K mu) * integral( w^2 M(w)^2 dw )`, which reduces to
//! `sigma M0 / mu` for the model itself. Measured bands are integrated with
//! the trapezoid rule over `ln f` on `f^3 M(f)^2`; below the lowest and above
//! the highest band the integral is continued analytically with the model
//! shape, scaled to meet the data at each edge.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::Serialize;

use crate::config::EnergyConfig;
use crate::constants::{LOG10_NM_TO_DYNE_CM, MPA_TO_PA};
use crate::error::{CalibrationError, Result, ensure_finite};
use crate::model::{FrequencyBand, PhaseAttenuationParams, SourcePhysicsParams};
use crate::source::{MdacSourceModel, SourceSpectrum, mw_to_m0};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyInfo {
    /// Energy between the lowest and highest measured frequency, log10 J
    pub log_observed_energy: f64,
    /// Measured plus extrapolated energy, log10 J
    pub log_total_energy: f64,
    /// Closed-form model energy at the fitted parameters, log10 J
    pub log_energy_mdac: f64,
    /// Fraction of the total energy inside the measured bands
    pub energy_ratio: f64,
    /// Apparent stress implied by the total energy (MPa)
    pub observed_apparent_stress: f64,
}

pub struct EnergyIntegrator {
    model: MdacSourceModel,
    config: EnergyConfig,
}

impl EnergyIntegrator {
    pub fn new(
        source: &SourcePhysicsParams,
        path: &PhaseAttenuationParams,
        config: &EnergyConfig,
    ) -> Result<Self> {
        Ok(Self::from_model(MdacSourceModel::new(source, path)?, config))
    }

    pub fn from_model(model: MdacSourceModel, config: &EnergyConfig) -> Self {
        Self {
            model,
            config: config.clone(),
        }
    }

    /// Integrate log amplitudes (dyne·cm) evaluated at band centers.
    pub fn total_energy(
        &self,
        band_to_log_amplitude: &BTreeMap<FrequencyBand, f64>,
        mw_fit: f64,
        apparent_stress: f64,
    ) -> Result<EnergyInfo> {
        let samples: Vec<(f64, f64)> = band_to_log_amplitude
            .iter()
            .map(|(band, amp)| (band.center(), *amp))
            .collect();
        self.integrate_samples(&samples, mw_fit, apparent_stress)
    }

    /// Integrate `(frequency Hz, log10 amplitude dyne·cm)` samples.
    pub fn integrate_samples(
        &self,
        samples: &[(f64, f64)],
        mw_fit: f64,
        apparent_stress: f64,
    ) -> Result<EnergyInfo> {
        if samples.len() < 2 {
            return Err(CalibrationError::InsufficientData {
                needed: 2,
                available: samples.len(),
            });
        }
        let mut points = Vec::with_capacity(samples.len());
        for &(frequency, amplitude) in samples {
            if !(frequency.is_finite() && frequency > 0.0) {
                return Err(CalibrationError::InvalidParameter(format!(
                    "frequency must be positive, got {}",
                    frequency
                )));
            }
            if !amplitude.is_finite() {
                return Err(CalibrationError::InvalidParameter(format!(
                    "non-finite amplitude at {} Hz",
                    frequency
                )));
            }
            let moment_rate = 10f64.powf(amplitude - LOG10_NM_TO_DYNE_CM);
            points.push((frequency, moment_rate));
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        let m0 = mw_to_m0(mw_fit);
        let fc = self.model.corner_frequency(mw_fit, apparent_stress)?;

        let mut in_band = 0.0;
        for pair in points.windows(2) {
            let (f0, m_0) = pair[0];
            let (f1, m_1) = pair[1];
            in_band += 0.5 * (spectral_density(f0, m_0) + spectral_density(f1, m_1)) * (f1 / f0).ln();
        }

        let mut tails = 0.0;
        if self.config.extrapolate_tails {
            let brune = |f: f64| m0 / (1.0 + (f / fc) * (f / fc));
            let scale = m0 * m0 * fc.powi(3);
            let (f_lo, m_lo) = points[0];
            let (f_hi, m_hi) = points[points.len() - 1];
            let lo_match = (m_lo / brune(f_lo)).powi(2);
            let hi_match = (m_hi / brune(f_hi)).powi(2);
            tails += lo_match * scale * brune_partial_integral(f_lo / fc);
            tails += hi_match * scale * (PI / 4.0 - brune_partial_integral(f_hi / fc));
        }

        let rigidity = self.model.source_params().source_rigidity();
        let to_energy = 4.0 / (PI * self.model.k() * rigidity) * (2.0 * PI).powi(3);
        let observed = to_energy * in_band;
        let total = to_energy * (in_band + tails);

        let info = EnergyInfo {
            log_observed_energy: ensure_finite(observed.log10(), "observed energy")?,
            log_total_energy: ensure_finite(total.log10(), "total energy")?,
            log_energy_mdac: self.model.log_energy(mw_fit, apparent_stress)?,
            energy_ratio: ensure_finite(observed / total, "energy ratio")?,
            observed_apparent_stress: ensure_finite(
                rigidity * total / m0 / MPA_TO_PA,
                "observed apparent stress",
            )?,
        };
        log::debug!(
            "Energy: log10 E {:.3} (model {:.3}), {:.1}% in band",
            info.log_total_energy,
            info.log_energy_mdac,
            100.0 * info.energy_ratio
        );
        Ok(info)
    }
}

/// Energy summary for an S-wave (Lg) fit without building an integrator.
pub fn total_energy(
    band_to_log_amplitude: &BTreeMap<FrequencyBand, f64>,
    mw_fit: f64,
    apparent_stress: f64,
    source: &SourcePhysicsParams,
) -> Result<EnergyInfo> {
    EnergyIntegrator::new(
        source,
        &PhaseAttenuationParams::default(),
        &EnergyConfig::default(),
    )?
    .total_energy(band_to_log_amplitude, mw_fit, apparent_stress)
}

/// Integrand on a log-frequency axis: `f^3 M(f)^2`.
fn spectral_density(frequency: f64, moment_rate: f64) -> f64 {
    frequency.powi(3) * moment_rate * moment_rate
}

/// `integral_0^x u^2 / (1 + u^2)^2 du`, which tends to `pi/4`.
fn brune_partial_integral(x: f64) -> f64 {
    0.5 * (x.atan() - x / (1.0 + x * x))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integrator(extrapolate_tails: bool) -> EnergyIntegrator {
        EnergyIntegrator::new(
            &SourcePhysicsParams::default(),
            &PhaseAttenuationParams::default(),
            &EnergyConfig { extrapolate_tails },
        )
        .unwrap()
    }

    fn model_samples(mw: f64, stress: f64, n: usize) -> Vec<(f64, f64)> {
        let model = MdacSourceModel::new(
            &SourcePhysicsParams::default(),
            &PhaseAttenuationParams::default(),
        )
        .unwrap();
        let (lo, hi) = (0.01f64.ln(), 200f64.ln());
        (0..n)
            .map(|i| {
                let f = (lo + (hi - lo) * i as f64 / (n - 1) as f64).exp();
                (f, model.log_amplitude(f, mw, stress).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_partial_integral_limits() {
        assert_eq!(brune_partial_integral(0.0), 0.0);
        assert!((brune_partial_integral(1e9) - PI / 4.0).abs() < 1e-8);
        // derivative u^2/(1+u^2)^2 is 1/4 at u = 1
        let h = 1e-6;
        let slope = (brune_partial_integral(1.0 + h) - brune_partial_integral(1.0 - h)) / (2.0 * h);
        assert!((slope - 0.25).abs() < 1e-8);
    }

    #[test]
    fn test_dense_model_spectrum_matches_closed_form() {
        let info = integrator(true)
            .integrate_samples(&model_samples(5.0, 1.0, 1000), 5.0, 1.0)
            .unwrap();
        let linear_error = 10f64.powf(info.log_total_energy - info.log_energy_mdac) - 1.0;
        assert!(linear_error.abs() < 1e-3, "error {}", linear_error);
        assert!((info.observed_apparent_stress - 1.0).abs() < 1e-3);
        assert!(info.energy_ratio > 0.99 && info.energy_ratio <= 1.0);
    }

    #[test]
    fn test_tails_only_add_energy() {
        let samples = model_samples(6.0, 2.0, 50);
        let with = integrator(true).integrate_samples(&samples, 6.0, 2.0).unwrap();
        let without = integrator(false).integrate_samples(&samples, 6.0, 2.0).unwrap();
        assert!(with.log_total_energy > without.log_total_energy);
        assert_eq!(without.energy_ratio, 1.0);
        assert_eq!(with.log_observed_energy, without.log_observed_energy);
    }

    #[test]
    fn test_sample_order_does_not_matter() {
        let samples = model_samples(4.0, 3.0, 20);
        let mut reversed = samples.clone();
        reversed.reverse();
        let e = integrator(true);
        assert_eq!(
            e.integrate_samples(&samples, 4.0, 3.0).unwrap(),
            e.integrate_samples(&reversed, 4.0, 3.0).unwrap()
        );
    }

    #[test]
    fn test_band_entry_point() {
        let model = MdacSourceModel::new(
            &SourcePhysicsParams::default(),
            &PhaseAttenuationParams::default(),
        )
        .unwrap();
        let bands: BTreeMap<FrequencyBand, f64> = [(0.05, 0.1), (0.5, 1.0), (2.0, 4.0), (6.0, 8.0)]
            .iter()
            .map(|&(lo, hi)| {
                let band = FrequencyBand::new(lo, hi).unwrap();
                (band, model.log_amplitude(band.center(), 4.5, 1.0).unwrap())
            })
            .collect();
        let info = total_energy(&bands, 4.5, 1.0, &SourcePhysicsParams::default()).unwrap();
        assert!((info.log_total_energy / info.log_energy_mdac - 1.0).abs() < 0.04);
    }

    #[test]
    fn test_rejects_bad_input() {
        let e = integrator(true);
        assert!(matches!(
            e.integrate_samples(&[(1.0, 20.0)], 5.0, 1.0),
            Err(CalibrationError::InsufficientData { needed: 2, available: 1 })
        ));
        assert!(matches!(
            e.integrate_samples(&[(0.0, 20.0), (1.0, 20.0)], 5.0, 1.0),
            Err(CalibrationError::InvalidParameter(_))
        ));
        assert!(matches!(
            e.integrate_samples(&[(0.5, f64::NAN), (1.0, 20.0)], 5.0, 1.0),
            Err(CalibrationError::InvalidParameter(_))
        ));
        assert!(e.integrate_samples(&[(0.5, 20.0), (1.0, 20.0)], 5.0, 0.0).is_err());
    }
}
