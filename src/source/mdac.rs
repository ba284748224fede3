use std::f64::consts::{LOG10_E, PI};

use serde::Serialize;

use super::{SourceSpectrum, mw_to_log_m0, mw_to_m0};
use crate::constants::{LOG10_NM_TO_DYNE_CM, MPA_TO_PA};
use crate::error::{CalibrationError, Result, ensure_finite};
use crate::model::{FrequencyBand, Phase, PhaseAttenuationParams, SourcePhysicsParams};

/// Point of a model curve evaluated at a band center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectrumPoint {
    pub log_frequency: f64,
    pub amplitude: f64,
}

/// Walter & Taylor MDAC source model for a single phase
///
/// Holds the medium constants derived once from [`SourcePhysicsParams`] so that
/// evaluation inside the optimizer is plain arithmetic.
#[derive(Debug, Clone, Copy)]
pub struct MdacSourceModel {
    source: SourcePhysicsParams,
    path: PhaseAttenuationParams,
    k: f64,
    corner_scale: f64,
    log_radiation_scale: f64,
}

impl MdacSourceModel {
    pub fn new(source: &SourcePhysicsParams, path: &PhaseAttenuationParams) -> Result<Self> {
        source.validate()?;
        path.validate()?;

        let k = calculate_k(source);
        let (radiation_pattern, source_velocity, receiver_velocity) =
            if path.phase.is_compressional() {
                (source.rad_pat_p, source.alpha_s, source.alpha_r)
            } else {
                (source.rad_pat_s, source.beta_s, source.beta_r)
            };
        let corner_scale = if path.phase.is_compressional() {
            source.zeta
        } else {
            1.0
        };

        let f = radiation_pattern
            / (4.0
                * PI
                * (source.rho_s * source.rho_r * source_velocity.powi(5) * receiver_velocity)
                    .sqrt());
        if !(f.is_finite() && f > 0.0) {
            return Err(CalibrationError::InvalidParameter(format!(
                "radiation scaling for {} is not positive",
                path.phase
            )));
        }

        Ok(Self {
            source: *source,
            path: *path,
            k: ensure_finite(k, "K")?,
            corner_scale,
            log_radiation_scale: f.log10(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.path.phase
    }

    pub fn source_params(&self) -> &SourcePhysicsParams {
        &self.source
    }

    pub fn path_params(&self) -> &PhaseAttenuationParams {
        &self.path
    }

    /// Radiation/velocity constant relating corner frequency, moment and stress.
    pub fn k(&self) -> f64 {
        self.k
    }

    /// Corner frequency (Hz) for a moment in N·m and apparent stress in MPa.
    pub fn corner_frequency_for_moment(&self, m0: f64, apparent_stress: f64) -> f64 {
        let angular = (self.k * apparent_stress * MPA_TO_PA / m0).cbrt();
        self.corner_scale * angular / (2.0 * PI)
    }

    /// log10 of the moment-rate spectrum in N·m.
    pub fn log_moment_rate(&self, frequency: f64, mw: f64, apparent_stress: f64) -> Result<f64> {
        check_inputs(frequency, mw, apparent_stress)?;
        let fc = self.corner_frequency_for_moment(mw_to_m0(mw), apparent_stress);
        let ratio = frequency / fc;
        let value = mw_to_log_m0(mw) - (1.0 + ratio * ratio).log10();
        ensure_finite(value, "moment-rate spectrum")
    }

    /// log10 amplitude observed at `distance_km` including radiation scaling,
    /// geometric spreading and anelastic attenuation.
    pub fn log_amplitude_at_distance(
        &self,
        frequency: f64,
        mw: f64,
        apparent_stress: f64,
        distance_km: f64,
    ) -> Result<f64> {
        if !(distance_km.is_finite() && distance_km > 0.0) {
            return Err(CalibrationError::InvalidParameter(format!(
                "distance must be positive, got {}",
                distance_km
            )));
        }
        let source_term =
            self.log_radiation_scale + self.log_moment_rate(frequency, mw, apparent_stress)?;
        let value = source_term + self.log_geometric_spreading(distance_km)
            - self.log_attenuation(frequency, distance_km);
        ensure_finite(value, "path amplitude")
    }

    fn log_geometric_spreading(&self, distance_km: f64) -> f64 {
        let crit = self.path.dist_crit;
        if distance_km < crit {
            -distance_km.log10()
        } else {
            -crit.log10() + self.path.eta * (crit / distance_km).log10()
        }
    }

    /// `pi f R log10(e) / (Q(f) U0)` with `Q(f) = Q0 f^gamma0`.
    fn log_attenuation(&self, frequency: f64, distance_km: f64) -> f64 {
        let q = self.path.q0 * frequency.powf(self.path.gamma0);
        PI * frequency * distance_km * LOG10_E / (q * self.path.u0)
    }

    /// Apparent stress (MPa) that places the corner at `corner_frequency`.
    pub fn apparent_stress_from_corner(&self, mw: f64, corner_frequency: f64) -> Result<f64> {
        if !(corner_frequency.is_finite() && corner_frequency > 0.0) {
            return Err(CalibrationError::InvalidParameter(format!(
                "corner frequency must be positive, got {}",
                corner_frequency
            )));
        }
        let angular = 2.0 * PI * corner_frequency / self.corner_scale;
        ensure_finite(
            angular.powi(3) * mw_to_m0(mw) / self.k / MPA_TO_PA,
            "apparent stress",
        )
    }

    /// Model amplitudes at each band center, ascending in frequency.
    /// Points with non-positive amplitude are dropped.
    pub fn model_spectrum<'a>(
        &self,
        bands: impl IntoIterator<Item = &'a FrequencyBand>,
        mw: f64,
        apparent_stress: f64,
    ) -> Result<Vec<SpectrumPoint>> {
        let mut points = Vec::new();
        for band in bands {
            let center = band.center();
            let amplitude = self.log_amplitude(center, mw, apparent_stress)?;
            if amplitude > 0.0 {
                points.push(SpectrumPoint {
                    log_frequency: center.log10(),
                    amplitude,
                });
            }
        }
        points.sort_by(|a, b| a.log_frequency.total_cmp(&b.log_frequency));
        Ok(points)
    }
}

impl SourceSpectrum for MdacSourceModel {
    fn log_amplitude(&self, frequency: f64, mw: f64, apparent_stress: f64) -> Result<f64> {
        Ok(self.log_moment_rate(frequency, mw, apparent_stress)? + LOG10_NM_TO_DYNE_CM)
    }

    fn corner_frequency(&self, mw: f64, apparent_stress: f64) -> Result<f64> {
        check_stress(apparent_stress)?;
        ensure_finite(
            self.corner_frequency_for_moment(mw_to_m0(mw), apparent_stress),
            "corner frequency",
        )
    }

    fn catalog_apparent_stress(&self, mw: f64) -> f64 {
        self.source.sigma * (mw_to_m0(mw) / self.source.m0ref).powf(self.source.psi)
    }

    /// `sigma M0 / (rho_s beta_s^2)`
    fn log_energy(&self, mw: f64, apparent_stress: f64) -> Result<f64> {
        check_stress(apparent_stress)?;
        let value = (apparent_stress * MPA_TO_PA).log10() + mw_to_log_m0(mw)
            - self.source.source_rigidity().log10();
        ensure_finite(value, "closed-form energy")
    }
}

/// `K = 16 pi / (beta_s^2 (radP^2 zeta^3 / alpha_s^5 + radS^2 / beta_s^5))`
pub fn calculate_k(source: &SourcePhysicsParams) -> f64 {
    let p_term = source.rad_pat_p * source.rad_pat_p * source.zeta.powi(3) / source.alpha_s.powi(5);
    let s_term = source.rad_pat_s * source.rad_pat_s / source.beta_s.powi(5);
    16.0 * PI / (source.beta_s * source.beta_s * (p_term + s_term))
}

fn check_inputs(frequency: f64, mw: f64, apparent_stress: f64) -> Result<()> {
    if !(frequency.is_finite() && frequency > 0.0) {
        return Err(CalibrationError::InvalidParameter(format!(
            "frequency must be positive, got {}",
            frequency
        )));
    }
    if !mw.is_finite() {
        return Err(CalibrationError::InvalidParameter(format!(
            "Mw must be finite, got {}",
            mw
        )));
    }
    check_stress(apparent_stress)
}

fn check_stress(apparent_stress: f64) -> Result<()> {
    if apparent_stress.is_finite() && apparent_stress > 0.0 {
        Ok(())
    } else {
        Err(CalibrationError::InvalidParameter(format!(
            "apparent stress must be positive, got {}",
            apparent_stress
        )))
    }
}
