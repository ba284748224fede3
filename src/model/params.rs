use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};

/// Regional seismic phase a parameter set applies to.
///
/// # Parsing
/// Case-insensitive: `"Lg"`, `"lg"`, `"PN"` all parse.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Phase {
    Pn,
    Pg,
    Sn,
    Lg,
}

impl Phase {
    /// P phases use the compressional radiation pattern, velocities and a
    /// corner frequency scaled by zeta.
    pub fn is_compressional(&self) -> bool {
        matches!(self, Self::Pn | Self::Pg)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pn => "Pn",
            Self::Pg => "Pg",
            Self::Sn => "Sn",
            Self::Lg => "Lg",
        };
        f.write_str(name)
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pn" => Ok(Self::Pn),
            "pg" => Ok(Self::Pg),
            "sn" => Ok(Self::Sn),
            "lg" => Ok(Self::Lg),
            _ => Err(format!("unknown phase: {}", s)),
        }
    }
}

/// Path attenuation parameters for one phase
///
/// `Q(f) = q0 * f^gamma0`; geometric spreading is `1/R` inside `dist_crit`
/// and decays with exponent `eta` beyond it. Distances are km, velocities km/s.
/// The `del_*` fields are the parameter uncertainties carried with a
/// calibrated set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseAttenuationParams {
    /// Phase these parameters describe
    pub phase: Phase,
    /// Attenuation at 1 Hz
    pub q0: f64,
    /// Uncertainty of `q0`
    pub del_q0: f64,
    /// Frequency exponent of Q
    pub gamma0: f64,
    /// Uncertainty of `gamma0`
    pub del_gamma0: f64,
    /// Group velocity (km/s)
    pub u0: f64,
    /// Geometric spreading exponent beyond `dist_crit`
    pub eta: f64,
    /// Uncertainty of `eta`
    pub del_eta: f64,
    /// Crossover distance for geometric spreading (km)
    pub dist_crit: f64,
    /// Minimum signal-to-noise ratio for a usable measurement
    pub snr_threshold: f64,
}

impl PhaseAttenuationParams {
    pub fn for_phase(phase: Phase) -> Self {
        Self {
            phase,
            ..Self::default()
        }
    }

    pub fn with_q(mut self, q0: f64, gamma0: f64) -> Self {
        self.q0 = q0;
        self.gamma0 = gamma0;
        self
    }

    pub fn with_spreading(mut self, eta: f64, dist_crit: f64) -> Self {
        self.eta = eta;
        self.dist_crit = dist_crit;
        self
    }

    pub fn with_group_velocity(mut self, u0: f64) -> Self {
        self.u0 = u0;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("q0", self.q0),
            ("u0", self.u0),
            ("dist_crit", self.dist_crit),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CalibrationError::InvalidParameter(format!(
                    "{} {} must be positive (phase {})",
                    name, value, self.phase
                )));
            }
        }
        if !self.gamma0.is_finite() || !self.eta.is_finite() {
            return Err(CalibrationError::InvalidParameter(format!(
                "gamma0/eta must be finite (phase {})",
                self.phase
            )));
        }
        Ok(())
    }
}

impl Default for PhaseAttenuationParams {
    fn default() -> Self {
        Self {
            phase: Phase::Lg,
            q0: 210.0,
            del_q0: 0.0,
            gamma0: 0.65,
            del_gamma0: 0.0,
            u0: 3.5,
            eta: 0.5,
            del_eta: 0.0,
            dist_crit: 100.0,
            snr_threshold: 2.0,
        }
    }
}

/// Source and receiver medium parameters
///
/// Velocities in m/s, densities in kg/m³, `sigma` in MPa, `m0ref` in N·m.
/// Apparent stress scales with moment as `sigma * (M0 / m0ref)^psi`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePhysicsParams {
    /// Reference apparent stress (MPa)
    pub sigma: f64,
    /// Uncertainty of `sigma`
    pub del_sigma: f64,
    /// Stress scaling exponent
    pub psi: f64,
    /// Uncertainty of `psi`
    pub del_psi: f64,
    /// P to S corner frequency ratio
    pub zeta: f64,
    /// Reference moment for stress scaling (N·m)
    pub m0ref: f64,
    /// Source region P velocity
    pub alpha_s: f64,
    /// Source region S velocity
    pub beta_s: f64,
    /// Source region density
    pub rho_s: f64,
    /// Receiver region P velocity
    pub alpha_r: f64,
    /// Receiver region S velocity
    pub beta_r: f64,
    /// Receiver region density
    pub rho_r: f64,
    /// Average P radiation pattern
    pub rad_pat_p: f64,
    /// Average S radiation pattern
    pub rad_pat_s: f64,
}

impl SourcePhysicsParams {
    /// Copy with a fixed apparent stress and no moment scaling.
    pub fn with_fixed_stress(mut self, sigma_mpa: f64) -> Self {
        self.sigma = sigma_mpa;
        self.psi = 0.0;
        self
    }

    /// Rigidity of the source region, `rho_s * beta_s^2` (Pa).
    pub fn source_rigidity(&self) -> f64 {
        self.rho_s * self.beta_s * self.beta_s
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("sigma", self.sigma),
            ("zeta", self.zeta),
            ("m0ref", self.m0ref),
            ("alpha_s", self.alpha_s),
            ("beta_s", self.beta_s),
            ("rho_s", self.rho_s),
            ("alpha_r", self.alpha_r),
            ("beta_r", self.beta_r),
            ("rho_r", self.rho_r),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CalibrationError::InvalidParameter(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !self.psi.is_finite() || !self.rad_pat_p.is_finite() || !self.rad_pat_s.is_finite() {
            return Err(CalibrationError::InvalidParameter(
                "psi and radiation patterns must be finite".to_string(),
            ));
        }
        if self.rad_pat_p <= 0.0 && self.rad_pat_s <= 0.0 {
            return Err(CalibrationError::InvalidParameter(
                "at least one radiation pattern must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SourcePhysicsParams {
    fn default() -> Self {
        Self {
            sigma: 0.3,
            del_sigma: 0.0,
            psi: 0.25,
            del_psi: 0.0,
            zeta: 1.0,
            m0ref: 1e16,
            alpha_s: 6000.0,
            beta_s: 3500.0,
            rho_s: 2700.0,
            alpha_r: 6000.0,
            beta_r: 3500.0,
            rho_r: 2700.0,
            rad_pat_p: 0.44,
            rad_pat_s: 0.6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_parsing() {
        assert_eq!("Lg".parse::<Phase>().unwrap(), Phase::Lg);
        assert_eq!(" pn ".parse::<Phase>().unwrap(), Phase::Pn);
        assert_eq!("PG".parse::<Phase>().unwrap(), Phase::Pg);
        assert!("coda".parse::<Phase>().is_err());
        assert_eq!(Phase::Sn.to_string(), "Sn");
    }

    #[test]
    fn test_compressional_phases() {
        assert!(Phase::Pn.is_compressional());
        assert!(Phase::Pg.is_compressional());
        assert!(!Phase::Sn.is_compressional());
        assert!(!Phase::Lg.is_compressional());
    }

    #[test]
    fn test_defaults_validate() {
        SourcePhysicsParams::default().validate().unwrap();
        PhaseAttenuationParams::default().validate().unwrap();
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut fi = SourcePhysicsParams::default();
        fi.beta_s = 0.0;
        assert!(matches!(
            fi.validate(),
            Err(CalibrationError::InvalidParameter(_))
        ));

        let ps = PhaseAttenuationParams::default().with_q(-1.0, 0.5);
        assert!(ps.validate().is_err());
    }

    #[test]
    fn test_with_fixed_stress_is_a_copy() {
        let base = SourcePhysicsParams::default();
        let fixed = base.with_fixed_stress(5.0);
        assert_eq!(fixed.sigma, 5.0);
        assert_eq!(fixed.psi, 0.0);
        assert_eq!(base.sigma, 0.3);
        assert_eq!(base.psi, 0.25);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let ps: PhaseAttenuationParams = toml::from_str("phase = \"Pg\"\nq0 = 300.0\n").unwrap();
        assert_eq!(ps.phase, Phase::Pg);
        assert_eq!(ps.q0, 300.0);
        assert_eq!(ps.gamma0, 0.65);
    }
}
