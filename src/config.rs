//! Configuration for a calibration run.
//!
//! Every section has sensible defaults; a TOML document only needs the
//! values it changes:
//!
//! ```toml
//! [fit]
//! iteration_budget = 100
//!
//! [fit.weighting]
//! scheme = "uniform"
//!
//! [batch]
//! workers = 4
//! ```

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};
use crate::fitting::{LmSettings, WeightingScheme};

/// Complete engine configuration
///
/// # Example
/// ```
/// use codacal::config::CalibrationConfig;
///
/// let config = CalibrationConfig::from_toml_str("[fit]\niteration_budget = 50\n").unwrap();
/// assert_eq!(config.fit.iteration_budget, 50);
/// assert_eq!(config.fit.min_bands, 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Spectral fitting
    pub fit: FitConfig,
    /// Energy integration
    pub energy: EnergyConfig,
    /// Site-term network inversion
    pub site: SiteConfig,
    /// Worker pool
    pub batch: BatchConfig,
}

impl CalibrationConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| CalibrationError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.fit.validate()?;
        self.site.validate()
    }
}

/// Spectral fit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Maximum optimizer iterations per starting point
    pub iteration_budget: usize,
    /// Relative misfit change below which the optimizer stops
    pub convergence_tolerance: f64,
    /// Fewest bands with signal an event needs to be fitted
    pub min_bands: usize,
    /// Lower Mw bound
    pub mw_min: f64,
    /// Upper Mw bound
    pub mw_max: f64,
    /// Lower apparent stress bound (MPa)
    pub stress_min_mpa: f64,
    /// Upper apparent stress bound (MPa)
    pub stress_max_mpa: f64,
    /// Starting log10 apparent stresses; the best resulting fit wins
    pub stress_seeds_log10: Vec<f64>,
    /// Band weighting scheme
    pub weighting: WeightingScheme,
    /// Band weighting for reference events with a known stress drop
    pub reference_weighting: WeightingScheme,
    /// Search a grid over the bounds when no start converges
    pub grid_fallback: bool,
    /// Grid resolution per parameter for the fallback search
    pub grid_steps: usize,
    /// Resolution per parameter of the grid sampled around the optimum for
    /// uncertainty bounds (0 disables it)
    pub uncertainty_grid_steps: usize,
    /// Half-width in Mw of the uncertainty grid
    pub uncertainty_mw_half_width: f64,
    /// Half-width in log10 stress of the uncertainty grid
    pub uncertainty_log_stress_half_width: f64,
}

impl FitConfig {
    pub fn lm_settings(&self) -> LmSettings {
        LmSettings {
            max_iterations: self.iteration_budget,
            tolerance: self.convergence_tolerance,
            lower: [self.mw_min, self.stress_min_mpa.log10()],
            upper: [self.mw_max, self.stress_max_mpa.log10()],
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.iteration_budget == 0 {
            return Err(CalibrationError::Config(
                "iteration_budget must be at least 1".to_string(),
            ));
        }
        if !(self.convergence_tolerance.is_finite() && self.convergence_tolerance > 0.0) {
            return Err(CalibrationError::Config(format!(
                "convergence_tolerance must be positive, got {}",
                self.convergence_tolerance
            )));
        }
        if self.min_bands == 0 {
            return Err(CalibrationError::Config(
                "min_bands must be at least 1".to_string(),
            ));
        }
        if !(self.mw_min.is_finite() && self.mw_max.is_finite() && self.mw_min < self.mw_max) {
            return Err(CalibrationError::Config(format!(
                "invalid Mw bounds [{}, {}]",
                self.mw_min, self.mw_max
            )));
        }
        if !(self.stress_min_mpa > 0.0
            && self.stress_max_mpa.is_finite()
            && self.stress_min_mpa < self.stress_max_mpa)
        {
            return Err(CalibrationError::Config(format!(
                "invalid stress bounds [{}, {}] MPa",
                self.stress_min_mpa, self.stress_max_mpa
            )));
        }
        if self.stress_seeds_log10.is_empty()
            || self.stress_seeds_log10.iter().any(|s| !s.is_finite())
        {
            return Err(CalibrationError::Config(
                "stress_seeds_log10 must hold at least one finite value".to_string(),
            ));
        }
        if self.grid_fallback && self.grid_steps < 2 {
            return Err(CalibrationError::Config(
                "grid_steps must be at least 2".to_string(),
            ));
        }
        if self.uncertainty_grid_steps == 1 {
            return Err(CalibrationError::Config(
                "uncertainty_grid_steps must be 0 or at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            iteration_budget: 200,
            convergence_tolerance: 1e-10,
            min_bands: 2,
            mw_min: 0.01,
            mw_max: 10.0,
            stress_min_mpa: 0.001,
            stress_max_mpa: 100.0,
            stress_seeds_log10: vec![-1.0, 0.0, 1.0],
            weighting: WeightingScheme::default(),
            reference_weighting: WeightingScheme::Uniform,
            grid_fallback: true,
            grid_steps: 100,
            uncertainty_grid_steps: 21,
            uncertainty_mw_half_width: 0.5,
            uncertainty_log_stress_half_width: 1.0,
        }
    }
}

/// Energy integration configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Extend the integral past the measured bands with the fitted model
    pub extrapolate_tails: bool,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            extrapolate_tails: true,
        }
    }
}

/// Site-term solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Limit on event-station hops away from an anchored station
    /// (`None` = follow every connected station)
    pub max_hops: Option<usize>,
    /// Value given to stations no anchored event can reach
    pub unconstrained_value: f64,
}

impl SiteConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.unconstrained_value.is_finite() {
            return Err(CalibrationError::Config(
                "unconstrained_value must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            max_hops: None,
            unconstrained_value: 0.0,
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads (0 = one per available core)
    pub workers: usize,
}

impl BatchConfig {
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        CalibrationConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = CalibrationConfig::from_toml_str(
            "[fit]\nconvergence_tolerance = 1e-6\n\n[fit.weighting]\nscheme = \"uniform\"\n\n[site]\nmax_hops = 2\n",
        )
        .unwrap();
        assert_eq!(config.fit.convergence_tolerance, 1e-6);
        assert_eq!(config.fit.weighting, WeightingScheme::Uniform);
        assert_eq!(config.fit.reference_weighting, WeightingScheme::Uniform);
        assert_eq!(config.fit.iteration_budget, 200);
        assert_eq!(config.site.max_hops, Some(2));
        assert!(config.energy.extrapolate_tails);
    }

    #[test]
    fn test_invalid_toml_values() {
        assert!(matches!(
            CalibrationConfig::from_toml_str("[fit]\nmw_min = 5.0\nmw_max = 1.0\n"),
            Err(CalibrationError::Config(_))
        ));
        assert!(CalibrationConfig::from_toml_str("[fit]\niteration_budget = 0\n").is_err());
        assert!(CalibrationConfig::from_toml_str("[fit]\nstress_seeds_log10 = []\n").is_err());
        assert!(CalibrationConfig::from_toml_str("[fit\n").is_err());
    }

    #[test]
    fn test_lm_settings_use_log_stress() {
        let settings = FitConfig::default().lm_settings();
        assert_eq!(settings.lower[0], 0.01);
        assert!((settings.lower[1] + 3.0).abs() < 1e-12);
        assert!((settings.upper[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(BatchConfig { workers: 3 }.worker_count(), 3);
        assert!(BatchConfig::default().worker_count() >= 1);
    }
}
