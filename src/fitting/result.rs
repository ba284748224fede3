use serde::Serialize;

use crate::model::EventId;

/// Positions of each value in [`FitResult::to_vector`].
///
/// Downstream consumers address the vector by these indices; the order is
/// fixed.
pub mod index {
    pub const LOG10_M0: usize = 0;
    pub const MW_FIT: usize = 1;
    pub const DATA_COUNT: usize = 2;
    pub const RMS_FIT: usize = 3;
    pub const APP_STRESS: usize = 4;
    pub const MW_MEAN: usize = 5;
    pub const MW_1_MIN: usize = 6;
    pub const MW_1_MAX: usize = 7;
    pub const MW_2_MIN: usize = 8;
    pub const MW_2_MAX: usize = 9;
    pub const APP_STRESS_MEAN: usize = 10;
    pub const FIT_MEAN: usize = 11;
    pub const MW_SD: usize = 12;
    pub const APP_STRESS_SD: usize = 13;
    pub const FIT_SD: usize = 14;
    pub const APP_1_MIN: usize = 15;
    pub const APP_1_MAX: usize = 16;
    pub const APP_2_MIN: usize = 17;
    pub const APP_2_MAX: usize = 18;
    pub const CORNER_FREQ: usize = 19;
    pub const CORNER_FREQ_SD: usize = 20;
    pub const ITR_COUNT: usize = 21;
    pub const MDAC_ENERGY: usize = 22;
    /// Length of the result vector
    pub const LEN: usize = 23;
}

/// Closed interval of parameter values whose misfit stays under a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn point(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Best-fit source parameters for one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    pub event: EventId,
    /// log10 seismic moment in dyne·cm
    pub log10_m0: f64,
    pub mw: f64,
    /// Amplitudes behind the fit, summed over the used bands
    pub data_count: usize,
    /// Weighted RMS log-amplitude misfit at the optimum
    pub rms_misfit: f64,
    /// Apparent stress at the optimum (MPa)
    pub apparent_stress: f64,
    pub mw_mean: f64,
    pub mw_sd: f64,
    pub mw_one_sigma: Bounds,
    pub mw_two_sigma: Bounds,
    pub apparent_stress_mean: f64,
    pub apparent_stress_sd: f64,
    pub apparent_stress_one_sigma: Bounds,
    pub apparent_stress_two_sigma: Bounds,
    pub misfit_mean: f64,
    pub misfit_sd: f64,
    /// Corner frequency at the optimum (Hz)
    pub corner_frequency: f64,
    pub corner_frequency_sd: f64,
    pub iterations: usize,
    /// Closed-form radiated energy at the optimum, log10 joules
    pub log_energy_mdac: f64,
    /// False when the optimizer stopped on its budget
    pub converged: bool,
}

impl FitResult {
    /// The fixed-order numeric vector, see [`index`].
    pub fn to_vector(&self) -> [f64; index::LEN] {
        let mut v = [0.0; index::LEN];
        v[index::LOG10_M0] = self.log10_m0;
        v[index::MW_FIT] = self.mw;
        v[index::DATA_COUNT] = self.data_count as f64;
        v[index::RMS_FIT] = self.rms_misfit;
        v[index::APP_STRESS] = self.apparent_stress;
        v[index::MW_MEAN] = self.mw_mean;
        v[index::MW_1_MIN] = self.mw_one_sigma.min;
        v[index::MW_1_MAX] = self.mw_one_sigma.max;
        v[index::MW_2_MIN] = self.mw_two_sigma.min;
        v[index::MW_2_MAX] = self.mw_two_sigma.max;
        v[index::APP_STRESS_MEAN] = self.apparent_stress_mean;
        v[index::FIT_MEAN] = self.misfit_mean;
        v[index::MW_SD] = self.mw_sd;
        v[index::APP_STRESS_SD] = self.apparent_stress_sd;
        v[index::FIT_SD] = self.misfit_sd;
        v[index::APP_1_MIN] = self.apparent_stress_one_sigma.min;
        v[index::APP_1_MAX] = self.apparent_stress_one_sigma.max;
        v[index::APP_2_MIN] = self.apparent_stress_two_sigma.min;
        v[index::APP_2_MAX] = self.apparent_stress_two_sigma.max;
        v[index::CORNER_FREQ] = self.corner_frequency;
        v[index::CORNER_FREQ_SD] = self.corner_frequency_sd;
        v[index::ITR_COUNT] = self.iterations as f64;
        v[index::MDAC_ENERGY] = self.log_energy_mdac;
        v
    }
}
