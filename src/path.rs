//! Distance and attenuation correction applied to raw coda amplitudes.
//!
//! Spreading follows the extended Street-Herrmann form: slope `s1` out to
//! `xcross / xtrans`, slope `s2` beyond `xcross * xtrans`, and a slope that
//! varies linearly in log distance across the transition.

use std::f64::consts::{E, PI};

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PHASE_VELOCITY_KM_S;
use crate::error::{CalibrationError, Result};
use crate::model::FrequencyBand;

/// log10 of the extended Street-Herrmann spreading at `distance` km.
pub fn log10_esh_spreading(s1: f64, s2: f64, xcross: f64, xtrans: f64, distance: f64) -> f64 {
    let xstart = xcross / xtrans;
    let xend = xcross * xtrans;

    if distance <= xstart {
        -s1 * distance.log10()
    } else if distance >= xend {
        let ds = s2 - s1;
        -s1 * xstart.log10() - (s1 + ds / 2.0) * (xend / xstart).log10() - s2 * (distance / xend).log10()
    } else {
        // only reachable with xtrans > 1
        let slope = (s2 - s1) / (xend / xstart).log10();
        let ds = slope * (distance / xstart).log10();
        -s1 * xstart.log10() - (s1 + ds / 2.0) * (distance / xstart).log10()
    }
}

/// Per-band spreading and Q used to turn raw envelope amplitudes into
/// path-corrected amplitudes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathCorrection {
    pub s1: f64,
    pub s2: f64,
    /// Crossover distance (km)
    pub xcross: f64,
    /// Transition width factor, >= 1
    pub xtrans: f64,
    pub q: f64,
    /// Phase velocity (km/s)
    pub phase_velocity: f64,
}

impl Default for PathCorrection {
    fn default() -> Self {
        Self {
            s1: 1.0,
            s2: 0.5,
            xcross: 100.0,
            xtrans: 1.0,
            q: 400.0,
            phase_velocity: DEFAULT_PHASE_VELOCITY_KM_S,
        }
    }
}

impl PathCorrection {
    pub fn validate(&self) -> Result<()> {
        if !(self.xcross.is_finite() && self.xcross > 0.0) {
            return Err(CalibrationError::InvalidParameter(format!(
                "xcross must be positive, got {}",
                self.xcross
            )));
        }
        if !(self.xtrans.is_finite() && self.xtrans >= 1.0) {
            return Err(CalibrationError::InvalidParameter(format!(
                "xtrans must be at least 1, got {}",
                self.xtrans
            )));
        }
        if !(self.q.is_finite() && self.q >= 0.0) {
            return Err(CalibrationError::InvalidParameter(format!(
                "q must be non-negative, got {}",
                self.q
            )));
        }
        if !(self.s1.is_finite() && self.s2.is_finite()) {
            return Err(CalibrationError::InvalidParameter(
                "spreading slopes must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Positive log10 correction to add to a raw amplitude measured in
    /// `band` at `distance` km. Zero when the spreading term or Q is zero.
    pub fn correction(&self, band: &FrequencyBand, distance: f64) -> f64 {
        let log10esh = log10_esh_spreading(self.s1, self.s2, self.xcross, self.xtrans, distance);
        if log10esh == 0.0 || self.q == 0.0 {
            return 0.0;
        }
        let velocity = if self.phase_velocity > 0.0 {
            self.phase_velocity
        } else {
            DEFAULT_PHASE_VELOCITY_KM_S
        };
        let f0 = band.geometric_center();
        -log10esh + distance * PI * f0 * E.log10() / (self.q * velocity)
    }

    /// Inverse of [`correction`](Self::correction): the raw amplitude that
    /// corrects to `corrected`.
    pub fn raw_amplitude(&self, band: &FrequencyBand, distance: f64, corrected: f64) -> f64 {
        corrected - self.correction(band, distance)
    }
}
