//! Band weighting for spectral fits
//!
//! Low-frequency bands anchor the moment estimate, so the default scheme
//! weights each band by its standard error and then lifts the lowest bands
//! above every other weight.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{BandMeasurement, FrequencyBand};

/// Produces a weight for every measured band.
pub trait BandWeighting: Send + Sync {
    fn weights(
        &self,
        measurements: &BTreeMap<FrequencyBand, BandMeasurement>,
    ) -> BTreeMap<FrequencyBand, f64>;
}

/// Built-in weighting schemes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum WeightingScheme {
    /// `1 + 1/(sd/sqrt(n))` per band, lowest `boosted_bands` raised to
    /// `boost` times the largest weight
    StandardError { boosted_bands: usize, boost: f64 },
    /// Every band weighs 1
    Uniform,
    /// Fixed ramp favouring the lowest bands
    LowFrequencyEmphasis,
}

impl Default for WeightingScheme {
    fn default() -> Self {
        Self::StandardError {
            boosted_bands: 2,
            boost: 2.0,
        }
    }
}

impl BandWeighting for WeightingScheme {
    fn weights(
        &self,
        measurements: &BTreeMap<FrequencyBand, BandMeasurement>,
    ) -> BTreeMap<FrequencyBand, f64> {
        match self {
            Self::StandardError {
                boosted_bands,
                boost,
            } => {
                let mut weights = measurements
                    .iter()
                    .map(|(band, m)| (*band, standard_error_weight(m)))
                    .collect();
                boost_lowest_bands(&mut weights, *boosted_bands, *boost);
                weights
            }
            Self::Uniform => measurements.keys().map(|band| (*band, 1.0)).collect(),
            Self::LowFrequencyEmphasis => measurements
                .keys()
                .enumerate()
                .map(|(i, band)| (*band, low_frequency_emphasis_weight(i)))
                .collect(),
        }
    }
}

/// Adapts a per-band closure into a [`BandWeighting`].
///
/// ```
/// use std::collections::BTreeMap;
/// use codacal::fitting::{BandWeighting, PerBand};
/// use codacal::model::{BandMeasurement, FrequencyBand};
///
/// let by_width = PerBand(|band: &FrequencyBand, _m: &BandMeasurement| band.width());
/// let mut measured = BTreeMap::new();
/// measured.insert(FrequencyBand::new(1.0, 3.0).unwrap(), BandMeasurement::single(20.0));
/// assert_eq!(by_width.weights(&measured).values().next(), Some(&2.0));
/// ```
pub struct PerBand<F>(pub F);

impl<F> BandWeighting for PerBand<F>
where
    F: Fn(&FrequencyBand, &BandMeasurement) -> f64 + Send + Sync,
{
    fn weights(
        &self,
        measurements: &BTreeMap<FrequencyBand, BandMeasurement>,
    ) -> BTreeMap<FrequencyBand, f64> {
        measurements
            .iter()
            .map(|(band, m)| (*band, (self.0)(band, m)))
            .collect()
    }
}

/// `1 + 1/(sd/sqrt(n))` when more than one amplitude was averaged and the
/// result is finite, otherwise 1.
pub fn standard_error_weight(measurement: &BandMeasurement) -> f64 {
    if measurement.count <= 1 {
        return 1.0;
    }
    let standard_error = measurement.std_dev / (measurement.count as f64).sqrt();
    let weight = 1.0 + 1.0 / standard_error;
    if weight.is_finite() { weight } else { 1.0 }
}

/// Raise the `count` lowest bands to `factor` times the largest weight.
///
/// The maximum is seeded at 1 so the boost never drops below `factor`.
pub fn boost_lowest_bands(weights: &mut BTreeMap<FrequencyBand, f64>, count: usize, factor: f64) {
    let max_weight = weights.values().copied().fold(1.0_f64, f64::max);
    for weight in weights.values_mut().take(count) {
        *weight = factor * max_weight;
    }
}

/// 0.5, 1.0, 0.5, 0.25 for the four lowest bands, 0.1 above.
pub fn low_frequency_emphasis_weight(index: usize) -> f64 {
    match index {
        0 => 0.5,
        1 => 1.0,
        2 => 0.5,
        3 => 0.25,
        _ => 0.1,
    }
}
