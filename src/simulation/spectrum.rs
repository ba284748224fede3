use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use crate::error::{CalibrationError, Result};
use crate::model::{BandMeasurement, FrequencyBand};
use crate::source::SourceSpectrum;

/// Gaussian scatter added to synthetic log amplitudes.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SpectrumNoise {
    pub seed: Option<u64>,
    /// Standard deviation in log10 units
    pub sd: f64,
    /// Amplitudes drawn per band (0 is treated as 1)
    pub per_band: usize,
}

impl SpectrumNoise {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_sd(mut self, sd: f64) -> Self {
        self.sd = sd;
        self
    }

    pub fn with_per_band(mut self, per_band: usize) -> Self {
        self.per_band = per_band;
        self
    }

    pub(crate) fn distribution(&self) -> Result<Option<Normal<f64>>> {
        if self.sd == 0.0 {
            return Ok(None);
        }
        Normal::new(0.0, self.sd)
            .map(Some)
            .map_err(|e| CalibrationError::InvalidParameter(format!("noise sd {}: {}", self.sd, e)))
    }
}

pub(crate) fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

/// `n` frequencies evenly spaced in log between `low` and `high` inclusive.
pub fn log_spaced_frequencies(low: f64, high: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![low],
        _ => {
            let (lo, hi) = (low.ln(), high.ln());
            (0..n)
                .map(|i| (lo + (hi - lo) * i as f64 / (n - 1) as f64).exp())
                .collect()
        }
    }
}

/// `n` contiguous bands tiling `[low, high]` with equal log widths.
pub fn log_spaced_bands(low: f64, high: f64, n: usize) -> Result<Vec<FrequencyBand>> {
    let edges = log_spaced_frequencies(low, high, n + 1);
    edges
        .windows(2)
        .map(|pair| FrequencyBand::new(pair[0], pair[1]))
        .collect()
}

/// `(frequency, log amplitude)` pairs straight from the model.
pub fn synthetic_samples<S>(
    model: &S,
    frequencies: &[f64],
    mw: f64,
    apparent_stress: f64,
) -> Result<Vec<(f64, f64)>>
where
    S: SourceSpectrum + ?Sized,
{
    frequencies
        .iter()
        .map(|&f| Ok((f, model.log_amplitude(f, mw, apparent_stress)?)))
        .collect()
}

/// Per-band measurements of a model event at band centers, with optional
/// scatter.
pub fn synthetic_measurements<S>(
    model: &S,
    bands: &[FrequencyBand],
    mw: f64,
    apparent_stress: f64,
    noise: &SpectrumNoise,
) -> Result<BTreeMap<FrequencyBand, BandMeasurement>>
where
    S: SourceSpectrum + ?Sized,
{
    let mut rng = create_rng(noise.seed);
    let normal = noise.distribution()?;
    let draws = noise.per_band.max(1);

    let mut measurements = BTreeMap::new();
    for band in bands {
        let clean = model.log_amplitude(band.center(), mw, apparent_stress)?;
        let values: Vec<f64> = (0..draws)
            .map(|_| match &normal {
                Some(n) => clean + n.sample(&mut rng),
                None => clean,
            })
            .collect();
        measurements.insert(*band, BandMeasurement::from_values(values)?);
    }
    Ok(measurements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PhaseAttenuationParams, SourcePhysicsParams};
    use crate::source::MdacSourceModel;

    #[test]
    fn test_log_spacing_endpoints() {
        let f = log_spaced_frequencies(0.01, 200.0, 5);
        assert_eq!(f.len(), 5);
        assert!((f[0] - 0.01).abs() < 1e-12);
        assert!((f[4] - 200.0).abs() < 1e-9);
        assert!((f[1] / f[0] - f[3] / f[2]).abs() < 1e-9);
        assert!(log_spaced_frequencies(1.0, 2.0, 0).is_empty());
    }

    #[test]
    fn test_bands_tile_range() {
        let bands = log_spaced_bands(0.02, 20.0, 8).unwrap();
        assert_eq!(bands.len(), 8);
        for pair in bands.windows(2) {
            assert_eq!(pair[0].high_frequency(), pair[1].low_frequency());
        }
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let model = MdacSourceModel::new(
            &SourcePhysicsParams::default(),
            &PhaseAttenuationParams::default(),
        )
        .unwrap();
        let bands = log_spaced_bands(0.05, 10.0, 6).unwrap();
        let noise = SpectrumNoise::default().with_seed(7).with_sd(0.1).with_per_band(5);
        let a = synthetic_measurements(&model, &bands, 4.0, 1.0, &noise).unwrap();
        let b = synthetic_measurements(&model, &bands, 4.0, 1.0, &noise).unwrap();
        assert_eq!(a, b);
        assert!(a.values().all(|m| m.count == 5 && m.std_dev > 0.0));

        let clean = synthetic_measurements(&model, &bands, 4.0, 1.0, &SpectrumNoise::default()).unwrap();
        assert!(clean.values().all(|m| m.count == 1 && m.std_dev == 0.0));
    }
}
