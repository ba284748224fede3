use std::collections::BTreeMap;
use std::fmt;

use rolling_stats::Stats;
use serde::{Deserialize, Serialize};

use super::FrequencyBand;
use crate::error::{CalibrationError, Result};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Event identifier
    EventId
);
string_id!(
    /// Station identifier
    StationId
);

/// One band amplitude measured on one waveform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralObservation {
    pub band: FrequencyBand,
    pub event: EventId,
    pub station: StationId,
    /// log10 amplitude after path correction (dyne·cm)
    pub path_corrected_amplitude: f64,
    /// log10 raw coda amplitude at the start of the measurement window
    pub raw_amplitude_at_start: f64,
    /// log10 raw coda amplitude at the measurement time
    pub raw_amplitude_at_measurement: f64,
}

impl SpectralObservation {
    pub fn new(
        band: FrequencyBand,
        event: impl Into<EventId>,
        station: impl Into<StationId>,
        path_corrected_amplitude: f64,
    ) -> Self {
        Self {
            band,
            event: event.into(),
            station: station.into(),
            path_corrected_amplitude,
            raw_amplitude_at_start: path_corrected_amplitude,
            raw_amplitude_at_measurement: path_corrected_amplitude,
        }
    }

    pub fn with_raw_amplitudes(mut self, at_start: f64, at_measurement: f64) -> Self {
        self.raw_amplitude_at_start = at_start;
        self.raw_amplitude_at_measurement = at_measurement;
        self
    }
}

/// Observations grouped by band.
pub type SpectraByBand = BTreeMap<FrequencyBand, Vec<SpectralObservation>>;

/// Group a flat list of observations by band.
pub fn group_by_band(observations: impl IntoIterator<Item = SpectralObservation>) -> SpectraByBand {
    let mut grouped = SpectraByBand::new();
    for obs in observations {
        grouped.entry(obs.band).or_default().push(obs);
    }
    grouped
}

/// Independently known magnitude for a calibration anchor event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMw {
    pub event: EventId,
    pub mw: f64,
    /// Stress drop in MPa, used in place of the catalog stress when present
    pub stress_drop_mpa: Option<f64>,
}

impl ReferenceMw {
    pub fn new(event: impl Into<EventId>, mw: f64) -> Self {
        Self {
            event: event.into(),
            mw,
            stress_drop_mpa: None,
        }
    }

    pub fn with_stress_drop(mut self, stress_drop_mpa: f64) -> Self {
        self.stress_drop_mpa = Some(stress_drop_mpa);
        self
    }

    /// Stress drop if one was supplied and is usable.
    pub fn usable_stress_drop(&self) -> Option<f64> {
        self.stress_drop_mpa.filter(|s| s.is_finite() && *s > 0.0)
    }
}

/// Summary of the amplitudes measured for one event in one band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandMeasurement {
    /// Mean log10 amplitude (dyne·cm)
    pub mean: f64,
    /// Sample standard deviation of the log amplitudes
    pub std_dev: f64,
    /// Number of amplitudes averaged
    pub count: usize,
}

impl BandMeasurement {
    /// A single amplitude with no spread information.
    pub fn single(value: f64) -> Self {
        Self {
            mean: value,
            std_dev: 0.0,
            count: 1,
        }
    }

    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Result<Self> {
        let mut stats: Stats<f64> = Stats::new();
        for value in values {
            if !value.is_finite() {
                return Err(CalibrationError::InvalidParameter(format!(
                    "non-finite amplitude {}",
                    value
                )));
            }
            stats.update(value);
        }
        if stats.count == 0 {
            return Err(CalibrationError::InsufficientData {
                needed: 1,
                available: 0,
            });
        }
        Ok(Self::from_stats(&stats))
    }

    pub fn from_stats(stats: &Stats<f64>) -> Self {
        let std_dev = if stats.count > 1 { stats.std_dev } else { 0.0 };
        Self {
            mean: stats.mean,
            std_dev,
            count: stats.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_order_and_display() {
        let a = EventId::from("1234");
        let b = EventId::new(String::from("2345"));
        assert!(a < b);
        assert_eq!(a.to_string(), "1234");
        assert_eq!(StationId::from("TEST").as_str(), "TEST");
    }

    #[test]
    fn test_group_by_band() {
        let b1 = FrequencyBand::new(1.0, 2.0).unwrap();
        let b2 = FrequencyBand::new(0.5, 0.7).unwrap();
        let grouped = group_by_band(vec![
            SpectralObservation::new(b1, "e1", "s1", 20.0),
            SpectralObservation::new(b2, "e1", "s1", 21.0),
            SpectralObservation::new(b1, "e2", "s1", 19.0),
        ]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&b1].len(), 2);
        assert_eq!(*grouped.keys().next().unwrap(), b2);
    }

    #[test]
    fn test_band_measurement_from_values() {
        let m = BandMeasurement::from_values([20.0, 21.0, 22.0]).unwrap();
        assert_eq!(m.count, 3);
        assert!((m.mean - 21.0).abs() < 1e-12);
        assert!(m.std_dev > 0.0);

        let single = BandMeasurement::from_values([20.0]).unwrap();
        assert_eq!(single.std_dev, 0.0);
        assert_eq!(single, BandMeasurement::single(20.0));
    }

    #[test]
    fn test_band_measurement_rejects_bad_input() {
        assert!(matches!(
            BandMeasurement::from_values(std::iter::empty()),
            Err(CalibrationError::InsufficientData { .. })
        ));
        assert!(BandMeasurement::from_values([1.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_reference_stress_drop() {
        let r = ReferenceMw::new("e1", 5.0);
        assert_eq!(r.usable_stress_drop(), None);
        assert_eq!(r.clone().with_stress_drop(2.0).usable_stress_drop(), Some(2.0));
        assert_eq!(r.with_stress_drop(0.0).usable_stress_drop(), None);
    }
}
