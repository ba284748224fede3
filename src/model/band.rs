use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};

/// A measurement band `[low, high]` in Hz.
///
/// Bands are the sort and grouping key for every band-keyed map in the
/// engine. Ordering is by low frequency, then high frequency; equality is
/// bitwise on both bounds, so `Ord` and `Eq` agree.
///
/// # Example
/// ```
/// use codacal::model::FrequencyBand;
///
/// let a = FrequencyBand::new(1.0, 1.5).unwrap();
/// let b = FrequencyBand::new(1.0, 2.0).unwrap();
/// assert!(a < b);
/// assert_eq!(a.center(), 1.25);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "RawBand", into = "RawBand")]
pub struct FrequencyBand {
    low: f64,
    high: f64,
}

impl FrequencyBand {
    pub fn new(low: f64, high: f64) -> Result<Self> {
        if !low.is_finite() || !high.is_finite() {
            return Err(CalibrationError::InvalidParameter(format!(
                "band bounds must be finite: [{}, {}]",
                low, high
            )));
        }
        if low <= 0.0 {
            return Err(CalibrationError::InvalidParameter(format!(
                "band low frequency must be positive: {}",
                low
            )));
        }
        if low >= high {
            return Err(CalibrationError::InvalidParameter(format!(
                "degenerate band: low {} >= high {}",
                low, high
            )));
        }
        Ok(Self { low, high })
    }

    pub fn low_frequency(&self) -> f64 {
        self.low
    }

    pub fn high_frequency(&self) -> f64 {
        self.high
    }

    /// Arithmetic center, the frequency at which band amplitudes are evaluated.
    pub fn center(&self) -> f64 {
        self.low + (self.high - self.low) / 2.0
    }

    /// Geometric center, used by path corrections.
    pub fn geometric_center(&self) -> f64 {
        (self.low * self.high).sqrt()
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

impl PartialEq for FrequencyBand {
    fn eq(&self, other: &Self) -> bool {
        self.low.to_bits() == other.low.to_bits() && self.high.to_bits() == other.high.to_bits()
    }
}

impl Eq for FrequencyBand {}

impl Hash for FrequencyBand {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.low.to_bits().hash(state);
        self.high.to_bits().hash(state);
    }
}

impl Ord for FrequencyBand {
    fn cmp(&self, other: &Self) -> Ordering {
        self.low
            .total_cmp(&other.low)
            .then_with(|| self.high.total_cmp(&other.high))
    }
}

impl PartialOrd for FrequencyBand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FrequencyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}Hz", self.low, self.high)
    }
}

#[derive(Serialize, Deserialize)]
struct RawBand {
    low: f64,
    high: f64,
}

impl TryFrom<RawBand> for FrequencyBand {
    type Error = CalibrationError;

    fn try_from(raw: RawBand) -> Result<Self> {
        Self::new(raw.low, raw.high)
    }
}

impl From<FrequencyBand> for RawBand {
    fn from(band: FrequencyBand) -> Self {
        Self {
            low: band.low,
            high: band.high,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn band(low: f64, high: f64) -> FrequencyBand {
        FrequencyBand::new(low, high).unwrap()
    }

    #[test]
    fn test_rejects_degenerate_bands() {
        assert!(FrequencyBand::new(0.0, 1.0).is_err());
        assert!(FrequencyBand::new(-1.0, 1.0).is_err());
        assert!(FrequencyBand::new(2.0, 2.0).is_err());
        assert!(FrequencyBand::new(3.0, 2.0).is_err());
        assert!(FrequencyBand::new(f64::NAN, 2.0).is_err());
        assert!(FrequencyBand::new(1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_ordering_low_then_high() {
        assert!(band(1.0, 2.0) < band(1.5, 1.7));
        assert!(band(1.0, 1.5) < band(1.0, 2.0));
        assert_eq!(band(1.0, 2.0).cmp(&band(1.0, 2.0)), Ordering::Equal);
    }

    #[test]
    fn test_centers() {
        let b = band(2.0, 8.0);
        assert_eq!(b.center(), 5.0);
        assert_eq!(b.geometric_center(), 4.0);
        assert_eq!(b.width(), 6.0);
    }

    #[test]
    fn test_map_independent_of_insertion_order() {
        let bands = [band(3.0, 4.0), band(0.5, 0.7), band(1.0, 2.0), band(1.0, 1.5)];
        let forward: BTreeMap<_, _> = bands.iter().enumerate().map(|(i, b)| (*b, i)).collect();
        let reverse: BTreeMap<_, _> = bands
            .iter()
            .enumerate()
            .rev()
            .map(|(i, b)| (*b, i))
            .collect();
        assert_eq!(forward, reverse);
        let keys: Vec<_> = forward.keys().copied().collect();
        assert_eq!(
            keys,
            vec![band(0.5, 0.7), band(1.0, 1.5), band(1.0, 2.0), band(3.0, 4.0)]
        );
    }

    #[test]
    fn test_serde_validates() {
        let parsed: FrequencyBand = serde_json::from_str(r#"{"low":1.0,"high":2.0}"#).unwrap();
        assert_eq!(parsed, band(1.0, 2.0));
        assert!(serde_json::from_str::<FrequencyBand>(r#"{"low":2.0,"high":1.0}"#).is_err());
    }
}
