use std::collections::BTreeMap;

use rand::RngExt;
use rand_distr::Distribution;
use serde::Deserialize;

use super::spectrum::{SpectrumNoise, create_rng};
use crate::error::Result;
use crate::model::{
    EventId, FrequencyBand, ReferenceMw, SpectraByBand, SpectralObservation, StationId,
};
use crate::path::PathCorrection;
use crate::source::SourceSpectrum;

#[derive(Clone, Debug, Deserialize)]
pub struct SyntheticEvent {
    pub id: EventId,
    pub mw: f64,
    /// Apparent stress (MPa)
    pub stress: f64,
    /// Publish this event's Mw and stress as a reference
    #[serde(default)]
    pub reference: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SyntheticStation {
    pub id: StationId,
    /// True site term, identical across bands
    pub site_term: f64,
}

/// A network of events and stations with known source and site parameters.
#[derive(Clone, Debug, Deserialize)]
pub struct NetworkScenario {
    pub events: Vec<SyntheticEvent>,
    pub stations: Vec<SyntheticStation>,
    pub bands: Vec<FrequencyBand>,
    /// Explicit (event, station) recordings; every pair when absent
    #[serde(default)]
    pub recordings: Option<Vec<(EventId, StationId)>>,
    #[serde(default)]
    pub noise: SpectrumNoise,
    #[serde(default)]
    pub path: PathCorrection,
    /// Source-station distances are drawn from this range (km)
    #[serde(default = "default_distance_range")]
    pub distance_km: (f64, f64),
}

fn default_distance_range() -> (f64, f64) {
    (50.0, 1500.0)
}

/// Output of [`NetworkScenario::generate`].
#[derive(Clone, Debug)]
pub struct SyntheticNetwork {
    pub spectra: SpectraByBand,
    pub references: BTreeMap<EventId, ReferenceMw>,
    pub true_site_terms: BTreeMap<StationId, f64>,
}

impl NetworkScenario {
    /// Random network: `n_events` events with Mw in 3-6, the first
    /// `n_references` published as references, and `n_stations` stations
    /// with site terms in -1..1.
    pub fn random(
        n_events: usize,
        n_stations: usize,
        n_references: usize,
        bands: Vec<FrequencyBand>,
        seed: Option<u64>,
    ) -> Self {
        let mut rng = create_rng(seed);
        let events = (0..n_events)
            .map(|i| SyntheticEvent {
                id: EventId::new(format!("EV{:04}", i + 1)),
                mw: 3.0 + 3.0 * rng.random::<f64>(),
                stress: 10f64.powf(-0.5 + 1.5 * rng.random::<f64>()),
                reference: i < n_references,
            })
            .collect();
        let stations = (0..n_stations)
            .map(|i| SyntheticStation {
                id: StationId::new(format!("ST{:02}", i + 1)),
                site_term: 2.0 * rng.random::<f64>() - 1.0,
            })
            .collect();
        Self {
            events,
            stations,
            bands,
            recordings: None,
            noise: SpectrumNoise {
                seed: seed.map(|s| s.wrapping_add(1)),
                ..SpectrumNoise::default()
            },
            path: PathCorrection::default(),
            distance_km: default_distance_range(),
        }
    }

    pub fn with_recordings(mut self, recordings: Vec<(EventId, StationId)>) -> Self {
        self.recordings = Some(recordings);
        self
    }

    pub fn with_noise(mut self, noise: SpectrumNoise) -> Self {
        self.noise = noise;
        self
    }

    /// Observed path-corrected amplitude is the model amplitude minus the
    /// station's site term, plus noise. Raw amplitudes put the path back.
    pub fn generate<S>(&self, model: &S) -> Result<SyntheticNetwork>
    where
        S: SourceSpectrum + ?Sized,
    {
        self.path.validate()?;
        let normal = self.noise.distribution()?;
        let mut rng = create_rng(self.noise.seed);

        let events: BTreeMap<&EventId, &SyntheticEvent> =
            self.events.iter().map(|e| (&e.id, e)).collect();
        let stations: BTreeMap<&StationId, &SyntheticStation> =
            self.stations.iter().map(|s| (&s.id, s)).collect();

        let pairs: Vec<(&SyntheticEvent, &SyntheticStation)> = match &self.recordings {
            Some(list) => list
                .iter()
                .filter_map(|(e, s)| Some((*events.get(e)?, *stations.get(s)?)))
                .collect(),
            None => self
                .events
                .iter()
                .flat_map(|e| self.stations.iter().map(move |s| (e, s)))
                .collect(),
        };

        let (near, far) = self.distance_km;
        let mut spectra = SpectraByBand::new();
        for (event, station) in pairs {
            let distance = near + (far - near) * rng.random::<f64>();
            for band in &self.bands {
                let scatter = normal.as_ref().map_or(0.0, |n| n.sample(&mut rng));
                let corrected = model.log_amplitude(band.center(), event.mw, event.stress)?
                    - station.site_term
                    + scatter;
                let raw = self.path.raw_amplitude(band, distance, corrected);
                spectra.entry(*band).or_default().push(
                    SpectralObservation::new(*band, event.id.clone(), station.id.clone(), corrected)
                        .with_raw_amplitudes(raw, raw),
                );
            }
        }

        let references = self
            .events
            .iter()
            .filter(|e| e.reference)
            .map(|e| {
                (
                    e.id.clone(),
                    ReferenceMw::new(e.id.clone(), e.mw).with_stress_drop(e.stress),
                )
            })
            .collect();
        let true_site_terms = self
            .stations
            .iter()
            .map(|s| (s.id.clone(), s.site_term))
            .collect();

        log::debug!(
            "Synthetic network: {} events, {} stations, {} bands",
            self.events.len(),
            self.stations.len(),
            self.bands.len()
        );

        Ok(SyntheticNetwork {
            spectra,
            references,
            true_site_terms,
        })
    }
}
