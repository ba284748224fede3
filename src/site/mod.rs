//! Per-station, per-band additive corrections anchored on reference events.

mod graph;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::batch::{CancellationToken, run_batch};
use crate::config::SiteConfig;
use crate::error::{CalibrationError, Result, ensure_finite};
use crate::model::{
    EventId, FrequencyBand, Phase, PhaseAttenuationParams, ReferenceMw, SourcePhysicsParams,
    SpectraByBand, SpectralObservation, StationId,
};
use crate::source::{MdacSourceModel, SourceSpectrum};

use graph::BandGraph;

/// How a site term was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SiteTermConfidence {
    /// Station recorded at least one reference event
    Anchored,
    /// Derived through shared non-reference events, `hops` stations away
    /// from the nearest anchored station
    Propagated { hops: usize },
    /// No path to any reference event; the value is a placeholder
    Unconstrained,
}

impl SiteTermConfidence {
    pub fn is_constrained(&self) -> bool {
        !matches!(self, Self::Unconstrained)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteTerm {
    pub band: FrequencyBand,
    pub station: StationId,
    /// Added to a path-corrected amplitude to give source amplitude
    pub value: f64,
    pub confidence: SiteTermConfidence,
    /// Events the value was derived from
    pub support: usize,
}

pub type SiteTerms = BTreeMap<FrequencyBand, BTreeMap<StationId, SiteTerm>>;

/// Output of [`SiteTermSolver::solve`]. A band whose own observations are
/// unusable fails alone; every other band still gets its terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteSolution {
    pub terms: SiteTerms,
    pub failed_bands: BTreeMap<FrequencyBand, CalibrationError>,
}

impl SiteSolution {
    pub fn is_complete(&self) -> bool {
        self.failed_bands.is_empty()
    }
}

pub struct SiteTermSolver {
    config: SiteConfig,
    workers: usize,
}

impl SiteTermSolver {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            workers: 1,
        })
    }

    /// Solve bands on up to `workers` threads.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Site terms for the MDAC model of `phase`.
    pub fn solve_mdac(
        &self,
        spectra: &SpectraByBand,
        source: &SourcePhysicsParams,
        path_by_phase: &BTreeMap<Phase, PhaseAttenuationParams>,
        references: &BTreeMap<EventId, ReferenceMw>,
        requested_bands: &BTreeSet<FrequencyBand>,
        phase: Phase,
    ) -> Result<SiteSolution> {
        let path = path_by_phase.get(&phase).ok_or_else(|| {
            CalibrationError::InvalidParameter(format!(
                "no attenuation parameters for phase {}",
                phase
            ))
        })?;
        let path = PhaseAttenuationParams { phase, ..*path };
        let model = MdacSourceModel::new(source, &path)?;
        Ok(self.solve(spectra, &model, references, requested_bands))
    }

    /// Site terms for every requested band and every station seen in
    /// `spectra`. Stations without a path to a reference event get the
    /// configured placeholder value and [`SiteTermConfidence::Unconstrained`].
    /// Bands that fail are reported in [`SiteSolution::failed_bands`].
    pub fn solve<S>(
        &self,
        spectra: &SpectraByBand,
        model: &S,
        references: &BTreeMap<EventId, ReferenceMw>,
        requested_bands: &BTreeSet<FrequencyBand>,
    ) -> SiteSolution
    where
        S: SourceSpectrum + ?Sized,
    {
        let stations: BTreeSet<StationId> = spectra
            .values()
            .flatten()
            .map(|obs| obs.station.clone())
            .collect();
        log::info!(
            "Solving site terms for {} bands, {} stations, {} reference events",
            requested_bands.len(),
            stations.len(),
            references.len()
        );

        let empty: Vec<SpectralObservation> = Vec::new();
        let jobs: Vec<(FrequencyBand, &[SpectralObservation])> = requested_bands
            .iter()
            .map(|band| (*band, spectra.get(band).unwrap_or(&empty).as_slice()))
            .collect();

        let outcome = run_batch(
            jobs,
            self.workers,
            &CancellationToken::new(),
            |band, observations| self.solve_band(*band, observations, model, references, &stations),
        );

        let mut solution = SiteSolution::default();
        for (band, result) in outcome.results {
            match result {
                Ok(terms) => {
                    solution.terms.insert(band, terms);
                }
                Err(e) => {
                    log::warn!("Band {}: site terms not solved: {}", band, e);
                    solution.failed_bands.insert(band, e);
                }
            }
        }
        solution
    }

    /// Site terms for one band. `stations` lists every station that must
    /// appear in the result.
    pub fn solve_band<S>(
        &self,
        band: FrequencyBand,
        observations: &[SpectralObservation],
        model: &S,
        references: &BTreeMap<EventId, ReferenceMw>,
        stations: &BTreeSet<StationId>,
    ) -> Result<BTreeMap<StationId, SiteTerm>>
    where
        S: SourceSpectrum + ?Sized,
    {
        validate_observations(band, observations)?;
        let graph = BandGraph::new(observations);

        let mut anchors = BTreeMap::new();
        for event in graph.events() {
            let Some(reference) = references.get(event) else {
                continue;
            };
            match predicted_amplitude(band, reference, model) {
                Ok(predicted) => {
                    anchors.insert(event.clone(), predicted);
                }
                Err(e) => log::warn!("Band {}: reference event {} skipped: {}", band, event, e),
            }
        }

        let resolved = graph.propagate(&anchors, self.config.max_hops);
        let mut unconstrained = 0;
        let terms: BTreeMap<StationId, SiteTerm> = stations
            .iter()
            .map(|station| {
                let term = match resolved.get(station) {
                    Some(t) => SiteTerm {
                        band,
                        station: station.clone(),
                        value: t.value,
                        confidence: t.confidence,
                        support: t.support,
                    },
                    None => {
                        unconstrained += 1;
                        SiteTerm {
                            band,
                            station: station.clone(),
                            value: self.config.unconstrained_value,
                            confidence: SiteTermConfidence::Unconstrained,
                            support: 0,
                        }
                    }
                };
                (station.clone(), term)
            })
            .collect();

        if unconstrained > 0 {
            log::warn!(
                "Band {}: {} of {} stations have no path to a reference event",
                band,
                unconstrained,
                stations.len()
            );
        }
        log::debug!(
            "Band {}: {} anchor events, {} constrained stations",
            band,
            anchors.len(),
            resolved.len()
        );

        Ok(terms)
    }
}

/// Model amplitude of a reference event at the band center.
fn predicted_amplitude<S>(band: FrequencyBand, reference: &ReferenceMw, model: &S) -> Result<f64>
where
    S: SourceSpectrum + ?Sized,
{
    if !reference.mw.is_finite() {
        return Err(CalibrationError::InvalidParameter(format!(
            "reference Mw {} is not finite",
            reference.mw
        )));
    }
    let stress = reference
        .usable_stress_drop()
        .unwrap_or_else(|| model.catalog_apparent_stress(reference.mw));
    let predicted = model.log_amplitude(band.center(), reference.mw, stress)?;
    ensure_finite(predicted, "reference amplitude")
}

fn validate_observations(band: FrequencyBand, observations: &[SpectralObservation]) -> Result<()> {
    for obs in observations {
        if obs.band != band {
            return Err(CalibrationError::InvalidParameter(format!(
                "observation for band {} filed under {}",
                obs.band, band
            )));
        }
        if !obs.path_corrected_amplitude.is_finite() {
            return Err(CalibrationError::InvalidParameter(format!(
                "non-finite amplitude for event {} at station {} in band {}",
                obs.event, obs.station, band
            )));
        }
    }
    Ok(())
}
