//! End-to-end calibration pass: site terms, site-corrected event spectra,
//! then per-event source fits and energy.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::batch::{CancellationToken, run_batch};
use crate::config::CalibrationConfig;
use crate::energy::{EnergyInfo, EnergyIntegrator};
use crate::error::{CalibrationError, Result};
use crate::fitting::{FitResult, SpectralFitter, WeightingScheme};
use crate::model::{
    BandMeasurement, EventId, FrequencyBand, PhaseAttenuationParams, ReferenceMw,
    SourcePhysicsParams, SpectraByBand,
};
use crate::site::{SiteTermSolver, SiteTerms};
use crate::source::MdacSourceModel;

/// Site-corrected band measurements of each event, or why they could not
/// be summarised.
pub type EventSpectra = BTreeMap<EventId, Result<BTreeMap<FrequencyBand, BandMeasurement>>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventCalibration {
    pub fit: FitResult,
    pub energy: EnergyInfo,
}

#[derive(Debug)]
pub struct CalibrationReport {
    pub site_terms: SiteTerms,
    /// Bands left out of the event fits because their site terms failed
    pub failed_bands: BTreeMap<FrequencyBand, CalibrationError>,
    /// Per-event outcome; failures stay local to their event
    pub events: BTreeMap<EventId, Result<EventCalibration>>,
    /// Events not started before cancellation
    pub pending: Vec<EventId>,
    pub cancelled: bool,
}

impl CalibrationReport {
    pub fn successes(&self) -> impl Iterator<Item = (&EventId, &EventCalibration)> {
        self.events
            .iter()
            .filter_map(|(id, r)| r.as_ref().ok().map(|c| (id, c)))
    }

    pub fn failure_count(&self) -> usize {
        self.events.values().filter(|r| r.is_err()).count()
    }
}

pub struct CalibrationPipeline {
    config: CalibrationConfig,
    model: MdacSourceModel,
    fitter: SpectralFitter,
    solver: SiteTermSolver,
    energy: EnergyIntegrator,
}

impl CalibrationPipeline {
    pub fn new(
        config: &CalibrationConfig,
        source: &SourcePhysicsParams,
        path: &PhaseAttenuationParams,
    ) -> Result<Self> {
        config.validate()?;
        let model = MdacSourceModel::new(source, path)?;
        Ok(Self {
            config: config.clone(),
            model,
            fitter: SpectralFitter::new(&config.fit)?,
            solver: SiteTermSolver::new(&config.site)?
                .with_workers(config.batch.worker_count()),
            energy: EnergyIntegrator::from_model(model, &config.energy),
        })
    }

    pub fn model(&self) -> &MdacSourceModel {
        &self.model
    }

    /// Reference events with a known stress drop use the reference
    /// weighting; every other event uses the configured scheme.
    pub fn weighting_for(
        &self,
        event: &EventId,
        references: &BTreeMap<EventId, ReferenceMw>,
    ) -> &WeightingScheme {
        match references.get(event).and_then(ReferenceMw::usable_stress_drop) {
            Some(_) => &self.config.fit.reference_weighting,
            None => &self.config.fit.weighting,
        }
    }

    /// Failures stay with their band or event; the report carries whatever
    /// could be calibrated.
    pub fn run(
        &self,
        spectra: &SpectraByBand,
        references: &BTreeMap<EventId, ReferenceMw>,
        cancel: &CancellationToken,
    ) -> CalibrationReport {
        let bands: BTreeSet<FrequencyBand> = spectra.keys().copied().collect();
        let solution = self.solver.solve(spectra, &self.model, references, &bands);
        let event_spectra = apply_site_terms(spectra, &solution.terms);
        log::info!(
            "Fitting {} events over {} bands ({} phase)",
            event_spectra.len(),
            bands.len(),
            self.model.phase()
        );

        let outcome = run_batch(
            event_spectra.into_iter().collect(),
            self.config.batch.worker_count(),
            cancel,
            |event, measurements| {
                let measurements = measurements?;
                let weighting = self.weighting_for(event, references);
                let fit = self
                    .fitter
                    .fit_with_model(event, &measurements, &self.model, weighting)?;
                let amplitudes: BTreeMap<FrequencyBand, f64> = measurements
                    .iter()
                    .filter(|(_, m)| m.mean > 0.0)
                    .map(|(band, m)| (*band, m.mean))
                    .collect();
                let energy = self
                    .energy
                    .total_energy(&amplitudes, fit.mw, fit.apparent_stress)?;
                Ok(EventCalibration { fit, energy })
            },
        );

        let report = CalibrationReport {
            site_terms: solution.terms,
            failed_bands: solution.failed_bands,
            events: outcome.results,
            pending: outcome.pending,
            cancelled: outcome.cancelled,
        };
        log::info!(
            "Calibrated {} events, {} failed, {} pending",
            report.events.len() - report.failure_count(),
            report.failure_count(),
            report.pending.len()
        );
        report
    }
}

/// Add each station's site term to its path-corrected amplitudes and
/// summarise them per event and band. Observations from stations without a
/// constrained term are left out.
pub fn apply_site_terms(spectra: &SpectraByBand, site_terms: &SiteTerms) -> EventSpectra {
    let mut corrected: BTreeMap<EventId, BTreeMap<FrequencyBand, Vec<f64>>> = BTreeMap::new();
    for (band, observations) in spectra {
        let terms = site_terms.get(band);
        for obs in observations {
            let entry = corrected.entry(obs.event.clone()).or_default();
            let term = terms
                .and_then(|t| t.get(&obs.station))
                .filter(|t| t.confidence.is_constrained());
            if let Some(term) = term {
                entry
                    .entry(*band)
                    .or_default()
                    .push(obs.path_corrected_amplitude + term.value);
            }
        }
    }

    corrected
        .into_iter()
        .map(|(event, bands)| {
            let measurements: Result<BTreeMap<_, _>> = bands
                .into_iter()
                .map(|(band, values)| BandMeasurement::from_values(values).map(|m| (band, m)))
                .collect();
            (event, measurements)
        })
        .collect()
}
