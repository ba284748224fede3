use std::collections::BTreeMap;

use super::levenberg::{self, LmOutcome, LmSettings, Params};
use super::result::FitResult;
use super::uncertainty::{self, Sample};
use super::weights::BandWeighting;
use crate::config::FitConfig;
use crate::constants::{LOG10_M0_OFFSET, LOG10_NM_TO_DYNE_CM, MW_SLOPE};
use crate::error::{CalibrationError, Result};
use crate::model::{
    BandMeasurement, EventId, FrequencyBand, Phase, PhaseAttenuationParams, SourcePhysicsParams,
};
use crate::source::{MdacSourceModel, SourceSpectrum, mw_to_log_m0};

/// Weighted least-squares fit of (Mw, apparent stress) to band amplitudes
///
/// The search runs in `(Mw, log10 stress)` inside the configured bounds,
/// starting from each configured stress seed. When no start converges a
/// coarse grid over the bounds is searched and polished; if that also fails
/// the best point found comes back inside
/// [`CalibrationError::FitDidNotConverge`].
#[derive(Debug, Clone)]
pub struct SpectralFitter {
    config: FitConfig,
    settings: LmSettings,
}

impl SpectralFitter {
    pub fn new(config: &FitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            settings: config.lm_settings(),
        })
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Fit an event against the MDAC model of `phase`.
    pub fn fit<W: BandWeighting + ?Sized>(
        &self,
        event: &EventId,
        measurements: &BTreeMap<FrequencyBand, BandMeasurement>,
        phase: Phase,
        source: &SourcePhysicsParams,
        path: &PhaseAttenuationParams,
        weighting: &W,
    ) -> Result<FitResult> {
        let path = PhaseAttenuationParams { phase, ..*path };
        let model = MdacSourceModel::new(source, &path)?;
        self.fit_with_model(event, measurements, &model, weighting)
    }

    pub fn fit_with_model<S, W>(
        &self,
        event: &EventId,
        measurements: &BTreeMap<FrequencyBand, BandMeasurement>,
        model: &S,
        weighting: &W,
    ) -> Result<FitResult>
    where
        S: SourceSpectrum + ?Sized,
        W: BandWeighting + ?Sized,
    {
        let problem = Problem::new(measurements, model, weighting, self.config.min_bands)?;
        log::debug!(
            "Fitting event {} over {} bands ({} amplitudes)",
            event,
            problem.len(),
            problem.data_count
        );

        let mut trace: Vec<(Params, f64)> = Vec::new();
        let start_mw = self.initial_mw(&problem);
        let mut iterations = 0;
        let mut best: Option<LmOutcome> = None;

        for &seed in &self.config.stress_seeds_log10 {
            let outcome = levenberg::minimize(
                |p, r| problem.residuals(p, r),
                problem.len(),
                [start_mw, seed],
                &self.settings,
                |p, c| trace.push((*p, c)),
            )?;
            iterations += outcome.iterations;
            best = Some(pick_better(best, outcome));
        }

        let mut outcome = best.ok_or_else(|| {
            CalibrationError::Config("no stress seeds configured".to_string())
        })?;

        if !outcome.converged && self.config.grid_fallback {
            log::warn!(
                "Fit for event {} did not converge after {} iterations, falling back to a grid search",
                event,
                iterations
            );
            let (grid_best, grid_cost) = self.grid_search(&problem, &mut trace)?;
            iterations += self.config.grid_steps * self.config.grid_steps;
            let polished = levenberg::minimize(
                |p, r| problem.residuals(p, r),
                problem.len(),
                grid_best,
                &self.settings,
                |p, c| trace.push((*p, c)),
            )?;
            iterations += polished.iterations;
            outcome = if polished.converged || polished.cost <= outcome.cost {
                polished
            } else if grid_cost < outcome.cost {
                LmOutcome {
                    params: grid_best,
                    cost: grid_cost,
                    iterations: 0,
                    converged: false,
                }
            } else {
                outcome
            };
        }

        self.sample_neighbourhood(&problem, &outcome.params, &mut trace)?;
        let result = self.build_result(event, &problem, model, &outcome, iterations, &trace)?;

        if outcome.converged {
            log::debug!(
                "Event {}: Mw {:.3}, stress {:.3} MPa, misfit {:.4} ({} iterations)",
                event,
                result.mw,
                result.apparent_stress,
                result.rms_misfit,
                iterations
            );
            Ok(result)
        } else {
            Err(CalibrationError::FitDidNotConverge {
                iterations,
                partial: Box::new(result),
            })
        }
    }

    /// Mw implied by the lowest band if it sat on the flat part of the spectrum.
    fn initial_mw<S: SourceSpectrum + ?Sized>(&self, problem: &Problem<'_, S>) -> f64 {
        let lowest = problem.observed[0];
        let mw = (lowest - LOG10_NM_TO_DYNE_CM - LOG10_M0_OFFSET) / MW_SLOPE;
        mw.clamp(self.config.mw_min, self.config.mw_max)
    }

    fn grid_search<S>(
        &self,
        problem: &Problem<'_, S>,
        trace: &mut Vec<(Params, f64)>,
    ) -> Result<(Params, f64)>
    where
        S: SourceSpectrum + ?Sized,
    {
        let lower = self.settings.lower;
        let upper = self.settings.upper;
        let steps = self.config.grid_steps;
        let mut best = (lower, f64::INFINITY);
        for i in 0..steps {
            let mw = lerp(lower[0], upper[0], i, steps);
            for j in 0..steps {
                let p = [mw, lerp(lower[1], upper[1], j, steps)];
                let cost = problem.cost(&p)?;
                trace.push((p, cost));
                if cost < best.1 {
                    best = (p, cost);
                }
            }
        }
        Ok(best)
    }

    /// Sample a local grid around the optimum so the uncertainty bounds see
    /// the shape of the misfit surface, not only the optimizer's path.
    fn sample_neighbourhood<S>(
        &self,
        problem: &Problem<'_, S>,
        center: &Params,
        trace: &mut Vec<(Params, f64)>,
    ) -> Result<()>
    where
        S: SourceSpectrum + ?Sized,
    {
        let steps = self.config.uncertainty_grid_steps;
        if steps < 2 {
            return Ok(());
        }
        let half = [
            self.config.uncertainty_mw_half_width,
            self.config.uncertainty_log_stress_half_width,
        ];
        for i in 0..steps {
            for j in 0..steps {
                let p = self.settings.clamp([
                    lerp(center[0] - half[0], center[0] + half[0], i, steps),
                    lerp(center[1] - half[1], center[1] + half[1], j, steps),
                ]);
                let cost = problem.cost(&p)?;
                trace.push((p, cost));
            }
        }
        Ok(())
    }

    fn build_result<S>(
        &self,
        event: &EventId,
        problem: &Problem<'_, S>,
        model: &S,
        outcome: &LmOutcome,
        iterations: usize,
        trace: &[(Params, f64)],
    ) -> Result<FitResult>
    where
        S: SourceSpectrum + ?Sized,
    {
        let to_sample = |p: &Params, cost: f64| -> Result<Sample> {
            let stress = 10f64.powf(p[1]);
            Ok(Sample {
                mw: p[0],
                stress,
                misfit: problem.misfit(cost),
                corner: model.corner_frequency(p[0], stress)?,
            })
        };

        let best = to_sample(&outcome.params, outcome.cost)?;
        let mut samples = trace
            .iter()
            .map(|(p, cost)| to_sample(p, *cost))
            .collect::<Result<Vec<_>>>()?;
        samples.push(best);
        let spread = uncertainty::summarize(&mut samples, &best);

        Ok(FitResult {
            event: event.clone(),
            log10_m0: mw_to_log_m0(best.mw) + LOG10_NM_TO_DYNE_CM,
            mw: best.mw,
            data_count: problem.data_count,
            rms_misfit: best.misfit,
            apparent_stress: best.stress,
            mw_mean: spread.mw.mean,
            mw_sd: spread.mw.sd,
            mw_one_sigma: spread.mw_one_sigma,
            mw_two_sigma: spread.mw_two_sigma,
            apparent_stress_mean: spread.stress.mean,
            apparent_stress_sd: spread.stress.sd,
            apparent_stress_one_sigma: spread.stress_one_sigma,
            apparent_stress_two_sigma: spread.stress_two_sigma,
            misfit_mean: spread.misfit.mean,
            misfit_sd: spread.misfit.sd,
            corner_frequency: best.corner,
            corner_frequency_sd: spread.corner.sd,
            iterations,
            log_energy_mdac: model.log_energy(best.mw, best.stress)?,
            converged: outcome.converged,
        })
    }
}

fn pick_better(current: Option<LmOutcome>, candidate: LmOutcome) -> LmOutcome {
    match current {
        None => candidate,
        Some(current) => {
            let better = match (candidate.converged, current.converged) {
                (true, false) => true,
                (false, true) => false,
                _ => candidate.cost < current.cost,
            };
            if better { candidate } else { current }
        }
    }
}

fn lerp(lo: f64, hi: f64, i: usize, steps: usize) -> f64 {
    lo + (hi - lo) * i as f64 / (steps - 1) as f64
}

/// The bands of one event prepared for repeated misfit evaluation.
struct Problem<'a, S: ?Sized> {
    model: &'a S,
    frequencies: Vec<f64>,
    observed: Vec<f64>,
    sqrt_weights: Vec<f64>,
    total_weight: f64,
    data_count: usize,
}

impl<'a, S: SourceSpectrum + ?Sized> Problem<'a, S> {
    fn new<W: BandWeighting + ?Sized>(
        measurements: &BTreeMap<FrequencyBand, BandMeasurement>,
        model: &'a S,
        weighting: &W,
        min_bands: usize,
    ) -> Result<Self> {
        let mut usable = BTreeMap::new();
        for (band, m) in measurements {
            if !m.mean.is_finite() {
                return Err(CalibrationError::InvalidParameter(format!(
                    "non-finite amplitude {} in band {}",
                    m.mean, band
                )));
            }
            // non-positive log amplitudes carry no signal
            if m.mean > 0.0 {
                usable.insert(*band, *m);
            }
        }
        if usable.len() < min_bands {
            return Err(CalibrationError::InsufficientData {
                needed: min_bands,
                available: usable.len(),
            });
        }

        let weights = weighting.weights(&usable);
        let mut frequencies = Vec::with_capacity(usable.len());
        let mut observed = Vec::with_capacity(usable.len());
        let mut sqrt_weights = Vec::with_capacity(usable.len());
        let mut total_weight = 0.0;
        let mut data_count = 0;
        for (band, m) in &usable {
            let w = weights.get(band).copied().unwrap_or(0.0);
            if !(w.is_finite() && w > 0.0) {
                continue;
            }
            frequencies.push(band.center());
            observed.push(m.mean);
            sqrt_weights.push(w.sqrt());
            total_weight += w;
            data_count += m.count;
        }
        if frequencies.len() < min_bands {
            return Err(CalibrationError::InsufficientData {
                needed: min_bands,
                available: frequencies.len(),
            });
        }

        Ok(Self {
            model,
            frequencies,
            observed,
            sqrt_weights,
            total_weight,
            data_count,
        })
    }

    fn len(&self) -> usize {
        self.frequencies.len()
    }

    fn residuals(&self, p: &Params, r: &mut [f64]) -> Result<()> {
        let stress = 10f64.powf(p[1]);
        for (i, slot) in r.iter_mut().enumerate() {
            let predicted = self.model.log_amplitude(self.frequencies[i], p[0], stress)?;
            *slot = self.sqrt_weights[i] * (self.observed[i] - predicted);
        }
        Ok(())
    }

    fn cost(&self, p: &Params) -> Result<f64> {
        let stress = 10f64.powf(p[1]);
        let mut cost = 0.0;
        for i in 0..self.len() {
            let predicted = self.model.log_amplitude(self.frequencies[i], p[0], stress)?;
            let r = self.sqrt_weights[i] * (self.observed[i] - predicted);
            cost += r * r;
        }
        Ok(cost)
    }

    fn misfit(&self, cost: f64) -> f64 {
        (cost / self.total_weight).sqrt()
    }
}
