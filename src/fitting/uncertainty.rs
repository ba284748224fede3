//! Spread of the misfit surface sampled while fitting.
//!
//! Every point the optimizer and the follow-up grids evaluate is kept. The
//! misfit thresholds `f1 = best + SE` and `f2 = f1 + 2 SE`, with
//! `SE = sqrt(var(misfit) / (N - 2))`, select the samples that define the
//! one- and two-sigma parameter ranges.

use rolling_stats::Stats;

use super::result::Bounds;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Sample {
    pub mw: f64,
    pub stress: f64,
    pub misfit: f64,
    pub corner: f64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Spread {
    pub mean: f64,
    pub sd: f64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct UncertaintySummary {
    pub mw: Spread,
    pub stress: Spread,
    pub misfit: Spread,
    pub corner: Spread,
    pub mw_one_sigma: Bounds,
    pub mw_two_sigma: Bounds,
    pub stress_one_sigma: Bounds,
    pub stress_two_sigma: Bounds,
}

pub(crate) fn summarize(samples: &mut [Sample], best: &Sample) -> UncertaintySummary {
    let mut mw: Stats<f64> = Stats::new();
    let mut stress: Stats<f64> = Stats::new();
    let mut misfit: Stats<f64> = Stats::new();
    let mut corner: Stats<f64> = Stats::new();
    for s in samples.iter() {
        mw.update(s.mw);
        stress.update(s.stress);
        misfit.update(s.misfit);
        corner.update(s.corner);
    }

    let misfit_spread = spread(&misfit);
    let n = samples.len() as f64;
    let standard_error = if n > 2.0 {
        (misfit_spread.sd * misfit_spread.sd / (n - 2.0)).sqrt()
    } else {
        0.0
    };
    let f1 = best.misfit + standard_error;
    let f2 = f1 + 2.0 * standard_error;

    samples.sort_by(|a, b| a.misfit.total_cmp(&b.misfit));

    let mut mw_one = Range::around(best.mw);
    let mut mw_two = Range::around(best.mw);
    let mut stress_one = Range::around(best.stress);
    let mut stress_two = Range::around(best.stress);
    for s in samples.iter() {
        if s.misfit > f2 {
            break;
        }
        mw_two.include(s.mw);
        stress_two.include(s.stress);
        if s.misfit <= f1 {
            mw_one.include(s.mw);
            stress_one.include(s.stress);
        }
    }

    UncertaintySummary {
        mw: spread(&mw),
        stress: spread(&stress),
        misfit: misfit_spread,
        corner: spread(&corner),
        mw_one_sigma: mw_one.into(),
        mw_two_sigma: mw_two.into(),
        stress_one_sigma: stress_one.into(),
        stress_two_sigma: stress_two.into(),
    }
}

fn spread(stats: &Stats<f64>) -> Spread {
    let sd = if stats.count > 1 && stats.std_dev.is_finite() {
        stats.std_dev
    } else {
        0.0
    };
    Spread {
        mean: stats.mean,
        sd,
    }
}

struct Range {
    min: f64,
    max: f64,
}

impl Range {
    fn around(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    fn include(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

impl From<Range> for Bounds {
    fn from(r: Range) -> Self {
        Bounds {
            min: r.min,
            max: r.max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(mw: f64, misfit: f64) -> Sample {
        Sample {
            mw,
            stress: 1.0 + mw,
            misfit,
            corner: 1.0,
        }
    }

    #[test]
    fn test_bounds_nest_and_contain_best() {
        let mut samples: Vec<Sample> = (0..41)
            .map(|i| {
                let mw = 4.0 + 0.05 * i as f64;
                sample(mw, (mw - 5.0).powi(2))
            })
            .collect();
        let best = sample(5.0, 0.0);
        let summary = summarize(&mut samples, &best);

        assert!(summary.mw_one_sigma.contains(5.0));
        assert!(summary.mw_two_sigma.min <= summary.mw_one_sigma.min);
        assert!(summary.mw_two_sigma.max >= summary.mw_one_sigma.max);
        assert!(summary.mw_one_sigma.max - summary.mw_one_sigma.min > 0.0);
        assert!(summary.stress_two_sigma.contains(6.0));
        assert!((summary.mw.mean - 5.0).abs() < 1e-9);
        assert!(summary.mw.sd > 0.0);
        assert_eq!(summary.corner.sd, 0.0);
    }

    #[test]
    fn test_single_sample_collapses_to_point() {
        let best = sample(3.0, 0.1);
        let mut samples = vec![best];
        let summary = summarize(&mut samples, &best);
        assert_eq!(summary.mw_one_sigma, Bounds::point(3.0));
        assert_eq!(summary.mw_two_sigma, Bounds::point(3.0));
        assert_eq!(summary.misfit.sd, 0.0);
    }
}
