use super::{EventReport, Formatter};
use crate::site::{SiteTerm, SiteTermConfidence};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, report: &EventReport) -> String {
        let Some(fit) = &report.fit else {
            return format!(
                "Event {:<10} failed: {}",
                report.event,
                report.error.as_deref().unwrap_or("no result")
            );
        };
        let mut line = format!(
            "Event {:<10} Mw {:>5.2} stress {:>7.3} MPa fc {:>7.3} Hz misfit {:.4}",
            report.event, fit.mw, fit.apparent_stress, fit.corner_frequency, fit.rms_misfit
        );
        if let Some(energy) = &report.energy {
            line.push_str(&format!(" log10 E {:>6.2}", energy.log_total_energy));
        }
        if self.verbose {
            line.push_str(&format!(
                " [Mw 1σ {:.2}-{:.2}, 2σ {:.2}-{:.2}; bands {}, iter {}",
                fit.mw_one_sigma.min,
                fit.mw_one_sigma.max,
                fit.mw_two_sigma.min,
                fit.mw_two_sigma.max,
                fit.data_count,
                fit.iterations
            ));
            if let Some(energy) = &report.energy {
                line.push_str(&format!(
                    ", model E {:.2}, in band {:.0}%, σa {:.3} MPa",
                    energy.log_energy_mdac,
                    100.0 * energy.energy_ratio,
                    energy.observed_apparent_stress
                ));
            }
            line.push(']');
        }
        if let Some(error) = &report.error {
            line.push_str(&format!(" ({})", error));
        }
        line
    }

    fn format_site_term(&self, term: &SiteTerm) -> String {
        let confidence = match term.confidence {
            SiteTermConfidence::Anchored => "anchored".to_string(),
            SiteTermConfidence::Propagated { hops } => format!("{} hop(s)", hops),
            SiteTermConfidence::Unconstrained => "unconstrained".to_string(),
        };
        format!(
            "Site {:<8} {:>14} {:>8.3} ({}, {} events)",
            term.station, term.band, term.value, confidence, term.support
        )
    }
}
