use super::{EventReport, Formatter, iso8601_timestamp};
use crate::fitting::index;
use crate::site::{SiteTerm, SiteTermConfidence};

pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format(&self, report: &EventReport) -> String {
        let vector = report
            .fit
            .as_ref()
            .map(|fit| fit.to_vector().map(|v| v.to_string()).join(","))
            .unwrap_or_else(|| vec![""; index::LEN].join(","));
        let (energy, stress) = report.energy.map_or((String::new(), String::new()), |e| {
            (
                e.log_total_energy.to_string(),
                e.observed_apparent_stress.to_string(),
            )
        });
        let converged = report.fit.as_ref().is_some_and(|f| f.converged);
        format!(
            "{},{},{},{},{},{}",
            iso8601_timestamp(),
            report.event,
            vector,
            energy,
            stress,
            converged
        )
    }

    fn format_site_term(&self, term: &SiteTerm) -> String {
        let (confidence, hops) = match term.confidence {
            SiteTermConfidence::Anchored => ("anchored", 0),
            SiteTermConfidence::Propagated { hops } => ("propagated", hops),
            SiteTermConfidence::Unconstrained => ("unconstrained", 0),
        };
        format!(
            "{},{},{},{},{},{},{}",
            term.station,
            term.band.low_frequency(),
            term.band.high_frequency(),
            term.value,
            confidence,
            hops,
            term.support
        )
    }

    fn header(&self) -> Option<&'static str> {
        Some(
            "ts,event,log10_m0,mw,data_count,rms_fit,app_stress,mw_mean,mw_1_min,mw_1_max,mw_2_min,mw_2_max,app_stress_mean,fit_mean,mw_sd,app_stress_sd,fit_sd,app_1_min,app_1_max,app_2_min,app_2_max,corner_freq,corner_freq_sd,iterations,mdac_energy,log_total_energy,observed_app_stress,converged",
        )
    }

    fn site_term_header(&self) -> Option<&'static str> {
        Some("station,low_hz,high_hz,site_term,confidence,hops,support")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::{sample_report, sample_site_term};

    fn columns(line: &str) -> usize {
        line.split(',').count()
    }

    #[test]
    fn test_row_matches_header() {
        let header = CsvFormatter.header().unwrap_or_default();
        let row = CsvFormatter.format(&sample_report());
        assert_eq!(columns(&row), columns(header));
        assert!(row.ends_with(",true"));

        let failed = EventReport {
            fit: None,
            energy: None,
            error: Some("x".to_string()),
            ..sample_report()
        };
        assert_eq!(columns(&CsvFormatter.format(&failed)), columns(header));
    }

    #[test]
    fn test_site_term_row() {
        let row = CsvFormatter.format_site_term(&sample_site_term());
        assert_eq!(row, "ST01,0.5,0.7,6,propagated,2,3");
        assert_eq!(
            columns(&row),
            columns(CsvFormatter.site_term_header().unwrap_or_default())
        );
    }
}
