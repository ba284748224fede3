use serde_json::json;

use super::{EventReport, Formatter, iso8601_timestamp};
use crate::site::SiteTerm;

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, report: &EventReport) -> String {
        json!({
            "ts": iso8601_timestamp(),
            "event": report.event,
            "fit": report.fit,
            "energy": report.energy,
            "error": report.error,
        })
        .to_string()
    }

    fn format_site_term(&self, term: &SiteTerm) -> String {
        json!({
            "station": term.station,
            "band": term.band,
            "value": term.value,
            "confidence": term.confidence,
            "support": term.support,
        })
        .to_string()
    }
}
