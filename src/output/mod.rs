mod csv;
mod json;
mod text;

use chrono::Utc;
use serde::Serialize;

use crate::energy::EnergyInfo;
use crate::error::Result;
use crate::fitting::FitResult;
use crate::model::EventId;
use crate::processing::EventCalibration;
use crate::site::SiteTerm;

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
}

/// One event's line in a calibration report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventReport {
    pub event: EventId,
    /// Best fit, including the partial result of a fit that did not converge
    pub fit: Option<FitResult>,
    pub energy: Option<EnergyInfo>,
    pub error: Option<String>,
}

impl EventReport {
    pub fn from_outcome(event: &EventId, outcome: &Result<EventCalibration>) -> Self {
        match outcome {
            Ok(calibration) => Self {
                event: event.clone(),
                fit: Some(calibration.fit.clone()),
                energy: Some(calibration.energy),
                error: None,
            },
            Err(e) => Self {
                event: event.clone(),
                fit: e.partial_fit().cloned(),
                energy: None,
                error: Some(e.to_string()),
            },
        }
    }
}

pub trait Formatter: Send {
    fn format(&self, report: &EventReport) -> String;

    fn format_site_term(&self, term: &SiteTerm) -> String;

    fn header(&self) -> Option<&'static str> {
        None
    }

    fn site_term_header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: ReportFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        ReportFormat::Text => Box::new(TextFormatter::new(verbose)),
        ReportFormat::Json => Box::new(JsonFormatter),
        ReportFormat::Csv => Box::new(CsvFormatter),
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
