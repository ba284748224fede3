pub mod batch;
pub mod config;
pub mod constants;
pub mod energy;
pub mod error;
pub mod fitting;
pub mod model;
pub mod output;
pub mod path;
pub mod processing;
pub mod site;
pub mod source;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use batch::CancellationToken;
pub use config::CalibrationConfig;
pub use energy::{EnergyInfo, EnergyIntegrator};
pub use error::{CalibrationError, Result};
pub use fitting::{FitResult, SpectralFitter};
pub use model::{
    BandMeasurement, EventId, FrequencyBand, Phase, PhaseAttenuationParams, ReferenceMw,
    SourcePhysicsParams, SpectraByBand, SpectralObservation, StationId,
};
pub use processing::{CalibrationPipeline, CalibrationReport, EventCalibration};
pub use site::{SiteSolution, SiteTerm, SiteTermConfidence, SiteTermSolver, SiteTerms};
pub use source::{MdacSourceModel, SourceSpectrum};
