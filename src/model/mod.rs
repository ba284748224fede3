mod band;
mod observation;
mod params;

pub use band::FrequencyBand;
pub use observation::{
    BandMeasurement, EventId, ReferenceMw, SpectraByBand, SpectralObservation, StationId,
    group_by_band,
};
pub use params::{Phase, PhaseAttenuationParams, SourcePhysicsParams};
