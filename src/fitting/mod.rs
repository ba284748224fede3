mod fitter;
mod levenberg;
mod result;
mod uncertainty;
mod weights;

pub use fitter::SpectralFitter;
pub use levenberg::{LmOutcome, LmSettings, Params, minimize};
pub use result::{Bounds, FitResult, index};
pub use weights::{
    BandWeighting, PerBand, WeightingScheme, boost_lowest_bands, low_frequency_emphasis_weight,
    standard_error_weight,
};
