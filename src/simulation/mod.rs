mod network;
mod spectrum;
mod sweep;

pub use network::{NetworkScenario, SyntheticEvent, SyntheticNetwork, SyntheticStation};
pub use spectrum::{
    SpectrumNoise, log_spaced_bands, log_spaced_frequencies, synthetic_measurements,
    synthetic_samples,
};
pub use sweep::{SWEEP_HIGH_HZ, SWEEP_LOW_HZ, SweepRow, energy_error_sweep, relative_energy_error};
