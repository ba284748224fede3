#![allow(dead_code)]

use std::collections::BTreeMap;

use codacal::{
    EventId, FrequencyBand, MdacSourceModel, PhaseAttenuationParams, ReferenceMw,
    SourcePhysicsParams, SpectraByBand, SpectralObservation,
};

/// Band centers of a typical regional coda calibration (Hz).
pub const SPARSE_FREQUENCIES: [f64; 9] = [0.04, 0.075, 0.4, 0.6, 0.85, 1.25, 1.75, 2.5, 3.5];

/// Measured coda source spectrum of a crustal event, log10 dyne·cm at
/// [`SPARSE_FREQUENCIES`].
pub const EMPIRICAL_AMPLITUDES: [f64; 9] = [
    22.3146, 22.5454, 22.7264, 22.7431, 22.7141, 22.5399, 22.1075, 21.6355, 21.3823,
];
pub const EMPIRICAL_LOG_M0_NM: f64 = 15.43;
pub const EMPIRICAL_APPARENT_STRESS: f64 = 2.279;
/// Independently measured radiated energy of the empirical event, log10 J
pub const EMPIRICAL_LOG_ENERGY: f64 = 10.97;

pub fn lg_model() -> MdacSourceModel {
    MdacSourceModel::new(
        &SourcePhysicsParams::default(),
        &PhaseAttenuationParams::default(),
    )
    .expect("default Lg model")
}

pub fn band(low: f64, high: f64) -> FrequencyBand {
    FrequencyBand::new(low, high).expect("valid band")
}

/// Spectra with every observation in `band` at `amplitude`.
pub fn uniform_spectra(b: FrequencyBand, pairs: &[(&str, &str)], amplitude: f64) -> SpectraByBand {
    let mut spectra = SpectraByBand::new();
    spectra.insert(
        b,
        pairs
            .iter()
            .map(|(event, station)| {
                SpectralObservation::new(b, *event, *station, amplitude)
                    .with_raw_amplitudes(amplitude, amplitude)
            })
            .collect(),
    );
    spectra
}

pub fn references(list: &[(&str, f64)]) -> BTreeMap<EventId, ReferenceMw> {
    list.iter()
        .map(|(event, mw)| (EventId::from(*event), ReferenceMw::new(*event, *mw)))
        .collect()
}
