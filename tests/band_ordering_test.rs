mod test_spectra;

use std::collections::BTreeMap;

use codacal::config::FitConfig;
use codacal::model::group_by_band;
use codacal::simulation::{SpectrumNoise, log_spaced_bands, synthetic_measurements};
use codacal::{
    FrequencyBand, Phase, PhaseAttenuationParams, SourcePhysicsParams, SpectralFitter,
    SpectralObservation,
};

use test_spectra::{band, lg_model};

#[test]
fn test_ordering_matches_bound_tuples() {
    let bounds = [
        (2.0, 4.0),
        (0.5, 0.7),
        (1.0, 2.0),
        (1.0, 1.5),
        (0.02, 0.03),
        (2.0, 3.0),
        (6.0, 8.0),
    ];
    let mut bands: Vec<FrequencyBand> = bounds.iter().map(|(lo, hi)| band(*lo, *hi)).collect();
    bands.sort();

    let mut tuples = bounds.to_vec();
    tuples.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let sorted: Vec<(f64, f64)> = bands
        .iter()
        .map(|b| (b.low_frequency(), b.high_frequency()))
        .collect();
    assert_eq!(sorted, tuples);

    for pair in bands.windows(2) {
        assert!(pair[0] < pair[1]);
        assert_ne!(pair[0], pair[1]);
    }
}

#[test]
fn test_grouping_independent_of_observation_order() {
    let bands = [band(0.5, 0.7), band(1.0, 2.0), band(2.0, 4.0)];
    let observations: Vec<SpectralObservation> = bands
        .iter()
        .flat_map(|b| {
            ["S1", "S2"]
                .into_iter()
                .map(move |s| SpectralObservation::new(*b, "A", s, b.center()))
        })
        .collect();

    let forward = group_by_band(observations.clone());
    let backward = group_by_band(observations.into_iter().rev());
    assert_eq!(
        forward.keys().collect::<Vec<_>>(),
        backward.keys().collect::<Vec<_>>()
    );
    assert_eq!(forward.keys().copied().collect::<Vec<_>>(), bands.to_vec());
    for (b, obs) in &forward {
        assert_eq!(obs.len(), 2);
        assert!(obs.iter().all(|o| o.band == *b));
    }
}

#[test]
fn test_fit_independent_of_measurement_insertion_order() {
    let model = lg_model();
    let bands = log_spaced_bands(0.02, 20.0, 10).unwrap();
    let measurements =
        synthetic_measurements(&model, &bands, 4.5, 2.0, &SpectrumNoise::default()).unwrap();

    let reversed: BTreeMap<_, _> = measurements.iter().rev().map(|(b, m)| (*b, *m)).collect();

    let fitter = SpectralFitter::new(&FitConfig::default()).unwrap();
    let source = SourcePhysicsParams::default();
    let path = PhaseAttenuationParams::default();
    let weighting = FitConfig::default().weighting;
    let a = fitter
        .fit(&"A".into(), &measurements, Phase::Lg, &source, &path, &weighting)
        .unwrap();
    let b = fitter
        .fit(&"A".into(), &reversed, Phase::Lg, &source, &path, &weighting)
        .unwrap();
    assert_eq!(a.mw, b.mw);
    assert_eq!(a.apparent_stress, b.apparent_stress);
    assert_eq!(a.data_count, b.data_count);
    assert_eq!(a.rms_misfit, b.rms_misfit);
}
