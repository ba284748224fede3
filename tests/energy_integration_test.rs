mod test_spectra;

use codacal::config::EnergyConfig;
use codacal::simulation::{energy_error_sweep, synthetic_samples};
use codacal::source::mw_to_log_m0;
use codacal::{EnergyIntegrator, SourceSpectrum};

use test_spectra::{
    EMPIRICAL_AMPLITUDES, EMPIRICAL_APPARENT_STRESS, EMPIRICAL_LOG_ENERGY, EMPIRICAL_LOG_M0_NM,
    SPARSE_FREQUENCIES, lg_model,
};

const CASES: [(f64, f64); 4] = [(2.0, 1.0), (5.0, 1.0), (7.0, 5.0), (9.0, 10.0)];

fn log_ratio_percent(value: f64, reference: f64) -> f64 {
    100.0 * (value / reference - 1.0).abs()
}

#[test]
fn test_dense_error_shrinks_with_sample_count() {
    let model = lg_model();
    for (mw, stress) in CASES {
        let rows = energy_error_sweep(
            &model,
            &EnergyConfig::default(),
            mw,
            stress,
            &[10, 100, 1_000, 100_000],
        )
        .unwrap();
        for pair in rows.windows(2) {
            assert!(
                pair[1].relative_error < pair[0].relative_error,
                "Mw {} stress {}: error did not shrink from {} to {} samples ({} -> {})",
                mw,
                stress,
                pair[0].samples,
                pair[1].samples,
                pair[0].relative_error,
                pair[1].relative_error
            );
        }
        assert!(
            rows[2].relative_error < 0.003,
            "Mw {} stress {}: 1000-sample error {}",
            mw,
            stress,
            rows[2].relative_error
        );
    }
}

#[test]
fn test_sparse_synthetic_spectrum_within_four_percent() {
    let model = lg_model();
    let integrator = EnergyIntegrator::from_model(model, &EnergyConfig::default());
    for (mw, stress) in CASES {
        let samples = synthetic_samples(&model, &SPARSE_FREQUENCIES, mw, stress).unwrap();
        let info = integrator.integrate_samples(&samples, mw, stress).unwrap();
        let error = log_ratio_percent(info.log_total_energy, info.log_energy_mdac);
        assert!(error < 4.0, "Mw {} stress {}: {:.3}%", mw, stress, error);
        assert!(info.energy_ratio > 0.0 && info.energy_ratio <= 1.0);
    }
}

#[test]
fn test_empirical_spectrum_matches_measured_energy() {
    let integrator = EnergyIntegrator::from_model(lg_model(), &EnergyConfig::default());
    let mw = (EMPIRICAL_LOG_M0_NM - 9.1) / 1.5;
    assert!((mw_to_log_m0(mw) - EMPIRICAL_LOG_M0_NM).abs() < 1e-12);

    let samples: Vec<(f64, f64)> = SPARSE_FREQUENCIES
        .iter()
        .copied()
        .zip(EMPIRICAL_AMPLITUDES.iter().copied())
        .collect();
    let info = integrator
        .integrate_samples(&samples, mw, EMPIRICAL_APPARENT_STRESS)
        .unwrap();

    let error = log_ratio_percent(info.log_total_energy, EMPIRICAL_LOG_ENERGY);
    assert!(
        error < 4.0,
        "log10 E {} vs measured {} ({:.2}%)",
        info.log_total_energy,
        EMPIRICAL_LOG_ENERGY,
        error
    );
    assert!(info.log_observed_energy < info.log_total_energy);
}

#[test]
fn test_observed_stress_round_trips_through_energy() {
    let model = lg_model();
    let integrator = EnergyIntegrator::from_model(model, &EnergyConfig::default());
    let frequencies = codacal::simulation::log_spaced_frequencies(0.01, 200.0, 2_000);
    for (mw, stress) in CASES {
        let samples = synthetic_samples(&model, &frequencies, mw, stress).unwrap();
        let info = integrator.integrate_samples(&samples, mw, stress).unwrap();
        approx::assert_relative_eq!(info.observed_apparent_stress, stress, max_relative = 1e-3);
        approx::assert_relative_eq!(
            info.log_energy_mdac,
            model.log_energy(mw, stress).unwrap(),
            epsilon = 1e-12
        );
    }
}
