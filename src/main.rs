use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use codacal::output::{EventReport, ReportFormat, create_formatter};
use codacal::simulation::{NetworkScenario, SpectrumNoise, log_spaced_bands};
use codacal::{
    CalibrationConfig, CalibrationPipeline, CancellationToken, Phase, PhaseAttenuationParams,
    SourcePhysicsParams,
};

#[derive(Parser, Debug)]
#[command(name = "codacal")]
#[command(about = "Calibrate a synthetic coda network: site terms, Mw, apparent stress and energy")]
struct Args {
    /// TOML engine configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TOML network scenario (replaces the random network)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Number of events in the random network
    #[arg(short, long, default_value_t = 20)]
    events: usize,

    /// Number of stations in the random network
    #[arg(short = 'n', long, default_value_t = 6)]
    stations: usize,

    /// Events published as references
    #[arg(short, long, default_value_t = 3)]
    references: usize,

    /// Number of log-spaced frequency bands
    #[arg(short, long, default_value_t = 10)]
    bands: usize,

    /// Lowest band edge in Hz
    #[arg(long, default_value_t = 0.03)]
    low_hz: f64,

    /// Highest band edge in Hz
    #[arg(long, default_value_t = 8.0)]
    high_hz: f64,

    /// Amplitude scatter (log10 units)
    #[arg(long, default_value_t = 0.0)]
    noise: f64,

    /// Base seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Seismic phase to model
    #[arg(short, long, value_enum, default_value = "lg")]
    phase: Phase,

    /// Output format: text, csv, json
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: ReportFormat,

    /// Also print the site terms
    #[arg(long)]
    site_terms: bool,

    /// Increase output verbosity
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn load_config(path: &PathBuf) -> Result<CalibrationConfig> {
    let content = fs::read_to_string(path).context("Failed to read config file")?;
    CalibrationConfig::from_toml_str(&content).context("Failed to parse config file")
}

fn load_scenario(path: &PathBuf) -> Result<NetworkScenario> {
    let content = fs::read_to_string(path).context("Failed to read scenario file")?;
    toml::from_str(&content).context("Failed to parse scenario file")
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => CalibrationConfig::default(),
    };

    let scenario = match &args.scenario {
        Some(path) => load_scenario(path)?,
        None => {
            let bands = log_spaced_bands(args.low_hz, args.high_hz, args.bands)
                .context("Invalid band range")?;
            let noise = SpectrumNoise::default()
                .with_sd(args.noise)
                .with_per_band(1);
            let noise = match args.seed {
                Some(s) => noise.with_seed(s.wrapping_add(1)),
                None => noise,
            };
            NetworkScenario::random(args.events, args.stations, args.references, bands, args.seed)
                .with_noise(noise)
        }
    };

    let source = SourcePhysicsParams::default();
    let path = PhaseAttenuationParams::for_phase(args.phase);
    let pipeline = CalibrationPipeline::new(&config, &source, &path)?;

    let network = scenario.generate(pipeline.model())?;
    eprintln!(
        "Network: {} events, {} stations, {} bands, {} references",
        scenario.events.len(),
        scenario.stations.len(),
        scenario.bands.len(),
        network.references.len()
    );

    let report = pipeline.run(&network.spectra, &network.references, &CancellationToken::new());
    for (band, e) in &report.failed_bands {
        eprintln!("Band {} skipped: {}", band, e);
    }

    let formatter = create_formatter(args.format, args.verbose);
    if let Some(header) = formatter.header() {
        println!("{}", header);
    }
    for (event, outcome) in &report.events {
        println!("{}", formatter.format(&EventReport::from_outcome(event, outcome)));
    }

    if args.site_terms {
        if let Some(header) = formatter.site_term_header() {
            println!("{}", header);
        }
        for terms in report.site_terms.values() {
            for term in terms.values() {
                println!("{}", formatter.format_site_term(term));
            }
        }
    }

    eprintln!(
        "Done: {} calibrated, {} failed",
        report.successes().count(),
        report.failure_count()
    );
    Ok(())
}
