use anyhow::Result;
use clap::Parser;

use codacal::config::EnergyConfig;
use codacal::simulation::energy_error_sweep;
use codacal::{MdacSourceModel, PhaseAttenuationParams, SourcePhysicsParams};

#[derive(Parser, Debug)]
#[command(name = "energy_sweep")]
#[command(about = "Energy integration error versus spectral sample density")]
struct Args {
    /// Sample counts to integrate at
    #[arg(short, long, value_delimiter = ',', default_value = "10,100,1000,100000")]
    samples: Vec<usize>,

    /// Disable the analytic tail extension
    #[arg(long)]
    no_tails: bool,
}

const CASES: [(f64, f64); 4] = [(2.0, 1.0), (5.0, 1.0), (7.0, 5.0), (9.0, 10.0)];

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let model = MdacSourceModel::new(
        &SourcePhysicsParams::default(),
        &PhaseAttenuationParams::default(),
    )?;
    let config = EnergyConfig {
        extrapolate_tails: !args.no_tails,
    };

    println!("mw,stress,samples,log_energy,log_energy_mdac,relative_error");
    for (mw, stress) in CASES {
        for row in energy_error_sweep(&model, &config, mw, stress, &args.samples)? {
            println!(
                "{},{},{},{:.6},{:.6},{:.3e}",
                row.mw, row.stress, row.samples, row.log_energy, row.log_energy_mdac, row.relative_error
            );
        }
    }
    Ok(())
}
