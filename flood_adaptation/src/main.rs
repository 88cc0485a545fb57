//! Household Flood-Risk Adaptation - Single Run
//!
//! Loads a structure file, runs one decision step under the chosen policy and
//! tract coverage, and prints a report.
//!
//! Usage:
//!   cargo run --release -- data/structures_sample.csv [pre_FIRM|voucher] [covered_tracts]

use flood_adaptation::input::load_structures_from_path;
use flood_adaptation::logging::init_tracing;
use flood_adaptation::output::SimulationOutput;
use flood_adaptation::rate_table::RateTable;
use flood_adaptation::simulation::Simulation;
use flood_adaptation::{ModelConfig, Policy, SimulationError};
use std::env;
use std::error::Error;
use std::path::PathBuf;

fn parse_policy(arg: &str) -> Result<Policy, SimulationError> {
    match arg {
        "pre_FIRM" => Ok(Policy::PreFirm),
        "voucher" => Ok(Policy::Voucher),
        other => Err(SimulationError::Configuration(format!(
            "unknown policy '{}', expected pre_FIRM or voucher",
            other
        ))),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 4 {
        eprintln!(
            "Usage: {} <structures.csv> [pre_FIRM|voucher] [covered_tracts]",
            args[0]
        );
        std::process::exit(1);
    }

    init_tracing("info")?;

    let policy = match args.get(2) {
        Some(arg) => parse_policy(arg)?,
        None => Policy::PreFirm,
    };
    let covered_tracts = match args.get(3) {
        Some(arg) => arg.parse::<usize>().map_err(|e| {
            SimulationError::Configuration(format!("covered_tracts '{}': {}", arg, e))
        })?,
        None => 0,
    };

    println!("=== Household Flood-Risk Adaptation ===\n");

    let config = ModelConfig::baseline()
        .with_policy(policy)
        .with_covered_census_tracts(covered_tracts);

    println!("Configuration:");
    println!("  Policy: {}", config.policy);
    println!("  Covered census tracts: {}", config.covered_census_tracts);
    println!("  CRS reward: {}", config.crs_reward);
    println!(
        "  Public risk reduction: {:.0}%",
        config.risk_reduction_percentage * 100.0
    );
    println!("  Return periods: {:?}\n", config.return_periods);

    let loaded = load_structures_from_path(&args[1])?;
    println!(
        "Loaded {} structures ({} rejected)",
        loaded.profiles.len(),
        loaded.rejected.len()
    );

    let rates = RateTable::builtin()?;
    let num_rejected = loaded.rejected.len();
    let simulation = Simulation::new(config, rates, loaded.profiles)?;
    println!(
        "Census tracts: {} ({} covered)",
        simulation.population().tract_ranking().len(),
        simulation.population().covered_tracts().len()
    );
    println!(
        "Max baseline EAD: ${:.2}\n",
        simulation.population().max_baseline_ead()
    );

    println!("Running decision step...\n");
    let result = match simulation.run() {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Run aborted: {}", e);
            return Err(e.into());
        }
    };

    let s = &result.summary;
    println!("=== Results ===\n");
    println!("Households: {}", s.num_households);
    println!(
        "  Insured: {} NFIP, {} private, {} uninsured",
        s.num_nfip, s.num_private, s.num_uninsured
    );
    println!(
        "  Elevated: {} (mean elevation {:.2} ft)",
        s.num_elevated, s.mean_elevation
    );
    println!("  Mandatory purchase: {}", s.num_mandated);
    println!("  Publicly protected: {}", s.num_publicly_protected);
    println!("\nExpected annual damage:");
    println!("  Baseline:  ${:.2}", s.total_baseline_ead);
    println!("  No action: ${:.2}", s.total_ead_no_action);
    println!("  Chosen:    ${:.2}", s.total_ead);
    println!(
        "  Reduction: ${:.2} ({:.1}%)",
        s.ead_reduction,
        s.ead_reduction_fraction * 100.0
    );

    let output = SimulationOutput::new(&simulation, &result, num_rejected)?;
    let paths = output.write_all(PathBuf::from("results"))?;
    println!("\nResults saved to:");
    for path in paths {
        println!("  {}", path.display());
    }

    Ok(())
}
