//! Batch Experiment Runner
//!
//! Runs every policy × covered-tract point of a TOML experiment over one
//! structure file and writes per-run outputs plus a sweep summary.
//!
//! Usage:
//!   cargo run --release --bin run_experiment -- experiments/tract_coverage_sweep.toml

use flood_adaptation::experiment::{run_sweep, ExperimentConfig, SweepSummary};
use flood_adaptation::input::load_structures_from_path;
use flood_adaptation::logging::init_tracing;
use flood_adaptation::output::SimulationOutput;
use std::env;
use std::error::Error;
use std::fs;
use std::path::Path;
use std::time::Instant;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <experiment_config.toml>", args[0]);
        eprintln!("Example: {} experiments/tract_coverage_sweep.toml", args[0]);
        std::process::exit(1);
    }

    let config_path = &args[1];
    println!("=== Flood Adaptation Experiment Runner ===\n");
    println!("Loading experiment config: {}\n", config_path);

    let exp_config = ExperimentConfig::from_path(config_path)?;
    init_tracing(&exp_config.logging.filter)?;

    println!("Experiment: {}", exp_config.experiment.name);
    if !exp_config.experiment.description.is_empty() {
        println!("Description: {}", exp_config.experiment.description);
    }

    let configs = exp_config.sweep_configs();
    println!(
        "Sweep: {} policies × {} tract counts = {} runs\n",
        exp_config.sweep.policies.len(),
        exp_config.sweep.covered_census_tracts.len(),
        configs.len()
    );

    let population = load_structures_from_path(&exp_config.experiment.structures)?;
    let rates = exp_config.load_rate_table()?;
    println!(
        "Structures: {} usable, {} rejected; rate table: {} rows\n",
        population.profiles.len(),
        population.rejected.len(),
        rates.len()
    );

    let output_dir = exp_config.output_dir();
    fs::create_dir_all(&output_dir)?;

    let start_time = Instant::now();
    let outputs = run_sweep(&configs, &rates, &population)?;

    for output in &outputs {
        save_run_output(output, &output_dir, &exp_config)?;
        let s = &output.summary;
        println!(
            "  {:<8} tracts={:<3} EAD ${:>14.2} (no action ${:>14.2})  NFIP={} private={} elevated={}",
            output.metadata.config.policy.label(),
            output.metadata.config.covered_census_tracts,
            s.total_ead,
            s.total_ead_no_action,
            s.num_nfip,
            s.num_private,
            s.num_elevated
        );
    }

    let sweep_summary = SweepSummary::from_outputs(&exp_config, &outputs);
    sweep_summary.write_json(output_dir.join("sweep_summary.json"))?;

    let total_elapsed = start_time.elapsed();
    println!(
        "\n✓ Sweep complete in {:.1}s ({:.2}s per run)",
        total_elapsed.as_secs_f64(),
        total_elapsed.as_secs_f64() / configs.len().max(1) as f64
    );
    println!("Results saved to: {}", output_dir.display());

    Ok(())
}

/// Save run output based on settings
fn save_run_output(
    output: &SimulationOutput,
    dir: &Path,
    exp_config: &ExperimentConfig,
) -> Result<(), Box<dyn Error>> {
    let label = output.run_label();
    if exp_config.output.save_households {
        output.write_household_csv(dir.join(format!("result_{}.csv", label)))?;
    }
    if exp_config.output.save_summary {
        output.write_summary_json(dir.join(format!("summary_{}.json", label)))?;
    }
    Ok(())
}
