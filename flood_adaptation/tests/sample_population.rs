//! End-to-end runs over the bundled sample structure file

use approx::assert_relative_eq;
use flood_adaptation::experiment::{run_sweep, ExperimentConfig, SweepSummary};
use flood_adaptation::input::{load_structures_from_path, LoadedPopulation};
use flood_adaptation::output::{HouseholdRecord, SimulationOutput};
use flood_adaptation::rate_table::RateTable;
use flood_adaptation::simulation::{Simulation, SimulationResult};
use flood_adaptation::{
    InsuranceKind, ModelConfig, Policy, ELEVATION_OPTIONS, NFIP_COVERAGE_OPTIONS,
};
use std::path::PathBuf;

fn manifest_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

fn sample() -> LoadedPopulation {
    load_structures_from_path(manifest_path("data/structures_sample.csv")).unwrap()
}

fn run(config: ModelConfig) -> (Simulation, SimulationResult) {
    let sim = Simulation::new(config, RateTable::builtin().unwrap(), sample().profiles).unwrap();
    let result = sim.run().unwrap();
    (sim, result)
}

#[test]
fn test_sample_loads_and_rejects_bad_rows() {
    let loaded = sample();
    assert_eq!(loaded.profiles.len(), 11);
    assert_eq!(loaded.rejected.len(), 2);

    let messages: Vec<String> = loaded.rejected.iter().map(|e| e.to_string()).collect();
    assert!(messages[0].contains("HOU-0012"));
    assert!(messages[1].contains("HOU-0013"));
}

#[test]
fn test_prospect_utility_never_worse_than_no_action() {
    for policy in [Policy::PreFirm, Policy::Voucher] {
        let (_, result) = run(ModelConfig::baseline().with_policy(policy));
        for d in &result.decisions {
            assert!(d.prospect_utility.is_finite());
            assert!(
                d.prospect_utility <= d.prospect_utility_no_action,
                "{} under {}: {} > {}",
                d.structure_id,
                policy,
                d.prospect_utility,
                d.prospect_utility_no_action
            );
        }
    }
}

#[test]
fn test_voucher_elevation_is_fixed_or_zero() {
    let (sim, result) = run(ModelConfig::voucher());
    for (profile, d) in sim.profiles().iter().zip(&result.decisions) {
        let fixed = (profile.bfe - profile.property_height + 1.0).max(0.0);
        assert!(d.elevation == 0.0 || d.elevation == fixed, "{}", d.structure_id);
        assert_ne!(d.insurance_type, InsuranceKind::Private);
        if d.is_insured() {
            assert_eq!(d.elevation, fixed);
            assert!(NFIP_COVERAGE_OPTIONS.contains(&d.insurance_coverage));
        }
    }
}

#[test]
fn test_pre_firm_choices_come_from_option_lists() {
    let (_, result) = run(ModelConfig::baseline());
    for d in &result.decisions {
        assert!(ELEVATION_OPTIONS.contains(&d.elevation));
        match d.insurance_type {
            InsuranceKind::None => assert_eq!(d.insurance_coverage, 0.0),
            _ => assert!(d.insurance_coverage > 0.0),
        }
    }
    let s = &result.summary;
    assert_eq!(s.num_nfip + s.num_private + s.num_uninsured, s.num_households);
}

#[test]
fn test_zero_tracts_means_no_public_reduction() {
    let (sim, result) = run(ModelConfig::baseline().with_covered_census_tracts(0));
    assert!(sim.population().covered_tracts().is_empty());
    assert!(result
        .decisions
        .iter()
        .all(|d| d.public_risk_reduction == 0.0));
    assert_eq!(result.summary.num_publicly_protected, 0);
}

#[test]
fn test_covering_every_tract_scales_no_action_damage() {
    let (_, uncovered) = run(ModelConfig::baseline());
    let (sim, covered) = run(ModelConfig::baseline().with_covered_census_tracts(50));

    assert_eq!(sim.population().covered_tracts().len(), 4);
    for (u, c) in uncovered.decisions.iter().zip(&covered.decisions) {
        assert_eq!(c.public_risk_reduction, 0.25);
        assert_eq!(c.baseline_ead, u.baseline_ead);
        assert_relative_eq!(c.ead_no_action, 0.75 * u.ead_no_action, max_relative = 1e-9);
    }
}

#[test]
fn test_experiment_file_runs_end_to_end() {
    let mut config =
        ExperimentConfig::from_path(manifest_path("experiments/tract_coverage_sweep.toml"))
            .unwrap();
    config.experiment.structures = manifest_path(&config.experiment.structures.to_string_lossy());

    let population = load_structures_from_path(&config.experiment.structures).unwrap();
    let rates = config.load_rate_table().unwrap();
    let outputs = run_sweep(&config.sweep_configs(), &rates, &population).unwrap();
    assert_eq!(outputs.len(), 8);

    let summary = SweepSummary::from_outputs(&config, &outputs);
    assert_eq!(summary.num_structures, 11);
    assert_eq!(summary.num_rejected, 2);
    assert!(summary
        .runs
        .iter()
        .all(|r| r.summary.total_ead <= r.summary.total_ead_no_action + 1e-6));

    let dir = std::env::temp_dir().join(format!("flood_adaptation_sweep_{}", std::process::id()));
    let paths = outputs[0].write_all(&dir).unwrap();
    let mut rdr = csv::Reader::from_path(&paths[0]).unwrap();
    let rows: Vec<HouseholdRecord> = rdr.deserialize().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 11);
    assert_eq!(rows[0].structure_id, "HOU-0001");
    assert_eq!(rows[0].geoid, "48201310100");
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_output_rows_follow_input_order() {
    let (sim, result) = run(ModelConfig::voucher().with_covered_census_tracts(2));
    let output = SimulationOutput::new(&sim, &result, 2).unwrap();
    let ids: Vec<&str> = output
        .households
        .iter()
        .map(|h| h.structure_id.as_str())
        .collect();
    let expected: Vec<&str> = sim
        .profiles()
        .iter()
        .map(|p| p.structure_id.as_str())
        .collect();
    assert_eq!(ids, expected);
    assert_eq!(output.covered_tracts.len(), 2);
}
