//! Result export for analysis and mapping
//!
//! One CSV row per household (joinable to the structure file on
//! `structure_id`) and a JSON summary carrying the run configuration.

use crate::household::DecisionResult;
use crate::input::StructureProfile;
use crate::population::TractRisk;
use crate::simulation::{RunSummary, Simulation, SimulationResult};
use crate::{ModelConfig, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level container for one run's output
#[derive(Debug, Clone, Serialize)]
pub struct SimulationOutput {
    pub metadata: RunMetadata,
    pub summary: RunSummary,
    pub covered_tracts: Vec<TractRisk>,
    #[serde(skip)]
    pub households: Vec<HouseholdRecord>,
}

/// Metadata for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub config: ModelConfig,
    pub num_structures: usize,
    pub num_rejected: usize,
    pub max_baseline_ead: f64,
    pub timestamp: String,
}

/// Flat per-household row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdRecord {
    pub structure_id: String,
    #[serde(rename = "GEOID")]
    pub geoid: String,
    pub baseline_ead: f64,
    pub public_risk_reduction: f64,
    pub risk_perception: f64,
    pub require_insurance: bool,
    #[serde(rename = "PU")]
    pub pu: f64,
    #[serde(rename = "PU_no_action")]
    pub pu_no_action: f64,
    #[serde(rename = "EAD")]
    pub ead: f64,
    #[serde(rename = "EAD_no_action")]
    pub ead_no_action: f64,
    pub insurance_type: String,
    pub insurance_coverage: f64,
    pub elevation: f64,
    /// JSON list, same layout as the input flood_elevation_list
    pub damage_list: String,
}

impl HouseholdRecord {
    pub fn new(profile: &StructureProfile, decision: &DecisionResult) -> Result<Self> {
        Ok(HouseholdRecord {
            structure_id: decision.structure_id.clone(),
            geoid: profile.geoid.clone(),
            baseline_ead: decision.baseline_ead,
            public_risk_reduction: decision.public_risk_reduction,
            risk_perception: decision.risk_perception,
            require_insurance: decision.require_insurance,
            pu: decision.prospect_utility,
            pu_no_action: decision.prospect_utility_no_action,
            ead: decision.ead,
            ead_no_action: decision.ead_no_action,
            insurance_type: decision.insurance_type.label().to_string(),
            insurance_coverage: decision.insurance_coverage,
            elevation: decision.elevation,
            damage_list: serde_json::to_string(&decision.damages)?,
        })
    }
}

impl SimulationOutput {
    /// Pair each decision with its input structure
    pub fn new(
        simulation: &Simulation,
        result: &SimulationResult,
        num_rejected: usize,
    ) -> Result<Self> {
        let households = simulation
            .profiles()
            .iter()
            .zip(&result.decisions)
            .map(|(profile, decision)| HouseholdRecord::new(profile, decision))
            .collect::<Result<Vec<_>>>()?;

        let population = simulation.population();
        let covered_tracts = population
            .tract_ranking()
            .iter()
            .take(population.covered_tracts().len())
            .cloned()
            .collect();

        Ok(SimulationOutput {
            metadata: RunMetadata {
                config: simulation.config().clone(),
                num_structures: simulation.profiles().len(),
                num_rejected,
                max_baseline_ead: population.max_baseline_ead(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
            summary: result.summary.clone(),
            covered_tracts,
            households,
        })
    }

    /// `{policy}_{covered tracts}`, the suffix shared by this run's files
    pub fn run_label(&self) -> String {
        format!(
            "{}_{}",
            self.metadata.config.policy, self.metadata.config.covered_census_tracts
        )
    }

    pub fn write_household_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        for record in &self.households {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write summary JSON with metadata and covered tracts
    pub fn write_summary_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Write both files into a directory
    ///
    /// Creates:
    /// - result_{policy}_{tracts}.csv
    /// - summary_{policy}_{tracts}.json
    pub fn write_all<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let label = self.run_label();
        let csv_path = dir.join(format!("result_{}.csv", label));
        let json_path = dir.join(format!("summary_{}.json", label));
        self.write_household_csv(&csv_path)?;
        self.write_summary_json(&json_path)?;

        Ok(vec![csv_path, json_path])
    }
}
