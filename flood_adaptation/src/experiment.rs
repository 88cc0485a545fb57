//! TOML experiment descriptions
//!
//! An experiment names a structure file, optional model overrides and a sweep
//! over policies × covered-tract counts. Every sweep point is a full
//! single-step run over the same loaded population.

use crate::input::LoadedPopulation;
use crate::output::SimulationOutput;
use crate::rate_table::RateTable;
use crate::simulation::{RunSummary, Simulation};
use crate::{ModelConfig, Policy, Result, SimulationError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Tract counts swept when the file does not list any
pub const DEFAULT_TRACT_COUNTS: [usize; 4] = [0, 10, 25, 50];

/// Top-level experiment configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    pub experiment: ExperimentMetadata,
    #[serde(default)]
    pub model: ModelOverrides,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Structure CSV
    pub structures: PathBuf,
    /// Rate-table CSV; the built-in table when absent
    pub rate_table: Option<PathBuf>,
}

/// Values replacing the baseline; anything left out keeps its default
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelOverrides {
    pub return_periods: Option<Vec<f64>>,
    pub crs_reward: Option<f64>,
    pub risk_reduction_percentage: Option<f64>,
    pub elevation_options: Option<Vec<f64>>,
    pub nfip_coverage_options: Option<Vec<f64>>,
    pub private_coverage_options: Option<Vec<f64>>,
}

impl ModelOverrides {
    pub fn to_model_config(&self) -> ModelConfig {
        let base = ModelConfig::baseline();
        ModelConfig {
            return_periods: self
                .return_periods
                .clone()
                .unwrap_or(base.return_periods),
            crs_reward: self.crs_reward.unwrap_or(base.crs_reward),
            risk_reduction_percentage: self
                .risk_reduction_percentage
                .unwrap_or(base.risk_reduction_percentage),
            elevation_options: self
                .elevation_options
                .clone()
                .unwrap_or(base.elevation_options),
            nfip_coverage_options: self
                .nfip_coverage_options
                .clone()
                .unwrap_or(base.nfip_coverage_options),
            private_coverage_options: self
                .private_coverage_options
                .clone()
                .unwrap_or(base.private_coverage_options),
            ..base
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_policies")]
    pub policies: Vec<Policy>,
    #[serde(default = "default_tract_counts")]
    pub covered_census_tracts: Vec<usize>,
}

fn default_policies() -> Vec<Policy> {
    vec![Policy::PreFirm, Policy::Voucher]
}

fn default_tract_counts() -> Vec<usize> {
    DEFAULT_TRACT_COUNTS.to_vec()
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            policies: default_policies(),
            covered_census_tracts: default_tract_counts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "enabled")]
    pub save_households: bool,
    #[serde(default = "enabled")]
    pub save_summary: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

fn enabled() -> bool {
    true
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            dir: default_output_dir(),
            save_households: true,
            save_summary: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
        }
    }
}

impl ExperimentConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ExperimentConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sweep.policies.is_empty() {
            return Err(SimulationError::Configuration(
                "sweep.policies must not be empty".to_string(),
            ));
        }
        if self.sweep.covered_census_tracts.is_empty() {
            return Err(SimulationError::Configuration(
                "sweep.covered_census_tracts must not be empty".to_string(),
            ));
        }
        self.model.to_model_config().validate()
    }

    /// Baseline with the `[model]` overrides applied
    pub fn base_model_config(&self) -> ModelConfig {
        self.model.to_model_config()
    }

    /// One configuration per sweep point, policy-major
    pub fn sweep_configs(&self) -> Vec<ModelConfig> {
        let base = self.base_model_config();
        let mut configs = Vec::new();
        for &policy in &self.sweep.policies {
            for &tracts in &self.sweep.covered_census_tracts {
                configs.push(
                    base.clone()
                        .with_policy(policy)
                        .with_covered_census_tracts(tracts),
                );
            }
        }
        configs
    }

    pub fn load_rate_table(&self) -> Result<RateTable> {
        match &self.experiment.rate_table {
            Some(path) => RateTable::from_path(path),
            None => RateTable::builtin(),
        }
    }

    /// Directory receiving every file of this experiment
    pub fn output_dir(&self) -> PathBuf {
        self.output.dir.join(&self.experiment.name)
    }
}

/// Run every sweep point over the same population
pub fn run_sweep(
    configs: &[ModelConfig],
    rates: &RateTable,
    population: &LoadedPopulation,
) -> Result<Vec<SimulationOutput>> {
    let mut outputs = Vec::with_capacity(configs.len());
    for (idx, config) in configs.iter().enumerate() {
        info!(
            point = idx + 1,
            of = configs.len(),
            policy = %config.policy,
            covered_census_tracts = config.covered_census_tracts,
            "starting sweep point"
        );
        let simulation =
            Simulation::new(config.clone(), rates.clone(), population.profiles.clone())?;
        let result = simulation.run()?;
        outputs.push(SimulationOutput::new(
            &simulation,
            &result,
            population.rejected.len(),
        )?);
    }
    Ok(outputs)
}

/// One row of the sweep summary
#[derive(Debug, Clone, Serialize)]
pub struct SweepEntry {
    pub policy: Policy,
    pub covered_census_tracts: usize,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub name: String,
    pub description: String,
    pub timestamp: String,
    pub num_structures: usize,
    pub num_rejected: usize,
    pub runs: Vec<SweepEntry>,
}

impl SweepSummary {
    pub fn from_outputs(config: &ExperimentConfig, outputs: &[SimulationOutput]) -> Self {
        let (num_structures, num_rejected) = outputs
            .first()
            .map(|o| (o.metadata.num_structures, o.metadata.num_rejected))
            .unwrap_or((0, 0));

        SweepSummary {
            name: config.experiment.name.clone(),
            description: config.experiment.description.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            num_structures,
            num_rejected,
            runs: outputs
                .iter()
                .map(|o| SweepEntry {
                    policy: o.metadata.config.policy,
                    covered_census_tracts: o.metadata.config.covered_census_tracts,
                    summary: o.summary.clone(),
                })
                .collect(),
        }
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
