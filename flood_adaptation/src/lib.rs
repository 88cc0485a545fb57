//! Household Flood-Risk Adaptation ABM
//!
//! Each household owns a structure exposed to floods of several return periods
//! and picks the adaptation bundle (elevate, insure, both or neither) that
//! minimises its prospect-theory disutility. A public risk-reduction programme
//! covers the census tracts with the highest mean baseline EAD, and the model
//! compares a pre-FIRM search against a voucher policy.
//!
//! Key pieces:
//! - RateTable: NFIP/private insurance rates by zone and freeboard
//! - risk: risk perception, probability weighting, expected annual damage
//! - Household: single-step search over elevation and insurance options
//! - PopulationContext: baseline EAD, tract ranking, risk-reduction eligibility
//! - Simulation: setup, then every household decides once
//!
//! A run is one decision step: setup completes for the whole population, then
//! every household decides independently.

pub mod error;
pub mod experiment;
pub mod financial;
pub mod household;
pub mod input;
pub mod logging;
pub mod output;
pub mod population;
pub mod rate_table;
pub mod risk;
pub mod simulation;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use error::{Result, SimulationError};

/// Return periods (years) of the Houston flood scenarios
pub const DEFAULT_RETURN_PERIODS: [f64; 5] = [5.886, 13.734, 24.7212, 61.803, 200.0];

/// Candidate elevations (feet) searched under the pre-FIRM policy
pub const ELEVATION_OPTIONS: [f64; 5] = [0.0, 2.0, 4.0, 6.0, 8.0];

pub const NFIP_COVERAGE_OPTIONS: [f64; 3] = [60_000.0, 150_000.0, 250_000.0];
pub const PRIVATE_COVERAGE_OPTIONS: [f64; 3] = [60_000.0, 250_000.0, 500_000.0];

/// Adaptation policy in force for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Policy {
    /// Elevation and insurance are both searched; homeowner finances elevation
    #[serde(rename = "pre_FIRM")]
    PreFirm,
    /// Elevation fixed at one foot above BFE; only NFIP coverage is searched
    #[serde(rename = "voucher")]
    Voucher,
}

impl Policy {
    pub fn label(&self) -> &'static str {
        match self {
            Policy::PreFirm => "pre_FIRM",
            Policy::Voucher => "voucher",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which market a policy is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsuranceKind {
    #[serde(rename = "No insurance")]
    None,
    #[serde(rename = "NFIP")]
    Nfip,
    #[serde(rename = "private")]
    Private,
}

impl InsuranceKind {
    pub fn label(&self) -> &'static str {
        match self {
            InsuranceKind::None => "No insurance",
            InsuranceKind::Nfip => "NFIP",
            InsuranceKind::Private => "private",
        }
    }
}

impl fmt::Display for InsuranceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Selects the depth-damage curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingType {
    Residential,
    NonResidential,
}

impl BuildingType {
    /// "residential" selects the residential curve; every other label is
    /// treated as non-residential
    pub fn from_label(label: &str) -> Self {
        if label.trim() == "residential" {
            BuildingType::Residential
        } else {
            BuildingType::NonResidential
        }
    }
}

/// Model-wide configuration consumed by setup and every household
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Ascending return periods shared by every flood exposure
    pub return_periods: Vec<f64>,
    pub policy: Policy,
    /// Community Rating System discount applied to NFIP rates
    pub crs_reward: f64,
    /// Number of top-EAD census tracts in the risk-reduction programme
    pub covered_census_tracts: usize,
    /// Damage reduction granted to structures in covered tracts
    pub risk_reduction_percentage: f64,

    pub elevation_options: Vec<f64>,
    pub nfip_coverage_options: Vec<f64>,
    pub private_coverage_options: Vec<f64>,
}

impl ModelConfig {
    /// Houston study settings: pre-FIRM, CRS 25%, no covered tracts
    pub fn baseline() -> Self {
        ModelConfig {
            return_periods: DEFAULT_RETURN_PERIODS.to_vec(),
            policy: Policy::PreFirm,
            crs_reward: 0.25,
            covered_census_tracts: 0,
            risk_reduction_percentage: 0.25,
            elevation_options: ELEVATION_OPTIONS.to_vec(),
            nfip_coverage_options: NFIP_COVERAGE_OPTIONS.to_vec(),
            private_coverage_options: PRIVATE_COVERAGE_OPTIONS.to_vec(),
        }
    }

    /// Baseline with the voucher policy
    pub fn voucher() -> Self {
        ModelConfig {
            policy: Policy::Voucher,
            ..Self::baseline()
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_covered_census_tracts(mut self, covered_census_tracts: usize) -> Self {
        self.covered_census_tracts = covered_census_tracts;
        self
    }

    /// Check every model-wide parameter before any agent is built
    pub fn validate(&self) -> Result<()> {
        if self.return_periods.is_empty() {
            return Err(SimulationError::Configuration(
                "return_periods must contain at least one entry".to_string(),
            ));
        }
        if let Some(rp) = self
            .return_periods
            .iter()
            .find(|rp| !rp.is_finite() || **rp <= 0.0)
        {
            return Err(SimulationError::Configuration(format!(
                "return period {} must be finite and positive",
                rp
            )));
        }
        // 1/rp must fall strictly so every trapezoid of the EAD integral is non-negative
        if let Some(pair) = self.return_periods.windows(2).find(|w| w[1] <= w[0]) {
            return Err(SimulationError::Configuration(format!(
                "return_periods must be strictly ascending, found {} followed by {}",
                pair[0], pair[1]
            )));
        }
        if !(0.0..1.0).contains(&self.crs_reward) {
            return Err(SimulationError::Configuration(format!(
                "crs_reward {} must lie in [0, 1)",
                self.crs_reward
            )));
        }
        if !(0.0..=1.0).contains(&self.risk_reduction_percentage) {
            return Err(SimulationError::Configuration(format!(
                "risk_reduction_percentage {} must lie in [0, 1]",
                self.risk_reduction_percentage
            )));
        }
        for (name, options) in [
            ("elevation_options", &self.elevation_options),
            ("nfip_coverage_options", &self.nfip_coverage_options),
            ("private_coverage_options", &self.private_coverage_options),
        ] {
            if options.is_empty() {
                return Err(SimulationError::Configuration(format!(
                    "{} must not be empty",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig::baseline()
    }
}
