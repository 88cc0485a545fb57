//! Single-step adaptation run
//!
//! Setup → every household decides once → summary. Households never read
//! each other's choices, so decisions run in parallel and are collected in
//! input order.

use crate::household::{DecisionContext, DecisionResult, Household};
use crate::input::StructureProfile;
use crate::population::PopulationContext;
use crate::rate_table::RateTable;
use crate::{InsuranceKind, ModelConfig, Policy, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

pub struct Simulation {
    config: ModelConfig,
    rates: RateTable,
    profiles: Vec<StructureProfile>,
    population: PopulationContext,
}

impl Simulation {
    /// Validate the configuration and run population setup
    pub fn new(
        config: ModelConfig,
        rates: RateTable,
        profiles: Vec<StructureProfile>,
    ) -> Result<Self> {
        let population = PopulationContext::setup(&profiles, &config)?;
        Ok(Simulation {
            config,
            rates,
            profiles,
            population,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn profiles(&self) -> &[StructureProfile] {
        &self.profiles
    }

    pub fn population(&self) -> &PopulationContext {
        &self.population
    }

    fn decision_context(&self) -> DecisionContext<'_> {
        DecisionContext {
            model: &self.config,
            rates: &self.rates,
            max_baseline_ead: self.population.max_baseline_ead(),
        }
    }

    /// One household per structure, in input order
    pub fn households(&self) -> impl Iterator<Item = Household<'_>> + '_ {
        let context = self.decision_context();
        self.profiles
            .iter()
            .zip(self.population.assignments())
            .map(move |(profile, assignment)| Household::new(profile, *assignment, context))
    }

    /// Let every household decide; the first failure aborts the run
    pub fn run(&self) -> Result<SimulationResult> {
        let context = self.decision_context();
        let decisions = self
            .profiles
            .par_iter()
            .zip(self.population.assignments().par_iter())
            .map(|(profile, assignment)| Household::new(profile, *assignment, context).decide())
            .collect::<Result<Vec<DecisionResult>>>()?;

        let summary = RunSummary::from_decisions(&decisions);
        info!(
            policy = %self.config.policy,
            covered_census_tracts = self.config.covered_census_tracts,
            households = summary.num_households,
            total_ead = summary.total_ead,
            total_ead_no_action = summary.total_ead_no_action,
            insured = summary.num_nfip + summary.num_private,
            elevated = summary.num_elevated,
            "run complete"
        );

        Ok(SimulationResult {
            policy: self.config.policy,
            covered_census_tracts: self.config.covered_census_tracts,
            decisions,
            summary,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub policy: Policy,
    pub covered_census_tracts: usize,
    pub decisions: Vec<DecisionResult>,
    pub summary: RunSummary,
}

/// Aggregate outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub num_households: usize,
    pub total_ead: f64,
    pub total_ead_no_action: f64,
    pub total_baseline_ead: f64,
    pub mean_ead: f64,
    /// No-action EAD minus chosen-action EAD, summed
    pub ead_reduction: f64,
    pub ead_reduction_fraction: f64,
    pub num_nfip: usize,
    pub num_private: usize,
    pub num_uninsured: usize,
    pub num_elevated: usize,
    pub mean_elevation: f64,
    pub total_coverage: f64,
    pub num_publicly_protected: usize,
    pub num_mandated: usize,
}

impl RunSummary {
    pub fn from_decisions(decisions: &[DecisionResult]) -> Self {
        let n = decisions.len();
        let total_ead: f64 = decisions.iter().map(|d| d.ead).sum();
        let total_ead_no_action: f64 = decisions.iter().map(|d| d.ead_no_action).sum();
        let total_baseline_ead: f64 = decisions.iter().map(|d| d.baseline_ead).sum();
        let count_kind = |kind: InsuranceKind| {
            decisions
                .iter()
                .filter(|d| d.insurance_type == kind)
                .count()
        };

        let ead_reduction = total_ead_no_action - total_ead;
        let mean = |total: f64| if n > 0 { total / n as f64 } else { 0.0 };

        RunSummary {
            num_households: n,
            total_ead,
            total_ead_no_action,
            total_baseline_ead,
            mean_ead: mean(total_ead),
            ead_reduction,
            ead_reduction_fraction: if total_ead_no_action > 0.0 {
                ead_reduction / total_ead_no_action
            } else {
                0.0
            },
            num_nfip: count_kind(InsuranceKind::Nfip),
            num_private: count_kind(InsuranceKind::Private),
            num_uninsured: count_kind(InsuranceKind::None),
            num_elevated: decisions.iter().filter(|d| d.is_elevated()).count(),
            mean_elevation: mean(decisions.iter().map(|d| d.elevation).sum()),
            total_coverage: decisions.iter().map(|d| d.insurance_coverage).sum(),
            num_publicly_protected: decisions
                .iter()
                .filter(|d| d.public_risk_reduction > 0.0)
                .count(),
            num_mandated: decisions.iter().filter(|d| d.require_insurance).count(),
        }
    }
}
