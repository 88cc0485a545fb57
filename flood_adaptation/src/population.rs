//! Population-wide setup run before any household decides
//!
//! Computes every structure's physical baseline EAD, ranks census tracts by
//! their mean baseline EAD and assigns public risk reduction to the top
//! `covered_census_tracts`. The result is an immutable [`PopulationContext`]
//! read by every household.

use crate::input::StructureProfile;
use crate::risk::{prospect_utility_action, ActionScenario, EvaluationMode};
use crate::{ModelConfig, Result, SimulationError};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Public protection assigned to one structure
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskAssignment {
    /// EAD with no adaptation and no public protection
    pub baseline_ead: f64,
    /// Share of damage removed by the public programme, 0 outside covered tracts
    pub public_risk_reduction: f64,
}

/// Mean baseline EAD of one census tract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TractRisk {
    pub geoid: String,
    pub mean_baseline_ead: f64,
    pub num_structures: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopulationContext {
    /// One entry per structure, in input order
    assignments: Vec<RiskAssignment>,
    /// Tracts sorted by descending mean baseline EAD
    tract_ranking: Vec<TractRisk>,
    covered_tracts: Vec<String>,
    max_baseline_ead: f64,
}

impl PopulationContext {
    /// Run the setup phase for a validated population
    pub fn setup(profiles: &[StructureProfile], config: &ModelConfig) -> Result<Self> {
        config.validate()?;

        for profile in profiles {
            if profile.flood_elevations.len() != config.return_periods.len() {
                return Err(SimulationError::Configuration(format!(
                    "structure {} has {} flood elevations but {} return periods are configured",
                    profile.structure_id,
                    profile.flood_elevations.len(),
                    config.return_periods.len()
                )));
            }
        }

        let baseline_eads = profiles
            .par_iter()
            .map(|profile| baseline_ead(profile, &config.return_periods))
            .collect::<Result<Vec<f64>>>()?;

        let tract_ranking = rank_tracts(profiles, &baseline_eads);
        let covered_tracts: Vec<String> = tract_ranking
            .iter()
            .take(config.covered_census_tracts)
            .map(|tract| tract.geoid.clone())
            .collect();
        let covered: HashSet<&str> = covered_tracts.iter().map(String::as_str).collect();

        let assignments: Vec<RiskAssignment> = profiles
            .iter()
            .zip(&baseline_eads)
            .map(|(profile, &baseline_ead)| RiskAssignment {
                baseline_ead,
                public_risk_reduction: if covered.contains(profile.geoid.as_str()) {
                    config.risk_reduction_percentage
                } else {
                    0.0
                },
            })
            .collect();

        let max_baseline_ead = baseline_eads.iter().copied().fold(0.0, f64::max);

        let num_covered = assignments
            .iter()
            .filter(|a| a.public_risk_reduction > 0.0)
            .count();
        info!(
            structures = profiles.len(),
            tracts = tract_ranking.len(),
            covered_tracts = covered_tracts.len(),
            covered_structures = num_covered,
            max_baseline_ead,
            "population setup complete"
        );
        for tract in tract_ranking.iter().take(config.covered_census_tracts) {
            debug!(
                geoid = %tract.geoid,
                mean_baseline_ead = tract.mean_baseline_ead,
                structures = tract.num_structures,
                "tract covered by risk reduction"
            );
        }

        Ok(PopulationContext {
            assignments,
            tract_ranking,
            covered_tracts,
            max_baseline_ead,
        })
    }

    pub fn assignments(&self) -> &[RiskAssignment] {
        &self.assignments
    }

    pub fn assignment(&self, index: usize) -> Option<&RiskAssignment> {
        self.assignments.get(index)
    }

    pub fn tract_ranking(&self) -> &[TractRisk] {
        &self.tract_ranking
    }

    pub fn covered_tracts(&self) -> &[String] {
        &self.covered_tracts
    }

    /// Largest per-structure baseline EAD in the population
    pub fn max_baseline_ead(&self) -> f64 {
        self.max_baseline_ead
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Physical EAD of a structure with no behaviour, cost or protection
pub fn baseline_ead(profile: &StructureProfile, return_periods: &[f64]) -> Result<f64> {
    let scenario = ActionScenario::physical_baseline(
        profile.property_height,
        profile.building_type,
        profile.house_value,
    );
    let evaluation = prospect_utility_action(
        &profile.flood_elevations,
        return_periods,
        &scenario,
        EvaluationMode::EadOnly,
    )?;
    Ok(evaluation.ead)
}

/// Group structures by GEOID and sort tracts by descending mean EAD
///
/// Ties are broken by GEOID so the ranking does not depend on input order.
pub fn rank_tracts(profiles: &[StructureProfile], baseline_eads: &[f64]) -> Vec<TractRisk> {
    let mut totals: HashMap<&str, (f64, usize)> = HashMap::new();
    for (profile, &ead) in profiles.iter().zip(baseline_eads) {
        let entry = totals.entry(profile.geoid.as_str()).or_insert((0.0, 0));
        entry.0 += ead;
        entry.1 += 1;
    }

    let mut ranking: Vec<TractRisk> = totals
        .into_iter()
        .map(|(geoid, (sum, count))| TractRisk {
            geoid: geoid.to_string(),
            mean_baseline_ead: sum / count as f64,
            num_structures: count,
        })
        .collect();

    ranking.sort_by(|a, b| {
        b.mean_baseline_ead
            .total_cmp(&a.mean_baseline_ead)
            .then_with(|| a.geoid.cmp(&b.geoid))
    });
    ranking
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::IncomeBracket;
    use crate::BuildingType;
    use approx::assert_relative_eq;

    fn profile(id: &str, geoid: &str, height: f64) -> StructureProfile {
        StructureProfile {
            structure_id: id.to_string(),
            mortgage: false,
            income: IncomeBracket::From60kTo75k,
            minority: false,
            education: 12,
            owner_occupied: true,
            flood_elevations: vec![8.0, 10.0, 12.0, 14.0, 16.0],
            flood_zone: "AE".to_string(),
            property_height: height,
            area: 1500.0,
            building_type: BuildingType::Residential,
            house_value: 200_000.0,
            bfe: 12.0,
            geoid: geoid.to_string(),
        }
    }

    fn population() -> Vec<StructureProfile> {
        vec![
            profile("a1", "tract-a", 6.0),
            profile("a2", "tract-a", 7.0),
            profile("b1", "tract-b", 14.0),
            profile("c1", "tract-c", 10.0),
            profile("c2", "tract-c", 11.0),
        ]
    }

    #[test]
    fn test_baseline_ead_ignores_behaviour() {
        let config = ModelConfig::baseline();
        let p = profile("x", "t", 9.0);
        let ead = baseline_ead(&p, &config.return_periods).unwrap();
        assert!(ead > 0.0);
    }

    #[test]
    fn test_lower_structures_rank_higher() {
        let config = ModelConfig::baseline().with_covered_census_tracts(1);
        let context = PopulationContext::setup(&population(), &config).unwrap();

        let ranking = context.tract_ranking();
        assert_eq!(ranking.len(), 3);
        assert_eq!(ranking[0].geoid, "tract-a");
        assert_eq!(ranking[2].geoid, "tract-b");
        assert!(ranking
            .windows(2)
            .all(|w| w[0].mean_baseline_ead >= w[1].mean_baseline_ead));
        assert_eq!(ranking[0].num_structures, 2);
    }

    #[test]
    fn test_tract_mean_is_average_of_structures() {
        let config = ModelConfig::baseline();
        let profiles = population();
        let context = PopulationContext::setup(&profiles, &config).unwrap();

        let a = &context.tract_ranking()[0];
        let expected = (context.assignments()[0].baseline_ead
            + context.assignments()[1].baseline_ead)
            / 2.0;
        assert_relative_eq!(a.mean_baseline_ead, expected);
    }

    #[test]
    fn test_top_tract_receives_reduction() {
        let config = ModelConfig::baseline().with_covered_census_tracts(1);
        let context = PopulationContext::setup(&population(), &config).unwrap();

        let reductions: Vec<f64> = context
            .assignments()
            .iter()
            .map(|a| a.public_risk_reduction)
            .collect();
        assert_eq!(reductions, vec![0.25, 0.25, 0.0, 0.0, 0.0]);
        assert_eq!(context.covered_tracts(), ["tract-a".to_string()]);
    }

    #[test]
    fn test_zero_covered_tracts_means_no_reduction() {
        let config = ModelConfig::baseline().with_covered_census_tracts(0);
        let context = PopulationContext::setup(&population(), &config).unwrap();

        assert!(context.covered_tracts().is_empty());
        assert!(context
            .assignments()
            .iter()
            .all(|a| a.public_risk_reduction == 0.0));
    }

    #[test]
    fn test_more_tracts_than_exist_covers_everyone() {
        let config = ModelConfig::baseline().with_covered_census_tracts(50);
        let context = PopulationContext::setup(&population(), &config).unwrap();
        assert_eq!(context.covered_tracts().len(), 3);
        assert!(context
            .assignments()
            .iter()
            .all(|a| a.public_risk_reduction == 0.25));
    }

    #[test]
    fn test_max_baseline_ead_is_per_structure() {
        let config = ModelConfig::baseline();
        let context = PopulationContext::setup(&population(), &config).unwrap();

        let max = context
            .assignments()
            .iter()
            .map(|a| a.baseline_ead)
            .fold(0.0, f64::max);
        assert_eq!(context.max_baseline_ead(), max);
        // a1 sits lowest, so it is the worst structure
        assert_eq!(context.max_baseline_ead(), context.assignments()[0].baseline_ead);
    }

    #[test]
    fn test_exposure_length_mismatch_is_configuration_error() {
        let mut profiles = population();
        profiles[3].flood_elevations.pop();
        let result = PopulationContext::setup(&profiles, &ModelConfig::baseline());

        match result {
            Err(SimulationError::Configuration(msg)) => assert!(msg.contains("c1")),
            other => panic!("Expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_ranking_tie_broken_by_geoid() {
        let profiles = vec![profile("z", "tract-z", 9.0), profile("y", "tract-y", 9.0)];
        let ranking = rank_tracts(&profiles, &[100.0, 100.0]);
        assert_eq!(ranking[0].geoid, "tract-y");
        assert_eq!(ranking[1].geoid, "tract-z");
    }

    #[test]
    fn test_empty_population() {
        let context = PopulationContext::setup(&[], &ModelConfig::baseline()).unwrap();
        assert!(context.is_empty());
        assert_eq!(context.max_baseline_ead(), 0.0);
    }
}
