//! Risk perception and prospect-theory utility
//!
//! A household's perception in [0, 1] distorts the objective flood
//! probabilities before the probability-weighting function is applied. The
//! weighted disutility of each flood scenario is summed into the prospect
//! utility (PU); lower is preferred.

use crate::financial::damage_assessment;
use crate::{BuildingType, Result, SimulationError};

// Weights of the five perception drivers
pub const INCOME_WEIGHT: f64 = 0.15;
pub const RACE_WEIGHT: f64 = 0.15;
pub const EDUCATION_WEIGHT: f64 = 0.2;
pub const OWNERSHIP_WEIGHT: f64 = 0.2;
pub const GOVERNMENT_WEIGHT: f64 = 0.3;

/// Curvature of the probability-weighting function
pub const WEIGHTING_GAMMA: f64 = 0.69;

/// Exponent of the power utility applied to losses
pub const UTILITY_EXPONENT: f64 = 0.88;

/// Government-trust input when the household gets no public risk reduction
pub const BASE_GOVERNMENT_PERCEPTION: f64 = 0.5;

/// Weighted average of five normalised inputs, each in [0, 1]
pub fn risk_perception(
    income: f64,
    race: f64,
    education: f64,
    ownership: f64,
    government: f64,
) -> f64 {
    let total_weight =
        INCOME_WEIGHT + RACE_WEIGHT + EDUCATION_WEIGHT + OWNERSHIP_WEIGHT + GOVERNMENT_WEIGHT;
    (INCOME_WEIGHT * income
        + RACE_WEIGHT * race
        + EDUCATION_WEIGHT * education
        + OWNERSHIP_WEIGHT * ownership
        + GOVERNMENT_WEIGHT * government)
        / total_weight
}

/// Government input to risk perception
///
/// 0.5 without public risk reduction. Covered households scale up to 1.0 with
/// their baseline EAD relative to the worst structure in the population.
pub fn government_perception(
    public_risk_reduction: f64,
    baseline_ead: f64,
    max_baseline_ead: f64,
) -> f64 {
    if public_risk_reduction == 0.0 || max_baseline_ead <= 0.0 {
        return BASE_GOVERNMENT_PERCEPTION;
    }
    BASE_GOVERNMENT_PERCEPTION + baseline_ead / max_baseline_ead * 0.5
}

/// Decision weight for a flood of the given return period
///
/// The annual probability 1/rp is scaled by 10^(2·perception - 1), capped at 1,
/// then passed through w(p) = p^γ / (p^γ + (1-p)^γ)^(1/γ).
pub fn pi_calculation(risk_perception: f64, return_period: f64) -> f64 {
    let probability = 1.0 / return_period;
    let core = (10f64.powf(2.0 * risk_perception - 1.0) * probability).min(1.0);
    probability_weighting(core)
}

/// One-parameter probability-weighting function, p in [0, 1]
pub fn probability_weighting(p: f64) -> f64 {
    let numerator = p.powf(WEIGHTING_GAMMA);
    let denominator = (numerator + (1.0 - p).powf(WEIGHTING_GAMMA)).powf(1.0 / WEIGHTING_GAMMA);
    numerator / denominator
}

/// Power utility of a monetary loss
pub fn utility(damage: f64) -> f64 {
    damage.powf(UTILITY_EXPONENT)
}

/// Trapezoidal EAD over exceedance probabilities 1/rp
///
/// A single scenario integrates as damage / rp.
pub fn expected_annual_damage(damages: &[f64], return_periods: &[f64]) -> f64 {
    match damages {
        [] => 0.0,
        [only] => only / return_periods[0],
        _ => damages
            .windows(2)
            .zip(return_periods.windows(2))
            .map(|(d, rp)| 0.5 * (d[0] + d[1]) * (1.0 / rp[0] - 1.0 / rp[1]))
            .sum(),
    }
}

/// Whether to compute the prospect utility or only the physical EAD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationMode {
    Full,
    EadOnly,
}

/// One candidate action as seen by the utility calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionScenario {
    /// Height of the (possibly elevated) structure
    pub house_elevation: f64,
    pub building_type: BuildingType,
    pub risk_perception: f64,
    /// Elevation financing plus premium, paid every year
    pub total_annual_cost: f64,
    pub house_value: f64,
    pub insurance_coverage: f64,
    pub public_risk_reduction: f64,
}

impl ActionScenario {
    /// No elevation, insurance, cost or public protection
    pub fn physical_baseline(
        house_elevation: f64,
        building_type: BuildingType,
        house_value: f64,
    ) -> Self {
        ActionScenario {
            house_elevation,
            building_type,
            risk_perception: 0.0,
            total_annual_cost: 0.0,
            house_value,
            insurance_coverage: 0.0,
            public_risk_reduction: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionEvaluation {
    /// Present only in [`EvaluationMode::Full`]
    pub prospect_utility: Option<f64>,
    pub ead: f64,
    /// Damage per return period, same order as the return periods
    pub damages: Vec<f64>,
}

/// Evaluate an action against every flood scenario of a structure
pub fn prospect_utility_action(
    flood_elevations: &[f64],
    return_periods: &[f64],
    scenario: &ActionScenario,
    mode: EvaluationMode,
) -> Result<ActionEvaluation> {
    if flood_elevations.is_empty() {
        return Err(SimulationError::Configuration(
            "flood exposure must contain at least one scenario".to_string(),
        ));
    }
    if flood_elevations.len() != return_periods.len() {
        return Err(SimulationError::Configuration(format!(
            "{} flood elevations for {} return periods",
            flood_elevations.len(),
            return_periods.len()
        )));
    }

    let mut damages = Vec::with_capacity(flood_elevations.len());
    let mut pu = 0.0;

    for (&flood_elevation, &return_period) in flood_elevations.iter().zip(return_periods) {
        let flood_height = (flood_elevation - scenario.house_elevation).max(0.0);
        let damage_percentage = damage_assessment(scenario.building_type, flood_height);
        let damage =
            scenario.house_value * damage_percentage * (1.0 - scenario.public_risk_reduction);
        damages.push(damage);

        if mode == EvaluationMode::Full {
            let pi = pi_calculation(scenario.risk_perception, return_period);
            // Coverage never pays more than the loss; cost is paid flood or not
            let loss = (damage - scenario.insurance_coverage).max(0.0) + scenario.total_annual_cost;
            pu += pi * utility(loss);
        }
    }

    let ead = expected_annual_damage(&damages, return_periods);
    let prospect_utility = match mode {
        EvaluationMode::Full => Some(pu),
        EvaluationMode::EadOnly => None,
    };

    Ok(ActionEvaluation {
        prospect_utility,
        ead,
        damages,
    })
}
