//! Household agent: one adaptation decision per run
//!
//! The household first evaluates doing nothing, then scans the candidate
//! actions allowed by the policy in a fixed order, keeping a candidate only
//! when its prospect utility is strictly lower than the best so far.
//!
//! Pre-FIRM: elevation ∈ options × {NFIP, private} × coverage options
//! (plus zero coverage when no insurance is mandated), financed at 4% over
//! 20 years.
//! Voucher: elevation fixed at one foot above BFE, NFIP coverage only,
//! financed at 3% over 30 years and capped by the affordability limit.

use crate::financial::{affordability_cap, elevation_cost, LoanTerms};
use crate::input::StructureProfile;
use crate::population::RiskAssignment;
use crate::rate_table::RateTable;
use crate::risk::{
    government_perception, prospect_utility_action, risk_perception, ActionScenario,
    EvaluationMode,
};
use crate::{InsuranceKind, ModelConfig, Policy, Result};
use serde::Serialize;
use tracing::debug;

/// Model-wide inputs shared read-only by every household
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub model: &'a ModelConfig,
    pub rates: &'a RateTable,
    pub max_baseline_ead: f64,
}

/// One point of the action space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionCandidate {
    /// Feet added to the structure height
    pub elevation: f64,
    pub insurance: InsuranceKind,
    pub coverage: f64,
}

impl ActionCandidate {
    pub const NO_ACTION: ActionCandidate = ActionCandidate {
        elevation: 0.0,
        insurance: InsuranceKind::None,
        coverage: 0.0,
    };
}

/// Outcome of a household's decision step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionResult {
    pub structure_id: String,
    pub prospect_utility: f64,
    pub prospect_utility_no_action: f64,
    pub ead: f64,
    pub ead_no_action: f64,
    pub insurance_type: InsuranceKind,
    pub insurance_coverage: f64,
    pub elevation: f64,
    /// Damage per return period under the chosen action
    pub damages: Vec<f64>,
    pub risk_perception: f64,
    pub require_insurance: bool,
    pub baseline_ead: f64,
    pub public_risk_reduction: f64,
}

impl DecisionResult {
    pub fn is_insured(&self) -> bool {
        self.insurance_type != InsuranceKind::None
    }

    pub fn is_elevated(&self) -> bool {
        self.elevation > 0.0
    }
}

struct BestAction {
    candidate: ActionCandidate,
    prospect_utility: f64,
    ead: f64,
    damages: Vec<f64>,
}

pub struct Household<'a> {
    profile: &'a StructureProfile,
    assignment: RiskAssignment,
    context: DecisionContext<'a>,
    require_insurance: bool,
    risk_perception: f64,
}

impl<'a> Household<'a> {
    pub fn new(
        profile: &'a StructureProfile,
        assignment: RiskAssignment,
        context: DecisionContext<'a>,
    ) -> Self {
        let government = government_perception(
            assignment.public_risk_reduction,
            assignment.baseline_ead,
            context.max_baseline_ead,
        );
        let perception = risk_perception(
            profile.income_scalar(),
            profile.race_indicator(),
            profile.education_scalar(),
            profile.ownership_indicator(),
            government,
        );

        Household {
            profile,
            assignment,
            context,
            require_insurance: profile.requires_insurance(),
            risk_perception: perception,
        }
    }

    pub fn structure_id(&self) -> &str {
        &self.profile.structure_id
    }

    pub fn risk_perception(&self) -> f64 {
        self.risk_perception
    }

    pub fn require_insurance(&self) -> bool {
        self.require_insurance
    }

    /// Elevation that puts the structure one foot above BFE
    pub fn voucher_elevation(&self) -> f64 {
        (self.profile.bfe - self.profile.property_height + 1.0).max(0.0)
    }

    fn loan_terms(&self) -> LoanTerms {
        match self.context.model.policy {
            Policy::PreFirm => LoanTerms::PRE_FIRM,
            Policy::Voucher => LoanTerms::VOUCHER,
        }
    }

    /// Candidate actions in evaluation order
    ///
    /// Order matters: on exact ties the first candidate found is kept.
    pub fn candidates(&self) -> Vec<ActionCandidate> {
        let model = self.context.model;
        match model.policy {
            Policy::Voucher => {
                let elevation = self.voucher_elevation();
                model
                    .nfip_coverage_options
                    .iter()
                    .map(|&coverage| ActionCandidate {
                        elevation,
                        insurance: InsuranceKind::Nfip,
                        coverage,
                    })
                    .collect()
            }
            Policy::PreFirm => {
                let mut candidates = Vec::new();
                for &elevation in &model.elevation_options {
                    for insurance in [InsuranceKind::Nfip, InsuranceKind::Private] {
                        let options = match insurance {
                            InsuranceKind::Private => &model.private_coverage_options,
                            _ => &model.nfip_coverage_options,
                        };
                        let zero = (!self.require_insurance).then_some(0.0);
                        for coverage in options.iter().copied().chain(zero) {
                            candidates.push(ActionCandidate {
                                elevation,
                                insurance,
                                coverage,
                            });
                        }
                    }
                }
                candidates
            }
        }
    }

    /// Elevation financing plus premium for one candidate
    pub fn annual_cost(&self, candidate: &ActionCandidate) -> Result<f64> {
        let profile = self.profile;
        let model = self.context.model;

        let financing = self
            .loan_terms()
            .annual_payment(elevation_cost(candidate.elevation, profile.area));
        let freeboard = profile.property_height + candidate.elevation - profile.bfe;
        let rate = self.context.rates.insurance_rate(
            candidate.insurance,
            &profile.flood_zone,
            freeboard,
            model.crs_reward,
        )?;
        let total = rate.building_premium(candidate.coverage) + financing;

        Ok(match model.policy {
            Policy::Voucher => total.min(affordability_cap(profile.income.annual_income())),
            Policy::PreFirm => total,
        })
    }

    fn evaluate(&self, candidate: &ActionCandidate, total_annual_cost: f64) -> Result<BestAction> {
        let scenario = ActionScenario {
            house_elevation: self.profile.property_height + candidate.elevation,
            building_type: self.profile.building_type,
            risk_perception: self.risk_perception,
            total_annual_cost,
            house_value: self.profile.house_value,
            insurance_coverage: candidate.coverage,
            public_risk_reduction: self.assignment.public_risk_reduction,
        };
        let evaluation = prospect_utility_action(
            &self.profile.flood_elevations,
            &self.context.model.return_periods,
            &scenario,
            EvaluationMode::Full,
        )?;
        Ok(BestAction {
            candidate: *candidate,
            prospect_utility: evaluation.prospect_utility.unwrap_or(f64::INFINITY),
            ead: evaluation.ead,
            damages: evaluation.damages,
        })
    }

    /// Run the decision step; consuming the household makes it one-shot
    pub fn decide(self) -> Result<DecisionResult> {
        let structure_id = self.profile.structure_id.clone();
        self.search().map_err(|e| e.for_household(structure_id))
    }

    fn search(self) -> Result<DecisionResult> {
        let no_action = self.evaluate(&ActionCandidate::NO_ACTION, 0.0)?;
        let prospect_utility_no_action = no_action.prospect_utility;
        let ead_no_action = no_action.ead;
        let mut best = no_action;

        for candidate in self.candidates() {
            let cost = self.annual_cost(&candidate)?;
            let evaluated = self.evaluate(&candidate, cost)?;
            if evaluated.prospect_utility < best.prospect_utility {
                best = evaluated;
            }
        }

        // A zero-coverage policy is no insurance at all
        let (insurance_type, insurance_coverage) = if best.candidate.coverage > 0.0 {
            (best.candidate.insurance, best.candidate.coverage)
        } else {
            (InsuranceKind::None, 0.0)
        };

        debug!(
            structure_id = %self.profile.structure_id,
            pu = best.prospect_utility,
            pu_no_action = prospect_utility_no_action,
            ead = best.ead,
            insurance = %insurance_type,
            coverage = insurance_coverage,
            elevation = best.candidate.elevation,
            "household decided"
        );

        Ok(DecisionResult {
            structure_id: self.profile.structure_id.clone(),
            prospect_utility: best.prospect_utility,
            prospect_utility_no_action,
            ead: best.ead,
            ead_no_action,
            insurance_type,
            insurance_coverage,
            elevation: best.candidate.elevation,
            damages: best.damages,
            risk_perception: self.risk_perception,
            require_insurance: self.require_insurance,
            baseline_ead: self.assignment.baseline_ead,
            public_risk_reduction: self.assignment.public_risk_reduction,
        })
    }
}
