//! Cost and damage curves used by the household decision

use crate::BuildingType;

pub const FEET_TO_METERS: f64 = 0.3048;

/// Share of monthly income a household will spend on adaptation under the
/// voucher policy
pub const AFFORDABILITY_SHARE: f64 = 0.05;

/// Fixed-rate amortised loan used to finance elevation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanTerms {
    pub rate: f64,
    pub years: u32,
}

impl LoanTerms {
    /// Homeowner-financed elevation (pre-FIRM policy)
    pub const PRE_FIRM: LoanTerms = LoanTerms {
        rate: 0.04,
        years: 20,
    };

    /// Voucher-subsidised elevation
    pub const VOUCHER: LoanTerms = LoanTerms {
        rate: 0.03,
        years: 30,
    };

    /// Level annual payment that repays `principal` over the term
    ///
    /// Formula: P = r × PV / (1 - (1 + r)^-n), or PV / n when r = 0
    pub fn annual_payment(&self, principal: f64) -> f64 {
        if principal == 0.0 || self.years == 0 {
            return 0.0;
        }
        let n = self.years as f64;
        if self.rate == 0.0 {
            return principal / n;
        }
        self.rate * principal / (1.0 - (1.0 + self.rate).powf(-n))
    }
}

/// Cost of raising a structure by `elevation` feet
///
/// $17/sq ft up to two feet, then $0.75/sq ft for every further foot.
pub fn elevation_cost(elevation: f64, area: f64) -> f64 {
    if elevation <= 0.0 {
        0.0
    } else if elevation <= 2.0 {
        17.0 * area
    } else {
        (17.0 + 0.75 * (elevation - 2.0)) * area
    }
}

/// Depth-damage curve: fraction of structure value lost at a flood depth
///
/// Depth is given in feet and evaluated in metres. The cubic is not capped at
/// 1.0, so extreme depths can exceed the structure value.
pub fn damage_assessment(building_type: BuildingType, flood_height_feet: f64) -> f64 {
    let h = FEET_TO_METERS * flood_height_feet;
    let percent = match building_type {
        BuildingType::Residential => 0.2391 * h.powi(3) - 3.5524 * h.powi(2) + 19.933 * h + 11.623,
        BuildingType::NonResidential => {
            -0.1347 * h.powi(3) + 1.1448 * h.powi(2) + 9.1078 * h + 4.4057
        }
    };
    percent / 100.0
}

/// Ceiling on the annual adaptation cost under the voucher policy
///
/// Compares against 5% of *monthly* income.
pub fn affordability_cap(annual_income: f64) -> f64 {
    annual_income / 12.0 * AFFORDABILITY_SHARE
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_elevation_cost_pieces() {
        assert_eq!(elevation_cost(0.0, 1500.0), 0.0);
        assert_eq!(elevation_cost(-1.0, 1500.0), 0.0);
        assert_eq!(elevation_cost(1.0, 1500.0), 25_500.0);
        assert_eq!(elevation_cost(2.0, 1500.0), 25_500.0);
        // 17 + 0.75 × 4 = 20 per sq ft
        assert_relative_eq!(elevation_cost(6.0, 1500.0), 30_000.0);
    }

    #[test]
    fn test_elevation_cost_continuous_at_two_feet() {
        let area = 2000.0;
        let at = elevation_cost(2.0, area);
        let above = elevation_cost(2.0 + 1e-9, area);
        assert!((above - at).abs() < 1e-3);
    }

    #[test]
    fn test_elevation_cost_non_decreasing() {
        let costs: Vec<f64> = (0..=40)
            .map(|i| elevation_cost(i as f64 * 0.25, 1800.0))
            .collect();
        assert!(costs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_annual_payment_matches_amortisation_table() {
        // 100k at 4% over 20 years ≈ 7358.18
        let payment = LoanTerms::PRE_FIRM.annual_payment(100_000.0);
        assert!((payment - 7358.18).abs() < 0.01);

        // 100k at 3% over 30 years ≈ 5101.93
        let payment = LoanTerms::VOUCHER.annual_payment(100_000.0);
        assert!((payment - 5101.93).abs() < 0.01);
    }

    #[test]
    fn test_annual_payment_zero_principal() {
        assert_eq!(LoanTerms::PRE_FIRM.annual_payment(0.0), 0.0);
    }

    #[test]
    fn test_annual_payment_zero_rate() {
        let loan = LoanTerms { rate: 0.0, years: 10 };
        assert_relative_eq!(loan.annual_payment(1000.0), 100.0);
    }

    #[test]
    fn test_damage_curve_at_zero_depth() {
        assert_relative_eq!(damage_assessment(BuildingType::Residential, 0.0), 0.11623);
        assert_relative_eq!(
            damage_assessment(BuildingType::NonResidential, 0.0),
            0.044057
        );
    }

    #[test]
    fn test_damage_curve_converts_feet_to_meters() {
        // 1 m of water: 0.2391 - 3.5524 + 19.933 + 11.623 = 28.2427 %
        let feet = 1.0 / FEET_TO_METERS;
        assert_relative_eq!(
            damage_assessment(BuildingType::Residential, feet),
            0.282427,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_damage_curve_uncapped() {
        // Residential cubic keeps rising for very deep water
        let deep = damage_assessment(BuildingType::Residential, 60.0);
        assert!(deep > 1.0);
    }

    #[test]
    fn test_affordability_cap_uses_monthly_income() {
        assert_relative_eq!(affordability_cap(120_000.0), 500.0);
    }
}
