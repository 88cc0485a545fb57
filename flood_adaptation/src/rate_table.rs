//! Flood insurance rate lookup
//!
//! Rates are quoted per $100 of coverage and depend on the flood zone and the
//! freeboard (structure height above BFE). Each row gives the lower bound of a
//! freeboard bracket.

use crate::{InsuranceKind, Result, SimulationError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Private carriers price at a fixed multiple of the NFIP rate
pub const PRIVATE_RATE_MULTIPLIER: f64 = 3.0;

/// Slack when comparing a computed freeboard against a bracket bound
const HEIGHT_TOLERANCE: f64 = 1e-9;

const BUILTIN_TABLE: &str = include_str!("../data/rate_table.csv");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRow {
    pub zone: String,
    pub height: f64,
    pub building: f64,
    pub contents: f64,
}

/// Building and contents rate per $100 of coverage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsuranceRate {
    pub building: f64,
    pub contents: f64,
}

impl InsuranceRate {
    pub const ZERO: InsuranceRate = InsuranceRate {
        building: 0.0,
        contents: 0.0,
    };

    /// Annual building premium for a coverage amount
    pub fn building_premium(&self, coverage: f64) -> f64 {
        coverage / 100.0 * self.building
    }

    fn scaled(self, factor: f64) -> Self {
        InsuranceRate {
            building: self.building * factor,
            contents: self.contents * factor,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rows: Vec<RateRow>,
}

impl RateTable {
    pub fn from_rows(rows: Vec<RateRow>) -> Self {
        RateTable { rows }
    }

    /// Parse a `zone,height,building,contents` CSV
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let rows = rdr
            .deserialize::<RateRow>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(RateTable { rows })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Table shipped in `data/rate_table.csv`
    pub fn builtin() -> Result<Self> {
        Self::from_reader(BUILTIN_TABLE.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Undiscounted NFIP rate for a zone and freeboard
    ///
    /// Considers rows of the zone whose bracket bound does not exceed the
    /// freeboard and takes the lowest building and contents rate among them.
    pub fn nfip_rate(&self, zone: &str, height: f64) -> Result<InsuranceRate> {
        let mut eligible = self
            .rows
            .iter()
            .filter(|row| row.zone == zone && row.height <= height + HEIGHT_TOLERANCE)
            .peekable();

        if eligible.peek().is_none() {
            return Err(SimulationError::Lookup {
                zone: zone.to_string(),
                height,
            });
        }

        let rate = eligible.fold(
            InsuranceRate {
                building: f64::INFINITY,
                contents: f64::INFINITY,
            },
            |acc, row| InsuranceRate {
                building: acc.building.min(row.building),
                contents: acc.contents.min(row.contents),
            },
        );
        Ok(rate)
    }

    /// Rate for an insurance market with the CRS discount applied
    ///
    /// Private rates are the discounted NFIP rate times
    /// [`PRIVATE_RATE_MULTIPLIER`]; `InsuranceKind::None` costs nothing.
    pub fn insurance_rate(
        &self,
        kind: InsuranceKind,
        zone: &str,
        height: f64,
        crs_reward: f64,
    ) -> Result<InsuranceRate> {
        match kind {
            InsuranceKind::None => Ok(InsuranceRate::ZERO),
            InsuranceKind::Nfip => {
                let rate = self.nfip_rate(zone, height)?;
                Ok(rate.scaled(1.0 - crs_reward))
            }
            InsuranceKind::Private => Ok(self
                .insurance_rate(InsuranceKind::Nfip, zone, height, crs_reward)?
                .scaled(PRIVATE_RATE_MULTIPLIER)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_table() -> RateTable {
        RateTable::from_reader(
            "zone,height,building,contents\n\
             AE,-4,8.0,4.0\n\
             AE,0,1.5,1.0\n\
             AE,2,0.5,0.4\n\
             X,-99,1.0,0.6\n"
                .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_builtin_table_loads() {
        let table = RateTable::builtin().unwrap();
        assert!(!table.is_empty());
        assert!(table.nfip_rate("AE", 0.0).is_ok());
        assert!(table.nfip_rate("VE", -20.0).is_ok());
        assert!(table.nfip_rate("X", 5.0).is_ok());
    }

    #[test]
    fn test_nfip_picks_tightest_bracket_below_height() {
        let table = small_table();

        let rate = table.nfip_rate("AE", 1.0).unwrap();
        assert_eq!(rate.building, 1.5);
        assert_eq!(rate.contents, 1.0);

        let rate = table.nfip_rate("AE", 2.0).unwrap();
        assert_eq!(rate.building, 0.5);

        let rate = table.nfip_rate("AE", -3.5).unwrap();
        assert_eq!(rate.building, 8.0);
    }

    #[test]
    fn test_freeboard_rounding_does_not_drop_bracket() {
        let table = small_table();
        // 10.3 + 2.0 - 10.3 is not exactly 2.0 in floating point
        let height = 10.3 + 2.0 - 10.3 - 1e-12;
        let rate = table.nfip_rate("AE", height).unwrap();
        assert_eq!(rate.building, 0.5);
    }

    #[test]
    fn test_missing_zone_is_lookup_error() {
        let table = small_table();
        match table.nfip_rate("VE", 0.0) {
            Err(SimulationError::Lookup { zone, height }) => {
                assert_eq!(zone, "VE");
                assert_eq!(height, 0.0);
            }
            other => panic!("Expected lookup error, got {:?}", other),
        }
    }

    #[test]
    fn test_height_below_lowest_bracket_is_lookup_error() {
        let table = small_table();
        assert!(matches!(
            table.nfip_rate("AE", -5.0),
            Err(SimulationError::Lookup { .. })
        ));
    }

    #[test]
    fn test_crs_discount_applied_to_nfip() {
        let table = small_table();
        let rate = table
            .insurance_rate(InsuranceKind::Nfip, "AE", 0.0, 0.25)
            .unwrap();
        assert_relative_eq!(rate.building, 1.125);
        assert_relative_eq!(rate.contents, 0.75);
    }

    #[test]
    fn test_private_is_three_times_nfip() {
        let table = small_table();
        for height in [-4.0, -1.0, 0.0, 1.5, 6.0] {
            let nfip = table
                .insurance_rate(InsuranceKind::Nfip, "AE", height, 0.25)
                .unwrap();
            let private = table
                .insurance_rate(InsuranceKind::Private, "AE", height, 0.25)
                .unwrap();
            assert_relative_eq!(private.building, 3.0 * nfip.building);
            assert_relative_eq!(private.contents, 3.0 * nfip.contents);
        }
    }

    #[test]
    fn test_private_propagates_lookup_error() {
        let table = small_table();
        assert!(table
            .insurance_rate(InsuranceKind::Private, "VO", 0.0, 0.25)
            .is_err());
    }

    #[test]
    fn test_no_insurance_is_free() {
        let table = RateTable::default();
        let rate = table
            .insurance_rate(InsuranceKind::None, "anything", 0.0, 0.25)
            .unwrap();
        assert_eq!(rate, InsuranceRate::ZERO);
    }

    #[test]
    fn test_building_premium_per_hundred() {
        let rate = InsuranceRate {
            building: 0.8,
            contents: 0.5,
        };
        assert_relative_eq!(rate.building_premium(150_000.0), 1200.0);
    }
}
