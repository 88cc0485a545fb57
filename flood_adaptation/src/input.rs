//! Structure records and data-quality filtering
//!
//! The structure file carries census labels as text. Records that cannot
//! support a decision (missing education, unknown income, no usable flood
//! zone, unreadable flood elevations) are rejected here so that every
//! household built afterwards is complete.

use crate::{BuildingType, Result, SimulationError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::warn;

pub const MAX_EDUCATION_LEVEL: f64 = 24.0;

/// Zones that trigger the mortgage-lender insurance mandate
pub const MANDATORY_PURCHASE_ZONES: [&str; 3] = ["A", "VE", "VO"];

pub const MORTGAGE_LABEL: &str = "Housing Units with a Mortgage";
pub const MINORITY_LABEL: &str = "Minority Population";
pub const OWNER_OCCUPIED_LABEL: &str = "Owner-Occupied Housing Units";

/// Zone label for open water, never a valid structure location
const OPEN_WATER_ZONE: &str = "OPEN";

const INCOME_FLOOR: f64 = 45_000.0;
const INCOME_CEILING: f64 = 200_000.0;

/// Household income bracket as reported by the census
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncomeBracket {
    Below45k,
    From45kTo50k,
    From50kTo60k,
    From60kTo75k,
    From75kTo100k,
    From100kTo125k,
    From125kTo150k,
    From150kTo200k,
    Above200k,
}

impl IncomeBracket {
    pub const ALL: [IncomeBracket; 9] = [
        IncomeBracket::Below45k,
        IncomeBracket::From45kTo50k,
        IncomeBracket::From50kTo60k,
        IncomeBracket::From60kTo75k,
        IncomeBracket::From75kTo100k,
        IncomeBracket::From100kTo125k,
        IncomeBracket::From125kTo150k,
        IncomeBracket::From150kTo200k,
        IncomeBracket::Above200k,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            IncomeBracket::Below45k => "Income Below $45,000",
            IncomeBracket::From45kTo50k => "Households with Income $45,000 - $49,999",
            IncomeBracket::From50kTo60k => "Households with Income $50,000 - $59,999",
            IncomeBracket::From60kTo75k => "Households with Income $60,000 - $74,999",
            IncomeBracket::From75kTo100k => "Households with Income $75,000 - $99,999",
            IncomeBracket::From100kTo125k => "Households with Income $100,000 - $124,999",
            IncomeBracket::From125kTo150k => "Households with Income $125,000 - $149,999",
            IncomeBracket::From150kTo200k => "Households with Income $150,000 - $199,999",
            IncomeBracket::Above200k => "Households with Income $200,000 or more",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|bracket| bracket.label() == label)
    }

    fn lower_bound(&self) -> f64 {
        match self {
            IncomeBracket::Below45k | IncomeBracket::From45kTo50k => 45_000.0,
            IncomeBracket::From50kTo60k => 50_000.0,
            IncomeBracket::From60kTo75k => 60_000.0,
            IncomeBracket::From75kTo100k => 75_000.0,
            IncomeBracket::From100kTo125k => 100_000.0,
            IncomeBracket::From125kTo150k => 125_000.0,
            IncomeBracket::From150kTo200k => 150_000.0,
            IncomeBracket::Above200k => 200_000.0,
        }
    }

    /// Position of the bracket's lower bound between $45k and $200k
    pub fn normalized(&self) -> f64 {
        (self.lower_bound() - INCOME_FLOOR) / (INCOME_CEILING - INCOME_FLOOR)
    }

    /// Representative annual income (bracket midpoint, floor and ceiling at the ends)
    pub fn annual_income(&self) -> f64 {
        match self {
            IncomeBracket::Below45k => 45_000.0,
            IncomeBracket::From45kTo50k => 47_500.0,
            IncomeBracket::From50kTo60k => 55_000.0,
            IncomeBracket::From60kTo75k => 67_500.0,
            IncomeBracket::From75kTo100k => 87_500.0,
            IncomeBracket::From100kTo125k => 112_500.0,
            IncomeBracket::From125kTo150k => 137_500.0,
            IncomeBracket::From150kTo200k => 175_000.0,
            IncomeBracket::Above200k => 200_000.0,
        }
    }
}

/// One row of the structure file, as written by the data-preparation step
#[derive(Debug, Clone, Deserialize)]
pub struct StructureRecord {
    pub structure_id: String,
    #[serde(default)]
    pub mortgage: Option<String>,
    #[serde(default)]
    pub income: Option<String>,
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub education: Option<f64>,
    #[serde(default)]
    pub ownership: Option<String>,
    pub flood_elevation_list: String,
    #[serde(default)]
    pub property_flood_zone: Option<String>,
    pub property_height: f64,
    pub area: f64,
    pub building_type: String,
    pub house_value: f64,
    #[serde(rename = "BFE")]
    pub bfe: f64,
    #[serde(rename = "GEOID")]
    pub geoid: String,
}

/// Immutable per-household input to the decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureProfile {
    pub structure_id: String,
    pub mortgage: bool,
    pub income: IncomeBracket,
    pub minority: bool,
    /// Years of schooling, 0-24
    pub education: u8,
    pub owner_occupied: bool,
    /// Flood elevation per return period, same order as the model's list
    pub flood_elevations: Vec<f64>,
    pub flood_zone: String,
    pub property_height: f64,
    pub area: f64,
    pub building_type: BuildingType,
    pub house_value: f64,
    pub bfe: f64,
    pub geoid: String,
}

impl StructureProfile {
    pub fn income_scalar(&self) -> f64 {
        self.income.normalized()
    }

    pub fn race_indicator(&self) -> f64 {
        if self.minority {
            1.0
        } else {
            0.0
        }
    }

    pub fn education_scalar(&self) -> f64 {
        self.education as f64 / MAX_EDUCATION_LEVEL
    }

    pub fn ownership_indicator(&self) -> f64 {
        if self.owner_occupied {
            1.0
        } else {
            0.0
        }
    }

    /// Mortgage holders in A/VE/VO zones must carry flood insurance
    pub fn requires_insurance(&self) -> bool {
        self.mortgage && MANDATORY_PURCHASE_ZONES.contains(&self.flood_zone.as_str())
    }

    /// Validate a raw record; failures are data-quality errors
    pub fn from_record(record: StructureRecord) -> Result<Self> {
        let id = record.structure_id.trim().to_string();
        let reject = |reason: String| SimulationError::data_quality(id.clone(), reason);

        let income_label = record
            .income
            .as_deref()
            .ok_or_else(|| reject("missing income".to_string()))?;
        let income = IncomeBracket::from_label(income_label)
            .ok_or_else(|| reject(format!("unknown income label '{}'", income_label)))?;

        let education = match record.education {
            Some(e) if e.is_finite() && (0.0..=MAX_EDUCATION_LEVEL).contains(&e) => e as u8,
            Some(e) => return Err(reject(format!("education {} outside 0-24", e))),
            None => return Err(reject("missing education".to_string())),
        };

        let flood_zone = match record.property_flood_zone.as_deref().map(str::trim) {
            Some(zone) if zone.is_empty() => return Err(reject("missing flood zone".to_string())),
            Some(OPEN_WATER_ZONE) => return Err(reject("flood zone is open water".to_string())),
            Some(zone) => zone.to_string(),
            None => return Err(reject("missing flood zone".to_string())),
        };

        let flood_elevations = parse_flood_elevations(&record.flood_elevation_list)
            .map_err(|e| reject(format!("unreadable flood_elevation_list: {}", e)))?;
        if flood_elevations.is_empty() {
            return Err(reject("empty flood_elevation_list".to_string()));
        }
        if flood_elevations.iter().any(|v| !v.is_finite()) {
            return Err(reject("non-finite flood elevation".to_string()));
        }

        for (name, value) in [
            ("property_height", record.property_height),
            ("area", record.area),
            ("house_value", record.house_value),
            ("BFE", record.bfe),
        ] {
            if !value.is_finite() {
                return Err(reject(format!("{} is not a number", name)));
            }
        }

        Ok(StructureProfile {
            mortgage: record.mortgage.as_deref().map(str::trim) == Some(MORTGAGE_LABEL),
            minority: record.race.as_deref().map(str::trim) == Some(MINORITY_LABEL),
            owner_occupied: record.ownership.as_deref().map(str::trim)
                == Some(OWNER_OCCUPIED_LABEL),
            structure_id: id,
            income,
            education,
            flood_elevations,
            flood_zone,
            property_height: record.property_height,
            area: record.area,
            building_type: BuildingType::from_label(&record.building_type),
            house_value: record.house_value,
            bfe: record.bfe,
            geoid: record.geoid.trim().to_string(),
        })
    }
}

/// Parse a bracketed list literal such as "[1.5, 2.25, 3.0]"
pub fn parse_flood_elevations(raw: &str) -> std::result::Result<Vec<f64>, serde_json::Error> {
    serde_json::from_str(raw.trim())
}

/// Usable profiles plus the records rejected on the way
#[derive(Debug, Default)]
pub struct LoadedPopulation {
    pub profiles: Vec<StructureProfile>,
    pub rejected: Vec<SimulationError>,
}

/// Read structure records, keeping good rows and collecting rejected ones
pub fn load_structures<R: Read>(reader: R) -> Result<LoadedPopulation> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut loaded = LoadedPopulation::default();
    for (row, result) in rdr.deserialize::<StructureRecord>().enumerate() {
        let outcome = match result {
            Ok(record) => StructureProfile::from_record(record),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => Err(SimulationError::data_quality(
                format!("row {}", row + 1),
                e.to_string(),
            )),
        };
        match outcome {
            Ok(profile) => loaded.profiles.push(profile),
            Err(e) => {
                warn!(error = %e, "dropping structure record");
                loaded.rejected.push(e);
            }
        }
    }
    Ok(loaded)
}

pub fn load_structures_from_path<P: AsRef<Path>>(path: P) -> Result<LoadedPopulation> {
    let file = File::open(path)?;
    load_structures(file)
}
