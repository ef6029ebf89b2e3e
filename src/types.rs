use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::error::{ReportError, Result};

/// The closed set of region labels a record can carry.
///
/// `Other` is the catch-all for states that no configured region lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionLabel {
    #[serde(rename = "NORTH CENTRAL")]
    NorthCentral,
    #[serde(rename = "NORTH EAST")]
    NorthEast,
    #[serde(rename = "NORTH WEST")]
    NorthWest,
    #[serde(rename = "SOUTH EAST")]
    SouthEast,
    #[serde(rename = "SOUTH SOUTH")]
    SouthSouth,
    #[serde(rename = "LAGOS")]
    Lagos,
    #[serde(rename = "SOUTH WEST")]
    SouthWest,
    #[serde(rename = "Other")]
    Other,
}

impl RegionLabel {
    /// Concrete regions, in the order the dashboard lists them.
    pub const CONFIGURABLE: [RegionLabel; 7] = [
        RegionLabel::NorthCentral,
        RegionLabel::NorthEast,
        RegionLabel::NorthWest,
        RegionLabel::SouthEast,
        RegionLabel::SouthSouth,
        RegionLabel::Lagos,
        RegionLabel::SouthWest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RegionLabel::NorthCentral => "NORTH CENTRAL",
            RegionLabel::NorthEast => "NORTH EAST",
            RegionLabel::NorthWest => "NORTH WEST",
            RegionLabel::SouthEast => "SOUTH EAST",
            RegionLabel::SouthSouth => "SOUTH SOUTH",
            RegionLabel::Lagos => "LAGOS",
            RegionLabel::SouthWest => "SOUTH WEST",
            RegionLabel::Other => "Other",
        }
    }
}

impl fmt::Display for RegionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionLabel {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        RegionLabel::CONFIGURABLE
            .iter()
            .copied()
            .chain(std::iter::once(RegionLabel::Other))
            .find(|label| label.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ReportError::UnknownRegion(s.to_string()))
    }
}

// Region keys sort by their display text, the same order a group-by over
// the label column produces.
impl Ord for RegionLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for RegionLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Region constraint of a query. `All` applies no constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionFilter {
    #[default]
    All,
    Only(RegionLabel),
}

impl RegionFilter {
    pub fn matches(self, label: RegionLabel) -> bool {
        match self {
            RegionFilter::All => true,
            RegionFilter::Only(wanted) => wanted == label,
        }
    }
}

impl fmt::Display for RegionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionFilter::All => f.write_str("All"),
            RegionFilter::Only(label) => write!(f, "{}", label),
        }
    }
}

impl FromStr for RegionFilter {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(RegionFilter::All);
        }
        s.parse().map(RegionFilter::Only)
    }
}

/// Named record fields, used for schema checks and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Region,
    Year,
    Month,
    Quantity,
    CustomerName,
    MaterialDescription,
    EventDate,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Region => "region",
            Field::Year => "year",
            Field::Month => "month",
            Field::Quantity => "quantity",
            Field::CustomerName => "customer_name",
            Field::MaterialDescription => "material_description",
            Field::EventDate => "event_date",
        };
        f.write_str(name)
    }
}

/// Which optional columns the loaded source carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Schema {
    pub customer_name: bool,
    pub material_description: bool,
    pub event_date: bool,
}

impl Schema {
    pub fn has(&self, field: Field) -> bool {
        match field {
            Field::Region | Field::Year | Field::Month | Field::Quantity => true,
            Field::CustomerName => self.customer_name,
            Field::MaterialDescription => self.material_description,
            Field::EventDate => self.event_date,
        }
    }

    pub fn require(&self, field: Field) -> Result<()> {
        if self.has(field) {
            Ok(())
        } else {
            Err(ReportError::SchemaMismatch { field })
        }
    }
}

/// A shipment line as read from a source file, before region
/// classification.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub region_source_name: String,
    pub year: i32,
    pub month: i32,
    pub quantity: f64,
    pub customer_name: Option<String>,
    pub material_description: Option<String>,
    pub event_date: Option<NaiveDate>,
}

/// A classified shipment line.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub region_source_name: String,
    pub region: RegionLabel,
    pub year: i32,
    pub month: i32,
    pub quantity: f64,
    pub customer_name: Option<String>,
    pub material_description: Option<String>,
    pub event_date: Option<NaiveDate>,
}

impl Record {
    pub fn from_source(src: SourceRecord, region: RegionLabel) -> Self {
        Record {
            region_source_name: src.region_source_name,
            region,
            year: src.year,
            month: src.month,
            quantity: src.quantity,
            customer_name: src.customer_name,
            material_description: src.material_description,
            event_date: src.event_date,
        }
    }

    /// Value of the grouping dimension for this record, if it has one.
    pub fn group_key(&self, group_by: GroupBy) -> Option<GroupKey> {
        match group_by {
            GroupBy::Region => Some(GroupKey::Region(self.region)),
            GroupBy::Year => Some(GroupKey::Number(self.year)),
            GroupBy::Month => Some(GroupKey::Number(self.month)),
            GroupBy::CustomerName => self.customer_name.clone().map(GroupKey::Text),
            GroupBy::MaterialDescription => {
                self.material_description.clone().map(GroupKey::Text)
            }
            GroupBy::EventDate => self.event_date.map(GroupKey::Date),
        }
    }
}

/// An immutable, classified collection of records plus the schema of the
/// source it came from. Cloning shares the underlying records.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Schema,
    records: Arc<[Record]>,
}

impl Dataset {
    pub fn new(schema: Schema, records: Vec<Record>) -> Self {
        Dataset {
            schema,
            records: records.into(),
        }
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Dimension a dataset can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupBy {
    Region,
    CustomerName,
    MaterialDescription,
    Month,
    Year,
    EventDate,
}

impl GroupBy {
    pub fn field(self) -> Field {
        match self {
            GroupBy::Region => Field::Region,
            GroupBy::CustomerName => Field::CustomerName,
            GroupBy::MaterialDescription => Field::MaterialDescription,
            GroupBy::Month => Field::Month,
            GroupBy::Year => Field::Year,
            GroupBy::EventDate => Field::EventDate,
        }
    }
}

/// A distinct value of a grouping dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Region(RegionLabel),
    Number(i32),
    Text(String),
    Date(NaiveDate),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Region(label) => write!(f, "{}", label),
            GroupKey::Number(n) => write!(f, "{}", n),
            GroupKey::Text(s) => f.write_str(s),
            GroupKey::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Numeric quantity summed by aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Measure {
    /// Tonnes (or MT lifted) on each line.
    #[default]
    Quantity,
    /// One per shipment line.
    Lines,
}

impl Measure {
    pub fn value(self, record: &Record) -> f64 {
        match self {
            Measure::Quantity => record.quantity,
            Measure::Lines => 1.0,
        }
    }
}

/// One group of an aggregation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: GroupKey,
    pub total: f64,
}

/// Current vs previous period totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodDelta {
    pub current: f64,
    pub previous: f64,
    pub delta: f64,
}

impl PeriodDelta {
    pub fn new(current: f64, previous: f64) -> Self {
        PeriodDelta {
            current,
            previous,
            delta: current - previous,
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionTotalRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Tonnes")]
    #[tabled(rename = "Tonnes")]
    pub tonnes: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CustomerRankingRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "CustomerName")]
    #[tabled(rename = "CustomerName")]
    pub customer: String,
    #[serde(rename = "MT lifted")]
    #[tabled(rename = "MT lifted")]
    pub mt_lifted: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct YearTotalRow {
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "MT lifted")]
    #[tabled(rename = "MT lifted")]
    pub mt_lifted: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MonthlyTrendRow {
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: i32,
    #[serde(rename = "Tonnes")]
    #[tabled(rename = "Tonnes")]
    pub tonnes: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DailyTotalRow {
    #[serde(rename = "Actual PGI Date")]
    #[tabled(rename = "Actual PGI Date")]
    pub date: String,
    #[serde(rename = "Delivery Quantity (Tonnes)")]
    #[tabled(rename = "Delivery Quantity (Tonnes)")]
    pub tonnes: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MetricCardRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Delta")]
    #[tabled(rename = "Delta")]
    pub delta: String,
}
