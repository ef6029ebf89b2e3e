use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{info, warn};

use crate::error::{ReportError, Result};
use crate::region::RegionTable;
use crate::types::{Dataset, Schema, SourceRecord};
use crate::util::{decode_latin1, parse_date_safe, parse_f64_safe, parse_i32_safe};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
}

/// The three exports the dashboards read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    /// Monthly tonnes per state.
    Regional,
    /// Monthly MT lifted per customer and state.
    Customers,
    /// Deliveries per material, dated by PGI date.
    Materials,
}

impl DatasetKind {
    pub fn columns(self) -> ColumnMap {
        match self {
            DatasetKind::Regional => ColumnMap::new("State", "Year", "Month", "Tonnes"),
            DatasetKind::Customers => ColumnMap {
                customer: Some("CustomerName".to_string()),
                ..ColumnMap::new("State", "Year", "Month", "MT lifted")
            },
            DatasetKind::Materials => ColumnMap {
                material: Some("Material Description".to_string()),
                event_date: Some("Actual PGI Date".to_string()),
                ..ColumnMap::new("State", "Year", "Month", "Delivery Quantity (Tonnes)")
            },
        }
    }

    pub fn encoding(self) -> Encoding {
        match self {
            DatasetKind::Regional => Encoding::Utf8,
            DatasetKind::Customers | DatasetKind::Materials => Encoding::Latin1,
        }
    }
}

/// Header names of each record field in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub state: String,
    pub year: String,
    pub month: String,
    pub quantity: String,
    pub customer: Option<String>,
    pub material: Option<String>,
    pub event_date: Option<String>,
}

impl ColumnMap {
    pub fn new(state: &str, year: &str, month: &str, quantity: &str) -> Self {
        ColumnMap {
            state: state.to_string(),
            year: year.to_string(),
            month: month.to_string(),
            quantity: quantity.to_string(),
            customer: None,
            material: None,
            event_date: None,
        }
    }

    fn schema(&self) -> Schema {
        Schema {
            customer_name: self.customer.is_some(),
            material_description: self.material.is_some(),
            event_date: self.event_date.is_some(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub skipped_rows: usize,
}

struct Indices {
    state: usize,
    year: usize,
    month: usize,
    quantity: usize,
    customer: Option<usize>,
    material: Option<usize>,
    event_date: Option<usize>,
}

impl Indices {
    fn resolve(headers: &StringRecord, columns: &ColumnMap) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| ReportError::MissingColumn(name.to_string()))
        };
        let find_opt = |name: &Option<String>| name.as_deref().map(|n| find(n)).transpose();
        Ok(Indices {
            state: find(&columns.state)?,
            year: find(&columns.year)?,
            month: find(&columns.month)?,
            quantity: find(&columns.quantity)?,
            customer: find_opt(&columns.customer)?,
            material: find_opt(&columns.material)?,
            event_date: find_opt(&columns.event_date)?,
        })
    }
}

fn text(row: &StringRecord, idx: Option<usize>) -> Option<String> {
    let s = row.get(idx?)?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn parse_row(row: &StringRecord, ix: &Indices) -> Option<SourceRecord> {
    let year = parse_i32_safe(row.get(ix.year))?;
    let month = match parse_i32_safe(row.get(ix.month)) {
        Some(m) if (1..=12).contains(&m) => m,
        _ => return None,
    };
    let quantity = match parse_f64_safe(row.get(ix.quantity)) {
        Some(q) if q >= 0.0 => q,
        _ => return None,
    };
    let event_date = match text(row, ix.event_date) {
        Some(raw) => Some(parse_date_safe(Some(&raw))?),
        None => None,
    };
    Some(SourceRecord {
        region_source_name: row.get(ix.state).unwrap_or("").trim().to_string(),
        year,
        month,
        quantity,
        customer_name: text(row, ix.customer),
        material_description: text(row, ix.material),
        event_date,
    })
}

/// Read an unclassified batch from CSV text.
///
/// Rows with an unparsable year, month or quantity, a month outside 1-12,
/// a negative quantity or an unparsable date are skipped and counted.
pub fn load_source<R: Read>(
    mut reader: R,
    columns: &ColumnMap,
    encoding: Encoding,
) -> Result<(Schema, Vec<SourceRecord>, LoadReport)> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let text = match encoding {
        Encoding::Utf8 => String::from_utf8(bytes).map_err(|_| ReportError::Encoding("UTF-8"))?,
        Encoding::Latin1 => decode_latin1(&bytes),
    };

    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let ix = Indices::resolve(rdr.headers()?, columns)?;

    let mut report = LoadReport::default();
    let mut records = Vec::new();
    for result in rdr.records() {
        report.total_rows += 1;
        let parsed = result.ok().and_then(|row| parse_row(&row, &ix));
        match parsed {
            Some(r) => records.push(r),
            None => report.skipped_rows += 1,
        }
    }
    report.kept_rows = records.len();
    Ok((columns.schema(), records, report))
}

/// Load a file of the given kind and classify it into a dataset.
pub fn load_dataset<P: AsRef<Path>>(
    path: P,
    kind: DatasetKind,
    table: &RegionTable,
) -> Result<(Dataset, LoadReport)> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let (schema, records, report) = load_source(file, &kind.columns(), kind.encoding())?;
    info!(
        path = %path.display(),
        kind = ?kind,
        rows = report.total_rows,
        kept = report.kept_rows,
        "loaded source"
    );
    if report.skipped_rows > 0 {
        warn!(
            path = %path.display(),
            skipped = report.skipped_rows,
            "rows skipped due to parse/validation errors"
        );
    }
    Ok((table.classify_all(schema, records), report))
}
