// Region table and state -> region classification.
//
// The table maps each concrete region to the states it covers. It is read
// once at startup (from JSON, or the built-in default) and inverted into
// a lookup map; after that it is only ever read.
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::error::{ReportError, Result};
use crate::types::{Dataset, Record, RegionLabel, Schema, SourceRecord};

static DEFAULT_TABLE: Lazy<RegionTable> = Lazy::new(|| {
    let entries = vec![
        (
            RegionLabel::NorthCentral,
            states(&[
                "Kogi",
                "Kwara",
                "Niger",
                "Plateau",
                "Benue",
                "Nasarawa",
                "FederalCapitalTerritory",
            ]),
        ),
        (
            RegionLabel::NorthEast,
            states(&["Adamawa", "Bauchi", "Borno", "Gombe", "Taraba", "Yobe"]),
        ),
        (
            RegionLabel::NorthWest,
            states(&[
                "Jigawa", "Kaduna", "Kano", "Katsina", "Kebbi", "Sokoto", "Zamfara",
            ]),
        ),
        (
            RegionLabel::SouthEast,
            states(&["Abia", "Anambra", "Ebonyi", "Enugu", "Imo"]),
        ),
        (
            RegionLabel::SouthSouth,
            states(&["AkwaIbom", "Bayelsa", "CrossRiver", "Delta", "Edo", "Rivers"]),
        ),
        (RegionLabel::Lagos, states(&["Lagos"])),
        (
            RegionLabel::SouthWest,
            states(&["Ekiti", "Ogun", "Ondo", "Osun", "Oyo"]),
        ),
    ];
    RegionTable::build(entries)
});

fn states(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone)]
pub struct RegionTable {
    regions: Vec<(RegionLabel, Vec<String>)>,
    lookup: HashMap<String, RegionLabel>,
}

impl RegionTable {
    /// Build a table from `(region, states)` entries.
    ///
    /// `Other` cannot be configured, each region appears once, and a state
    /// is listed at most once.
    pub fn new(entries: Vec<(RegionLabel, Vec<String>)>) -> Result<Self> {
        let mut labels: HashSet<RegionLabel> = HashSet::new();
        let mut seen: HashMap<&str, RegionLabel> = HashMap::new();
        for (label, names) in &entries {
            if *label == RegionLabel::Other {
                return Err(ReportError::RegionConfig(
                    "'Other' is the catch-all label and cannot list states".to_string(),
                ));
            }
            if !labels.insert(*label) {
                return Err(ReportError::RegionConfig(format!(
                    "region {} is configured more than once",
                    label
                )));
            }
            for name in names {
                match seen.insert(name.as_str(), *label) {
                    Some(prev) if prev == *label => {
                        return Err(ReportError::RegionConfig(format!(
                            "state '{}' is listed twice under {}",
                            name, label
                        )));
                    }
                    Some(prev) => {
                        return Err(ReportError::RegionConfig(format!(
                            "state '{}' is listed under both {} and {}",
                            name, prev, label
                        )));
                    }
                    None => {}
                }
            }
        }
        Ok(Self::build(entries))
    }

    fn build(mut entries: Vec<(RegionLabel, Vec<String>)>) -> Self {
        entries.sort_by_key(|(label, _)| {
            RegionLabel::CONFIGURABLE
                .iter()
                .position(|l| l == label)
                .unwrap_or(RegionLabel::CONFIGURABLE.len())
        });
        let lookup = entries
            .iter()
            .flat_map(|(label, names)| names.iter().map(move |n| (n.clone(), *label)))
            .collect();
        RegionTable {
            regions: entries,
            lookup,
        }
    }

    /// The seven regions used by the sales dashboards.
    pub fn default_table() -> &'static RegionTable {
        &DEFAULT_TABLE
    }

    /// Parse a `{"REGION": ["State", ...]}` JSON object.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: HashMap<String, Vec<String>> = serde_json::from_str(s)?;
        let mut entries = Vec::with_capacity(raw.len());
        for (label, names) in raw {
            let label: RegionLabel = label
                .parse()
                .map_err(|_| ReportError::RegionConfig(format!("unknown region '{}'", label)))?;
            entries.push((label, names));
        }
        Self::new(entries)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let table = Self::from_json_str(&text)?;
        debug!(
            path = %path.as_ref().display(),
            regions = table.regions.len(),
            "loaded region table"
        );
        Ok(table)
    }

    /// Exact, case-sensitive lookup; unknown names are `Other`.
    pub fn classify(&self, source_name: &str) -> RegionLabel {
        self.lookup
            .get(source_name)
            .copied()
            .unwrap_or(RegionLabel::Other)
    }

    /// Classify every record of a loaded batch, keeping record order.
    pub fn classify_all(&self, schema: Schema, records: Vec<SourceRecord>) -> Dataset {
        let mut unmapped: BTreeSet<String> = BTreeSet::new();
        let classified: Vec<Record> = records
            .into_iter()
            .map(|src| {
                let region = self.classify(&src.region_source_name);
                if region == RegionLabel::Other {
                    unmapped.insert(src.region_source_name.clone());
                }
                Record::from_source(src, region)
            })
            .collect();
        if !unmapped.is_empty() {
            warn!(states = ?unmapped, "states with no region, classified as Other");
        }
        Dataset::new(schema, classified)
    }

    /// Configured regions in table order.
    pub fn labels(&self) -> impl Iterator<Item = RegionLabel> + '_ {
        self.regions.iter().map(|(label, _)| *label)
    }

    /// States configured for a region; empty for `Other`.
    pub fn states_of(&self, label: RegionLabel) -> &[String] {
        self.regions
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, names)| names.as_slice())
            .unwrap_or(&[])
    }
}
