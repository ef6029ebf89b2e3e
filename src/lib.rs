//! Region-aware sales aggregation for the regional distribution
//! dashboards: state -> region classification, filtering by region and
//! period, grouped totals, top-N rankings and period-over-period deltas.

pub mod aggregate;
pub mod dashboard;
pub mod error;
pub mod loader;
pub mod output;
pub mod region;
pub mod types;
pub mod util;

pub use aggregate::{aggregate, filter, period_delta, top_n, total, Criteria, DeltaAxis};
pub use error::{ReportError, Result};
pub use region::RegionTable;
pub use types::{
    Dataset, Field, GroupBy, GroupKey, GroupTotal, Measure, PeriodDelta, Record, RegionFilter,
    RegionLabel, Schema, SourceRecord,
};
