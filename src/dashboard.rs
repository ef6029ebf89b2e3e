// View builders for the three dashboard screens.
//
// Each view only combines `filter` / `aggregate` / `top_n` /
// `period_delta`; nothing here reads files or keeps state.
use serde::Serialize;
use tracing::debug;

use crate::aggregate::{self, Criteria, DeltaAxis};
use crate::error::Result;
use crate::types::{
    CustomerRankingRow, DailyTotalRow, Dataset, GroupBy, GroupKey, GroupTotal, Measure,
    MetricCardRow, MonthlyTrendRow, PeriodDelta, RegionFilter, RegionLabel, RegionTotalRow,
    YearTotalRow,
};
use crate::util::{format_compact, format_number};

pub const TOP_CUSTOMERS_YEAR: usize = 5;
pub const TOP_CUSTOMERS_MONTH: usize = 10;

/// Region, year and month picked by the analyst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub region: RegionFilter,
    pub year: i32,
    pub month: i32,
}

impl Selection {
    pub fn criteria(&self) -> Criteria {
        Criteria::new()
            .region(self.region)
            .year(self.year)
            .month(self.month)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub region: String,
    pub year: i32,
    pub month: i32,
    pub total: f64,
    /// Per-region totals of the selection; the map is shaded from these.
    pub by_region: Vec<GroupTotal>,
    pub year_over_year: PeriodDelta,
    pub month_over_year: PeriodDelta,
    pub month_over_month: PeriodDelta,
}

pub fn overview(dataset: &Dataset, sel: &Selection) -> Result<Overview> {
    let base = sel.criteria();
    let selected = aggregate::filter(dataset, &base)?;
    let total = aggregate::total(&selected, Measure::Quantity);
    let by_region = aggregate::aggregate(&selected, GroupBy::Region, Measure::Quantity)?;
    debug!(region = %sel.region, year = sel.year, month = sel.month, total, "overview");

    Ok(Overview {
        region: sel.region.to_string(),
        year: sel.year,
        month: sel.month,
        total,
        by_region,
        year_over_year: aggregate::period_delta(
            dataset,
            &base,
            DeltaAxis::YearOverYear,
            Measure::Quantity,
        )?,
        month_over_year: aggregate::period_delta(
            dataset,
            &base,
            DeltaAxis::YearMonthOverYear,
            Measure::Quantity,
        )?,
        month_over_month: aggregate::period_delta(
            dataset,
            &base,
            DeltaAxis::MonthOverMonth,
            Measure::Quantity,
        )?,
    })
}

impl Overview {
    pub fn region_rows(&self) -> Vec<RegionTotalRow> {
        self.by_region
            .iter()
            .map(|g| RegionTotalRow {
                region: g.key.to_string(),
                tonnes: format_number(g.total, 2),
            })
            .collect()
    }

    pub fn cards(&self) -> Vec<MetricCardRow> {
        vec![
            card(format!("Sales in {}", self.year), &self.year_over_year),
            card(
                format!(
                    "Sales in month {} against {}",
                    self.month,
                    self.year.saturating_sub(1)
                ),
                &self.month_over_year,
            ),
            card("Sales against prior month".to_string(), &self.month_over_month),
        ]
    }
}

fn card(metric: String, d: &PeriodDelta) -> MetricCardRow {
    MetricCardRow {
        metric,
        value: format_compact(d.current, 2),
        delta: format_compact(d.delta, 2),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerView {
    pub customer: String,
    pub top_for_year: Vec<GroupTotal>,
    pub top_for_month: Vec<GroupTotal>,
    pub year_over_year: PeriodDelta,
    pub month_over_year: PeriodDelta,
    /// The customer's totals per year, across all regions.
    pub history: Vec<GroupTotal>,
    pub all_time: f64,
}

/// Top customers for the selection plus the cards of one customer.
///
/// The rankings follow the selected region; the customer's own cards and
/// history cover every region.
pub fn customers(dataset: &Dataset, sel: &Selection, customer: &str) -> Result<CustomerView> {
    let month_rows = aggregate::filter(dataset, &sel.criteria())?;
    let top_for_month = aggregate::top_n(
        &month_rows,
        GroupBy::CustomerName,
        Measure::Quantity,
        TOP_CUSTOMERS_MONTH,
    )?;

    let year_rows = aggregate::filter(
        dataset,
        &Criteria::new().region(sel.region).year(sel.year),
    )?;
    let top_for_year = aggregate::top_n(
        &year_rows,
        GroupBy::CustomerName,
        Measure::Quantity,
        TOP_CUSTOMERS_YEAR,
    )?;

    let own = Criteria::new()
        .customer(customer)
        .year(sel.year)
        .month(sel.month);
    let year_over_year =
        aggregate::period_delta(dataset, &own, DeltaAxis::YearOverYear, Measure::Quantity)?;
    let month_over_year =
        aggregate::period_delta(dataset, &own, DeltaAxis::YearMonthOverYear, Measure::Quantity)?;

    let all_rows = aggregate::filter(dataset, &Criteria::new().customer(customer))?;
    let history = aggregate::aggregate(&all_rows, GroupBy::Year, Measure::Quantity)?;
    let all_time = aggregate::total(&all_rows, Measure::Quantity);
    debug!(customer, all_time, years = history.len(), "customer view");

    Ok(CustomerView {
        customer: customer.to_string(),
        top_for_year,
        top_for_month,
        year_over_year,
        month_over_year,
        history,
        all_time,
    })
}

impl CustomerView {
    pub fn ranking_rows(groups: &[GroupTotal]) -> Vec<CustomerRankingRow> {
        groups
            .iter()
            .enumerate()
            .map(|(idx, g)| CustomerRankingRow {
                rank: idx + 1,
                customer: g.key.to_string(),
                mt_lifted: format_number(g.total, 2),
            })
            .collect()
    }

    pub fn history_rows(&self) -> Vec<YearTotalRow> {
        self.history
            .iter()
            .filter_map(|g| match g.key {
                GroupKey::Number(year) => Some(YearTotalRow {
                    year,
                    mt_lifted: format_number(g.total, 2),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn cards(&self, sel: &Selection) -> Vec<MetricCardRow> {
        vec![
            card(format!("Sales in {}", sel.year), &self.year_over_year),
            card(
                format!("Sales in month {} of {}", sel.month, sel.year),
                &self.month_over_year,
            ),
            MetricCardRow {
                metric: "All-time record".to_string(),
                value: format_compact(self.all_time, 2),
                delta: String::new(),
            },
        ]
    }
}

/// Monthly totals of one year for the trend chart.
#[derive(Debug, Clone, Serialize)]
pub struct TrendLine {
    pub year: i32,
    pub months: Vec<GroupTotal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionalTrend {
    pub region: RegionLabel,
    pub material: String,
    /// Selected year first, then each comparison year in the order given.
    pub lines: Vec<TrendLine>,
    /// All-region total of the selected year.
    pub national_total: f64,
    /// Per PGI date totals of the material in the selected month.
    pub daily: Vec<GroupTotal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendRequest {
    pub region: RegionLabel,
    pub year: i32,
    pub month: i32,
    pub comparison_years: Vec<i32>,
    pub material: String,
}

/// Month-by-month trend of a region from the regional export, and the
/// daily series of one material from the material export.
pub fn regional_trend(
    regional: &Dataset,
    materials: &Dataset,
    req: &TrendRequest,
) -> Result<RegionalTrend> {
    let mut lines = Vec::with_capacity(1 + req.comparison_years.len());
    for year in std::iter::once(req.year).chain(req.comparison_years.iter().copied()) {
        let rows = aggregate::filter(regional, &Criteria::new().in_region(req.region).year(year))?;
        lines.push(TrendLine {
            year,
            months: aggregate::aggregate(&rows, GroupBy::Month, Measure::Quantity)?,
        });
    }

    let national = aggregate::filter(regional, &Criteria::new().year(req.year))?;
    let national_total = aggregate::total(&national, Measure::Quantity);

    let material_rows = aggregate::filter(
        materials,
        &Criteria::new()
            .in_region(req.region)
            .year(req.year)
            .month(req.month)
            .material(req.material.as_str()),
    )?;
    let daily = aggregate::aggregate(&material_rows, GroupBy::EventDate, Measure::Quantity)?;
    debug!(
        region = %req.region,
        year = req.year,
        lines = lines.len(),
        days = daily.len(),
        "regional trend"
    );

    Ok(RegionalTrend {
        region: req.region,
        material: req.material.clone(),
        lines,
        national_total,
        daily,
    })
}

impl RegionalTrend {
    pub fn monthly_rows(&self) -> Vec<MonthlyTrendRow> {
        self.lines
            .iter()
            .flat_map(|line| {
                line.months.iter().filter_map(move |g| match g.key {
                    GroupKey::Number(month) => Some(MonthlyTrendRow {
                        year: line.year,
                        month,
                        tonnes: format_number(g.total, 2),
                    }),
                    _ => None,
                })
            })
            .collect()
    }

    pub fn daily_rows(&self) -> Vec<DailyTotalRow> {
        self.daily
            .iter()
            .map(|g| DailyTotalRow {
                date: g.key.to_string(),
                tonnes: format_number(g.total, 2),
            })
            .collect()
    }
}
