// Filtering, grouping and period comparison over a classified dataset.
//
// Everything here is a pure function of its inputs: datasets are never
// modified, filters return new datasets, and sums are taken in record
// order.
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::error::{ReportError, Result};
use crate::types::{
    Dataset, Field, GroupBy, GroupKey, GroupTotal, Measure, PeriodDelta, Record, RegionFilter,
    RegionLabel,
};

/// Query constraints. Unset options do not constrain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub region: RegionFilter,
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub customer_name: Option<String>,
    pub material_description: Option<String>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(mut self, region: RegionFilter) -> Self {
        self.region = region;
        self
    }

    pub fn in_region(self, label: RegionLabel) -> Self {
        self.region(RegionFilter::Only(label))
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn month(mut self, month: i32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn customer(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    pub fn material(mut self, description: impl Into<String>) -> Self {
        self.material_description = Some(description.into());
        self
    }

    fn check_schema(&self, dataset: &Dataset) -> Result<()> {
        let schema = dataset.schema();
        if self.customer_name.is_some() {
            schema.require(Field::CustomerName)?;
        }
        if self.material_description.is_some() {
            schema.require(Field::MaterialDescription)?;
        }
        Ok(())
    }

    fn matches(&self, r: &Record) -> bool {
        self.region.matches(r.region)
            && self.year.map_or(true, |y| r.year == y)
            && self.month.map_or(true, |m| r.month == m)
            && self
                .customer_name
                .as_deref()
                .map_or(true, |c| r.customer_name.as_deref() == Some(c))
            && self
                .material_description
                .as_deref()
                .map_or(true, |m| r.material_description.as_deref() == Some(m))
    }
}

/// Comparison axis for `period_delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaAxis {
    /// Year Y against Y-1, month unconstrained on both sides.
    YearOverYear,
    /// Month M of Y against month M of Y-1.
    YearMonthOverYear,
    /// Month M of Y against month M-1 of Y. There is no wraparound: for
    /// January the previous side is month 0 and therefore empty.
    MonthOverMonth,
}

/// Records satisfying every constraint of `criteria`, in their original
/// order.
pub fn filter(dataset: &Dataset, criteria: &Criteria) -> Result<Dataset> {
    criteria.check_schema(dataset)?;
    let records: Vec<Record> = dataset
        .iter()
        .filter(|r| criteria.matches(r))
        .cloned()
        .collect();
    Ok(Dataset::new(dataset.schema(), records))
}

/// Scalar sum of `measure` over the whole dataset. Empty datasets sum to 0.
pub fn total(dataset: &Dataset, measure: Measure) -> f64 {
    dataset.iter().map(|r| measure.value(r)).sum()
}

/// Sum of `measure` per distinct `group_by` value, ascending by key.
///
/// Records without a value for the grouping field are left out.
pub fn aggregate(
    dataset: &Dataset,
    group_by: GroupBy,
    measure: Measure,
) -> Result<Vec<GroupTotal>> {
    let mut groups = group_in_encounter_order(dataset, group_by, measure)?;
    groups.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(groups)
}

/// The `n` largest groups, descending by sum. Equal sums keep the order in
/// which their groups were first seen.
pub fn top_n(
    dataset: &Dataset,
    group_by: GroupBy,
    measure: Measure,
    n: usize,
) -> Result<Vec<GroupTotal>> {
    let mut groups = group_in_encounter_order(dataset, group_by, measure)?;
    // `sort_by` is stable, so ties stay in encounter order.
    groups.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));
    groups.truncate(n);
    Ok(groups)
}

fn group_in_encounter_order(
    dataset: &Dataset,
    group_by: GroupBy,
    measure: Measure,
) -> Result<Vec<GroupTotal>> {
    dataset.schema().require(group_by.field())?;
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<GroupTotal> = Vec::new();
    for r in dataset.iter() {
        let Some(key) = r.group_key(group_by) else {
            continue;
        };
        let value = measure.value(r);
        match index.get(&key) {
            Some(&i) => groups[i].total += value,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(GroupTotal { key, total: value });
            }
        }
    }
    Ok(groups)
}

/// Compare the current period selected by `base` against the previous
/// period on `axis`. Region, customer and material constraints of `base`
/// apply to both sides.
pub fn period_delta(
    dataset: &Dataset,
    base: &Criteria,
    axis: DeltaAxis,
    measure: Measure,
) -> Result<PeriodDelta> {
    let year = base.year.ok_or(ReportError::MissingCriterion("year"))?;
    // A previous period that cannot be expressed as an i32 matches nothing.
    let (current, previous) = match axis {
        DeltaAxis::YearOverYear => {
            let mut current = base.clone();
            current.month = None;
            let previous = year.checked_sub(1).map(|y| current.clone().year(y));
            (current, previous)
        }
        DeltaAxis::YearMonthOverYear => {
            base.month.ok_or(ReportError::MissingCriterion("month"))?;
            let previous = year.checked_sub(1).map(|y| base.clone().year(y));
            (base.clone(), previous)
        }
        DeltaAxis::MonthOverMonth => {
            let month = base.month.ok_or(ReportError::MissingCriterion("month"))?;
            let previous = month.checked_sub(1).map(|m| base.clone().month(m));
            (base.clone(), previous)
        }
    };
    let current_sum = total(&filter(dataset, &current)?, measure);
    let previous_sum = match previous {
        Some(previous) => total(&filter(dataset, &previous)?, measure),
        None => 0.0,
    };
    Ok(PeriodDelta::new(current_sum, previous_sum))
}

/// Distinct years present, ascending.
pub fn years(dataset: &Dataset) -> Vec<i32> {
    let set: BTreeSet<i32> = dataset.iter().map(|r| r.year).collect();
    set.into_iter().collect()
}

/// Distinct months present, ascending.
pub fn months(dataset: &Dataset) -> Vec<i32> {
    let set: BTreeSet<i32> = dataset.iter().map(|r| r.month).collect();
    set.into_iter().collect()
}

pub fn customers(dataset: &Dataset) -> Result<Vec<String>> {
    dataset.schema().require(Field::CustomerName)?;
    let set: BTreeSet<&str> = dataset
        .iter()
        .filter_map(|r| r.customer_name.as_deref())
        .collect();
    Ok(set.into_iter().map(str::to_string).collect())
}

pub fn materials(dataset: &Dataset) -> Result<Vec<String>> {
    dataset.schema().require(Field::MaterialDescription)?;
    let set: BTreeSet<&str> = dataset
        .iter()
        .filter_map(|r| r.material_description.as_deref())
        .collect();
    Ok(set.into_iter().map(str::to_string).collect())
}

/// Latest year minus `back`, or the earliest year if that one is not in
/// the data. `None` for an empty dataset.
pub fn default_year(dataset: &Dataset, back: i32) -> Option<i32> {
    let years = years(dataset);
    let latest = *years.last()?;
    let wanted = latest.saturating_sub(back);
    if years.contains(&wanted) {
        Some(wanted)
    } else {
        years.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Schema;

    fn rec(region: RegionLabel, year: i32, month: i32, qty: f64) -> Record {
        Record {
            region_source_name: region.to_string(),
            region,
            year,
            month,
            quantity: qty,
            customer_name: None,
            material_description: None,
            event_date: None,
        }
    }

    fn cust(name: &str, year: i32, month: i32, qty: f64) -> Record {
        Record {
            customer_name: Some(name.to_string()),
            ..rec(RegionLabel::Lagos, year, month, qty)
        }
    }

    fn customer_schema() -> Schema {
        Schema {
            customer_name: true,
            ..Schema::default()
        }
    }

    fn sample() -> Dataset {
        Dataset::new(
            Schema::default(),
            vec![
                rec(RegionLabel::Lagos, 2023, 1, 100.0),
                rec(RegionLabel::Lagos, 2022, 1, 80.0),
                rec(RegionLabel::NorthWest, 2023, 1, 40.0),
                rec(RegionLabel::NorthWest, 2023, 2, 15.0),
                rec(RegionLabel::Other, 2022, 12, 5.0),
            ],
        )
    }

    #[test]
    fn filter_applies_all_constraints_and_keeps_order() {
        let ds = sample();
        let out = filter(&ds, &Criteria::new().year(2023)).unwrap();
        let qty: Vec<f64> = out.iter().map(|r| r.quantity).collect();
        assert_eq!(qty, vec![100.0, 40.0, 15.0]);

        let out = filter(
            &ds,
            &Criteria::new().in_region(RegionLabel::NorthWest).year(2023).month(2),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.records()[0].quantity, 15.0);
    }

    #[test]
    fn region_all_is_no_constraint() {
        let ds = sample();
        let all = filter(&ds, &Criteria::new().region(RegionFilter::All)).unwrap();
        assert_eq!(all, ds);
    }

    #[test]
    fn filter_is_idempotent() {
        let ds = sample();
        let c = Criteria::new().in_region(RegionLabel::Lagos).month(1);
        let once = filter(&ds, &c).unwrap();
        let twice = filter(&once, &c).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_and_out_of_range_filters_are_not_errors() {
        let ds = sample();
        let out = filter(&ds, &Criteria::new().year(1999)).unwrap();
        assert!(out.is_empty());
        assert_eq!(total(&out, Measure::Quantity), 0.0);
        let out = filter(&ds, &Criteria::new().month(13)).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn customer_filter_on_region_dataset_is_schema_mismatch() {
        let err = filter(&sample(), &Criteria::new().customer("A")).unwrap_err();
        assert!(matches!(
            err,
            ReportError::SchemaMismatch {
                field: Field::CustomerName
            }
        ));
        let err = filter(&sample(), &Criteria::new().material("Salt")).unwrap_err();
        assert!(matches!(
            err,
            ReportError::SchemaMismatch {
                field: Field::MaterialDescription
            }
        ));
        let err = aggregate(&sample(), GroupBy::EventDate, Measure::Quantity).unwrap_err();
        assert!(matches!(
            err,
            ReportError::SchemaMismatch {
                field: Field::EventDate
            }
        ));
    }

    #[test]
    fn aggregate_sums_groups_in_key_order() {
        let groups = aggregate(&sample(), GroupBy::Region, Measure::Quantity).unwrap();
        assert_eq!(
            groups,
            vec![
                GroupTotal {
                    key: GroupKey::Region(RegionLabel::Lagos),
                    total: 180.0
                },
                GroupTotal {
                    key: GroupKey::Region(RegionLabel::NorthWest),
                    total: 55.0
                },
                GroupTotal {
                    key: GroupKey::Region(RegionLabel::Other),
                    total: 5.0
                },
            ]
        );
        let by_month = aggregate(&sample(), GroupBy::Month, Measure::Lines).unwrap();
        let keys: Vec<GroupKey> = by_month.iter().map(|g| g.key.clone()).collect();
        assert_eq!(
            keys,
            vec![GroupKey::Number(1), GroupKey::Number(2), GroupKey::Number(12)]
        );
        assert_eq!(by_month[0].total, 3.0);
    }

    #[test]
    fn aggregate_skips_blank_group_values() {
        let mut blank = cust("A", 2023, 1, 10.0);
        blank.customer_name = None;
        let ds = Dataset::new(customer_schema(), vec![cust("A", 2023, 1, 5.0), blank]);
        let groups = aggregate(&ds, GroupBy::CustomerName, Measure::Quantity).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].total, 5.0);
        assert_eq!(total(&ds, Measure::Quantity), 15.0);

        let mut dated = rec(RegionLabel::Lagos, 2023, 3, 4.0);
        dated.event_date = chrono::NaiveDate::from_ymd_opt(2023, 3, 14);
        let undated = rec(RegionLabel::Lagos, 2023, 3, 6.0);
        let ds = Dataset::new(
            Schema {
                event_date: true,
                ..Schema::default()
            },
            vec![undated, dated.clone()],
        );
        let days = aggregate(&ds, GroupBy::EventDate, Measure::Quantity).unwrap();
        assert_eq!(
            days,
            vec![GroupTotal {
                key: GroupKey::Date(dated.event_date.unwrap()),
                total: 4.0
            }]
        );
    }

    #[test]
    fn top_n_ranks_descending_with_stable_ties() {
        let ds = Dataset::new(
            customer_schema(),
            vec![
                cust("C", 2023, 1, 20.0),
                cust("A", 2023, 1, 30.0),
                cust("B", 2023, 1, 30.0),
                cust("A", 2023, 2, 20.0),
                cust("D", 2023, 2, 30.0),
            ],
        );
        let top = top_n(&ds, GroupBy::CustomerName, Measure::Quantity, 3).unwrap();
        let names: Vec<String> = top.iter().map(|g| g.key.to_string()).collect();
        assert_eq!(names, vec!["A", "B", "D"]);
        assert_eq!(top[0].total, 50.0);

        let all = top_n(&ds, GroupBy::CustomerName, Measure::Quantity, 10).unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].total >= w[1].total));
        assert!(top_n(&ds, GroupBy::CustomerName, Measure::Quantity, 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn period_delta_axes() {
        let ds = sample();
        let base = Criteria::new().year(2023).month(2);

        let yoy = period_delta(&ds, &base, DeltaAxis::YearOverYear, Measure::Quantity).unwrap();
        assert_eq!(yoy, PeriodDelta::new(155.0, 85.0));

        let ym = period_delta(&ds, &base, DeltaAxis::YearMonthOverYear, Measure::Quantity)
            .unwrap();
        assert_eq!(ym, PeriodDelta::new(15.0, 0.0));

        let mom = period_delta(&ds, &base, DeltaAxis::MonthOverMonth, Measure::Quantity).unwrap();
        assert_eq!(mom, PeriodDelta::new(15.0, 140.0));
        assert_eq!(mom.delta, -125.0);
    }

    #[test]
    fn january_month_over_month_does_not_wrap() {
        let ds = sample();
        let base = Criteria::new().year(2023).month(1);
        let mom = period_delta(&ds, &base, DeltaAxis::MonthOverMonth, Measure::Quantity).unwrap();
        // December 2022 exists in the data but is not the comparison period.
        assert_eq!(mom, PeriodDelta::new(140.0, 0.0));
    }

    #[test]
    fn extreme_periods_have_an_empty_previous_side() {
        let ds = sample();
        let base = Criteria::new().year(2023).month(i32::MIN);
        let mom = period_delta(&ds, &base, DeltaAxis::MonthOverMonth, Measure::Quantity).unwrap();
        assert_eq!(mom, PeriodDelta::new(0.0, 0.0));

        let base = Criteria::new().year(i32::MIN).month(1);
        for axis in [DeltaAxis::YearOverYear, DeltaAxis::YearMonthOverYear] {
            let d = period_delta(&ds, &base, axis, Measure::Quantity).unwrap();
            assert_eq!(d, PeriodDelta::new(0.0, 0.0));
        }
    }

    #[test]
    fn period_delta_requires_year_and_month() {
        let ds = sample();
        let err = period_delta(&ds, &Criteria::new(), DeltaAxis::YearOverYear, Measure::Quantity)
            .unwrap_err();
        assert!(matches!(err, ReportError::MissingCriterion("year")));
        let err = period_delta(
            &ds,
            &Criteria::new().year(2023),
            DeltaAxis::MonthOverMonth,
            Measure::Quantity,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::MissingCriterion("month")));
    }

    #[test]
    fn selector_domains() {
        let ds = sample();
        assert_eq!(years(&ds), vec![2022, 2023]);
        assert_eq!(months(&ds), vec![1, 2, 12]);
        assert_eq!(default_year(&ds, 1), Some(2022));
        assert_eq!(default_year(&ds, 5), Some(2022));
        assert_eq!(default_year(&Dataset::new(Schema::default(), vec![]), 1), None);
        assert!(customers(&ds).is_err());
    }
}
