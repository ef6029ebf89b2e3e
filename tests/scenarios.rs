use regional_sales::loader::{self, DatasetKind};
use regional_sales::{
    aggregate, filter, period_delta, top_n, total, Criteria, Dataset, DeltaAxis, GroupBy, GroupKey,
    Measure, PeriodDelta, RegionFilter, RegionLabel, RegionTable, Schema, SourceRecord,
};

fn source(state: &str, year: i32, month: i32, qty: f64) -> SourceRecord {
    SourceRecord {
        region_source_name: state.to_string(),
        year,
        month,
        quantity: qty,
        customer_name: None,
        material_description: None,
        event_date: None,
    }
}

fn customer_line(state: &str, customer: &str, qty: f64) -> SourceRecord {
    SourceRecord {
        customer_name: Some(customer.to_string()),
        ..source(state, 2023, 6, qty)
    }
}

fn lagos_pair() -> Dataset {
    RegionTable::default_table().classify_all(
        Schema::default(),
        vec![
            source("Lagos", 2023, 1, 100.0),
            source("Lagos", 2022, 1, 80.0),
        ],
    )
}

fn mixed() -> Dataset {
    RegionTable::default_table().classify_all(
        Schema::default(),
        vec![
            source("Lagos", 2023, 1, 100.0),
            source("Kano", 2023, 1, 12.5),
            source("Kaduna", 2023, 2, 7.5),
            source("Rivers", 2022, 11, 40.0),
            source("Mars", 2023, 1, 3.0),
            source("Delta", 2023, 1, 9.0),
            source("Lagos", 2022, 1, 80.0),
        ],
    )
}

#[test]
fn same_month_last_year_for_lagos() {
    let base = Criteria::new()
        .in_region(RegionLabel::Lagos)
        .year(2023)
        .month(1);
    let d = period_delta(
        &lagos_pair(),
        &base,
        DeltaAxis::YearMonthOverYear,
        Measure::Quantity,
    )
    .unwrap();
    assert_eq!(d, PeriodDelta::new(100.0, 80.0));
    assert_eq!(d.delta, 20.0);
}

#[test]
fn january_against_month_zero() {
    let base = Criteria::new().year(2023).month(1);
    let d = period_delta(
        &lagos_pair(),
        &base,
        DeltaAxis::MonthOverMonth,
        Measure::Quantity,
    )
    .unwrap();
    assert_eq!((d.current, d.previous, d.delta), (100.0, 0.0, 100.0));
}

#[test]
fn classify_known_and_unknown_states() {
    let table = RegionTable::default_table();
    assert_eq!(table.classify("Lagos"), RegionLabel::Lagos);
    assert_eq!(table.classify("Lagos").to_string(), "LAGOS");
    assert_eq!(table.classify("Mars"), RegionLabel::Other);
}

#[test]
fn top_two_customers() {
    let ds = RegionTable::default_table().classify_all(
        Schema {
            customer_name: true,
            ..Schema::default()
        },
        vec![
            customer_line("Lagos", "A", 50.0),
            customer_line("Lagos", "C", 20.0),
            customer_line("Lagos", "B", 30.0),
        ],
    );
    let top = top_n(&ds, GroupBy::CustomerName, Measure::Quantity, 2).unwrap();
    let pairs: Vec<(String, f64)> = top.iter().map(|g| (g.key.to_string(), g.total)).collect();
    assert_eq!(
        pairs,
        vec![("A".to_string(), 50.0), ("B".to_string(), 30.0)]
    );
}

#[test]
fn group_sums_match_record_sums() {
    let ds = mixed();
    for group_by in [GroupBy::Region, GroupBy::Year, GroupBy::Month] {
        let groups = aggregate(&ds, group_by, Measure::Quantity).unwrap();
        for g in &groups {
            let expected: f64 = ds
                .iter()
                .filter(|r| r.group_key(group_by).as_ref() == Some(&g.key))
                .map(|r| r.quantity)
                .sum();
            assert_eq!(g.total, expected, "{:?} {}", group_by, g.key);
        }
        let keys: Vec<&GroupKey> = groups.iter().map(|g| &g.key).collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        let grand: f64 = groups.iter().map(|g| g.total).sum();
        assert_eq!(grand, total(&ds, Measure::Quantity));
    }
}

#[test]
fn top_n_is_a_descending_prefix_of_the_grouping() {
    let ds = mixed();
    let all = aggregate(&ds, GroupBy::Region, Measure::Quantity).unwrap();
    for n in 0..6 {
        let top = top_n(&ds, GroupBy::Region, Measure::Quantity, n).unwrap();
        assert!(top.len() <= n);
        assert_eq!(top.len(), n.min(all.len()));
        assert!(top.windows(2).all(|w| w[0].total >= w[1].total));
        for g in &top {
            assert!(all.contains(g));
        }
    }
}

#[test]
fn filter_twice_equals_filter_once() {
    let ds = mixed();
    let criteria = [
        Criteria::new(),
        Criteria::new().year(2023),
        Criteria::new().in_region(RegionLabel::NorthWest).month(1),
        Criteria::new().region(RegionFilter::All).year(2022).month(11),
    ];
    for c in &criteria {
        let once = filter(&ds, c).unwrap();
        assert_eq!(filter(&once, c).unwrap(), once);
    }
}

#[test]
fn delta_sides_equal_filtered_sums() {
    let ds = mixed();
    let base = Criteria::new()
        .in_region(RegionLabel::NorthWest)
        .year(2023)
        .month(2);
    let d = period_delta(&ds, &base, DeltaAxis::MonthOverMonth, Measure::Quantity).unwrap();
    let cur = total(&filter(&ds, &base).unwrap(), Measure::Quantity);
    let prev = total(
        &filter(&ds, &base.clone().month(1)).unwrap(),
        Measure::Quantity,
    );
    assert_eq!(d.current, cur);
    assert_eq!(d.previous, prev);
    assert_eq!(d.delta, cur - prev);
    assert_eq!(d, PeriodDelta::new(7.5, 12.5));
}

#[test]
fn csv_to_overview_numbers() {
    let csv = "State,Year,Month,Tonnes\n\
               Lagos,2023,1,100\n\
               Lagos,2022,1,80\n\
               Ogun,2023,1,20\n\
               Atlantis,2023,1,1\n";
    let (schema, records, report) = loader::load_source(
        csv.as_bytes(),
        &DatasetKind::Regional.columns(),
        DatasetKind::Regional.encoding(),
    )
    .unwrap();
    assert_eq!(report.kept_rows, 4);
    let ds = RegionTable::default_table().classify_all(schema, records);
    let jan = filter(&ds, &Criteria::new().year(2023).month(1)).unwrap();
    let by_region = aggregate(&jan, GroupBy::Region, Measure::Quantity).unwrap();
    assert_eq!(
        by_region
            .iter()
            .map(|g| (g.key.to_string(), g.total))
            .collect::<Vec<_>>(),
        vec![
            ("LAGOS".to_string(), 100.0),
            ("Other".to_string(), 1.0),
            ("SOUTH WEST".to_string(), 20.0),
        ]
    );
    let yoy = period_delta(
        &ds,
        &Criteria::new().year(2023).month(1),
        DeltaAxis::YearOverYear,
        Measure::Quantity,
    )
    .unwrap();
    assert_eq!(yoy, PeriodDelta::new(121.0, 80.0));
}
