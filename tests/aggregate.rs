mod common;

use common::{date, dec, record, sample_dataset, synthetic};
use rust_decimal::Decimal;
use superstore_dash::{
    aggregate::{self, TOP_CUSTOMERS},
    filter::{FilterSelection, filter_dataset},
    render,
};

fn keys<T>(items: &[T], key: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|item| key(item).to_string()).collect()
}

#[test]
fn summary_of_two_records_matches_hand_totals() {
    let dataset = synthetic(vec![
        record("A-1", "Ann", "100", "20"),
        record("A-2", "Bob", "50", "-10"),
    ]);
    let view = filter_dataset(&dataset, &FilterSelection::all());
    let summary = aggregate::summarize(&view);

    assert_eq!(summary.total_sales, dec("150"));
    assert_eq!(summary.total_profit, dec("10"));
    assert_eq!(
        summary.profit_margin.map(|m| m.round_dp(4)),
        Some(dec("0.0667"))
    );
    assert_eq!(summary.order_count, 2);
    assert_eq!(summary.total_losses, dec("10"));
    assert_eq!(summary.record_count, 2);
}

#[test]
fn shared_order_ids_count_once() {
    let dataset = synthetic(vec![
        record("A-1", "Ann", "10", "1"),
        record("A-1", "Ann", "10", "1"),
        record("A-2", "Ann", "10", "1"),
    ]);
    let view = filter_dataset(&dataset, &FilterSelection::all());
    assert_eq!(aggregate::summarize(&view).order_count, 2);
}

#[test]
fn empty_view_summarizes_to_zero_without_margin() {
    let dataset = sample_dataset();
    let selection =
        FilterSelection::with_range(Some(date(2030, 1, 1)), None).expect("valid range");
    let view = filter_dataset(&dataset, &selection);
    assert!(view.is_empty());

    let summary = aggregate::summarize(&view);
    assert_eq!(summary.total_sales, Decimal::ZERO);
    assert_eq!(summary.total_profit, Decimal::ZERO);
    assert_eq!(summary.profit_margin, None);
    assert_eq!(summary.order_count, 0);

    let overview = aggregate::overview(&view);
    assert!(overview.monthly.is_empty());
    assert!(overview.by_category.is_empty());
    assert!(overview.processing_histogram.is_empty());
    assert!(aggregate::profit(&view).losses.is_none());
}

#[test]
fn overview_of_sample() {
    let dataset = sample_dataset();
    let view = filter_dataset(&dataset, &FilterSelection::all());
    let overview = aggregate::overview(&view);

    let metrics = &overview.metrics;
    assert_eq!(metrics.total_sales, dec("4109.9755"));
    assert_eq!(metrics.total_profit, dec("22.1976"));
    assert_eq!(metrics.order_count, 8);
    assert_eq!(metrics.total_losses, dec("506.889"));
    assert_eq!(metrics.record_count, 12);
    assert_eq!(
        metrics.profit_margin.map(|m| m.round_dp(4)),
        Some(dec("0.0054"))
    );

    assert_eq!(
        keys(&overview.by_category, |g| g.key.as_str()),
        ["Furniture", "Office Supplies", "Technology"]
    );
    assert_eq!(overview.by_category[0].sales, dec("2000.3375"));
    assert_eq!(overview.by_category[0].profit, dec("-107.366"));
    assert_eq!(
        keys(&overview.by_region, |g| g.key.as_str()),
        ["South", "West", "Central"]
    );
    assert_eq!(overview.by_region[2].profit, dec("-110.5404"));
}

#[test]
fn group_totals_add_back_to_summary() {
    let dataset = sample_dataset();
    let view = filter_dataset(&dataset, &FilterSelection::all());
    let overview = aggregate::overview(&view);
    let total = overview.metrics.total_sales;

    let by_category = overview.by_category.iter().map(|g| g.sales).sum::<Decimal>();
    let by_region = overview.by_region.iter().map(|g| g.sales).sum::<Decimal>();
    let by_month = overview.monthly.iter().map(|p| p.sales).sum::<Decimal>();
    let profit_by_month = overview.monthly.iter().map(|p| p.profit).sum::<Decimal>();
    assert_eq!(by_category, total);
    assert_eq!(by_region, total);
    assert_eq!(by_month, total);
    assert_eq!(profit_by_month, overview.metrics.total_profit);
}

#[test]
fn monthly_series_fills_gaps_with_zero() {
    let dataset = sample_dataset();
    let view = filter_dataset(&dataset, &FilterSelection::all());
    let monthly = aggregate::monthly_series(&view);

    assert_eq!(monthly.len(), 35);
    assert_eq!(monthly[0].month, date(2014, 6, 1));
    assert_eq!(monthly[0].sales, dec("963.292"));
    assert_eq!(monthly[1].month, date(2014, 7, 1));
    assert_eq!(monthly[1].sales, Decimal::ZERO);
    assert_eq!(monthly[34].month, date(2017, 4, 1));
    assert_eq!(monthly[34].sales, dec("15.552"));
}

#[test]
fn ship_mode_timing_and_histogram() {
    let dataset = sample_dataset();
    let view = filter_dataset(&dataset, &FilterSelection::all());

    let timing = aggregate::ship_mode_timing(&view);
    assert_eq!(timing.len(), 2);
    assert_eq!(timing[0].ship_mode, "Standard Class");
    assert_eq!(timing[0].orders, 6);
    assert!((timing[0].mean_processing_days - 50.0 / 9.0).abs() < 1e-9);
    assert_eq!(timing[1].ship_mode, "Second Class");
    assert_eq!(timing[1].orders, 2);
    assert!((timing[1].mean_processing_days - 10.0 / 3.0).abs() < 1e-9);

    let histogram = aggregate::processing_histogram(&view);
    let counts = histogram.iter().map(|b| (b.from_days, b.count)).collect::<Vec<_>>();
    assert_eq!(counts, vec![(3, 2), (4, 2), (5, 5), (6, 0), (7, 3)]);
}

#[test]
fn histogram_caps_bin_count() {
    let records = (0..60)
        .map(|offset| {
            let mut row = record(&format!("H-{offset}"), "Ann", "1", "0");
            row.ship_date = row.order_date + chrono::Days::new(offset);
            row
        })
        .collect::<Vec<_>>();
    let dataset = synthetic(records);
    let view = filter_dataset(&dataset, &FilterSelection::all());
    let histogram = aggregate::processing_histogram(&view);

    assert_eq!(histogram.len(), 20);
    assert!(histogram.iter().all(|bin| bin.to_days - bin.from_days == 2));
    assert_eq!(histogram.iter().map(|bin| bin.count).sum::<usize>(), 60);
}

#[test]
fn sales_tab_of_sample() {
    let dataset = sample_dataset();
    let view = filter_dataset(&dataset, &FilterSelection::all());
    let sales = aggregate::sales(&view);

    assert_eq!(
        keys(&sales.by_sub_category[..3], |g| g.key.as_str()),
        ["Tables", "Phones", "Chairs"]
    );
    assert_eq!(sales.by_sub_category.len(), 11);

    assert_eq!(
        keys(&sales.top_customers, |g| g.key.as_str()),
        [
            "Claire Gute",
            "Sean O'Donnell",
            "Brosina Hoffman",
            "Pete Kriz",
            "Irene Maddox",
            "Harold Pawlan",
            "Andrew Allen",
            "Darrin Van Huff",
        ]
    );
    assert_eq!(sales.top_customers[0].sales, dec("993.90"));

    assert_eq!(
        keys(&sales.top_states, |g| g.key.as_str()),
        ["Kentucky", "Florida", "California", "Wisconsin", "Washington"]
    );
    assert_eq!(sales.top_states[2].sales, dec("977.912"));

    assert_eq!(
        keys(&sales.ship_mode_share, |s| s.key.as_str()),
        ["Second Class", "Standard Class"]
    );
    assert_eq!(sales.ship_mode_share[0].value, dec("1008.52"));
    let percent_total = sales
        .segment_share
        .iter()
        .filter_map(|share| share.percent)
        .sum::<Decimal>();
    assert_eq!(percent_total.round_dp(6), dec("100"));
}

#[test]
fn top_customers_keeps_ten_highest() {
    let records = (1..=15)
        .map(|n| record(&format!("C-{n}"), &format!("Customer {n:02}"), &(n * 10).to_string(), "1"))
        .collect::<Vec<_>>();
    let dataset = synthetic(records);
    let view = filter_dataset(&dataset, &FilterSelection::all());
    let top = aggregate::sales(&view).top_customers;

    assert_eq!(top.len(), TOP_CUSTOMERS);
    let expected = (6..=15)
        .rev()
        .map(|n| format!("Customer {n:02}"))
        .collect::<Vec<_>>();
    assert_eq!(keys(&top, |g| g.key.as_str()), expected);
    assert!(top.windows(2).all(|pair| pair[0].sales >= pair[1].sales));
}

#[test]
fn ranking_ties_keep_first_seen_order() {
    let dataset = synthetic(vec![
        record("T-1", "Zed", "50", "1"),
        record("T-2", "Amy", "80", "1"),
        record("T-3", "Moe", "50", "1"),
        record("T-4", "Bea", "50", "1"),
    ]);
    let view = filter_dataset(&dataset, &FilterSelection::all());
    let groups = aggregate::group_by(view.iter(), |r| r.customer_name.as_str());
    let ranked = aggregate::top_by_sales(groups, 3);
    assert_eq!(keys(&ranked, |g| g.key.as_str()), ["Amy", "Zed", "Moe"]);
}

#[test]
fn profit_tab_of_sample() {
    let dataset = sample_dataset();
    let view = filter_dataset(&dataset, &FilterSelection::all());
    let profit = aggregate::profit(&view);

    assert_eq!(
        keys(&profit.hierarchy, |b| b.category.as_str()),
        ["Furniture", "Office Supplies", "Technology"]
    );
    assert_eq!(
        keys(&profit.hierarchy[0].children, |l| l.sub_category.as_str()),
        ["Tables", "Furnishings", "Bookcases", "Chairs"]
    );
    assert_eq!(profit.hierarchy[1].profit, dec("38.8484"));

    assert_eq!(profit.scatter.len(), 11);
    let storage = profit
        .scatter
        .iter()
        .find(|p| p.sub_category == "Storage")
        .expect("storage point");
    assert_eq!(storage.sales, dec("688.248"));
    assert_eq!(storage.quantity, 8);

    let discounts = profit
        .discount_impact
        .iter()
        .map(|d| (d.discount, d.records))
        .collect::<Vec<_>>();
    assert_eq!(
        discounts,
        vec![
            (dec("0"), 6),
            (dec("0.2"), 4),
            (dec("0.45"), 1),
            (dec("0.8"), 1)
        ]
    );
    assert_eq!(profit.discount_impact[1].average_profit, dec("57.81675"));

    let losses = profit.losses.expect("sample has losses");
    assert_eq!(
        keys(&losses.by_category, |l| l.key.as_str()),
        ["Furniture", "Office Supplies"]
    );
    assert_eq!(losses.by_category[0].losses, dec("383.031"));
    assert_eq!(keys(&losses.top_states, |l| l.key.as_str()), ["Florida", "Texas"]);
    assert_eq!(losses.top_states[1].losses, dec("123.858"));
}

#[test]
fn profitable_view_has_no_loss_analysis() {
    let dataset = synthetic(vec![
        record("P-1", "Ann", "10", "2"),
        record("P-2", "Bob", "10", "0"),
    ]);
    let view = filter_dataset(&dataset, &FilterSelection::all());
    assert!(aggregate::loss_analysis(&view).is_none());
}

#[test]
fn totals_near_the_decimal_limit_saturate() {
    let max = Decimal::MAX.to_string();
    let dataset = synthetic(vec![
        record("A-1", "Ann", &max, "1"),
        record("A-2", "Bob", &max, "-1"),
    ]);
    let view = filter_dataset(&dataset, &FilterSelection::all());

    let summary = aggregate::summarize(&view);
    assert_eq!(summary.total_sales, Decimal::MAX);
    assert_eq!(summary.total_profit, Decimal::ZERO);

    let overview = aggregate::overview(&view);
    assert_eq!(overview.by_category[0].sales, Decimal::MAX);
    let sales = aggregate::sales(&view);
    assert_eq!(sales.segment_share[0].percent, Some(Decimal::ONE_HUNDRED));
    let profit = aggregate::profit(&view);
    assert_eq!(profit.hierarchy.len(), 1);
}

#[test]
fn margin_too_large_for_a_percentage_renders_as_unavailable() {
    let dataset = synthetic(vec![record(
        "A-1",
        "Ann",
        "0.1",
        "1000000000000000000000000000",
    )]);
    let view = filter_dataset(&dataset, &FilterSelection::all());
    let summary = aggregate::summarize(&view);
    assert!(summary.profit_margin.is_some());

    let cards = render::metric_cards(&summary);
    let margin = cards
        .iter()
        .find(|card| card.label == "Profit Margin")
        .expect("margin card");
    assert_eq!(margin.value, "n/a");
}
