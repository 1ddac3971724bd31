//! Aggregation stage: per-tab summaries computed from a [`FilteredView`].
//!
//! Every grouping keys on exact field equality and sums money as exact
//! decimals, so per-group totals always add back up to the view totals.
//! Rankings sort stably, which leaves ties in first-seen order.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, Months, NaiveDate};
use itertools::{Itertools, MinMaxResult};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{dataset::Record, filter::FilteredView};

pub const TOP_CUSTOMERS: usize = 10;
pub const TOP_STATES: usize = 5;
pub const MAX_HISTOGRAM_BINS: i64 = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricSummary {
    pub total_sales: Decimal,
    pub total_profit: Decimal,
    /// `total_profit / total_sales`; `None` when there are no sales.
    pub profit_margin: Option<Decimal>,
    pub order_count: usize,
    /// Absolute sum of negative profits.
    pub total_losses: Decimal,
    pub record_count: usize,
}

pub fn margin(profit: Decimal, sales: Decimal) -> Option<Decimal> {
    profit.checked_div(sales)
}

pub fn summarize(view: &FilteredView<'_>) -> MetricSummary {
    let mut summary = MetricSummary::default();
    let mut orders = HashSet::new();
    for record in view.iter() {
        summary.total_sales = summary.total_sales.saturating_add(record.sales);
        summary.total_profit = summary.total_profit.saturating_add(record.profit);
        if record.profit.is_sign_negative() {
            summary.total_losses = summary.total_losses.saturating_sub(record.profit);
        }
        orders.insert(record.order_id.as_str());
        summary.record_count += 1;
    }
    summary.order_count = orders.len();
    summary.profit_margin = margin(summary.total_profit, summary.total_sales);
    summary
}

/// Sales and profit accumulated for one grouping key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub sales: Decimal,
    pub profit: Decimal,
    pub quantity: i64,
    pub records: usize,
    pub margin: Option<Decimal>,
}

impl GroupTotal {
    fn new(key: String) -> Self {
        Self {
            key,
            sales: Decimal::ZERO,
            profit: Decimal::ZERO,
            quantity: 0,
            records: 0,
            margin: None,
        }
    }

    fn add(&mut self, record: &Record) {
        self.sales = self.sales.saturating_add(record.sales);
        self.profit = self.profit.saturating_add(record.profit);
        self.quantity = self.quantity.saturating_add(record.quantity);
        self.records += 1;
    }
}

/// Groups records by `key`, keeping groups in first-seen order.
pub fn group_by<'a, I, F>(records: I, key: F) -> Vec<GroupTotal>
where
    I: IntoIterator<Item = &'a Record>,
    F: Fn(&Record) -> &str,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<GroupTotal> = Vec::new();
    for record in records {
        let name = key(record);
        let slot = match index.get(name) {
            Some(slot) => *slot,
            None => {
                index.insert(name.to_string(), groups.len());
                groups.push(GroupTotal::new(name.to_string()));
                groups.len() - 1
            }
        };
        groups[slot].add(record);
    }
    for group in &mut groups {
        group.margin = margin(group.profit, group.sales);
    }
    groups
}

fn by_sales_desc(mut groups: Vec<GroupTotal>) -> Vec<GroupTotal> {
    groups.sort_by(|a, b| b.sales.cmp(&a.sales));
    groups
}

/// The `n` groups with the highest sales, descending; ties keep first-seen
/// order.
pub fn top_by_sales(groups: Vec<GroupTotal>, n: usize) -> Vec<GroupTotal> {
    let mut ranked = by_sales_desc(groups);
    ranked.truncate(n);
    ranked
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyPoint {
    /// First day of the calendar month.
    pub month: NaiveDate,
    pub sales: Decimal,
    pub profit: Decimal,
}

/// Monthly sales and profit from the first to the last month present, with
/// empty months in between reported as zero.
pub fn monthly_series(view: &FilteredView<'_>) -> Vec<MonthlyPoint> {
    let mut buckets: BTreeMap<NaiveDate, (Decimal, Decimal)> = BTreeMap::new();
    for record in view.iter() {
        let entry = buckets
            .entry(month_start(record.order_date))
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        entry.0 = entry.0.saturating_add(record.sales);
        entry.1 = entry.1.saturating_add(record.profit);
    }
    let (Some(first), Some(last)) = (
        buckets.keys().next().copied(),
        buckets.keys().next_back().copied(),
    ) else {
        return Vec::new();
    };

    let mut series = Vec::new();
    let mut month = first;
    while month <= last {
        let (sales, profit) = buckets
            .get(&month)
            .copied()
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));
        series.push(MonthlyPoint {
            month,
            sales,
            profit,
        });
        match month.checked_add_months(Months::new(1)) {
            Some(next) => month = next,
            None => break,
        }
    }
    series
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipModeTiming {
    pub ship_mode: String,
    pub orders: usize,
    pub mean_processing_days: f64,
}

/// Distinct orders and mean processing time per ship mode, most orders first.
pub fn ship_mode_timing(view: &FilteredView<'_>) -> Vec<ShipModeTiming> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<(&str, HashSet<&str>, i64, usize)> = Vec::new();
    for record in view.iter() {
        let slot = *index.entry(record.ship_mode.as_str()).or_insert_with(|| {
            rows.push((record.ship_mode.as_str(), HashSet::new(), 0, 0));
            rows.len() - 1
        });
        let row = &mut rows[slot];
        row.1.insert(record.order_id.as_str());
        row.2 += record.processing_days();
        row.3 += 1;
    }
    let mut timings = rows
        .into_iter()
        .map(|(mode, orders, days, count)| ShipModeTiming {
            ship_mode: mode.to_string(),
            orders: orders.len(),
            mean_processing_days: days as f64 / count as f64,
        })
        .collect::<Vec<_>>();
    timings.sort_by(|a, b| b.orders.cmp(&a.orders));
    timings
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramBin {
    /// Inclusive lower bound in days.
    pub from_days: i64,
    /// Inclusive upper bound in days.
    pub to_days: i64,
    pub count: usize,
}

/// Processing-time distribution in equal-width whole-day bins.
pub fn processing_histogram(view: &FilteredView<'_>) -> Vec<HistogramBin> {
    let days = view.iter().map(Record::processing_days).collect::<Vec<_>>();
    let (min, max) = match days.iter().copied().minmax() {
        MinMaxResult::NoElements => return Vec::new(),
        MinMaxResult::OneElement(value) => (value, value),
        MinMaxResult::MinMax(min, max) => (min, max),
    };
    let span = max - min + 1;
    let width = (span + MAX_HISTOGRAM_BINS - 1) / MAX_HISTOGRAM_BINS;
    let bins = (span + width - 1) / width;
    let mut histogram = (0..bins)
        .map(|idx| HistogramBin {
            from_days: min + idx * width,
            to_days: min + (idx + 1) * width - 1,
            count: 0,
        })
        .collect::<Vec<_>>();
    for value in days {
        let slot = ((value - min) / width) as usize;
        histogram[slot].count += 1;
    }
    histogram
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Share {
    pub key: String,
    pub value: Decimal,
    /// Percentage of the total; `None` when the total is zero.
    pub percent: Option<Decimal>,
}

fn shares(groups: Vec<GroupTotal>) -> Vec<Share> {
    let total = groups
        .iter()
        .fold(Decimal::ZERO, |acc, g| acc.saturating_add(g.sales));
    groups
        .into_iter()
        .map(|group| Share {
            percent: group
                .sales
                .checked_div(total)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED)),
            key: group.key,
            value: group.sales,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfitLeaf {
    pub sub_category: String,
    pub profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfitBranch {
    pub category: String,
    pub profit: Decimal,
    pub children: Vec<ProfitLeaf>,
}

/// Profit by category, then sub-category; both levels sorted ascending.
pub fn profit_hierarchy(view: &FilteredView<'_>) -> Vec<ProfitBranch> {
    let categories = group_by(view.iter(), |r| r.category.as_str());
    let mut branches = categories
        .into_iter()
        .map(|category| {
            let mut children = group_by(
                view.iter().filter(|r| r.category == category.key),
                |r| r.sub_category.as_str(),
            )
            .into_iter()
            .map(|leaf| ProfitLeaf {
                sub_category: leaf.key,
                profit: leaf.profit,
            })
            .collect::<Vec<_>>();
            children.sort_by(|a, b| a.profit.cmp(&b.profit));
            ProfitBranch {
                category: category.key,
                profit: category.profit,
                children,
            }
        })
        .collect::<Vec<_>>();
    branches.sort_by(|a, b| a.profit.cmp(&b.profit));
    branches
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScatterPoint {
    pub sub_category: String,
    pub sales: Decimal,
    pub profit: Decimal,
    pub quantity: i64,
}

pub fn sales_profit_points(view: &FilteredView<'_>) -> Vec<ScatterPoint> {
    group_by(view.iter(), |r| r.sub_category.as_str())
        .into_iter()
        .map(|group| ScatterPoint {
            sub_category: group.key,
            sales: group.sales,
            profit: group.profit,
            quantity: group.quantity,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscountImpact {
    pub discount: Decimal,
    pub average_profit: Decimal,
    pub average_sales: Decimal,
    pub records: usize,
}

/// Mean profit and sales per distinct discount value, ascending discount.
pub fn discount_impact(view: &FilteredView<'_>) -> Vec<DiscountImpact> {
    let mut buckets: BTreeMap<Decimal, (Decimal, Decimal, usize)> = BTreeMap::new();
    for record in view.iter() {
        let entry = buckets
            .entry(record.discount.normalize())
            .or_insert((Decimal::ZERO, Decimal::ZERO, 0));
        entry.0 = entry.0.saturating_add(record.profit);
        entry.1 = entry.1.saturating_add(record.sales);
        entry.2 += 1;
    }
    buckets
        .into_iter()
        .map(|(discount, (profit, sales, records))| {
            let count = Decimal::from(records);
            DiscountImpact {
                discount,
                average_profit: profit / count,
                average_sales: sales / count,
                records,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Loss {
    pub key: String,
    /// Absolute value of the summed negative profit.
    pub losses: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LossAnalysis {
    pub by_category: Vec<Loss>,
    pub top_states: Vec<Loss>,
}

/// Losses over loss-making records only; `None` when nothing lost money.
pub fn loss_analysis(view: &FilteredView<'_>) -> Option<LossAnalysis> {
    let losing = view
        .iter()
        .filter(|r| r.profit.is_sign_negative() && !r.profit.is_zero())
        .collect::<Vec<_>>();
    if losing.is_empty() {
        return None;
    }
    let ranked = |groups: Vec<GroupTotal>| {
        let mut losses = groups
            .into_iter()
            .map(|group| Loss {
                key: group.key,
                losses: group.profit.abs(),
            })
            .collect::<Vec<_>>();
        losses.sort_by(|a, b| b.losses.cmp(&a.losses));
        losses
    };
    let by_category = ranked(group_by(losing.iter().copied(), |r| r.category.as_str()));
    let mut top_states = ranked(group_by(losing.iter().copied(), |r| r.state.as_str()));
    top_states.truncate(TOP_STATES);
    Some(LossAnalysis {
        by_category,
        top_states,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewTab {
    pub metrics: MetricSummary,
    pub monthly: Vec<MonthlyPoint>,
    pub by_category: Vec<GroupTotal>,
    pub by_region: Vec<GroupTotal>,
    pub ship_mode_timing: Vec<ShipModeTiming>,
    pub processing_histogram: Vec<HistogramBin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesTab {
    pub by_sub_category: Vec<GroupTotal>,
    pub ship_mode_share: Vec<Share>,
    pub segment_share: Vec<Share>,
    pub top_customers: Vec<GroupTotal>,
    pub top_states: Vec<GroupTotal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfitTab {
    pub hierarchy: Vec<ProfitBranch>,
    pub scatter: Vec<ScatterPoint>,
    pub discount_impact: Vec<DiscountImpact>,
    pub losses: Option<LossAnalysis>,
}

pub fn overview(view: &FilteredView<'_>) -> OverviewTab {
    OverviewTab {
        metrics: summarize(view),
        monthly: monthly_series(view),
        by_category: by_sales_desc(group_by(view.iter(), |r| r.category.as_str())),
        by_region: by_sales_desc(group_by(view.iter(), |r| r.region.as_str())),
        ship_mode_timing: ship_mode_timing(view),
        processing_histogram: processing_histogram(view),
    }
}

pub fn sales(view: &FilteredView<'_>) -> SalesTab {
    SalesTab {
        by_sub_category: by_sales_desc(group_by(view.iter(), |r| r.sub_category.as_str())),
        ship_mode_share: shares(group_by(view.iter(), |r| r.ship_mode.as_str())),
        segment_share: shares(group_by(view.iter(), |r| r.segment.as_str())),
        top_customers: top_by_sales(group_by(view.iter(), |r| r.customer_name.as_str()), TOP_CUSTOMERS),
        top_states: top_by_sales(group_by(view.iter(), |r| r.state.as_str()), TOP_STATES),
    }
}

pub fn profit(view: &FilteredView<'_>) -> ProfitTab {
    ProfitTab {
        hierarchy: profit_hierarchy(view),
        scatter: sales_profit_points(view),
        discount_impact: discount_impact(view),
        losses: loss_analysis(view),
    }
}
