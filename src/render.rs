//! Render stage: maps tab aggregates to [`Page`]s of [`Panel`]s and turns
//! pages into output text.
//!
//! Building a page is pure; only the command handlers print what a
//! [`Renderer`] returns.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Serialize;

use crate::{
    aggregate::{
        DiscountImpact, GroupTotal, HistogramBin, Loss, MetricSummary, MonthlyPoint, OverviewTab,
        ProfitBranch, ProfitTab, SalesTab, ScatterPoint, Share,
    },
    format,
    table::{self, Align},
};

const DEFAULT_BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Currency,
    Count,
}

impl Unit {
    fn format(self, value: Decimal) -> String {
        match self {
            Unit::Currency => format::currency(value, 2),
            Unit::Count => value.to_usize().map_or_else(|| value.to_string(), format::count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricCard {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: Decimal,
    /// Extra columns shown next to the bar, aligned with `extra_headers`.
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub values: Vec<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Panel {
    Metrics {
        cards: Vec<MetricCard>,
    },
    Bars {
        title: String,
        label_header: String,
        value_header: String,
        unit: Unit,
        extra_headers: Vec<String>,
        bars: Vec<Bar>,
    },
    Series {
        title: String,
        columns: Vec<String>,
        points: Vec<SeriesPoint>,
    },
    Shares {
        title: String,
        slices: Vec<Share>,
    },
    Tree {
        title: String,
        branches: Vec<ProfitBranch>,
    },
    Scatter {
        title: String,
        points: Vec<ScatterPoint>,
    },
    Histogram {
        title: String,
        bins: Vec<HistogramBin>,
    },
    Notice {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub title: String,
    /// Human-readable description of the active filters.
    pub selection: String,
    pub panels: Vec<Panel>,
}

pub trait Renderer {
    fn render(&self, page: &Page) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct TextRenderer {
    pub bar_width: usize,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            bar_width: DEFAULT_BAR_WIDTH,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JsonRenderer {
    pub pretty: bool,
}

impl Renderer for JsonRenderer {
    fn render(&self, page: &Page) -> Result<String> {
        let mut text = if self.pretty {
            serde_json::to_string_pretty(page)
        } else {
            serde_json::to_string(page)
        }
        .with_context(|| format!("Serializing page '{}'", page.title))?;
        text.push('\n');
        Ok(text)
    }
}

impl Renderer for TextRenderer {
    fn render(&self, page: &Page) -> Result<String> {
        let mut out = String::new();
        let _ = writeln!(out, "== {} ==", page.title);
        let _ = writeln!(out, "Filters: {}", page.selection);
        for panel in &page.panels {
            out.push('\n');
            self.render_panel(&mut out, panel);
        }
        Ok(out)
    }
}

impl TextRenderer {
    fn render_panel(&self, out: &mut String, panel: &Panel) {
        match panel {
            Panel::Metrics { cards } => {
                let headers = cards.iter().map(|c| c.label.clone()).collect::<Vec<_>>();
                let values = vec![cards.iter().map(|c| c.value.clone()).collect::<Vec<_>>()];
                out.push_str(&table::render_table(&headers, &values));
            }
            Panel::Bars {
                title,
                label_header,
                value_header,
                unit,
                extra_headers,
                bars,
            } => {
                let _ = writeln!(out, "{title}");
                if bars.is_empty() {
                    out.push_str("(no data)\n");
                    return;
                }
                let scale = max_abs(bars.iter().map(|b| b.value));
                let mut headers = vec![label_header.clone(), value_header.clone()];
                headers.extend(extra_headers.iter().cloned());
                headers.push(String::new());
                let rows = bars
                    .iter()
                    .map(|bar| {
                        let mut row = vec![bar.label.clone(), unit.format(bar.value)];
                        row.extend(bar.extra.iter().cloned());
                        row.push(self.bar(bar.value, scale));
                        row
                    })
                    .collect::<Vec<_>>();
                let mut aligns = vec![Align::Left];
                aligns.extend(std::iter::repeat_n(Align::Right, extra_headers.len() + 1));
                out.push_str(&table::render_aligned(&headers, &rows, &aligns));
            }
            Panel::Series {
                title,
                columns,
                points,
            } => {
                let _ = writeln!(out, "{title}");
                if points.is_empty() {
                    out.push_str("(no data)\n");
                    return;
                }
                let scale = max_abs(points.iter().filter_map(|p| p.values.first().copied()));
                let mut headers = vec!["Month".to_string()];
                headers.extend(columns.iter().cloned());
                headers.push(String::new());
                let rows = points
                    .iter()
                    .map(|point| {
                        let mut row = vec![point.label.clone()];
                        row.extend(point.values.iter().map(|v| format::currency(*v, 2)));
                        let lead = point.values.first().copied().unwrap_or_default();
                        row.push(self.bar(lead, scale));
                        row
                    })
                    .collect::<Vec<_>>();
                let mut aligns = vec![Align::Left];
                aligns.extend(std::iter::repeat_n(Align::Right, columns.len()));
                out.push_str(&table::render_aligned(&headers, &rows, &aligns));
            }
            Panel::Shares { title, slices } => {
                let _ = writeln!(out, "{title}");
                if slices.is_empty() {
                    out.push_str("(no data)\n");
                    return;
                }
                let scale = max_abs(slices.iter().map(|s| s.value));
                let headers = ["", "Sales", "Share", ""].map(String::from).to_vec();
                let rows = slices
                    .iter()
                    .map(|slice| {
                        vec![
                            slice.key.clone(),
                            format::currency(slice.value, 2),
                            format::share(slice.percent),
                            self.bar(slice.value, scale),
                        ]
                    })
                    .collect::<Vec<_>>();
                out.push_str(&table::render_aligned(
                    &headers,
                    &rows,
                    &[Align::Left, Align::Right, Align::Right],
                ));
            }
            Panel::Tree { title, branches } => {
                let _ = writeln!(out, "{title}");
                if branches.is_empty() {
                    out.push_str("(no data)\n");
                    return;
                }
                let scale = max_abs(
                    branches
                        .iter()
                        .flat_map(|b| b.children.iter().map(|leaf| leaf.profit)),
                );
                let headers = ["Category / Sub-Category", "Profit", ""]
                    .map(String::from)
                    .to_vec();
                let mut rows = Vec::new();
                for branch in branches {
                    rows.push(vec![
                        branch.category.clone(),
                        format::currency(branch.profit, 2),
                        String::new(),
                    ]);
                    for leaf in &branch.children {
                        rows.push(vec![
                            format!("  {}", leaf.sub_category),
                            format::currency(leaf.profit, 2),
                            self.bar(leaf.profit, scale),
                        ]);
                    }
                }
                out.push_str(&table::render_aligned(
                    &headers,
                    &rows,
                    &[Align::Left, Align::Right],
                ));
            }
            Panel::Scatter { title, points } => {
                let _ = writeln!(out, "{title}");
                if points.is_empty() {
                    out.push_str("(no data)\n");
                    return;
                }
                let headers = ["Sub-Category", "Sales", "Profit", "Quantity"]
                    .map(String::from)
                    .to_vec();
                let rows = points
                    .iter()
                    .map(|point| {
                        vec![
                            point.sub_category.clone(),
                            format::currency(point.sales, 2),
                            format::currency(point.profit, 2),
                            point.quantity.to_string(),
                        ]
                    })
                    .collect::<Vec<_>>();
                out.push_str(&table::render_aligned(
                    &headers,
                    &rows,
                    &[Align::Left, Align::Right, Align::Right, Align::Right],
                ));
            }
            Panel::Histogram { title, bins } => {
                let _ = writeln!(out, "{title}");
                if bins.is_empty() {
                    out.push_str("(no data)\n");
                    return;
                }
                let scale = max_abs(bins.iter().map(|b| Decimal::from(b.count)));
                let headers = ["Days", "Records", ""].map(String::from).to_vec();
                let rows = bins
                    .iter()
                    .map(|bin| {
                        let label = if bin.from_days == bin.to_days {
                            bin.from_days.to_string()
                        } else {
                            format!("{}-{}", bin.from_days, bin.to_days)
                        };
                        vec![
                            label,
                            format::count(bin.count),
                            self.bar(Decimal::from(bin.count), scale),
                        ]
                    })
                    .collect::<Vec<_>>();
                out.push_str(&table::render_aligned(
                    &headers,
                    &rows,
                    &[Align::Right, Align::Right],
                ));
            }
            Panel::Notice { message } => {
                let _ = writeln!(out, "{message}");
            }
        }
    }

    /// Proportional bar; negative values use a lighter glyph.
    fn bar(&self, value: Decimal, scale: Decimal) -> String {
        if scale.is_zero() {
            return String::new();
        }
        let ratio = (value.abs() / scale).to_f64().unwrap_or_default();
        let len = (ratio * self.bar_width as f64).round() as usize;
        let glyph = if value.is_sign_negative() { '░' } else { '█' };
        std::iter::repeat_n(glyph, len.min(self.bar_width)).collect()
    }
}

fn max_abs(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.map(|v| v.abs()).max().unwrap_or_default()
}

pub fn metric_cards(metrics: &MetricSummary) -> Vec<MetricCard> {
    let card = |label: &str, value: String| MetricCard {
        label: label.to_string(),
        value,
    };
    vec![
        card("Total Sales", format::currency(metrics.total_sales, 0)),
        card("Total Profit", format::currency(metrics.total_profit, 0)),
        card("Profit Margin", format::percent(metrics.profit_margin, 1)),
        card("Total Losses", format::currency(metrics.total_losses, 0)),
        card("Total Orders", format::count(metrics.order_count)),
    ]
}

fn sales_bars(title: &str, label_header: &str, groups: &[GroupTotal], with_margin: bool) -> Panel {
    let mut extra_headers = vec!["Profit".to_string()];
    if with_margin {
        extra_headers.push("Margin".to_string());
    }
    Panel::Bars {
        title: title.to_string(),
        label_header: label_header.to_string(),
        value_header: "Sales".to_string(),
        unit: Unit::Currency,
        extra_headers,
        bars: groups
            .iter()
            .map(|group| {
                let mut extra = vec![format::currency(group.profit, 2)];
                if with_margin {
                    extra.push(format::percent(group.margin, 2));
                }
                Bar {
                    label: group.key.clone(),
                    value: group.sales,
                    extra,
                }
            })
            .collect(),
    }
}

fn monthly_panel(monthly: &[MonthlyPoint]) -> Panel {
    Panel::Series {
        title: "Monthly Sales Trend".to_string(),
        columns: vec!["Sales".to_string(), "Profit".to_string()],
        points: monthly
            .iter()
            .map(|point| SeriesPoint {
                label: point.month.format("%Y-%m").to_string(),
                values: vec![point.sales, point.profit],
            })
            .collect(),
    }
}

fn discount_panel(impacts: &[DiscountImpact]) -> Panel {
    Panel::Bars {
        title: "Average Profit by Discount Level".to_string(),
        label_header: "Discount".to_string(),
        value_header: "Avg Profit".to_string(),
        unit: Unit::Currency,
        extra_headers: vec!["Avg Sales".to_string(), "Records".to_string()],
        bars: impacts
            .iter()
            .map(|impact| Bar {
                label: format::percent(Some(impact.discount), 0),
                value: impact.average_profit,
                extra: vec![
                    format::currency(impact.average_sales, 2),
                    format::count(impact.records),
                ],
            })
            .collect(),
    }
}

pub fn overview_page(tab: &OverviewTab, selection: &str) -> Page {
    let timing = Panel::Bars {
        title: "Total Orders by Ship Mode".to_string(),
        label_header: "Ship Mode".to_string(),
        value_header: "Orders".to_string(),
        unit: Unit::Count,
        extra_headers: vec!["Avg Processing".to_string()],
        bars: tab
            .ship_mode_timing
            .iter()
            .map(|row| Bar {
                label: row.ship_mode.clone(),
                value: Decimal::from(row.orders),
                extra: vec![format!("{:.1} days", row.mean_processing_days)],
            })
            .collect(),
    };
    Page {
        title: "Overview".to_string(),
        selection: selection.to_string(),
        panels: vec![
            Panel::Metrics {
                cards: metric_cards(&tab.metrics),
            },
            monthly_panel(&tab.monthly),
            sales_bars("Sales and Profit by Category", "Category", &tab.by_category, true),
            sales_bars("Sales and Profit by Region", "Region", &tab.by_region, true),
            timing,
            Panel::Histogram {
                title: "Processing Time Distribution".to_string(),
                bins: tab.processing_histogram.clone(),
            },
        ],
    }
}

pub fn sales_page(tab: &SalesTab, selection: &str) -> Page {
    let sub_categories = Panel::Bars {
        title: "Sales by Sub-Category".to_string(),
        label_header: "Sub-Category".to_string(),
        value_header: "Sales".to_string(),
        unit: Unit::Currency,
        extra_headers: Vec::new(),
        bars: tab
            .by_sub_category
            .iter()
            .map(|group| Bar {
                label: group.key.clone(),
                value: group.sales,
                extra: Vec::new(),
            })
            .collect(),
    };
    Page {
        title: "Sales Analysis".to_string(),
        selection: selection.to_string(),
        panels: vec![
            sub_categories,
            Panel::Shares {
                title: "Sales by Ship Mode".to_string(),
                slices: tab.ship_mode_share.clone(),
            },
            Panel::Shares {
                title: "Sales by Customer Segment".to_string(),
                slices: tab.segment_share.clone(),
            },
            sales_bars(
                "Top 10 Customers by Sales",
                "Customer",
                &tab.top_customers,
                false,
            ),
            sales_bars("Top 5 States by Total Sales", "State", &tab.top_states, true),
        ],
    }
}

pub fn profit_page(tab: &ProfitTab, selection: &str) -> Page {
    let mut panels = vec![
        Panel::Tree {
            title: "Profit by Category and Sub-Category".to_string(),
            branches: tab.hierarchy.clone(),
        },
        Panel::Scatter {
            title: "Profit vs Sales by Sub-Category".to_string(),
            points: tab.scatter.clone(),
        },
        discount_panel(&tab.discount_impact),
    ];
    match &tab.losses {
        Some(losses) => {
            let loss_bars = |title: &str, header: &str, rows: &[Loss]| {
                Panel::Bars {
                    title: title.to_string(),
                    label_header: header.to_string(),
                    value_header: "Losses".to_string(),
                    unit: Unit::Currency,
                    extra_headers: Vec::new(),
                    bars: rows
                        .iter()
                        .map(|loss| Bar {
                            label: loss.key.clone(),
                            value: loss.losses,
                            extra: Vec::new(),
                        })
                        .collect(),
                }
            };
            panels.push(loss_bars(
                "Total Losses by Category",
                "Category",
                &losses.by_category,
            ));
            panels.push(loss_bars(
                "Top 5 States by Total Losses",
                "State",
                &losses.top_states,
            ));
        }
        None => panels.push(Panel::Notice {
            message: "No loss-making transactions found in the filtered data.".to_string(),
        }),
    }
    Page {
        title: "Profit/Loss Analysis".to_string(),
        selection: selection.to_string(),
        panels,
    }
}
