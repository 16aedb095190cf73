use comfy_table::{Cell, CellAlignment};
use serde::Serialize;

use crate::client::{BudgetStats, FinanceClient};
use crate::graph::{
    FlowGraph, IncomeShare, TreemapEntry, build_flow_graph, build_treemap, income_distribution,
    max_value, shade,
};
use crate::period::Period;
use crate::summary::{CategoryBreakdown, CategorySummary};

use super::render::{KeyValueRow, TableRow, money_cell, print_json, render_output};
use super::{Cli, OutputFormat, StatsCmd};

const BAR_WIDTH: usize = 24;

pub(super) fn run_stats(cli: &Cli, client: &FinanceClient, cmd: StatsCmd) -> anyhow::Result<()> {
    match cmd {
        StatsCmd::Summary(args) => {
            let period = args.resolve();
            let summary = fetch_summary(client, period)?;
            render_summary(cli, period, &summary)
        }
        StatsCmd::Flow(args) => {
            let period = args.resolve();
            let graph = build_flow_graph(&fetch_summary(client, period)?);
            render_flow(cli, &graph)
        }
        StatsCmd::Treemap(args) => {
            let period = args.resolve();
            let entries = build_treemap(&fetch_summary(client, period)?);
            render_treemap(cli, &entries)
        }
        StatsCmd::Income(args) => {
            let period = args.resolve();
            let shares = income_distribution(&fetch_summary(client, period)?);
            render_income(cli, &shares)
        }
        StatsCmd::Monthly(args) => {
            let stats = client.monthly_stats(args.year, args.month)?;
            if cli.output == OutputFormat::Json {
                return print_json(&stats);
            }
            let label = match args.month {
                Some(m) => format!("{:04}-{m:02}", args.year),
                None => format!("{:04}", args.year),
            };
            render_output(
                cli,
                vec![
                    KeyValueRow::new("period", label),
                    KeyValueRow::new("income", super::money(cli, stats.total_income)),
                    KeyValueRow::new("expenses", super::money(cli, stats.total_expenses)),
                    KeyValueRow::new("net savings", super::money(cli, stats.net_savings)),
                    KeyValueRow::new("saving rate", super::format_percent(stats.saving_rate)),
                ],
            )
        }
        StatsCmd::Budget(args) => {
            let (start, end) = args.resolve().date_range();
            let stats = client.budget_stats(start, end)?;
            render_budget(cli, &stats)
        }
    }
}

fn fetch_summary(client: &FinanceClient, period: Period) -> anyhow::Result<CategorySummary> {
    let (start, end) = period.date_range();
    tracing::debug!(%period, %start, %end, "fetching category summary");
    Ok(client.category_summary(start, end)?)
}

#[derive(Debug, Clone, Serialize)]
struct SummaryOutput<'a> {
    period: String,
    #[serde(flatten)]
    summary: &'a CategorySummary,
}

fn render_summary(cli: &Cli, period: Period, summary: &CategorySummary) -> anyhow::Result<()> {
    if cli.output == OutputFormat::Json {
        return print_json(&SummaryOutput {
            period: period.to_string(),
            summary,
        });
    }
    if summary.is_empty() {
        println!("No data available for {period}.");
        return Ok(());
    }

    let mut rows = Vec::new();
    let sides = [
        ("income", summary.income.as_ref(), 1.0),
        ("expense", summary.expenses.as_ref(), -1.0),
    ];
    for (side, breakdown, sign) in sides {
        rows.extend(category_rows(cli, side, breakdown, sign));
    }
    render_output(cli, rows)?;
    println!(
        "{period} · income {} · expenses {} · net {}",
        super::money(cli, summary.totals.income),
        super::money(cli, summary.totals.expenses),
        super::money(cli, summary.totals.income - summary.totals.expenses),
    );
    Ok(())
}

fn category_rows(
    cli: &Cli,
    side: &'static str,
    breakdown: Option<&CategoryBreakdown>,
    sign: f64,
) -> Vec<CategoryRow> {
    breakdown
        .into_iter()
        .flat_map(|b| b.iter())
        .map(|e| CategoryRow {
            side,
            category: e.name.clone(),
            count: e.totals.count,
            total: e.totals.total,
            amount: money_cell(cli, sign * e.totals.total),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
struct CategoryRow {
    side: &'static str,
    category: String,
    count: u64,
    total: f64,
    #[serde(skip)]
    amount: Cell,
}

impl TableRow for CategoryRow {
    const HEADERS: &'static [&'static str] = &["type", "category", "count", "amount"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::new(self.side),
            Cell::new(&self.category),
            Cell::new(self.count).set_alignment(CellAlignment::Right),
            self.amount.clone(),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
struct FlowRow {
    from: String,
    to: String,
    amount: String,
}

impl TableRow for FlowRow {
    const HEADERS: &'static [&'static str] = &["from", "to", "amount"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::new(&self.from),
            Cell::new(&self.to),
            Cell::new(&self.amount).set_alignment(CellAlignment::Right),
        ]
    }
}

fn render_flow(cli: &Cli, graph: &FlowGraph) -> anyhow::Result<()> {
    if cli.output == OutputFormat::Json {
        return print_json(graph);
    }
    if graph.is_empty() {
        println!("No flow data available");
        return Ok(());
    }
    let rows = graph
        .links
        .iter()
        .map(|l| FlowRow {
            from: l.source_name.clone(),
            to: l.target_name.clone(),
            amount: super::money(cli, l.value),
        })
        .collect::<Vec<_>>();
    render_output(cli, rows)
}

/// Horizontal bar whose length follows the cell's shade.
fn bar(intensity: f64) -> String {
    if !intensity.is_finite() {
        return String::new();
    }
    let filled = (intensity.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(filled)
}

#[derive(Debug, Clone, Serialize)]
struct TreemapRow {
    category: String,
    amount: String,
    weight: String,
    bar: String,
}

impl TableRow for TreemapRow {
    const HEADERS: &'static [&'static str] = &["category", "amount", "weight", ""];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::new(&self.category),
            Cell::new(&self.amount).set_alignment(CellAlignment::Right),
            Cell::new(&self.weight).set_alignment(CellAlignment::Right),
            Cell::new(&self.bar),
        ]
    }
}

fn render_treemap(cli: &Cli, entries: &[TreemapEntry]) -> anyhow::Result<()> {
    if cli.output == OutputFormat::Json {
        return print_json(entries);
    }
    let Some(max) = max_value(entries) else {
        println!("No expense data available");
        return Ok(());
    };
    let rows = entries
        .iter()
        .map(|e| {
            let intensity = shade(e.value, max);
            TreemapRow {
                category: e.name.clone(),
                amount: super::money(cli, e.value),
                weight: format!("{intensity:.2}"),
                bar: bar(intensity),
            }
        })
        .collect::<Vec<_>>();
    render_output(cli, rows)
}

#[derive(Debug, Clone, Serialize)]
struct IncomeRow {
    category: String,
    amount: String,
    share: String,
}

impl TableRow for IncomeRow {
    const HEADERS: &'static [&'static str] = &["category", "amount", "share"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::new(&self.category),
            Cell::new(&self.amount).set_alignment(CellAlignment::Right),
            Cell::new(&self.share).set_alignment(CellAlignment::Right),
        ]
    }
}

fn render_income(cli: &Cli, shares: &[IncomeShare]) -> anyhow::Result<()> {
    if cli.output == OutputFormat::Json {
        return print_json(shares);
    }
    if shares.is_empty() {
        println!("No income data available");
        return Ok(());
    }
    let rows = shares
        .iter()
        .map(|s| IncomeRow {
            category: s.name.clone(),
            amount: super::money(cli, s.value),
            share: super::format_percent(s.share),
        })
        .collect::<Vec<_>>();
    render_output(cli, rows)
}

#[derive(Debug, Clone, Serialize)]
struct TrendRow {
    month: String,
    #[serde(skip)]
    available: Cell,
    #[serde(skip)]
    rollover: Cell,
}

impl TableRow for TrendRow {
    const HEADERS: &'static [&'static str] = &["month", "available", "rollover"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::new(&self.month),
            self.available.clone(),
            self.rollover.clone(),
        ]
    }
}

fn render_budget(cli: &Cli, stats: &BudgetStats) -> anyhow::Result<()> {
    if cli.output == OutputFormat::Json {
        return print_json(stats);
    }
    let income = stats.current_month.total_income;
    let expenses = stats.current_month.total_expenses;
    render_output(
        cli,
        vec![
            KeyValueRow::new("income", super::money(cli, income)),
            KeyValueRow::new("expenses", super::money(cli, expenses)),
            KeyValueRow::new("available", super::money(cli, income - expenses)),
            KeyValueRow::new("rollover", super::money(cli, stats.rollover)),
            KeyValueRow::new(
                "available with rollover",
                super::money(cli, income - expenses + stats.rollover),
            ),
        ],
    )?;
    if !stats.trend.is_empty() {
        let rows = stats
            .trend
            .iter()
            .map(|t| TrendRow {
                month: t.month.clone(),
                available: money_cell(cli, t.available),
                rollover: money_cell(cli, t.rollover),
            })
            .collect::<Vec<_>>();
        render_output(cli, rows)?;
    }
    Ok(())
}
