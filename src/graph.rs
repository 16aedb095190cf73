//! Shapes a [`CategorySummary`] into chart inputs: a money-flow (sankey) graph and
//! weighted treemap/pie entries. Pure functions, no I/O.

use serde::Serialize;

use crate::summary::CategorySummary;

pub const TOTAL_INCOME: &str = "Total Income";
pub const TOTAL_EXPENSES: &str = "Total Expenses";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub name: String,
}

/// Directed, weighted edge between two node indices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub source: usize,
    pub target: usize,
    pub value: f64,
    pub source_name: String,
    pub target_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowGraph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl FlowGraph {
    /// An empty graph means "render a placeholder", never an empty chart.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_name(&self, index: usize) -> Option<&str> {
        self.nodes.get(index).map(|n| n.name.as_str())
    }
}

/// Builds the income → total income → total expenses → expense category flow.
///
/// Node layout is fixed because links refer to nodes by index:
///
/// | index            | node                              |
/// |------------------|-----------------------------------|
/// | `0`              | "Total Income"                    |
/// | `1..=N`          | income categories, response order |
/// | `N+1`            | "Total Expenses"                  |
/// | `N+2..=N+M+1`    | expense categories, response order |
///
/// The `Total Income → Total Expenses` bridge is only added when total expenses are
/// positive. A summary missing either side yields an empty graph.
pub fn build_flow_graph(summary: &CategorySummary) -> FlowGraph {
    let (Some(income), Some(expenses)) = (summary.income.as_ref(), summary.expenses.as_ref())
    else {
        return FlowGraph::default();
    };

    let total_income_index = 0usize;
    let total_expenses_index = income.len() + 1;

    let mut nodes = Vec::with_capacity(income.len() + expenses.len() + 2);
    nodes.push(Node {
        name: TOTAL_INCOME.to_string(),
    });
    nodes.extend(income.iter().map(|e| Node {
        name: e.name.clone(),
    }));
    nodes.push(Node {
        name: TOTAL_EXPENSES.to_string(),
    });
    nodes.extend(expenses.iter().map(|e| Node {
        name: e.name.clone(),
    }));

    let mut links = Vec::with_capacity(income.len() + expenses.len() + 1);

    for (i, entry) in income.iter().enumerate() {
        links.push(Link {
            source: i + 1,
            target: total_income_index,
            value: entry.totals.total,
            source_name: entry.name.clone(),
            target_name: TOTAL_INCOME.to_string(),
        });
    }

    if summary.totals.expenses > 0.0 {
        links.push(Link {
            source: total_income_index,
            target: total_expenses_index,
            value: summary.totals.expenses,
            source_name: TOTAL_INCOME.to_string(),
            target_name: TOTAL_EXPENSES.to_string(),
        });
    }

    for (j, entry) in expenses.iter().enumerate() {
        links.push(Link {
            source: total_expenses_index,
            target: total_expenses_index + 1 + j,
            value: entry.totals.total,
            source_name: TOTAL_EXPENSES.to_string(),
            target_name: entry.name.clone(),
        });
    }

    FlowGraph { nodes, links }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreemapEntry {
    pub name: String,
    pub size: f64,
    pub value: f64,
}

/// Expense categories weighted by total, largest first. Ties keep response order.
pub fn build_treemap(summary: &CategorySummary) -> Vec<TreemapEntry> {
    let Some(expenses) = summary.expenses.as_ref() else {
        return Vec::new();
    };
    let mut out = expenses
        .iter()
        .map(|e| TreemapEntry {
            name: e.name.clone(),
            size: e.totals.total,
            value: e.totals.total,
        })
        .collect::<Vec<_>>();
    // `sort_by` is stable; `total_cmp` keeps the order total even with NaN present.
    out.sort_by(|a, b| b.value.total_cmp(&a.value));
    out
}

pub fn max_value(entries: &[TreemapEntry]) -> Option<f64> {
    entries.iter().map(|e| e.value).reduce(f64::max)
}

/// Fill intensity for a treemap cell, in `0.2..=1.0`.
pub fn shade(value: f64, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.2;
    }
    0.2 + (value / max) * 0.8
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomeShare {
    pub name: String,
    pub value: f64,
    pub share: f64,
}

/// Income categories in response order with their fraction of total income.
pub fn income_distribution(summary: &CategorySummary) -> Vec<IncomeShare> {
    let Some(income) = summary.income.as_ref() else {
        return Vec::new();
    };
    let sum = income.sum();
    income
        .iter()
        .map(|e| IncomeShare {
            name: e.name.clone(),
            value: e.totals.total,
            share: if sum > 0.0 { e.totals.total / sum } else { 0.0 },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{CategoryBreakdown, CategoryTotals, SummaryTotals};

    fn totals(total: f64, count: u64) -> CategoryTotals {
        CategoryTotals { total, count }
    }

    fn summary(income: &[(&str, f64)], expenses: &[(&str, f64)]) -> CategorySummary {
        let inc: CategoryBreakdown = income.iter().map(|(n, t)| (*n, totals(*t, 1))).collect();
        let exp: CategoryBreakdown = expenses.iter().map(|(n, t)| (*n, totals(*t, 1))).collect();
        CategorySummary {
            totals: SummaryTotals {
                income: inc.sum(),
                expenses: exp.sum(),
            },
            income: Some(inc),
            expenses: Some(exp),
        }
    }

    fn edges(g: &FlowGraph) -> Vec<(usize, usize, f64)> {
        g.links
            .iter()
            .map(|l| (l.source, l.target, l.value))
            .collect()
    }

    #[test]
    fn salary_rent_food_scenario() {
        let s = CategorySummary {
            income: Some([("Salary", totals(5000.0, 1))].into_iter().collect()),
            expenses: Some(
                [("Rent", totals(1500.0, 1)), ("Food", totals(300.0, 4))]
                    .into_iter()
                    .collect(),
            ),
            totals: SummaryTotals {
                income: 5000.0,
                expenses: 1800.0,
            },
        };
        let g = build_flow_graph(&s);
        let names = g.nodes.iter().map(|n| n.name.as_str()).collect::<Vec<_>>();
        assert_eq!(
            names,
            ["Total Income", "Salary", "Total Expenses", "Rent", "Food"]
        );
        assert_eq!(
            edges(&g),
            [
                (1, 0, 5000.0),
                (0, 2, 1800.0),
                (2, 3, 1500.0),
                (2, 4, 300.0)
            ]
        );
        assert_eq!(g.links[0].source_name, "Salary");
        assert_eq!(g.links[0].target_name, "Total Income");
        assert_eq!(g.links[3].target_name, "Food");
    }

    #[test]
    fn node_count_and_link_indices_are_valid() {
        let s = summary(
            &[("Salary", 4000.0), ("Bonus", 500.0), ("Interest", 12.5)],
            &[("Rent", 1200.0), ("Food", 400.0)],
        );
        let g = build_flow_graph(&s);
        assert_eq!(g.nodes.len(), 2 + 3 + 2);
        for l in &g.links {
            assert!(l.source < g.nodes.len());
            assert!(l.target < g.nodes.len());
            assert_eq!(g.node_name(l.source), Some(l.source_name.as_str()));
            assert_eq!(g.node_name(l.target), Some(l.target_name.as_str()));
        }
        let income_in: f64 = g
            .links
            .iter()
            .filter(|l| l.target == 0)
            .map(|l| l.value)
            .sum();
        assert_eq!(income_in, s.totals.income);
    }

    #[test]
    fn empty_expenses_side_has_no_expense_links() {
        let s = summary(&[("Salary", 100.0)], &[]);
        let g = build_flow_graph(&s);
        assert_eq!(g.nodes.len(), 3);
        assert_eq!(g.node_name(2), Some(TOTAL_EXPENSES));
        assert_eq!(edges(&g), [(1, 0, 100.0)]);
    }

    #[test]
    fn empty_income_side_still_bridges_expenses() {
        let s = summary(&[], &[("Rent", 900.0)]);
        let g = build_flow_graph(&s);
        let names = g.nodes.iter().map(|n| n.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["Total Income", "Total Expenses", "Rent"]);
        assert_eq!(edges(&g), [(0, 1, 900.0), (1, 2, 900.0)]);
    }

    #[test]
    fn missing_side_yields_empty_graph() {
        let mut s = summary(&[("Salary", 1.0)], &[("Rent", 1.0)]);
        s.expenses = None;
        let g = build_flow_graph(&s);
        assert!(g.is_empty());
        assert!(g.links.is_empty());
        assert!(build_flow_graph(&CategorySummary::default()).is_empty());
    }

    #[test]
    fn nan_totals_propagate_without_panicking() {
        let s = summary(&[("Salary", f64::NAN)], &[("Rent", 10.0)]);
        let g = build_flow_graph(&s);
        assert!(g.links[0].value.is_nan());
    }

    #[test]
    fn treemap_is_descending_and_stable_for_ties() {
        let s = summary(
            &[],
            &[
                ("Food", 300.0),
                ("Rent", 1500.0),
                ("Fun", 300.0),
                ("Gym", 40.0),
                ("Books", 300.0),
            ],
        );
        let tm = build_treemap(&s);
        let names = tm.iter().map(|e| e.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["Rent", "Food", "Fun", "Books", "Gym"]);
        assert!(tm.windows(2).all(|w| w[0].value >= w[1].value));
        assert!(tm.iter().all(|e| e.size == e.value));
        assert_eq!(max_value(&tm), Some(1500.0));
    }

    #[test]
    fn shade_scales_between_bounds() {
        assert_eq!(shade(0.0, 100.0), 0.2);
        assert_eq!(shade(100.0, 100.0), 1.0);
        assert_eq!(shade(5.0, 0.0), 0.2);
    }

    #[test]
    fn income_distribution_shares_sum_to_one() {
        let s = summary(&[("Salary", 750.0), ("Side", 250.0)], &[]);
        let dist = income_distribution(&s);
        assert_eq!(dist[0].share, 0.75);
        assert_eq!(dist[1].share, 0.25);

        let zero = summary(&[("Nothing", 0.0)], &[]);
        assert_eq!(income_distribution(&zero)[0].share, 0.0);
    }
}
