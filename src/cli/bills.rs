use comfy_table::Cell;
use serde::Serialize;

use crate::calendar::{BillDay, bills_by_day};
use crate::client::{Bill, BillDraft, BillQuery, FinanceClient};
use crate::validate::validate_bill;

use super::render::{KeyValueRow, TableRow, money_cell, print_json, render_output};
use super::{BillEditArgs, BillsCalendarArgs, BillsCmd, Cli, OutputFormat};

pub(super) fn run_bills(cli: &Cli, client: &FinanceClient, cmd: BillsCmd) -> anyhow::Result<()> {
    match cmd {
        BillsCmd::List(args) => {
            if let (Some(from), Some(to)) = (args.from, args.to)
                && from > to
            {
                anyhow::bail!("--from {from} is after --to {to}");
            }
            let query = BillQuery {
                skip: args.skip,
                limit: args.limit,
                start_date: args.from,
                end_date: args.to,
                category: args.category,
            };
            let items = client.list_bills(&query)?;
            if cli.output == OutputFormat::Json {
                return print_json(&items);
            }
            if items.is_empty() {
                println!("No bills found.");
                return Ok(());
            }
            let rows = items.iter().map(|b| BillRow::new(cli, b)).collect::<Vec<_>>();
            render_output(cli, rows)
        }
        BillsCmd::Show { id } => {
            let b = client.get_bill(id)?;
            render_bill_detail(cli, b)
        }
        BillsCmd::Add(args) => {
            let draft = BillDraft {
                name: args.name.trim().to_string(),
                amount: args.amount,
                due_date: args.due_date,
                category: args.category.trim().to_string(),
                is_recurring: args.recurring,
                frequency: args.frequency,
            };
            validate_bill(&draft)?;

            if cli.dry_run {
                println!("dry-run: would create bill:");
                return print_json(&draft);
            }
            super::confirm_write(
                cli,
                &format!(
                    "Create bill {:?} ({}) due {}",
                    draft.name,
                    super::format_money(draft.amount, &cli.currency),
                    draft.due_date
                ),
            )?;
            let b = client.create_bill(&draft)?;
            render_bill_detail(cli, b)
        }
        BillsCmd::Edit(args) => {
            // The API replaces bills wholesale, so merge the edits over the stored bill.
            let current = client.get_bill(args.id)?;
            let draft = merge_bill_edit(&current, &args);
            if draft == BillDraft::from(&current) {
                anyhow::bail!("nothing to change; pass at least one field to edit");
            }
            validate_bill(&draft)?;

            if cli.dry_run {
                println!("dry-run: would update bill {}:", args.id);
                return print_json(&draft);
            }
            super::confirm_write(cli, &format!("Update bill {}", args.id))?;
            let b = client.update_bill(args.id, &draft)?;
            render_bill_detail(cli, b)
        }
        BillsCmd::Calendar(args) => run_calendar(cli, client, args),
        BillsCmd::Delete { id } => {
            if cli.dry_run {
                println!("dry-run: would delete bill {id}");
                return Ok(());
            }
            super::confirm_write(cli, &format!("Delete bill {id}"))?;
            let result = client.delete_bill(id)?;
            render_output(
                cli,
                vec![
                    KeyValueRow::new("id", id.to_string()),
                    KeyValueRow::new("status", result.status.unwrap_or_else(|| "success".into())),
                    KeyValueRow::new("message", result.message.unwrap_or_default()),
                ],
            )
        }
    }
}

fn run_calendar(cli: &Cli, client: &FinanceClient, args: BillsCalendarArgs) -> anyhow::Result<()> {
    let period = args.period.resolve();
    let (start, end) = period.date_range();
    let bills = client.list_bills(&BillQuery {
        start_date: Some(start),
        end_date: Some(end),
        category: args.category,
        ..Default::default()
    })?;
    let days = bills_by_day(&bills, start, end);

    if cli.output == OutputFormat::Json {
        return print_json(&days);
    }
    if days.is_empty() {
        println!("No bills due in {period}.");
        return Ok(());
    }
    let rows = days.iter().map(|d| CalendarRow::new(cli, d)).collect::<Vec<_>>();
    render_output(cli, rows)?;
    let total: f64 = days.iter().map(|d| d.total).sum();
    println!("{period} · {} due · {}", count_bills(&days), super::money(cli, total));
    Ok(())
}

fn count_bills(days: &[BillDay]) -> usize {
    days.iter().map(|d| d.bills.len()).sum()
}

#[derive(Debug, Clone, Serialize)]
struct CalendarRow {
    date: String,
    bills: String,
    #[serde(skip)]
    total: Cell,
}

impl CalendarRow {
    fn new(cli: &Cli, day: &BillDay) -> Self {
        Self {
            date: day.date.format("%a %d %b").to_string(),
            bills: day
                .bills
                .iter()
                .map(|b| b.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            total: money_cell(cli, -day.total),
        }
    }
}

impl TableRow for CalendarRow {
    const HEADERS: &'static [&'static str] = &["due", "bills", "total"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::new(&self.date),
            Cell::new(&self.bills),
            self.total.clone(),
        ]
    }
}

fn merge_bill_edit(current: &Bill, args: &BillEditArgs) -> BillDraft {
    let mut draft = BillDraft::from(current);
    if let Some(name) = &args.name {
        draft.name = name.trim().to_string();
    }
    if let Some(amount) = args.amount {
        draft.amount = amount;
    }
    if let Some(due) = args.due_date {
        draft.due_date = due;
    }
    if let Some(category) = &args.category {
        draft.category = category.trim().to_string();
    }
    if let Some(recurring) = args.recurring {
        draft.is_recurring = recurring;
        if !recurring {
            draft.frequency = None;
        }
    }
    if args.frequency.is_some() {
        draft.frequency = args.frequency;
    }
    draft
}

#[derive(Debug, Clone, Serialize)]
struct BillRow {
    id: String,
    name: String,
    due_date: String,
    category: String,
    recurring: String,
    #[serde(skip)]
    amount: Cell,
}

impl BillRow {
    fn new(cli: &Cli, b: &Bill) -> Self {
        Self {
            id: b.id.to_string(),
            name: b.name.clone(),
            due_date: b.due_date.to_string(),
            category: b.category.clone(),
            recurring: if b.is_recurring {
                b.frequency
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "yes".to_string())
            } else {
                String::new()
            },
            amount: money_cell(cli, b.amount),
        }
    }
}

impl TableRow for BillRow {
    const HEADERS: &'static [&'static str] =
        &["id", "name", "amount", "due", "category", "recurring"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::new(&self.id),
            Cell::new(&self.name),
            self.amount.clone(),
            Cell::new(&self.due_date),
            Cell::new(&self.category),
            Cell::new(&self.recurring),
        ]
    }
}

fn render_bill_detail(cli: &Cli, b: Bill) -> anyhow::Result<()> {
    if cli.output == OutputFormat::Json {
        return print_json(&b);
    }
    render_output(
        cli,
        vec![
            KeyValueRow::new("id", b.id.to_string()),
            KeyValueRow::new("name", b.name.clone()),
            KeyValueRow::new("amount", super::money(cli, b.amount)),
            KeyValueRow::new("due_date", b.due_date.to_string()),
            KeyValueRow::new("category", b.category.clone()),
            KeyValueRow::new("recurring", b.is_recurring.to_string()),
            KeyValueRow::new(
                "frequency",
                b.frequency.map(|f| f.to_string()).unwrap_or_default(),
            ),
        ],
    )
}
