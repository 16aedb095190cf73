use comfy_table::{Cell, CellAlignment, Color};
use serde::Serialize;

use crate::client::{
    FinanceClient, Transaction, TransactionDraft, TransactionPatch, TransactionsPage,
};
use crate::config::Config;
use crate::query::{QueryController, QueryState};
use crate::types::TransactionKind;
use crate::validate::{validate_transaction, validate_transaction_patch};

use super::render::{KeyValueRow, TableRow, print_json, render_output, truncate_to_width};
use super::{Cli, OutputFormat, TransactionsCmd, TransactionsListArgs};

const DESCRIPTION_WIDTH: usize = 40;

pub(super) fn run_transactions(
    cli: &Cli,
    cfg: &Config,
    client: &FinanceClient,
    cmd: TransactionsCmd,
) -> anyhow::Result<()> {
    match cmd {
        TransactionsCmd::List(args) => {
            let controller = controller_from_args(&args, super::page_size(args.page_size, cfg)?);
            let page = client.list_transactions(&controller.request())?;
            render_page(cli, &controller, page)
        }
        TransactionsCmd::Browse(args) => {
            super::browse::run_browse(cli, client, super::page_size(args.page_size, cfg)?)
        }
        TransactionsCmd::Show { id } => {
            let t = client.get_transaction(id)?;
            render_transaction_detail(cli, t)
        }
        TransactionsCmd::Add(args) => {
            let draft = TransactionDraft {
                date: args.date,
                description: args.description.trim().to_string(),
                amount: args.amount,
                category: args.category.trim().to_string(),
                kind: args.kind,
                is_fixed: args.fixed,
                frequency: args.frequency,
            };
            validate_transaction(&draft)?;

            if cli.dry_run {
                println!("dry-run: would create transaction:");
                return print_json(&draft);
            }
            super::confirm_write(
                cli,
                &format!(
                    "Create {} transaction {:?} ({})",
                    draft.kind,
                    draft.description,
                    super::format_money(draft.amount, &cli.currency)
                ),
            )?;
            let t = client.create_transaction(&draft)?;
            render_transaction_detail(cli, t)
        }
        TransactionsCmd::Edit(args) => {
            let patch = TransactionPatch {
                date: args.date,
                description: args.description.map(|s| s.trim().to_string()),
                amount: args.amount,
                category: args.category.map(|s| s.trim().to_string()),
                kind: args.kind,
                is_fixed: args.fixed,
                frequency: args.frequency,
            };
            if patch.is_empty() {
                anyhow::bail!("nothing to change; pass at least one field to edit");
            }
            validate_transaction_patch(&patch)?;

            if cli.dry_run {
                println!("dry-run: would update transaction {}:", args.id);
                return print_json(&patch);
            }
            super::confirm_write(cli, &format!("Update transaction {}", args.id))?;
            let t = client.update_transaction(args.id, &patch)?;
            render_transaction_detail(cli, t)
        }
        TransactionsCmd::Delete { id } => {
            if cli.dry_run {
                println!("dry-run: would delete transaction {id}");
                return Ok(());
            }
            super::confirm_write(cli, &format!("Delete transaction {id}"))?;
            let result = client.delete_transaction(id)?;
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

fn controller_from_args(args: &TransactionsListArgs, page_size: usize) -> QueryController {
    let mut c = QueryController::new(page_size);
    if let Some(s) = args.search.as_deref() {
        c.commit_search(s);
    }
    c.set_type_filter(args.kind);
    if let Some(field) = args.sort_field {
        c.set_sort(field);
        if let Some(direction) = args.sort_direction {
            c.set_sort_direction(direction);
        }
    }
    c.set_page(args.page);
    c
}

#[derive(Debug, Clone, Serialize)]
struct PageOutput<'a> {
    #[serde(flatten)]
    page: &'a TransactionsPage,
    query: &'a QueryState,
    has_previous: bool,
    has_next: bool,
}

pub(super) fn render_page(
    cli: &Cli,
    controller: &QueryController,
    page: TransactionsPage,
) -> anyhow::Result<()> {
    let rows = page.transactions.len();
    match cli.output {
        OutputFormat::Json => print_json(&PageOutput {
            page: &page,
            query: controller.state(),
            has_previous: controller.has_previous(),
            has_next: controller.has_next(rows),
        }),
        OutputFormat::Table => {
            if page.transactions.is_empty() {
                println!("No transactions found.");
            } else {
                render_output(cli, transaction_rows(cli, &page.transactions))?;
            }
            println!("{}", page_footer(controller, rows, page.total));
            Ok(())
        }
    }
}

pub(super) fn page_footer(controller: &QueryController, rows: usize, total: Option<u64>) -> String {
    let mut parts = vec![format!("page {}", controller.state().page)];
    if let Some(total) = total {
        parts.push(format!("{total} total"));
    }
    parts.push(if controller.has_previous() {
        "prev: yes".to_string()
    } else {
        "prev: no".to_string()
    });
    parts.push(if controller.has_next(rows) {
        "next: yes".to_string()
    } else {
        "next: no".to_string()
    });
    parts.join(" · ")
}

fn transaction_rows(cli: &Cli, items: &[Transaction]) -> Vec<TransactionRow> {
    items
        .iter()
        .map(|t| TransactionRow {
            id: t.id.to_string(),
            date: t.date.to_string(),
            description: truncate_to_width(&t.description, DESCRIPTION_WIDTH),
            category: t.category.clone(),
            kind: t.kind.to_string(),
            amount: t.signed_amount(),
            fixed: t.is_fixed,
            cell: amount_cell(cli, t),
        })
        .collect()
}

fn amount_cell(cli: &Cli, t: &Transaction) -> Cell {
    let cell = Cell::new(super::signed_money(cli, t.kind, t.amount))
        .set_alignment(CellAlignment::Right);
    if !super::should_color(cli) || cli.hide_amounts {
        return cell;
    }
    match t.kind {
        TransactionKind::Income => cell.fg(Color::Green),
        TransactionKind::Expense => cell.fg(Color::Red),
    }
}

#[derive(Debug, Clone, Serialize)]
struct TransactionRow {
    id: String,
    date: String,
    description: String,
    category: String,
    #[serde(rename = "type")]
    kind: String,
    amount: f64,
    fixed: bool,
    #[serde(skip)]
    cell: Cell,
}

impl TableRow for TransactionRow {
    const HEADERS: &'static [&'static str] =
        &["id", "date", "description", "category", "type", "amount", "fixed"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::new(&self.id),
            Cell::new(&self.date),
            Cell::new(&self.description),
            Cell::new(&self.category),
            Cell::new(&self.kind),
            self.cell.clone(),
            Cell::new(if self.fixed { "✓" } else { "" }),
        ]
    }
}

fn render_transaction_detail(cli: &Cli, t: Transaction) -> anyhow::Result<()> {
    if cli.output == OutputFormat::Json {
        return print_json(&t);
    }
    render_output(
        cli,
        vec![
            KeyValueRow::new("id", t.id.to_string()),
            KeyValueRow::new("date", t.date.to_string()),
            KeyValueRow::new("description", t.description.clone()),
            KeyValueRow::new("amount", super::signed_money(cli, t.kind, t.amount)),
            KeyValueRow::new("category", t.category.clone()),
            KeyValueRow::new("type", t.kind.to_string()),
            KeyValueRow::new("fixed", t.is_fixed.to_string()),
            KeyValueRow::new(
                "frequency",
                t.frequency.map(|f| f.to_string()).unwrap_or_default(),
            ),
        ],
    )
}
