use crate::client::{AdvisorAnswer, FinanceClient};

use super::render::{KeyValueRow, print_json, render_output};
use super::{Cli, OutputFormat};

pub(super) fn run_categorize(
    cli: &Cli,
    client: &FinanceClient,
    description: &str,
) -> anyhow::Result<()> {
    let description = description.trim();
    if description.is_empty() {
        anyhow::bail!("description must not be empty");
    }
    let check = client.test_categorize(description)?;
    if cli.output == OutputFormat::Json {
        return print_json(&check);
    }
    if !check.success {
        anyhow::bail!(
            "could not categorize {:?}: {}",
            check.description,
            check.error.as_deref().unwrap_or("no reason given")
        );
    }
    render_output(
        cli,
        vec![
            KeyValueRow::new("description", check.description.clone()),
            KeyValueRow::new("category", check.category.clone().unwrap_or_default()),
        ],
    )
}

pub(super) fn run_ask(cli: &Cli, client: &FinanceClient, question: &str) -> anyhow::Result<()> {
    let question = question.trim();
    if question.is_empty() {
        anyhow::bail!("question must not be empty");
    }
    let answer = client.ask_advisor(question)?;
    if cli.output == OutputFormat::Json {
        return print_json(&answer);
    }
    println!("{}", answer.response.trim_end());
    match context_rows(cli, &answer) {
        Some(rows) => {
            println!();
            render_output(cli, rows)
        }
        None => Ok(()),
    }
}

fn context_rows(cli: &Cli, answer: &AdvisorAnswer) -> Option<Vec<KeyValueRow>> {
    let ctx = answer.context.as_ref()?;
    let bills_total: f64 = ctx.recurring_bills.iter().map(|b| b.amount).sum();
    Some(vec![
        KeyValueRow::new("income this month", super::money(cli, ctx.current_month.income)),
        KeyValueRow::new(
            "expenses this month",
            super::money(cli, ctx.current_month.expenses),
        ),
        KeyValueRow::new("available", super::money(cli, ctx.current_month.available)),
        KeyValueRow::new(
            "recurring bills",
            format!(
                "{} ({})",
                ctx.recurring_bills.len(),
                super::money(cli, bills_total)
            ),
        ),
    ])
}
