use std::path::Path;

use comfy_table::{Cell, Row as ComfyRow};
use serde::Serialize;

use crate::client::{CategorizedRow, FinanceClient, ImportResult};
use crate::import::{CsvPreview, REQUIRED_COLUMNS, preview_file};

use super::render::{KeyValueRow, TableRow, new_table, print_json, render_output, truncate_to_width};
use super::{Cli, ImportCmd, OutputFormat};

pub(super) fn run_import(cli: &Cli, client: &FinanceClient, cmd: ImportCmd) -> anyhow::Result<()> {
    match cmd {
        ImportCmd::Preview { file } => run_preview(cli, &file),
        ImportCmd::Upload(args) => {
            let preview = preview_file(&args.file)?;
            if !preview.is_uploadable() {
                anyhow::bail!(
                    "{} is missing required columns: {} (expected {})",
                    args.file.display(),
                    preview.missing_columns.join(", "),
                    REQUIRED_COLUMNS.join(", ")
                );
            }

            if cli.dry_run {
                println!(
                    "dry-run: would import {} (ai categories: {})",
                    args.file.display(),
                    args.ai_categories
                );
                return Ok(());
            }
            super::confirm_write(cli, &format!("Import transactions from {}", args.file.display()))?;
            let result = client.import_transactions(&args.file, args.ai_categories)?;
            render_import_result(cli, &result)
        }
    }
}

fn run_preview(cli: &Cli, file: &Path) -> anyhow::Result<()> {
    let preview = preview_file(file)?;
    render_preview(cli, &preview)
}

fn render_preview(cli: &Cli, preview: &CsvPreview) -> anyhow::Result<()> {
    if cli.output == OutputFormat::Json {
        return print_json(preview);
    }
    let headers = preview.headers.iter().map(String::as_str).collect::<Vec<_>>();
    let mut table = new_table(cli, &headers);
    for row in &preview.rows {
        table.add_row(ComfyRow::from(
            row.iter()
                .map(|v| Cell::new(truncate_to_width(v, 32)))
                .collect::<Vec<_>>(),
        ));
    }
    println!("{table}");
    if preview.is_uploadable() {
        println!("{} preview rows · all required columns present", preview.rows.len());
    } else {
        println!(
            "missing required columns: {}",
            preview.missing_columns.join(", ")
        );
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
struct CategorizedOut {
    row: u64,
    description: String,
    category: String,
    note: String,
}

impl From<&CategorizedRow> for CategorizedOut {
    fn from(r: &CategorizedRow) -> Self {
        let note = match (&r.manual_category, &r.ai_category) {
            (Some(manual), Some(ai)) if manual != ai => format!("file: {manual}, ai: {ai}"),
            _ => String::new(),
        };
        Self {
            row: r.row,
            description: truncate_to_width(&r.description, 40),
            category: r.category().to_string(),
            note,
        }
    }
}

impl TableRow for CategorizedOut {
    const HEADERS: &'static [&'static str] = &["row", "description", "category", "note"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::new(self.row),
            Cell::new(&self.description),
            Cell::new(&self.category),
            Cell::new(&self.note),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
struct FailedOut {
    row: u64,
    error: String,
}

impl TableRow for FailedOut {
    const HEADERS: &'static [&'static str] = &["failed row", "error"];

    fn cells(&self) -> Vec<Cell> {
        vec![Cell::new(self.row), Cell::new(&self.error)]
    }
}

/// Shows what was imported and every row that failed; a partial import still succeeds.
fn render_import_result(cli: &Cli, result: &ImportResult) -> anyhow::Result<()> {
    if result.is_partial() {
        tracing::warn!(failed = result.failed_rows.len(), "import finished with failed rows");
    }
    if cli.output == OutputFormat::Json {
        return print_json(result);
    }

    let mut summary = vec![
        KeyValueRow::new("status", result.status.clone().unwrap_or_default()),
        KeyValueRow::new("imported", result.imported.to_string()),
        KeyValueRow::new("failed", result.failed_rows.len().to_string()),
    ];
    if let Some(message) = result.message.as_ref() {
        summary.push(KeyValueRow::new("message", message.clone()));
    }
    if let Some(cat) = result.categorization.as_ref() {
        if let Some(ai) = cat.using_ai_categories {
            summary.push(KeyValueRow::new("ai categories", ai.to_string()));
        }
        if let Some(diff) = cat.different_categories {
            summary.push(KeyValueRow::new("ai disagreed on", diff.to_string()));
        }
    }
    render_output(cli, summary)?;

    if let Some(cat) = result.categorization.as_ref()
        && !cat.results.is_empty()
    {
        render_output(
            cli,
            cat.results.iter().map(CategorizedOut::from).collect::<Vec<_>>(),
        )?;
    }
    if result.is_partial() {
        render_output(
            cli,
            result
                .failed_rows
                .iter()
                .map(|f| FailedOut {
                    row: f.row,
                    error: f.error.clone(),
                })
                .collect::<Vec<_>>(),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_only_mentions_disagreement() {
        let row: CategorizedRow = serde_json::from_value(serde_json::json!({
            "row": 2, "description": "Migros", "manual_category": "Groceries",
            "ai_category": "Food", "used_category": "Food"
        }))
        .unwrap();
        let out = CategorizedOut::from(&row);
        assert_eq!(out.category, "Food");
        assert_eq!(out.note, "file: Groceries, ai: Food");

        let row: CategorizedRow = serde_json::from_value(serde_json::json!({
            "row": 3, "description": "Rent", "assigned_category": "Housing"
        }))
        .unwrap();
        let out = CategorizedOut::from(&row);
        assert_eq!(out.category, "Housing");
        assert_eq!(out.note, "");
    }
}
