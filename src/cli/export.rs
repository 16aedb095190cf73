use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use serde::Serialize;

use crate::client::{ExportQuery, FinanceClient};

use super::render::{KeyValueRow, print_json, render_output};
use super::{Cli, ExportArgs, OutputFormat};

#[derive(Debug, Clone, Serialize)]
struct ExportOutput {
    kind: String,
    path: String,
    rows: usize,
}

pub(super) fn run_export(cli: &Cli, client: &FinanceClient, args: &ExportArgs) -> anyhow::Result<()> {
    let query = export_query(args)?;
    let to_stdout = args.out.as_deref() == Some(Path::new("-"));
    let out = args.out.clone().unwrap_or_else(|| default_file_name(&query));

    if cli.dry_run {
        let target = if to_stdout {
            "stdout".to_string()
        } else {
            out.display().to_string()
        };
        println!(
            "dry-run: would export {} from {} to {} into {target}",
            query.kind, query.start_date, query.end_date
        );
        return Ok(());
    }
    if !to_stdout && out.exists() && !cli.yes {
        anyhow::bail!("{} already exists; pass --yes to overwrite it", out.display());
    }

    let csv = client.export_csv(&query)?;
    if to_stdout {
        print!("{csv}");
        return Ok(());
    }

    fs::write(&out, &csv).with_context(|| format!("failed to write {}", out.display()))?;
    let rows = data_rows(&csv);
    tracing::info!(kind = %query.kind, rows, path = %out.display(), "export written");

    let summary = ExportOutput {
        kind: query.kind.to_string(),
        path: out.display().to_string(),
        rows,
    };
    if cli.output == OutputFormat::Json {
        return print_json(&summary);
    }
    render_output(
        cli,
        vec![
            KeyValueRow::new("kind", summary.kind),
            KeyValueRow::new("file", summary.path),
            KeyValueRow::new("rows", summary.rows.to_string()),
        ],
    )
}

fn export_query(args: &ExportArgs) -> anyhow::Result<ExportQuery> {
    let (start, end) = args.period.resolve().date_range();
    let start_date = args.from.unwrap_or(start);
    let end_date = args.to.unwrap_or(end);
    if start_date > end_date {
        anyhow::bail!("export range starts {start_date}, after its end {end_date}");
    }
    Ok(ExportQuery {
        kind: args.kind,
        start_date,
        end_date,
        category: args.category.clone(),
    })
}

fn default_file_name(query: &ExportQuery) -> PathBuf {
    PathBuf::from(format!(
        "{}-{}.csv",
        query.kind,
        Local::now().date_naive().format("%Y-%m-%d")
    ))
}

/// Non-blank lines after the header.
fn data_rows(csv: &str) -> usize {
    csv.lines()
        .filter(|l| !l.trim().is_empty())
        .count()
        .saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use clap::Parser;

    use super::*;
    use crate::types::ExportKind;

    fn export_args(argv: &[&str]) -> ExportArgs {
        let mut full = vec!["finboard", "export"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            super::super::Command::Export(args) => args,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn range_comes_from_period_with_overrides() {
        let q = export_query(&export_args(&["bills", "--period", "2024-02"])).unwrap();
        assert_eq!(q.kind, ExportKind::Bills);
        assert_eq!(q.start_date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(q.end_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let q = export_query(&export_args(&[
            "transactions",
            "--period",
            "2024",
            "--from",
            "2024-06-01",
        ]))
        .unwrap();
        assert_eq!(q.start_date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(q.end_date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let args = export_args(&["transactions", "--from", "2025-03-10", "--to", "2025-03-01"]);
        assert!(export_query(&args).is_err());
    }

    #[test]
    fn counts_data_rows() {
        assert_eq!(data_rows("date,amount\n2025-01-01,3\n2025-01-02,4\n\n"), 2);
        assert_eq!(data_rows("date,amount\n"), 0);
        assert_eq!(data_rows(""), 0);
    }
}
