use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::client::{ClientMode, FinanceClient};
use crate::config::{Config, config_path, load_config, resolve_api_url};
use crate::period::Period;
use crate::query::DEFAULT_PAGE_SIZE;
use crate::types::{
    BillId, ExportKind, Frequency, SortDirection, SortField, TransactionId, TransactionKind,
};

mod advisor;
mod bills;
mod browse;
mod config;
mod export;
mod import;
mod render;
mod stats;
mod transactions;

/// What `--hide-amounts` puts in place of every amount.
pub const HIDDEN_AMOUNT: &str = "••••••";

#[derive(Debug, Clone, Copy, ValueEnum, Serialize, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "finboard")]
#[command(about = "Terminal client for the Finance Dashboard API", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub output: OutputFormat,

    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    pub color: ColorMode,

    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Skip confirmation prompts for write actions (required in non-interactive runs).
    #[arg(long, global = true, default_value_t = false)]
    pub yes: bool,

    /// API base URL (falls back to the config file, then http://localhost:8000).
    #[arg(long, global = true, env = "FINBOARD_API_URL")]
    pub api_url: Option<String>,

    #[arg(long, global = true, env = "FINBOARD_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Currency symbol used when printing amounts.
    #[arg(long, global = true, env = "FINBOARD_CURRENCY", default_value = "€")]
    pub currency: String,

    /// Mask every amount in table output.
    #[arg(long, global = true, default_value_t = false)]
    pub hide_amounts: bool,

    #[arg(long, global = true, env = "FINBOARD_FIXTURES_DIR", hide = true)]
    pub fixtures_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    Transactions {
        #[command(subcommand)]
        cmd: TransactionsCmd,
    },
    Bills {
        #[command(subcommand)]
        cmd: BillsCmd,
    },
    Stats {
        #[command(subcommand)]
        cmd: StatsCmd,
    },
    Import {
        #[command(subcommand)]
        cmd: ImportCmd,
    },
    /// Download transactions or bills as CSV.
    Export(ExportArgs),
    /// Show which category the server would assign to a description.
    Categorize { description: String },
    /// Ask the financial advisor a question about the current month.
    Ask { question: String },
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
    Version,
}

#[derive(Debug, Clone, Subcommand)]
pub enum TransactionsCmd {
    List(TransactionsListArgs),
    /// Interactive list: type `/text` to search, `next`/`prev` to page, `quit` to leave.
    Browse(TransactionsBrowseArgs),
    Show { id: TransactionId },
    Add(TransactionAddArgs),
    Edit(TransactionEditArgs),
    Delete { id: TransactionId },
}

#[derive(Debug, Clone, Args)]
pub struct TransactionsListArgs {
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Rows per page (defaults to the config file's `page_size`, then 10).
    #[arg(long)]
    pub page_size: Option<usize>,

    #[arg(long)]
    pub search: Option<String>,

    #[arg(long = "type", value_enum)]
    pub kind: Option<TransactionKind>,

    #[arg(long, value_enum)]
    pub sort_field: Option<SortField>,

    #[arg(long, value_enum, requires = "sort_field")]
    pub sort_direction: Option<SortDirection>,
}

#[derive(Debug, Clone, Args)]
pub struct TransactionsBrowseArgs {
    #[arg(long)]
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Args)]
pub struct TransactionAddArgs {
    #[arg(long)]
    pub date: NaiveDate,

    #[arg(long)]
    pub description: String,

    #[arg(long, allow_negative_numbers = true)]
    pub amount: f64,

    #[arg(long)]
    pub category: String,

    #[arg(long = "type", value_enum)]
    pub kind: TransactionKind,

    #[arg(long, default_value_t = false)]
    pub fixed: bool,

    #[arg(long, value_enum)]
    pub frequency: Option<Frequency>,
}

#[derive(Debug, Clone, Args)]
pub struct TransactionEditArgs {
    pub id: TransactionId,

    #[arg(long)]
    pub date: Option<NaiveDate>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    pub amount: Option<f64>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long = "type", value_enum)]
    pub kind: Option<TransactionKind>,

    #[arg(long)]
    pub fixed: Option<bool>,

    #[arg(long, value_enum)]
    pub frequency: Option<Frequency>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum BillsCmd {
    List(BillsListArgs),
    Show { id: BillId },
    Add(BillAddArgs),
    Edit(BillEditArgs),
    Delete { id: BillId },
    /// Bills due in the period, grouped by day.
    Calendar(BillsCalendarArgs),
}

#[derive(Debug, Clone, Args)]
pub struct BillsCalendarArgs {
    #[command(flatten)]
    pub period: PeriodArgs,

    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct BillsListArgs {
    #[arg(long, default_value_t = 0)]
    pub skip: usize,

    #[arg(long)]
    pub limit: Option<usize>,

    /// Only bills due on or after this date.
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Only bills due on or before this date.
    #[arg(long)]
    pub to: Option<NaiveDate>,

    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct BillAddArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long, allow_negative_numbers = true)]
    pub amount: f64,

    #[arg(long)]
    pub due_date: NaiveDate,

    #[arg(long, default_value = "")]
    pub category: String,

    #[arg(long, default_value_t = false)]
    pub recurring: bool,

    #[arg(long, value_enum)]
    pub frequency: Option<Frequency>,
}

#[derive(Debug, Clone, Args)]
pub struct BillEditArgs {
    pub id: BillId,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    pub amount: Option<f64>,

    #[arg(long)]
    pub due_date: Option<NaiveDate>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub recurring: Option<bool>,

    #[arg(long, value_enum)]
    pub frequency: Option<Frequency>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum StatsCmd {
    /// Category totals for the period.
    Summary(PeriodArgs),
    /// Money-flow graph: income categories into total income, out to expense categories.
    Flow(PeriodArgs),
    /// Expense categories, largest first.
    Treemap(PeriodArgs),
    /// Share of each income category.
    Income(PeriodArgs),
    Monthly(MonthlyArgs),
    /// Available budget, rollover and recent trend.
    Budget(PeriodArgs),
}

#[derive(Debug, Clone, Args)]
pub struct PeriodArgs {
    /// `YYYY-MM` for a month or `YYYY` for a whole year (default: current month).
    #[arg(long)]
    pub period: Option<Period>,
}

impl PeriodArgs {
    pub fn resolve(&self) -> Period {
        self.period.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Args)]
pub struct MonthlyArgs {
    #[arg(long)]
    pub year: i32,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ImportCmd {
    /// Show the header and first rows, and check the required columns.
    Preview { file: PathBuf },
    Upload(ImportUploadArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ImportUploadArgs {
    pub file: PathBuf,

    /// Let the server categorize rows with AI instead of the file's categories.
    #[arg(long, default_value_t = false)]
    pub ai_categories: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    #[arg(value_enum)]
    pub kind: ExportKind,

    #[command(flatten)]
    pub period: PeriodArgs,

    /// First day to export (overrides the start of `--period`).
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day to export (overrides the end of `--period`).
    #[arg(long)]
    pub to: Option<NaiveDate>,

    #[arg(long)]
    pub category: Option<String>,

    /// Where to write the CSV; `-` prints it. Defaults to `<kind>-<today>.csv`.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCmd {
    Show,
    SetApiUrl { url: String },
    Path,
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg_path = cli.config_file.clone().unwrap_or_else(config_path);
    let load = || load_config(&cfg_path);
    let connect = |cfg: &Config| {
        let client = FinanceClient::new(client_mode(&cli, cfg));
        tracing::debug!(mode = ?client.mode(), "client ready");
        client
    };

    match &cli.command {
        Command::Version => {
            println!("finboard-cli {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Config { cmd } => config::run_config(&cli, &cfg_path, &load()?, cmd.clone()),
        Command::Transactions { cmd } => {
            let cfg = load()?;
            transactions::run_transactions(&cli, &cfg, &connect(&cfg), cmd.clone())
        }
        Command::Bills { cmd } => {
            let cfg = load()?;
            bills::run_bills(&cli, &connect(&cfg), cmd.clone())
        }
        Command::Stats { cmd } => {
            let cfg = load()?;
            stats::run_stats(&cli, &connect(&cfg), cmd.clone())
        }
        Command::Import { cmd } => {
            let cfg = load()?;
            import::run_import(&cli, &connect(&cfg), cmd.clone())
        }
        Command::Export(args) => {
            let cfg = load()?;
            export::run_export(&cli, &connect(&cfg), args)
        }
        Command::Categorize { description } => {
            let cfg = load()?;
            advisor::run_categorize(&cli, &connect(&cfg), description)
        }
        Command::Ask { question } => {
            let cfg = load()?;
            advisor::run_ask(&cli, &connect(&cfg), question)
        }
    }
}

fn client_mode(cli: &Cli, cfg: &Config) -> ClientMode {
    match &cli.fixtures_dir {
        Some(dir) => ClientMode::Fixtures(dir.clone()),
        None => ClientMode::Http {
            base_url: resolve_api_url(cli.api_url.as_deref(), cfg),
        },
    }
}

fn page_size(flag: Option<usize>, cfg: &Config) -> anyhow::Result<usize> {
    let size = flag.or(cfg.page_size).unwrap_or(DEFAULT_PAGE_SIZE);
    if size == 0 {
        anyhow::bail!("page size must be at least 1");
    }
    Ok(size)
}

fn should_color(cli: &Cli) -> bool {
    match cli.color {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stdout().is_terminal(),
    }
}

fn confirm_write(cli: &Cli, action: &str) -> anyhow::Result<()> {
    if cli.dry_run {
        return Ok(());
    }
    if cli.yes {
        return Ok(());
    }
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("refusing to write in non-interactive mode without --yes");
    }

    eprintln!("{action}");
    let input = rpassword::prompt_password("Proceed? Type 'yes' to confirm: ")
        .context("failed to read confirmation")?;
    if input.trim() != "yes" {
        anyhow::bail!("aborted");
    }
    Ok(())
}

/// `€1234.50`, `-€57.48`, or `CHF 12.00` for multi-letter codes.
fn format_money(amount: f64, currency: &str) -> String {
    if !amount.is_finite() {
        return "n/a".to_string();
    }
    let sep = if currency.chars().count() > 1 { " " } else { "" };
    let abs = format!("{:.2}", amount.abs());
    if amount < 0.0 && abs != "0.00" {
        format!("-{currency}{sep}{abs}")
    } else {
        format!("{currency}{sep}{abs}")
    }
}

fn money(cli: &Cli, amount: f64) -> String {
    if cli.hide_amounts {
        HIDDEN_AMOUNT.to_string()
    } else {
        format_money(amount, &cli.currency)
    }
}

/// Transaction amounts are stored unsigned; the kind decides the sign shown.
fn signed_money(cli: &Cli, kind: TransactionKind, amount: f64) -> String {
    if cli.hide_amounts {
        HIDDEN_AMOUNT.to_string()
    } else {
        format!("{}{}", kind.sign(), format_money(amount.abs(), &cli.currency))
    }
}

fn format_percent(ratio: f64) -> String {
    if ratio.is_finite() {
        format!("{:.1}%", ratio * 100.0)
    } else {
        "n/a".to_string()
    }
}

#[cfg(test)]
mod helper_tests {
    use super::*;

    #[test]
    fn money_formats_sign_and_currency() {
        assert_eq!(format_money(-57.48, "€"), "-€57.48");
        assert_eq!(format_money(185.4, "€"), "€185.40");
        assert_eq!(format_money(12.0, "CHF"), "CHF 12.00");
        assert_eq!(format_money(-0.001, "€"), "€0.00");
        assert_eq!(format_money(f64::NAN, "€"), "n/a");
    }

    #[test]
    fn hidden_amounts_are_masked() {
        let cli = Cli::parse_from(["finboard", "--hide-amounts", "version"]);
        assert_eq!(money(&cli, 10.0), HIDDEN_AMOUNT);
        assert_eq!(signed_money(&cli, TransactionKind::Expense, 10.0), HIDDEN_AMOUNT);
        let cli = Cli::parse_from(["finboard", "--currency", "$", "version"]);
        assert_eq!(money(&cli, 10.0), "$10.00");
        assert_eq!(signed_money(&cli, TransactionKind::Income, 12.0), "+$12.00");
        assert_eq!(signed_money(&cli, TransactionKind::Expense, 12.0), "-$12.00");
    }

    #[test]
    fn page_size_prefers_flag_then_config() {
        let cfg = Config {
            api_url: None,
            page_size: Some(25),
        };
        assert_eq!(page_size(Some(5), &cfg).unwrap(), 5);
        assert_eq!(page_size(None, &cfg).unwrap(), 25);
        assert_eq!(page_size(None, &Config::default()).unwrap(), 10);
        assert!(page_size(Some(0), &cfg).is_err());
    }

    #[test]
    fn period_flag_parses() {
        let cli = Cli::parse_from(["finboard", "stats", "flow", "--period", "2025-03"]);
        match cli.command {
            Command::Stats {
                cmd: StatsCmd::Flow(args),
            } => assert_eq!(args.resolve(), Period::Monthly { year: 2025, month: 3 }),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn percent_formats_one_decimal() {
        assert_eq!(format_percent(0.2534), "25.3%");
        assert_eq!(format_percent(f64::INFINITY), "n/a");
    }
}
