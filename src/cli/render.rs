use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Row as ComfyRow, Table};
use serde::Serialize;
use terminal_size::{Width as TermWidth, terminal_size};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::{Cli, OutputFormat};

#[derive(Debug, Clone, Serialize)]
pub(super) struct KeyValueRow {
    pub key: String,
    pub value: String,
}

impl KeyValueRow {
    pub fn new(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }
}

impl TableRow for KeyValueRow {
    const HEADERS: &'static [&'static str] = &["key", "value"];

    fn cells(&self) -> Vec<Cell> {
        vec![Cell::new(&self.key), Cell::new(&self.value)]
    }
}

pub(super) trait TableRow {
    const HEADERS: &'static [&'static str];
    fn cells(&self) -> Vec<Cell>;
}

pub(super) fn terminal_width() -> Option<u16> {
    if let Ok(cols) = std::env::var("COLUMNS")
        && let Ok(v) = cols.parse::<u16>()
    {
        return Some(v);
    }
    terminal_size().map(|(TermWidth(w), _)| w)
}

/// Cuts `s` to at most `max` display columns, ending in `…` when shortened.
pub(super) fn truncate_to_width(s: &str, max: usize) -> String {
    let s = s.trim();
    if max == 0 || s.width() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0usize;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

pub(super) fn new_table(cli: &Cli, headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth);

    if let Some(w) = terminal_width() {
        table.set_width(w);
    }

    table.set_header(ComfyRow::from(
        headers
            .iter()
            .map(|h| header_cell(cli, h))
            .collect::<Vec<_>>(),
    ));
    table
}

pub(super) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    println!("{s}");
    Ok(())
}

pub(super) fn render_output<T: Serialize + TableRow>(
    cli: &Cli,
    rows: Vec<T>,
) -> anyhow::Result<()> {
    match cli.output {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = new_table(cli, T::HEADERS);
            for row in rows {
                table.add_row(ComfyRow::from(row.cells()));
            }
            println!("{table}");
            Ok(())
        }
    }
}

pub(super) fn header_cell(cli: &Cli, text: &str) -> Cell {
    if super::should_color(cli) {
        Cell::new(text)
            .add_attribute(Attribute::Bold)
            .fg(Color::Cyan)
    } else {
        Cell::new(text)
    }
}

/// Right-aligned amount; green for income, red for spending when colour is on.
pub(super) fn money_cell(cli: &Cli, amount: f64) -> Cell {
    let cell = Cell::new(super::money(cli, amount)).set_alignment(CellAlignment::Right);
    if !super::should_color(cli) || cli.hide_amounts || amount == 0.0 || !amount.is_finite() {
        return cell;
    }
    if amount < 0.0 {
        cell.fg(Color::Red)
    } else {
        cell.fg(Color::Green)
    }
}
