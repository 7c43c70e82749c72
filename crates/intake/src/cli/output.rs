//! Output formatting utilities for CLI commands

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

/// Binary-prefixed size with one decimal above 1 KB: `1536000` is `1.5 MB`
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Dataset ids contain tabs; show them escaped
pub fn display_id(id: &str) -> String {
    id.replace('\t', "\\t")
}

/// Accept `\t` typed on the command line in place of a tab
pub fn parse_id_arg(arg: &str) -> String {
    arg.replace("\\t", "\t")
}

/// Yes/empty cell for a flag
pub fn flag(value: bool) -> String {
    if value { "yes".to_string() } else { String::new() }
}

/// Condensed table with cyan headers, wrapped to the terminal width
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)))
        .add_rows(rows);
    println!("{table}");
}

/// Pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
