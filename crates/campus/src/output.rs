//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Records are schemaless
//! JSON, so tables are built column-by-column from the keys the records
//! actually carry. Structured formats use serde; plain emits one id per line.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use campus_core::item_id;

use crate::cli::{ColorMode, OutputFormat};

/// Tables wider than this many columns are cut down to the first ones.
const MAX_COLUMNS: usize = 8;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Status words colored by outcome.
pub fn paint_status(status: &str, color: bool) -> String {
    if !color {
        return status.to_owned();
    }
    match status {
        "success" => status.green().to_string(),
        "error" => status.red().to_string(),
        "loading" | "pending" => status.yellow().to_string(),
        _ => status.dimmed().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render typed rows (`Tabled` + `Serialize`) in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a list of records.
pub fn render_records(format: OutputFormat, items: &[Value]) -> String {
    match format {
        OutputFormat::Table => records_table(items),
        OutputFormat::Json => render_json(items, false),
        OutputFormat::JsonCompact => render_json(items, true),
        OutputFormat::Yaml => render_yaml(items),
        OutputFormat::Plain => items
            .iter()
            .filter_map(item_id)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Render one record. Tables show it as aligned `key: value` lines.
pub fn render_record(format: OutputFormat, item: &Value) -> String {
    match format {
        OutputFormat::Table => record_detail(item),
        OutputFormat::Json => render_json(item, false),
        OutputFormat::JsonCompact => render_json(item, true),
        OutputFormat::Yaml => render_yaml(item),
        OutputFormat::Plain => item_id(item).unwrap_or_default(),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn records_table(items: &[Value]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for item in items {
        if let Value::Object(map) = item {
            for key in map.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }
    }
    // Ids first, the rest in first-seen order.
    if let Some(pos) = columns.iter().position(|c| matches!(*c, "id" | "_id")) {
        let id = columns.remove(pos);
        columns.insert(0, id);
    }
    columns.truncate(MAX_COLUMNS);

    let mut builder = Builder::default();
    builder.push_record(columns.iter().copied());
    for item in items {
        builder.push_record(columns.iter().map(|c| cell(item.get(*c))));
    }
    builder.build().with(Style::rounded()).to_string()
}

fn record_detail(item: &Value) -> String {
    let Value::Object(map) = item else {
        return cell(Some(item));
    };
    let width = map.keys().map(String::len).max().unwrap_or(0) + 1;
    let mut out = String::new();
    for (key, value) in map {
        let label = format!("{key}:");
        let _ = writeln!(out, "{label:<width$} {}", cell(Some(value)));
    }
    out.trim_end().to_owned()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".into(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn render_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
}

pub(crate) fn render_yaml<T: Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("# serialization failed: {e}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn table_puts_ids_first_and_fills_gaps() {
        let items = vec![
            json!({ "name": "Asha", "id": "s1", "grade": 8 }),
            json!({ "name": "Ben", "id": "s2", "section": "B" }),
        ];
        let table = render_records(OutputFormat::Table, &items);
        let header = table.lines().nth(1).unwrap_or_default();
        let id_at = header.find("id").unwrap_or(usize::MAX);
        let name_at = header.find("name").unwrap_or(0);
        assert!(id_at < name_at, "{table}");
        assert!(table.contains("section"));
        assert!(table.contains(" - "));
    }

    #[test]
    fn plain_prints_one_id_per_line() {
        let items = vec![json!({ "id": "s1" }), json!({ "_id": "s2" }), json!({})];
        assert_eq!(render_records(OutputFormat::Plain, &items), "s1\ns2");
    }

    #[test]
    fn detail_aligns_values() {
        let out = render_record(OutputFormat::Table, &json!({ "id": "s1", "name": "Asha" }));
        assert_eq!(out, "id:   s1\nname: Asha");
    }

    #[test]
    fn compact_json_is_one_line() {
        let out = render_records(OutputFormat::JsonCompact, &[json!({ "id": 1 })]);
        assert_eq!(out, r#"[{"id":1}]"#);
    }
}
