//! Turning an [`AnalysisResult`] into something a terminal can show.
//!
//! Rendering is split in two: [`render_blocks`] decides *what* to show and
//! [`render_text`] decides *how*. Tests assert on blocks.

use std::fmt::Write as _;

use lumen_dispatch::AnalysisResult;
use serde::Serialize;
use serde_json::{Map, Value};

/// Sections rendered first, in this order.
const KNOWN_SECTIONS: [&str; 5] = ["metrics", "insights", "recommendations", "summary", "preview"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
  Heading(String),
  Field { label: String, value: String },
  List { title: String, items: Vec<String> },
  Table { columns: Vec<String>, rows: Vec<Vec<String>> },
}

pub fn render_blocks(result: &AnalysisResult) -> Vec<Block> {
  let mut blocks = Vec::new();

  if let Some(error) = result.str_field("error") {
    blocks.push(field("error", error.to_string()));
  }

  for name in KNOWN_SECTIONS {
    let Some(value) = result.section(name) else {
      continue;
    };
    match name {
      "insights" => push_list(&mut blocks, "Insights", result.insights()),
      "recommendations" => push_list(&mut blocks, "Recommendations", result.recommendations()),
      "preview" => push_table(&mut blocks, "Preview", value),
      _ => push_section(&mut blocks, name, value),
    }
  }

  if let Some(top) = result.as_value().as_object() {
    push_scalars(&mut blocks, top);
  }
  if let Some(nested) = result.field("results").and_then(Value::as_object) {
    push_scalars(&mut blocks, nested);
  }

  blocks
}

pub fn render_text(blocks: &[Block]) -> String {
  let mut out = String::new();

  for block in blocks {
    match block {
      Block::Heading(title) => {
        if !out.is_empty() {
          out.push('\n');
        }
        let _ = writeln!(out, "{}", title);
        let _ = writeln!(out, "{}", "-".repeat(title.chars().count()));
      }
      Block::Field { label, value } => {
        let _ = writeln!(out, "{}: {}", label, value);
      }
      Block::List { title, items } => {
        if !out.is_empty() {
          out.push('\n');
        }
        let _ = writeln!(out, "{}:", title);
        for item in items {
          let _ = writeln!(out, "  - {}", item);
        }
      }
      Block::Table { columns, rows } => write_table(&mut out, columns, rows),
    }
  }

  out
}

fn field(label: &str, value: String) -> Block {
  Block::Field {
    label: label.to_string(),
    value,
  }
}

fn title_case(name: &str) -> String {
  let mut chars = name.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

fn scalar_text(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Null => Some("-".to_string()),
    Value::Array(_) | Value::Object(_) => None,
  }
}

fn cell_text(value: &Value) -> String {
  scalar_text(value).unwrap_or_else(|| value.to_string())
}

fn push_list(blocks: &mut Vec<Block>, title: &str, items: Vec<String>) {
  if !items.is_empty() {
    blocks.push(Block::List {
      title: title.to_string(),
      items,
    });
  }
}

/// An object becomes a heading plus one field per entry, a scalar a single
/// field.
fn push_section(blocks: &mut Vec<Block>, name: &str, value: &Value) {
  match value {
    Value::Object(map) if !map.is_empty() => {
      blocks.push(Block::Heading(title_case(name)));
      for (key, v) in map {
        blocks.push(field(key, cell_text(v)));
      }
    }
    Value::Object(_) => {}
    Value::Array(_) => push_list(blocks, &title_case(name), text_lines(value)),
    other => {
      if let Some(text) = scalar_text(other) {
        blocks.push(field(name, text));
      }
    }
  }
}

fn text_lines(value: &Value) -> Vec<String> {
  value
    .as_array()
    .map(|items| items.iter().map(cell_text).collect())
    .unwrap_or_default()
}

/// Rows of objects become a table. Columns follow first appearance.
fn push_table(blocks: &mut Vec<Block>, title: &str, value: &Value) {
  let Some(rows) = value.as_array() else {
    return;
  };

  let mut columns: Vec<String> = Vec::new();
  for row in rows.iter().filter_map(Value::as_object) {
    for key in row.keys() {
      if !columns.contains(key) {
        columns.push(key.clone());
      }
    }
  }
  if columns.is_empty() {
    return;
  }

  let rows = rows
    .iter()
    .filter_map(Value::as_object)
    .map(|row| {
      columns
        .iter()
        .map(|c| row.get(c).map(cell_text).unwrap_or_default())
        .collect()
    })
    .collect();

  blocks.push(Block::Heading(title.to_string()));
  blocks.push(Block::Table { columns, rows });
}

fn push_scalars(blocks: &mut Vec<Block>, map: &Map<String, Value>) {
  for (key, value) in map {
    if key == "error" || KNOWN_SECTIONS.contains(&key.as_str()) {
      continue;
    }
    if let Some(text) = scalar_text(value).filter(|_| !value.is_null()) {
      blocks.push(field(key, text));
    }
  }
}

fn write_table(out: &mut String, columns: &[String], rows: &[Vec<String>]) {
  let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
  for row in rows {
    for (i, cell) in row.iter().enumerate() {
      if let Some(w) = widths.get_mut(i) {
        *w = (*w).max(cell.chars().count());
      }
    }
  }

  let line = |cells: &[String]| {
    cells
      .iter()
      .zip(&widths)
      .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
      .collect::<Vec<_>>()
      .join("  ")
      .trim_end()
      .to_string()
  };

  let _ = writeln!(out, "{}", line(columns));
  let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
  let _ = writeln!(out, "{}", rule.join("  "));
  for row in rows {
    let _ = writeln!(out, "{}", line(row.as_slice()));
  }
}
