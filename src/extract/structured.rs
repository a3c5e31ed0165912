//! JSON documents rendered as readable `key: value` lines
//!
//! Nesting depth becomes two-space indentation. A top-level array is a list of
//! records separated by blank lines, and an object whose values are equally
//! long arrays of scalars is treated as column-oriented records.

use anyhow::{Context, Result};
use serde_json::{Map, Value};

const INDENT: &str = "  ";

pub fn extract(bytes: &[u8]) -> Result<String> {
    let value: Value = serde_json::from_slice(bytes).context("invalid JSON")?;
    Ok(render_document(&value))
}

fn render_document(value: &Value) -> String {
    match value {
        Value::Array(items) => render_records(items.iter()),
        Value::Object(map) => match columns_to_records(map) {
            Some(records) => render_records(records.iter()),
            None => {
                let mut out = Vec::new();
                render_object(map, 0, &mut out);
                out.join("\n")
            }
        },
        scalar => scalar_text(scalar),
    }
}

fn render_records<'a>(items: impl Iterator<Item = &'a Value>) -> String {
    items
        .map(|item| {
            let mut out = Vec::new();
            render_value(item, 0, &mut out);
            out.join("\n")
        })
        .filter(|block| !block.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_value(value: &Value, depth: usize, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => render_object(map, depth, out),
        Value::Array(items) => render_array(items, depth, out),
        scalar => out.push(format!("{}{}", INDENT.repeat(depth), scalar_text(scalar))),
    }
}

fn render_object(map: &Map<String, Value>, depth: usize, out: &mut Vec<String>) {
    let indent = INDENT.repeat(depth);
    for (key, value) in map {
        match value {
            Value::Object(inner) if !inner.is_empty() => {
                out.push(format!("{indent}{key}:"));
                render_object(inner, depth + 1, out);
            }
            Value::Array(items) if !items.is_empty() => {
                out.push(format!("{indent}{key}:"));
                render_array(items, depth + 1, out);
            }
            Value::Object(_) | Value::Array(_) => {}
            scalar => out.push(format!("{indent}{key}: {}", scalar_text(scalar))),
        }
    }
}

fn render_array(items: &[Value], depth: usize, out: &mut Vec<String>) {
    let indent = INDENT.repeat(depth);
    for item in items {
        match item {
            Value::Object(_) | Value::Array(_) => {
                out.push(format!("{indent}-"));
                render_value(item, depth + 1, out);
            }
            scalar => out.push(format!("{indent}- {}", scalar_text(scalar))),
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `{"name": ["a", "b"], "age": [1, 2]}` becomes two records
fn columns_to_records(map: &Map<String, Value>) -> Option<Vec<Value>> {
    let mut len = None;
    for value in map.values() {
        let Value::Array(items) = value else {
            return None;
        };
        if items.iter().any(|v| v.is_object() || v.is_array()) {
            return None;
        }
        match len {
            None => len = Some(items.len()),
            Some(n) if n == items.len() => {}
            Some(_) => return None,
        }
    }

    let len = len.filter(|&n| n > 0)?;
    if map.len() < 2 {
        return None;
    }

    let records = (0..len)
        .map(|row| {
            let record: Map<String, Value> = map
                .iter()
                .map(|(key, column)| (key.clone(), column[row].clone()))
                .collect();
            Value::Object(record)
        })
        .collect();
    Some(records)
}
