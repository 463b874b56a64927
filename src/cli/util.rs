use std::path::Path;

use bson::Document;

use crate::errors::PageError;
use crate::query::Order;
use crate::utils::json::json_value_to_bson_document;

use super::runner::OutputMode;

pub fn parse_output_mode(s: Option<&str>) -> OutputMode {
    match s.map(str::to_ascii_lowercase).as_deref() {
        Some("plain") => OutputMode::Plain,
        Some("human" | "pretty") => OutputMode::Human,
        _ => OutputMode::Json,
    }
}

/// `"-price,name,+qty"` -> `[("price", Desc), ("name", Asc), ("qty", Asc)]`.
pub fn parse_sort(s: &str) -> Vec<(String, Order)> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let (order, field) = if let Some(rest) = part.strip_prefix('-') {
                (Order::Desc, rest)
            } else if let Some(rest) = part.strip_prefix('+') {
                (Order::Asc, rest)
            } else {
                (Order::Asc, part)
            };
            (!field.is_empty()).then(|| (field.to_string(), order))
        })
        .collect()
}

/// Reads a JSON array of objects or NDJSON (one object per line, blank lines ignored).
///
/// # Errors
/// `PageError::Io` if the file cannot be read, `Json`/`Config` for malformed content.
pub fn load_documents(path: &Path) -> Result<Vec<Document>, PageError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| PageError::Io(format!("{}: {e}", path.display())))?;
    if text.trim_start().starts_with('[') {
        let val: serde_json::Value = serde_json::from_str(&text)?;
        let items = val
            .as_array()
            .ok_or_else(|| PageError::Config("expected a JSON array of documents".into()))?;
        return items.iter().map(json_value_to_bson_document).collect();
    }
    let mut docs = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let val: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| PageError::Config(format!("{}:{}: {e}", path.display(), n + 1)))?;
        docs.push(json_value_to_bson_document(&val)?);
    }
    Ok(docs)
}
