use crate::errors::{SentinelError, SentinelResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Rows as read from disk, before any normalization.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<BTreeMap<String, String>>,
}

impl RawTable {
    /// Read a table, choosing the parser from the file extension.
    pub fn read(path: &Path) -> SentinelResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Self::read_csv(path),
            "json" | "jsonl" | "ndjson" => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| SentinelError::io(e, path.to_path_buf()))?;
                Self::parse_json(&text)
            }
            other => Err(SentinelError::UnsupportedFormat(if other.is_empty() {
                path.display().to_string()
            } else {
                other.to_string()
            })),
        }
    }

    fn read_csv(path: &Path) -> SentinelResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row = headers
                .iter()
                .zip(record.iter())
                .filter(|(_, v)| !v.is_empty())
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect();
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }

    /// Parse a JSON array of objects, or JSON Lines.
    pub fn parse_json(text: &str) -> SentinelResult<Self> {
        let trimmed = text.trim_start();
        let objects: Vec<Value> = if trimmed.starts_with('[') {
            serde_json::from_str(trimmed)?
        } else {
            trimmed
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(serde_json::from_str::<Value>)
                .collect::<Result<_, _>>()?
        };

        let mut table = Self::default();
        for (idx, value) in objects.into_iter().enumerate() {
            let Value::Object(map) = value else {
                return Err(SentinelError::UnsupportedFormat(format!(
                    "JSON row {} is not an object",
                    idx
                )));
            };
            let mut row = BTreeMap::new();
            for (key, value) in map {
                if !table.headers.contains(&key) {
                    table.headers.push(key.clone());
                }
                let text = match value {
                    Value::Null => continue,
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                row.insert(key, text);
            }
            table.rows.push(row);
        }
        Ok(table)
    }
}
