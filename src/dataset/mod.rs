//! Dataset ingestion and normalization
//!
//! Loads CSV or JSON log exports into a uniform list of [`EventRecord`]s.
//! Column names from Windows event-log exports and network captures are
//! aliased onto one schema so the analyzers never look at raw headers.

mod loader;
mod timestamp;

pub use loader::RawTable;
pub use timestamp::parse_timestamp;

use crate::errors::{SentinelError, SentinelResult};
use crate::models::{EventLevel, EventRecord};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Timestamp column candidates, in lookup order
pub const TIMESTAMP_COLUMNS: &[&str] = &["Timestamp", "TimeCreated", "Date", "Time", "timestamp", "date"];

/// Header markers identifying a Windows event-log export
const EVENT_LOG_MARKERS: &[&str] = &["Timestamp", "EventID", "TimeCreated"];

const LEVEL_COLUMNS: &[&str] = &["Level", "Severity", "Type", "level"];
const SOURCE_COLUMNS: &[&str] = &["Source", "Provider", "source"];
const EVENT_ID_COLUMNS: &[&str] = &["EventID", "event_id", "Id"];
const USER_COLUMNS: &[&str] = &["UserID", "User", "user"];
const COMPUTER_COLUMNS: &[&str] = &["Computer", "MachineName", "computer"];
const MESSAGE_COLUMNS: &[&str] = &["Message", "message"];
const PROCESS_COLUMNS: &[&str] = &["process_name", "ProcessName", "Process", "process"];
const EVENT_TYPE_COLUMNS: &[&str] = &["event_type", "EventType", "attack_cat"];

/// Network-capture column renames
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("sport", "source_port"),
    ("dport", "destination_port"),
    ("proto", "protocol"),
];

/// A normalized, in-memory dataset.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Header after field aliasing, in file order
    pub columns: Vec<String>,
    /// Records in file order; the index is the record identity
    pub records: Vec<EventRecord>,
    /// Source file, if loaded from disk
    pub source: Option<PathBuf>,
    /// SHA-256 of the source file
    pub fingerprint: Option<String>,
    /// Timestamp column chosen during normalization
    pub timestamp_column: Option<String>,
    /// True when the raw header looked like a Windows event-log export
    pub event_log_header: bool,
}

impl Dataset {
    /// Load and normalize a dataset file (`.csv`, `.json`, `.jsonl`/`.ndjson`).
    pub fn load(path: &Path) -> SentinelResult<Self> {
        log::info!("Loading dataset {}", path.display());
        let table = RawTable::read(path)?;
        let mut dataset = Self::from_table(table);
        dataset.source = Some(path.to_path_buf());
        dataset.fingerprint = Some(crate::utils::sha256_file(path)?);
        log::debug!(
            "Loaded {} records, {} columns (event log: {})",
            dataset.len(),
            dataset.columns.len(),
            dataset.event_log_header
        );
        Ok(dataset)
    }

    /// Normalize an already-read table.
    pub fn from_table(table: RawTable) -> Self {
        let event_log_header = table
            .headers
            .iter()
            .any(|h| EVENT_LOG_MARKERS.iter().any(|m| h.contains(m)));
        let timestamp_column = TIMESTAMP_COLUMNS
            .iter()
            .find(|c| table.headers.iter().any(|h| h == *c))
            .map(|c| c.to_string());

        let columns = table
            .headers
            .iter()
            .map(|h| alias_field(h).to_string())
            .collect();

        let records = table
            .rows
            .into_iter()
            .map(|row| normalize_row(row, timestamp_column.as_deref()))
            .collect();

        Self {
            columns,
            records,
            source: None,
            fingerprint: None,
            timestamp_column,
            event_log_header,
        }
    }

    /// Build a dataset directly from records (used by callers holding
    /// already-normalized data).
    pub fn from_records(columns: Vec<String>, records: Vec<EventRecord>) -> Self {
        Self {
            columns,
            records,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Whether rows carry a risk score (explicit column or derived from labels).
    pub fn has_risk_column(&self) -> bool {
        self.has_column("risk_score") || self.has_column("label")
    }

    pub fn is_event_log(&self) -> bool {
        self.event_log_header
    }

    /// Every record's parsed timestamp, or the first failure.
    pub fn require_timestamps(&self) -> SentinelResult<Vec<chrono::NaiveDateTime>> {
        if self.timestamp_column.is_none() {
            return Err(SentinelError::MissingColumn {
                column: "Timestamp".to_string(),
                found: self.columns.clone(),
            });
        }
        self.records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                record.timestamp.ok_or_else(|| SentinelError::InvalidTimestamp {
                    row,
                    value: record.timestamp_raw.clone().unwrap_or_default(),
                })
            })
            .collect()
    }
}

fn alias_field(name: &str) -> &str {
    FIELD_ALIASES
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| *to)
        .unwrap_or(name)
}

fn first_of(row: &BTreeMap<String, String>, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|c| row.get(*c))
        .find(|v| !v.trim().is_empty())
        .cloned()
}

fn normalize_row(raw: BTreeMap<String, String>, timestamp_column: Option<&str>) -> EventRecord {
    let timestamp_raw = timestamp_column.and_then(|c| raw.get(c)).cloned();
    let timestamp = timestamp_raw.as_deref().and_then(parse_timestamp);

    let risk_score = match raw.get("risk_score").and_then(|v| v.trim().parse::<f64>().ok()) {
        Some(score) => Some(score),
        None => raw
            .get("label")
            .map(|label| if label.trim() == "Normal" { 0.1 } else { 0.9 }),
    };

    let mut record = EventRecord {
        timestamp,
        timestamp_raw,
        event_type: first_of(&raw, EVENT_TYPE_COLUMNS),
        source: first_of(&raw, SOURCE_COLUMNS),
        level: first_of(&raw, LEVEL_COLUMNS).map(|l| EventLevel::parse(&l)),
        event_id: first_of(&raw, EVENT_ID_COLUMNS),
        user: first_of(&raw, USER_COLUMNS),
        computer: first_of(&raw, COMPUTER_COLUMNS),
        process: first_of(&raw, PROCESS_COLUMNS),
        message: first_of(&raw, MESSAGE_COLUMNS),
        risk_score,
        fields: BTreeMap::new(),
    };

    record.fields = raw
        .into_iter()
        .map(|(k, v)| (alias_field(&k).to_string(), v))
        .collect();
    record
}
