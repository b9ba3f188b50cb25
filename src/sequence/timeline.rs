use crate::dataset::Dataset;
use crate::errors::SentinelResult;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadColor {
    Red,
    Yellow,
    Green,
}

impl ThreadColor {
    pub fn from_risk(risk: Option<f64>) -> Self {
        match risk {
            Some(r) if r > 0.8 => ThreadColor::Red,
            Some(r) if r > 0.5 => ThreadColor::Yellow,
            _ => ThreadColor::Green,
        }
    }
}

/// One step of the chronological "golden thread".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldenThreadEntry {
    pub timestamp: NaiveDateTime,
    pub row_index: usize,
    pub event_type: String,
    pub severity: ThreadColor,
    pub details: BTreeMap<String, String>,
}

/// Every record in time order, colored by its risk score.
pub fn build_golden_thread(dataset: &Dataset) -> SentinelResult<Vec<GoldenThreadEntry>> {
    let timestamps = dataset.require_timestamps()?;
    let mut entries: Vec<GoldenThreadEntry> = timestamps
        .into_iter()
        .zip(dataset.records.iter())
        .enumerate()
        .map(|(row_index, (timestamp, record))| GoldenThreadEntry {
            timestamp,
            row_index,
            event_type: record.event_type_or_unknown().to_string(),
            severity: ThreadColor::from_risk(record.risk_score),
            details: record.fields.clone(),
        })
        .collect();
    entries.sort_by_key(|e| e.timestamp);
    Ok(entries)
}
