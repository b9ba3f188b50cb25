use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Event-log severity level. Known levels are ordinal
/// (Information < Warning < Error < Critical); anything else is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventLevel {
    #[default]
    Information,
    Warning,
    Error,
    Critical,
    Other(String),
}

impl EventLevel {
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_lowercase().as_str() {
            "information" => EventLevel::Information,
            "warning" => EventLevel::Warning,
            "error" => EventLevel::Error,
            "critical" => EventLevel::Critical,
            _ => EventLevel::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventLevel::Information => "Information",
            EventLevel::Warning => "Warning",
            EventLevel::Error => "Error",
            EventLevel::Critical => "Critical",
            EventLevel::Other(label) => label,
        }
    }

    /// Error, Critical or Warning: the levels counted by spike detection.
    pub fn is_problem(&self) -> bool {
        matches!(
            self,
            EventLevel::Warning | EventLevel::Error | EventLevel::Critical
        )
    }
}

impl From<String> for EventLevel {
    fn from(label: String) -> Self {
        EventLevel::parse(&label)
    }
}

impl From<EventLevel> for String {
    fn from(level: EventLevel) -> Self {
        level.as_str().to_string()
    }
}

/// One normalized row of a dataset. Identity is its position in the dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: Option<NaiveDateTime>,
    /// Original timestamp text, kept for error reporting
    pub timestamp_raw: Option<String>,
    pub event_type: Option<String>,
    pub source: Option<String>,
    pub level: Option<EventLevel>,
    pub event_id: Option<String>,
    pub user: Option<String>,
    pub computer: Option<String>,
    pub process: Option<String>,
    pub message: Option<String>,
    pub risk_score: Option<f64>,
    /// Every column of the row under its normalized name
    pub fields: BTreeMap<String, String>,
}

impl EventRecord {
    /// Numeric value of a column, if present and parseable.
    pub fn numeric(&self, column: &str) -> Option<f64> {
        if column == "risk_score" {
            return self.risk_score;
        }
        self.fields
            .get(column)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    pub fn event_type_or_unknown(&self) -> &str {
        self.event_type.as_deref().unwrap_or("Unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse_is_case_insensitive() {
        assert_eq!(EventLevel::parse("error"), EventLevel::Error);
        assert_eq!(EventLevel::parse(" Critical "), EventLevel::Critical);
        assert_eq!(
            EventLevel::parse("Verbose"),
            EventLevel::Other("Verbose".to_string())
        );
        assert!(EventLevel::Warning.is_problem());
        assert!(!EventLevel::Information.is_problem());
    }

    #[test]
    fn test_numeric_field_lookup() {
        let mut record = EventRecord::default();
        record.fields.insert("sbytes".to_string(), "1500".to_string());
        record.fields.insert("proto".to_string(), "tcp".to_string());
        record.risk_score = Some(0.9);
        assert_eq!(record.numeric("sbytes"), Some(1500.0));
        assert_eq!(record.numeric("proto"), None);
        assert_eq!(record.numeric("missing"), None);
        assert_eq!(record.numeric("risk_score"), Some(0.9));
    }
}
