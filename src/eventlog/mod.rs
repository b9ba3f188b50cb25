//! Event-Log Statistical Analyzer
//!
//! Descriptive statistics and heuristic threat indicators over a Windows
//! event-log export. The analyzer is pure: the same dataset always produces
//! the same report.

mod heuristics;
mod stats;

pub use heuristics::{
    Anomaly, AnomalyKind, AnomalyReport, Recommendation, ThreatIndicator, ThreatLevel, ThreatReport,
    CRITICAL_SOURCES, SUSPICIOUS_KEYWORDS,
};
pub use stats::{
    DateRange, ErrorSpike, LogMetadata, SeverityDistribution, SourceAnalysis, SourceCount,
    SpikeAnalysis, TimelineAnalysis,
};

use crate::dataset::Dataset;
use crate::errors::{SentinelError, SentinelResult};
use crate::models::EventLevel;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

const DEFAULT_SOURCE: &str = "Unknown Source";
const DEFAULT_USER: &str = "N/A";
const DEFAULT_COMPUTER: &str = "Unknown";

/// A record with event-log defaults applied.
#[derive(Debug, Clone)]
pub(crate) struct LogEntry<'a> {
    pub timestamp: NaiveDateTime,
    pub level: EventLevel,
    pub source: &'a str,
    pub user: &'a str,
    pub computer: &'a str,
    pub message: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogReport {
    pub metadata: LogMetadata,
    pub severity_distribution: SeverityDistribution,
    pub source_analysis: SourceAnalysis,
    pub error_analysis: SpikeAnalysis,
    pub timeline_analysis: TimelineAnalysis,
    pub anomalies: AnomalyReport,
    pub threat_indicators: ThreatReport,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Default)]
pub struct EventLogAnalyzer;

impl EventLogAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, dataset: &Dataset) -> SentinelResult<EventLogReport> {
        if dataset.is_empty() {
            return Err(SentinelError::EmptyDataset);
        }
        let timestamps = dataset.require_timestamps()?;

        let entries: Vec<LogEntry> = dataset
            .records
            .iter()
            .zip(timestamps)
            .map(|(r, timestamp)| LogEntry {
                timestamp,
                level: r.level.clone().unwrap_or_default(),
                source: r.source.as_deref().unwrap_or(DEFAULT_SOURCE),
                user: r.user.as_deref().unwrap_or(DEFAULT_USER),
                computer: r.computer.as_deref().unwrap_or(DEFAULT_COMPUTER),
                message: r.message.as_deref().unwrap_or(""),
            })
            .collect();

        let severity_distribution = stats::severity_distribution(&entries);
        let source_analysis = stats::source_analysis(&entries);
        let timeline_analysis = stats::timeline(&entries);
        let threat_indicators = heuristics::identify_threats(&entries);
        let recommendations = heuristics::recommendations(
            &severity_distribution,
            &source_analysis,
            &timeline_analysis,
        );

        let report = EventLogReport {
            metadata: stats::metadata(&entries),
            error_analysis: stats::error_spikes(&entries),
            anomalies: heuristics::detect_anomalies(&entries),
            severity_distribution,
            source_analysis,
            timeline_analysis,
            threat_indicators,
            recommendations,
        };

        log::info!(
            "Event log analysis: {} records, {:.1}% errors, {} threats, overall {}",
            report.metadata.total_records,
            report.severity_distribution.error_percentage,
            report.threat_indicators.total_threats_identified,
            report.threat_indicators.overall_risk
        );
        Ok(report)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::dataset::{Dataset, RawTable};
    use std::collections::BTreeMap;

    /// Build a dataset from (timestamp, level, source, user, message) rows.
    pub fn event_log(rows: &[(&str, &str, &str, &str, &str)]) -> Dataset {
        let headers = ["Timestamp", "Level", "Source", "UserID", "Message"];
        let rows = rows
            .iter()
            .map(|(ts, level, source, user, message)| {
                headers
                    .iter()
                    .zip([ts, level, source, user, message])
                    .filter(|(_, v)| !v.is_empty())
                    .map(|(h, v)| (h.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>()
            })
            .collect();
        Dataset::from_table(RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        })
    }
}
