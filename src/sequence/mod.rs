//! Sequence Matcher
//!
//! Slides a fixed-size window over time-ordered records and checks each
//! window against the attack-pattern catalogue.

mod patterns;
mod timeline;

pub use patterns::{pattern, AttackPattern, ATTACK_PATTERNS};
pub use timeline::{build_golden_thread, GoldenThreadEntry, ThreadColor};

use crate::config::SequenceConfig;
use crate::dataset::Dataset;
use crate::errors::{SentinelError, SentinelResult};
use crate::models::{EventRecord, Severity};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One (window, pattern) match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceDetection {
    pub attack_type: String,
    pub description: String,
    pub severity: Severity,
    pub mitre_technique: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub events_count: usize,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceReport {
    pub sequences: Vec<SequenceDetection>,
    pub total_sequences: usize,
    pub windows_scanned: usize,
    /// Matches per window-sized block, as a percentage capped at 100
    pub timeline_infection_probability: f64,
}

pub struct SequenceMatcher {
    config: SequenceConfig,
}

impl SequenceMatcher {
    pub fn new(config: SequenceConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, dataset: &Dataset) -> SentinelResult<SequenceReport> {
        let window_size = self.config.window_size;
        if window_size == 0 {
            return Err(SentinelError::Config("window_size must be positive".to_string()));
        }

        let ordered = time_ordered(dataset)?;
        let has_risk = dataset.has_risk_column();

        let windows = ordered.len().saturating_sub(window_size);
        let mut sequences = Vec::new();

        for start in 0..windows {
            let window = &ordered[start..start + window_size];
            for pattern in ATTACK_PATTERNS {
                let observed = window.iter().map(|(_, r)| r.event_type.as_deref().unwrap_or(""));
                if !pattern.matches(observed, self.config.match_threshold) {
                    continue;
                }
                let start_time = window[0].0;
                let end_time = window[window.len() - 1].0;
                sequences.push(SequenceDetection {
                    attack_type: pattern.key.to_string(),
                    description: pattern.description.to_string(),
                    severity: pattern.severity,
                    mitre_technique: pattern.mitre.to_string(),
                    start_time,
                    end_time,
                    events_count: window.len(),
                    confidence: window_confidence(window, has_risk),
                });
            }
        }

        let blocks = (ordered.len() / window_size).max(1);
        let probability = (sequences.len() as f64 / blocks as f64 * 100.0).min(100.0);

        log::info!(
            "Sequence analysis: {} matches over {} windows",
            sequences.len(),
            windows
        );

        Ok(SequenceReport {
            total_sequences: sequences.len(),
            sequences,
            windows_scanned: windows,
            timeline_infection_probability: probability,
        })
    }
}

/// Records paired with their timestamps, stably sorted by time.
pub(crate) fn time_ordered(dataset: &Dataset) -> SentinelResult<Vec<(NaiveDateTime, &EventRecord)>> {
    let timestamps = dataset.require_timestamps()?;
    let mut ordered: Vec<(NaiveDateTime, &EventRecord)> =
        timestamps.into_iter().zip(dataset.records.iter()).collect();
    ordered.sort_by_key(|(ts, _)| *ts);
    Ok(ordered)
}

/// 0.5 base, +0.3 for a sub-minute window (else +0.1), plus a share of the
/// mean row risk when the dataset carries one. Capped at 1.0.
fn window_confidence(window: &[(NaiveDateTime, &EventRecord)], has_risk: bool) -> f64 {
    let mut confidence = 0.5;

    let span = window[window.len() - 1].0 - window[0].0;
    if span.num_milliseconds() < 60_000 {
        confidence += 0.3;
    } else {
        confidence += 0.1;
    }

    if has_risk {
        let risks: Vec<f64> = window.iter().filter_map(|(_, r)| r.risk_score).collect();
        confidence += crate::utils::mean(&risks) * 0.2;
    }

    confidence.min(1.0)
}
