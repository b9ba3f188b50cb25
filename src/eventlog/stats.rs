use super::LogEntry;
use crate::models::EventLevel;
use crate::utils::{mean, sample_std};
use chrono::{DurationRound, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMetadata {
    pub total_records: usize,
    pub total_events: usize,
    pub date_range: DateRange,
    pub date_range_days: i64,
    pub unique_sources: usize,
    pub unique_users: usize,
    pub unique_computers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityDistribution {
    /// Count per level label
    pub distribution: BTreeMap<String, usize>,
    pub critical_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    /// (Error + Critical) / total, as a percentage
    pub error_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCount {
    pub source: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAnalysis {
    pub top_10_sources: Vec<SourceCount>,
    pub critical_sources: BTreeMap<String, usize>,
    pub system_services: BTreeMap<String, usize>,
    pub applications: BTreeMap<String, usize>,
    pub total_unique_sources: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSpike {
    pub timestamp: NaiveDateTime,
    pub event_count: usize,
    pub deviation_from_mean: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpikeAnalysis {
    pub spike_detected: bool,
    pub spikes: Vec<ErrorSpike>,
    pub average_errors_per_hour: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineAnalysis {
    pub events_per_day: BTreeMap<NaiveDate, usize>,
    /// Hour of day (0-23) with the most events
    pub peak_hour: u32,
    pub daily_avg: f64,
    pub hourly_avg: f64,
}

fn floor_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.duration_trunc(TimeDelta::hours(1)).unwrap_or(ts)
}

/// Counts sorted by count descending, then key ascending.
pub(crate) fn ranked<K: Ord + Clone>(counts: &BTreeMap<K, usize>) -> Vec<(K, usize)> {
    let mut ranked: Vec<(K, usize)> = counts.iter().map(|(k, c)| (k.clone(), *c)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

pub(crate) fn count_by<'a, K: Ord>(
    entries: &'a [LogEntry<'a>],
    key: impl Fn(&'a LogEntry<'a>) -> K,
) -> BTreeMap<K, usize> {
    let mut counts = BTreeMap::new();
    for entry in entries {
        *counts.entry(key(entry)).or_insert(0) += 1;
    }
    counts
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> usize {
    values.collect::<BTreeSet<_>>().len()
}

pub(crate) fn metadata(entries: &[LogEntry]) -> LogMetadata {
    let start = entries.iter().map(|e| e.timestamp).min().unwrap_or_default();
    let end = entries.iter().map(|e| e.timestamp).max().unwrap_or_default();
    let span = end - start;

    LogMetadata {
        total_records: entries.len(),
        total_events: entries.len(),
        date_range: DateRange {
            start,
            end,
            duration_hours: span.num_milliseconds() as f64 / 3_600_000.0,
        },
        date_range_days: span.num_days(),
        unique_sources: distinct(entries.iter().map(|e| e.source)),
        unique_users: distinct(entries.iter().map(|e| e.user)),
        unique_computers: distinct(entries.iter().map(|e| e.computer)),
    }
}

pub(crate) fn severity_distribution(entries: &[LogEntry]) -> SeverityDistribution {
    let distribution = count_by(entries, |e| e.level.as_str().to_string());
    let count = |level: &EventLevel| entries.iter().filter(|e| &e.level == level).count();

    let critical_count = count(&EventLevel::Critical);
    let error_count = count(&EventLevel::Error);
    let error_percentage = if entries.is_empty() {
        0.0
    } else {
        (error_count + critical_count) as f64 / entries.len() as f64 * 100.0
    };

    SeverityDistribution {
        distribution,
        critical_count,
        error_count,
        warning_count: count(&EventLevel::Warning),
        info_count: count(&EventLevel::Information),
        error_percentage,
    }
}

pub(crate) fn source_analysis(entries: &[LogEntry]) -> SourceAnalysis {
    let counts = count_by(entries, |e| e.source);

    let mut critical_sources = BTreeMap::new();
    let mut system_services = BTreeMap::new();
    let mut applications = BTreeMap::new();
    for (source, count) in &counts {
        let bucket = if super::CRITICAL_SOURCES.contains(source) {
            &mut critical_sources
        } else if source.contains("Microsoft-Windows") {
            &mut system_services
        } else {
            &mut applications
        };
        bucket.insert(source.to_string(), *count);
    }

    SourceAnalysis {
        top_10_sources: ranked(&counts)
            .into_iter()
            .take(10)
            .map(|(source, count)| SourceCount {
                source: source.to_string(),
                count,
            })
            .collect(),
        critical_sources,
        system_services,
        applications,
        total_unique_sources: counts.len(),
    }
}

/// Hourly buckets of Warning/Error/Critical events above mean + 1 sample std.
pub(crate) fn error_spikes(entries: &[LogEntry]) -> SpikeAnalysis {
    let mut hourly: BTreeMap<NaiveDateTime, usize> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.level.is_problem()) {
        *hourly.entry(floor_hour(entry.timestamp)).or_insert(0) += 1;
    }
    if hourly.is_empty() {
        return SpikeAnalysis::default();
    }

    let counts: Vec<f64> = hourly.values().map(|&c| c as f64).collect();
    let avg = mean(&counts);
    let threshold = avg + sample_std(&counts);

    let mut spikes: Vec<ErrorSpike> = hourly
        .iter()
        .filter(|(_, &count)| count as f64 > threshold)
        .map(|(&hour, &count)| ErrorSpike {
            timestamp: hour,
            event_count: count,
            deviation_from_mean: count as f64 - avg,
        })
        .collect();
    spikes.sort_by(|a, b| {
        b.event_count
            .cmp(&a.event_count)
            .then(a.timestamp.cmp(&b.timestamp))
    });

    SpikeAnalysis {
        spike_detected: !spikes.is_empty(),
        spikes,
        average_errors_per_hour: avg,
        threshold,
    }
}

pub(crate) fn timeline(entries: &[LogEntry]) -> TimelineAnalysis {
    let events_per_day = count_by(entries, |e| e.timestamp.date());
    let by_hour_of_day = count_by(entries, |e| e.timestamp.hour());
    let by_floor_hour = count_by(entries, |e| floor_hour(e.timestamp));

    // Ranking ties by key picks the earliest hour
    let peak_hour = ranked(&by_hour_of_day).first().map(|(h, _)| *h).unwrap_or(0);

    let daily: Vec<f64> = events_per_day.values().map(|&c| c as f64).collect();
    let hourly: Vec<f64> = by_floor_hour.values().map(|&c| c as f64).collect();

    TimelineAnalysis {
        events_per_day,
        peak_hour,
        daily_avg: mean(&daily),
        hourly_avg: mean(&hourly),
    }
}
