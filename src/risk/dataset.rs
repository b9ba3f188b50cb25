use crate::eventlog::EventLogReport;
use crate::models::{Finding, Severity};
use crate::outlier::OutlierReport;
use crate::sequence::SequenceReport;
use crate::threat_intel::ThreatIntelEngine;

const THREAT_POINTS: f64 = 5.0;
const ERROR_RATE_WEIGHT: f64 = 0.5;

fn outlier_points(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 10.0,
        Severity::High => 5.0,
        Severity::Medium => 2.0,
        Severity::Low => 1.0,
    }
}

fn sequence_points(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 15.0,
        Severity::High => 10.0,
        Severity::Medium => 5.0,
        Severity::Low => 2.0,
    }
}

/// Event-log findings. The score works out to
/// `error_percentage * 0.5 + threats * 5`; anomalies are reported but
/// add nothing.
pub fn event_log_findings(intel: &ThreatIntelEngine, report: &EventLogReport) -> Vec<Finding> {
    let mut findings = Vec::new();

    let error_pct = report.severity_distribution.error_percentage;
    if error_pct > 0.0 {
        findings.push(intel.finding(
            "error_rate",
            Severity::from_score(error_pct),
            error_pct * ERROR_RATE_WEIGHT,
            format!(
                "{:.2}% of events are errors ({} errors, {} critical)",
                error_pct,
                report.severity_distribution.error_count,
                report.severity_distribution.critical_count
            ),
        ));
    }

    for threat in &report.threat_indicators.threats {
        findings.push(
            Finding::new(
                "threat_indicator",
                threat.severity.severity(),
                THREAT_POINTS,
                format!(
                    "{}: {} ({} events)",
                    threat.category, threat.description, threat.count
                ),
            )
            .with_mitre(threat.mitre_id()),
        );
    }

    for anomaly in &report.anomalies.anomalies {
        let kind = serde_json::to_value(anomaly.kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "anomaly".to_string());
        findings.push(intel.finding(&kind, anomaly.risk, 0.0, anomaly.description.clone()));
    }

    findings
}

/// Findings for a generic dataset from outlier and sequence output.
pub fn generic_findings(
    intel: &ThreatIntelEngine,
    outliers: Option<&OutlierReport>,
    sequences: Option<&SequenceReport>,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    if let Some(report) = outliers {
        for outlier in &report.outliers {
            let features = outlier
                .features
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join(", ");
            findings.push(intel.finding(
                "statistical_outlier",
                outlier.severity,
                outlier_points(outlier.severity),
                format!(
                    "Row {} deviates from baseline (risk {:.2}; {})",
                    outlier.row_index, outlier.risk_score, features
                ),
            ));
        }
    }

    if let Some(report) = sequences {
        for seq in &report.sequences {
            findings.push(
                Finding::new(
                    "attack_sequence",
                    seq.severity,
                    sequence_points(seq.severity) * seq.confidence,
                    format!(
                        "{} between {} and {} ({} events, confidence {:.2})",
                        seq.description, seq.start_time, seq.end_time, seq.events_count, seq.confidence
                    ),
                )
                .with_mitre(seq.mitre_technique.clone()),
            );
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventlog::test_support::event_log;
    use crate::eventlog::EventLogAnalyzer;
    use crate::outlier::Outlier;
    use crate::sequence::SequenceDetection;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    #[test]
    fn test_event_log_score_formula() {
        let ds = event_log(&[
            ("2024-01-01 10:00:00", "Error", "Microsoft-Windows-DPTF", "", "thermal"),
            ("2024-01-01 10:05:00", "Information", "Service Control Manager", "", "ok"),
            ("2024-01-01 10:10:00", "Information", "Service Control Manager", "", "ok"),
            ("2024-01-01 10:15:00", "Information", "Service Control Manager", "", "ok"),
        ]);
        let report = EventLogAnalyzer::new().analyze(&ds).unwrap();
        let findings = event_log_findings(&ThreatIntelEngine::new(), &report);
        let total: f64 = findings.iter().map(|f| f.contribution).sum();
        // 25% errors -> 12.5, one DPTF threat -> 5
        assert!((total - 17.5).abs() < 1e-9);

        let threat = findings.iter().find(|f| f.finding_type == "threat_indicator").unwrap();
        assert_eq!(threat.mitre.as_deref(), Some("T1499"));
        assert_eq!(threat.severity, Severity::Low);
    }

    #[test]
    fn test_clean_log_has_no_findings() {
        let ds = event_log(&[
            ("2024-01-01 10:00:00", "Information", "Service Control Manager", "", "ok"),
            ("2024-01-01 11:00:00", "Information", "Service Control Manager", "", "ok"),
        ]);
        let report = EventLogAnalyzer::new().analyze(&ds).unwrap();
        assert!(event_log_findings(&ThreatIntelEngine::new(), &report).is_empty());
    }

    #[test]
    fn test_generic_contributions() {
        let outliers = OutlierReport {
            outliers: vec![
                Outlier {
                    row_index: 3,
                    risk_score: 0.95,
                    severity: Severity::Critical,
                    features: BTreeMap::from([("dbytes".to_string(), 90000.0)]),
                    timestamp: None,
                },
                Outlier {
                    row_index: 8,
                    risk_score: 0.5,
                    severity: Severity::Medium,
                    features: BTreeMap::new(),
                    timestamp: None,
                },
            ],
            total_outliers: 2,
            total_rows: 20,
            contamination_rate: 0.1,
            features_used: vec!["dbytes".to_string()],
            threshold: -0.6,
        };
        let t = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let sequences = SequenceReport {
            sequences: vec![SequenceDetection {
                attack_type: "persistence".to_string(),
                description: "Persistence establishment".to_string(),
                severity: Severity::High,
                mitre_technique: "T1547".to_string(),
                start_time: t,
                end_time: t,
                events_count: 10,
                confidence: 0.8,
            }],
            total_sequences: 1,
            windows_scanned: 10,
            timeline_infection_probability: 50.0,
        };

        let findings = generic_findings(&ThreatIntelEngine::new(), Some(&outliers), Some(&sequences));
        assert_eq!(findings.len(), 3);
        let total: f64 = findings.iter().map(|f| f.contribution).sum();
        assert!((total - 20.0).abs() < 1e-9);
        assert!(findings[0].details.contains("dbytes=90000"));
        assert_eq!(findings[2].mitre.as_deref(), Some("T1547"));

        assert!(generic_findings(&ThreatIntelEngine::new(), None, None).is_empty());
    }
}
