//! Prompt context: artifacts and dataset results condensed to fit a small
//! model's window.

use crate::eventlog::EventLogReport;
use crate::models::{LiveArtifacts, RiskReport};
use crate::outlier::OutlierReport;
use crate::sequence::SequenceReport;
use crate::utils::truncate_chars;
use serde_json::{json, Map, Value};

const MAX_PROCESSES: usize = 20;
const MAX_RUN_KEYS: usize = 10;
const MAX_EVENTS: usize = 10;
const MAX_CONNECTIONS: usize = 10;
const MAX_SAMPLE_THREATS: usize = 5;
const EVENT_MESSAGE_CHARS: usize = 50;

pub fn artifact_context(artifacts: &LiveArtifacts) -> Value {
    let mut summary = Map::new();

    if let Some(tree) = &artifacts.processes {
        let processes: Vec<String> = tree
            .root_processes
            .iter()
            .take(MAX_PROCESSES)
            .map(|p| format!("{} (PID: {})", p.name, p.pid))
            .collect();
        summary.insert("processes".to_string(), json!(processes));
    }

    if let Some(registry) = &artifacts.registry {
        let keys: Vec<&_> = registry.run_keys.iter().take(MAX_RUN_KEYS).collect();
        summary.insert("registry".to_string(), json!(keys));
    }

    if let Some(network) = &artifacts.network {
        let endpoints: Vec<String> = network
            .connections
            .iter()
            .filter(|c| c.remote_ip.is_some())
            .take(MAX_CONNECTIONS)
            .map(|c| {
                format!(
                    "{}:{} ({})",
                    c.remote_ip.as_deref().unwrap_or_default(),
                    c.remote_port.unwrap_or_default(),
                    c.process_name.as_deref().unwrap_or("unknown")
                )
            })
            .collect();
        summary.insert("network".to_string(), json!(endpoints));
    }

    if let Some(logs) = &artifacts.event_logs {
        let events: Vec<String> = logs
            .critical_events
            .iter()
            .take(MAX_EVENTS)
            .map(|e| {
                format!(
                    "{}: {}",
                    e.event_id_text(),
                    truncate_chars(&e.message, EVENT_MESSAGE_CHARS)
                )
            })
            .collect();
        summary.insert("events".to_string(), json!(events));
    }

    Value::Object(summary)
}

pub fn event_log_summary(report: &EventLogReport) -> Value {
    let dist = &report.severity_distribution;
    let threats = &report.threat_indicators;
    json!({
        "total_events": report.metadata.total_events,
        "date_range": report.metadata.date_range,
        "unique_sources": report.metadata.unique_sources,
        "severity_distribution": dist.distribution,
        "error_count": dist.error_count,
        "warning_count": dist.warning_count,
        "threat_count": threats.total_threats_identified,
        "anomalies_detected": report.anomalies.anomalies_detected,
        "sample_threats": threats.threats.iter().take(MAX_SAMPLE_THREATS).collect::<Vec<_>>(),
    })
}

/// Summary for datasets that went through the outlier and sequence path.
pub fn generic_summary(
    total_rows: usize,
    outliers: Option<&OutlierReport>,
    sequences: Option<&SequenceReport>,
    risk: &RiskReport,
) -> Value {
    let mut summary = Map::new();
    summary.insert("total_events".to_string(), json!(total_rows));
    summary.insert("local_risk_score".to_string(), json!(risk.score));
    if let Some(o) = outliers {
        summary.insert("outliers_detected".to_string(), json!(o.total_outliers));
        summary.insert("contamination_rate".to_string(), json!(o.contamination_rate));
        summary.insert("features_used".to_string(), json!(o.features_used));
    }
    if let Some(s) = sequences {
        let samples: Vec<Value> = s
            .sequences
            .iter()
            .take(MAX_SAMPLE_THREATS)
            .map(|d| {
                json!({
                    "attack_type": d.attack_type,
                    "mitre": d.mitre_technique,
                    "severity": d.severity,
                    "confidence": d.confidence,
                })
            })
            .collect();
        summary.insert("sequences_detected".to_string(), json!(s.total_sequences));
        summary.insert(
            "timeline_infection_probability".to_string(),
            json!(s.timeline_infection_probability),
        );
        summary.insert("sample_sequences".to_string(), json!(samples));
    }
    Value::Object(summary)
}

pub fn artifact_prompt(context: &Value) -> String {
    let context = serde_json::to_string_pretty(context).unwrap_or_default();
    format!(
        r#"You are a Senior Cyber Forensic Analyst. Analyze the following system artifacts for compromise indicators.

ARTIFACTS:
{context}

TASK:
1. Identify top 3 security risks.
2. Flag any specific suspicious processes or registry keys.
3. Rate overall system risk (LOW/MEDIUM/HIGH/CRITICAL).
4. Provide actionable remediation steps.

Respond with ONLY valid JSON in this exact format:
{{
    "risk_level": "HIGH",
    "risk_score": 85,
    "summary": "Short summary of findings",
    "threats": [
        {{"type": "Process", "details": "description of threat", "severity": "Medium"}}
    ],
    "recommendations": ["Action 1", "Action 2"]
}}"#
    )
}

pub fn dataset_prompt(summary: &Value) -> String {
    let summary = serde_json::to_string_pretty(summary).unwrap_or_default();
    format!(
        r#"You are an expert Windows Security Analyst and Digital Forensics Investigator.

Analyze this Windows Event Log dataset summary and provide threat intelligence:

DATASET SUMMARY:
{summary}

Provide a comprehensive security assessment including:
1. Overall threat level (LOW/MEDIUM/HIGH/CRITICAL)
2. Key security concerns identified
3. Potential attack indicators (MITRE ATT&CK techniques if applicable)
4. Timeline anomalies or patterns
5. Recommended immediate actions
6. Investigation priorities

Respond with ONLY valid JSON:
{{
    "threat_level": "MEDIUM",
    "risk_score": 45,
    "executive_summary": "Brief executive summary of findings",
    "key_concerns": ["Concern 1", "Concern 2"],
    "attack_indicators": [
        {{"technique": "T1059", "name": "Command Line Interface", "confidence": "high", "evidence": "description"}}
    ],
    "timeline_analysis": "Analysis of event patterns over time",
    "recommendations": ["Action 1", "Action 2", "Action 3"],
    "investigation_priorities": ["Priority 1", "Priority 2"]
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventlog::test_support::event_log;
    use crate::eventlog::EventLogAnalyzer;

    #[test]
    fn test_artifact_context_limits() {
        let roots: Vec<Value> = (0..30)
            .map(|i| json!({"pid": i, "name": format!("p{}.exe", i)}))
            .collect();
        let events: Vec<Value> = (0..12)
            .map(|i| json!({"event_id": 4625 + i, "message": "m".repeat(80)}))
            .collect();
        let (artifacts, _) = LiveArtifacts::from_value(json!({
            "processes": {"root_processes": roots},
            "event_logs": {"critical_events": events}
        }));

        let context = artifact_context(&artifacts);
        let processes = context["processes"].as_array().unwrap();
        assert_eq!(processes.len(), 20);
        assert_eq!(processes[0], "p0.exe (PID: 0)");
        let events = context["events"].as_array().unwrap();
        assert_eq!(events.len(), 10);
        assert_eq!(events[0], format!("4625: {}", "m".repeat(50)));
        assert!(context.get("registry").is_none());
    }

    #[test]
    fn test_event_log_summary_keys() {
        let ds = event_log(&[
            ("2024-01-01 10:00:00", "Error", "Microsoft-Windows-DPTF", "", "thermal"),
            ("2024-01-01 11:00:00", "Warning", "Winlogon", "", "slow"),
        ]);
        let report = EventLogAnalyzer::new().analyze(&ds).unwrap();
        let summary = event_log_summary(&report);
        assert_eq!(summary["total_events"], 2);
        assert_eq!(summary["error_count"], 1);
        assert_eq!(summary["threat_count"], 2);
        assert_eq!(summary["sample_threats"].as_array().unwrap().len(), 2);

        let prompt = dataset_prompt(&summary);
        assert!(prompt.contains("DATASET SUMMARY:"));
        assert!(prompt.contains("\"total_events\": 2"));
    }

    #[test]
    fn test_artifact_prompt_embeds_context() {
        let prompt = artifact_prompt(&json!({"processes": ["cmd.exe (PID: 4)"]}));
        assert!(prompt.starts_with("You are a Senior Cyber Forensic Analyst."));
        assert!(prompt.contains("cmd.exe (PID: 4)"));
        assert!(prompt.contains("\"risk_level\": \"HIGH\""));
    }
}
