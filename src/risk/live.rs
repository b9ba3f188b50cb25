use crate::models::{Finding, LiveArtifacts, ProcessNode, Severity};
use crate::threat_intel::ThreatIntelEngine;
use crate::utils::truncate_chars;

const PROCESS_FLAG_POINTS: f64 = 10.0;
const RUN_KEY_POINTS: f64 = 5.0;
const CRITICAL_EVENT_POINTS: f64 = 15.0;

/// Run-key locations outside the usual system directories
const USER_WRITABLE_MARKERS: &[&str] = &["AppData", "Temp"];

/// Findings from a live scrape: one per process flag (children included),
/// per run key in a user-writable location and per critical event.
/// Techniques are inferred from each finding's text.
pub fn live_findings(intel: &ThreatIntelEngine, artifacts: &LiveArtifacts) -> Vec<Finding> {
    let mut findings = Vec::new();

    if let Some(tree) = &artifacts.processes {
        for root in &tree.root_processes {
            root.walk(&mut |node: &ProcessNode| {
                for flag in &node.forensic_flags {
                    findings.push(intel.finding(
                        "suspicious_process",
                        Severity::High,
                        PROCESS_FLAG_POINTS,
                        format!("{} ({}): {}", node.name, node.pid, flag),
                    ));
                }
            });
        }
    }

    if let Some(registry) = &artifacts.registry {
        for key in &registry.run_keys {
            let text = key.inspected_text();
            if USER_WRITABLE_MARKERS.iter().any(|m| text.contains(m)) {
                findings.push(intel.finding(
                    "registry_persistence",
                    Severity::Medium,
                    RUN_KEY_POINTS,
                    format!("Suspicious run key: {}", key.display_name()),
                ));
            }
        }
    }

    if let Some(network) = &artifacts.network {
        for conn in network.connections.iter().filter(|c| !c.forensic_flags.is_empty()) {
            findings.push(intel.finding(
                "network_anomaly",
                Severity::Low,
                0.0,
                format!(
                    "{} -> {}:{} [{}]",
                    conn.process_name.as_deref().unwrap_or("unknown"),
                    conn.remote_ip.as_deref().unwrap_or("?"),
                    conn.remote_port.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string()),
                    conn.forensic_flags.join(", ")
                ),
            ));
        }
    }

    if let Some(logs) = &artifacts.event_logs {
        for event in &logs.critical_events {
            let severity =
                Severity::parse(&event.forensic_significance.severity).unwrap_or(Severity::Low);
            let mut details = format!(
                "Event {}: {}...",
                event.event_id_text(),
                truncate_chars(&event.message, 50)
            );
            if let Some(category) = &event.forensic_significance.category {
                details.push_str(&format!(" [{}]", category));
            }
            findings.push(intel.finding(
                "critical_event",
                severity,
                CRITICAL_EVENT_POINTS,
                details,
            ));
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_process_flags_each_count() {
        let (artifacts, _) = LiveArtifacts::from_value(json!({
            "processes": {"root_processes": [{
                "pid": 1, "name": "explorer.exe", "forensic_flags": ["A"],
                "children": [{"pid": 2, "name": "cmd.exe", "forensic_flags": ["B", "C"],
                    "children": [{"pid": 3, "name": "powershell.exe", "forensic_flags": ["D"]}]}]
            }]}
        }));
        let findings = live_findings(&ThreatIntelEngine::new(), &artifacts);
        assert_eq!(findings.len(), 4);
        assert_eq!(findings.iter().map(|f| f.contribution).sum::<f64>(), 40.0);
        assert_eq!(findings[3].details, "powershell.exe (3): D");
        assert_eq!(findings[3].mitre.as_deref(), Some("T1059.001"));
    }

    #[test]
    fn test_run_key_markers_are_case_sensitive() {
        let (artifacts, _) = LiveArtifacts::from_value(json!({
            "registry": {"run_keys": [
                "C:\\Program Files\\Vendor\\agent.exe",
                "C:\\users\\x\\appdata\\lower.exe",
                {"name": "Temp cleaner", "path": "C:\\Windows\\Temp\\clean.exe"}
            ]}
        }));
        let findings = live_findings(&ThreatIntelEngine::new(), &artifacts);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].details, "Suspicious run key: Temp cleaner");
    }

    #[test]
    fn test_critical_event_details_are_truncated() {
        let long = "x".repeat(80);
        let (artifacts, _) = LiveArtifacts::from_value(json!({
            "event_logs": {"critical_events": [
                {"event_id": "4720", "message": long,
                 "forensic_significance": {"severity": "Critical"}}
            ]}
        }));
        let findings = live_findings(&ThreatIntelEngine::new(), &artifacts);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].details, format!("Event 4720: {}...", "x".repeat(50)));
    }

    #[test]
    fn test_flagged_connections_add_no_score() {
        let (artifacts, _) = LiveArtifacts::from_value(json!({
            "network": {"connections": [
                {"remote_ip": "203.0.113.9", "remote_port": 4444, "process_name": "nc.exe",
                 "forensic_flags": ["SUSPICIOUS_PORT"]},
                {"remote_ip": "10.0.0.1", "remote_port": 443}
            ]}
        }));
        let findings = live_findings(&ThreatIntelEngine::new(), &artifacts);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].contribution, 0.0);
        assert!(findings[0].details.contains("4444"));
    }
}
