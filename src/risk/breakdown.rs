use crate::models::{Finding, Severity};
use serde::{Deserialize, Serialize};

/// Alert count and worst risk for one dashboard parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterStat {
    pub alerts: usize,
    pub risk: Severity,
}

impl Default for ParameterStat {
    fn default() -> Self {
        Self {
            alerts: 0,
            risk: Severity::Low,
        }
    }
}

impl ParameterStat {
    fn record(&mut self, severity: Severity) {
        self.alerts += 1;
        match severity {
            Severity::High | Severity::Critical => self.risk = Severity::High,
            Severity::Medium if self.risk == Severity::Low => self.risk = Severity::Medium,
            _ => {}
        }
    }
}

/// Findings bucketed into the four dashboard parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterBreakdown {
    pub process_spawning: ParameterStat,
    pub registry_modifications: ParameterStat,
    pub network_anomalies: ParameterStat,
    pub event_log_gaps: ParameterStat,
}

impl ParameterBreakdown {
    /// Anything not about processes, the registry or the network lands in
    /// `event_log_gaps`.
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut breakdown = Self::default();
        for finding in findings {
            let kind = finding.finding_type.to_lowercase();
            let details = finding.details.to_lowercase();
            let stat = if kind.contains("process") || details.contains("process") {
                &mut breakdown.process_spawning
            } else if kind.contains("registry") || details.contains("registry") {
                &mut breakdown.registry_modifications
            } else if kind.contains("network") || details.contains("port") {
                &mut breakdown.network_anomalies
            } else {
                &mut breakdown.event_log_gaps
            };
            stat.record(finding.severity);
        }
        breakdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucketing() {
        let findings = vec![
            Finding::new("suspicious_process", Severity::High, 10.0, "cmd.exe (4): X"),
            Finding::new("registry_persistence", Severity::Medium, 5.0, "Suspicious run key: a"),
            Finding::new("registry_persistence", Severity::Medium, 5.0, "Suspicious run key: b"),
            Finding::new("statistical_outlier", Severity::Low, 1.0, "dst port 4444 unusual"),
            Finding::new("critical_event", Severity::Critical, 15.0, "Event 1102: log cleared"),
        ];
        let b = ParameterBreakdown::from_findings(&findings);
        assert_eq!(b.process_spawning, ParameterStat { alerts: 1, risk: Severity::High });
        assert_eq!(b.registry_modifications, ParameterStat { alerts: 2, risk: Severity::Medium });
        assert_eq!(b.network_anomalies, ParameterStat { alerts: 1, risk: Severity::Low });
        assert_eq!(b.event_log_gaps, ParameterStat { alerts: 1, risk: Severity::High });
    }

    #[test]
    fn test_medium_does_not_lower_high() {
        let findings = vec![
            Finding::new("critical_event", Severity::High, 15.0, "Event 7: a"),
            Finding::new("critical_event", Severity::Medium, 15.0, "Event 8: b"),
        ];
        let b = ParameterBreakdown::from_findings(&findings);
        assert_eq!(b.event_log_gaps.risk, Severity::High);
        assert_eq!(b.event_log_gaps.alerts, 2);
    }

    #[test]
    fn test_empty() {
        assert_eq!(ParameterBreakdown::from_findings(&[]), ParameterBreakdown::default());
    }
}
