use super::stats::{count_by, ranked, SeverityDistribution, SourceAnalysis, TimelineAnalysis};
use super::LogEntry;
use crate::models::{EventLevel, Severity};
use serde::{Deserialize, Serialize};

pub const CRITICAL_SOURCES: &[&str] = &[
    "Microsoft-Windows-Security-Auditing",
    "Microsoft-Windows-Sysmon",
    "Microsoft-Windows-PowerShell",
    "Microsoft-Windows-WMI-Activity",
];

pub const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "failed",
    "denied",
    "unauthorized",
    "permission",
    "access denied",
    "invalid",
    "error",
    "critical",
    "breach",
    "threat",
];

const MAX_ANOMALIES: usize = 10;
const REPEATED_ERROR_SOURCES: usize = 5;
const REPEATED_ERROR_MIN: usize = 5;
const ACTIVE_USERS: usize = 3;
const ACTIVE_USER_MIN: usize = 50;
const KEYWORD_MIN: usize = 3;
const ERROR_REVIEW_MIN: usize = 10;

/// Coarse threat level used by the event-log heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Low => "LOW",
            ThreatLevel::Medium => "MEDIUM",
            ThreatLevel::High => "HIGH",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ThreatLevel::Low => Severity::Low,
            ThreatLevel::Medium => Severity::Medium,
            ThreatLevel::High => Severity::High,
        }
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    RepeatedErrors,
    HighActivityUser,
    SuspiciousKeywords,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    /// Source, user or keyword the anomaly is about
    pub subject: String,
    pub count: usize,
    pub risk: Severity,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// Total detected, before truncation
    pub anomalies_detected: usize,
    pub anomalies: Vec<Anomaly>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatIndicator {
    pub category: String,
    #[serde(rename = "type")]
    pub threat_type: String,
    pub count: usize,
    pub severity: ThreatLevel,
    pub mitre_technique: String,
    pub confidence: f64,
    pub description: String,
}

impl ThreatIndicator {
    /// Bare technique ID, e.g. `T1499` from `T1499 - Service Stop`.
    pub fn mitre_id(&self) -> &str {
        self.mitre_technique
            .split(" - ")
            .next()
            .unwrap_or(&self.mitre_technique)
            .trim()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatReport {
    pub total_threats_identified: usize,
    pub threats: Vec<ThreatIndicator>,
    pub overall_risk: ThreatLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: ThreatLevel,
    pub action: String,
    pub description: String,
    pub steps: Vec<String>,
}

pub(crate) fn detect_anomalies(entries: &[LogEntry]) -> AnomalyReport {
    let mut anomalies = Vec::new();

    let error_sources = count_by(entries, |e| {
        if e.level == EventLevel::Error {
            Some(e.source)
        } else {
            None
        }
    });
    let error_sources: Vec<(&str, usize)> = ranked(&error_sources)
        .into_iter()
        .filter_map(|(source, count)| source.map(|s| (s, count)))
        .collect();
    for (source, count) in error_sources.into_iter().take(REPEATED_ERROR_SOURCES) {
        if count > REPEATED_ERROR_MIN {
            anomalies.push(Anomaly {
                kind: AnomalyKind::RepeatedErrors,
                subject: source.to_string(),
                count,
                risk: Severity::Medium,
                description: format!("{} generated {} error events", source, count),
            });
        }
    }

    let users = count_by(entries, |e| e.user);
    let active_users = ranked(&users)
        .into_iter()
        .filter(|(user, _)| *user != "N/A")
        .take(ACTIVE_USERS);
    for (user, count) in active_users {
        if count > ACTIVE_USER_MIN {
            anomalies.push(Anomaly {
                kind: AnomalyKind::HighActivityUser,
                subject: user.to_string(),
                count,
                risk: Severity::Low,
                description: format!(
                    "User {} has {} events (possible noise or legitimate activity)",
                    user, count
                ),
            });
        }
    }

    let messages: Vec<String> = entries.iter().map(|e| e.message.to_lowercase()).collect();
    for keyword in SUSPICIOUS_KEYWORDS {
        let count = messages.iter().filter(|m| m.contains(keyword)).count();
        if count > KEYWORD_MIN {
            anomalies.push(Anomaly {
                kind: AnomalyKind::SuspiciousKeywords,
                subject: keyword.to_string(),
                count,
                risk: Severity::Medium,
                description: format!(
                    "Messages containing \"{}\" detected {} times",
                    keyword, count
                ),
            });
        }
    }

    let anomalies_detected = anomalies.len();
    anomalies.truncate(MAX_ANOMALIES);
    AnomalyReport {
        anomalies_detected,
        anomalies,
    }
}

struct ThreatRule {
    category: &'static str,
    threat_type: &'static str,
    severity: ThreatLevel,
    mitre_technique: &'static str,
    confidence: f64,
    description: &'static str,
    applies: fn(&str, &EventLevel) -> bool,
}

static THREAT_RULES: &[ThreatRule] = &[
    ThreatRule {
        category: "Hardware Issues",
        threat_type: "DPTF_Errors",
        severity: ThreatLevel::Low,
        mitre_technique: "T1499 - Service Stop",
        confidence: 0.6,
        description: "Power/thermal management errors (system stability concern)",
        applies: |source, level| source.contains("dptf") && *level == EventLevel::Error,
    },
    ThreatRule {
        category: "Session Management",
        threat_type: "Winlogon_Events",
        severity: ThreatLevel::Medium,
        mitre_technique: "T1547 - Boot or Logon Autostart Execution",
        confidence: 0.7,
        description: "Session initialization issues detected",
        applies: |source, level| {
            source.contains("winlogon") && matches!(level, EventLevel::Error | EventLevel::Warning)
        },
    },
    ThreatRule {
        category: "System Stability",
        threat_type: "Application_Crashes",
        severity: ThreatLevel::Medium,
        mitre_technique: "T1499 - Service Disruption",
        confidence: 0.75,
        description: "Application crashes or system failures recorded",
        applies: |source, _| source.contains("windows error reporting"),
    },
    ThreatRule {
        category: "Security Services",
        threat_type: "Protection_Events",
        severity: ThreatLevel::Low,
        mitre_technique: "T1562 - Impair Defenses",
        confidence: 0.5,
        description: "Software Protection Service activities",
        applies: |source, _| source.contains("security-spp") || source.contains("securitycenter"),
    },
];

pub(crate) fn identify_threats(entries: &[LogEntry]) -> ThreatReport {
    let lowered: Vec<(String, &EventLevel)> = entries
        .iter()
        .map(|e| (e.source.to_lowercase(), &e.level))
        .collect();

    let threats: Vec<ThreatIndicator> = THREAT_RULES
        .iter()
        .filter_map(|rule| {
            let count = lowered
                .iter()
                .filter(|(source, level)| (rule.applies)(source, level))
                .count();
            (count > 0).then(|| ThreatIndicator {
                category: rule.category.to_string(),
                threat_type: rule.threat_type.to_string(),
                count,
                severity: rule.severity,
                mitre_technique: rule.mitre_technique.to_string(),
                confidence: rule.confidence,
                description: rule.description.to_string(),
            })
        })
        .collect();

    ThreatReport {
        total_threats_identified: threats.len(),
        overall_risk: overall_risk(&threats),
        threats,
    }
}

/// HIGH on any high threat, MEDIUM on two or more medium ones, else LOW.
pub fn overall_risk(threats: &[ThreatIndicator]) -> ThreatLevel {
    let high = threats.iter().filter(|t| t.severity == ThreatLevel::High).count();
    let medium = threats.iter().filter(|t| t.severity == ThreatLevel::Medium).count();
    if high > 0 {
        ThreatLevel::High
    } else if medium >= 2 {
        ThreatLevel::Medium
    } else {
        ThreatLevel::Low
    }
}

fn steps(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn recommendations(
    severity: &SeverityDistribution,
    sources: &SourceAnalysis,
    timeline: &TimelineAnalysis,
) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if severity.error_count > ERROR_REVIEW_MIN {
        recs.push(Recommendation {
            priority: ThreatLevel::High,
            action: "Review error events".to_string(),
            description: format!(
                "{} error events detected. Investigate root causes.",
                severity.error_count
            ),
            steps: steps(&[
                "1. Filter logs by \"Error\" level",
                "2. Group by Source to identify problematic services",
                "3. Check system logs for correlations",
                "4. Review backup/recovery status",
            ]),
        });
    }

    if !sources.critical_sources.is_empty() {
        let names: Vec<&str> = sources.critical_sources.keys().map(String::as_str).collect();
        recs.push(Recommendation {
            priority: ThreatLevel::Medium,
            action: "Monitor critical sources".to_string(),
            description: format!("Critical sources detected: {}", names.join(", ")),
            steps: steps(&[
                "1. Enable enhanced logging for critical sources",
                "2. Set up alerts for critical events",
                "3. Archive logs for forensic analysis",
            ]),
        });
    }

    recs.push(Recommendation {
        priority: ThreatLevel::Low,
        action: "Review peak activity time".to_string(),
        description: format!(
            "Peak activity occurs around {}:00. Normal operation indicator.",
            timeline.peak_hour
        ),
        steps: steps(&[
            "1. Establish baseline metrics",
            "2. Monitor for deviations from baseline",
            "3. Correlate with user activity logs",
        ]),
    });

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventlog::test_support::event_log;
    use crate::eventlog::EventLogAnalyzer;

    #[test]
    fn test_threat_rules_are_case_insensitive() {
        let report = EventLogAnalyzer::new()
            .analyze(&event_log(&[
                ("2024-01-01 10:00:00", "Error", "Intel-DPTF-Service", "N/A", ""),
                ("2024-01-01 10:01:00", "Warning", "intel-dptf", "N/A", ""),
                ("2024-01-01 10:02:00", "Warning", "Microsoft-Windows-WINLOGON", "N/A", ""),
                ("2024-01-01 10:03:00", "Information", "windows error reporting", "N/A", ""),
                ("2024-01-01 10:04:00", "Information", "Microsoft-Windows-Security-SPP", "N/A", ""),
            ]))
            .unwrap();
        let threats = &report.threat_indicators;
        assert_eq!(threats.total_threats_identified, 4);
        assert_eq!(threats.threats[0].threat_type, "DPTF_Errors");
        // Only the Error-level DPTF record counts
        assert_eq!(threats.threats[0].count, 1);
        assert_eq!(threats.threats[0].mitre_id(), "T1499");
        assert_eq!(threats.overall_risk, ThreatLevel::Medium);
    }

    #[test]
    fn test_overall_risk_rules() {
        let threat = |severity| ThreatIndicator {
            category: String::new(),
            threat_type: String::new(),
            count: 1,
            severity,
            mitre_technique: String::new(),
            confidence: 0.5,
            description: String::new(),
        };
        assert_eq!(overall_risk(&[]), ThreatLevel::Low);
        assert_eq!(overall_risk(&[threat(ThreatLevel::Medium)]), ThreatLevel::Low);
        assert_eq!(
            overall_risk(&[threat(ThreatLevel::Medium), threat(ThreatLevel::Medium)]),
            ThreatLevel::Medium
        );
        assert_eq!(
            overall_risk(&[threat(ThreatLevel::Low), threat(ThreatLevel::High)]),
            ThreatLevel::High
        );
    }

    #[test]
    fn test_anomalies() {
        let mut rows = Vec::new();
        for i in 0..6 {
            rows.push((
                "2024-01-01 10:00:00",
                "Error",
                "BadDriver",
                "N/A",
                if i < 4 { "Access denied for user" } else { "ok" },
            ));
        }
        let report = EventLogAnalyzer::new().analyze(&event_log(&rows)).unwrap();
        let anomalies = &report.anomalies.anomalies;

        let repeated = anomalies
            .iter()
            .find(|a| a.kind == AnomalyKind::RepeatedErrors)
            .unwrap();
        assert_eq!(repeated.subject, "BadDriver");
        assert_eq!(repeated.count, 6);
        assert_eq!(repeated.risk, Severity::Medium);

        let keywords: Vec<&str> = anomalies
            .iter()
            .filter(|a| a.kind == AnomalyKind::SuspiciousKeywords)
            .map(|a| a.subject.as_str())
            .collect();
        assert_eq!(keywords, vec!["denied", "access denied"]);
        assert!(anomalies.iter().all(|a| a.kind != AnomalyKind::HighActivityUser));
    }

    #[test]
    fn test_high_activity_user_excludes_na() {
        let rows: Vec<_> = (0..51)
            .map(|_| ("2024-01-01 10:00:00", "Information", "App", "svc_backup", ""))
            .chain((0..60).map(|_| ("2024-01-01 11:00:00", "Information", "App", "N/A", "")))
            .collect();
        let report = EventLogAnalyzer::new().analyze(&event_log(&rows)).unwrap();
        let users: Vec<&Anomaly> = report
            .anomalies
            .anomalies
            .iter()
            .filter(|a| a.kind == AnomalyKind::HighActivityUser)
            .collect();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].subject, "svc_backup");
        assert_eq!(users[0].risk, Severity::Low);
    }

    #[test]
    fn test_recommendations() {
        let mut rows = vec![(
            "2024-01-01 09:00:00",
            "Information",
            "Microsoft-Windows-PowerShell",
            "N/A",
            "",
        )];
        rows.extend((0..11).map(|_| ("2024-01-01 14:00:00", "Error", "App", "N/A", "")));
        let report = EventLogAnalyzer::new().analyze(&event_log(&rows)).unwrap();
        let priorities: Vec<ThreatLevel> = report.recommendations.iter().map(|r| r.priority).collect();
        assert_eq!(
            priorities,
            vec![ThreatLevel::High, ThreatLevel::Medium, ThreatLevel::Low]
        );
        assert!(report.recommendations[2].description.contains("14:00"));

        let quiet = EventLogAnalyzer::new()
            .analyze(&event_log(&[("2024-01-01 09:00:00", "Error", "App", "N/A", "")]))
            .unwrap();
        assert_eq!(quiet.recommendations.len(), 1);
        assert_eq!(quiet.recommendations[0].priority, ThreatLevel::Low);
    }
}
