//! Shared data model: findings, risk reports and severity tiers.

mod artifacts;
mod event;

pub use artifacts::{
    CriticalEvent, EventLogSnapshot, LiveArtifacts, NetworkConnection, NetworkSnapshot,
    ProcessNode, ProcessTree, RegistrySnapshot, RunKeyEntry, Significance,
};
pub use event::{EventLevel, EventRecord};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity tier shared by findings and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Tier for a 0-100 risk score: >70 critical, >40 high, >10 medium.
    pub fn from_score(score: f64) -> Self {
        if score > 70.0 {
            Severity::Critical
        } else if score > 40.0 {
            Severity::High
        } else if score > 10.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Bucket for a normalized 0-1 outlier risk.
    pub fn from_unit_risk(risk: f64) -> Self {
        if risk > 0.8 {
            Severity::Critical
        } else if risk > 0.6 {
            Severity::High
        } else if risk > 0.4 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Case-insensitive parse of collector or provider severity labels.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" | "info" | "informational" => Some(Severity::Low),
            "medium" | "moderate" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Gauge color used by dashboard views.
    pub fn gauge_color(score: f64) -> &'static str {
        if score > 70.0 {
            "red"
        } else if score > 40.0 {
            "orange"
        } else {
            "green"
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single scored observation. Never mutated once pushed into a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub finding_type: String,
    pub severity: Severity,
    /// Non-negative contribution to the report score
    pub contribution: f64,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mitre: Option<String>,
}

impl Finding {
    pub fn new(
        finding_type: impl Into<String>,
        severity: Severity,
        contribution: f64,
        details: impl Into<String>,
    ) -> Self {
        Self {
            finding_type: finding_type.into(),
            severity,
            contribution: contribution.max(0.0),
            details: details.into(),
            mitre: None,
        }
    }

    pub fn with_mitre(mut self, technique: impl Into<String>) -> Self {
        self.mitre = Some(technique.into());
        self
    }
}

/// Narrative returned by an external reasoning provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiNarrative {
    pub provider: String,
    pub model: String,
    pub summary: String,
    /// Risk level as stated by the provider (may be "UNKNOWN")
    pub stated_level: String,
    pub stated_score: f64,
    pub recommendations: Vec<String>,
    pub key_concerns: Vec<String>,
}

/// MITRE technique referenced by one or more findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackMapping {
    pub technique_id: String,
    pub name: String,
    pub tactic: String,
    pub finding_count: usize,
}

/// Aggregate verdict for one analysis invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub score: f64,
    pub severity: Severity,
    pub findings: Vec<Finding>,
    pub attack_mapping: Vec<AttackMapping>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiNarrative>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_error: Option<String>,
    pub ai_soft_failure: bool,
    pub generated_at: DateTime<Utc>,
}

impl RiskReport {
    /// Build a report whose score is the clamped sum of finding contributions.
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        let raw: f64 = findings.iter().map(|f| f.contribution).sum();
        let score = clamp_score(raw);
        Self {
            score,
            severity: Severity::from_score(score),
            findings,
            attack_mapping: Vec::new(),
            warnings: Vec::new(),
            ai: None,
            ai_error: None,
            ai_soft_failure: false,
            generated_at: Utc::now(),
        }
    }

    /// Take an external score only when it beats the local one.
    /// Returns true when the score changed.
    pub fn adopt_higher_score(&mut self, external: f64) -> bool {
        let external = clamp_score(external);
        if external > self.score {
            self.score = external;
            self.severity = Severity::from_score(external);
            true
        } else {
            false
        }
    }

    pub fn gauge_color(&self) -> &'static str {
        Severity::gauge_color(self.score)
    }
}

/// Clamp to [0, 100], treating NaN as zero.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(Severity::from_score(0.0), Severity::Low);
        assert_eq!(Severity::from_score(10.0), Severity::Low);
        assert_eq!(Severity::from_score(10.5), Severity::Medium);
        assert_eq!(Severity::from_score(40.0), Severity::Medium);
        assert_eq!(Severity::from_score(41.0), Severity::High);
        assert_eq!(Severity::from_score(70.0), Severity::High);
        assert_eq!(Severity::from_score(70.1), Severity::Critical);
    }

    #[test]
    fn test_report_score_is_capped() {
        let findings = (0..20)
            .map(|i| Finding::new("critical_event", Severity::Critical, 15.0, format!("event {}", i)))
            .collect();
        let report = RiskReport::from_findings(findings);
        assert_eq!(report.score, 100.0);
        assert_eq!(report.severity, Severity::Critical);
    }

    #[test]
    fn test_negative_contribution_is_floored() {
        let finding = Finding::new("noise", Severity::Low, -5.0, "negative");
        assert_eq!(finding.contribution, 0.0);
        let report = RiskReport::from_findings(vec![finding]);
        assert_eq!(report.score, 0.0);
    }

    #[test]
    fn test_adopt_higher_score_never_lowers() {
        let mut report = RiskReport::from_findings(vec![Finding::new(
            "suspicious_process",
            Severity::High,
            30.0,
            "x",
        )]);
        assert!(!report.adopt_higher_score(20.0));
        assert_eq!(report.score, 30.0);
        assert!(report.adopt_higher_score(85.0));
        assert_eq!(report.score, 85.0);
        assert_eq!(report.severity, Severity::Critical);
        assert!(report.adopt_higher_score(250.0));
        assert_eq!(report.score, 100.0);
    }

    #[test]
    fn test_severity_parse_and_serde() {
        assert_eq!(Severity::parse("Medium"), Some(Severity::Medium));
        assert_eq!(Severity::parse("CRITICAL"), Some(Severity::Critical));
        assert_eq!(Severity::parse("unknown"), None);
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "\"high\"");
    }

    #[test]
    fn test_gauge_color() {
        assert_eq!(Severity::gauge_color(71.0), "red");
        assert_eq!(Severity::gauge_color(41.0), "orange");
        assert_eq!(Severity::gauge_color(40.0), "green");
    }
}
