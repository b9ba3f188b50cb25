//! Threat Intelligence Module
//!
//! MITRE ATT&CK technique catalogue and mapping of report findings onto it.
//! Findings that already carry a technique ID are counted directly; the rest
//! are matched on detection indicators found in their type and details.

mod mitre;

use crate::models::{AttackMapping, Finding, Severity};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// MITRE ATT&CK technique
#[derive(Debug, Clone)]
pub struct AttackTechnique {
    /// Technique ID (e.g., T1547.001)
    pub technique_id: String,
    pub name: String,
    /// Parent tactic (e.g., Persistence)
    pub tactic: String,
    pub description: String,
    /// Lowercase terms that point at this technique
    pub detection_indicators: Vec<String>,
}

/// Threat intelligence engine
pub struct ThreatIntelEngine {
    techniques: HashMap<String, AttackTechnique>,
    /// Technique ID with one compiled matcher per indicator
    indicators: Vec<(String, Vec<Regex>)>,
}

impl ThreatIntelEngine {
    pub fn new() -> Self {
        let techniques: HashMap<String, AttackTechnique> = mitre::get_mitre_techniques()
            .into_iter()
            .map(|t| (t.technique_id.clone(), t))
            .collect();
        let mut indicators: Vec<(String, Vec<Regex>)> = techniques
            .values()
            .map(|t| {
                let matchers = t
                    .detection_indicators
                    .iter()
                    .filter_map(|i| indicator_regex(i))
                    .collect();
                (t.technique_id.clone(), matchers)
            })
            .collect();
        indicators.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            techniques,
            indicators,
        }
    }

    /// Techniques whose indicators appear as whole terms in `text`, best
    /// match first.
    pub fn infer_techniques(&self, text: &str) -> Vec<&AttackTechnique> {
        let lowered = text.to_lowercase();
        let mut matched: Vec<(&AttackTechnique, usize)> = self
            .indicators
            .iter()
            .filter_map(|(id, matchers)| {
                let hits = matchers.iter().filter(|m| m.is_match(&lowered)).count();
                let technique = self.techniques.get(id)?;
                (hits > 0).then_some((technique, hits))
            })
            .collect();
        matched.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.technique_id.cmp(&b.0.technique_id)));
        matched.into_iter().map(|(t, _)| t).collect()
    }

    /// Best technique for a finding that carries no explicit ID.
    pub fn infer_id(&self, finding_type: &str, details: &str) -> Option<String> {
        self.infer_techniques(&format!("{} {}", finding_type, details))
            .first()
            .map(|t| t.technique_id.clone())
    }

    /// Build a finding tagged with its inferred technique, if any.
    pub fn finding(
        &self,
        finding_type: &str,
        severity: Severity,
        contribution: f64,
        details: String,
    ) -> Finding {
        let mitre = self.infer_id(finding_type, &details);
        let finding = Finding::new(finding_type, severity, contribution, details);
        match mitre {
            Some(id) => finding.with_mitre(id),
            None => finding,
        }
    }

    /// Group findings by technique, ordered by finding count then ID.
    /// Unknown technique IDs are kept with a placeholder name.
    pub fn map_findings(&self, findings: &[Finding]) -> Vec<AttackMapping> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for id in findings.iter().filter_map(|f| f.mitre.as_deref()) {
            let id = normalize_id(id);
            if !id.is_empty() {
                *counts.entry(id).or_insert(0) += 1;
            }
        }

        let mut mappings: Vec<AttackMapping> = counts
            .into_iter()
            .map(|(id, finding_count)| {
                let (name, tactic) = match self.get_technique(&id) {
                    Some(t) => (t.name.clone(), t.tactic.clone()),
                    None => ("Unknown Technique".to_string(), "Unknown".to_string()),
                };
                AttackMapping {
                    technique_id: id,
                    name,
                    tactic,
                    finding_count,
                }
            })
            .collect();
        mappings.sort_by(|a, b| b.finding_count.cmp(&a.finding_count));
        mappings
    }

    pub fn get_technique(&self, id: &str) -> Option<&AttackTechnique> {
        self.techniques.get(&normalize_id(id))
    }
}

impl Default for ThreatIntelEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Indicator bounded by non-alphanumerics, so `rdp` does not match
/// inside `wordpad`.
fn indicator_regex(indicator: &str) -> Option<Regex> {
    Regex::new(&format!(
        "(?:^|[^a-z0-9]){}(?:[^a-z0-9]|$)",
        regex::escape(&indicator.to_lowercase())
    ))
    .ok()
}

fn technique_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\bT\d{4}(?:\.\d{3})?\b").expect("valid regex")
    })
}

/// `T1499 - Service Stop`, `MITRE t1021` and `T1059.001 (PowerShell)` all
/// become bare uppercase IDs. Text without an ID is kept as-is.
fn normalize_id(id: &str) -> String {
    match technique_pattern().find(id) {
        Some(m) => m.as_str().to_uppercase(),
        None => id.split(" - ").next().unwrap_or(id).trim().to_string(),
    }
}
