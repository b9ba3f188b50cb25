use crate::models::{Finding, Severity};
use crate::utils::truncate_chars;
use serde_json::{Map, Value};

const FALLBACK_SUMMARY_CHARS: usize = 500;

/// Threat reported by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct AiThreat {
    pub threat_type: String,
    pub details: String,
    pub severity: Severity,
    pub mitre: Option<String>,
}

impl AiThreat {
    /// AI threats are reported but never add to the summed score.
    pub fn into_finding(self) -> Finding {
        let finding = Finding::new(self.threat_type, self.severity, 0.0, self.details);
        match self.mitre {
            Some(id) => finding.with_mitre(id),
            None => finding,
        }
    }
}

/// Normalized provider verdict. Artifact and dataset prompts ask for
/// different shapes; both land here.
#[derive(Debug, Clone, PartialEq)]
pub struct AiVerdict {
    pub risk_level: String,
    pub risk_score: f64,
    pub summary: String,
    pub threats: Vec<AiThreat>,
    pub recommendations: Vec<String>,
    pub key_concerns: Vec<String>,
}

impl AiVerdict {
    fn fallback(content: &str) -> Self {
        let summary = if content.is_empty() {
            "No response from AI".to_string()
        } else {
            truncate_chars(content, FALLBACK_SUMMARY_CHARS).to_string()
        };
        Self {
            risk_level: "UNKNOWN".to_string(),
            risk_score: 0.0,
            summary,
            threats: Vec::new(),
            recommendations: Vec::new(),
            key_concerns: Vec::new(),
        }
    }
}

/// Strip a ```json fence, or else the first ``` fence, from `content`.
pub fn strip_fences(content: &str) -> &str {
    let content = content.trim();
    if let Some((_, rest)) = content.split_once("```json") {
        rest.split("```").next().unwrap_or(rest).trim()
    } else if content.contains("```") {
        content.split("```").nth(1).unwrap_or(content).trim()
    } else {
        content
    }
}

/// Parse provider text into a verdict. Text that is not a JSON object
/// yields an UNKNOWN verdict carrying the first 500 characters.
pub fn parse_response(content: &str) -> AiVerdict {
    let body = strip_fences(content);
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => verdict_from(&map),
        Ok(_) => {
            log::warn!("AI response is JSON but not an object");
            AiVerdict::fallback(body)
        }
        Err(e) => {
            log::warn!("Failed to parse AI response as JSON: {}", e);
            AiVerdict::fallback(body)
        }
    }
}

fn verdict_from(map: &Map<String, Value>) -> AiVerdict {
    let risk_level = text(map, &["risk_level", "threat_level"]).unwrap_or_else(|| "UNKNOWN".to_string());
    let summary = text(map, &["summary", "executive_summary"]).unwrap_or_default();

    let mut threats: Vec<AiThreat> = list(map, "threats")
        .iter()
        .filter_map(Value::as_object)
        .map(|t| AiThreat {
            threat_type: text(t, &["type"]).unwrap_or_else(|| "ai_threat".to_string()),
            details: text(t, &["details", "description"]).unwrap_or_default(),
            severity: severity(t, "severity"),
            mitre: text(t, &["mitre", "technique"]),
        })
        .collect();

    threats.extend(
        list(map, "attack_indicators")
            .iter()
            .filter_map(Value::as_object)
            .map(|i| {
                let technique = text(i, &["technique"]);
                let name = text(i, &["name"]).unwrap_or_default();
                let evidence = text(i, &["evidence"]).unwrap_or_default();
                AiThreat {
                    threat_type: "attack_indicator".to_string(),
                    details: format!("{}: {}", name, evidence),
                    severity: severity(i, "confidence"),
                    mitre: technique,
                }
            }),
    );

    AiVerdict {
        risk_level,
        risk_score: number(map.get("risk_score")),
        summary,
        threats,
        recommendations: strings(map, "recommendations"),
        key_concerns: strings(map, "key_concerns"),
    }
}

fn text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

fn list<'a>(map: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    map.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn strings(map: &Map<String, Value>, key: &str) -> Vec<String> {
    list(map, key)
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Unknown labels map to low.
fn severity(map: &Map<String, Value>, key: &str) -> Severity {
    text(map, &[key])
        .and_then(|s| Severity::parse(&s))
        .unwrap_or(Severity::Low)
}

/// Accepts numbers and numeric strings; anything else is 0.
fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
