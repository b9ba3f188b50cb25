//! Live-scrape artifacts as produced by the host collectors.
//!
//! Each collector section is decoded independently so that one broken or
//! failed section only costs a warning, never the whole run.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Forensic assessment attached by a collector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Significance {
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessNode {
    pub pid: u32,
    #[serde(default)]
    pub ppid: Option<u32>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub exe: Option<String>,
    #[serde(default)]
    pub cmdline: Option<String>,
    #[serde(default)]
    pub forensic_flags: Vec<String>,
    #[serde(default)]
    pub children: Vec<ProcessNode>,
}

impl ProcessNode {
    /// Depth-first visit of this node and all descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ProcessNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessTree {
    #[serde(default)]
    pub root_processes: Vec<ProcessNode>,
}

/// A run-key entry: either a bare path or a structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunKeyEntry {
    Path(String),
    Entry {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        forensic_significance: Option<Significance>,
    },
}

impl RunKeyEntry {
    /// Registry path and command value joined for heuristic checks.
    pub fn inspected_text(&self) -> String {
        match self {
            RunKeyEntry::Path(path) => path.clone(),
            RunKeyEntry::Entry { path, value, .. } => {
                let mut text = path.clone().unwrap_or_default();
                if let Some(value) = value {
                    text.push(' ');
                    text.push_str(value);
                }
                text
            }
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            RunKeyEntry::Path(path) => path.clone(),
            RunKeyEntry::Entry { name, path, .. } => name
                .clone()
                .or_else(|| path.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrySnapshot {
    pub run_keys: Vec<RunKeyEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RunKeysShape {
    List(Vec<RunKeyEntry>),
    Map(BTreeMap<String, RunKeyValue>),
}

#[derive(Deserialize)]
struct RunKeyValue {
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    forensic_significance: Option<Significance>,
}

#[derive(Deserialize)]
struct RegistryShape {
    #[serde(default)]
    run_keys: Option<RunKeysShape>,
}

impl<'de> Deserialize<'de> for RegistrySnapshot {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let shape = RegistryShape::deserialize(deserializer)?;
        let run_keys = match shape.run_keys {
            None => Vec::new(),
            Some(RunKeysShape::List(entries)) => entries,
            Some(RunKeysShape::Map(map)) => map
                .into_iter()
                .map(|(path, entry)| RunKeyEntry::Entry {
                    name: path.rsplit('\\').next().map(str::to_string),
                    value: entry.value.map(|v| match v {
                        Value::String(s) => s,
                        other => other.to_string(),
                    }),
                    path: Some(path),
                    forensic_significance: entry.forensic_significance,
                })
                .collect(),
        };
        Ok(Self { run_keys })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConnection {
    #[serde(default)]
    pub local_ip: Option<String>,
    #[serde(default)]
    pub local_port: Option<u16>,
    #[serde(default)]
    pub remote_ip: Option<String>,
    #[serde(default)]
    pub remote_port: Option<u16>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub process_name: Option<String>,
    #[serde(default)]
    pub forensic_flags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    #[serde(default)]
    pub connections: Vec<NetworkConnection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalEvent {
    pub event_id: Value,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub computer: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub forensic_significance: Significance,
}

impl CriticalEvent {
    pub fn event_id_text(&self) -> String {
        match &self.event_id {
            Value::String(s) => s.clone(),
            Value::Null => "Unknown".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLogSnapshot {
    #[serde(default)]
    pub critical_events: Vec<CriticalEvent>,
}

/// Everything one live scrape produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveArtifacts {
    #[serde(default)]
    pub processes: Option<ProcessTree>,
    #[serde(default)]
    pub registry: Option<RegistrySnapshot>,
    #[serde(default)]
    pub network: Option<NetworkSnapshot>,
    #[serde(default)]
    pub event_logs: Option<EventLogSnapshot>,
}

impl LiveArtifacts {
    /// Decode a raw collector payload section by section.
    ///
    /// Accepts either the artifacts object itself or a scrape envelope with
    /// an `artifacts` key and a `warnings` list. Sections reporting
    /// `{"error": ...}` or failing to decode become warnings.
    pub fn from_value(payload: Value) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let (sections, envelope_warnings) = match payload {
            Value::Object(mut map) => {
                let carried = map
                    .remove("warnings")
                    .and_then(|w| serde_json::from_value::<Vec<String>>(w).ok())
                    .unwrap_or_default();
                match map.remove("artifacts") {
                    Some(Value::Object(inner)) => (inner, carried),
                    _ => (map, carried),
                }
            }
            _ => {
                warnings.push("Artifact payload is not a JSON object".to_string());
                return (Self::default(), warnings);
            }
        };
        warnings.extend(envelope_warnings);

        let artifacts = Self {
            processes: decode_section(&sections, "processes", "Process", &mut warnings),
            registry: decode_section(&sections, "registry", "Registry", &mut warnings),
            network: decode_section(&sections, "network", "Network", &mut warnings),
            event_logs: decode_section(&sections, "event_logs", "Event log", &mut warnings),
        };
        (artifacts, warnings)
    }
}

fn decode_section<T: DeserializeOwned>(
    sections: &serde_json::Map<String, Value>,
    key: &str,
    label: &str,
    warnings: &mut Vec<String>,
) -> Option<T> {
    let section = sections.get(key)?;
    if let Some(err) = section.get("error") {
        let msg = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
        log::warn!("{} collector reported failure: {}", label, msg);
        warnings.push(format!("{} scraping failed: {}", label, msg));
        return None;
    }
    match serde_json::from_value(section.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            log::warn!("{} artifacts could not be decoded: {}", label, e);
            warnings.push(format!("{} artifacts malformed: {}", label, e));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_accepts_list_and_map() {
        let list: RegistrySnapshot = serde_json::from_value(json!({
            "run_keys": ["C:\\Users\\bob\\AppData\\evil.exe", {"name": "Updater", "path": "C:\\Temp\\u.exe"}]
        }))
        .unwrap();
        assert_eq!(list.run_keys.len(), 2);
        assert_eq!(list.run_keys[1].display_name(), "Updater");

        let map: RegistrySnapshot = serde_json::from_value(json!({
            "run_keys": {
                "SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Run\\OneDrive": {
                    "value": "C:\\Users\\bob\\AppData\\Local\\OneDrive.exe",
                    "type": 1,
                    "forensic_significance": {"severity": "high", "flags": ["NON_STANDARD_PATH"]}
                }
            }
        }))
        .unwrap();
        assert_eq!(map.run_keys.len(), 1);
        assert_eq!(map.run_keys[0].display_name(), "OneDrive");
        assert!(map.run_keys[0].inspected_text().contains("AppData"));
    }

    #[test]
    fn test_failed_section_becomes_warning() {
        let payload = json!({
            "artifacts": {
                "processes": {"error": "Access denied"},
                "event_logs": {"critical_events": [
                    {"event_id": 1102, "message": "The audit log was cleared",
                     "forensic_significance": {"severity": "critical", "category": "Evidence Tampering"}}
                ]}
            },
            "warnings": ["Network scraping failed: insufficient permissions"]
        });
        let (artifacts, warnings) = LiveArtifacts::from_value(payload);
        assert!(artifacts.processes.is_none());
        assert_eq!(artifacts.event_logs.unwrap().critical_events.len(), 1);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("Access denied")));
    }

    #[test]
    fn test_process_walk_visits_children() {
        let tree: ProcessTree = serde_json::from_value(json!({
            "root_processes": [{
                "pid": 4, "name": "System",
                "children": [{"pid": 100, "name": "cmd.exe", "forensic_flags": ["OBFUSCATED_COMMAND"]}]
            }]
        }))
        .unwrap();
        let mut names = Vec::new();
        tree.root_processes[0].walk(&mut |node| names.push(node.name.clone()));
        assert_eq!(names, vec!["System", "cmd.exe"]);
    }
}
