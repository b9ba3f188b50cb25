//! Multi-stage attack patterns mapped to MITRE ATT&CK.

use crate::models::Severity;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackPattern {
    pub key: &'static str,
    /// Stage labels, matched in order as case-insensitive substrings
    pub stages: &'static [&'static str],
    pub mitre: &'static str,
    pub severity: Severity,
    pub description: &'static str,
}

pub static ATTACK_PATTERNS: &[AttackPattern] = &[
    AttackPattern {
        key: "persistence_run_key",
        stages: &["Process Spawn", "Registry Modification", "System Restart"],
        mitre: "T1547.001",
        severity: Severity::Critical,
        description: "Potential persistence via Registry Run key",
    },
    AttackPattern {
        key: "fileless_malware",
        stages: &["PowerShell Execution", "Script Block Logging", "Network Connection"],
        mitre: "T1059.001",
        severity: Severity::Critical,
        description: "Fileless malware execution detected",
    },
    AttackPattern {
        key: "lateral_movement",
        stages: &["Logon Activity", "Process Creation", "Network Connection"],
        mitre: "T1021",
        severity: Severity::High,
        description: "Lateral movement indicators detected",
    },
    AttackPattern {
        key: "privilege_escalation",
        stages: &["Process Spawn", "Token Impersonation", "Registry Modification"],
        mitre: "T1134",
        severity: Severity::High,
        description: "Potential privilege escalation attempt",
    },
];

impl AttackPattern {
    /// Number of stages observed in order within `observed`.
    ///
    /// Greedy walk: an event advances the pointer when it contains the
    /// current stage label. Events that match no stage are skipped.
    pub fn stages_matched<'a>(&self, observed: impl IntoIterator<Item = &'a str>) -> usize {
        let stages: Vec<String> = self.stages.iter().map(|s| s.to_lowercase()).collect();
        let mut pointer = 0;
        for event in observed {
            if pointer >= stages.len() {
                break;
            }
            if event.to_lowercase().contains(&stages[pointer]) {
                pointer += 1;
            }
        }
        pointer
    }

    /// True when at least `threshold` of the stages were seen in order.
    pub fn matches<'a>(&self, observed: impl IntoIterator<Item = &'a str>, threshold: f64) -> bool {
        self.stages_matched(observed) as f64 >= threshold * self.stages.len() as f64
    }
}

pub fn pattern(key: &str) -> Option<&'static AttackPattern> {
    ATTACK_PATTERNS.iter().find(|p| p.key == key)
}
