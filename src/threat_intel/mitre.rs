//! MITRE ATT&CK techniques referenced by Windows host findings

use super::AttackTechnique;

fn technique(id: &str, name: &str, tactic: &str, description: &str, indicators: &[&str]) -> AttackTechnique {
    AttackTechnique {
        technique_id: id.to_string(),
        name: name.to_string(),
        tactic: tactic.to_string(),
        description: description.to_string(),
        detection_indicators: indicators.iter().map(|s| s.to_string()).collect(),
    }
}

/// Load the technique catalogue
pub fn get_mitre_techniques() -> Vec<AttackTechnique> {
    vec![
        // Execution
        technique(
            "T1059",
            "Command and Scripting Interpreter",
            "Execution",
            "Adversaries may abuse command and script interpreters",
            &["cmd.exe", "wscript", "cscript", "mshta"],
        ),
        technique(
            "T1059.001",
            "PowerShell",
            "Execution",
            "Adversaries may abuse PowerShell commands and scripts",
            &["powershell", "script block", "-encodedcommand", "invoke-expression"],
        ),
        technique(
            "T1047",
            "Windows Management Instrumentation",
            "Execution",
            "Adversaries may abuse WMI to execute malicious commands",
            &["wmi-activity", "wmic", "wmiprvse"],
        ),
        // Persistence
        technique(
            "T1547",
            "Boot or Logon Autostart Execution",
            "Persistence",
            "Adversaries may configure system settings to automatically execute a program",
            &["winlogon", "autostart", "startup"],
        ),
        technique(
            "T1547.001",
            "Registry Run Keys / Startup Folder",
            "Persistence",
            "Adversaries may achieve persistence by adding a program to a Run key",
            &["run key", "registry_persistence", "currentversion\\run", "currentversion\\runonce"],
        ),
        technique(
            "T1053",
            "Scheduled Task/Job",
            "Persistence",
            "Adversaries may abuse task scheduling functionality",
            &["schtasks", "scheduled task"],
        ),
        // Privilege Escalation
        technique(
            "T1134",
            "Access Token Manipulation",
            "Privilege Escalation",
            "Adversaries may modify access tokens to operate under a different security context",
            &["token impersonation", "privilege escalation", "seimpersonate"],
        ),
        technique(
            "T1055",
            "Process Injection",
            "Privilege Escalation",
            "Adversaries may inject code into processes",
            &["injection", "hollowing", "createremotethread"],
        ),
        // Defense Evasion
        technique(
            "T1562",
            "Impair Defenses",
            "Defense Evasion",
            "Adversaries may maliciously modify components of a victim environment",
            &["security-spp", "securitycenter", "defender disabled"],
        ),
        technique(
            "T1070.001",
            "Clear Windows Event Logs",
            "Defense Evasion",
            "Adversaries may clear Windows Event Logs to hide intrusion activity",
            &["log was cleared", "log cleared", "evidence tampering"],
        ),
        technique(
            "T1036",
            "Masquerading",
            "Defense Evasion",
            "Adversaries may manipulate names or locations of artifacts to evade defenses",
            &["masquerading", "masquerade", "unusual_parent", "non_standard_path"],
        ),
        technique(
            "T1027",
            "Obfuscated Files or Information",
            "Defense Evasion",
            "Adversaries may make files or information difficult to discover",
            &["obfuscated", "base64", "encoded"],
        ),
        // Credential Access
        technique(
            "T1003",
            "OS Credential Dumping",
            "Credential Access",
            "Adversaries may attempt to dump credentials",
            &["mimikatz", "lsass", "sekurlsa"],
        ),
        technique(
            "T1110",
            "Brute Force",
            "Credential Access",
            "Adversaries may use brute force techniques to gain access to accounts",
            &["failed logon", "logon failure", "brute force"],
        ),
        // Lateral Movement
        technique(
            "T1021",
            "Remote Services",
            "Lateral Movement",
            "Adversaries may use remote services to move within an environment",
            &["lateral movement", "psexec", "rdp", "remote logon"],
        ),
        // Command and Control
        technique(
            "T1071",
            "Application Layer Protocol",
            "Command and Control",
            "Adversaries may communicate using application layer protocols",
            &["beacon", "c2", "suspicious_port"],
        ),
        technique(
            "T1105",
            "Ingress Tool Transfer",
            "Command and Control",
            "Adversaries may transfer tools or other files from an external system",
            &["downloadfile", "certutil -urlcache", "bitsadmin"],
        ),
        // Impact
        technique(
            "T1499",
            "Endpoint Denial of Service",
            "Impact",
            "Adversaries may degrade or block the availability of services",
            &["dptf", "windows error reporting", "application crash"],
        ),
        technique(
            "T1486",
            "Data Encrypted for Impact",
            "Impact",
            "Adversaries may encrypt data on target systems to interrupt availability",
            &["ransomware", "vssadmin delete shadows"],
        ),
    ]
}
