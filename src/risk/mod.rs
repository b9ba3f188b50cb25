//! Risk Aggregator
//!
//! Turns analyzer output into findings and folds them into a single
//! [`RiskReport`]. Each finding carries its own score contribution; the
//! report score is their capped sum and the tier follows from the score.

mod breakdown;
mod dataset;
mod live;

pub use breakdown::{ParameterBreakdown, ParameterStat};
pub use dataset::{event_log_findings, generic_findings};
pub use live::live_findings;

use crate::eventlog::EventLogReport;
use crate::models::{Finding, LiveArtifacts, RiskReport};
use crate::outlier::OutlierReport;
use crate::sequence::SequenceReport;
use crate::threat_intel::ThreatIntelEngine;

#[derive(Default)]
pub struct RiskAggregator {
    intel: ThreatIntelEngine,
}

impl RiskAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score an event-log analysis.
    pub fn score_event_log(&self, report: &EventLogReport) -> RiskReport {
        self.finalize(event_log_findings(&self.intel, report), Vec::new())
    }

    /// Score a generic dataset from whichever analyzers produced output.
    pub fn score_generic(
        &self,
        outliers: Option<&OutlierReport>,
        sequences: Option<&SequenceReport>,
        warnings: Vec<String>,
    ) -> RiskReport {
        self.finalize(generic_findings(&self.intel, outliers, sequences), warnings)
    }

    /// Score live host artifacts. `warnings` carries collector failures.
    pub fn score_live(&self, artifacts: &LiveArtifacts, warnings: Vec<String>) -> RiskReport {
        self.finalize(live_findings(&self.intel, artifacts), warnings)
    }

    /// Rebuild the technique mapping after findings were appended.
    pub fn remap(&self, report: &mut RiskReport) {
        report.attack_mapping = self.intel.map_findings(&report.findings);
    }

    fn finalize(&self, findings: Vec<Finding>, warnings: Vec<String>) -> RiskReport {
        let mut report = RiskReport::from_findings(findings);
        report.attack_mapping = self.intel.map_findings(&report.findings);
        report.warnings = warnings;
        log::info!(
            "Risk report: score {:.1} ({}), {} findings, {} warnings",
            report.score,
            report.severity,
            report.findings.len(),
            report.warnings.len()
        );
        report
    }
}
