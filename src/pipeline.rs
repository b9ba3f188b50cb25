//! End-to-end runs: dataset file or live artifacts in, risk report out.
//!
//! The analyzers are CPU-bound and independent, so each runs on the
//! blocking pool and the results are joined before aggregation. AI
//! augmentation is the only network step and never fails a run.

use crate::ai::{
    artifact_context, artifact_prompt, dataset_prompt, event_log_summary, generic_summary,
    AiOrchestrator,
};
use crate::config::{PipelineConfig, DEFAULT_FEATURES};
use crate::dataset::Dataset;
use crate::errors::{SentinelError, SentinelResult};
use crate::eventlog::{EventLogAnalyzer, EventLogReport};
use crate::models::{LiveArtifacts, RiskReport};
use crate::outlier::{OutlierReport, OutlierScorer};
use crate::risk::{ParameterBreakdown, RiskAggregator};
use crate::sequence::{build_golden_thread, GoldenThreadEntry, SequenceMatcher, SequenceReport};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetOptions {
    pub ai: bool,
    pub golden_thread: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub source: Option<PathBuf>,
    pub fingerprint: Option<String>,
    pub rows: usize,
    pub columns: Vec<String>,
    pub event_log: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetAnalysis {
    pub dataset: DatasetInfo,
    pub risk: RiskReport,
    pub gauge_color: &'static str,
    pub breakdown: ParameterBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_log: Option<EventLogReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outliers: Option<OutlierReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequences: Option<SequenceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub golden_thread: Option<Vec<GoldenThreadEntry>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveAnalysis {
    pub risk: RiskReport,
    pub gauge_color: &'static str,
    pub breakdown: ParameterBreakdown,
}

impl LiveAnalysis {
    fn new(risk: RiskReport) -> Self {
        Self {
            gauge_color: risk.gauge_color(),
            breakdown: ParameterBreakdown::from_findings(&risk.findings),
            risk,
        }
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    aggregator: RiskAggregator,
    ai: AiOrchestrator,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> SentinelResult<Self> {
        config.validate()?;
        let ai = AiOrchestrator::from_config(&config.ai.clone().with_env_keys());
        Ok(Self {
            config,
            aggregator: RiskAggregator::new(),
            ai,
        })
    }

    /// Replace the provider cascade.
    pub fn with_orchestrator(mut self, ai: AiOrchestrator) -> Self {
        self.ai = ai;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn analyze_dataset_file(
        &self,
        path: &Path,
        options: DatasetOptions,
    ) -> SentinelResult<DatasetAnalysis> {
        let path = path.to_path_buf();
        let dataset = tokio::task::spawn_blocking(move || Dataset::load(&path)).await??;
        self.analyze_dataset(dataset, options).await
    }

    /// Event-log exports take the statistical path; anything else goes
    /// through outlier scoring and sequence matching.
    pub async fn analyze_dataset(
        &self,
        dataset: Dataset,
        options: DatasetOptions,
    ) -> SentinelResult<DatasetAnalysis> {
        if dataset.is_empty() {
            return Err(SentinelError::EmptyDataset);
        }
        let dataset = Arc::new(dataset);
        let info = DatasetInfo {
            source: dataset.source.clone(),
            fingerprint: dataset.fingerprint.clone(),
            rows: dataset.len(),
            columns: dataset.columns.clone(),
            event_log: dataset.is_event_log(),
        };

        let mut warnings = Vec::new();
        let thread_task = if !options.golden_thread {
            None
        } else if dataset.timestamp_column.is_none() {
            warnings.push("No timestamp column; golden thread unavailable".to_string());
            None
        } else {
            let ds = Arc::clone(&dataset);
            Some(tokio::task::spawn_blocking(move || build_golden_thread(&ds)))
        };

        let use_ai = options.ai || self.config.ai.enabled;
        let mut analysis = if dataset.is_event_log() {
            self.event_log_path(&dataset, info, warnings, use_ai).await?
        } else {
            self.generic_path(&dataset, info, warnings, use_ai).await?
        };
        analysis.golden_thread = join(thread_task).await?;
        Ok(analysis)
    }

    async fn event_log_path(
        &self,
        dataset: &Arc<Dataset>,
        info: DatasetInfo,
        warnings: Vec<String>,
        use_ai: bool,
    ) -> SentinelResult<DatasetAnalysis> {
        let ds = Arc::clone(dataset);
        let report = tokio::task::spawn_blocking(move || EventLogAnalyzer::new().analyze(&ds)).await??;

        let mut risk = self.aggregator.score_event_log(&report);
        risk.warnings.extend(warnings);
        if use_ai {
            let prompt = dataset_prompt(&event_log_summary(&report));
            self.augment(&mut risk, &prompt).await;
        }

        Ok(DatasetAnalysis {
            dataset: info,
            gauge_color: risk.gauge_color(),
            breakdown: ParameterBreakdown::from_findings(&risk.findings),
            risk,
            event_log: Some(report),
            outliers: None,
            sequences: None,
            golden_thread: None,
        })
    }

    async fn generic_path(
        &self,
        dataset: &Arc<Dataset>,
        info: DatasetInfo,
        mut warnings: Vec<String>,
        use_ai: bool,
    ) -> SentinelResult<DatasetAnalysis> {
        let scorer = OutlierScorer::new(self.config.outlier.clone());
        let run_outliers = match scorer.resolve_features(dataset) {
            Ok(_) => true,
            Err(SentinelError::NoFeatures { .. }) if self.config.outlier.features.is_empty() => {
                warnings.push("No network feature columns; outlier scoring skipped".to_string());
                false
            }
            Err(e) => return Err(e),
        };
        let run_sequences = dataset.timestamp_column.is_some();
        if !run_sequences {
            warnings.push("No timestamp column; sequence matching skipped".to_string());
        }
        if !run_outliers && !run_sequences {
            return Err(SentinelError::NoFeatures {
                requested: DEFAULT_FEATURES.iter().map(|f| f.to_string()).collect(),
            });
        }

        let outlier_task = run_outliers.then(|| {
            let ds = Arc::clone(dataset);
            tokio::task::spawn_blocking(move || scorer.score(&ds))
        });
        let sequence_task = run_sequences.then(|| {
            let ds = Arc::clone(dataset);
            let matcher = SequenceMatcher::new(self.config.sequence.clone());
            tokio::task::spawn_blocking(move || matcher.analyze(&ds))
        });
        let outliers = join(outlier_task).await?;
        let sequences = join(sequence_task).await?;

        for warning in &warnings {
            log::warn!("{}", warning);
        }
        let mut risk = self
            .aggregator
            .score_generic(outliers.as_ref(), sequences.as_ref(), warnings);
        if use_ai {
            let summary = generic_summary(dataset.len(), outliers.as_ref(), sequences.as_ref(), &risk);
            self.augment(&mut risk, &dataset_prompt(&summary)).await;
        }

        Ok(DatasetAnalysis {
            dataset: info,
            gauge_color: risk.gauge_color(),
            breakdown: ParameterBreakdown::from_findings(&risk.findings),
            risk,
            event_log: None,
            outliers,
            sequences,
            golden_thread: None,
        })
    }

    pub async fn analyze_live_file(&self, path: &Path, ai: bool) -> SentinelResult<LiveAnalysis> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SentinelError::io(e, path.to_path_buf()))?;
        let raw: Value = serde_json::from_str(&text)?;
        Ok(self.analyze_live(raw, ai).await)
    }

    /// Score a live scrape. Collector failures become warnings; this never
    /// fails.
    pub async fn analyze_live(&self, raw: Value, ai: bool) -> LiveAnalysis {
        let (artifacts, warnings) = LiveArtifacts::from_value(raw);
        for warning in &warnings {
            log::warn!("{}", warning);
        }
        let mut risk = self.aggregator.score_live(&artifacts, warnings);
        if ai || self.config.ai.enabled {
            let prompt = artifact_prompt(&artifact_context(&artifacts));
            self.augment(&mut risk, &prompt).await;
        }
        LiveAnalysis::new(risk)
    }

    /// Load a dataset and return its chronological golden thread.
    pub async fn golden_thread_file(&self, path: &Path) -> SentinelResult<Vec<GoldenThreadEntry>> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let dataset = Dataset::load(&path)?;
            build_golden_thread(&dataset)
        })
        .await?
    }

    async fn augment(&self, risk: &mut RiskReport, prompt: &str) {
        self.ai.augment(risk, prompt).await;
        self.aggregator.remap(risk);
    }
}

async fn join<T>(task: Option<JoinHandle<SentinelResult<T>>>) -> SentinelResult<Option<T>> {
    match task {
        Some(handle) => Ok(Some(handle.await??)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{Provider, ProviderError};
    use crate::models::Severity;
    use async_trait::async_trait;
    use serde_json::json;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::Builder;

    fn write_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(PipelineConfig::default())
            .unwrap()
            .with_orchestrator(AiOrchestrator::with_providers(Vec::new()))
    }

    struct FixedProvider(&'static str);

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }
        fn models(&self) -> Vec<String> {
            vec!["fixed-1".to_string()]
        }
        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }
        fn is_configured(&self) -> bool {
            true
        }
        async fn complete(&self, _model: &str, _prompt: &str) -> Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_event_log_file() {
        let file = write_file(
            ".csv",
            "Timestamp,Level,Source,EventID,Message\n\
             2024-01-01 10:00:00,Error,Microsoft-Windows-DPTF,1,thermal event\n\
             2024-01-01 10:10:00,Information,Service Control Manager,7036,service entered running state\n\
             2024-01-01 10:20:00,Information,Service Control Manager,7036,service entered running state\n\
             2024-01-01 10:30:00,Information,Service Control Manager,7036,service entered running state\n",
        );
        let options = DatasetOptions {
            golden_thread: true,
            ..Default::default()
        };
        let analysis = pipeline().analyze_dataset_file(file.path(), options).await.unwrap();

        assert!(analysis.dataset.event_log);
        assert!(analysis.dataset.fingerprint.is_some());
        assert!((analysis.risk.score - 17.5).abs() < 1e-9);
        assert_eq!(analysis.risk.severity, Severity::Medium);
        assert_eq!(analysis.gauge_color, "green");
        assert_eq!(analysis.golden_thread.as_ref().map(Vec::len), Some(4));
        assert!(analysis.outliers.is_none());
    }

    #[tokio::test]
    async fn test_generic_file_runs_both_analyzers() {
        let mut csv = String::from("timestamp,event_type,sbytes\n");
        let events = [
            "Process Spawn",
            "Heartbeat",
            "Registry Modification",
            "Heartbeat",
            "System Restart",
        ];
        for i in 0..12 {
            let event = events.get(i).copied().unwrap_or("Heartbeat");
            csv.push_str(&format!("2024-01-01 09:00:{:02},{},100\n", i, event));
        }
        let file = write_file(".csv", &csv);

        let analysis = pipeline()
            .analyze_dataset_file(file.path(), DatasetOptions::default())
            .await
            .unwrap();

        assert!(!analysis.dataset.event_log);
        let sequences = analysis.sequences.as_ref().unwrap();
        assert_eq!(sequences.total_sequences, 1);
        assert_eq!(analysis.outliers.as_ref().unwrap().total_outliers, 0);
        assert!((analysis.risk.score - 12.0).abs() < 1e-9);
        assert_eq!(analysis.risk.attack_mapping[0].technique_id, "T1547.001");
    }

    #[tokio::test]
    async fn test_generic_without_timestamps_warns() {
        let mut csv = String::from("sbytes,dbytes\n");
        for i in 0..30 {
            csv.push_str(&format!("{},{}\n", 100 + i % 3, 200 + i % 5));
        }
        let file = write_file(".csv", &csv);
        let analysis = pipeline()
            .analyze_dataset_file(file.path(), DatasetOptions::default())
            .await
            .unwrap();

        assert!(analysis.sequences.is_none());
        assert!(analysis.outliers.is_some());
        assert!(analysis
            .risk
            .warnings
            .iter()
            .any(|w| w.contains("sequence matching skipped")));
    }

    #[tokio::test]
    async fn test_dataset_failures_are_fatal() {
        let empty = write_file(".csv", "Timestamp,Level,Source\n");
        let err = pipeline()
            .analyze_dataset_file(empty.path(), DatasetOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SentinelError::EmptyDataset));

        let bad_ts = write_file(".csv", "Timestamp,Level\nyesterday,Error\n");
        let err = pipeline()
            .analyze_dataset_file(bad_ts.path(), DatasetOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SentinelError::InvalidTimestamp { row: 0, .. }));
    }

    #[tokio::test]
    async fn test_live_run_with_ai_override() {
        let ai = AiOrchestrator::with_providers(vec![Box::new(FixedProvider(
            r#"{"risk_level": "HIGH", "risk_score": 65, "summary": "Run key persistence",
                "threats": [{"type": "Registry", "details": "registry run key Updater", "severity": "High"}]}"#,
        ))]);
        let pipeline = pipeline().with_orchestrator(ai);
        let analysis = pipeline
            .analyze_live(
                json!({
                    "processes": {"error": "Access denied"},
                    "registry": {"run_keys": ["C:\\Users\\a\\AppData\\Roaming\\upd.exe"]}
                }),
                true,
            )
            .await;

        assert_eq!(analysis.risk.score, 65.0);
        assert_eq!(analysis.risk.severity, Severity::High);
        assert_eq!(analysis.gauge_color, "orange");
        assert_eq!(analysis.risk.warnings.len(), 1);
        assert_eq!(analysis.breakdown.registry_modifications.alerts, 2);
        assert_eq!(analysis.breakdown.registry_modifications.risk, Severity::High);
    }

    #[tokio::test]
    async fn test_live_run_without_providers_is_soft() {
        let analysis = pipeline()
            .analyze_live(json!({"registry": {"run_keys": ["C:\\Temp\\x.exe"]}}), true)
            .await;
        assert_eq!(analysis.risk.score, 5.0);
        assert!(analysis.risk.ai_soft_failure);
    }
}
