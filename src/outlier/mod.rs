//! Outlier Scorer
//!
//! Fits an isolation forest on each input batch and reports the rows that
//! fall below the contamination percentile of the raw scores.

mod forest;
mod scaling;

pub use forest::{average_path_length, IsolationForest};
pub use scaling::standardize;

use crate::config::{OutlierConfig, DEFAULT_FEATURES};
use crate::dataset::Dataset;
use crate::errors::{SentinelError, SentinelResult};
use crate::models::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One flagged row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlier {
    pub row_index: usize,
    /// Normalized risk in [0, 1]; 1 is the most anomalous row of the batch
    pub risk_score: f64,
    pub severity: Severity,
    pub features: BTreeMap<String, f64>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutlierReport {
    /// Flagged rows, highest risk first
    pub outliers: Vec<Outlier>,
    pub total_outliers: usize,
    pub total_rows: usize,
    /// Observed share of flagged rows
    pub contamination_rate: f64,
    pub features_used: Vec<String>,
    /// Raw-score decision threshold
    pub threshold: f64,
}

pub struct OutlierScorer {
    config: OutlierConfig,
}

impl OutlierScorer {
    pub fn new(config: OutlierConfig) -> Self {
        Self { config }
    }

    /// Feature columns to use for `dataset`.
    pub fn resolve_features(&self, dataset: &Dataset) -> SentinelResult<Vec<String>> {
        let features: Vec<String> = if self.config.features.is_empty() {
            DEFAULT_FEATURES
                .iter()
                .filter(|f| dataset.has_column(f))
                .map(|f| f.to_string())
                .collect()
        } else {
            if let Some(missing) = self.config.features.iter().find(|f| !dataset.has_column(f)) {
                return Err(SentinelError::MissingColumn {
                    column: missing.clone(),
                    found: dataset.columns.clone(),
                });
            }
            self.config.features.clone()
        };

        if features.is_empty() {
            return Err(SentinelError::NoFeatures {
                requested: if self.config.features.is_empty() {
                    DEFAULT_FEATURES.iter().map(|f| f.to_string()).collect()
                } else {
                    self.config.features.clone()
                },
            });
        }
        Ok(features)
    }

    /// Score every record of a dataset.
    pub fn score(&self, dataset: &Dataset) -> SentinelResult<OutlierReport> {
        if dataset.is_empty() {
            return Err(SentinelError::EmptyDataset);
        }
        let features = self.resolve_features(dataset)?;

        // Missing or non-numeric cells are imputed as zero
        let matrix: Vec<Vec<f64>> = dataset
            .records
            .iter()
            .map(|r| features.iter().map(|f| r.numeric(f).unwrap_or(0.0)).collect())
            .collect();
        let timestamps: Vec<Option<String>> =
            dataset.records.iter().map(|r| r.timestamp_raw.clone()).collect();

        self.score_matrix(&features, &matrix, &timestamps)
    }

    /// Score a raw feature matrix. Rows must all have `features.len()` columns.
    pub fn score_matrix(
        &self,
        features: &[String],
        matrix: &[Vec<f64>],
        timestamps: &[Option<String>],
    ) -> SentinelResult<OutlierReport> {
        if matrix.is_empty() {
            return Err(SentinelError::EmptyDataset);
        }
        if features.is_empty() {
            return Err(SentinelError::NoFeatures { requested: Vec::new() });
        }
        for (row, values) in matrix.iter().enumerate() {
            if values.len() != features.len() {
                return Err(SentinelError::Shape {
                    row,
                    expected: features.len(),
                    found: values.len(),
                });
            }
        }

        let scaled = standardize(matrix);
        let forest = IsolationForest::fit(
            &scaled,
            self.config.n_estimators,
            self.config.max_samples,
            self.config.seed,
        );
        let raw = forest.score_samples(&scaled);

        let threshold = crate::utils::percentile(&raw, self.config.contamination * 100.0);
        let min = raw.iter().copied().fold(f64::INFINITY, f64::min);
        let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = max - min;

        let mut outliers: Vec<Outlier> = raw
            .iter()
            .enumerate()
            .filter(|(_, &s)| s < threshold)
            .map(|(idx, &s)| {
                let risk = if span > 0.0 { 1.0 - (s - min) / span } else { 0.0 };
                Outlier {
                    row_index: idx,
                    risk_score: risk,
                    severity: Severity::from_unit_risk(risk),
                    features: features
                        .iter()
                        .cloned()
                        .zip(matrix[idx].iter().copied())
                        .collect(),
                    timestamp: timestamps.get(idx).cloned().flatten(),
                }
            })
            .collect();

        outliers.sort_by(|a, b| {
            b.risk_score
                .total_cmp(&a.risk_score)
                .then(a.row_index.cmp(&b.row_index))
        });

        let total_rows = matrix.len();
        let total_outliers = outliers.len();
        log::info!(
            "Outlier scoring: {} of {} rows flagged ({} features)",
            total_outliers,
            total_rows,
            features.len()
        );

        Ok(OutlierReport {
            outliers,
            total_outliers,
            total_rows,
            contamination_rate: total_outliers as f64 / total_rows as f64,
            features_used: features.to_vec(),
            threshold,
        })
    }
}
