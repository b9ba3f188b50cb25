//! AI Augmentation
//!
//! Optional narrative and second opinion on a finished [`RiskReport`].
//! Providers are tried in a fixed order, each model variant once, every
//! attempt under its own timeout. The first usable response wins. When all
//! of them fail the report is returned untouched apart from a soft-failure
//! marker; no provider error ever reaches the caller.
//!
//! # Environment Variables
//!
//! - `BYTEZ_API_KEY`
//! - `GEMINI_API_KEY`
//! - `OPENROUTER_API_KEY`

mod context;
mod parse;
mod provider;

pub use context::{artifact_context, artifact_prompt, dataset_prompt, event_log_summary, generic_summary};
pub use parse::{parse_response, strip_fences, AiThreat, AiVerdict};
pub use provider::{BytezProvider, GeminiProvider, OpenRouterProvider, Provider, ProviderError};

use crate::config::AiConfig;
use crate::models::{AiNarrative, RiskReport};

/// Raw text from the first provider that answered.
#[derive(Debug, Clone)]
pub struct Completion {
    pub provider: String,
    pub model: String,
    pub content: String,
}

pub struct AiOrchestrator {
    providers: Vec<Box<dyn Provider>>,
}

impl AiOrchestrator {
    /// Bytez, then Gemini, then OpenRouter.
    pub fn from_config(config: &AiConfig) -> Self {
        let client = reqwest::Client::new();
        Self::with_providers(vec![
            Box::new(BytezProvider::new(client.clone(), config)),
            Box::new(GeminiProvider::new(client.clone(), config)),
            Box::new(OpenRouterProvider::new(client, config)),
        ])
    }

    pub fn with_providers(providers: Vec<Box<dyn Provider>>) -> Self {
        Self { providers }
    }

    pub fn has_configured_provider(&self) -> bool {
        self.providers.iter().any(|p| p.is_configured())
    }

    /// Walk the cascade until one attempt returns text.
    pub async fn complete(&self, prompt: &str) -> Result<Completion, ProviderError> {
        let mut attempts = 0;
        for provider in &self.providers {
            if !provider.is_configured() {
                log::debug!("Skipping {}: not configured", provider.name());
                continue;
            }
            let budget = provider.timeout();
            for model in provider.models() {
                attempts += 1;
                log::info!("Querying {} ({})", provider.name(), model);
                let outcome = match tokio::time::timeout(budget, provider.complete(&model, prompt)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(budget.as_secs())),
                };
                match outcome {
                    Ok(content) => {
                        return Ok(Completion {
                            provider: provider.name().to_string(),
                            model,
                            content,
                        })
                    }
                    Err(e) => log::warn!("{} model {} failed: {}", provider.name(), model, e),
                }
            }
        }
        Err(ProviderError::Exhausted { attempts })
    }

    /// Run the cascade and fold the verdict into `report`.
    pub async fn augment(&self, report: &mut RiskReport, prompt: &str) {
        match self.complete(prompt).await {
            Ok(completion) => merge(report, completion),
            Err(e) => {
                log::warn!("AI augmentation unavailable: {}", e);
                report.ai_soft_failure = true;
                report.ai_error = Some(e.to_string());
            }
        }
    }
}

/// Adopt the provider score only when it is strictly higher, append its
/// threats, keep its narrative.
pub fn merge(report: &mut RiskReport, completion: Completion) {
    let verdict = parse_response(&completion.content);
    if report.adopt_higher_score(verdict.risk_score) {
        log::info!(
            "Adopted {} score {:.1} ({})",
            completion.provider,
            report.score,
            verdict.risk_level
        );
    }
    report
        .findings
        .extend(verdict.threats.into_iter().map(AiThreat::into_finding));
    report.ai = Some(AiNarrative {
        provider: completion.provider,
        model: completion.model,
        summary: verdict.summary,
        stated_level: verdict.risk_level,
        stated_score: verdict.risk_score,
        recommendations: verdict.recommendations,
        key_concerns: verdict.key_concerns,
    });
    report.ai_error = None;
    report.ai_soft_failure = false;
}
