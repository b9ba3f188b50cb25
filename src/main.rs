use clap::Parser;
use console::style;
use env_logger::Env;
use serde::Serialize;
use std::path::Path;
use winsentinel::cli::{Args, Command};
use winsentinel::config::PipelineConfig;
use winsentinel::models::{RiskReport, Severity};
use winsentinel::pipeline::{DatasetOptions, Pipeline};
use winsentinel::risk::ParameterBreakdown;
use winsentinel::{SentinelError, SentinelResult};

fn severity_label(severity: Severity) -> String {
    let label = severity.as_str().to_uppercase();
    match severity {
        Severity::Critical => style(label).red().bold().to_string(),
        Severity::High => style(label).red().to_string(),
        Severity::Medium => style(label).yellow().to_string(),
        Severity::Low => style(label).green().to_string(),
    }
}

fn print_summary(risk: &RiskReport, breakdown: &ParameterBreakdown) {
    println!();
    println!(
        "    {} Risk score: {} ({})",
        style("▶").cyan(),
        style(format!("{:.1}/100", risk.score)).white().bold(),
        severity_label(risk.severity)
    );
    println!("    {} Findings: {}", style("├─").dim(), style(risk.findings.len()).white().bold());
    for finding in risk.findings.iter().take(10) {
        println!(
            "    {}   [{}] {} {}",
            style("│").dim(),
            severity_label(finding.severity),
            style(&finding.finding_type).cyan(),
            finding.details
        );
    }
    if !risk.attack_mapping.is_empty() {
        let techniques: Vec<String> = risk
            .attack_mapping
            .iter()
            .map(|m| format!("{} {} ({})", m.technique_id, m.name, m.finding_count))
            .collect();
        println!("    {} ATT&CK: {}", style("├─").dim(), techniques.join(", "));
    }
    println!(
        "    {} Processes {} | Registry {} | Network {} | Event logs {}",
        style("├─").dim(),
        breakdown.process_spawning.alerts,
        breakdown.registry_modifications.alerts,
        breakdown.network_anomalies.alerts,
        breakdown.event_log_gaps.alerts
    );
    for warning in &risk.warnings {
        println!("    {} {}", style("⚠").yellow(), warning);
    }
    match (&risk.ai, &risk.ai_error) {
        (Some(ai), _) => println!(
            "    {} AI ({} / {}): {}",
            style("└─").dim(),
            ai.provider,
            ai.model,
            ai.summary
        ),
        (None, Some(error)) => println!("    {} AI unavailable: {}", style("└─").dim(), error),
        (None, None) => println!("    {} AI not requested", style("└─").dim()),
    }
    println!();
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> SentinelResult<()> {
    log::info!("Writing JSON results to: {:?}", path);
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|e| SentinelError::io(e, path.to_path_buf()))
}

async fn run(args: Args) -> SentinelResult<()> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    match args.command {
        Command::Dataset {
            path,
            features,
            window,
            contamination,
            ai,
            timeline,
            output,
        } => {
            if !features.is_empty() {
                config.outlier.features = features;
            }
            if let Some(window) = window {
                config.sequence.window_size = window;
            }
            if let Some(contamination) = contamination {
                config.outlier.contamination = contamination;
            }
            let pipeline = Pipeline::new(config)?;
            let options = DatasetOptions {
                ai,
                golden_thread: timeline,
            };
            let analysis = pipeline.analyze_dataset_file(&path, options).await?;
            print_summary(&analysis.risk, &analysis.breakdown);
            if let Some(output) = output {
                write_json(&analysis, &output)?;
            }
        }
        Command::Live { path, ai, output } => {
            let pipeline = Pipeline::new(config)?;
            let analysis = pipeline.analyze_live_file(&path, ai).await?;
            print_summary(&analysis.risk, &analysis.breakdown);
            if let Some(output) = output {
                write_json(&analysis, &output)?;
            }
        }
        Command::Timeline { path, output } => {
            let pipeline = Pipeline::new(config)?;
            let thread = pipeline.golden_thread_file(&path).await?;
            for entry in &thread {
                let marker = match entry.severity {
                    winsentinel::sequence::ThreadColor::Red => style("●").red(),
                    winsentinel::sequence::ThreadColor::Yellow => style("●").yellow(),
                    winsentinel::sequence::ThreadColor::Green => style("●").green(),
                };
                println!("    {} {}  {}", marker, entry.timestamp, entry.event_type);
            }
            if let Some(output) = output {
                write_json(&thread, &output)?;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level()))
        .format_timestamp_millis()
        .init();

    log::debug!("WinSentinel starting with args: {:?}", args);

    if let Err(e) = run(args).await {
        log::error!("{}", e);
        eprintln!("    {} {}", style("✗").red().bold(), e);
        std::process::exit(if e.is_input_error() { 2 } else { 1 });
    }
}
