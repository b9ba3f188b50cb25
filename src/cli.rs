use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "winsentinel",
    about = "WinSentinel - forensic analysis and risk scoring for Windows hosts",
    version
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging of all operations
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Analyze a CSV/JSON dataset (event-log export or network capture)
    Dataset {
        /// Dataset file
        path: PathBuf,

        /// Feature columns for outlier scoring
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,

        /// Sequence window size
        #[arg(short, long)]
        window: Option<usize>,

        /// Expected share of outliers, in (0, 0.5]
        #[arg(long)]
        contamination: Option<f64>,

        /// Ask the AI providers for a second opinion
        #[arg(long)]
        ai: bool,

        /// Include the chronological golden thread in the output
        #[arg(long)]
        timeline: bool,

        /// Write the full analysis as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Score a live artifact scrape (processes, registry, network, event logs)
    Live {
        /// Artifact JSON file
        path: PathBuf,

        /// Ask the AI providers for a second opinion
        #[arg(long)]
        ai: bool,

        /// Write the full analysis as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the golden thread of a dataset
    Timeline {
        /// Dataset file
        path: PathBuf,

        /// Write the timeline as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Args {
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_command() {
        let args = Args::parse_from([
            "winsentinel",
            "dataset",
            "flows.csv",
            "--features",
            "sbytes,dbytes",
            "--window",
            "5",
            "--ai",
            "-v",
        ]);
        assert_eq!(args.log_level(), "debug");
        match args.command {
            Command::Dataset {
                path,
                features,
                window,
                ai,
                timeline,
                ..
            } => {
                assert_eq!(path, PathBuf::from("flows.csv"));
                assert_eq!(features, vec!["sbytes", "dbytes"]);
                assert_eq!(window, Some(5));
                assert!(ai);
                assert!(!timeline);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["winsentinel", "live", "scrape.json", "--quiet", "-c", "cfg.json"]);
        assert_eq!(args.log_level(), "error");
        assert_eq!(args.config, Some(PathBuf::from("cfg.json")));
        assert!(matches!(args.command, Command::Live { ai: false, .. }));
    }
}
