//! WinSentinel analysis core
//!
//! Forensic analysis and risk scoring for Windows hosts: outlier scoring of
//! network captures, attack-sequence matching over timelines, statistical
//! event-log analysis, risk aggregation and optional AI augmentation.

pub mod ai;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod eventlog;
pub mod models;
pub mod outlier;
pub mod pipeline;
pub mod risk;
pub mod sequence;
pub mod threat_intel;
pub mod utils;

pub use errors::{SentinelError, SentinelResult};
pub use pipeline::Pipeline;
