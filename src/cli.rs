//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Severity;
use clap::Parser;
use std::path::PathBuf;

/// Compliance Sentinel - multi-agent compliance risk aggregation
///
/// Replay a monitor event feed (heartbeats + findings) through the
/// aggregation core, auto-queue human-in-the-loop reviews, and render
/// the resulting risk dashboard as Markdown or JSON.
///
/// Examples:
///   sentinel --feed events.json
///   sentinel --feed events.json --format json --output risk.json
///   sentinel --feed events.json --fail-on high
///   sentinel --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Monitor event feed to replay (JSON array of events)
    ///
    /// Not required when using --init-config.
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub feed: Option<PathBuf>,

    /// Output file path for the report
    ///
    /// Defaults to the config file setting (sentinel_report.md).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .sentinel.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Severity at or above which findings auto-create a review
    ///
    /// Overrides the config file setting. Values: critical, high, medium, low
    #[arg(long, value_name = "LEVEL")]
    pub severity_threshold: Option<SeverityLevel>,

    /// Confidence at or above which findings auto-create a review (0.0 - 1.0)
    ///
    /// Overrides the config file setting.
    #[arg(long, value_name = "CONF")]
    pub confidence_threshold: Option<f64>,

    /// Expected monitor heartbeat interval in seconds
    ///
    /// Overrides the config file setting; the liveness window is a
    /// configurable multiple of this interval.
    #[arg(long, value_name = "SECS")]
    pub heartbeat_interval: Option<u64>,

    /// Fail if open findings at or above this severity remain
    ///
    /// Useful for CI pipelines. Exit code 2 when the threshold is exceeded.
    /// Values: critical, high, medium, low
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<SeverityLevel>,

    /// Dry run: parse and validate the feed without replaying it
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .sentinel.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Severity level for --fail-on and --severity-threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum SeverityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityLevel {
    /// Convert to the core severity enum.
    pub fn to_severity(self) -> Severity {
        match self {
            SeverityLevel::Low => Severity::Low,
            SeverityLevel::Medium => Severity::Medium,
            SeverityLevel::High => Severity::High,
            SeverityLevel::Critical => Severity::Critical,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(threshold) = self.confidence_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err("Confidence threshold must be between 0.0 and 1.0".to_string());
            }
        }

        if let Some(interval) = self.heartbeat_interval {
            if interval == 0 {
                return Err("Heartbeat interval must be at least 1 second".to_string());
            }
        }

        if let Some(ref feed) = self.feed {
            if !feed.exists() {
                return Err(format!("Feed file does not exist: {}", feed.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
