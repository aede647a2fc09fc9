//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.sentinel.toml` files. Scoring weights, review trigger thresholds,
//! and liveness windows are all configuration, never hardcoded at use sites.

use crate::models::{Framework, Severity};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Risk scoring settings.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Review trigger and assignment settings.
    #[serde(default)]
    pub review: ReviewConfig,

    /// Monitor liveness settings.
    #[serde(default)]
    pub liveness: LivenessConfig,

    /// Report generation settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "sentinel_report.md".to_string()
}

/// Risk scoring settings.
///
/// Per-framework raw risk is the sum of `severity weight × confidence` over
/// open findings; the saturation constant `k` maps that raw sum into [0,100]
/// via `100 × (1 − e^(−k·raw))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Weight applied to low-severity findings.
    #[serde(default = "default_weight_low")]
    pub weight_low: f64,

    /// Weight applied to medium-severity findings.
    #[serde(default = "default_weight_medium")]
    pub weight_medium: f64,

    /// Weight applied to high-severity findings.
    #[serde(default = "default_weight_high")]
    pub weight_high: f64,

    /// Weight applied to critical-severity findings.
    #[serde(default = "default_weight_critical")]
    pub weight_critical: f64,

    /// Saturation constant for the [0,100] normalization.
    #[serde(default = "default_saturation_k")]
    pub saturation_k: f64,

    /// Per-framework weights for the overall score, keyed by wire name.
    /// Frameworks not listed get weight 1.0 (equal-weight average is the
    /// default overall combination).
    #[serde(default)]
    pub framework_weights: HashMap<String, f64>,

    /// Custom frameworks registered beyond the built-in set.
    #[serde(default)]
    pub extra_frameworks: Vec<String>,

    /// Debounce window for burst recomputation, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub recompute_debounce_ms: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weight_low: default_weight_low(),
            weight_medium: default_weight_medium(),
            weight_high: default_weight_high(),
            weight_critical: default_weight_critical(),
            saturation_k: default_saturation_k(),
            framework_weights: HashMap::new(),
            extra_frameworks: Vec::new(),
            recompute_debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_weight_low() -> f64 {
    1.0
}

fn default_weight_medium() -> f64 {
    3.0
}

fn default_weight_high() -> f64 {
    7.0
}

fn default_weight_critical() -> f64 {
    15.0
}

fn default_saturation_k() -> f64 {
    0.07
}

fn default_debounce_ms() -> u64 {
    1000
}

impl ScoringConfig {
    /// Weight for one severity level.
    pub fn severity_weight(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Low => self.weight_low,
            Severity::Medium => self.weight_medium,
            Severity::High => self.weight_high,
            Severity::Critical => self.weight_critical,
        }
    }

    /// Weight for one framework in the overall combination.
    pub fn framework_weight(&self, framework: &Framework) -> f64 {
        self.framework_weights
            .get(framework.as_str())
            .copied()
            .unwrap_or(1.0)
    }

    /// All registered frameworks: the built-in set plus extras.
    pub fn registered_frameworks(&self) -> Vec<Framework> {
        let mut frameworks: Vec<Framework> = Framework::builtin().to_vec();
        for name in &self.extra_frameworks {
            let fw = Framework::from(name.clone());
            if !frameworks.contains(&fw) {
                frameworks.push(fw);
            }
        }
        frameworks
    }

    /// Whether ingest should accept findings tagged with this framework.
    pub fn is_registered(&self, framework: &Framework) -> bool {
        framework.is_builtin()
            || self
                .extra_frameworks
                .iter()
                .any(|name| Framework::from(name.clone()) == *framework)
    }

    /// Debounce window as a `Duration`.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.recompute_debounce_ms)
    }
}

/// Review trigger and assignment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Findings at or above this severity auto-create a review.
    #[serde(default = "default_severity_threshold")]
    pub severity_threshold: Severity,

    /// Findings at or above this confidence auto-create a review
    /// regardless of severity.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Fallback assignee when no framework-specific team is configured.
    #[serde(default = "default_assignee")]
    pub default_assignee: String,

    /// Per-framework assignee overrides, keyed by wire name.
    #[serde(default)]
    pub assignees: HashMap<String, String>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            severity_threshold: default_severity_threshold(),
            confidence_threshold: default_confidence_threshold(),
            default_assignee: default_assignee(),
            assignees: HashMap::new(),
        }
    }
}

fn default_severity_threshold() -> Severity {
    Severity::High
}

fn default_confidence_threshold() -> f64 {
    0.9
}

fn default_assignee() -> String {
    "Compliance Team".to_string()
}

/// Monitor liveness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessConfig {
    /// Expected heartbeat interval per monitor, in seconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// A monitor is inactive after this many missed intervals.
    #[serde(default = "default_window_multiplier")]
    pub window_multiplier: f64,

    /// Interval of the background liveness tick, in seconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval(),
            window_multiplier: default_window_multiplier(),
            tick_interval_secs: default_tick_interval(),
        }
    }
}

fn default_heartbeat_interval() -> u64 {
    60
}

fn default_window_multiplier() -> f64 {
    5.0
}

fn default_tick_interval() -> u64 {
    30
}

impl LivenessConfig {
    /// Maximum silent interval before a monitor is considered inactive.
    pub fn window(&self) -> chrono::Duration {
        let secs = self.heartbeat_interval_secs as f64 * self.window_multiplier;
        chrono::Duration::milliseconds((secs * 1000.0) as i64)
    }

    /// Background tick interval as a `Duration`.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of recent findings shown in the dashboard summary.
    #[serde(default = "default_recent_findings")]
    pub recent_findings: usize,

    /// Include the agent status section in reports.
    #[serde(default = "default_true")]
    pub include_agent_statuses: bool,

    /// Include the review queue section in reports.
    #[serde(default = "default_true")]
    pub include_reviews: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            recent_findings: default_recent_findings(),
            include_agent_statuses: true,
            include_reviews: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_recent_findings() -> usize {
    10
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".sentinel.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if let Some(threshold) = args.confidence_threshold {
            self.review.confidence_threshold = threshold;
        }

        if let Some(level) = args.severity_threshold {
            self.review.severity_threshold = level.to_severity();
        }

        if let Some(interval) = args.heartbeat_interval {
            self.liveness.heartbeat_interval_secs = interval;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Validate cross-field constraints that serde defaults can't express.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.review.confidence_threshold) {
            return Err("review.confidence_threshold must be between 0.0 and 1.0".to_string());
        }

        if self.scoring.saturation_k <= 0.0 {
            return Err("scoring.saturation_k must be positive".to_string());
        }

        for (name, weight) in [
            ("weight_low", self.scoring.weight_low),
            ("weight_medium", self.scoring.weight_medium),
            ("weight_high", self.scoring.weight_high),
            ("weight_critical", self.scoring.weight_critical),
        ] {
            if weight < 0.0 {
                return Err(format!("scoring.{} must not be negative", name));
            }
        }

        if self.liveness.heartbeat_interval_secs == 0 {
            return Err("liveness.heartbeat_interval_secs must be at least 1".to_string());
        }

        if self.liveness.window_multiplier <= 0.0 {
            return Err("liveness.window_multiplier must be positive".to_string());
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
