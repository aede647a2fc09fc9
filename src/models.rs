//! Data models for the compliance core.
//!
//! This module contains all the core data structures shared between the
//! ingest, risk, review, and coordinator layers: findings, reviews,
//! agent statuses, and risk scores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Severity level of a compliance finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Low severity - informational signals, minor policy drift
    Low,
    /// Medium severity - policy gaps that need eventual remediation
    Medium,
    /// High severity - likely violations, sensitive data exposure
    High,
    /// Critical severity - active violations, regulatory exposure
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

impl Severity {
    /// Returns an emoji representation of the severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Low => "🟢",
            Severity::Medium => "🟡",
            Severity::High => "🟠",
            Severity::Critical => "🔴",
        }
    }
}

/// Regulatory framework a finding is classified against.
///
/// The well-known variants form the closed default set; `Custom` names must
/// be registered in `[scoring] extra_frameworks` before ingest accepts them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Framework {
    Gdpr,
    Soc2,
    Hipaa,
    PciDss,
    Iso27001,
    /// A registered framework outside the built-in set.
    Custom(String),
}

impl Framework {
    /// The wire name used in config files, feeds, and JSON output.
    pub fn as_str(&self) -> &str {
        match self {
            Framework::Gdpr => "gdpr",
            Framework::Soc2 => "soc2",
            Framework::Hipaa => "hipaa",
            Framework::PciDss => "pci_dss",
            Framework::Iso27001 => "iso_27001",
            Framework::Custom(name) => name,
        }
    }

    /// All built-in frameworks, in scoring order.
    pub fn builtin() -> [Framework; 5] {
        [
            Framework::Gdpr,
            Framework::Soc2,
            Framework::Hipaa,
            Framework::PciDss,
            Framework::Iso27001,
        ]
    }

    /// Whether this is one of the built-in frameworks.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Framework::Custom(_))
    }
}

impl From<String> for Framework {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "gdpr" => Framework::Gdpr,
            "soc2" => Framework::Soc2,
            "hipaa" => Framework::Hipaa,
            "pci_dss" | "pci-dss" => Framework::PciDss,
            "iso_27001" | "iso27001" => Framework::Iso27001,
            other => Framework::Custom(other.to_string()),
        }
    }
}

impl From<Framework> for String {
    fn from(f: Framework) -> Self {
        f.as_str().to_string()
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framework::Gdpr => write!(f, "GDPR"),
            Framework::Soc2 => write!(f, "SOC2"),
            Framework::Hipaa => write!(f, "HIPAA"),
            Framework::PciDss => write!(f, "PCI-DSS"),
            Framework::Iso27001 => write!(f, "ISO 27001"),
            Framework::Custom(name) => write!(f, "{}", name.to_uppercase()),
        }
    }
}

/// Kind of upstream signal a finding originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    GithubPr,
    SlackMessage,
    Document,
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSource::GithubPr => write!(f, "GitHub PR"),
            SignalSource::SlackMessage => write!(f, "Slack message"),
            SignalSource::Document => write!(f, "Document"),
        }
    }
}

/// Unique, monotonically assigned finding identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct FindingId(pub u64);

impl fmt::Display for FindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F-{}", self.0)
    }
}

/// Unique, monotonically assigned review identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ReviewId(pub u64);

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// A raw compliance signal as produced by an upstream monitor, before
/// validation and identity assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFinding {
    /// Name of the monitor that produced the signal (e.g. "pr_monitor").
    pub monitor: String,
    /// Kind of source the signal came from.
    pub source: SignalSource,
    /// Short title describing the signal.
    pub title: String,
    /// Detailed description of the signal.
    pub description: String,
    /// Severity assigned by the upstream classifier.
    pub severity: Severity,
    /// Regulatory framework the signal is classified against.
    pub framework: Framework,
    /// Classifier confidence in [0,1].
    pub confidence: f64,
    /// Opaque locator of the originating artifact (e.g. "PR #900").
    pub source_ref: String,
    /// Rule signature; together with `source_ref` it keys supersession.
    pub rule: String,
    /// Optional link to the originating artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// A validated, stored compliance finding.
///
/// Immutable after creation except for the `superseded` marker, which is
/// set when a newer finding replaces it for the same (source_ref, rule).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: FindingId,
    pub monitor: String,
    pub source: SignalSource,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub framework: Framework,
    pub confidence: f64,
    pub source_ref: String,
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub detected_at: DateTime<Utc>,
    /// Set when a newer finding replaced this one; superseded findings are
    /// kept for audit but excluded from risk scoring.
    pub superseded: bool,
}

/// Status of a human-in-the-loop review.
///
/// `Pending` is the only non-terminal status; a terminal review is never
/// reopened (a recurring condition spawns a new finding and a new review).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Dismissed,
    Escalated,
}

impl ReviewStatus {
    /// Whether this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReviewStatus::Pending)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Pending => write!(f, "Pending"),
            ReviewStatus::Approved => write!(f, "Approved"),
            ReviewStatus::Dismissed => write!(f, "Dismissed"),
            ReviewStatus::Escalated => write!(f, "Escalated"),
        }
    }
}

/// A human decision applied to a pending review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Dismiss,
    Escalate,
}

impl ReviewAction {
    /// The terminal status this action transitions a pending review into.
    pub fn target_status(&self) -> ReviewStatus {
        match self {
            ReviewAction::Approve => ReviewStatus::Approved,
            ReviewAction::Dismiss => ReviewStatus::Dismissed,
            ReviewAction::Escalate => ReviewStatus::Escalated,
        }
    }
}

/// A human-in-the-loop review derived from exactly one finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    /// Back-reference to the finding; lookup only, no ownership.
    pub finding_id: FindingId,
    pub status: ReviewStatus,
    /// Responsible party or team, set by the assignment policy on creation.
    pub assignee: String,
    /// Free-text notes attached by the deciding reviewer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last status transition (creation time until then).
    pub updated_at: DateTime<Utc>,
}

/// One entry in the append-only review audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub review_id: ReviewId,
    /// Per-review sequence number, starting at 0 for the first transition.
    pub seq: u64,
    pub actor: String,
    pub from: ReviewStatus,
    pub to: ReviewStatus,
    pub at: DateTime<Utc>,
}

/// Liveness record for an upstream monitor.
///
/// The `active` flag is a cached projection; it is recomputed from
/// `last_heartbeat` against the liveness window on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub name: String,
    pub active: bool,
    pub last_heartbeat: DateTime<Utc>,
    /// Cumulative findings attributed to this monitor.
    pub findings_produced: u64,
    /// Cumulative errors reported for this monitor.
    pub error_count: u64,
}

/// Aggregated risk scores, derived from the current set of open findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    /// Overall organizational risk in [0,100].
    pub overall: f64,
    /// Per-framework risk in [0,100], keyed by registered framework.
    pub framework_scores: BTreeMap<Framework, f64>,
    /// Number of open findings contributing to the scores.
    pub findings_count: usize,
    pub critical_count: usize,
    pub high_count: usize,
    pub last_updated: DateTime<Utc>,
}

impl RiskScore {
    /// An all-zero score over the given registered frameworks.
    pub fn zero(frameworks: &[Framework]) -> Self {
        Self {
            overall: 0.0,
            framework_scores: frameworks.iter().cloned().map(|f| (f, 0.0)).collect(),
            findings_count: 0,
            critical_count: 0,
            high_count: 0,
            last_updated: Utc::now(),
        }
    }

    /// Score for one framework, 0 if it is not in the map.
    #[allow(dead_code)] // Convenience accessor, used widely in tests
    pub fn framework(&self, framework: &Framework) -> f64 {
        self.framework_scores.get(framework).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_framework_from_str() {
        assert_eq!(Framework::from("gdpr".to_string()), Framework::Gdpr);
        assert_eq!(Framework::from("PCI-DSS".to_string()), Framework::PciDss);
        assert_eq!(Framework::from("iso27001".to_string()), Framework::Iso27001);
        assert_eq!(
            Framework::from("nist_csf".to_string()),
            Framework::Custom("nist_csf".to_string())
        );
    }

    #[test]
    fn test_framework_wire_name_roundtrip() {
        for fw in Framework::builtin() {
            let name = fw.as_str().to_string();
            assert_eq!(Framework::from(name), fw);
        }
    }

    #[test]
    fn test_framework_serde_as_map_key() {
        let mut scores = BTreeMap::new();
        scores.insert(Framework::Gdpr, 42.0);
        scores.insert(Framework::Custom("nist_csf".to_string()), 7.5);

        let json = serde_json::to_string(&scores).unwrap();
        assert!(json.contains("\"gdpr\""));
        assert!(json.contains("\"nist_csf\""));

        let back: BTreeMap<Framework, f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scores);
    }

    #[test]
    fn test_review_status_terminal() {
        assert!(!ReviewStatus::Pending.is_terminal());
        assert!(ReviewStatus::Approved.is_terminal());
        assert!(ReviewStatus::Dismissed.is_terminal());
        assert!(ReviewStatus::Escalated.is_terminal());
    }

    #[test]
    fn test_action_target_status() {
        assert_eq!(ReviewAction::Approve.target_status(), ReviewStatus::Approved);
        assert_eq!(ReviewAction::Dismiss.target_status(), ReviewStatus::Dismissed);
        assert_eq!(
            ReviewAction::Escalate.target_status(),
            ReviewStatus::Escalated
        );
    }

    #[test]
    fn test_risk_score_zero() {
        let score = RiskScore::zero(&Framework::builtin());
        assert_eq!(score.overall, 0.0);
        assert_eq!(score.framework(&Framework::Gdpr), 0.0);
        assert_eq!(score.framework_scores.len(), 5);
    }
}
