//! Monitor event feed.
//!
//! The binary replays a JSON feed of events (heartbeats, raw findings, and
//! human review decisions) through the coordinator, standing in for the
//! webhook and polling transports that live outside the core.

use crate::coordinator::{Coordinator, FindingFilter};
use crate::models::{RawFinding, ReviewAction};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// One event in the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// Liveness signal from a monitor.
    Heartbeat { monitor: String },
    /// A raw compliance finding.
    Finding {
        #[serde(flatten)]
        finding: RawFinding,
    },
    /// A human decision on the open finding matching (source_ref, rule).
    Decision {
        source_ref: String,
        rule: String,
        action: ReviewAction,
        actor: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
}

/// A parsed event feed.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub events: Vec<MonitorEvent>,
}

/// Outcome counters from replaying a feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub heartbeats: usize,
    pub ingested: usize,
    pub rejected: usize,
    pub decided: usize,
    pub unmatched: usize,
}

impl Feed {
    /// Parse a feed from a JSON array of events.
    pub fn parse(content: &str) -> Result<Self> {
        let events: Vec<MonitorEvent> =
            serde_json::from_str(content).context("Failed to parse event feed JSON")?;
        Ok(Self { events })
    }

    /// Load a feed from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read feed file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Number of finding events in the feed.
    pub fn finding_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, MonitorEvent::Finding { .. }))
            .count()
    }

    /// Replay all events through the coordinator in feed order.
    ///
    /// Rejected findings and unmatched decisions are logged and counted;
    /// they never stop the replay. Validation rejections are charged to the
    /// producing monitor's error counter.
    pub async fn replay(&self, coordinator: &Coordinator) -> ReplayStats {
        let mut stats = ReplayStats::default();

        for event in &self.events {
            match event {
                MonitorEvent::Heartbeat { monitor } => {
                    coordinator.heartbeat(monitor).await;
                    stats.heartbeats += 1;
                }
                MonitorEvent::Finding { finding } => {
                    let monitor = finding.monitor.clone();
                    match coordinator.submit_finding(finding.clone()).await {
                        Ok(_) => stats.ingested += 1,
                        Err(err) => {
                            warn!("Rejected finding from {}: {}", monitor, err);
                            stats.rejected += 1;
                            if err.is_validation() {
                                // Unknown monitors have no status record to charge
                                let _ = coordinator.record_monitor_error(&monitor).await;
                            }
                        }
                    }
                }
                MonitorEvent::Decision {
                    source_ref,
                    rule,
                    action,
                    actor,
                    notes,
                } => {
                    match apply_decision(coordinator, source_ref, rule, *action, actor, notes.clone())
                        .await
                    {
                        Ok(()) => stats.decided += 1,
                        Err(err) => {
                            warn!("Decision on ({}, {}) not applied: {}", source_ref, rule, err);
                            stats.unmatched += 1;
                        }
                    }
                }
            }
        }

        stats
    }
}

/// Resolve a decision event against the current open findings and apply it.
///
/// Below-threshold findings get their review created on demand, matching an
/// explicit human review request.
async fn apply_decision(
    coordinator: &Coordinator,
    source_ref: &str,
    rule: &str,
    action: ReviewAction,
    actor: &str,
    notes: Option<String>,
) -> Result<()> {
    let open = coordinator
        .list_findings(FindingFilter {
            open_only: true,
            ..Default::default()
        })
        .await;

    let finding = open
        .iter()
        .find(|f| f.source_ref == source_ref && f.rule == rule)
        .ok_or_else(|| anyhow!("no open finding for ({}, {})", source_ref, rule))?;

    let review = coordinator.request_review(finding.id).await?;
    coordinator
        .decide_review(review.id, action, actor, notes)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{Framework, ReviewStatus};
    use crate::coordinator::ReviewFilter;

    const SAMPLE_FEED: &str = r#"[
        {"type": "heartbeat", "monitor": "pr_monitor"},
        {
            "type": "finding",
            "monitor": "pr_monitor",
            "source": "github_pr",
            "title": "Unencrypted PII export",
            "description": "User emails written to an unencrypted bucket",
            "severity": "critical",
            "framework": "gdpr",
            "confidence": 0.94,
            "source_ref": "PR #900",
            "rule": "pii-export",
            "source_url": "https://github.com/acme/app/pull/900"
        },
        {
            "type": "finding",
            "monitor": "slack_monitor",
            "source": "slack_message",
            "title": "Customer data shared in channel",
            "description": "Spreadsheet with emails posted to #support",
            "severity": "medium",
            "framework": "gdpr",
            "confidence": 0.55,
            "source_ref": "msg 17423",
            "rule": "pii-share"
        },
        {
            "type": "decision",
            "source_ref": "PR #900",
            "rule": "pii-export",
            "action": "dismiss",
            "actor": "alice",
            "notes": "False positive, bucket is internal-only"
        }
    ]"#;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.scoring.recompute_debounce_ms = 0;
        config
    }

    #[test]
    fn test_parse_feed() {
        let feed = Feed::parse(SAMPLE_FEED).unwrap();
        assert_eq!(feed.events.len(), 4);
        assert_eq!(feed.finding_count(), 2);

        match &feed.events[0] {
            MonitorEvent::Heartbeat { monitor } => assert_eq!(monitor, "pr_monitor"),
            other => panic!("expected heartbeat, got {:?}", other),
        }
        match &feed.events[1] {
            MonitorEvent::Finding { finding } => {
                assert_eq!(finding.source_ref, "PR #900");
                assert_eq!(finding.confidence, 0.94);
            }
            other => panic!("expected finding, got {:?}", other),
        }
        match &feed.events[3] {
            MonitorEvent::Decision { action, actor, .. } => {
                assert_eq!(*action, ReviewAction::Dismiss);
                assert_eq!(actor, "alice");
            }
            other => panic!("expected decision, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_event_type() {
        let result = Feed::parse(r#"[{"type": "reboot", "monitor": "pr_monitor"}]"#);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_replay_through_coordinator() {
        let coordinator = Coordinator::new(test_config());
        let feed = Feed::parse(SAMPLE_FEED).unwrap();

        let stats = feed.replay(&coordinator).await;
        assert_eq!(stats.heartbeats, 1);
        assert_eq!(stats.ingested, 2);
        assert_eq!(stats.rejected, 0);
        assert_eq!(stats.decided, 1);
        assert_eq!(stats.unmatched, 0);

        // The critical finding's review was dismissed by the decision event
        let dismissed = coordinator
            .list_reviews(ReviewFilter {
                status: Some(ReviewStatus::Dismissed),
                ..Default::default()
            })
            .await;
        assert_eq!(dismissed.len(), 1);
        assert_eq!(dismissed[0].notes.as_deref(), Some("False positive, bucket is internal-only"));

        // Dismissal removed the critical finding from risk scoring
        let risk = coordinator.current_risk().await;
        assert_eq!(risk.critical_count, 0);
        assert!(risk.framework(&Framework::Gdpr) > 0.0); // medium finding remains

        // Both monitors became known through the replay
        assert_eq!(coordinator.agent_statuses().await.len(), 2);
    }

    #[tokio::test]
    async fn test_replay_counts_rejections() {
        let coordinator = Coordinator::new(test_config());
        let feed = Feed::parse(
            r#"[
                {"type": "heartbeat", "monitor": "doc_crawler"},
                {
                    "type": "finding",
                    "monitor": "doc_crawler",
                    "source": "document",
                    "title": "",
                    "description": "empty title should be rejected",
                    "severity": "low",
                    "framework": "soc2",
                    "confidence": 0.4,
                    "source_ref": "doc 9",
                    "rule": "retention"
                }
            ]"#,
        )
        .unwrap();

        let stats = feed.replay(&coordinator).await;
        assert_eq!(stats.ingested, 0);
        assert_eq!(stats.rejected, 1);

        // The rejection was charged to the monitor
        let statuses = coordinator.agent_statuses().await;
        assert_eq!(statuses[0].error_count, 1);
    }

    #[tokio::test]
    async fn test_decision_without_matching_finding_is_unmatched() {
        let coordinator = Coordinator::new(test_config());
        let feed = Feed::parse(
            r#"[
                {
                    "type": "decision",
                    "source_ref": "PR #1",
                    "rule": "ghost-rule",
                    "action": "approve",
                    "actor": "alice"
                }
            ]"#,
        )
        .unwrap();

        let stats = feed.replay(&coordinator).await;
        assert_eq!(stats.decided, 0);
        assert_eq!(stats.unmatched, 1);
    }

    #[tokio::test]
    async fn test_decision_on_below_threshold_finding_creates_review_on_demand() {
        let coordinator = Coordinator::new(test_config());
        let feed = Feed::parse(
            r#"[
                {
                    "type": "finding",
                    "monitor": "slack_monitor",
                    "source": "slack_message",
                    "title": "Vendor list shared externally",
                    "description": "Low-confidence match",
                    "severity": "low",
                    "framework": "soc2",
                    "confidence": 0.3,
                    "source_ref": "msg 99",
                    "rule": "vendor-share"
                },
                {
                    "type": "decision",
                    "source_ref": "msg 99",
                    "rule": "vendor-share",
                    "action": "approve",
                    "actor": "bob"
                }
            ]"#,
        )
        .unwrap();

        let stats = feed.replay(&coordinator).await;
        assert_eq!(stats.ingested, 1);
        assert_eq!(stats.decided, 1);

        let reviews = coordinator.list_reviews(ReviewFilter::default()).await;
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].status, ReviewStatus::Approved);
    }
}
