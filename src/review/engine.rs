//! Review workflow engine.
//!
//! Owns creation and state transitions of human-in-the-loop reviews. The
//! state machine is `pending → {approved, dismissed, escalated}`; terminal
//! statuses admit no further transitions. Every transition is appended to
//! an immutable audit log.

use crate::config::ReviewConfig;
use crate::error::{CoreError, CoreResult};
use crate::models::{
    AuditEntry, Finding, FindingId, Review, ReviewAction, ReviewId, ReviewStatus,
};
use crate::review::assignment::{AssignmentPolicy, ConfiguredAssignment};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::info;

/// State machine and audit trail for human-in-the-loop reviews.
pub struct ReviewEngine {
    config: ReviewConfig,
    reviews: BTreeMap<ReviewId, Review>,
    /// The one open (pending) review per finding, if any.
    open_by_finding: HashMap<FindingId, ReviewId>,
    audit_log: Vec<AuditEntry>,
    next_seq: HashMap<ReviewId, u64>,
    next_id: u64,
    policy: Box<dyn AssignmentPolicy>,
}

impl ReviewEngine {
    /// Create an engine with the default configured assignment policy.
    pub fn new(config: ReviewConfig) -> Self {
        let policy = Box::new(ConfiguredAssignment::new(config.clone()));
        Self::with_policy(config, policy)
    }

    /// Create an engine with a custom assignment policy.
    pub fn with_policy(config: ReviewConfig, policy: Box<dyn AssignmentPolicy>) -> Self {
        Self {
            config,
            reviews: BTreeMap::new(),
            open_by_finding: HashMap::new(),
            audit_log: Vec::new(),
            next_seq: HashMap::new(),
            next_id: 0,
            policy,
        }
    }

    /// Whether a finding meets the auto-review trigger policy:
    /// severity at or above the configured threshold, or confidence at or
    /// above the configured threshold regardless of severity.
    pub fn should_trigger(&self, finding: &Finding) -> bool {
        finding.severity >= self.config.severity_threshold
            || finding.confidence >= self.config.confidence_threshold
    }

    /// Create a review for a finding, or return the existing open one.
    ///
    /// Idempotent so it is safe to call from concurrent trigger paths:
    /// while a finding's review stays open, repeated calls return the same
    /// review. A finding whose review reached a terminal status gets a new
    /// review only through a new finding.
    pub fn create_review(&mut self, finding: &Finding) -> Review {
        if let Some(&existing) = self.open_by_finding.get(&finding.id) {
            return self.reviews[&existing].clone();
        }

        self.next_id += 1;
        let now = Utc::now();
        let review = Review {
            id: ReviewId(self.next_id),
            finding_id: finding.id,
            status: ReviewStatus::Pending,
            assignee: self.policy.assign(finding),
            notes: None,
            created_at: now,
            updated_at: now,
        };

        self.open_by_finding.insert(finding.id, review.id);
        self.reviews.insert(review.id, review.clone());

        info!(
            "Review {} created for finding {} ({}), assigned to {}",
            review.id, finding.id, finding.title, review.assignee
        );

        review
    }

    /// Strict variant of [`create_review`](Self::create_review) for callers
    /// that must not race: fails with `DuplicateReview` when an open review
    /// already exists for the finding.
    #[allow(dead_code)] // Kept for callers that require strict creation semantics
    pub fn create_review_strict(&mut self, finding: &Finding) -> CoreResult<Review> {
        if let Some(&existing) = self.open_by_finding.get(&finding.id) {
            return Err(CoreError::DuplicateReview {
                finding: finding.id,
                existing,
            });
        }
        Ok(self.create_review(finding))
    }

    /// Apply a human decision to a pending review.
    ///
    /// Fails with `ReviewNotFound` for unknown ids and `InvalidState` when
    /// the review is already terminal. Appends an audit entry on success.
    pub fn transition(
        &mut self,
        review_id: ReviewId,
        action: ReviewAction,
        actor: &str,
        notes: Option<String>,
    ) -> CoreResult<Review> {
        let review = self
            .reviews
            .get_mut(&review_id)
            .ok_or(CoreError::ReviewNotFound(review_id))?;

        if review.status.is_terminal() {
            return Err(CoreError::InvalidState {
                review: review_id,
                status: review.status,
            });
        }

        let from = review.status;
        let to = action.target_status();
        let now = Utc::now();

        review.status = to;
        review.updated_at = now;
        if notes.is_some() {
            review.notes = notes;
        }

        // Terminal now; the finding no longer has an open review.
        self.open_by_finding.remove(&review.finding_id);

        let seq = self.next_seq.entry(review_id).or_insert(0);
        self.audit_log.push(AuditEntry {
            review_id,
            seq: *seq,
            actor: actor.to_string(),
            from,
            to,
            at: now,
        });
        *seq += 1;

        info!("Review {} transitioned {} -> {} by {}", review_id, from, to, actor);

        Ok(self.reviews[&review_id].clone())
    }

    /// Look up a review by id.
    #[allow(dead_code)] // Lookup utility
    pub fn get(&self, id: ReviewId) -> Option<&Review> {
        self.reviews.get(&id)
    }

    /// All reviews, in id order.
    pub fn all(&self) -> impl Iterator<Item = &Review> {
        self.reviews.values()
    }

    /// Number of reviews still pending.
    pub fn pending_count(&self) -> usize {
        self.open_by_finding.len()
    }

    /// Finding ids whose review ended in `Dismissed`; these findings no
    /// longer contribute to risk scores.
    pub fn dismissed_findings(&self) -> HashSet<FindingId> {
        self.reviews
            .values()
            .filter(|r| r.status == ReviewStatus::Dismissed)
            .map(|r| r.finding_id)
            .collect()
    }

    /// The append-only audit log, in insertion order.
    pub fn audit_log(&self) -> &[AuditEntry] {
        &self.audit_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Framework, Severity, SignalSource};

    fn finding(id: u64, severity: Severity, confidence: f64) -> Finding {
        Finding {
            id: FindingId(id),
            monitor: "pr_monitor".to_string(),
            source: SignalSource::GithubPr,
            title: "Test finding".to_string(),
            description: String::new(),
            severity,
            framework: Framework::Gdpr,
            confidence,
            source_ref: format!("PR #{}", id),
            rule: "test-rule".to_string(),
            source_url: None,
            detected_at: Utc::now(),
            superseded: false,
        }
    }

    #[test]
    fn test_trigger_policy() {
        let engine = ReviewEngine::new(ReviewConfig::default());

        // At or above severity threshold
        assert!(engine.should_trigger(&finding(1, Severity::High, 0.5)));
        assert!(engine.should_trigger(&finding(2, Severity::Critical, 0.1)));

        // Below severity threshold but high confidence
        assert!(engine.should_trigger(&finding(3, Severity::Low, 0.95)));

        // Below both thresholds
        assert!(!engine.should_trigger(&finding(4, Severity::Medium, 0.5)));
    }

    #[test]
    fn test_create_review_is_idempotent() {
        let mut engine = ReviewEngine::new(ReviewConfig::default());
        let f = finding(1, Severity::Critical, 0.9);

        let first = engine.create_review(&f);
        let second = engine.create_review(&f);
        assert_eq!(first.id, second.id);
        assert_eq!(engine.all().count(), 1);
    }

    #[test]
    fn test_create_review_strict_rejects_duplicate() {
        let mut engine = ReviewEngine::new(ReviewConfig::default());
        let f = finding(1, Severity::Critical, 0.9);

        engine.create_review_strict(&f).unwrap();
        let err = engine.create_review_strict(&f).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateReview { .. }));
    }

    #[test]
    fn test_transition_and_terminal_state() {
        let mut engine = ReviewEngine::new(ReviewConfig::default());
        let f = finding(1, Severity::Critical, 0.9);
        let review = engine.create_review(&f);

        let updated = engine
            .transition(review.id, ReviewAction::Dismiss, "alice", None)
            .unwrap();
        assert_eq!(updated.status, ReviewStatus::Dismissed);

        // A second transition on the terminal review fails
        let err = engine
            .transition(review.id, ReviewAction::Approve, "bob", None)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidState {
                status: ReviewStatus::Dismissed,
                ..
            }
        ));
    }

    #[test]
    fn test_transition_unknown_review() {
        let mut engine = ReviewEngine::new(ReviewConfig::default());
        let err = engine
            .transition(ReviewId(42), ReviewAction::Approve, "alice", None)
            .unwrap_err();
        assert!(matches!(err, CoreError::ReviewNotFound(ReviewId(42))));
    }

    #[test]
    fn test_audit_log_appends_transitions() {
        let mut engine = ReviewEngine::new(ReviewConfig::default());
        let f1 = finding(1, Severity::Critical, 0.9);
        let f2 = finding(2, Severity::Critical, 0.9);
        let r1 = engine.create_review(&f1);
        let r2 = engine.create_review(&f2);

        engine
            .transition(r1.id, ReviewAction::Approve, "alice", None)
            .unwrap();
        engine
            .transition(r2.id, ReviewAction::Escalate, "bob", Some("paging legal".to_string()))
            .unwrap();

        let log = engine.audit_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].review_id, r1.id);
        assert_eq!(log[0].seq, 0);
        assert_eq!(log[0].actor, "alice");
        assert_eq!(log[0].from, ReviewStatus::Pending);
        assert_eq!(log[0].to, ReviewStatus::Approved);
        assert_eq!(log[1].to, ReviewStatus::Escalated);

        assert_eq!(
            engine.get(r2.id).unwrap().notes.as_deref(),
            Some("paging legal")
        );
    }

    #[test]
    fn test_dismissed_findings_set() {
        let mut engine = ReviewEngine::new(ReviewConfig::default());
        let f1 = finding(1, Severity::Critical, 0.9);
        let f2 = finding(2, Severity::Critical, 0.9);
        let r1 = engine.create_review(&f1);
        let r2 = engine.create_review(&f2);

        engine
            .transition(r1.id, ReviewAction::Dismiss, "alice", None)
            .unwrap();
        engine
            .transition(r2.id, ReviewAction::Approve, "alice", None)
            .unwrap();

        let dismissed = engine.dismissed_findings();
        assert!(dismissed.contains(&f1.id));
        // Approved findings remain acknowledged risk, not dismissed
        assert!(!dismissed.contains(&f2.id));
    }

    #[test]
    fn test_pending_count() {
        let mut engine = ReviewEngine::new(ReviewConfig::default());
        let f1 = finding(1, Severity::Critical, 0.9);
        let f2 = finding(2, Severity::Critical, 0.9);
        let r1 = engine.create_review(&f1);
        engine.create_review(&f2);
        assert_eq!(engine.pending_count(), 2);

        engine
            .transition(r1.id, ReviewAction::Approve, "alice", None)
            .unwrap();
        assert_eq!(engine.pending_count(), 1);
    }
}
