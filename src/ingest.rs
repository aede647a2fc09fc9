//! Finding ingest: validation, identity assignment, and supersession.
//!
//! This module owns finding creation. Raw signals from upstream monitors
//! are validated against the canonical schema, assigned a monotonic id,
//! and stored append-only; a newer finding for the same (source_ref, rule)
//! pair supersedes the prior one instead of mutating it.

use crate::config::ScoringConfig;
use crate::error::{CoreError, CoreResult};
use crate::models::{Finding, FindingId, RawFinding};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

/// Append-only store of findings with supersession tracking.
#[derive(Debug, Default)]
pub struct FindingStore {
    findings: BTreeMap<FindingId, Finding>,
    /// Open finding per (source_ref, rule) pair, for supersession lookups.
    open_by_key: HashMap<(String, String), FindingId>,
    next_id: u64,
}

impl FindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a raw finding.
    ///
    /// Returns the stored finding and, when an open finding already existed
    /// for the same (source_ref, rule) pair, the id it superseded. Rejected
    /// input leaves the store untouched.
    pub fn submit(
        &mut self,
        raw: RawFinding,
        scoring: &ScoringConfig,
    ) -> CoreResult<(Finding, Option<FindingId>)> {
        validate(&raw, scoring)?;

        let key = (raw.source_ref.clone(), raw.rule.clone());
        let superseded = self.open_by_key.get(&key).copied();

        if let Some(prior_id) = superseded {
            if let Some(prior) = self.findings.get_mut(&prior_id) {
                prior.superseded = true;
                debug!("Finding {} superseded by new signal for {:?}", prior_id, key);
            }
        }

        self.next_id += 1;
        let finding = Finding {
            id: FindingId(self.next_id),
            monitor: raw.monitor,
            source: raw.source,
            title: raw.title,
            description: raw.description,
            severity: raw.severity,
            framework: raw.framework,
            confidence: raw.confidence,
            source_ref: raw.source_ref,
            rule: raw.rule,
            source_url: raw.source_url,
            detected_at: Utc::now(),
            superseded: false,
        };

        self.open_by_key.insert(key, finding.id);
        self.findings.insert(finding.id, finding.clone());

        info!(
            "Finding {} ingested: [{}] {} ({}, confidence {:.2})",
            finding.id, finding.severity, finding.title, finding.framework, finding.confidence
        );

        Ok((finding, superseded))
    }

    /// Look up a finding by id.
    pub fn get(&self, id: FindingId) -> Option<&Finding> {
        self.findings.get(&id)
    }

    /// All findings, in id order (includes superseded ones).
    pub fn all(&self) -> impl Iterator<Item = &Finding> {
        self.findings.values()
    }

    /// Open findings: not superseded and not dismissed via a terminal review.
    pub fn open(&self, dismissed: &HashSet<FindingId>) -> Vec<&Finding> {
        self.findings
            .values()
            .filter(|f| !f.superseded && !dismissed.contains(&f.id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    #[allow(dead_code)] // Utility for tests and tooling
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Check a raw finding against the canonical schema constraints.
fn validate(raw: &RawFinding, scoring: &ScoringConfig) -> CoreResult<()> {
    if raw.title.trim().is_empty() {
        return Err(CoreError::Validation("title must not be empty".to_string()));
    }

    if raw.monitor.trim().is_empty() {
        return Err(CoreError::Validation(
            "monitor name must not be empty".to_string(),
        ));
    }

    if raw.source_ref.trim().is_empty() {
        return Err(CoreError::Validation(
            "source_ref must not be empty".to_string(),
        ));
    }

    if raw.rule.trim().is_empty() {
        return Err(CoreError::Validation(
            "rule signature must not be empty".to_string(),
        ));
    }

    if !raw.confidence.is_finite() || !(0.0..=1.0).contains(&raw.confidence) {
        return Err(CoreError::Validation(format!(
            "confidence must be in [0,1], got {}",
            raw.confidence
        )));
    }

    if !scoring.is_registered(&raw.framework) {
        return Err(CoreError::Validation(format!(
            "framework '{}' is not registered",
            raw.framework.as_str()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Framework, Severity, SignalSource};

    fn raw(source_ref: &str, rule: &str) -> RawFinding {
        RawFinding {
            monitor: "pr_monitor".to_string(),
            source: SignalSource::GithubPr,
            title: "Unencrypted PII export".to_string(),
            description: "User emails written to an unencrypted bucket".to_string(),
            severity: Severity::High,
            framework: Framework::Gdpr,
            confidence: 0.85,
            source_ref: source_ref.to_string(),
            rule: rule.to_string(),
            source_url: None,
        }
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut store = FindingStore::new();
        let scoring = ScoringConfig::default();

        let (first, _) = store.submit(raw("PR #1", "pii-export"), &scoring).unwrap();
        let (second, _) = store.submit(raw("PR #2", "pii-export"), &scoring).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let mut store = FindingStore::new();
        let scoring = ScoringConfig::default();

        let mut bad = raw("PR #1", "pii-export");
        bad.title = "  ".to_string();
        assert!(store.submit(bad, &scoring).is_err());

        let mut bad = raw("PR #1", "pii-export");
        bad.confidence = 1.2;
        assert!(store.submit(bad, &scoring).is_err());

        let mut bad = raw("PR #1", "pii-export");
        bad.confidence = f64::NAN;
        assert!(store.submit(bad, &scoring).is_err());

        let mut bad = raw("PR #1", "pii-export");
        bad.framework = Framework::Custom("unregistered".to_string());
        assert!(store.submit(bad, &scoring).is_err());

        // Nothing partial was stored
        assert!(store.is_empty());
    }

    #[test]
    fn test_registered_custom_framework_accepted() {
        let mut store = FindingStore::new();
        let mut scoring = ScoringConfig::default();
        scoring.extra_frameworks = vec!["nist_csf".to_string()];

        let mut ok = raw("PR #1", "pii-export");
        ok.framework = Framework::Custom("nist_csf".to_string());
        assert!(store.submit(ok, &scoring).is_ok());
    }

    #[test]
    fn test_supersession_on_duplicate_key() {
        let mut store = FindingStore::new();
        let scoring = ScoringConfig::default();

        let mut first = raw("PR #900", "pii-export");
        first.description = "first description".to_string();
        let (first, superseded) = store.submit(first, &scoring).unwrap();
        assert!(superseded.is_none());

        let mut second = raw("PR #900", "pii-export");
        second.description = "second description".to_string();
        let (second, superseded) = store.submit(second, &scoring).unwrap();
        assert_eq!(superseded, Some(first.id));

        // The first finding is kept but marked superseded
        assert!(store.get(first.id).unwrap().superseded);
        assert!(!store.get(second.id).unwrap().superseded);

        let open = store.open(&HashSet::new());
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, second.id);
    }

    #[test]
    fn test_different_rules_do_not_supersede() {
        let mut store = FindingStore::new();
        let scoring = ScoringConfig::default();

        store.submit(raw("PR #900", "pii-export"), &scoring).unwrap();
        let (_, superseded) = store
            .submit(raw("PR #900", "hardcoded-secret"), &scoring)
            .unwrap();
        assert!(superseded.is_none());
        assert_eq!(store.open(&HashSet::new()).len(), 2);
    }

    #[test]
    fn test_open_excludes_dismissed() {
        let mut store = FindingStore::new();
        let scoring = ScoringConfig::default();

        let (finding, _) = store.submit(raw("PR #1", "pii-export"), &scoring).unwrap();
        store.submit(raw("PR #2", "pii-export"), &scoring).unwrap();

        let mut dismissed = HashSet::new();
        dismissed.insert(finding.id);

        let open = store.open(&dismissed);
        assert_eq!(open.len(), 1);
        assert_ne!(open[0].id, finding.id);
    }
}
