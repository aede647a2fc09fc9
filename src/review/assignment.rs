//! Review assignment policy.
//!
//! Which team a pending review defaults to is a pluggable strategy keyed
//! by the finding's framework and severity.

use crate::config::ReviewConfig;
use crate::models::Finding;

/// Strategy deciding the initial assignee of a review.
pub trait AssignmentPolicy: Send + Sync {
    /// Pick the responsible party or team for a finding under review.
    fn assign(&self, finding: &Finding) -> String;
}

/// Default policy: per-framework overrides from `[review.assignees]`,
/// falling back to the configured generic assignee ("Compliance Team").
#[derive(Debug, Clone)]
pub struct ConfiguredAssignment {
    config: ReviewConfig,
}

impl ConfiguredAssignment {
    pub fn new(config: ReviewConfig) -> Self {
        Self { config }
    }
}

impl AssignmentPolicy for ConfiguredAssignment {
    fn assign(&self, finding: &Finding) -> String {
        self.config
            .assignees
            .get(finding.framework.as_str())
            .cloned()
            .unwrap_or_else(|| self.config.default_assignee.clone())
    }
}
