//! Error taxonomy for the compliance core.
//!
//! Every failure in the core is recoverable at the call boundary; nothing
//! here should ever tear down the coordinator.

use crate::models::{FindingId, ReviewId, ReviewStatus};
use thiserror::Error;

/// Result alias used throughout the core.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors surfaced by the ingest, review, and coordinator layers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or out-of-range input rejected at the ingest boundary.
    /// No partial finding is stored when this is returned.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced finding does not exist.
    #[error("unknown finding: {0}")]
    FindingNotFound(FindingId),

    /// A referenced review does not exist.
    #[error("unknown review: {0}")]
    ReviewNotFound(ReviewId),

    /// A referenced monitor has never sent a heartbeat or finding.
    #[error("unknown monitor: {0}")]
    MonitorNotFound(String),

    /// Attempted transition on a review already in a terminal status.
    #[error("review {review} is already {status}, no further transitions allowed")]
    InvalidState {
        review: ReviewId,
        status: ReviewStatus,
    },

    /// Strict review creation found an open review for the finding.
    /// The default `create_review` path returns the existing review instead.
    #[error("finding {finding} already has open review {existing}")]
    DuplicateReview {
        finding: FindingId,
        existing: ReviewId,
    },
}

impl CoreError {
    /// Whether this error indicates bad caller input rather than bad state.
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation(_))
    }
}
