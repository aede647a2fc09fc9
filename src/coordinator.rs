//! Orchestration coordinator.
//!
//! Single entry point for upstream monitors (submit/heartbeat) and the
//! presentation layer (queries plus the one human-driven mutation,
//! `decide_review`). Owns the finding store, the review engine, monitor
//! liveness, and the cached risk score with debounced recomputation.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::ingest::FindingStore;
use crate::models::{
    AgentStatus, AuditEntry, Finding, FindingId, Framework, RawFinding, Review, ReviewAction,
    ReviewId, ReviewStatus, RiskScore, Severity,
};
use crate::review::ReviewEngine;
use crate::risk;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Query filter for [`Coordinator::list_findings`].
#[derive(Debug, Clone, Default)]
pub struct FindingFilter {
    /// Only findings at exactly this severity.
    pub severity: Option<Severity>,
    /// Only findings tagged with this framework.
    pub framework: Option<Framework>,
    /// Exclude superseded findings and findings dismissed via review.
    pub open_only: bool,
    /// Keep at most this many findings (most recent first).
    pub limit: Option<usize>,
}

/// Query filter for [`Coordinator::list_reviews`].
#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub status: Option<ReviewStatus>,
    pub assignee: Option<String>,
    pub limit: Option<usize>,
}

/// Combined read model for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub risk: RiskScore,
    pub pending_reviews: usize,
    pub total_findings: usize,
    pub critical_findings: usize,
    pub high_findings: usize,
    pub agent_statuses: Vec<AgentStatus>,
    pub recent_findings: Vec<Finding>,
}

/// Mutable core state behind the coordinator's lock.
///
/// One write-lock critical section covers one logical operation, so readers
/// never observe a partially-ingested finding or a half-applied transition.
struct State {
    findings: FindingStore,
    reviews: ReviewEngine,
    agents: HashMap<String, AgentStatus>,
    risk: RiskScore,
    risk_dirty: bool,
    last_recompute: Option<Instant>,
}

/// Orchestration coordinator over ingest, risk, reviews, and liveness.
#[derive(Clone)]
pub struct Coordinator {
    config: Arc<Config>,
    state: Arc<RwLock<State>>,
}

impl Coordinator {
    pub fn new(config: Config) -> Self {
        let frameworks = config.scoring.registered_frameworks();
        let state = State {
            findings: FindingStore::new(),
            reviews: ReviewEngine::new(config.review.clone()),
            agents: HashMap::new(),
            risk: RiskScore::zero(&frameworks),
            risk_dirty: false,
            last_recompute: None,
        };
        Self {
            config: Arc::new(config),
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Record a heartbeat from a monitor, creating its status record on
    /// first contact.
    pub async fn heartbeat(&self, monitor: &str) {
        let mut state = self.state.write().await;
        Self::touch_agent(&mut state.agents, monitor);
        debug!("Heartbeat from {}", monitor);
    }

    /// Increment a monitor's error counter.
    pub async fn record_monitor_error(&self, monitor: &str) -> CoreResult<()> {
        let mut state = self.state.write().await;
        let status = state
            .agents
            .get_mut(monitor)
            .ok_or_else(|| CoreError::MonitorNotFound(monitor.to_string()))?;
        status.error_count += 1;
        Ok(())
    }

    /// Validate and ingest a raw finding from an upstream monitor.
    ///
    /// Refreshes the monitor's heartbeat, increments its findings counter,
    /// auto-creates a review when the trigger policy matches, and schedules
    /// a risk recompute.
    pub async fn submit_finding(&self, raw: RawFinding) -> CoreResult<Finding> {
        let mut state = self.state.write().await;

        let monitor = raw.monitor.clone();
        let (finding, superseded) = state.findings.submit(raw, &self.config.scoring)?;

        let status = Self::touch_agent(&mut state.agents, &monitor);
        status.findings_produced += 1;

        if let Some(prior) = superseded {
            debug!("Finding {} supersedes {}", finding.id, prior);
        }

        if state.reviews.should_trigger(&finding) {
            state.reviews.create_review(&finding);
        }

        self.schedule_recompute(&mut state);
        Ok(finding)
    }

    /// Explicitly request a review for a finding that did not meet the
    /// auto-trigger policy. Idempotent while an open review exists.
    pub async fn request_review(&self, finding_id: FindingId) -> CoreResult<Review> {
        let mut state = self.state.write().await;
        let finding = state
            .findings
            .get(finding_id)
            .ok_or(CoreError::FindingNotFound(finding_id))?
            .clone();
        Ok(state.reviews.create_review(&finding))
    }

    /// Apply a human decision to a review.
    ///
    /// Terminal transitions schedule a risk recompute; a dismissal removes
    /// the finding from the open set, approvals and escalations keep it an
    /// acknowledged risk.
    pub async fn decide_review(
        &self,
        review_id: ReviewId,
        action: ReviewAction,
        actor: &str,
        notes: Option<String>,
    ) -> CoreResult<Review> {
        let mut state = self.state.write().await;
        let review = state.reviews.transition(review_id, action, actor, notes)?;
        self.schedule_recompute(&mut state);
        Ok(review)
    }

    /// List findings matching the filter, most recent first.
    pub async fn list_findings(&self, filter: FindingFilter) -> Vec<Finding> {
        let state = self.state.read().await;
        let dismissed = state.reviews.dismissed_findings();

        let mut findings: Vec<Finding> = state
            .findings
            .all()
            .filter(|f| {
                if filter.open_only && (f.superseded || dismissed.contains(&f.id)) {
                    return false;
                }
                if let Some(severity) = filter.severity {
                    if f.severity != severity {
                        return false;
                    }
                }
                if let Some(ref framework) = filter.framework {
                    if f.framework != *framework {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();

        findings.sort_by(|a, b| b.detected_at.cmp(&a.detected_at).then(b.id.cmp(&a.id)));
        if let Some(limit) = filter.limit {
            findings.truncate(limit);
        }
        findings
    }

    /// List reviews matching the filter, newest first.
    pub async fn list_reviews(&self, filter: ReviewFilter) -> Vec<Review> {
        let state = self.state.read().await;

        let mut reviews: Vec<Review> = state
            .reviews
            .all()
            .filter(|r| {
                if let Some(status) = filter.status {
                    if r.status != status {
                        return false;
                    }
                }
                if let Some(ref assignee) = filter.assignee {
                    if r.assignee != *assignee {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();

        reviews.sort_by(|a, b| b.id.cmp(&a.id));
        if let Some(limit) = filter.limit {
            reviews.truncate(limit);
        }
        reviews
    }

    /// Current risk scores. Recomputes first if a debounced event left the
    /// cached score stale.
    pub async fn current_risk(&self) -> RiskScore {
        {
            let state = self.state.read().await;
            if !state.risk_dirty {
                return state.risk.clone();
            }
        }

        let mut state = self.state.write().await;
        // Re-check under the write lock; another task may have recomputed.
        if state.risk_dirty {
            self.recompute_now(&mut state);
        }
        state.risk.clone()
    }

    /// Status of every known monitor, with the active flag recomputed from
    /// the last heartbeat against the liveness window.
    pub async fn agent_statuses(&self) -> Vec<AgentStatus> {
        let window = self.config.liveness.window();
        let now = Utc::now();

        let state = self.state.read().await;
        let mut statuses: Vec<AgentStatus> = state
            .agents
            .values()
            .map(|status| {
                let mut status = status.clone();
                status.active = now.signed_duration_since(status.last_heartbeat) <= window;
                status
            })
            .collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// The immutable review audit log.
    pub async fn audit_log(&self) -> Vec<AuditEntry> {
        self.state.read().await.reviews.audit_log().to_vec()
    }

    /// Assemble the combined dashboard read model.
    pub async fn dashboard_summary(&self) -> DashboardSummary {
        let risk = self.current_risk().await;
        let agent_statuses = self.agent_statuses().await;
        let recent_findings = self
            .list_findings(FindingFilter {
                open_only: true,
                limit: Some(self.config.report.recent_findings),
                ..Default::default()
            })
            .await;

        let state = self.state.read().await;
        DashboardSummary {
            pending_reviews: state.reviews.pending_count(),
            total_findings: state.findings.len(),
            critical_findings: risk.critical_count,
            high_findings: risk.high_count,
            risk,
            agent_statuses,
            recent_findings,
        }
    }

    /// Run one liveness pass: refresh every monitor's cached active flag.
    ///
    /// Failures here are logged and retried on the next tick; they never
    /// propagate out of the background task.
    pub async fn liveness_pass(&self) {
        let window = self.config.liveness.window();
        let now = Utc::now();

        let mut state = self.state.write().await;
        for status in state.agents.values_mut() {
            let active = now.signed_duration_since(status.last_heartbeat) <= window;
            if status.active && !active {
                warn!(
                    "Monitor {} is inactive (no heartbeat since {})",
                    status.name, status.last_heartbeat
                );
            }
            status.active = active;
        }
    }

    /// Spawn the background liveness tick. The returned handle can be
    /// aborted on shutdown; the task is safely interruptible between
    /// iterations.
    pub fn spawn_liveness_task(&self) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();
        let interval = self.config.liveness.tick_interval();
        info!("Liveness tick every {:?}", interval);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                coordinator.liveness_pass().await;
            }
        })
    }

    fn touch_agent<'a>(
        agents: &'a mut HashMap<String, AgentStatus>,
        monitor: &str,
    ) -> &'a mut AgentStatus {
        let now = Utc::now();
        let status = agents.entry(monitor.to_string()).or_insert_with(|| {
            info!("Monitor {} registered", monitor);
            AgentStatus {
                name: monitor.to_string(),
                active: true,
                last_heartbeat: now,
                findings_produced: 0,
                error_count: 0,
            }
        });
        status.last_heartbeat = now;
        status.active = true;
        status
    }

    /// Recompute immediately, or mark the cached score dirty when still
    /// inside the debounce window. The next `current_risk` read picks the
    /// dirty flag up.
    fn schedule_recompute(&self, state: &mut State) {
        let debounce = self.config.scoring.debounce();
        let within_window = state
            .last_recompute
            .map(|at| at.elapsed() < debounce)
            .unwrap_or(false);

        if within_window {
            state.risk_dirty = true;
        } else {
            self.recompute_now(state);
        }
    }

    fn recompute_now(&self, state: &mut State) {
        let dismissed = state.reviews.dismissed_findings();
        let open = state.findings.open(&dismissed);
        state.risk = risk::recompute(&open, &self.config.scoring);
        state.risk_dirty = false;
        state.last_recompute = Some(Instant::now());
        debug!(
            "Risk recomputed: overall {:.1} over {} open findings",
            state.risk.overall, state.risk.findings_count
        );
    }
}
