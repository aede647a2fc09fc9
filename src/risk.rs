//! Risk aggregation.
//!
//! This module computes per-framework and overall risk scores from the
//! current set of open findings. `recompute` is a pure function of its
//! inputs: no hidden state, no ordering dependence.

use crate::config::ScoringConfig;
use crate::models::{Finding, Framework, RiskScore, Severity};
use chrono::Utc;
use std::collections::BTreeMap;

/// Recompute risk scores over the given open findings.
///
/// For each registered framework the raw risk is the sum of
/// `severity weight × confidence` over its open findings, normalized into
/// [0,100] by the saturating map `100 × (1 − e^(−k·raw))`: a single
/// critical finding moves the score sharply while additional findings have
/// diminishing marginal impact. A framework with no open findings scores 0.
///
/// The overall score is the weighted mean of the per-framework scores
/// across all registered frameworks, zeros included; with no
/// `framework_weights` configured this is the plain equal-weight average.
pub fn recompute(open: &[&Finding], scoring: &ScoringConfig) -> RiskScore {
    let frameworks = scoring.registered_frameworks();

    let mut raw_sums: BTreeMap<Framework, f64> = frameworks
        .iter()
        .cloned()
        .map(|fw| (fw, 0.0))
        .collect();

    for finding in open {
        let weight = scoring.severity_weight(finding.severity);
        // Ingest validation only admits registered frameworks; anything
        // else is ignored rather than scored.
        if let Some(sum) = raw_sums.get_mut(&finding.framework) {
            *sum += weight * finding.confidence;
        }
    }

    let framework_scores: BTreeMap<Framework, f64> = raw_sums
        .into_iter()
        .map(|(fw, raw)| (fw, saturate(raw, scoring.saturation_k)))
        .collect();

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (fw, score) in &framework_scores {
        let weight = scoring.framework_weight(fw);
        weighted_sum += weight * score;
        weight_total += weight;
    }
    let overall = if weight_total > 0.0 {
        weighted_sum / weight_total
    } else {
        0.0
    };

    RiskScore {
        overall,
        framework_scores,
        findings_count: open.len(),
        critical_count: open
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .count(),
        high_count: open.iter().filter(|f| f.severity == Severity::High).count(),
        last_updated: Utc::now(),
    }
}

/// Map a non-negative raw sum into [0,100], saturating.
fn saturate(raw: f64, k: f64) -> f64 {
    if raw <= 0.0 {
        return 0.0;
    }
    (100.0 * (1.0 - (-k * raw).exp())).clamp(0.0, 100.0)
}
