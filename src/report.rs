//! Markdown and JSON dashboard report generation.
//!
//! Renders the coordinator's dashboard summary into a Markdown report for
//! humans or a JSON document for downstream tooling.

use crate::config::ReportConfig;
use crate::coordinator::DashboardSummary;
use crate::models::{AgentStatus, Finding, RiskScore};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(summary: &DashboardSummary, config: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str("# Compliance Sentinel Report\n\n");

    output.push_str(&generate_risk_section(&summary.risk));
    output.push_str(&generate_findings_section(&summary.recent_findings));

    if config.include_reviews {
        output.push_str(&generate_review_section(summary));
    }

    if config.include_agent_statuses {
        output.push_str(&generate_agents_section(&summary.agent_statuses));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate a JSON report.
pub fn generate_json_report(summary: &DashboardSummary) -> Result<String> {
    let json = serde_json::to_string_pretty(summary)?;
    Ok(json)
}

/// Generate the risk score section.
fn generate_risk_section(risk: &RiskScore) -> String {
    let mut section = String::new();

    section.push_str("## Risk Overview\n\n");
    section.push_str(&format!(
        "- **Overall Risk:** {:.1} / 100 ({})\n",
        risk.overall,
        risk_band(risk.overall)
    ));
    section.push_str(&format!("- **Open Findings:** {}\n", risk.findings_count));
    section.push_str(&format!(
        "- **Critical:** {} | **High:** {}\n",
        risk.critical_count, risk.high_count
    ));
    section.push_str(&format!(
        "- **Last Updated:** {}\n\n",
        risk.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    section.push_str("| Framework | Score |\n");
    section.push_str("|-----------|-------|\n");
    for (framework, score) in &risk.framework_scores {
        section.push_str(&format!("| {} | {:.1} |\n", framework, score));
    }
    section.push('\n');

    section
}

/// Generate the open findings section.
fn generate_findings_section(findings: &[Finding]) -> String {
    let mut section = String::new();

    section.push_str("## Recent Open Findings\n\n");

    if findings.is_empty() {
        section.push_str("No open findings.\n\n");
        return section;
    }

    for finding in findings {
        section.push_str(&format!(
            "### {} {} — {}\n\n",
            finding.severity.emoji(),
            finding.id,
            finding.title
        ));
        section.push_str(&format!(
            "- **Severity:** {} | **Framework:** {} | **Confidence:** {:.0}%\n",
            finding.severity,
            finding.framework,
            finding.confidence * 100.0
        ));
        section.push_str(&format!(
            "- **Source:** {} ({} via {})\n",
            finding.source_ref, finding.source, finding.monitor
        ));
        if let Some(ref url) = finding.source_url {
            section.push_str(&format!("- **Link:** {}\n", url));
        }
        if !finding.description.is_empty() {
            section.push_str(&format!("\n{}\n", finding.description));
        }
        section.push('\n');
    }

    section
}

/// Generate the review queue section.
fn generate_review_section(summary: &DashboardSummary) -> String {
    let mut section = String::new();

    section.push_str("## Review Queue\n\n");
    section.push_str(&format!(
        "- **Pending Reviews:** {}\n\n",
        summary.pending_reviews
    ));

    section
}

/// Generate the agent status section.
fn generate_agents_section(statuses: &[AgentStatus]) -> String {
    let mut section = String::new();

    section.push_str("## Monitor Status\n\n");

    if statuses.is_empty() {
        section.push_str("No monitors have reported yet.\n\n");
        return section;
    }

    section.push_str("| Monitor | Active | Last Heartbeat | Findings | Errors |\n");
    section.push_str("|---------|--------|----------------|----------|--------|\n");
    for status in statuses {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            status.name,
            if status.active { "✅" } else { "⛔" },
            status.last_heartbeat.format("%Y-%m-%d %H:%M:%S"),
            status.findings_produced,
            status.error_count
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    format!(
        "---\n\n*Generated by Compliance Sentinel v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Human-readable band for an overall risk score.
fn risk_band(score: f64) -> &'static str {
    if score >= 75.0 {
        "🔴 Critical"
    } else if score >= 50.0 {
        "🟠 High"
    } else if score >= 25.0 {
        "🟡 Elevated"
    } else {
        "🟢 Low"
    }
}
