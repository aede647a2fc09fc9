//! Compliance Sentinel - multi-agent compliance risk aggregation
//!
//! Replays monitor event feeds through the aggregation core: validated
//! findings feed per-framework risk scores and auto-queue human-in-the-loop
//! reviews, and the resulting dashboard is rendered as Markdown or JSON.
//!
//! Exit codes:
//!   0 - Success (no open findings above threshold, or no --fail-on set)
//!   1 - Runtime error (feed, config, or output failure)
//!   2 - Open findings at or above the --fail-on threshold

mod cli;
mod config;
mod coordinator;
mod error;
mod feed;
mod ingest;
mod models;
mod report;
mod review;
mod risk;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use coordinator::{Coordinator, FindingFilter};
use feed::Feed;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Compliance Sentinel v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the replay
    match run_replay(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Replay failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .sentinel.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".sentinel.toml");

    if path.exists() {
        eprintln!("⚠️  .sentinel.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .sentinel.toml")?;

    println!("✅ Created .sentinel.toml with default settings.");
    println!("   Edit it to customize scoring weights, review thresholds, and liveness.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete replay workflow. Returns exit code (0 or 2).
async fn run_replay(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    if let Err(e) = config.validate() {
        anyhow::bail!("Invalid configuration: {}", e);
    }

    // Step 1: Load the event feed
    let feed_path = args.feed.as_ref().context("--feed is required")?;
    println!("📥 Loading event feed: {}", feed_path.display());
    let feed = Feed::load(feed_path)?;
    println!(
        "   {} events ({} findings)",
        feed.events.len(),
        feed.finding_count()
    );

    // Handle --dry-run: feed already parsed and validated, exit
    if args.dry_run {
        println!("\n✅ Dry run complete. Feed is valid; nothing was replayed.");
        return Ok(0);
    }

    // Step 2: Start the coordinator
    println!("🛰️  Starting coordinator...");
    println!(
        "   Review triggers: severity ≥ {} or confidence ≥ {:.2}",
        config.review.severity_threshold, config.review.confidence_threshold
    );
    println!(
        "   Liveness window: {}s",
        config.liveness.window().num_seconds()
    );

    let coordinator = Coordinator::new(config.clone());
    let liveness = coordinator.spawn_liveness_task();

    // Step 3: Replay the feed
    println!("\n🔬 Replaying events...\n");
    let stats = feed.replay(&coordinator).await;
    if stats.rejected > 0 {
        warn!("{} findings were rejected at the ingest boundary", stats.rejected);
    }

    // One explicit pass so statuses are fresh even on short replays
    coordinator.liveness_pass().await;

    // Step 4: Assemble the dashboard and render the report
    println!("📝 Generating report...");
    let summary = coordinator.dashboard_summary().await;

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&summary)?,
        OutputFormat::Markdown => report::generate_markdown_report(&summary, &config.report),
    };

    let output_path = std::path::PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    liveness.abort();

    // Print summary
    let audit_entries = coordinator.audit_log().await;
    println!("\n📊 Replay Summary:");
    println!(
        "   Events: {} | Heartbeats: {} | Ingested: {} | Rejected: {}",
        feed.events.len(),
        stats.heartbeats,
        stats.ingested,
        stats.rejected
    );
    println!(
        "   Decisions applied: {} | Unmatched: {} | Audit entries: {}",
        stats.decided,
        stats.unmatched,
        audit_entries.len()
    );
    println!(
        "   Overall risk: {:.1} / 100 | Open findings: {} | Pending reviews: {}",
        summary.risk.overall, summary.risk.findings_count, summary.pending_reviews
    );
    println!(
        "   - 🔴 Critical: {} | 🟠 High: {}",
        summary.risk.critical_count, summary.risk.high_count
    );
    println!(
        "\n✅ Replay complete! Report saved to: {}",
        output_path.display()
    );

    // Check --fail-on threshold
    if let Some(fail_level) = args.fail_on {
        let threshold = fail_level.to_severity();
        let open = coordinator
            .list_findings(FindingFilter {
                open_only: true,
                ..Default::default()
            })
            .await;
        let has_findings_above = open.iter().any(|f| f.severity >= threshold);

        if has_findings_above {
            eprintln!(
                "\n⛔ Open findings at or above {:?} severity. Failing (exit code 2).",
                fail_level
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .sentinel.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
