//! costtree - Generate a browsable cost tree from a GCP BigQuery billing export

use clap::Parser;
use costtree::{
    bigquery::BigQuerySource,
    cli::Cli,
    config::BillingExportConfig,
    error::Result,
    pipeline::{self, RunOutcome},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging. The --quiet flag should override RUST_LOG.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("costtree=info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Fail on missing configuration before any query or filesystem work
    let config = BillingExportConfig::from_env()?;
    let source = BigQuerySource::from_env(config)?;

    println!("============================================================");
    println!("GCP Cost Structure Generator");
    println!("Daily costs from BigQuery billing export");
    println!("============================================================");
    println!();

    let summary = match pipeline::run(&source, cli.days, &cli.output).await? {
        RunOutcome::NoData => std::process::exit(1),
        RunOutcome::Generated(summary) => summary,
    };

    println!();
    println!("============================================================");
    println!("Generated structure in {}/", cli.output.display());
    println!(
        "  Rolling 30-day cost: ${:.2} {}",
        summary.rolling_30d_cost, summary.currency
    );
    println!(
        "  Total all-time cost: ${:.2} {}",
        summary.total_all_time_cost, summary.currency
    );
    println!(
        "  Data range: {} to {}",
        summary.data_range.start, summary.data_range.end
    );
    println!("  Resources: {}", summary.resource_count);
    println!("  Services: {}", summary.category_count);
    println!("  Projects: {}", summary.project_count);
    println!();
    println!("Top 5 by rolling 30-day cost:");
    for top in summary.top_20_resources.iter().take(5) {
        println!("  {}: ${:.2}", top.name, top.rolling_30d_cost);
    }
    println!("============================================================");

    Ok(())
}
