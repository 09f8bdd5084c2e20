//! CLI interface for costtree
//!
//! A single no-subcommand entry point: validate configuration, run the two
//! warehouse queries, aggregate, and rebuild the output tree.
//!
//! # Example
//!
//! ```bash
//! # Default 45-day lookback into costs/gcp
//! costtree
//!
//! # Shorter lookback, custom output root
//! costtree --days 14 --output /var/reports/costs
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Generate a browsable cost tree from a GCP BigQuery billing export
#[derive(Parser, Debug, Clone)]
#[command(name = "costtree")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Lookback window in days for both warehouse queries
    #[arg(long, default_value_t = crate::source::DEFAULT_WINDOW_DAYS)]
    pub days: u32,

    /// Root directory of the generated tree (destroyed and rebuilt each run)
    #[arg(long, short = 'o', default_value = "costs/gcp")]
    pub output: PathBuf,

    /// Only log warnings and errors (overrides RUST_LOG)
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["costtree"]);
        assert_eq!(cli.days, 45);
        assert_eq!(cli.output, PathBuf::from("costs/gcp"));
        assert!(!cli.quiet);
    }

    #[test]
    fn test_flag_parsing() {
        let cli = Cli::parse_from(["costtree", "--days", "14", "-o", "/tmp/costs", "-q"]);
        assert_eq!(cli.days, 14);
        assert_eq!(cli.output, PathBuf::from("/tmp/costs"));
        assert!(cli.quiet);
    }
}
