//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// wdi-pulse - live World Bank population indicators
///
/// Fetches regional population series from the World Bank indicators API,
/// aligns them to a year range and derives growth rates and the working-age
/// share of one region within another.
///
/// Examples:
///   wdi-pulse
///   wdi-pulse --output indicators.csv --format csv
///   wdi-pulse --start-year 2000 --end-year 2030 --format json -o snapshot.json
///   wdi-pulse --watch --refresh-interval-ms 60000
///   wdi-pulse --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .wdipulse.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the snapshot to this file after a refresh
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format for --output
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Keep refreshing on the configured interval until Ctrl-C
    #[arg(short, long)]
    pub watch: bool,

    /// First year of the aligned range
    #[arg(long, value_name = "YEAR")]
    pub start_year: Option<i32>,

    /// Last year of the aligned range
    #[arg(long, value_name = "YEAR")]
    pub end_year: Option<i32>,

    /// Refresh interval in milliseconds for --watch
    #[arg(long, value_name = "MS", env = "WDI_PULSE_REFRESH_MS")]
    pub refresh_interval_ms: Option<u64>,

    /// Base URL of the indicators API
    #[arg(long, value_name = "URL", env = "WDI_PULSE_BASE_URL")]
    pub base_url: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .wdipulse.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the written snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
    /// CSV, one row per year
    Csv,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let (Some(start), Some(end)) = (self.start_year, self.end_year) {
            if start > end {
                return Err(format!(
                    "--start-year ({}) must not be after --end-year ({})",
                    start, end
                ));
            }
        }

        if self.refresh_interval_ms == Some(0) {
            return Err("Refresh interval must be at least 1 ms".to_string());
        }

        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            config: None,
            output: None,
            format: OutputFormat::Markdown,
            watch: false,
            start_year: None,
            end_year: None,
            refresh_interval_ms: None,
            base_url: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_year_range() {
        let mut args = make_args();
        args.start_year = Some(2050);
        args.end_year = Some(1990);
        assert!(args.validate().is_err());

        args.end_year = Some(2050);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_interval_and_url() {
        let mut args = make_args();
        args.refresh_interval_ms = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.base_url = Some("ftp://api.worldbank.org".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "wdi-pulse",
            "--watch",
            "--format",
            "csv",
            "-o",
            "out.csv",
            "--start-year",
            "2000",
        ])
        .unwrap();
        assert!(args.watch);
        assert_eq!(args.format, OutputFormat::Csv);
        assert_eq!(args.output, Some(PathBuf::from("out.csv")));
        assert_eq!(args.start_year, Some(2000));
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
