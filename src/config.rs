//! Configuration file handling.
//!
//! This module handles loading, validating and merging configuration from
//! `.wdipulse.toml` files.

use crate::models::{SeriesKey, YearIndex};
use crate::source::worldbank::{DEFAULT_BASE_URL, DEFAULT_PER_PAGE};
use crate::source::RetryPolicy;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".wdipulse.toml";

/// Earliest and latest year accepted for the aligned range.
pub const MIN_YEAR: i32 = 1800;
pub const MAX_YEAR: i32 = 2200;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upstream source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Year range every series is aligned to.
    #[serde(default)]
    pub range: RangeConfig,

    /// Refresh cadence and retry behaviour.
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Regions and indicators used for the workforce share.
    #[serde(default)]
    pub workforce: WorkforceConfig,

    /// Labelled series to fetch, in display order.
    #[serde(default = "default_series")]
    pub series: Vec<SeriesConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            range: RangeConfig::default(),
            refresh: RefreshConfig::default(),
            workforce: WorkforceConfig::default(),
            series: default_series(),
        }
    }
}

/// Upstream statistics API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the indicators API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Records requested in the single page.
    #[serde(default = "default_per_page")]
    pub per_page: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            per_page: default_per_page(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_per_page() -> usize {
    DEFAULT_PER_PAGE
}

fn default_timeout() -> u64 {
    30
}

/// Inclusive year range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeConfig {
    #[serde(default = "default_start_year")]
    pub start_year: i32,

    #[serde(default = "default_end_year")]
    pub end_year: i32,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            end_year: default_end_year(),
        }
    }
}

fn default_start_year() -> i32 {
    1990
}

fn default_end_year() -> i32 {
    2050
}

/// Refresh and retry timings, all in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Period of the automatic refresh.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,

    /// Backoff unit for rate-limited requests.
    #[serde(default = "default_base_retry_delay")]
    pub base_retry_delay_ms: u64,

    /// Retries after the first attempt on a 429.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Pause between sequential fetches.
    #[serde(default = "default_inter_request_delay")]
    pub inter_request_delay_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval(),
            base_retry_delay_ms: default_base_retry_delay(),
            max_retries: default_max_retries(),
            inter_request_delay_ms: default_inter_request_delay(),
        }
    }
}

fn default_refresh_interval() -> u64 {
    300_000 // 5 min
}

fn default_base_retry_delay() -> u64 {
    600
}

fn default_max_retries() -> usize {
    2
}

fn default_inter_request_delay() -> u64 {
    150
}

impl RefreshConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.base_retry_delay_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_millis(self.inter_request_delay_ms)
    }
}

/// Inputs of the workforce share computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkforceConfig {
    /// Region whose working-age population is the numerator.
    #[serde(default = "default_numerator_region")]
    pub numerator_region: String,

    /// Region whose working-age population is the denominator.
    #[serde(default = "default_denominator_region")]
    pub denominator_region: String,

    /// Total population indicator.
    #[serde(default = "default_population_indicator")]
    pub population_indicator: String,

    /// Percent of population aged 15-64.
    #[serde(default = "default_working_age_indicator")]
    pub working_age_indicator: String,
}

impl Default for WorkforceConfig {
    fn default() -> Self {
        Self {
            numerator_region: default_numerator_region(),
            denominator_region: default_denominator_region(),
            population_indicator: default_population_indicator(),
            working_age_indicator: default_working_age_indicator(),
        }
    }
}

fn default_numerator_region() -> String {
    "SSF".to_string()
}

fn default_denominator_region() -> String {
    "WLD".to_string()
}

fn default_population_indicator() -> String {
    "SP.POP.TOTL".to_string()
}

fn default_working_age_indicator() -> String {
    "SP.POP.1564.TO.ZS".to_string()
}

impl WorkforceConfig {
    pub fn numerator_population(&self) -> SeriesKey {
        SeriesKey::new(&self.numerator_region, &self.population_indicator)
    }

    pub fn denominator_population(&self) -> SeriesKey {
        SeriesKey::new(&self.denominator_region, &self.population_indicator)
    }

    pub fn numerator_working_age(&self) -> SeriesKey {
        SeriesKey::new(&self.numerator_region, &self.working_age_indicator)
    }

    pub fn denominator_working_age(&self) -> SeriesKey {
        SeriesKey::new(&self.denominator_region, &self.working_age_indicator)
    }
}

/// One labelled `(region, indicator)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesConfig {
    pub region: String,
    pub indicator: String,
    pub label: String,
}

impl SeriesConfig {
    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(&self.region, &self.indicator)
    }
}

fn default_series() -> Vec<SeriesConfig> {
    [
        ("SSF", "Sub-Saharan Africa"),
        ("EAS", "East Asia & Pacific"),
        ("ECS", "Europe & Central Asia"),
        ("SAS", "South Asia"),
        ("LCN", "Latin America & Caribbean"),
        ("WLD", "World"),
    ]
    .into_iter()
    .map(|(region, label)| SeriesConfig {
        region: region.to_string(),
        indicator: default_population_indicator(),
        label: label.to_string(),
    })
    .collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(start) = args.start_year {
            self.range.start_year = start;
        }
        if let Some(end) = args.end_year {
            self.range.end_year = end;
        }
        if let Some(interval) = args.refresh_interval_ms {
            self.refresh.refresh_interval_ms = interval;
        }
        if let Some(ref base_url) = args.base_url {
            self.source.base_url = base_url.clone();
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.year_index().is_none() {
            bail!(
                "start_year ({}) must not be after end_year ({})",
                self.range.start_year,
                self.range.end_year
            );
        }
        for year in [self.range.start_year, self.range.end_year] {
            if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
                bail!(
                    "year {} is outside the supported range {}..={}",
                    year,
                    MIN_YEAR,
                    MAX_YEAR
                );
            }
        }
        if self.series.is_empty() {
            bail!("at least one [[series]] entry is required");
        }
        if self.refresh.refresh_interval_ms == 0 {
            bail!("refresh_interval_ms must be at least 1");
        }

        for required in [
            self.workforce.numerator_population(),
            self.workforce.denominator_population(),
        ] {
            if self.label_for(&required).is_none() {
                bail!(
                    "workforce population series {} must be listed under [[series]]",
                    required
                );
            }
        }

        Ok(())
    }

    pub fn year_index(&self) -> Option<YearIndex> {
        YearIndex::new(self.range.start_year, self.range.end_year)
    }

    /// Label configured for a series key.
    pub fn label_for(&self, key: &SeriesKey) -> Option<&str> {
        self.series
            .iter()
            .find(|s| &s.key() == key)
            .map(|s| s.label.as_str())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Failed to serialize default config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.range.start_year, 1990);
        assert_eq!(config.range.end_year, 2050);
        assert_eq!(config.refresh.refresh_interval_ms, 300_000);
        assert_eq!(config.refresh.base_retry_delay_ms, 600);
        assert_eq!(config.refresh.max_retries, 2);
        assert_eq!(config.refresh.inter_request_delay_ms, 150);
        assert_eq!(config.series.len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[range]
start_year = 2000
end_year = 2030

[refresh]
max_retries = 4

[[series]]
region = "SSF"
indicator = "SP.POP.TOTL"
label = "Sub-Saharan Africa"

[[series]]
region = "WLD"
indicator = "SP.POP.TOTL"
label = "World"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.range.start_year, 2000);
        assert_eq!(config.range.end_year, 2030);
        assert_eq!(config.refresh.max_retries, 4);
        assert_eq!(config.refresh.base_retry_delay_ms, 600);
        assert_eq!(config.series.len(), 2);
        assert_eq!(config.source.base_url, "https://api.worldbank.org/v2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut config = Config::default();
        config.range.start_year = 2051;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_years_outside_supported_range() {
        let mut config = Config::default();
        config.range.start_year = i32::MIN;
        config.range.end_year = i32::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("outside the supported range"));

        let mut config = Config::default();
        config.range.end_year = 2201;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.range.start_year = MIN_YEAR;
        config.range.end_year = MAX_YEAR;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_workforce_population_series() {
        let mut config = Config::default();
        config.series.retain(|s| s.region != "WLD");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("WLD/SP.POP.TOTL"));
    }

    #[test]
    fn test_merge_with_args_overrides_given_values() {
        use clap::Parser;

        let args = crate::cli::Args::try_parse_from([
            "wdi-pulse",
            "--end-year",
            "2030",
            "--base-url",
            "http://localhost:8080/v2",
        ])
        .unwrap();
        let mut config = Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.range.start_year, 1990);
        assert_eq!(config.range.end_year, 2030);
        assert_eq!(config.source.base_url, "http://localhost:8080/v2");
        assert_eq!(config.refresh.refresh_interval_ms, 300_000);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let refresh = RefreshConfig::default();
        let policy = refresh.retry_policy();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1200));
    }

    #[test]
    fn test_label_for() {
        let config = Config::default();
        assert_eq!(
            config.label_for(&SeriesKey::new("WLD", "SP.POP.TOTL")),
            Some("World")
        );
        assert_eq!(config.label_for(&SeriesKey::new("XXX", "SP.POP.TOTL")), None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, Config::default_toml().unwrap()).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.series.len(), 6);
        assert_eq!(config.workforce.working_age_indicator, "SP.POP.1564.TO.ZS");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml().unwrap();
        assert!(toml_str.contains("[range]"));
        assert!(toml_str.contains("[refresh]"));
        assert!(toml_str.contains("[[series]]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.series.len(), 6);
    }
}
