use std::collections::HashMap;

use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub scheduling: SchedulingConfig,
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// ## Summary
    /// Returns the server address as a string in the format "host:port".
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Limits and conventions for the scheduling engine.
///
/// All rule evaluation happens in the single configured shop timezone; the
/// caps bound worst-case fan-out from malformed or extremely frequent rules.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingConfig {
    /// IANA timezone name the shop operates in.
    pub timezone: String,
    /// Earliest year accepted on a job endpoint.
    pub min_valid_year: i32,
    /// Latest year accepted on a job endpoint.
    pub max_valid_year: i32,
    /// Longest span in days a single job may cover.
    pub max_job_span_days: i64,
    /// Most virtual occurrences generated for one window of a forever series.
    pub occurrence_safety_cap: usize,
    /// Most per-day segments a multi-day job expands into on the feed.
    pub max_expand_days: usize,
    /// Most virtual occurrences returned by the preview endpoint.
    pub preview_occurrence_cap: usize,
}

impl SchedulingConfig {
    /// ## Summary
    /// Resolves the configured timezone name to a `chrono_tz::Tz`.
    ///
    /// ## Errors
    /// Returns an `InvalidConfiguration` error for unknown timezone names.
    pub fn timezone(&self) -> CoreResult<chrono_tz::Tz> {
        self.timezone.parse::<chrono_tz::Tz>().map_err(|_err| {
            CoreError::InvalidConfiguration(format!("unknown timezone: {}", self.timezone))
        })
    }
}

/// Shared pricing snapshot for quote calculation.
///
/// Injected into the calculators rather than read as a global so the
/// calculation functions stay pure.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Sales tax rate applied after discounts (e.g. 0.0825).
    pub tax_rate: f64,
    /// Flat prices for named addons (spare tire, jack, hitch lock, ...).
    #[serde(default)]
    pub addon_prices: HashMap<String, f64>,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from `.env` file and environment variables into a `Settings`.
    /// Environment variables take precedence over `.env` file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8720)?
            .set_default("database.max_connections", 4)?
            .set_default("logging.level", "debug")?
            .set_default("scheduling.timezone", "America/Chicago")?
            .set_default("scheduling.min_valid_year", 2000)?
            .set_default("scheduling.max_valid_year", 2100)?
            .set_default("scheduling.max_job_span_days", 90)?
            .set_default("scheduling.occurrence_safety_cap", 366)?
            .set_default("scheduling.max_expand_days", 60)?
            .set_default("scheduling.preview_occurrence_cap", 200)?
            .set_default("pricing.tax_rate", 0.0825)?
            // Env file
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduling(timezone: &str) -> SchedulingConfig {
        SchedulingConfig {
            timezone: timezone.to_owned(),
            min_valid_year: 2000,
            max_valid_year: 2100,
            max_job_span_days: 90,
            occurrence_safety_cap: 366,
            max_expand_days: 60,
            preview_occurrence_cap: 200,
        }
    }

    #[test]
    fn timezone_resolves_known_names() {
        let tz = scheduling("America/Chicago").timezone().expect("resolves");
        assert_eq!(tz, chrono_tz::America::Chicago);
    }

    #[test]
    fn timezone_rejects_unknown_names() {
        let result = scheduling("Mars/Olympus_Mons").timezone();
        assert!(matches!(result, Err(CoreError::InvalidConfiguration(_))));
    }
}
