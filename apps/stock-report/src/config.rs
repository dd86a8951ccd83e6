//! # Report Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DATABASE_PATH=/var/lib/tally/tally.db                        │
//! │     TALLY_REPORT_HOUR=21                                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, TALLY_REPORT_CONFIG, or ./tally-report.toml       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     21:00 at UTC+05:30, ./tally.db, no JSON output                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! database_path = "/var/lib/tally/tally.db"
//! run_hour = 21
//! run_minute = 0
//! utc_offset_minutes = 330
//! output_path = "/var/lib/tally/low-stock.json"
//! log_level = "info"
//! ```

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{ReportError, ReportResult};

const DEFAULT_CONFIG_FILE: &str = "tally-report.toml";

/// Largest offset in use anywhere (UTC+14:00).
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Worker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Local hour of the daily run (0-23).
    pub run_hour: u32,

    /// Minute of the daily run (0-59).
    pub run_minute: u32,

    /// Offset of the local time zone from UTC, in minutes.
    pub utc_offset_minutes: i32,

    /// Where to write the JSON report. Logged only when unset.
    pub output_path: Option<PathBuf>,

    /// Pool size for the worker's database handle.
    pub max_connections: u32,

    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,

    /// File the configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            database_path: PathBuf::from("tally.db"),
            run_hour: 21,
            run_minute: 0,
            utc_offset_minutes: 330,
            output_path: None,
            max_connections: 2,
            log_level: "info".to_string(),
            source: None,
        }
    }
}

impl ReportConfig {
    /// Loads configuration: defaults, then the TOML file, then environment.
    ///
    /// An explicit `config_path` must exist; the default file is optional.
    /// Runs before logging is up, so nothing here logs: the chosen file is
    /// kept in `source` and bad overrides are errors.
    pub fn load(config_path: Option<PathBuf>) -> ReportResult<Self> {
        let explicit = config_path.or_else(|| std::env::var("TALLY_REPORT_CONFIG").ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    fn from_file(path: &Path) -> ReportResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Applies `TALLY_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ReportResult<()> {
        if let Some(path) = lookup("TALLY_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }

        if let Some(path) = lookup("TALLY_REPORT_OUTPUT") {
            self.output_path = Some(PathBuf::from(path));
        }

        if let Some(level) = lookup("TALLY_LOG_LEVEL") {
            self.log_level = level;
        }

        override_parsed(&lookup, "TALLY_REPORT_HOUR", &mut self.run_hour)?;
        override_parsed(&lookup, "TALLY_REPORT_MINUTE", &mut self.run_minute)?;
        override_parsed(&lookup, "TALLY_UTC_OFFSET_MINUTES", &mut self.utc_offset_minutes)?;
        override_parsed(&lookup, "TALLY_MAX_CONNECTIONS", &mut self.max_connections)?;
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ReportResult<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ReportError::InvalidConfig("database_path is empty".into()));
        }
        if self.run_hour > 23 {
            return Err(ReportError::InvalidConfig(format!(
                "run_hour must be 0-23, got {}",
                self.run_hour
            )));
        }
        if self.run_minute > 59 {
            return Err(ReportError::InvalidConfig(format!(
                "run_minute must be 0-59, got {}",
                self.run_minute
            )));
        }
        if self.utc_offset_minutes.unsigned_abs() > MAX_OFFSET_MINUTES.unsigned_abs() {
            return Err(ReportError::InvalidConfig(format!(
                "utc_offset_minutes must be within ±{}, got {}",
                MAX_OFFSET_MINUTES, self.utc_offset_minutes
            )));
        }
        if self.max_connections == 0 {
            return Err(ReportError::InvalidConfig("max_connections must be at least 1".into()));
        }
        Ok(())
    }

    /// The configured local time zone.
    pub fn utc_offset(&self) -> ReportResult<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ReportError::InvalidConfig(format!("bad utc offset {}", self.utc_offset_minutes))
        })
    }
}

fn override_parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) -> ReportResult<()> {
    if let Some(raw) = lookup(key) {
        *target = raw.parse().map_err(|_| {
            ReportError::InvalidConfig(format!("{key}: '{raw}' is not a valid value"))
        })?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
