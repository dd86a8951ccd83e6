//! # Document Series
//!
//! A series is a family of documents sharing one numbering scheme. This
//! module turns a reserved counter value into the human-readable code and
//! back again.
//!
//! ## Code Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Code layout (code_length = 10)                        │
//! │                                                                         │
//! │     P U   2 4   0 0 0 0 0 7                                             │
//! │     ───   ───   ───────────                                             │
//! │   prefix  year  counter, zero padded to                                 │
//! │           (yy)  code_length - len(prefix) - len(year)                   │
//! │                                                                         │
//! │   yearly_renew = false  →  no year part, counter never resets           │
//! │   yearly_renew = true   →  counter keyed by (series, "2024")            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The counter itself lives in the database; everything here is pure.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult, ValidationError};

/// Number of characters the year contributes to a yearly code.
const YEAR_SUFFIX_LEN: usize = 2;

// =============================================================================
// Series Configuration
// =============================================================================

/// Numbering policy for one document type.
///
/// Immutable once built. Fields are private so every instance has passed
/// [`SeriesConfig::new`] validation (or is one of the built-ins).
/// Deserialization goes through the same validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSeriesConfig")]
pub struct SeriesConfig {
    series_name: String,
    column_name: String,
    code_length: usize,
    prefix: String,
    yearly_renew: bool,
}

/// Unchecked wire form of [`SeriesConfig`].
#[derive(Deserialize)]
struct RawSeriesConfig {
    series_name: String,
    column_name: String,
    code_length: usize,
    prefix: String,
    yearly_renew: bool,
}

impl TryFrom<RawSeriesConfig> for SeriesConfig {
    type Error = CoreError;

    fn try_from(raw: RawSeriesConfig) -> CoreResult<Self> {
        SeriesConfig::new(
            raw.series_name,
            raw.column_name,
            raw.code_length,
            raw.prefix,
            raw.yearly_renew,
        )
    }
}

impl SeriesConfig {
    /// Builds a validated series configuration.
    ///
    /// ## Errors
    /// `InvalidSeriesConfig` when the names are empty, the prefix is not
    /// ASCII alphanumeric, or `code_length` leaves no digit for the counter.
    pub fn new(
        series_name: impl Into<String>,
        column_name: impl Into<String>,
        code_length: usize,
        prefix: impl Into<String>,
        yearly_renew: bool,
    ) -> CoreResult<Self> {
        let config = SeriesConfig {
            series_name: series_name.into(),
            column_name: column_name.into(),
            code_length,
            prefix: prefix.into(),
            yearly_renew,
        };
        config.validate()?;
        Ok(config)
    }

    /// Purchases: `PU` + yy + 6 digits.
    pub fn purchase() -> Self {
        SeriesConfig {
            series_name: "purchase".to_string(),
            column_name: "code".to_string(),
            code_length: 10,
            prefix: "PU".to_string(),
            yearly_renew: true,
        }
    }

    /// Sales: `SL` + yy + 6 digits.
    pub fn sale() -> Self {
        SeriesConfig {
            series_name: "sale".to_string(),
            column_name: "code".to_string(),
            code_length: 10,
            prefix: "SL".to_string(),
            yearly_renew: true,
        }
    }

    /// Salaries: `SA` + yy + 6 digits.
    pub fn salary() -> Self {
        SeriesConfig {
            series_name: "salary".to_string(),
            column_name: "code".to_string(),
            code_length: 10,
            prefix: "SA".to_string(),
            yearly_renew: true,
        }
    }

    fn validate(&self) -> CoreResult<()> {
        let invalid = |reason: &str| CoreError::InvalidSeriesConfig {
            series: self.series_name.clone(),
            reason: reason.to_string(),
        };

        if self.series_name.trim().is_empty() {
            return Err(invalid("series name is empty"));
        }
        if self.column_name.trim().is_empty() {
            return Err(invalid("column name is empty"));
        }
        if self.prefix.is_empty() {
            return Err(invalid("prefix is empty"));
        }
        if !self.prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("prefix must be ASCII letters and digits"));
        }
        if self.code_length <= self.fixed_len() {
            return Err(invalid("code length leaves no digits for the counter"));
        }

        Ok(())
    }

    /// Series (and table) name, e.g. `"purchase"`.
    pub fn series_name(&self) -> &str {
        &self.series_name
    }

    /// Column holding the code, e.g. `"code"`.
    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    /// Total length of every code in this series.
    pub fn code_length(&self) -> usize {
        self.code_length
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn yearly_renew(&self) -> bool {
        self.yearly_renew
    }

    /// `"<series>.<column>"`, the constraint target SQLite names when a
    /// duplicate code is inserted.
    pub fn unique_target(&self) -> String {
        format!("{}.{}", self.series_name, self.column_name)
    }

    /// Characters taken by the prefix and the year part.
    fn fixed_len(&self) -> usize {
        let year = if self.yearly_renew { YEAR_SUFFIX_LEN } else { 0 };
        self.prefix.len() + year
    }

    /// Digits available for the zero-padded counter.
    pub fn counter_digits(&self) -> usize {
        self.code_length.saturating_sub(self.fixed_len())
    }

    /// Largest counter value that still fits.
    pub fn max_value(&self) -> i64 {
        // 18 digits is the most an i64 can fill.
        let digits = self.counter_digits().min(18) as u32;
        10_i64.pow(digits) - 1
    }
}

// =============================================================================
// Period
// =============================================================================

/// The epoch a counter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    /// The series never resets.
    Perpetual,
    /// The series resets every calendar year (UTC).
    Year(i32),
}

impl Period {
    /// Chooses the period for `config` at instant `now`.
    ///
    /// No backdating: a reservation made at 00:00:01 on January 1st belongs
    /// to the new year.
    pub fn current(config: &SeriesConfig, now: DateTime<Utc>) -> Self {
        if config.yearly_renew {
            Period::Year(now.year())
        } else {
            Period::Perpetual
        }
    }

    /// Key stored in the counter table.
    ///
    /// Perpetual series use the empty string rather than NULL: SQLite
    /// treats NULLs as distinct in a primary key, which would let two
    /// counter rows exist for the same series.
    pub fn storage_key(&self) -> String {
        match self {
            Period::Perpetual => String::new(),
            Period::Year(year) => year.to_string(),
        }
    }

    /// Part of the code contributed by the period (`"24"` for 2024).
    pub fn code_suffix(&self) -> Option<String> {
        match self {
            Period::Perpetual => None,
            Period::Year(year) => Some(format!("{:02}", year.rem_euclid(100))),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Perpetual => write!(f, "perpetual"),
            Period::Year(year) => write!(f, "{}", year),
        }
    }
}

// =============================================================================
// Formatting
// =============================================================================

/// Formats a reserved counter value as a code.
///
/// ## Errors
/// - `CodeSpaceExhausted` if `value` needs more digits than the series has
/// - `InvalidSeriesConfig` if `period` disagrees with `yearly_renew`
/// - `Validation` if `value` is not positive
pub fn format_code(config: &SeriesConfig, period: &Period, value: i64) -> CoreResult<String> {
    if value < 1 {
        return Err(ValidationError::MustBePositive {
            field: "sequence value".to_string(),
        }
        .into());
    }

    let suffix = period.code_suffix();
    if suffix.is_some() != config.yearly_renew {
        return Err(CoreError::InvalidSeriesConfig {
            series: config.series_name.clone(),
            reason: format!("period {} does not match yearly_renew={}", period, config.yearly_renew),
        });
    }

    let digits = config.counter_digits();
    if value > config.max_value() {
        return Err(CoreError::CodeSpaceExhausted {
            series: config.series_name.clone(),
            period: period.to_string(),
            value,
            digits,
        });
    }

    Ok(format!(
        "{}{}{:0width$}",
        config.prefix,
        suffix.unwrap_or_default(),
        value,
        width = digits
    ))
}

// =============================================================================
// Parsing
// =============================================================================

/// A code split back into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCode {
    pub prefix: String,
    /// Two-digit year for yearly series.
    pub period_suffix: Option<String>,
    pub value: i64,
}

/// Splits `code` according to the layout of `config`.
pub fn parse_code(config: &SeriesConfig, code: &str) -> CoreResult<ParsedCode> {
    let malformed = |reason: &str| CoreError::MalformedCode {
        series: config.series_name.clone(),
        code: code.to_string(),
        reason: reason.to_string(),
    };

    if !code.is_ascii() {
        return Err(malformed("not ASCII"));
    }
    if code.len() != config.code_length {
        return Err(malformed("wrong length"));
    }

    let rest = code
        .strip_prefix(config.prefix.as_str())
        .ok_or_else(|| malformed("wrong prefix"))?;

    let (period_suffix, counter) = if config.yearly_renew {
        let (year, counter) = rest.split_at(YEAR_SUFFIX_LEN);
        if !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed("year part is not numeric"));
        }
        (Some(year.to_string()), counter)
    } else {
        (None, rest)
    };

    if !counter.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed("counter part is not numeric"));
    }
    let value: i64 = counter
        .parse()
        .map_err(|_| malformed("counter part is not numeric"))?;

    Ok(ParsedCode {
        prefix: config.prefix.clone(),
        period_suffix,
        value,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
