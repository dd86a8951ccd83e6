//! # Code Allocator
//!
//! Turns a series configuration into the next unique, formatted code.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                next_code(&SeriesConfig::purchase())                     │
//! │                                                                         │
//! │  1. period  = Year(2024)        (clock, UTC; Perpetual if not yearly)  │
//! │  2. value   = reserve_next("purchase", "2024")  → 7                    │
//! │  3. code    = "PU" + "24" + "000007"            → "PU24000007"         │
//! │  4. value > 999999?  → CodeSpaceExhausted (fatal, logged)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The period is taken from the clock at reservation time, so a save that
//! starts on December 31st and retries after midnight gets a code of the
//! new year.

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use crate::error::DbResult;
use crate::repository::sequence::SequenceRepository;
use tally_core::series::format_code;
use tally_core::{CoreError, Period, SeriesConfig};

/// Source of "now" for period selection.
pub type Clock = fn() -> DateTime<Utc>;

/// Allocates codes from the durable per-series counters.
///
/// ## Usage
/// ```rust,ignore
/// let allocator = db.allocator();
/// let code = allocator.next_code(&SeriesConfig::purchase()).await?;
/// assert_eq!(code.len(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct CodeAllocator {
    sequences: SequenceRepository,
    clock: Clock,
}

impl CodeAllocator {
    /// Allocator reading the wall clock.
    pub fn new(sequences: SequenceRepository) -> Self {
        CodeAllocator {
            sequences,
            clock: Utc::now,
        }
    }

    /// Replaces the clock used to pick the period.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Reserves the next counter value for the current period and formats it.
    ///
    /// ## Errors
    /// - `Core(CodeSpaceExhausted)` when the value no longer fits; the
    ///   counter value stays consumed
    /// - `StorageUnavailable` when the counter could not be written
    pub async fn next_code(&self, config: &SeriesConfig) -> DbResult<String> {
        self.next_code_at(config, (self.clock)()).await
    }

    /// As [`next_code`](Self::next_code) with an explicit instant.
    pub async fn next_code_at(&self, config: &SeriesConfig, now: DateTime<Utc>) -> DbResult<String> {
        let period = Period::current(config, now);
        let value = self
            .sequences
            .reserve_next(config.series_name(), &period)
            .await?;

        match format_code(config, &period, value) {
            Ok(code) => {
                debug!(series = %config.series_name(), code = %code, "Allocated code");
                Ok(code)
            }
            Err(err @ CoreError::CodeSpaceExhausted { .. }) => {
                error!(
                    series = %config.series_name(),
                    period = %period,
                    value = value,
                    digits = config.counter_digits(),
                    "Code space exhausted"
                );
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
