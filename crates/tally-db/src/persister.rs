//! # Retrying Persister
//!
//! Saves an entity whose code was allocated outside the saving transaction,
//! retrying with a fresh code when another writer got there first.
//!
//! ## Retry Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    save(purchase series, ...)                           │
//! │                                                                         │
//! │  attempt 1: generate → PU24000007 → INSERT ... ✗ UNIQUE purchase.code  │
//! │                 │                                                       │
//! │                 └── ConflictOnSave: log, drop the entity               │
//! │                                                                         │
//! │  attempt 2: generate → PU24000008 → INSERT ... ✓ commit                │
//! │                                                                         │
//! │  attempt N (N = max_attempts) fails too → PersistenceExhausted         │
//! │                                                                         │
//! │  Anything else (FK violation, other UNIQUE column, validation,         │
//! │  CodeSpaceExhausted) → returned at once, unchanged                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The code of a failed attempt is never reused: its counter value was
//! consumed at reservation time. No lock is held between attempts.

use std::future::Future;
use tracing::{debug, info, warn};

use crate::allocator::CodeAllocator;
use crate::error::{DbError, DbResult};
use tally_core::SeriesConfig;

/// Attempts made when nothing else is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// How a failed attempt is treated.
enum SaveFailure {
    /// Duplicate code on the series column, or the store was briefly
    /// unavailable. Another attempt may succeed.
    ConflictOnSave(DbError),
    /// Returned to the caller unchanged.
    Fatal(DbError),
}

impl SaveFailure {
    fn classify(config: &SeriesConfig, err: DbError) -> Self {
        if err.is_unique_violation_on(&config.unique_target()) || err.is_transient() {
            SaveFailure::ConflictOnSave(err)
        } else {
            SaveFailure::Fatal(err)
        }
    }
}

/// Bounded save-with-retry around a [`CodeAllocator`].
///
/// ## Usage
/// ```rust,ignore
/// let saved = db
///     .persister()
///     .save_coded(
///         &SeriesConfig::salary(),
///         |code| SalaryRow { code, ..row.clone() },
///         |row| {
///             let pool = pool.clone();
///             async move { insert_salary(&pool, row).await }
///         },
///     )
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct RetryingPersister {
    allocator: CodeAllocator,
    max_attempts: u32,
}

impl RetryingPersister {
    /// Persister with an attempt budget of `max_attempts` (at least 1).
    pub fn new(allocator: CodeAllocator, max_attempts: u32) -> Self {
        RetryingPersister {
            allocator,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn allocator(&self) -> &CodeAllocator {
        &self.allocator
    }

    /// Runs `generate_and_build` then `attempt` until an attempt succeeds or
    /// the budget is used up.
    ///
    /// `generate_and_build` must allocate a fresh code on every call. Its
    /// errors are returned immediately. `attempt` errors are classified:
    /// conflicts on `config`'s code column and `StorageUnavailable` are
    /// retried, everything else is returned as is.
    ///
    /// ## Errors
    /// `PersistenceExhausted` carrying the last conflict once every attempt
    /// has failed.
    pub async fn save<E, T, G, GFut, A, AFut>(
        &self,
        config: &SeriesConfig,
        mut generate_and_build: G,
        mut attempt: A,
    ) -> DbResult<T>
    where
        G: FnMut() -> GFut,
        GFut: Future<Output = DbResult<E>>,
        A: FnMut(E) -> AFut,
        AFut: Future<Output = DbResult<T>>,
    {
        let mut last = None;

        for n in 1..=self.max_attempts {
            let entity = generate_and_build().await?;

            match attempt(entity).await {
                Ok(saved) => {
                    self.on_success(config, n);
                    return Ok(saved);
                }
                Err(err) => last = Some(self.on_failure(config, n, err)?),
            }
        }

        Err(self.exhausted(config, last))
    }

    /// [`save`](Self::save) with code allocation built in: each attempt gets
    /// a freshly allocated code passed to `build`.
    pub async fn save_coded<E, T, B, A, AFut>(
        &self,
        config: &SeriesConfig,
        mut build: B,
        mut attempt: A,
    ) -> DbResult<T>
    where
        B: FnMut(String) -> E,
        A: FnMut(E) -> AFut,
        AFut: Future<Output = DbResult<T>>,
    {
        let mut last = None;

        for n in 1..=self.max_attempts {
            let code = self.allocator.next_code(config).await?;

            match attempt(build(code)).await {
                Ok(saved) => {
                    self.on_success(config, n);
                    return Ok(saved);
                }
                Err(err) => last = Some(self.on_failure(config, n, err)?),
            }
        }

        Err(self.exhausted(config, last))
    }

    fn on_success(&self, config: &SeriesConfig, attempt: u32) {
        if attempt > 1 {
            info!(series = %config.series_name(), attempt = attempt, "Saved after retry");
        } else {
            debug!(series = %config.series_name(), "Saved on first attempt");
        }
    }

    /// `Ok(conflict)` to try again, `Err(fatal)` to stop.
    fn on_failure(&self, config: &SeriesConfig, attempt: u32, err: DbError) -> DbResult<DbError> {
        match SaveFailure::classify(config, err) {
            SaveFailure::ConflictOnSave(err) => {
                warn!(
                    series = %config.series_name(),
                    attempt = attempt,
                    max_attempts = self.max_attempts,
                    error = %err,
                    "Conflict on save"
                );
                Ok(err)
            }
            SaveFailure::Fatal(err) => Err(err),
        }
    }

    fn exhausted(&self, config: &SeriesConfig, last: Option<DbError>) -> DbError {
        let last = last.unwrap_or_else(|| DbError::Internal("no save attempt was made".to_string()));
        warn!(
            series = %config.series_name(),
            attempts = self.max_attempts,
            "Giving up after repeated conflicts"
        );
        DbError::PersistenceExhausted {
            series: config.series_name().to_string(),
            attempts: self.max_attempts,
            last: Box::new(last),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn in_2024() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    async fn setup(max_attempts: u32) -> RetryingPersister {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        RetryingPersister::new(db.allocator().with_clock(in_2024), max_attempts)
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let persister = setup(3).await;

        let saved = persister
            .save_coded(&SeriesConfig::purchase(), |code| code, |code| async move {
                Ok::<_, DbError>(code)
            })
            .await
            .unwrap();

        assert_eq!(saved, "PU24000001");
    }

    #[tokio::test]
    async fn test_conflict_retries_with_fresh_code() {
        let persister = setup(3).await;
        let seen = Arc::new(Mutex::new(Vec::new()));

        let saved = persister
            .save_coded(
                &SeriesConfig::purchase(),
                |code| code,
                |code: String| {
                    let seen = seen.clone();
                    async move {
                        let mut seen = seen.lock().unwrap();
                        seen.push(code.clone());
                        if seen.len() == 1 {
                            Err(DbError::duplicate("purchase.code", code))
                        } else {
                            Ok(code)
                        }
                    }
                },
            )
            .await
            .unwrap();

        assert_eq!(saved, "PU24000002");
        assert_eq!(*seen.lock().unwrap(), vec!["PU24000001", "PU24000002"]);
    }

    #[tokio::test]
    async fn test_exhaustion_carries_last_cause() {
        let persister = setup(3).await;
        let calls = Arc::new(AtomicU32::new(0));

        let err = persister
            .save_coded(
                &SeriesConfig::sale(),
                |code| code,
                |code: String| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err::<String, _>(DbError::duplicate("sale.code", code))
                    }
                },
            )
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            DbError::PersistenceExhausted { series, attempts, last } => {
                assert_eq!(series, "sale");
                assert_eq!(attempts, 3);
                assert!(last.is_unique_violation_on("sale.code"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_other_failures_propagate_immediately() {
        let persister = setup(3).await;
        let calls = Arc::new(AtomicU32::new(0));

        let failures = [
            DbError::duplicate("item.code", "IT001"),
            DbError::duplicate("sale.code", "SL24000001"),
            DbError::ForeignKeyViolation {
                message: "FOREIGN KEY constraint failed".to_string(),
            },
        ];

        for failure in failures {
            calls.store(0, Ordering::SeqCst);
            let failure = Arc::new(Mutex::new(Some(failure)));

            let err = persister
                .save_coded(
                    &SeriesConfig::purchase(),
                    |code| code,
                    |_code: String| {
                        let calls = calls.clone();
                        let failure = failure.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            let err = failure.lock().unwrap().take().unwrap();
                            Err::<(), _>(err)
                        }
                    },
                )
                .await
                .unwrap_err();

            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert!(!matches!(err, DbError::PersistenceExhausted { .. }));
        }
    }

    #[tokio::test]
    async fn test_storage_unavailable_is_retried() {
        let persister = setup(2).await;
        let calls = Arc::new(AtomicU32::new(0));

        let saved = persister
            .save_coded(
                &SeriesConfig::salary(),
                |code| code,
                |code: String| {
                    let calls = calls.clone();
                    async move {
                        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err(DbError::StorageUnavailable("database is locked".to_string()))
                        } else {
                            Ok(code)
                        }
                    }
                },
            )
            .await
            .unwrap();

        assert_eq!(saved, "SA24000002");
    }

    #[tokio::test]
    async fn test_generation_errors_are_not_retried() {
        let persister = setup(5).await;
        let generated = Arc::new(AtomicU32::new(0));

        let err = persister
            .save(
                &SeriesConfig::purchase(),
                || {
                    let generated = generated.clone();
                    async move {
                        generated.fetch_add(1, Ordering::SeqCst);
                        Err::<String, _>(DbError::from(tally_core::CoreError::CodeSpaceExhausted {
                            series: "purchase".to_string(),
                            period: "2024".to_string(),
                            value: 1_000_000,
                            digits: 6,
                        }))
                    }
                },
                |code: String| async move { Ok::<_, DbError>(code) },
            )
            .await
            .unwrap_err();

        assert!(err.is_code_space_exhausted());
        assert_eq!(generated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_budget_has_a_floor() {
        let persister = setup(0).await;
        assert_eq!(persister.max_attempts(), 1);
    }
}
