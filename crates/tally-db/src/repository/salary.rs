//! # Salary Repository
//!
//! Salary payments: coded like the other documents, but a single row with
//! no lines and no stock movement.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::persister::RetryingPersister;
use tally_core::validation::validate_new_salary;
use tally_core::{NewSalary, Salary, SeriesConfig};

/// Repository for salary database operations.
#[derive(Debug, Clone)]
pub struct SalaryRepository {
    pool: SqlitePool,
    persister: RetryingPersister,
    series: SeriesConfig,
}

impl SalaryRepository {
    /// Creates a new SalaryRepository.
    pub fn new(pool: SqlitePool, persister: RetryingPersister) -> Self {
        SalaryRepository {
            pool,
            persister,
            series: SeriesConfig::salary(),
        }
    }

    /// Records a salary payment under the next `SA` code.
    pub async fn create(&self, new_salary: NewSalary) -> DbResult<Salary> {
        validate_new_salary(&new_salary)?;

        let now = Utc::now();
        let pool = self.pool.clone();

        let salary = self
            .persister
            .save_coded(
                &self.series,
                |code| Salary {
                    id: Uuid::new_v4().to_string(),
                    code,
                    employee: new_salary.employee.trim().to_string(),
                    date: new_salary.date,
                    amount_cents: new_salary.amount_cents,
                    description: new_salary.description.clone(),
                    created_at: now,
                },
                move |salary| {
                    let pool = pool.clone();
                    async move { insert(&pool, salary).await }
                },
            )
            .await?;

        info!(id = %salary.id, code = %salary.code, "Salary recorded");
        Ok(salary)
    }

    /// Gets a salary payment by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Salary>> {
        let salary = sqlx::query_as::<_, Salary>(
            r#"
            SELECT id, code, employee, date, amount_cents, description, created_at
            FROM salary
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(salary)
    }

    /// Payments recorded at or after `since`.
    pub async fn count_created_since(&self, since: DateTime<Utc>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM salary WHERE julianday(created_at) >= julianday(?1)",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

async fn insert(pool: &SqlitePool, salary: Salary) -> DbResult<Salary> {
    sqlx::query(
        r#"
        INSERT INTO salary (id, code, employee, date, amount_cents, description, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&salary.id)
    .bind(&salary.code)
    .bind(&salary.employee)
    .bind(salary.date)
    .bind(salary.amount_cents)
    .bind(&salary.description)
    .bind(salary.created_at)
    .execute(pool)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &salary.code),
        other => other,
    })?;

    Ok(salary)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;

    fn payment(amount_cents: i64) -> NewSalary {
        NewSalary {
            employee: "E-0042".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            amount_cents,
            description: Some("May".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.salaries();

        let first = repo.create(payment(250_000)).await.unwrap();
        let second = repo.create(payment(250_000)).await.unwrap();

        assert!(first.code.starts_with("SA"));
        assert_ne!(first.code, second.code);

        let loaded = repo.get(&first.id).await.unwrap().unwrap();
        assert_eq!(loaded.code, first.code);
        assert_eq!(loaded.amount_cents, 250_000);
        assert_eq!(
            repo.count_created_since(Utc::now() - chrono::Duration::minutes(1))
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_skips_code_taken_by_another_writer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.salaries();

        // Another writer inserted the next code without going through the counter
        let period = tally_core::Period::current(&SeriesConfig::salary(), Utc::now());
        let taken = tally_core::series::format_code(&SeriesConfig::salary(), &period, 1).unwrap();
        sqlx::query(
            "INSERT INTO salary (id, code, employee, date, amount_cents, created_at)
             VALUES ('external', ?1, 'E-1', '2024-01-31', 100, '2024-01-31T00:00:00Z')",
        )
        .bind(&taken)
        .execute(db.pool())
        .await
        .unwrap();

        let saved = repo.create(payment(1000)).await.unwrap();
        let expected = tally_core::series::format_code(&SeriesConfig::salary(), &period, 2).unwrap();
        assert_eq!(saved.code, expected);
    }

    #[tokio::test]
    async fn test_invalid_amount_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.salaries().create(payment(0)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(_)));
    }
}
