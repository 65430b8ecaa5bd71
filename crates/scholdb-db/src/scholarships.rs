//! Database operations for the `scholarships` table.

use chrono::{DateTime, NaiveDate, Utc};
use scholdb_core::{DegreeLevel, NormalizedScholarship};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const SCHOLARSHIP_COLUMNS: &str = "id, public_id, name, description, eligibility, \
     application_deadline, degree_level, apply_link, image, source_id, is_active, \
     created_at, updated_at";

/// A row from the `scholarships` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScholarshipRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub description: String,
    pub eligibility: String,
    pub application_deadline: NaiveDate,
    /// Lowercase column value; see [`ScholarshipRow::degree_level`].
    pub degree_level: String,
    pub apply_link: String,
    pub image: String,
    /// Adapter that last wrote the row. `NULL` for rows entered by hand.
    pub source_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScholarshipRow {
    /// Parses the stored `degree_level` column.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidDegreeLevel`] if the column holds a value the
    /// check constraint should have rejected.
    pub fn degree_level(&self) -> Result<DegreeLevel, DbError> {
        Ok(self.degree_level.parse::<DegreeLevel>()?)
    }
}

/// Result of one natural-key upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct UpsertOutcome {
    pub id: i64,
    pub public_id: Uuid,
    /// `true` if a new row was created, `false` if an existing row was updated.
    pub inserted: bool,
}

/// Upserts a scholarship keyed on `name`.
///
/// A new name inserts a row with `created_at = updated_at = NOW()`. An
/// existing name overwrites every ingested field and refreshes `updated_at`,
/// leaving `created_at` and `is_active` untouched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn upsert_scholarship(
    pool: &PgPool,
    scholarship: &NormalizedScholarship,
) -> Result<UpsertOutcome, DbError> {
    // xmax is 0 only on a freshly inserted tuple.
    let outcome = sqlx::query_as::<_, UpsertOutcome>(
        "INSERT INTO scholarships \
             (name, description, eligibility, application_deadline, degree_level, \
              apply_link, image, source_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (name) DO UPDATE SET \
             description          = EXCLUDED.description, \
             eligibility          = EXCLUDED.eligibility, \
             application_deadline = EXCLUDED.application_deadline, \
             degree_level         = EXCLUDED.degree_level, \
             apply_link           = EXCLUDED.apply_link, \
             image                = EXCLUDED.image, \
             source_id            = EXCLUDED.source_id, \
             updated_at           = GREATEST(NOW(), scholarships.created_at) \
         RETURNING id, public_id, (xmax = 0) AS inserted",
    )
    .bind(&scholarship.name)
    .bind(&scholarship.description)
    .bind(&scholarship.eligibility)
    .bind(scholarship.application_deadline)
    .bind(scholarship.degree_level.as_str())
    .bind(&scholarship.apply_link)
    .bind(&scholarship.image)
    .bind(&scholarship.source_id)
    .fetch_one(pool)
    .await?;

    tracing::trace!(
        id = outcome.id,
        name = %scholarship.name,
        inserted = outcome.inserted,
        "scholarship upserted"
    );
    Ok(outcome)
}

/// Lists active scholarships, newest first.
///
/// Ties on `created_at` (rows from the same run) break on `id DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_scholarships(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ScholarshipRow>, DbError> {
    let rows = sqlx::query_as::<_, ScholarshipRow>(&format!(
        "SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships \
         WHERE is_active = true \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches one scholarship by its exact name.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has that name, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_scholarship_by_name(pool: &PgPool, name: &str) -> Result<ScholarshipRow, DbError> {
    sqlx::query_as::<_, ScholarshipRow>(&format!(
        "SELECT {SCHOLARSHIP_COLUMNS} FROM scholarships WHERE name = $1"
    ))
    .bind(name)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Counts every scholarship row, active or not.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_scholarships(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM scholarships")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
