//! Tours repository

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    features::TourQuery,
    models::{CreateTour, MonthlyPlan, Tour, TourStats, UpdateTour},
};

/// Number of busiest months returned by the monthly plan
const PLAN_TOP_MONTHS: i64 = 3;

/// Translate constraint violations into domain errors
fn map_write_error(e: sqlx::Error, name: Option<&str>) -> AppError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return AppError::Conflict(match name {
                Some(name) => format!("A tour named '{}' already exists", name),
                None => "A tour with this name already exists".to_string(),
            });
        }
        if db.is_check_violation() {
            return AppError::Validation(format!(
                "Tour violates constraint {}",
                db.constraint().unwrap_or("check")
            ));
        }
    }
    AppError::Database(e)
}

#[derive(Clone)]
pub struct ToursRepository {
    pool: Pool<Postgres>,
}

impl ToursRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List tours matching the filtered, sorted and paginated query
    pub async fn list(&self, query: &TourQuery) -> AppResult<Vec<Tour>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM tours");
        query.push_sql(&mut builder);

        let rows = builder
            .build_query_as::<Tour>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get tour by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Tour> {
        sqlx::query_as::<_, Tour>("SELECT * FROM tours WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No tour found with id {}", id)))
    }

    /// Create a tour
    pub async fn create(&self, data: &CreateTour) -> AppResult<Tour> {
        sqlx::query_as::<_, Tour>(
            r#"
            INSERT INTO tours (
                id, name, duration, max_group_size, difficulty,
                ratings_average, ratings_quantity, price,
                summary, description, start_dates
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(data.duration)
        .bind(data.max_group_size)
        .bind(data.difficulty)
        .bind(data.ratings_average)
        .bind(data.ratings_quantity)
        .bind(data.price)
        .bind(&data.summary)
        .bind(&data.description)
        .bind(&data.start_dates)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, Some(&data.name)))
    }

    /// Apply a partial update and return the updated tour
    pub async fn update(&self, id: Uuid, data: &UpdateTour) -> AppResult<Tour> {
        if data.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE tours SET ");
        {
            let mut sets = builder.separated(", ");

            macro_rules! set_field {
                ($field:expr, $column:literal) => {
                    if let Some(ref val) = $field {
                        sets.push(concat!($column, " = "))
                            .push_bind_unseparated(val.clone());
                    }
                };
            }

            set_field!(data.name, "name");
            set_field!(data.duration, "duration");
            set_field!(data.max_group_size, "max_group_size");
            set_field!(data.difficulty, "difficulty");
            set_field!(data.ratings_average, "ratings_average");
            set_field!(data.ratings_quantity, "ratings_quantity");
            set_field!(data.price, "price");
            set_field!(data.summary, "summary");
            set_field!(data.description, "description");
            set_field!(data.start_dates, "start_dates");
        }
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");

        builder
            .build_query_as::<Tour>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, data.name.as_deref()))?
            .ok_or_else(|| AppError::NotFound(format!("No tour found with id {}", id)))
    }

    /// Delete a tour; returns whether a row was removed
    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM tours WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Per-difficulty statistics, best rated first
    pub async fn stats(&self) -> AppResult<Vec<TourStats>> {
        let rows = sqlx::query_as::<_, TourStats>(
            r#"
            SELECT UPPER(difficulty::text)            AS difficulty,
                   AVG(ratings_average)::float8       AS avg_rating,
                   AVG(price)::float8                 AS avg_price,
                   MIN(price)::float8                 AS min_price,
                   MAX(price)::float8                 AS max_price,
                   MAX(duration)::int4                AS max_duration,
                   MAX(ratings_average)::float8       AS max_rating,
                   COUNT(*)::bigint                   AS total_tours,
                   COALESCE(SUM(ratings_quantity), 0)::bigint AS total_ratings
            FROM tours
            GROUP BY UPPER(difficulty::text)
            ORDER BY avg_rating DESC, difficulty
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Busiest months of `year` by number of tour starts
    pub async fn monthly_plan(&self, year: i32) -> AppResult<Vec<MonthlyPlan>> {
        let (start, end) = year_bounds(year)?;

        let rows = sqlx::query_as::<_, MonthlyPlan>(
            r#"
            SELECT date_part('month', s.start_date AT TIME ZONE 'UTC')::int4 AS month,
                   COUNT(*)::bigint AS tours_per_month,
                   ARRAY_AGG(t.name ORDER BY s.start_date, t.name) AS tours
            FROM tours t
            LEFT JOIN LATERAL unnest(t.start_dates) AS s(start_date) ON TRUE
            WHERE s.start_date >= $1 AND s.start_date < $2
            GROUP BY 1
            ORDER BY tours_per_month DESC, month
            LIMIT $3
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(PLAN_TOP_MONTHS)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Check the database answers
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Half-open UTC range `[year-01-01, (year+1)-01-01)`
fn year_bounds(year: i32) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start_of = |y: i32| {
        NaiveDate::from_ymd_opt(y, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .ok_or_else(|| AppError::BadRequest(format!("Invalid year: {}", year)))
    };
    let next = year
        .checked_add(1)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid year: {}", year)))?;
    Ok((start_of(year)?, start_of(next)?))
}
