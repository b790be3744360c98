use crate::error::DbError;
use crate::executor::{execute, QueryOptions};
use async_trait::async_trait;
use core_types::{DateRange, ResultSet, Series, SeriesKind};
use sqlx::postgres::PgPool;

/// Anything that can produce a series' result set for a date range.
///
/// The HTTP layer talks to this trait rather than to the pool, so the
/// repository can be swapped for an in-memory source.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    async fn fetch_series(&self, series: Series, range: &DateRange) -> Result<ResultSet, DbError>;
}

/// The fixed statement behind each series.
///
/// Both dates arrive as bound text parameters and are cast server-side; a value
/// the cast cannot parse fails the statement.
pub fn template(series: Series) -> &'static str {
    match series {
        Series::RealGdp => {
            r#"
            SELECT "Date", "GDPC1"
            FROM main.real_gdp
            WHERE "Date" BETWEEN CAST($1 AS DATE) AND CAST($2 AS DATE)
            ORDER BY "Date" ASC
            "#
        }
        Series::RealGdpPerCapita => {
            r#"
            SELECT "Date", "A939RX0Q048SBEA"
            FROM main.real_gdp_per_capita
            WHERE "Date" BETWEEN CAST($1 AS DATE) AND CAST($2 AS DATE)
            ORDER BY "Date" ASC
            "#
        }
        Series::FederalFundsEffectiveRate => {
            r#"
            SELECT "Date", "DFF"
            FROM main.federal_funds_effective_rate
            WHERE "Date" BETWEEN CAST($1 AS DATE) AND CAST($2 AS DATE)
            ORDER BY "Date" ASC
            "#
        }
        Series::LaborForceParticipationRate => {
            r#"
            SELECT "Date", "CIVPART"
            FROM main.labor_force_participation_rate
            WHERE "Date" BETWEEN CAST($1 AS DATE) AND CAST($2 AS DATE)
            ORDER BY "Date" ASC
            "#
        }
        Series::UnemploymentRate => {
            r#"
            SELECT "Date", "UNRATE"
            FROM main.unemployment_rate
            WHERE "Date" BETWEEN CAST($1 AS DATE) AND CAST($2 AS DATE)
            ORDER BY "Date" ASC
            "#
        }
        // AVG over zero rows yields one row holding NULL, never an empty set.
        Series::MeanUnemploymentRate => {
            r#"
            SELECT AVG("UNRATE") AS "MeanUnemploymentRate"
            FROM main.unemployment_rate
            WHERE "Date" BETWEEN CAST($1 AS DATE) AND CAST($2 AS DATE)
            "#
        }
        Series::RealMedianPersonalIncome => {
            r#"
            SELECT "Date", "MEPAINUSA672N"
            FROM main.real_median_personal_income
            WHERE "Date" BETWEEN CAST($1 AS DATE) AND CAST($2 AS DATE)
            ORDER BY "Date" ASC
            "#
        }
    }
}

/// The `DbRepository` provides the series accessors on top of the shared
/// connection pool. Cloning it clones the pool handle, not the connections.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
    options: QueryOptions,
}

impl DbRepository {
    /// Creates a new `DbRepository` with default execution options.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            options: QueryOptions::default(),
        }
    }

    /// Replaces the options applied to every accessor call.
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs one series query with explicit options, e.g. a cancellable one.
    pub async fn get_series(
        &self,
        series: Series,
        range: &DateRange,
        options: &QueryOptions,
    ) -> Result<ResultSet, DbError> {
        let args = [range.start_date.as_str(), range.end_date.as_str()];
        let rows = execute(&self.pool, template(series), &args, options).await?;
        if series.kind() == SeriesKind::Mean && rows.len() != 1 {
            tracing::warn!(series = %series, rows = rows.len(), "Aggregate query did not return exactly one row.");
        }
        tracing::debug!(series = %series, rows = rows.len(), "Series query completed.");
        Ok(rows)
    }

    async fn get(&self, series: Series, start_date: &str, end_date: &str) -> Result<ResultSet, DbError> {
        self.get_series(series, &DateRange::new(start_date, end_date), &self.options)
            .await
    }

    /// Real GDP (`GDPC1`) observations within the range.
    pub async fn get_real_gdp(&self, start_date: &str, end_date: &str) -> Result<ResultSet, DbError> {
        self.get(Series::RealGdp, start_date, end_date).await
    }

    /// Real GDP per capita (`A939RX0Q048SBEA`) observations within the range.
    pub async fn get_real_gdp_per_capita(&self, start_date: &str, end_date: &str) -> Result<ResultSet, DbError> {
        self.get(Series::RealGdpPerCapita, start_date, end_date).await
    }

    /// Federal funds effective rate (`DFF`) observations within the range.
    pub async fn get_federal_funds_effective_rate(&self, start_date: &str, end_date: &str) -> Result<ResultSet, DbError> {
        self.get(Series::FederalFundsEffectiveRate, start_date, end_date).await
    }

    /// Labor force participation rate (`CIVPART`) observations within the range.
    pub async fn get_labor_force_participation_rate(&self, start_date: &str, end_date: &str) -> Result<ResultSet, DbError> {
        self.get(Series::LaborForceParticipationRate, start_date, end_date).await
    }

    /// Unemployment rate (`UNRATE`) observations within the range.
    pub async fn get_unemployment_rate(&self, start_date: &str, end_date: &str) -> Result<ResultSet, DbError> {
        self.get(Series::UnemploymentRate, start_date, end_date).await
    }

    /// The mean `UNRATE` over the range, as a single row whose value is NULL
    /// when nothing matched.
    pub async fn get_mean_unemployment_rate(&self, start_date: &str, end_date: &str) -> Result<ResultSet, DbError> {
        self.get(Series::MeanUnemploymentRate, start_date, end_date).await
    }

    /// Real median personal income (`MEPAINUSA672N`) observations within the range.
    pub async fn get_real_median_personal_income(&self, start_date: &str, end_date: &str) -> Result<ResultSet, DbError> {
        self.get(Series::RealMedianPersonalIncome, start_date, end_date).await
    }
}

#[async_trait]
impl SeriesSource for DbRepository {
    async fn fetch_series(&self, series: Series, range: &DateRange) -> Result<ResultSet, DbError> {
        match series {
            Series::RealGdp => self.get_real_gdp(&range.start_date, &range.end_date).await,
            Series::RealGdpPerCapita => {
                self.get_real_gdp_per_capita(&range.start_date, &range.end_date).await
            }
            Series::FederalFundsEffectiveRate => {
                self.get_federal_funds_effective_rate(&range.start_date, &range.end_date)
                    .await
            }
            Series::LaborForceParticipationRate => {
                self.get_labor_force_participation_rate(&range.start_date, &range.end_date)
                    .await
            }
            Series::UnemploymentRate => {
                self.get_unemployment_rate(&range.start_date, &range.end_date).await
            }
            Series::MeanUnemploymentRate => {
                self.get_mean_unemployment_rate(&range.start_date, &range.end_date).await
            }
            Series::RealMedianPersonalIncome => {
                self.get_real_median_personal_income(&range.start_date, &range.end_date)
                    .await
            }
        }
    }
}
