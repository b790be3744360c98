use crate::{error::AppError, AppState};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use core_types::{DateRange, Series};
use serde_json::json;
use std::sync::Arc;

type RangeQuery = Result<Query<DateRange>, QueryRejection>;

/// # GET /
/// Liveness endpoint. Never touches the database.
pub async fn hello_world() -> impl IntoResponse {
    Json(json!({ "message": "Hello World" }))
}

/// # GET /api/real-gdp
pub async fn get_real_gdp(
    State(state): State<Arc<AppState>>,
    query: RangeQuery,
) -> Result<Response, AppError> {
    fetch(&state, Series::RealGdp, query).await
}

/// # GET /api/real-gdp-per-capita
pub async fn get_real_gdp_per_capita(
    State(state): State<Arc<AppState>>,
    query: RangeQuery,
) -> Result<Response, AppError> {
    fetch(&state, Series::RealGdpPerCapita, query).await
}

/// # GET /api/federal-funds-effective-rate
pub async fn get_federal_funds_effective_rate(
    State(state): State<Arc<AppState>>,
    query: RangeQuery,
) -> Result<Response, AppError> {
    fetch(&state, Series::FederalFundsEffectiveRate, query).await
}

/// # GET /api/labor-force-participation-rate
pub async fn get_labor_force_participation_rate(
    State(state): State<Arc<AppState>>,
    query: RangeQuery,
) -> Result<Response, AppError> {
    fetch(&state, Series::LaborForceParticipationRate, query).await
}

/// # GET /api/unemployment-rate
pub async fn get_unemployment_rate(
    State(state): State<Arc<AppState>>,
    query: RangeQuery,
) -> Result<Response, AppError> {
    fetch(&state, Series::UnemploymentRate, query).await
}

/// # GET /api/mean-unemployment-rate
/// Always a one-element array; the mean is `null` when no rows matched.
pub async fn get_mean_unemployment_rate(
    State(state): State<Arc<AppState>>,
    query: RangeQuery,
) -> Result<Response, AppError> {
    fetch(&state, Series::MeanUnemploymentRate, query).await
}

/// # GET /api/real-median-personal-income
pub async fn get_real_median_personal_income(
    State(state): State<Arc<AppState>>,
    query: RangeQuery,
) -> Result<Response, AppError> {
    fetch(&state, Series::RealMedianPersonalIncome, query).await
}

/// Fallback for every path outside the route table.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

/// Shared body of the series handlers: run the accessor and encode the rows
/// as a JSON array. An empty result is still a 200 with `[]`.
async fn fetch(state: &AppState, series: Series, query: RangeQuery) -> Result<Response, AppError> {
    let Query(range) = query.map_err(|rejection| AppError::InvalidQuery {
        series,
        reason: rejection.body_text(),
    })?;

    let rows = state
        .series
        .fetch_series(series, &range)
        .await
        .map_err(|source| AppError::Database { series, source })?;

    let body = serde_json::to_vec(&rows)
        .map_err(|source| AppError::Serialization { series, source })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response())
}
