use anyhow::Context;
use axum::{
    error_handling::HandleErrorLayer,
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use configuration::settings::{ServerSettings, Settings};
use core_types::Series;
use database::{DbRepository, QueryOptions, SeriesSource};
use std::sync::Arc;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod error;
pub mod handlers;
pub mod serve;

pub use serve::{serve, ConnectionTimeouts};

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub series: Arc<dyn SeriesSource>,
}

impl AppState {
    pub fn new(series: Arc<dyn SeriesSource>) -> Self {
        Self { series }
    }
}

/// Builds the CORS policy: one origin, credentials allowed.
pub fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin)
        .with_context(|| format!("Invalid CORS origin: {origin}"))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_credentials(true))
}

/// Builds the application router over any `SeriesSource`.
pub fn router(state: Arc<AppState>, settings: &ServerSettings) -> anyhow::Result<Router> {
    let app = Router::new()
        .route("/", get(handlers::hello_world))
        .route(&Series::RealGdp.path(), get(handlers::get_real_gdp))
        .route(&Series::RealGdpPerCapita.path(), get(handlers::get_real_gdp_per_capita))
        .route(
            &Series::FederalFundsEffectiveRate.path(),
            get(handlers::get_federal_funds_effective_rate),
        )
        .route(
            &Series::LaborForceParticipationRate.path(),
            get(handlers::get_labor_force_participation_rate),
        )
        .route(&Series::UnemploymentRate.path(), get(handlers::get_unemployment_rate))
        .route(
            &Series::MeanUnemploymentRate.path(),
            get(handlers::get_mean_unemployment_rate),
        )
        .route(
            &Series::RealMedianPersonalIncome.path(),
            get(handlers::get_real_median_personal_income),
        )
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(cors_layer(&settings.cors_origin)?)
        // A request that outlives the write timeout becomes a plain-text 500.
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(error::handle_timeout))
                .layer(TimeoutLayer::new(settings.request_timeout())),
        )
        // Logs every incoming request and its outcome.
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// Connects to the database and serves the API until Ctrl-C.
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let pool = database::connect(&settings.database).await?;

    let options = QueryOptions::default()
        .with_max_rows(settings.database.max_rows)
        .with_logging(settings.database.log_queries);
    let db_repo = DbRepository::new(pool.clone()).with_options(options);

    let app_state = Arc::new(AppState::new(Arc::new(db_repo)));
    let app = router(app_state, &settings.server)?;

    let addr = settings.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server listening on http://{}", addr);

    let timeouts = ConnectionTimeouts::from(&settings.server);
    serve(listener, app, timeouts, shutdown_signal()).await;

    database::close(&pool).await;
    tracing::info!("Web server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal.");
        // Without a signal handler there is nothing to wait for; keep serving.
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received.");
}
