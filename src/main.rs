use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use core_types::{DateRange, ResultSet, Series};
use database::{DbRepository, QueryOptions};
use tokio_util::sync::CancellationToken;

/// The main entry point for the fred-data application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = configuration::load_config().context("Failed to load configuration")?;
    let _guard = configuration::init_tracing(&settings.logging.level)?;

    match cli.command {
        Commands::Serve(args) => {
            if let Some(port) = args.port {
                settings.server.port = port;
            }
            web_server::run_server(settings).await
        }
        Commands::Fetch(args) => handle_fetch(args, settings).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Serves FRED economic time-series from the analytical database.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Query one series and print it.
    Fetch(FetchArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Overrides the configured listening port.
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Parser)]
struct FetchArgs {
    /// The series to query (e.g. "unemployment-rate").
    series: Series,

    /// The first date of the range (format: YYYY-MM-DD).
    #[arg(long)]
    from: NaiveDate,

    /// The last date of the range, inclusive (format: YYYY-MM-DD).
    #[arg(long)]
    to: NaiveDate,

    /// Stop after this many rows. 0 means unlimited.
    #[arg(long, default_value_t = 0)]
    max_rows: usize,

    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

// ==============================================================================
// Fetch Command Logic
// ==============================================================================

/// Runs a single series query. Ctrl-C cancels the query in flight.
async fn handle_fetch(args: FetchArgs, settings: configuration::Settings) -> anyhow::Result<()> {
    let pool = database::connect(&settings.database).await?;
    let db_repo = DbRepository::new(pool.clone());

    let token = CancellationToken::new();
    let watcher = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling query.");
                token.cancel();
            }
        })
    };

    let options = QueryOptions::default()
        .with_max_rows(args.max_rows)
        .with_logging(settings.database.log_queries)
        .cancellable(token);
    let range = DateRange::new(args.from.to_string(), args.to.to_string());
    let result = db_repo.get_series(args.series, &range, &options).await;

    watcher.abort();
    database::close(&pool).await;

    let rows = result.with_context(|| format!("Failed to fetch {} data", args.series.label()))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{}", render_table(args.series, &rows));
    }
    Ok(())
}

/// Renders a result set as a terminal table, headed by the series' columns.
fn render_table(series: Series, rows: &ResultSet) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);

    match rows.columns() {
        Some(columns) => table.set_header(columns.to_vec()),
        None => table.set_header(series.output_columns().to_vec()),
    };
    for row in rows.iter() {
        table.add_row(row.values().iter().map(ToString::to_string).collect::<Vec<_>>());
    }
    table
}
