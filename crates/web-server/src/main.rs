// This main function is the entry point when running `cargo run -p web-server`.
// It loads settings, starts logging and hands over to `run_server`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = configuration::load_config()?;
    let _guard = configuration::init_tracing(&settings.logging.level)?;
    web_server::run_server(settings).await
}
