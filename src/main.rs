use clap::Parser;
use tracing_subscriber::EnvFilter;

use dapi::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SESSION_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dapi=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = dapi::config::config().clone();

    if let Err(e) = dapi::cli::run(cli, config).await {
        match std::env::var("DAPI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }

    Ok(())
}
