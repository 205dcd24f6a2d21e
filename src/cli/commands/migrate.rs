use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::Store;

pub async fn handle(config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = crate::cli::open_store(&config).await?;
    store.migrate().await?;
    output_success(&output_format, "Database migrations applied", None)
}
