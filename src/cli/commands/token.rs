use anyhow::Context;
use serde_json::json;

use crate::auth::issue_session;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub async fn handle(username: String, config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = crate::cli::open_store(&config).await?;
    let user = store
        .user_by_username(&username)
        .await?
        .with_context(|| format!("User '{}' not found", username))?;
    let token = issue_session(&config.security, &user)
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    match output_format {
        OutputFormat::Json => output_success(
            &output_format,
            &format!("Session token for {}", username),
            Some(json!({ "token": token, "expires_in_hours": config.security.session_expiry_hours })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
