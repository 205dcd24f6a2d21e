pub mod commands;
pub mod utils;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgStore, Store};

#[derive(Parser)]
#[command(name = "dapi")]
#[command(about = "dapi - package index for daps")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the web server")]
    Serve {
        #[arg(long, help = "Keep everything in memory instead of PostgreSQL")]
        memory: bool,
    },

    #[command(about = "Apply the database migrations")]
    Migrate,

    #[command(about = "User management")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },

    #[command(about = "Issue a session token usable as a Bearer token")]
    Token {
        #[arg(help = "Username")]
        username: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// PostgreSQL store from the configured DATABASE_URL
pub async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    let pool = DatabaseManager::connect(&config.database).await?;
    Ok(Arc::new(PgStore::new(pool)))
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Serve { memory } => commands::serve::handle(config, memory).await,
        Commands::Migrate => commands::migrate::handle(config, output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, config, output_format).await,
        Commands::Token { username } => {
            commands::token::handle(username, config, output_format).await
        }
    }
}
