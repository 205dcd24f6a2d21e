use anyhow::Context;
use clap::Subcommand;

use crate::cli::utils::{output_success, user_details};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::NewUser;
use crate::services::delete_metadap;
use crate::storage::MediaStorage;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user")]
    Create {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "E-mail address")]
        email: Option<String>,
        #[arg(long, help = "Grant staff rights")]
        staff: bool,
        #[arg(long, help = "Grant superuser rights")]
        superuser: bool,
    },

    #[command(about = "Grant staff and superuser rights")]
    Promote {
        #[arg(help = "Username")]
        username: String,
    },

    #[command(about = "Delete a user with the daps they own")]
    Delete {
        #[arg(help = "Username")]
        username: String,
    },
}

pub async fn handle(cmd: UserCommands, config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = crate::cli::open_store(&config).await?;

    match cmd {
        UserCommands::Create {
            username,
            email,
            staff,
            superuser,
        } => {
            if !crate::forms::user::is_valid_username(&username) {
                anyhow::bail!("'{}' is not a valid username", username);
            }
            let user = store
                .create_user(NewUser {
                    email: email.unwrap_or_default(),
                    is_staff: staff || superuser,
                    is_superuser: superuser,
                    ..NewUser::named(username)
                })
                .await?;
            output_success(
                &output_format,
                &format!("User '{}' created", user.username),
                Some(user_details(&user)),
            )
        }
        UserCommands::Promote { username } => {
            let mut user = store
                .user_by_username(&username)
                .await?
                .with_context(|| format!("User '{}' not found", username))?;
            user.is_staff = true;
            user.is_superuser = true;
            store.update_user(&user).await?;
            output_success(
                &output_format,
                &format!("User '{}' promoted", username),
                Some(user_details(&user)),
            )
        }
        UserCommands::Delete { username } => {
            let user = store
                .user_by_username(&username)
                .await?
                .with_context(|| format!("User '{}' not found", username))?;
            let media = MediaStorage::new(config.storage.media_dir.clone());
            for metadap in store.owned_by(user.id).await? {
                delete_metadap(store.as_ref(), &media, &metadap).await?;
            }
            store.delete_user(user.id).await?;
            output_success(&output_format, &format!("User '{}' deleted", username), None)
        }
    }
}
