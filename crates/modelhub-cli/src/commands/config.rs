//! Backend settings commands.

use clap::Subcommand;
use modelhub_api::CredentialsChange;

use super::{print_ack, Context};

#[derive(Subcommand)]
pub(crate) enum ConfigCommand {
    /// Show or set the backend's base directory
    BaseDir {
        /// New base directory
        path: Option<String>,
    },

    /// Change the backend login credentials
    Credentials {
        /// Current password
        #[arg(long)]
        current: String,
        /// New username
        #[arg(long)]
        username: Option<String>,
        /// New password
        #[arg(long)]
        password: Option<String>,
    },

    /// Show the client configuration in use
    Show,
}

pub(crate) async fn run(ctx: &Context, command: ConfigCommand) -> miette::Result<()> {
    match command {
        ConfigCommand::BaseDir { path: None } => {
            let config = ctx
                .client
                .base_dir()
                .await
                .map_err(|e| miette::miette!("Failed to read base directory: {}", e))?;
            println!("{}", config.base_dir);
            Ok(())
        }
        ConfigCommand::BaseDir { path: Some(path) } => {
            let config = ctx
                .client
                .set_base_dir(&path)
                .await
                .map_err(|e| miette::miette!("Failed to set base directory: {}", e))?;
            println!("Base directory set to {}", config.base_dir);
            Ok(())
        }
        ConfigCommand::Credentials {
            current,
            username,
            password,
        } => {
            if username.is_none() && password.is_none() {
                return Err(miette::miette!("Nothing to change: pass --username or --password"));
            }
            let ack = ctx
                .client
                .change_credentials(&CredentialsChange {
                    current_password: current,
                    new_username: username,
                    new_password: password,
                })
                .await
                .map_err(|e| miette::miette!("Failed to change credentials: {}", e))?;
            print_ack(&ack, "Credentials updated.");
            Ok(())
        }
        ConfigCommand::Show => {
            println!("Backend:        {}", ctx.client.base_url());
            println!("Data directory: {}", ctx.data_dir.display());
            let auth = if ctx.client.tokens().get().is_some() {
                "token stored"
            } else {
                "not logged in"
            };
            println!("Auth:           {}", auth);
            Ok(())
        }
    }
}
