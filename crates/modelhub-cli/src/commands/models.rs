//! Model management commands.

use clap::Subcommand;
use modelhub_api::TokenConfig;

use super::{format_size, print_ack, progress, Context};

#[derive(Subcommand)]
pub(crate) enum ModelsCommand {
    /// List models known to the backend
    List {
        /// Filter by name
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a model and show its progress
    Download {
        /// Model id
        id: String,
        /// Display name (default: looked up in the catalog)
        #[arg(long)]
        name: Option<String>,
        /// Start the download and return immediately
        #[arg(long)]
        detach: bool,
    },

    /// Delete an installed model
    Delete {
        /// Model id
        id: String,
    },

    /// Stop a running download
    Stop {
        /// Model id
        id: String,
    },

    /// Show or set third-party access tokens
    Tokens {
        /// Hugging Face access token
        #[arg(long)]
        huggingface: Option<String>,
        /// Civitai API key
        #[arg(long)]
        civitai: Option<String>,
    },
}

pub(crate) async fn run(ctx: &Context, command: ModelsCommand) -> miette::Result<()> {
    match command {
        ModelsCommand::List { search, json } => list(ctx, search.as_deref(), json).await,
        ModelsCommand::Download { id, name, detach } => {
            download(ctx, &id, name.as_deref(), detach).await
        }
        ModelsCommand::Delete { id } => {
            let ack = ctx
                .client
                .delete_model(&id)
                .await
                .map_err(|e| miette::miette!("Failed to delete model: {}", e))?;
            print_ack(&ack, "Model deleted.");
            Ok(())
        }
        ModelsCommand::Stop { id } => {
            let response = ctx
                .client
                .stop_download(&id)
                .await
                .map_err(|e| miette::miette!("Failed to stop download: {}", e))?;
            let default = if response.success {
                "Download stopped."
            } else {
                "Backend did not confirm the stop."
            };
            println!("{}", response.message.as_deref().unwrap_or(default));
            Ok(())
        }
        ModelsCommand::Tokens {
            huggingface,
            civitai,
        } => tokens(ctx, huggingface, civitai).await,
    }
}

async fn list(ctx: &Context, search: Option<&str>, json: bool) -> miette::Result<()> {
    let models = ctx
        .client
        .list_models(search)
        .await
        .map_err(|e| miette::miette!("Failed to list models: {}", e))?;

    if json {
        let out = serde_json::to_string_pretty(&models)
            .map_err(|e| miette::miette!("Failed to serialize models: {}", e))?;
        println!("{}", out);
        return Ok(());
    }

    if models.is_empty() {
        println!("No models found.");
        return Ok(());
    }

    for model in &models {
        let marker = if model.installed { "*" } else { " " };
        let size = model.size.map(format_size).unwrap_or_default();
        println!(
            "{} {:<32} {:<12} {:>10}  {}",
            marker, model.id, model.model_type, size, model.name
        );
    }
    println!();
    println!("{} model(s), * = installed", models.len());

    Ok(())
}

async fn download(
    ctx: &Context,
    id: &str,
    name: Option<&str>,
    detach: bool,
) -> miette::Result<()> {
    if detach {
        let ack = ctx
            .client
            .download_model(id)
            .await
            .map_err(|e| miette::miette!("Failed to start download: {}", e))?;
        print_ack(&ack, "Download started.");
        return Ok(());
    }

    let name = match name {
        Some(name) => name.to_string(),
        None => ctx
            .client
            .list_models(None)
            .await
            .ok()
            .and_then(|models| models.into_iter().find(|m| m.id == id))
            .map(|m| m.name)
            .unwrap_or_else(|| id.to_string()),
    };

    let tracker = ctx.tracker();
    let tracking_id = tracker
        .start_model_download(id, &name)
        .await
        .map_err(|e| miette::miette!("Failed to start download: {}", e))?;

    let entries = progress::watch(&tracker, &[tracking_id]).await?;
    progress::summarize(&entries)
}

async fn tokens(
    ctx: &Context,
    huggingface: Option<String>,
    civitai: Option<String>,
) -> miette::Result<()> {
    if huggingface.is_none() && civitai.is_none() {
        let config = ctx
            .client
            .token_config()
            .await
            .map_err(|e| miette::miette!("Failed to read tokens: {}", e))?;
        println!("Hugging Face: {}", mask(config.huggingface_token.as_deref()));
        println!("Civitai:      {}", mask(config.civitai_token.as_deref()));
        return Ok(());
    }

    let ack = ctx
        .client
        .set_token_config(&TokenConfig {
            huggingface_token: huggingface,
            civitai_token: civitai,
        })
        .await
        .map_err(|e| miette::miette!("Failed to save tokens: {}", e))?;
    print_ack(&ack, "Tokens saved.");
    Ok(())
}

/// Show only the last four characters of a secret.
fn mask(token: Option<&str>) -> String {
    match token {
        None | Some("") => "(not set)".to_string(),
        Some(t) if t.chars().count() <= 4 => "****".to_string(),
        Some(t) => {
            let skip = t.chars().count() - 4;
            let tail: String = t.chars().skip(skip).collect();
            format!("****{}", tail)
        }
    }
}
