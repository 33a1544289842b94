//! Bundle commands.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use modelhub_api::{Bundle, BundleDraft};

use super::{print_ack, progress, Context};

#[derive(Subcommand)]
pub(crate) enum BundlesCommand {
    /// List bundles
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a bundle's profiles and workflows
    Show {
        /// Bundle id
        id: String,
    },

    /// Install one or more profiles of a bundle and follow progress
    Install {
        /// Bundle id
        id: String,
        /// Profile to install (repeatable)
        #[arg(short, long = "profile", required = true)]
        profiles: Vec<String>,
        /// Start the installation and return immediately
        #[arg(long)]
        detach: bool,
    },

    /// Uninstall profiles of a bundle
    Uninstall {
        /// Bundle id
        id: String,
        /// Profile to uninstall (repeatable)
        #[arg(short, long = "profile", required = true)]
        profiles: Vec<String>,
    },

    /// List installed bundles
    Installed,

    /// Create a bundle from a JSON definition
    Create {
        /// JSON file with name, description, version, profiles, workflows
        file: PathBuf,
    },

    /// Replace a bundle's definition from a JSON file
    Update {
        /// Bundle id
        id: String,
        /// JSON file with the new definition
        file: PathBuf,
    },

    /// Delete a bundle
    Delete {
        /// Bundle id
        id: String,
    },

    /// Upload a bundle archive (.zip)
    Upload {
        /// Archive to upload
        file: PathBuf,
    },

    /// Export a bundle as a .zip archive
    Export {
        /// Bundle id
        id: String,
        /// Output file (default: <id>.zip)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub(crate) async fn run(ctx: &Context, command: BundlesCommand) -> miette::Result<()> {
    match command {
        BundlesCommand::List { json } => list(ctx, json).await,
        BundlesCommand::Show { id } => show(ctx, &id).await,
        BundlesCommand::Install {
            id,
            profiles,
            detach,
        } => install(ctx, &id, &profiles, detach).await,
        BundlesCommand::Uninstall { id, profiles } => {
            for profile in &profiles {
                let ack = ctx
                    .client
                    .uninstall_bundle(&id, profile)
                    .await
                    .map_err(|e| miette::miette!("Failed to uninstall '{}': {}", profile, e))?;
                print_ack(&ack, &format!("Uninstalled profile '{}'.", profile));
            }
            Ok(())
        }
        BundlesCommand::Installed => installed(ctx).await,
        BundlesCommand::Create { file } => {
            let draft = read_draft(&file)?;
            let bundle = ctx
                .client
                .create_bundle(&draft)
                .await
                .map_err(|e| miette::miette!("Failed to create bundle: {}", e))?;
            println!("Created bundle '{}' ({})", bundle.name, bundle.id);
            Ok(())
        }
        BundlesCommand::Update { id, file } => {
            let draft = read_draft(&file)?;
            let bundle = ctx
                .client
                .update_bundle(&id, &draft)
                .await
                .map_err(|e| miette::miette!("Failed to update bundle: {}", e))?;
            println!("Updated bundle '{}' ({})", bundle.name, bundle.id);
            Ok(())
        }
        BundlesCommand::Delete { id } => {
            let ack = ctx
                .client
                .delete_bundle(&id)
                .await
                .map_err(|e| miette::miette!("Failed to delete bundle: {}", e))?;
            print_ack(&ack, "Bundle deleted.");
            Ok(())
        }
        BundlesCommand::Upload { file } => {
            if !file.exists() {
                return Err(miette::miette!("File not found: {}", file.display()));
            }
            let bundle = ctx
                .client
                .upload_bundle(&file)
                .await
                .map_err(|e| miette::miette!("Failed to upload bundle: {}", e))?;
            println!("Uploaded bundle '{}' ({})", bundle.name, bundle.id);
            Ok(())
        }
        BundlesCommand::Export { id, output } => {
            let bytes = ctx
                .client
                .export_bundle(&id)
                .await
                .map_err(|e| miette::miette!("Failed to export bundle: {}", e))?;
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{}.zip", id)));
            fs::write(&output, &bytes)
                .map_err(|e| miette::miette!("Failed to write {}: {}", output.display(), e))?;
            println!("Exported {} bytes to {}", bytes.len(), output.display());
            Ok(())
        }
    }
}

async fn list(ctx: &Context, json: bool) -> miette::Result<()> {
    let bundles = ctx
        .client
        .list_bundles()
        .await
        .map_err(|e| miette::miette!("Failed to list bundles: {}", e))?;

    if json {
        let out = serde_json::to_string_pretty(&bundles)
            .map_err(|e| miette::miette!("Failed to serialize bundles: {}", e))?;
        println!("{}", out);
        return Ok(());
    }

    if bundles.is_empty() {
        println!("No bundles found.");
        return Ok(());
    }

    for bundle in &bundles {
        let profiles: Vec<&str> = bundle.profiles.iter().map(|p| p.name.as_str()).collect();
        println!("{:<24} {:<32} [{}]", bundle.id, bundle.name, profiles.join(", "));
    }
    Ok(())
}

async fn show(ctx: &Context, id: &str) -> miette::Result<()> {
    let bundle = match ctx.client.get_bundle(id).await {
        Ok(bundle) => bundle,
        Err(e) if e.is_not_found() => {
            return Err(miette::miette!("No bundle with id '{}'", id));
        }
        Err(e) => return Err(miette::miette!("Failed to load bundle: {}", e)),
    };
    print_bundle(&bundle);
    Ok(())
}

fn print_bundle(bundle: &Bundle) {
    println!("{} ({})", bundle.name, bundle.id);
    if let Some(version) = &bundle.version {
        println!("Version: {}", version);
    }
    if let Some(description) = &bundle.description {
        println!("{}", description);
    }
    println!();

    println!("Profiles:");
    for profile in &bundle.profiles {
        match &profile.description {
            Some(description) => println!("  {} - {}", profile.name, description),
            None => println!("  {}", profile.name),
        }
        for model in &profile.models {
            println!("    - {}", model);
        }
    }

    if !bundle.workflows.is_empty() {
        println!();
        println!("Workflows:");
        for workflow in &bundle.workflows {
            println!("  - {}", workflow);
        }
    }
}

async fn install(
    ctx: &Context,
    id: &str,
    profiles: &[String],
    detach: bool,
) -> miette::Result<()> {
    let bundle = ctx
        .client
        .get_bundle(id)
        .await
        .map_err(|e| miette::miette!("Failed to load bundle: {}", e))?;

    let unknown: Vec<&str> = profiles
        .iter()
        .filter(|p| bundle.profile(p).is_none())
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(miette::miette!(
            "Bundle '{}' has no profile(s): {}",
            id,
            unknown.join(", ")
        ));
    }

    if detach {
        for profile in profiles {
            let ack = ctx
                .client
                .install_bundle(id, profile)
                .await
                .map_err(|e| miette::miette!("Failed to install '{}': {}", profile, e))?;
            print_ack(&ack, &format!("Installing profile '{}'.", profile));
        }
        return Ok(());
    }

    let tracker = ctx.tracker();
    let tracking_id = tracker
        .start_installation(id, &bundle.name, profiles)
        .await
        .map_err(|e| miette::miette!("Failed to start installation: {}", e))?;

    let entries = progress::watch(&tracker, &[tracking_id]).await?;
    progress::summarize(&entries)
}

async fn installed(ctx: &Context) -> miette::Result<()> {
    let installed = ctx
        .client
        .installed_bundles()
        .await
        .map_err(|e| miette::miette!("Failed to list installed bundles: {}", e))?;

    if installed.is_empty() {
        println!("No bundles installed.");
        return Ok(());
    }

    for bundle in &installed {
        println!("{:<24} [{}]", bundle.bundle_id, bundle.profiles.join(", "));
    }
    Ok(())
}

fn read_draft(path: &Path) -> miette::Result<BundleDraft> {
    let source = fs::read_to_string(path)
        .map_err(|e| miette::miette!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&source)
        .map_err(|e| miette::miette!("Invalid bundle definition in {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_draft_defaults_missing_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        fs::write(&path, r#"{"name": "SDXL Starter", "version": "1.0"}"#).unwrap();

        let draft = read_draft(&path).unwrap();
        assert_eq!(draft.name, "SDXL Starter");
        assert!(draft.profiles.is_empty());
        assert!(draft.workflows.is_empty());
    }

    #[test]
    fn test_read_draft_reports_path() {
        let err = read_draft(Path::new("/nonexistent/bundle.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/bundle.json"));
    }
}
