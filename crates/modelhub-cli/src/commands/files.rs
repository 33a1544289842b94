//! File browser commands.

use std::fs;
use std::path::PathBuf;

use clap::Subcommand;

use super::{format_size, print_ack, Context};

#[derive(Subcommand)]
pub(crate) enum FilesCommand {
    /// List a directory
    Ls {
        /// Directory relative to the base directory
        #[arg(default_value = "")]
        path: String,
    },

    /// Show file or directory properties
    Info {
        path: String,
    },

    /// Create a directory
    Mkdir {
        path: String,
    },

    /// Rename or move a file
    Mv {
        from: String,
        to: String,
    },

    /// Copy a file
    Cp {
        from: String,
        to: String,
    },

    /// Delete a file or directory
    Rm {
        path: String,
    },

    /// Download a file
    Get {
        path: String,
        /// Output file (default: the file's name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a local file into a directory
    Put {
        /// Local file
        local: PathBuf,
        /// Target directory relative to the base directory
        #[arg(default_value = "")]
        dir: String,
    },
}

pub(crate) async fn run(ctx: &Context, command: FilesCommand) -> miette::Result<()> {
    let client = &ctx.client;
    match command {
        FilesCommand::Ls { path } => {
            let entries = client
                .list_files(&path)
                .await
                .map_err(|e| miette::miette!("Failed to list '{}': {}", path, e))?;
            if entries.is_empty() {
                println!("(empty)");
            }
            for entry in &entries {
                if entry.is_dir {
                    println!("{:>10}  {}/", "-", entry.name);
                } else {
                    let size = entry.size.map(format_size).unwrap_or_default();
                    println!("{:>10}  {}", size, entry.name);
                }
            }
            Ok(())
        }
        FilesCommand::Info { path } => {
            let props = client
                .file_properties(&path)
                .await
                .map_err(|e| miette::miette!("Failed to read properties: {}", e))?;
            println!("Path:        {}", props.path);
            println!("Type:        {}", if props.is_dir { "directory" } else { "file" });
            println!("Size:        {}", format_size(props.size));
            let unknown = "-";
            println!("Modified:    {}", props.modified.as_deref().unwrap_or(unknown));
            println!("Created:     {}", props.created.as_deref().unwrap_or(unknown));
            println!("Permissions: {}", props.permissions.as_deref().unwrap_or(unknown));
            Ok(())
        }
        FilesCommand::Mkdir { path } => {
            let ack = client
                .create_directory(&path)
                .await
                .map_err(|e| miette::miette!("Failed to create directory: {}", e))?;
            print_ack(&ack, "Directory created.");
            Ok(())
        }
        FilesCommand::Mv { from, to } => {
            let ack = client
                .rename_file(&from, &to)
                .await
                .map_err(|e| miette::miette!("Failed to rename: {}", e))?;
            print_ack(&ack, "Renamed.");
            Ok(())
        }
        FilesCommand::Cp { from, to } => {
            let ack = client
                .copy_file(&from, &to)
                .await
                .map_err(|e| miette::miette!("Failed to copy: {}", e))?;
            print_ack(&ack, "Copied.");
            Ok(())
        }
        FilesCommand::Rm { path } => {
            let ack = client
                .delete_file(&path)
                .await
                .map_err(|e| miette::miette!("Failed to delete: {}", e))?;
            print_ack(&ack, "Deleted.");
            Ok(())
        }
        FilesCommand::Get { path, output } => {
            let bytes = client
                .download_file(&path)
                .await
                .map_err(|e| miette::miette!("Failed to download '{}': {}", path, e))?;
            let output = output.unwrap_or_else(|| default_output(&path));
            fs::write(&output, &bytes)
                .map_err(|e| miette::miette!("Failed to write {}: {}", output.display(), e))?;
            println!("Saved {} to {}", format_size(bytes.len() as u64), output.display());
            Ok(())
        }
        FilesCommand::Put { local, dir } => {
            if !local.exists() {
                return Err(miette::miette!("File not found: {}", local.display()));
            }
            let entry = client
                .upload_file(&local, &dir)
                .await
                .map_err(|e| miette::miette!("Failed to upload: {}", e))?;
            println!("Uploaded to {}", entry.path);
            Ok(())
        }
    }
}

/// Last path component of a backend path.
fn default_output(remote: &str) -> PathBuf {
    let name = remote
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or("download");
    PathBuf::from(name)
}
