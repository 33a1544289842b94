//! Workflow commands.

use std::path::PathBuf;

use clap::Subcommand;

use super::{format_size, Context};

#[derive(Subcommand)]
pub(crate) enum WorkflowsCommand {
    /// List workflows
    List,

    /// Upload a workflow file
    Upload {
        /// Workflow JSON file
        file: PathBuf,
    },
}

pub(crate) async fn run(ctx: &Context, command: WorkflowsCommand) -> miette::Result<()> {
    match command {
        WorkflowsCommand::List => {
            let workflows = ctx
                .client
                .list_workflows()
                .await
                .map_err(|e| miette::miette!("Failed to list workflows: {}", e))?;

            if workflows.is_empty() {
                println!("No workflows found.");
                return Ok(());
            }
            for workflow in &workflows {
                let size = workflow.size.map(format_size).unwrap_or_default();
                println!("{:<40} {:>10}  {}", workflow.name, size, workflow.path);
            }
            Ok(())
        }
        WorkflowsCommand::Upload { file } => {
            if !file.exists() {
                return Err(miette::miette!("File not found: {}", file.display()));
            }
            let workflow = ctx
                .client
                .upload_workflow(&file)
                .await
                .map_err(|e| miette::miette!("Failed to upload workflow: {}", e))?;
            println!("Uploaded workflow '{}' to {}", workflow.name, workflow.path);
            Ok(())
        }
    }
}
