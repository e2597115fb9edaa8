use crate::app::status::render_status;
use crate::cli::commands::{Cli, Commands, WorkflowCommands};
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::sync::Arc;
use tagwright::Config;
use tagwright::protocol::{DetectionContext, parse_directives, validate_response};
use tagwright::store::SqliteChatStore;
use tagwright::workflow::{WorkflowManager, WorkflowState};
use tracing::info;

fn read_response(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read response file {}", path.display()))
}

fn describe(state: WorkflowState) -> String {
    match state.current_step() {
        Some(step) => format!("active:{step}"),
        None => "idle".to_string(),
    }
}

async fn workflow_manager(config: &Config) -> Result<WorkflowManager> {
    let path = config.database_path();
    let store = SqliteChatStore::connect(&path).await?;
    info!(db = %path.display(), "Opened chat store");
    Ok(WorkflowManager::new(Arc::new(store)))
}

async fn run_workflow(config: &Config, command: WorkflowCommands) -> Result<()> {
    let manager = workflow_manager(config).await?;
    match command {
        WorkflowCommands::Show { chat } => {
            let state = manager
                .state(&chat)
                .await
                .context("Stored workflow state is unreadable; repair it with `workflow force`")?;
            println!("{chat}: {}", describe(state));
        }
        WorkflowCommands::Start { chat } => {
            let chat = chat.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let state = manager.start(&chat).await?;
            println!("{chat}: {}", describe(state));
        }
        WorkflowCommands::Advance { chat } => match manager.advance(&chat).await? {
            Some(step) => println!("{chat}: active:{step}"),
            None => println!("{chat}: idle"),
        },
        WorkflowCommands::Stop { chat } => {
            manager.stop(&chat).await?;
            println!("{chat}: idle");
        }
        WorkflowCommands::Force { step, chat } => {
            let state = manager.force(&chat, step).await?;
            println!("{chat}: {}", describe(state));
        }
    }
    Ok(())
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Audit { file, mode, step } => {
            let text = read_response(&file)?;
            let report = validate_response(&text, &DetectionContext::new(mode, step));
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.accepted {
                bail!(
                    "response rejected: {} critical violation(s)",
                    report.critical().count()
                );
            }
            Ok(())
        }

        Commands::Parse { file } => {
            let text = read_response(&file)?;
            let directives = parse_directives(&text);
            println!("{}", serde_json::to_string_pretty(&directives)?);
            Ok(())
        }

        Commands::Workflow { workflow_command } => run_workflow(&config, workflow_command).await,

        Commands::Status => {
            println!("{}", render_status(&config));
            Ok(())
        }
    }
}
