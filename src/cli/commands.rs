use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tagwright::protocol::ChatMode;
use tagwright::workflow::WorkflowStep;

/// `tagwright` - offline tools for the streaming tag protocol.
#[derive(Parser, Debug)]
#[command(name = "tagwright")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect tag-protocol responses and manage build workflows.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a saved response and print a JSON report
    Audit {
        /// File holding the response text
        file: PathBuf,

        /// Chat mode the response was produced in (build, ask, agent)
        #[arg(long, default_value = "build")]
        mode: ChatMode,

        /// Workflow step active for the response
        #[arg(long)]
        step: Option<WorkflowStep>,
    },

    /// Print the directives found in a response as JSON
    Parse {
        /// File holding the response text
        file: PathBuf,
    },

    /// Inspect or drive a conversation's workflow
    Workflow {
        #[command(subcommand)]
        workflow_command: WorkflowCommands,
    },

    /// Show the effective configuration
    Status,
}

#[derive(Subcommand, Debug)]
pub enum WorkflowCommands {
    /// Print the current state
    Show {
        #[arg(long)]
        chat: String,
    },
    /// Start at the first step (a new conversation id is generated when omitted)
    Start {
        #[arg(long)]
        chat: Option<String>,
    },
    /// Move to the next step
    Advance {
        #[arg(long)]
        chat: String,
    },
    /// Return to idle
    Stop {
        #[arg(long)]
        chat: String,
    },
    /// Jump to a step, repairing an unreadable state
    Force {
        step: WorkflowStep,
        #[arg(long)]
        chat: String,
    },
}
