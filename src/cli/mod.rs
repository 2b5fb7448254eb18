//! Command-line interface for tracker
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in submodules.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::task::{Status, TaskId, TaskKind};

mod item;
mod serve;
mod view;

/// tracker - personal task tracker
///
/// Keeps tasks, epics and their subtasks in a flat file, rejects
/// overlapping schedules, and remembers what you looked at last.
#[derive(Parser, Debug)]
#[command(name = "tracker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file (defaults to ./.tracker.toml)
    #[arg(long, global = true, env = "TRACKER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the data file (overrides storage.data_file)
    #[arg(long, global = true, env = "TRACKER_DATA")]
    pub data: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Manage plain tasks
    #[command(subcommand)]
    Task(ItemCommands),

    /// Manage epics
    #[command(subcommand)]
    Epic(ItemCommands),

    /// Manage subtasks
    #[command(subcommand)]
    Subtask(ItemCommands),

    /// Show recently viewed items, oldest first
    History,

    /// Show scheduled items in start order
    Prioritized,
}

/// Subcommands shared by task, epic and subtask
#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Create a new item
    Add {
        /// Item name
        name: String,

        /// Item description
        #[arg(long)]
        description: String,

        /// Status: new, in-progress, done (tasks and subtasks)
        #[arg(long)]
        status: Option<Status>,

        /// Start time, "dd.MM.yyyy HH:mm"
        #[arg(long)]
        start: Option<String>,

        /// Duration in minutes
        #[arg(long)]
        duration: Option<u32>,

        /// Owning epic id (subtasks)
        #[arg(long)]
        epic: Option<TaskId>,
    },

    /// Change fields of an existing item
    Update {
        /// Item id
        id: TaskId,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        status: Option<Status>,

        /// Start time, "dd.MM.yyyy HH:mm"
        #[arg(long)]
        start: Option<String>,

        /// Duration in minutes
        #[arg(long)]
        duration: Option<u32>,

        /// Move a subtask to another epic
        #[arg(long)]
        epic: Option<TaskId>,

        /// Drop start time and duration
        #[arg(long, conflicts_with_all = ["start", "duration"])]
        clear_schedule: bool,
    },

    /// Show one item (recorded in history)
    Show {
        /// Item id
        id: TaskId,
    },

    /// List all items of this kind
    List,

    /// Remove one item
    Rm {
        /// Item id
        id: TaskId,
    },

    /// Remove every item of this kind
    Clear,

    /// List the subtasks of an epic
    Subtasks {
        /// Epic id
        id: TaskId,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let mut config = Config::resolve(self.config.as_deref())?;
        if let Some(data) = self.data {
            config.storage.data_file = data;
            config.validate()?;
        }
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Serve { bind } => serve::run(serve::ServeOptions { config, bind }),
            Commands::Task(cmd) => item::run(TaskKind::Task, cmd, config, output),
            Commands::Epic(cmd) => item::run(TaskKind::Epic, cmd, config, output),
            Commands::Subtask(cmd) => item::run(TaskKind::Subtask, cmd, config, output),
            Commands::History => view::run_history(view::ViewOptions { config, output }),
            Commands::Prioritized => view::run_prioritized(view::ViewOptions { config, output }),
        }
    }
}
