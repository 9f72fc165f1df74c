//! Command-line interface for the demo binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::autopilot::{ExecutionLogEntry, RunReport};
use crate::planner::PlanMode;

#[derive(Parser)]
#[command(name = "draft-pilot", about = "Goal-directed writing autopilot", version)]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to an engine config TOML file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the autopilot against the demo backend until termination.
    Run {
        /// Working title of the project.
        #[arg(long, default_value = "Untitled Draft")]
        title: String,

        /// Number of chapters in the project.
        #[arg(long, default_value_t = 3)]
        chapters: u32,

        /// Planning mode for each cycle.
        #[arg(long, value_enum)]
        mode: Option<PlanMode>,

        /// Iteration cap; overrides the configured default.
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Goal to drive toward.
        #[arg(long, value_enum, default_value_t = GoalArg::Manuscript)]
        goal: GoalArg,

        /// Emit the report and log as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the plan the engine would choose for a fresh project.
    Plan {
        #[arg(long, default_value_t = 3)]
        chapters: u32,

        #[arg(long, value_enum, default_value_t = PlanMode::Hybrid)]
        mode: PlanMode,
    },

    /// List the action catalog for a project.
    Actions {
        #[arg(long, default_value_t = 3)]
        chapters: u32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GoalArg {
    /// Stop when the manuscript is assembled.
    Manuscript,
    /// Stop when every chapter is drafted.
    Chapters,
}

impl std::fmt::Display for GoalArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Manuscript => "manuscript",
            Self::Chapters => "chapters",
        };
        write!(f, "{}", s)
    }
}

/// Plain-text rendering of a finished run.
pub fn print_report(report: &RunReport, entries: &[ExecutionLogEntry]) {
    println!(
        "Run finished: {} ({} cycles, {} actions, {} fallback)",
        report.reason, report.cycles, report.actions_executed, report.fallback_count
    );
    for entry in entries {
        match &entry.action_id {
            Some(id) => println!(
                "  cycle {:>2}  {:<24} {:?} (retries: {})",
                entry.cycle, id, entry.outcome, entry.retries_attempted
            ),
            None => println!("  cycle {:>2}  <plan-only> {:?}", entry.cycle, entry.outcome),
        }
    }
}
