use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use draft_pilot::action::ActionRegistry;
use draft_pilot::autopilot::Autopilot;
use draft_pilot::backend::DemoBackend;
use draft_pilot::catalog;
use draft_pilot::cli::{print_report, Cli, Commands, GoalArg};
use draft_pilot::config::EngineConfig;
use draft_pilot::error::Result;
use draft_pilot::executor::Executor;
use draft_pilot::planner::{Planner, PlanMode};
use draft_pilot::state::WorldStore;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("draft_pilot=debug")
    } else {
        EnvFilter::new("draft_pilot=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).await?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Run {
            title,
            chapters,
            mode,
            max_iterations,
            goal,
            json,
        } => {
            cmd_run(&config, &title, chapters, mode, max_iterations, goal, json).await
        }
        Commands::Plan { chapters, mode } => cmd_plan(chapters, mode),
        Commands::Actions { chapters } => cmd_actions(chapters),
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    config: &EngineConfig,
    title: &str,
    chapters: u32,
    mode: Option<PlanMode>,
    max_iterations: Option<u32>,
    goal: GoalArg,
    json: bool,
) -> Result<()> {
    let mode = mode.unwrap_or(config.autopilot.mode);
    let max_iterations = max_iterations.unwrap_or(config.autopilot.max_iterations);
    let goal = match goal {
        GoalArg::Manuscript => catalog::manuscript_goal(),
        GoalArg::Chapters => catalog::chapters_goal(chapters),
    };

    let store = Arc::new(WorldStore::new(catalog::initial_world(title, chapters)));
    let registry = Arc::new(ActionRegistry::with_actions(catalog::writing_actions(
        chapters,
    ))?);
    let backend = Arc::new(DemoBackend::new(config.backend.model.clone()));
    let executor = Arc::new(Executor::new(backend).with_retry(config.retry.to_retry_config()));
    let engine = Autopilot::new(store, registry, executor);

    let report = engine.run(&goal, mode, max_iterations).await?;
    let entries = engine.log().entries();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "report": report,
                "log": entries,
                "world_state": engine.store().snapshot(),
            }))
            .map_err(|e| draft_pilot::error::EngineError::Config(e.to_string()))?
        );
    } else {
        print_report(&report, &entries);
    }
    Ok(())
}

fn cmd_plan(chapters: u32, mode: PlanMode) -> Result<()> {
    let registry = Arc::new(ActionRegistry::with_actions(catalog::writing_actions(
        chapters,
    ))?);
    let planner = Planner::new(registry);
    let state = catalog::initial_world("Untitled Draft", chapters);
    let plan = planner.plan(&state, &catalog::manuscript_goal(), mode);

    println!("{:?}", plan);
    Ok(())
}

fn cmd_actions(chapters: u32) -> Result<()> {
    let registry = ActionRegistry::with_actions(catalog::writing_actions(chapters))?;
    for action in registry.iter() {
        println!(
            "{:<24} cost {:<2} {}",
            action.id(),
            action.cost(),
            if action.is_parallel_safe() {
                "parallel"
            } else {
                "serial"
            }
        );
    }
    Ok(())
}
