//! `rusty-automation-tool` CLI entry-point.
//!
//! Available sub-commands:
//! - `run`      — load and execute an Actfile once.
//! - `validate` — parse and DAG-validate an Actfile without running it.
//! - `serve`    — start the agent HTTP layer for an Actfile.
//! - `resume`   — continue a run from a saved checkpoint.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nodes::registry::RegistryBuilder;
use parser::Workflow;
use tracing::info;
use value::Value;

#[derive(Parser)]
#[command(
    name = "rusty-automation-tool",
    about = "Actfile workflow automation engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load and execute an Actfile once, printing the terminal result.
    Run {
        actfile: PathBuf,
        /// JSON value used as the run's initial input.
        #[arg(long)]
        input: Option<String>,
        /// Parse and DAG-validate only; print the planned order and exit.
        #[arg(long)]
        dry_run: bool,
        /// Directory to write a checkpoint to after the run completes.
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
    /// Parse and DAG-validate an Actfile without executing it.
    Validate { actfile: PathBuf },
    /// Start the agent HTTP layer for an Actfile.
    Serve {
        actfile: PathBuf,
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
    },
    /// Load a checkpoint and continue executing an Actfile from there.
    Resume { actfile: PathBuf, checkpoint: PathBuf },
}

fn build_registry() -> nodes::NodeRegistry {
    let mut builder = RegistryBuilder::new();
    nodes::builtin::register_builtins(&mut builder);
    builder.build()
}

fn load_workflow(path: &PathBuf) -> Result<Workflow> {
    parser::parse_file(path).with_context(|| format!("failed to parse Actfile '{}'", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { actfile, input, dry_run, checkpoint } => {
            let workflow = load_workflow(&actfile)?;
            let registry = build_registry();

            let engine_config = engine::EngineConfig { checkpoint_dir: checkpoint.clone(), ..Default::default() };
            let mut engine = engine::Engine::new(workflow, registry, engine_config)
                .with_context(|| "workflow failed to load into the engine")?;

            if dry_run {
                let order = engine.dry_run()?;
                println!("planned execution order: {order:?}");
                return Ok(());
            }

            let initial_input = match input {
                Some(raw) => serde_json::from_str::<serde_json::Value>(&raw).map(Value::from).context("--input is not valid JSON")?,
                None => Value::Null,
            };

            let mut state = engine::ExecutionState::new(uuid::Uuid::new_v4());
            let result = engine.execute(initial_input, &mut state).await;
            if checkpoint.is_some() {
                engine.save_checkpoint(&mut state, None);
            }
            println!("{}", serde_json::to_string_pretty(&result.to_value())?);
            if matches!(result.outcome, engine::RunOutcome::Error) {
                std::process::exit(1);
            }
        }
        Command::Validate { actfile } => {
            let workflow = load_workflow(&actfile)?;
            match engine::validate_dag(&workflow) {
                Ok(order) => println!("workflow is valid; planned order: {order:?}"),
                Err(e) => {
                    eprintln!("validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Serve { actfile, bind } => {
            let workflow = load_workflow(&actfile)?;
            let registry = build_registry();
            info!("starting agent for '{}' on {bind}", workflow.name);
            let agent = agent::Agent::from_workflow(workflow, registry);
            agent.serve(&bind).await?;
        }
        Command::Resume { actfile, checkpoint } => {
            let workflow = load_workflow(&actfile)?;
            let registry = build_registry();
            let mut engine = engine::Engine::new(workflow, registry, engine::EngineConfig::default())
                .with_context(|| "workflow failed to load into the engine")?;

            let mut state = engine::ExecutionState::new(uuid::Uuid::new_v4());
            engine::Engine::load_checkpoint(&checkpoint, &mut state)
                .with_context(|| format!("failed to load checkpoint '{}'", checkpoint.display()))?;

            let result = engine.execute(Value::Null, &mut state).await;
            println!("{}", serde_json::to_string_pretty(&result.to_value())?);
            if matches!(result.outcome, engine::RunOutcome::Error) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
