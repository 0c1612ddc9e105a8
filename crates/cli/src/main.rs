//! Command-line front end for the cut-point engine.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use engine::{
    ArtifactKind, Command, CutPoint, Engine, EngineErrorEvent, Event, FfmpegMediaBackend,
    SettingsManager, Task, TaskSnapshot,
};
use tracing::debug;

/// Detect black-frame cut points in a video, review them and split losslessly.
#[derive(Debug, Parser)]
#[command(name = "cutpoint", version)]
struct Cli {
    /// Directory holding task records, previews and split outputs
    #[arg(long, env = "CUTPOINT_TASKS_ROOT", global = true)]
    root: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Register a video (idempotent per path)
    Create {
        path: PathBuf,
        /// Run detection and preview generation right away
        #[arg(long)]
        detect: bool,
    },
    /// List tasks, newest first
    List,
    /// Show one task with its cut points
    Show { task_id: String },
    /// Detect cut points if none exist yet, then fill missing previews
    Detect { task_id: String },
    /// Add a cut point at TIME seconds
    Add { task_id: String, time: f64 },
    /// Move a cut point to TIME seconds
    Update {
        task_id: String,
        cut_point_id: String,
        time: f64,
    },
    /// Shift a cut point by DELTA seconds within the fine-adjustment window
    Nudge {
        task_id: String,
        cut_point_id: String,
        #[arg(allow_negative_numbers = true)]
        delta: f64,
    },
    /// Move a cut point back to its original time
    Reset {
        task_id: String,
        cut_point_id: String,
    },
    /// Remove a cut point and its previews
    Remove {
        task_id: String,
        cut_point_id: String,
    },
    /// Split the video at the current cut points
    Split { task_id: String },
    /// Delete a task and its directory
    DeleteTask { task_id: String },
    /// List split outputs of a task
    Outputs { task_id: String },
    /// Print the effective settings
    Settings,
}

impl Commands {
    fn into_engine_command(self) -> Option<Command> {
        let command = match self {
            Self::Create { path, .. } => Command::CreateTask { path },
            Self::List => Command::ListTasks,
            Self::Show { task_id } => Command::ShowTask { task_id },
            Self::Detect { task_id } => Command::Detect { task_id },
            Self::Add { task_id, time } => Command::AddCutPoint { task_id, time },
            Self::Update {
                task_id,
                cut_point_id,
                time,
            } => Command::UpdateCutPoint {
                task_id,
                cut_point_id,
                time,
            },
            Self::Nudge {
                task_id,
                cut_point_id,
                delta,
            } => Command::NudgeCutPoint {
                task_id,
                cut_point_id,
                delta,
            },
            Self::Reset {
                task_id,
                cut_point_id,
            } => Command::ResetCutPoint {
                task_id,
                cut_point_id,
            },
            Self::Remove {
                task_id,
                cut_point_id,
            } => Command::DeleteCutPoint {
                task_id,
                cut_point_id,
            },
            Self::Split { task_id } => Command::ConfirmSplit { task_id },
            Self::DeleteTask { task_id } => Command::DeleteTask { task_id },
            Self::Outputs { task_id } => Command::ListSplitOutputs { task_id },
            Self::Settings => return None,
        };
        Some(command)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = resolve_tasks_root(cli.root)?;
    debug!(root = ?root, "using tasks root");

    if matches!(cli.command, Commands::Settings) {
        let manager = SettingsManager::new(&root);
        println!("# {}", manager.settings_path().display());
        println!("{}", serde_json::to_string_pretty(&manager.load())?);
        return Ok(());
    }

    let mut engine = Engine::open(FfmpegMediaBackend, &root)
        .with_context(|| format!("failed to open tasks root {}", root.display()))?;

    let detect_after_create = matches!(cli.command, Commands::Create { detect: true, .. });
    let Some(command) = cli.command.into_engine_command() else {
        return Ok(());
    };

    let events = run(&mut engine, command)?;
    print_events(&events);

    if detect_after_create {
        let task_id = events
            .iter()
            .find_map(|event| match event {
                Event::TaskChanged(snapshot) => Some(snapshot.task.id.clone()),
                _ => None,
            })
            .ok_or_else(|| anyhow!("task creation returned no task"))?;
        print_events(&run(&mut engine, Command::Detect { task_id })?);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(engine: &mut Engine<FfmpegMediaBackend>, command: Command) -> Result<Vec<Event>> {
    engine.handle_command(command).map_err(|error| {
        let event = EngineErrorEvent::from_error(&error);
        anyhow!("[{}] {}", event.kind.as_str(), event.message)
    })
}

/// `--root`/env first, then the platform data directory.
fn resolve_tasks_root(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root);
    }
    dirs::data_dir()
        .map(|data| default_tasks_root(&data))
        .context("no data directory on this platform, pass --root")
}

fn default_tasks_root(data_dir: &Path) -> PathBuf {
    data_dir.join("cutpoint").join("tasks")
}

fn print_events(events: &[Event]) {
    for event in events {
        match event {
            Event::TaskChanged(snapshot) => print_snapshot(snapshot),
            Event::TasksListed(tasks) => {
                if tasks.is_empty() {
                    println!("no tasks");
                }
                for task in tasks {
                    println!("{}", task_line(task));
                }
            }
            Event::PreviewFailed {
                cut_point_id,
                message,
                ..
            } => eprintln!("preview failed for {cut_point_id}: {message}"),
            Event::SplitFinished {
                output_dir,
                outputs,
                ..
            } => {
                println!("split into {} file(s) in {}", outputs.len(), output_dir.display());
                for output in outputs {
                    println!("  {}", output.display());
                }
            }
            Event::SplitOutputsListed {
                output_dir,
                outputs,
                ..
            } => {
                println!("{}", output_dir.display());
                for output in outputs {
                    println!("  {}", output.display());
                }
            }
            Event::TaskDeleted { task_id } => println!("deleted {task_id}"),
        }
    }
}

fn print_snapshot(snapshot: &TaskSnapshot) {
    println!("{}", task_line(&snapshot.task));
    println!("  source: {}", snapshot.task.original_video_path.display());
    println!("  folder: {}", snapshot.task.task_folder_path.display());
    for point in &snapshot.cut_points {
        println!("  {}", cut_point_line(point));
    }
}

fn task_line(task: &Task) -> String {
    format!("{}  {}  [{}]", task.id, task.name, task.status)
}

fn cut_point_line(point: &CutPoint) -> String {
    let ready = ArtifactKind::ALL
        .iter()
        .filter(|kind| point.artifacts.ready_path(**kind).is_some())
        .count();
    let moved = if point.time == point.original_time {
        String::new()
    } else {
        format!(" (was {:.3})", point.original_time)
    };
    format!("{}  {:>10.3}s{moved}  previews {ready}/4", point.id, point.time)
}
