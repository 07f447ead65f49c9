use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, eyre};
use std::path::PathBuf;
use tasklist::task::{self, NOT_SET};
use tasklist::{Config, DisplayedTask, FileStorage, SortKey, StateFilter, Task, TaskState, TaskStore};

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "tasklist - a single-user task list")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Directory holding the task data (default: from config, then the user data dir)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    /// Config file (default: <config dir>/tasklist/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a task
    Add {
        title: String,

        #[arg(long, default_value = "")]
        summary: String,

        /// Done, "Not done" or "Doing right now"
        #[arg(long)]
        state: Option<TaskState>,

        /// YYYY-MM-DD (default: today; pass "" for none)
        #[arg(long, value_parser = task::parse_deadline)]
        deadline: Option<String>,
    },

    /// Replace a task; fields not given keep their current value
    Edit {
        index: usize,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        summary: Option<String>,

        #[arg(long)]
        state: Option<TaskState>,

        #[arg(long, value_parser = task::parse_deadline)]
        deadline: Option<String>,
    },

    /// Delete a task
    Rm { index: usize },

    /// Show tasks
    List {
        /// done, doing, notdone or deadline
        #[arg(long)]
        sort: Option<SortKey>,

        /// Done, "Not done", "Doing right now" or all
        #[arg(long)]
        filter: Option<StateFilter>,
    },
}

fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let store_path = config.resolve_store_path(cli.store_path);

    // Open store
    let mut store = TaskStore::open(FileStorage::open(&store_path)?);

    match cli.command {
        Commands::Add {
            title,
            summary,
            state,
            deadline,
        } => {
            if title.trim().is_empty() {
                return Err(eyre!("Title is required"));
            }
            let state = match state {
                Some(s) => s,
                None => config.new_task_state()?,
            };
            let deadline = deadline.unwrap_or_else(task::today);
            let index = store.create(Task::new(title, summary, state, deadline))?;
            println!("Created task {}", index);
        }
        Commands::Edit {
            index,
            title,
            summary,
            state,
            deadline,
        } => {
            let Some(current) = store.get(index).cloned() else {
                return Err(eyre!("No task at index {}", index));
            };
            let edited = Task {
                title: title.unwrap_or(current.title),
                summary: summary.unwrap_or(current.summary),
                state: state.unwrap_or(current.state),
                deadline: deadline.unwrap_or(current.deadline),
            };
            if edited.title.trim().is_empty() {
                return Err(eyre!("Title is required"));
            }
            store.edit(index, edited)?;
            println!("Updated task {}", index);
        }
        Commands::Rm { index } => match store.delete(index)? {
            Some(removed) => println!("Deleted task {}: {}", index, removed.title),
            None => println!("No task at index {}", index),
        },
        Commands::List { sort, filter } => {
            store.set_sort(match sort {
                Some(s) => s,
                None => config.sort()?,
            });
            store.set_filter(match filter {
                Some(f) => f,
                None => config.filter()?,
            });
            render(&store.view());
        }
    }

    Ok(())
}

fn render(view: &[DisplayedTask<'_>]) {
    if view.is_empty() {
        println!("{}", "You have no tasks".dimmed());
        return;
    }

    // Untitled tasks keep their slot but are not shown
    for item in view.iter().filter(|d| !d.task.title.is_empty()) {
        let task = item.task;
        println!("[{}] {}", item.original_index, task.title.bold());
        println!("    {}", task.summary_label().dimmed());
        println!("    State: {}", state_label(&task.state));
        println!("    Deadline: {}", task.deadline_label());
    }
}

fn state_label(state: &TaskState) -> colored::ColoredString {
    match state {
        TaskState::Done => state.as_str().green(),
        TaskState::DoingRightNow => state.as_str().yellow(),
        TaskState::NotDone => state.as_str().normal(),
        TaskState::Unset(_) => NOT_SET.dimmed(),
    }
}
