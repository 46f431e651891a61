use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result};
use std::path::PathBuf;
use tasklist::{Filter, FocusMode, KvAdapter, Outcome, SortOrder, SqliteStore, Task, TaskStore, Theme};
use tracing::Level;

type Store = TaskStore<KvAdapter<SqliteStore>>;

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "TaskList CLI - a single-user task list with local persistence")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to the store directory (default: the user's local data directory)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    /// Fail when a change could not be saved
    #[arg(long)]
    strict: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Replace a task's text
    Edit {
        id: String,
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Flip a task between active and completed
    Toggle { id: String },

    /// Delete a task
    Rm { id: String },

    /// Delete all completed tasks
    ClearCompleted,

    /// Show tasks
    List {
        /// all, active or completed
        #[arg(short, long, default_value = "all")]
        filter: Filter,

        /// newest or oldest (saved as the default)
        #[arg(long)]
        sort: Option<SortOrder>,
    },

    /// Show task counts
    Stats,

    /// Insert the built-in sample tasks
    Seed,

    /// Show or set the theme (no value toggles)
    Theme { theme: Option<Theme> },

    /// Show or set focus mode (no value toggles)
    Focus { mode: Option<FocusMode> },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let store_path = cli.store_path.clone().unwrap_or_else(default_store_path);
    let kv = SqliteStore::open(&store_path)
        .wrap_err_with(|| format!("Failed to open task store at {}", store_path.display()))?;
    let mut store = TaskStore::new(KvAdapter::new(kv));

    run(&cli, &mut store)
}

fn run(cli: &Cli, store: &mut Store) -> Result<()> {
    match &cli.command {
        Commands::Add { text } => {
            let outcome = store.add_task(&text.join(" "))?;
            let task = check_saved(cli, outcome)?;
            println!("{} {}", "Added".green(), describe(&task));
        }
        Commands::Edit { id, text } => {
            let id = store.find_by_prefix(id)?.id.clone();
            let task = check_saved(cli, store.update_task(&id, &text.join(" "))?)?;
            println!("{} {}", "Updated".green(), describe(&task));
        }
        Commands::Toggle { id } => {
            let id = store.find_by_prefix(id)?.id.clone();
            let task = check_saved(cli, store.toggle_task(&id)?)?;
            let label = if task.completed { "Completed" } else { "Reopened" };
            println!("{} {}", label.green(), describe(&task));
        }
        Commands::Rm { id } => {
            let id = store.find_by_prefix(id)?.id.clone();
            let task = check_saved(cli, store.delete_task(&id)?)?;
            println!("{} {}", "Deleted".green(), describe(&task));
        }
        Commands::ClearCompleted => {
            let removed = check_saved(cli, store.clear_completed())?;
            if removed == 0 {
                println!("No completed tasks to clear");
            } else {
                println!("{} {} completed task(s)", "Cleared".green(), removed);
            }
        }
        Commands::List { filter, sort } => {
            if let Some(order) = sort {
                check_saved(cli, store.set_sort_order(*order))?;
            }
            store.set_filter(*filter);
            print_view(store);
        }
        Commands::Stats => {
            let stats = store.stats();
            println!(
                "{} total, {} active, {} completed",
                stats.total,
                stats.active.to_string().yellow(),
                stats.completed.to_string().green()
            );
        }
        Commands::Seed => {
            let batch = check_saved(cli, store.seed_sample(&tasklist::sample_tasks())?)?;
            println!("{} {} sample task(s)", "Seeded".green(), batch.len());
        }
        Commands::Theme { theme } => {
            let outcome = match theme {
                Some(theme) => store.set_theme(*theme),
                None => store.toggle_theme(),
            };
            println!("Theme: {}", check_saved(cli, outcome)?);
        }
        Commands::Focus { mode } => {
            let outcome = match mode {
                Some(mode) => store.set_focus_mode(*mode),
                None => store.toggle_focus_mode(),
            };
            println!("Focus mode: {}", check_saved(cli, outcome)?);
        }
    }

    Ok(())
}

/// Warn about a failed save, or fail outright with `--strict`
fn check_saved<T>(cli: &Cli, outcome: Outcome<T>) -> Result<T> {
    if cli.strict {
        return outcome.durable().wrap_err("Change was applied but not saved");
    }
    if let Some(e) = &outcome.persist_error {
        eprintln!("{} change not saved: {}", "warning:".yellow().bold(), e);
    }
    Ok(outcome.into_value())
}

fn print_view(store: &Store) {
    let view = store.view();
    if view.is_empty() {
        println!("No {} tasks", store.filter());
        return;
    }

    // Focus mode hides finished work
    let focus = store.preferences().focus_mode.is_on();
    let mut shown = 0;
    for task in view.into_iter().filter(|t| !(focus && t.completed)) {
        println!("{}", describe(task));
        shown += 1;
    }

    let stats = store.stats();
    println!(
        "\n{} of {} shown ({}, {})",
        shown,
        stats.total,
        store.filter(),
        store.sort_order()
    );
}

fn describe(task: &Task) -> String {
    let mark = if task.completed { "[x]".green() } else { "[ ]".normal() };
    let text = if task.completed {
        task.text.dimmed().strikethrough()
    } else {
        task.text.normal()
    };
    format!(
        "{} {} {} {}",
        mark,
        task.id.get(..8).unwrap_or(&task.id).cyan(),
        text,
        task.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
    )
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("tasklist"))
        .unwrap_or_else(|| PathBuf::from("."))
}
