use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use neotasks::{
    app::App, config::Config, ui, FileStore, FilterMode, NewTask, Priority, TaskId, TaskStore,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

const LOG_FILE: &str = "neotasks.log";

#[derive(Debug, Parser)]
#[command(name = "neotasks", version, about = "Terminal task list with priorities, tags and due dates")]
struct Cli {
    /// Directory holding the task list (overrides the config file).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to a config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the interactive task list (default).
    Tui,
    /// Add a task.
    Add {
        text: String,
        #[arg(long, short, default_value = "medium")]
        priority: Priority,
        #[arg(long, short, default_value = "")]
        tag: String,
        /// Due date as YYYY-MM-DD.
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Print the filtered, priority-sorted list.
    List {
        #[arg(long, short, default_value = "all")]
        filter: FilterMode,
        #[arg(long, short, default_value = "")]
        search: String,
    },
    /// Flip a task between active and completed.
    Toggle { id: TaskId },
    /// Delete a task.
    Delete { id: TaskId },
    /// Replace the text of a task.
    Edit { id: TaskId, text: String },
    /// Mark every task completed.
    DoneAll,
    /// Delete every task.
    Clear {
        /// Do not ask for confirmation.
        #[arg(long, short)]
        yes: bool,
    },
    /// Write neo_tasks_backup.json into DIR.
    Export { dir: Option<PathBuf> },
    /// Replace the task list with the contents of FILE.
    Import { file: PathBuf },
    /// Show completion counts.
    Stats,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    let data_dir = config.data_dir();
    install_tracing(&config.log_level, &data_dir);

    let mut store = TaskStore::open(Box::new(FileStore::new(&data_dir)));
    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => run_tui(store, &config)?,
        Command::Add {
            text,
            priority,
            tag,
            due,
        } => match store.add(NewTask::new(text).priority(priority).tag(tag).due(due))? {
            Some(id) => println!("Added task {id}"),
            None => println!("Nothing added: task text is empty"),
        },
        Command::List { filter, search } => {
            for task in neotasks::project(store.tasks(), filter, &search) {
                let due = task
                    .due_date
                    .map(|d| format!(" (Due: {d})"))
                    .unwrap_or_default();
                println!(
                    "{:>14} [{}] {}  {} #{}{}",
                    task.id,
                    if task.completed { "x" } else { " " },
                    task.text,
                    task.priority.as_str().to_uppercase(),
                    task.tag,
                    due
                );
            }
        }
        Command::Toggle { id } => report_found(store.toggle(id)?, id),
        Command::Delete { id } => report_found(store.delete(id)?, id),
        Command::Edit { id, text } => {
            if !store.edit_text(id, &text)? {
                println!("Task {id} unchanged");
            }
        }
        Command::DoneAll => println!("Completed {} tasks", store.mark_all_completed()?),
        Command::Clear { yes } => {
            let cleared = if yes {
                store.clear_all(&mut |_: &str| true)?
            } else {
                store.clear_all(&mut ask_stdin)?
            };
            if cleared {
                println!("All tasks deleted");
            }
        }
        Command::Export { dir } => {
            let dir = dir.unwrap_or_else(|| config.export_dir());
            println!("Exported to {}", store.export_to(&dir)?.display());
        }
        Command::Import { file } => {
            let bytes = fs::read(&file)?;
            println!("Imported {} tasks", store.import(&bytes)?);
        }
        Command::Stats => {
            let stats = store.stats();
            println!("{} ({}%)", stats.progress_label(), stats.percent());
            println!("{}", stats.detail_label());
        }
    }
    Ok(())
}

fn run_tui(store: TaskStore, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(store, config.default_filter, config.export_dir());
    let result = ui::run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result?;
    Ok(())
}

fn report_found(found: bool, id: TaskId) {
    if !found {
        println!("No task with id {id}");
    }
}

fn ask_stdin(question: &str) -> bool {
    print!("{question} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer).is_ok()
        && matches!(answer.trim(), "y" | "Y" | "yes")
}

fn install_tracing(default_level: &str, data_dir: &Path) {
    // RUST_LOG wins over the configured level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let log_file = fs::create_dir_all(data_dir).and_then(|()| {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(data_dir.join(LOG_FILE))
    });
    let Ok(file) = log_file else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .compact()
        .try_init();
}
