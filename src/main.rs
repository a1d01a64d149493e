use std::io::{self, stdout, Stdout};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use crossbeam_channel::{Receiver, TryRecvError};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use dialoguer::{Confirm, Input, Password};
use ratatui::{backend::CrosstermBackend, Terminal};

use taskdeck::api::{due_date_from_day, ApiClient, TaskPatch, TaskService};
use taskdeck::app::{Driver, LogicThread};
use taskdeck::auth;
use taskdeck::config::{Config, API_URL_ENV};
use taskdeck::core::task::priority_label;
use taskdeck::core::{Board, Column, DropTarget, FolderId, Scope, Task, TaskId};
use taskdeck::render::RenderState;
use taskdeck::session::AuthSession;
use taskdeck::tea::{Message, Model};
use taskdeck::{tdlog, tdlog_error, ui, Error, Result};

const FRAME_DURATION: Duration = Duration::from_micros(16_666); // 60fps

/// Taskdeck - a kanban board for your task service
#[derive(Parser, Debug)]
#[command(name = "taskdeck")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    TASKDECK_DEBUG=1     Enable debug logging (alternative to --debug)\n    TASKDECK_API_URL     Task service base URL (overridden by --api-url)")]
pub struct Cli {
    /// Enable debug logging (writes to ~/.taskdeck/taskdeck.log)
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    /// Task service base URL
    #[arg(long, value_name = "URL", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Sign in and remember the access token
    Login {
        #[arg(long)]
        email: Option<String>,
    },

    /// Create an account, then sign in
    Signup {
        #[arg(long)]
        email: Option<String>,
    },

    /// Forget the stored access token
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Update the signed-in user's profile
    Profile {
        #[arg(long)]
        username: String,
    },

    /// Print the board
    List {
        /// Show a folder's board instead of all tasks
        #[arg(long, value_name = "ID")]
        folder: Option<i64>,
    },

    /// Create a task
    Add {
        title: String,

        #[arg(long, value_name = "ID")]
        folder: Option<i64>,
    },

    /// Move a task to another column
    Move {
        id: TaskId,

        /// Column name (todo, ongoing, done) or the id of a task in the destination column
        target: String,

        #[arg(long, value_name = "ID")]
        folder: Option<i64>,
    },

    /// Delete a task
    Rm {
        id: TaskId,

        #[arg(long, value_name = "ID")]
        folder: Option<i64>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Change a task's title, category, priority or due date
    Edit {
        id: TaskId,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        priority: Option<i64>,

        /// Due date as YYYY-MM-DD
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,

        #[arg(long, value_name = "ID")]
        folder: Option<i64>,
    },

    /// List folders
    Folders,

    /// Create a folder
    NewFolder { title: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    taskdeck::log::init_with_debug(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tdlog_error!("Exiting with error: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?.with_overrides(std::env::var(API_URL_ENV).ok(), cli.api_url);
    let mut session = AuthSession::load()?;
    tdlog!(
        "Taskdeck starting api_url={} signed_in={}",
        config.effective_api_url(),
        session.is_authenticated()
    );

    let Some(command) = cli.command else {
        return run_tui(config, &session);
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_command(command, config, &mut session))
}

fn client_for(config: &Config, session: &AuthSession) -> ApiClient {
    ApiClient::new(config.effective_api_url()).with_token(session.token().map(str::to_string))
}

fn scope_for(folder: Option<i64>) -> Scope {
    folder.map_or(Scope::Inbox, |id| Scope::Folder(FolderId(id)))
}

async fn run_command(command: Command, config: Config, session: &mut AuthSession) -> Result<()> {
    match command {
        Command::Login { email } => run_login(&config, session, email).await,
        Command::Signup { email } => run_signup(&config, session, email).await,
        Command::Logout => {
            session.clear()?;
            tdlog!("Logged out");
            println!("Logged out.");
            Ok(())
        }
        Command::Whoami => {
            session.require_token()?;
            let user = client_for(&config, session).current_user().await?;
            println!("{}", user.email);
            if let Some(username) = user.username.filter(|u| !u.is_empty()) {
                println!("username: {}", username);
            }
            Ok(())
        }
        Command::Profile { username } => {
            session.require_token()?;
            let username = username.trim();
            if username.is_empty() {
                return Err(Error::Validation("username cannot be empty".to_string()));
            }
            let user = client_for(&config, session)
                .update_profile(username)
                .await?;
            println!("Updated profile: {}", user.display_name());
            Ok(())
        }
        Command::Folders => {
            session.require_token()?;
            let folders = client_for(&config, session).list_folders().await?;
            if folders.is_empty() {
                println!("No folders.");
            }
            for folder in folders {
                println!("#{:<5} {}", folder.id.0, folder.title);
            }
            Ok(())
        }
        Command::NewFolder { title } => {
            if title.trim().is_empty() {
                return Err(Error::Validation("folder title cannot be empty".to_string()));
            }
            let mut driver = board_driver(config, session, Scope::Inbox)?;
            driver.dispatch(Message::CreateFolder { title });
            driver.settle().await;
            fail_on_errors(&mut driver)?;
            if let Some(folder) = driver.model().folders.last() {
                println!("Created folder #{} {}", folder.id, folder.title);
            }
            Ok(())
        }
        Command::List { folder } => {
            let driver = loaded_board(config, session, scope_for(folder)).await?;
            print!("{}", format_board(driver.model()));
            Ok(())
        }
        Command::Add { title, folder } => {
            if title.trim().is_empty() {
                return Err(Error::Validation("title cannot be empty".to_string()));
            }
            let mut driver = loaded_board(config, session, scope_for(folder)).await?;
            driver.dispatch(Message::CreateTask { title });
            driver.settle().await;
            fail_on_errors(&mut driver)?;
            print!("{}", format_board(driver.model()));
            Ok(())
        }
        Command::Move { id, target, folder } => {
            let mut driver = loaded_board(config, session, scope_for(folder)).await?;
            require_task(&driver.model().board, id)?;
            let over = DropTarget::parse(&target);
            match driver.move_task(id, over.clone()).await {
                Ok(true) => {
                    print!("{}", format_board(driver.model()));
                    Ok(())
                }
                Ok(false) => {
                    println!(
                        "Nothing to move: task #{} is already in {} or it is not on the board.",
                        id, over
                    );
                    Ok(())
                }
                Err(e) => {
                    eprintln!("Board reloaded from the server.");
                    print!("{}", format_board(driver.model()));
                    Err(e)
                }
            }
        }
        Command::Rm { id, folder, force } => {
            let mut driver = loaded_board(config, session, scope_for(folder)).await?;
            let title = require_task(&driver.model().board, id)?.title.clone();
            if !force {
                let confirm = Confirm::new()
                    .with_prompt(format!("Delete task #{} '{}'?", id, title))
                    .default(false)
                    .interact()?;
                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            driver.dispatch(Message::DeleteTask { id });
            driver.settle().await;
            fail_on_errors(&mut driver)?;
            println!("Deleted task #{}.", id);
            Ok(())
        }
        Command::Edit {
            id,
            title,
            category,
            priority,
            due,
            clear_due,
            folder,
        } => {
            let due_date = match (due, clear_due) {
                (Some(day), _) => Some(Some(due_date_from_day(&day)?)),
                (None, true) => Some(None),
                (None, false) => None,
            };
            let patch = TaskPatch {
                title,
                category,
                priority,
                due_date,
            };
            patch.validate()?;

            let mut driver = loaded_board(config, session, scope_for(folder)).await?;
            driver.dispatch(Message::SaveEdit { id, patch });
            driver.settle().await;
            fail_on_errors(&mut driver)?;
            print!("{}", format_board(driver.model()));
            Ok(())
        }
    }
}

async fn run_login(config: &Config, session: &mut AuthSession, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => Input::<String>::new().with_prompt("Email").interact_text()?,
    };
    let password = Password::new().with_prompt("Password").interact()?;

    let client = ApiClient::new(config.effective_api_url());
    let token = auth::login(&client, &email, &password)
        .await
        .map_err(|e| Error::Validation(auth::describe_failure(&e)))?;
    session.save(token)?;
    println!("Signed in as {}.", email);
    Ok(())
}

async fn run_signup(config: &Config, session: &mut AuthSession, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => Input::<String>::new().with_prompt("Email").interact_text()?,
    };
    let password = Password::new().with_prompt("Password").interact()?;
    let confirm = Password::new().with_prompt("Confirm password").interact()?;

    let client = ApiClient::new(config.effective_api_url());
    let (user, token) = auth::signup(&client, &email, &password, &confirm)
        .await
        .map_err(|e| Error::Validation(auth::describe_failure(&e)))?;
    session.save(token)?;
    println!("Account created. Signed in as {}.", user.email);
    Ok(())
}

fn board_driver(config: Config, session: &AuthSession, scope: Scope) -> Result<Driver> {
    session.require_token()?;
    let service: Arc<dyn TaskService> = Arc::new(client_for(&config, session));
    Ok(Driver::new(Model::new(config, scope), service))
}

/// A driver whose board holds a fresh listing of `scope`.
async fn loaded_board(config: Config, session: &AuthSession, scope: Scope) -> Result<Driver> {
    let mut driver = board_driver(config, session, scope)?;
    driver.dispatch(Message::Refresh);
    driver.settle().await;
    fail_on_errors(&mut driver)?;
    Ok(driver)
}

fn fail_on_errors(driver: &mut Driver) -> Result<()> {
    let failures = driver.take_failures();
    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(failures.join("; ")))
    }
}

fn require_task(board: &Board, id: TaskId) -> Result<&Task> {
    board
        .task(id)
        .ok_or_else(|| Error::Validation(format!("task #{} is not on this board", id)))
}

/// Plain-text board for the terminal: one block per column.
fn format_board(model: &Model) -> String {
    let mut out = format!("{}\n", model.scope_title);
    for column in Column::ALL {
        let tasks = model.board.column(column);
        out.push_str(&format!("\n{} ({})\n", column, tasks.len()));
        for task in tasks {
            out.push_str(&format!(
                "  #{:<5} {:<7} {}",
                task.id.0,
                priority_label(task.priority),
                task.title
            ));
            if let Some(category) = &task.category {
                out.push_str(&format!("  [{}]", category));
            }
            if let Some(due) = task.due_day() {
                out.push_str(&format!("  due {}", due));
            }
            out.push('\n');
        }
    }
    out
}

fn run_tui(config: Config, session: &AuthSession) -> Result<()> {
    session.require_token()?;
    if taskdeck::log::is_debug() {
        tdlog!("Taskdeck TUI starting (debug mode enabled)");
    } else {
        tdlog!("Taskdeck TUI starting");
    }

    let service: Arc<dyn TaskService> = Arc::new(client_for(&config, session));
    let model = Model::new(config, Scope::Inbox);

    let shutdown = Arc::new(AtomicBool::new(false));
    let (state_tx, state_rx) = crossbeam_channel::bounded::<RenderState>(1);

    let shutdown_clone = shutdown.clone();
    let logic_handle =
        thread::spawn(move || LogicThread::run(model, service, state_tx, shutdown_clone));

    let mut terminal = setup_terminal()?;
    let result = render_loop(&mut terminal, state_rx, &shutdown);

    shutdown.store(true, Ordering::SeqCst);
    let logic_result = logic_handle.join();
    restore_terminal(&mut terminal)?;

    match logic_result {
        Ok(Err(e)) => return Err(e),
        Err(_) => tdlog_error!("Logic thread panicked"),
        Ok(Ok(())) => {}
    }
    tdlog!("Taskdeck TUI stopped");
    result
}

fn render_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state_rx: Receiver<RenderState>,
    shutdown: &AtomicBool,
) -> Result<()> {
    let mut state = RenderState::default();
    let mut last_version: u64 = 0;
    let mut last_frame = Instant::now();
    let mut dirty = true;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        match state_rx.try_recv() {
            Ok(s) => {
                dirty = dirty || s.version != last_version;
                state = s;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => break,
        }

        if last_frame.elapsed() < FRAME_DURATION {
            thread::sleep(Duration::from_micros(500));
            continue;
        }
        last_frame = Instant::now();

        if dirty {
            terminal.draw(|f| ui::draw(f, &state))?;
            last_version = state.version;
            dirty = false;
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.hide_cursor()?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(disable_raw_mode()?)
}
