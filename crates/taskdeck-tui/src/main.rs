//! Taskdeck TUI - a terminal client for the projects/tasks backend.
//!
//! Signs in with email and password, keeps the session across restarts,
//! and lets you manage projects and their tasks from the keyboard.

mod app;
mod ui;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use taskdeck_core::{ApiClient, AuthState, Config, Route, SessionStore};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE_PREFIX: &str = "taskdeck.log";

const USAGE: &str = "\
Usage: taskdeck [PATH]
       taskdeck --login | --register | --logout | --status

  PATH         Route to open, e.g. /projects or /projects/42
  --login      Sign in from the command line and save the session
  --register   Create an account and save the session
  --logout     Forget the saved session
  --status     Show who is signed in";

/// Initialize the tracing subscriber for logging.
///
/// While the UI owns the terminal, logs go to a daily file in the cache
/// directory; CLI commands log to stderr. Use RUST_LOG to control the
/// level (e.g. RUST_LOG=debug).
fn init_tracing(to_file: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if !to_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr))
            .with(filter)
            .init();
        return None;
    }

    let log_dir = Config::cache_dir().ok()?;
    std::fs::create_dir_all(&log_dir).ok()?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    Some(guard)
}

fn load_config() -> Config {
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        Config::default()
    });
    config.apply_env();
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    let cli_command = args.get(1).is_some_and(|a| a.starts_with("--"));

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_tracing(!cli_command);

    let config = load_config();

    let mut initial = Route::Home;
    if let Some(arg) = args.get(1) {
        match arg.as_str() {
            "--login" => return cli_authenticate(config, false).await,
            "--register" => return cli_authenticate(config, true).await,
            "--logout" => return cli_logout(config).await,
            "--status" => return cli_status(config).await,
            "-h" | "--help" => {
                println!("{}", USAGE);
                return Ok(());
            }
            path if path.starts_with('/') => initial = Route::parse(path),
            other => {
                eprintln!("Unknown argument: {}\n\n{}", other, USAGE);
                std::process::exit(2);
            }
        }
    }

    info!(base_url = %config.api_base_url, "Taskdeck starting");

    let credentials = config.credential_store()?;
    let mut app = App::new(config, credentials, initial)?;
    app.start_session_restore();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("Taskdeck shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Guards run before every frame so redirects never render a frame late
        app.update_view().await;

        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

// ============================================================================
// CLI commands
// ============================================================================

async fn open_session(config: &Config) -> Result<SessionStore> {
    let api = ApiClient::new(&config.api_base_url)?;
    let mut session = SessionStore::new(config.credential_store()?, Arc::new(api));
    session.initialize().await;
    Ok(session)
}

fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(value) => print!("{} [{}]: ", label, value),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line).context("Failed to read input")?;
    let line = line.trim();
    Ok(match (line.is_empty(), default) {
        (true, Some(value)) => value.to_string(),
        _ => line.to_string(),
    })
}

/// Sign in (or register) without starting the UI
async fn cli_authenticate(mut config: Config, register: bool) -> Result<()> {
    let default_email = std::env::var("TASKDECK_EMAIL")
        .ok()
        .or_else(|| config.last_email.clone());
    let email = prompt("Email", default_email.as_deref())?;
    let password = match std::env::var("TASKDECK_PASSWORD") {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    let mut session = open_session(&config).await?;
    let result = if register {
        session.register(&email, &password).await
    } else {
        session.login(&email, &password).await
    };

    match result {
        Ok(()) => {
            let signed_in = remember_signed_in(&mut config, &session);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            println!("Signed in as {}", signed_in.unwrap_or(email));
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Record the email the backend signed us in as, which may differ from
/// what was typed (case, aliases).
fn remember_signed_in(config: &mut Config, session: &SessionStore) -> Option<String> {
    let email = session.identity().map(|i| i.email.clone());
    if email.is_some() {
        config.last_email = email.clone();
    }
    email
}

async fn cli_logout(config: Config) -> Result<()> {
    let mut session = open_session(&config).await?;
    let was = session.identity().map(|i| i.email.clone());
    session.logout();
    match was {
        Some(email) => println!("Signed out {}", email),
        None => println!("No saved session"),
    }
    Ok(())
}

async fn cli_status(config: Config) -> Result<()> {
    let session = open_session(&config).await?;
    match session.state() {
        AuthState::Authenticated(s) => println!("Signed in as {}", s.identity.email),
        AuthState::Unauthenticated | AuthState::Pending => println!("Not signed in"),
    }
    println!("Backend: {}", config.api_base_url);
    Ok(())
}
