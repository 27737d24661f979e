mod app;
mod auth;
mod backend;
mod config;
mod db;
mod directory;
mod guard;
mod models;
mod routes;
mod session;
mod ui;

use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::app::App;
use crate::backend::{memory::MemoryBackend, Services};
use crate::config::Config;

const TICK_RATE: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::init()?;
    init_logging(&config)?;
    println!("Initializing client manager...");

    let services = build_services(&config).await?;
    info!(start = config.start_route.path(), "starting client manager");

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(services, config.start_route);
    app.open().await;

    // Run the main app loop
    let result = run_app(&mut terminal, &mut app).await;
    app.shutdown();

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        error!(error = %err, "application loop failed");
        println!("Error: {}", err);
    }

    println!("Thanks for using Client Manager!");

    Ok(())
}

/// Write logs to the configured file; the terminal belongs to the UI.
fn init_logging(config: &Config) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("failed to open log file {}", config.log_file.display()))?;

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

async fn build_services(config: &Config) -> Result<Services> {
    if config.in_memory {
        let backend = MemoryBackend::new();
        let seeded = backend.seed_demo()?;
        println!("Running in memory with {} demo accounts (password: demo)", seeded.len());
        info!(accounts = seeded.len(), "in-memory backend seeded");
        return Ok(Services::from_backend(Arc::new(backend)));
    }

    let db = db::init(config).await?;
    println!("Database connection established");
    Ok(Services::from_backend(Arc::new(db)))
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.refresh_session().await;

        terminal.draw(|f| app.draw(f))?;

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                if app.handle_key(key).await {
                    info!(route = app.route().path(), "quit requested");
                    return Ok(());
                }
            }
        }
    }
}
