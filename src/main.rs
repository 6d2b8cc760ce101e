//! givecache - a terminal dashboard for church giving campaigns.
//!
//! Fetches contribution records from a spreadsheet-backed endpoint, caches
//! them locally with an explicit staleness policy, and renders totals,
//! progress, leaderboards, and trends in a fast keyboard-driven interface.

mod api;
mod app;
mod cache;
mod config;
mod models;
mod refresh;
mod stats;
mod ui;
mod utils;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
        Event, KeyCode, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, AppState};
use config::Config;
use models::FundKey;
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Set up logging with environment-based filter
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Value of a `--flag value` pair, if present
fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|pos| args.get(pos + 1))
        .map(String::as_str)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();

    // CLI utility: fetch one fund and print the normalized snapshot
    if args.iter().any(|a| a == "--dump-fund") {
        init_tracing();
        let key = arg_value(&args, "--dump-fund")
            .ok_or_else(|| anyhow::anyhow!("--dump-fund requires a fund key"))?;
        return dump_fund(&FundKey::new(key)).await;
    }

    let fund_override = arg_value(&args, "--fund").map(FundKey::new);
    let member = arg_value(&args, "--member").map(str::to_string);
    let hard_reload = args.iter().any(|a| a == "--reload");

    // Initialize logging
    init_tracing();
    info!("givecache starting");

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app
    let mut app = App::new(config, fund_override, member)?;

    // A hard reload drops the selected fund's entry so the first read
    // misses and fetches fresh
    if hard_reload {
        let key = app.current_fund_spec().key.clone();
        app.cache.clear(&key);
        info!(fund = %key, "Cache cleared on reload");
    }

    // Serve cached data first for an instant start, then warm anything the
    // staleness policy no longer allows
    app.load_from_cache();
    app.warm_stale_funds();

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;

    app.shutdown().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("givecache shutting down");
    Ok(())
}

/// Fetch one fund and print the normalized snapshot as JSON
async fn dump_fund(key: &FundKey) -> Result<()> {
    let config = Config::load()?;
    let spec = config
        .fund(key)
        .ok_or_else(|| anyhow::anyhow!("Unknown fund: {}", key))?;

    eprintln!("Fetching fund {}...", spec.label);

    let client = api::FundClient::new(&config.endpoint_url)?;
    let snapshot = client.fetch_fund(spec).await?;

    let json = serde_json::to_string_pretty(&snapshot)?;
    println!("{}", json);

    eprintln!(
        "Done! {} contributions, goal {}.",
        snapshot.contributions.len(),
        snapshot.goal_amount
    );
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            match event::read()? {
                Event::Key(key) => {
                    // Ctrl+C to quit
                    if key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        return Ok(());
                    }

                    if handle_input(app, key)? {
                        return Ok(());
                    }
                }
                // The terminal came back to the foreground; refresh if the
                // cache expired while the app was hidden
                Event::FocusGained => app.on_focus_gained(),
                _ => {}
            }
        }

        // Periodic refresh check
        if app.poll_ticker() {
            app.maybe_refresh_current();
        }

        // Check for completed background tasks
        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
