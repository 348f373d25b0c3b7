//! restpager - Browse paginated REST collections from the terminal
//!
//! A terminal UI application that pages through posts, users and comments of
//! a JSON REST API, with search, caching and retries.

use std::io;
use std::panic;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use reqwest::Client;
use tracing::{info, warn};

use restpager::app::App;
use restpager::cli::{Cli, StartupConfig};
use restpager::controller::{Controller, Transports};
use restpager::fetch::{Connectivity, Coordinator, FixedConnectivity, RouteProbe};
use restpager::logging::{self, LoggingGuard};
use restpager::ui::{self, PlainRenderer};

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

/// Renders the UI based on the current application state
fn render_ui(frame: &mut ratatui::Frame, app: &App) {
    ui::render_results(frame, app);
    if app.show_help {
        ui::render_help_overlay(frame);
    }
}

fn init_logging(config: &StartupConfig) -> Option<LoggingGuard> {
    let log_dir = config.log_dir.clone().or_else(logging::default_log_dir)?;
    match logging::init_logging(&log_dir, config.once) {
        Ok(guard) => Some(guard),
        Err(e) => {
            // Logging is optional; keep running without it
            if config.once {
                eprintln!("warning: logging disabled: {}", e);
            }
            None
        }
    }
}

fn build_controller(config: &StartupConfig) -> Controller {
    let connectivity: Arc<dyn Connectivity> = if config.offline {
        Arc::new(FixedConnectivity::offline())
    } else {
        Arc::new(RouteProbe)
    };

    Controller::new(
        Arc::new(Coordinator::new(Arc::clone(&connectivity))),
        Transports::new(Client::new(), connectivity),
        config.settings.clone(),
        config.session.clone(),
    )
}

/// Fetches the starting page once and prints it
async fn run_once(mut controller: Controller) -> ExitCode {
    let mut renderer = PlainRenderer::new(io::stdout().lock());
    let descriptor = controller.current_request();

    match controller.fetch(&descriptor).await {
        Some(event) => controller.deliver(event, &mut renderer),
        None => warn!("Fetch was superseded"),
    }

    if let Some(message) = renderer.error() {
        eprintln!("error: {}", message);
        return ExitCode::FAILURE;
    }
    match renderer.finish() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: could not write output: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_tui(controller: Controller) -> Result<(), Box<dyn std::error::Error>> {
    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(controller);
    app.start();

    // Main event loop
    loop {
        // Apply finished fetches before drawing
        app.drain_events();

        terminal.draw(|f| render_ui(f, &app))?;

        // Poll for keyboard events with 100ms timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(ExitCode::from(2));
        }
    };

    let _logging = init_logging(&config);
    info!(
        base_url = %config.settings.base_url,
        resource_type = config.session.resource_type.path(),
        transport = config.session.transport_kind.name(),
        "Starting restpager"
    );

    let controller = build_controller(&config);

    if config.once {
        return Ok(run_once(controller).await);
    }

    run_tui(controller).await?;
    Ok(ExitCode::SUCCESS)
}
