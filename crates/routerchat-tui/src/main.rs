//! RouterChat - terminal chat front-end for OpenRouter-compatible APIs
//!
//! Startup order:
//! 1. Load `.env`, then configuration from the environment; stop before touching the
//!    terminal if the credential or endpoint is missing.
//! 2. Start file logging (when `ROUTERCHAT_LOG` is set).
//! 3. Build the completion client and run the UI loop.

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use std::sync::Arc;

use anyhow::{Context, Result};
use routerchat_core::{load_dotenv, CompletionClient, Config};
use tracing::info;

use crate::app::App;
use crate::tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv_path = load_dotenv()?;
    let config = Config::from_env()
        .context("Please set API_KEY and API_URL in your environment or .env file")?;
    let _log_guard = logging::init(&config)?;
    info!(version = env!("CARGO_PKG_VERSION"), model = %config.model, "routerchat starting");
    if let Some(path) = dotenv_path {
        info!(path = %path.display(), "loaded .env");
    }

    let client = CompletionClient::new(&config).context("Could not build HTTP client")?;
    let mut app = App::new(Arc::new(client), config.model.clone());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    info!(entries = app.session.log().len(), "routerchat exiting");
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }

        app.poll_pending().await;
    }
    Ok(())
}
