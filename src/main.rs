use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Result;
use clap::Parser;
use dockhand_core::{Backend, Config, FileLinkStore, HttpBackend, LinkStore, Session};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "dockhand")]
#[command(about = "Chat your way to a Dockerfile", version)]
struct Cli {
    /// Base URL of the generation backend
    #[arg(long)]
    backend_url: Option<String>,
    /// Skip the repository link prompt
    #[arg(long)]
    no_repo_gate: bool,
    /// Seconds to wait for the backend before giving up on a request
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Forget the saved repository link before starting
    #[arg(long)]
    reset_link: bool,
    /// Where to write logs (defaults to dockhand.log in the config directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match cli.log_file {
        Some(path) => path,
        None => Config::config_dir()?.join("dockhand.log"),
    };
    logging::init(&log_path)?;

    let mut config = Config::load()
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to load config, using defaults");
            Config::default()
        })
        .with_env_overrides();
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }
    if cli.no_repo_gate {
        config.require_repository_link = false;
    }
    if let Some(secs) = cli.timeout_secs {
        config.request_timeout_secs = secs;
    }
    tracing::info!(backend = %config.backend_url, gated = config.require_repository_link, "starting dockhand");

    let store: Arc<dyn LinkStore> = Arc::new(FileLinkStore::in_config_dir()?);
    if cli.reset_link {
        store.clear()?;
    }
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&config.backend_url));

    let mut app = App::new(Session::initialize(&config, store, backend));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    finish(&mut app, result, tui::restore())
}

/// Tear the session down whatever happened to the terminal, then report the
/// restore error ahead of the run's own result.
fn finish(app: &mut App, result: Result<()>, restored: Result<()>) -> Result<()> {
    app.shutdown();
    restored?;
    result
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            event = events.next() => match event {
                Some(event) => handler::handle_event(app, event)?,
                None => break,
            },
            _ = app.next_reply(), if app.awaiting_reply() => {}
        }
    }

    Ok(())
}
