mod actions;
mod app;
mod backend;
mod config;
mod domain;
mod handlers;
mod infra;
mod input;
mod lock;
mod logging;
mod mode;
mod preview;
mod search;
mod selection;
mod terminal;
mod ui;

use crate::actions::refresh;
use crate::app::{App, BackendEvent, BackendTask, RefreshFocus};
use crate::backend::worker_loop;
use crate::config::AppConfig;
use crate::handlers::{handle_backend_event, handle_key_event};
use crate::infra::{BackendGateway, LocalBackend};
use crate::lock::OperationLock;
use crate::terminal::{install_panic_hook, restore_terminal, setup_terminal};
use crate::ui::Surface;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match AppConfig::load_or_default() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load config, using defaults: {err:#}");
            AppConfig::default()
        }
    };

    if let Err(err) = logging::init_tracing(&config) {
        eprintln!("logging disabled: {err:#}");
    }

    let start_dir = config.resolve_start_dir(std::env::args_os().nth(1).map(PathBuf::from))?;
    tracing::info!(start_dir = %start_dir.display(), "starting dirpilot");

    let gateway: Arc<dyn BackendGateway> = Arc::new(LocalBackend::new(
        start_dir,
        config.show_hidden,
        config.preview_max_bytes,
    ));

    install_panic_hook();
    setup_terminal()?;
    let mut terminal =
        Terminal::new(CrosstermBackend::new(io::stdout())).context("failed to create terminal")?;

    let run_result = run_app(&mut terminal, gateway).await;

    restore_terminal(&mut terminal)?;
    if let Err(err) = run_result {
        tracing::error!("{err:#}");
        eprintln!("{err:#}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    gateway: Arc<dyn BackendGateway>,
) -> Result<()> {
    let mut app = App::new(OperationLock::default());
    let mut surface = Surface::default();

    let (task_tx, task_rx) = mpsc::unbounded_channel::<BackendTask>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<BackendEvent>();

    tokio::spawn(worker_loop(gateway, task_rx, event_tx));

    refresh(&mut app, &task_tx, RefreshFocus::Reset)?;

    while !app.should_quit {
        while let Ok(event) = event_rx.try_recv() {
            handle_backend_event(&mut app, &task_tx, event)?;
        }
        surface.apply_all(app.take_renders());

        terminal.draw(|frame| ui::draw(frame, &surface, &app))?;

        if event::poll(Duration::from_millis(100)).context("event poll failed")?
            && let Event::Key(key) = event::read().context("event read failed")?
            && key.kind == KeyEventKind::Press
        {
            surface.dismiss_error();
            handle_key_event(&mut app, key, &task_tx)?;
            surface.apply_all(app.take_renders());
        }
    }

    tracing::info!("quitting");
    Ok(())
}
