use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use verse_cli::app::App;
use verse_cli::config::Config;
use verse_cli::{handler, tui, ui};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::load().unwrap_or_else(|_| Config::new());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &config).await;
    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, config: &Config) -> Result<()> {
    let mut app = App::new(config);
    let mut events = tui::EventHandler::new();
    let tx = events.sender();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;
        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event, &tx)?,
            None => break,
        }
    }

    Ok(())
}

/// Logs go to a file under the config dir; the terminal belongs to
/// ratatui. Enable with RUST_LOG, e.g. RUST_LOG=verse_cli=debug.
fn init_logging() {
    let Some(dir) = dirs::config_dir().map(|d| d.join("verse-cli")) else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("verses.log"))
    else {
        return;
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
}
