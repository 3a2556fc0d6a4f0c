mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use anyhow::Result;
use tracing::{info, warn};
use floatchat_core::Config;
use app::App;
use tui::EventHandler;

#[tokio::main]
async fn main() -> Result<()> {
    // Logging is best effort; a read-only config dir shouldn't stop the app
    let log_path = logging::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "config unreadable, using defaults");
            Config::new()
        }
    };

    match &log_path {
        Ok(path) => info!(
            version = env!("CARGO_PKG_VERSION"),
            log = %path.display(),
            api = %config.api_base_url(),
            "starting FloatChat"
        ),
        Err(e) => eprintln!("floatchat: logging disabled: {:#}", e),
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut app = App::new(&config.api_base_url(), &config);
    app.start_status_check(config.status_timeout());

    let result = run(&mut terminal, &mut app).await;

    tui::restore()?;
    info!(messages = app.session.messages().len(), "FloatChat closed");
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event)?;
        }

        app.poll_tasks().await;
    }

    Ok(())
}
