use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
        Event, KeyEventKind, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use parley_cli::app::{App, AppEvent};
use parley_cli::client::ApiClient;
use parley_cli::config::{Cli, Settings};
use parley_cli::keymap::{Action, Keymap};
use parley_cli::storage::FlagStore;
use parley_cli::transcript::Transcript;
use parley_cli::ui;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::io;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const TICK: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let settings = Settings::from(Cli::parse());

    // Log to a file; the terminal belongs to the UI
    if let Ok(file) = std::fs::File::create(&settings.log_file) {
        tracing_subscriber::fmt()
            .with_writer(file)
            .with_ansi(false)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }
    info!("Starting parley against {}", settings.server);

    let client = ApiClient::new(&settings.server)?.with_stream_timeout(settings.stream_timeout);
    let flags = FlagStore::open(&settings.state_dir);
    let transcript = match &settings.transcript_dir {
        Some(dir) => Transcript::new(dir).unwrap_or_else(|e| {
            error!("Failed to create transcript: {}", e);
            Transcript::disabled()
        }),
        None => Transcript::disabled(),
    };

    let (app_tx, mut app_rx) = mpsc::unbounded_channel();
    let mut app = App::new(client, flags, transcript, Keymap::standard(), app_tx);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        while let Ok(event) = event::read() {
            if ui_tx.send(event).is_err() {
                break;
            }
        }
    });

    app.start();
    let res = run_app(
        &mut terminal,
        &mut app,
        &mut app_rx,
        &mut ui_rx,
        settings.health_interval,
    )
    .await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    app_rx: &mut mpsc::UnboundedReceiver<AppEvent>,
    ui_rx: &mut mpsc::UnboundedReceiver<Event>,
    health_interval: Duration,
) -> Result<()> {
    let mut tick = tokio::time::interval(TICK);
    // First tick fires immediately, so the status is checked on startup.
    let mut health = tokio::time::interval(health_interval);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        tokio::select! {
            Some(event) = app_rx.recv() => {
                app.handle(event);
            }
            Some(event) = ui_rx.recv() => {
                match event {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        app.handle_key(key);
                    }
                    Event::Paste(text) => {
                        app.paste(&text);
                    }
                    Event::Mouse(mouse) => {
                        match mouse.kind {
                            MouseEventKind::ScrollUp => app.apply(Action::ScrollUp(3)),
                            MouseEventKind::ScrollDown => app.apply(Action::ScrollDown(3)),
                            _ => {}
                        }
                    }
                    _ => {}
                }
            }
            _ = tick.tick() => {
                app.tick(Instant::now());
            }
            _ = health.tick() => {
                app.check_health();
            }
        }

        if app.should_quit() {
            info!("Quit requested");
            return Ok(());
        }
    }
}
