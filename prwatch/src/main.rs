//! prwatch: watch a pull request and speak up only when something changes.
//!
//! Entry point for the `prwatch` binary. Wires together the terminal
//! lifecycle (`terminal`), the unified event bus (`event`), the background
//! poller (`poller`), and the line reporter (`report`) around the
//! `prwatch-core` engine.
//!
//! # Startup sequence
//!
//! 1. Parse flags and load the config file. Config errors are soft failures.
//! 2. Install logging. In a watch session logs go to `.prwatch/watch.log` so
//!    they never interleave with the report; `--log-stderr` overrides.
//! 3. `install_panic_hook()` then `register_sigterm()`, before raw mode.
//! 4. `init_terminal()` (interactive sessions only).
//! 5. Spawn the event task and the poller, then request the startup poll.
//!
//! `restore_terminal()` runs once, after the event loop exits, whatever the
//! reason: `q`, SIGTERM, merge, a vanished pull request, or channel close.

mod app;
mod cli;
mod config;
mod event;
mod keybindings;
mod poller;
mod report;
mod source;
mod terminal;

use std::io::{self, IsTerminal};
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use prwatch_core::scheduler::{Admission, PollTrigger};
use prwatch_core::{WatchError, Watcher};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, error, info};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::AppState;
use crate::event::AppEvent;
use crate::keybindings::KeyAction;
use crate::report::Reporter;

const LOG_DIR: &str = ".prwatch";
const LOG_FILE: &str = ".prwatch/watch.log";

fn init_logging(to_stderr: bool) -> io::Result<()> {
    let writer = if to_stderr {
        BoxMakeWriter::new(io::stderr)
    } else {
        std::fs::create_dir_all(LOG_DIR)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(LOG_FILE)?;
        BoxMakeWriter::new(Mutex::new(file))
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prwatch=info,prwatch_core=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(to_stderr),
        )
        .init();
    Ok(())
}

/// Asks the scheduler for a poll and forwards it to the poller when admitted.
/// Returns `false` once the poller has gone away.
fn request_poll(
    app: &mut AppState,
    poll_tx: &UnboundedSender<PollTrigger>,
    trigger: PollTrigger,
) -> bool {
    match app.request_poll(trigger) {
        Admission::Start => poll_tx.send(trigger).is_ok(),
        admission => {
            debug!(?trigger, ?admission, "poll already running");
            true
        }
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = cli::Cli::parse();
    let config = cli.apply(config::load_config(cli.config.as_deref()));
    let color = io::stdout().is_terminal();
    let interactive = !cli.once && color && io::stdin().is_terminal();

    init_logging(cli.log_stderr)?;
    let every = config.poll_interval();
    info!(source = %cli.source.display(), interval_secs = every.as_secs(), "watch starting");

    let mut watcher = Watcher::new(source::ReplaySource::new(&cli.source), config.normalizer());

    if cli.once {
        let mut reporter = Reporter::new(io::stdout(), false, color);
        return match watcher.poll().await {
            Ok(outcome) => {
                outcome.dispatch(&mut reporter);
                Ok(())
            }
            Err(e) => {
                reporter.fatal(&e);
                Err(io::Error::other(e))
            }
        };
    }

    terminal::install_panic_hook();
    let term_flag = terminal::register_sigterm();
    if interactive {
        terminal::init_terminal()?;
    }

    let mut reporter = Reporter::new(io::stdout(), interactive, color);
    reporter.banner(&cli.source, every, interactive);

    let handler = event::EventHandler::new();
    event::spawn_event_task(handler.tx.clone(), every, interactive);
    let (poll_tx, poll_rx) = mpsc::unbounded_channel();
    poller::spawn_poller(watcher, poll_rx, handler.tx.clone());
    let mut rx = handler.rx;

    let mut app = AppState::new(config.exit_on_merge);
    let mut failure: Option<WatchError> = None;
    let mut running = request_poll(&mut app, &poll_tx, PollTrigger::Startup);

    // Exits only via `break`, never via `?`, so the terminal is always restored.
    'event_loop: while running {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(AppEvent::Tick) => {
                        running = request_poll(&mut app, &poll_tx, PollTrigger::Timer);
                    }
                    Some(AppEvent::Key(key)) => match keybindings::handle_key(key) {
                        KeyAction::Continue => {}
                        KeyAction::Refresh => {
                            running = request_poll(&mut app, &poll_tx, PollTrigger::Manual);
                        }
                        KeyAction::ListIssues => reporter.list_issues(app.last.as_ref()),
                        KeyAction::ShowIssue(index) => reporter.show_issue(index, app.issue_at(index)),
                        KeyAction::Help => reporter.help(),
                        KeyAction::Quit => break 'event_loop,
                    },
                    Some(AppEvent::PollFinished(result)) => match *result {
                        Ok(outcome) => {
                            outcome.dispatch(&mut reporter);
                            if app.finish_poll(outcome.snapshot) {
                                running = poll_tx.send(PollTrigger::Manual).is_ok();
                            }
                            if app.should_exit() {
                                info!("pull request merged, watch finished");
                                break 'event_loop;
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "watch cannot continue");
                            reporter.fatal(&e);
                            failure = Some(e);
                            break 'event_loop;
                        }
                    },
                    None => break 'event_loop,
                }
            }
        }
        if term_flag.load(Ordering::Relaxed) {
            info!("SIGTERM received");
            break 'event_loop;
        }
    }

    terminal::restore_terminal()?;
    match failure {
        Some(e) => Err(io::Error::other(e)),
        None => Ok(()),
    }
}
