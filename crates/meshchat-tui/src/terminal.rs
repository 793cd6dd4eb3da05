//! Terminal driver for the TUI.
//!
//! Implements the [`Driver`] trait for terminal I/O using crossterm for
//! keyboard events and ratatui for rendering. Transport requests go to the
//! in-process radio task.

use std::{
    io::{self, Stdout, stdout},
    path::PathBuf,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use meshchat_app::{App, AppEvent, Driver, KeyInput};
use meshchat_core::{ConnectionProfile, Timestamp, TransportRequest};
use ratatui::{Terminal, backend::CrosstermBackend};
use thiserror::Error;
use tokio::time::Interval;

use crate::{
    config::{self, StoredProfile},
    radio::RadioHandle,
    traffic_log::TrafficLog,
    ui,
};

/// Redraw cadence when nothing else happens.
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Radio task is gone.
    #[error("radio channel closed")]
    ChannelSend,
}

/// Current wall-clock time.
pub fn system_now() -> Timestamp {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
    Timestamp::from_millis(millis)
}

/// Terminal driver implementing the [`Driver`] trait.
///
/// Owns the terminal (crossterm raw mode, alternate screen) and the radio
/// handle. Dropping it restores the terminal.
pub struct TerminalDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_stream: EventStream,
    radio: RadioHandle,
    tick: Interval,
    /// Event to hand out before polling, e.g. the initial terminal size.
    pending: Option<AppEvent>,
    traffic: Option<TrafficLog>,
    /// Where to persist the profile once connected. `None` disables it.
    remember_at: Option<PathBuf>,
}

impl TerminalDriver {
    /// Take over the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode or the alternate screen cannot be entered.
    pub fn new(
        radio: RadioHandle,
        traffic: Option<TrafficLog>,
        remember_at: Option<PathBuf>,
    ) -> Result<Self, TerminalError> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;
        let size = terminal.size()?;

        Ok(Self {
            terminal,
            event_stream: EventStream::new(),
            radio,
            tick: tokio::time::interval(TICK_INTERVAL),
            pending: Some(AppEvent::Resize(size.width, size.height)),
            traffic,
            remember_at,
        })
    }

    /// Convert crossterm `KeyCode` to `KeyInput`.
    fn convert_key(code: KeyCode) -> Option<KeyInput> {
        match code {
            KeyCode::Char(c) => Some(KeyInput::Char(c)),
            KeyCode::Enter => Some(KeyInput::Enter),
            KeyCode::Backspace => Some(KeyInput::Backspace),
            KeyCode::Delete => Some(KeyInput::Delete),
            KeyCode::Tab => Some(KeyInput::Tab),
            KeyCode::Esc => Some(KeyInput::Esc),
            KeyCode::Left => Some(KeyInput::Left),
            KeyCode::Right => Some(KeyInput::Right),
            KeyCode::Up => Some(KeyInput::Up),
            KeyCode::Down => Some(KeyInput::Down),
            KeyCode::Home => Some(KeyInput::Home),
            KeyCode::End => Some(KeyInput::End),
            _ => None,
        }
    }
}

impl Driver for TerminalDriver {
    type Error = TerminalError;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        loop {
            if let Some(event) = self.pending.take() {
                return Ok(Some(event));
            }

            // Unbiased so a burst of keys cannot starve radio events.
            tokio::select! {
                maybe_event = self.event_stream.next() => match maybe_event {
                    Some(Ok(Event::Key(key_event))) if key_event.kind == KeyEventKind::Press => {
                        if let Some(key) = Self::convert_key(key_event.code) {
                            return Ok(Some(AppEvent::Key(key)));
                        }
                    },
                    Some(Ok(Event::Resize(cols, rows))) => {
                        return Ok(Some(AppEvent::Resize(cols, rows)));
                    },
                    Some(Ok(_)) => {},
                    Some(Err(e)) => return Err(TerminalError::Io(e)),
                    None => return Ok(None),
                },

                Some(event) = self.radio.from_radio.recv() => {
                    if let Some(log) = &mut self.traffic
                        && let Err(err) = log.record(&event, system_now())
                    {
                        tracing::warn!(%err, "traffic log write failed, disabling");
                        self.traffic = None;
                    }
                    return Ok(Some(AppEvent::Transport(event)));
                },

                _ = self.tick.tick() => return Ok(Some(AppEvent::Tick)),
            }
        }
    }

    async fn execute(&mut self, request: TransportRequest) -> Result<(), Self::Error> {
        self.radio.to_radio.send(request).await.map_err(|_| TerminalError::ChannelSend)
    }

    fn now(&self) -> Timestamp {
        system_now()
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.terminal.draw(|frame| ui::render(frame, app))?;
        Ok(())
    }

    fn remember(&mut self, profile: &ConnectionProfile) {
        let Some(path) = &self.remember_at else {
            return;
        };
        match config::save(path, &StoredProfile::from(profile)) {
            Ok(()) => tracing::info!(path = %path.display(), "connection profile saved"),
            Err(err) => tracing::warn!(%err, "could not save connection profile"),
        }
    }

    fn stop(&mut self) {
        self.radio.stop();
    }
}

impl Drop for TerminalDriver {
    fn drop(&mut self) {
        self.stop();
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}
