//! ALFA Slideshow - Session Runtime
//!
//! Single-task event loop around a `SessionController`. UI commands arrive
//! on a channel, timer fires come from the controller's own coordinator, and
//! both are handled one at a time on the same task. Notices are forwarded to
//! the UI as `SessionEvent`s.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{SessionError, SessionResult};
use crate::exit::{Disposition, ExitIntent};
use crate::session::{SessionController, SessionNotice};
use crate::timers::TimerFire;

/// Command queue depth
const COMMAND_BUFFER: usize = 32;

/// UI input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SessionCommand {
    Next,
    Previous,
    JumpTo(usize),
    /// Vertical swipe on the current item, px/s
    Swipe(f32),
    RemoveCurrent,
    ConfirmRemoval(bool),
    Exit(ExitIntent),
    Choose(Disposition),
    RetrySave,
    DiscardUnsaved,
    Shutdown,
}

/// Runtime output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    Notice(SessionNotice),
    /// Command not applicable in the current state
    Rejected { command: SessionCommand, reason: String },
}

/// Sender side for the UI
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Queue a command; fails once the session task is gone
    pub async fn send(&self, command: SessionCommand) -> SessionResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::SessionClosed)
    }

    /// Queue a command from a thread outside the tokio runtime
    pub fn blocking_send(&self, command: SessionCommand) -> SessionResult<()> {
        self.commands
            .blocking_send(command)
            .map_err(|_| SessionError::SessionClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

enum Wake {
    Command(Option<SessionCommand>),
    Timer(TimerFire),
}

/// Event loop for one session
pub struct SessionRuntime {
    controller: SessionController,
    commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionRuntime {
    pub fn new(
        controller: SessionController,
    ) -> (Self, SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let runtime = Self {
            controller,
            commands: command_rx,
            events: event_tx,
        };

        (runtime, SessionHandle { commands: command_tx }, event_rx)
    }

    /// Run until the session exits; hands the controller back
    pub async fn run(mut self) -> SessionController {
        self.controller.start();
        self.flush();

        while self.controller.is_live() {
            let wake = tokio::select! {
                command = self.commands.recv() => Wake::Command(command),
                fire = self.controller.timers.next() => Wake::Timer(fire),
            };

            match wake {
                Wake::Command(Some(command)) => self.dispatch(command),
                Wake::Command(None) => {
                    log::info!("All session handles dropped, shutting down");
                    if let Err(e) = self.controller.shutdown() {
                        log::warn!("Shutdown failed: {}", e);
                    }
                }
                Wake::Timer(fire) => self.controller.on_timer(fire),
            }

            self.flush();
        }

        log::debug!("Session {} loop finished", self.controller.session_id());
        self.controller
    }

    fn dispatch(&mut self, command: SessionCommand) {
        let controller = &mut self.controller;

        let result = match command.clone() {
            SessionCommand::Next => controller.next().map(|_| ()),
            SessionCommand::Previous => controller.previous().map(|_| ()),
            SessionCommand::JumpTo(index) => controller.jump_to(index).map(|_| ()),
            SessionCommand::Swipe(velocity) => controller.swipe(velocity).map(|_| ()),
            SessionCommand::RemoveCurrent => controller.remove_current(),
            SessionCommand::ConfirmRemoval(accepted) => controller.confirm_removal(accepted),
            SessionCommand::Exit(intent) => controller.request_exit(intent),
            SessionCommand::Choose(disposition) => controller.choose(disposition),
            SessionCommand::RetrySave => controller.retry_save(),
            SessionCommand::DiscardUnsaved => controller.discard_unsaved(),
            SessionCommand::Shutdown => controller.shutdown(),
        };

        if let Err(e) = result {
            if e.is_recoverable() {
                log::warn!("{:?} failed: {}", command, e);
            } else {
                log::debug!("{:?} rejected: {}", command, e);
            }
            self.emit(SessionEvent::Rejected {
                command,
                reason: e.to_string(),
            });
        }
    }

    fn flush(&mut self) {
        for notice in self.controller.drain_notices() {
            self.emit(SessionEvent::Notice(notice));
        }
    }

    fn emit(&self, event: SessionEvent) {
        // UI may have stopped listening; the session still runs to completion
        let _ = self.events.send(event);
    }
}
