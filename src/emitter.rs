//! # Command Emitter
//!
//! Boundary between the session and the outside world.
//!
//! The session hands every outbound [`Command`] to a [`CommandEmitter`]. In the
//! binary that is a [`Router`]: actuation goes to the printer as G-code, the
//! rest goes to the backend as JSON lines.

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::backend::BackendLink;
use crate::error::{JogpadError, Result};
use crate::printer::port_trait::SerialPortIO;
use crate::printer::PrinterSerial;
use crate::protocol::Command;

/// Transports outbound commands.
#[async_trait]
pub trait CommandEmitter: Send {
    /// Sends one command. Failures are not retried.
    async fn emit(&mut self, command: &Command) -> Result<()>;
}

#[async_trait]
impl<P: SerialPortIO> CommandEmitter for PrinterSerial<P> {
    async fn emit(&mut self, command: &Command) -> Result<()> {
        self.send_command(command).await
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> CommandEmitter for BackendLink<W> {
    async fn emit(&mut self, command: &Command) -> Result<()> {
        self.send(command).await
    }
}

/// Splits commands between the printer and the backend.
///
/// Either side may be missing. Commands for a missing side fail with
/// `Transport`, like any other transport failure.
pub struct Router {
    printer: Option<Box<dyn CommandEmitter>>,
    backend: Option<Box<dyn CommandEmitter>>,
}

impl Router {
    pub fn new(
        printer: Option<Box<dyn CommandEmitter>>,
        backend: Option<Box<dyn CommandEmitter>>,
    ) -> Self {
        Self { printer, backend }
    }
}

#[async_trait]
impl CommandEmitter for Router {
    async fn emit(&mut self, command: &Command) -> Result<()> {
        let (target, name) = if command.is_actuation() {
            (self.printer.as_mut(), "printer")
        } else {
            (self.backend.as_mut(), "backend")
        };
        match target {
            Some(emitter) => emitter.emit(command).await,
            None => Err(JogpadError::Transport(format!(
                "no {} connected, dropping {}",
                name,
                command.name()
            ))),
        }
    }
}
