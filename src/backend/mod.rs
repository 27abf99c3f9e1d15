//! # Backend Module
//!
//! JSON-lines link to the backend host.
//!
//! Commands are written one JSON object per line, each write bounded by a
//! timeout. Pushes are read line by line on a separate task, filtered by plugin
//! id and forwarded over an mpsc channel to the session, which applies them
//! between frames. When the push stream ends the listener forwards
//! [`InboundMessage::LinkLost`] so that remote state does not outlive the link.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{JogpadError, Result};
use crate::protocol::codec::{decode_push, encode_command};
use crate::protocol::{Command, InboundMessage};

/// Writing half of the backend connection
pub struct BackendLink<W> {
    writer: W,
    write_timeout: Duration,
}

impl<W> std::fmt::Debug for BackendLink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendLink")
            .field("write_timeout", &self.write_timeout)
            .finish_non_exhaustive()
    }
}

impl BackendLink<OwnedWriteHalf> {
    /// Connect to the backend
    ///
    /// # Returns
    ///
    /// * The command link and the read half to hand to [`spawn_push_listener`]
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the connection cannot be established
    pub async fn connect(address: &str, write_timeout: Duration) -> Result<(Self, OwnedReadHalf)> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| JogpadError::Transport(format!("Failed to connect to {}: {}", address, e)))?;
        stream.set_nodelay(true)?;
        info!("Connected to backend at {}", address);

        let (reader, writer) = stream.into_split();
        Ok((Self::new(writer, write_timeout), reader))
    }
}

impl<W: AsyncWrite + Unpin + Send> BackendLink<W> {
    pub fn new(writer: W, write_timeout: Duration) -> Self {
        Self { writer, write_timeout }
    }

    /// Send one command as a JSON line
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the write fails or does not complete within the
    /// write timeout
    pub async fn send(&mut self, command: &Command) -> Result<()> {
        let line = encode_command(command)?;
        let writer = &mut self.writer;
        let write = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        };

        match timeout(self.write_timeout, write).await {
            Ok(Ok(())) => {
                debug!("Sent {} to backend", command.name());
                Ok(())
            }
            Ok(Err(e)) => Err(JogpadError::Transport(format!(
                "Failed to send {}: {}",
                command.name(),
                e
            ))),
            Err(_) => Err(JogpadError::Transport(format!(
                "Timed out sending {} after {:?}",
                command.name(),
                self.write_timeout
            ))),
        }
    }
}

/// Spawn the task that reads pushes and forwards them to `tx`
///
/// Lines that are not UTF-8 or not valid pushes are logged and skipped. When
/// the reader reaches EOF or fails, [`InboundMessage::LinkLost`] is forwarded
/// and the task ends. It also ends as soon as the receiving side of `tx` is
/// dropped.
pub fn spawn_push_listener<R>(
    reader: R,
    plugin_id: String,
    tx: mpsc::Sender<InboundMessage>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    info!("Backend closed the push stream");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Backend push stream failed: {}", e);
                    break;
                }
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Dropping push that is not UTF-8: {}", e);
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match decode_push(line, &plugin_id) {
                Ok(Some(message)) => {
                    if tx.send(message).await.is_err() {
                        debug!("Session gone, stopping push listener");
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Dropping malformed push: {}", e),
            }
        }

        if tx.send(InboundMessage::LinkLost).await.is_err() {
            debug!("Session gone before the link loss was reported");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DiscoverySource;
    use tokio_test::io::Builder;

    const PLUGIN: &str = "xbox_controller";
    const TIMEOUT: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn test_send_writes_json_line() {
        let writer = Builder::new()
            .write(b"{\"command\":\"controllerDiscovered\",\"id\":\"pad\",\"source\":\"browser\"}\n")
            .build();
        let mut link = BackendLink::new(writer, TIMEOUT);

        link.send(&Command::ControllerDiscovered {
            id: "pad".to_string(),
            source: DiscoverySource::Local,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_send_reports_write_failure() {
        let writer = Builder::new()
            .write_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let mut link = BackendLink::new(writer, TIMEOUT);

        let result = link.send(&Command::ToggleTestMode { enabled: false }).await;
        match result.unwrap_err() {
            JogpadError::Transport(msg) => assert!(msg.contains("toggleTestMode")),
            other => panic!("Expected Transport error, got: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_times_out_when_backend_stops_reading() {
        // Nobody reads the far end, so the 8 byte buffer fills and the write stalls
        let (writer, _far_end) = tokio::io::duplex(8);
        let mut link = BackendLink::new(writer, TIMEOUT);

        let result = link.send(&Command::ToggleTestMode { enabled: true }).await;
        match result.unwrap_err() {
            JogpadError::Transport(msg) => assert!(msg.contains("Timed out sending toggleTestMode")),
            other => panic!("Expected Transport error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_listener_forwards_matching_pushes() {
        let reader = Builder::new()
            .read(b"{\"plugin\":\"xbox_controller\",\"data\":{\"type\":\"status\",\"status\":\"Connected\"}}\n")
            .read(b"{\"plugin\":\"other\",\"data\":{\"type\":\"status\",\"status\":\"Nope\"}}\n")
            .read(b"garbage\n\n")
            .read(b"{\"plugin\":\"xbox_controller\",\"data\":{\"type\":\"connection_info\",\"source\":\"backend\",\"connected\":true}}\n")
            .build();
        let (tx, mut rx) = mpsc::channel(8);

        let handle = spawn_push_listener(reader, PLUGIN.to_string(), tx);
        handle.await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(InboundMessage::Status { status: "Connected".to_string() })
        );
        assert_eq!(
            rx.recv().await,
            Some(InboundMessage::ConnectionInfo { source: "backend".to_string(), connected: true })
        );
        assert_eq!(rx.recv().await, Some(InboundMessage::LinkLost));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_listener_skips_lines_that_are_not_utf8() {
        let reader = Builder::new()
            .read(b"{\"plugin\":\"xbox_controller\",\"data\":{\"type\":\"connection_info\",\"source\":\"backend\",\"connected\":true}}\n")
            .read(b"\xff\xfe garbage\n")
            .read(b"{\"plugin\":\"xbox_controller\",\"data\":{\"type\":\"connection_info\",\"source\":\"backend\",\"connected\":false}}\n")
            .build();
        let (tx, mut rx) = mpsc::channel(8);

        spawn_push_listener(reader, PLUGIN.to_string(), tx).await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(InboundMessage::ConnectionInfo { source: "backend".to_string(), connected: true })
        );
        assert_eq!(
            rx.recv().await,
            Some(InboundMessage::ConnectionInfo { source: "backend".to_string(), connected: false })
        );
        assert_eq!(rx.recv().await, Some(InboundMessage::LinkLost));
    }

    #[tokio::test]
    async fn test_listener_reports_link_lost_on_read_error() {
        let reader = Builder::new()
            .read(b"{\"plugin\":\"xbox_controller\",\"data\":{\"type\":\"status\",\"status\":\"Idle\"}}\n")
            .read_error(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let (tx, mut rx) = mpsc::channel(8);

        spawn_push_listener(reader, PLUGIN.to_string(), tx).await.unwrap();

        assert_eq!(rx.recv().await, Some(InboundMessage::Status { status: "Idle".to_string() }));
        assert_eq!(rx.recv().await, Some(InboundMessage::LinkLost));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_listener_handles_split_lines() {
        let reader = Builder::new()
            .read(b"{\"plugin\":\"xbox_controller\",\"data\":{\"type\":\"sta")
            .read(b"tus\",\"status\":\"Idle\"}}\n")
            .build();
        let (tx, mut rx) = mpsc::channel(8);

        spawn_push_listener(reader, PLUGIN.to_string(), tx).await.unwrap();
        assert_eq!(rx.recv().await, Some(InboundMessage::Status { status: "Idle".to_string() }));
    }

    #[tokio::test]
    async fn test_listener_stops_when_session_is_gone() {
        let reader = Builder::new()
            .read(b"{\"plugin\":\"xbox_controller\",\"data\":{\"type\":\"status\",\"status\":\"A\"}}\n")
            .build();
        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        spawn_push_listener(reader, PLUGIN.to_string(), tx).await.unwrap();
    }
}
