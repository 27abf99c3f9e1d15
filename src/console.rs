//! Operator console on stdin.
//!
//! Commands, one per line:
//!
//! ```text
//! test on | test off | test toggle
//! scale <xy|z|e> <value>
//! status
//! ```

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{JogpadError, Result};
use crate::session::{OperatorAction, SessionView};
use crate::settings::ScaleAxis;

/// A parsed console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Action(OperatorAction),
    Status,
}

/// Parse one console line. Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns `Settings` describing what was wrong with the line.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let command = match words.as_slice() {
        [] => return Ok(None),
        ["test", "on"] => ConsoleCommand::Action(OperatorAction::SetTestMode(true)),
        ["test", "off"] => ConsoleCommand::Action(OperatorAction::SetTestMode(false)),
        ["test", "toggle"] | ["test"] => ConsoleCommand::Action(OperatorAction::ToggleTestMode),
        ["scale", axis, value] => {
            let axis: ScaleAxis = axis.parse()?;
            let value: u32 = value.parse().map_err(|_| {
                JogpadError::Settings(format!("scale factor must be a positive integer, got '{}'", value))
            })?;
            ConsoleCommand::Action(OperatorAction::SetScaleFactor { axis, value })
        }
        ["status"] => ConsoleCommand::Status,
        _ => {
            return Err(JogpadError::Settings(format!(
                "unknown command '{}' (try: test on|off|toggle, scale <xy|z|e> <value>, status)",
                line.trim()
            )))
        }
    };
    Ok(Some(command))
}

/// Renders a view as one status line.
pub fn describe(view: &SessionView) -> String {
    let mut line = format!(
        "{} | {} | test mode {} | scale xy={} z={} e={}",
        view.status,
        view.telemetry,
        if view.test_mode { "on" } else { "off" },
        view.scale.xy,
        view.scale.z,
        view.scale.e
    );
    if view.printer_busy {
        line.push_str(" | printer busy");
    }
    if let Some(status) = &view.backend_status {
        line.push_str(&format!(" | backend: {}", status));
    }
    if let Some(remote) = &view.remote_values {
        line.push_str(&format!(" | remote: {}", remote));
    }
    line
}

/// Spawn the task reading console lines from `input`.
///
/// Ends at EOF, on a read error, or once the session stops taking actions.
pub fn spawn_console<R>(
    input: R,
    actions: mpsc::Sender<OperatorAction>,
    view: watch::Receiver<SessionView>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(input).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            match parse_line(&line) {
                Ok(Some(ConsoleCommand::Action(action))) => {
                    if actions.send(action).await.is_err() {
                        break;
                    }
                }
                Ok(Some(ConsoleCommand::Status)) => info!("{}", describe(&view.borrow())),
                Ok(None) => {}
                Err(e) => warn!("{}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::connection::LinkState;
    use crate::settings::ScaleFactors;
    use crate::telemetry::Telemetry;
    use tokio_test::io::Builder;

    fn view() -> SessionView {
        SessionView {
            status: "Disconnected".to_string(),
            link: LinkState::Disconnected,
            controller_id: None,
            sampling: false,
            telemetry: Telemetry::default(),
            remote_values: None,
            backend_status: None,
            test_mode: false,
            printer_busy: false,
            scale: ScaleFactors::default(),
        }
    }

    #[test]
    fn test_parse_test_mode() {
        assert_eq!(
            parse_line("test on").unwrap(),
            Some(ConsoleCommand::Action(OperatorAction::SetTestMode(true)))
        );
        assert_eq!(
            parse_line("  test   off ").unwrap(),
            Some(ConsoleCommand::Action(OperatorAction::SetTestMode(false)))
        );
        assert_eq!(
            parse_line("test toggle").unwrap(),
            Some(ConsoleCommand::Action(OperatorAction::ToggleTestMode))
        );
    }

    #[test]
    fn test_parse_scale() {
        assert_eq!(
            parse_line("scale xy 120").unwrap(),
            Some(ConsoleCommand::Action(OperatorAction::SetScaleFactor {
                axis: ScaleAxis::Xy,
                value: 120
            }))
        );
        assert!(parse_line("scale q 120").is_err());
        assert!(parse_line("scale z -5").is_err());
        assert!(parse_line("scale z").is_err());
    }

    #[test]
    fn test_parse_blank_and_unknown() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("status").unwrap(), Some(ConsoleCommand::Status));
        assert!(parse_line("jump").is_err());
    }

    #[test]
    fn test_describe() {
        let mut v = view();
        v.backend_status = Some("Idle".to_string());
        let line = describe(&v);
        assert!(line.starts_with("Disconnected | X 0.00 Y 0.00 Z 0.00 E 0.00"));
        assert!(line.contains("scale xy=150 z=150 e=150"));
        assert!(line.ends_with("backend: Idle"));

        v.printer_busy = true;
        assert!(describe(&v).contains("| printer busy |"));
    }

    #[tokio::test]
    async fn test_console_forwards_actions() {
        let input = Builder::new()
            .read(b"test on\nbogus\nscale e 80\n")
            .build();
        let (tx, mut rx) = mpsc::channel(4);
        let (_view_tx, view_rx) = watch::channel(view());

        spawn_console(input, tx, view_rx).await.unwrap();

        assert_eq!(rx.recv().await, Some(OperatorAction::SetTestMode(true)));
        assert_eq!(
            rx.recv().await,
            Some(OperatorAction::SetScaleFactor { axis: ScaleAxis::E, value: 80 })
        );
        assert_eq!(rx.recv().await, None);
    }
}
