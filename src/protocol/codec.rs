//! # Backend Message Codec
//!
//! JSON-lines framing for commands sent to the backend and pushes received
//! from it.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Command, InboundMessage};
use crate::error::Result;

/// `type` tags this crate understands.
const KNOWN_PUSH_TYPES: &[&str] = &["status", "controller_values", "connection_info", "printer_state"];

/// Outer wrapper of every push.
#[derive(Debug, Deserialize)]
struct PushEnvelope {
    plugin: String,
    data: Value,
}

/// Encode a command as one newline-terminated JSON line
///
/// # Errors
///
/// Returns `Protocol` if the command cannot be serialized.
pub fn encode_command(command: &Command) -> Result<String> {
    let mut line = serde_json::to_string(command)?;
    line.push('\n');
    Ok(line)
}

/// Decode one pushed line
///
/// # Arguments
///
/// * `line` - A single JSON line as read from the backend
/// * `plugin_id` - Plugin identifier pushes must be addressed to
///
/// # Returns
///
/// * `Ok(Some(message))` - A push for this plugin with a known type
/// * `Ok(None)` - A push for another plugin, or with an unknown type
///
/// # Errors
///
/// Returns `Protocol` if the line is not a valid envelope, or if a known
/// message type is missing fields.
pub fn decode_push(line: &str, plugin_id: &str) -> Result<Option<InboundMessage>> {
    let envelope: PushEnvelope = serde_json::from_str(line.trim())?;

    if envelope.plugin != plugin_id {
        debug!("Ignoring push for plugin '{}'", envelope.plugin);
        return Ok(None);
    }

    // A missing tag falls through and fails deserialization
    if let Some(kind) = envelope.data.get("type").and_then(Value::as_str) {
        if !KNOWN_PUSH_TYPES.contains(&kind) {
            debug!("Ignoring push of unknown type '{}'", kind);
            return Ok(None);
        }
    }

    Ok(Some(serde_json::from_value(envelope.data)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JogpadError;
    use crate::protocol::Axis;

    const PLUGIN: &str = "xbox_controller";

    #[test]
    fn test_encode_command_is_one_line() {
        let line = encode_command(&Command::ToggleTestMode { enabled: true }).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(line, "{\"command\":\"toggleTestMode\",\"enabled\":true}\n");
    }

    #[test]
    fn test_encode_home() {
        let line = encode_command(&Command::Home { axes: vec![Axis::X, Axis::Y] }).unwrap();
        assert_eq!(line, "{\"command\":\"home\",\"axes\":[\"x\",\"y\"]}\n");
    }

    #[test]
    fn test_decode_status() {
        let line = r#"{"plugin":"xbox_controller","data":{"type":"status","status":"Connected"}}"#;
        let msg = decode_push(line, PLUGIN).unwrap();
        assert_eq!(msg, Some(InboundMessage::Status { status: "Connected".to_string() }));
    }

    #[test]
    fn test_decode_controller_values() {
        let line = r#"{"plugin":"xbox_controller","data":{"type":"controller_values","x":0.5,"y":-0.5,"z":0,"e":0.1}}"#;
        match decode_push(line, PLUGIN).unwrap() {
            Some(InboundMessage::ControllerValues { x, y, z, e }) => {
                assert_eq!(x, 0.5);
                assert_eq!(y, -0.5);
                assert_eq!(z, 0.0);
                assert_eq!(e, 0.1);
            }
            other => panic!("Expected controller values, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_connection_info() {
        let line = "{\"plugin\":\"xbox_controller\",\"data\":{\"type\":\"connection_info\",\"source\":\"backend\",\"connected\":false}}\n";
        let msg = decode_push(line, PLUGIN).unwrap();
        assert_eq!(
            msg,
            Some(InboundMessage::ConnectionInfo { source: "backend".to_string(), connected: false })
        );
    }

    #[test]
    fn test_decode_printer_state() {
        let line = r#"{"plugin":"xbox_controller","data":{"type":"printer_state","operational":true,"printing":false}}"#;
        assert_eq!(
            decode_push(line, PLUGIN).unwrap(),
            Some(InboundMessage::PrinterState { operational: true, printing: false })
        );
    }

    #[test]
    fn test_decode_other_plugin_is_ignored() {
        let line = r#"{"plugin":"webcam","data":{"type":"status","status":"Connected"}}"#;
        assert_eq!(decode_push(line, PLUGIN).unwrap(), None);
    }

    #[test]
    fn test_decode_unknown_type_is_ignored() {
        let line = r#"{"plugin":"xbox_controller","data":{"type":"firmware_info","version":"2"}}"#;
        assert_eq!(decode_push(line, PLUGIN).unwrap(), None);
    }

    #[test]
    fn test_decode_invalid_json_is_error() {
        assert!(matches!(decode_push("not json", PLUGIN), Err(JogpadError::Protocol(_))));
    }

    #[test]
    fn test_decode_missing_type_is_error() {
        let line = r#"{"plugin":"xbox_controller","data":{"status":"Connected"}}"#;
        assert!(matches!(decode_push(line, PLUGIN), Err(JogpadError::Protocol(_))));
    }

    #[test]
    fn test_decode_missing_fields_is_error() {
        let line = r#"{"plugin":"xbox_controller","data":{"type":"connection_info","source":"backend"}}"#;
        assert!(matches!(decode_push(line, PLUGIN), Err(JogpadError::Protocol(_))));
    }
}
