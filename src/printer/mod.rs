//! # Printer Module
//!
//! Serial link to the printer's G-code interface.
//!
//! This module handles:
//! - Opening the configured port, or auto-detecting a USB serial device
//! - Writing G-code with a bounded write timeout
//! - Translating actuation commands before they hit the wire

pub mod port_trait;

use std::time::Duration;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{JogpadError, Result};
use crate::protocol::gcode::to_gcode;
use crate::protocol::Command;
use port_trait::{SerialPortIO, TokioSerialPort};

/// Printer device paths tried when none is configured (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC (most printer boards)
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// G-code link to the printer
pub struct PrinterSerial<P: SerialPortIO = TokioSerialPort> {
    port: P,
    device_path: String,
    write_timeout: Duration,
}

impl<P: SerialPortIO> std::fmt::Debug for PrinterSerial<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrinterSerial")
            .field("device_path", &self.device_path)
            .field("write_timeout", &self.write_timeout)
            .finish_non_exhaustive()
    }
}

impl PrinterSerial<TokioSerialPort> {
    /// Open the printer described by `config`
    ///
    /// Uses `config.port` if set, otherwise tries [`DEFAULT_DEVICE_PATHS`].
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if no candidate could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use jogpad::config::SerialConfig;
    /// use jogpad::printer::PrinterSerial;
    ///
    /// let printer = PrinterSerial::open(&SerialConfig::default())?;
    /// println!("Printer on {}", printer.device_path());
    /// # Ok::<(), jogpad::error::JogpadError>(())
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let configured = [config.port.as_str()];
        let paths: &[&str] = if config.port.is_empty() {
            DEFAULT_DEVICE_PATHS
        } else {
            &configured
        };
        Self::open_with_paths(paths, config.baud_rate, Duration::from_millis(config.timeout_ms))
    }

    /// Open the first of `paths` that answers
    pub fn open_with_paths(paths: &[&str], baud_rate: u32, write_timeout: Duration) -> Result<Self> {
        for path in paths {
            debug!("Trying to open printer port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(stream) => {
                    info!("Opened printer at {} ({} baud)", path, baud_rate);
                    return Ok(Self::with_port(TokioSerialPort::new(stream), path, write_timeout));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                }
            }
        }

        Err(JogpadError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| JogpadError::Serial(format!("Failed to open {}: {}", path, e)))
    }
}

impl<P: SerialPortIO> PrinterSerial<P> {
    /// Wrap an already-open port
    pub fn with_port(port: P, device_path: &str, write_timeout: Duration) -> Self {
        Self {
            port,
            device_path: device_path.to_string(),
            write_timeout,
        }
    }

    /// Write G-code text and flush
    ///
    /// # Errors
    ///
    /// Returns `Serial` if the write or flush fails or exceeds the write timeout
    pub async fn send_gcode(&mut self, gcode: &str) -> Result<()> {
        let write = async {
            self.port
                .write_all(gcode.as_bytes())
                .await
                .map_err(|e| JogpadError::Serial(format!("Failed to write G-code: {}", e)))?;
            self.port
                .flush()
                .await
                .map_err(|e| JogpadError::Serial(format!("Failed to flush serial port: {}", e)))
        };

        tokio::time::timeout(self.write_timeout, write)
            .await
            .map_err(|_| {
                JogpadError::Serial(format!(
                    "Write to {} timed out after {:?}",
                    self.device_path, self.write_timeout
                ))
            })??;

        debug!("Sent G-code: {}", gcode.trim_end().replace('\n', " | "));
        Ok(())
    }

    /// Translate an actuation command and send it
    ///
    /// # Errors
    ///
    /// Returns `Transport` for commands that have no G-code form
    pub async fn send_command(&mut self, command: &Command) -> Result<()> {
        let gcode = to_gcode(command).ok_or_else(|| {
            JogpadError::Transport(format!("'{}' is not a printer command", command.name()))
        })?;
        self.send_gcode(&gcode).await
    }

    /// Path of the opened device
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[cfg(test)]
mod tests {
    use super::port_trait::mocks::MockSerialPort;
    use super::*;
    use crate::protocol::Axis;
    use std::io;

    fn printer(mock: &MockSerialPort) -> PrinterSerial<MockSerialPort> {
        PrinterSerial::with_port(mock.clone(), "/dev/mock0", Duration::from_millis(100))
    }

    #[test]
    fn test_device_path_order() {
        assert_eq!(DEFAULT_DEVICE_PATHS, &["/dev/ttyACM0", "/dev/ttyUSB0"]);
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let result = PrinterSerial::open_with_paths(
            &["/dev/nonexistent0", "/dev/nonexistent1"],
            115_200,
            Duration::from_millis(100),
        );

        match result.unwrap_err() {
            JogpadError::SerialPortNotFound(msg) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_configured_port_only() {
        let config = SerialConfig {
            port: "/dev/nonexistent_printer_12345".to_string(),
            ..SerialConfig::default()
        };

        match PrinterSerial::open(&config).unwrap_err() {
            JogpadError::SerialPortNotFound(msg) => {
                assert_eq!(msg, "/dev/nonexistent_printer_12345");
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        match PrinterSerial::open_port("/dev/nonexistent_serial_device_12345", 115_200).unwrap_err() {
            JogpadError::Serial(msg) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_gcode_writes_text() {
        let mock = MockSerialPort::new();
        let mut printer = printer(&mock);

        printer.send_gcode("G28 X Y\n").await.unwrap();
        assert_eq!(mock.written_text(), "G28 X Y\n");
        assert_eq!(printer.device_path(), "/dev/mock0");
    }

    #[tokio::test]
    async fn test_send_command_translates_jog() {
        let mock = MockSerialPort::new();
        let mut printer = printer(&mock);

        printer
            .send_command(&Command::Jog { axis: Axis::Z, distance: -1.5, feedrate: 900 })
            .await
            .unwrap();
        assert_eq!(mock.written_text(), "G91\nG1 Z-1.5 F900\nG90\n");
    }

    #[tokio::test]
    async fn test_send_command_rejects_backend_commands() {
        let mock = MockSerialPort::new();
        let mut printer = printer(&mock);

        let result = printer.send_command(&Command::ToggleTestMode { enabled: true }).await;
        assert!(matches!(result, Err(JogpadError::Transport(_))));
        assert!(mock.written_text().is_empty());
    }

    #[tokio::test]
    async fn test_write_error_is_reported() {
        let mock = MockSerialPort::new();
        mock.set_write_error(io::ErrorKind::BrokenPipe);
        let mut printer = printer(&mock);

        match printer.send_gcode("G28\n").await.unwrap_err() {
            JogpadError::Serial(msg) => assert!(msg.contains("Failed to write")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_flush_error_is_reported() {
        let mock = MockSerialPort::new();
        mock.set_flush_error(io::ErrorKind::TimedOut);
        let mut printer = printer(&mock);

        match printer.send_gcode("G28\n").await.unwrap_err() {
            JogpadError::Serial(msg) => assert!(msg.contains("Failed to flush")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_open_with_real_hardware() {
        match PrinterSerial::open(&SerialConfig::default()) {
            Ok(printer) => println!("Opened printer at: {}", printer.device_path()),
            Err(e) => println!("No printer detected (this is OK for CI/CD): {}", e),
        }
    }
}
