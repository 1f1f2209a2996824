//! Display sink and input producers for the host binary
//!
//! The board's passthrough output goes either to stdout or to a second
//! ("pass-through") serial device, and input lines come from stdin or from
//! that same device. Lines are queued raw, newline included.

use crate::error::{Error, Result};
use crate::input::InputQueue;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Read timeout on the pass-through device; bounds how long shutdown waits
const PASS_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Second serial device carrying display output and input lines
pub struct PassDevice {
    port: Box<dyn SerialPort>,
}

impl PassDevice {
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(PASS_READ_TIMEOUT)
            .open()
            .map_err(|e| {
                Error::Other(format!("Failed to open pass-through device {}: {}", path, e))
            })?;

        log::info!("Opened pass-through device: {} at {} baud", path, baud_rate);
        Ok(Self { port })
    }

    /// Split into a display sink and a line reader sharing the port
    pub fn split(self) -> Result<(Box<dyn Write + Send>, Box<dyn BufRead + Send>)> {
        let reader = self
            .port
            .try_clone()
            .map_err(|e| Error::Other(format!("Failed to clone pass-through port: {}", e)))?;
        Ok((Box::new(self.port), Box::new(BufReader::new(reader))))
    }
}

/// Queue every line from `reader` until EOF or shutdown
///
/// Read timeouts are not errors; they only give the loop a chance to see the
/// shutdown flag. `after_line` runs after each queued line (prompt printing).
/// Returns the number of lines queued.
pub fn pump_lines<R: BufRead>(
    mut reader: R,
    input: &InputQueue,
    shutdown: &AtomicBool,
    mut after_line: impl FnMut(),
) -> Result<usize> {
    let mut lines = 0;
    let mut line = Vec::new();

    while !shutdown.load(Ordering::Relaxed) {
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => {
                // EOF; keep an unterminated last line
                if !line.is_empty() {
                    input.append(&line);
                    lines += 1;
                }
                break;
            }
            Ok(_) if line.last() == Some(&b'\n') => {
                log::debug!("Sending input line: {} bytes", line.len());
                input.append(&line);
                line.clear();
                lines += 1;
                after_line();
            }
            Ok(_) => {}
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) => {}
            Err(e) => return Err(Error::Io(e)),
        }
    }

    Ok(lines)
}
