//! Core traits for the serial transport capability.
//!
//! The discovery engine never talks to hardware directly; it consumes the
//! minimal capability surface defined here (open, bytes available, read,
//! write, reset buffers — close is `Drop`). Real ports and mocks implement
//! the same traits so the sweep and the tail reader are testable without
//! hardware.

use super::error::PortError;
use std::time::Duration;

/// How long a zero-progress write backs off before retrying.
const WRITE_RETRY_SLEEP: Duration = Duration::from_millis(2);

/// Trait for byte-level serial port I/O.
///
/// Implementations are exclusively owned by whichever probe opened them and
/// release the underlying handle on drop.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written (may be short).
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Returns the number of bytes actually read. When no data is available
    /// a `WouldBlock`/`TimedOut` I/O error is returned.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Discard any unread data in the receive buffer and any unsent data in
    /// the transmit buffer.
    fn clear_buffers(&mut self) -> Result<(), PortError>;

    /// Bytes currently available to read, or `None` if the driver cannot say.
    fn bytes_to_read(&self) -> Option<usize>;

    /// Write the whole payload, retrying short writes.
    ///
    /// A probe command must not be truncated: a half-sent `SHOW_COMMAND`
    /// elicits garbage instead of a help dump. Short writes and would-block
    /// timeouts back off briefly and retry without an overall bound; payloads
    /// are a handful of bytes, and a hard write fault still returns an error.
    fn write_all_bytes(&mut self, data: &[u8]) -> Result<(), PortError> {
        let mut written = 0;
        while written < data.len() {
            match self.write_bytes(&data[written..]) {
                Ok(0) => std::thread::sleep(WRITE_RETRY_SLEEP),
                Ok(n) => written += n,
                Err(e) if e.is_would_block() => std::thread::sleep(WRITE_RETRY_SLEEP),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Capability to open a named port at a baud rate.
///
/// Discovery sweeps through many (port, baud) pairs; injecting the opener
/// lets tests drive the whole orchestrator against scripted mock ports.
pub trait PortOpener: Send + Sync {
    /// Open `port_name` at `baud_rate` (8 data bits, no parity, 1 stop bit).
    fn open(&self, port_name: &str, baud_rate: u32)
        -> Result<Box<dyn SerialPortAdapter>, PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MockSerialPort;

    #[test]
    fn test_write_all_bytes_logs_single_write() {
        let port = MockSerialPort::new("MOCK0");
        let mut handle = port.clone();
        handle.write_all_bytes(b"SHOW_COMMAND\r\n").unwrap();
        assert_eq!(port.write_log(), vec![b"SHOW_COMMAND\r\n".to_vec()]);
    }
}
