//! Synchronous serial port implementation.
//!
//! Wraps the `serialport` crate behind the `SerialPortAdapter` trait. Line
//! settings are fixed at 8 data bits, no parity, 1 stop bit, no flow control;
//! fixtures are not known to use anything else and the discovery core does
//! not expose them.

use super::error::PortError;
use super::traits::{PortOpener, SerialPortAdapter};
use std::io::{Read, Write};
use std::time::Duration;

/// Synchronous serial port backed by `serialport::SerialPort`.
pub struct SyncSerialPort {
    port: Box<dyn serialport::SerialPort>,
    name: String,
}

impl SyncSerialPort {
    /// Open a serial port at the given baud rate (8N1, no flow control).
    ///
    /// `read_timeout` only bounds individual `read_bytes` calls; the adaptive
    /// tail reader polls `bytes_to_read` first, so this stays short.
    pub fn open(port_name: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, PortError> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(read_timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(port_name),
                _ => PortError::Serial(e),
            })?;

        Ok(Self {
            port,
            name: port_name.to_string(),
        })
    }
}

impl SerialPortAdapter for SyncSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let n = self.port.write(data).map_err(PortError::Io)?;
        self.port.flush().map_err(PortError::Io)?;
        Ok(n)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.port.read(buffer).map_err(PortError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        self.port
            .clear(serialport::ClearBuffer::All)
            .map_err(PortError::Serial)
    }

    fn bytes_to_read(&self) -> Option<usize> {
        self.port.bytes_to_read().ok().map(|n| n as usize)
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate())
            .finish()
    }
}

/// Opener backed by real system serial ports.
#[derive(Debug, Clone)]
pub struct SystemPortOpener {
    /// Read timeout applied to each opened port.
    pub read_timeout: Duration,
}

impl Default for SystemPortOpener {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(200),
        }
    }
}

impl PortOpener for SystemPortOpener {
    fn open(
        &self,
        port_name: &str,
        baud_rate: u32,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        Ok(Box::new(SyncSerialPort::open(
            port_name,
            baud_rate,
            self.read_timeout,
        )?))
    }
}
