//! Port-specific error types.
//!
//! Transport failures are deliberately coarse: the discovery sweep only needs
//! to distinguish "could not open" (skip this baud) from "I/O failed
//! mid-probe" (skip this attempt). Both are recovered locally and never abort
//! the overall sweep.

use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during a read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialport-specific error occurred (open, buffer control).
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Whether this error means "no data right now" rather than a real fault.
    ///
    /// Non-blocking reads surface `WouldBlock`/`TimedOut`; the tail reader
    /// treats those as an empty poll cycle, not a failure.
    pub fn is_would_block(&self) -> bool {
        matches!(
            self,
            Self::Io(e) if matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PortError::not_found("/dev/ttyUSB0");
        assert_eq!(err.to_string(), "Serial port not found: /dev/ttyUSB0");
    }

    #[test]
    fn test_would_block_detection() {
        let err = PortError::Io(std::io::Error::new(
            std::io::ErrorKind::WouldBlock,
            "no data",
        ));
        assert!(err.is_would_block());

        let err = PortError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
        assert!(!err.is_would_block());
    }
}
