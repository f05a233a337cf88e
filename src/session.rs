//! Command sessions against an already-discovered fixture.
//!
//! A session is deliberately stateless: each send opens the port described by
//! the descriptor, performs one exchange, and drops the port. Fixture
//! exchanges are seconds apart at most, and a held-open port blocks every
//! other tool on the bench.

use crate::descriptor::PortDescriptor;
use crate::port::{PortError, PortOpener};
use crate::reader::{read_with_tail, TailReadConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Session timing and terminator configuration.
///
/// Timeouts are carried in milliseconds so the struct round-trips cleanly
/// through the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum wait for the first response byte.
    pub first_byte_timeout_ms: u64,
    /// Quiet period that ends a response.
    pub tail_timeout_ms: u64,
    /// Hard ceiling on response collection once data starts.
    pub max_after_first_data_ms: u64,
    /// Markers that end a text exchange early. Matched case-insensitively
    /// against the collected response.
    pub terminators: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            first_byte_timeout_ms: 5_000,
            tail_timeout_ms: 2_000,
            max_after_first_data_ms: 12_000,
            terminators: vec!["PASS".to_string(), "FAIL".to_string(), "ERRO".to_string()],
        }
    }
}

impl SessionConfig {
    /// Tail-reader deadlines for this session.
    pub fn read_config(&self) -> TailReadConfig {
        TailReadConfig {
            first_byte_timeout: Duration::from_millis(self.first_byte_timeout_ms),
            tail_timeout: Duration::from_millis(self.tail_timeout_ms),
            max_after_first_data: Duration::from_millis(self.max_after_first_data_ms),
            ..TailReadConfig::default()
        }
    }
}

/// Outcome of one text exchange.
#[derive(Debug, Clone, Serialize)]
pub struct TextReply {
    /// Whether the fixture produced any data at all.
    pub ok: bool,
    /// The decoded response, or `"No data"` when the fixture stayed silent.
    pub response: String,
}

/// Send a text command to the fixture and collect its reply.
///
/// The descriptor's line ending is appended to `text` before sending. A
/// silent fixture is a normal outcome (`ok: false`, response `"No data"`);
/// transport faults are errors.
pub fn send_text(
    opener: &dyn PortOpener,
    text: &str,
    descriptor: &PortDescriptor,
    config: &SessionConfig,
) -> Result<TextReply, PortError> {
    let mut payload = text.as_bytes().to_vec();
    payload.extend_from_slice(descriptor.line_ending.as_bytes());

    let terminators: Vec<String> = config
        .terminators
        .iter()
        .map(|t| t.to_uppercase())
        .collect();
    let pred = move |raw: &[u8]| {
        let upper = String::from_utf8_lossy(raw).to_uppercase();
        terminators.iter().any(|t| upper.contains(t))
    };

    let raw = exchange(opener, descriptor, &payload, config, Some(&pred))?;
    if raw.is_empty() {
        debug!(port = descriptor.port.as_str(), command = text, "no reply");
        return Ok(TextReply {
            ok: false,
            response: "No data".to_string(),
        });
    }

    let response = String::from_utf8_lossy(&raw).to_string();
    info!(
        port = descriptor.port.as_str(),
        command = text,
        bytes = raw.len(),
        "command exchanged"
    );
    Ok(TextReply { ok: true, response })
}

/// Send raw bytes to the fixture and collect whatever comes back.
///
/// No line ending is appended and no terminator applies; the reply is bounded
/// only by the tail window and the hard cap. `None` means the fixture stayed
/// silent.
pub fn send_binary(
    opener: &dyn PortOpener,
    data: &[u8],
    descriptor: &PortDescriptor,
    config: &SessionConfig,
) -> Result<Option<Vec<u8>>, PortError> {
    let raw = exchange(opener, descriptor, data, config, None)?;
    Ok(if raw.is_empty() { None } else { Some(raw) })
}

/// One open/flush/write/read exchange. The port closes on drop either way.
fn exchange(
    opener: &dyn PortOpener,
    descriptor: &PortDescriptor,
    payload: &[u8],
    config: &SessionConfig,
    terminator: Option<&dyn Fn(&[u8]) -> bool>,
) -> Result<Vec<u8>, PortError> {
    let mut port = opener.open(&descriptor.port, descriptor.baud_rate)?;
    port.clear_buffers()?;
    port.write_all_bytes(payload)?;
    read_with_tail(port.as_mut(), &config.read_config(), terminator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::LineEnding;
    use crate::port::MockPortOpener;

    fn fast_config() -> SessionConfig {
        SessionConfig {
            first_byte_timeout_ms: 40,
            tail_timeout_ms: 25,
            max_after_first_data_ms: 300,
            ..SessionConfig::default()
        }
    }

    fn descriptor() -> PortDescriptor {
        PortDescriptor::new("COM3", 115_200, LineEnding::Crlf)
    }

    #[test]
    fn test_send_text_appends_line_ending() {
        let opener = MockPortOpener::new();
        opener.add_device("COM3", Duration::from_millis(2), b"OK\r\nRESULT PASS\r\n");

        let reply = send_text(&opener, "FIXTURE_IN", &descriptor(), &fast_config()).unwrap();
        assert!(reply.ok);
        assert!(reply.response.contains("RESULT PASS"));
    }

    #[test]
    fn test_send_text_silent_fixture_is_no_data() {
        let opener = MockPortOpener::new();
        opener.add_silent_port("COM3");

        let reply = send_text(&opener, "STATE", &descriptor(), &fast_config()).unwrap();
        assert!(!reply.ok);
        assert_eq!(reply.response, "No data");
    }

    #[test]
    fn test_send_text_unopenable_port_is_error() {
        let opener = MockPortOpener::new();
        opener.add_unopenable_port("COM3");

        assert!(send_text(&opener, "STATE", &descriptor(), &fast_config()).is_err());
    }

    #[test]
    fn test_send_text_unknown_port_is_error() {
        let opener = MockPortOpener::new();
        let err = send_text(&opener, "STATE", &descriptor(), &fast_config()).unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[test]
    fn test_terminator_ends_exchange_early() {
        let opener = MockPortOpener::new();
        // Without the PASS terminator freezing the window, the 200 ms
        // straggler would extend collection past the assertion bound.
        opener.add_device("COM3", Duration::from_millis(2), b"RESULT PASS\r\n");

        let start = std::time::Instant::now();
        let reply = send_text(&opener, "CHECK", &descriptor(), &fast_config()).unwrap();
        assert!(reply.ok);
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[test]
    fn test_send_binary_round_trip() {
        let opener = MockPortOpener::new();
        opener.add_device("COM3", Duration::from_millis(2), &[0x01, 0x02, 0xFF]);

        let reply = send_binary(&opener, &[0xAA], &descriptor(), &fast_config()).unwrap();
        assert_eq!(reply, Some(vec![0x01, 0x02, 0xFF]));
    }

    #[test]
    fn test_send_binary_silent_is_none() {
        let opener = MockPortOpener::new();
        opener.add_silent_port("COM3");

        let reply = send_binary(&opener, &[0xAA], &descriptor(), &fast_config()).unwrap();
        assert_eq!(reply, None);
    }
}
