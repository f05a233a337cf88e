//! Adaptive tail reader: capture an unframed response of unknown length.
//!
//! Fixture responses range from one short `OK` line to a sixty-line help
//! dump, with no framing and no known length. A single fixed timeout either
//! truncates the long responses or stalls on every silent port. The strategy
//! here is two-phase:
//!
//! 1. Wait up to `first_byte_timeout` for anything at all. Silence is a
//!    legitimate outcome, not an error.
//! 2. Once data starts, keep a sliding "tail window": each new chunk re-arms
//!    a quiet-period deadline of `tail_timeout`. The response is complete
//!    when the line goes quiet for that long.
//!
//! Two refinements bound the worst cases: a hard cap on total collection
//! time after the first byte (a streaming device never goes quiet), and an
//! optional terminator predicate that freezes the tail window as soon as a
//! known end marker appears, so command/response exchanges return promptly.

use crate::port::{PortError, SerialPortAdapter};
use std::time::{Duration, Instant};
use tracing::trace;

/// Scratch read size per poll cycle.
const READ_CHUNK: usize = 512;

/// Deadlines for one adaptive read.
#[derive(Debug, Clone, Copy)]
pub struct TailReadConfig {
    /// Maximum wait for the first byte. Expiring with nothing buffered is a
    /// valid "no data" outcome.
    pub first_byte_timeout: Duration,
    /// Quiet period required after the last byte before the response is
    /// considered complete.
    pub tail_timeout: Duration,
    /// Hard ceiling on collection time once the first byte has arrived.
    pub max_after_first_data: Duration,
    /// Sleep between polls of the available-byte count.
    pub poll_interval: Duration,
}

impl Default for TailReadConfig {
    fn default() -> Self {
        Self {
            first_byte_timeout: Duration::from_secs(3),
            tail_timeout: Duration::from_secs(2),
            max_after_first_data: Duration::from_secs(12),
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Collect a response from an already-open port using the two-phase deadline
/// strategy.
///
/// `terminator` is evaluated against the buffer-so-far; once it matches, the
/// tail window is frozen at `match time + tail_timeout` and no longer slides
/// with later traffic. Passing `None` (discovery: help dumps have no end
/// marker) means the window slides until the line goes quiet or the hard cap
/// fires.
///
/// Returns whatever was collected, possibly empty. Transport faults other
/// than "no data right now" propagate to the caller.
pub fn read_with_tail(
    port: &mut dyn SerialPortAdapter,
    config: &TailReadConfig,
    terminator: Option<&dyn Fn(&[u8]) -> bool>,
) -> Result<Vec<u8>, PortError> {
    let start = Instant::now();
    let first_deadline = start + config.first_byte_timeout;

    let mut buf: Vec<u8> = Vec::new();
    let mut scratch = [0u8; READ_CHUNK];
    let mut first_data_at: Option<Instant> = None;
    let mut tail_deadline: Option<Instant> = None;
    let mut terminator_seen = false;

    loop {
        let now = Instant::now();
        match first_data_at {
            None => {
                if now >= first_deadline {
                    break;
                }
            }
            Some(first) => {
                if now.duration_since(first) >= config.max_after_first_data {
                    trace!(bytes = buf.len(), "collection cap reached, stopping");
                    break;
                }
                if matches!(tail_deadline, Some(deadline) if now >= deadline) {
                    break;
                }
            }
        }

        let available = port.bytes_to_read().unwrap_or(0);
        if available == 0 {
            std::thread::sleep(config.poll_interval);
            continue;
        }

        let want = available.min(scratch.len());
        let n = match port.read_bytes(&mut scratch[..want]) {
            Ok(n) => n,
            Err(e) if e.is_would_block() => 0,
            Err(e) => return Err(e),
        };
        if n == 0 {
            std::thread::sleep(config.poll_interval);
            continue;
        }

        buf.extend_from_slice(&scratch[..n]);
        let now = Instant::now();
        if first_data_at.is_none() {
            first_data_at = Some(now);
        }

        // The window slides with traffic until a terminator freezes it.
        if !terminator_seen {
            tail_deadline = Some(now + config.tail_timeout);
            if let Some(pred) = terminator {
                if pred(&buf) {
                    terminator_seen = true;
                    trace!(bytes = buf.len(), "terminator matched, freezing tail window");
                }
            }
        }
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MockSerialPort;

    fn quick_config() -> TailReadConfig {
        TailReadConfig {
            first_byte_timeout: Duration::from_millis(80),
            tail_timeout: Duration::from_millis(60),
            max_after_first_data: Duration::from_millis(500),
            poll_interval: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_no_data_returns_empty_after_first_byte_timeout() {
        let mut port = MockSerialPort::new("MOCK0");
        let start = Instant::now();
        let buf = read_with_tail(&mut port, &quick_config(), None).unwrap();
        assert!(buf.is_empty());
        assert!(start.elapsed() >= Duration::from_millis(80));
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_tail_window_slides_with_traffic() {
        let mut port = MockSerialPort::new("MOCK0");
        // Gaps of 20 ms, each below the 60 ms tail window: nothing may be
        // cut off even though the total spans several window lengths.
        port.enqueue_read(b"line one\r\n");
        port.enqueue_read_after(Duration::from_millis(20), b"line two\r\n");
        port.enqueue_read_after(Duration::from_millis(40), b"line three\r\n");
        port.enqueue_read_after(Duration::from_millis(60), b"line four\r\n");

        let buf = read_with_tail(&mut port, &quick_config(), None).unwrap();
        assert_eq!(buf, b"line one\r\nline two\r\nline three\r\nline four\r\n");
    }

    #[test]
    fn test_quiet_period_ends_collection() {
        let mut port = MockSerialPort::new("MOCK0");
        port.enqueue_read(b"early");
        // Arrives 200 ms later, far beyond the 60 ms tail window.
        port.enqueue_read_after(Duration::from_millis(200), b"straggler");

        let buf = read_with_tail(&mut port, &quick_config(), None).unwrap();
        assert_eq!(buf, b"early");
    }

    #[test]
    fn test_hard_cap_bounds_streaming_device() {
        let mut port = MockSerialPort::new("MOCK0");
        // Continuous stream: a chunk every 10 ms for a full second, so the
        // 60 ms tail window never expires. The 150 ms cap must fire.
        for i in 0..100u32 {
            port.enqueue_read_after(Duration::from_millis(u64::from(i) * 10), b"spam ");
        }

        let config = TailReadConfig {
            max_after_first_data: Duration::from_millis(150),
            ..quick_config()
        };

        let start = Instant::now();
        let buf = read_with_tail(&mut port, &config, None).unwrap();
        let elapsed = start.elapsed();

        assert!(!buf.is_empty());
        assert!(buf.len() < 500, "cap should truncate the stream");
        assert!(elapsed >= Duration::from_millis(150));
        assert!(elapsed < Duration::from_millis(600));
    }

    #[test]
    fn test_terminator_freezes_tail_window() {
        let mut port = MockSerialPort::new("MOCK0");
        port.enqueue_read(b"RESULT PASS\r\n");
        // Inside the frozen window: still collected.
        port.enqueue_read_after(Duration::from_millis(20), b"trailing detail\r\n");
        // After the frozen deadline (~60 ms from the match): dropped, because
        // the 20 ms chunk must not have re-armed the window.
        port.enqueue_read_after(Duration::from_millis(120), b"too late\r\n");

        let pred = |raw: &[u8]| String::from_utf8_lossy(raw).to_uppercase().contains("PASS");
        let buf = read_with_tail(&mut port, &quick_config(), Some(&pred)).unwrap();

        let text = String::from_utf8_lossy(&buf).to_string();
        assert!(text.contains("RESULT PASS"));
        assert!(text.contains("trailing detail"));
        assert!(!text.contains("too late"));
    }

    #[test]
    fn test_late_first_byte_still_captured_in_full() {
        let mut port = MockSerialPort::new("MOCK0");
        // First byte lands just before the first-byte deadline, then a
        // multi-chunk dump follows. Nothing may be truncated and the result
        // must not look like "no data".
        port.enqueue_read_after(Duration::from_millis(280), b"HELP:\r\n");
        port.enqueue_read_after(Duration::from_millis(300), b"IN:FIXTURE IN\r\n");
        port.enqueue_read_after(Duration::from_millis(320), b"OUT:FIXTURE OUT\r\n");

        let config = TailReadConfig {
            first_byte_timeout: Duration::from_millis(300),
            ..quick_config()
        };
        let buf = read_with_tail(&mut port, &config, None).unwrap();
        assert_eq!(buf, b"HELP:\r\nIN:FIXTURE IN\r\nOUT:FIXTURE OUT\r\n");
    }
}
