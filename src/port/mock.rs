//! Mock serial port and opener for testing without hardware.
//!
//! `MockSerialPort` simulates a device on the other end of the line: bytes
//! can be queued immediately, scheduled to "arrive" after a delay, or armed
//! as automatic replies to whatever is written. Cloning a mock shares its
//! state, so a test can keep a handle while the code under test owns the
//! boxed adapter.
//!
//! `MockPortOpener` scripts a whole bench of ports for driving the discovery
//! orchestrator end to end.

use super::error::PortError;
use super::traits::{PortOpener, SerialPortAdapter};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct MockPortState {
    /// Bytes immediately available to read.
    read_queue: VecDeque<u8>,
    /// Bytes that become available once their instant has passed.
    scheduled: Vec<(Instant, Vec<u8>)>,
    /// Log of all writes, one entry per `write_bytes` call.
    write_log: Vec<Vec<u8>>,
    /// Replies armed for every write: (delay after the write, payload).
    replies_per_write: Vec<(Duration, Vec<u8>)>,
    /// Number of times `clear_buffers` was called.
    clear_count: usize,
    /// Force write failures.
    fail_writes: bool,
}

impl MockPortState {
    /// Move scheduled chunks whose time has come into the read queue.
    fn promote_due(&mut self) {
        let now = Instant::now();
        let mut due: Vec<usize> = Vec::new();
        for (i, (at, _)) in self.scheduled.iter().enumerate() {
            if *at <= now {
                due.push(i);
            }
        }
        // Preserve arrival order.
        for i in due.into_iter().rev() {
            let (_, data) = self.scheduled.remove(i);
            for b in data {
                self.read_queue.push_back(b);
            }
        }
    }
}

/// Mock serial port implementation for testing.
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    /// Make `data` immediately available to read.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data.iter().copied());
    }

    /// Make `data` available to read once `delay` has elapsed from now.
    pub fn enqueue_read_after(&self, delay: Duration, data: &[u8]) {
        self.state
            .lock()
            .scheduled
            .push((Instant::now() + delay, data.to_vec()));
    }

    /// Arm an automatic reply: after every write, `data` becomes readable
    /// once `delay` has elapsed.
    pub fn reply_every_write(&self, delay: Duration, data: &[u8]) {
        self.state
            .lock()
            .replies_per_write
            .push((delay, data.to_vec()));
    }

    /// Force subsequent writes to fail with a broken-pipe error.
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// All data written so far, one entry per write call.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// How many times the buffers were cleared.
    pub fn clear_count(&self) -> usize {
        self.state.lock().clear_count
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }

        state.write_log.push(data.to_vec());

        let now = Instant::now();
        let replies: Vec<(Instant, Vec<u8>)> = state
            .replies_per_write
            .iter()
            .map(|(delay, payload)| (now + *delay, payload.clone()))
            .collect();
        state.scheduled.extend(replies);

        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        state.promote_due();

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(b) => {
                    *byte = b;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 {
            Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "no data available",
            )))
        } else {
            Ok(bytes_read)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.read_queue.clear();
        state.scheduled.clear();
        state.clear_count += 1;
        Ok(())
    }

    fn bytes_to_read(&self) -> Option<usize> {
        let mut state = self.state.lock();
        state.promote_due();
        Some(state.read_queue.len())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available", &self.bytes_to_read())
            .finish()
    }
}

/// Scripted behavior for one mock port on the bench.
#[derive(Debug, Clone)]
enum PortScript {
    /// `open` always fails (busy / wrong permissions).
    Unopenable,
    /// Opens fine, never sends anything.
    Silent,
    /// Opens fine, every write fails with a broken-pipe error.
    WriteFault,
    /// Replies to every write, but only when opened at the given baud rate
    /// (`None` = any baud). Silence at the wrong baud mimics real hardware.
    Device {
        baud: Option<u32>,
        reply_delay: Duration,
        reply: Vec<u8>,
    },
}

#[derive(Default)]
struct OpenerState {
    scripts: HashMap<String, PortScript>,
    open_log: Vec<(String, u32)>,
}

/// Scripted opener: a virtual bench of serial ports for orchestrator tests.
#[derive(Clone, Default)]
pub struct MockPortOpener {
    state: Arc<Mutex<OpenerState>>,
}

impl MockPortOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a port whose `open` always fails.
    pub fn add_unopenable_port(&self, name: impl Into<String>) {
        self.state
            .lock()
            .scripts
            .insert(name.into(), PortScript::Unopenable);
    }

    /// Add a port that opens fine but never answers.
    pub fn add_silent_port(&self, name: impl Into<String>) {
        self.state
            .lock()
            .scripts
            .insert(name.into(), PortScript::Silent);
    }

    /// Add a port that opens fine but fails every write, like an adapter
    /// yanked mid-probe.
    pub fn add_write_fault_port(&self, name: impl Into<String>) {
        self.state
            .lock()
            .scripts
            .insert(name.into(), PortScript::WriteFault);
    }

    /// Add a device that answers every write with `reply`, but only when
    /// opened at `baud`. At any other baud the port is silent.
    pub fn add_device_at_baud(
        &self,
        name: impl Into<String>,
        baud: u32,
        reply_delay: Duration,
        reply: &[u8],
    ) {
        self.state.lock().scripts.insert(
            name.into(),
            PortScript::Device {
                baud: Some(baud),
                reply_delay,
                reply: reply.to_vec(),
            },
        );
    }

    /// Add a device that answers every write regardless of baud rate.
    pub fn add_device(&self, name: impl Into<String>, reply_delay: Duration, reply: &[u8]) {
        self.state.lock().scripts.insert(
            name.into(),
            PortScript::Device {
                baud: None,
                reply_delay,
                reply: reply.to_vec(),
            },
        );
    }

    /// Every `(port, baud)` pair that was opened (or attempted), in order.
    pub fn open_attempts(&self) -> Vec<(String, u32)> {
        self.state.lock().open_log.clone()
    }

    /// Distinct port names that saw at least one open attempt.
    pub fn touched_ports(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for (port, _) in self.state.lock().open_log.iter() {
            if !seen.contains(port) {
                seen.push(port.clone());
            }
        }
        seen
    }
}

impl PortOpener for MockPortOpener {
    fn open(
        &self,
        port_name: &str,
        baud_rate: u32,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let mut state = self.state.lock();
        state.open_log.push((port_name.to_string(), baud_rate));

        let script = state
            .scripts
            .get(port_name)
            .cloned()
            .ok_or_else(|| PortError::not_found(port_name))?;
        drop(state);

        let port = MockSerialPort::new(port_name);
        match script {
            PortScript::Unopenable => {
                return Err(PortError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "mock port busy",
                )))
            }
            PortScript::Silent => {}
            PortScript::WriteFault => port.fail_writes(true),
            PortScript::Device {
                baud,
                reply_delay,
                reply,
            } => {
                if baud.is_none() || baud == Some(baud_rate) {
                    port.reply_every_write(reply_delay, &reply);
                }
            }
        }

        Ok(Box::new(port))
    }
}
