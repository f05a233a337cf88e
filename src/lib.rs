//! Fixture Scout
//!
//! Automatic discovery of test-fixture controllers on serial ports. The
//! engine sweeps candidate ports across baud rates, probe commands, and line
//! endings, classifies whatever comes back, and reports the first port that
//! answers like a fixture as a `port@baud@MODE` descriptor. A small session
//! layer then talks to the discovered fixture.
//!
//! # Modules
//!
//! - `config`: TOML configuration with environment overrides
//! - `classify`: heuristic response classifier
//! - `descriptor`: `port@baud@MODE` descriptor codec
//! - `discovery`: port-sweep orchestrator
//! - `port`: serial transport abstraction (real and mock)
//! - `probe`: single-port probe engine
//! - `reader`: adaptive tail reader
//! - `session`: command sessions against a discovered fixture

pub mod classify;
pub mod config;
pub mod descriptor;
pub mod discovery;
pub mod port;
pub mod probe;
pub mod reader;
pub mod session;

// Re-export commonly used types for convenience
pub use classify::{classify_bytes, Classification, ClassifierThresholds};
pub use descriptor::{DescriptorError, LineEnding, PortDescriptor};
pub use discovery::{discover, CancelToken, DiscoveryHooks, DiscoveryOutcome};
pub use port::{
    list_candidate_ports, MockPortOpener, MockSerialPort, PortError, PortListing, PortOpener,
    SerialPortAdapter, SyncSerialPort, SystemPortOpener,
};
pub use probe::{probe_port, ProbeOptions, ProbeResult};
pub use reader::{read_with_tail, TailReadConfig};
pub use session::{send_binary, send_text, SessionConfig, TextReply};
