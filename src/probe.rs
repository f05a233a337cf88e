//! Single-port probe: sweep baud rates, probe commands, and line endings
//! against one port and report the best evidence found.

use crate::classify::{classify_bytes, Classification, ClassifierThresholds};
use crate::descriptor::LineEnding;
use crate::port::{PortOpener, SerialPortAdapter};
use crate::reader::{read_with_tail, TailReadConfig};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of probing one port, at the best attempt seen.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProbeResult {
    /// Port that was probed.
    pub port: String,
    /// Baud rate of the best attempt (0 when the port never answered).
    pub baud_rate: u32,
    /// Line ending of the best attempt.
    pub line_ending: LineEnding,
    /// Whether the best attempt classified as a fixture.
    pub is_fixture: bool,
    /// Evidence score of the best attempt.
    pub score: u32,
    /// Command-like lines in the best attempt.
    pub command_lines: u32,
    /// Distinct strong keywords in the best attempt.
    pub matched_keywords: std::collections::BTreeSet<String>,
    /// Leading lines of the best response, for diagnostics.
    pub sample: String,
}

/// Longest response prefix carried in `sample`.
const SAMPLE_LINES: usize = 60;

impl ProbeResult {
    /// Placeholder result for a port that produced no classified response at
    /// all (unopenable at every baud, or silent throughout).
    pub fn silent(port: &str) -> Self {
        Self {
            port: port.to_string(),
            baud_rate: 0,
            line_ending: LineEnding::None,
            is_fixture: false,
            score: 0,
            command_lines: 0,
            matched_keywords: Default::default(),
            sample: String::new(),
        }
    }

    fn from_classification(
        port: &str,
        baud_rate: u32,
        line_ending: LineEnding,
        c: &Classification,
    ) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            line_ending,
            is_fixture: c.is_fixture,
            score: c.score,
            command_lines: c.command_lines,
            matched_keywords: c.matched_keywords.iter().cloned().collect(),
            sample: c
                .lines
                .iter()
                .take(SAMPLE_LINES)
                .cloned()
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Strict ordering between attempts: a fixture verdict beats any
    /// non-fixture one, then higher score, then more command-like lines.
    pub fn better_than(&self, other: &ProbeResult) -> bool {
        if self.is_fixture != other.is_fixture {
            return self.is_fixture;
        }
        if self.score != other.score {
            return self.score > other.score;
        }
        self.command_lines > other.command_lines
    }
}

/// Everything a probe sweep varies or waits on.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Baud rates to try, in order. Most likely first.
    pub baud_rates: Vec<u32>,
    /// Probe commands to send at each baud.
    pub probe_commands: Vec<String>,
    /// Line endings to append to each command.
    pub line_endings: Vec<LineEnding>,
    /// Settle delay after opening a port, before any traffic.
    pub settle_delay: Duration,
    /// Perform a throwaway read after settling to swallow boot banners.
    pub drain_boot_noise: bool,
    /// Deadlines for each probe response read.
    pub read: TailReadConfig,
    /// Deadlines for the boot-noise drain read (much shorter).
    pub boot_drain_read: TailReadConfig,
    /// Classifier decision thresholds.
    pub thresholds: ClassifierThresholds,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            baud_rates: vec![115_200, 9_600, 57_600, 38_400, 19_200],
            probe_commands: vec![
                "?".to_string(),
                "help".to_string(),
                "HELP".to_string(),
                "Help".to_string(),
                "SHOW_COMMAND".to_string(),
            ],
            line_endings: LineEnding::ALL.to_vec(),
            settle_delay: Duration::from_millis(600),
            drain_boot_noise: true,
            read: TailReadConfig::default(),
            boot_drain_read: TailReadConfig {
                first_byte_timeout: Duration::from_millis(400),
                tail_timeout: Duration::from_millis(300),
                max_after_first_data: Duration::from_secs(2),
                ..TailReadConfig::default()
            },
            thresholds: ClassifierThresholds::default(),
        }
    }
}

/// Probe one port across every configured baud rate, command, and line
/// ending.
///
/// Returns as soon as any attempt classifies as a fixture; otherwise the
/// best-scoring attempt is reported for diagnostics. A port that cannot be
/// opened at some baud is skipped at that baud and the sweep continues.
pub fn probe_port(opener: &dyn PortOpener, port_name: &str, opts: &ProbeOptions) -> ProbeResult {
    let mut best = ProbeResult::silent(port_name);

    for &baud in &opts.baud_rates {
        let mut port = match opener.open(port_name, baud) {
            Ok(p) => p,
            Err(e) => {
                debug!(port = port_name, baud, error = %e, "open failed, skipping baud");
                continue;
            }
        };

        if !opts.settle_delay.is_zero() {
            std::thread::sleep(opts.settle_delay);
        }

        if let Err(e) = port.clear_buffers() {
            debug!(port = port_name, baud, error = %e, "clear failed after settle");
        }

        if opts.drain_boot_noise {
            match read_with_tail(port.as_mut(), &opts.boot_drain_read, None) {
                Ok(noise) if !noise.is_empty() => {
                    debug!(port = port_name, baud, bytes = noise.len(), "drained boot noise");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(port = port_name, baud, error = %e, "boot drain read failed");
                    continue;
                }
            }
        }

        for command in &opts.probe_commands {
            for &ending in &opts.line_endings {
                match probe_attempt(port.as_mut(), command, ending, opts) {
                    Ok(c) => {
                        let result =
                            ProbeResult::from_classification(port_name, baud, ending, &c);
                        if result.is_fixture {
                            info!(
                                port = port_name,
                                baud,
                                command,
                                ending = %ending,
                                score = result.score,
                                "fixture identified"
                            );
                            return result;
                        }
                        if result.better_than(&best) {
                            best = result;
                        }
                    }
                    Err(e) => {
                        debug!(
                            port = port_name,
                            baud,
                            command,
                            ending = %ending,
                            error = %e,
                            "probe attempt failed"
                        );
                    }
                }
            }
        }
    }

    debug!(
        port = best.port,
        score = best.score,
        "no fixture on port, best attempt recorded"
    );
    best
}

/// One command/ending attempt on an open port: flush, send, read, classify.
fn probe_attempt(
    port: &mut dyn SerialPortAdapter,
    command: &str,
    ending: LineEnding,
    opts: &ProbeOptions,
) -> Result<Classification, crate::port::PortError> {
    port.clear_buffers()?;

    let mut payload = command.as_bytes().to_vec();
    payload.extend_from_slice(ending.as_bytes());
    port.write_all_bytes(&payload)?;

    let raw = read_with_tail(port, &opts.read, None)?;
    Ok(classify_bytes(&raw, &opts.thresholds))
}
