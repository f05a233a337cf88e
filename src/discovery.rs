//! Discovery orchestrator: walk candidate ports in order, probe each, stop
//! at the first fixture.

use crate::descriptor::PortDescriptor;
use crate::probe::{probe_port, ProbeOptions, ProbeResult};
use crate::port::PortOpener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Cooperative cancellation handle for a running discovery sweep.
///
/// Clones share the flag; cancellation is checked between ports, so an
/// in-flight probe on one port still runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Observation hooks for a discovery sweep.
#[derive(Default)]
pub struct DiscoveryHooks {
    /// Checked between ports; a cancelled sweep returns what it has so far.
    pub cancel: Option<CancelToken>,
    /// Called once per probed port with that port's result.
    pub progress: Option<Box<dyn Fn(&ProbeResult) + Send + Sync>>,
}

/// What a discovery sweep produced.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DiscoveryOutcome {
    /// Descriptor of the first fixture found, if any.
    pub descriptor: Option<PortDescriptor>,
    /// Per-port results, in probe order, up to and including the hit.
    pub attempts: Vec<ProbeResult>,
}

impl DiscoveryOutcome {
    /// The `port@baud@MODE` string, when a fixture was found.
    pub fn descriptor_string(&self) -> Option<String> {
        self.descriptor.as_ref().map(|d| d.to_string())
    }
}

/// Order candidate ports for probing: ports named in `prefer_first` come
/// first (in preference order, membership-filtered), the rest keep their
/// original relative order. Unknown preferred names are ignored.
pub fn order_ports(ports: &[String], prefer_first: &[String]) -> Vec<String> {
    let mut ordered: Vec<String> = prefer_first
        .iter()
        .filter(|p| ports.contains(p))
        .cloned()
        .collect();
    for port in ports {
        if !ordered.contains(port) {
            ordered.push(port.clone());
        }
    }
    ordered
}

/// Probe `ports` in preference order and stop at the first fixture.
///
/// Every probed port contributes an entry to `attempts`, so a sweep that
/// finds nothing still explains what each port looked like.
pub fn discover(
    opener: &dyn PortOpener,
    ports: &[String],
    prefer_first: &[String],
    opts: &ProbeOptions,
    hooks: &DiscoveryHooks,
) -> DiscoveryOutcome {
    let ordered = order_ports(ports, prefer_first);
    info!(candidates = ordered.len(), "starting discovery sweep");

    let mut attempts = Vec::new();
    for port_name in &ordered {
        if let Some(cancel) = &hooks.cancel {
            if cancel.is_cancelled() {
                debug!(port = port_name.as_str(), "sweep cancelled before port");
                break;
            }
        }

        let result = probe_port(opener, port_name, opts);
        if let Some(progress) = &hooks.progress {
            progress(&result);
        }

        if result.is_fixture {
            let descriptor =
                PortDescriptor::new(&result.port, result.baud_rate, result.line_ending);
            info!(descriptor = %descriptor, "fixture discovered");
            attempts.push(result);
            return DiscoveryOutcome {
                descriptor: Some(descriptor),
                attempts,
            };
        }
        attempts.push(result);
    }

    info!(probed = attempts.len(), "sweep finished without a fixture");
    DiscoveryOutcome {
        descriptor: None,
        attempts,
    }
}
