use clap::{Parser, Subcommand};
use fixture_scout::config::ConfigLoader;
use fixture_scout::descriptor::PortDescriptor;
use fixture_scout::discovery::{discover, DiscoveryHooks};
use fixture_scout::port::{list_candidate_ports, SystemPortOpener};
use fixture_scout::session::{send_binary, send_text, SessionConfig};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "fixture-scout",
    version,
    about = "Find and talk to test-fixture controllers on serial ports.",
    long_about = "Sweeps serial ports across baud rates, probe commands and line endings, \
                  classifies the responses, and reports the first fixture found as a \
                  port@baud@MODE descriptor."
)]
struct Args {
    /// Explicit configuration file path.
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log filter directive, e.g. `debug` or `fixture_scout=trace`.
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the serial ports present on this system.
    List {
        /// Include hardware identity (USB VID/PID) per port.
        #[arg(long)]
        details: bool,
    },

    /// Sweep ports for a fixture and print its descriptor.
    Scan {
        /// Candidate ports. Defaults to every enumerated port.
        ports: Vec<String>,

        /// Probe this port before all others. Repeatable.
        #[arg(long = "prefer")]
        prefer: Vec<String>,

        /// Emit the full sweep outcome as JSON instead of one line.
        #[arg(long)]
        json: bool,
    },

    /// Send one command to a fixture identified by its descriptor.
    Send {
        /// Descriptor of the fixture, e.g. `/dev/ttyUSB3@9600@CRLF`.
        descriptor: String,

        /// Command text, or hex bytes with `--hex` (e.g. `AA01FF`).
        payload: String,

        /// Interpret the payload as hex bytes and skip the line ending.
        #[arg(long)]
        hex: bool,

        /// Override the reply terminators, comma-separated.
        #[arg(long)]
        terminators: Option<String>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path),
        None => ConfigLoader::load(),
    };
    let config = match loader {
        Ok(loader) => loader.into_config(),
        Err(e) => {
            eprintln!("fixture-scout: {e}");
            return ExitCode::FAILURE;
        }
    };

    let directive = args.log.clone().unwrap_or_else(|| config.logging.level.clone());
    let filter = EnvFilter::try_from_env("FIXTURE_SCOUT_LOG")
        .unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(args, config) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("fixture-scout: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args, config: fixture_scout::config::Config) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match args.command {
        Command::List { details } => {
            let ports = list_candidate_ports()?;
            if ports.is_empty() {
                println!("no serial ports found");
                return Ok(ExitCode::SUCCESS);
            }
            for port in ports {
                if details {
                    println!("{}\t{}\t{}", port.name, port.description, port.hardware_id);
                } else {
                    println!("{}", port.name);
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Scan { ports, prefer, json } => {
            let candidates = if ports.is_empty() {
                list_candidate_ports()?
                    .into_iter()
                    .map(|p| p.name)
                    .collect()
            } else {
                ports
            };

            let mut prefer_first = prefer;
            if prefer_first.is_empty() {
                prefer_first = config.discovery.prefer_first.clone();
            }

            let opener = SystemPortOpener::default();
            let opts = config.discovery.probe_options(config.classifier);
            let hooks = DiscoveryHooks::default();
            let outcome = discover(&opener, &candidates, &prefer_first, &opts, &hooks);

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else if let Some(descriptor) = outcome.descriptor_string() {
                println!("{descriptor}");
            } else {
                eprintln!("no fixture found on {} port(s)", outcome.attempts.len());
            }

            Ok(if outcome.descriptor.is_some() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Command::Send {
            descriptor,
            payload,
            hex,
            terminators,
        } => {
            let descriptor: PortDescriptor = descriptor.parse()?;
            let mut session: SessionConfig = config.session;
            if let Some(list) = terminators {
                session.terminators = list
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
            }

            let opener = SystemPortOpener::default();
            if hex {
                let bytes = parse_hex(&payload)?;
                match send_binary(&opener, &bytes, &descriptor, &session)? {
                    Some(reply) => {
                        println!("{}", to_hex(&reply));
                        Ok(ExitCode::SUCCESS)
                    }
                    None => {
                        eprintln!("no data");
                        Ok(ExitCode::FAILURE)
                    }
                }
            } else {
                let reply = send_text(&opener, &payload, &descriptor, &session)?;
                println!("{}", reply.response);
                Ok(if reply.ok {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                })
            }
        }
    }
}

/// Parse a hex payload like `AA01FF` or `aa 01 ff`.
fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() || cleaned.len() % 2 != 0 {
        return Err(format!("hex payload `{text}` must have an even number of digits"));
    }
    (0..cleaned.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&cleaned[i..i + 2], 16)
                .map_err(|_| format!("hex payload `{text}` contains a non-hex digit"))
        })
        .collect()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
