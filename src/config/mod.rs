//! TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of
//! priority):
//!
//! 1. `FIXTURE_SCOUT_CONFIG` environment variable (explicit path)
//! 2. `./fixture-scout.toml` (current directory)
//! 3. `~/.config/fixture-scout/fixture-scout.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\fixture-scout\fixture-scout.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! - `FIXTURE_SCOUT_LOG=debug` — log filter directive
//! - `FIXTURE_SCOUT_BAUDS=115200,9600` — baud sweep order
//! - `FIXTURE_SCOUT_SETTLE_MS=300` — post-open settle delay
//! - `FIXTURE_SCOUT_PREFER=COM7,COM3` — preferred probe order
//!
//! # Example
//!
//! ```rust,ignore
//! use fixture_scout::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//! println!("sweep bauds: {:?}", config.discovery.baud_rates);
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{resolve_config_path, ConfigLoader};
pub use schema::{Config, DiscoveryConfig, LoggingConfig};
