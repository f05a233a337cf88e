//! Configuration loader with file resolution and environment overrides.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "FIXTURE_SCOUT";

/// Config file name
const CONFIG_FILE_NAME: &str = "fixture-scout.toml";

/// Environment variable naming an explicit config path
const CONFIG_PATH_ENV: &str = "FIXTURE_SCOUT_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `FIXTURE_SCOUT_CONFIG` environment variable (explicit path)
    /// 2. `./fixture-scout.toml` (current directory)
    /// 3. `~/.config/fixture-scout/fixture-scout.toml` (XDG on Linux/macOS)
    /// 4. `%APPDATA%\fixture-scout\fixture-scout.toml` (Windows)
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables override file values either way.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;

        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    ///
    /// Env overrides still apply, and a malformed one is an error here just
    /// as on the file-backed paths.
    pub fn with_defaults() -> ConfigResult<Self> {
        let mut config = Config::default();
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: None,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    if let Some(config_dir) = get_config_dir() {
        let app_config = config_dir.join("fixture-scout").join(CONFIG_FILE_NAME);
        if app_config.exists() {
            return Some(app_config);
        }
    }

    None
}

/// Platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Apply environment variable overrides.
///
/// Recognized variables:
/// - `FIXTURE_SCOUT_LOG` — log filter directive
/// - `FIXTURE_SCOUT_BAUDS` — comma-separated baud sweep, e.g. `115200,9600`
/// - `FIXTURE_SCOUT_SETTLE_MS` — post-open settle delay in milliseconds
/// - `FIXTURE_SCOUT_PREFER` — comma-separated preferred ports
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Ok(val) = std::env::var(format!("{}_LOG", ENV_PREFIX)) {
        config.logging.level = val;
    }

    if let Ok(val) = std::env::var(format!("{}_BAUDS", ENV_PREFIX)) {
        let bauds: Result<Vec<u32>, _> = val.split(',').map(|b| b.trim().parse()).collect();
        config.discovery.baud_rates = bauds.map_err(|_| {
            ConfigError::env_parse(
                format!("{}_BAUDS", ENV_PREFIX),
                "expected comma-separated baud rates",
            )
        })?;
    }

    if let Ok(val) = std::env::var(format!("{}_SETTLE_MS", ENV_PREFIX)) {
        config.discovery.settle_delay_ms = val.parse().map_err(|_| {
            ConfigError::env_parse(
                format!("{}_SETTLE_MS", ENV_PREFIX),
                "expected milliseconds as an integer",
            )
        })?;
    }

    if let Ok(val) = std::env::var(format!("{}_PREFER", ENV_PREFIX)) {
        config.discovery.prefer_first = val
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
    }

    if config.discovery.baud_rates.is_empty() {
        return Err(ConfigError::validation(
            "discovery.baud_rates",
            "at least one baud rate is required",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;

    #[test]
    #[serial]
    fn test_default_loader() {
        env::remove_var("FIXTURE_SCOUT_BAUDS");
        let loader = ConfigLoader::with_defaults().unwrap();
        assert_eq!(loader.config().discovery.baud_rates[0], 115_200);
        assert!(loader.config_path.is_none());
    }

    #[test]
    #[serial]
    fn test_env_baud_override() {
        env::set_var("FIXTURE_SCOUT_BAUDS", "9600, 19200");

        let loader = ConfigLoader::with_defaults().unwrap();
        assert_eq!(loader.config().discovery.baud_rates, vec![9_600, 19_200]);

        env::remove_var("FIXTURE_SCOUT_BAUDS");
    }

    #[test]
    #[serial]
    fn test_env_prefer_override() {
        env::set_var("FIXTURE_SCOUT_PREFER", "COM7,COM3");

        let loader = ConfigLoader::with_defaults().unwrap();
        assert_eq!(
            loader.config().discovery.prefer_first,
            vec!["COM7".to_string(), "COM3".to_string()]
        );

        env::remove_var("FIXTURE_SCOUT_PREFER");
    }

    #[test]
    #[serial]
    fn test_bad_env_baud_is_an_error() {
        env::set_var("FIXTURE_SCOUT_BAUDS", "fast");

        let mut config = Config::default();
        let result = apply_env_overrides(&mut config);
        assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));

        env::remove_var("FIXTURE_SCOUT_BAUDS");
    }

    #[test]
    #[serial]
    fn test_bad_env_baud_fails_default_loader_too() {
        env::set_var("FIXTURE_SCOUT_BAUDS", "fast");

        let result = ConfigLoader::with_defaults();
        assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));

        env::remove_var("FIXTURE_SCOUT_BAUDS");
    }

    #[test]
    #[serial]
    fn test_load_from_file_and_round_trip() {
        env::remove_var("FIXTURE_SCOUT_BAUDS");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[discovery]\nbaud_rates = [57600]\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let loader = ConfigLoader::load_from(file.path()).unwrap();
        assert_eq!(loader.config().discovery.baud_rates, vec![57_600]);
        assert_eq!(loader.config().logging.level, "debug");

        let out = tempfile::TempDir::new().unwrap();
        let saved = out.path().join("saved.toml");
        loader.save_to(&saved).unwrap();
        let back = ConfigLoader::load_from(&saved).unwrap();
        assert_eq!(back.config().discovery.baud_rates, vec![57_600]);
    }

    #[test]
    #[serial]
    fn test_missing_file_is_an_error() {
        let result = ConfigLoader::load_from("/nonexistent/fixture-scout.toml");
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
