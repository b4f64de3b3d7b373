//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "RS485_PROBE";

/// Config file name
const CONFIG_FILE_NAME: &str = "rs485-probe.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "RS485_PROBE_CONFIG";

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
    /// 1. `RS485_PROBE_CONFIG` environment variable (explicit path)
    /// 2. `./rs485-probe.toml` (current directory)
    /// 3. the platform config directory (`~/.config/rs485-probe/` on Linux)
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
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

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Some(app_config);
        }
    }

    None
}

/// Get the platform-specific config directory for this tool.
pub fn get_default_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "rs485-probe").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Parse `RS485_PROBE_<suffix>` if it is set.
fn env_value<T: FromStr>(suffix: &str, what: &str) -> ConfigResult<Option<T>> {
    let var = format!("{}_{}", ENV_PREFIX, suffix);
    match std::env::var(&var) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::env_parse(var, format!("Invalid {what}"))),
        Err(_) => Ok(None),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `RS485_PROBE_<SECTION>_<KEY>`
/// For example:
/// - `RS485_PROBE_SERIAL_PORT=/dev/ttyUSB1`
/// - `RS485_PROBE_SEQUENCE_REPEAT_COUNT=10`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Some(val) = env_value::<String>("SERIAL_PORT", "port")? {
        config.serial.port = val;
    }
    if let Some(val) = env_value("SERIAL_BAUD_RATE", "baud rate")? {
        config.serial.baud_rate = val;
    }
    if let Some(val) = env_value("SERIAL_TIMEOUT_MS", "timeout")? {
        config.serial.timeout_ms = val;
    }

    if let Some(val) = env_value("SEQUENCE_REPEAT_COUNT", "repeat count")? {
        config.sequence.repeat_count = val;
    }
    if let Some(val) = env_value("SEQUENCE_INTERVAL_MS", "interval")? {
        config.sequence.interval_ms = val;
    }
    if let Some(val) = env_value("SEQUENCE_AWAIT_RESPONSE", "flag (expected true or false)")? {
        config.sequence.await_response = val;
    }

    if let Some(val) = env_value::<PathBuf>("LOGGING_FILE", "path")? {
        config.logging.file = val;
    }
    if let Some(val) = env_value::<String>("LOGGING_CONSOLE_LEVEL", "level")? {
        config.logging.console_level = val;
    }
    if let Some(val) = env_value::<String>("LOGGING_FILE_LEVEL", "level")? {
        config.logging.file_level = val;
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
    fn test_empty_file_gives_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();

        let loader = ConfigLoader::load_from(file.path()).unwrap();
        assert_eq!(loader.config(), &Config::default());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        env::set_var("RS485_PROBE_SERIAL_PORT", "/dev/ttyUSB3");
        env::set_var("RS485_PROBE_SEQUENCE_REPEAT_COUNT", "7");

        let mut config = Config::default();
        apply_env_overrides(&mut config).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB3");
        assert_eq!(config.sequence.repeat_count, 7);

        env::remove_var("RS485_PROBE_SERIAL_PORT");
        env::remove_var("RS485_PROBE_SEQUENCE_REPEAT_COUNT");
    }

    #[test]
    #[serial]
    fn test_env_parse_error() {
        env::set_var("RS485_PROBE_SERIAL_BAUD_RATE", "fast");

        let mut config = Config::default();
        let err = apply_env_overrides(&mut config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EnvParseError { ref var, .. } if var == "RS485_PROBE_SERIAL_BAUD_RATE"
        ));

        env::remove_var("RS485_PROBE_SERIAL_BAUD_RATE");
    }

    #[test]
    #[serial]
    fn test_await_response_flag_is_strict() {
        let mut config = Config::default();

        env::set_var("RS485_PROBE_SEQUENCE_AWAIT_RESPONSE", "false");
        apply_env_overrides(&mut config).unwrap();
        assert!(!config.sequence.await_response);

        env::set_var("RS485_PROBE_SEQUENCE_AWAIT_RESPONSE", "yes");
        let err = apply_env_overrides(&mut config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EnvParseError { ref var, .. } if var == "RS485_PROBE_SEQUENCE_AWAIT_RESPONSE"
        ));

        env::remove_var("RS485_PROBE_SEQUENCE_AWAIT_RESPONSE");
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[serial]\nport = \"/dev/ttyS1\"\n\n[logging]\nfile = \"/tmp/probe.log\""
        )
        .unwrap();

        let loader = ConfigLoader::load_from(file.path()).unwrap();
        assert_eq!(loader.config().serial.port, "/dev/ttyS1");
        assert_eq!(loader.config().logging.file, PathBuf::from("/tmp/probe.log"));
        assert_eq!(loader.config_path.as_deref(), Some(file.path()));
    }

    #[test]
    #[serial]
    fn test_load_from_missing_file() {
        let err = ConfigLoader::load_from("/nonexistent/rs485-probe.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
