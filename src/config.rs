//! Runtime configuration
use serde_yaml::{self, Value};
use std::fs::File;
use std::path::Path;

use crate::{
    error::{ErrorCode, RuntimeError},
    recoverable_error,
    zmachine::ErrorHandling,
};

/// Default number of undo states held in memory
const DEFAULT_UNDO_SLOTS: usize = 10;

#[derive(Debug)]
/// Runtime configuration data
pub struct Config {
    /// Default foreground color
    foreground: u8,
    /// Default background color
    background: u8,
    /// Is logging enabled?
    logging: bool,
    /// Recoverable error handling
    error_handling: ErrorHandling,
    /// Undo state slots
    undo_slots: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            foreground: 9, // white text
            background: 2, // on a black background
            logging: false,
            error_handling: ErrorHandling::ContinueWarnOnce,
            undo_slots: DEFAULT_UNDO_SLOTS,
        }
    }
}

impl TryFrom<File> for Config {
    type Error = RuntimeError;

    fn try_from(value: File) -> Result<Self, Self::Error> {
        match serde_yaml::from_reader::<File, Value>(value) {
            Ok(data) => {
                let foreground = match data["foreground"].as_u64() {
                    Some(v) => v as u8,
                    None => 9,
                };
                let background = match data["background"].as_u64() {
                    Some(v) => v as u8,
                    None => 2,
                };
                let logging = match data["logging"].as_str() {
                    Some(t) => t == "enabled",
                    None => false,
                };
                let error_handling = match data["error_handling"].as_str() {
                    Some(t) => match t {
                        "continue_warn_always" => ErrorHandling::ContinueWarnAlways,
                        "continue_warn_once" => ErrorHandling::ContinueWarnOnce,
                        "ignore" => ErrorHandling::Ignore,
                        "abort" => ErrorHandling::Abort,
                        _ => ErrorHandling::ContinueWarnOnce,
                    },
                    None => ErrorHandling::ContinueWarnOnce,
                };
                let undo_slots = match data["undo_slots"].as_u64() {
                    Some(v) => v as usize,
                    None => DEFAULT_UNDO_SLOTS,
                };
                Ok(Config::new(
                    foreground,
                    background,
                    logging,
                    error_handling,
                    undo_slots,
                ))
            }
            Err(e) => recoverable_error!(ErrorCode::ConfigError, "{}", e),
        }
    }
}

/// Locate the configuration file.
///
/// Checks `$HOME/.zymurgy/config.yml` first, then `config.yml` in the
/// working directory.
///
/// # Returns
/// [Option] with the path of an existing config file or [None]
fn config_file() -> Option<String> {
    if let Some(home) = dirs::home_dir() {
        let filename = format!("{}/.zymurgy/config.yml", home.to_str().unwrap());
        if let Ok(true) = Path::new(&filename).try_exists() {
            return Some(filename);
        }
    }

    if let Ok(true) = Path::new("config.yml").try_exists() {
        Some("config.yml".to_string())
    } else {
        None
    }
}

impl Config {
    /// Constructor
    ///
    /// # Arguments
    /// * `foreground` - Default foreground (text) color
    /// * `background` - Default background color
    /// * `logging` - Logging enabled flag
    /// * `error_handling` - Recoverable error handling mode
    /// * `undo_slots` - Number of undo states to keep
    pub fn new(
        foreground: u8,
        background: u8,
        logging: bool,
        error_handling: ErrorHandling,
        undo_slots: usize,
    ) -> Self {
        Config {
            foreground,
            background,
            logging,
            error_handling,
            undo_slots,
        }
    }

    /// Load configuration.
    ///
    /// Reads the config file if one exists, falling back to defaults when it
    /// doesn't or can't be parsed.
    ///
    /// # Returns
    /// Configuration data
    pub fn load() -> Config {
        match config_file() {
            Some(filename) => match File::open(&filename) {
                Ok(f) => match Config::try_from(f) {
                    Ok(config) => config,
                    Err(e) => {
                        warn!(target: "app::config", "Error parsing {}: {}", filename, e);
                        Config::default()
                    }
                },
                Err(e) => {
                    warn!(target: "app::config", "Error opening {}: {}", filename, e);
                    Config::default()
                }
            },
            None => Config::default(),
        }
    }

    /// Get the default foreground (text) color
    ///
    /// # Returns
    /// Default foreground color
    pub fn foreground(&self) -> u8 {
        self.foreground
    }

    /// Get the default background color
    ///
    /// # Returns
    /// Default background color
    pub fn background(&self) -> u8 {
        self.background
    }

    /// Get the logging flag
    ///
    /// # Returns
    /// Logging flag
    pub fn logging(&self) -> bool {
        self.logging
    }

    /// Get the recoverable error handling mode
    ///
    /// # Returns
    /// Error handling mode
    pub fn error_handling(&self) -> ErrorHandling {
        self.error_handling
    }

    /// Get the number of undo states to keep
    ///
    /// # Returns
    /// Undo slot count
    pub fn undo_slots(&self) -> usize {
        self.undo_slots
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default() {
        let config = Config::default();
        assert_eq!(config.foreground(), 9);
        assert_eq!(config.background(), 2);
        assert!(!config.logging());
        assert_eq!(config.error_handling(), ErrorHandling::ContinueWarnOnce);
        assert_eq!(config.undo_slots(), 10);
    }

    #[test]
    fn test_try_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "foreground: 4").unwrap();
        writeln!(f, "background: 9").unwrap();
        writeln!(f, "logging: enabled").unwrap();
        writeln!(f, "error_handling: abort").unwrap();
        writeln!(f, "undo_slots: 4").unwrap();
        f.flush().unwrap();
        let config = Config::try_from(f.reopen().unwrap()).unwrap();
        assert_eq!(config.foreground(), 4);
        assert_eq!(config.background(), 9);
        assert!(config.logging());
        assert_eq!(config.error_handling(), ErrorHandling::Abort);
        assert_eq!(config.undo_slots(), 4);
    }

    #[test]
    fn test_try_from_file_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "logging: disabled").unwrap();
        f.flush().unwrap();
        let config = Config::try_from(f.reopen().unwrap()).unwrap();
        assert_eq!(config.foreground(), 9);
        assert_eq!(config.background(), 2);
        assert!(!config.logging());
        assert_eq!(config.error_handling(), ErrorHandling::ContinueWarnOnce);
        assert_eq!(config.undo_slots(), 10);
    }
}
