use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VultError};
use crate::vault::ExportFormat;

/// Tool configuration, loaded from `vultitool.toml`.
///
/// Every field has a sensible default so vultitool works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Export format used when `--format` is not given ("json" or "toml").
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Environment variable checked for a passphrase before prompting.
    #[serde(default = "default_passphrase_env")]
    pub passphrase_env: String,

    /// Worker threads for batch decryption (0 = one per CPU).
    #[serde(default)]
    pub workers: usize,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_output_format() -> String {
    "json".to_string()
}

fn default_passphrase_env() -> String {
    "VULTITOOL_PASSPHRASE".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_format: default_output_format(),
            passphrase_env: default_passphrase_env(),
            workers: 0,
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the working directory.
    pub const FILE_NAME: &'static str = "vultitool.toml";

    /// Load settings from `<dir>/vultitool.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_file(&config_path)
    }

    /// Load settings from an explicit path, which must exist.
    pub fn load_file(config_path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            VultError::ConfigError(format!("cannot read {}: {e}", config_path.display()))
        })?;

        toml::from_str(&contents).map_err(|e| {
            VultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })
    }

    /// Load from `explicit` if given, otherwise from the working directory.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => {
                let cwd: PathBuf = std::env::current_dir().map_err(|e| {
                    VultError::ConfigError(format!("cannot determine working directory: {e}"))
                })?;
                Self::load(&cwd)
            }
        }
    }

    /// The configured default export format.
    pub fn export_format(&self) -> Result<ExportFormat> {
        self.output_format.parse().map_err(|_| {
            VultError::ConfigError(format!(
                "output_format '{}' is invalid — use 'json' or 'toml'",
                self.output_format
            ))
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.output_format, "json");
        assert_eq!(s.passphrase_env, "VULTITOOL_PASSPHRASE");
        assert_eq!(s.workers, 0);
        assert_eq!(s.export_format().unwrap(), ExportFormat::Json);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.output_format, "json");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
output_format = "toml"
passphrase_env = "VAULT_PW"
workers = 3
"#;
        fs::write(tmp.path().join(Settings::FILE_NAME), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.export_format().unwrap(), ExportFormat::Toml);
        assert_eq!(settings.passphrase_env, "VAULT_PW");
        assert_eq!(settings.workers, 3);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(Settings::FILE_NAME), "workers = 2\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.workers, 2);
        assert_eq!(settings.passphrase_env, "VULTITOOL_PASSPHRASE");
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(Settings::FILE_NAME), "not valid {{toml").unwrap();

        assert!(matches!(
            Settings::load(tmp.path()),
            Err(VultError::ConfigError(_))
        ));
    }

    #[test]
    fn explicit_path_must_exist() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        assert!(Settings::resolve(Some(&missing)).is_err());
    }

    #[test]
    fn invalid_output_format_is_a_config_error() {
        let s = Settings {
            output_format: "yaml".into(),
            ..Settings::default()
        };
        assert!(matches!(s.export_format(), Err(VultError::ConfigError(_))));
    }
}
