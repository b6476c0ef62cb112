//! Run configuration
//!
//! Resolution order for the config file:
//! 1. `--config` on the command line
//! 2. `TERRITORY_CONFIG` environment variable
//! 3. `./territory.toml` if present
//! 4. Built-in defaults
//!
//! Command-line flags are applied on top by the binary.

use crate::records::{ColumnMap, InputFormat};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_ENV_VAR: &str = "TERRITORY_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "territory.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Membership table
    pub input: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// SQLite file; persistence is skipped when unset
    pub database: Option<PathBuf>,
    /// Extra aliases, `city,province` with header
    pub alias_file: Option<PathBuf>,
    pub delimiter: char,
    /// Unresolved values named in the log and quality report
    pub top_unresolved: usize,
    /// Unresolved share above which the run is flagged
    pub unresolved_warning_rate: f64,
    pub columns: ColumnMap,
    pub competitive_values: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let format = InputFormat::default();
        Config {
            input: None,
            output_dir: PathBuf::from("output"),
            database: None,
            alias_file: None,
            delimiter: format.delimiter as char,
            top_unresolved: 20,
            unresolved_warning_rate: 0.10,
            columns: format.columns,
            competitive_values: format.competitive_values,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("Invalid config file: {:?}", path))?;
        Ok(config)
    }

    /// Load following the resolution order above
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV_VAR).ok();
        match locate(cli_path, env_path.as_deref(), Path::new(DEFAULT_CONFIG_FILE)) {
            Some(path) => {
                debug!("Loading config from {:?}", path);
                Self::from_file(&path)
            }
            None => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn input_format(&self) -> Result<InputFormat> {
        if !self.delimiter.is_ascii() {
            bail!("Delimiter must be a single ASCII character, got {:?}", self.delimiter);
        }

        Ok(InputFormat {
            delimiter: self.delimiter as u8,
            columns: self.columns.clone(),
            competitive_values: self.competitive_values.clone(),
        })
    }
}

/// Explicit paths win even if missing, so a typo surfaces as an error
fn locate(cli_path: Option<&Path>, env_path: Option<&str>, fallback: &Path) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env_path.filter(|p| !p.trim().is_empty()) {
        return Some(PathBuf::from(path));
    }
    if fallback.exists() {
        return Some(fallback.to_path_buf());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        let format = config.input_format().unwrap();

        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.top_unresolved, 20);
        assert_eq!(format, InputFormat::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("territory.toml");
        fs::write(
            &path,
            r#"
input = "data/members_2025.csv"
delimiter = ";"

[columns]
city = "comune"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.input, Some(PathBuf::from("data/members_2025.csv")));
        assert_eq!(config.columns.city, "comune");
        assert_eq!(config.columns.year, "year");
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.input_format().unwrap().delimiter, b';');
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "top_unresolved = \"many\"").unwrap();

        assert!(Config::from_file(&path).is_err());
        assert!(Config::from_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let config = Config {
            delimiter: '§',
            ..Config::default()
        };

        assert!(config.input_format().is_err());
    }

    #[test]
    fn test_locate_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("territory.toml");
        let cli = Path::new("/etc/cli.toml");

        assert_eq!(
            locate(Some(cli), Some("/env.toml"), &fallback),
            Some(cli.to_path_buf())
        );
        assert_eq!(
            locate(None, Some("/env.toml"), &fallback),
            Some(PathBuf::from("/env.toml"))
        );
        assert_eq!(locate(None, Some("  "), &fallback), None);
        assert_eq!(locate(None, None, &fallback), None);

        fs::write(&fallback, "").unwrap();
        assert_eq!(locate(None, None, &fallback), Some(fallback.clone()));
    }
}
