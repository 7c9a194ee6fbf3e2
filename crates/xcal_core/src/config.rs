//! Engine configuration.
//!
//! # Responsibility
//! - Provide defaults for every setting.
//! - Layer an optional JSON file and environment variables on top.
//!
//! # Invariants
//! - Precedence: defaults < JSON file < environment < explicit overrides
//!   applied by the caller afterwards.
//! - `validate` rejects values the engine cannot run with.

use crate::pipeline::PipelineAdapter;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_TOOL: &str = "XCAL_TOOL";
pub const ENV_TOOL_TIMEOUT_SECS: &str = "XCAL_TOOL_TIMEOUT_SECS";
pub const ENV_DATE_MASK: &str = "DATEMSK";
pub const ENV_DB: &str = "XCAL_DB";
pub const ENV_VALIDATE_ON_OPEN: &str = "XCAL_VALIDATE_ON_OPEN";
pub const ENV_LOG_LEVEL: &str = "XCAL_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "XCAL_LOG_DIR";

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "warning", "error"];

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        error: std::io::Error,
    },
    Parse {
        path: PathBuf,
        error: serde_json::Error,
    },
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, error } => {
                write!(f, "cannot read config `{}`: {error}", path.display())
            }
            Self::Parse { path, error } => {
                write!(f, "cannot parse config `{}`: {error}", path.display())
            }
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { error, .. } => Some(error),
            Self::Parse { error, .. } => Some(error),
            Self::InvalidValue { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub tool_path: PathBuf,
    pub tool_timeout_secs: u64,
    /// Template file exported to the tool as `DATEMSK`.
    pub date_mask: Option<PathBuf>,
    pub database_path: PathBuf,
    pub connect_attempts: u32,
    /// Check files with the tool's `-info` before loading them.
    pub validate_on_open: bool,
    pub log_level: Option<String>,
    /// Absolute directory for rotated log files; no file logging when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tool_path: PathBuf::from("./caltool"),
            tool_timeout_secs: 30,
            date_mask: None,
            database_path: PathBuf::from("xcal.sqlite3"),
            connect_attempts: 3,
            validate_on_open: false,
            log_level: None,
            log_dir: None,
        }
    }
}

impl EngineConfig {
    /// Defaults, then `file` when given, then the process environment.
    pub fn load(file: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match file {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.apply_env(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.to_path_buf(),
            error,
        })?;
        serde_json::from_str(&text).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Applies recognised variables from `vars`; others are ignored.
    pub fn apply_env<I>(&mut self, vars: I) -> ConfigResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                ENV_TOOL => self.tool_path = PathBuf::from(value),
                ENV_TOOL_TIMEOUT_SECS => {
                    self.tool_timeout_secs =
                        value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                            key: ENV_TOOL_TIMEOUT_SECS,
                            value: value.clone(),
                            reason: "expected whole seconds",
                        })?;
                }
                ENV_DATE_MASK => self.date_mask = Some(PathBuf::from(value)),
                ENV_DB => self.database_path = PathBuf::from(value),
                ENV_VALIDATE_ON_OPEN => {
                    self.validate_on_open = parse_flag(&value).ok_or(ConfigError::InvalidValue {
                        key: ENV_VALIDATE_ON_OPEN,
                        value: value.clone(),
                        reason: "expected 1|0|true|false",
                    })?;
                }
                ENV_LOG_LEVEL => self.log_level = Some(value),
                ENV_LOG_DIR => self.log_dir = Some(PathBuf::from(value)),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.tool_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tool_timeout_secs",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }
        if self.connect_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "connect_attempts",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }
        if let Some(level) = &self.log_level {
            if !LOG_LEVELS.contains(&level.trim().to_ascii_lowercase().as_str()) {
                return Err(ConfigError::InvalidValue {
                    key: "log_level",
                    value: level.clone(),
                    reason: "expected trace|debug|info|warn|error",
                });
            }
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    key: "log_dir",
                    value: dir.display().to_string(),
                    reason: "must be an absolute path",
                });
            }
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn pipeline_adapter(&self) -> PipelineAdapter {
        PipelineAdapter::new(self.tool_path.clone(), self.tool_timeout())
            .with_date_mask(self.date_mask.clone())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use std::path::PathBuf;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn file_values_are_overridden_by_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xcal.json");
        std::fs::write(
            &path,
            r#"{ "tool_path": "/opt/caltool", "tool_timeout_secs": 5, "database_path": "from-file.db" }"#,
        )
        .unwrap();

        let mut config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.tool_path, PathBuf::from("/opt/caltool"));
        assert_eq!(config.connect_attempts, 3);

        config
            .apply_env(vars(&[("XCAL_DB", "from-env.db"), ("DATEMSK", "/etc/datemsk")]))
            .unwrap();
        assert_eq!(config.database_path, PathBuf::from("from-env.db"));
        assert_eq!(config.date_mask, Some(PathBuf::from("/etc/datemsk")));
        assert_eq!(config.tool_timeout_secs, 5);
    }

    #[test]
    fn malformed_values_are_reported() {
        let mut config = EngineConfig::default();
        let err = config
            .apply_env(vars(&[("XCAL_TOOL_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        config.log_dir = Some(PathBuf::from("relative/logs"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xcal.json");
        std::fs::write(&path, r#"{ "tool": "x" }"#).unwrap();
        assert!(matches!(
            EngineConfig::from_json_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
