//! Paging defaults loaded from TOML and the environment.
//!
//! Precedence: explicit path > `PAGELITE_CONFIG` > `./pagelite.toml` > defaults,
//! then `PAGELITE_DEFAULT_LIMIT` / `PAGELITE_TIMEOUT_MS` override whatever the
//! file said.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::PageError;
use crate::paginator::DEFAULT_LIMIT;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    /// Limit used when a caller passes 0 or a negative limit.
    pub default_limit: i64,
    /// Per-query deadline in milliseconds, measured from execution start.
    pub timeout_ms: Option<u64>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    /// log4rs YAML file; takes precedence over `log_dir`/`log_level`.
    pub log_config: Option<PathBuf>,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self { default_limit: DEFAULT_LIMIT, timeout_ms: None, log_dir: None, log_level: None, log_config: None }
    }
}

impl PagingConfig {
    /// # Errors
    /// Returns `PageError::Config` for malformed TOML or a non-positive `default_limit`.
    pub fn from_toml_str(s: &str) -> Result<Self, PageError> {
        let cfg: Self = toml::from_str(s).map_err(|e| PageError::Config(e.to_string()))?;
        cfg.validate()
    }

    /// # Errors
    /// Returns `PageError::Io` if the file cannot be read, otherwise see [`Self::from_toml_str`].
    pub fn from_file(path: &Path) -> Result<Self, PageError> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| PageError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&s)
    }

    /// Resolves the first existing config file, then applies environment overrides.
    ///
    /// # Errors
    /// An explicit `path` that does not exist is an error; missing fallback
    /// files are not.
    pub fn load(path: Option<&Path>) -> Result<Self, PageError> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => match find_config_path() {
                Some(p) => Self::from_file(&p)?,
                None => Self::default(),
            },
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns `PageError::Config` when an override is not a valid number.
    pub fn apply_env(&mut self) -> Result<(), PageError> {
        if let Ok(s) = std::env::var("PAGELITE_DEFAULT_LIMIT") {
            self.default_limit = s
                .trim()
                .parse()
                .map_err(|_| PageError::Config(format!("PAGELITE_DEFAULT_LIMIT: {s}")))?;
        }
        if let Ok(s) = std::env::var("PAGELITE_TIMEOUT_MS") {
            let ms = s
                .trim()
                .parse()
                .map_err(|_| PageError::Config(format!("PAGELITE_TIMEOUT_MS: {s}")))?;
            self.timeout_ms = Some(ms);
        }
        let validated = self.clone().validate()?;
        *self = validated;
        Ok(())
    }

    fn validate(self) -> Result<Self, PageError> {
        if self.default_limit < 1 {
            return Err(PageError::Config(format!(
                "default_limit must be positive, got {}",
                self.default_limit
            )));
        }
        Ok(self)
    }
}

fn find_config_path() -> Option<PathBuf> {
    let mut paths: Vec<PathBuf> = vec![];
    if let Ok(p) = std::env::var("PAGELITE_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join("pagelite.toml"));
    }
    paths.into_iter().find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        assert_eq!(PagingConfig::from_toml_str("").unwrap(), PagingConfig::default());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg = PagingConfig::from_toml_str("timeout_ms = 250\nlog_level = \"debug\"").unwrap();
        assert_eq!(cfg.default_limit, DEFAULT_LIMIT);
        assert_eq!(cfg.timeout_ms, Some(250));
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn non_positive_default_limit_is_rejected() {
        let err = PagingConfig::from_toml_str("default_limit = 0").unwrap_err();
        assert!(matches!(err, PageError::Config(_)));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        assert!(matches!(
            PagingConfig::from_toml_str("default_limit = \"ten\""),
            Err(PageError::Config(_))
        ));
    }
}
