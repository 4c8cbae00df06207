use std::path::PathBuf;

use crate::error::{Result, TrackerError};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://tasks.db";
pub const DEFAULT_LOG_FILE: &str = "task-tracker.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    /// `sqlite://path` or `sqlite::memory:`
    Sqlite(String),
    /// `file://dir`
    JsonDir(PathBuf),
}

impl StorageTarget {
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.starts_with("sqlite:") {
            return Ok(StorageTarget::Sqlite(url.to_string()));
        }
        if let Some(dir) = url.strip_prefix("file://") {
            if dir.is_empty() {
                return Err(TrackerError::Config("file:// needs a directory".into()));
            }
            return Ok(StorageTarget::JsonDir(PathBuf::from(dir)));
        }
        Err(TrackerError::Config(format!("unsupported DATABASE_URL '{url}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub storage: StorageTarget,
    pub log_file: PathBuf,
}

impl Config {
    /// Reads `DATABASE_URL` and `TRACKER_LOG_FILE` from the process environment.
    pub fn from_env() -> Result<Self> { Self::from_lookup(|key| std::env::var(key).ok()) }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        let storage = StorageTarget::parse(url.as_deref().unwrap_or(DEFAULT_DATABASE_URL))?;
        let log_file = lookup("TRACKER_LOG_FILE")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from);
        Ok(Self { storage, log_file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.storage, StorageTarget::Sqlite(DEFAULT_DATABASE_URL.into()));
        assert_eq!(cfg.log_file, PathBuf::from(DEFAULT_LOG_FILE));
    }

    #[test]
    fn reads_file_backend_and_log_path() {
        let cfg = config(&[("DATABASE_URL", "file://./data"), ("TRACKER_LOG_FILE", "/tmp/t.log")]).unwrap();
        assert_eq!(cfg.storage, StorageTarget::JsonDir(PathBuf::from("./data")));
        assert_eq!(cfg.log_file, PathBuf::from("/tmp/t.log"));
    }

    #[test]
    fn memory_sqlite_is_accepted() {
        let cfg = config(&[("DATABASE_URL", "sqlite::memory:")]).unwrap();
        assert_eq!(cfg.storage, StorageTarget::Sqlite("sqlite::memory:".into()));
    }

    #[test]
    fn unknown_scheme_is_a_config_error() {
        let err = config(&[("DATABASE_URL", "postgres://localhost/db")]).unwrap_err();
        assert!(matches!(err, TrackerError::Config(_)));
        assert!(matches!(StorageTarget::parse("file://"), Err(TrackerError::Config(_))));
    }
}
