//! Server configuration
//!
//! A JSON file where every field is optional. A missing file means all
//! defaults; a file that does not parse is an error.

use std::path::{Path, PathBuf};

use lane_sync::{rank, Lane};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// SQLite file, or `:memory:` for the in-process store
    pub database_path: String,
    pub log_dir: PathBuf,
    pub log_max_bytes: u64,
    pub log_keep_files: usize,
    /// Allowed board stages; empty allows any
    pub board_lanes: Vec<Lane>,
    /// Neighbors closer than this trigger a lane re-rank
    pub rank_min_spacing: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7878".to_string(),
            database_path: "lane_sync.db".to_string(),
            log_dir: PathBuf::from("logs"),
            log_max_bytes: rolling_logger::DEFAULT_MAX_BYTES,
            log_keep_files: rolling_logger::DEFAULT_KEEP_FILES,
            board_lanes: Vec::new(),
            rank_min_spacing: rank::MIN_SPACING,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> DomainResult<Self> {
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| {
                DomainError::Internal(format!("Failed to read {}: {}", path.display(), e))
            })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| DomainError::InvalidInput(format!("{}: {}", path.display(), e)))?;
        if config.rank_min_spacing.is_nan() || config.rank_min_spacing <= 0.0 {
            return Err(DomainError::InvalidInput(
                "rank_min_spacing must be positive".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn logger_config(&self) -> rolling_logger::LoggerConfig {
        rolling_logger::LoggerConfig {
            max_bytes: self.log_max_bytes,
            keep_files: self.log_keep_files,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"database_path": ":memory:", "board_lanes": ["todo", "done"]}}"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.database_path, ":memory:");
        assert_eq!(config.board_lanes, vec![Lane::new("todo"), Lane::new("done")]);
        assert_eq!(config.bind_addr, ServerConfig::default().bind_addr);
    }

    #[test]
    fn test_malformed_file_is_invalid_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            ServerConfig::load(file.path()),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_positive_spacing_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"rank_min_spacing": 0}}"#).unwrap();
        assert!(ServerConfig::load(file.path()).is_err());
    }
}
