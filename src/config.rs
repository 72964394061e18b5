//! Configuration (ambient stack): a small JSON settings file for the
//! handful of knobs the spec leaves as implementation choices, in the
//! same shape as the teacher's `load_prefixes`/`save_prefixes`.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Override for the `svn` binary, mirroring `SCP_SVN`.
    pub svn_binary: String,
    /// Parent-URI batch width for the file-kind resolver (§5: capped
    /// to stay under typical OS argv limits).
    pub kind_batch_size: usize,
    /// Path to the sqlite database the persistence writer opens.
    pub database_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            svn_binary: std::env::var("SCP_SVN").unwrap_or_else(|_| "svn".to_string()),
            kind_batch_size: crate::kinds::MAX_BATCH,
            database_path: PathBuf::from("svn-change-parser.sqlite3"),
        }
    }
}

pub fn load(path: &Path) -> Result<Config> {
    if path.is_file() {
        let reader = File::open(path).map_err(|e| {
            ParseError::SvnProtocolError(format!("cannot open config {}: {e}", path.display()))
        })?;
        serde_json::from_reader(reader)
            .map_err(|e| ParseError::SvnProtocolError(format!("malformed config: {e}")))
    } else {
        Ok(Config::default())
    }
}

pub fn save(path: &Path, config: &Config) -> Result<()> {
    let writer = File::create(path).map_err(|e| {
        ParseError::SvnProtocolError(format!("cannot write config {}: {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(writer, config)
        .map_err(|e| ParseError::SvnProtocolError(format!("cannot serialize config: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_yields_defaults() {
        let config = load(Path::new("/nonexistent/path/config.json")).unwrap();
        assert_eq!(config.svn_binary, "svn");
        assert_eq!(config.kind_batch_size, 64);
    }

    #[test]
    fn round_trips_through_json() {
        let dir = std::env::temp_dir().join("svn-change-parser-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let mut config = Config::default();
        config.kind_batch_size = 32;
        save(&path, &config).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.kind_batch_size, 32);

        std::fs::remove_file(&path).ok();
    }
}
