//! Agent configuration.
//!
//! Every section has defaults, so a JSON file only needs the keys it changes:
//!
//! ```json
//! { "document": { "url": "https://host/doc.docx", "sqlite_path": "doc.db" },
//!   "push": { "url": "wss://host/ws/addin/user/a%40b.c/" } }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    core::dedup::DedupConfig,
    transport::{
        pull::{BackoffConfig, PullConfig},
        push::PushConfig,
    },
};

/// Failure to read or parse a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("reading {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid config JSON.
    #[error("parsing {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// The document being driven.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Document identity; also the pull claim scope.
    pub url: String,
    /// SQLite file holding saved snapshots. `None` keeps the document in memory.
    pub sqlite_path: Option<PathBuf>,
    /// Snapshots kept after each save. `None` keeps all.
    pub retain_snapshots: Option<usize>,
    /// Named styles the document defines beyond the built-ins.
    pub styles: Vec<String>,
}

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Document settings.
    pub document: DocumentConfig,
    /// Duplicate suppression.
    pub dedup: DedupConfig,
    /// Push socket; disabled when the url is empty.
    pub push: PushConfig,
    /// Pull loop; disabled when the base url is empty.
    pub pull: PullConfig,
    /// Pull pacing.
    pub backoff: BackoffConfig,
}

impl AgentConfig {
    /// Reads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses config JSON.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Push is configured.
    pub fn push_enabled(&self) -> bool {
        !self.push.url.is_empty()
    }

    /// Pull is configured.
    pub fn pull_enabled(&self) -> bool {
        !self.pull.base_url.is_empty()
    }

    /// Claim scope: the pull section's document url, else the document's.
    pub fn claim_url(&self) -> &str {
        if self.pull.doc_url.is_empty() {
            &self.document.url
        } else {
            &self.pull.doc_url
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = AgentConfig::from_json(
            r#"{"document": {"url": "doc-1"}, "backoff": {"idle_long_ms": 3000}, "pull": {"base_url": "http://c"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.document.url, "doc-1");
        assert_eq!(cfg.backoff.idle_long_ms, 3000);
        assert_eq!(cfg.backoff.idle_short_ms, 800);
        assert_eq!(cfg.dedup.window_ms, 15_000);
        assert!(cfg.pull_enabled());
        assert!(!cfg.push_enabled());
        assert_eq!(cfg.claim_url(), "doc-1");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AgentConfig::load("/nonexistent/docops.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
