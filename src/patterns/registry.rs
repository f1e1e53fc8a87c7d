//! File-backed JSON registry of learned URL patterns.
//!
//! Format: `{ "<template>": { "example_old", "example_new", "last_updated" } }`.
//! A missing file is an empty registry.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tempfile::NamedTempFile;

/// Registry contents keyed by template, iterated lexicographically
pub type PatternMap = BTreeMap<String, UrlPattern>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("I/O error on pattern registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Pattern registry {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode pattern registry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Registry write task failed: {0}")]
    Task(String),
}

/// Most recent example pair for one template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPattern {
    pub example_old: String,
    pub example_new: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub last_updated: DateTime<Utc>,
}

impl UrlPattern {
    pub fn new(example_old: impl Into<String>, example_new: impl Into<String>) -> Self {
        Self {
            example_old: example_old.into(),
            example_new: example_new.into(),
            last_updated: Utc::now(),
        }
    }
}

/// RFC 3339, or a naive ISO-8601 timestamp taken as UTC
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
}

/// Read the registry at `path`
pub async fn read_registry(path: &Path) -> Result<PatternMap, RegistryError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PatternMap::new()),
        Err(source) => {
            return Err(RegistryError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(PatternMap::new());
    }

    serde_json::from_slice(&bytes).map_err(|source| RegistryError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Fold `incoming` into `base`; on conflicts the newer `last_updated` wins
pub fn merge(mut base: PatternMap, incoming: &PatternMap) -> PatternMap {
    for (template, pattern) in incoming {
        match base.get(template) {
            Some(existing) if existing.last_updated > pattern.last_updated => {}
            _ => {
                base.insert(template.clone(), pattern.clone());
            }
        }
    }
    base
}

/// Atomically replace the registry file with `patterns`
pub async fn write_registry(path: &Path, patterns: &PatternMap) -> Result<(), RegistryError> {
    let json = serde_json::to_vec_pretty(patterns)?;
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || write_atomic(&path, &json))
        .await
        .map_err(|e| RegistryError::Task(e.to_string()))?
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RegistryError> {
    let io_error = |source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(io_error)?;

    // Temp file in the target directory so the rename stays on one filesystem
    let mut temp_file = NamedTempFile::new_in(&parent).map_err(io_error)?;
    temp_file.write_all(bytes).map_err(io_error)?;
    temp_file.flush().map_err(io_error)?;
    temp_file.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}
