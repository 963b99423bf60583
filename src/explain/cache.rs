//! Explanations remembered across runs.
//!
//! Keys are BLAKE3 fingerprints of the analyzer kind and the failure
//! reasons, so the same problem on a different resource reuses the answer.
//! The file is rewritten after every insert; a quota abort halfway through
//! a run keeps what was already paid for.

use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const CACHE_DIR_NAME: &str = "kube-doctor";
const CACHE_FILE_NAME: &str = "explanations.json";

/// `<cache_dir>/kube-doctor/explanations.json`
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(CACHE_DIR_NAME).join(CACHE_FILE_NAME))
}

/// Cache key for a set of failure reasons.
pub fn fingerprint(kind: &str, errors: &[String]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.as_bytes());
    for error in errors {
        // Separator keeps ["ab", "c"] and ["a", "bc"] apart.
        hasher.update(&[0]);
        hasher.update(error.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[derive(Debug, Default)]
pub struct ExplanationCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl ExplanationCache {
    /// A cache that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache at `path`. A missing file is an empty cache; an
    /// unreadable one is logged and replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring corrupt explanation cache {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Failed to read explanation cache {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        debug!(
            "Loaded {} cached explanation(s) from {}",
            entries.len(),
            path.display()
        );

        Self {
            path: Some(path),
            entries,
        }
    }

    /// The cache at the default location, or an in-memory one when the
    /// platform has no cache directory.
    pub fn open_default() -> Self {
        match default_cache_path() {
            Some(path) => Self::open(path),
            None => Self::in_memory(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remember an explanation and flush the cache to disk.
    pub fn insert(&mut self, key: String, explanation: String) -> io::Result<()> {
        self.entries.insert(key, explanation);
        self.persist()
    }

    fn persist(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, content)
    }
}
