//! In-memory cluster, loaded from manifests or assembled by hand.
//!
//! Objects are kept sorted by kind, namespace and name so that listing
//! order matches what the API server returns.

use super::{ClusterAccess, ClusterError, ResourceKind, encode};
use async_trait::async_trait;
use kube::api::DynamicObject;
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Errors raised while loading manifests from disk.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid object in {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

type Key = (ResourceKind, Option<String>, String);

/// A static snapshot of cluster objects.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCluster {
    objects: BTreeMap<Key, DynamicObject>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a typed object, replacing any object with the same identity.
    pub fn insert<K>(&mut self, obj: &K) -> Result<(), ClusterError>
    where
        K: k8s_openapi::Resource + serde::Serialize,
    {
        let kind = ResourceKind::from_kind(K::KIND)
            .ok_or_else(|| ClusterError::UnsupportedKind(K::KIND.to_string()))?;
        let dynamic = encode(kind, obj)?;
        self.insert_dynamic(kind, dynamic);
        Ok(())
    }

    /// Builder form of [`InMemoryCluster::insert`].
    pub fn with<K>(mut self, obj: &K) -> Result<Self, ClusterError>
    where
        K: k8s_openapi::Resource + serde::Serialize,
    {
        self.insert(obj)?;
        Ok(self)
    }

    /// Store an untyped object of a known kind.
    pub fn insert_dynamic(&mut self, kind: ResourceKind, mut obj: DynamicObject) {
        if kind.is_namespaced() && obj.metadata.namespace.is_none() {
            obj.metadata.namespace = Some("default".to_string());
        }
        if !kind.is_namespaced() {
            obj.metadata.namespace = None;
        }
        let key = (
            kind,
            obj.metadata.namespace.clone(),
            obj.metadata.name.clone().unwrap_or_default(),
        );
        self.objects.insert(key, obj);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Load every `.yaml`, `.yml` and `.json` file under `path`.
    ///
    /// Multi-document files and `kind: List` wrappers are expanded. Objects of
    /// kinds no analyzer reads are skipped.
    pub fn from_manifests(path: &Path) -> Result<Self, ManifestError> {
        let mut cluster = Self::new();

        let files: Vec<PathBuf> = if path.is_dir() {
            WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| is_manifest_file(p))
                .collect()
        } else {
            vec![path.to_path_buf()]
        };

        for file in files {
            let content = fs::read_to_string(&file).map_err(|source| ManifestError::Io {
                path: file.clone(),
                source,
            })?;
            cluster.load_documents(&file, &content)?;
        }

        debug!("Loaded {} objects from {}", cluster.len(), path.display());
        Ok(cluster)
    }

    fn load_documents(&mut self, path: &Path, content: &str) -> Result<(), ManifestError> {
        for document in serde_yaml::Deserializer::from_str(content) {
            let value = serde_json::Value::deserialize(document).map_err(|source| {
                ManifestError::Yaml {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            self.load_value(path, value)?;
        }
        Ok(())
    }

    fn load_value(&mut self, path: &Path, mut value: serde_json::Value) -> Result<(), ManifestError> {
        if value.is_null() {
            return Ok(());
        }

        let Some(kind_name) = value
            .get("kind")
            .and_then(|k| k.as_str())
            .map(str::to_string)
        else {
            return Err(ManifestError::Invalid {
                path: path.to_path_buf(),
                message: "missing kind".to_string(),
            });
        };

        if kind_name == "List" || kind_name.ends_with("List") {
            if let Some(serde_json::Value::Array(items)) =
                value.get_mut("items").map(serde_json::Value::take)
            {
                for item in items {
                    self.load_value(path, item)?;
                }
            }
            return Ok(());
        }

        let Some(kind) = ResourceKind::from_kind(&kind_name) else {
            debug!("Skipping unsupported kind {} in {}", kind_name, path.display());
            return Ok(());
        };

        let obj: DynamicObject =
            serde_json::from_value(value).map_err(|e| ManifestError::Invalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if obj.metadata.name.is_none() {
            return Err(ManifestError::Invalid {
                path: path.to_path_buf(),
                message: format!("{} without metadata.name", kind),
            });
        }

        self.insert_dynamic(kind, obj);
        Ok(())
    }
}

fn is_manifest_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml") | Some("json")
    )
}

/// Match `a.b=value` / `a.b!=value` terms against the JSON form of an object.
fn matches_field_selector(obj: &DynamicObject, selector: &str) -> bool {
    let Ok(value) = serde_json::to_value(obj) else {
        return false;
    };

    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| {
            let (path, expected, negate) = match term.split_once("!=") {
                Some((path, expected)) => (path, expected, true),
                None => match term.split_once('=') {
                    Some((path, expected)) => (path, expected.trim_start_matches('='), false),
                    None => return true,
                },
            };
            let pointer = format!("/{}", path.trim().replace('.', "/"));
            let actual = value
                .pointer(&pointer)
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            (actual == expected.trim()) != negate
        })
}

#[async_trait]
impl ClusterAccess for InMemoryCluster {
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        field_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>, ClusterError> {
        Ok(self
            .objects
            .iter()
            .filter(|((k, ns, _), _)| {
                *k == kind
                    && match namespace {
                        Some(wanted) if kind.is_namespaced() => ns.as_deref() == Some(wanted),
                        _ => true,
                    }
            })
            .map(|(_, obj)| obj)
            .filter(|obj| field_selector.is_none_or(|sel| matches_field_selector(obj, sel)))
            .cloned()
            .collect())
    }

    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, ClusterError> {
        let namespace = if kind.is_namespaced() {
            namespace.map(str::to_string)
        } else {
            None
        };
        self.objects
            .get(&(kind, namespace, name.to_string()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound {
                kind,
                name: name.to_string(),
            })
    }
}
