//! Owner-reference chain resolution.
//!
//! Follows `metadata.ownerReferences` up to the top-most controller so a
//! finding on a Pod can be attributed to the Deployment that created it.
//! Only ReplicaSet, Deployment, StatefulSet, DaemonSet and Ingress owners are
//! followed. Any fetch failure, a cycle, or a chain longer than
//! [`MAX_OWNER_DEPTH`] falls back to the resource's own name.

use crate::kubernetes::{ClusterAccess, ResourceKind, ResourceRef};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use log::debug;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Longest owner chain that will be walked.
pub const MAX_OWNER_DEPTH: usize = 16;

const OWNER_KINDS: [ResourceKind; 5] = [
    ResourceKind::ReplicaSet,
    ResourceKind::Deployment,
    ResourceKind::StatefulSet,
    ResourceKind::DaemonSet,
    ResourceKind::Ingress,
];

/// Result of walking an owner chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentResolution {
    /// `Kind/name` of the top-most owner, or the resource's own name
    pub name: String,
    /// The walk stopped on a cycle or at the depth limit
    pub truncated: bool,
}

enum Walk {
    Resolved(String),
    Failed { truncated: bool },
}

/// Resolves parents and remembers the answers for the rest of the run.
///
/// Safe to share between analyzers running concurrently; the cache lock is
/// never held across a cluster call.
#[derive(Debug, Default)]
pub struct ParentResolver {
    cache: RwLock<HashMap<ResourceRef, ParentResolution>>,
}

impl ParentResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all cached answers.
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    /// Resolve the display parent of a resource. Never returns an empty name.
    pub async fn resolve(
        &self,
        cluster: &dyn ClusterAccess,
        kind: ResourceKind,
        meta: &ObjectMeta,
    ) -> ParentResolution {
        let own_name = meta.name.clone().unwrap_or_default();
        let start = ResourceRef::new(kind, meta.namespace.as_deref(), own_name.clone());

        let cached = self.cache.read().get(&start).cloned();
        if let Some(hit) = cached {
            return hit;
        }

        let resolution = match walk(cluster, &start, meta).await {
            Walk::Resolved(name) => ParentResolution {
                name,
                truncated: false,
            },
            Walk::Failed { truncated } => {
                debug!("Owner chain of {} not resolved, using own name", start);
                ParentResolution {
                    name: own_name,
                    truncated,
                }
            }
        };

        self.cache.write().insert(start, resolution.clone());
        resolution
    }
}

async fn walk(cluster: &dyn ClusterAccess, start: &ResourceRef, meta: &ObjectMeta) -> Walk {
    let namespace = start.namespace.clone();
    let mut visited: HashSet<ResourceRef> = HashSet::from([start.clone()]);
    let mut current: Option<ResourceRef> = None;
    let mut current_meta = meta.clone();

    for _ in 0..MAX_OWNER_DEPTH {
        let owner = current_meta
            .owner_references
            .iter()
            .flatten()
            .find_map(|owner| {
                ResourceKind::from_kind(&owner.kind)
                    .filter(|kind| OWNER_KINDS.contains(kind))
                    .map(|kind| ResourceRef::new(kind, namespace.as_deref(), owner.name.clone()))
            });

        let Some(owner) = owner else {
            let has_owners = current_meta
                .owner_references
                .as_ref()
                .is_some_and(|owners| !owners.is_empty());
            return Walk::Resolved(match current {
                // owned only by kinds that are not followed: bare name
                Some(top) if has_owners => top.name,
                Some(top) => format!("{}/{}", top.kind, top.name),
                None => start.name.clone(),
            });
        };

        if !visited.insert(owner.clone()) {
            debug!("Owner cycle detected at {}", owner);
            return Walk::Failed { truncated: true };
        }

        match cluster
            .get(owner.kind, owner.namespace.as_deref(), &owner.name)
            .await
        {
            Ok(obj) => {
                current_meta = obj.metadata;
                current = Some(owner);
            }
            Err(e) => {
                debug!("Failed to fetch owner {}: {}", owner, e);
                return Walk::Failed { truncated: false };
            }
        }
    }

    Walk::Failed { truncated: true }
}
