// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource cache associations and read-time invalidation.
//!
//! An association row maps (worker, resource cache) to the one volume
//! authoritative for that cache on that worker. Rows are written once by a
//! claim and never deleted; whether an association is *visible* is
//! recomputed on every lookup by walking its provenance chain back to the
//! registry. Caching the verdict would let a registry change slip between
//! write and read, so it never is.

use crate::store::{Store, Tables};
use crate::volume::CreatedVolume;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use stowage_core::{ResourceCache, VolumeHandle, VolumeState, WorkerBaseResourceType};
use tracing::{debug, warn};

/// How a worker came to hold a cache volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum CacheProvenance {
    /// Initialized in place; records the registry row the cache's type
    /// chain resolved to at claim time
    Local { worker_base_resource_type_id: i32 },
    /// Streamed from another worker's authoritative volume
    Streamed { source_worker: String },
}

/// Stored association row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WorkerResourceCacheRow {
    pub id: i32,
    pub worker_name: String,
    pub cache_key: String,
    pub resource_cache: ResourceCache,
    pub provenance: CacheProvenance,
    pub volume_handle: VolumeHandle,
}

/// Lookup key for the authoritative cache volume on one worker.
#[derive(Debug, Clone)]
pub struct WorkerResourceCache {
    pub worker_name: String,
    pub resource_cache: ResourceCache,
}

impl WorkerResourceCache {
    /// Resolve this key to its authoritative volume, or not-found.
    ///
    /// Not-found covers: no claim yet, the worker is gone, the volume is no
    /// longer created, or any hop of the provenance chain fails validation.
    pub fn find(&self, store: &Store) -> Option<CreatedVolume> {
        let tables = store.lock();
        let handle = validated_volume(&tables, &self.worker_name, &self.resource_cache)?;
        let row = tables.volumes.get(&handle)?;
        if row.state != VolumeState::Created {
            return None;
        }
        Some(CreatedVolume::from_row(store.clone(), row.clone()))
    }
}

/// Association row for (worker, cache key), if one was ever claimed.
pub(crate) fn find_association<'t>(
    tables: &'t Tables,
    worker_name: &str,
    cache_key: &str,
) -> Option<&'t WorkerResourceCacheRow> {
    tables
        .resource_caches
        .values()
        .find(|row| row.worker_name == worker_name && row.cache_key == cache_key)
}

/// Walk streamed provenance back to the local claim at the chain origin.
///
/// Returns `None` when a hop has no association row or the chain is
/// malformed (a worker revisited).
pub(crate) fn chain_origin<'t>(
    tables: &'t Tables,
    worker_name: &str,
    cache_key: &str,
) -> Option<&'t WorkerResourceCacheRow> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut current = worker_name;
    loop {
        if !visited.insert(current) {
            warn!(
                worker = worker_name,
                "cycle in streamed cache provenance; treating as invalid",
            );
            return None;
        }
        let row = find_association(tables, current, cache_key)?;
        match &row.provenance {
            CacheProvenance::Local { .. } => return Some(row),
            CacheProvenance::Streamed { source_worker } => current = source_worker.as_str(),
        }
    }
}

/// The base resource type currently advertised at the chain origin.
pub(crate) fn origin_base_type<'t>(
    tables: &'t Tables,
    worker_name: &str,
    cache_key: &str,
    base_type_name: &str,
) -> Option<&'t WorkerBaseResourceType> {
    let origin = chain_origin(tables, worker_name, cache_key)?;
    tables
        .base_resource_types
        .values()
        .find(|brt| brt.worker_name == origin.worker_name && brt.name == base_type_name)
}

/// Resolve (worker, cache) to the authoritative volume handle, applying the
/// full validity walk.
///
/// The association is visible only while the registry row recorded at the
/// chain origin still exists: worker re-registration retires row ids, so
/// a changed or dropped base resource type hides every dependent
/// association, local or streamed, at every depth.
pub(crate) fn validated_volume(
    tables: &Tables,
    worker_name: &str,
    resource_cache: &ResourceCache,
) -> Option<VolumeHandle> {
    if !tables.workers.contains_key(worker_name) {
        return None;
    }
    let resolution = resource_cache.resolve_base_type()?;
    let cache_key = resource_cache.cache_key();

    let row = find_association(tables, worker_name, &cache_key)?;
    let origin = chain_origin(tables, worker_name, &cache_key)?;
    let CacheProvenance::Local {
        worker_base_resource_type_id,
    } = origin.provenance
    else {
        return None;
    };

    let Some(brt) = tables.base_resource_types.get(&worker_base_resource_type_id) else {
        debug!(
            worker = worker_name,
            origin = origin.worker_name.as_str(),
            "association hidden: recorded base resource type retired",
        );
        return None;
    };
    if brt.name != resolution.base_type_name {
        return None;
    }

    Some(row.volume_handle.clone())
}

#[cfg(test)]
#[path = "resource_cache_tests.rs"]
mod tests;
