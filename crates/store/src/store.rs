// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared store and the worker/bookkeeping registry.
//!
//! `Store` is a cheaply cloneable handle to one set of tables shared by
//! every process that touches volumes. Each public operation acquires the
//! table mutex exactly once; that single acquisition is the atomicity unit
//! every guarantee in this crate is built on.

use crate::artifact::WorkerArtifact;
use crate::resource_cache::WorkerResourceCacheRow;
use crate::snapshot::Snapshot;
use crate::volume::VolumeRow;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use stowage_core::{
    Clock, IdGen, JobId, JobRecord, PipelineRecord, SystemClock, TaskCache, TeamId, UuidIdGen,
    VolumeHandle, Worker, WorkerBaseResourceType, WorkerTaskCache,
};
use tracing::debug;

/// Sequence counters for internally-assigned numeric ids.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(crate) struct Counters {
    pub volume: i64,
    pub base_resource_type: i32,
    pub resource_cache: i32,
    pub task_cache: i32,
    pub worker_task_cache: i32,
    pub artifact: i32,
}

/// Current task-cache association for one worker task cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TaskCacheAssignment {
    pub team_id: TeamId,
    pub volume_handle: VolumeHandle,
}

/// All persisted rows. Guarded by the store mutex as one unit.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(crate) struct Tables {
    pub workers: HashMap<String, Worker>,
    pub base_resource_types: HashMap<i32, WorkerBaseResourceType>,
    pub pipelines: HashMap<i32, PipelineRecord>,
    pub jobs: HashMap<i32, JobRecord>,
    pub volumes: HashMap<VolumeHandle, VolumeRow>,
    pub resource_caches: HashMap<i32, WorkerResourceCacheRow>,
    pub task_caches: HashMap<i32, TaskCache>,
    pub worker_task_caches: HashMap<i32, WorkerTaskCache>,
    pub task_cache_volumes: HashMap<i32, TaskCacheAssignment>,
    pub artifacts: HashMap<i32, WorkerArtifact>,
    pub counters: Counters,
}

impl Tables {
    pub fn find_or_create_task_cache(
        &mut self,
        job_id: JobId,
        step_name: &str,
        path: &str,
    ) -> TaskCache {
        if let Some(existing) = self
            .task_caches
            .values()
            .find(|tc| tc.job_id == job_id && tc.step_name == step_name && tc.path == path)
        {
            return existing.clone();
        }
        self.counters.task_cache += 1;
        let task_cache = TaskCache {
            id: self.counters.task_cache,
            job_id,
            step_name: step_name.to_string(),
            path: path.to_string(),
        };
        self.task_caches.insert(task_cache.id, task_cache.clone());
        task_cache
    }

    pub fn find_or_create_worker_task_cache(
        &mut self,
        worker_name: &str,
        task_cache_id: i32,
    ) -> WorkerTaskCache {
        if let Some(existing) = self
            .worker_task_caches
            .values()
            .find(|wtc| wtc.worker_name == worker_name && wtc.task_cache_id == task_cache_id)
        {
            return existing.clone();
        }
        self.counters.worker_task_cache += 1;
        let wtc = WorkerTaskCache {
            id: self.counters.worker_task_cache,
            worker_name: worker_name.to_string(),
            task_cache_id,
        };
        self.worker_task_caches.insert(wtc.id, wtc.clone());
        wtc
    }
}

/// Shared handle to the volume store.
///
/// Clones share the same tables; the store is safe to hand to any number of
/// threads. No operation holds the lock across a return.
#[derive(Clone)]
pub struct Store {
    tables: Arc<Mutex<Tables>>,
    id_gen: Arc<dyn IdGen>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_parts(Arc::new(UuidIdGen), Arc::new(SystemClock))
    }

    /// Store with explicit handle generator and clock, for deterministic
    /// tests.
    pub fn with_parts(id_gen: Arc<dyn IdGen>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            id_gen,
            clock,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock()
    }

    pub(crate) fn mint_handle(&self) -> VolumeHandle {
        VolumeHandle::new(self.id_gen.next())
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    // --- worker registry (mutated by the reconciliation collaborator) ---

    /// Register or re-register a worker with its advertised base resource
    /// types.
    ///
    /// The advertised set is diffed against the current rows: a type whose
    /// (name, version) is unchanged keeps its row id, anything changed or
    /// absent loses it. Losing the id is what invalidates every resource
    /// cache association recorded against it.
    pub fn register_worker(&self, name: &str, base_resource_types: &[(&str, &str)]) -> Worker {
        let mut tables = self.lock();

        let worker = Worker {
            name: name.to_string(),
        };
        tables.workers.insert(name.to_string(), worker.clone());

        // Retire rows no longer advertised (or advertised at another version)
        let retired: Vec<i32> = tables
            .base_resource_types
            .values()
            .filter(|brt| {
                brt.worker_name == name
                    && !base_resource_types
                        .iter()
                        .any(|(n, v)| brt.name == *n && brt.version == *v)
            })
            .map(|brt| brt.id)
            .collect();
        for id in &retired {
            tables.base_resource_types.remove(id);
        }

        // Insert rows for newly advertised types
        let mut added = 0;
        for (type_name, version) in base_resource_types {
            let exists = tables.base_resource_types.values().any(|brt| {
                brt.worker_name == name && brt.name == *type_name && brt.version == *version
            });
            if !exists {
                tables.counters.base_resource_type += 1;
                let id = tables.counters.base_resource_type;
                tables.base_resource_types.insert(
                    id,
                    WorkerBaseResourceType {
                        id,
                        worker_name: name.to_string(),
                        name: type_name.to_string(),
                        version: version.to_string(),
                    },
                );
                added += 1;
            }
        }

        debug!(
            worker = name,
            retired = retired.len(),
            added,
            "worker registered",
        );
        worker
    }

    /// Remove a worker and its advertised base resource types.
    ///
    /// Volume rows survive physically, but every owner-joined finder goes
    /// not-found for them from here on.
    pub fn delete_worker(&self, name: &str) {
        let mut tables = self.lock();
        tables.workers.remove(name);
        tables.base_resource_types.retain(|_, brt| brt.worker_name != name);
        debug!(worker = name, "worker deleted");
    }

    pub fn worker(&self, name: &str) -> Option<Worker> {
        self.lock().workers.get(name).cloned()
    }

    /// Current registry row for one advertised base resource type.
    pub fn find_worker_base_resource_type(
        &self,
        worker_name: &str,
        type_name: &str,
    ) -> Option<WorkerBaseResourceType> {
        self.lock()
            .base_resource_types
            .values()
            .find(|brt| brt.worker_name == worker_name && brt.name == type_name)
            .cloned()
    }

    // --- pipeline/job bookkeeping (identifiers only) ---

    pub fn register_pipeline(&self, pipeline: PipelineRecord) {
        self.lock().pipelines.insert(pipeline.id, pipeline);
    }

    pub fn register_job(&self, job: JobRecord) {
        self.lock().jobs.insert(job.id, job);
    }

    // --- task cache factories ---

    pub fn find_or_create_task_cache(
        &self,
        job_id: JobId,
        step_name: &str,
        path: &str,
    ) -> TaskCache {
        self.lock().find_or_create_task_cache(job_id, step_name, path)
    }

    pub fn find_or_create_worker_task_cache(
        &self,
        worker_name: &str,
        task_cache: &TaskCache,
    ) -> WorkerTaskCache {
        self.lock()
            .find_or_create_worker_task_cache(worker_name, task_cache.id)
    }

    // --- snapshots ---

    /// Point-in-time copy of every table, for persistence.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::of(self.lock().clone())
    }

    /// Replace the live tables with a previously saved snapshot.
    pub fn restore(&self, snapshot: Snapshot) {
        *self.lock() = snapshot.into_tables();
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
