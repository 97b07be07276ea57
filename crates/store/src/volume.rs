// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Volume rows and the capability handles over them.
//!
//! A handle witnesses the state its holder last observed; the row is
//! authoritative. Every transition re-reads the row under the store lock
//! and either settles (idempotent repeat), succeeds, or reports the
//! conflicting state. Handles never block each other; conflicts surface
//! as errors, not waits.

use crate::resource_cache::{self, CacheProvenance, WorkerResourceCacheRow};
use crate::store::{Store, TaskCacheAssignment, Tables};
use crate::WorkerArtifact;
use parking_lot::MutexGuard;
use serde::{Deserialize, Serialize};
use stowage_core::{
    BaseResourceTypeRef, BuildId, ContainerHandle, JobId, ResourceCache, TaskIdentifier, TeamId,
    VolumeError, VolumeHandle, VolumeKind, VolumeOwner, VolumeResourceType, VolumeState,
};
use tracing::debug;

/// Stored volume row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct VolumeRow {
    pub id: i64,
    pub handle: VolumeHandle,
    pub team_id: TeamId,
    pub worker_name: String,
    pub state: VolumeState,
    pub kind: VolumeKind,
    pub owner: VolumeOwner,
    pub parent_handle: Option<VolumeHandle>,
    pub worker_artifact_id: Option<i32>,
}

/// Insert a fresh row in the creating state. Caller holds the lock.
pub(crate) fn insert_volume(
    tables: &mut Tables,
    handle: VolumeHandle,
    team_id: TeamId,
    worker_name: &str,
    kind: VolumeKind,
    owner: VolumeOwner,
    parent_handle: Option<VolumeHandle>,
) -> VolumeRow {
    tables.counters.volume += 1;
    let row = VolumeRow {
        id: tables.counters.volume,
        handle: handle.clone(),
        team_id,
        worker_name: worker_name.to_string(),
        state: VolumeState::Creating,
        kind,
        owner,
        parent_handle,
        worker_artifact_id: None,
    };
    tables.volumes.insert(handle, row.clone());
    row
}

/// A volume whose backing storage is being provisioned.
#[derive(Debug, Clone)]
pub struct CreatingVolume {
    store: Store,
    handle: VolumeHandle,
    team_id: TeamId,
    worker_name: String,
}

impl CreatingVolume {
    pub(crate) fn from_row(store: Store, row: &VolumeRow) -> Self {
        Self {
            store,
            handle: row.handle.clone(),
            team_id: row.team_id,
            worker_name: row.worker_name.clone(),
        }
    }

    pub fn handle(&self) -> &VolumeHandle {
        &self.handle
    }

    pub fn team_id(&self) -> TeamId {
        self.team_id
    }

    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    /// Mark provisioning complete.
    ///
    /// Settles if the row is already created. Errors if the row is gone or
    /// in any other state.
    pub fn created(&self) -> Result<CreatedVolume, VolumeError> {
        let mut tables = self.store.lock();
        let Some(row) = tables.volumes.get_mut(&self.handle) else {
            return Err(VolumeError::MarkCreatedFailed {
                handle: self.handle.clone(),
            });
        };
        match row.state {
            VolumeState::Creating | VolumeState::Created => {
                row.state = VolumeState::Created;
                let row = row.clone();
                drop(tables);
                debug!(handle = %self.handle, "volume created");
                Ok(CreatedVolume {
                    store: self.store.clone(),
                    row,
                })
            }
            _ => Err(VolumeError::MarkCreatedFailed {
                handle: self.handle.clone(),
            }),
        }
    }

    /// Record that provisioning failed, parking the row for inspection.
    ///
    /// Settles if the row is already failed.
    pub fn failed(&self) -> Result<FailedVolume, VolumeError> {
        let mut tables = self.store.lock();
        let Some(row) = tables.volumes.get_mut(&self.handle) else {
            return Err(VolumeError::MarkStateFailed {
                state: VolumeState::Failed,
            });
        };
        match row.state {
            VolumeState::Creating | VolumeState::Failed => {
                row.state = VolumeState::Failed;
                drop(tables);
                debug!(handle = %self.handle, "volume failed");
                Ok(FailedVolume {
                    handle: self.handle.clone(),
                })
            }
            _ => Err(VolumeError::MarkStateFailed {
                state: VolumeState::Failed,
            }),
        }
    }
}

/// A live volume. Carries the row as last observed; mutating operations
/// refresh it.
#[derive(Debug, Clone)]
pub struct CreatedVolume {
    store: Store,
    row: VolumeRow,
}

impl CreatedVolume {
    pub(crate) fn from_row(store: Store, row: VolumeRow) -> Self {
        Self { store, row }
    }

    pub fn handle(&self) -> &VolumeHandle {
        &self.row.handle
    }

    pub fn team_id(&self) -> TeamId {
        self.row.team_id
    }

    pub fn worker_name(&self) -> &str {
        &self.row.worker_name
    }

    pub fn kind(&self) -> VolumeKind {
        self.row.kind
    }

    pub fn path(&self) -> Option<&str> {
        self.row.owner.path()
    }

    pub fn container_handle(&self) -> Option<&ContainerHandle> {
        self.row.owner.container_handle()
    }

    pub fn parent_handle(&self) -> Option<&VolumeHandle> {
        self.row.parent_handle.as_ref()
    }

    pub fn worker_artifact_id(&self) -> Option<i32> {
        self.row.worker_artifact_id
    }

    /// Begin teardown.
    ///
    /// Refused while any child row exists, whatever its state; children
    /// must be destroyed first. Settles if the row is already destroying.
    pub fn destroying(&self) -> Result<DestroyingVolume, VolumeError> {
        let mut tables = self.store.lock();
        let has_children = tables
            .volumes
            .values()
            .any(|v| v.parent_handle.as_ref() == Some(&self.row.handle));
        if has_children {
            return Err(VolumeError::CannotDestroyWithChildren);
        }
        let Some(row) = tables.volumes.get_mut(&self.row.handle) else {
            return Err(VolumeError::MarkStateFailed {
                state: VolumeState::Destroying,
            });
        };
        match row.state {
            VolumeState::Created | VolumeState::Destroying => {
                row.state = VolumeState::Destroying;
                drop(tables);
                debug!(handle = %self.row.handle, "volume destroying");
                Ok(DestroyingVolume {
                    store: self.store.clone(),
                    handle: self.row.handle.clone(),
                    worker_name: self.row.worker_name.clone(),
                })
            }
            _ => Err(VolumeError::MarkStateFailed {
                state: VolumeState::Destroying,
            }),
        }
    }

    /// Promote this volume to the authoritative one for a resource cache
    /// populated in place on this worker.
    ///
    /// The cache's type chain must resolve to a base type this worker
    /// currently advertises; the registry row id is recorded as the
    /// association's provenance. First claim wins: losing the race is a
    /// success that leaves this volume untouched.
    pub fn initialize_resource_cache(
        &mut self,
        cache: &ResourceCache,
    ) -> Result<(), VolumeError> {
        // Lock through a detached handle so the guard can be handed to
        // claim() alongside &mut self
        let store = self.store.clone();
        let tables = store.lock();
        let resolution = cache
            .resolve_base_type()
            .ok_or(VolumeError::UnresolvableTypeChain)?;
        let brt_id = tables
            .base_resource_types
            .values()
            .find(|brt| {
                brt.worker_name == self.row.worker_name && brt.name == resolution.base_type_name
            })
            .map(|brt| brt.id)
            .ok_or_else(|| VolumeError::BaseResourceTypeNotFound {
                worker: self.row.worker_name.clone(),
                name: resolution.base_type_name.clone(),
            })?;
        self.claim(
            tables,
            cache,
            CacheProvenance::Local {
                worker_base_resource_type_id: brt_id,
            },
        )
    }

    /// Promote this volume to the authoritative one for a resource cache
    /// whose content was streamed here from another worker.
    ///
    /// The source association is not re-validated: the bytes have already
    /// arrived, and validity is recomputed on every read anyway.
    pub fn initialize_streamed_resource_cache(
        &mut self,
        cache: &ResourceCache,
        source_worker: &str,
    ) -> Result<(), VolumeError> {
        let store = self.store.clone();
        let tables = store.lock();
        self.claim(
            tables,
            cache,
            CacheProvenance::Streamed {
                source_worker: source_worker.to_string(),
            },
        )
    }

    /// Claim the (worker, cache key) association, all under one lock.
    fn claim(
        &mut self,
        mut tables: MutexGuard<'_, Tables>,
        cache: &ResourceCache,
        provenance: CacheProvenance,
    ) -> Result<(), VolumeError> {
        if !tables.volumes.contains_key(&self.row.handle) {
            return Err(VolumeError::VolumeGone {
                handle: self.row.handle.clone(),
            });
        }
        let cache_key = cache.cache_key();
        if let Some(existing) =
            resource_cache::find_association(&tables, &self.row.worker_name, &cache_key)
        {
            if existing.volume_handle != self.row.handle {
                debug!(
                    handle = %self.row.handle,
                    worker = self.row.worker_name.as_str(),
                    "resource cache claim lost; volume stays container-owned",
                );
            }
            return Ok(());
        }

        tables.counters.resource_cache += 1;
        let id = tables.counters.resource_cache;
        let assoc = WorkerResourceCacheRow {
            id,
            worker_name: self.row.worker_name.clone(),
            cache_key,
            resource_cache: cache.clone(),
            provenance,
            volume_handle: self.row.handle.clone(),
        };
        tables.resource_caches.insert(id, assoc);
        if let Some(row) = tables.volumes.get_mut(&self.row.handle) {
            row.kind = VolumeKind::Resource;
            row.owner = VolumeOwner::ResourceCache {
                worker_resource_cache_id: id,
            };
            self.row = row.clone();
        }
        drop(tables);
        debug!(
            handle = %self.row.handle,
            worker = self.row.worker_name.as_str(),
            "resource cache claim won",
        );
        Ok(())
    }

    /// Hand this volume over as the worker's cache for one task step path.
    ///
    /// Unlike resource caches this is last-claim-wins: a rebuilt cache
    /// supersedes the previous volume, which reverts to garbage.
    pub fn initialize_task_cache(
        &mut self,
        job_id: JobId,
        step_name: &str,
        path: &str,
    ) -> Result<(), VolumeError> {
        let mut tables = self.store.lock();
        if !tables.volumes.contains_key(&self.row.handle) {
            return Err(VolumeError::VolumeGone {
                handle: self.row.handle.clone(),
            });
        }
        let task_cache = tables.find_or_create_task_cache(job_id, step_name, path);
        let wtc = tables.find_or_create_worker_task_cache(&self.row.worker_name, task_cache.id);
        tables.task_cache_volumes.insert(
            wtc.id,
            TaskCacheAssignment {
                team_id: self.row.team_id,
                volume_handle: self.row.handle.clone(),
            },
        );
        if let Some(row) = tables.volumes.get_mut(&self.row.handle) {
            row.kind = VolumeKind::TaskCache;
            row.owner = VolumeOwner::TaskCache {
                worker_task_cache_id: wtc.id,
            };
            self.row = row.clone();
        }
        drop(tables);
        debug!(
            handle = %self.row.handle,
            worker = self.row.worker_name.as_str(),
            step = step_name,
            "task cache initialized",
        );
        Ok(())
    }

    /// Register this volume as a build artifact.
    ///
    /// A volume holds at most one artifact; a second call is an error, not
    /// a replacement.
    pub fn initialize_artifact(
        &mut self,
        name: &str,
        build_id: BuildId,
    ) -> Result<WorkerArtifact, VolumeError> {
        let created_at_ms = self.store.now_ms();
        let mut tables = self.store.lock();
        match tables.volumes.get(&self.row.handle) {
            None => {
                return Err(VolumeError::VolumeGone {
                    handle: self.row.handle.clone(),
                })
            }
            Some(row) if row.worker_artifact_id.is_some() => {
                return Err(VolumeError::ArtifactAlreadyInitialized {
                    handle: self.row.handle.clone(),
                })
            }
            Some(_) => {}
        }
        tables.counters.artifact += 1;
        let artifact = WorkerArtifact {
            id: tables.counters.artifact,
            name: name.to_string(),
            build_id,
            created_at_ms,
        };
        tables.artifacts.insert(artifact.id, artifact.clone());
        if let Some(row) = tables.volumes.get_mut(&self.row.handle) {
            row.kind = VolumeKind::Artifact;
            row.worker_artifact_id = Some(artifact.id);
            self.row = row.clone();
        }
        drop(tables);
        debug!(handle = %self.row.handle, artifact = name, "artifact initialized");
        Ok(artifact)
    }

    /// Create a copy-on-write child of this volume for a container mount.
    ///
    /// The parent must still be created at insert time; the child starts
    /// its own lifecycle in the creating state.
    pub fn create_child_for_container(
        &self,
        container_handle: &ContainerHandle,
        path: &str,
    ) -> Result<CreatingVolume, VolumeError> {
        let handle = self.store.mint_handle();
        let mut tables = self.store.lock();
        match tables.volumes.get(&self.row.handle) {
            Some(parent) if parent.state == VolumeState::Created => {}
            _ => {
                return Err(VolumeError::ParentNotCreated {
                    handle: self.row.handle.clone(),
                })
            }
        }
        let row = insert_volume(
            &mut tables,
            handle,
            self.row.team_id,
            &self.row.worker_name,
            VolumeKind::Container,
            VolumeOwner::Container {
                handle: container_handle.clone(),
                path: path.to_string(),
            },
            Some(self.row.handle.clone()),
        );
        drop(tables);
        debug!(
            parent = %self.row.handle,
            child = %row.handle,
            "child volume created for container",
        );
        Ok(CreatingVolume::from_row(self.store.clone(), &row))
    }

    /// The resource type identity behind a resource cache volume, resolved
    /// against the registry as it stands now.
    ///
    /// The advertised version comes from the chain origin's worker, so a
    /// streamed cache reports the version its content was actually built
    /// against.
    pub fn resource_type(&self) -> Result<VolumeResourceType, VolumeError> {
        let VolumeOwner::ResourceCache {
            worker_resource_cache_id,
        } = &self.row.owner
        else {
            return Err(VolumeError::WrongVolumeKind {
                expected: VolumeKind::Resource,
                actual: self.row.kind,
            });
        };
        let tables = self.store.lock();
        let assoc = tables
            .resource_caches
            .get(worker_resource_cache_id)
            .ok_or_else(|| VolumeError::VolumeGone {
                handle: self.row.handle.clone(),
            })?;
        let resolution = assoc
            .resource_cache
            .resolve_base_type()
            .ok_or(VolumeError::UnresolvableTypeChain)?;
        let brt = resource_cache::origin_base_type(
            &tables,
            &assoc.worker_name,
            &assoc.cache_key,
            &resolution.base_type_name,
        )
        .ok_or_else(|| VolumeError::BaseResourceTypeNotFound {
            worker: assoc.worker_name.clone(),
            name: resolution.base_type_name.clone(),
        })?;
        Ok(VolumeResourceType {
            base_resource_type: BaseResourceTypeRef {
                name: brt.name.clone(),
                version: brt.version.clone(),
            },
            resource_type_version: resolution.custom_type_version,
            version: assoc.resource_cache.version.clone(),
        })
    }

    /// The registry row behind a base resource type volume.
    pub fn base_resource_type(&self) -> Result<BaseResourceTypeRef, VolumeError> {
        let VolumeOwner::BaseResourceType { id } = self.row.owner else {
            return Err(VolumeError::WrongVolumeKind {
                expected: VolumeKind::ResourceType,
                actual: self.row.kind,
            });
        };
        let tables = self.store.lock();
        tables
            .base_resource_types
            .get(&id)
            .map(|brt| BaseResourceTypeRef {
                name: brt.name.clone(),
                version: brt.version.clone(),
            })
            .ok_or(VolumeError::BaseResourceTypeGone { id })
    }

    /// Pipeline/job/step coordinates behind a task cache volume.
    pub fn task_identifier(&self) -> Result<TaskIdentifier, VolumeError> {
        let VolumeOwner::TaskCache {
            worker_task_cache_id,
        } = self.row.owner
        else {
            return Err(VolumeError::WrongVolumeKind {
                expected: VolumeKind::TaskCache,
                actual: self.row.kind,
            });
        };
        let unresolved = || VolumeError::TaskIdentifierUnresolved {
            handle: self.row.handle.clone(),
        };
        let tables = self.store.lock();
        let wtc = tables
            .worker_task_caches
            .get(&worker_task_cache_id)
            .ok_or_else(unresolved)?;
        let task_cache = tables
            .task_caches
            .get(&wtc.task_cache_id)
            .ok_or_else(unresolved)?;
        let job = tables.jobs.get(&task_cache.job_id).ok_or_else(unresolved)?;
        let pipeline = tables
            .pipelines
            .get(&job.pipeline_id)
            .ok_or_else(unresolved)?;
        Ok(TaskIdentifier {
            pipeline_id: pipeline.id,
            pipeline_ref: pipeline.name.clone(),
            job_name: job.name.clone(),
            step_name: task_cache.step_name.clone(),
        })
    }
}

/// A volume being torn down. The only way out is [`destroy`].
///
/// [`destroy`]: DestroyingVolume::destroy
#[derive(Debug, Clone)]
pub struct DestroyingVolume {
    store: Store,
    handle: VolumeHandle,
    worker_name: String,
}

impl DestroyingVolume {
    pub fn handle(&self) -> &VolumeHandle {
        &self.handle
    }

    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    /// Remove the row once the worker reports the backing storage gone.
    ///
    /// Returns whether this call removed it; a repeat (or a row no longer
    /// in the destroying state) reports `false` without erroring.
    pub fn destroy(&self) -> bool {
        let mut tables = self.store.lock();
        match tables.volumes.get(&self.handle) {
            Some(row) if row.state == VolumeState::Destroying => {
                tables.volumes.remove(&self.handle);
                drop(tables);
                debug!(handle = %self.handle, "volume destroyed");
                true
            }
            _ => false,
        }
    }
}

/// A volume whose provisioning failed; parked for diagnosis and cleanup.
#[derive(Debug, Clone)]
pub struct FailedVolume {
    handle: VolumeHandle,
}

impl FailedVolume {
    pub fn handle(&self) -> &VolumeHandle {
        &self.handle
    }
}

#[cfg(test)]
#[path = "volume_tests.rs"]
mod tests;
