// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Volume creation and lookup.
//!
//! Creators insert a row in the creating state and hand back the
//! [`CreatingVolume`] capability. Finders project rows into capability
//! handles; a volume on a deregistered worker is unreachable through every
//! finder even though its row survives.

use crate::resource_cache::WorkerResourceCache;
use crate::store::Store;
use crate::volume::{self, CreatedVolume, CreatingVolume};
use stowage_core::{
    ContainerHandle, ResourceCache, TaskCache, TeamId, VolumeError, VolumeHandle, VolumeKind,
    VolumeOwner, VolumeState, WorkerBaseResourceType, WorkerTaskCache,
};

/// Entry point for volume creation and lookup against one [`Store`].
#[derive(Debug, Clone)]
pub struct VolumeRepository {
    store: Store,
}

impl VolumeRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn create(
        &self,
        team_id: TeamId,
        worker_name: &str,
        kind: VolumeKind,
        owner: VolumeOwner,
    ) -> Result<CreatingVolume, VolumeError> {
        let handle = self.store.mint_handle();
        let mut tables = self.store.lock();
        if !tables.workers.contains_key(worker_name) {
            return Err(VolumeError::WorkerNotFound {
                name: worker_name.to_string(),
            });
        }
        let row = volume::insert_volume(&mut tables, handle, team_id, worker_name, kind, owner, None);
        Ok(CreatingVolume::from_row(self.store.clone(), &row))
    }

    /// Volume mounted into a container at a path.
    pub fn create_container_volume(
        &self,
        team_id: TeamId,
        worker_name: &str,
        container_handle: &ContainerHandle,
        path: &str,
    ) -> Result<CreatingVolume, VolumeError> {
        self.create(
            team_id,
            worker_name,
            VolumeKind::Container,
            VolumeOwner::Container {
                handle: container_handle.clone(),
                path: path.to_string(),
            },
        )
    }

    /// Volume holding an imported base resource type image.
    ///
    /// The registry row must still be current; a retired row means the
    /// worker re-registered underneath the caller.
    pub fn create_base_resource_type_volume(
        &self,
        base_resource_type: &WorkerBaseResourceType,
    ) -> Result<CreatingVolume, VolumeError> {
        let handle = self.store.mint_handle();
        let mut tables = self.store.lock();
        if !tables.workers.contains_key(&base_resource_type.worker_name) {
            return Err(VolumeError::WorkerNotFound {
                name: base_resource_type.worker_name.clone(),
            });
        }
        if !tables
            .base_resource_types
            .contains_key(&base_resource_type.id)
        {
            return Err(VolumeError::BaseResourceTypeGone {
                id: base_resource_type.id,
            });
        }
        let row = volume::insert_volume(
            &mut tables,
            handle,
            0,
            &base_resource_type.worker_name,
            VolumeKind::ResourceType,
            VolumeOwner::BaseResourceType {
                id: base_resource_type.id,
            },
            None,
        );
        Ok(CreatingVolume::from_row(self.store.clone(), &row))
    }

    /// Volume that will hold a task step's cache on one worker.
    pub fn create_task_cache_volume(
        &self,
        team_id: TeamId,
        worker_task_cache: &WorkerTaskCache,
    ) -> Result<CreatingVolume, VolumeError> {
        self.create(
            team_id,
            &worker_task_cache.worker_name,
            VolumeKind::TaskCache,
            VolumeOwner::TaskCache {
                worker_task_cache_id: worker_task_cache.id,
            },
        )
    }

    /// Unowned volume of an explicit kind, for content produced outside
    /// any container (streamed-in caches, artifact uploads).
    pub fn create_volume(
        &self,
        team_id: TeamId,
        worker_name: &str,
        kind: VolumeKind,
    ) -> Result<CreatingVolume, VolumeError> {
        self.create(team_id, worker_name, kind, VolumeOwner::Unowned)
    }

    /// Both live phases of a container volume, by owning container and
    /// path.
    pub fn find_container_volume(
        &self,
        team_id: TeamId,
        worker_name: &str,
        container_handle: &ContainerHandle,
        path: &str,
    ) -> (Option<CreatingVolume>, Option<CreatedVolume>) {
        let tables = self.store.lock();
        if !tables.workers.contains_key(worker_name) {
            return (None, None);
        }
        let mut creating = None;
        let mut created = None;
        for row in tables.volumes.values() {
            if row.team_id != team_id || row.worker_name != worker_name {
                continue;
            }
            let VolumeOwner::Container {
                handle: owner_handle,
                path: owner_path,
            } = &row.owner
            else {
                continue;
            };
            if owner_handle != container_handle || owner_path != path {
                continue;
            }
            match row.state {
                VolumeState::Creating => {
                    creating = Some(CreatingVolume::from_row(self.store.clone(), row));
                }
                VolumeState::Created => {
                    created = Some(CreatedVolume::from_row(self.store.clone(), row.clone()));
                }
                _ => {}
            }
        }
        (creating, created)
    }

    /// Both live phases of a base resource type volume, by registry row.
    ///
    /// A retired registry row matches nothing, whatever volumes exist.
    pub fn find_base_resource_type_volume(
        &self,
        base_resource_type: &WorkerBaseResourceType,
    ) -> (Option<CreatingVolume>, Option<CreatedVolume>) {
        let tables = self.store.lock();
        if !tables.workers.contains_key(&base_resource_type.worker_name)
            || !tables
                .base_resource_types
                .contains_key(&base_resource_type.id)
        {
            return (None, None);
        }
        let mut creating = None;
        let mut created = None;
        for row in tables.volumes.values() {
            if row.worker_name != base_resource_type.worker_name {
                continue;
            }
            if row.owner
                != (VolumeOwner::BaseResourceType {
                    id: base_resource_type.id,
                })
            {
                continue;
            }
            match row.state {
                VolumeState::Creating => {
                    creating = Some(CreatingVolume::from_row(self.store.clone(), row));
                }
                VolumeState::Created => {
                    created = Some(CreatedVolume::from_row(self.store.clone(), row.clone()));
                }
                _ => {}
            }
        }
        (creating, created)
    }

    /// Both live phases of a task cache volume on one worker.
    ///
    /// The creating projection covers a cache volume still being
    /// provisioned; the created projection follows the live assignment, so
    /// a superseded volume stops being found the moment a rebuilt cache
    /// takes over.
    pub fn find_task_cache_volume(
        &self,
        team_id: TeamId,
        worker_name: &str,
        task_cache: &TaskCache,
    ) -> (Option<CreatingVolume>, Option<CreatedVolume>) {
        let tables = self.store.lock();
        if !tables.workers.contains_key(worker_name) {
            return (None, None);
        }
        let Some(wtc) = tables
            .worker_task_caches
            .values()
            .find(|wtc| wtc.worker_name == worker_name && wtc.task_cache_id == task_cache.id)
        else {
            return (None, None);
        };

        let creating = tables
            .volumes
            .values()
            .find(|row| {
                row.team_id == team_id
                    && row.state == VolumeState::Creating
                    && row.owner
                        == (VolumeOwner::TaskCache {
                            worker_task_cache_id: wtc.id,
                        })
            })
            .map(|row| CreatingVolume::from_row(self.store.clone(), row));

        let created = tables
            .task_cache_volumes
            .get(&wtc.id)
            .filter(|assignment| assignment.team_id == team_id)
            .and_then(|assignment| tables.volumes.get(&assignment.volume_handle))
            .filter(|row| row.state == VolumeState::Created)
            .map(|row| CreatedVolume::from_row(self.store.clone(), (*row).clone()));

        (creating, created)
    }

    /// The authoritative resource cache volume on one worker, subject to
    /// the full read-time validity walk.
    pub fn find_resource_cache_volume(
        &self,
        worker_name: &str,
        resource_cache: &ResourceCache,
    ) -> Option<CreatedVolume> {
        WorkerResourceCache {
            worker_name: worker_name.to_string(),
            resource_cache: resource_cache.clone(),
        }
        .find(&self.store)
    }

    /// A created volume by handle.
    pub fn find_volume(&self, handle: &VolumeHandle) -> Option<CreatedVolume> {
        let tables = self.store.lock();
        let row = tables.volumes.get(handle)?;
        if row.state != VolumeState::Created || !tables.workers.contains_key(&row.worker_name) {
            return None;
        }
        Some(CreatedVolume::from_row(self.store.clone(), row.clone()))
    }

    /// Every created volume mounted into one container.
    pub fn find_volumes_for_container(
        &self,
        container_handle: &ContainerHandle,
    ) -> Vec<CreatedVolume> {
        let tables = self.store.lock();
        tables
            .volumes
            .values()
            .filter(|row| {
                row.state == VolumeState::Created
                    && row.owner.container_handle() == Some(container_handle)
                    && tables.workers.contains_key(&row.worker_name)
            })
            .map(|row| CreatedVolume::from_row(self.store.clone(), row.clone()))
            .collect()
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
