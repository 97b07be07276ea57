// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Volume identity, lifecycle state, discriminated kind, and ownership.
//!
//! A volume's handle is its stable global identity; the worker-side agent
//! addresses the physical volume by this handle. The lifecycle state moves
//! monotonically along `Creating → {Created | Failed}` and
//! `Created → Destroying → (row removed)`.

use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Stable, globally unique handle of a volume.
    ///
    /// Assigned once at creation and never reused; survives every state
    /// transition until the row is removed by `destroy`.
    pub struct VolumeHandle;
}

crate::define_id! {
    /// Opaque handle of a container, supplied by the container lifecycle
    /// collaborator. Never inspected beyond identity.
    pub struct ContainerHandle;
}

/// Lifecycle state of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeState {
    /// Physical creation on the worker is in flight
    Creating,
    /// Volume exists on the worker and may be promoted or parented
    Created,
    /// Physical removal on the worker is in flight
    Destroying,
    /// Terminal; only ever observed as a target state (the row is removed)
    Destroyed,
    /// Creation failed; terminal
    Failed,
}

impl fmt::Display for VolumeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeState::Creating => write!(f, "creating"),
            VolumeState::Created => write!(f, "created"),
            VolumeState::Destroying => write!(f, "destroying"),
            VolumeState::Destroyed => write!(f, "destroyed"),
            VolumeState::Failed => write!(f, "failed"),
        }
    }
}

/// Discriminated volume type.
///
/// Starts as whatever the owner implies and is mutated only by promotion:
/// a `Container` volume becomes `Resource` solely by winning a resource
/// cache claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeKind {
    #[default]
    Container,
    Resource,
    ResourceType,
    TaskCache,
    Artifact,
}

impl fmt::Display for VolumeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeKind::Container => write!(f, "container"),
            VolumeKind::Resource => write!(f, "resource"),
            VolumeKind::ResourceType => write!(f, "resource-type"),
            VolumeKind::TaskCache => write!(f, "task-cache"),
            VolumeKind::Artifact => write!(f, "artifact"),
        }
    }
}

/// Owner of a volume. Exactly one at any time.
///
/// Serializes as a tagged enum, e.g.
/// `{"owner": "container", "handle": "...", "path": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "owner", rename_all = "snake_case")]
pub enum VolumeOwner {
    /// Mounted into a container at `path`
    Container {
        handle: ContainerHandle,
        path: String,
    },
    /// Backs a worker's advertised base resource type
    BaseResourceType { id: i32 },
    /// Authoritative cache for a worker task cache
    TaskCache { worker_task_cache_id: i32 },
    /// Won a resource cache claim; references the association row
    ResourceCache { worker_resource_cache_id: i32 },
    /// No owner yet (artifact volumes before initialization)
    Unowned,
}

impl VolumeOwner {
    /// Container handle, when container-owned.
    pub fn container_handle(&self) -> Option<&ContainerHandle> {
        match self {
            VolumeOwner::Container { handle, .. } => Some(handle),
            _ => None,
        }
    }

    /// Mount path, when container-owned.
    pub fn path(&self) -> Option<&str> {
        match self {
            VolumeOwner::Container { path, .. } => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "volume_tests.rs"]
mod tests;
