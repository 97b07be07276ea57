// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for volume lifecycle and association operations.
//!
//! Finders never error on a missing row; they return `None`. Duplicate
//! settled transitions and lost promotion races are successes. Everything
//! here is a state or dependency conflict the caller must handle.

use crate::volume::{VolumeHandle, VolumeKind, VolumeState};
use thiserror::Error;

/// Errors that can occur in volume operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VolumeError {
    /// `created()` called while the row is neither creating nor created
    /// (including row no longer exists)
    #[error("cannot mark volume {handle} as created")]
    MarkCreatedFailed { handle: VolumeHandle },
    /// A conditional transition found the row in a state that does not
    /// permit it, or gone
    #[error("cannot transition volume to {state}")]
    MarkStateFailed { state: VolumeState },
    /// `destroying()` attempted while live children exist; expected under
    /// concurrent cleanup, handled by destroying the children first
    #[error("volume cannot be destroyed with children present")]
    CannotDestroyWithChildren,
    /// Child creation raced the parent out of the created state
    #[error("parent volume {handle} is no longer created")]
    ParentNotCreated { handle: VolumeHandle },
    /// A lineage accessor was called on a volume of the wrong kind
    #[error("volume is a {actual} volume, expected {expected}")]
    WrongVolumeKind {
        expected: VolumeKind,
        actual: VolumeKind,
    },
    /// The worker does not currently advertise the base type the cache's
    /// chain resolves to
    #[error("worker {worker} does not advertise base resource type {name}")]
    BaseResourceTypeNotFound { worker: String, name: String },
    /// The registry row a volume owner references has been retired
    #[error("worker base resource type {id} no longer exists")]
    BaseResourceTypeGone { id: i32 },
    /// The resource cache's type graph does not resolve (custom-type cycle)
    #[error("resource cache type chain does not resolve to a base type")]
    UnresolvableTypeChain,
    /// `initialize_artifact` called on a volume that already has one
    #[error("volume {handle} already has an artifact")]
    ArtifactAlreadyInitialized { handle: VolumeHandle },
    /// A promotion found the volume row gone (concurrently destroyed)
    #[error("volume {handle} no longer exists")]
    VolumeGone { handle: VolumeHandle },
    /// Volume creation addressed a worker the registry does not know
    #[error("worker {name} is not registered")]
    WorkerNotFound { name: String },
    /// The pipeline/job bookkeeping rows behind a task cache owner are gone
    #[error("task identifier bookkeeping is missing for volume {handle}")]
    TaskIdentifierUnresolved { handle: VolumeHandle },
}
