// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! stowage-store: shared volume store for the stowage control plane.
//!
//! Tracks worker-local volumes through their lifecycle and arbitrates which
//! volume is authoritative for each resource cache and task cache key. All
//! consistency guarantees reduce to single-statement atomicity on the shared
//! [`Store`]: one lock acquisition per logical operation, no lock held
//! across operations.

mod artifact;
mod repository;
mod resource_cache;
mod snapshot;
mod store;
mod volume;

pub use artifact::WorkerArtifact;
pub use repository::VolumeRepository;
pub use resource_cache::WorkerResourceCache;
pub use snapshot::{Snapshot, SnapshotError};
pub use store::Store;
pub use volume::{CreatedVolume, CreatingVolume, DestroyingVolume, FailedVolume};
