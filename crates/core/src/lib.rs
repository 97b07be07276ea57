// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! stowage-core: domain vocabulary for the stowage volume store

pub mod clock;
pub mod error;
pub mod id;
pub mod resource;
pub mod task_cache;
pub mod volume;
pub mod worker;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::VolumeError;
pub use id::{BuildId, IdGen, JobId, PipelineId, SequentialIdGen, TeamId, UuidIdGen};
pub use resource::{
    BaseResourceTypeRef, BaseTypeResolution, Params, ResourceCache, Source, Version,
    VersionedResourceType, VolumeResourceType,
};
pub use task_cache::{JobRecord, PipelineRecord, TaskCache, TaskIdentifier, WorkerTaskCache};
pub use volume::{ContainerHandle, VolumeHandle, VolumeKind, VolumeOwner, VolumeState};
pub use worker::{Worker, WorkerBaseResourceType};
