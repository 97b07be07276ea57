//! Shared fixture for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use stowage_core::{
    ContainerHandle, FakeClock, JobRecord, PipelineRecord, ResourceCache, SequentialIdGen, Version,
};
use stowage_store::{CreatedVolume, Store, VolumeRepository};

pub const TEAM: i32 = 1;

/// A store with two registered workers, pipeline/job bookkeeping, and
/// deterministic handles and timestamps.
pub struct Harness {
    pub store: Store,
    pub repo: VolumeRepository,
    pub clock: FakeClock,
}

impl Harness {
    pub fn new() -> Self {
        let clock = FakeClock::new();
        let store = Store::with_parts(
            Arc::new(SequentialIdGen::default()),
            Arc::new(clock.clone()),
        );
        store.register_worker("worker-1", &[("git", "1.0"), ("docker-image", "2.0")]);
        store.register_worker("worker-2", &[("git", "1.0")]);
        store.register_pipeline(PipelineRecord {
            id: 1,
            name: "main".to_string(),
        });
        store.register_job(JobRecord {
            id: 1,
            name: "build".to_string(),
            pipeline_id: 1,
        });
        let repo = VolumeRepository::new(store.clone());
        Self { store, repo, clock }
    }

    /// A created container volume on `worker`, mounted for `container`.
    pub fn created_volume(&self, worker: &str, container: &str) -> CreatedVolume {
        self.repo
            .create_container_volume(TEAM, worker, &ContainerHandle::from(container), "/tmp")
            .unwrap()
            .created()
            .unwrap()
    }
}

/// A git resource cache pinned at `commit`.
pub fn git_cache(commit: &str) -> ResourceCache {
    ResourceCache {
        resource_type: "git".to_string(),
        version: Version::single("ref", commit),
        source: BTreeMap::from([("uri".to_string(), "git://repo".to_string())]),
        params: BTreeMap::new(),
        resource_types: vec![],
    }
}
