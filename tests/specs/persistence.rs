//! Snapshot persistence: the store survives a save/load cycle intact.

use crate::prelude::*;
use similar_asserts::assert_eq;
use std::sync::Arc;
use stowage_core::{FakeClock, SequentialIdGen};
use stowage_store::{Snapshot, Store, VolumeRepository};
use tempfile::tempdir;

fn fresh_store() -> Store {
    Store::with_parts(
        Arc::new(SequentialIdGen::new("restored")),
        Arc::new(FakeClock::new()),
    )
}

#[test]
fn snapshot_round_trips_through_a_file() {
    let h = Harness::new();
    let cache = git_cache("abc123");
    let mut volume = h.created_volume("worker-1", "c1");
    volume.initialize_resource_cache(&cache).unwrap();
    volume.initialize_artifact("build-output", 7).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("stowage.json");
    h.store.snapshot().save(&path).unwrap();

    let restored = fresh_store();
    restored.restore(Snapshot::load(&path).unwrap().unwrap());
    let repo = VolumeRepository::new(restored.clone());

    let found = repo.find_resource_cache_volume("worker-1", &cache).unwrap();
    assert_eq!(found.handle(), volume.handle());
    assert_eq!(found.worker_artifact_id(), volume.worker_artifact_id());
}

#[test]
fn snapshot_file_is_plain_json() {
    let h = Harness::new();
    h.created_volume("worker-1", "c1");

    let dir = tempdir().unwrap();
    let path = dir.path().join("stowage.json");
    h.store.snapshot().save(&path).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(value.get("tables").is_some());
    assert!(value.get("created_at").is_some());
}

#[test]
fn invalidation_still_applies_after_restore() {
    let h = Harness::new();
    let cache = git_cache("abc123");
    let mut volume = h.created_volume("worker-1", "c1");
    volume.initialize_resource_cache(&cache).unwrap();

    let restored = fresh_store();
    restored.restore(h.store.snapshot());
    let repo = VolumeRepository::new(restored.clone());
    assert!(repo.find_resource_cache_volume("worker-1", &cache).is_some());

    // The worker reconnects with a newer git; the restored association
    // must go invisible exactly as it would have live
    restored.register_worker("worker-1", &[("git", "2.0"), ("docker-image", "2.0")]);
    assert!(repo.find_resource_cache_volume("worker-1", &cache).is_none());
}

#[test]
fn restored_counters_keep_ids_unique() {
    let h = Harness::new();
    let mut first = h
        .repo
        .create_volume(TEAM, "worker-1", stowage_core::VolumeKind::Artifact)
        .unwrap()
        .created()
        .unwrap();
    let artifact = first.initialize_artifact("a", 7).unwrap();

    let restored = fresh_store();
    restored.restore(h.store.snapshot());
    let repo = VolumeRepository::new(restored.clone());

    let mut second = repo
        .create_volume(TEAM, "worker-1", stowage_core::VolumeKind::Artifact)
        .unwrap()
        .created()
        .unwrap();
    let next = second.initialize_artifact("b", 7).unwrap();
    assert_eq!(next.id, artifact.id + 1);
}

#[test]
fn artifact_timestamps_come_from_the_clock() {
    let h = Harness::new();
    let mut volume = h
        .repo
        .create_volume(TEAM, "worker-1", stowage_core::VolumeKind::Artifact)
        .unwrap()
        .created()
        .unwrap();

    h.clock.advance(5_000);
    let artifact = volume.initialize_artifact("build-output", 7).unwrap();
    assert_eq!(artifact.created_at_ms, 1_005_000);
}
