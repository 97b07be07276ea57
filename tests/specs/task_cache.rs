//! Task caches: last claim wins, identifiers recovered from bookkeeping.

use crate::prelude::*;
use stowage_core::VolumeKind;

#[test]
fn task_cache_volume_is_found_by_job_step_and_path() {
    let h = Harness::new();
    let mut volume = h.created_volume("worker-1", "c1");
    volume.initialize_task_cache(1, "unit", "/cache").unwrap();
    assert_eq!(volume.kind(), VolumeKind::TaskCache);

    let task_cache = h.store.find_or_create_task_cache(1, "unit", "/cache");
    let (_, found) = h.repo.find_task_cache_volume(TEAM, "worker-1", &task_cache);
    assert_eq!(found.unwrap().handle(), volume.handle());
}

#[test]
fn task_cache_volume_is_visible_while_still_creating() {
    let h = Harness::new();
    let task_cache = h.store.find_or_create_task_cache(1, "unit", "/cache");
    let wtc = h
        .store
        .find_or_create_worker_task_cache("worker-1", &task_cache);
    let creating = h.repo.create_task_cache_volume(TEAM, &wtc).unwrap();

    let (found_creating, found_created) =
        h.repo.find_task_cache_volume(TEAM, "worker-1", &task_cache);
    assert_eq!(
        found_creating.map(|v| v.handle().clone()),
        Some(creating.handle().clone()),
    );
    assert!(found_created.is_none());
}

#[test]
fn rebuilt_cache_supersedes_the_previous_volume() {
    let h = Harness::new();
    let mut first = h.created_volume("worker-1", "c1");
    first.initialize_task_cache(1, "unit", "/cache").unwrap();

    let mut second = h.created_volume("worker-1", "c2");
    second.initialize_task_cache(1, "unit", "/cache").unwrap();

    let task_cache = h.store.find_or_create_task_cache(1, "unit", "/cache");
    let (_, found) = h.repo.find_task_cache_volume(TEAM, "worker-1", &task_cache);
    assert_eq!(found.unwrap().handle(), second.handle());

    // The superseded volume keeps existing until garbage collection
    assert!(h.repo.find_volume(first.handle()).is_some());
    assert_eq!(
        h.repo.find_volume(first.handle()).unwrap().kind(),
        VolumeKind::TaskCache,
    );
}

#[test]
fn same_step_on_two_workers_keeps_separate_caches() {
    let h = Harness::new();
    let mut one = h.created_volume("worker-1", "c1");
    let mut two = h.created_volume("worker-2", "c2");
    one.initialize_task_cache(1, "unit", "/cache").unwrap();
    two.initialize_task_cache(1, "unit", "/cache").unwrap();

    let task_cache = h.store.find_or_create_task_cache(1, "unit", "/cache");
    let (_, found_one) = h.repo.find_task_cache_volume(TEAM, "worker-1", &task_cache);
    let (_, found_two) = h.repo.find_task_cache_volume(TEAM, "worker-2", &task_cache);
    assert_eq!(found_one.unwrap().handle(), one.handle());
    assert_eq!(found_two.unwrap().handle(), two.handle());
}

#[test]
fn task_identifier_names_the_pipeline_job_and_step() {
    let h = Harness::new();
    let mut volume = h.created_volume("worker-1", "c1");
    volume.initialize_task_cache(1, "unit", "/cache").unwrap();

    let identifier = volume.task_identifier().unwrap();
    assert_eq!(identifier.pipeline_id, 1);
    assert_eq!(identifier.pipeline_ref, "main");
    assert_eq!(identifier.job_name, "build");
    assert_eq!(identifier.step_name, "unit");
}
